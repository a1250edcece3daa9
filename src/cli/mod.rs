use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "repurposer",
    about = "Repurposer - Turn video transcripts into blog, LinkedIn and Twitter posts",
    version,
    long_about = "A CLI tool that takes a YouTube video (or a local transcript file), refines its transcript, derives topics and writes platform-tailored posts with a text-completion service. Posts are length-checked against each platform's limit."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Repurpose a video or transcript file into posts
    Repurpose {
        /// YouTube URL or path to a local .txt/.vtt transcript
        #[arg(value_name = "URL_OR_FILE")]
        source: String,

        /// Output file path (prints to console if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Output format (defaults to `output.format` from the config)
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,

        /// Maximum number of posts drafted at the same time
        #[arg(long, value_name = "N")]
        concurrency: Option<usize>,

        /// Wall-clock budget for the whole run, in seconds
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,
    },

    /// Show or locate the configuration
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,
    },

    /// List output platforms and their limits
    Platforms,
}

#[derive(ValueEnum, Clone, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    /// Plain text report
    Text,
    /// JSON report
    Json,
}

impl OutputFormat {
    /// File extension for reports in this format
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Text => "txt",
            OutputFormat::Json => "json",
        }
    }

    /// Parse the `output.format` config value
    pub fn from_config(value: &str) -> Option<Self> {
        <Self as ValueEnum>::from_str(value, true).ok()
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}
