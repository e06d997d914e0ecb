use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "vtextract",
    about = "Video Text Extractor - Turn YouTube, Vimeo, TikTok and other video links into text",
    version,
    long_about = "A CLI client for a video transcription service. Submit a video URL, watch the extraction progress, and keep a local history of saved transcriptions that can be replayed without calling the service again."
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

    /// Transcription service base URL (overrides the config file)
    #[arg(long, global = true, env = "VTX_BACKEND_URL", value_name = "URL")]
    pub backend_url: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Extract text from a video URL
    Extract {
        /// Video URL (YouTube, Vimeo, Dailymotion, Twitch, Facebook, Instagram, TikTok)
        #[arg(value_name = "URL")]
        url: String,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Write the result to a file instead of the console
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Save a successful result to history
        #[arg(long)]
        save: bool,
    },

    /// Browse and manage saved transcriptions
    History {
        #[command(subcommand)]
        command: HistoryCommands,
    },

    /// Check that the transcription service is reachable
    Check,

    /// Show or locate the configuration
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,
    },

    /// List supported platforms
    Platforms,
}

#[derive(Subcommand)]
pub enum HistoryCommands {
    /// List saved transcriptions, newest first
    List {
        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show a saved transcription without contacting the service
    Show {
        /// Transcription id (see `history list`)
        #[arg(value_name = "ID")]
        id: String,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Write the transcription to a file instead of the console
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Delete all saved transcriptions
    Clear {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(ValueEnum, Clone, Debug)]
pub enum OutputFormat {
    /// Plain text
    Text,
    /// JSON
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}
