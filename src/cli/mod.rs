use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "transcript-enricher",
    about = "Transcript Enricher - Fetch YouTube captions and enrich them with AI summaries, extractions and Q&A",
    version,
    long_about = "Fetches caption tracks for YouTube videos into a local SQLite store, then produces cached AI summaries and structured extractions, or answers questions about a stored transcript. Supports OpenAI, Anthropic and Gemini."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text", global = true)]
    pub format: OutputFormat,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Disable progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the configuration file
    #[arg(short, long, value_name = "FILE", global = true, env = "TRANSCRIPT_ENRICHER_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch and store the transcript of a YouTube video
    Fetch {
        /// Video URL (watch, youtu.be, embed, shorts, live, mobile) or bare 11-character ID
        #[arg(value_name = "URL_OR_ID")]
        url: String,

        /// Preferred caption language (defaults to the configured language)
        #[arg(short, long, value_name = "LANG")]
        language: Option<String>,
    },

    /// Summarize a stored transcript (cached per kind)
    Summarize {
        #[arg(value_name = "TRANSCRIPT_ID")]
        transcript_id: String,

        /// Summary kind: brief, detailed or key_points
        #[arg(short, long, default_value = "brief")]
        kind: String,
    },

    /// Extract structured items from a stored transcript (cached per kind)
    Extract {
        #[arg(value_name = "TRANSCRIPT_ID")]
        transcript_id: String,

        /// Extraction kind: code, quotes or action_items
        #[arg(short, long)]
        kind: String,
    },

    /// Ask a question about a stored transcript
    Ask {
        #[arg(value_name = "TRANSCRIPT_ID")]
        transcript_id: String,

        /// Question, 3-500 characters
        question: String,
    },

    /// Show a stored transcript with its cached summaries and extractions
    Show {
        #[arg(value_name = "TRANSCRIPT_ID")]
        transcript_id: String,
    },

    /// Delete a cached summary so the next request regenerates it
    Forget {
        #[arg(value_name = "SUMMARY_ID")]
        summary_id: String,
    },

    /// Print the canonical video ID for a URL or ID
    Resolve {
        #[arg(value_name = "URL_OR_ID")]
        url: String,
    },

    /// Show or initialize the configuration file
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// Pretty-printed JSON
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
