//! CLI definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::embeddings::EmbeddingProviderType;
use crate::search::DEFAULT_K;
use crate::store::{DistanceMetric, DEFAULT_LIST_LIMIT};

/// Output format for list/query commands.
#[derive(ValueEnum, Clone, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable table (default)
    #[default]
    Table,
    /// JSON (same as --json)
    Json,
    /// Comma-separated values
    Csv,
}

pub mod commands;

/// Storefront search - semantic product search over a local vector store
#[derive(Parser, Debug)]
#[command(name = "sfs", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Database path (default: ~/.storefront-search/data/catalog.db)
    #[arg(long, global = true, env = "SFS_DB")]
    pub db: Option<PathBuf>,

    /// Embedding provider (ollama, huggingface, model2vec, hashing)
    #[arg(long, global = true)]
    pub provider: Option<EmbeddingProviderType>,

    /// Distance metric for new stores (euclidean, cosine)
    #[arg(long, global = true)]
    pub metric: Option<DistanceMetric>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Output format (table, json, csv)
    #[arg(long, value_enum, global = true, default_value_t)]
    pub format: OutputFormat,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (no output except errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

/// Global options every command needs.
#[derive(Debug, Clone, Default)]
pub struct CommandContext {
    pub db: Option<PathBuf>,
    pub provider: Option<EmbeddingProviderType>,
    pub metric: Option<DistanceMetric>,
    pub json: bool,
}

impl CommandContext {
    /// Capture the global flags with the resolved JSON mode.
    #[must_use]
    pub fn from_cli(cli: &Cli, json: bool) -> Self {
        Self {
            db: cli.db.clone(),
            provider: cli.provider,
            metric: cli.metric,
            json,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Embed and store a document, or a batch from a JSON file
    Ingest {
        /// Document text
        #[arg(required_unless_present = "file", conflicts_with = "file")]
        text: Option<String>,

        /// Metadata as key=value (repeatable)
        #[arg(short, long = "meta")]
        meta: Vec<String>,

        /// JSON file with an array of {text, metadata} ("-" for stdin)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Find the documents most similar to a query
    Search {
        /// Query text
        query: String,

        /// Number of results
        #[arg(short, default_value_t = DEFAULT_K)]
        k: usize,

        /// Only match documents whose metadata has key=value (repeatable)
        #[arg(long)]
        filter: Vec<String>,
    },

    /// Show a document by id
    Get {
        /// Document id
        id: String,
    },

    /// List stored documents in insertion order
    List {
        /// Maximum documents to return
        #[arg(short, long, default_value_t = DEFAULT_LIST_LIMIT)]
        limit: usize,
    },

    /// Show store status
    Status,

    /// Embedding provider management
    Embeddings {
        #[command(subcommand)]
        command: EmbeddingsCommands,
    },

    /// Serve the HTTP API
    Serve {
        /// Address to bind
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to listen on
        #[arg(short, long, default_value_t = 8000)]
        port: u16,

        /// Keep documents in memory instead of the database
        #[arg(long)]
        memory: bool,
    },

    /// Print version information
    Version,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Supported shells for completions.
#[derive(clap::ValueEnum, Clone, Debug)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

#[derive(Subcommand, Debug, Clone)]
pub enum EmbeddingsCommands {
    /// Show provider availability and configuration
    Status,

    /// Configure the embedding provider (select one with the global --provider)
    Configure {
        /// Model to use (provider-specific)
        #[arg(short, long)]
        model: Option<String>,

        /// API endpoint (for custom servers)
        #[arg(long)]
        endpoint: Option<String>,

        /// API token (for HuggingFace)
        #[arg(long)]
        token: Option<String>,

        /// Vector size (for the hashing provider)
        #[arg(long)]
        dimensions: Option<usize>,

        /// Clear all embedding settings
        #[arg(long)]
        reset: bool,
    },

    /// Embed a sample text with the active provider
    Test {
        /// Text to embed
        #[arg(default_value = "ceramic coffee mug")]
        text: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_search_with_filters() {
        let cli = Cli::parse_from([
            "sfs", "search", "mug", "-k", "5", "--filter", "category=kitchen", "--metric",
            "cosine",
        ]);
        assert_eq!(cli.metric, Some(DistanceMetric::Cosine));
        match cli.command {
            Commands::Search { query, k, filter } => {
                assert_eq!(query, "mug");
                assert_eq!(k, 5);
                assert_eq!(filter, vec!["category=kitchen"]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_ingest_requires_text_or_file() {
        assert!(Cli::try_parse_from(["sfs", "ingest"]).is_err());
        assert!(Cli::try_parse_from(["sfs", "ingest", "x", "--file", "a.json"]).is_err());

        let cli = Cli::parse_from(["sfs", "--provider", "hashing", "ingest", "--file", "-"]);
        assert_eq!(cli.provider, Some(EmbeddingProviderType::Hashing));
        assert!(matches!(cli.command, Commands::Ingest { file: Some(_), .. }));
    }

    #[test]
    fn test_configure_uses_global_provider() {
        let cli = Cli::parse_from([
            "sfs", "embeddings", "configure", "--provider", "ollama", "--model", "all-minilm",
        ]);
        assert_eq!(cli.provider, Some(EmbeddingProviderType::Ollama));
        assert!(matches!(
            cli.command,
            Commands::Embeddings {
                command: EmbeddingsCommands::Configure { model: Some(_), .. }
            }
        ));
    }

    #[test]
    fn test_unknown_provider_is_rejected() {
        assert!(Cli::try_parse_from(["sfs", "--provider", "openai", "status"]).is_err());
    }
}
