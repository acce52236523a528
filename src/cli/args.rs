//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueHint};

/// MABLE: Making the ABL Easier. Fetch, cache and edit the Approved Book List
#[derive(Parser, Debug)]
#[command(name = "mable")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase log verbosity (-d info, -dd debug, -ddd trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub debug: u8,

    /// Project directory holding .mable.toml and the ABL copy (default: cwd)
    #[arg(short = 'C', long, global = true, value_hint = ValueHint::DirPath)]
    pub project_dir: Option<PathBuf>,

    /// Local ABL file (overrides cache_path)
    #[arg(long, global = true, value_hint = ValueHint::FilePath)]
    pub cache: Option<PathBuf>,

    /// Remote ABL URL (overrides remote_url)
    #[arg(long, global = true, value_hint = ValueHint::Url)]
    pub url: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Remove a book version: <repository> <commit_sha> <slug>
    Remove {
        /// Repository name
        repository: String,
        /// Commit SHA of the version
        commit_sha: String,
        /// Book slug
        slug: String,
    },

    /// Add a book version: <repository> <commit_sha> <style> <uuid> <slug>
    Add {
        /// Repository name
        repository: String,
        /// Commit SHA of the version
        commit_sha: String,
        /// Rendering style of the book
        style: String,
        /// Book UUID
        uuid: String,
        /// Book slug
        slug: String,
        /// Minimum code version for a commit not in the ABL yet (default: now, UTC)
        #[arg(long)]
        min_code_version: Option<String>,
        /// Edition, used when the commit is not in the ABL yet
        #[arg(long, default_value_t = 1)]
        edition: u32,
    },

    /// Add a repository without versions
    AddRepository {
        /// Repository name
        repository: String,
        /// Platform tag (repeatable)
        #[arg(short, long = "platform")]
        platforms: Vec<String>,
    },

    /// Approve a collection version: <collection_id> <content_version> <min_code_version>
    AddCollection {
        /// Collection ID, e.g. col11406
        collection_id: String,
        /// Content version, e.g. 1.20.15
        content_version: String,
        /// Minimum code version, e.g. 20200923.171926
        min_code_version: String,
    },

    /// Withdraw a collection version: <collection_id> <content_version>
    RemoveCollection {
        /// Collection ID, e.g. col11406
        collection_id: String,
        /// Content version, e.g. 1.20.15
        content_version: String,
    },

    /// Download the most recent ABL and overwrite the local copy
    Update,

    /// Count approved book versions
    Count,

    /// Publish the local ABL (not implemented)
    Push,

    /// Verify the flat index agrees with the repository tree
    Check,

    /// Rebuild the flat index from the repository tree
    Reindex,

    /// Show repositories, versions and books as a tree
    Tree,

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show merged config
    Show,

    /// Create global config template
    Init,

    /// Show config paths
    Path,
}
