use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "everynote")]
#[command(about = "Capture and organize notes from the command line")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// Optional path to the CLI config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Quick capture: everynote "my note here"
    #[arg(trailing_var_arg = true)]
    pub note: Vec<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a new note
    #[command(alias = "new")]
    Add {
        /// Note category (defaults to To-Do)
        #[arg(short, long, value_name = "CATEGORY")]
        category: Option<String>,
        /// Note content
        content: Vec<String>,
    },
    /// Replace the content or category of an existing note
    Edit {
        /// Note ID or unique ID prefix
        id: String,
        /// New category (keeps the current one when omitted)
        #[arg(short, long, value_name = "CATEGORY")]
        category: Option<String>,
        /// New content (opens $EDITOR when omitted)
        content: Vec<String>,
    },
    /// List notes, most recently updated first
    List {
        /// Only show notes in this category
        #[arg(short, long, value_name = "CATEGORY")]
        category: Option<String>,
        /// Number of notes to show
        #[arg(short = 'n', long)]
        limit: Option<usize>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete an existing note
    Delete {
        /// Note ID or unique ID prefix
        id: String,
    },
    /// List available categories
    Categories {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage the signed-in account
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}

#[derive(Subcommand)]
pub enum AuthCommands {
    /// Show who is signed in
    Status,
    /// Sign in with Google
    Login,
    /// Sign out and forget the cached user
    Logout,
}
