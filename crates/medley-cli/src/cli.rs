use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use medley_core::models::MediaKind;

#[derive(Parser)]
#[command(name = "medley")]
#[command(about = "Track anime, manga, games, and movies across devices")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Optional path to local database file
    #[arg(long, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// CLI profile name for backend auth/sync configuration
    #[arg(long, global = true, value_name = "NAME")]
    pub profile: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Add a media item to the library
    #[command(alias = "new")]
    Add {
        /// Media kind
        #[arg(value_enum)]
        kind: MediaKindArg,
        /// Item title
        title: Vec<String>,
        /// File under this category (created when missing)
        #[arg(short, long, value_name = "NAME")]
        category: Option<String>,
        /// Watch source name (created when missing)
        #[arg(long, value_name = "NAME")]
        source: Option<String>,
        /// Score from 0 to 10
        #[arg(long)]
        score: Option<f64>,
        /// Free-form notes
        #[arg(long)]
        notes: Option<String>,
    },
    /// List media items
    List {
        /// Only show one media kind
        #[arg(value_enum)]
        kind: Option<MediaKindArg>,
        /// Filter by category name
        #[arg(short, long, value_name = "NAME")]
        category: Option<String>,
        /// Number of items to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Move a media item to another category
    Move {
        /// Item ID or title
        item: String,
        /// Target category (created when missing)
        category: String,
    },
    /// Delete a media item
    Delete {
        /// Item ID or title
        item: String,
    },
    /// Start a new run through a media item
    Start {
        /// Item ID or title
        item: String,
    },
    /// Record progress against a run
    Log {
        #[command(subcommand)]
        command: LogCommands,
    },
    /// Sync local replica with the remote backend
    Sync {
        #[command(subcommand)]
        command: Option<SyncCommands>,
    },
    /// Configure CLI backend profiles
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Authenticate CLI profile with Supabase
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
pub enum MediaKindArg {
    Anime,
    Manga,
    Game,
    Movie,
}

impl MediaKindArg {
    #[must_use]
    pub const fn into_kind(self) -> MediaKind {
        match self {
            Self::Anime => MediaKind::Anime,
            Self::Manga => MediaKind::Manga,
            Self::Game => MediaKind::Game,
            Self::Movie => MediaKind::Movie,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}

#[derive(Subcommand)]
pub enum LogCommands {
    /// Mark an episode or chapter as watched
    Episode {
        /// Run ID
        run: i64,
        /// Episode number
        number: i64,
    },
    /// Record a play session against a game run
    Session {
        /// Run ID
        run: i64,
        /// Session length in minutes
        minutes: i64,
        /// Optional session note
        #[arg(long)]
        note: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum SyncCommands {
    /// List recently recorded sync conflicts
    Conflicts {
        /// Number of conflicts to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Initialize or update profile config
    Init {
        /// Profile name to initialize
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,
        /// Supabase project URL
        #[arg(long, value_name = "URL")]
        supabase_url: Option<String>,
        /// Supabase anon/public key
        #[arg(long, value_name = "KEY")]
        supabase_anon_key: Option<String>,
        /// Keep current active profile instead of activating this one
        #[arg(long)]
        no_activate: bool,
    },
    /// Show resolved profile config
    Show {
        /// Optional profile override
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum AuthCommands {
    /// Login with Supabase email/password and store session in keychain
    Login {
        /// Optional profile override
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,
        /// Supabase account email
        #[arg(long, value_name = "EMAIL")]
        email: String,
        /// Supabase account password
        #[arg(long, value_name = "PASSWORD")]
        password: String,
    },
    /// Create a Supabase account and store the session when auto-confirmed
    Register {
        /// Optional profile override
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,
        /// Supabase account email
        #[arg(long, value_name = "EMAIL")]
        email: String,
        /// Supabase account password
        #[arg(long, value_name = "PASSWORD")]
        password: String,
    },
    /// Show auth status for profile
    Status {
        /// Optional profile override
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,
    },
    /// Logout profile and clear stored session
    Logout {
        /// Optional profile override
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,
    },
}
