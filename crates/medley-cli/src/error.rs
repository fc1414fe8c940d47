use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] medley_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("No title provided")]
    EmptyTitle,
    #[error("Item ID or title cannot be empty")]
    EmptyItemQuery,
    #[error("Score must be between 0 and 10")]
    ScoreOutOfRange,
    #[error("Media item not found for id/title: {0}")]
    ItemNotFound(String),
    #[error("{0}")]
    AmbiguousItem(String),
    #[error("Run not found for id: {0}")]
    RunNotFound(i64),
    #[error("Episode number must be positive")]
    NonPositiveEpisode,
    #[error("Session minutes must be positive")]
    NonPositiveMinutes,
    #[error("Episode {episode} is already logged for run {run}")]
    EpisodeAlreadyLogged { run: i64, episode: i64 },
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Authentication error: {0}")]
    Auth(String),
    #[error("Not signed in for profile '{0}'. Run `medley auth login` first.")]
    NotSignedIn(String),
    #[error(
        "Sync is not configured. Run `medley config init` + `medley auth login`, or set MEDLEY_SUPABASE_URL and MEDLEY_SUPABASE_ANON_KEY for advanced env mode."
    )]
    SyncNotConfigured,
    #[error("Sync aborted during {entity}: {reason}")]
    SyncAborted { entity: String, reason: String },
}
