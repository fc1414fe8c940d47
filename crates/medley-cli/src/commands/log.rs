use std::path::Path;

use chrono::Utc;
use medley_core::models::{EpisodeProgressFields, GameSessionFields, MediaRunFields, Tracked};
use medley_core::{LibraryService, LocalId};

use crate::commands::common::{normalize_arg, open_library};
use crate::error::CliError;

pub async fn run_log_episode(run_id: i64, number: i64, db_path: &Path) -> Result<(), CliError> {
    if number <= 0 {
        return Err(CliError::NonPositiveEpisode);
    }

    let library = open_library(db_path).await?;
    let run = require_run(run_id, &library).await?;

    let episodes = library.list::<EpisodeProgressFields>().await?;
    if episodes.iter().any(|episode| {
        episode.fields.run_id == run.local_id() && episode.fields.episode_number == number
    }) {
        return Err(CliError::EpisodeAlreadyLogged {
            run: run_id,
            episode: number,
        });
    }

    let progress = library
        .create(&EpisodeProgressFields {
            run_id: run.local_id(),
            episode_number: number,
            watched_at: Utc::now().timestamp_millis(),
        })
        .await?;

    println!("{}", progress.local_id());
    Ok(())
}

pub async fn run_log_session(
    run_id: i64,
    minutes: i64,
    note: Option<&str>,
    db_path: &Path,
) -> Result<(), CliError> {
    if minutes <= 0 {
        return Err(CliError::NonPositiveMinutes);
    }

    let library = open_library(db_path).await?;
    let run = require_run(run_id, &library).await?;

    let now = Utc::now().timestamp_millis();
    let session = library
        .create(&GameSessionFields {
            run_id: run.local_id(),
            started_at: now - minutes * 60_000,
            minutes,
            note: normalize_arg(note),
        })
        .await?;

    println!("{}", session.local_id());
    Ok(())
}

async fn require_run(
    run_id: i64,
    library: &LibraryService,
) -> Result<Tracked<MediaRunFields>, CliError> {
    match library.get::<MediaRunFields>(LocalId::new(run_id)).await? {
        Some(run) if !run.meta.is_deleted => Ok(run),
        _ => Err(CliError::RunNotFound(run_id)),
    }
}
