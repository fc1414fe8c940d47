use std::path::Path;
use std::sync::Arc;

use medley_core::sync::SupabaseRestStore;
use medley_core::{SyncEngine, SyncOutcome, SyncReport};

use crate::auth::SupabaseAuthService;
use crate::commands::common::{
    format_sync_conflict_lines, list_sync_conflicts, open_library, sync_conflict_to_item,
    SyncConflictItem,
};
use crate::config_profiles::CliProfilesConfig;
use crate::error::CliError;

pub async fn run_sync(db_path: &Path, global_profile: Option<&str>) -> Result<(), CliError> {
    let config = CliProfilesConfig::load().map_err(CliError::Config)?;
    let profile_name = config.resolve_profile_name(global_profile);
    let profile = config.profile(&profile_name).cloned().unwrap_or_default();

    let Some(backend) = profile.backend_config()? else {
        return Err(CliError::SyncNotConfigured);
    };

    let auth = SupabaseAuthService::new(&profile_name, &backend)
        .map_err(|error| CliError::Auth(error.to_string()))?;
    let Some(session) = auth
        .restore_session()
        .await
        .map_err(|error| CliError::Auth(error.to_string()))?
    else {
        return Err(CliError::NotSignedIn(profile_name));
    };

    let library = open_library(db_path).await?;
    let store = SupabaseRestStore::new(
        &backend.supabase_url,
        &backend.supabase_anon_key,
        &session.access_token,
    )
    .map_err(medley_core::Error::from)?;

    let engine = SyncEngine::new(library.clone(), Arc::new(store), session.owner_id());
    let report = engine.run_pass().await;
    print_report(&report);
    let nothing_moved = report.total().is_empty();

    match report.outcome {
        SyncOutcome::Completed => {
            if nothing_moved {
                println!("Already up to date");
            } else {
                println!("Sync completed");
            }
            let unresolved = library.unresolved_conflict_count().await?;
            if unresolved > 0 {
                println!("Unresolved sync conflicts: {unresolved} (see `medley sync conflicts`)");
            }
            Ok(())
        }
        SyncOutcome::Cancelled { stopped_at } => {
            println!("Sync cancelled during {stopped_at}");
            Ok(())
        }
        SyncOutcome::SkippedBusy => {
            println!("Another sync is already running");
            Ok(())
        }
        SyncOutcome::Aborted { entity, reason } => Err(CliError::SyncAborted {
            entity: entity.to_string(),
            reason,
        }),
    }
}

fn print_report(report: &SyncReport) {
    for (entity, counts) in &report.counts {
        if counts.is_empty() {
            continue;
        }
        println!(
            "{entity:<16}  pulled={} pushed={} inserted={} attached={} conflicts={} skipped={}",
            counts.pulled,
            counts.pushed,
            counts.inserted,
            counts.attached,
            counts.conflicts,
            counts.skipped
        );
    }
}

pub async fn run_sync_conflicts(
    limit: usize,
    as_json: bool,
    db_path: &Path,
) -> Result<(), CliError> {
    let conflicts = list_sync_conflicts(limit, db_path).await?;

    if as_json {
        let json_items = conflicts
            .iter()
            .map(sync_conflict_to_item)
            .collect::<Vec<SyncConflictItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
        return Ok(());
    }

    if conflicts.is_empty() {
        println!("No sync conflicts recorded.");
        return Ok(());
    }

    for line in format_sync_conflict_lines(&conflicts) {
        println!("{line}");
    }
    Ok(())
}
