use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};

use chrono::Utc;
use medley_core::models::{
    CategoryFields, MediaItemFields, MediaKind, Payload, SyncConflict, Tracked, WatchSourceFields,
};
use medley_core::{LibraryService, LocalId};
use serde::Serialize;

use crate::error::CliError;

/// One media item joined with the names its references point at.
pub struct ItemRow {
    pub item: Tracked<MediaItemFields>,
    pub category: Option<String>,
    pub source: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MediaItemListItem {
    pub id: i64,
    pub kind: String,
    pub title: String,
    pub category: Option<String>,
    pub source: Option<String>,
    pub score: Option<f64>,
    pub notes: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
    pub relative_time: String,
    pub synced: bool,
}

#[derive(Debug, Serialize)]
pub struct SyncConflictItem {
    pub id: i64,
    pub entity: String,
    pub kind: String,
    pub strategy: String,
    pub local_payload: Option<Payload>,
    pub remote_payload: Option<Payload>,
    pub created_at: i64,
    pub created_at_iso: String,
    pub resolved: bool,
}

pub fn resolve_title(title_parts: &[String]) -> Result<String, CliError> {
    medley_core::util::normalize_text_option(Some(title_parts.join(" ")))
        .ok_or(CliError::EmptyTitle)
}

pub fn normalize_arg(value: Option<&str>) -> Option<String> {
    medley_core::util::normalize_text_option(value.map(ToString::to_string))
}

pub async fn open_library(db_path: &Path) -> Result<LibraryService, CliError> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(LibraryService::open_path(db_path).await?)
}

pub async fn list_items(
    kind: Option<MediaKind>,
    category: Option<&str>,
    limit: usize,
    db_path: &Path,
) -> Result<Vec<ItemRow>, CliError> {
    let library = open_library(db_path).await?;

    let category_filter = match category {
        Some(name) => match library.find_category(name).await? {
            Some(found) => Some(found.local_id()),
            // Unknown category filters to nothing, same as an unused tag.
            None => return Ok(Vec::new()),
        },
        None => None,
    };

    let category_names = name_index(library.list::<CategoryFields>().await?);
    let source_names = source_index(library.list::<WatchSourceFields>().await?);

    let mut items = library.list::<MediaItemFields>().await?;
    items.retain(|item| kind.map_or(true, |wanted| item.fields.kind == wanted));
    items.retain(|item| category_filter.map_or(true, |id| item.fields.category_id == Some(id)));
    items.sort_by_key(|item| std::cmp::Reverse(item.meta.updated_at));
    items.truncate(limit);

    Ok(items
        .into_iter()
        .map(|item| {
            let category = item
                .fields
                .category_id
                .and_then(|id| category_names.get(&id).cloned());
            let source = item
                .fields
                .watch_source_id
                .and_then(|id| source_names.get(&id).cloned());
            ItemRow {
                item,
                category,
                source,
            }
        })
        .collect())
}

fn name_index(categories: Vec<Tracked<CategoryFields>>) -> HashMap<LocalId, String> {
    categories
        .into_iter()
        .map(|category| (category.local_id(), category.fields.name))
        .collect()
}

fn source_index(sources: Vec<Tracked<WatchSourceFields>>) -> HashMap<LocalId, String> {
    sources
        .into_iter()
        .map(|source| (source.local_id(), source.fields.name))
        .collect()
}

/// Resolve an item argument: a numeric local id first, then a title match
/// over live items. A unique exact title wins over substring hits.
pub async fn resolve_item(
    item_query: &str,
    library: &LibraryService,
) -> Result<Tracked<MediaItemFields>, CliError> {
    let query = item_query.trim();
    if query.is_empty() {
        return Err(CliError::EmptyItemQuery);
    }

    if let Ok(id) = query.parse::<i64>() {
        return match library.get::<MediaItemFields>(LocalId::new(id)).await? {
            Some(item) if !item.meta.is_deleted => Ok(item),
            _ => Err(CliError::ItemNotFound(query.to_string())),
        };
    }

    let needle = query.to_lowercase();
    let mut matches: Vec<Tracked<MediaItemFields>> = library
        .list::<MediaItemFields>()
        .await?
        .into_iter()
        .filter(|item| item.fields.title.to_lowercase().contains(&needle))
        .collect();

    if matches.len() > 1 {
        let exact: Vec<usize> = matches
            .iter()
            .enumerate()
            .filter(|(_, item)| item.fields.title.eq_ignore_ascii_case(query))
            .map(|(index, _)| index)
            .collect();
        if let [only] = exact.as_slice() {
            return Ok(matches.swap_remove(*only));
        }
    }

    match matches.len() {
        0 => Err(CliError::ItemNotFound(query.to_string())),
        1 => Ok(matches.remove(0)),
        _ => {
            let options = matches
                .iter()
                .take(3)
                .map(|item| format!("{} ({})", item.fields.title, item.local_id()))
                .collect::<Vec<_>>()
                .join(", ");
            Err(CliError::AmbiguousItem(format!(
                "Title '{query}' is ambiguous; matches: {options}"
            )))
        }
    }
}

/// Find a live watch source by exact name, creating it when absent.
pub async fn get_or_create_source(
    name: &str,
    library: &LibraryService,
) -> Result<Tracked<WatchSourceFields>, CliError> {
    let name = name.trim();
    let sources = library.list::<WatchSourceFields>().await?;
    if let Some(existing) = sources
        .into_iter()
        .find(|source| source.fields.name == name)
    {
        return Ok(existing);
    }
    Ok(library.create(&WatchSourceFields::new(name)).await?)
}

pub async fn list_sync_conflicts(
    limit: usize,
    db_path: &Path,
) -> Result<Vec<SyncConflict>, CliError> {
    let library = open_library(db_path).await?;
    Ok(library.list_conflicts(limit).await?)
}

pub fn format_item_lines(rows: &[ItemRow]) -> Vec<String> {
    let now_ms = Utc::now().timestamp_millis();
    rows.iter()
        .map(|row| {
            let score = row
                .item
                .fields
                .score
                .map_or_else(|| "-".to_string(), |score| format!("{score:.1}"));
            format!(
                "{:>4}  {:<6}  {:<42}  {:<14}  {:>4}  {}",
                row.item.local_id(),
                row.item.fields.kind,
                title_preview(&row.item.fields.title, 40),
                row.category.as_deref().unwrap_or("-"),
                score,
                format_relative_time(row.item.meta.updated_at, now_ms)
            )
        })
        .collect()
}

pub fn item_to_list_item(row: &ItemRow) -> MediaItemListItem {
    let now_ms = Utc::now().timestamp_millis();
    MediaItemListItem {
        id: row.item.local_id().get(),
        kind: row.item.fields.kind.to_string(),
        title: row.item.fields.title.clone(),
        category: row.category.clone(),
        source: row.source.clone(),
        score: row.item.fields.score,
        notes: row.item.fields.notes.clone(),
        created_at: row.item.meta.created_at,
        updated_at: row.item.meta.updated_at,
        relative_time: format_relative_time(row.item.meta.updated_at, now_ms),
        synced: row.item.meta.remote_id.is_some(),
    }
}

pub fn title_preview(title: &str, max_chars: usize) -> String {
    let collapsed = title.split_whitespace().collect::<Vec<_>>().join(" ");

    if collapsed.chars().count() <= max_chars {
        collapsed
    } else {
        let take_len = max_chars.saturating_sub(3);
        let mut truncated = collapsed.chars().take(take_len).collect::<String>();
        truncated.push_str("...");
        truncated
    }
}

pub fn sync_conflict_to_item(conflict: &SyncConflict) -> SyncConflictItem {
    SyncConflictItem {
        id: conflict.id,
        entity: conflict.entity.to_string(),
        kind: conflict.kind.to_string(),
        strategy: conflict.strategy.clone(),
        local_payload: conflict.local_payload.clone(),
        remote_payload: conflict.remote_payload.clone(),
        created_at: conflict.created_at,
        created_at_iso: format_sync_timestamp(conflict.created_at),
        resolved: conflict.resolved,
    }
}

pub fn format_sync_conflict_lines(conflicts: &[SyncConflict]) -> Vec<String> {
    conflicts
        .iter()
        .map(|conflict| {
            format!(
                "{}  {:<21}  {:<16}  local={} remote={}",
                format_sync_timestamp(conflict.created_at),
                conflict.kind,
                conflict.entity,
                payload_label(conflict.local_payload.as_ref()),
                payload_label(conflict.remote_payload.as_ref())
            )
        })
        .collect()
}

/// A human handle for a conflict payload: the title or name when present.
fn payload_label(payload: Option<&Payload>) -> String {
    payload
        .and_then(|fields| fields.get("title").or_else(|| fields.get("name")))
        .and_then(serde_json::Value::as_str)
        .map_or_else(|| "-".to_string(), |text| format!("\"{text}\""))
}

pub fn format_sync_timestamp(timestamp_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(timestamp_ms).map_or_else(
        || timestamp_ms.to_string(),
        |date_time| date_time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;
    let month = 30 * day;
    let year = 365 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else if diff < month {
        format!("{}w ago", diff / week)
    } else if diff < year {
        format!("{}mo ago", diff / month)
    } else {
        format!("{}y ago", diff / year)
    }
}

pub fn resolve_db_path(cli_db_path: Option<PathBuf>) -> PathBuf {
    cli_db_path
        .or_else(|| env::var_os("MEDLEY_DB_PATH").map(PathBuf::from))
        .unwrap_or_else(default_db_path)
}

fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("medley")
        .join("medley.db")
}
