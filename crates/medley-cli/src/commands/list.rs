use std::path::Path;

use medley_core::models::MediaKind;

use crate::commands::common::{format_item_lines, item_to_list_item, list_items, MediaItemListItem};
use crate::error::CliError;

pub async fn run_list(
    kind: Option<MediaKind>,
    category: Option<&str>,
    limit: usize,
    as_json: bool,
    db_path: &Path,
) -> Result<(), CliError> {
    let rows = list_items(kind, category, limit, db_path).await?;

    if as_json {
        let json_items = rows
            .iter()
            .map(item_to_list_item)
            .collect::<Vec<MediaItemListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
    } else {
        for line in format_item_lines(&rows) {
            println!("{line}");
        }
    }

    Ok(())
}
