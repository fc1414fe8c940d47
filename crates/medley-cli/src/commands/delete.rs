use std::path::Path;

use medley_core::EntityKind;

use crate::commands::common::{open_library, resolve_item};
use crate::error::CliError;

pub async fn run_delete(item_query: &str, db_path: &Path) -> Result<(), CliError> {
    let library = open_library(db_path).await?;
    let item = resolve_item(item_query, &library).await?;

    library
        .soft_delete(EntityKind::MediaItem, item.local_id())
        .await?;

    println!("{}", item.local_id());
    Ok(())
}
