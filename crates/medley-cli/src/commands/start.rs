use std::path::Path;

use chrono::Utc;
use medley_core::models::MediaRunFields;

use crate::commands::common::{open_library, resolve_item};
use crate::error::CliError;

pub async fn run_start(item_query: &str, db_path: &Path) -> Result<(), CliError> {
    let library = open_library(db_path).await?;
    let item = resolve_item(item_query, &library).await?;

    let runs = library.list::<MediaRunFields>().await?;
    let next_number = runs
        .iter()
        .filter(|run| run.fields.media_item_id == item.local_id())
        .map(|run| run.fields.run_number)
        .max()
        .unwrap_or(0)
        + 1;

    let mut fields = MediaRunFields::new(item.local_id(), next_number);
    fields.started_at = Some(Utc::now().timestamp_millis());
    let run = library.create(&fields).await?;

    println!("{}", run.local_id());
    Ok(())
}
