use std::path::Path;

use crate::commands::common::{open_library, resolve_item};
use crate::error::CliError;

pub async fn run_move(item_query: &str, category: &str, db_path: &Path) -> Result<(), CliError> {
    let library = open_library(db_path).await?;
    let item = resolve_item(item_query, &library).await?;
    let target = library.get_or_create_category(category).await?;

    let id = item.local_id();
    let mut fields = item.fields;
    fields.category_id = Some(target.local_id());
    library.update(id, &fields).await?;

    println!("{id}");
    Ok(())
}
