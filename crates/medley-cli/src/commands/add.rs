use std::path::Path;

use medley_core::models::{MediaItemFields, MediaKind};

use crate::commands::common::{get_or_create_source, normalize_arg, open_library, resolve_title};
use crate::error::CliError;

pub async fn run_add(
    kind: MediaKind,
    title_parts: &[String],
    category: Option<&str>,
    source: Option<&str>,
    score: Option<f64>,
    notes: Option<&str>,
    db_path: &Path,
) -> Result<(), CliError> {
    let title = resolve_title(title_parts)?;
    if let Some(score) = score {
        if !(0.0..=10.0).contains(&score) {
            return Err(CliError::ScoreOutOfRange);
        }
    }

    let library = open_library(db_path).await?;

    let mut fields = MediaItemFields::new(kind, title);
    if let Some(name) = normalize_arg(category) {
        fields.category_id = Some(library.get_or_create_category(&name).await?.local_id());
    }
    if let Some(name) = normalize_arg(source) {
        fields.watch_source_id = Some(get_or_create_source(&name, &library).await?.local_id());
    }
    fields.score = score;
    fields.notes = normalize_arg(notes);

    let item = library.create(&fields).await?;
    println!("{}", item.local_id());
    Ok(())
}
