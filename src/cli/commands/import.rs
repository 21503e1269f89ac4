//! Import command handler

use std::path::Path;

use anyhow::Context;

use crate::config::Config;
use crate::db::Store;
use crate::models::anime::{CatalogImport, RelationEdge};

pub async fn cmd_import(config: &Config, path: &str) -> anyhow::Result<()> {
    let import_path = Path::new(path);

    if !import_path.is_file() {
        println!("File does not exist: {path}");
        return Ok(());
    }

    let content = tokio::fs::read_to_string(import_path)
        .await
        .with_context(|| format!("Failed to read catalog file: {path}"))?;
    let catalog: CatalogImport = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse catalog file: {path}"))?;

    let edges: Vec<RelationEdge> = catalog
        .relations
        .iter()
        .map(|record| record.to_edge())
        .filter(|edge| edge.anime_id != edge.related_anime_id)
        .collect();

    let store = Store::new(&config.general.database_path).await?;
    let (anime, new_edges) = store.import_catalog(&catalog.anime, &edges).await?;

    println!("✓ Imported {anime} anime and {new_edges} new relations from {path}");
    println!("Catalog now holds {} anime", store.anime_count().await?);

    Ok(())
}
