//! CLI command implementations

use std::path::PathBuf;
use std::sync::Arc;
use trellis_build::{BuildConfig, GraphBuilder};
use trellis_core::cache::ContentCache;
use trellis_parser::DiagramParser;

pub async fn build(root: PathBuf, write_repairs: bool) -> anyhow::Result<()> {
    tracing::info!("Building documentation root: {}", root.display());

    let mut config = BuildConfig::new(root);
    config.write_repairs = write_repairs;
    let report = GraphBuilder::new(config).build().await?;

    tracing::info!(
        "Done: {} assets ({} synthetic), {} cache hits, {} warning(s)",
        report.asset_count + report.synthetic_count,
        report.synthetic_count,
        report.cache_hits,
        report.warnings.len()
    );
    Ok(())
}

pub fn probe(root: PathBuf, file: PathBuf) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(&file)?;
    let cache = Arc::new(ContentCache::load(&root));
    let mut parser = DiagramParser::new(Arc::clone(&cache));

    let analysis = parser.parse_blocking(&file, &content)?;
    println!("{}", serde_json::to_string_pretty(&analysis)?);

    if let Err(e) = cache.flush() {
        tracing::warn!("Cache flush failed: {}", e);
    }
    parser.shutdown();
    Ok(())
}

pub fn clear(root: PathBuf) -> anyhow::Result<()> {
    tracing::info!("Clearing cache for: {}", root.display());
    ContentCache::load(&root).clear()?;
    tracing::info!("Cache cleared");
    Ok(())
}
