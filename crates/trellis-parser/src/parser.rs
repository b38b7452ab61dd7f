//! Cache-aware diagram parsing entry point

use crate::grammars::first_significant_token;
use crate::normalize::normalize;
use crate::pool::ParserPool;
use chrono::Utc;
use std::path::Path;
use std::sync::Arc;
use trellis_core::cache::{ArtifactEntry, ContentCache, FORMAT_VERSION};
use trellis_core::model::strip_front_matter;
use trellis_core::{Analysis, DiagramKind, ParseIssue};

pub struct DiagramParser {
    pool: ParserPool,
    cache: Arc<ContentCache>,
}

impl DiagramParser {
    pub fn new(cache: Arc<ContentCache>) -> Self {
        DiagramParser {
            pool: ParserPool::with_default_size(),
            cache,
        }
    }

    pub fn with_pool(cache: Arc<ContentCache>, pool: ParserPool) -> Self {
        DiagramParser { pool, cache }
    }

    /// Parse one diagram, consulting the artifact cache first. The hit
    /// path is synchronous; only a miss dispatches to the worker pool.
    /// A grammar failure becomes a single validation error on the
    /// returned analysis, never an abort of the call.
    pub async fn parse_with_cache(&self, path: &Path, content: &str) -> anyhow::Result<Analysis> {
        let hash = self.cache.file_hash(path, content);
        if let Some(entry) = self.cache.artifact(&hash) {
            tracing::debug!("Cache hit for {}", path.display());
            return Ok(analysis_from_artifact(entry, true));
        }

        let cleaned = clean(content);
        let kind = detect_kind(&cleaned);

        let analysis = if kind == DiagramKind::Unknown {
            // Unknown notation is an empty result, not an error.
            Analysis {
                kind,
                ..Default::default()
            }
        } else {
            match self.pool.parse(kind, cleaned).await? {
                Ok(parsed) => normalize(parsed),
                Err(issue) => failed_analysis(kind, issue),
            }
        };

        self.cache.store_artifact(&hash, artifact_from_analysis(&analysis));
        Ok(analysis)
    }

    /// Synchronous variant for one-off probing outside the build pipeline.
    pub fn parse_blocking(&self, path: &Path, content: &str) -> anyhow::Result<Analysis> {
        let hash = self.cache.file_hash(path, content);
        if let Some(entry) = self.cache.artifact(&hash) {
            return Ok(analysis_from_artifact(entry, true));
        }
        let cleaned = clean(content);
        let kind = detect_kind(&cleaned);
        let analysis = if kind == DiagramKind::Unknown {
            Analysis {
                kind,
                ..Default::default()
            }
        } else {
            match self.pool.parse_blocking(kind, cleaned)? {
                Ok(parsed) => normalize(parsed),
                Err(issue) => failed_analysis(kind, issue),
            }
        };
        self.cache.store_artifact(&hash, artifact_from_analysis(&analysis));
        Ok(analysis)
    }

    /// Stop the worker pool. Called once at the end of a build.
    pub fn shutdown(&mut self) {
        self.pool.shutdown();
    }
}

fn clean(content: &str) -> String {
    strip_front_matter(content)
        .lines()
        .filter(|l| !l.trim_start().starts_with("%%"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn detect_kind(cleaned: &str) -> DiagramKind {
    first_significant_token(cleaned)
        .map(DiagramKind::detect)
        .unwrap_or(DiagramKind::Unknown)
}

fn failed_analysis(kind: DiagramKind, issue: ParseIssue) -> Analysis {
    Analysis {
        kind,
        validation_errors: vec![issue],
        ..Default::default()
    }
}

fn analysis_from_artifact(entry: ArtifactEntry, from_cache: bool) -> Analysis {
    Analysis {
        kind: entry.kind,
        nodes: entry.nodes,
        defined_nodes: entry.defined_nodes,
        relationships: entry.relationships,
        aux_mappings: entry.aux_mappings,
        validation_errors: entry.validation_errors,
        from_cache,
    }
}

fn artifact_from_analysis(analysis: &Analysis) -> ArtifactEntry {
    ArtifactEntry {
        kind: analysis.kind,
        validation_errors: analysis.validation_errors.clone(),
        timestamp: Utc::now(),
        format_version: FORMAT_VERSION,
        nodes: analysis.nodes.clone(),
        defined_nodes: analysis.defined_nodes.clone(),
        relationships: analysis.relationships.clone(),
        aux_mappings: analysis.aux_mappings.clone(),
    }
}
