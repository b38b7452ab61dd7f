//! Build pipeline orchestration
//!
//! Phases run strictly in order: load, parse (concurrent, joined), id
//! registry, link assembly (single-threaded over path-sorted assets, so
//! graph construction is deterministic), repair, synthetic generation,
//! validation, reachability, registry emission. Violations aggregate
//! across all phases so one attempt reports as many problems as possible;
//! the output directory is cleared up front because no partial output is
//! valid.

use crate::assets::{self, is_diagram};
use crate::context::{BuildConfig, BuildContext};
use crate::links::{self, LinkPolicy, PersonaPolicy};
use crate::registry;
use crate::repair;
use crate::synthetic;
use chrono::Duration;
use std::sync::Arc;
use tokio::task::JoinSet;
use trellis_core::cache::{ContentCache, DEFAULT_MAX_AGE_DAYS};
use trellis_core::{Asset, TrellisError, ROOT_ID};
use trellis_parser::DiagramParser;
use trellis_rules::engine::Violation;

#[derive(Debug, Default)]
pub struct BuildReport {
    pub asset_count: usize,
    pub synthetic_count: usize,
    pub cache_hits: usize,
    /// Element ids stubbed in by the requirement repair pass.
    pub repaired: Vec<String>,
    pub warnings: Vec<Violation>,
}

pub struct GraphBuilder {
    config: BuildConfig,
    policy: Box<dyn LinkPolicy>,
}

impl GraphBuilder {
    pub fn new(config: BuildConfig) -> Self {
        GraphBuilder {
            config,
            policy: Box::new(PersonaPolicy),
        }
    }

    pub fn with_policy(config: BuildConfig, policy: Box<dyn LinkPolicy>) -> Self {
        GraphBuilder { config, policy }
    }

    /// Run one full build. All collected violations are logged before the
    /// error returns; a clean build ends with registries emitted and the
    /// cache flushed.
    pub async fn build(&self) -> anyhow::Result<BuildReport> {
        let mut report = BuildReport::default();

        clear_output_dir(&self.config)?;
        let mut ctx = BuildContext::new(self.config.clone())?;

        let mut assets = assets::load_assets(ctx.root())?;
        report.asset_count = assets.len();
        tracing::info!("Building {} assets", assets.len());

        let cache = Arc::new(ContentCache::load(ctx.root()));
        let parser = Arc::new(DiagramParser::new(Arc::clone(&cache)));

        report.cache_hits += parse_assets(&parser, &mut assets).await?;
        collect_parse_errors(&mut ctx, &assets);

        ctx.registry = links::build_registry(&assets)?;
        for asset in &assets {
            links::assemble_asset_links(&mut ctx, asset, self.policy.as_ref());
        }

        report.repaired = repair::repair_requirements(&mut assets, ctx.config.write_repairs)?;

        // Synthetic assets join the pipeline late but run through the same
        // parse, registration, and link phases.
        let mut generated = synthetic::generate(&ctx, &assets);
        report.synthetic_count = generated.len();
        report.cache_hits += parse_assets(&parser, &mut generated).await?;
        register_synthetic(&mut ctx, &generated)?;
        for asset in &generated {
            links::assemble_asset_links(&mut ctx, asset, self.policy.as_ref());
        }
        assets.extend(generated);

        self.validate(&mut ctx, &assets);
        check_reachability(&mut ctx, &assets);

        // Surface warnings even when the build is about to fail.
        for warning in &ctx.warnings {
            tracing::warn!("[{}] {}", warning.rule_id, warning.message);
        }
        report.warnings = std::mem::take(&mut ctx.warnings);

        if !ctx.errors.is_empty() {
            for error in &ctx.errors {
                tracing::error!("{}", error);
            }
            let summary = ctx
                .errors
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("\n");
            anyhow::bail!("build failed with {} error(s):\n{}", ctx.errors.len(), summary);
        }

        registry::emit(&ctx, &assets)?;

        cache.prune(Duration::days(DEFAULT_MAX_AGE_DAYS));
        if let Err(e) = cache.flush() {
            tracing::warn!("Cache flush failed: {}", e);
        }
        if let Ok(mut parser) = Arc::try_unwrap(parser) {
            parser.shutdown();
        }

        tracing::info!(
            "Build complete: {} assets ({} synthetic), {} cache hits",
            report.asset_count + report.synthetic_count,
            report.synthetic_count,
            report.cache_hits
        );
        Ok(report)
    }

    /// Per-asset rule checks and governance, then project-wide graph
    /// checks. Error-enforced violations aggregate per rule before being
    /// recorded.
    fn validate(&self, ctx: &mut BuildContext, assets: &[Asset]) {
        let mut errors = Vec::new();
        let warnings;
        {
            let rule_ctx = ctx.rule_context();
            let mut outcome = trellis_rules::ValidationOutcome::default();
            for asset in assets {
                outcome.merge(ctx.engine.validate_asset(asset, &rule_ctx));
                for failure in ctx.engine.governance(asset, &rule_ctx) {
                    errors.push(TrellisError::Governance(failure));
                }
            }
            outcome.merge(ctx.engine.validate_project(&rule_ctx));

            errors.extend(group_by_rule(outcome.errors));
            warnings = outcome.warnings;
        }

        ctx.errors.extend(errors);
        ctx.warnings.extend(warnings);
    }
}

fn clear_output_dir(config: &BuildConfig) -> std::io::Result<()> {
    match std::fs::remove_dir_all(&config.output_dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// Parse every diagram asset concurrently and attach the analyses.
/// Returns the number of cache hits.
async fn parse_assets(parser: &Arc<DiagramParser>, assets: &mut [Asset]) -> anyhow::Result<usize> {
    let mut set = JoinSet::new();
    for (index, asset) in assets.iter().enumerate() {
        if !is_diagram(asset) && !asset.synthetic {
            continue;
        }
        let parser = Arc::clone(parser);
        let path = asset.absolute_path.clone();
        let content = asset.raw_content.clone();
        set.spawn(async move {
            let analysis = parser.parse_with_cache(&path, &content).await;
            (index, analysis)
        });
    }

    let mut hits = 0;
    while let Some(joined) = set.join_next().await {
        let (index, analysis) = joined?;
        let analysis = analysis?;
        if analysis.from_cache {
            hits += 1;
        }
        assets[index].analysis = Some(analysis);
    }
    Ok(hits)
}

fn collect_parse_errors(ctx: &mut BuildContext, assets: &[Asset]) {
    for asset in assets {
        let Some(analysis) = &asset.analysis else {
            continue;
        };
        for issue in &analysis.validation_errors {
            ctx.errors.push(TrellisError::Parse {
                path: asset.relative_path.clone(),
                line: issue.line,
                message: issue.message.clone(),
            });
        }
    }
}

fn register_synthetic(ctx: &mut BuildContext, generated: &[Asset]) -> anyhow::Result<()> {
    for asset in generated {
        let Some(id) = &asset.front_matter.id else {
            continue;
        };
        if let Some(existing) = ctx.registry.get(id) {
            anyhow::bail!(TrellisError::GraphIntegrity(format!(
                "synthetic id '{}' collides with {}",
                id,
                existing.display()
            )));
        }
        ctx.registry
            .insert(id.clone(), asset.relative_path.clone());
    }
    Ok(())
}

/// Strict no-orphan policy: every source file must be reachable from the
/// root hub, following links in both directions. A diagram file without a
/// declared id can never be linked, so it is an orphan outright.
fn check_reachability(ctx: &mut BuildContext, assets: &[Asset]) {
    let reached = ctx.graph.reachable_from(ROOT_ID);
    let mut orphaned: Vec<String> = assets
        .iter()
        .filter(|a| !a.synthetic)
        .filter(|a| match &a.front_matter.id {
            Some(id) => !reached.contains(id),
            None => is_diagram(a),
        })
        .map(|a| a.relative_path.display().to_string())
        .collect();
    if !orphaned.is_empty() {
        orphaned.sort();
        ctx.errors.push(TrellisError::GraphIntegrity(format!(
            "files not reachable from the root hub: {}",
            orphaned.join(", ")
        )));
    }
}

/// Fold flat violations into one aggregated error per rule, preserving
/// first-seen rule order.
fn group_by_rule(violations: Vec<Violation>) -> Vec<TrellisError> {
    let mut order: Vec<String> = Vec::new();
    let mut by_rule: std::collections::HashMap<String, Vec<String>> =
        std::collections::HashMap::new();
    for violation in violations {
        if !by_rule.contains_key(&violation.rule_id) {
            order.push(violation.rule_id.clone());
        }
        by_rule
            .entry(violation.rule_id)
            .or_default()
            .push(violation.message);
    }
    order
        .into_iter()
        .map(|rule_id| {
            let report = by_rule.remove(&rule_id).unwrap_or_default().join("\n");
            TrellisError::RuleViolations { rule_id, report }
        })
        .collect()
}
