//! Rule evaluation engine
//!
//! Violations aggregate per rule before reporting: one build attempt
//! surfaces as many problems as possible. Error-enforced rules abort the
//! build once all their violations are printed; warn-enforced rules log
//! and continue. Cross-cutting governance (folder prefix and filename/id
//! identity) runs unconditionally and is always fatal.

use crate::checks;
use crate::model::{Enforcement, Rule};
use crate::target::TargetMatcher;
use std::collections::HashMap;
use std::path::PathBuf;
use trellis_core::{Asset, LinkGraph};

/// Graph-side inputs the checks evaluate against.
pub struct RuleContext<'a> {
    pub graph: &'a LinkGraph,
    /// Global id registry: declared id → owning file.
    pub registry: &'a HashMap<String, PathBuf>,
    /// Folder → required id prefix, derived from hub-annotated rules.
    pub category_prefixes: &'a HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    pub rule_id: String,
    pub message: String,
}

/// Aggregated evaluation result, split by enforcement level.
#[derive(Debug, Default)]
pub struct ValidationOutcome {
    pub errors: Vec<Violation>,
    pub warnings: Vec<Violation>,
}

impl ValidationOutcome {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }

    pub fn merge(&mut self, other: ValidationOutcome) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    fn record(&mut self, rule: &Rule, messages: Vec<String>) {
        let violations = messages.into_iter().map(|message| Violation {
            rule_id: rule.id.clone(),
            message,
        });
        match rule.enforcement {
            Enforcement::Error => self.errors.extend(violations),
            Enforcement::Warn => self.warnings.extend(violations),
        }
    }
}

pub struct RuleEngine {
    rules: Vec<(Rule, TargetMatcher)>,
}

impl RuleEngine {
    pub fn new(rules: Vec<Rule>) -> anyhow::Result<Self> {
        let compiled = rules
            .into_iter()
            .map(|rule| {
                let matcher = TargetMatcher::compile(&rule.target)?;
                Ok((rule, matcher))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(RuleEngine { rules: compiled })
    }

    pub fn rules(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter().map(|(rule, _)| rule)
    }

    /// Evaluate every targeting rule's content and file-level checks
    /// against one asset.
    pub fn validate_asset(&self, asset: &Asset, ctx: &RuleContext<'_>) -> ValidationOutcome {
        let mut outcome = ValidationOutcome::default();
        let declared_id = asset.front_matter.id.as_deref();

        for (rule, matcher) in &self.rules {
            if !matcher.matches(declared_id, &asset.relative_path) {
                continue;
            }
            let mut messages = Vec::new();
            messages.extend(checks::check_syntax(&rule.checks, asset));
            messages.extend(checks::check_metadata(&rule.checks, asset));
            messages.extend(checks::check_extension(&rule.checks, asset));
            messages.extend(checks::check_structural(&rule.checks, asset));
            messages.extend(checks::check_allowed_node_prefixes(&rule.checks, asset, ctx));
            messages.extend(checks::check_single_ownership_file(&rule.checks, asset));
            outcome.record(rule, messages);
        }
        outcome
    }

    /// Evaluate graph-level checks (ownership arithmetic, access control,
    /// traceability) for every registered id each rule targets by prefix.
    pub fn validate_project(&self, ctx: &RuleContext<'_>) -> ValidationOutcome {
        let mut outcome = ValidationOutcome::default();

        for (rule, _) in &self.rules {
            let Some(prefix) = rule.target.id_prefix.as_deref() else {
                continue;
            };
            let mut messages = Vec::new();
            let mut governed: Vec<&String> = ctx
                .registry
                .keys()
                .filter(|id| id.starts_with(prefix))
                .collect();
            governed.sort();

            for id in governed {
                if rule.checks.single_ownership_prefix.is_some() {
                    messages.extend(checks::check_single_ownership_graph(id, ctx));
                }
                messages.extend(checks::check_access_control(&rule.checks, id, ctx));
                if let Some(trace) = &rule.checks.traceability {
                    messages.extend(checks::check_traceability(trace, id, ctx));
                }
            }
            outcome.record(rule, messages);
        }
        outcome
    }

    /// Unconditional per-asset governance, not rule-gated. Returns hard
    /// build failures.
    pub fn governance(&self, asset: &Asset, ctx: &RuleContext<'_>) -> Vec<String> {
        let mut failures = Vec::new();
        let Some(id) = asset.front_matter.id.as_deref() else {
            return failures;
        };
        if asset.synthetic {
            return failures;
        }

        // Filename/id identity: base name minus extension must equal the
        // declared id.
        let stem = asset.file_stem();
        if stem != id {
            failures.push(format!(
                "{}: file name '{}' does not match declared id '{}'",
                asset.relative_path.display(),
                stem,
                id
            ));
        }

        // Folder-derived prefix consistency.
        if let Some(folder) = asset
            .relative_path
            .components()
            .next()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
        {
            if let Some(prefix) = ctx.category_prefixes.get(&folder) {
                if !id.starts_with(prefix.as_str()) {
                    failures.push(format!(
                        "{}: id '{}' must start with '{}' (folder '{}')",
                        asset.relative_path.display(),
                        id,
                        prefix,
                        folder
                    ));
                }
            }
        }
        failures
    }
}
