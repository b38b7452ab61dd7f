//! Governance rules — declarative checks evaluated against the link graph

pub mod checks;
pub mod engine;
pub mod model;
pub mod target;

#[cfg(test)]
pub mod tests;

pub use engine::{RuleContext, RuleEngine, ValidationOutcome, Violation};
pub use model::{
    load_rules, Enforcement, HubAnnotation, HubCategory, Rule, RuleChecks, RuleTarget,
    TraceabilityCheck,
};
