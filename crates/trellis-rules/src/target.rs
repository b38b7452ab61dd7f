//! Rule targeting — id prefix or compiled path pattern

use crate::model::RuleTarget;
use globset::{GlobBuilder, GlobMatcher};
use std::path::Path;

/// A rule applies to an asset if the declared id starts with the rule's
/// id prefix, or the relative path matches the compiled path pattern
/// (`**` arbitrary depth, `*` single segment, `{a,b}` alternation).
pub struct TargetMatcher {
    id_prefix: Option<String>,
    glob: Option<GlobMatcher>,
}

impl TargetMatcher {
    pub fn compile(target: &RuleTarget) -> anyhow::Result<Self> {
        let glob = match &target.path_pattern {
            // literal_separator keeps `*` within one path segment; `**`
            // still crosses directories.
            Some(pattern) => Some(
                GlobBuilder::new(pattern)
                    .literal_separator(true)
                    .build()?
                    .compile_matcher(),
            ),
            None => None,
        };
        Ok(TargetMatcher {
            id_prefix: target.id_prefix.clone(),
            glob,
        })
    }

    pub fn matches(&self, declared_id: Option<&str>, relative_path: &Path) -> bool {
        if let (Some(prefix), Some(id)) = (&self.id_prefix, declared_id) {
            if id.starts_with(prefix.as_str()) {
                return true;
            }
        }
        if let Some(glob) = &self.glob {
            if glob.is_match(relative_path) {
                return true;
            }
        }
        false
    }
}
