//! Trellis Core — Documentation data model, link graph, and content cache

pub mod cache;
pub mod error;
pub mod graph;
pub mod model;

#[cfg(test)]
pub mod tests;

pub use cache::{ArtifactEntry, ContentCache, FileMetaEntry, CACHE_DIR, FORMAT_VERSION};
pub use error::TrellisError;
pub use graph::{LinkGraph, NodeMeta, ROOT_ID};
pub use model::{
    Analysis, Asset, DiagramKind, EntityDecl, FrontMatter, ParseIssue, Relationship, ROOT_GUIDE,
};
