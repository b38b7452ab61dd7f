//! Build orchestration — asset loading, graph assembly, governance, registries

pub mod assets;
pub mod builder;
pub mod context;
pub mod links;
pub mod registry;
pub mod repair;
pub mod synthetic;


pub use builder::{BuildReport, GraphBuilder};
pub use context::{BuildConfig, BuildContext};
pub use links::{LinkPolicy, PersonaPolicy};
