//! Diagram parsing — per-kind grammars, intent mapping, and the worker pool

pub mod grammars;
pub mod mapper;
pub mod normalize;
pub mod parser;
pub mod pool;


pub use grammars::{first_significant_token, DiagramGrammar, GrammarTable, RawAst};
pub use mapper::IntentMapper;
pub use parser::DiagramParser;
pub use pool::{ParserPool, ParsedDiagram};
