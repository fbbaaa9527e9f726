pub mod config;
pub mod error;
pub mod fk;
pub mod graph;
pub mod introspection;
pub mod names;

pub use config::Config;
pub use error::{Result, TypegraphError};
pub use graph::{build_graph, GraphBuild, GraphSession, TransformOptions};
