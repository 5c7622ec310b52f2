//! Core loading pipeline: path resolution, unit parsing, module walking,
//! graph building and resource collection.

pub mod collector;
pub mod convert;
pub mod error;
pub mod graph;
pub mod loader;
pub mod options;
pub mod parser;
pub mod path;
pub mod types;
pub mod walker;
