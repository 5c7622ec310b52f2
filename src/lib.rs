//! Terrawalk: flatten a Terraform root module and its local child modules
//! into one ordered list of managed resources.
//!
//! ```no_run
//! use std::path::Path;
//! use terrawalk::{load_iac_dir, LoadOptions};
//!
//! let resources = load_iac_dir(Path::new("infra"), &LoadOptions::default())?;
//! for r in &resources {
//!     println!("{} ({})", r.id, r.module_path);
//! }
//! # Ok::<(), terrawalk::LoadError>(())
//! ```

pub mod cli;
pub mod core;
pub mod digest;

pub use crate::core::error::{ConversionError, GraphBuildError, LoadError};
pub use crate::core::loader::{load_iac_dir, LoadReport, Loader};
pub use crate::core::options::{LoadOptions, SourcePolicy};
pub use crate::core::types::OutputResourceConfig;
