//! Shared types: configuration units, module calls, resources, graph
//! versions, diagnostics and the exported resource schema.
//!
//! Units are produced once per directory by the parser and never mutated
//! after the graph is built. Declaration order is preserved everywhere via
//! `IndexMap`, which is what keeps the final output deterministic.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

// ============================================================================
// Configuration units
// ============================================================================

/// Every declaration found in the configuration files of one directory.
#[derive(Debug, Clone, Default)]
pub struct ConfigUnit {
    /// Directory the unit was loaded from (absolute)
    pub dir: PathBuf,

    /// Files that contributed to this unit, in load order
    pub files: Vec<PathBuf>,

    /// Managed resources keyed by `type.name` (declaration order)
    pub resources: IndexMap<String, ManagedResource>,

    /// Data resources keyed by `type.name`; loaded, never exported
    pub data_resources: IndexMap<String, ManagedResource>,

    /// Module calls keyed by call name (declaration order)
    pub module_calls: IndexMap<String, ModuleCall>,

    /// Input variables keyed by name
    pub variables: IndexMap<String, Variable>,
}

impl ConfigUnit {
    /// Create an empty unit for a directory.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            ..Self::default()
        }
    }
}

/// Managed (`resource`) or data (`data`) declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceMode {
    Managed,
    Data,
}

/// A single resource declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct ManagedResource {
    pub mode: ResourceMode,

    /// Resource type label, e.g. `aws_s3_bucket`
    pub resource_type: String,

    /// Resource name label
    pub name: String,

    /// Declared body, in whichever syntax the file used
    pub body: ResourceBody,

    /// File the block was declared in
    pub file: PathBuf,

    /// 1-based line of the block header (0 when unknown)
    pub line: usize,
}

impl ManagedResource {
    /// Address inside its module: `type.name` (or `data.type.name`).
    pub fn address(&self) -> String {
        match self.mode {
            ResourceMode::Managed => format!("{}.{}", self.resource_type, self.name),
            ResourceMode::Data => format!("data.{}.{}", self.resource_type, self.name),
        }
    }
}

/// Resource body as written: HCL native syntax or JSON syntax.
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceBody {
    Hcl(hcl::Body),
    Json(serde_json::Map<String, serde_json::Value>),
}

/// A `module "name" { source = ... }` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleCall {
    pub name: String,

    /// Declared source address, exactly as written
    pub source: String,

    /// Optional version constraint (meaningless for local sources)
    pub version: Option<String>,

    pub file: PathBuf,
    pub line: usize,
}

/// A `variable "name" {}` block.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    pub default: Option<serde_json::Value>,
    pub description: Option<String>,

    /// Type constraint rendered back to HCL, e.g. `list(string)`
    pub type_constraint: Option<String>,

    pub file: PathBuf,
}

// ============================================================================
// Module addressing
// ============================================================================

/// Position of a module in the tree: the call names from the root.
///
/// The root module has an empty path and renders as the empty string;
/// `network.subnet` is the `subnet` call inside the `network` call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModulePath(Vec<String>);

impl ModulePath {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Path of a call declared inside this module.
    pub fn child(&self, name: &str) -> Self {
        let mut segments = self.0.clone();
        segments.push(name.to_string());
        Self(segments)
    }

    /// Path of the declaring module; `None` for the root.
    pub fn parent(&self) -> Option<Self> {
        let (_, rest) = self.0.split_last()?;
        Some(Self(rest.to_vec()))
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Display for ModulePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

impl<S: Into<String>> FromIterator<S> for ModulePath {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Placeholder version handed out for each resolved local module.
///
/// Local paths carry no version metadata; the tag only has to be unique
/// and increasing within one load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SyntheticVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl SyntheticVersion {
    /// The `n`-th synthetic version: `1.0.n`.
    pub fn nth(n: u64) -> Self {
        Self {
            major: 1,
            minor: 0,
            patch: n,
        }
    }
}

impl fmt::Display for SyntheticVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Per-load counter producing strictly increasing synthetic versions.
#[derive(Debug, Default)]
pub struct VersionCounter {
    next: u64,
}

impl VersionCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the next version. Never returns the same value twice.
    pub fn allocate(&mut self) -> SyntheticVersion {
        let version = SyntheticVersion::nth(self.next);
        self.next += 1;
        version
    }

    /// Number of versions handed out so far.
    pub fn issued(&self) -> u64 {
        self.next
    }
}

// ============================================================================
// Diagnostics
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
        }
    }
}

/// A parser finding tied (optionally) to a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub summary: String,
    pub detail: String,
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Diagnostic {
    pub fn error(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            summary: summary.into(),
            detail: detail.into(),
            file: None,
        }
    }

    pub fn warning(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            summary: summary.into(),
            detail: detail.into(),
            file: None,
        }
    }

    /// Attach the file the finding came from.
    pub fn in_file(mut self, file: &Path) -> Self {
        self.file = Some(file.to_path_buf());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref file) = self.file {
            write!(f, "{}: ", file.display())?;
        }
        write!(f, "{}: {}", self.severity, self.summary)?;
        if !self.detail.is_empty() {
            write!(f, "; {}", self.detail)?;
        }
        Ok(())
    }
}

/// Render a diagnostic list on one line, for error messages.
pub fn render_diagnostics(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

// ============================================================================
// Exported schema
// ============================================================================

/// Exported, flattened form of one managed resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputResourceConfig {
    /// `type.name`
    pub id: String,

    pub name: String,

    #[serde(rename = "type")]
    pub resource_type: String,

    /// Declaring file, relative to the root directory
    pub source: String,

    /// 1-based line of the block header (0 when unknown)
    pub line: usize,

    /// Dotted module path; empty for the root module
    #[serde(default)]
    pub module_path: String,

    /// Resource body as JSON
    pub config: serde_json::Value,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_path_display() {
        assert_eq!(ModulePath::root().to_string(), "");
        let p = ModulePath::root().child("network").child("subnet");
        assert_eq!(p.to_string(), "network.subnet");
        assert_eq!(p.depth(), 2);
        assert!(!p.is_root());
        assert_eq!(p.parent().unwrap().to_string(), "network");
        assert!(ModulePath::root().parent().is_none());
    }

    #[test]
    fn test_module_path_from_iter() {
        let p: ModulePath = ["a", "b"].into_iter().collect();
        assert_eq!(p.segments(), &["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_version_counter_strictly_increasing() {
        let mut counter = VersionCounter::new();
        let a = counter.allocate();
        let b = counter.allocate();
        let c = counter.allocate();
        assert_eq!(a.to_string(), "1.0.0");
        assert_eq!(c.to_string(), "1.0.2");
        assert!(a < b && b < c);
        assert_eq!(counter.issued(), 3);
    }

    #[test]
    fn test_counters_are_independent() {
        let mut first = VersionCounter::new();
        first.allocate();
        first.allocate();
        let mut second = VersionCounter::new();
        assert_eq!(second.allocate(), SyntheticVersion::nth(0));
    }

    #[test]
    fn test_resource_address() {
        let r = ManagedResource {
            mode: ResourceMode::Managed,
            resource_type: "aws_s3_bucket".to_string(),
            name: "logs".to_string(),
            body: ResourceBody::Json(serde_json::Map::new()),
            file: PathBuf::from("main.tf.json"),
            line: 0,
        };
        assert_eq!(r.address(), "aws_s3_bucket.logs");
        let d = ManagedResource {
            mode: ResourceMode::Data,
            ..r
        };
        assert_eq!(d.address(), "data.aws_s3_bucket.logs");
    }

    #[test]
    fn test_diagnostic_display() {
        let d = Diagnostic::error("Duplicate resource", "aws_vpc.main declared twice")
            .in_file(Path::new("main.tf"));
        assert_eq!(
            d.to_string(),
            "main.tf: error: Duplicate resource; aws_vpc.main declared twice"
        );
        let w = Diagnostic::warning("Unknown block", "");
        assert_eq!(w.to_string(), "warning: Unknown block");
        assert!(!w.is_error());
    }

    #[test]
    fn test_output_resource_serde() {
        let out = OutputResourceConfig {
            id: "aws_vpc.main".to_string(),
            name: "main".to_string(),
            resource_type: "aws_vpc".to_string(),
            source: "main.tf".to_string(),
            line: 3,
            module_path: String::new(),
            config: serde_json::json!({"cidr_block": "10.0.0.0/16"}),
        };
        let json = serde_json::to_string(&out).unwrap();
        assert!(json.contains("\"type\":\"aws_vpc\""));
        let back: OutputResourceConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, out);
    }
}
