//! Directory loading: discover `.tf` / `.tf.json` files and decode them
//! into one [`ConfigUnit`].
//!
//! Files are read in filename order. Override files (`override.tf`,
//! `*_override.tf` and their JSON variants) are applied after every
//! primary file and must target something a primary file declared.
//! Any error diagnostic fails the whole directory.

use super::convert::{expr_to_json, render_expr};
use super::error::LoadError;
use super::options::LoadOptions;
use super::types::*;
use hcl::{Body, Expression, Structure, TemplateExpr};
use log::debug;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Top-level blocks that are valid but carry nothing this loader needs.
const IGNORED_BLOCKS: &[&str] = &[
    "terraform",
    "provider",
    "output",
    "locals",
    "moved",
    "import",
    "check",
    "removed",
];

/// Syntax of a recognized configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Syntax {
    Native,
    Json,
}

/// Configuration files found in a directory, split by role.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFiles {
    pub primary: Vec<PathBuf>,
    pub overrides: Vec<PathBuf>,
}

impl ConfigFiles {
    pub fn is_empty(&self) -> bool {
        self.primary.is_empty() && self.overrides.is_empty()
    }
}

/// Loads configuration units from directories.
#[derive(Debug, Clone, Copy)]
pub struct ConfigParser {
    include_json: bool,
}

impl Default for ConfigParser {
    fn default() -> Self {
        Self { include_json: true }
    }
}

impl ConfigParser {
    pub fn new(include_json: bool) -> Self {
        Self { include_json }
    }

    pub fn from_options(options: &LoadOptions) -> Self {
        Self::new(options.include_json)
    }

    /// Classify a file name; `None` when it is not a configuration file.
    pub fn syntax_of(&self, file_name: &str) -> Option<Syntax> {
        if file_name.starts_with('.')
            || file_name.ends_with('~')
            || (file_name.starts_with('#') && file_name.ends_with('#'))
        {
            return None;
        }
        if file_name.ends_with(".tf.json") {
            return self.include_json.then_some(Syntax::Json);
        }
        if file_name.ends_with(".tf") {
            return Some(Syntax::Native);
        }
        None
    }

    /// List the configuration files of a directory, sorted by name.
    pub fn config_files(&self, dir: &Path) -> std::io::Result<ConfigFiles> {
        let mut names: Vec<String> = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if self.syntax_of(&name).is_some() && entry.path().is_file() {
                names.push(name);
            }
        }
        names.sort();

        let mut files = ConfigFiles::default();
        for name in names {
            let path = dir.join(&name);
            if is_override_file(&name) {
                files.overrides.push(path);
            } else {
                files.primary.push(path);
            }
        }
        Ok(files)
    }

    /// Whether the directory holds at least one configuration file.
    pub fn is_config_dir(&self, dir: &Path) -> bool {
        self.config_files(dir)
            .map(|files| !files.is_empty())
            .unwrap_or(false)
    }

    /// Load every declaration in `dir`. Returns the unit and any warnings.
    pub fn load_config_dir(&self, dir: &Path) -> Result<(ConfigUnit, Vec<Diagnostic>), LoadError> {
        if !self.is_config_dir(dir) {
            return Err(LoadError::NoConfigFiles {
                dir: dir.to_path_buf(),
            });
        }
        let files = self.config_files(dir).map_err(|e| LoadError::Path {
            path: dir.to_path_buf(),
            source: e,
        })?;

        let mut unit = ConfigUnit::new(dir);
        let mut diags = Vec::new();

        for path in &files.primary {
            let decls = self.parse_file(path, &mut diags);
            add_primary(&mut unit, decls, &mut diags);
            unit.files.push(path.clone());
        }
        for path in &files.overrides {
            let decls = self.parse_file(path, &mut diags);
            apply_override(&mut unit, decls, &mut diags);
            unit.files.push(path.clone());
        }

        if diags.iter().any(Diagnostic::is_error) {
            return Err(LoadError::Parse {
                dir: dir.to_path_buf(),
                diagnostics: diags,
            });
        }

        debug!(
            "loaded config dir {} (files={}, resources={}, module_calls={}, variables={})",
            dir.display(),
            unit.files.len(),
            unit.resources.len(),
            unit.module_calls.len(),
            unit.variables.len()
        );
        Ok((unit, diags))
    }

    fn parse_file(&self, path: &Path, diags: &mut Vec<Diagnostic>) -> FileDecls {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                diags.push(Diagnostic::error("Failed to read file", e.to_string()).in_file(path));
                return FileDecls::default();
            }
        };
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        match self.syntax_of(name) {
            Some(Syntax::Json) => decode_json(path, &content, diags),
            _ => decode_native(path, &content, diags),
        }
    }
}

fn is_override_file(name: &str) -> bool {
    let stem = name
        .strip_suffix(".tf.json")
        .or_else(|| name.strip_suffix(".tf"))
        .unwrap_or(name);
    stem == "override" || stem.ends_with("_override")
}

// ============================================================================
// Per-file declarations
// ============================================================================

/// Module call as decoded from one file; `source` is optional in overrides.
#[derive(Debug, Clone)]
struct RawModuleCall {
    name: String,
    source: Option<String>,
    version: Option<String>,
    file: PathBuf,
    line: usize,
}

#[derive(Debug, Default)]
struct FileDecls {
    resources: Vec<ManagedResource>,
    modules: Vec<RawModuleCall>,
    variables: Vec<Variable>,
}

fn decode_native(path: &Path, content: &str, diags: &mut Vec<Diagnostic>) -> FileDecls {
    let mut decls = FileDecls::default();
    let body = match hcl::parse(content) {
        Ok(b) => b,
        Err(e) => {
            diags.push(Diagnostic::error("Invalid HCL syntax", e.to_string()).in_file(path));
            return decls;
        }
    };

    for attr in body.attributes() {
        diags.push(
            Diagnostic::error(
                "Unsupported argument",
                format!("An argument named {:?} is not expected here.", attr.key()),
            )
            .in_file(path),
        );
    }

    for block in body.blocks() {
        let labels: Vec<&str> = block.labels().iter().map(|l| l.as_str()).collect();
        match block.identifier() {
            kind @ ("resource" | "data") => {
                let [resource_type, name] = labels.as_slice() else {
                    diags.push(wrong_labels(path, kind, 2, labels.len()));
                    continue;
                };
                let mode = if kind == "resource" {
                    ResourceMode::Managed
                } else {
                    ResourceMode::Data
                };
                decls.resources.push(ManagedResource {
                    mode,
                    resource_type: resource_type.to_string(),
                    name: name.to_string(),
                    body: ResourceBody::Hcl(block.body().clone()),
                    file: path.to_path_buf(),
                    line: header_line(content, kind, &labels),
                });
            }
            "module" => {
                let [name] = labels.as_slice() else {
                    diags.push(wrong_labels(path, "module", 1, labels.len()));
                    continue;
                };
                if !is_identifier(name) {
                    diags.push(invalid_module_name(path, name));
                    continue;
                }
                let source = string_attr(block.body(), "source", path, name, diags);
                let version = string_attr(block.body(), "version", path, name, diags);
                decls.modules.push(RawModuleCall {
                    name: name.to_string(),
                    source,
                    version,
                    file: path.to_path_buf(),
                    line: header_line(content, "module", &labels),
                });
            }
            "variable" => {
                let [name] = labels.as_slice() else {
                    diags.push(wrong_labels(path, "variable", 1, labels.len()));
                    continue;
                };
                decls
                    .variables
                    .push(decode_native_variable(path, name, block.body(), diags));
            }
            kind if IGNORED_BLOCKS.contains(&kind) => {}
            other => diags.push(
                Diagnostic::warning(
                    "Unrecognized block type",
                    format!("Blocks of type {:?} are ignored.", other),
                )
                .in_file(path),
            ),
        }
    }

    decls
}

fn decode_native_variable(
    path: &Path,
    name: &str,
    body: &Body,
    diags: &mut Vec<Diagnostic>,
) -> Variable {
    let mut var = Variable {
        name: name.to_string(),
        default: None,
        description: None,
        type_constraint: None,
        file: path.to_path_buf(),
    };
    for attr in body.attributes() {
        match attr.key() {
            "default" => match expr_to_json(attr.expr()) {
                Ok(v) => var.default = Some(v),
                Err(e) => diags.push(
                    Diagnostic::error(
                        "Invalid default value for variable",
                        format!("variable {:?}: {}", name, e),
                    )
                    .in_file(path),
                ),
            },
            "description" => var.description = literal_string(attr.expr()),
            "type" => var.type_constraint = render_expr(attr.expr()).ok(),
            _ => {}
        }
    }
    var
}

/// A literal string attribute; anything else is an error diagnostic.
fn string_attr(
    body: &Body,
    key: &str,
    path: &Path,
    module: &str,
    diags: &mut Vec<Diagnostic>,
) -> Option<String> {
    let attr = body.attributes().find(|a| a.key() == key)?;
    let value = literal_string(attr.expr());
    if value.is_none() {
        diags.push(
            Diagnostic::error(
                "Invalid value for module argument",
                format!("module {:?}: {:?} must be a literal string", module, key),
            )
            .in_file(path),
        );
    }
    value
}

fn literal_string(expr: &Expression) -> Option<String> {
    match expr {
        Expression::String(s) => Some(s.clone()),
        Expression::TemplateExpr(t) => match t.as_ref() {
            TemplateExpr::QuotedString(s) if !s.contains("${") && !s.contains("%{") => {
                Some(s.clone())
            }
            _ => None,
        },
        _ => None,
    }
}

/// Terraform identifier: a letter or underscore, then letters, digits,
/// underscores or dashes. Module names become path segments, so nothing
/// else is accepted.
fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn invalid_module_name(path: &Path, name: &str) -> Diagnostic {
    Diagnostic::error(
        "Invalid module instance name",
        format!(
            "{:?} is not a valid identifier: a name must start with a letter or underscore \
             and may contain only letters, digits, underscores and dashes.",
            name
        ),
    )
    .in_file(path)
}

fn wrong_labels(path: &Path, kind: &str, want: usize, got: usize) -> Diagnostic {
    Diagnostic::error(
        format!("Invalid {} block", kind),
        format!("A {} block requires {} label(s), found {}.", kind, want, got),
    )
    .in_file(path)
}

/// 1-based line of a block header such as `resource "aws_vpc" "main" {`.
fn header_line(content: &str, keyword: &str, labels: &[&str]) -> usize {
    let mut pattern = format!(r"(?m)^[ \t]*{}", regex::escape(keyword));
    for label in labels {
        pattern.push_str(&format!(r#"[ \t]+"?{}"?"#, regex::escape(label)));
    }
    pattern.push_str(r"[ \t]*\{");
    Regex::new(&pattern)
        .ok()
        .and_then(|re| re.find(content))
        .map(|m| content[..m.start()].matches('\n').count() + 1)
        .unwrap_or(0)
}

fn decode_json(path: &Path, content: &str, diags: &mut Vec<Diagnostic>) -> FileDecls {
    let mut decls = FileDecls::default();
    let root: Value = match serde_json::from_str(content) {
        Ok(v) => v,
        Err(e) => {
            diags.push(Diagnostic::error("Invalid JSON syntax", e.to_string()).in_file(path));
            return decls;
        }
    };
    let Some(root) = json_object(&root, "root", path, diags) else {
        return decls;
    };

    for (key, value) in root {
        match key.as_str() {
            kind @ ("resource" | "data") => {
                let mode = if kind == "resource" {
                    ResourceMode::Managed
                } else {
                    ResourceMode::Data
                };
                let Some(types) = json_object(value, kind, path, diags) else {
                    continue;
                };
                for (resource_type, named) in types {
                    let Some(named) = json_object(named, resource_type, path, diags) else {
                        continue;
                    };
                    for (name, body) in named {
                        let Some(body) = json_object(body, name, path, diags) else {
                            continue;
                        };
                        decls.resources.push(ManagedResource {
                            mode,
                            resource_type: resource_type.clone(),
                            name: name.clone(),
                            body: ResourceBody::Json(body.clone()),
                            file: path.to_path_buf(),
                            line: 0,
                        });
                    }
                }
            }
            "module" => {
                let Some(calls) = json_object(value, "module", path, diags) else {
                    continue;
                };
                for (name, body) in calls {
                    if !is_identifier(name) {
                        diags.push(invalid_module_name(path, name));
                        continue;
                    }
                    let Some(body) = json_object(body, name, path, diags) else {
                        continue;
                    };
                    decls.modules.push(RawModuleCall {
                        name: name.clone(),
                        source: json_string(body, "source", name, path, diags),
                        version: json_string(body, "version", name, path, diags),
                        file: path.to_path_buf(),
                        line: 0,
                    });
                }
            }
            "variable" => {
                let Some(vars) = json_object(value, "variable", path, diags) else {
                    continue;
                };
                for (name, body) in vars {
                    let Some(body) = json_object(body, name, path, diags) else {
                        continue;
                    };
                    decls.variables.push(Variable {
                        name: name.clone(),
                        default: body.get("default").cloned(),
                        description: body
                            .get("description")
                            .and_then(Value::as_str)
                            .map(str::to_string),
                        type_constraint: body
                            .get("type")
                            .and_then(Value::as_str)
                            .map(str::to_string),
                        file: path.to_path_buf(),
                    });
                }
            }
            // JSON syntax comment key
            "//" => {}
            kind if IGNORED_BLOCKS.contains(&kind) => {}
            other => diags.push(
                Diagnostic::warning(
                    "Unrecognized block type",
                    format!("Blocks of type {:?} are ignored.", other),
                )
                .in_file(path),
            ),
        }
    }

    decls
}

fn json_object<'a>(
    value: &'a Value,
    what: &str,
    path: &Path,
    diags: &mut Vec<Diagnostic>,
) -> Option<&'a Map<String, Value>> {
    let obj = value.as_object();
    if obj.is_none() {
        diags.push(
            Diagnostic::error(
                "Incorrect JSON value type",
                format!("Expected a JSON object for {:?}.", what),
            )
            .in_file(path),
        );
    }
    obj
}

fn json_string(
    body: &Map<String, Value>,
    key: &str,
    module: &str,
    path: &Path,
    diags: &mut Vec<Diagnostic>,
) -> Option<String> {
    let value = body.get(key)?;
    let s = value.as_str().map(str::to_string);
    if s.is_none() {
        diags.push(
            Diagnostic::error(
                "Invalid value for module argument",
                format!("module {:?}: {:?} must be a string", module, key),
            )
            .in_file(path),
        );
    }
    s
}

// ============================================================================
// Merging into the unit
// ============================================================================

fn add_primary(unit: &mut ConfigUnit, decls: FileDecls, diags: &mut Vec<Diagnostic>) {
    for resource in decls.resources {
        let map = match resource.mode {
            ResourceMode::Managed => &mut unit.resources,
            ResourceMode::Data => &mut unit.data_resources,
        };
        let key = format!("{}.{}", resource.resource_type, resource.name);
        if let Some(existing) = map.get(&key) {
            diags.push(
                Diagnostic::error(
                    "Duplicate resource configuration",
                    format!(
                        "{} was already declared at {}:{}",
                        resource.address(),
                        existing.file.display(),
                        existing.line
                    ),
                )
                .in_file(&resource.file),
            );
            continue;
        }
        map.insert(key, resource);
    }

    for raw in decls.modules {
        if let Some(existing) = unit.module_calls.get(&raw.name) {
            diags.push(
                Diagnostic::error(
                    "Duplicate module call",
                    format!(
                        "module {:?} was already declared at {}:{}",
                        raw.name,
                        existing.file.display(),
                        existing.line
                    ),
                )
                .in_file(&raw.file),
            );
            continue;
        }
        let Some(source) = raw.source else {
            diags.push(
                Diagnostic::error(
                    "Missing required argument",
                    format!("module {:?}: the argument \"source\" is required", raw.name),
                )
                .in_file(&raw.file),
            );
            continue;
        };
        unit.module_calls.insert(
            raw.name.clone(),
            ModuleCall {
                name: raw.name,
                source,
                version: raw.version,
                file: raw.file,
                line: raw.line,
            },
        );
    }

    for var in decls.variables {
        if unit.variables.contains_key(&var.name) {
            diags.push(
                Diagnostic::error(
                    "Duplicate variable declaration",
                    format!("variable {:?} was already declared", var.name),
                )
                .in_file(&var.file),
            );
            continue;
        }
        unit.variables.insert(var.name.clone(), var);
    }
}

fn apply_override(unit: &mut ConfigUnit, decls: FileDecls, diags: &mut Vec<Diagnostic>) {
    for over in decls.resources {
        let map = match over.mode {
            ResourceMode::Managed => &mut unit.resources,
            ResourceMode::Data => &mut unit.data_resources,
        };
        let key = format!("{}.{}", over.resource_type, over.name);
        let Some(existing) = map.get_mut(&key) else {
            diags.push(
                Diagnostic::error(
                    "Missing resource to override",
                    format!("there is no {} in the primary files", over.address()),
                )
                .in_file(&over.file),
            );
            continue;
        };
        match merge_bodies(&existing.body, &over.body) {
            Ok(body) => existing.body = body,
            Err(detail) => diags.push(
                Diagnostic::error(
                    "Cannot merge override",
                    format!("{}: {}", over.address(), detail),
                )
                .in_file(&over.file),
            ),
        }
    }

    for over in decls.modules {
        let Some(existing) = unit.module_calls.get_mut(&over.name) else {
            diags.push(
                Diagnostic::error(
                    "Missing module call to override",
                    format!("there is no module {:?} in the primary files", over.name),
                )
                .in_file(&over.file),
            );
            continue;
        };
        if let Some(source) = over.source {
            existing.source = source;
        }
        if over.version.is_some() {
            existing.version = over.version;
        }
    }

    for over in decls.variables {
        let Some(existing) = unit.variables.get_mut(&over.name) else {
            diags.push(
                Diagnostic::error(
                    "Missing base variable declaration to override",
                    format!("there is no variable {:?} in the primary files", over.name),
                )
                .in_file(&over.file),
            );
            continue;
        };
        if over.default.is_some() {
            existing.default = over.default;
        }
        if over.description.is_some() {
            existing.description = over.description;
        }
        if over.type_constraint.is_some() {
            existing.type_constraint = over.type_constraint;
        }
    }
}

/// Override semantics: arguments replace by name, nested blocks replace
/// every block of the same type.
fn merge_bodies(base: &ResourceBody, over: &ResourceBody) -> Result<ResourceBody, String> {
    match (base, over) {
        (ResourceBody::Hcl(base), ResourceBody::Hcl(over)) => {
            Ok(ResourceBody::Hcl(merge_hcl_bodies(base, over)))
        }
        (ResourceBody::Json(base), ResourceBody::Json(over)) => {
            let mut merged = base.clone();
            for (k, v) in over {
                merged.insert(k.clone(), v.clone());
            }
            Ok(ResourceBody::Json(merged))
        }
        _ => Err("overriding across native and JSON syntax is not supported".to_string()),
    }
}

fn merge_hcl_bodies(base: &Body, over: &Body) -> Body {
    let base_keys: HashSet<&str> = base.attributes().map(|a| a.key()).collect();
    let over_kinds: HashSet<&str> = over.blocks().map(|b| b.identifier()).collect();
    let mut merged: Vec<Structure> = Vec::new();

    for attr in base.attributes() {
        let chosen = over
            .attributes()
            .find(|o| o.key() == attr.key())
            .unwrap_or(attr);
        merged.push(Structure::Attribute(chosen.clone()));
    }
    for attr in over.attributes() {
        if !base_keys.contains(attr.key()) {
            merged.push(Structure::Attribute(attr.clone()));
        }
    }
    for block in base.blocks() {
        if !over_kinds.contains(block.identifier()) {
            merged.push(Structure::Block(block.clone()));
        }
    }
    for block in over.blocks() {
        merged.push(Structure::Block(block.clone()));
    }

    merged.into_iter().collect()
}
