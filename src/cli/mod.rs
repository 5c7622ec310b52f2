//! CLI subcommands: resources, modules, validate.

use crate::core::loader::{LoadReport, Loader, ModuleSummary};
use crate::core::options::{LoadOptions, SourcePolicy};
use crate::core::types::OutputResourceConfig;
use crate::digest;
use clap::{Args, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Options shared by every subcommand that loads a directory.
#[derive(Args, Debug, Clone)]
pub struct LoadArgs {
    /// Root directory of the configuration (default: current)
    #[arg(default_value = ".")]
    pub dir: PathBuf,

    /// YAML file with load options
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Join module call paths without checking declared sources
    #[arg(long)]
    pub permissive: bool,

    /// Maximum module nesting depth
    #[arg(long)]
    pub max_depth: Option<usize>,

    /// Ignore *.tf.json files
    #[arg(long)]
    pub no_json: bool,
}

/// Output encoding for resource lists.
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print every managed resource in the root module and its children
    Resources {
        #[command(flatten)]
        load: LoadArgs,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },

    /// Print the resolved module tree
    Modules {
        #[command(flatten)]
        load: LoadArgs,
    },

    /// Load the directory and report counts, warnings and output digest
    Validate {
        #[command(flatten)]
        load: LoadArgs,
    },
}

/// Dispatch a CLI command.
pub fn dispatch(cmd: Commands) -> Result<(), String> {
    match cmd {
        Commands::Resources { load, format } => cmd_resources(&load, format),
        Commands::Modules { load } => cmd_modules(&load),
        Commands::Validate { load } => cmd_validate(&load),
    }
}

/// Merge the options file (if any) with command-line overrides.
fn load_options(args: &LoadArgs) -> Result<LoadOptions, String> {
    let mut options = match args.config {
        Some(ref path) => LoadOptions::from_file(path)?,
        None => LoadOptions::default(),
    };
    if args.permissive {
        options.source_policy = SourcePolicy::Permissive;
    }
    if let Some(depth) = args.max_depth {
        options.max_depth = depth;
    }
    if args.no_json {
        options.include_json = false;
    }
    Ok(options)
}

fn load_report(args: &LoadArgs) -> Result<LoadReport, String> {
    let options = load_options(args)?;
    Loader::new(options)
        .load_report(&args.dir)
        .map_err(|e| e.to_string())
}

fn cmd_resources(args: &LoadArgs, format: OutputFormat) -> Result<(), String> {
    let options = load_options(args)?;
    let resources = Loader::new(options)
        .load(&args.dir)
        .map_err(|e| e.to_string())?;
    println!("{}", render_resources(&resources, format)?);
    Ok(())
}

fn cmd_modules(args: &LoadArgs) -> Result<(), String> {
    let report = load_report(args)?;
    print!("{}", render_module_tree(&report));
    Ok(())
}

fn cmd_validate(args: &LoadArgs) -> Result<(), String> {
    let report = load_report(args)?;
    for w in &report.warnings {
        eprintln!("  WARNING: {}", w);
    }
    println!("{}", render_summary(&report)?);
    Ok(())
}

/// Encode a resource list.
pub fn render_resources(
    resources: &[OutputResourceConfig],
    format: OutputFormat,
) -> Result<String, String> {
    match format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(resources).map_err(|e| format!("JSON encode error: {}", e))
        }
        OutputFormat::Yaml => {
            serde_yaml_ng::to_string(resources).map_err(|e| format!("YAML encode error: {}", e))
        }
    }
}

/// One line per module, indented by depth, children under their parent.
pub fn render_module_tree(report: &LoadReport) -> String {
    let mut out = String::new();
    if let Some(root) = report.modules.iter().find(|m| m.path.is_empty()) {
        push_module(&mut out, report, root);
    }
    out
}

fn push_module(out: &mut String, report: &LoadReport, module: &ModuleSummary) {
    let label = if module.path.is_empty() {
        format!("(root) {}", report.root_dir.display())
    } else {
        format!(
            "{} [{}] source={} version={}",
            module.path,
            module.dir,
            module.source.as_deref().unwrap_or("-"),
            module.version.as_deref().unwrap_or("-")
        )
    };
    out.push_str(&"  ".repeat(module.depth));
    out.push_str(&format!("{} ({} resources)\n", label, module.resources));

    // report rows are breadth-first, so siblings keep declaration order
    for child in report
        .modules
        .iter()
        .filter(|m| !m.path.is_empty() && parent_path(&m.path) == module.path)
    {
        push_module(out, report, child);
    }
}

fn parent_path(path: &str) -> &str {
    path.rsplit_once('.').map(|(parent, _)| parent).unwrap_or("")
}

/// Counts and digest of a successful load.
pub fn render_summary(report: &LoadReport) -> Result<String, String> {
    let digest = digest::resource_digest(&report.resources)?;
    Ok(format!(
        "OK: {} ({} modules, {} resources, {} warnings)\n  digest: {}",
        report.root_dir.display(),
        report.modules.len(),
        report.resources.len(),
        report.warnings.len(),
        digest
    ))
}
