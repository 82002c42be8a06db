//! meshload command line: load a mesh, print a summary, optionally convert it
//!
//! Settings come from an optional TOML file and are overridden by flags:
//!
//! ```toml
//! [load]
//! format = "obj"
//! normals = "always"
//! tolerance = 0.9
//!
//! [output]
//! format = "slb"
//! ```
use std::fs;
use std::io::stdout;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use meshload_core::{load_mesh, write_mesh, LoadOptions, MeshFormat, NormalPolicy};

pub mod report;

pub const USAGE: &str = "\
Usage: meshload <input> [options]

Options:
  --format <obj|sla|slb>         input format (default: from suffix or contents)
  --normals <auto|always|never>  normal regeneration policy (default: auto)
  --tolerance <cos>              smoothing tolerance, 0.01 to 0.99 (default: 0.707)
  --config <file.toml>           read settings from a TOML file
  --output <path>                write the loaded mesh to <path>
  --output-format <obj|sla|slb>  output format (default: from suffix, .stl is binary)
  -h, --help                     show this help";

/// Output section of the config file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: Option<MeshFormat>,
}

/// Contents of a `--config` file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub load: LoadOptions,
    pub output: OutputConfig,
}

impl Config {
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = Self::from_toml(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        info!("Loaded settings from {:?}", path);
        Ok(config)
    }
}

/// Parsed command-line flags. Unset flags defer to the config file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args {
    pub input: PathBuf,
    pub format: Option<MeshFormat>,
    pub normals: Option<NormalPolicy>,
    pub tolerance: Option<f32>,
    pub config: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub output_format: Option<MeshFormat>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Run(Args),
    Help,
}

fn value<I: Iterator<Item = String>>(args: &mut I, flag: &str) -> Result<String> {
    args.next()
        .with_context(|| format!("Missing value for {flag}"))
}

impl Args {
    /// Parse arguments, excluding the program name.
    pub fn parse<I: IntoIterator<Item = String>>(args: I) -> Result<Command> {
        let mut args = args.into_iter();
        let mut parsed = Args::default();
        let mut input = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "-h" | "--help" => return Ok(Command::Help),
                "--format" => parsed.format = Some(value(&mut args, &arg)?.parse()?),
                "--normals" => {
                    let policy = value(&mut args, &arg)?;
                    parsed.normals = Some(policy.parse().map_err(anyhow::Error::msg)?);
                }
                "--tolerance" => {
                    let tolerance = value(&mut args, &arg)?;
                    parsed.tolerance = Some(
                        tolerance
                            .parse()
                            .with_context(|| format!("Invalid tolerance {tolerance:?}"))?,
                    );
                }
                "--config" => parsed.config = Some(value(&mut args, &arg)?.into()),
                "--output" => parsed.output = Some(value(&mut args, &arg)?.into()),
                "--output-format" => {
                    parsed.output_format = Some(value(&mut args, &arg)?.parse()?)
                }
                flag if flag.starts_with("--") => bail!("Unknown option {flag}"),
                path => {
                    if input.replace(PathBuf::from(path)).is_some() {
                        bail!("Only one input file may be given");
                    }
                }
            }
        }

        parsed.input = input.context("No input file given")?;
        Ok(Command::Run(parsed))
    }

    /// Load options from the config file with flags applied on top.
    pub fn load_options(&self, config: &Config) -> LoadOptions {
        let mut options = config.load;
        if self.format.is_some() {
            options.format = self.format;
        }
        if let Some(normals) = self.normals {
            options.normals = normals;
        }
        if let Some(tolerance) = self.tolerance {
            options.tolerance = tolerance;
        }
        options
    }

    pub fn output_format(&self, config: &Config) -> Option<MeshFormat> {
        self.output_format.or(config.output.format)
    }
}

/// Load, report and optionally convert the input mesh.
pub fn run(args: &Args) -> Result<()> {
    let config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    let options = args.load_options(&config);
    debug!("Load options: {:?}", options);

    let (store, format) = load_mesh(&args.input, &options)
        .with_context(|| format!("Failed to load {}", args.input.display()))?;

    let mut out = stdout();
    report::print_summary(&mut out, &args.input, format, &store)?;

    if let Some(output) = &args.output {
        let token = args.output_format(&config).map(|f| f.token());
        let written = write_mesh(&store, output, token)
            .with_context(|| format!("Failed to write {}", output.display()))?;
        report::print_written(&mut out, output, written)?;
    }
    Ok(())
}
