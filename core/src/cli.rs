use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::parser;
use crate::runtime::{Bindings, Report};

#[derive(Parser)]
#[command(name = "uvo")]
#[command(about = "uvo - compile schema DSL text into validators", long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default search)
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct SchemaSource {
    /// Schema file, or schema text with --inline
    pub schema: String,

    /// Treat SCHEMA as schema text instead of a path
    #[arg(long)]
    pub inline: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the lexemes of a schema
    Tokens {
        #[command(flatten)]
        source: SchemaSource,
    },

    /// Print the AST forest of a schema as JSON
    Ast {
        #[command(flatten)]
        source: SchemaSource,
    },

    /// Compile a schema and report compile errors
    Check {
        #[command(flatten)]
        source: SchemaSource,
    },

    /// Validate a JSON document against a schema
    Validate {
        #[command(flatten)]
        source: SchemaSource,

        /// JSON input file ('-' for stdin)
        input: String,

        /// JSON array bound as the schema's errors (`!N` tags)
        #[arg(long)]
        errors: Option<PathBuf>,

        /// JSON array bound as the schema's injections (`$N` and `{N}`)
        #[arg(long)]
        injections: Option<PathBuf>,
    },

    /// Print the effective configuration as TOML
    Config,
}

/// Run the CLI by parsing process arguments
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    run_cli_with_args(cli)
}

/// Run the CLI with provided arguments
pub fn run_cli_from_args(args: Vec<String>) -> Result<()> {
    let cli = Cli::parse_from(args);
    run_cli_with_args(cli)
}

/// Internal function that handles CLI commands
fn run_cli_with_args(cli: Cli) -> Result<()> {
    // Load configuration before executing any command so config errors show first
    let config = Config::builder()
        .config_path(cli.config.as_ref().map(PathBuf::from))
        .build()?;
    init_logging(&config.logging.level);

    let pretty = config.validation.pretty;

    match cli.command {
        Commands::Tokens { source } => {
            let text = source.read()?;
            for lexeme in parser::tokenize(&text)? {
                println!("{}", lexeme);
            }
        }

        Commands::Ast { source } => {
            let text = source.read()?;
            let forest = parser::parse_schema(&text)?;
            println!("{}", render(&forest, pretty)?);
        }

        Commands::Check { source } => {
            let text = source.read()?;
            let template = crate::compile(&text)
                .with_context(|| format!("Failed to compile {}", source.describe()))?;
            println!(
                "✓ Schema compiled ({} named schema(s))",
                template.schema_count()
            );
        }

        Commands::Validate {
            source,
            input,
            errors,
            injections,
        } => {
            let text = source.read()?;
            let template = crate::compile(&text)
                .with_context(|| format!("Failed to compile {}", source.describe()))?;

            let mut bindings = Bindings::new();
            if let Some(path) = errors.or_else(|| config.validation.errors_path.clone()) {
                bindings = bindings.errors(read_array(&path, "errors")?);
            }
            let injections = injections.or_else(|| config.validation.injections_path.clone());
            if let Some(path) = injections {
                bindings = bindings.injections(read_array(&path, "injections")?);
            }

            let value = read_input(&input)?;
            let report = template.bind(bindings).report(value);
            println!("{}", render(&report, pretty)?);

            if !passed(&report, template.collects_errors()) {
                std::process::exit(1);
            }
        }

        Commands::Config => {
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}

/// Install the tracing subscriber: `RUST_LOG` wins over the configured level
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

impl SchemaSource {
    /// The schema text, read from disk unless `--inline`
    pub fn read(&self) -> Result<String> {
        if self.inline {
            return Ok(self.schema.clone());
        }
        fs::read_to_string(&self.schema)
            .with_context(|| format!("Failed to read schema file {}", self.schema))
    }

    fn describe(&self) -> String {
        if self.inline {
            "inline schema".to_string()
        } else {
            format!("schema file {}", self.schema)
        }
    }
}

fn read_input(input: &str) -> Result<Value> {
    let text = if input == "-" {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read input from stdin")?;
        buffer
    } else {
        fs::read_to_string(input).with_context(|| format!("Failed to read input file {}", input))?
    };
    serde_json::from_str(&text).with_context(|| format!("Input {} is not valid JSON", input))
}

/// Errors or injections file: a JSON array, one value per index
fn read_array(path: &Path, what: &str) -> Result<Vec<Value>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {} file {}", what, path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("The {} file {} must hold a JSON array", what, path.display()))
}

/// Under `~error` failures are folded into `{"result", "errors"}`, so a
/// non-null `errors` member means validation failed
fn passed(report: &Report, collects_errors: bool) -> bool {
    if !report.is_valid() {
        return false;
    }
    match &report.value {
        Some(output) if collects_errors => output.get("errors").map_or(true, Value::is_null),
        _ => true,
    }
}

fn render<T: Serialize>(value: &T, pretty: bool) -> Result<String> {
    let rendered = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    Ok(rendered)
}
