use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use clap_verbosity_flag::{InfoLevel, Verbosity};
use itertools::Itertools;
use mimalloc::MiMalloc;
use refdoc_extract::{Config, Snapshot};
use refdoc_schemas::ReferenceDocs;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// Build cross-referenced type graphs for API reference documentation from
/// annotated source snapshots.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[command(flatten)]
    verbose: Verbosity<InfoLevel>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract reference docs from a source snapshot
    ///
    /// Resolves every exported type of every package that declares an API
    /// namespace and produces a JSON file with the namespace/version groups
    /// and the type graph they refer to.
    Extract {
        /// Path to the source snapshot (JSON)
        #[arg(short, long)]
        source: PathBuf,

        /// Configuration file (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Maximum indirection depth; overrides the configuration file
        #[arg(long)]
        max_depth: Option<usize>,

        /// Output file path (writes to stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the JSON schema of the extract output
    Schema {
        /// Output file path (writes to stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize structured logging. Output goes to stderr so JSON output
    // on stdout remains clean for piping. Default to warn, allowlist our
    // crates.
    const CRATES: &[&str] = &["refdoc", "refdoc_extract", "refdoc_schemas"];
    let level = cli.verbose.tracing_level_filter();
    let allowlist = CRATES.iter().map(|c| format!("{c}={level}")).join(",");
    let filter = EnvFilter::new(format!("warn,{allowlist}"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_span_events(FmtSpan::CLOSE)
        .init();

    // Stdout must outlive the lock, so we bind it here first.
    let stdout = std::io::stdout();
    let open = |output: Option<PathBuf>| -> Result<Box<dyn Write>> {
        Ok(match output {
            Some(path) => Box::new(BufWriter::new(
                File::create(&path)
                    .with_context(|| format!("creating {}", path.display()))?,
            )),
            None => Box::new(stdout.lock()),
        })
    };

    match cli.command {
        Commands::Extract {
            source,
            config,
            max_depth,
            output,
        } => {
            let mut config = load_config(config.as_deref())?;
            if let Some(max_depth) = max_depth {
                config.max_depth = max_depth;
            }
            let snapshot = Snapshot::from_reader(BufReader::new(
                File::open(&source)
                    .with_context(|| format!("opening {}", source.display()))?,
            ))
            .with_context(|| format!("reading snapshot {}", source.display()))?;

            let mut writer = open(output)?;
            refdoc_extract::run(&snapshot, &config, &mut *writer)?;
            writer.flush()?;
            Ok(())
        }
        Commands::Schema { output } => {
            let schema = schemars::schema_for!(ReferenceDocs);
            let mut writer = open(output)?;
            serde_json::to_writer_pretty(&mut writer, &schema)?;
            writeln!(writer)?;
            writer.flush()?;
            Ok(())
        }
    }
}

/// Loads the configuration file, or the defaults when none is given.
fn load_config(path: Option<&Path>) -> Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    debug!(path = %path.display(), "loading configuration");
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    Config::from_toml_str(&text)
        .with_context(|| format!("parsing {}", path.display()))
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_load_config_defaults() {
        assert_eq!(load_config(None).unwrap(), Config::default());
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "maxDepth = 3\nignoreTypes = [\"List$\"]").unwrap();

        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.max_depth, 3);
        assert_eq!(config.ignore_types, ["List$"]);
    }

    #[test]
    fn test_load_config_reports_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "maxDepth = \"deep\"").unwrap();

        let err = load_config(Some(file.path())).unwrap_err();
        assert!(err.to_string().contains("parsing"));
    }
}
