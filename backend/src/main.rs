//! Wellflow CLI - Transpose, normalize and summarize plate-reader exports
//!
//! # Main Commands
//!
//! ```bash
//! wellflow run plate.xlsx                    # All three stages
//! wellflow transpose plate.xlsx              # -> plate_transposed.xlsx
//! wellflow normalize plate_transposed.xlsx   # -> plate_transposed_normalized.xlsx
//! wellflow fp-auc plate_normalized.xlsx      # -> plate_FP_AUC.xlsx
//! wellflow serve                             # Start HTTP server (port 3000)
//! ```
//!
//! # Debug Commands
//!
//! ```bash
//! wellflow inspect plate.xlsx --rows 12      # Dump the first rows as JSON
//! ```

use clap::{Args, Parser, Subcommand};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use wellflow::{
    load_grid, normalize_file, run_all_file, summarize_file, transpose_file, Cell,
    NormalizeMethod, PipelineConfig, StageReport,
};

#[derive(Parser)]
#[command(name = "wellflow")]
#[command(about = "Transpose, normalize and summarize plate-reader exports", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reorient a raw export so wells run across columns
    Transpose {
        /// Raw export (xlsx, xls, ods, csv)
        input: PathBuf,

        /// Output file (default: <input>_transposed.xlsx)
        output: Option<PathBuf>,

        /// Top-left cell of the region to transpose
        #[arg(long)]
        start_cell: Option<String>,
    },

    /// Rebase every well against its baseline
    Normalize {
        /// Transposed grid
        input: PathBuf,

        /// Output file (default: <input>_normalized.xlsx)
        output: Option<PathBuf>,

        #[command(flatten)]
        opts: NormalizeOpts,
    },

    /// First Peak and AUC of every well
    FpAuc {
        /// Normalized grid
        input: PathBuf,

        /// Output file (default: <input>_FP_AUC.xlsx)
        output: Option<PathBuf>,
    },

    /// Full pipeline: transpose -> normalize -> fp-auc (average method only)
    Run {
        /// Raw export
        input: PathBuf,

        /// Top-left cell of the region to transpose
        #[arg(long)]
        start_cell: Option<String>,

        #[command(flatten)]
        opts: NormalizeOpts,
    },

    /// Print the first rows of a grid as JSON
    Inspect {
        /// Any supported grid file
        input: PathBuf,

        /// Number of rows to print
        #[arg(short, long, default_value = "10")]
        rows: usize,
    },

    /// Start HTTP server
    Serve {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[derive(Args)]
struct NormalizeOpts {
    /// Normalizer variant
    #[arg(long, value_enum)]
    method: Option<NormalizeMethod>,

    /// Time-zero variant: only normalize rows up to this many seconds
    #[arg(long)]
    max_seconds: Option<f64>,

    /// Average variant: number of leading reads in the baseline
    #[arg(long)]
    first_n_reads: Option<usize>,

    /// Average variant: well row letters to keep, e.g. "A, B"
    #[arg(long)]
    filter_letters: Option<String>,

    /// Average variant: well column numbers to keep, e.g. "1 to 12"
    #[arg(long)]
    filter_range: Option<String>,
}

impl NormalizeOpts {
    fn apply(self, config: &mut PipelineConfig) {
        if let Some(method) = self.method {
            config.method = method;
        }
        if self.max_seconds.is_some() {
            config.max_seconds = self.max_seconds;
        }
        if let Some(n) = self.first_n_reads {
            config.first_n_reads = n;
        }
        if self.filter_letters.is_some() {
            config.filter_letters = self.filter_letters;
        }
        if self.filter_range.is_some() {
            config.filter_range = self.filter_range;
        }
    }
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result = match PipelineConfig::from_env() {
        Ok(config) => {
            init_tracing(&config.log_level);
            run(cli.command, config).await
        }
        Err(e) => Err(e.into()),
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(command: Commands, mut config: PipelineConfig) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Transpose {
            input,
            output,
            start_cell,
        } => {
            if let Some(cell) = start_cell {
                config.start_cell = cell;
            }
            let report = transpose_file(&input, output.as_deref(), &config)?;
            print_report(&report);
        }

        Commands::Normalize {
            input,
            output,
            opts,
        } => {
            opts.apply(&mut config);
            eprintln!("⚙️  Method: {}", config.method);
            let report = normalize_file(&input, output.as_deref(), &config)?;
            print_report(&report);
        }

        Commands::FpAuc { input, output } => {
            let report = summarize_file(&input, output.as_deref())?;
            print_report(&report);
        }

        Commands::Run {
            input,
            start_cell,
            opts,
        } => {
            if let Some(cell) = start_cell {
                config.start_cell = cell;
            }
            opts.apply(&mut config);
            cmd_run(&input, &config)?;
        }

        Commands::Inspect { input, rows } => cmd_inspect(&input, rows)?,

        Commands::Serve { port } => {
            if let Some(port) = port {
                config.port = port;
            }
            wellflow::server::start_server(config).await?;
        }
    }

    Ok(())
}

fn cmd_run(input: &Path, config: &PipelineConfig) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Processing: {}", input.display());
    eprintln!("   Start cell: {}", config.start_cell);
    eprintln!("   Method: {}", config.method);

    let reports = run_all_file(input, config)?;
    for report in &reports {
        print_report(report);
    }

    eprintln!("\n✨ Done!");
    Ok(())
}

fn cmd_inspect(input: &Path, rows: usize) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("🔍 Inspecting: {}", input.display());

    let grid = load_grid(input)?;
    eprintln!("   {} rows x {} columns", grid.height(), grid.width());

    let preview: Vec<Vec<Value>> = grid
        .rows()
        .iter()
        .take(rows)
        .map(|row| row.iter().map(cell_to_json).collect())
        .collect();

    let json = json!({
        "rows": grid.height(),
        "columns": grid.width(),
        "preview": preview,
    });
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

fn cell_to_json(cell: &Cell) -> Value {
    match cell {
        Cell::Empty => Value::Null,
        Cell::Number(n) => json!(n),
        Cell::Text(s) => Value::String(s.clone()),
    }
}

fn print_report(report: &StageReport) {
    eprintln!(
        "✅ {}: {} rows x {} columns",
        report.stage, report.rows, report.columns
    );
    eprintln!("   💾 Saved to: {}", report.output.display());
}
