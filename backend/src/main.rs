//! tabconv CLI - Convert and clean CSV / Excel files
//!
//! # Commands
//!
//! ```bash
//! tabconv preview data.csv --rows 10                  # Show detected format and first rows
//! tabconv convert data.csv --remove-duplicates --to excel
//! tabconv convert data.xlsx --fill-missing --columns a,b -o out.csv
//! tabconv convert jan.csv feb.csv mar.xlsx --remove-duplicates  # Each file on its own
//! tabconv serve --port 8080                           # Start HTTP server
//! ```

use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use tabconv::api::log_error;
use tabconv::transform::print_source_info;
use tabconv::{
    load_file, output_file_name, process_file, ChartData, ExportFormat, ServerConfig, SourceInfo,
    Table, TransformOptions,
};

/// Width of the longest bar in the text chart
const BAR_WIDTH: f64 = 40.0;

#[derive(Parser)]
#[command(name = "tabconv")]
#[command(about = "Convert and clean CSV and Excel files", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the detected encoding, separator, columns and first rows
    Preview {
        /// Input CSV or XLSX file
        input: PathBuf,

        /// Number of rows to show
        #[arg(short, long, default_value = "5")]
        rows: usize,
    },

    /// Clean files and export them as CSV or Excel
    Convert {
        /// Input CSV or XLSX files, processed independently
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Drop rows equal to an earlier row
        #[arg(long)]
        remove_duplicates: bool,

        /// Fill missing numeric values with the column mean
        #[arg(long)]
        fill_missing: bool,

        /// Columns to keep, comma separated (default: all)
        #[arg(short, long, value_delimiter = ',')]
        columns: Option<Vec<String>>,

        /// Print a bar chart of the first numeric columns
        #[arg(long)]
        chart: bool,

        /// Export format: csv or excel
        #[arg(short, long, default_value = "csv")]
        to: ExportFormat,

        /// Output file, single input only (default: next to each input, with the new extension)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Start HTTP server
    Serve {
        /// Port to listen on (default: TABCONV_PORT or 3000)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Preview { input, rows } => cmd_preview(&input, rows),

        Commands::Convert {
            inputs,
            remove_duplicates,
            fill_missing,
            columns,
            chart,
            to,
            output,
        } => {
            let options = TransformOptions {
                remove_duplicates,
                fill_missing_numeric: fill_missing,
                selected_columns: columns.map(|cols| {
                    cols.into_iter()
                        .map(|c| c.trim().to_string())
                        .filter(|c| !c.is_empty())
                        .collect()
                }),
                show_chart: chart,
                export_format: to,
                ..TransformOptions::default()
            };
            cmd_convert(&inputs, &options, output.as_deref())
        }

        Commands::Serve { port } => cmd_serve(port).await,
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn cmd_preview(input: &Path, rows: usize) -> Result<(), Box<dyn std::error::Error>> {
    let loaded = load_file(input)?;
    print_source_info(&SourceInfo::from(&loaded));

    println!();
    print_table(&loaded.table.head(rows));
    if loaded.table.row_count() > rows {
        println!("... {} more rows", loaded.table.row_count() - rows);
    }
    Ok(())
}

fn cmd_convert(
    inputs: &[PathBuf],
    options: &TransformOptions,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    if output.is_some() && inputs.len() > 1 {
        return Err("-o can only be used with a single input".into());
    }

    let mut failed = 0;
    for input in inputs {
        if let Err(e) = convert_one(input, options, output) {
            log_error(format!("{}: {}", input.display(), e));
            failed += 1;
        }
    }

    if inputs.len() > 1 {
        println!(
            "\n📊 Results: {} converted, {} failed",
            inputs.len() - failed,
            failed
        );
    }

    if failed > 0 {
        return Err(format!("{} of {} files failed", failed, inputs.len()).into());
    }
    Ok(())
}

fn convert_one(
    input: &Path,
    options: &TransformOptions,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let target = match output {
        Some(p) => p.to_path_buf(),
        None => default_output(input, options.export_format)?,
    };

    let result = process_file(input, options)?;

    if let Some(preview) = result.transformed.preview() {
        println!();
        print_table(preview);
    }

    if let Some(ref chart) = result.transformed.chart {
        println!();
        print_chart(chart);
    }

    fs::write(&target, &result.export.bytes)?;
    println!("\n💾 Saved to: {}", target.display());
    Ok(())
}

async fn cmd_serve(port: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let config = ServerConfig::from_env()?.with_port(port);
    tabconv::server::start_server(config).await
}

/// Output path next to the input, named after it with the export extension.
fn default_output(input: &Path, format: ExportFormat) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let target = input.with_file_name(output_file_name(&name, format));

    if target == input {
        return Err(format!(
            "{} would overwrite the input, use -o to pick another output",
            target.display()
        )
        .into());
    }
    Ok(target)
}

fn print_table(table: &Table) {
    let headers: Vec<String> = table.column_names().into_iter().map(String::from).collect();
    let rows: Vec<Vec<String>> = table
        .rows()
        .map(|row| row.into_iter().map(|c| c.to_string()).collect())
        .collect();

    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| {
            rows.iter()
                .map(|r| r[i].chars().count())
                .chain(std::iter::once(h.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let line = |cells: &[String]| {
        cells
            .iter()
            .zip(&widths)
            .map(|(c, w)| format!("{:<width$}", c, width = *w))
            .collect::<Vec<_>>()
            .join(" | ")
    };

    println!("{}", line(&headers));
    println!(
        "{}",
        widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>().join("-+-")
    );
    for row in &rows {
        println!("{}", line(row));
    }
}

fn print_chart(chart: &ChartData) {
    let bars = match chart {
        ChartData::Bar(bars) => bars,
        ChartData::NothingToChart => {
            println!("⚠️  No numeric columns to show in chart");
            return;
        }
    };

    let max = bars
        .series
        .iter()
        .flat_map(|s| s.values.iter().flatten())
        .fold(0.0_f64, |acc, v| acc.max(v.abs()));

    println!("📊 Bar chart");
    for series in &bars.series {
        println!("  {}", series.name);
        for (row, value) in bars.row_index.iter().zip(&series.values) {
            match value {
                Some(v) => {
                    let len = if max > 0.0 {
                        (v.abs() / max * BAR_WIDTH).round() as usize
                    } else {
                        0
                    };
                    println!("  {:>4} {} {}", row, "█".repeat(len), v);
                }
                None => println!("  {:>4} (missing)", row),
            }
        }
    }
}
