use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use log::{info, LevelFilter};

use guarantee_xlsx::reference::{JsonReferenceLoader, ReferenceCache};
use guarantee_xlsx::{ConversionOutput, ConverterBuilder, SheetSelector, XlsxToJsonError};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Normalize bank-guarantee spreadsheets into canonical JSON records",
    long_about = None
)]
struct Cli {
    /// Input workbook (.xlsx or .xls)
    file: PathBuf,
    /// Sheet to convert: 0-based index, sheet name, or `all`
    /// (use `name:<sheet>` for sheets named `all` or with numeric names)
    #[arg(long, default_value = "0")]
    sheet: SheetSelector,
    /// Write the JSON payload to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Skip value cleaning (rules and empty-row removal)
    #[arg(long)]
    no_clean: bool,
    /// Directory containing column_aliases.json, normalization_rules.json and banks.json
    #[arg(long)]
    reference_dir: Option<PathBuf>,
    /// Append pipeline run entries (JSON Lines) to this file
    #[arg(long)]
    log_file: Option<PathBuf>,
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
    if std::env::var("RUST_LOG").is_err() {
        let level = match verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        };
        builder.filter_module("guarantee_xlsx", level);
    }
    let _ = builder.format_timestamp_millis().try_init();
}

fn run(cli: Cli) -> Result<ConversionOutput, XlsxToJsonError> {
    let mut builder = ConverterBuilder::new()
        .with_sheet_selector(cli.sheet)
        .with_cleaning(!cli.no_clean);
    if let Some(dir) = cli.reference_dir {
        builder = builder.with_reference_cache(Arc::new(ReferenceCache::new(
            JsonReferenceLoader::new(dir),
        )));
    }
    if let Some(path) = cli.log_file {
        builder = builder.with_log_path(path);
    }
    let converter = builder.build()?;

    let output = converter.convert_file(&cli.file)?;
    let json = output.to_json_pretty()?;
    match cli.output {
        Some(path) => {
            let mut writer = BufWriter::new(File::create(&path)?);
            writeln!(writer, "{}", json)?;
            writer.flush()?;
            info!("Wrote {}", path.display());
        }
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            writeln!(handle, "{}", json)?;
        }
    }
    Ok(output)
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let file = cli.file.display().to_string();

    match run(cli) {
        Ok(output) => {
            let unknown = output.unknown_columns();
            eprintln!(
                "{}: {} sheet(s), {} records, {} unknown column(s){}",
                file,
                output.sheet_count(),
                output.records_count(),
                unknown.len(),
                if unknown.is_empty() {
                    String::new()
                } else {
                    format!(" [{}]", unknown.join(", "))
                }
            );
        }
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    }
}
