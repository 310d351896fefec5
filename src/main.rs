//! CLI entry point for `becky-receipts`.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::NaiveDate;
use clap::{Args, CommandFactory, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use becky_receipts::config::{self, Config, OutputFormat};
use becky_receipts::error::MessageError;
use becky_receipts::export;
use becky_receipts::model::folder::FolderIndexEntry;
use becky_receipts::model::receipt::ReceiptRecord;
use becky_receipts::parser::{eml, folder_index};
use becky_receipts::parser::folder_index::DateRange;
use becky_receipts::receipt::{self, MessageOutcome};
use becky_receipts::scan::{self, ScanOptions, ScanSummary};

/// Extract payment receipts from a Becky! mailbox into CSV or JSON.
#[derive(Parser)]
#[command(name = "becky-receipts", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Mailbox directory to scan (same as `scan <MAILBOX>`)
    #[arg(value_name = "MAILBOX")]
    mailbox: Option<PathBuf>,

    #[command(flatten)]
    scan: ScanArgs,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Args, Clone, Default)]
struct ScanArgs {
    /// Only messages sent on or after this day (YYYY-MM-DD)
    #[arg(short, long, value_name = "DATE", value_parser = parse_day)]
    since: Option<NaiveDate>,

    /// Only messages sent on or before this day (YYYY-MM-DD)
    #[arg(short, long, value_name = "DATE", value_parser = parse_day)]
    until: Option<NaiveDate>,

    /// Write diagnostics for unrecognized messages into this directory
    #[arg(long, value_name = "DIR")]
    dump_dir: Option<PathBuf>,

    /// Emit JSON instead of CSV
    #[arg(long)]
    json: bool,

    /// Write records to this file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Prefix CSV output with a UTF-8 byte order mark
    #[arg(long)]
    bom: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a mailbox and export every receipt found
    Scan {
        mailbox: PathBuf,
        #[command(flatten)]
        args: ScanArgs,
    },
    /// Run the receipt pipeline over a single RFC 822 file
    Parse {
        path: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Write each decoded text/plain part of a message to `<FILE>.NN.txt`
    DumpParts {
        path: PathBuf,
    },
    /// List the entries of a folder index
    Index {
        path: PathBuf,
        #[arg(short, long, value_name = "DATE", value_parser = parse_day)]
        since: Option<NaiveDate>,
        #[arg(short, long, value_name = "DATE", value_parser = parse_day)]
        until: Option<NaiveDate>,
        #[arg(long)]
        json: bool,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

fn parse_day(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| format!("expected YYYY-MM-DD: {e}"))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = config::load_config();

    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    match cli.command {
        Some(Commands::Scan { mailbox, args }) => cmd_scan(&mailbox, &args, &config),
        Some(Commands::Parse { path, json }) => cmd_parse(&path, json),
        Some(Commands::DumpParts { path }) => cmd_dump_parts(&path),
        Some(Commands::Index {
            path,
            since,
            until,
            json,
        }) => cmd_index(&path, since, until, json),
        Some(Commands::Completions { shell }) => cmd_completions(shell),
        Some(Commands::Manpage) => cmd_manpage(),
        None => match cli.mailbox {
            Some(mailbox) => cmd_scan(&mailbox, &cli.scan, &config),
            None => {
                Cli::command().print_help()?;
                Ok(())
            }
        },
    }
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let log_dir = config::cache_dir(config);
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(&log_dir, config::LOG_FILE_NAME);
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "becky-receipts", &mut std::io::stdout());
    Ok(())
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<()> {
    let man = clap_mangen::Man::new(Cli::command());
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::stdout().write_all(&buf)?;
    Ok(())
}

/// Scan a mailbox and write the records.
fn cmd_scan(mailbox: &Path, args: &ScanArgs, config: &Config) -> anyhow::Result<()> {
    if !mailbox.is_dir() {
        anyhow::bail!("Mailbox directory not found: {}", mailbox.display());
    }

    let options = ScanOptions {
        mailbox: mailbox.to_path_buf(),
        range: DateRange::new(args.since, args.until)?,
        index_file_name: config.scan.index_file_name.clone(),
        archive_extension: config.scan.archive_extension.clone(),
        dump_dir: args.dump_dir.clone().or_else(|| config.scan.dump_dir.clone()),
        dump_partial_records: config.scan.dump_partial_records,
    };

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} Scanning [{bar:40.cyan/blue}] {pos}/{len} {wide_msg}")
            .expect("valid template")
            .progress_chars("#>-"),
    );

    let start = Instant::now();
    let report = scan::scan_mailbox(&options, &|done, total, path| {
        pb.set_length(total as u64);
        pb.set_position(done as u64);
        pb.set_message(path.display().to_string());
    })?;
    pb.finish_and_clear();

    let format = if args.json {
        OutputFormat::Json
    } else {
        config.output.format
    };
    let bom = args.bom || config.output.csv_bom;
    write_records(&report.records, format, bom, args.output.as_deref())?;

    print_summary(&report.summary, start.elapsed());
    Ok(())
}

fn write_records(
    records: &[ReceiptRecord],
    format: OutputFormat,
    bom: bool,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    match (format, output) {
        (OutputFormat::Csv, Some(path)) => export::csv::export_csv(records, path, bom),
        (OutputFormat::Csv, None) => export::csv::write_csv(std::io::stdout().lock(), records, bom),
        (OutputFormat::Json, Some(path)) => {
            let file = std::io::BufWriter::new(std::fs::File::create(path)?);
            serde_json::to_writer_pretty(file, records)?;
            Ok(())
        }
        (OutputFormat::Json, None) => {
            println!("{}", serde_json::to_string_pretty(records)?);
            Ok(())
        }
    }
}

/// Summary goes to stderr so stdout stays machine-readable.
fn print_summary(summary: &ScanSummary, elapsed: std::time::Duration) {
    eprintln!();
    eprintln!("  {:<20} {}", "Folder indexes", summary.indexes);
    eprintln!("  {:<20} {}", "Archives", summary.archives);
    eprintln!("  {:<20} {}", "Messages", summary.messages);
    eprintln!("  {:<20} {}", "Receipts", summary.records);
    eprintln!("  {:<20} {}", "  with errors", summary.partial);
    eprintln!("  {:<20} {}", "Skipped", summary.skipped);
    eprintln!("  {:<20} {}", "Unrecognized", summary.failed);
    if summary.unreadable_files > 0 {
        eprintln!("  {:<20} {}", "Unreadable files", summary.unreadable_files);
    }
    eprintln!("  {:<20} {:.2?}", "Elapsed", elapsed);
    eprintln!();
}

/// Run the pipeline over one message file.
fn cmd_parse(path: &Path, json: bool) -> anyhow::Result<()> {
    let raw = eml::read_eml(path)?;
    match receipt::process_message(&raw) {
        Ok(MessageOutcome::Recognized(record)) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&record)?);
            } else {
                println!("{record}");
                if record.has_error {
                    eprintln!("  warning: some fields could not be extracted");
                }
            }
            Ok(())
        }
        Ok(MessageOutcome::Skipped) => {
            println!("  Not a receipt message: {}", path.display());
            Ok(())
        }
        Err(MessageError::Unrecognized(e)) => {
            for trace in &e.traces {
                eprintln!("{trace}");
                eprintln!("--------");
            }
            Err(e.into())
        }
        Err(e) => Err(e.into()),
    }
}

fn cmd_dump_parts(path: &Path) -> anyhow::Result<()> {
    let written = export::parts::dump_text_parts(path)?;
    for p in &written {
        println!("  {}", p.display());
    }
    println!("  Wrote {} part(s)", written.len());
    Ok(())
}

/// Print the entries of one folder index.
fn cmd_index(
    path: &Path,
    since: Option<NaiveDate>,
    until: Option<NaiveDate>,
    json: bool,
) -> anyhow::Result<()> {
    let range = DateRange::new(since, until)?;
    let entries: Vec<FolderIndexEntry> = folder_index::load_folder_index(path)?
        .into_iter()
        .filter(|e| range.contains(&e.sent))
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        print_index_table(&entries);
    }
    Ok(())
}

fn print_index_table(entries: &[FolderIndexEntry]) {
    println!();
    println!("  {} entr{}", entries.len(), if entries.len() == 1 { "y" } else { "ies" });
    println!();
    if entries.is_empty() {
        return;
    }

    println!(
        "  {:<17} {:<12} {:<25} {:<40} {:>3}",
        "Sent", "Archive", "From", "Subject", "Flg"
    );
    println!("  {}", "-".repeat(101));

    for e in entries {
        let from: String = e.from.chars().take(24).collect();
        let subject: String = e.subject.chars().take(39).collect();
        let flags = format!(
            "{}{}{}",
            if e.status.is_read() { ' ' } else { 'N' },
            if e.status.has_attachment() { '@' } else { ' ' },
            if e.status.is_flagged() { '!' } else { ' ' },
        );
        println!(
            "  {:<17} {:<12} {:<25} {:<40} {:>3}",
            e.sent.format("%Y-%m-%d %H:%M"),
            e.file_name,
            from,
            subject,
            flags
        );
    }
    println!();
}
