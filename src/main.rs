//! Command-line front end for xmindcase.
//!
//! Converts each FILE with a shared [`Converter`], so repeated inputs are only
//! parsed once, and writes one output per requested format next to the input
//! (or into `-d DIR`, or to stdout with `-p`).

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tracing_subscriber::EnvFilter;

use xmindcase::{Archive, Cli, Conversion, Converter, OutputFormat};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli);

    if cli.list {
        for file in &cli.files {
            list_members(file, &cli)?;
        }
        return Ok(());
    }

    let converter = Arc::new(Converter::new(cli.converter_config()));

    // Inputs convert concurrently; identical contents share one computation.
    let handles: Vec<_> = cli
        .files
        .iter()
        .cloned()
        .map(|file| {
            let converter = Arc::clone(&converter);
            tokio::spawn(async move { converter.convert_path(&file).await })
        })
        .collect();

    for (file, handle) in cli.files.iter().zip(handles) {
        let conversion = handle
            .await?
            .with_context(|| format!("failed to convert {}", file.display()))?;
        report(file, &conversion);

        if cli.preview {
            preview(&conversion);
        } else {
            write_outputs(file, conversion, &cli).await?;
        }
    }

    if let Some(cache) = converter.cache() {
        tracing::debug!(
            hits = cache.hits(),
            misses = cache.misses(),
            entries = cache.len(),
            "conversion cache"
        );
    }

    Ok(())
}

/// Log to stderr. `RUST_LOG` wins over `-v`/`-q`.
fn init_tracing(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_filter()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn report(file: &Path, conversion: &Conversion) {
    let extraction = &conversion.extraction;
    tracing::info!(
        file = %file.display(),
        format = %conversion.workbook.format,
        cases = extraction.cases.len(),
        warnings = extraction.warnings.len(),
        skipped = extraction.skipped_cases,
        "extracted test cases"
    );
}

/// List the members of the container. `-v` prints a detailed table.
fn list_members(file: &Path, cli: &Cli) -> Result<()> {
    let archive = Archive::open_path(file)
        .with_context(|| format!("failed to open {}", file.display()))?;
    let verbose = cli.verbose > 0;

    if cli.files.len() > 1 {
        println!("{}:", file.display());
    }
    if verbose {
        println!(
            "{:>10}  {:>10}  {:>5}  {:>10}  {:>5}  Name",
            "Length", "Size", "Cmpr", "Date", "Time"
        );
        println!("{}", "-".repeat(70));
    }

    let mut total_uncompressed = 0u64;
    let mut total_compressed = 0u64;
    let mut member_count = 0usize;

    for member in archive.members() {
        if !verbose {
            println!("{}", member.name);
            continue;
        }

        let (year, month, day) = member.mod_date();
        let (hour, minute, _second) = member.mod_time();
        println!(
            "{:>10}  {:>10}  {}  {:04}-{:02}-{:02}  {:02}:{:02}  {}",
            member.uncompressed_size,
            member.compressed_size,
            ratio(member.compressed_size, member.uncompressed_size),
            year,
            month,
            day,
            hour,
            minute,
            member.name
        );

        if !member.is_directory {
            total_uncompressed += member.uncompressed_size;
            total_compressed += member.compressed_size;
            member_count += 1;
        }
    }

    if verbose {
        println!("{}", "-".repeat(70));
        println!(
            "{:>10}  {:>10}  {}  {:>21}  {} members ({})",
            total_uncompressed,
            total_compressed,
            ratio(total_compressed, total_uncompressed),
            "",
            member_count,
            format_size(total_uncompressed)
        );
    }

    Ok(())
}

/// Percentage saved by compression.
fn ratio(compressed: u64, uncompressed: u64) -> String {
    if uncompressed > 0 && compressed <= uncompressed {
        format!("{:>4}%", 100 - (compressed * 100 / uncompressed))
    } else {
        "  0%".to_string()
    }
}

fn preview(conversion: &Conversion) {
    for case in &conversion.extraction.cases {
        let mut path = case.suite_path.join(" > ");
        if !path.is_empty() {
            path.push_str(" > ");
        }
        println!(
            "{}{}  [{}, {}]",
            path, case.title, case.priority, case.execution_type
        );
        if !case.precondition.is_empty() {
            println!("    precondition: {}", case.precondition.replace('\n', " "));
        }
        for step in &case.steps {
            if step.expected.is_empty() {
                println!("    {}. {}", step.number, step.action);
            } else {
                println!("    {}. {} => {}", step.number, step.action, step.expected);
            }
        }
    }
    for warning in &conversion.extraction.warnings {
        println!("warning: {warning}");
    }
}

/// Render every requested format in parallel, then write them out in the
/// order they were requested.
async fn write_outputs(file: &Path, conversion: Arc<Conversion>, cli: &Cli) -> Result<()> {
    let formats = cli.formats();
    let renders: Vec<_> = formats
        .iter()
        .map(|&format| {
            let conversion = Arc::clone(&conversion);
            tokio::task::spawn_blocking(move || format.emit(&conversion.extraction.cases))
        })
        .collect();

    let multiple = cli.pipe && (formats.len() > 1 || cli.files.len() > 1);
    let mut stdout = tokio::io::stdout();

    for (format, render) in formats.into_iter().zip(renders) {
        let rendered = render
            .await?
            .with_context(|| format!("failed to render {format} output"))?;

        if cli.pipe {
            if multiple {
                stdout
                    .write_all(format!("--- {} ({format}) ---\n", file.display()).as_bytes())
                    .await?;
            }
            stdout.write_all(rendered.as_bytes()).await?;
            if !rendered.ends_with('\n') {
                stdout.write_all(b"\n").await?;
            }
            continue;
        }

        let output_path = output_path(file, format, cli.output_dir.as_deref());
        if let Some(reason) = skip_reason(output_path.exists(), cli) {
            tracing::warn!(path = %output_path.display(), "skipping: {reason}");
            continue;
        }

        if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&output_path, rendered)
            .await
            .with_context(|| format!("failed to write {}", output_path.display()))?;

        tracing::info!(path = %output_path.display(), "wrote {format} output");
    }

    stdout.flush().await?;
    Ok(())
}

/// Why an output must not be written, if it must not.
fn skip_reason(exists: bool, cli: &Cli) -> Option<&'static str> {
    match (exists, cli.never_overwrite, cli.overwrite) {
        (false, _, _) => None,
        (true, true, _) => Some("file exists"),
        (true, false, false) => Some("file exists, use -o to overwrite"),
        (true, false, true) => None,
    }
}

/// `<dir>/<stem>.<ext>`, where `dir` defaults to the input's directory.
fn output_path(input: &Path, format: OutputFormat, output_dir: Option<&Path>) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "testcases".to_string());
    let dir = output_dir
        .or_else(|| input.parent())
        .unwrap_or_else(|| Path::new(""));
    dir.join(format!("{stem}.{}", format.extension()))
}

/// Format a byte size into a human-readable string.
fn format_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.2} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.2} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.2} KB", size as f64 / KB as f64)
    } else {
        format!("{} bytes", size)
    }
}
