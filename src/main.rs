use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::info;

use chromatrace::parsers::{parse_batch, BatchOptions, Vendor};
use chromatrace::resolver::{MetadataProvider, NonInteractive, ResolverSession, TerminalProvider};
use chromatrace::store::{Notifier, NullNotifier};
use chromatrace::{assemble, export, normalize, reduce, ChannelMapping, FlowRateTable};

/// Collect and assemble liquid-chromatography traces from one directory.
#[derive(Parser)]
#[command(name = "chromatrace", version)]
struct Cli {
    /// Directory holding the vendor export files.
    directory: PathBuf,

    /// Which instrument family produced the files.
    #[arg(long, value_enum, default_value_t = Vendor::Waters)]
    system: Vendor,

    /// Flow rate in mL/min, skipping all lookup.
    #[arg(long)]
    flow_rate: Option<f64>,

    /// Detector channel, skipping filename heuristics (Agilent).
    #[arg(long)]
    channel: Option<String>,

    /// Flow-rate lookup config (method-name substring -> mL/min).
    #[arg(long, default_value = "flow_rates.json")]
    flow_rates: PathBuf,

    /// Channel rename config for Shimadzu files.
    #[arg(long)]
    channel_mapping: Option<PathBuf>,

    /// Keep roughly this many points per trace.
    #[arg(long)]
    reduce: Option<usize>,

    /// Use this run name instead of the one derived from the files.
    #[arg(short, long)]
    rename: Option<String>,

    /// Fail instead of prompting when metadata cannot be resolved.
    #[arg(long)]
    non_interactive: bool,

    /// Where to write the output CSVs (default: <directory>/<label>_processed).
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let files = collect_files(&cli.directory, cli.system.extension())?;
    if files.is_empty() {
        bail!(
            "no .{} files found in {}",
            cli.system.extension(),
            cli.directory.display()
        );
    }
    info!("found {} {} file(s)", files.len(), cli.system);

    let flow_table = FlowRateTable::load(&cli.flow_rates)?;
    let channel_mapping = cli
        .channel_mapping
        .as_deref()
        .map(ChannelMapping::load)
        .transpose()
        .context("loading channel mapping")?;

    let opts = BatchOptions {
        flow_rate: cli.flow_rate,
        channel: cli.channel.as_deref(),
        flow_table: flow_table.as_ref(),
        channel_mapping: channel_mapping.as_ref(),
    };

    // Fresh session per invocation; prompts remembered here never outlive
    // the run.
    let mut session = ResolverSession::new();
    let mut terminal = TerminalProvider;
    let mut headless = NonInteractive;
    let provider: &mut dyn MetadataProvider = if cli.non_interactive {
        &mut headless
    } else {
        &mut terminal
    };

    let batch = parse_batch(cli.system, &files, &opts, &mut session, provider)?;
    if batch.files.is_empty() {
        bail!("every file was skipped; nothing to assemble");
    }

    info!("assembling {} file(s)", batch.files.len());
    let table = assemble(&batch)?;
    let mut table = normalize(&table, None, false)?;
    if let Some(points) = cli.reduce {
        table = reduce(&table, points)?;
    }

    let label = cli
        .rename
        .or(batch.run_label)
        .unwrap_or_else(|| "chromatography".to_string());
    let out_dir = cli
        .output
        .unwrap_or_else(|| cli.directory.join(format!("{label}_processed")));
    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("creating {}", out_dir.display()))?;

    let long_path = out_dir.join("long_chromatograms.csv");
    let wide_path = out_dir.join("wide_chromatograms.csv");
    export::write_long_csv(&table, &long_path)?;
    export::write_wide_csv(&table, &wide_path)?;

    // Fire-and-forget hook for chat/dashboard glue; the run never depends
    // on it succeeding.
    NullNotifier.notify(&[long_path.clone(), wide_path.clone()]);

    info!(
        "wrote {} rows to {} and a wide pivot to {}",
        table.len(),
        long_path.display(),
        wide_path.display()
    );
    Ok(())
}

/// Files with the vendor extension (case-insensitive), sorted so the
/// assembled table is deterministic.
fn collect_files(directory: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let entries = std::fs::read_dir(directory)
        .with_context(|| format!("reading {}", directory.display()))?;
    for entry in entries {
        let path = entry?.path();
        let matches = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(extension));
        if path.is_file() && matches {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
