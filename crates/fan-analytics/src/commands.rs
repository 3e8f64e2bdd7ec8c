use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use fan_core::models::FanRecord;
use fan_core::scoring;
use fan_core::settings::{Command, ExportArgs, FilterArgs, SubmitArgs};
use fan_core::validation::Submission;
use fan_data::export::{self, ExportFormat};
use fan_data::filter;
use fan_data::report::{self, ReportPage};
use fan_data::store::{RecordStore, StoreLock};
use tracing::{info, warn};

/// Execute one subcommand, writing its output to `out`.
///
/// `data_path` is the record file; `filter_state` holds the last-used
/// filters shared by the read-only commands.
pub fn run(
    command: &Command,
    data_path: &Path,
    filter_state: &Path,
    out: &mut dyn Write,
) -> Result<()> {
    match command {
        Command::Submit(args) => submit(args, data_path, out),
        Command::Report { page, filters } => {
            let page: ReportPage = page.parse()?;
            let spec = filters.resolve(filter_state)?;
            let store = load_store(data_path);
            let report = report::build_report(page, store.records(), &spec);
            serde_json::to_writer_pretty(&mut *out, &report)?;
            writeln!(out)?;
            Ok(())
        }
        Command::Export(args) => export(args, data_path, filter_state, out),
        Command::Score { filters } => score(filters, data_path, filter_state, out),
    }
}

// ── submit ─────────────────────────────────────────────────────────────────────

fn submit(args: &SubmitArgs, data_path: &Path, out: &mut dyn Write) -> Result<()> {
    // Validate before touching the store so a bad submission changes nothing.
    let record = Submission::from(args.clone()).into_record()?;
    let engagement = scoring::score(&record);

    let _lock = StoreLock::acquire_with_retry(data_path)?;
    let mut store = load_store(data_path);
    store
        .append(record)
        .with_context(|| format!("saving record to {}", data_path.display()))?;

    info!("stored submission; {} records total", store.len());
    writeln!(
        out,
        "Thank you for your submission! {} records stored. Engagement score {} ({}).",
        store.len(),
        engagement.score,
        engagement.segment
    )?;
    Ok(())
}

// ── export ─────────────────────────────────────────────────────────────────────

fn export(
    args: &ExportArgs,
    data_path: &Path,
    filter_state: &Path,
    out: &mut dyn Write,
) -> Result<()> {
    let format: ExportFormat = args.format.parse()?;
    let columns = export::parse_columns(&args.columns)?;
    let subset = filtered(&args.filters, data_path, filter_state)?;

    match &args.output {
        Some(path) => {
            let rows = export::export_to_file(path, &subset, &columns, format)?;
            writeln!(out, "Exported {} records to {}", rows, path.display())?;
        }
        None => {
            let bytes = export::render(&subset, &columns, format)?;
            out.write_all(&bytes)?;
        }
    }
    Ok(())
}

// ── score ──────────────────────────────────────────────────────────────────────

fn score(
    filters: &FilterArgs,
    data_path: &Path,
    filter_state: &Path,
    out: &mut dyn Write,
) -> Result<()> {
    let subset = filtered(filters, data_path, filter_state)?;
    let rows = report::score_rows(&subset);
    serde_json::to_writer_pretty(&mut *out, &rows)?;
    writeln!(out)?;
    Ok(())
}

// ── Helpers ────────────────────────────────────────────────────────────────────

fn load_store(data_path: &Path) -> RecordStore {
    let store = RecordStore::load(data_path);
    if let Some(e) = store.last_error() {
        warn!("continuing without stored records: {}", e);
    }
    store
}

fn filtered(
    filters: &FilterArgs,
    data_path: &Path,
    filter_state: &Path,
) -> Result<Vec<FanRecord>> {
    let spec = filters.resolve(filter_state)?;
    let store = load_store(data_path);
    Ok(filter::apply(store.records(), &spec))
}
