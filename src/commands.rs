use crate::cli::{Cli, Commands, RunArgs, ScanArgs, TransferArgs};
use crate::error::{ErrorKind, Result};
use exn::{OptionExt, ResultExt};
use nisupply_config::{Config, ConfigLoader};
use nisupply_library::extract::{ExtractionSpec, extract_fields};
use nisupply_library::scan::scan_all;
use nisupply_library::transfer::{TransferReport, transfer};
use nisupply_library::{RecordTable, RenderPolicy, render_destinations};
use std::io::Write;
use std::path::Path;

impl Cli {
    pub fn run(self) -> Result<()> {
        let mut loader = ConfigLoader::new();
        if let Some(path) = &self.config {
            loader = loader.file(path);
        }
        let mut config = loader.load().or_raise(|| ErrorKind::Config)?;
        match self.command {
            Commands::Scan(args) => scan_command(&mut config, &args),
            Commands::Run(args) => run_command(&mut config, &args),
            Commands::Transfer(args) => transfer_command(&mut config, &args),
        }
    }
}

fn scan_command(config: &mut Config, args: &ScanArgs) -> Result<()> {
    args.input.apply(config);
    let table = build_table(config, args.input.bids)?;
    write_table(&table, args.output.as_deref())
}

fn run_command(config: &mut Config, args: &RunArgs) -> Result<()> {
    args.apply(config);
    let template = config.path_template().or_raise(|| ErrorKind::Config)?.ok_or_raise(|| ErrorKind::NoTemplate)?;
    let mut table = build_table(config, args.input.bids)?;

    let policy = match args.drop_unresolved {
        true => RenderPolicy::DropUnresolved,
        false => RenderPolicy::FailFast,
    };
    let dropped = render_destinations(&mut table, &template, &config.constants, policy).or_raise(|| ErrorKind::Render)?;
    if !dropped.is_empty() {
        tracing::warn!(dropped = dropped.len(), "Some records had no destination and were dropped");
    }

    if let Some(output) = &args.output {
        write_table(&table, Some(output))?;
    }
    if args.dry_run {
        if args.output.is_none() {
            write_table(&table, None)?;
        }
        return Ok(());
    }
    let report = transfer(&table, &config.transfer_options()).or_raise(|| ErrorKind::Transfer)?;
    finish(report)
}

fn transfer_command(config: &mut Config, args: &TransferArgs) -> Result<()> {
    args.transfer.apply(config);
    let table = RecordTable::read_csv_path(&args.table).or_raise(|| ErrorKind::ReadTable(args.table.clone()))?;
    let report = transfer(&table, &config.transfer_options()).or_raise(|| ErrorKind::Transfer)?;
    finish(report)
}

/// Scan, extract, drop records missing a required field, then add ranks.
fn build_table(config: &Config, bids: bool) -> Result<RecordTable> {
    if config.sources.is_empty() {
        exn::bail!(ErrorKind::NoSources);
    }
    let mut table = scan_all(&config.sources, &config.filter_spec(), config.scan_options()).or_raise(|| ErrorKind::Scan)?;

    let mut spec = config.extraction_spec().or_raise(|| ErrorKind::Config)?;
    if bids {
        spec = ExtractionSpec::bids_entities().fields().iter().cloned().fold(spec, ExtractionSpec::with_field);
    }
    extract_fields(&mut table, &spec).or_raise(|| ErrorKind::Extract)?;

    if !config.require.is_empty() {
        let dropped = table.drop_nulls(&config.require).or_raise(|| ErrorKind::Extract)?;
        if dropped > 0 {
            tracing::info!(dropped, remaining = table.len(), "Dropped records missing required fields");
        }
    }
    for (name, rank) in &config.ranks {
        table.add_rank_column(name, &rank.group_by, &rank.order_by).or_raise(|| ErrorKind::Extract)?;
    }
    Ok(table)
}

fn write_table(table: &RecordTable, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => table.write_csv_path(path).or_raise(|| ErrorKind::WriteTable),
        None => {
            let mut stdout = std::io::stdout().lock();
            table.write_csv(&mut stdout).or_raise(|| ErrorKind::WriteTable)?;
            stdout.flush().or_raise(|| ErrorKind::WriteTable)
        },
    }
}

fn finish(report: TransferReport) -> Result<()> {
    let decompressed = report.transferred.iter().filter(|t| t.decompressed).count();
    println!("Transferred {} of {} files ({} decompressed)", report.transferred.len(), report.total(), decompressed);
    report.into_result().or_raise(|| ErrorKind::Transfer)?;
    Ok(())
}
