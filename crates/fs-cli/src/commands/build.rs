//! Build command implementation
//!
//! Loads the project, registers sources, and hands the run to the
//! orchestrator on a blocking thread. Ctrl-C requests cancellation, which is
//! honored before the next table starts.

use anyhow::{Context, Result};
use fs_build::{
    register_sources, BuildObserver, BuildOptions, CancellationToken, Orchestrator, RunReport,
    TableResult, TableState,
};
use fs_core::{Project, TableName};
use fs_quality::Validator;
use indicatif::{ProgressBar, ProgressStyle};

use crate::cli::{BuildArgs, GlobalArgs, OutputFormat};
use crate::commands::common::{self, load_project, ExitCode};

/// Execute the build command
pub async fn execute(args: &BuildArgs, global: &GlobalArgs) -> Result<()> {
    let project = load_project(global)?;
    let options = build_options(args)?;
    let json_mode = args.output == OutputFormat::Json;

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nInterrupt received; stopping after the current table...");
            interrupt.cancel();
        }
    });

    let global = global.clone();
    let report = tokio::task::spawn_blocking(move || {
        run_build(&project, &options, &global, cancel, json_mode)
    })
    .await
    .context("Build task failed")??;

    if json_mode {
        println!(
            "{}",
            report.to_json().context("Failed to serialize run report")?
        );
    } else {
        print!("{}", report.summary());
    }

    match report.exit_code() {
        0 => Ok(()),
        code => Err(ExitCode(code).into()),
    }
}

fn build_options(args: &BuildArgs) -> Result<BuildOptions> {
    Ok(BuildOptions {
        table: common::parse_table(args.table.as_deref())?,
        start: common::parse_table(args.start.as_deref())?,
        end: common::parse_table(args.end.as_deref())?,
        full_refresh: args.full_refresh,
        skip_quality: args.skip_quality,
        run_id: None,
    })
}

fn run_build(
    project: &Project,
    options: &BuildOptions,
    global: &GlobalArgs,
    cancel: CancellationToken,
    json_mode: bool,
) -> Result<RunReport> {
    let backend = common::create_backend(project, global.target.as_deref())?;
    let registry = common::open_registry(project, global.verbose)?;
    let definitions =
        register_sources(project, &backend).context("Failed to register sources")?;

    let orchestrator = Orchestrator::new(
        &definitions,
        project.config.dialect,
        &backend,
        &backend,
        registry.as_ref(),
    )
    .with_validator(Validator::default())
    .with_cancellation(cancel)
    .with_default_sample_pct(project.config.quality.sample_pct.unwrap_or(100));

    let observer = ProgressObserver::new(!json_mode, global.verbose);
    let report = orchestrator
        .run_with_observer(options, &observer)
        .context("Build aborted before any table ran")?;
    observer.finish();
    Ok(report)
}

/// Progress bar plus one `✓`/`✗`/`-` line per finished table.
struct ProgressObserver {
    progress: Option<ProgressBar>,
    verbose: bool,
}

impl ProgressObserver {
    fn new(show: bool, verbose: bool) -> Self {
        let progress = show.then(|| {
            let pb = ProgressBar::new(0);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template(
                        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
                    )
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("#>-"),
            );
            pb
        });
        Self { progress, verbose }
    }

    fn finish(&self) {
        if let Some(pb) = &self.progress {
            pb.finish_and_clear();
        }
    }
}

impl BuildObserver for ProgressObserver {
    fn run_started(&self, run_id: &str, tables: &[TableName]) {
        if self.verbose {
            eprintln!("[verbose] Run {} building {} tables", run_id, tables.len());
        }
        if let Some(pb) = &self.progress {
            pb.set_length(tables.len() as u64);
            pb.suspend(|| println!("Building {} tables...\n", tables.len()));
        }
    }

    fn state_changed(&self, table: &TableName, _from: TableState, to: TableState) {
        if let Some(pb) = &self.progress {
            if !to.is_terminal() {
                pb.set_message(format!("{}: {}", table, to));
            }
        }
    }

    fn table_finished(&self, result: &TableResult) {
        match &self.progress {
            Some(pb) => {
                pb.suspend(|| {
                    println!("{}", result.summary_line());
                    for warning in &result.warnings {
                        println!("      warn: {}", warning);
                    }
                });
                pb.inc(1);
            }
            None if self.verbose => eprintln!("[verbose] {}", result.summary_line()),
            None => {}
        }
    }
}
