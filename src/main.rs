use anyhow::Context;
use clap::Parser;
use hashmirror::commands::{self, Collaborators};
use hashmirror::config::{Cli, Command};
use hashmirror::executor::{CancelToken, FileSystem, LocalFs};
use hashmirror::report::RunReport;
use hashmirror::ui::summary::{format_pair_diff, format_run_footer};
use hashmirror::ui::{ProgressReporter, TerminalConfirmer};
use std::path::Path;
use std::process;
use std::sync::Arc;

fn main() {
    let code = match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            1
        }
    };
    process::exit(code);
}

fn run() -> anyhow::Result<i32> {
    let cli = Cli::parse();

    if let Err(e) = hashmirror::logging::init(cli.log_level.as_deref()) {
        eprintln!("warning: logging disabled: {}", e);
    }

    // Config and validation errors surface here, before anything is touched
    let config = cli.resolve_config()?;

    let cancel = CancelToken::new();
    {
        let cancel = cancel.clone();
        ctrlc::set_handler(move || {
            eprintln!("Cancelling: waiting for in-flight operations to finish...");
            cancel.cancel();
        })
        .context("installing Ctrl-C handler")?;
    }

    // Declines on its own when there is no terminal to ask
    let confirmer = TerminalConfirmer::default();
    let fs: Arc<dyn FileSystem> = Arc::new(LocalFs::new(config.delete_method));
    let reporter = ProgressReporter::new(!cli.quiet);
    let ctx = Collaborators::new(&confirmer, fs, cancel).with_observer(&reporter);

    let code = match &cli.command {
        Command::Sync(_) => finish(commands::sync::run(&config, &ctx), cli.report.as_deref())?,
        Command::Restore(_) => {
            finish(commands::restore::run(&config, &ctx), cli.report.as_deref())?
        }
        Command::Diff(_) => {
            let diffs = commands::diff::run(&config, &ctx);
            for pair in &diffs {
                println!("{}", format_pair_diff(pair));
            }
            commands::diff::exit_code(&diffs)
        }
    };
    Ok(code)
}

fn finish(report: RunReport, report_path: Option<&Path>) -> anyhow::Result<i32> {
    if report.pairs.len() > 1 || report.cancelled {
        println!("{}", format_run_footer(&report));
    }
    if let Some(path) = report_path {
        let json = report.to_json().context("serializing run report")?;
        std::fs::write(path, json)
            .with_context(|| format!("writing report to {}", path.display()))?;
    }
    Ok(report.exit_code())
}
