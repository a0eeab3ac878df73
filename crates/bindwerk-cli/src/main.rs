// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// bindwerk — assemble bilevel TIFF scans into PDF documents, driven by an
// assembly script.
//
// Exit status: 0 for a clean run, 1 when the run aborts (unreadable or
// malformed script, context underflow), 2 when the run completes but some
// pages or statements were skipped.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing::warn;

use bindwerk_assembly::Assembler;
use bindwerk_core::{AssemblyConfig, RunReport};
use bindwerk_document::PdfSink;
use bindwerk_image::{FaxEncoder, TiffSourceOpener};

mod script;

#[derive(Parser)]
#[command(
    name = "bindwerk",
    about = "Assemble bilevel TIFF scans into PDF documents",
    version
)]
struct Cli {
    /// Assembly script to execute
    script: PathBuf,

    /// Increase log verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Print the run report as JSON instead of the one-line summary
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();

    match run(&cli) {
        Ok(report) => {
            if cli.json {
                match serde_json::to_string_pretty(&report) {
                    Ok(text) => println!("{text}"),
                    Err(err) => eprintln!("bindwerk: cannot serialise report: {err}"),
                }
            } else {
                println!(
                    "{} page(s) emitted into {} document(s), {} skipped",
                    report.pages_emitted,
                    report.documents.len(),
                    report.pages_skipped
                );
            }
            if report.is_clean() {
                ExitCode::SUCCESS
            } else {
                for error in &report.errors {
                    eprintln!("bindwerk: {error}");
                }
                ExitCode::from(2)
            }
        }
        Err(err) => {
            eprintln!("bindwerk: {err:#}");
            ExitCode::from(1)
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<RunReport> {
    let text = std::fs::read_to_string(&cli.script)
        .with_context(|| format!("cannot read script '{}'", cli.script.display()))?;
    let calls = script::parse_script(&text)?;

    let config = AssemblyConfig::default();
    let opener = TiffSourceOpener {
        default_dpi: config.default_dpi,
    };
    let mut assembler = Assembler::new(
        config,
        Box::new(opener),
        Box::new(FaxEncoder),
        Box::new(PdfSink),
    );

    match script::apply(&calls, &mut assembler) {
        Ok(()) => Ok(assembler.finish()),
        Err(err) => {
            // Close whatever was opened before aborting, so no partially
            // written document handle is leaked.
            let report = assembler.finish();
            warn!(
                pages_emitted = report.pages_emitted,
                "run aborted after structural error"
            );
            Err(err.into())
        }
    }
}
