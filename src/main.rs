//! ustar - USTAR archive tool

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use log::warn;
use std::process::ExitCode;
use std::sync::Arc;
use ustar_core::{
    append_to_archive, create_archive, extract_archive, list_archive, update_archive,
    ArchiveSettings, FileList, FixedIdentity,
};

mod cli;
use cli::{Cli, Operation};

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            // --help and --version are not failures
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    env_logger::Builder::new()
        .filter_level(cli.log_level())
        .parse_default_env()
        .format_timestamp(None)
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("ustar: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let files: FileList = cli.files.iter().collect();
    let operation = cli.operation();

    let mut settings = ArchiveSettings {
        verify_checksums: cli.verify,
        destination: cli.directory.clone(),
        ..ArchiveSettings::default()
    };
    if cli.owner.is_some() || cli.group.is_some() {
        settings.identity = Arc::new(FixedIdentity::new(cli.owner.clone(), cli.group.clone()));
    }

    let bar = if cli.progress && operation != Operation::List {
        let bar = progress_bar(operation)?;
        let pb = bar.clone();
        settings.progress = Some(Arc::new(move |current: usize, total: usize, msg: &str| {
            if total > 0 {
                pb.set_length(total as u64);
            }
            pb.set_position(current as u64);
            pb.set_message(msg.to_string());
        }));
        Some(bar)
    } else {
        None
    };

    let archive = cli.archive.as_path();
    match operation {
        Operation::Create => {
            create_archive(archive, &files, &settings)
                .with_context(|| format!("failed to create {}", archive.display()))?;
        }
        Operation::Append => {
            append_to_archive(archive, &files, &settings)
                .with_context(|| format!("failed to append to {}", archive.display()))?;
        }
        Operation::Update => {
            update_archive(archive, &files, &settings)
                .with_context(|| format!("failed to update {}", archive.display()))?;
        }
        Operation::List => {
            if !files.is_empty() {
                warn!("ignoring {} file argument(s) given with -t", files.len());
            }
            let names = list_archive(archive, &settings)
                .with_context(|| format!("failed to list {}", archive.display()))?;
            for name in &names {
                println!("{}", name.display());
            }
        }
        Operation::Extract => {
            if !files.is_empty() {
                warn!("ignoring {} file argument(s) given with -x", files.len());
            }
            extract_archive(archive, &settings)
                .with_context(|| format!("failed to extract {}", archive.display()))?;
        }
    }

    if let Some(bar) = bar {
        bar.finish_with_message("done");
    }
    Ok(())
}

fn progress_bar(operation: Operation) -> Result<ProgressBar> {
    // Extraction does not know the entry count up front.
    if operation == Operation::Extract {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {pos} {msg}")?,
        );
        return Ok(bar);
    }

    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );
    Ok(bar)
}
