//! xxmanifest CLI - parallel XXH3 manifests for file trees

use clap::Parser;
use std::io::BufRead;
use std::path::Path;
use tracing_subscriber::EnvFilter;
use xxmanifest::config::{parse_size, CliArgs, Commands, ManifestConfig, ReportFormat};
use xxmanifest::core::ManifestPipeline;
use xxmanifest::error::{ManifestError, Result};
use xxmanifest::progress::ProgressReporter;
use xxmanifest::verify::{default_base_dir, read_manifest, Verifier};

fn main() {
    let args = CliArgs::parse();

    // RUST_LOG wins; -v only raises the default
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(match args.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        })
    });
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if args.log_json {
        builder.json().init();
    } else {
        builder.init();
    }

    let pause = args.pause;
    let code = match run(args) {
        Ok(true) => 0,
        Ok(false) => 1,
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    };

    if pause {
        wait_for_enter();
    }
    std::process::exit(code);
}

/// Returns whether the run was clean
fn run(args: CliArgs) -> Result<bool> {
    if let Some(command) = &args.command {
        return handle_command(command, &args);
    }

    let config = ManifestConfig::from_cli(&args).map_err(ManifestError::ConfigError)?;

    if args.verbose > 0 {
        print_config(&config);
    }

    let progress = if args.progress && !args.quiet {
        ProgressReporter::new()
    } else {
        ProgressReporter::disabled()
    };

    let (manifest, stats) = ManifestPipeline::new(config)
        .with_progress(progress)
        .run()?;

    if !args.quiet {
        match args.report_format {
            ReportFormat::Text => stats.print_summary(&manifest),
            ReportFormat::Json => println!("{}", stats.to_json(&manifest)),
        }
    }

    Ok(stats.is_success())
}

fn handle_command(command: &Commands, args: &CliArgs) -> Result<bool> {
    match command {
        Commands::Verify {
            manifest,
            source,
            threads,
            all,
        } => cmd_verify(manifest, source.as_deref(), *threads, *all, args),
    }
}

fn cmd_verify(
    manifest: &Path,
    source: Option<&Path>,
    threads: usize,
    all: bool,
    args: &CliArgs,
) -> Result<bool> {
    let threshold = parse_size(&args.full_load_limit)
        .map_err(|e| ManifestError::config(format!("Invalid full load limit: {}", e)))?;

    let entries = read_manifest(manifest)?;
    let base_dir = match source {
        Some(dir) => dir.to_path_buf(),
        None => default_base_dir(manifest)?,
    };

    if !args.quiet {
        println!(
            "Verifying {} entries from {} against {}",
            entries.len(),
            manifest.display(),
            base_dir.display()
        );
    }

    let report = Verifier::new(base_dir, threads, threshold).verify(entries)?;

    if !args.quiet {
        match args.report_format {
            ReportFormat::Text => report.print_summary(all),
            ReportFormat::Json => println!("{}", report.to_json()),
        }
    }

    Ok(report.is_success())
}

fn print_config(config: &ManifestConfig) {
    println!("=== Configuration ===");
    println!("Source:          {}", config.source.display());
    println!("Manifest:        {}", config.output_path().display());
    println!("Full load limit: {} bytes", config.full_load_threshold);
    println!("Threads:         {}", config.effective_threads());
    if let Some(name) = &config.exclude_name {
        println!("Ignoring self:   {}", name.to_string_lossy());
    }
    if !config.exclude_patterns.is_empty() {
        println!("Exclude:         {}", config.exclude_patterns.join(", "));
    }
    println!();
}

fn wait_for_enter() {
    eprintln!("Press Enter to exit...");
    let mut line = String::new();
    let _ = std::io::stdin().lock().read_line(&mut line);
}
