//! Command handlers
//!
//! Each handler maps a parsed subcommand onto the library pipeline and
//! returns a process exit code. Errors are printed to stderr with the
//! compiler's diagnostics surfaced verbatim, so the operator never needs a
//! re-run with extra verbosity.

use crate::cli::commands::{BuildArgs, HealthArgs, OutputFormatArg};
use crate::compiler::{ContractCompiler, DockerCompiler};
use crate::config::BuildConfig;
use crate::pipeline::{self, BuildResult};
use tracing::error;

/// Exit code for operational failures
const EXIT_FAILURE: i32 = 1;

/// Handles `compilebox build`
pub async fn handle_build(args: &BuildArgs, quiet: bool) -> i32 {
    run_pipeline(args, quiet, false).await
}

/// Handles `compilebox update`
pub async fn handle_update(args: &BuildArgs, quiet: bool) -> i32 {
    run_pipeline(args, quiet, true).await
}

/// Handles `compilebox health`
pub async fn handle_health(args: &HealthArgs) -> i32 {
    let config = match base_config() {
        Ok(config) => config,
        Err(code) => return code,
    };
    let runtime = args.runtime.clone().unwrap_or(config.runtime);
    let image = args.image.clone().unwrap_or(config.image);
    let compiler = DockerCompiler::new(runtime.clone(), image.clone(), config.working_dir, true);

    match compiler.preflight().await {
        Ok(()) => {
            println!("OK: {} can run {}", runtime, image);
            0
        }
        Err(e) => {
            error!("{}", e);
            eprintln!("{}", e);
            EXIT_FAILURE
        }
    }
}

async fn run_pipeline(args: &BuildArgs, quiet: bool, incremental: bool) -> i32 {
    let config = match build_config(args, quiet) {
        Ok(config) => config,
        Err(code) => return code,
    };
    let compiler = DockerCompiler::new(
        config.runtime.clone(),
        config.image.clone(),
        config.working_dir.clone(),
        config.strict,
    );

    let result = if incremental {
        pipeline::compile_necessary(&compiler, &config).await
    } else {
        pipeline::compile_all(&compiler, &config).await
    };

    match result {
        Ok(result) => {
            print_result(&result, args.format, quiet);
            0
        }
        Err(e) => {
            error!("{}", e);
            eprintln!("{}", e);
            EXIT_FAILURE
        }
    }
}

fn base_config() -> Result<BuildConfig, i32> {
    BuildConfig::from_env().map_err(|e| {
        eprintln!("{}", e);
        EXIT_FAILURE
    })
}

fn build_config(args: &BuildArgs, quiet: bool) -> Result<BuildConfig, i32> {
    let mut config = base_config()?;

    if let Some(dir) = &args.contracts_dir {
        config = config.with_contracts_dir(dir.clone());
    }
    if let Some(dir) = &args.build_dir {
        config.build_dir = dir.clone();
    }
    if let Some(image) = &args.image {
        config.image = image.clone();
    }
    if let Some(runtime) = &args.runtime {
        config.runtime = runtime.clone();
    }
    config.entry_point = args.entry_point.clone();
    config.quiet = quiet;
    if args.no_strict {
        config.strict = false;
    }

    config.validate().map_err(|e| {
        eprintln!("{}", e);
        EXIT_FAILURE
    })?;
    Ok(config)
}

fn print_result(result: &BuildResult, format: OutputFormatArg, quiet: bool) {
    match format {
        OutputFormatArg::Json => match serde_json::to_string_pretty(result) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Failed to serialize build result: {}", e),
        },
        OutputFormatArg::Human => {
            if quiet {
                return;
            }
            if result.is_empty() {
                println!("Nothing to compile.");
                return;
            }
            println!("Compiled {} contract(s):", result.contracts.len());
            for (name, record) in &result.contracts {
                let storage = if record.initial_storage.is_some() {
                    " (+ initial storage)"
                } else {
                    ""
                };
                println!("  {} <- {}{}", name, record.source_path.display(), storage);
            }
        }
    }
}
