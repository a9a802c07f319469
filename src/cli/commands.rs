use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Incremental build adapter for containerized smart-contract compilers
#[derive(Parser, Debug)]
#[command(
    name = "compilebox",
    about = "Incremental build adapter for containerized smart-contract compilers",
    version,
    author,
    long_about = "compilebox tracks contract sources against prior build artifacts, \
                  compiles stale ones through an isolated compiler container, and \
                  reconciles the compiler's output files into one structured build result."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(short = 'v', long, global = true, help = "Increase verbosity")]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - suppress non-error output"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Compile every contract source",
        long_about = "Resolves all contract sources and compiles each one, \
                      ignoring prior build artifacts.\n\n\
                      Examples:\n  \
                      compilebox build\n  \
                      compilebox build contracts/ --format json"
    )]
    Build(BuildArgs),

    #[command(
        about = "Compile only the contracts that changed",
        long_about = "Compares each contract source against its prior build artifact \
                      and compiles only the stale ones. With nothing stale, exits \
                      without invoking the compiler at all.\n\n\
                      Examples:\n  \
                      compilebox update\n  \
                      compilebox update contracts/ --build-dir build/contracts"
    )]
    Update(BuildArgs),

    #[command(
        about = "Check compiler environment availability",
        long_about = "Runs the compiler image's preflight check and reports whether \
                      the container runtime and image are usable.\n\n\
                      Examples:\n  \
                      compilebox health\n  \
                      compilebox health --image smartpy/cli:0.9.1"
    )]
    Health(HealthArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct BuildArgs {
    #[arg(
        value_name = "PATH",
        help = "Contracts directory (defaults to ./contracts)"
    )]
    pub contracts_dir: Option<PathBuf>,

    #[arg(long, value_name = "DIR", help = "Build output directory")]
    pub build_dir: Option<PathBuf>,

    #[arg(
        short = 'e',
        long,
        value_name = "EXPR",
        help = "Entry point expression override (defaults to the contract's logical name)"
    )]
    pub entry_point: Option<String>,

    #[arg(long, value_name = "IMAGE", help = "Compiler image tag")]
    pub image: Option<String>,

    #[arg(long, value_name = "BINARY", help = "Container runtime binary")]
    pub runtime: Option<String>,

    #[arg(
        long,
        help = "Tolerate compiler diagnostics on a clean exit instead of failing"
    )]
    pub no_strict: bool,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

#[derive(Parser, Debug, Clone)]
pub struct HealthArgs {
    #[arg(long, value_name = "IMAGE", help = "Compiler image tag")]
    pub image: Option<String>,

    #[arg(long, value_name = "BINARY", help = "Container runtime binary")]
    pub runtime: Option<String>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatArg {
    Json,
    Human,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_args_verify() {
        CliArgs::command().debug_assert();
    }

    #[test]
    fn test_default_build_args() {
        let args = CliArgs::parse_from(["compilebox", "build"]);
        match args.command {
            Commands::Build(build_args) => {
                assert!(build_args.contracts_dir.is_none());
                assert!(build_args.build_dir.is_none());
                assert!(build_args.entry_point.is_none());
                assert!(!build_args.no_strict);
                assert_eq!(build_args.format, OutputFormatArg::Human);
            }
            _ => panic!("Expected Build command"),
        }
    }

    #[test]
    fn test_update_with_options() {
        let args = CliArgs::parse_from([
            "compilebox",
            "update",
            "contracts/tezos",
            "--build-dir",
            "build/contracts",
            "--entry-point",
            "TokenSale",
            "--image",
            "smartpy/cli:0.9.1",
            "--no-strict",
            "--format",
            "json",
        ]);
        match args.command {
            Commands::Update(build_args) => {
                assert_eq!(
                    build_args.contracts_dir,
                    Some(PathBuf::from("contracts/tezos"))
                );
                assert_eq!(build_args.build_dir, Some(PathBuf::from("build/contracts")));
                assert_eq!(build_args.entry_point, Some("TokenSale".to_string()));
                assert_eq!(build_args.image, Some("smartpy/cli:0.9.1".to_string()));
                assert!(build_args.no_strict);
                assert_eq!(build_args.format, OutputFormatArg::Json);
            }
            _ => panic!("Expected Update command"),
        }
    }

    #[test]
    fn test_health_command() {
        let args = CliArgs::parse_from(["compilebox", "health", "--runtime", "podman"]);
        match args.command {
            Commands::Health(health_args) => {
                assert_eq!(health_args.runtime, Some("podman".to_string()));
                assert!(health_args.image.is_none());
            }
            _ => panic!("Expected Health command"),
        }
    }

    #[test]
    fn test_global_quiet_flag() {
        let args = CliArgs::parse_from(["compilebox", "-q", "build"]);
        assert!(args.quiet);
        assert!(!args.verbose);
    }
}
