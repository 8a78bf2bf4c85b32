use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::process::ExitCode;

pub mod config;
pub mod run;
pub mod version;

#[derive(Parser)]
#[command(
    name = "pushgate",
    version = env!("CARGO_PKG_VERSION"),
    about = "Server-side pre-receive gate for commit rules and style checks",
    long_about = "pushgate runs as a git pre-receive hook. It reads '<old> <new> <ref>' lines \
                  on stdin, checks each pushed commit against the configured rules and \
                  external style checkers, and exits nonzero to refuse the push."
)]
pub struct Cli {
    /// Run as if started in <DIR> instead of current working directory
    #[arg(short = 'C', long = "directory", global = true)]
    pub directory: Option<String>,

    /// Increase verbosity (can be repeated)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Use custom configuration file
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check ref updates read from stdin (the default)
    Run(run::RunArgs),
    /// Configuration management
    Config(config::ConfigArgs),
    /// Show version information
    Version(version::VersionArgs),
}

/// Global flags every command receives
pub struct GlobalOpts<'a> {
    pub config: Option<&'a str>,
    pub verbose: bool,
    pub quiet: bool,
}

impl Cli {
    pub async fn run(self) -> Result<ExitCode> {
        // Change directory if specified
        if let Some(dir) = &self.directory {
            std::env::set_current_dir(dir)
                .with_context(|| format!("Failed to change directory to {dir}"))?;
        }

        setup_logging(self.verbose, self.quiet);

        let opts = GlobalOpts {
            config: self.config.as_deref(),
            verbose: self.verbose > 0,
            quiet: self.quiet,
        };

        match self.command {
            Some(Commands::Run(args)) => run::execute(args, &opts).await,
            Some(Commands::Config(args)) => config::execute(args, &opts).await,
            Some(Commands::Version(args)) => version::execute(args).await,
            // git invokes the hook without arguments
            None => run::execute(run::RunArgs::default(), &opts).await,
        }
    }
}

fn setup_logging(verbose: u8, quiet: bool) {
    if quiet {
        return;
    }

    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        match verbose {
            0 => tracing_subscriber::EnvFilter::new("warn"),
            1 => tracing_subscriber::EnvFilter::new("info,hyper=warn,reqwest=warn"),
            2 => tracing_subscriber::EnvFilter::new("debug,hyper=warn,reqwest=warn"),
            _ => tracing_subscriber::EnvFilter::new("trace"),
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_no_subcommand_means_run() {
        let cli = Cli::try_parse_from(["pushgate", "-vv", "--config", "/tmp/x.yaml"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.config.as_deref(), Some("/tmp/x.yaml"));
    }

    #[test]
    fn test_run_accepts_keep_staging() {
        let cli = Cli::try_parse_from(["pushgate", "run", "--keep-staging"]).unwrap();
        match cli.command {
            Some(Commands::Run(args)) => assert!(args.keep_staging),
            _ => panic!("expected run"),
        }
    }
}
