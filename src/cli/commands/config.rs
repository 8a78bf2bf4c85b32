use super::GlobalOpts;
use crate::cli::Output;
use crate::config::ConfigLoader;
use anyhow::{Result, bail};
use clap::{Args, Subcommand};
use std::process::ExitCode;

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Load the configuration and check every rule and checker
    Validate,
    /// Display current merged configuration
    Show {
        /// Output format: yaml, json
        #[arg(short, long, default_value = "yaml")]
        format: String,
    },
}

pub async fn execute(args: ConfigArgs, opts: &GlobalOpts<'_>) -> Result<ExitCode> {
    let output = Output::new(opts.verbose, opts.quiet);
    let loader = ConfigLoader::new(opts.config);

    let config = match loader.load() {
        Ok(config) => config,
        Err(e) => {
            output.error(&e.to_string());
            return Ok(ExitCode::from(e.exit_code()));
        }
    };

    match args.command {
        ConfigCommand::Validate => {
            if let Err(e) = config.validate() {
                output.error(&e.to_string());
                return Ok(ExitCode::from(e.exit_code()));
            }
            for path in loader.found_files() {
                output.verbose(&format!("loaded {}", path.display()));
            }
            output.success(&format!(
                "configuration is valid ({} style checker(s) enabled)",
                config.enabled_checkers().count()
            ));
        }
        ConfigCommand::Show { format } => {
            let rendered = match format.to_lowercase().as_str() {
                "yaml" | "yml" => serde_yml::to_string(&config)?,
                "json" => serde_json::to_string_pretty(&config)?,
                _ => bail!("Unsupported format: {format}. Use yaml or json"),
            };
            println!("{rendered}");
        }
    }
    Ok(ExitCode::SUCCESS)
}
