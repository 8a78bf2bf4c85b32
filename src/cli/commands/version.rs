use anyhow::Result;
use clap::Args;
use std::process::ExitCode;

#[derive(Args)]
pub struct VersionArgs {
    /// Show detailed version information
    #[arg(long)]
    pub detailed: bool,
}

pub async fn execute(args: VersionArgs) -> Result<ExitCode> {
    // Get the git SHA from build time
    let git_sha = option_env!("GIT_SHA").unwrap_or("unknown");

    println!("pushgate {} ({})", crate::VERSION, git_sha);
    if args.detailed {
        println!("Rust Edition: 2024");
        println!("License: {}", env!("CARGO_PKG_LICENSE"));
        println!("Description: {}", env!("CARGO_PKG_DESCRIPTION"));
    }
    Ok(ExitCode::SUCCESS)
}
