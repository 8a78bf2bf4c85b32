use super::GlobalOpts;
use crate::cli::Output;
use crate::config::ConfigLoader;
use crate::external::{CommitLogEmitter, Emission};
use crate::git::GitRepo;
use crate::hooks::{Pipeline, PushEnv, PushRequest};
use anyhow::Result;
use clap::Args;
use std::process::ExitCode;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Args, Default)]
pub struct RunArgs {
    /// Keep staged files for inspection instead of removing them
    #[arg(long)]
    pub keep_staging: bool,
}

pub async fn execute(args: RunArgs, opts: &GlobalOpts<'_>) -> Result<ExitCode> {
    let env = PushEnv::from_env();
    let output = Output::new(opts.verbose, opts.quiet).for_protocol(env.protocol);

    let config = match ConfigLoader::new(opts.config).load() {
        Ok(config) => config,
        Err(e) => {
            output.error(&e.to_string());
            return Ok(ExitCode::from(e.exit_code()));
        }
    };
    let pipeline = match Pipeline::new(&config) {
        Ok(pipeline) => pipeline.with_keep_staging(args.keep_staging),
        Err(e) => {
            output.error(&e.to_string());
            return Ok(ExitCode::from(e.exit_code()));
        }
    };
    let repo = match GitRepo::discover() {
        Ok(repo) => repo,
        Err(e) => {
            output.error(&format!("{e:#}"));
            return Ok(ExitCode::FAILURE);
        }
    };
    tracing::debug!("repository at {}", repo.git_dir().display());
    output.verbose(&format!("gate order: {}", pipeline.gate_names().join(", ")));
    let emitter = CommitLogEmitter::new(&config.commit_log_hook.http);

    let mut failed = false;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let request = match PushRequest::parse_line(&line, env.protocol) {
            Ok(request) => request,
            Err(e) => {
                output.error(&e.to_string());
                failed = true;
                continue;
            }
        };

        output.run_header(config.code_exemption_dir.as_deref(), &env.project, &request);

        let run = match pipeline.run(&repo, &env.project, &request).await {
            Ok(run) => run,
            Err(e) => {
                tracing::warn!("{} could not be checked: {}", request.ref_name(), e);
                output.error(&format!("{}: {}", request.ref_name(), e));
                failed = true;
                continue;
            }
        };
        output.decision(&run.decision);
        if let Some(path) = &run.kept_staging {
            output.staging_kept(path);
        }

        match emitter.emit(&repo, &env.project, &request, &run).await {
            Ok(Emission::Sent) => output.verbose("commit log recorded"),
            Ok(_) => {}
            Err(e) => {
                tracing::warn!("commit log failed: {:#}", e);
                output.warning(&format!("commit log not recorded: {e:#}"));
            }
        }

        if !run.decision.is_accept() {
            return Ok(ExitCode::from(run.decision.exit_code()));
        }
    }

    Ok(if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
