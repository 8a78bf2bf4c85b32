use clap::Parser;
use pushgate::cli::Cli;
use pushgate::cli::output::WEB_PREFIX;
use std::fs::OpenOptions;
use std::io::Write;
use std::process::ExitCode;

/// Where unexpected panics are recorded
const PANIC_LOG: &str = "/tmp/pre-receive-panic.log";

fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        let payload = info
            .payload()
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| info.payload().downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        let location = info
            .location()
            .map(|l| l.to_string())
            .unwrap_or_default();
        let backtrace = std::backtrace::Backtrace::force_capture();
        let record = format!("{WEB_PREFIX}{payload}, {location}\n{backtrace}\n");

        let written = OpenOptions::new()
            .create(true)
            .append(true)
            .open(PANIC_LOG)
            .and_then(|mut file| file.write_all(record.as_bytes()));
        if let Err(e) = written {
            eprintln!("{WEB_PREFIX}failed to write {PANIC_LOG}: {e}");
        }
        eprintln!("{WEB_PREFIX}internal error: {payload} (details in {PANIC_LOG})");
        std::process::exit(1);
    }));
}

#[tokio::main]
async fn main() -> ExitCode {
    install_panic_hook();

    let cli = Cli::parse();
    match cli.run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", console::style("✖").red(), e);
            ExitCode::FAILURE
        }
    }
}
