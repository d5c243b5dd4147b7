//! trafilatura - batch web content extraction from the command line.

use std::process::ExitCode;

use clap::Parser;
use rs_trafilatura_cli::{install_panic_hook, Args, BatchDriver, BatchReport, StopHandle};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> ExitCode {
    let args = Args::parse();

    let default_filter = if args.verbose {
        "rs_trafilatura_cli=debug,trafilatura=debug"
    } else {
        "warn"
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
    install_panic_hook();

    match run(&args) {
        Ok(report) => {
            tracing::debug!(?report, "done");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("# ERROR: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> anyhow::Result<BatchReport> {
    let config = args.to_config()?;
    let driver = BatchDriver::new(config)?;
    watch_interrupt(driver.stop_handle());
    Ok(driver.run()?)
}

/// First Ctrl-C lets the current item finish, a second one exits at once.
fn watch_interrupt(stop: StopHandle) {
    std::thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
            Ok(runtime) => runtime,
            Err(e) => {
                tracing::warn!(error = %e, "cannot watch for Ctrl-C");
                return;
            }
        };
        runtime.block_on(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupted, stopping after the current item");
                stop.stop();
            }
            if tokio::signal::ctrl_c().await.is_ok() {
                std::process::exit(130);
            }
        });
    });
}
