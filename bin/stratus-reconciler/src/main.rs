// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use slog::info;

use stratus_reconciler::driver;

fn parse_log_level(s: &str) -> anyhow::Result<slog::Level> {
    s.parse().map_err(|_| anyhow::anyhow!("Invalid log level"))
}

#[derive(Debug, Parser)]
#[clap(about, version)]
/// Normalizes declared machines and converges them toward their specs
enum Args {
    /// Applies defaults to every machine and prints the result as TOML.
    Normalize {
        #[clap(action)]
        config: PathBuf,

        /// Logging level for the run
        #[clap(long, default_value_t = slog::Level::Info, value_parser = parse_log_level)]
        log_level: slog::Level,
    },
    /// Converges every machine against an in-memory provider and prints the
    /// observed state as JSON.
    Simulate {
        #[clap(action)]
        config: PathBuf,

        /// Delete everything again after creating it.
        #[clap(long, action)]
        delete: bool,

        /// Logging level for the run
        #[clap(long, default_value_t = slog::Level::Info, value_parser = parse_log_level)]
        log_level: slog::Level,
    },
}

fn build_logger(level: slog::Level) -> slog::Logger {
    use slog::Drain;

    let main_drain = if atty::is(atty::Stream::Stderr) {
        let decorator = slog_term::TermDecorator::new().stderr().build();
        let drain = slog_term::FullFormat::new(decorator).build().fuse();
        slog_async::Async::new(drain)
            .overflow_strategy(slog_async::OverflowStrategy::Block)
            .build_no_guard()
    } else {
        let drain =
            slog_bunyan::with_name("stratus-reconciler", std::io::stderr())
                .build()
                .fuse();
        slog_async::Async::new(drain)
            .overflow_strategy(slog_async::OverflowStrategy::Block)
            .build_no_guard()
    };

    let filtered_main = slog::LevelFilter::new(main_drain, level);
    slog::Logger::root(filtered_main.fuse(), slog::o!())
}

fn main() -> anyhow::Result<()> {
    // Command line arguments.
    let args = Args::parse();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .thread_name("tokio-rt-reconciler")
        .build()
        .context("building tokio runtime")?;

    match args {
        Args::Normalize { config, log_level } => {
            let log = build_logger(log_level);
            let cfg = stratus_config::parse(&config).with_context(|| {
                format!("reading config {}", config.display())
            })?;
            let cfg = runtime.block_on(driver::normalize(cfg, &log))?;
            print!("{}", toml::to_string(&cfg)?);
            Ok(())
        }
        Args::Simulate { config, delete, log_level } => {
            let log = build_logger(log_level);
            let cfg = stratus_config::parse(&config).with_context(|| {
                format!("reading config {}", config.display())
            })?;
            let report =
                runtime.block_on(driver::simulate(cfg, delete, &log))?;
            info!(log, "simulation finished";
                  "machines" => report.machines.len(),
                  "errors" => report.errors.len());
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
    }
}
