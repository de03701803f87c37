// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use event_forwarder::{
    config::Config,
    coordinator::{Coordinator, RunOutcome},
    hostname::get_hostname,
    logger::{Formatter, SyslogMakeWriter},
    sink::{EventSink, FileSink, SyslogSink},
    store::S3Store,
    APP_NAME,
};

/// sysexits EX_TEMPFAIL: a previous run still holds the lock.
const EXIT_ALREADY_RUNNING: u8 = 75;

/// Pulls Carbon Black Defense event logs from S3 and forwards them to syslog.
///
/// With no options, runs one normal forwarding cycle.
#[derive(Debug, Parser)]
#[command(name = "cbdefense-forwarder", version)]
struct Cli {
    /// Testing mode. Do all the work but write events to 'output.TIMESTAMP'
    /// in the current directory instead of sending them to syslog LOCAL7.
    #[arg(short = 't', long = "testing")]
    testing: bool,

    /// Log to stdout instead of syslog LOCAL6.
    #[arg(short = 'l', long = "log-stdout")]
    log_stdout: bool,
}

fn init_logging(log_level: &str, log_stdout: bool, syslog_addr: &str) -> Result<(), String> {
    let env_filter = format!(
        "aws_config=off,aws_smithy_runtime=off,aws_sdk_s3=off,hyper=off,h2=off,rustls=off,{log_level}"
    );
    let filter = EnvFilter::try_new(env_filter)
        .map_err(|e| format!("could not parse log level in configuration: {e}"))?;

    let builder = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(filter)
        .event_format(Formatter);

    let result = if log_stdout {
        tracing::subscriber::set_global_default(builder.with_writer(std::io::stdout).finish())
    } else {
        let writer = SyslogMakeWriter::new(syslog_addr, get_hostname(), APP_NAME)
            .map_err(|e| format!("could not open syslog destination {syslog_addr}: {e}"))?;
        tracing::subscriber::set_global_default(builder.with_writer(writer).finish())
    };
    result.map_err(|e| format!("setting default subscriber failed: {e}"))
}

async fn build_sink(testing: bool, config: &Config) -> Result<Arc<dyn EventSink>, String> {
    if testing {
        let sink = FileSink::timestamped(Path::new("."))
            .map_err(|e| format!("could not create test output file: {e}"))?;
        Ok(Arc::new(sink))
    } else {
        let sink = SyslogSink::new(&config.syslog_addr, get_hostname(), APP_NAME)
            .await
            .map_err(|e| format!("could not open syslog event destination: {e}"))?;
        Ok(Arc::new(sink))
    }
}

#[tokio::main(flavor = "current_thread")]
pub async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match Config::new() {
        Ok(c) => Arc::new(c),
        Err(e) => {
            eprintln!("{APP_NAME}: configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_logging(&config.log_level, cli.log_stdout, &config.syslog_addr) {
        eprintln!("{APP_NAME}: {e}");
        return ExitCode::FAILURE;
    }
    debug!("Logging subsystem enabled");

    let sink = match build_sink(cli.testing, &config).await {
        Ok(sink) => sink,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let coordinator = Coordinator::from_config(&config);
    let run_config = Arc::clone(&config);

    // Spawned so a panic anywhere in the run surfaces here as a JoinError.
    let run = tokio::spawn(async move {
        coordinator
            .run(|| S3Store::connect(&run_config.s3), sink.as_ref())
            .await
    });

    match run.await {
        Ok(Ok(RunOutcome::AlreadyRunning)) => ExitCode::from(EXIT_ALREADY_RUNNING),
        Ok(Ok(RunOutcome::Completed { artifacts, records })) => {
            info!("Forwarded {records} events from {artifacts} files");
            ExitCode::SUCCESS
        }
        Ok(Ok(RunOutcome::Halted {
            artifacts,
            records,
            failed,
            error,
        })) => {
            error!(
                "Stopped at {failed} after {artifacts} files ({records} events): {error}. Remaining files are left for the next run"
            );
            ExitCode::FAILURE
        }
        Ok(Err(e)) => {
            error!("Exception {e}");
            ExitCode::FAILURE
        }
        Err(e) => {
            error!("Exception: run aborted unexpectedly: {e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Cli;
    use clap::Parser;

    #[test]
    fn test_no_options_is_a_normal_cycle() {
        let cli = Cli::try_parse_from(["cbdefense-forwarder"]).unwrap();
        assert!(!cli.testing);
        assert!(!cli.log_stdout);
    }

    #[test]
    fn test_short_flags() {
        let cli = Cli::try_parse_from(["cbdefense-forwarder", "-t", "-l"]).unwrap();
        assert!(cli.testing);
        assert!(cli.log_stdout);
    }

    #[test]
    fn test_unknown_flag_is_rejected() {
        assert!(Cli::try_parse_from(["cbdefense-forwarder", "-x"]).is_err());
    }
}
