// src/logging.rs

//! `tracing` output on stderr; stdout is left to notifications and
//! `--dry-run`.
//!
//! `--log-level` wins over `ASSETPIPE_LOG`, which takes full `EnvFilter`
//! directives (e.g. `assetpipe::watch=debug,info`). Without either the
//! HTTP stack is kept at `warn` so serve and the image uploads stay quiet.

use anyhow::{Context, Result, anyhow};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;

use crate::cli::LogLevel;

const ENV_VAR: &str = "ASSETPIPE_LOG";
const QUIET_DEPENDENCIES: &str = "hyper=warn,reqwest=warn,warp=warn";

pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let wanted = directives(cli_level, std::env::var(ENV_VAR).ok());
    let filter = EnvFilter::try_new(&wanted).with_context(|| format!("invalid log filter '{wanted}'"))?;

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!("installing log subscriber: {e}"))
}

fn directives(cli_level: Option<LogLevel>, env: Option<String>) -> String {
    match (cli_level, env.filter(|s| !s.trim().is_empty())) {
        (Some(level), _) => format!("{},{QUIET_DEPENDENCIES}", level_name(level)),
        (None, Some(env)) => env,
        (None, None) => format!("info,{QUIET_DEPENDENCIES}"),
    }
}

fn level_name(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_flag_overrides_the_environment() {
        let wanted = directives(Some(LogLevel::Debug), Some("trace".into()));
        assert_eq!(wanted, format!("debug,{QUIET_DEPENDENCIES}"));
    }

    #[test]
    fn environment_directives_pass_through() {
        let wanted = directives(None, Some("assetpipe::watch=trace,warn".into()));
        assert_eq!(wanted, "assetpipe::watch=trace,warn");
        assert!(EnvFilter::try_new(&wanted).is_ok());
    }

    #[test]
    fn blank_environment_means_default() {
        assert_eq!(directives(None, Some("  ".into())), format!("info,{QUIET_DEPENDENCIES}"));
    }
}
