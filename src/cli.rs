// src/cli.rs

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(Debug, Clone, Parser)]
#[command(
    name = "assetpipe",
    version,
    about = "Build front-end assets: styles, scripts, sprites, templates, images."
)]
pub struct CliArgs {
    /// `default` builds everything once, `watch` serves `dist` and rebuilds
    /// on change; any other value names one task (sprite, styles, scripts,
    /// app-deps, app-annotate, app-ngdocs, app-html-minify, app-htmlify,
    /// images, copyTask, serve).
    #[arg(value_name = "TASK", default_value = crate::DEFAULT_TASK)]
    pub task: String,

    /// Project config. Its directory is the project root; without the file
    /// the stock layout is used.
    #[arg(long, value_name = "PATH", default_value = "Assetpipe.toml")]
    pub config: PathBuf,

    /// Overrides `ASSETPIPE_LOG`.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Show the path table, task order, stages and watch bindings, then exit.
    #[arg(long)]
    pub dry_run: bool,

    /// Exit non-zero if any task failed (one-shot runs only).
    #[arg(long)]
    pub fail_on_error: bool,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_invocation_builds_everything() {
        let args = CliArgs::try_parse_from(["assetpipe"]).unwrap();
        assert_eq!(args.task, "default");
        assert_eq!(args.config, PathBuf::from("Assetpipe.toml"));
        assert!(!args.dry_run && !args.fail_on_error);
    }

    #[test]
    fn flags_and_task_name() {
        let args = CliArgs::try_parse_from([
            "assetpipe",
            "copyTask",
            "--config",
            "web/Assetpipe.toml",
            "--log-level",
            "debug",
            "--fail-on-error",
        ])
        .unwrap();
        assert_eq!(args.task, "copyTask");
        assert_eq!(args.config, PathBuf::from("web/Assetpipe.toml"));
        assert_eq!(args.log_level, Some(LogLevel::Debug));
        assert!(args.fail_on_error);
    }
}
