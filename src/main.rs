// src/main.rs

use std::process::ExitCode;

use assetpipe::{cli, logging, run};

#[tokio::main]
async fn main() -> ExitCode {
    let args = cli::parse();
    if let Err(err) = logging::init_logging(args.log_level) {
        eprintln!("assetpipe: {err:#}");
        return ExitCode::FAILURE;
    }

    match run(args).await {
        Ok(report) => ExitCode::from(report.exit_code()),
        Err(err) => {
            eprintln!("assetpipe: {err:#}");
            ExitCode::FAILURE
        }
    }
}
