// Binary entry point for sluice
// Thin wrapper around the library's shell module.

use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    match sluice::shell::run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("sluice fatal error: {:#}", e);
            ExitCode::from(sluice::shell::cli::exit::FAILURE)
        }
    }
}
