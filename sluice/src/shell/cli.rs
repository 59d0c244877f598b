//! # Sluice CLI
//!
//! Command-line definition, startup and the turn loop.

use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::config::{AppConfig, ConfigOverrides, ModelMode};
use crate::pipeline::PipelineError;
use crate::runtime::{Runtime, TurnOutcome};
use crate::sandbox;
use crate::utils::logging::{LogTarget, init_logging};

/// Exit codes of a single turn.
pub mod exit {
    pub const OK: u8 = 0;
    pub const FAILURE: u8 = 1;
    pub const SANDBOX_VIOLATION: u8 = 2;
    pub const BRIDGE_INTEGRITY: u8 = 3;
    pub const COLLABORATOR: u8 = 4;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum EntryMode {
    Admin,
    User,
}

impl EntryMode {
    fn prompt(self) -> &'static str {
        match self {
            EntryMode::Admin => "admin> ",
            EntryMode::User => "user> ",
        }
    }
}

/// Sluice: operator requests and customer requests through two sandboxed pipelines.
#[derive(Parser, Debug, Clone)]
#[command(
    author,
    version,
    about,
    long_about = "sluice runs in one of two entry modes:

1. admin: the supervisor pipeline. Requests are answered on the admin root or,
   when they concern customer-facing material, projected across the bridge.
   Example: sluice --mode admin --once \"update the docs for the pricing page\"

2. user: the customer pipeline, confined to the public root.
   Example: sluice --mode user --once \"read_file /public/guide.txt\"

Without --once, sluice reads one instruction per line from stdin.

Exit codes: 0 response, 1 startup or other error, 2 an action was blocked by
the sandbox (the response is still printed), 3 bridge integrity violation,
4 model collaborator failure."
)]
pub struct Cli {
    /// Entry mode
    #[arg(long, value_enum)]
    pub mode: EntryMode,

    /// Collaborator selection; auto uses remote models when fully configured
    #[arg(long, value_enum)]
    pub model_mode: Option<ModelMode>,

    /// Run a single turn with this instruction and exit
    #[arg(long, value_name = "INSTRUCTION")]
    pub once: Option<String>,

    /// Real directory behind the "admin" virtual root
    #[arg(long)]
    pub admin_root: Option<PathBuf>,

    /// Real directory behind the "public" virtual root
    #[arg(long)]
    pub public_root: Option<PathBuf>,

    /// Directory for default roots, sluice.toml and .env (default: current dir)
    #[arg(long)]
    pub base_dir: Option<PathBuf>,

    /// Path to a TOML config file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Apply Landlock so the process can only write inside the virtual roots (Linux)
    #[arg(long)]
    pub kernel_sandbox: bool,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Log to stderr instead of file
    #[arg(long)]
    pub log_to_stderr: bool,
}

impl Cli {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            base_dir: self.base_dir.clone(),
            config_file: self.config.clone(),
            admin_root: self.admin_root.clone(),
            public_root: self.public_root.clone(),
            model_mode: self.model_mode,
        }
    }
}

pub async fn run() -> Result<ExitCode> {
    run_with(Cli::parse()).await
}

pub async fn run_with(cli: Cli) -> Result<ExitCode> {
    let log_level = if cli.debug { "debug" } else { "info" };
    match init_logging(log_level, !cli.log_to_stderr)? {
        LogTarget::File(dir) => tracing::debug!(dir = %dir.display(), "logging to file"),
        LogTarget::Stderr => tracing::debug!("logging to stderr"),
    }

    let config = AppConfig::load(&cli.overrides()).context("Failed to load configuration")?;
    tracing::info!(
        mode = ?cli.mode,
        collaborators = ?config.collaborators(),
        "starting sluice"
    );
    let runtime = Runtime::create(Arc::new(config)).context("Startup validation failed")?;

    if cli.kernel_sandbox {
        sandbox::enforce_kernel_sandbox(runtime.roots())
            .context("Failed to apply kernel sandbox")?;
    }

    if let Some(instruction) = &cli.once {
        let result = run_turn(&runtime, cli.mode, instruction).await;
        return Ok(ExitCode::from(report(result)));
    }

    run_loop(&runtime, cli.mode).await?;
    Ok(ExitCode::SUCCESS)
}

async fn run_turn(
    runtime: &Runtime,
    mode: EntryMode,
    instruction: &str,
) -> Result<TurnOutcome, PipelineError> {
    match mode {
        EntryMode::Admin => runtime.run_admin_turn(instruction).await,
        EntryMode::User => runtime.run_user_turn(instruction).await,
    }
}

/// Print the turn's response (stdout) or error (stderr) and pick its exit code.
fn report(result: Result<TurnOutcome, PipelineError>) -> u8 {
    let code = exit_code(&result);
    match result {
        Ok(outcome) => {
            println!("{}", outcome.response);
            if outcome.blocked_actions > 0 {
                eprintln!(
                    "sluice: {} action(s) blocked by the sandbox",
                    outcome.blocked_actions
                );
            }
            if outcome.classification_failed {
                eprintln!("sluice: classifier failed; answered without delegation");
            }
        }
        Err(e) => {
            tracing::error!(error = %e, code, "turn failed");
            eprintln!("sluice error: {e}");
        }
    }
    code
}

pub fn exit_code(result: &Result<TurnOutcome, PipelineError>) -> u8 {
    match result {
        Ok(outcome) if outcome.blocked_actions > 0 => exit::SANDBOX_VIOLATION,
        Ok(outcome) if outcome.classification_failed => exit::COLLABORATOR,
        Ok(_) => exit::OK,
        Err(PipelineError::Bridge(_)) => exit::BRIDGE_INTEGRITY,
        Err(PipelineError::Model(_)) => exit::COLLABORATOR,
        Err(PipelineError::Phase(_) | PipelineError::State(_)) => exit::FAILURE,
    }
}

/// Read instructions from stdin until EOF, `exit` or `quit`.
async fn run_loop(runtime: &Runtime, mode: EntryMode) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{}", mode.prompt());
        std::io::stdout().flush().context("Failed to flush stdout")?;

        let Some(line) = lines.next_line().await.context("Failed to read stdin")? else {
            return Ok(());
        };
        let line = line.trim();
        if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
            return Ok(());
        }
        if line.is_empty() {
            continue;
        }

        let code = report(run_turn(runtime, mode, line).await);
        tracing::debug!(code, "turn finished");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::BridgeError;
    use crate::model::ModelError;
    use crate::runtime::{CollaboratorSet, TurnPath};
    use crate::state::{PrivilegedOrigin, Route, StateError};
    use crate::test_utils::{RootFixture, ScriptedClassifier};

    fn outcome(blocked_actions: usize) -> Result<TurnOutcome, PipelineError> {
        Ok(TurnOutcome {
            response: "ok".into(),
            path: TurnPath::CustomerDirect,
            blocked_actions,
            classification_failed: false,
        })
    }

    #[tokio::test]
    async fn classifier_failure_exits_nonzero_after_answering() {
        let fixture = RootFixture::new();
        let collaborators = CollaboratorSet {
            classifier: Arc::new(ScriptedClassifier::failing()),
            ..CollaboratorSet::offline()
        };
        let runtime =
            Runtime::with_collaborators(Arc::new(fixture.offline_config()), collaborators)
                .unwrap();

        let result = runtime.run_admin_turn("update the docs").await;
        assert_eq!(
            result.as_ref().unwrap().response,
            "supervisor handled: update the docs"
        );
        assert_eq!(exit_code(&result), exit::COLLABORATOR);
    }

    #[test]
    fn exit_codes_follow_error_kind() {
        assert_eq!(exit_code(&outcome(0)), exit::OK);
        assert_eq!(exit_code(&outcome(2)), exit::SANDBOX_VIOLATION);
        let mut fallback = outcome(0).unwrap();
        fallback.classification_failed = true;
        assert_eq!(exit_code(&Ok(fallback.clone())), exit::COLLABORATOR);
        fallback.blocked_actions = 1;
        assert_eq!(exit_code(&Ok(fallback)), exit::SANDBOX_VIOLATION);
        assert_eq!(
            exit_code(&Err(PipelineError::Bridge(BridgeError::IntegrityViolation {
                origin: PrivilegedOrigin::Bridge
            }))),
            exit::BRIDGE_INTEGRITY
        );
        assert_eq!(
            exit_code(&Err(PipelineError::Model(ModelError::Unavailable(
                "down".into()
            )))),
            exit::COLLABORATOR
        );
        assert_eq!(
            exit_code(&Err(PipelineError::State(StateError::RouteAlreadySet {
                current: Route::Delegate
            }))),
            exit::FAILURE
        );
    }

    #[test]
    fn cli_requires_mode_and_parses_once() {
        assert!(Cli::try_parse_from(["sluice"]).is_err());
        let cli = Cli::try_parse_from([
            "sluice",
            "--mode",
            "user",
            "--model-mode",
            "offline",
            "--once",
            "read_file guide.txt",
        ])
        .unwrap();
        assert_eq!(cli.mode, EntryMode::User);
        assert_eq!(cli.model_mode, Some(ModelMode::Offline));
        assert_eq!(cli.once.as_deref(), Some("read_file guide.txt"));
        assert!(!cli.kernel_sandbox);
    }
}
