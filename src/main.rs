#![forbid(unsafe_code)]

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use coachauth::auth::{issue_login_code, PendingCode};
use coachauth::{Config, ValidationOutcome};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Coach login-code and session manager.
#[derive(Parser, Debug)]
#[command(name = "coachauth", version, about)]
struct Cli {
    /// Config file (defaults to ~/.coachauth/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Check coach credentials and issue a fresh login code
    RequestCode {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        /// Code lifetime in milliseconds (non-finite values use the default)
        #[arg(long, allow_hyphen_values = true)]
        ttl_ms: Option<f64>,
    },
    /// Store a login code directly, bypassing the credential check
    SetCode {
        code: String,
        #[arg(long, allow_hyphen_values = true)]
        ttl_ms: Option<f64>,
    },
    /// Validate a login code and open the coach session on success
    Login {
        code: Option<String>,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show session and pending-code state
    Status {
        #[arg(long)]
        json: bool,
    },
    /// Close the coach session
    Logout,
}

fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("coachauth=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load_or_default(cli.config.as_deref())?;

    match cli.command {
        Commands::Init { force } => {
            if config.config_path.exists() && !force {
                anyhow::bail!(
                    "Config already exists at {} (use --force to overwrite)",
                    config.config_path.display()
                );
            }
            config.save()?;
            println!("Wrote {}", config.config_path.display());
            Ok(ExitCode::SUCCESS)
        }
        Commands::RequestCode {
            email,
            password,
            ttl_ms,
        } => {
            let session = config.open_session()?;
            let code = issue_login_code(
                &session,
                &config.coach,
                &email,
                &password,
                config.login.code_length,
                ttl_ms,
            )?;
            println!("{code}");
            Ok(ExitCode::SUCCESS)
        }
        Commands::SetCode { code, ttl_ms } => {
            let session = config.open_session()?;
            session.set_pending_login_code(&code, ttl_ms);
            println!("Login code stored");
            Ok(ExitCode::SUCCESS)
        }
        Commands::Login { code, json } => {
            let session = config.open_session()?;
            let result = session.validate_login_code(code.as_deref());
            let outcome = ValidationOutcome::from(&result);

            if json {
                println!(
                    "{}",
                    serde_json::to_string(&outcome).context("Failed to encode result")?
                );
            }

            match result {
                Ok(token) => {
                    session.mark_logged_in(token);
                    if !json {
                        println!("Coach session opened");
                    }
                    Ok(ExitCode::SUCCESS)
                }
                Err(err) => {
                    if !json {
                        eprintln!("Login failed: {err}");
                        if err.is_recoverable_by_new_code() {
                            eprintln!("Request a new code with `coachauth request-code`.");
                        }
                    }
                    Ok(ExitCode::FAILURE)
                }
            }
        }
        Commands::Status { json } => {
            let session = config.open_session()?;
            let logged_in = session.is_logged_in();
            let pending = session.pending_code();

            if json {
                let value = serde_json::json!({
                    "logged_in": logged_in,
                    "code_pending": pending.is_present(),
                    "code_expires_at": pending.is_present().then_some(pending.expires_at),
                });
                println!("{value}");
            } else {
                println!("Logged in:    {}", if logged_in { "yes" } else { "no" });
                println!("Pending code: {}", describe_pending(&pending));
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Logout => {
            let session = config.open_session()?;
            session.logout();
            println!("Coach session closed");
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn describe_pending(pending: &PendingCode) -> String {
    if !pending.is_present() {
        return "none".into();
    }
    match chrono::DateTime::from_timestamp_millis(pending.expires_at) {
        Some(at) => format!("yes, expires {}", at.format("%Y-%m-%d %H:%M:%S UTC")),
        None => format!("yes, expires at {} ms", pending.expires_at),
    }
}
