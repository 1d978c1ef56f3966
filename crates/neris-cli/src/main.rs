//! # neris
//!
//! Command-line client for the NERIS API. Reads `~/.neris/settings.json`
//! and `NERIS_*` variables, authenticates (prompting for MFA codes on the
//! terminal) and prints API responses as JSON.

#![deny(unsafe_code)]

use std::io::{BufRead, Write};
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use neris_auth::{AuthError, AuthStatus, TokenCache};
use neris_client::{ApiClient, CallOutcome, ClientError, Method, Payload};
use neris_settings::{CredentialConfig, Environment, NerisSettings};

/// Wrong MFA codes accepted before giving up.
const MAX_CODE_ATTEMPTS: usize = 3;

/// NERIS API client.
#[derive(Parser, Debug)]
#[command(name = "neris", about = "NERIS API client", version)]
struct Cli {
    /// Log structured request/response records.
    #[arg(long, global = true)]
    debug: bool,

    /// Target environment (production, test, local).
    #[arg(long, global = true, value_parser = parse_environment)]
    environment: Option<Environment>,

    /// Log filter when `RUST_LOG` is unset.
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Authenticate and report the session state.
    Authenticate,
    /// Check API health.
    Health,
    /// List API integrations of an entity.
    ListIntegrations {
        /// Entity NERIS id.
        neris_id: String,
    },
    /// Create an API integration for an entity.
    CreateIntegration {
        /// Entity NERIS id.
        neris_id: String,
        /// Integration title.
        title: String,
    },
    /// Enroll an integration with an entity.
    EnrollIntegration {
        /// Entity NERIS id.
        neris_id: String,
        /// Integration client id.
        client_id: String,
    },
    /// List incidents of an entity.
    ListIncidents {
        /// Entity NERIS id.
        neris_id: String,
        /// Query parameter as `key=value` (repeatable).
        #[arg(long = "param", value_parser = parse_param)]
        params: Vec<(String, String)>,
    },
    /// Call an arbitrary API path.
    Call {
        /// HTTP method, uppercase (`GET`, `POST`, ...).
        method: Method,
        /// Path under the base URL, e.g. `/entity/FD24027000`.
        path: String,
        /// JSON request body.
        #[arg(long)]
        body: Option<String>,
        /// Query parameter as `key=value` (repeatable).
        #[arg(long = "param", value_parser = parse_param)]
        params: Vec<(String, String)>,
    },
    /// Delete the cached interactive session.
    Logout,
}

fn parse_environment(val: &str) -> Result<Environment, String> {
    Environment::parse(val).ok_or_else(|| format!("unknown environment `{val}`"))
}

fn parse_param(val: &str) -> Result<(String, String), String> {
    val.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected `key=value`, got `{val}`"))
}

fn load_settings(cli: &Cli) -> Result<NerisSettings> {
    let mut settings = neris_settings::load_settings().context("failed to load settings")?;
    if cli.debug {
        settings.debug = true;
    }
    if let Some(environment) = cli.environment {
        settings.environment = environment;
    }
    Ok(settings)
}

fn prompt(text: &str) -> Result<String> {
    let mut stderr = std::io::stderr();
    write!(stderr, "{text}: ")?;
    stderr.flush()?;

    let mut line = String::new();
    let read = std::io::stdin().lock().read_line(&mut line)?;
    if read == 0 {
        bail!("no MFA code provided");
    }
    Ok(line.trim().to_string())
}

/// Authenticate up front, answering MFA challenges from the terminal.
async fn authenticate(client: &ApiClient) -> Result<()> {
    let mut status = client.begin_auth().await.context("authentication failed")?;
    let mut rejected = 0;

    loop {
        match status {
            AuthStatus::Authenticated { warning } => {
                if let Some(warning) = warning {
                    eprintln!("warning: {warning}");
                }
                return Ok(());
            }
            AuthStatus::ChallengeRequired(challenge) => {
                let code = prompt(&challenge.prompt)?;
                status = match client.submit_challenge_response(&code).await {
                    Ok(next) => next,
                    Err(ClientError::Auth(AuthError::Authentication { .. }))
                        if rejected + 1 < MAX_CODE_ATTEMPTS =>
                    {
                        rejected += 1;
                        eprintln!("code rejected, try again");
                        AuthStatus::ChallengeRequired(challenge)
                    }
                    Err(e) => {
                        client.abandon_challenge();
                        return Err(e).context("MFA challenge failed");
                    }
                };
            }
        }
    }
}

fn print_payload(payload: &Payload) -> Result<()> {
    match payload {
        Payload::Json(value) => println!("{}", serde_json::to_string_pretty(value)?),
        Payload::Text(text) => println!("{text}"),
    }
    Ok(())
}

fn report(outcome: &CallOutcome) -> Result<ExitCode> {
    match outcome {
        CallOutcome::Success(payload) => {
            print_payload(payload)?;
            Ok(ExitCode::SUCCESS)
        }
        CallOutcome::Failure(failure) => {
            eprintln!("request failed with HTTP {}", failure.status);
            let body = match &failure.payload {
                Payload::Json(value) => serde_json::to_string_pretty(value)?,
                Payload::Text(text) => text.clone(),
            };
            eprintln!("{body}");
            Ok(ExitCode::FAILURE)
        }
    }
}

fn logout(settings: &NerisSettings) -> Result<()> {
    let dir = match CredentialConfig::from_settings(settings) {
        Ok(CredentialConfig {
            token_cache_dir: Some(dir),
            ..
        }) => dir,
        _ => settings
            .token_cache
            .dir
            .as_ref()
            .map_or_else(neris_settings::neris_dir, Into::into),
    };
    let cache = TokenCache::new(&dir);
    cache
        .clear()
        .with_context(|| format!("failed to remove {}", cache.path().display()))?;
    eprintln!("removed {}", cache.path().display());
    Ok(())
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let settings = load_settings(&cli)?;

    if matches!(cli.command, Command::Logout) {
        logout(&settings)?;
        return Ok(ExitCode::SUCCESS);
    }

    let client = ApiClient::from_settings(&settings).context("invalid client configuration")?;
    authenticate(&client).await?;

    let outcome = match cli.command {
        Command::Authenticate => {
            match client.auth_state() {
                Some(state) => eprintln!("authenticated ({state:?})"),
                None => eprintln!("authentication is skipped in the local environment"),
            }
            return Ok(ExitCode::SUCCESS);
        }
        Command::Health => client.health().await?,
        Command::ListIntegrations { neris_id } => client.list_integrations(&neris_id).await?,
        Command::CreateIntegration { neris_id, title } => {
            client.create_api_integration(&neris_id, &title).await?
        }
        Command::EnrollIntegration {
            neris_id,
            client_id,
        } => client.enroll_integration(&neris_id, &client_id).await?,
        Command::ListIncidents { neris_id, params } => {
            let params: Vec<(&str, &str)> =
                params.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
            let params = (!params.is_empty()).then_some(params.as_slice());
            client.list_incidents(&neris_id, params).await?
        }
        Command::Call {
            method,
            path,
            body,
            params,
        } => {
            let body = body
                .map(|b| serde_json::from_str(&b))
                .transpose()
                .context("--body is not valid JSON")?;
            let params: Vec<(&str, &str)> =
                params.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
            let params = (!params.is_empty()).then_some(params.as_slice());
            client.call(method, &path, body, params).await?
        }
        // Handled before the client is built.
        Command::Logout => return Ok(ExitCode::SUCCESS),
    };

    report(&outcome)
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    if cli.json_logs {
        neris_logging::init_json_subscriber(&cli.log_level);
    } else {
        neris_logging::init_subscriber(&cli.log_level);
    }
    tracing::debug!(command = ?cli.command, "starting");

    run(cli).await
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
