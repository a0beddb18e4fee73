//! segnala - command line console for the segnala incident backend.
//!
//! Subcommands mirror the admin console: signing in and out, plus opening
//! the backend views the signed-in role may see. All traffic goes through
//! the core gateway, so an expired token ends the session here exactly as
//! it would in the browser.

use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use segnala_core::auth::{FileStore, Keychain, SessionManager};
use segnala_core::config::{state_dir, Config};
use segnala_core::guard::{self, Access};
use segnala_core::models::Role;
use segnala_core::{ApiGateway, GatewayError};

// ============================================================================
// Views
// ============================================================================

/// Console views: name, backend collection path, required role
/// (`None` = any signed-in user).
const VIEWS: &[(&str, &str, Option<Role>)] = &[
    ("segnalazioni", "/segnalazioni", None),
    ("clienti", "/clienti", Some(Role::Admin)),
    ("categorie", "/categorie", Some(Role::Admin)),
    ("utenti", "/utenti", Some(Role::Admin)),
];

/// Where underprivileged navigation lands.
const DEFAULT_VIEW: &str = "segnalazioni";

/// Environment variables for non-interactive login.
const EMAIL_ENV: &str = "SEGNALA_EMAIL";
const PASSWORD_ENV: &str = "SEGNALA_PASSWORD";

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Set up logging with environment-based filter
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();
    info!("segnala console starting");

    let args: Vec<String> = std::env::args().collect();
    match args.get(1).map(String::as_str) {
        Some("login") => login(args.get(2).cloned()).await,
        Some("logout") => logout(),
        Some("whoami") => whoami(),
        Some("views") => views(),
        Some("open") => match args.get(2) {
            Some(view) => open(view).await,
            None => missing_argument("open <view>"),
        },
        Some("get") => match args.get(2) {
            Some(path) => get(path).await,
            None => missing_argument("get <path>"),
        },
        Some(other) => {
            usage();
            anyhow::bail!("unknown command: {}", other)
        }
        None => {
            usage();
            Ok(())
        }
    }
}

fn usage() {
    eprintln!("segnala - console for the segnala incident backend");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  segnala login [email]    Sign in ({EMAIL_ENV}/{PASSWORD_ENV} skip the prompts)");
    eprintln!("  segnala logout           Sign out and wipe the stored credential");
    eprintln!("  segnala whoami           Show the signed-in identity");
    eprintln!("  segnala views            List views and whether this session may open them");
    eprintln!("  segnala open <view>      Fetch a view (segnalazioni, clienti, categorie, utenti)");
    eprintln!("  segnala get <path>       Raw GET against the backend");
    eprintln!();
    eprintln!("The backend base URL comes from SEGNALA_API_URL or ~/.config/segnala/config.json.");
}

fn missing_argument(expected: &str) -> Result<()> {
    usage();
    anyhow::bail!("missing argument: expected `segnala {}`", expected)
}

// ============================================================================
// Session plumbing
// ============================================================================

fn open_session() -> Result<Arc<SessionManager>> {
    let dir = state_dir()?;
    Ok(Arc::new(SessionManager::new(Box::new(FileStore::new(dir)))))
}

fn build_gateway(config: &Config, session: Arc<SessionManager>) -> Result<ApiGateway> {
    let base = config.backend_base()?;
    Ok(ApiGateway::new(base, session)?)
}

fn lookup_view(name: &str) -> Result<(&'static str, &'static str, Option<Role>)> {
    VIEWS
        .iter()
        .copied()
        .find(|(view, _, _)| *view == name)
        .ok_or_else(|| {
            let known: Vec<&str> = VIEWS.iter().map(|(view, _, _)| *view).collect();
            anyhow::anyhow!("unknown view {:?} (known views: {})", name, known.join(", "))
        })
}

// ============================================================================
// Commands
// ============================================================================

async fn login(email_arg: Option<String>) -> Result<()> {
    let mut config = Config::load()?;
    let session = open_session()?;

    if let Some(who) = session.identity() {
        println!("Already signed in as {} ({}).", who.email, who.role);
        println!("Run `segnala logout` to switch accounts.");
        return Ok(());
    }

    let gateway = build_gateway(&config, Arc::clone(&session))?;

    let email = match email_arg
        .or_else(|| std::env::var(EMAIL_ENV).ok())
        .map(|e| e.trim().to_string())
        .filter(|e| !e.is_empty())
    {
        Some(email) => email,
        None => prompt_email(config.last_email.as_deref())?,
    };

    // `typed` marks a password entered at the prompt; only those are
    // eligible for the remember offer below.
    let mut typed = false;
    let password = match std::env::var(PASSWORD_ENV) {
        Ok(password) if !password.is_empty() => password,
        _ => {
            if Keychain::has(&email) {
                print!("Use remembered password? [Y/n]: ");
                io::stdout().flush()?;

                let mut input = String::new();
                io::stdin().read_line(&mut input)?;

                if input.trim().to_lowercase() != "n" {
                    Keychain::lookup(&email)?
                } else {
                    typed = true;
                    prompt_password()?
                }
            } else {
                typed = true;
                prompt_password()?
            }
        }
    };

    println!("Authenticating...");

    let identity = match gateway.login(&email, &password).await {
        Ok(identity) => identity,
        Err(GatewayError::Auth) => {
            eprintln!("Invalid credentials.");
            std::process::exit(1);
        }
        Err(e) => return Err(e).context("Login failed"),
    };

    // Storing the password is opt-in, offered only after a typed one.
    if typed {
        print!("Remember password? [y/N]: ");
        io::stdout().flush()?;

        let mut answer = String::new();
        io::stdin().read_line(&mut answer)?;

        match keychain_action(&answer, Keychain::has(&email)) {
            KeychainAction::Store => {
                if let Err(e) = Keychain::remember(&email, &password) {
                    warn!(error = %e, "Failed to store password in keychain");
                }
            }
            KeychainAction::DropStale => {
                if let Err(e) = Keychain::forget(&email) {
                    warn!(error = %e, "Failed to remove stale keychain entry");
                }
            }
            KeychainAction::Leave => {}
        }
    }

    config.last_email = Some(email);
    if let Err(e) = config.save() {
        warn!(error = %e, "Failed to save config");
    }

    println!("Signed in as {} ({}).", identity.email, identity.role);
    Ok(())
}

fn logout() -> Result<()> {
    let session = open_session()?;
    if session.is_authenticated() {
        session.logout();
        println!("Signed out.");
    } else {
        println!("No active session.");
    }
    Ok(())
}

fn whoami() -> Result<()> {
    let session = open_session()?;
    match session.identity() {
        Some(who) => {
            println!("{} ({})", who.email, who.role);
            if let Some(cliente) = who.cliente_id {
                println!("cliente: {}", cliente);
            }
        }
        None => println!("Not signed in."),
    }
    Ok(())
}

fn views() -> Result<()> {
    let session = open_session()?;
    let state = session.snapshot();

    for (name, _, required) in VIEWS {
        let verdict = match guard::evaluate(&state, *required) {
            Access::Allow => "open",
            Access::RedirectToLogin => "sign in required",
            Access::RedirectToDefault => "admin only",
        };
        println!("{:<14} {}", name, verdict);
    }
    Ok(())
}

async fn open(view_name: &str) -> Result<()> {
    let (name, path, required) = lookup_view(view_name)?;
    let config = Config::load()?;
    let session = open_session()?;

    let target = match guard::evaluate(&session.snapshot(), required) {
        Access::Allow => (name, path),
        Access::RedirectToLogin => {
            eprintln!("Not signed in. Run `segnala login` first.");
            std::process::exit(1);
        }
        Access::RedirectToDefault => {
            eprintln!(
                "The {} view needs the admin role; showing {} instead.",
                name, DEFAULT_VIEW
            );
            let (default_name, default_path, _) = lookup_view(DEFAULT_VIEW)?;
            (default_name, default_path)
        }
    };

    let gateway = build_gateway(&config, session)?;
    fetch_and_print(&gateway, target.0, target.1).await
}

async fn get(path: &str) -> Result<()> {
    let config = Config::load()?;
    let session = open_session()?;
    let gateway = build_gateway(&config, session)?;

    let path = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    };
    fetch_and_print(&gateway, &path, &path).await
}

async fn fetch_and_print(gateway: &ApiGateway, label: &str, path: &str) -> Result<()> {
    match gateway.get::<Value>(path).await {
        Ok(data) => {
            println!("{}", serde_json::to_string_pretty(&data)?);
            Ok(())
        }
        Err(GatewayError::Auth) => {
            eprintln!("The backend rejected the session; you have been signed out.");
            eprintln!("Run `segnala login` to sign in again.");
            std::process::exit(1);
        }
        Err(GatewayError::Api { status, body }) => {
            eprintln!("{} failed with status {}: {}", label, status, body);
            std::process::exit(1);
        }
        Err(e) => Err(e).with_context(|| format!("Failed to fetch {}", label)),
    }
}

// ============================================================================
// Prompts
// ============================================================================

fn prompt_email(last: Option<&str>) -> Result<String> {
    match last {
        Some(last) => {
            print!("Email [{}]: ", last);
            io::stdout().flush()?;

            let mut input = String::new();
            io::stdin().read_line(&mut input)?;
            let input = input.trim();

            if input.is_empty() {
                Ok(last.to_string())
            } else {
                Ok(input.to_string())
            }
        }
        None => {
            print!("Email: ");
            io::stdout().flush()?;

            let mut email = String::new();
            io::stdin().read_line(&mut email)?;
            Ok(email.trim().to_string())
        }
    }
}

fn prompt_password() -> Result<String> {
    let password = rpassword::prompt_password("Password: ")?;
    Ok(password)
}

/// What to do with the keychain after the remember prompt. Declining
/// while an entry exists for the email drops that stale entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeychainAction {
    Store,
    DropStale,
    Leave,
}

fn keychain_action(answer: &str, has_remembered: bool) -> KeychainAction {
    if answer.trim().to_lowercase() == "y" {
        KeychainAction::Store
    } else if has_remembered {
        KeychainAction::DropStale
    } else {
        KeychainAction::Leave
    }
}
