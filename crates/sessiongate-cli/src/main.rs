//! sessiongate - command-line session helper for bearer-token backends.
//!
//! Logs in, keeps the access token in the OS keychain (or a cache file),
//! checks it against the backend, and sends authenticated requests.

use std::io::{self, BufRead, Write};
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use sessiongate_core::{
    open_store, Config, FileStore, Navigator, ReqwestTransport, SessionGuard, SessionManager,
    StoreKind,
};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// ============================================================================
// Constants
// ============================================================================

/// Exit code used when the user has to log in again
const EXIT_LOGIN_REQUIRED: u8 = 2;

const USAGE: &str = "\
Usage: sessiongate <command> [args]

Commands:
  login [username]     Log in and store the access token
  logout               Forget the stored token
  check <path>         Check whether the session may open <path>
  whoami               Show the account behind the stored token
  fetch <url> [method] Send an authenticated request, print the body
  status               Show where the token is kept and whether one is stored
  help                 Show this message";

/// Initialize the tracing subscriber for logging
fn init_tracing() -> WorkerGuard {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    let (writer, guard) = tracing_appender::non_blocking(io::stderr());

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer))
        .with(filter)
        .init();
    guard
}

/// Terminal stand-in for a page redirect: tells the user to log in and
/// remembers that it happened so the process can exit accordingly.
#[derive(Default)]
struct TerminalNavigator {
    redirected: AtomicBool,
}

impl TerminalNavigator {
    fn redirected(&self) -> bool {
        self.redirected.load(Ordering::SeqCst)
    }
}

impl Navigator for TerminalNavigator {
    fn redirect(&self, path: &str) {
        self.redirected.store(true, Ordering::SeqCst);
        eprintln!("Login required ({}). Run `sessiongate login`.", path);
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let _log_guard = init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first() else {
        eprintln!("{}", USAGE);
        return Ok(ExitCode::from(1));
    };

    let config = Config::load()?;
    let store = open_store(&config)?;
    let transport = Arc::new(ReqwestTransport::new()?);
    let session = SessionManager::new(config.clone(), store, transport);
    let navigator = Arc::new(TerminalNavigator::default());
    let guard = SessionGuard::new(session, navigator.clone());

    info!(command = %command, api_base = %config.api_base, "sessiongate starting");

    match command.as_str() {
        "login" => login(&guard, args.get(1).cloned()).await?,
        "logout" => {
            guard.logout();
            return Ok(ExitCode::SUCCESS);
        }
        "check" => {
            let path = args.get(1).context("check needs a path, e.g. /dashboard.html")?;
            if guard.check_auth(path).await {
                println!("ok");
            }
        }
        "whoami" => whoami(&guard).await?,
        "fetch" => {
            let url = args.get(1).context("fetch needs a URL")?;
            let method = args.get(2).map(String::as_str).unwrap_or("GET");
            fetch(&guard, url, method).await?;
        }
        "status" => status(&config, guard.session())?,
        "help" | "--help" | "-h" => println!("{}", USAGE),
        other => {
            eprintln!("Unknown command: {}\n\n{}", other, USAGE);
            return Ok(ExitCode::from(1));
        }
    }

    if navigator.redirected() {
        return Ok(ExitCode::from(EXIT_LOGIN_REQUIRED));
    }
    Ok(ExitCode::SUCCESS)
}

async fn login(guard: &SessionGuard, username: Option<String>) -> Result<()> {
    let username = match username {
        Some(name) => name,
        None => {
            print!("Username: ");
            io::stdout().flush()?;
            let mut line = String::new();
            io::stdin().lock().read_line(&mut line)?;
            line.trim().to_string()
        }
    };
    if username.is_empty() {
        anyhow::bail!("Username must not be empty");
    }

    let password = rpassword::prompt_password("Password: ")
        .context("Failed to read password")?;

    guard
        .session()
        .login(&username, &password)
        .await
        .context("Login failed")?;
    println!("Logged in as {}", username);
    Ok(())
}

async fn whoami(guard: &SessionGuard) -> Result<()> {
    match guard.session().current_user().await {
        Ok(user) => {
            println!("{} <{}>", user.username, user.email);
            println!("  id:      {}", user.id);
            println!("  role:    {}", user.role);
            println!("  active:  {}", user.is_active);
            println!("  created: {}", user.created_at.format("%Y-%m-%d %H:%M UTC"));
            Ok(())
        }
        Err(sessiongate_core::ApiError::Unauthorized) => {
            guard.logout();
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

async fn fetch(guard: &SessionGuard, url: &str, method: &str) -> Result<()> {
    // Relative URLs are resolved against the API base
    let url = if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        guard.session().config().endpoint(url)
    };

    let method = method.to_ascii_uppercase();
    let request = sessiongate_core::http::Request::builder()
        .method(method.as_str())
        .uri(url.as_str())
        .body(Vec::new())
        .with_context(|| format!("Invalid request: {} {}", method, url))?;

    let response = guard.auth_fetch(request).await?;
    eprintln!("{} {}", response.status(), url);

    let body = response.into_body();
    match serde_json::from_slice::<serde_json::Value>(&body) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => io::stdout().write_all(&body)?,
    }
    Ok(())
}

fn status(config: &Config, session: &SessionManager) -> Result<()> {
    println!("API base:   {}", config.api_base);
    println!("Login page: {}", config.login_path);
    match config.store {
        StoreKind::Keyring => println!("Token store: OS keychain"),
        StoreKind::File => {
            let dir = config.cache_dir()?;
            println!("Token store: {}", dir.display());
            if let Some(saved_at) = FileStore::new(dir).saved_at()? {
                println!("Saved at:   {}", saved_at.format("%Y-%m-%d %H:%M UTC"));
            }
        }
    }
    let stored = if session.credential().is_some() { "yes" } else { "no" };
    println!("Token stored: {}", stored);
    Ok(())
}
