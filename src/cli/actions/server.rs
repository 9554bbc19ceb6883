use crate::{
    api,
    auth::{
        directory::{AccountStatus, DirectoryClient, DirectoryRecord, HttpDirectoryClient, StaticDirectory},
        session::MemorySessionStore,
        AuthConfig, AuthService,
    },
    cli::telemetry,
};
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::{sync::Arc, time::Duration};
use tracing::{info, warn};
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub config: AuthConfig,
    pub directory_url: Option<Url>,
    pub directory_token: Option<SecretString>,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the auth service cannot be wired or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    log_startup_args(&args);

    let directory = directory_client(&args)?;
    let ttl = u64::try_from(args.config.session_ttl_seconds()).unwrap_or_default();
    let store = Arc::new(MemorySessionStore::new(Duration::from_secs(ttl)));

    let service = AuthService::new(&args.config, directory, store)
        .context("failed to configure auth providers")?;

    let result = api::new(args.port, Arc::new(service)).await;
    telemetry::shutdown_tracer();
    result
}

fn directory_client(args: &Args) -> Result<Arc<dyn DirectoryClient>> {
    if let Some(url) = &args.directory_url {
        let client = HttpDirectoryClient::new(url.clone(), args.directory_token.clone())
            .context("failed to build directory client")?;
        return Ok(Arc::new(client));
    }

    // Without a directory, local password accounts are the only known identities.
    warn!("no directory configured; sessions are revalidated against local password accounts");
    let records = args
        .config
        .password_accounts()
        .usernames()
        .map(|username| DirectoryRecord::new(username, "", AccountStatus::Active))
        .collect();
    Ok(Arc::new(StaticDirectory::new(records)))
}

fn log_startup_args(args: &Args) {
    let sso = match args.config.sso() {
        Some(sso) if sso.is_configured() => "configured",
        Some(_) => "partial",
        None => "disabled",
    };
    let entries = [
        ("listen", format!("tcp:{}", args.port)),
        ("domain_url", args.config.site().domain_url().to_string()),
        ("default_version", args.config.default_version().to_string()),
        ("fallback_version", args.config.fallback_version().to_string()),
        ("sso", sso.to_string()),
        (
            "directory_url",
            args.directory_url
                .as_ref()
                .map_or_else(|| "none".to_string(), ToString::to_string),
        ),
        (
            "session_ttl_seconds",
            args.config.session_ttl_seconds().to_string(),
        ),
    ];

    let max_key_len = entries.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    let mut message = format!(
        "gatekeeper {} - {}\n\nStartup configuration:",
        env!("CARGO_PKG_VERSION"),
        short_commit(crate::GIT_COMMIT_HASH)
    );
    for (key, value) in &entries {
        let padding = " ".repeat(max_key_len.saturating_sub(key.len()));
        let _ =
            std::fmt::Write::write_fmt(&mut message, format_args!("\n  {key}:{padding} {value}"));
    }
    info!("{message}");
}

fn short_commit(hash: &str) -> &str {
    let trimmed = hash.trim();
    trimmed.get(..7).unwrap_or(trimmed)
}
