use crate::auth::provider::password::PasswordAccounts;
use crate::auth::site::SiteUrls;
use crate::auth::sso::SsoConfig;
use crate::auth::AuthConfig;
use crate::cli::actions::{server::Args, Action};
use anyhow::{Context, Result};
use clap::ArgMatches;
use secrecy::SecretString;
use url::Url;

const SSO_ARGS: [&str; 4] = [
    "sso-client-id",
    "sso-auth-url",
    "sso-token-url",
    "sso-userinfo-url",
];

fn string_arg(matches: &ArgMatches, id: &str) -> Option<String> {
    matches
        .get_one::<String>(id)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);

    let domain_url = string_arg(matches, "domain-url")
        .context("missing required argument: --domain-url")?;
    Url::parse(&domain_url).context("invalid GATEKEEPER_DOMAIN_URL")?;
    let https_domain_url = string_arg(matches, "https-domain-url");
    if let Some(url) = &https_domain_url {
        Url::parse(url).context("invalid GATEKEEPER_HTTPS_DOMAIN_URL")?;
    }
    let site = SiteUrls::new(&domain_url).with_https_domain_url(https_domain_url);

    let token_salt = string_arg(matches, "token-salt")
        .map(SecretString::from)
        .context("missing required argument: --token-salt")?;

    let password_accounts = match string_arg(matches, "password-accounts") {
        Some(raw) => PasswordAccounts::parse(&raw).context("invalid GATEKEEPER_PASSWORD_ACCOUNTS")?,
        None => PasswordAccounts::default(),
    };

    let mut config = AuthConfig::new(site, token_salt)
        .with_password_accounts(password_accounts)
        .with_session_ttl_seconds(
            matches
                .get_one::<i64>("session-ttl-seconds")
                .copied()
                .unwrap_or(crate::auth::issuer::DEFAULT_SESSION_LIFETIME_SECONDS),
        );
    if let Some(version) = string_arg(matches, "login-version") {
        config = config.with_default_version(&version);
    }
    if let Some(version) = string_arg(matches, "login-fallback-version") {
        config = config.with_fallback_version(&version);
    }
    if let Some(sso) = sso_config(matches, &domain_url) {
        config = config.with_sso(sso);
    }

    let directory_url = string_arg(matches, "directory-url")
        .map(|url| Url::parse(&url))
        .transpose()
        .context("invalid GATEKEEPER_DIRECTORY_URL")?;
    let directory_token = string_arg(matches, "directory-token").map(SecretString::from);

    Ok(Action::Server(Args {
        port,
        config,
        directory_url,
        directory_token,
    }))
}

// Any core SSO setting registers the provider; partial settings are reported at startup.
fn sso_config(matches: &ArgMatches, domain_url: &str) -> Option<SsoConfig> {
    if !SSO_ARGS.iter().any(|id| string_arg(matches, id).is_some()) {
        return None;
    }

    let secret = string_arg(matches, "sso-client-secret").unwrap_or_default();
    let redirect_uri = string_arg(matches, "sso-redirect-uri").unwrap_or_else(|| {
        format!("{}/oidc/callback", domain_url.trim_end_matches('/'))
    });

    let mut sso = SsoConfig::new(
        &string_arg(matches, "sso-client-id").unwrap_or_default(),
        SecretString::from(secret),
    )
    .with_redirect_uri(&redirect_uri)
    .with_post_logout_redirect_uri(string_arg(matches, "sso-post-logout-redirect-uri"))
    .with_auth_url(&string_arg(matches, "sso-auth-url").unwrap_or_default())
    .with_token_url(&string_arg(matches, "sso-token-url").unwrap_or_default())
    .with_userinfo_url(&string_arg(matches, "sso-userinfo-url").unwrap_or_default());
    if let Some(url) = string_arg(matches, "sso-logout-url") {
        sso = sso.with_logout_url(&url);
    }
    if let Some(scopes) = string_arg(matches, "sso-scopes") {
        sso = sso.with_scopes(&scopes);
    }
    Some(sso)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands;

    fn parse(args: &[&str]) -> Result<Args> {
        let mut argv = vec!["gatekeeper", "--token-salt", "pepper"];
        argv.extend_from_slice(args);
        let matches = commands::new().try_get_matches_from(argv)?;
        let Action::Server(args) = handler(&matches)?;
        Ok(args)
    }

    #[test]
    fn defaults_to_password_without_sso() {
        let args = parse(&["--password-accounts", "alice:wonder"]).unwrap();
        assert_eq!(args.port, 8080);
        assert_eq!(args.config.default_version(), "password");
        assert_eq!(args.config.fallback_version(), "open");
        assert!(args.config.sso().is_none());
        assert!(!args.config.password_accounts().is_empty());
        assert!(args.directory_url.is_none());
    }

    #[test]
    fn sso_redirect_defaults_to_callback_route() {
        let args = parse(&[
            "--domain-url",
            "https://auth.tld/",
            "--login-version",
            "sso",
            "--sso-client-id",
            "gatekeeper",
            "--sso-auth-url",
            "https://idp.tld/authorize",
            "--sso-token-url",
            "https://idp.tld/token",
            "--sso-userinfo-url",
            "https://idp.tld/userinfo",
        ])
        .unwrap();
        let sso = args.config.sso().unwrap();
        assert!(sso.is_configured());
        assert_eq!(sso.redirect_uri(), "https://auth.tld/oidc/callback");
        assert_eq!(sso.post_logout_redirect_uri(), "https://auth.tld/oidc/callback");
        assert_eq!(args.config.default_version(), "sso");
    }

    #[test]
    fn partial_sso_is_kept_for_reporting() {
        let args = parse(&["--sso-client-id", "gatekeeper"]).unwrap();
        let sso = args.config.sso().unwrap();
        assert!(sso.is_partially_configured());
    }

    #[test]
    fn rejects_invalid_directory_url() {
        assert!(parse(&["--directory-url", "not a url"]).is_err());
    }

    #[test]
    fn rejects_malformed_password_accounts() {
        assert!(parse(&["--password-accounts", "alice"]).is_err());
    }

    #[test]
    fn directory_token_is_carried() {
        let args = parse(&[
            "--directory-url",
            "https://dir.tld/users",
            "--directory-token",
            "secret",
        ])
        .unwrap();
        assert_eq!(
            args.directory_url.map(|url| url.to_string()),
            Some("https://dir.tld/users".to_string())
        );
        assert!(args.directory_token.is_some());
    }
}
