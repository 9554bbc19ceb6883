use clap::{Arg, Command};

pub fn with_args(command: Command) -> Command {
    let command = with_client_args(command);
    with_endpoint_args(command)
}

fn with_client_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("sso-client-id")
                .long("sso-client-id")
                .help("OAuth client id registered with the identity provider")
                .env("GATEKEEPER_SSO_CLIENT_ID"),
        )
        .arg(
            Arg::new("sso-client-secret")
                .long("sso-client-secret")
                .help("OAuth client secret registered with the identity provider")
                .env("GATEKEEPER_SSO_CLIENT_SECRET")
                .hide_env_values(true),
        )
        .arg(
            Arg::new("sso-redirect-uri")
                .long("sso-redirect-uri")
                .help("Callback URL the identity provider redirects back to")
                .env("GATEKEEPER_SSO_REDIRECT_URI"),
        )
        .arg(
            Arg::new("sso-post-logout-redirect-uri")
                .long("sso-post-logout-redirect-uri")
                .help("URL the identity provider returns to after logout (default: redirect URI)")
                .env("GATEKEEPER_SSO_POST_LOGOUT_REDIRECT_URI"),
        )
        .arg(
            Arg::new("sso-scopes")
                .long("sso-scopes")
                .help("Scopes requested during authorization")
                .env("GATEKEEPER_SSO_SCOPES")
                .default_value(crate::auth::sso::DEFAULT_SCOPES),
        )
}

fn with_endpoint_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("sso-auth-url")
                .long("sso-auth-url")
                .help("Identity provider authorization endpoint")
                .env("GATEKEEPER_SSO_AUTH_URL"),
        )
        .arg(
            Arg::new("sso-token-url")
                .long("sso-token-url")
                .help("Identity provider token endpoint")
                .env("GATEKEEPER_SSO_TOKEN_URL"),
        )
        .arg(
            Arg::new("sso-userinfo-url")
                .long("sso-userinfo-url")
                .help("Identity provider userinfo endpoint")
                .env("GATEKEEPER_SSO_USERINFO_URL"),
        )
        .arg(
            Arg::new("sso-logout-url")
                .long("sso-logout-url")
                .help("Identity provider end-session endpoint")
                .env("GATEKEEPER_SSO_LOGOUT_URL"),
        )
}
