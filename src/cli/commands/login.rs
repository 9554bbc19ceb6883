use clap::{Arg, Command};

pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("login-version")
                .long("login-version")
                .help("Default login provider version: password, sso or open")
                .env("GATEKEEPER_LOGIN_VERSION")
                .default_value("password"),
        )
        .arg(
            Arg::new("login-fallback-version")
                .long("login-fallback-version")
                .help("Provider used when the requested and default versions are missing")
                .env("GATEKEEPER_LOGIN_FALLBACK_VERSION")
                .default_value("open"),
        )
        .arg(
            Arg::new("password-accounts")
                .long("password-accounts")
                .help("Local accounts for the password provider, as user:password pairs separated by commas")
                .env("GATEKEEPER_PASSWORD_ACCOUNTS")
                .hide_env_values(true),
        )
}
