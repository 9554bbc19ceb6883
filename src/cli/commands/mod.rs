pub mod directory;
pub mod logging;
pub mod login;
pub mod session;
pub mod site;
pub mod sso;

use clap::{
    builder::styling::{AnsiColor, Effects, Styles},
    Arg, ColorChoice, Command,
};

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    let command = Command::new("gatekeeper")
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .help("Port to listen on")
                .default_value("8080")
                .env("GATEKEEPER_PORT")
                .value_parser(clap::value_parser!(u16)),
        );

    let command = site::with_args(command);
    let command = login::with_args(command);
    let command = sso::with_args(command);
    let command = directory::with_args(command);
    let command = session::with_args(command);
    logging::with_args(command)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new() {
        let command = new();

        assert_eq!(command.get_name(), "gatekeeper");
        assert_eq!(
            command.get_about().map(ToString::to_string),
            Some(env!("CARGO_PKG_DESCRIPTION").to_string())
        );
        assert_eq!(
            command.get_version().map(ToString::to_string),
            Some(env!("CARGO_PKG_VERSION").to_string())
        );
    }

    #[test]
    fn test_check_args() {
        let command = new();
        let matches = command.get_matches_from(vec![
            "gatekeeper",
            "--port",
            "9090",
            "--token-salt",
            "pepper",
            "--domain-url",
            "http://auth.tld",
            "--https-domain-url",
            "https://auth.tld",
            "--login-version",
            "sso",
            "--sso-client-id",
            "gatekeeper",
            "--sso-auth-url",
            "https://idp.tld/authorize",
        ]);

        assert_eq!(matches.get_one::<u16>("port").copied(), Some(9090));
        assert_eq!(
            matches.get_one::<String>("token-salt").cloned(),
            Some("pepper".to_string())
        );
        assert_eq!(
            matches.get_one::<String>("https-domain-url").cloned(),
            Some("https://auth.tld".to_string())
        );
        assert_eq!(
            matches.get_one::<String>("login-version").cloned(),
            Some("sso".to_string())
        );
        assert_eq!(
            matches.get_one::<String>("sso-scopes").cloned(),
            Some(crate::auth::sso::DEFAULT_SCOPES.to_string())
        );
        assert_eq!(matches.get_one::<i64>("session-ttl-seconds").copied(), Some(86400));
    }

    #[test]
    fn test_missing_token_salt() {
        temp_env::with_vars([("GATEKEEPER_TOKEN_SALT", None::<&str>)], || {
            let result = new().try_get_matches_from(vec!["gatekeeper"]);
            assert!(result.is_err());
        });
    }

    #[test]
    fn test_directory_token_requires_url() {
        temp_env::with_vars(
            [
                ("GATEKEEPER_TOKEN_SALT", Some("pepper")),
                ("GATEKEEPER_DIRECTORY_URL", None),
            ],
            || {
                let result = new().try_get_matches_from(vec![
                    "gatekeeper",
                    "--directory-token",
                    "secret",
                ]);
                assert!(result.is_err());
            },
        );
    }

    #[test]
    fn test_check_env() {
        temp_env::with_vars(
            [
                ("GATEKEEPER_PORT", Some("443")),
                ("GATEKEEPER_TOKEN_SALT", Some("pepper")),
                ("GATEKEEPER_DOMAIN_URL", Some("https://auth.tld")),
                ("GATEKEEPER_PASSWORD_ACCOUNTS", Some("alice:wonder")),
                ("GATEKEEPER_DIRECTORY_URL", Some("https://dir.tld/users")),
                ("GATEKEEPER_SESSION_TTL_SECONDS", Some("3600")),
                ("GATEKEEPER_LOG_LEVEL", Some("info")),
            ],
            || {
                let command = new();
                let matches = command.get_matches_from(vec!["gatekeeper"]);
                assert_eq!(matches.get_one::<u16>("port").copied(), Some(443));
                assert_eq!(
                    matches.get_one::<String>("domain-url").cloned(),
                    Some("https://auth.tld".to_string())
                );
                assert_eq!(
                    matches.get_one::<String>("password-accounts").cloned(),
                    Some("alice:wonder".to_string())
                );
                assert_eq!(
                    matches.get_one::<String>("directory-url").cloned(),
                    Some("https://dir.tld/users".to_string())
                );
                assert_eq!(matches.get_one::<i64>("session-ttl-seconds").copied(), Some(3600));
                assert_eq!(matches.get_one::<u8>("verbosity").copied(), Some(2));
            },
        );
    }

    #[test]
    fn test_check_log_level_env() {
        // loop cover all possible value_parse
        let levels = ["error", "warn", "info", "debug", "trace"];
        for (index, &level) in levels.iter().enumerate() {
            temp_env::with_vars(
                [
                    ("GATEKEEPER_LOG_LEVEL", Some(level)),
                    ("GATEKEEPER_TOKEN_SALT", Some("pepper")),
                ],
                || {
                    let command = new();
                    let matches = command.get_matches_from(vec!["gatekeeper"]);
                    assert_eq!(
                        matches.get_one::<u8>("verbosity").copied(),
                        u8::try_from(index).ok()
                    );
                },
            );
        }
    }
}
