use clap::{Arg, Command};

pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("domain-url")
                .long("domain-url")
                .help("Public base URL of the site, used for login and return-to URLs")
                .env("GATEKEEPER_DOMAIN_URL")
                .default_value("http://localhost:8080"),
        )
        .arg(
            Arg::new("https-domain-url")
                .long("https-domain-url")
                .help("Base URL used when the request arrived over https")
                .env("GATEKEEPER_HTTPS_DOMAIN_URL"),
        )
}
