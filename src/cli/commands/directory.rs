use clap::{Arg, Command};

pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("directory-url")
                .long("directory-url")
                .help("User directory search endpoint used to revalidate sessions")
                .env("GATEKEEPER_DIRECTORY_URL"),
        )
        .arg(
            Arg::new("directory-token")
                .long("directory-token")
                .help("Bearer token sent to the user directory")
                .env("GATEKEEPER_DIRECTORY_TOKEN")
                .hide_env_values(true)
                .requires("directory-url"),
        )
}
