use clap::{
    builder::{
        styling::{AnsiColor, Effects, Styles},
        ValueParser,
    },
    Arg, ColorChoice, Command,
};

pub fn validator_log_level() -> ValueParser {
    ValueParser::from(move |level: &str| -> std::result::Result<u8, String> {
        if let Ok(parsed) = level.parse::<u8>() {
            // Successfully parsed as a number
            if parsed <= 5 {
                return Ok(parsed);
            }
        }

        match level.to_lowercase().as_str() {
            "error" => Ok(0),
            "warn" => Ok(1),
            "info" => Ok(2),
            "debug" => Ok(3),
            "trace" => Ok(4),
            _ => Err("invalid log level".to_string()),
        }
    })
}

pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    Command::new("forno")
        .about("Authentication-gated SPA backend and Management API token broker")
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .help("Port to listen on")
                .default_value("3001")
                .env("FORNO_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("domain")
                .long("domain")
                .help("Identity provider tenant domain, example: tenant.auth0.com")
                .env("FORNO_DOMAIN")
                .required(true),
        )
        .arg(
            Arg::new("audience")
                .long("audience")
                .help("API audience expected in inbound access tokens")
                .env("FORNO_AUDIENCE")
                .required(true),
        )
        .arg(
            Arg::new("m2m-client-id")
                .long("m2m-client-id")
                .help("Machine-to-machine client id used for the client-credentials grant")
                .env("FORNO_M2M_CLIENT_ID")
                .required(true),
        )
        .arg(
            Arg::new("m2m-client-secret")
                .long("m2m-client-secret")
                .help("Machine-to-machine client secret")
                .env("FORNO_M2M_CLIENT_SECRET")
                .required(true),
        )
        .arg(
            Arg::new("web-root")
                .long("web-root")
                .help("Directory holding the SPA shell and auth_config.json")
                .default_value("public")
                .env("FORNO_WEB_ROOT"),
        )
        .arg(
            Arg::new("verbosity")
                .short('v')
                .long("verbose")
                .help("Verbosity level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
                .env("FORNO_LOG_LEVEL")
                .global(true)
                .action(clap::ArgAction::Count)
                .value_parser(validator_log_level()),
        )
}
