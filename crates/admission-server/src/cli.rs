use clap::builder::PossibleValue;
use clap::{crate_authors, crate_description, crate_name, crate_version, Arg, ArgAction, Command};

pub fn build_cli() -> Command {
    let mut args = vec![
        Arg::new("log-level")
            .long("log-level")
            .value_name("LOG_LEVEL")
            .env("ADMISSION_SERVER_LOG_LEVEL")
            .default_value("info")
            .value_parser([
                PossibleValue::new("trace"),
                PossibleValue::new("debug"),
                PossibleValue::new("info"),
                PossibleValue::new("warn"),
                PossibleValue::new("error"),
            ])
            .help("Log level"),
        Arg::new("log-fmt")
            .long("log-fmt")
            .value_name("LOG_FMT")
            .env("ADMISSION_SERVER_LOG_FMT")
            .default_value("text")
            .value_parser([PossibleValue::new("text"), PossibleValue::new("json")])
            .help("Log output format"),
        Arg::new("log-no-color")
            .long("log-no-color")
            .env("NO_COLOR")
            .action(ArgAction::SetTrue)
            .help("Disable colored output for logs"),
        Arg::new("address")
            .long("addr")
            .value_name("BIND_ADDRESS")
            .default_value("0.0.0.0")
            .env("ADMISSION_SERVER_BIND_ADDRESS")
            .help("Bind against ADDRESS"),
        Arg::new("port")
            .long("port")
            .value_name("PORT")
            .default_value("9443")
            .env("ADMISSION_SERVER_PORT")
            .help("Listen on PORT"),
        Arg::new("cert-file")
            .long("cert-file")
            .value_name("CERT_FILE")
            .default_value("")
            .env("ADMISSION_SERVER_CERT_FILE")
            .help("Path to an X.509 certificate file for HTTPS"),
        Arg::new("key-file")
            .long("key-file")
            .value_name("KEY_FILE")
            .default_value("")
            .env("ADMISSION_SERVER_KEY_FILE")
            .help("Path to an X.509 private key file for HTTPS"),
        Arg::new("api-groups")
            .long("api-groups")
            .value_name("API_GROUPS")
            .default_value("")
            .env("ADMISSION_SERVER_API_GROUPS")
            .help("Comma-separated list of API groups subject to the filter policy, '*' matches any group"),
        Arg::new("resources")
            .long("resources")
            .value_name("RESOURCES")
            .default_value("")
            .env("ADMISSION_SERVER_RESOURCES")
            .help("Comma-separated list of resources subject to the filter policy, '*' matches any resource"),
        Arg::new("operations")
            .long("operations")
            .value_name("OPERATIONS")
            .default_value("")
            .env("ADMISSION_SERVER_OPERATIONS")
            .help("Comma-separated list of operations/verbs subject to the filter policy, '*' matches any operation"),
        Arg::new("watch-webhook-configurations")
            .long("watch-webhook-configurations")
            .env("ADMISSION_SERVER_WATCH_WEBHOOK_CONFIGURATIONS")
            .action(ArgAction::SetTrue)
            .help("Watch ValidatingWebhookConfiguration objects and log their changes"),
    ];
    args.sort_by(|a, b| a.get_id().cmp(b.get_id()));

    Command::new(crate_name!())
        .author(crate_authors!())
        .version(crate_version!())
        .about(crate_description!())
        .args(args)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let matches = build_cli()
            .try_get_matches_from(["admission-server"])
            .unwrap();

        assert_eq!(matches.get_one::<String>("port").unwrap(), "9443");
        assert_eq!(matches.get_one::<String>("address").unwrap(), "0.0.0.0");
        assert_eq!(matches.get_one::<String>("api-groups").unwrap(), "");
        assert!(!matches.get_flag("watch-webhook-configurations"));
    }
}
