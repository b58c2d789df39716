use admission_policy::{allow_list::AllowList, classifier::RequestFilter};
use anyhow::{anyhow, Result};
use clap::ArgMatches;
use lazy_static::lazy_static;
use std::net::SocketAddr;

lazy_static! {
    pub(crate) static ref HOSTNAME: String =
        std::env::var("HOSTNAME").unwrap_or_else(|_| String::from("unknown"));
}

/// Immutable process configuration, built once from the command line and
/// handed by reference to everything that needs it.
pub struct Config {
    pub addr: SocketAddr,
    pub tls_config: Option<TlsConfig>,
    pub filter: RequestFilter,
    pub watch_webhook_configurations: bool,
    pub log_level: String,
    pub log_fmt: String,
    pub log_no_color: bool,
}

pub struct TlsConfig {
    pub cert_file: String,
    pub key_file: String,
}

impl Config {
    pub fn from_args(matches: &ArgMatches) -> Result<Self> {
        let addr = api_bind_address(matches)?;

        let (cert_file, key_file) = tls_files(matches)?;
        let tls_config = if cert_file.is_empty() {
            None
        } else {
            Some(TlsConfig {
                cert_file,
                key_file,
            })
        };

        let filter = RequestFilter::new(
            allow_list(matches, "api-groups"),
            allow_list(matches, "resources"),
            allow_list(matches, "operations"),
        );

        let watch_webhook_configurations = matches
            .get_one::<bool>("watch-webhook-configurations")
            .expect("clap should have set a default value")
            .to_owned();

        let log_level = matches
            .get_one::<String>("log-level")
            .expect("This should not happen, there's a default value for log-level")
            .to_owned();
        let log_fmt = matches
            .get_one::<String>("log-fmt")
            .expect("This should not happen, there's a default value for log-fmt")
            .to_owned();
        let log_no_color = matches
            .get_one::<bool>("log-no-color")
            .expect("clap should have assigned a default value")
            .to_owned();

        Ok(Self {
            addr,
            tls_config,
            filter,
            watch_webhook_configurations,
            log_level,
            log_fmt,
            log_no_color,
        })
    }
}

fn api_bind_address(matches: &ArgMatches) -> Result<SocketAddr> {
    format!(
        "{}:{}",
        matches.get_one::<String>("address").unwrap(),
        matches.get_one::<String>("port").unwrap()
    )
    .parse()
    .map_err(|e| anyhow!("error parsing arguments: {}", e))
}

fn tls_files(matches: &ArgMatches) -> Result<(String, String)> {
    let cert_file = matches.get_one::<String>("cert-file").unwrap().to_owned();
    let key_file = matches.get_one::<String>("key-file").unwrap().to_owned();
    if cert_file.is_empty() != key_file.is_empty() {
        Err(anyhow!("error parsing arguments: either both --cert-file and --key-file must be provided, or neither"))
    } else {
        Ok((cert_file, key_file))
    }
}

fn allow_list(matches: &ArgMatches, id: &str) -> AllowList {
    matches
        .get_one::<String>(id)
        .expect("clap should have set a default value")
        .parse()
        .expect("parsing an allow list cannot fail")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli;
    use admission_policy::classifier::Classification;

    fn config_from(flags: &[&str]) -> Result<Config> {
        let mut args = vec!["admission-server"];
        args.extend(flags);
        let matches = cli::build_cli().try_get_matches_from(args).unwrap();
        Config::from_args(&matches)
    }

    #[test]
    fn default_bind_address() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.addr, SocketAddr::from(([0, 0, 0, 0], 9443)));
        assert!(config.tls_config.is_none());
    }

    #[test]
    fn tls_files_must_be_given_together() {
        assert!(config_from(&["--cert-file=/tmp/cert.pem"]).is_err());
        assert!(config_from(&["--key-file=/tmp/key.pem"]).is_err());

        let config =
            config_from(&["--cert-file=/tmp/cert.pem", "--key-file=/tmp/key.pem"]).unwrap();
        let tls_config = config.tls_config.unwrap();
        assert_eq!(tls_config.cert_file, "/tmp/cert.pem");
        assert_eq!(tls_config.key_file, "/tmp/key.pem");
    }

    #[test]
    fn filter_is_built_from_comma_separated_lists() {
        let config = config_from(&[
            "--api-groups=apps,batch",
            "--resources=*",
            "--operations=CREATE,UPDATE",
        ])
        .unwrap();

        assert_eq!(
            config.filter.classify("apps", "deployments", "CREATE"),
            Classification::InScope
        );
        assert_eq!(
            config.filter.classify("core", "deployments", "CREATE"),
            Classification::PassThrough
        );
    }

    #[test]
    fn empty_lists_put_nothing_in_scope() {
        let config = config_from(&[]).unwrap();
        assert_eq!(
            config.filter.classify("apps", "deployments", "CREATE"),
            Classification::PassThrough
        );
    }
}
