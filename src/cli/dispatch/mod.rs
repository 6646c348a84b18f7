use crate::{
    cli::actions::Action,
    tls::{CertReqsValue, TlsOptions},
};
use anyhow::{Result, bail};
use clap::ArgMatches;
use std::path::{Path, PathBuf};

/// Extract TLS options from the `resolve` flags
///
/// A numeric `--cert-reqs` is kept as a code, anything else as an alias;
/// both are validated later by the context builder.
fn extract_tls_options(matches: &ArgMatches) -> TlsOptions {
    let path = |name: &str| matches.get_one::<String>(name).map(PathBuf::from);

    let cert_reqs = matches
        .get_one::<String>("cert-reqs")
        .map(|value| {
            value
                .parse::<i64>()
                .map_or_else(|_| CertReqsValue::from(value.as_str()), CertReqsValue::from)
        });

    TlsOptions {
        cert_file: path("tls-cert"),
        key_file: path("tls-key"),
        ca_file: path("tls-ca"),
        crl_file: path("tls-crl"),
        cert_reqs,
    }
}

/// Convert `ArgMatches` into typed Action enum with validation
///
/// # Errors
///
/// Returns an error if the options file cannot be loaded or the subcommand is unknown
pub fn dispatch(matches: &ArgMatches) -> Result<Action> {
    match matches.subcommand() {
        Some(("resolve", sub)) => {
            let flags = extract_tls_options(sub);
            let options = match sub.get_one::<String>("config") {
                Some(config) => TlsOptions::from_json_file(Path::new(config))?.merge(flags),
                None => flags,
            };
            Ok(Action::Resolve { options })
        }
        Some(("capabilities", _)) => Ok(Action::Capabilities),
        Some((name, _)) => bail!("unknown command: {name}"),
        None => bail!("no command given"),
    }
}
