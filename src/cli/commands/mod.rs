use clap::{
    Arg, ArgAction, ColorChoice, Command,
    builder::styling::{AnsiColor, Effects, Styles},
};

/// Pure clap command definitions with zero business logic
#[must_use]
#[allow(clippy::too_many_lines)]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    Command::new(env!("CARGO_PKG_NAME"))
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Auto)
        .styles(styles)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("verbose")
                .help("increase log verbosity (-v info, -vv debug, -vvv trace)")
                .long("verbose")
                .short('v')
                .global(true)
                .action(ArgAction::Count),
        )
        .subcommand(
            Command::new("resolve")
                .about("resolve a TLS client context and print its summary as JSON")
                .arg(
                    Arg::new("config")
                        .env("TLSCTX_CONFIG")
                        .help("JSON file with TLS options; flags take precedence")
                        .long("config")
                        .short('c')
                        .long_help(
                            "JSON file with TLS options, every key optional:\n\n\
                            {\n  \"cert_file\": \"client.pem\",\n  \"key_file\": \"client.key\",\n  \
                            \"ca_file\": \"ca.pem\",\n  \"crl_file\": \"ca.crl\",\n  \
                            \"cert_reqs\": \"CERT_REQUIRED\"\n}\n\n\
                            Values given as flags or environment variables override the file."
                        )
                        .value_name("PATH"),
                )
                .arg(
                    Arg::new("tls-cert")
                        .env("TLSCTX_TLS_CERT")
                        .help("Path to client certificate file for TLS client authentication")
                        .long("tls-cert")
                        .long_help(
                            "Path to client certificate chain (PEM) for mutual TLS authentication.\n\
                            Without --tls-key the private key is read from this file.\n\n\
                            Example: /etc/tlsctx/client.pem"
                        )
                        .value_name("PATH"),
                )
                .arg(
                    Arg::new("tls-key")
                        .env("TLSCTX_TLS_KEY")
                        .help("Path to client private key file for TLS client authentication")
                        .long("tls-key")
                        .value_name("PATH"),
                )
                .arg(
                    Arg::new("tls-ca")
                        .env("TLSCTX_TLS_CA")
                        .help("Path to CA certificate file for TLS verification")
                        .long("tls-ca")
                        .long_help(
                            "Path to Certificate Authority (CA) certificate file (PEM).\n\
                            When absent, CA certificates are resolved from the platform:\n\
                            system defaults, default verify paths, OS store, bundled roots.\n\n\
                            Example: /etc/ssl/certs/ca-certificates.crt"
                        )
                        .value_name("PATH"),
                )
                .arg(
                    Arg::new("tls-crl")
                        .env("TLSCTX_TLS_CRL")
                        .help("Path to certificate revocation list (PEM)")
                        .long("tls-crl")
                        .value_name("PATH"),
                )
                .arg(
                    Arg::new("cert-reqs")
                        .env("TLSCTX_CERT_REQS")
                        .help("Server certificate verification: CERT_NONE, CERT_OPTIONAL, CERT_REQUIRED")
                        .long("cert-reqs")
                        .long_help(
                            "Server certificate verification requirement:\n\n\
                            - CERT_NONE (0): no verification\n\
                            - CERT_OPTIONAL (1): verify the presented certificate\n\
                            - CERT_REQUIRED (2): require and verify a certificate (default)"
                        )
                        .value_name("MODE"),
                ),
        )
        .subcommand(
            Command::new("capabilities")
                .about("print the trust-resolution capabilities of this build as JSON"),
        )
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    #[test]
    fn test_new() {
        let cmd = new();
        assert_eq!(cmd.get_name(), "tlsctx");
        assert_eq!(
            cmd.get_about().unwrap().to_string(),
            env!("CARGO_PKG_DESCRIPTION")
        );
        assert_eq!(
            cmd.get_version().unwrap().to_string(),
            env!("CARGO_PKG_VERSION")
        );
    }

    #[test]
    fn test_new_no_args() {
        let cmd = new();
        let matches = cmd.try_get_matches_from(vec!["tlsctx"]);
        assert!(matches.is_err());
    }

    #[test]
    fn test_resolve_args() {
        let cmd = new();
        let matches = cmd
            .try_get_matches_from(vec![
                "tlsctx",
                "-vv",
                "resolve",
                "--tls-cert",
                "client.pem",
                "--tls-ca",
                "ca.pem",
                "--cert-reqs",
                "CERT_REQUIRED",
            ])
            .unwrap();

        assert_eq!(matches.get_count("verbose"), 2);
        let (name, sub) = matches.subcommand().unwrap();
        assert_eq!(name, "resolve");
        assert_eq!(
            sub.get_one::<String>("tls-cert"),
            Some(&String::from("client.pem"))
        );
        assert_eq!(sub.get_one::<String>("tls-ca"), Some(&String::from("ca.pem")));
        assert_eq!(
            sub.get_one::<String>("cert-reqs"),
            Some(&String::from("CERT_REQUIRED"))
        );
    }

    #[test]
    fn test_key_without_cert_flag() {
        // the certificate may come from --config
        let cmd = new();
        let matches = cmd
            .try_get_matches_from(vec!["tlsctx", "resolve", "--tls-key", "client.key"])
            .unwrap();
        let (_, sub) = matches.subcommand().unwrap();
        assert_eq!(
            sub.get_one::<String>("tls-key"),
            Some(&String::from("client.key"))
        );
        assert!(sub.get_one::<String>("tls-cert").is_none());
    }

    #[test]
    fn test_capabilities_subcommand() {
        let cmd = new();
        let matches = cmd
            .try_get_matches_from(vec!["tlsctx", "capabilities"])
            .unwrap();
        assert_eq!(matches.subcommand_name(), Some("capabilities"));
        assert_eq!(matches.get_count("verbose"), 0);
    }
}
