use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while resolving a TLS client context
///
/// Every variant is a configuration-time failure: nothing is retried and no
/// partially built context is ever handed back.
#[derive(Debug, Error)]
pub enum TlsError {
    /// No usable TLS implementation in this build
    #[error("TLS is not available: {0}")]
    TlsUnsupported(String),

    /// `cert_reqs` (or another option carrying a verification mode) is not recognized
    #[error(
        "the value of {option} must be one of: CERT_NONE, CERT_OPTIONAL or CERT_REQUIRED (got {value})"
    )]
    InvalidOption { option: String, value: String },

    /// Client certificate chain or private key could not be loaded
    #[error("failed to load client certificate {}: {reason}", path.display())]
    InvalidCertificate { path: PathBuf, reason: String },

    /// Explicit CA file could not be loaded
    #[error("failed to load CA file {}: {reason}", path.display())]
    InvalidCaFile { path: PathBuf, reason: String },

    /// CRL file could not be loaded
    #[error("failed to load CRL file {}: {reason}", path.display())]
    InvalidCrl { path: PathBuf, reason: String },

    /// A CRL file was given but the runtime cannot enforce revocation
    #[error("CRL checking was requested ({}) but is not supported by this runtime", path.display())]
    UnsupportedCrl { path: PathBuf },

    /// Verification is required and no CA source could be resolved
    #[error(
        "cert_reqs is not CERT_NONE and no system CA certificates could be loaded ({0}); ca_file is required"
    )]
    NoTrustMaterial(String),

    /// Reading the OS certificate store failed
    #[error("failed to read the OS certificate store: {0}")]
    TrustStoreUnavailable(String),
}
