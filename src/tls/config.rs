use super::error::TlsError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fmt, fs,
    path::{Path, PathBuf},
    str::FromStr,
};

/// Security options for an outbound TLS connection
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TlsOptions {
    /// Client certificate chain (PEM), may also hold the private key
    pub cert_file: Option<PathBuf>,
    /// Client private key (PEM)
    pub key_file: Option<PathBuf>,
    /// Trusted CA certificates (PEM)
    pub ca_file: Option<PathBuf>,
    /// Certificate revocation list (PEM)
    pub crl_file: Option<PathBuf>,
    /// Verification requirement, `CERT_REQUIRED` when unset
    pub cert_reqs: Option<CertReqsValue>,
}

impl TlsOptions {
    /// Load options from a JSON document
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a valid options document
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read TLS options {}", path.display()))?;
        serde_json::from_str(&data)
            .with_context(|| format!("invalid TLS options in {}", path.display()))
    }

    /// Overlay every option set in `other` on top of `self`
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        Self {
            cert_file: other.cert_file.or(self.cert_file),
            key_file: other.key_file.or(self.key_file),
            ca_file: other.ca_file.or(self.ca_file),
            crl_file: other.crl_file.or(self.crl_file),
            cert_reqs: other.cert_reqs.or(self.cert_reqs),
        }
    }
}

/// Server certificate verification requirement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum CertReqs {
    /// Server certificate is not verified
    #[serde(rename = "CERT_NONE")]
    None,
    /// Server certificate is verified if presented
    #[serde(rename = "CERT_OPTIONAL")]
    Optional,
    /// Server certificate must be presented and verified
    #[default]
    #[serde(rename = "CERT_REQUIRED")]
    Required,
}

impl CertReqs {
    /// Alias used in configuration (`CERT_NONE`, ...)
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "CERT_NONE",
            Self::Optional => "CERT_OPTIONAL",
            Self::Required => "CERT_REQUIRED",
        }
    }

    /// Conventional numeric value (0, 1, 2)
    #[must_use]
    pub const fn code(self) -> i64 {
        match self {
            Self::None => 0,
            Self::Optional => 1,
            Self::Required => 2,
        }
    }

    #[must_use]
    pub const fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::None),
            1 => Some(Self::Optional),
            2 => Some(Self::Required),
            _ => None,
        }
    }

    /// Check if the server certificate gets verified at all
    #[must_use]
    pub const fn verifies(self) -> bool {
        !matches!(self, Self::None)
    }
}

impl FromStr for CertReqs {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CERT_NONE" => Ok(Self::None),
            "CERT_OPTIONAL" => Ok(Self::Optional),
            "CERT_REQUIRED" => Ok(Self::Required),
            _ => Err(format!("Invalid cert_reqs value: {s}")),
        }
    }
}

impl fmt::Display for CertReqs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw, not yet validated verification requirement as supplied by the caller
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum CertReqsValue {
    /// Already a verification mode
    #[serde(skip)]
    Mode(CertReqs),
    /// Numeric value
    Code(i64),
    /// Alias such as `CERT_REQUIRED`
    Alias(String),
    /// Anything else found in a configuration document
    Other(serde_json::Value),
}

impl From<CertReqs> for CertReqsValue {
    fn from(mode: CertReqs) -> Self {
        Self::Mode(mode)
    }
}

impl From<&str> for CertReqsValue {
    fn from(alias: &str) -> Self {
        Self::Alias(alias.to_string())
    }
}

impl From<i64> for CertReqsValue {
    fn from(code: i64) -> Self {
        Self::Code(code)
    }
}

impl fmt::Display for CertReqsValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mode(mode) => write!(f, "{mode}"),
            Self::Code(code) => write!(f, "{code}"),
            Self::Alias(alias) => write!(f, "{alias:?}"),
            Self::Other(value) => write!(f, "{value}"),
        }
    }
}

/// Validate a verification requirement
///
/// `None` passes through so the caller can apply its own default. Aliases are
/// matched exactly against `CERT_NONE`, `CERT_OPTIONAL` and `CERT_REQUIRED`.
///
/// # Errors
///
/// Returns [`TlsError::InvalidOption`] naming `option` for any unrecognized value
pub fn validate_cert_reqs(
    option: &str,
    value: Option<&CertReqsValue>,
) -> Result<Option<CertReqs>, TlsError> {
    let Some(value) = value else {
        return Ok(None);
    };

    let mode = match value {
        CertReqsValue::Mode(mode) => Some(*mode),
        CertReqsValue::Code(code) => CertReqs::from_code(*code),
        CertReqsValue::Alias(alias) => alias.parse::<CertReqs>().ok(),
        CertReqsValue::Other(_) => None,
    };

    mode.map(Some).ok_or_else(|| TlsError::InvalidOption {
        option: option.to_string(),
        value: value.to_string(),
    })
}
