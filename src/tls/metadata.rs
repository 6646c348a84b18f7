use anyhow::{Result, anyhow};
use chrono::Utc;
use serde::Serialize;
use x509_parser::prelude::{FromDer, X509Certificate};

/// Certificate details reported for a client identity
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CertMetadata {
    /// Certificate subject DN
    pub subject: Option<String>,
    /// Certificate issuer DN
    pub issuer: Option<String>,
    /// Days until certificate expiration (negative if expired)
    pub expiry_days: Option<i64>,
}

impl CertMetadata {
    /// Extract subject, issuer and expiry from a DER-encoded certificate
    ///
    /// # Errors
    ///
    /// Returns an error if the certificate cannot be parsed
    pub fn from_der(cert_der: &[u8]) -> Result<Self> {
        let (_, cert) = X509Certificate::from_der(cert_der)
            .map_err(|e| anyhow!("failed to parse certificate: {e}"))?;

        let raw = cert.validity().not_after.to_datetime();
        let not_after =
            chrono::DateTime::<Utc>::from_timestamp(raw.unix_timestamp(), raw.nanosecond())
                .ok_or_else(|| anyhow!("invalid certificate expiry timestamp"))?;
        let remaining = not_after - Utc::now();

        Ok(Self {
            subject: Some(cert.subject().to_string()),
            issuer: Some(cert.issuer().to_string()),
            expiry_days: Some(remaining.num_days()),
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use crate::tls::pem;
    use std::path::PathBuf;

    #[test]
    fn test_metadata_default() {
        let metadata = CertMetadata::default();
        assert!(metadata.subject.is_none());
        assert!(metadata.issuer.is_none());
        assert!(metadata.expiry_days.is_none());
    }

    #[test]
    fn test_metadata_from_client_cert() {
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/client.crt");
        let certs = pem::load_certs(&path).unwrap();
        let metadata = CertMetadata::from_der(certs.first().unwrap().as_ref()).unwrap();

        let subject = metadata.subject.unwrap();
        assert!(subject.contains("CN=tlsctx client"));
        assert!(metadata.issuer.unwrap().contains("CN=tlsctx test CA"));
        assert!(metadata.expiry_days.unwrap() > 365);
    }

    #[test]
    fn test_metadata_from_garbage() {
        let err = CertMetadata::from_der(&[0x01, 0x02, 0x03]).unwrap_err();
        assert!(err.to_string().contains("failed to parse certificate"));
    }

    #[test]
    fn test_metadata_serializes() {
        let metadata = CertMetadata {
            subject: Some("CN=client".to_string()),
            issuer: Some("CN=CA".to_string()),
            expiry_days: Some(-10),
        };
        let json = serde_json::to_value(&metadata).unwrap();
        assert_eq!(json["subject"], "CN=client");
        assert_eq!(json["expiry_days"], -10);
    }
}
