use super::{
    capability::{CapabilitySet, crypto_provider},
    chain::{CaResolutionChain, TrustSource},
    config::{CertReqs, CertReqsValue, TlsOptions, validate_cert_reqs},
    error::TlsError,
    metadata::CertMetadata,
    os_store::OsStoreCache,
    pem::{load_certs, load_crls, load_private_key},
    verifier::server_verifier,
};
use rustls::{
    ClientConfig, ProtocolVersion, SignatureScheme, SupportedProtocolVersion,
    client::ResolvesClientCert,
    crypto::CryptoProvider,
    pki_types::CertificateRevocationListDer,
    sign::CertifiedKey,
    version::{TLS12, TLS13},
};
use serde::Serialize;
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio_rustls::TlsConnector;
use tracing::{debug, warn};

/// Protocol versions a context may negotiate, highest first
///
/// SSLv2, SSLv3, TLS 1.0 and TLS 1.1 are never offered.
pub static PROTOCOL_VERSIONS: &[&SupportedProtocolVersion] = &[&TLS13, &TLS12];

/// Lowest protocol version a context negotiates
pub const MIN_PROTOCOL_VERSION: ProtocolVersion = ProtocolVersion::TLSv1_2;

/// Assembles TLS client contexts from [`TlsOptions`]
///
/// This is the single entry point of the crate: options go in, a
/// [`ResolvedContext`] or a [`TlsError`] comes out, nothing in between. No
/// network I/O happens here.
#[derive(Debug)]
pub struct ContextBuilder<'a> {
    capabilities: &'a CapabilitySet,
    os_store: &'a OsStoreCache,
}

impl<'a> ContextBuilder<'a> {
    #[must_use]
    pub const fn new(capabilities: &'a CapabilitySet, os_store: &'a OsStoreCache) -> Self {
        Self {
            capabilities,
            os_store,
        }
    }

    /// Validate a verification requirement, see [`validate_cert_reqs`]
    ///
    /// # Errors
    ///
    /// Returns [`TlsError::TlsUnsupported`] without TLS support, otherwise
    /// [`TlsError::InvalidOption`] for unrecognized values
    pub fn validate_cert_reqs(
        &self,
        option: &str,
        value: Option<&CertReqsValue>,
    ) -> Result<Option<CertReqs>, TlsError> {
        self.ensure_tls()?;
        validate_cert_reqs(option, value)
    }

    /// Build a ready-to-use client context
    ///
    /// Steps, in order: verification mode (default `CERT_REQUIRED`), client
    /// identity, CRL, trust anchors (explicit CA file, else the
    /// [`CaResolutionChain`] unless verification is off), verifier.
    ///
    /// # Errors
    ///
    /// Returns the first [`TlsError`] hit; no partial context is ever returned
    pub fn build(&self, options: &TlsOptions) -> Result<ResolvedContext, TlsError> {
        self.ensure_tls()?;

        let cert_reqs = self
            .validate_cert_reqs("cert_reqs", options.cert_reqs.as_ref())?
            .unwrap_or_default();

        let provider = crypto_provider();

        let identity = match (&options.cert_file, &options.key_file) {
            (Some(cert_file), key_file) => Some(ClientIdentity::load(
                cert_file,
                key_file.as_deref(),
                &provider,
            )?),
            (None, Some(key_file)) => {
                warn!(path = %key_file.display(), "key_file ignored without cert_file");
                None
            }
            (None, None) => None,
        };

        let crls = match &options.crl_file {
            Some(crl_file) => self.load_crl_file(crl_file)?,
            None => Vec::new(),
        };

        let chain = CaResolutionChain::new(self.capabilities, self.os_store);
        let (trust_source, roots) = if let Some(ca_file) = &options.ca_file {
            let source = TrustSource::CaFile(ca_file.clone());
            let roots = chain.anchors(&source)?;
            (source, roots)
        } else {
            chain.resolve(cert_reqs)?
        };
        let trust_anchors = roots.len();

        let crl_enforced = !crls.is_empty() && cert_reqs.verifies();
        let verifier = server_verifier(
            cert_reqs,
            roots,
            crls,
            options.crl_file.as_deref(),
            Arc::clone(&provider),
        )?;

        let builder = ClientConfig::builder_with_provider(provider)
            .with_protocol_versions(PROTOCOL_VERSIONS)
            .map_err(|e| TlsError::TlsUnsupported(e.to_string()))?
            .dangerous()
            .with_custom_certificate_verifier(verifier);

        let (config, client_identity) = match identity {
            Some(identity) => (
                builder.with_client_cert_resolver(Arc::new(ClientCertResolver(identity.key))),
                Some(identity.report),
            ),
            None => (builder.with_no_client_auth(), None),
        };

        debug!(
            %cert_reqs,
            %trust_source,
            trust_anchors,
            crl_enforced,
            client_identity = client_identity.is_some(),
            "resolved TLS client context"
        );

        Ok(ResolvedContext {
            config: Arc::new(config),
            verify_mode: cert_reqs,
            trust_source,
            trust_anchors,
            client_identity,
            crl_enforced,
        })
    }

    fn ensure_tls(&self) -> Result<(), TlsError> {
        if self.capabilities.tls_available {
            Ok(())
        } else {
            Err(TlsError::TlsUnsupported(
                "no TLS crypto provider is available in this runtime".to_string(),
            ))
        }
    }

    fn load_crl_file(
        &self,
        crl_file: &Path,
    ) -> Result<Vec<CertificateRevocationListDer<'static>>, TlsError> {
        if !self.capabilities.has_crl_support {
            return Err(TlsError::UnsupportedCrl {
                path: crl_file.to_path_buf(),
            });
        }

        load_crls(crl_file).map_err(|e| TlsError::InvalidCrl {
            path: crl_file.to_path_buf(),
            reason: format!("{e:#}"),
        })
    }
}

/// Client certificate chain and matching key, checked but not yet installed
struct ClientIdentity {
    key: Arc<CertifiedKey>,
    report: IdentityReport,
}

impl ClientIdentity {
    /// Without a key file the key is read from the certificate file
    fn load(
        cert_file: &Path,
        key_file: Option<&Path>,
        provider: &CryptoProvider,
    ) -> Result<Self, TlsError> {
        let invalid = |path: &Path, e: &anyhow::Error| TlsError::InvalidCertificate {
            path: path.to_path_buf(),
            reason: format!("{e:#}"),
        };

        let certs = load_certs(cert_file).map_err(|e| invalid(cert_file, &e))?;
        let key_path = key_file.unwrap_or(cert_file);
        let key = load_private_key(key_path).map_err(|e| invalid(key_path, &e))?;

        let leaf = certs
            .first()
            .and_then(|cert| match CertMetadata::from_der(cert.as_ref()) {
                Ok(metadata) => Some(metadata),
                Err(e) => {
                    warn!(path = %cert_file.display(), "client certificate metadata unavailable: {e:#}");
                    None
                }
            });

        let report = IdentityReport {
            cert_file: cert_file.to_path_buf(),
            chain_len: certs.len(),
            leaf,
        };

        // rejects a key that does not belong to the leaf certificate
        let key = CertifiedKey::from_der(certs, key, provider).map_err(|e| {
            TlsError::InvalidCertificate {
                path: key_path.to_path_buf(),
                reason: e.to_string(),
            }
        })?;

        Ok(Self {
            key: Arc::new(key),
            report,
        })
    }
}

/// Presents the same client certificate to every server
#[derive(Debug)]
struct ClientCertResolver(Arc<CertifiedKey>);

impl ResolvesClientCert for ClientCertResolver {
    fn resolve(
        &self,
        _root_hint_subjects: &[&[u8]],
        _sigschemes: &[SignatureScheme],
    ) -> Option<Arc<CertifiedKey>> {
        Some(Arc::clone(&self.0))
    }

    fn has_certs(&self) -> bool {
        true
    }
}

/// Client identity installed in a context
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentityReport {
    pub cert_file: PathBuf,
    /// Number of certificates in the presented chain
    pub chain_len: usize,
    /// Leaf certificate details, when parsable
    pub leaf: Option<CertMetadata>,
}

/// A fully configured TLS client context
///
/// Immutable once built. The transport layer takes the [`ClientConfig`] (or
/// a [`TlsConnector`]) to perform the handshake.
#[derive(Debug, Clone)]
pub struct ResolvedContext {
    config: Arc<ClientConfig>,
    verify_mode: CertReqs,
    trust_source: TrustSource,
    trust_anchors: usize,
    client_identity: Option<IdentityReport>,
    crl_enforced: bool,
}

impl ResolvedContext {
    #[must_use]
    pub fn client_config(&self) -> Arc<ClientConfig> {
        Arc::clone(&self.config)
    }

    /// Connector for `tokio` streams sharing this context's configuration
    #[must_use]
    pub fn connector(&self) -> TlsConnector {
        TlsConnector::from(self.client_config())
    }

    #[must_use]
    pub const fn verify_mode(&self) -> CertReqs {
        self.verify_mode
    }

    #[must_use]
    pub const fn trust_source(&self) -> &TrustSource {
        &self.trust_source
    }

    /// Number of trust anchors loaded
    #[must_use]
    pub const fn trust_anchors(&self) -> usize {
        self.trust_anchors
    }

    #[must_use]
    pub const fn client_identity(&self) -> Option<&IdentityReport> {
        self.client_identity.as_ref()
    }

    /// Check if leaf certificates are checked against a CRL
    #[must_use]
    pub const fn crl_enforced(&self) -> bool {
        self.crl_enforced
    }

    #[must_use]
    pub const fn min_protocol_version(&self) -> ProtocolVersion {
        MIN_PROTOCOL_VERSION
    }

    /// Serializable description of the context
    #[must_use]
    pub fn summary(&self) -> ContextSummary {
        ContextSummary {
            verify_mode: self.verify_mode,
            trust_source: self.trust_source.to_string(),
            trust_anchors: self.trust_anchors,
            client_identity: self.client_identity.clone(),
            crl_enforced: self.crl_enforced,
            min_protocol_version: protocol_name(MIN_PROTOCOL_VERSION),
            protocol_versions: PROTOCOL_VERSIONS
                .iter()
                .map(|version| protocol_name(version.version))
                .collect(),
        }
    }
}

/// JSON-friendly report of a [`ResolvedContext`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContextSummary {
    pub verify_mode: CertReqs,
    pub trust_source: String,
    pub trust_anchors: usize,
    pub client_identity: Option<IdentityReport>,
    pub crl_enforced: bool,
    pub min_protocol_version: String,
    pub protocol_versions: Vec<String>,
}

fn protocol_name(version: ProtocolVersion) -> String {
    match version {
        ProtocolVersion::TLSv1_3 => "TLSv1.3".to_string(),
        ProtocolVersion::TLSv1_2 => "TLSv1.2".to_string(),
        other => format!("{other:?}"),
    }
}
