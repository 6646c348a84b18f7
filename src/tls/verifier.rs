use super::{config::CertReqs, error::TlsError};
use rustls::{
    DigitallySignedStruct, Error as RustlsError, RootCertStore, SignatureScheme,
    client::{
        VerifierBuilderError, WebPkiServerVerifier,
        danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier},
    },
    crypto::{CryptoProvider, verify_tls12_signature, verify_tls13_signature},
    pki_types::{CertificateDer, CertificateRevocationListDer, ServerName, UnixTime},
};
use std::{path::Path, sync::Arc};

/// Build the server certificate verifier for a verification mode
///
/// `CERT_OPTIONAL` verifies exactly like `CERT_REQUIRED`: a server always
/// presents its certificate, so there is nothing optional left to skip.
/// Revocation is checked for the end-entity certificate only and an unknown
/// revocation status is an error.
///
/// # Errors
///
/// Returns [`TlsError::NoTrustMaterial`] when verification is requested with
/// an empty root store, or [`TlsError::InvalidCrl`] for a CRL webpki rejects
pub fn server_verifier(
    cert_reqs: CertReqs,
    roots: RootCertStore,
    crls: Vec<CertificateRevocationListDer<'static>>,
    crl_file: Option<&Path>,
    provider: Arc<CryptoProvider>,
) -> Result<Arc<dyn ServerCertVerifier>, TlsError> {
    if !cert_reqs.verifies() {
        return Ok(Arc::new(NoVerifier::new(provider)));
    }

    let mut builder = WebPkiServerVerifier::builder_with_provider(Arc::new(roots), provider);
    if !crls.is_empty() {
        builder = builder.with_crls(crls).only_check_end_entity_revocation();
    }

    let verifier: Arc<dyn ServerCertVerifier> = builder.build().map_err(|e| match e {
        VerifierBuilderError::InvalidCrl(err) => TlsError::InvalidCrl {
            path: crl_file.unwrap_or_else(|| Path::new("<unknown>")).to_path_buf(),
            reason: format!("{err:?}"),
        },
        other => TlsError::NoTrustMaterial(other.to_string()),
    })?;

    Ok(verifier)
}

/// Verifier installed for `CERT_NONE`: any server certificate is accepted.
///
/// Handshake signatures are still checked with the provider's algorithms, so
/// the peer must hold the key of the certificate it presents.
#[derive(Debug)]
pub struct NoVerifier {
    provider: Arc<CryptoProvider>,
}

impl NoVerifier {
    #[must_use]
    pub const fn new(provider: Arc<CryptoProvider>) -> Self {
        Self { provider }
    }
}

impl ServerCertVerifier for NoVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, RustlsError> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, RustlsError> {
        verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, RustlsError> {
        verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}
