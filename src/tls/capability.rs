use super::pem::DefaultVerifyPaths;
use rustls::crypto::{CryptoProvider, ring};
use serde::Serialize;
use std::sync::{Arc, OnceLock};
use tracing::debug;

static CRYPTO_PROVIDER: OnceLock<Arc<CryptoProvider>> = OnceLock::new();
static CAPABILITIES: OnceLock<CapabilitySet> = OnceLock::new();

/// The ring crypto provider every context is built with
///
/// Created on first use and shared afterwards; the process-wide rustls
/// default provider is never installed or consulted.
#[must_use]
pub fn crypto_provider() -> Arc<CryptoProvider> {
    Arc::clone(CRYPTO_PROVIDER.get_or_init(|| Arc::new(ring::default_provider())))
}

/// Trust-resolution mechanisms available in this process
///
/// Built once by [`CapabilitySet::probe`] and passed by reference to the
/// context builder. Tests construct arbitrary sets directly.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CapabilitySet {
    /// A crypto provider with at least one cipher suite exists
    pub tls_available: bool,
    /// The platform default certificate loader can be used
    pub has_system_default_certs: bool,
    /// A file-based default CA location exists
    pub has_default_verify_paths: bool,
    /// The native OS certificate store can be read
    pub has_os_store: bool,
    /// A CA bundle is compiled into the binary
    pub has_bundled_ca: bool,
    /// Leaf certificates can be checked against CRLs
    pub has_crl_support: bool,
    /// Trust anchors on this platform live in the OS store (Windows)
    pub os_store_platform: bool,
}

impl CapabilitySet {
    /// Capabilities of the running process, detected on first call
    #[must_use]
    pub fn probe() -> &'static Self {
        CAPABILITIES.get_or_init(Self::detect)
    }

    fn detect() -> Self {
        let os_store_platform = cfg!(windows);
        let native_certs = cfg!(feature = "native-certs");

        let capabilities = Self {
            tls_available: !crypto_provider().cipher_suites.is_empty(),
            has_system_default_certs: native_certs && !os_store_platform,
            has_default_verify_paths: !os_store_platform && !DefaultVerifyPaths::discover().is_empty(),
            has_os_store: native_certs && os_store_platform,
            has_bundled_ca: cfg!(feature = "bundled-roots"),
            has_crl_support: true,
            os_store_platform,
        };

        debug!(?capabilities, "probed TLS capabilities");
        capabilities
    }

    /// Check if at least one CA source could be consulted
    #[must_use]
    pub const fn has_trust_source(&self) -> bool {
        self.has_system_default_certs
            || (self.has_default_verify_paths && !self.os_store_platform)
            || (self.has_os_store && self.os_store_platform)
            || self.has_bundled_ca
    }
}
