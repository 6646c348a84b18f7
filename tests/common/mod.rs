#![allow(dead_code, clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::{
    path::PathBuf,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};
use tlsctx::tls::{
    CapabilitySet, CertBundle, OsStoreCache, ShutdownHooks, TlsError, pem::load_certs,
};

/// Path to a PEM fixture under `tests/fixtures`
pub fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

/// TLS and CRL support, but no CA source at all
pub fn no_trust_sources() -> CapabilitySet {
    CapabilitySet {
        tls_available: true,
        has_crl_support: true,
        ..Default::default()
    }
}

/// Every capability on, on the OS-store platform
pub fn os_store_platform() -> CapabilitySet {
    CapabilitySet {
        tls_available: true,
        has_os_store: true,
        has_bundled_ca: true,
        has_crl_support: true,
        os_store_platform: true,
        ..Default::default()
    }
}

/// OS store cache serving the fixture CA and counting reads
pub struct CountingStore {
    pub hooks: Arc<ShutdownHooks>,
    pub cache: OsStoreCache,
    pub loads: Arc<AtomicUsize>,
}

impl CountingStore {
    pub fn new() -> Self {
        let hooks = Arc::new(ShutdownHooks::new());
        let loads = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&loads);
        let cache = OsStoreCache::with_loader(
            Arc::clone(&hooks),
            move || -> Result<CertBundle, TlsError> {
                counter.fetch_add(1, Ordering::SeqCst);
                let certs = load_certs(&fixture("ca.pem"))
                    .map_err(|e| TlsError::TrustStoreUnavailable(e.to_string()))?;
                Ok(CertBundle::new(certs))
            },
        );

        Self { hooks, cache, loads }
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}
