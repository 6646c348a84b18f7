use super::{
    capability::CapabilitySet,
    config::CertReqs,
    error::TlsError,
    os_store::{OsStoreCache, load_native_certs},
    pem::{DefaultVerifyPaths, load_certs},
};
use rustls::{RootCertStore, pki_types::CertificateDer};
use std::{fmt, path::PathBuf};
use tracing::{debug, warn};

/// Where the trust anchors of a context come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrustSource {
    /// `CERT_NONE`: nothing is verified
    NoVerification,
    /// Explicit CA file supplied by the caller
    CaFile(PathBuf),
    /// Platform default certificate loader
    SystemDefault,
    /// File-based default locations (`SSL_CERT_FILE`, `SSL_CERT_DIR`, well-known bundles)
    DefaultVerifyPaths,
    /// Native OS certificate store, through [`OsStoreCache`]
    OsStore,
    /// CA bundle compiled into the binary
    Bundled,
}

impl fmt::Display for TrustSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoVerification => f.write_str("none"),
            Self::CaFile(path) => write!(f, "ca_file:{}", path.display()),
            Self::SystemDefault => f.write_str("system_default"),
            Self::DefaultVerifyPaths => f.write_str("default_verify_paths"),
            Self::OsStore => f.write_str("os_store"),
            Self::Bundled => f.write_str("bundled"),
        }
    }
}

/// Ordered, capability-gated choice of CA material when no CA file is given
///
/// The ladder, first match wins:
///
/// 1. `CERT_NONE` needs no trust material
/// 2. the platform default certificate loader
/// 3. off the OS-store platform, the file-based default verify paths
/// 4. on the OS-store platform, the cached OS store
/// 5. the bundled CA roots
///
/// Nothing else is tried once a source is picked: a source yielding no
/// anchors fails the resolution.
#[derive(Debug)]
pub struct CaResolutionChain<'a> {
    capabilities: &'a CapabilitySet,
    os_store: &'a OsStoreCache,
}

impl<'a> CaResolutionChain<'a> {
    #[must_use]
    pub const fn new(capabilities: &'a CapabilitySet, os_store: &'a OsStoreCache) -> Self {
        Self {
            capabilities,
            os_store,
        }
    }

    /// Pick the trust source for a verification mode
    ///
    /// # Errors
    ///
    /// Returns [`TlsError::NoTrustMaterial`] if verification is required and no source is available
    pub fn select(&self, cert_reqs: CertReqs) -> Result<TrustSource, TlsError> {
        if !cert_reqs.verifies() {
            return Ok(TrustSource::NoVerification);
        }

        let capabilities = self.capabilities;
        if !capabilities.has_trust_source() {
            return Err(TlsError::NoTrustMaterial(
                "no trust source is available in this runtime".to_string(),
            ));
        }

        // has_trust_source() guarantees one of these holds, bundled is last
        let source = if capabilities.has_system_default_certs {
            TrustSource::SystemDefault
        } else if !capabilities.os_store_platform && capabilities.has_default_verify_paths {
            TrustSource::DefaultVerifyPaths
        } else if capabilities.os_store_platform && capabilities.has_os_store {
            TrustSource::OsStore
        } else {
            TrustSource::Bundled
        };

        debug!(%source, %cert_reqs, "selected CA trust source");
        Ok(source)
    }

    /// Select a trust source and load its anchors
    ///
    /// # Errors
    ///
    /// Returns [`TlsError::NoTrustMaterial`] if no source is available or the
    /// selected one yields no anchors, [`TlsError::TrustStoreUnavailable`] if
    /// the OS store cannot be read
    pub fn resolve(&self, cert_reqs: CertReqs) -> Result<(TrustSource, RootCertStore), TlsError> {
        let source = self.select(cert_reqs)?;
        let roots = self.anchors(&source)?;
        Ok((source, roots))
    }

    /// Load the anchors of a trust source
    ///
    /// # Errors
    ///
    /// Returns [`TlsError::InvalidCaFile`] for an unusable explicit CA file,
    /// [`TlsError::TrustStoreUnavailable`] if the OS store cannot be read and
    /// [`TlsError::NoTrustMaterial`] when any other source yields no anchors
    pub fn anchors(&self, source: &TrustSource) -> Result<RootCertStore, TlsError> {
        let mut roots = RootCertStore::empty();

        match source {
            TrustSource::NoVerification => return Ok(roots),
            TrustSource::CaFile(path) => {
                let certs = load_certs(path).map_err(|e| TlsError::InvalidCaFile {
                    path: path.clone(),
                    reason: format!("{e:#}"),
                })?;
                if add_certs(&mut roots, certs, source) == 0 {
                    return Err(TlsError::InvalidCaFile {
                        path: path.clone(),
                        reason: "no usable CA certificates".to_string(),
                    });
                }
            }
            TrustSource::SystemDefault => {
                let certs = load_native_certs().map_err(TlsError::NoTrustMaterial)?;
                add_certs(&mut roots, certs, source);
            }
            TrustSource::DefaultVerifyPaths => {
                let certs = DefaultVerifyPaths::discover()
                    .load()
                    .map_err(|e| TlsError::NoTrustMaterial(format!("{e:#}")))?;
                add_certs(&mut roots, certs, source);
            }
            TrustSource::OsStore => {
                let bundle = self.os_store.get()?;
                add_certs(&mut roots, bundle.certs().to_vec(), source);
            }
            TrustSource::Bundled => add_bundled(&mut roots),
        }

        if roots.is_empty() {
            return Err(TlsError::NoTrustMaterial(format!(
                "trust source {source} yielded no usable CA certificates"
            )));
        }

        debug!(%source, anchors = roots.len(), "loaded trust anchors");
        Ok(roots)
    }
}

fn add_certs(
    roots: &mut RootCertStore,
    certs: Vec<CertificateDer<'static>>,
    source: &TrustSource,
) -> usize {
    let (added, ignored) = roots.add_parsable_certificates(certs);
    if ignored > 0 {
        warn!(%source, ignored, "skipped unparsable CA certificates");
    }
    added
}

#[cfg(feature = "bundled-roots")]
fn add_bundled(roots: &mut RootCertStore) {
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
}

#[cfg(not(feature = "bundled-roots"))]
fn add_bundled(_roots: &mut RootCertStore) {}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use crate::tls::os_store::{CertBundle, ShutdownHooks};
    use std::{
        path::Path,
        sync::{
            Arc,
            atomic::{AtomicUsize, Ordering},
        },
    };

    fn fixture(name: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests/fixtures")
            .join(name)
    }

    fn fixture_store(loads: &Arc<AtomicUsize>) -> OsStoreCache {
        let counter = Arc::clone(loads);
        OsStoreCache::with_loader(Arc::new(ShutdownHooks::new()), move || -> Result<CertBundle, TlsError> {
            counter.fetch_add(1, Ordering::SeqCst);
            let certs = load_certs(&fixture("ca.pem"))
                .map_err(|e| TlsError::TrustStoreUnavailable(e.to_string()))?;
            Ok(CertBundle::new(certs))
        })
    }

    fn all_sources() -> CapabilitySet {
        CapabilitySet {
            tls_available: true,
            has_system_default_certs: true,
            has_default_verify_paths: true,
            has_os_store: true,
            has_bundled_ca: true,
            has_crl_support: true,
            os_store_platform: false,
        }
    }

    #[test]
    fn test_none_needs_nothing() {
        let loads = Arc::new(AtomicUsize::new(0));
        let store = fixture_store(&loads);
        let capabilities = CapabilitySet::default();
        let chain = CaResolutionChain::new(&capabilities, &store);

        let (source, roots) = chain.resolve(CertReqs::None).unwrap();
        assert_eq!(source, TrustSource::NoVerification);
        assert!(roots.is_empty());
        assert_eq!(loads.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_ladder_order() {
        let loads = Arc::new(AtomicUsize::new(0));
        let store = fixture_store(&loads);
        let mut capabilities = all_sources();

        let select = |capabilities: &CapabilitySet| {
            CaResolutionChain::new(capabilities, &store).select(CertReqs::Required)
        };

        assert_eq!(select(&capabilities).unwrap(), TrustSource::SystemDefault);

        capabilities.has_system_default_certs = false;
        assert_eq!(
            select(&capabilities).unwrap(),
            TrustSource::DefaultVerifyPaths
        );

        capabilities.os_store_platform = true;
        assert_eq!(select(&capabilities).unwrap(), TrustSource::OsStore);

        capabilities.has_os_store = false;
        assert_eq!(select(&capabilities).unwrap(), TrustSource::Bundled);

        capabilities.has_bundled_ca = false;
        assert!(matches!(
            select(&capabilities),
            Err(TlsError::NoTrustMaterial(_))
        ));
    }

    #[test]
    fn test_os_store_skipped_off_platform() {
        let loads = Arc::new(AtomicUsize::new(0));
        let store = fixture_store(&loads);
        let capabilities = CapabilitySet {
            has_os_store: true,
            has_bundled_ca: true,
            ..Default::default()
        };

        let chain = CaResolutionChain::new(&capabilities, &store);
        assert_eq!(
            chain.select(CertReqs::Optional).unwrap(),
            TrustSource::Bundled
        );
    }

    #[test]
    fn test_default_paths_skipped_on_os_store_platform() {
        let loads = Arc::new(AtomicUsize::new(0));
        let store = fixture_store(&loads);
        let capabilities = CapabilitySet {
            has_default_verify_paths: true,
            os_store_platform: true,
            ..Default::default()
        };

        let chain = CaResolutionChain::new(&capabilities, &store);
        assert!(matches!(
            chain.select(CertReqs::Required),
            Err(TlsError::NoTrustMaterial(_))
        ));
    }

    #[test]
    fn test_select_agrees_with_has_trust_source() {
        let loads = Arc::new(AtomicUsize::new(0));
        let store = fixture_store(&loads);

        for bits in 0u8..32 {
            let capabilities = CapabilitySet {
                tls_available: true,
                has_system_default_certs: bits & 1 != 0,
                has_default_verify_paths: bits & 2 != 0,
                has_os_store: bits & 4 != 0,
                has_bundled_ca: bits & 8 != 0,
                has_crl_support: true,
                os_store_platform: bits & 16 != 0,
            };
            let selected = CaResolutionChain::new(&capabilities, &store).select(CertReqs::Required);
            assert_eq!(selected.is_ok(), capabilities.has_trust_source(), "{capabilities:?}");
        }
    }

    #[test]
    fn test_resolve_os_store_uses_cache() {
        let loads = Arc::new(AtomicUsize::new(0));
        let store = fixture_store(&loads);
        let capabilities = CapabilitySet {
            has_os_store: true,
            os_store_platform: true,
            ..Default::default()
        };
        let chain = CaResolutionChain::new(&capabilities, &store);

        for _ in 0..3 {
            let (source, roots) = chain.resolve(CertReqs::Required).unwrap();
            assert_eq!(source, TrustSource::OsStore);
            assert_eq!(roots.len(), 1);
        }
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_resolve_os_store_failure() {
        let store = OsStoreCache::with_loader(Arc::new(ShutdownHooks::new()), || -> Result<CertBundle, TlsError> {
            Err(TlsError::TrustStoreUnavailable("access denied".to_string()))
        });
        let capabilities = CapabilitySet {
            has_os_store: true,
            has_bundled_ca: true,
            os_store_platform: true,
            ..Default::default()
        };

        let chain = CaResolutionChain::new(&capabilities, &store);
        assert!(matches!(
            chain.resolve(CertReqs::Required),
            Err(TlsError::TrustStoreUnavailable(_))
        ));
    }

    #[cfg(feature = "bundled-roots")]
    #[test]
    fn test_resolve_bundled() {
        let loads = Arc::new(AtomicUsize::new(0));
        let store = fixture_store(&loads);
        let capabilities = CapabilitySet {
            has_bundled_ca: true,
            ..Default::default()
        };

        let (source, roots) = CaResolutionChain::new(&capabilities, &store)
            .resolve(CertReqs::Required)
            .unwrap();
        assert_eq!(source, TrustSource::Bundled);
        assert_eq!(roots.len(), webpki_roots::TLS_SERVER_ROOTS.len());
    }

    #[test]
    fn test_anchors_from_ca_file() {
        let loads = Arc::new(AtomicUsize::new(0));
        let store = fixture_store(&loads);
        let capabilities = CapabilitySet::default();
        let chain = CaResolutionChain::new(&capabilities, &store);

        let roots = chain
            .anchors(&TrustSource::CaFile(fixture("ca.pem")))
            .unwrap();
        assert_eq!(roots.len(), 1);

        let err = chain
            .anchors(&TrustSource::CaFile(fixture("missing.pem")))
            .unwrap_err();
        match err {
            TlsError::InvalidCaFile { path, .. } => assert!(path.ends_with("missing.pem")),
            other => panic!("expected InvalidCaFile, got {other:?}"),
        }
    }

    #[test]
    fn test_anchors_from_unparsable_ca_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bogus.pem");
        // valid PEM framing around a body that is not a certificate
        std::fs::write(
            &path,
            "-----BEGIN CERTIFICATE-----\nMAA=\n-----END CERTIFICATE-----\n",
        )
        .unwrap();

        let loads = Arc::new(AtomicUsize::new(0));
        let store = fixture_store(&loads);
        let capabilities = CapabilitySet::default();
        let chain = CaResolutionChain::new(&capabilities, &store);

        assert!(matches!(
            chain.anchors(&TrustSource::CaFile(path)),
            Err(TlsError::InvalidCaFile { .. })
        ));
    }

    #[test]
    fn test_trust_source_display() {
        assert_eq!(TrustSource::NoVerification.to_string(), "none");
        assert_eq!(TrustSource::Bundled.to_string(), "bundled");
        assert_eq!(
            TrustSource::CaFile(Path::new("/etc/ssl/ca.pem").to_path_buf()).to_string(),
            "ca_file:/etc/ssl/ca.pem"
        );
    }
}
