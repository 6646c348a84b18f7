use super::error::TlsError;
use rustls::pki_types::CertificateDer;
use std::{
    fmt,
    sync::{Arc, Mutex, PoisonError},
};
use tracing::info;
#[cfg(feature = "native-certs")]
use tracing::warn;

/// Certificates read from the OS store
#[derive(Debug, Clone, Default)]
pub struct CertBundle {
    certs: Vec<CertificateDer<'static>>,
}

impl CertBundle {
    #[must_use]
    pub const fn new(certs: Vec<CertificateDer<'static>>) -> Self {
        Self { certs }
    }

    #[must_use]
    pub fn certs(&self) -> &[CertificateDer<'static>] {
        &self.certs
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.certs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.certs.is_empty()
    }
}

/// Reads the OS certificate store
pub trait OsStoreLoader: Send + Sync {
    /// Read every trusted CA and root certificate
    ///
    /// # Errors
    ///
    /// Returns [`TlsError::TrustStoreUnavailable`] if the store cannot be read
    fn load(&self) -> Result<CertBundle, TlsError>;
}

impl<F> OsStoreLoader for F
where
    F: Fn() -> Result<CertBundle, TlsError> + Send + Sync,
{
    fn load(&self) -> Result<CertBundle, TlsError> {
        self()
    }
}

/// Platform certificates via `rustls-native-certs` (the `CA` and `ROOT` stores on Windows)
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeStoreLoader;

impl OsStoreLoader for NativeStoreLoader {
    fn load(&self) -> Result<CertBundle, TlsError> {
        load_native_certs()
            .map(CertBundle::new)
            .map_err(TlsError::TrustStoreUnavailable)
    }
}

/// Read the platform certificates, tolerating individual unreadable entries
///
/// # Errors
///
/// Returns the first reported error (or a generic reason) when no certificate could be read
#[cfg(feature = "native-certs")]
pub fn load_native_certs() -> Result<Vec<CertificateDer<'static>>, String> {
    let result = rustls_native_certs::load_native_certs();
    for err in &result.errors {
        warn!("native certificate load error: {err}");
    }

    if result.certs.is_empty() {
        return Err(result.errors.first().map_or_else(
            || "no native certificates found".to_string(),
            ToString::to_string,
        ));
    }

    Ok(result.certs)
}

/// Read the platform certificates, tolerating individual unreadable entries
///
/// # Errors
///
/// Always fails: this build has no native certificate support
#[cfg(not(feature = "native-certs"))]
pub fn load_native_certs() -> Result<Vec<CertificateDer<'static>>, String> {
    Err("built without the native-certs feature".to_string())
}

type ShutdownHook = Box<dyn FnOnce() + Send>;

/// Release callbacks run when the host process shuts down
///
/// Hooks run in reverse registration order, each at most once, either on an
/// explicit [`ShutdownHooks::run`] or when the value is dropped.
#[derive(Default)]
pub struct ShutdownHooks {
    hooks: Mutex<Vec<ShutdownHook>>,
}

impl ShutdownHooks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&self, hook: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.hooks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Box::new(hook));
    }

    /// Run and forget every registered hook
    pub fn run(&self) {
        // hooks may register again, never hold the lock while running them
        let hooks = std::mem::take(&mut *self.hooks.lock().unwrap_or_else(PoisonError::into_inner));
        for hook in hooks.into_iter().rev() {
            hook();
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.hooks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for ShutdownHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShutdownHooks")
            .field("pending", &self.len())
            .finish()
    }
}

impl Drop for ShutdownHooks {
    fn drop(&mut self) {
        self.run();
    }
}

type CacheSlot = Arc<Mutex<Option<Arc<CertBundle>>>>;

/// Process-wide cache of the OS certificate store
///
/// The store is read at most once no matter how many threads ask for it
/// concurrently: the check and the load happen under the same lock. A failed
/// read leaves the cache empty so a later call tries again. On the first
/// successful read a release hook is registered with the host's
/// [`ShutdownHooks`].
pub struct OsStoreCache {
    slot: CacheSlot,
    loader: Box<dyn OsStoreLoader>,
    hooks: Arc<ShutdownHooks>,
}

impl OsStoreCache {
    /// Cache backed by the native platform store
    #[must_use]
    pub fn new(hooks: Arc<ShutdownHooks>) -> Self {
        Self::with_loader(hooks, NativeStoreLoader)
    }

    #[must_use]
    pub fn with_loader<L>(hooks: Arc<ShutdownHooks>, loader: L) -> Self
    where
        L: OsStoreLoader + 'static,
    {
        Self {
            slot: Arc::new(Mutex::new(None)),
            loader: Box::new(loader),
            hooks,
        }
    }

    /// Return the cached bundle, reading the store on first use
    ///
    /// # Errors
    ///
    /// Returns [`TlsError::TrustStoreUnavailable`] if the store cannot be read
    pub fn get(&self) -> Result<Arc<CertBundle>, TlsError> {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(bundle) = slot.as_ref() {
            return Ok(Arc::clone(bundle));
        }

        let bundle = Arc::new(self.loader.load()?);
        info!(certs = bundle.len(), "loaded OS certificate store");

        let released = Arc::downgrade(&self.slot);
        self.hooks.register(move || {
            if let Some(slot) = released.upgrade()
                && slot
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .take()
                    .is_some()
            {
                info!("released OS certificate store");
            }
        });

        *slot = Some(Arc::clone(&bundle));
        Ok(bundle)
    }

    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

impl fmt::Debug for OsStoreCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OsStoreCache")
            .field("loaded", &self.is_loaded())
            .finish_non_exhaustive()
    }
}
