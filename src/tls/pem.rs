use anyhow::{Context, Result, anyhow};
use rustls::pki_types::{CertificateDer, CertificateRevocationListDer, PrivateKeyDer};
use rustls_pemfile::{certs, crls, private_key};
use std::{
    env, fs,
    io::Cursor,
    path::{Path, PathBuf},
};
use tracing::{debug, warn};

/// Well-known CA bundle locations, first match wins
const CERT_FILE_CANDIDATES: [&str; 6] = [
    "/etc/ssl/certs/ca-certificates.crt",                // Debian, Ubuntu, Gentoo, Arch
    "/etc/pki/tls/certs/ca-bundle.crt",                  // Fedora, RHEL 6
    "/etc/pki/ca-trust/extracted/pem/tls-ca-bundle.pem", // CentOS, RHEL 7
    "/etc/ssl/ca-bundle.pem",                            // OpenSUSE
    "/etc/pki/tls/cacert.pem",                           // OpenELEC
    "/etc/ssl/cert.pem",                                 // Alpine, macOS
];

/// Load every certificate from a PEM file
///
/// # Errors
///
/// Returns an error if the file cannot be read, is not valid PEM or holds no certificates
pub fn load_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>> {
    let data =
        fs::read(path).with_context(|| format!("failed to read certificate {}", path.display()))?;
    let mut reader = Cursor::new(data);
    let parsed = certs(&mut reader)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| anyhow!("invalid certificate PEM: {e}"))?;

    if parsed.is_empty() {
        anyhow::bail!("no certificates found in {}", path.display());
    }

    debug!(path = %path.display(), count = parsed.len(), "loaded certificates");
    Ok(parsed)
}

/// Load the first private key from a PEM file
///
/// # Errors
///
/// Returns an error if the file cannot be read or holds no private key
pub fn load_private_key(path: &Path) -> Result<PrivateKeyDer<'static>> {
    let data =
        fs::read(path).with_context(|| format!("failed to read private key {}", path.display()))?;

    let mut reader = Cursor::new(data);
    private_key(&mut reader)
        .map_err(|e| anyhow!("invalid private key PEM: {e}"))?
        .ok_or_else(|| anyhow!("no private key found in {}", path.display()))
}

/// Load every revocation list from a PEM file
///
/// # Errors
///
/// Returns an error if the file cannot be read, is not valid PEM or holds no CRL
pub fn load_crls(path: &Path) -> Result<Vec<CertificateRevocationListDer<'static>>> {
    let data = fs::read(path).with_context(|| format!("failed to read CRL {}", path.display()))?;
    let mut reader = Cursor::new(data);
    let parsed = crls(&mut reader)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| anyhow!("invalid CRL PEM: {e}"))?;

    if parsed.is_empty() {
        anyhow::bail!("no certificate revocation lists found in {}", path.display());
    }

    debug!(path = %path.display(), count = parsed.len(), "loaded CRLs");
    Ok(parsed)
}

/// File-based default CA locations of the host, the way `OpenSSL` finds them
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DefaultVerifyPaths {
    /// CA bundle file
    pub file: Option<PathBuf>,
    /// Directory of individual CA certificates
    pub dir: Option<PathBuf>,
}

impl DefaultVerifyPaths {
    /// Discover paths from `SSL_CERT_FILE`, `SSL_CERT_DIR` and the well-known bundle locations
    #[must_use]
    pub fn discover() -> Self {
        Self::discover_from(
            env::var_os("SSL_CERT_FILE").map(PathBuf::from),
            env::var_os("SSL_CERT_DIR").map(PathBuf::from),
            &CERT_FILE_CANDIDATES,
        )
    }

    fn discover_from(
        cert_file: Option<PathBuf>,
        cert_dir: Option<PathBuf>,
        candidates: &[&str],
    ) -> Self {
        let file = cert_file.filter(|path| path.is_file()).or_else(|| {
            candidates
                .iter()
                .map(PathBuf::from)
                .find(|path| path.is_file())
        });
        let dir = cert_dir.filter(|path| path.is_dir());

        Self { file, dir }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.file.is_none() && self.dir.is_none()
    }

    /// Load certificates from the bundle file and every readable file of the directory
    ///
    /// Unparsable directory entries are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the bundle file fails to load or nothing could be loaded
    pub fn load(&self) -> Result<Vec<CertificateDer<'static>>> {
        let mut loaded = Vec::new();

        if let Some(file) = &self.file {
            loaded.extend(load_certs(file)?);
        }

        if let Some(dir) = &self.dir {
            let entries = fs::read_dir(dir)
                .with_context(|| format!("failed to read certificate directory {}", dir.display()))?;
            for entry in entries.flatten() {
                let path = entry.path();
                if !path.is_file() {
                    continue;
                }
                match load_certs(&path) {
                    Ok(found) => loaded.extend(found),
                    Err(e) => warn!(path = %path.display(), "skipping CA file: {e:#}"),
                }
            }
        }

        if loaded.is_empty() {
            anyhow::bail!("no certificates found in the default verify paths");
        }

        Ok(loaded)
    }
}
