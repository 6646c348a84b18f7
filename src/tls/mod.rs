//! TLS client-context resolution
//!
//! This module turns a set of connection security options into a
//! ready-to-use `rustls` client configuration, reconciling explicit files,
//! platform default trust stores, the OS certificate store and a bundled CA
//! set into one deterministic decision.
//!
//! # Module Organization
//!
//! - `config` - Options and verification modes
//! - `capability` - Runtime capability probe
//! - `os_store` - Cached OS certificate store and shutdown hooks
//! - `chain` - Ordered CA trust-source resolution
//! - `builder` - Context assembly
//! - `pem` - PEM loading and default verify paths
//! - `verifier` - Server certificate verifiers
//! - `metadata` - Certificate metadata extraction
//! - `error` - Error taxonomy
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tlsctx::tls::{CapabilitySet, ContextBuilder, OsStoreCache, ShutdownHooks, TlsOptions};
//!
//! let hooks = Arc::new(ShutdownHooks::new());
//! let os_store = OsStoreCache::new(Arc::clone(&hooks));
//! let builder = ContextBuilder::new(CapabilitySet::probe(), &os_store);
//!
//! let context = builder.build(&TlsOptions {
//!     ca_file: Some("/etc/ssl/certs/ca.crt".into()),
//!     ..Default::default()
//! })?;
//! let connector = context.connector();
//! ```

pub mod builder;
pub mod capability;
pub mod chain;
pub mod config;
pub mod error;
pub mod metadata;
pub mod os_store;
pub mod pem;
pub mod verifier;

// Re-export commonly used types
pub use builder::{ContextBuilder, ContextSummary, IdentityReport, ResolvedContext};
pub use capability::{CapabilitySet, crypto_provider};
pub use chain::{CaResolutionChain, TrustSource};
pub use config::{CertReqs, CertReqsValue, TlsOptions, validate_cert_reqs};
pub use error::TlsError;
pub use metadata::CertMetadata;
pub use os_store::{CertBundle, NativeStoreLoader, OsStoreCache, OsStoreLoader, ShutdownHooks};
