//! Resolve a ready-to-use TLS client context from connection security options.
//!
//! The [`tls`] module holds the library; [`cli`] backs the `tlsctx` binary.

pub mod cli;
pub mod tls;
