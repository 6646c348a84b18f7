use super::Action;
use crate::tls::{CapabilitySet, ContextBuilder, OsStoreCache, ShutdownHooks};
use anyhow::{Context, Result};
use std::sync::Arc;

/// Execute the action's business logic by delegating to the tls module
///
/// The process-wide OS store cache lives for the duration of the action and
/// is released through the shutdown hooks before returning, on success or
/// failure.
pub fn execute(action: Action) -> Result<()> {
    let hooks = Arc::new(ShutdownHooks::new());
    let os_store = OsStoreCache::new(Arc::clone(&hooks));
    let capabilities = CapabilitySet::probe();

    let result = match action {
        Action::Resolve { options } => ContextBuilder::new(capabilities, &os_store)
            .build(&options)
            .context("failed to resolve TLS client context")
            .and_then(|context| {
                serde_json::to_string_pretty(&context.summary())
                    .context("failed to serialize context summary")
            }),
        Action::Capabilities => serde_json::to_string_pretty(capabilities)
            .context("failed to serialize capabilities"),
    };

    hooks.run();

    println!("{}", result?);
    Ok(())
}
