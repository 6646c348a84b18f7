mod run;

use crate::tls::TlsOptions;

/// Action enum representing each possible command
#[derive(Debug)]
pub enum Action {
    Resolve { options: TlsOptions },
    Capabilities,
}

impl Action {
    /// Execute the action
    ///
    /// # Errors
    ///
    /// Returns an error if the action fails to execute
    pub fn execute(self) -> anyhow::Result<()> {
        run::execute(self)
    }
}
