pub mod sandboxie;

use std::collections::BTreeMap;

pub use sandboxie::Sandboxie;

use crate::account::CommandLine;
use crate::error::Error;

/// Settings applied to a freshly created execution context.
pub type SandboxOptions = BTreeMap<String, String>;

/// An isolation boundary keyed by account name in which that account's
/// processes run. Its internals are not inspected.
pub trait ExecutionContext: Send + Sync {
    fn create_context(&self, name: &str, options: &SandboxOptions) -> Result<(), Error>;

    /// Run `command` inside the context, optionally waiting for it to exit.
    fn start_in_context(&self, name: &str, command: &CommandLine, wait: bool) -> Result<(), Error>;

    fn terminate_processes(&self, name: &str) -> Result<(), Error>;

    fn destroy_context(&self, name: &str) -> Result<(), Error>;
}
