// Event delivery abstraction between the shell core and its host.
//
// Jobs and the dispatcher never talk to a UI directly. They emit `ShellEvent`s
// through an `EventSink`; the host decides how to consume them.

use thiserror::Error;

use crate::events::ShellEvent;

pub mod channel;

pub use channel::ChannelRuntime;

/// Runtime-specific errors
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Failed to emit event: {0}")]
    EmitFailed(String),

    #[error("Event receiver closed")]
    ReceiverClosed,
}

/// Destination for shell events.
///
/// # Thread Safety
/// Implementors must be `Send + Sync + 'static`; jobs emit from their own tokio
/// tasks and the PTY reader threads.
pub trait EventSink: Send + Sync + 'static {
    /// Emit an event to the host.
    ///
    /// # Errors
    /// Returns `RuntimeError::ReceiverClosed` if the host stopped listening.
    fn emit(&self, event: ShellEvent) -> Result<(), RuntimeError>;
}
