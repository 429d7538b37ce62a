//! Events passed between the send task and the main event loop.

use crate::gemini::ChatError;

/// Outcome of one send, delivered back over the reply channel.
///
/// Every send produces exactly one of these, and the conversation appends
/// exactly one follow-up message for it.
#[derive(Debug)]
pub enum SendOutcome {
    /// The model answered with reply text.
    Reply(String),
    /// The send failed; the error becomes an error-role message.
    Failed(ChatError),
}
