#![warn(missing_docs)]
//! Relay wire protocol: JSON envelopes, typed payloads and the outbound queue.

mod codec;
mod outbox;
mod protocol;

pub use codec::*;
pub use outbox::Outbox;
pub use protocol::*;
