//! Serial command/status protocol.
//!
//! ```text
//!  bytes ──▶ LineReceiver ──▶ decode() ──▶ Command ──▶ SharedState::apply
//!                                                         │
//!  bytes ◀── Transport ◀── encode_status() ◀── StatusSnapshot
//! ```

pub mod codec;
pub mod packet;
pub mod status;
pub mod transport;
