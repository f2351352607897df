//! Transaction gossip between peers.
//!
//! The inbound side parses wire messages and feeds them to the local
//! mempool and transaction pool; the outbound side decides what to
//! re-broadcast, deduplicates against recently-gossiped sets, and batches
//! account-based transactions under a soft size cap. Everything is gated on
//! the push-gossip activation time so nodes can coexist with peers that do
//! not speak the protocol yet.

mod handler;
mod message;
mod network;
mod recent;

pub use handler::{BoxError, GossipHandler, Handler, TxIssuer};
pub use message::{Message, MessageError, ETH_TXS_SOFT_CAP_SIZE, MAX_MESSAGE_SIZE};
pub use network::{
    AppSender, Clock, Network, NetworkError, NoopNetwork, PushNetwork, SenderError, SystemClock,
};
pub use recent::RecentSet;
