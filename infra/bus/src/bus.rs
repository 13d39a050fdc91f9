use crate::error::BusError;
use crate::matching::{MatchId, MatchRule};
use crate::message::{Message, MethodCall, Reply, Signal};
use std::fmt;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

/// Responder for one inbound method call.
pub type ReplySender = oneshot::Sender<Result<Reply, BusError>>;

/// Work delivered to the connection owner.
#[derive(Debug)]
pub enum Inbound {
    /// A method call addressed to one of our names.
    Call { call: MethodCall, reply: ReplySender },
    /// A signal that satisfied a registered match.
    Signal { matched: MatchId, message: Arc<Message> },
    /// The connection is going away; stop processing.
    Shutdown,
}

/// One connection to a message bus.
///
/// Outbound operations are synchronous; everything addressed to this
/// connection arrives through the single [`Bus::inbound`] queue, which keeps
/// request handling strictly serialized.
pub trait Bus: Send + Sync + fmt::Debug {
    /// The connection's unique name (`:1.42`).
    fn unique_name(&self) -> &str;

    /// Claims a well-known name for this connection.
    ///
    /// # Errors
    /// Returns [`BusError::NameTaken`] if another connection owns it.
    fn request_name(&self, name: &str) -> Result<(), BusError>;

    /// Returns `true` for the unique name and every well-known name claimed here.
    fn owns_name(&self, name: &str) -> bool;

    /// Announces that `path` hosts an object manager for its subtree.
    fn add_object_manager(&self, path: &str);

    /// Registers a signal match; matching signals arrive as [`Inbound::Signal`].
    ///
    /// # Errors
    /// Returns [`BusError::ChannelClosed`] if the connection is shut down.
    fn add_match(&self, rule: MatchRule) -> Result<MatchId, BusError>;

    /// Unregisters a match; returns `false` if it was unknown.
    fn remove_match(&self, id: MatchId) -> bool;

    /// Publishes a notification about an object hosted here.
    ///
    /// # Errors
    /// Returns [`BusError::ChannelClosed`] if the connection is shut down.
    fn emit(&self, signal: Signal) -> Result<(), BusError>;

    /// Performs a blocking method call to another connection.
    ///
    /// # Errors
    /// Returns [`BusError::UnknownService`] if nobody owns the destination and
    /// [`BusError::RemoteCall`] if the callee fails.
    fn call(&self, call: MethodCall) -> Result<Reply, BusError>;

    /// Hands out the inbound queue. It can be taken once.
    ///
    /// # Errors
    /// Returns [`BusError::ChannelClosed`] on a second take.
    fn inbound(&self) -> Result<mpsc::UnboundedReceiver<Inbound>, BusError>;
}
