//! An in-process [`Bus`] used by the daemon's embedded mode and by tests.

use crate::bus::{Bus, Inbound};
use crate::error::BusError;
use crate::matching::{MatchId, MatchRule};
use crate::message::{Message, MethodCall, Reply, Signal};
use fxhash::{FxHashMap, FxHashSet};
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, trace, warn};

const DEFAULT_CAPACITY: usize = 256;

/// Another participant on the bus that answers method calls synchronously.
pub trait Peer: Send + Sync {
    /// # Errors
    /// Whatever the peer wants the caller to see.
    fn handle(&self, call: &MethodCall) -> Result<Reply, BusError>;
}

impl<F> Peer for F
where
    F: Fn(&MethodCall) -> Result<Reply, BusError> + Send + Sync,
{
    fn handle(&self, call: &MethodCall) -> Result<Reply, BusError> {
        self(call)
    }
}

struct LocalInner {
    unique: String,
    names: RwLock<FxHashSet<String>>,
    object_managers: RwLock<Vec<String>>,
    matches: RwLock<FxHashMap<MatchId, MatchRule>>,
    next_match: AtomicU64,
    peers: RwLock<FxHashMap<String, Arc<dyn Peer>>>,
    signals: broadcast::Sender<Arc<Signal>>,
    messages: broadcast::Sender<Arc<Message>>,
    inbound_tx: mpsc::UnboundedSender<Inbound>,
    inbound_rx: Mutex<Option<mpsc::UnboundedReceiver<Inbound>>>,
    closed: AtomicBool,
}

/// A single connection on a bus that lives entirely inside this process.
///
/// Other participants are modelled as [`Peer`]s registered under their
/// well-known names. Signals emitted here are looped back through this
/// connection's own matches, the way a daemon sees its own broadcasts.
#[derive(Clone)]
pub struct LocalBus {
    inner: Arc<LocalInner>,
}

impl fmt::Debug for LocalBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalBus")
            .field("unique", &self.inner.unique)
            .field("names", &*self.inner.names.read())
            .field("matches", &self.inner.matches.read().len())
            .field("peers", &self.inner.peers.read().keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl Default for LocalBus {
    fn default() -> Self {
        Self::new(":1.0")
    }
}

impl LocalBus {
    #[must_use]
    pub fn new(unique: impl Into<String>) -> Self {
        let (signals, _) = broadcast::channel(DEFAULT_CAPACITY);
        let (messages, _) = broadcast::channel(DEFAULT_CAPACITY);
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        Self {
            inner: Arc::new(LocalInner {
                unique: unique.into(),
                names: RwLock::new(FxHashSet::default()),
                object_managers: RwLock::new(Vec::new()),
                matches: RwLock::new(FxHashMap::default()),
                next_match: AtomicU64::new(1),
                peers: RwLock::new(FxHashMap::default()),
                signals,
                messages,
                inbound_tx,
                inbound_rx: Mutex::new(Some(inbound_rx)),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Observes every notification emitted by this connection.
    #[must_use]
    pub fn subscribe_signals(&self) -> broadcast::Receiver<Arc<Signal>> {
        self.inner.signals.subscribe()
    }

    /// Observes every signal message crossing the bus, emitted or published.
    #[must_use]
    pub fn subscribe_messages(&self) -> broadcast::Receiver<Arc<Message>> {
        self.inner.messages.subscribe()
    }

    /// Makes `name` answer method calls through `peer`. Replaces an earlier peer.
    pub fn register_peer(&self, name: impl Into<String>, peer: impl Peer + 'static) {
        let name = name.into();
        debug!(%name, "Peer registered");
        self.inner.peers.write().insert(name, Arc::new(peer));
    }

    pub fn unregister_peer(&self, name: &str) -> bool {
        self.inner.peers.write().remove(name).is_some()
    }

    /// Injects a signal from another participant. Returns the number of matches it hit.
    pub fn publish(&self, message: Message) -> usize {
        self.dispatch(Arc::new(message))
    }

    /// Sends a method call as an outside client would.
    ///
    /// Calls addressed to this connection are queued on the inbound channel and
    /// answered by whoever consumes it; other destinations resolve right away.
    #[must_use]
    pub fn send_call(&self, call: MethodCall) -> oneshot::Receiver<Result<Reply, BusError>> {
        let (tx, rx) = oneshot::channel();
        if self.owns_name(&call.destination) {
            if let Err(mpsc::error::SendError(Inbound::Call { reply, .. })) =
                self.inner.inbound_tx.send(Inbound::Call { call, reply: tx })
            {
                let _ = reply.send(Err(closed("Connection is shut down")));
            }
        } else {
            let _ = tx.send(self.call_peer(&call));
        }
        rx
    }

    /// Asks the consumer of the inbound queue to stop.
    pub fn shutdown(&self) {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        debug!(unique = %self.inner.unique, "Bus connection shutting down");
        let _ = self.inner.inbound_tx.send(Inbound::Shutdown);
    }

    fn ensure_open(&self) -> Result<(), BusError> {
        if self.inner.closed.load(Ordering::Acquire) {
            Err(closed("Connection is shut down"))
        } else {
            Ok(())
        }
    }

    fn manager_path_for(&self, path: &str) -> String {
        self.inner
            .object_managers
            .read()
            .iter()
            .filter(|om| {
                path.strip_prefix(om.as_str())
                    .is_some_and(|rest| rest.is_empty() || rest.starts_with('/') || om.as_str() == "/")
            })
            .max_by_key(|om| om.len())
            .cloned()
            .unwrap_or_else(|| "/".to_owned())
    }

    fn dispatch(&self, message: Arc<Message>) -> usize {
        let _ = self.inner.messages.send(Arc::clone(&message));

        let matches = self.inner.matches.read();
        let mut hits = 0;
        for (id, rule) in matches.iter() {
            if !rule.matches(&message) {
                continue;
            }
            let delivered = self
                .inner
                .inbound_tx
                .send(Inbound::Signal { matched: *id, message: Arc::clone(&message) });
            if delivered.is_err() {
                warn!(%id, "Inbound queue dropped; signal lost");
                break;
            }
            hits += 1;
        }
        trace!(path = %message.path, member = %message.member, hits, "Signal dispatched");
        hits
    }

    fn call_peer(&self, call: &MethodCall) -> Result<Reply, BusError> {
        let peer = self.inner.peers.read().get(&call.destination).cloned();
        match peer {
            Some(peer) => peer.handle(call),
            None => Err(BusError::UnknownService {
                message: call.destination.clone().into(),
                context: Some(format!("{}.{}", call.interface, call.member).into()),
            }),
        }
    }
}

fn closed(message: &'static str) -> BusError {
    BusError::ChannelClosed { message: message.into(), context: None }
}

impl Bus for LocalBus {
    fn unique_name(&self) -> &str {
        &self.inner.unique
    }

    fn request_name(&self, name: &str) -> Result<(), BusError> {
        if self.inner.peers.read().contains_key(name) {
            return Err(BusError::NameTaken { message: name.to_owned().into(), context: None });
        }
        self.inner.names.write().insert(name.to_owned());
        debug!(%name, "Well-known name acquired");
        Ok(())
    }

    fn owns_name(&self, name: &str) -> bool {
        name == self.inner.unique || self.inner.names.read().contains(name)
    }

    fn add_object_manager(&self, path: &str) {
        let mut managers = self.inner.object_managers.write();
        if !managers.iter().any(|p| p == path) {
            managers.push(path.to_owned());
        }
    }

    fn add_match(&self, rule: MatchRule) -> Result<MatchId, BusError> {
        self.ensure_open()?;
        let id = MatchId(self.inner.next_match.fetch_add(1, Ordering::Relaxed));
        trace!(%id, %rule, "Match added");
        self.inner.matches.write().insert(id, rule);
        Ok(id)
    }

    fn remove_match(&self, id: MatchId) -> bool {
        self.inner.matches.write().remove(&id).is_some()
    }

    fn emit(&self, signal: Signal) -> Result<(), BusError> {
        self.ensure_open()?;
        let manager_path = self.manager_path_for(signal.path());
        let message = signal.to_message(&self.inner.unique, &manager_path);

        let _ = self.inner.signals.send(Arc::new(signal));
        self.dispatch(Arc::new(message));
        Ok(())
    }

    fn call(&self, call: MethodCall) -> Result<Reply, BusError> {
        if self.owns_name(&call.destination) {
            return Err(BusError::RemoteCall {
                message: "Blocking call to self would deadlock".into(),
                context: Some(call.destination.into()),
            });
        }
        self.call_peer(&call)
    }

    fn inbound(&self) -> Result<mpsc::UnboundedReceiver<Inbound>, BusError> {
        self.inner.inbound_rx.lock().take().ok_or_else(|| closed("Inbound queue already taken"))
    }
}
