//! # RPC Engine with Async Pump
//!
//! The `Engine` owns one transport endpoint and plays both roles of the RPC:
//! it issues calls to remote providers and serves calls addressed to the
//! services registered on it.
//!
//! A background pump task reads the transport. `Reply` frames are matched to
//! pending calls by sequence number. `Call` frames are handed to the service
//! registered under the frame's provider id, on the service's own pool when it
//! has one, or on the engine runtime otherwise.

use std::sync::Arc;
use std::sync::Weak;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::Instant;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;
use tracing::debug;
use tracing::trace;
use tracing::warn;

use crate::bulk::BulkMode;
use crate::bulk::Exposure;
use crate::bulk::Bulk;
use crate::error::Error;
use crate::error::FailureReason;
use crate::error::Result;
use crate::frame::Call;
use crate::frame::Frame;
use crate::frame::Reply;
use crate::transport::Envelope;
use crate::transport::Transport;

/// An inbound call as seen by a service.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: String,
    pub args: Vec<u8>,
    /// Address of the caller.
    pub from: String,
}

/// Serves the calls addressed to one provider id.
#[async_trait::async_trait]
pub trait Service: Send + Sync + 'static {
    /// Pool that runs this service's handlers. `None` uses the engine runtime.
    fn pool(&self) -> Option<Handle> {
        None
    }

    /// Handles one call. The reply goes through `responder`; dropping it
    /// unanswered replies `NoResponse`.
    async fn handle(&self, request: Request, responder: Responder);
}

/// A call awaiting its reply.
struct Pending {
    tx: oneshot::Sender<Result<Vec<u8>>>,
    deadline: Option<Instant>,
}

type PendingMap = DashMap<u64, Pending>;

struct Shared {
    transport: Arc<dyn Transport>,
    runtime: Handle,
    pending: PendingMap,
    services: DashMap<u16, Arc<dyn Service>>,
}

struct Inner {
    shared: Arc<Shared>,
    seq_gen: AtomicU64,
    // Dropping the sender stops the pump.
    _shutdown: oneshot::Sender<()>,
}

/// A cloneable handle to one RPC endpoint.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<Inner>,
}

impl Engine {
    /// Creates an engine over `transport` and spawns its pump on `runtime`.
    pub fn new(transport: impl Transport, runtime: Handle) -> Self {
        let transport: Arc<dyn Transport> = Arc::new(transport);
        let shared = Arc::new(Shared {
            transport,
            runtime: runtime.clone(),
            pending: DashMap::new(),
            services: DashMap::new(),
        });

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        runtime.spawn(Self::pump(shared.clone(), shutdown_rx));

        Self {
            inner: Arc::new(Inner {
                shared,
                seq_gen: AtomicU64::new(1),
                _shutdown: shutdown_tx,
            }),
        }
    }

    async fn pump(shared: Arc<Shared>, mut shutdown: oneshot::Receiver<()>) {
        let error = loop {
            let received = tokio::select! {
                _ = &mut shutdown => break Error::ConnectionLost("Engine shut down".into()),
                received = shared.transport.recv() => received,
            };

            match received {
                Ok(Some(envelope)) => Self::route(&shared, envelope),
                Ok(None) => break Error::ConnectionLost("Stream closed".into()),
                Err(e) => {
                    warn!(address = shared.transport.address(), error = %e, "Transport error in pump");
                    break e;
                }
            }
        };

        Self::notify_all_pending(&shared.pending, error);
    }

    /// Fails every pending call with `error`.
    fn notify_all_pending(pending: &PendingMap, error: Error) {
        let keys: Vec<u64> = pending.iter().map(|e| *e.key()).collect();
        for key in keys {
            if let Some((_, slot)) = pending.remove(&key) {
                let _ = slot.tx.send(Err(error.clone()));
            }
        }
    }

    fn route(shared: &Arc<Shared>, envelope: Envelope) {
        let frame = match Frame::decode(&envelope.payload) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(from = %envelope.from, error = %e, "Dropping undecodable frame");
                return;
            }
        };

        match frame {
            Frame::Call(call) => Self::dispatch(shared, envelope.from, call),
            Frame::Reply(reply) => Self::complete(&shared.pending, reply),
        }
    }

    fn dispatch(shared: &Arc<Shared>, from: String, call: Call) {
        let responder = Responder {
            seq: call.seq,
            to: from.clone(),
            transport: shared.transport.clone(),
            runtime: shared.runtime.clone(),
            answered: false,
        };

        let service = shared
            .services
            .get(&call.provider_id)
            .map(|entry| Arc::clone(entry.value()));

        let Some(service) = service else {
            debug!(provider_id = call.provider_id, method = %call.method, "No provider for call");
            responder.fail(FailureReason::ProviderNotFound(call.provider_id));
            return;
        };

        trace!(provider_id = call.provider_id, method = %call.method, seq = call.seq, "Dispatching call");
        let pool = service.pool().unwrap_or_else(|| shared.runtime.clone());
        let request = Request {
            method: call.method,
            args: call.args,
            from,
        };
        pool.spawn(async move {
            service.handle(request, responder).await;
        });
    }

    fn complete(pending: &PendingMap, reply: Reply) {
        // Late replies for timed-out or abandoned calls have no entry.
        let Some((_, slot)) = pending.remove(&reply.seq) else {
            trace!(seq = reply.seq, "Discarding reply with no pending call");
            return;
        };
        // The expiry task may not have run yet.
        if slot.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            trace!(seq = reply.seq, "Discarding reply past its deadline");
            let _ = slot.tx.send(Err(Error::Timeout));
            return;
        }
        let _ = slot.tx.send(reply.status.map_err(Error::Remote));
    }

    pub fn address(&self) -> &str {
        self.inner.shared.transport.address()
    }

    pub fn runtime(&self) -> &Handle {
        &self.inner.shared.runtime
    }

    /// Registers `service` under `provider_id`.
    pub fn register(&self, provider_id: u16, service: Arc<dyn Service>) -> Result<()> {
        match self.inner.shared.services.entry(provider_id) {
            Entry::Occupied(_) => Err(Error::ProviderExists(provider_id)),
            Entry::Vacant(slot) => {
                slot.insert(service);
                debug!(address = self.address(), provider_id, "Registered provider");
                Ok(())
            }
        }
    }

    /// Removes the service under `provider_id`. Returns whether one was present.
    pub fn deregister(&self, provider_id: u16) -> bool {
        let removed = self.inner.shared.services.remove(&provider_id).is_some();
        if removed {
            debug!(address = self.address(), provider_id, "Deregistered provider");
        }
        removed
    }

    pub fn is_registered(&self, provider_id: u16) -> bool {
        self.inner.shared.services.contains_key(&provider_id)
    }

    /// Number of calls awaiting a reply.
    pub fn pending_calls(&self) -> usize {
        self.inner.shared.pending.len()
    }

    /// Issues a call without waiting for the reply.
    ///
    /// The frame is sent from a spawned task, so this never blocks. A send
    /// failure is delivered through the returned `PendingCall`. Once
    /// `deadline` passes the call resolves to `Timeout`, whether or not
    /// anyone is waiting on it, and a later reply is discarded.
    pub fn call(
        &self,
        to: &str,
        provider_id: u16,
        method: &str,
        args: Vec<u8>,
        deadline: Option<Instant>,
    ) -> Result<PendingCall> {
        let shared = &self.inner.shared;
        let seq = self.inner.seq_gen.fetch_add(1, Ordering::Relaxed);

        let payload = Frame::Call(Call {
            seq,
            provider_id,
            method: method.to_string(),
            args,
        })
        .encode()?;

        let (tx, rx) = oneshot::channel();
        shared.pending.insert(seq, Pending { tx, deadline });

        if let Some(deadline) = deadline {
            let weak: Weak<Shared> = Arc::downgrade(shared);
            shared.runtime.spawn(async move {
                tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await;
                let Some(shared) = weak.upgrade() else {
                    return;
                };
                if let Some((_, slot)) = shared.pending.remove(&seq) {
                    trace!(seq, "Call expired");
                    let _ = slot.tx.send(Err(Error::Timeout));
                }
            });
        }

        let send_shared = shared.clone();
        let to = to.to_string();
        shared.runtime.spawn(async move {
            if let Err(e) = send_shared.transport.send(&to, payload).await {
                debug!(to = %to, seq, error = %e, "Call send failed");
                if let Some((_, slot)) = send_shared.pending.remove(&seq) {
                    let _ = slot.tx.send(Err(e));
                }
            }
        });

        Ok(PendingCall {
            seq,
            rx,
            shared: shared.clone(),
            taken: false,
        })
    }

    /// Exposes `data` for remote access until the returned guard drops.
    pub fn expose(&self, data: Vec<u8>, mode: BulkMode) -> Exposure {
        let transport = self.inner.shared.transport.clone();
        let len = data.len() as u64;
        let bulk = transport.expose(data, mode);
        Exposure::new(bulk, len, mode, transport)
    }

    pub async fn pull(&self, owner: &str, bulk: Bulk, offset: u64, len: u64) -> Result<Vec<u8>> {
        self.inner.shared.transport.pull(owner, bulk, offset, len).await
    }

    pub async fn push(&self, owner: &str, bulk: Bulk, offset: u64, data: Vec<u8>) -> Result<()> {
        self.inner.shared.transport.push(owner, bulk, offset, data).await
    }
}

/// The caller's view of an issued call.
///
/// Dropping it abandons the call; a reply arriving later is discarded.
pub struct PendingCall {
    seq: u64,
    rx: oneshot::Receiver<Result<Vec<u8>>>,
    shared: Arc<Shared>,
    taken: bool,
}

impl PendingCall {
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Takes the reply if it has arrived. Never blocks.
    pub fn try_take(&mut self) -> Option<Result<Vec<u8>>> {
        if self.taken {
            return Some(Err(Error::ChannelClosed));
        }
        match self.rx.try_recv() {
            Ok(reply) => {
                self.taken = true;
                Some(reply)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Closed) => {
                self.taken = true;
                Some(Err(Error::ChannelClosed))
            }
        }
    }

    /// Awaits the reply, or `Timeout` if the call's deadline passed first.
    pub async fn recv(&mut self) -> Result<Vec<u8>> {
        if self.taken {
            return Err(Error::ChannelClosed);
        }
        let reply = (&mut self.rx).await;
        self.taken = true;
        reply.unwrap_or(Err(Error::ChannelClosed))
    }

    /// Blocks the current thread until the call resolves.
    ///
    /// Refused with `BlockingInRuntime` on a thread that is inside a runtime
    /// context, where blocking could starve the pump that delivers the reply.
    pub fn wait(&mut self) -> Result<Vec<u8>> {
        if Handle::try_current().is_ok() {
            return Err(Error::BlockingInRuntime);
        }
        let runtime = self.shared.runtime.clone();
        runtime.block_on(self.recv())
    }
}

impl Drop for PendingCall {
    fn drop(&mut self) {
        self.shared.pending.remove(&self.seq);
    }
}

/// Sends exactly one reply for a received call.
///
/// Replies are sent from a spawned task, so responding never blocks the
/// handler. A responder dropped without answering replies `NoResponse`.
pub struct Responder {
    seq: u64,
    to: String,
    transport: Arc<dyn Transport>,
    runtime: Handle,
    answered: bool,
}

impl Responder {
    pub fn respond(mut self, body: Vec<u8>) {
        self.send(Ok(body));
    }

    pub fn fail(mut self, reason: FailureReason) {
        self.send(Err(reason));
    }

    fn send(&mut self, status: std::result::Result<Vec<u8>, FailureReason>) {
        self.answered = true;
        let payload = match (Frame::Reply(Reply { seq: self.seq, status })).encode() {
            Ok(payload) => payload,
            Err(e) => {
                warn!(seq = self.seq, error = %e, "Could not encode reply");
                return;
            }
        };

        let transport = self.transport.clone();
        let to = self.to.clone();
        let seq = self.seq;
        self.runtime.spawn(async move {
            if let Err(e) = transport.send(&to, payload).await {
                warn!(to = %to, seq, error = %e, "Could not deliver reply");
            }
        });
    }
}

impl Drop for Responder {
    fn drop(&mut self) {
        if !self.answered {
            self.send(Err(FailureReason::NoResponse));
        }
    }
}
