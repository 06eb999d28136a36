//! In-memory transport backed by a real worker thread.
//!
//! Inbound packets are injected through [`MemoryTransport::inject`] and
//! delivered to the registered sink from the worker thread, so tests exercise
//! the same cross-thread hand-off as a socket transport. Outgoing packets are
//! recorded and may be answered automatically by a responder closure.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use tracing::{debug, info};

use super::{PacketSink, TRANSPORT_TARGET, Transport};
use crate::errors::TransportError;
use crate::message::Packet;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

type Responder = Box<dyn Fn(&[u8]) -> Option<Vec<u8>> + Send>;

/// Loopback transport for tests and local experiments.
///
/// Cloning yields another handle to the same transport.
#[derive(Clone)]
pub struct MemoryTransport {
    inner: Arc<Inner>,
}

struct Inner {
    headroom: usize,
    sink: Mutex<Option<Arc<dyn PacketSink>>>,
    inbound: Mutex<Sender<Vec<u8>>>,
    receiver: Mutex<Option<Receiver<Vec<u8>>>>,
    worker: Mutex<Option<thread::JoinHandle<()>>>,
    sent: Mutex<Vec<Vec<u8>>>,
    responder: Mutex<Option<Responder>>,
    shutdown: AtomicBool,
    short_write: AtomicBool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MemoryTransport {
    /// Creates a transport reserving `headroom` header bytes per packet.
    #[must_use]
    pub fn new(headroom: usize) -> Self {
        let (inbound, receiver) = mpsc::channel();
        Self {
            inner: Arc::new(Inner {
                headroom,
                sink: Mutex::new(None),
                inbound: Mutex::new(inbound),
                receiver: Mutex::new(Some(receiver)),
                worker: Mutex::new(None),
                sent: Mutex::new(Vec::new()),
                responder: Mutex::new(None),
                shutdown: AtomicBool::new(false),
                short_write: AtomicBool::new(false),
            }),
        }
    }

    /// Queues raw bytes for delivery on the worker thread.
    pub fn inject(&self, bytes: impl Into<Vec<u8>>) {
        if lock(&self.inner.inbound).send(bytes.into()).is_err() {
            debug!(target: TRANSPORT_TARGET, "worker gone; dropping injected packet");
        }
    }

    /// Framed bytes of every packet sent so far, header region excluded.
    #[must_use]
    pub fn sent(&self) -> Vec<Vec<u8>> {
        lock(&self.inner.sent).clone()
    }

    /// Makes subsequent sends report one byte fewer than requested.
    pub fn set_short_write(&self, enabled: bool) {
        self.inner.short_write.store(enabled, Ordering::SeqCst);
    }

    /// Installs a closure that may answer each sent packet with inbound bytes.
    pub fn set_responder<F>(&self, responder: F)
    where
        F: Fn(&[u8]) -> Option<Vec<u8>> + Send + 'static,
    {
        *lock(&self.inner.responder) = Some(Box::new(responder));
    }
}

impl Transport for MemoryTransport {
    fn register_recv_callback(&self, sink: Arc<dyn PacketSink>) {
        *lock(&self.inner.sink) = Some(sink);
    }

    fn start(&self) -> Result<(), TransportError> {
        let receiver = lock(&self.inner.receiver)
            .take()
            .ok_or(TransportError::AlreadyStarted)?;
        let inner = Arc::clone(&self.inner);
        let handle = thread::spawn(move || run_worker(&inner, &receiver));
        *lock(&self.inner.worker) = Some(handle);
        Ok(())
    }

    fn send(&self, packet: &Packet) -> Result<usize, TransportError> {
        if self.inner.shutdown.load(Ordering::SeqCst) {
            return Err(TransportError::Stopped);
        }
        let data = packet.data().to_vec();
        let reply = lock(&self.inner.responder)
            .as_ref()
            .and_then(|responder| responder(&data));
        lock(&self.inner.sent).push(data);
        if let Some(reply) = reply {
            self.inject(reply);
        }
        if self.inner.short_write.load(Ordering::SeqCst) {
            return Ok(packet.len().saturating_sub(1));
        }
        Ok(packet.len())
    }

    fn stop(&self) {
        self.inner.shutdown.store(true, Ordering::SeqCst);
    }

    fn join(&self) -> Result<(), TransportError> {
        let handle = lock(&self.inner.worker).take();
        handle.map_or(Ok(()), |worker| {
            worker.join().map_err(|_| TransportError::WorkerPanic)
        })
    }

    fn headroom(&self) -> usize {
        self.inner.headroom
    }
}

fn run_worker(inner: &Inner, receiver: &Receiver<Vec<u8>>) {
    info!(target: TRANSPORT_TARGET, "memory transport worker active");
    while !inner.shutdown.load(Ordering::SeqCst) {
        match receiver.recv_timeout(POLL_INTERVAL) {
            Ok(bytes) => {
                let sink = lock(&inner.sink).clone();
                if let Some(sink) = sink {
                    sink.on_packet(Packet::received(bytes));
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    let sink = lock(&inner.sink).clone();
    if let Some(sink) = sink {
        sink.on_closed();
    }
    info!(target: TRANSPORT_TARGET, "memory transport worker stopped");
}
