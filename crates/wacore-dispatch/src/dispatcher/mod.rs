//! Request/response correlation over an asynchronous transport.
//!
//! The dispatcher keeps two tables behind a single mutex: pending request
//! slots keyed by tag, and unsolicited messages that arrived without a
//! matching request. The transport's worker thread fills them; caller threads
//! block on a shared condition variable until their predicate holds.
//!
//! Every wake-up is a broadcast. A waiter never assumes it was the one being
//! signalled and always re-tests its own tag.
//!
//! ## Liveness
//!
//! [`Dispatcher::wait_reply`] and [`Dispatcher::request`] have no deadline:
//! a reply that never arrives blocks the caller forever. The timed variants
//! ([`Dispatcher::wait_reply_timeout`], [`Dispatcher::request_timeout`]) bound
//! the wait and release the slot on expiry. [`Dispatcher::shutdown`] does not
//! wake blocked callers.

mod tables;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::Duration;

use tracing::{debug, trace, warn};

use self::tables::{Conflict, Delivery, Tables};
use crate::errors::DispatchError;
use crate::message::{Message, Packet};
use crate::transport::{PacketSink, Transport};

/// Tracing target for dispatcher operations.
pub(crate) const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatcher");

/// State shared between caller threads and the transport worker.
#[derive(Debug, Default)]
struct Correlator {
    tables: Mutex<Tables>,
    event: Condvar,
    closed: AtomicBool,
}

impl Correlator {
    fn lock(&self) -> Result<MutexGuard<'_, Tables>, DispatchError> {
        self.tables
            .lock()
            .map_err(|_| DispatchError::internal("dispatcher lock poisoned"))
    }

    fn receive(&self, packet: &Packet) {
        let Some(message) = Message::from_packet(packet) else {
            debug!(
                target: DISPATCH_TARGET,
                bytes = packet.len(),
                "ignoring keep-alive packet"
            );
            return;
        };

        trace!(
            target: DISPATCH_TARGET,
            tag = message.tag(),
            bytes = message.payload().len(),
            "received message"
        );

        let Ok(mut tables) = self.tables.lock() else {
            warn!(
                target: DISPATCH_TARGET,
                tag = message.tag(),
                "dispatcher lock poisoned; dropping message"
            );
            return;
        };
        let tag = message.tag().to_owned();
        let delivery = tables.deliver(message);
        drop(tables);

        match delivery {
            Delivery::Reply => {
                debug!(target: DISPATCH_TARGET, tag, "matched pending request");
                self.event.notify_all();
            }
            Delivery::Unsolicited => {
                debug!(target: DISPATCH_TARGET, tag, "buffered unsolicited message");
                self.event.notify_all();
            }
            Delivery::DuplicateReply(dropped) => {
                warn!(
                    target: DISPATCH_TARGET,
                    tag,
                    bytes = dropped.payload().len(),
                    "dropping second reply for pending tag"
                );
            }
            Delivery::DuplicateUnsolicited(dropped) => {
                warn!(
                    target: DISPATCH_TARGET,
                    tag,
                    bytes = dropped.payload().len(),
                    "dropping message with duplicate unsolicited tag"
                );
            }
        }
    }
}

impl PacketSink for Correlator {
    fn on_packet(&self, packet: Packet) {
        self.receive(&packet);
    }

    fn on_closed(&self) {
        self.closed.store(true, Ordering::SeqCst);
        warn!(target: DISPATCH_TARGET, "transport connection closed");
    }
}

/// Correlates tagged requests with their replies.
///
/// All methods take `&self`; share the dispatcher between threads with an
/// [`Arc`]. Concurrent requests must use distinct tags.
#[derive(Debug)]
pub struct Dispatcher<T> {
    transport: T,
    correlator: Arc<Correlator>,
}

impl<T: Transport> Dispatcher<T> {
    /// Registers with the transport and starts its worker thread.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Transport`] if the worker cannot be started.
    pub fn init(transport: T) -> Result<Self, DispatchError> {
        let correlator = Arc::new(Correlator::default());
        transport.register_recv_callback(Arc::clone(&correlator) as Arc<dyn PacketSink>);
        transport.start()?;
        debug!(target: DISPATCH_TARGET, "dispatcher started");
        Ok(Self {
            transport,
            correlator,
        })
    }

    /// The underlying transport.
    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Reserves the pending slot for `tag`.
    ///
    /// The request associated with the tag must not be sent if this fails.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::DuplicateTag`] if the tag is already pending
    /// or buffered as an unsolicited message.
    pub fn queue_tag(&self, tag: &str) -> Result<(), DispatchError> {
        let mut tables = self.correlator.lock()?;
        match tables.reserve(tag) {
            Ok(()) => {
                trace!(target: DISPATCH_TARGET, tag, "queued tag");
                Ok(())
            }
            Err(conflict) => {
                warn!(
                    target: DISPATCH_TARGET,
                    tag,
                    in_unsolicited = conflict == Conflict::Unsolicited,
                    "refusing duplicate tag"
                );
                Err(DispatchError::duplicate_tag(tag))
            }
        }
    }

    /// Releases the slot for `tag`, discarding any reply it holds.
    ///
    /// Returns whether a slot existed. Waiters on the tag wake with
    /// [`DispatchError::UnknownTag`].
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Internal`] if the lock is poisoned.
    pub fn cancel_tag(&self, tag: &str) -> Result<bool, DispatchError> {
        let removed = self.correlator.lock()?.cancel(tag);
        if removed {
            self.correlator.event.notify_all();
        }
        Ok(removed)
    }

    /// Frames `message` and writes it to the transport.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::InvalidTag`] for tags that cannot be framed
    /// and [`DispatchError::Send`] when the transport fails or reports a
    /// short write.
    pub fn send(&self, message: &Message) -> Result<(), DispatchError> {
        if let Some(reason) = message.tag_defect() {
            return Err(DispatchError::invalid_tag(message.tag(), reason));
        }
        let packet = message.to_packet(self.transport.headroom());
        trace!(
            target: DISPATCH_TARGET,
            tag = message.tag(),
            bytes = packet.len(),
            "sending message"
        );
        let sent = self
            .transport
            .send(&packet)
            .map_err(|source| DispatchError::send(message.tag(), source))?;
        if sent != packet.len() {
            return Err(DispatchError::send(
                message.tag(),
                crate::TransportError::ShortWrite {
                    expected: packet.len(),
                    sent,
                },
            ));
        }
        Ok(())
    }

    /// Sends `message` and blocks until its reply arrives.
    ///
    /// # Errors
    ///
    /// Fails without blocking when the tag is already queued or the send
    /// fails; in the latter case the slot is released again.
    pub fn request(&self, message: &Message) -> Result<Message, DispatchError> {
        self.send_queued(message)?;
        self.wait_reply(message.tag())
    }

    /// Like [`Self::request`], but gives up after `timeout`.
    ///
    /// # Errors
    ///
    /// As [`Self::request`], plus [`DispatchError::ReplyTimeout`].
    pub fn request_timeout(
        &self,
        message: &Message,
        timeout: Duration,
    ) -> Result<Message, DispatchError> {
        self.send_queued(message)?;
        self.wait_reply_timeout(message.tag(), timeout)
    }

    fn send_queued(&self, message: &Message) -> Result<(), DispatchError> {
        self.queue_tag(message.tag())?;
        if let Err(error) = self.send(message) {
            if let Err(cancel_error) = self.cancel_tag(message.tag()) {
                warn!(
                    target: DISPATCH_TARGET,
                    tag = message.tag(),
                    error = %cancel_error,
                    "failed to release tag after send failure"
                );
            }
            return Err(error);
        }
        Ok(())
    }

    /// Blocks until the pending slot for `tag` holds a reply, then takes it.
    ///
    /// There is no deadline once the wait has started. A tag that was never
    /// queued, or was cancelled, fails at once with
    /// [`DispatchError::UnknownTag`] instead of blocking forever: no reply
    /// could ever be routed to it.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::UnknownTag`] if the tag was never queued or
    /// its slot was cancelled while waiting.
    pub fn wait_reply(&self, tag: &str) -> Result<Message, DispatchError> {
        let tables = self.correlator.lock()?;
        if !tables.is_pending(tag) {
            return Err(DispatchError::unknown_tag(tag));
        }
        let mut tables = self
            .correlator
            .event
            .wait_while(tables, |tables| {
                tables.is_pending(tag) && !tables.has_reply(tag)
            })
            .map_err(|_| DispatchError::internal("dispatcher lock poisoned"))?;
        tables
            .take_reply(tag)
            .ok_or_else(|| DispatchError::unknown_tag(tag))
    }

    /// Waits up to `timeout` for the reply to `tag`.
    ///
    /// On expiry the slot is released, so a late reply is buffered as an
    /// unsolicited message.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::ReplyTimeout`] on expiry and
    /// [`DispatchError::UnknownTag`] as for [`Self::wait_reply`].
    pub fn wait_reply_timeout(&self, tag: &str, timeout: Duration) -> Result<Message, DispatchError> {
        let tables = self.correlator.lock()?;
        if !tables.is_pending(tag) {
            return Err(DispatchError::unknown_tag(tag));
        }
        let (mut tables, _) = self
            .correlator
            .event
            .wait_timeout_while(tables, timeout, |tables| {
                tables.is_pending(tag) && !tables.has_reply(tag)
            })
            .map_err(|_| DispatchError::internal("dispatcher lock poisoned"))?;
        if let Some(reply) = tables.take_reply(tag) {
            return Ok(reply);
        }
        if tables.cancel(tag) {
            debug!(target: DISPATCH_TARGET, tag, "reply wait expired");
            return Err(DispatchError::reply_timeout(tag, timeout));
        }
        Err(DispatchError::unknown_tag(tag))
    }

    /// Returns the oldest unsolicited message, waiting up to `timeout` for one.
    ///
    /// Pending reply slots are never inspected.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Internal`] if the lock is poisoned.
    pub fn wait_event(&self, timeout: Duration) -> Result<Option<Message>, DispatchError> {
        let tables = self.correlator.lock()?;
        let (mut tables, _) = self
            .correlator
            .event
            .wait_timeout_while(tables, timeout, |tables| !tables.has_events())
            .map_err(|_| DispatchError::internal("dispatcher lock poisoned"))?;
        Ok(tables.pop_event())
    }

    /// Number of pending request slots.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Internal`] if the lock is poisoned.
    pub fn pending_len(&self) -> Result<usize, DispatchError> {
        Ok(self.correlator.lock()?.pending_len())
    }

    /// Number of buffered unsolicited messages.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Internal`] if the lock is poisoned.
    pub fn unsolicited_len(&self) -> Result<usize, DispatchError> {
        Ok(self.correlator.lock()?.unsolicited_len())
    }

    /// Whether the transport reported connection termination.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.correlator.closed.load(Ordering::SeqCst)
    }

    /// Stops the transport and joins its worker thread.
    ///
    /// Callers blocked in [`Self::wait_reply`] are not woken.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Transport`] if the worker panicked.
    pub fn shutdown(&self) -> Result<(), DispatchError> {
        debug!(target: DISPATCH_TARGET, "waiting for transport to finish");
        self.transport.stop();
        self.transport.join()?;
        Ok(())
    }

    #[cfg(test)]
    fn receive(&self, packet: &Packet) {
        self.correlator.receive(packet);
    }
}
