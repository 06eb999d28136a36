//! Correlation tables guarded by the dispatcher lock.

use std::collections::{HashMap, VecDeque};

use crate::message::Message;

/// Outcome of routing an inbound message into the tables.
#[derive(Debug)]
pub(super) enum Delivery {
    /// Stored in the slot of a pending request.
    Reply,
    /// Buffered as an unsolicited event.
    Unsolicited,
    /// The pending slot already held a reply; the new message was dropped.
    DuplicateReply(Message),
    /// The unsolicited table already held the tag; the new message was dropped.
    DuplicateUnsolicited(Message),
}

/// Why a tag could not be reserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Conflict {
    Pending,
    Unsolicited,
}

/// Unsolicited messages keyed by tag, retrievable oldest first.
#[derive(Debug, Default)]
struct UnsolicitedQueue {
    order: VecDeque<String>,
    entries: HashMap<String, Message>,
}

impl UnsolicitedQueue {
    fn contains(&self, tag: &str) -> bool {
        self.entries.contains_key(tag)
    }

    fn push(&mut self, message: Message) {
        self.order.push_back(message.tag().to_owned());
        self.entries.insert(message.tag().to_owned(), message);
    }

    fn pop_oldest(&mut self) -> Option<Message> {
        while let Some(tag) = self.order.pop_front() {
            if let Some(message) = self.entries.remove(&tag) {
                return Some(message);
            }
        }
        None
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Pending reply slots and the unsolicited buffer.
///
/// A tag lives in at most one of the two tables: inbound messages consult the
/// pending table first, and reservations are refused for buffered tags.
#[derive(Debug, Default)]
pub(super) struct Tables {
    pending: HashMap<String, Option<Message>>,
    unsolicited: UnsolicitedQueue,
}

impl Tables {
    pub(super) fn reserve(&mut self, tag: &str) -> Result<(), Conflict> {
        if self.pending.contains_key(tag) {
            return Err(Conflict::Pending);
        }
        if self.unsolicited.contains(tag) {
            return Err(Conflict::Unsolicited);
        }
        self.pending.insert(tag.to_owned(), None);
        Ok(())
    }

    pub(super) fn deliver(&mut self, message: Message) -> Delivery {
        if let Some(slot) = self.pending.get_mut(message.tag()) {
            if slot.is_some() {
                return Delivery::DuplicateReply(message);
            }
            *slot = Some(message);
            return Delivery::Reply;
        }
        if self.unsolicited.contains(message.tag()) {
            return Delivery::DuplicateUnsolicited(message);
        }
        self.unsolicited.push(message);
        Delivery::Unsolicited
    }

    pub(super) fn is_pending(&self, tag: &str) -> bool {
        self.pending.contains_key(tag)
    }

    pub(super) fn has_reply(&self, tag: &str) -> bool {
        self.pending.get(tag).is_some_and(Option::is_some)
    }

    /// Removes a filled slot and hands its reply to the caller.
    pub(super) fn take_reply(&mut self, tag: &str) -> Option<Message> {
        if !self.has_reply(tag) {
            return None;
        }
        self.pending.remove(tag).flatten()
    }

    /// Removes a slot whether or not it has been filled.
    pub(super) fn cancel(&mut self, tag: &str) -> bool {
        self.pending.remove(tag).is_some()
    }

    pub(super) fn has_events(&self) -> bool {
        !self.unsolicited.is_empty()
    }

    pub(super) fn pop_event(&mut self) -> Option<Message> {
        self.unsolicited.pop_oldest()
    }

    pub(super) fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub(super) fn unsolicited_len(&self) -> usize {
        self.unsolicited.len()
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn reserve_refuses_second_reservation() {
        let mut tables = Tables::default();
        assert_eq!(tables.reserve("t"), Ok(()));
        assert_eq!(tables.reserve("t"), Err(Conflict::Pending));
    }

    #[rstest]
    fn reserve_refuses_buffered_tag() {
        let mut tables = Tables::default();
        assert!(matches!(
            tables.deliver(Message::new("t", b"x".to_vec())),
            Delivery::Unsolicited
        ));
        assert_eq!(tables.reserve("t"), Err(Conflict::Unsolicited));
    }

    #[rstest]
    fn reply_fills_slot_once() {
        let mut tables = Tables::default();
        tables.reserve("t").expect("reserve");
        assert!(matches!(
            tables.deliver(Message::new("t", b"a".to_vec())),
            Delivery::Reply
        ));
        assert!(matches!(
            tables.deliver(Message::new("t", b"b".to_vec())),
            Delivery::DuplicateReply(_)
        ));
        let reply = tables.take_reply("t").expect("reply");
        assert_eq!(reply.payload(), b"a");
        assert!(!tables.is_pending("t"));
        assert_eq!(tables.unsolicited_len(), 0);
    }

    #[rstest]
    fn take_reply_leaves_unfilled_slot() {
        let mut tables = Tables::default();
        tables.reserve("t").expect("reserve");
        assert!(tables.take_reply("t").is_none());
        assert!(tables.is_pending("t"));
    }

    #[rstest]
    fn events_pop_oldest_first() {
        let mut tables = Tables::default();
        for tag in ["c", "a", "b"] {
            tables.deliver(Message::new(tag, Vec::new()));
        }
        let order: Vec<String> = std::iter::from_fn(|| tables.pop_event())
            .map(|message| message.tag().to_owned())
            .collect();
        assert_eq!(order, ["c", "a", "b"]);
        assert!(!tables.has_events());
    }
}
