//! The message dispatcher: a mapping `(deliver_at, recipient_id) -> mailbox`.
//!
//! Delivery is strictly at-or-after the scheduled time; a message sent for
//! `deliver_at = t` is only visible once [`MessageDispatcher::drain_for`] is
//! called with that same `t`. The dispatcher owns every in-flight message —
//! agents hold no cross-references to each other or to mailboxes.

use std::collections::BTreeMap;

use crate::message::Message;
use crate::time::SimTime;

#[derive(Debug, Default)]
pub struct MessageDispatcher {
    mailboxes: BTreeMap<(SimTime, String), Vec<Message>>,
}

impl MessageDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `message` to the mailbox for `recipient_id` at `deliver_at`,
    /// preserving submission order within that mailbox.
    pub fn send(&mut self, message: Message, deliver_at: SimTime, recipient_id: impl Into<String>) {
        self.mailboxes
            .entry((deliver_at, recipient_id.into()))
            .or_default()
            .push(message);
    }

    /// Removes and returns every mailbox scheduled at exactly `time`, ordered
    /// by recipient id for determinism (the `BTreeMap` key order). Returns an
    /// empty vec if nothing is due.
    pub fn drain_for(&mut self, time: SimTime) -> Vec<(String, Vec<Message>)> {
        let due: Vec<String> = self
            .mailboxes
            .keys()
            .filter(|(t, _)| *t == time)
            .map(|(_, recipient)| recipient.clone())
            .collect();

        due.into_iter()
            .filter_map(|recipient| {
                self.mailboxes
                    .remove(&(time, recipient.clone()))
                    .map(|messages| (recipient, messages))
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.mailboxes.is_empty()
    }

    /// True iff any mailbox is scheduled at exactly `time`.
    pub fn has_due(&self, time: SimTime) -> bool {
        self.mailboxes.keys().any(|(t, _)| *t == time)
    }
}
