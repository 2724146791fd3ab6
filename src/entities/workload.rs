use std::collections::VecDeque;

use crate::{packet::Packet, time::Time};

/// The arrivals that have not been offered to the queue yet, in arrival order.
#[derive(Debug, Clone, derive_new::new)]
pub(crate) struct Workload {
    packets: VecDeque<Packet>,
}

impl Workload {
    delegate::delegate! {
        to self.packets {
            pub(crate) fn len(&self) -> usize;
            pub(crate) fn is_empty(&self) -> bool;
            pub(crate) fn iter(&self) -> std::collections::vec_deque::Iter<'_, Packet>;
        }
    }

    /// Takes the next packet if it is due at `now`.
    pub(crate) fn next_due(&mut self, now: Time) -> Option<Packet> {
        match self.packets.front() {
            Some(pkt) if pkt.arrival <= now => self.packets.pop_front(),
            _ => None,
        }
    }
}
