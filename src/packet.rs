use typed_builder::TypedBuilder;

use crate::{
    time::{Delta, Time},
    units::Bytes,
};

identifier!(PacketId);

/// A packet of data.
///
/// Packets are moved from the arrival stream into the queue, from the queue into the server and
/// finally into the list of departed packets. A packet dropped at the queue is discarded.
#[derive(Debug, Clone, PartialEq, Eq, TypedBuilder, serde::Serialize, serde::Deserialize)]
pub struct Packet {
    pub id: PacketId,
    #[builder(setter(into))]
    pub size: Bytes,
    pub arrival: Time,

    #[builder(default, setter(skip))]
    pub(crate) departure: Option<Time>,
}

impl Packet {
    /// The time the packet left the server, if it has been served.
    pub fn departure(&self) -> Option<Time> {
        self.departure
    }

    /// Total time spent in the system (queueing plus service), defined once the packet departed.
    pub fn sojourn(&self) -> Option<Delta> {
        self.departure.map(|t| t - self.arrival)
    }

    pub(crate) fn depart(&mut self, now: Time) -> Delta {
        assert!(self.departure.is_none(), "packet {} departed twice", self.id);
        assert!(now >= self.arrival);
        self.departure = Some(now);
        now - self.arrival
    }
}
