use std::fmt;

use crate::{
    packet::PacketId,
    time::{Delta, Time},
    units::Bytes,
};

/// A per-packet log record, produced by the queue on insertion (or drop) and by the server on
/// departure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TraceRecord {
    /// The packet was admitted; `depth` is the queue length it found on arrival.
    Arrival {
        time: Time,
        id: PacketId,
        size: Bytes,
        depth: usize,
    },
    /// The packet was discarded because the queue was full.
    Drop { time: Time, id: PacketId, size: Bytes },
    /// The packet finished service.
    Departure {
        time: Time,
        id: PacketId,
        size: Bytes,
        sojourn: Delta,
    },
}

impl TraceRecord {
    pub fn id(&self) -> PacketId {
        match *self {
            TraceRecord::Arrival { id, .. }
            | TraceRecord::Drop { id, .. }
            | TraceRecord::Departure { id, .. } => id,
        }
    }
}

impl fmt::Display for TraceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraceRecord::Arrival {
                time,
                id,
                size,
                depth,
            } => write!(f, "{time}\tARRIVAL\t{id}\t{size}\t{depth}"),
            TraceRecord::Drop { time, id, size } => write!(f, "{time}\tDROP\t{id}\t{size}"),
            TraceRecord::Departure {
                time,
                id,
                size,
                sojourn,
            } => write!(f, "{time}\tDEPARTURE\t{id}\t{size}\t{sojourn}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_layout() {
        let rec = TraceRecord::Departure {
            time: Time::from_units(2.5),
            id: PacketId::new(7),
            size: Bytes::new(1250),
            sojourn: Delta::from_units(1.0),
        };
        assert_eq!(rec.to_string(), "2.500000\tDEPARTURE\t7\t1250\t1.000000");
        assert_eq!(rec.id(), PacketId::new(7));
    }
}
