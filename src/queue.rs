use std::collections::VecDeque;

use crate::{
    packet::Packet,
    simulation::{trace::TraceList, Context},
    trace::TraceRecord,
};

/// A FIFO buffer of fixed capacity that drops arrivals when full.
///
/// A capacity of zero means the buffer is unbounded. Every admitted packet records the queue length
/// it found in the occupancy histogram; lengths of `max_bucket` and above share the last bucket.
#[derive(Debug, Clone)]
pub(crate) struct BoundedQueue {
    inner: VecDeque<Packet>,
    capacity: usize,
    dropped: usize,
    histogram: Vec<u64>,
}

impl BoundedQueue {
    pub(crate) fn new(capacity: usize, max_bucket: usize) -> Self {
        Self {
            inner: VecDeque::new(),
            capacity,
            dropped: 0,
            histogram: vec![0; max_bucket + 1],
        }
    }

    delegate::delegate! {
        to self.inner {
            pub(crate) fn len(&self) -> usize;
            pub(crate) fn is_empty(&self) -> bool;

            #[call(pop_front)]
            pub(crate) fn extract(&mut self) -> Option<Packet>;
        }
    }

    pub(crate) fn is_full(&self) -> bool {
        self.capacity != 0 && self.inner.len() >= self.capacity
    }

    #[must_use]
    pub(crate) fn insert(&mut self, pkt: Packet, mut ctx: Context) -> TraceList {
        if self.is_full() {
            self.dropped += 1;
            ctx.record(TraceRecord::Drop {
                time: ctx.cur_time,
                id: pkt.id,
                size: pkt.size,
            });
            return ctx.into_records();
        }
        let depth = self.inner.len();
        let bucket = depth.min(self.histogram.len() - 1);
        self.histogram[bucket] += 1;
        ctx.record(TraceRecord::Arrival {
            time: ctx.cur_time,
            id: pkt.id,
            size: pkt.size,
            depth,
        });
        self.inner.push_back(pkt);
        debug_assert!(self.capacity == 0 || self.len() <= self.capacity);
        ctx.into_records()
    }

    pub(crate) fn dropped(&self) -> usize {
        self.dropped
    }

    pub(crate) fn histogram(&self) -> &[u64] {
        &self.histogram
    }
}
