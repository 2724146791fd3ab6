pub(crate) mod trace;

use crate::{
    entities::{server::Server, workload::Workload},
    packet::Packet,
    queue::BoundedQueue,
    report::Report,
    time::{Delta, Time},
    trace::TraceRecord,
};

use self::trace::TraceList;

/// A single simulation run. It owns the clock, the pending arrivals, the queue and the server;
/// nothing is shared between runs.
#[derive(Debug, typed_builder::TypedBuilder)]
pub(crate) struct Simulation {
    // Run-time
    #[builder(default, setter(skip))]
    cur_time: Time,
    #[builder(default, setter(skip))]
    end_of_input: bool,
    #[builder(default, setter(skip))]
    trace: Vec<TraceRecord>,

    // Entities
    workload: Workload,
    queue: BoundedQueue,
    server: Server,

    step: Delta,
    #[builder(default)]
    keep_trace: bool,
}

impl Simulation {
    pub(crate) fn run(mut self) -> Output {
        let generated = self.workload.len();
        while !self.should_stop() {
            self.tick();
        }
        self.finish(generated)
    }

    // Service happens ahead of admission within a tick: a packet fetched by the server this tick
    // is no longer counted in the depth seen by arrivals of the same tick.
    fn tick(&mut self) {
        self.cur_time += self.step;

        let ctx = self.context();
        let records = self.server.step(&mut self.queue, ctx);
        self.emit(records);

        while let Some(pkt) = self.workload.next_due(self.cur_time) {
            let ctx = self.context();
            let records = self.queue.insert(pkt, ctx);
            self.emit(records);
        }

        if self.workload.is_empty() && self.queue.is_empty() {
            self.end_of_input = true;
        }
    }

    fn should_stop(&self) -> bool {
        self.server.is_finished()
    }

    fn context(&self) -> Context {
        Context::new(self.cur_time, self.end_of_input)
    }

    fn emit(&mut self, records: TraceList) {
        for rec in records {
            log::trace!("{rec}");
            if self.keep_trace {
                self.trace.push(rec);
            }
        }
    }

    fn finish(self, generated: usize) -> Output {
        let packets = self.server.into_departed();
        let report = Report::summarize(generated, &self.queue, &packets);
        Output {
            report,
            packets,
            trace: self.trace,
            end_time: self.cur_time,
        }
    }
}

/// The result of a finished run.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Output {
    /// Summary statistics of the run.
    pub report: Report,
    /// Every served packet, in departure order.
    pub packets: Vec<Packet>,
    /// Per-packet log records, only kept when requested in the configuration.
    pub trace: Vec<TraceRecord>,
    /// The virtual time at which the run terminated.
    pub end_time: Time,
}

/// The view of the run handed to the queue and the server on every call.
#[derive(Debug, derive_new::new)]
pub(crate) struct Context {
    pub(crate) cur_time: Time,
    /// No packet is left to arrive and the queue is empty.
    pub(crate) end_of_input: bool,
    #[new(default)]
    records: TraceList,
}

impl Context {
    pub(crate) fn record(&mut self, rec: TraceRecord) {
        self.records.push(rec);
    }

    pub(crate) fn into_records(self) -> TraceList {
        self.records
    }
}
