use crate::{
    packet::Packet,
    queue::BoundedQueue,
    simulation::{trace::TraceList, Context},
    time::{Delta, Time},
    trace::TraceRecord,
    units::BytesPerUnit,
};

/// A single server draining the queue one packet at a time.
///
/// The server is stepped once per tick and takes at most one state transition per step. Once it
/// latches termination every further step is a no-op.
#[derive(Debug, typed_builder::TypedBuilder)]
pub(crate) struct Server {
    #[builder(setter(into))]
    rate: BytesPerUnit,

    #[builder(default, setter(skip))]
    state: State,
    #[builder(default, setter(skip))]
    packet: Option<Packet>,
    #[builder(default, setter(skip))]
    started: Time,
    #[builder(default, setter(skip))]
    duration: Delta,

    #[builder(default, setter(skip))]
    served: usize,
    #[builder(default, setter(skip))]
    departed: Vec<Packet>,
    #[builder(default, setter(skip))]
    finished: bool,
}

impl Server {
    #[must_use]
    pub(crate) fn step(&mut self, queue: &mut BoundedQueue, mut ctx: Context) -> TraceList {
        if self.finished {
            return ctx.into_records();
        }
        let guard = match self.state {
            State::Initial => Guard::default(),
            State::Fetching => self.fetch(queue, &ctx),
            State::Serving => self.serve(&mut ctx),
        };
        self.state = self.state.next(guard);
        ctx.into_records()
    }

    fn fetch(&mut self, queue: &mut BoundedQueue, ctx: &Context) -> Guard {
        match queue.extract() {
            Some(pkt) => {
                // Computed once, not on every tick of the service
                self.duration = self.rate.service_time(pkt.size);
                self.started = ctx.cur_time;
                self.packet = Some(pkt);
                Guard::new(true, false)
            }
            None => {
                if ctx.end_of_input {
                    self.finished = true;
                }
                Guard::default()
            }
        }
    }

    fn serve(&mut self, ctx: &mut Context) -> Guard {
        if ctx.cur_time - self.started < self.duration {
            return Guard::default();
        }
        let mut pkt = self
            .packet
            .take()
            .expect("server is serving without a packet");
        let sojourn = pkt.depart(ctx.cur_time);
        self.served += 1;
        ctx.record(TraceRecord::Departure {
            time: ctx.cur_time,
            id: pkt.id,
            size: pkt.size,
            sojourn,
        });
        self.departed.push(pkt);
        if ctx.end_of_input {
            self.finished = true;
        }
        Guard::new(false, true)
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.finished
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> State {
        self.state
    }

    #[cfg(test)]
    pub(crate) fn served(&self) -> usize {
        self.served
    }

    pub(crate) fn into_departed(self) -> Vec<Packet> {
        debug_assert_eq!(self.served, self.departed.len());
        self.departed
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, derivative::Derivative)]
#[derivative(Default)]
pub(crate) enum State {
    #[derivative(Default)]
    Initial,
    Fetching,
    Serving,
}

impl State {
    /// The transition function. It only looks at what the last action observed, so it can be
    /// tested without a queue or a clock.
    pub(crate) fn next(self, guard: Guard) -> State {
        match self {
            State::Initial => State::Fetching,
            State::Fetching if guard.fetched => State::Serving,
            State::Fetching => State::Fetching,
            // Straight back to fetching: going through INITIAL would idle for one tick between
            // consecutive services.
            State::Serving if guard.served => State::Fetching,
            State::Serving => State::Serving,
        }
    }
}

/// What the action of the current state observed on this tick.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, derive_new::new)]
pub(crate) struct Guard {
    /// A packet was taken from the queue.
    fetched: bool,
    /// The packet in service has departed.
    served: bool,
}
