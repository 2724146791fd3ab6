#[macro_use]
mod ident;

pub mod driver;
pub mod packet;
pub mod report;
pub mod time;
pub mod trace;
pub mod units;

pub(crate) mod entities;
pub(crate) mod queue;
pub(crate) mod simulation;

pub use driver::{run, sweep, Config, Error};
pub use entities::source::{parse_trace, Arrivals, PoissonSource, TraceSource};
pub use packet::{Packet, PacketId};
pub use report::Report;
pub use simulation::Output;
pub use trace::TraceRecord;
