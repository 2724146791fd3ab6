use std::{io::Write, path::Path};

use rayon::prelude::*;

use crate::{
    entities::{server::Server, source::Arrivals, workload::Workload},
    packet::Packet,
    queue::BoundedQueue,
    report::Report,
    simulation::{Output, Simulation},
    time::{Delta, Time},
    units::BytesPerUnit,
};

/// The configuration of a single run.
#[derive(Debug, Clone, typed_builder::TypedBuilder, serde::Serialize, serde::Deserialize)]
pub struct Config {
    #[builder(setter(into))]
    arrivals: Arrivals,

    /// Queue capacity in packets; zero means unbounded.
    #[builder(default = Config::DEFAULT_CAPACITY)]
    #[serde(default = "Config::default_capacity")]
    capacity: usize,
    #[builder(default = BytesPerUnit::DEFAULT, setter(into))]
    #[serde(default = "Config::default_service_rate")]
    service_rate: BytesPerUnit,
    /// Clock increment per tick, in virtual-time units.
    #[builder(default = Config::DEFAULT_STEP)]
    #[serde(default = "Config::default_step")]
    step: f64,
    /// Queue lengths of `max_bucket` and above share one histogram bucket.
    #[builder(default = Config::DEFAULT_MAX_BUCKET)]
    #[serde(default = "Config::default_max_bucket")]
    max_bucket: usize,

    /// Keep every per-packet record in the output, not only in the log.
    #[builder(default)]
    #[serde(default)]
    keep_trace: bool,
}

impl Config {
    pub const DEFAULT_CAPACITY: usize = 1_000_000;
    pub const DEFAULT_STEP: f64 = 0.001;
    pub const DEFAULT_MAX_BUCKET: usize = 10;

    fn default_capacity() -> usize {
        Self::DEFAULT_CAPACITY
    }

    fn default_service_rate() -> BytesPerUnit {
        BytesPerUnit::DEFAULT
    }

    fn default_step() -> f64 {
        Self::DEFAULT_STEP
    }

    fn default_max_bucket() -> usize {
        Self::DEFAULT_MAX_BUCKET
    }

    pub fn arrivals(&self) -> &Arrivals {
        &self.arrivals
    }

    /// Checks every parameter without generating or reading any arrivals.
    pub fn validate(&self) -> Result<(), Error> {
        self.arrivals.validate()?;
        if self.service_rate == BytesPerUnit::ZERO {
            return Err(Error::Config("service rate must be positive".into()));
        }
        if !(self.step.is_finite() && self.step > 0.0) {
            return Err(Error::Config(format!(
                "step must be positive, got {}",
                self.step
            )));
        }
        match Delta::try_from_units(self.step) {
            None => Err(Error::Config(format!(
                "step {} is beyond the clock's range",
                self.step
            ))),
            Some(Delta::ZERO) => Err(Error::Config(format!(
                "step {} is below the clock resolution of {}",
                self.step,
                Delta::RESOLUTION
            ))),
            Some(_) => Ok(()),
        }
    }
}

/// Runs one simulation to completion.
///
/// There is no timeout: the run ends once every admitted packet has been served.
pub fn run(cfg: Config) -> Result<Output, Error> {
    cfg.validate()?;
    log::debug!("{cfg:?}");

    let step = Delta::from_units(cfg.step);
    let workload = cfg.arrivals.into_workload()?;
    check_horizon(&workload, cfg.service_rate, cfg.step)?;
    log::info!(
        "Simulating {} packets, queue capacity {}, service rate {} bytes per unit, step {step}",
        workload.len(),
        cfg.capacity,
        cfg.service_rate,
    );

    let server = Server::builder().rate(cfg.service_rate).build();
    let sim = Simulation::builder()
        .workload(workload)
        .queue(BoundedQueue::new(cfg.capacity, cfg.max_bucket))
        .server(server)
        .step(step)
        .keep_trace(cfg.keep_trace)
        .build();
    let out = sim.run();

    log::info!(
        "Finished at t = {}: {} served, {} dropped",
        out.end_time,
        out.report.served,
        out.report.dropped
    );
    Ok(out)
}

// The run ends at the latest after the last arrival plus every service rounded up to whole
// ticks, with one fetch tick per packet. All of it has to fit on the clock.
fn check_horizon(workload: &Workload, rate: BytesPerUnit, step: f64) -> Result<(), Error> {
    let last_arrival = workload.iter().next_back().map_or(0.0, |p| p.arrival.into_units());
    let service = workload
        .iter()
        .map(|p| p.size.into_f64() / rate.into_f64())
        .sum::<f64>();
    let horizon = last_arrival + service + (2 * workload.len() + 2) as f64 * step;
    match Time::try_from_units(horizon) {
        Some(_) => Ok(()),
        None => Err(Error::Config(format!(
            "the run could last until t = {horizon}, beyond the clock's range"
        ))),
    }
}

/// Runs independent configurations in parallel, one run per configuration.
pub fn sweep(cfgs: Vec<Config>) -> Vec<Result<Output, Error>> {
    cfgs.into_par_iter().map(run).collect()
}

pub fn read_config(path: impl AsRef<Path>) -> Result<Config, Error> {
    let s = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&s)?)
}

/// Writes the rendered summary table.
pub fn write_summary(path: impl AsRef<Path>, report: &Report) -> Result<(), Error> {
    let mut file = std::fs::File::create(path)?;
    write!(file, "{report}")?;
    Ok(())
}

/// Dumps packets as JSON, including their departure times.
pub fn write_packets(path: impl AsRef<Path>, packets: &[Packet]) -> Result<(), Error> {
    let file = std::io::BufWriter::new(std::fs::File::create(path)?);
    serde_json::to_writer(file, packets)?;
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("malformed trace line {line}: {reason}")]
    Parse { line: usize, reason: String },

    #[error("serde error")]
    Serde(#[from] serde_json::Error),

    #[error("IO error")]
    Io(#[from] std::io::Error),
}
