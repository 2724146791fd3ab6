use std::{collections::VecDeque, path::PathBuf};

use rand::{rngs::StdRng, Rng, SeedableRng};
use rand_distr::{Distribution, Exp};

use crate::{
    driver::Error,
    packet::{Packet, PacketId},
    time::{round_units, Time},
    units::Bytes,
};

use super::workload::Workload;

/// The number of decimal digits the clock can represent.
const MAX_PRECISION: u32 = 6;

/// Where the packets of a run come from.
#[derive(Debug, Clone, derive_more::From, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Arrivals {
    /// Poisson arrivals with exponentially distributed sizes.
    Poisson(PoissonSource),
    /// Arrivals read from a trace file.
    Trace(TraceSource),
    /// A fixed, already generated arrival stream.
    Packets(Vec<Packet>),
}

impl Arrivals {
    pub(crate) fn validate(&self) -> Result<(), Error> {
        match self {
            Arrivals::Poisson(src) => src.validate(),
            Arrivals::Trace(src) => src.validate(),
            Arrivals::Packets(pkts) => Arrivals::validate_stream(pkts),
        }
    }

    fn validate_stream(pkts: &[Packet]) -> Result<(), Error> {
        if pkts.is_empty() {
            return Err(Error::Config("the arrival stream is empty".into()));
        }
        if pkts.windows(2).any(|w| w[1].arrival < w[0].arrival) {
            return Err(Error::Config("arrival times must be non-decreasing".into()));
        }
        if pkts.iter().any(|p| p.departure.is_some()) {
            return Err(Error::Config("arrival stream contains served packets".into()));
        }
        Ok(())
    }

    /// Produces the arrival stream. Only the trace variant touches the file system.
    pub fn generate(&self) -> Result<Vec<Packet>, Error> {
        self.validate()?;
        match self {
            Arrivals::Poisson(src) => src.generate(&mut src.rng()),
            Arrivals::Trace(src) => {
                let pkts = src.read()?;
                if pkts.is_empty() {
                    return Err(Error::Config(format!(
                        "trace {} contains no packets",
                        src.path.display()
                    )));
                }
                Ok(pkts)
            }
            Arrivals::Packets(pkts) => Ok(pkts.clone()),
        }
    }

    pub(crate) fn into_workload(self) -> Result<Workload, Error> {
        let pkts = match self {
            Arrivals::Packets(pkts) => {
                Arrivals::validate_stream(&pkts)?;
                pkts
            }
            other => other.generate()?,
        };
        Ok(Workload::new(VecDeque::from(pkts)))
    }
}

/// A Poisson packet source: exponential inter-arrival gaps with rate `lambda` and exponential
/// packet sizes with mean `mean_size` bytes.
#[derive(Debug, Clone, typed_builder::TypedBuilder, serde::Serialize, serde::Deserialize)]
pub struct PoissonSource {
    lambda: f64,
    count: usize,
    #[builder(default = PoissonSource::DEFAULT_MEAN_SIZE)]
    #[serde(default = "PoissonSource::default_mean_size")]
    mean_size: f64,
    /// Arrival instants are rounded to this many decimal digits.
    #[builder(default = PoissonSource::DEFAULT_PRECISION)]
    #[serde(default = "PoissonSource::default_precision")]
    precision: u32,
    #[builder(default, setter(strip_option))]
    #[serde(default)]
    seed: Option<u64>,
}

impl PoissonSource {
    pub const DEFAULT_MEAN_SIZE: f64 = 1250.0;
    pub const DEFAULT_PRECISION: u32 = 3;

    fn default_mean_size() -> f64 {
        Self::DEFAULT_MEAN_SIZE
    }

    fn default_precision() -> u32 {
        Self::DEFAULT_PRECISION
    }

    pub fn lambda(&self) -> f64 {
        self.lambda
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub(crate) fn validate(&self) -> Result<(), Error> {
        if !(self.lambda.is_finite() && self.lambda > 0.0) {
            return Err(Error::Config(format!(
                "arrival rate must be positive, got {}",
                self.lambda
            )));
        }
        if self.count == 0 {
            return Err(Error::Config("packet count must be positive".into()));
        }
        if !(self.mean_size.is_finite() && self.mean_size > 0.0) {
            return Err(Error::Config(format!(
                "mean packet size must be positive, got {}",
                self.mean_size
            )));
        }
        check_precision(self.precision)
    }

    /// The random source of this generator: seeded when a seed is configured, from entropy
    /// otherwise.
    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    /// Draws `count` packets from `rng`.
    ///
    /// Fails if a drawn size or arrival instant does not fit the byte counter or the clock, which
    /// only happens for extreme mean sizes or arrival rates.
    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Vec<Packet>, Error> {
        self.validate()?;
        let sizes = Exp::new(1.0 / self.mean_size)
            .map_err(|e| Error::Config(format!("mean packet size {}: {e}", self.mean_size)))?;
        let gaps = Exp::new(self.lambda)
            .map_err(|e| Error::Config(format!("arrival rate {}: {e}", self.lambda)))?;
        let mut now = 0.0;
        (0..self.count)
            .map(|i| {
                let size = sizes.sample(rng).round();
                if size >= u64::MAX as f64 {
                    return Err(Error::Config(format!(
                        "packet {i} drew a size of {size} bytes, mean size {} is too large",
                        self.mean_size
                    )));
                }
                now = round_units(now + gaps.sample(rng), self.precision);
                let arrival = Time::try_from_units(now).ok_or_else(|| {
                    Error::Config(format!(
                        "packet {i} arrives at {now}, beyond the clock's range; arrival rate {} \
                         is too small",
                        self.lambda
                    ))
                })?;
                Ok(Packet::builder()
                    .id(PacketId::new(i))
                    .size(Bytes::new(size as u64))
                    .arrival(arrival)
                    .build())
            })
            .collect()
    }
}

/// A trace-driven packet source.
///
/// The trace is plain text with one packet per line and two whitespace-separated fields: the
/// inter-arrival time and the packet size in bytes.
#[derive(Debug, Clone, typed_builder::TypedBuilder, serde::Serialize, serde::Deserialize)]
pub struct TraceSource {
    #[builder(setter(into))]
    path: PathBuf,
    /// Only read the first `limit` lines.
    #[builder(default, setter(strip_option))]
    #[serde(default)]
    limit: Option<usize>,
    #[builder(default = TraceSource::DEFAULT_PRECISION)]
    #[serde(default = "TraceSource::default_precision")]
    precision: u32,
}

impl TraceSource {
    pub const DEFAULT_PRECISION: u32 = 2;

    fn default_precision() -> u32 {
        Self::DEFAULT_PRECISION
    }

    pub(crate) fn validate(&self) -> Result<(), Error> {
        if self.limit == Some(0) {
            return Err(Error::Config("trace line limit must be positive".into()));
        }
        check_precision(self.precision)
    }

    pub fn read(&self) -> Result<Vec<Packet>, Error> {
        let s = std::fs::read_to_string(&self.path)?;
        parse_trace(&s, self.limit, self.precision)
    }
}

/// Parses a trace, stopping after `limit` lines if given.
///
/// Every line must hold exactly a non-negative inter-arrival time and an integer size. The first
/// bad line fails the whole trace.
pub fn parse_trace(s: &str, limit: Option<usize>, precision: u32) -> Result<Vec<Packet>, Error> {
    let mut now = 0.0;
    s.lines()
        .take(limit.unwrap_or(usize::MAX))
        .enumerate()
        .map(|(i, line)| {
            let err = |reason: &str| Error::Parse {
                line: i + 1,
                reason: reason.to_owned(),
            };
            let mut fields = line.split_whitespace();
            let (gap, size) = match (fields.next(), fields.next(), fields.next()) {
                (Some(gap), Some(size), None) => (gap, size),
                (_, _, Some(_)) => return Err(err("too many fields")),
                _ => return Err(err("expected `<inter_arrival_time> <packet_size>`")),
            };
            let gap = gap
                .parse::<f64>()
                .map_err(|e| err(&format!("bad inter-arrival time {gap:?}: {e}")))?;
            if !(gap.is_finite() && gap >= 0.0) {
                return Err(err(&format!("bad inter-arrival time {gap}")));
            }
            let size = size
                .parse::<u64>()
                .map_err(|e| err(&format!("bad packet size {size:?}: {e}")))?;
            now = round_units(now + gap, precision);
            let arrival = Time::try_from_units(now)
                .ok_or_else(|| err(&format!("arrival time {now} is beyond the clock's range")))?;
            Ok(Packet::builder()
                .id(PacketId::new(i))
                .size(Bytes::new(size))
                .arrival(arrival)
                .build())
        })
        .collect()
}

fn check_precision(precision: u32) -> Result<(), Error> {
    if precision > MAX_PRECISION {
        return Err(Error::Config(format!(
            "arrival precision of {precision} digits is finer than the clock"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poisson_is_reproducible() {
        let src = PoissonSource::builder().lambda(2.0).count(500).seed(7).build();
        let a = src.generate(&mut src.rng()).unwrap();
        let b = src.generate(&mut src.rng()).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 500);
    }

    #[test]
    fn poisson_arrivals_are_ordered_and_rounded() {
        let src = PoissonSource::builder().lambda(5.0).count(1_000).seed(1).build();
        let pkts = src.generate(&mut src.rng()).unwrap();
        assert!(pkts.windows(2).all(|w| w[0].arrival <= w[1].arrival));
        // Three digits: a multiple of 1000 clock ticks
        assert!(pkts.iter().all(|p| p.arrival.into_ticks() % 1_000 == 0));
        assert!(pkts.iter().enumerate().all(|(i, p)| p.id == PacketId::new(i)));
    }

    #[test]
    fn poisson_sample_means() {
        let src = PoissonSource::builder()
            .lambda(4.0)
            .count(50_000)
            .seed(42)
            .build();
        let pkts = src.generate(&mut src.rng()).unwrap();
        let n = pkts.len() as f64;
        let mean_size = pkts.iter().map(|p| p.size.into_f64()).sum::<f64>() / n;
        let mean_gap = pkts.last().unwrap().arrival.into_units() / n;
        assert!((mean_size - 1250.0).abs() < 40.0, "mean size {mean_size}");
        assert!((mean_gap - 0.25).abs() < 0.01, "mean gap {mean_gap}");
    }

    #[test]
    fn invalid_poisson_parameters() {
        let bad_rate = PoissonSource::builder().lambda(0.0).count(1).build();
        assert!(matches!(bad_rate.validate(), Err(Error::Config(_))));
        let bad_count = PoissonSource::builder().lambda(1.0).count(0).build();
        assert!(matches!(bad_count.validate(), Err(Error::Config(_))));
        let bad_size = PoissonSource::builder()
            .lambda(1.0)
            .count(1)
            .mean_size(-3.0)
            .build();
        assert!(matches!(bad_size.validate(), Err(Error::Config(_))));
        let bad_precision = PoissonSource::builder()
            .lambda(1.0)
            .count(1)
            .precision(9)
            .build();
        assert!(matches!(bad_precision.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn trace_accumulates_gaps() {
        let pkts = parse_trace("0.5 100\n0.25 200\n0 300\n", None, 2).unwrap();
        let arrivals = pkts.iter().map(|p| p.arrival).collect::<Vec<_>>();
        assert_eq!(
            arrivals,
            vec![
                Time::from_units(0.5),
                Time::from_units(0.75),
                Time::from_units(0.75)
            ]
        );
        let sizes = pkts.iter().map(|p| p.size.into_u64()).collect::<Vec<_>>();
        assert_eq!(sizes, vec![100, 200, 300]);
    }

    #[test]
    fn trace_rounds_to_precision() {
        let pkts = parse_trace("0.123 1\n0.123 1", None, 2).unwrap();
        assert_eq!(pkts[0].arrival, Time::from_units(0.12));
        assert_eq!(pkts[1].arrival, Time::from_units(0.24));
    }

    #[test]
    fn trace_limit() {
        let pkts = parse_trace("0.1 1\n0.1 2\n0.1 3\nnot a line", Some(3), 2).unwrap();
        assert_eq!(pkts.len(), 3);
    }

    #[test]
    fn malformed_trace_lines_fail() {
        for (trace, line) in [
            ("0.1 100\n0.2\n", 2),
            ("abc 100\n", 1),
            ("0.1 1.5\n", 1),
            ("0.1 -4\n", 1),
            ("-0.1 4\n", 1),
            ("0.1 4 5\n", 1),
            ("0.1 4\n\n0.1 4\n", 2),
            ("inf 4\n", 1),
        ] {
            match parse_trace(trace, None, 2) {
                Err(Error::Parse { line: l, .. }) => assert_eq!(l, line, "{trace:?}"),
                other => panic!("{trace:?} parsed as {other:?}"),
            }
        }
    }

    #[test]
    fn trace_arrivals_beyond_the_clock_fail() {
        // Overflows to infinity while rounding
        match parse_trace("1e307 100\n", None, 2) {
            Err(Error::Parse { line: 1, .. }) => {}
            other => panic!("parsed as {other:?}"),
        }
        // Finite, but past the last representable tick
        match parse_trace("1e13 100\n2e13 100\n", None, 2) {
            Err(Error::Parse { line: 2, .. }) => {}
            other => panic!("parsed as {other:?}"),
        }
    }

    #[test]
    fn tiny_arrival_rate_fails_generation() {
        let src = PoissonSource::builder().lambda(1e-307).count(3).seed(1).build();
        assert!(src.validate().is_ok());
        assert!(matches!(src.generate(&mut src.rng()), Err(Error::Config(_))));
    }

    #[test]
    fn huge_mean_size_fails_generation() {
        let src = PoissonSource::builder()
            .lambda(1.0)
            .count(3)
            .mean_size(1e300)
            .seed(1)
            .build();
        assert!(matches!(src.generate(&mut src.rng()), Err(Error::Config(_))));
    }

    #[test]
    fn empty_packet_stream_is_rejected() {
        assert!(matches!(
            Arrivals::Packets(Vec::new()).validate(),
            Err(Error::Config(_))
        ));
    }
}
