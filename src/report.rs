use std::fmt;

use crate::{packet::Packet, queue::BoundedQueue};

/// Summary statistics of a finished run.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Report {
    /// Number of packets produced by the arrival process.
    pub generated: usize,
    /// Number of packets that completed service.
    pub served: usize,
    /// Number of packets discarded at a full queue.
    pub dropped: usize,
    /// Average number of packets found in the queue by an admitted arrival, `N = Σ n·P(n)`.
    pub n_avg: f64,
    /// Average sojourn time of the served packets, in virtual-time units.
    pub t_avg: f64,
    /// `P(n)` for `n = 0..=max_bucket`; the last entry also covers every longer queue.
    pub probabilities: Vec<f64>,
}

impl Report {
    pub(crate) fn summarize(generated: usize, queue: &BoundedQueue, departed: &[Packet]) -> Self {
        let served = departed.len();
        let histogram = queue.histogram();
        debug_assert_eq!(histogram.iter().sum::<u64>(), served as u64);

        let probabilities = histogram
            .iter()
            .map(|&count| ratio(count as f64, served))
            .collect::<Vec<_>>();
        let n_avg = probabilities
            .iter()
            .enumerate()
            .map(|(n, p)| n as f64 * p)
            .sum::<f64>();
        let t_total = departed
            .iter()
            .filter_map(Packet::sojourn)
            .map(|d| d.into_units())
            .sum::<f64>();

        Self {
            generated,
            served,
            dropped: queue.dropped(),
            n_avg,
            t_avg: ratio(t_total, served),
            probabilities,
        }
    }

    /// The largest queue length with its own bucket.
    pub fn max_bucket(&self) -> usize {
        self.probabilities.len().saturating_sub(1)
    }
}

fn ratio(num: f64, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num / den as f64
    }
}

/// Formats a probability as a percentage, switching to milli- and micro-percent when it gets too
/// small to read.
pub fn format_probability(p: f64) -> String {
    let percent = p * 100.0;
    if percent == 0.0 {
        "0%".to_owned()
    } else if percent >= 1e-2 {
        format!("{percent:.4}%")
    } else if percent >= 1e-5 {
        format!("{:.4}m%", percent * 1e3)
    } else {
        format!("{:.4}µ%", percent * 1e6)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Packets generated\t{}", self.generated)?;
        writeln!(f, "Packets served\t\t{}", self.served)?;
        writeln!(f, "Packets dropped\t\t{}", self.dropped)?;
        writeln!(f, "Average N\t\t{:.6}", self.n_avg)?;
        writeln!(f, "Average T\t\t{:.6}", self.t_avg)?;
        writeln!(f, "n\tP(n)")?;
        let last = self.max_bucket();
        for (n, &p) in self.probabilities.iter().enumerate() {
            let plus = if n == last { "+" } else { "" };
            writeln!(f, "{n}{plus}\t{}", format_probability(p))?;
        }
        Ok(())
    }
}
