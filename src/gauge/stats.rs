use std::collections::BTreeMap;

use crate::gauge::protocol::QueryOutcome;

/// Round-trip statistics of a polling run.
#[derive(Debug, Clone)]
pub struct PollStats {
    _durations: Vec<f64>,
    _retry_histogram: BTreeMap<u32, u32>,
    _total_retries: u32,
    _total_errors: u32,
}

impl PollStats {
    /// Create new polling statistics.
    ///
    /// # Returns
    /// New polling statistics.
    pub fn new() -> Self {
        Self {
            _durations: Vec::new(),
            _retry_histogram: BTreeMap::new(),
            _total_retries: 0,
            _total_errors: 0,
        }
    }

    /// Record the outcome of one query.
    ///
    /// # Arguments
    /// * `outcome` - Outcome to record.
    pub fn record(&mut self, outcome: &QueryOutcome) {
        if outcome.is_ok() {
            self._durations.push(outcome.elapsed);
        }

        *self._retry_histogram.entry(outcome.retries).or_insert(0) += 1;
        self._total_retries += outcome.retries;
        self._total_errors += outcome.errors;
    }

    /// Get the number of successful queries.
    ///
    /// # Returns
    /// Count.
    pub fn count(&self) -> usize {
        self._durations.len()
    }

    /// Get the total number of retries.
    ///
    /// # Returns
    /// Total retries.
    pub fn total_retries(&self) -> u32 {
        self._total_retries
    }

    /// Get the total number of errors.
    ///
    /// # Returns
    /// Total errors.
    pub fn total_errors(&self) -> u32 {
        self._total_errors
    }

    /// Get the mean round-trip time.
    ///
    /// # Returns
    /// Mean in seconds. 0.0 when nothing was recorded.
    pub fn mean(&self) -> f64 {
        if self._durations.is_empty() {
            return 0.0;
        }

        self._durations.iter().sum::<f64>() / (self._durations.len() as f64)
    }

    /// Get the median round-trip time.
    ///
    /// # Returns
    /// Median in seconds. 0.0 when nothing was recorded.
    pub fn median(&self) -> f64 {
        if self._durations.is_empty() {
            return 0.0;
        }

        let mut sorted = self._durations.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).expect("Durations should be comparable"));

        let middle = sorted.len() / 2;
        if sorted.len() % 2 == 1 {
            sorted[middle]
        } else {
            (sorted[middle - 1] + sorted[middle]) / 2.0
        }
    }

    /// Get the population standard deviation of the round-trip time.
    ///
    /// # Returns
    /// Standard deviation in seconds. 0.0 when nothing was recorded.
    pub fn std(&self) -> f64 {
        if self._durations.is_empty() {
            return 0.0;
        }

        let mean = self.mean();
        let variance = self
            ._durations
            .iter()
            .map(|x| (x - mean).powi(2))
            .sum::<f64>()
            / (self._durations.len() as f64);

        variance.sqrt()
    }

    /// Get the minimum round-trip time.
    ///
    /// # Returns
    /// Minimum in seconds. 0.0 when nothing was recorded.
    pub fn min(&self) -> f64 {
        if self._durations.is_empty() {
            0.0
        } else {
            self._durations
                .iter()
                .copied()
                .fold(f64::INFINITY, f64::min)
        }
    }

    /// Get the maximum round-trip time.
    ///
    /// # Returns
    /// Maximum in seconds. 0.0 when nothing was recorded.
    pub fn max(&self) -> f64 {
        if self._durations.is_empty() {
            0.0
        } else {
            self._durations
                .iter()
                .copied()
                .fold(f64::NEG_INFINITY, f64::max)
        }
    }

    /// Format the statistics block printed at the end of a polling run.
    ///
    /// # Arguments
    /// * `elapsed` - Wall time of the whole run in seconds.
    ///
    /// # Returns
    /// The formatted lines.
    pub fn format_report(&self, elapsed: f64) -> Vec<String> {
        if self._durations.is_empty() {
            return Vec::new();
        }

        let mut lines = vec![
            format!("dt stats: avg: {:>.4}", self.mean()),
            format!("          med: {:>.3}", self.median()),
            format!("          std: {:>.4}", self.std()),
            format!("          min: {:>.4}", self.min()),
            format!("          max: {:>.4}", self.max()),
            format!(" nominal count: {}", self.count()),
            format!("   retry count: {}", self._total_retries),
            format!("   error count: {}", self._total_errors),
        ];

        if elapsed > 0.0 {
            lines.push(format!(
                " rate: {:>.1} reads/sec",
                (self.count() as f64) / elapsed
            ));
        }

        for (retries, count) in &self._retry_histogram {
            lines.push(format!(
                "    retry:{} -- {:>5} {:>.4} probability",
                retries,
                count,
                (*count as f64) / (self.count() as f64)
            ));
        }

        lines
    }
}
