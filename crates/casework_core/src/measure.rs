//! A small wall-clock measurement utility.

use std::fmt;
use std::time::Instant;

/// How many times [`measure`] runs its block.
pub const DEFAULT_ITERATIONS: usize = 10;

/// Per-run timings of a measured block, in seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    pub label: String,
    pub samples: Vec<f64>,
}

impl Measurement {
    pub fn new(label: impl Into<String>, samples: Vec<f64>) -> Self {
        Self {
            label: label.into(),
            samples,
        }
    }

    pub fn average(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().sum::<f64>() / self.samples.len() as f64
    }

    /// Sample standard deviation (n − 1 divisor). Zero with fewer than two samples.
    pub fn standard_deviation(&self) -> f64 {
        let n = self.samples.len();
        if n < 2 {
            return 0.0;
        }
        let mean = self.average();
        let variance = self.samples.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
        variance.sqrt()
    }

    /// `stddev / mean * 100`. Zero when the mean is zero.
    pub fn relative_standard_deviation(&self) -> f64 {
        let mean = self.average();
        if mean == 0.0 {
            return 0.0;
        }
        self.standard_deviation() * 100.0 / mean
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let values: Vec<String> = self.samples.iter().map(|s| format!("{s:.6}")).collect();
        write!(
            f,
            "Test Case '{}' measured [Time, seconds] average: {:.3}, relative standard deviation: {:.3}%, values: [{}]",
            self.label,
            self.average(),
            self.relative_standard_deviation(),
            values.join(", ")
        )
    }
}

/// Run `block` [`DEFAULT_ITERATIONS`] times and print a summary line.
pub fn measure(label: &str, block: impl FnMut()) -> Measurement {
    measure_iterations(label, DEFAULT_ITERATIONS, block)
}

/// Run `block` `iterations` times, timing each run, and print a summary line.
pub fn measure_iterations(label: &str, iterations: usize, mut block: impl FnMut()) -> Measurement {
    let samples = (0..iterations)
        .map(|_| {
            let start = Instant::now();
            block();
            start.elapsed().as_secs_f64()
        })
        .collect();
    let measurement = Measurement::new(label, samples);
    println!("{measurement}");
    measurement
}
