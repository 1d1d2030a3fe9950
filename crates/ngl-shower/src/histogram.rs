//! Fixed-binning histogram over the evolution-time axis.

use ngl_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Uniformly binned histogram on `[0, t_max)`.
///
/// Values outside the range are never binned: they are recorded in
/// `underflow` / `overflow` and `fill` reports `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    /// Number of bins.
    pub n_bins: usize,
    /// Upper edge of the last bin.
    pub t_max: f64,
    /// Sum of weights per bin.
    pub entries: Vec<f64>,
    /// Sum of squared weights per bin, if tracked.
    pub squared_error: Option<Vec<f64>>,
    /// Sum of weights filled below 0.
    pub underflow: f64,
    /// Sum of weights filled at or above `t_max` (and NaN times).
    pub overflow: f64,
}

impl Histogram {
    /// Create an empty histogram.
    pub fn new(n_bins: usize, t_max: f64, track_errors: bool) -> Result<Self> {
        if n_bins == 0 {
            return Err(Error::Validation("n_bins must be > 0".into()));
        }
        if !t_max.is_finite() || t_max <= 0.0 {
            return Err(Error::Validation(format!("t_max must be finite and > 0, got {}", t_max)));
        }
        Ok(Self {
            n_bins,
            t_max,
            entries: vec![0.0; n_bins],
            squared_error: track_errors.then(|| vec![0.0; n_bins]),
            underflow: 0.0,
            overflow: 0.0,
        })
    }

    /// Width of every bin.
    #[inline]
    pub fn bin_width(&self) -> f64 {
        self.t_max / self.n_bins as f64
    }

    /// Midpoint of bin `i`.
    #[inline]
    pub fn center_bin_value(&self, i: usize) -> f64 {
        (i as f64 + 0.5) * self.bin_width()
    }

    /// All bin midpoints.
    pub fn centers(&self) -> Vec<f64> {
        (0..self.n_bins).map(|i| self.center_bin_value(i)).collect()
    }

    /// Whether squared weights are tracked.
    pub fn tracks_errors(&self) -> bool {
        self.squared_error.is_some()
    }

    /// Bin containing `t`, or `None` outside `[0, t_max)`.
    pub fn bin_index(&self, t: f64) -> Option<usize> {
        if !(t >= 0.0 && t < self.t_max) {
            return None;
        }
        Some(((t / self.bin_width()) as usize).min(self.n_bins - 1))
    }

    /// Add `weight` to the bin containing `t`.
    ///
    /// Returns the bin index, or `None` when `t` went to under/overflow.
    pub fn fill(&mut self, t: f64, weight: f64) -> Option<usize> {
        match self.bin_index(t) {
            Some(i) => {
                self.entries[i] += weight;
                if let Some(sq) = self.squared_error.as_mut() {
                    sq[i] += weight * weight;
                }
                Some(i)
            }
            None => {
                if t < 0.0 {
                    self.underflow += weight;
                } else {
                    self.overflow += weight;
                }
                None
            }
        }
    }

    /// Add `weight` to every bin whose center lies below `t_end`.
    ///
    /// A shower repetition that survives until `t_end` contributes to the
    /// no-emission probability at each earlier bin center. Returns the number
    /// of bins touched.
    pub fn fill_survival(&mut self, t_end: f64, weight: f64) -> usize {
        if t_end.is_nan() {
            return 0;
        }
        let n = if t_end >= self.t_max {
            self.n_bins
        } else if t_end <= 0.0 {
            0
        } else {
            // Bins with (i + 0.5) * w < t_end.
            let k = (t_end / self.bin_width() - 0.5).ceil();
            (k.max(0.0) as usize).min(self.n_bins)
        };
        for e in &mut self.entries[..n] {
            *e += weight;
        }
        if let Some(sq) = self.squared_error.as_mut() {
            for s in &mut sq[..n] {
                *s += weight * weight;
            }
        }
        n
    }

    fn check_compatible(&self, other: &Histogram) -> Result<()> {
        if self.n_bins != other.n_bins || self.t_max != other.t_max {
            return Err(Error::Validation(format!(
                "histogram binning mismatch: ({}, {}) vs ({}, {})",
                self.n_bins, self.t_max, other.n_bins, other.t_max
            )));
        }
        if self.tracks_errors() != other.tracks_errors() {
            return Err(Error::Validation(
                "cannot combine histograms with and without squared errors".into(),
            ));
        }
        Ok(())
    }

    /// Add `other` bin by bin into `self`.
    pub fn merge(&mut self, other: &Histogram) -> Result<()> {
        self.check_compatible(other)?;
        for (a, b) in self.entries.iter_mut().zip(&other.entries) {
            *a += b;
        }
        if let (Some(sa), Some(sb)) = (self.squared_error.as_mut(), other.squared_error.as_ref()) {
            for (a, b) in sa.iter_mut().zip(sb) {
                *a += b;
            }
        }
        self.underflow += other.underflow;
        self.overflow += other.overflow;
        Ok(())
    }

    /// Bin-wise sum of two histograms with identical binning.
    pub fn checked_add(&self, other: &Histogram) -> Result<Histogram> {
        let mut out = self.clone();
        out.merge(other)?;
        Ok(out)
    }
}
