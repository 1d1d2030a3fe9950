//! Multi-event aggregation of shower results.

use crate::histogram::Histogram;
use crate::shower::ShowerResult;
use ngl_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// One bin of the resummed `S(t)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BinEstimate {
    /// Bin center.
    pub t: f64,
    /// Mean survival probability.
    pub ll: f64,
    /// Statistical error.
    pub error: f64,
}

/// Final numbers of a resummation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResummationReport {
    /// `S(t)` per bin.
    pub bins: Vec<BinEstimate>,
    /// One-loop coefficient.
    pub snlo: f64,
    /// Its statistical error.
    pub snlo_error: f64,
    /// Two-loop coefficient `S₂ = ngl₂ + ½ S₁²`.
    pub snnlo: f64,
    /// Its statistical error.
    pub snnlo_error: f64,
    /// Records seen.
    pub n_events: usize,
    /// Events that were showered.
    pub n_valid_events: usize,
    /// Reference event weight (0 if none was positive).
    pub event_weight: f64,
    /// Events whose weight differed from the reference.
    pub weight_mismatches: usize,
}

/// Running sums over showered events.
#[derive(Debug, Clone, PartialEq)]
pub struct Resummation {
    res_ll: Histogram,
    nsh: usize,
    f1: f64,
    f1_sq: f64,
    f2: f64,
    f2_sq: f64,
    n_events: usize,
    n_valid_events: usize,
    event_weight: Option<f64>,
    weight_mismatches: usize,
}

impl Resummation {
    /// Empty aggregate for showers with `n_bins` bins on `[0, t_max)` and
    /// `nsh` repetitions each.
    pub fn new(n_bins: usize, t_max: f64, nsh: usize) -> Result<Self> {
        if nsh == 0 {
            return Err(Error::Validation("nsh must be > 0".into()));
        }
        Ok(Self {
            res_ll: Histogram::new(n_bins, t_max, true)?,
            nsh,
            f1: 0.0,
            f1_sq: 0.0,
            f2: 0.0,
            f2_sq: 0.0,
            n_events: 0,
            n_valid_events: 0,
            event_weight: None,
            weight_mismatches: 0,
        })
    }

    /// Fold in one event's shower result.
    ///
    /// Does not touch the event counters; see [`Resummation::record_event`].
    pub fn add(&mut self, result: &ShowerResult) -> Result<()> {
        if result.nsh != self.nsh {
            return Err(Error::Validation(format!(
                "shower used nsh={}, aggregate expects {}",
                result.nsh, self.nsh
            )));
        }
        self.res_ll.merge(&result.res_ll)?;
        self.f1 += result.ngl_1loop;
        self.f1_sq += result.ngl_1loop_sq;
        self.f2 += result.ngl_2loop;
        self.f2_sq += result.ngl_2loop_sq;
        Ok(())
    }

    /// Count a record; `valid` when it was showered.
    pub fn record_event(&mut self, valid: bool) {
        self.n_events += 1;
        if valid {
            self.n_valid_events += 1;
        }
    }

    /// Track the event weight. The first positive weight is the reference.
    pub fn observe_weight(&mut self, weight: f64) {
        match self.event_weight {
            None if weight > 0.0 => self.event_weight = Some(weight),
            Some(reference) if weight != reference => {
                self.weight_mismatches += 1;
                tracing::warn!(weight, reference, "event weight differs from the first event");
            }
            _ => {}
        }
    }

    /// Combine two aggregates over disjoint event sets.
    pub fn merge(&mut self, other: &Resummation) -> Result<()> {
        if other.nsh != self.nsh {
            return Err(Error::Validation(format!(
                "cannot merge aggregates with nsh={} and nsh={}",
                self.nsh, other.nsh
            )));
        }
        self.res_ll.merge(&other.res_ll)?;
        self.f1 += other.f1;
        self.f1_sq += other.f1_sq;
        self.f2 += other.f2;
        self.f2_sq += other.f2_sq;
        self.n_events += other.n_events;
        self.n_valid_events += other.n_valid_events;
        self.weight_mismatches += other.weight_mismatches;
        match (self.event_weight, other.event_weight) {
            (None, w) => self.event_weight = w,
            (Some(a), Some(b)) if a != b => {
                self.weight_mismatches += 1;
                tracing::warn!(
                    reference = a,
                    other = b,
                    "merged aggregates disagree on event weight"
                );
            }
            _ => {}
        }
        Ok(())
    }

    /// Records seen.
    pub fn n_events(&self) -> usize {
        self.n_events
    }

    /// Events showered.
    pub fn n_valid_events(&self) -> usize {
        self.n_valid_events
    }

    /// Reference weight, if one was observed.
    pub fn event_weight(&self) -> Option<f64> {
        self.event_weight
    }

    /// Summed per-event `S(t)` (not yet divided by the event count).
    pub fn histogram(&self) -> &Histogram {
        &self.res_ll
    }

    /// Average over valid events.
    pub fn report(&self) -> Result<ResummationReport> {
        if self.n_valid_events == 0 {
            return Err(Error::Computation("no valid events to average".into()));
        }
        let n = self.n_valid_events as f64;
        let nsh = self.nsh as f64;
        let squared = self.res_ll.squared_error.as_deref().unwrap_or(&[]);
        let bins = (0..self.res_ll.n_bins)
            .map(|i| BinEstimate {
                t: self.res_ll.center_bin_value(i),
                ll: self.res_ll.entries[i] / n,
                error: squared.get(i).copied().unwrap_or(0.0).max(0.0).sqrt() / n,
            })
            .collect();

        let snlo = self.f1 / n;
        let snlo_error = ((self.f1_sq / n - snlo * snlo) / (nsh * n)).max(0.0).sqrt();
        let mean2 = self.f2 / n;
        let ngl_error = ((self.f2_sq / n - mean2 * mean2) / (nsh * n)).max(0.0).sqrt();
        let snnlo = mean2 + 0.5 * snlo * snlo;
        let snnlo_error = ngl_error.abs() + (snlo * snlo_error).abs();

        Ok(ResummationReport {
            bins,
            snlo,
            snlo_error,
            snnlo,
            snnlo_error,
            n_events: self.n_events,
            n_valid_events: self.n_valid_events,
            event_weight: self.event_weight.unwrap_or(0.0),
            weight_mismatches: self.weight_mismatches,
        })
    }
}
