//! Monte-Carlo dipole shower for the no-emission probability `S(t)`.
//!
//! One *repetition* evolves the event's dipole chain in the evolution time
//! `t`: waiting times are exponential in the total chain rate, each emission
//! splits its parent dipole, and the repetition stops as soon as a gluon
//! lands in the veto region (or at `t_max`). The surviving time is binned
//! cumulatively, so `S(t)` is the fraction of repetitions still alive at `t`.
//!
//! - Rayon-parallel over fixed chunks of repetitions.
//! - Deterministic: repetition `r` always draws from the same `StdRng`
//!   stream, and chunk tallies are merged in chunk order, so results do not
//!   depend on the thread count.

use crate::event::Event;
use crate::histogram::Histogram;
use crate::radiator::{Radiator, Split};
use ngl_core::{Error, FourVector, OutsideRegion, Result};
use rand::prelude::*;
use rand_distr::Exp;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Repetitions per parallel work unit.
pub const CHUNK_SIZE: usize = 64;

// ---------------------------------------------------------------------------
// RNG
// ---------------------------------------------------------------------------

/// Counter-based repetition RNG. Same `(seed, repetition)` → same draws.
#[inline]
pub fn repetition_rng(seed: u64, repetition: u64) -> StdRng {
    StdRng::seed_from_u64(seed.wrapping_mul(2654435761).wrapping_add(repetition))
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Parameters of one shower run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShowerSettings {
    /// Repetitions per event.
    pub nsh: usize,
    /// Bins of the `S(t)` histogram.
    pub n_bins: usize,
    /// Upper end of the evolution-time axis.
    pub t_max: f64,
    /// Collinear cutoff `|η|` in each dipole frame.
    pub cutoff: f64,
    /// Base seed of the repetition streams.
    pub seed: u64,
    /// Also estimate the one- and two-loop coefficients.
    pub fixed_order: bool,
    /// Largest dipole chain a repetition may grow.
    pub max_dipoles: usize,
}

impl Default for ShowerSettings {
    fn default() -> Self {
        Self {
            nsh: 100,
            n_bins: 100,
            t_max: 0.1,
            cutoff: 6.0,
            seed: 42,
            fixed_order: true,
            max_dipoles: 100_000,
        }
    }
}

impl ShowerSettings {
    /// Check ranges.
    pub fn validate(&self) -> Result<()> {
        if self.nsh == 0 {
            return Err(Error::Validation("nsh must be > 0".into()));
        }
        if self.n_bins == 0 {
            return Err(Error::Validation("n_bins must be > 0".into()));
        }
        if !self.t_max.is_finite() || self.t_max <= 0.0 {
            return Err(Error::Validation(format!("t_max must be finite and > 0, got {}", self.t_max)));
        }
        if !self.cutoff.is_finite() || self.cutoff <= 0.0 {
            return Err(Error::Validation(format!(
                "cutoff must be finite and > 0, got {}",
                self.cutoff
            )));
        }
        if self.max_dipoles == 0 {
            return Err(Error::Validation("max_dipoles must be >= 1".into()));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Accumulators
// ---------------------------------------------------------------------------

/// Raw sums over a set of repetitions.
#[derive(Debug, Clone, PartialEq)]
pub struct Tally {
    /// Survival counts per bin (with squared weights).
    pub res_ll: Histogram,
    /// Σ s₁.
    pub ngl1: f64,
    /// Σ s₁².
    pub ngl1_sq: f64,
    /// Σ s₂.
    pub ngl2: f64,
    /// Σ s₂².
    pub ngl2_sq: f64,
    /// Repetitions added.
    pub n_repetitions: usize,
    /// Gluons emitted during evolution, vetoed ones included.
    pub n_emissions: usize,
}

impl Tally {
    /// Empty tally on the given binning.
    pub fn new(n_bins: usize, t_max: f64) -> Result<Self> {
        Ok(Self {
            res_ll: Histogram::new(n_bins, t_max, true)?,
            ngl1: 0.0,
            ngl1_sq: 0.0,
            ngl2: 0.0,
            ngl2_sq: 0.0,
            n_repetitions: 0,
            n_emissions: 0,
        })
    }

    /// Add `other` into `self`.
    pub fn merge(&mut self, other: &Tally) -> Result<()> {
        self.res_ll.merge(&other.res_ll)?;
        self.ngl1 += other.ngl1;
        self.ngl1_sq += other.ngl1_sq;
        self.ngl2 += other.ngl2;
        self.ngl2_sq += other.ngl2_sq;
        self.n_repetitions += other.n_repetitions;
        self.n_emissions += other.n_emissions;
        Ok(())
    }
}

/// Per-repetition means of one showered event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShowerResult {
    /// `S(t)` per bin; `squared_error` holds the variance of the mean.
    pub res_ll: Histogram,
    /// Mean one-loop estimator.
    pub ngl_1loop: f64,
    /// Mean of its square.
    pub ngl_1loop_sq: f64,
    /// Mean two-loop non-global estimator.
    pub ngl_2loop: f64,
    /// Mean of its square.
    pub ngl_2loop_sq: f64,
    /// Repetitions behind the means.
    pub nsh: usize,
    /// Gluons emitted over all repetitions.
    pub n_emissions: usize,
    /// Weight of the showered event.
    pub event_weight: f64,
    /// Wall time of the run.
    pub wall_time_s: f64,
}

impl ShowerResult {
    /// Normalize raw sums by the number of repetitions.
    pub fn from_tally(tally: Tally, event_weight: f64, wall_time_s: f64) -> Result<Self> {
        if tally.n_repetitions == 0 {
            return Err(Error::Computation("no shower repetitions to normalize".into()));
        }
        let n = tally.n_repetitions as f64;
        let mut res_ll = tally.res_ll;
        for e in &mut res_ll.entries {
            *e /= n;
        }
        if let Some(sq) = res_ll.squared_error.as_mut() {
            for (s, mean) in sq.iter_mut().zip(&res_ll.entries) {
                *s = ((*s / n - mean * mean) / n).max(0.0);
            }
        }
        res_ll.underflow /= n;
        res_ll.overflow /= n;
        Ok(Self {
            res_ll,
            ngl_1loop: tally.ngl1 / n,
            ngl_1loop_sq: tally.ngl1_sq / n,
            ngl_2loop: tally.ngl2 / n,
            ngl_2loop_sq: tally.ngl2_sq / n,
            nsh: tally.n_repetitions,
            n_emissions: tally.n_emissions,
            event_weight,
            wall_time_s,
        })
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Shower engine for one event and one veto region.
#[derive(Debug)]
pub struct Shower<'a, R: OutsideRegion + ?Sized> {
    radiators: Vec<Radiator>,
    region: &'a R,
    settings: ShowerSettings,
    weight: f64,
}

impl<'a, R: OutsideRegion + ?Sized> Shower<'a, R> {
    /// Prepare every dipole of `event` for emission.
    pub fn new(event: &Event, region: &'a R, settings: ShowerSettings) -> Result<Self> {
        settings.validate()?;
        let radiators = event
            .dipoles()
            .iter()
            .map(|d| Radiator::new(d, settings.cutoff))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { radiators, region, settings, weight: event.weight() })
    }

    /// Settings in use.
    pub fn settings(&self) -> &ShowerSettings {
        &self.settings
    }

    /// Total emission rate of the initial chain.
    pub fn rate(&self) -> f64 {
        self.radiators.iter().map(Radiator::rate).sum()
    }

    /// Run all `nsh` repetitions and normalize.
    pub fn shower(&self) -> Result<ShowerResult> {
        let t0 = std::time::Instant::now();
        let nsh = self.settings.nsh;
        let n_chunks = nsh.div_ceil(CHUNK_SIZE);

        let tallies = (0..n_chunks)
            .into_par_iter()
            .map(|c| {
                let start = c * CHUNK_SIZE;
                let end = (start + CHUNK_SIZE).min(nsh);
                let mut tally = Tally::new(self.settings.n_bins, self.settings.t_max)?;
                for r in start..end {
                    let mut rng = repetition_rng(self.settings.seed, r as u64);
                    self.run_repetition(&mut rng, &mut tally)?;
                }
                Ok(tally)
            })
            .collect::<Result<Vec<Tally>>>()?;

        let mut total = Tally::new(self.settings.n_bins, self.settings.t_max)?;
        for tally in &tallies {
            total.merge(tally)?;
        }
        ShowerResult::from_tally(total, self.weight, t0.elapsed().as_secs_f64())
    }

    /// Raw tally of the single repetition `r`.
    pub fn repetition(&self, r: u64) -> Result<Tally> {
        let mut rng = repetition_rng(self.settings.seed, r);
        let mut tally = Tally::new(self.settings.n_bins, self.settings.t_max)?;
        self.run_repetition(&mut rng, &mut tally)?;
        Ok(tally)
    }

    fn run_repetition(&self, rng: &mut StdRng, tally: &mut Tally) -> Result<()> {
        if self.settings.fixed_order {
            let (s1, s2) = self.fixed_order_terms(rng)?;
            tally.ngl1 += s1;
            tally.ngl1_sq += s1 * s1;
            tally.ngl2 += s2;
            tally.ngl2_sq += s2 * s2;
        }
        let t_end = self.evolve(rng, &mut tally.n_emissions)?;
        tally.res_ll.fill_survival(t_end, 1.0);
        tally.n_repetitions += 1;
        Ok(())
    }

    /// Evolve the chain until a vetoed emission; returns the time it happened
    /// (`t_max` if the repetition survived).
    fn evolve(&self, rng: &mut StdRng, n_emissions: &mut usize) -> Result<f64> {
        let t_max = self.settings.t_max;
        let mut chain = self.radiators.clone();
        let mut rates: Vec<f64> = chain.iter().map(Radiator::rate).collect();
        let mut t = 0.0;
        loop {
            let total: f64 = rates.iter().sum();
            if total <= 0.0 {
                return Ok(t_max);
            }
            t += waiting_time(total, rng)?;
            if t >= t_max {
                return Ok(t_max);
            }
            let k = pick(&rates, total, rng);
            let n = chain[k].sample(rng)?;
            *n_emissions += 1;
            if self.region.outside(&n) {
                return Ok(t);
            }
            match chain[k].split(n)? {
                Split::Two(first, second) => {
                    if chain.len() >= self.settings.max_dipoles {
                        return Err(Error::Computation(format!(
                            "dipole chain exceeded max_dipoles={} at t={}",
                            self.settings.max_dipoles, t
                        )));
                    }
                    rates[k] = first.rate();
                    chain[k] = first;
                    rates.push(second.rate());
                    chain.push(second);
                }
                Split::Collinear(child) => {
                    rates[k] = child.rate();
                    chain[k] = child;
                }
                Split::Absorbed => {}
            }
        }
    }

    /// One draw of the one-loop and two-loop non-global estimators.
    fn fixed_order_terms(&self, rng: &mut StdRng) -> Result<(f64, f64)> {
        let rates: Vec<f64> = self.radiators.iter().map(Radiator::rate).collect();
        let total: f64 = rates.iter().sum();
        if total <= 0.0 {
            return Ok((0.0, 0.0));
        }
        let parent = &self.radiators[pick(&rates, total, rng)];
        let n = parent.sample(rng)?;
        if self.region.outside(&n) {
            return Ok((-total, 0.0));
        }
        let correlated = match parent.split(n)? {
            Split::Two(an, nb) => {
                let m1 = an.sample(rng)?;
                let m2 = nb.sample(rng)?;
                let m3 = parent.sample(rng)?;
                self.vetoed_rate(&an, &m1) + self.vetoed_rate(&nb, &m2)
                    - self.vetoed_rate(parent, &m3)
            }
            Split::Collinear(_) | Split::Absorbed => 0.0,
        };
        Ok((0.0, -0.5 * total * correlated))
    }

    #[inline]
    fn vetoed_rate(&self, radiator: &Radiator, m: &FourVector) -> f64 {
        if self.region.outside(m) { radiator.rate() } else { 0.0 }
    }
}

fn waiting_time(rate: f64, rng: &mut StdRng) -> Result<f64> {
    let exp = Exp::new(rate)
        .map_err(|e| Error::Computation(format!("invalid emission rate {}: {}", rate, e)))?;
    Ok(exp.sample(rng))
}

/// Index `k` with probability `rates[k] / total`; never a zero-rate entry.
fn pick<G: Rng + ?Sized>(rates: &[f64], total: f64, rng: &mut G) -> usize {
    let u = rng.random::<f64>() * total;
    let mut acc = 0.0;
    let mut last_positive = 0;
    for (k, &r) in rates.iter().enumerate() {
        if r <= 0.0 {
            continue;
        }
        acc += r;
        last_positive = k;
        if u < acc {
            return k;
        }
    }
    last_positive
}
