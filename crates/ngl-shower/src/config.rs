//! Run configuration shared by the drivers.

use crate::batch::{BatchOptions, EVENT_BATCH};
use crate::event::{ProductionDipoles, Role, Topology};
use crate::region::{RapidityGap, RegionSpec};
use crate::shower::ShowerSettings;
use ngl_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

fn default_y_max() -> f64 {
    0.8
}
fn default_nsh() -> usize {
    100
}
fn default_t_max() -> f64 {
    0.1
}
fn default_n_bins() -> usize {
    100
}
/// Collinear cutoff of the single-dipole driver.
pub const DIPOLE_CUTOFF: f64 = 6.0;

/// Collinear cutoff of the event-file driver.
pub const EVENTS_CUTOFF: f64 = 5.0;

fn default_max_events() -> usize {
    100_000
}
fn default_jet_radius() -> f64 {
    0.4
}
fn default_max_dipoles() -> usize {
    100_000
}
fn default_true() -> bool {
    true
}

/// Parameters of a resummation run, as read from JSON.
///
/// Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    /// Lower `|rap|` edge of the gap.
    #[serde(default)]
    pub y_min: f64,
    /// Upper `|rap|` edge of the gap.
    #[serde(default = "default_y_max")]
    pub y_max: f64,
    /// Repetitions per event.
    #[serde(default = "default_nsh")]
    pub nsh: usize,
    /// Range of the evolution time.
    #[serde(default = "default_t_max")]
    pub t_max: f64,
    /// Histogram bins.
    #[serde(default = "default_n_bins")]
    pub n_bins: usize,
    /// Collinear cutoff; [`DIPOLE_CUTOFF`] unless set here or through
    /// [`RunConfig::with_default_cutoff`].
    #[serde(default)]
    pub cutoff: Option<f64>,
    /// Base seed; drawn at run time when absent.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Records to read at most.
    #[serde(default = "default_max_events")]
    pub max_events: usize,
    /// Cone radius around the b-jets.
    #[serde(default = "default_jet_radius")]
    pub jet_radius: f64,
    /// Production dipoles to reconstruct.
    #[serde(default)]
    pub production: ProductionDipoles,
    /// Also reconstruct decay dipoles.
    #[serde(default)]
    pub decay_dipoles: bool,
    /// Estimate the fixed-order coefficients.
    #[serde(default = "default_true")]
    pub fixed_order: bool,
    /// Largest dipole chain per repetition.
    #[serde(default = "default_max_dipoles")]
    pub max_dipoles: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            y_min: 0.0,
            y_max: default_y_max(),
            nsh: default_nsh(),
            t_max: default_t_max(),
            n_bins: default_n_bins(),
            cutoff: None,
            seed: None,
            max_events: default_max_events(),
            jet_radius: default_jet_radius(),
            production: ProductionDipoles::default(),
            decay_dipoles: false,
            fixed_order: true,
            max_dipoles: default_max_dipoles(),
        }
    }
}

impl RunConfig {
    /// Load from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let config: RunConfig = serde_json::from_slice(&bytes)?;
        config.validate()?;
        Ok(config)
    }

    /// Fill in the cutoff when neither the file nor a flag set it.
    pub fn with_default_cutoff(mut self, cutoff: f64) -> Self {
        self.cutoff.get_or_insert(cutoff);
        self
    }

    /// Check ranges.
    pub fn validate(&self) -> Result<()> {
        RapidityGap::new(self.y_min, self.y_max)?;
        if !(self.jet_radius.is_finite() && self.jet_radius >= 0.0) {
            return Err(Error::Validation(format!(
                "jet_radius must be >= 0, got {}",
                self.jet_radius
            )));
        }
        self.shower_settings(0).validate()
    }

    /// Shower settings with the resolved base seed.
    pub fn shower_settings(&self, seed: u64) -> ShowerSettings {
        ShowerSettings {
            nsh: self.nsh,
            n_bins: self.n_bins,
            t_max: self.t_max,
            cutoff: self.cutoff.unwrap_or(DIPOLE_CUTOFF),
            seed,
            fixed_order: self.fixed_order,
            max_dipoles: self.max_dipoles,
        }
    }

    /// Batch options with the resolved base seed.
    pub fn batch_options(&self, seed: u64) -> BatchOptions {
        BatchOptions {
            settings: self.shower_settings(seed),
            topology: Topology { production: self.production, decay_dipoles: self.decay_dipoles },
            max_events: self.max_events,
            batch_size: EVENT_BATCH,
        }
    }

    /// The gap between the two b-jets.
    pub fn region(&self) -> RegionSpec {
        RegionSpec::GapWithoutJets {
            y_min: self.y_min,
            y_max: self.y_max,
            jets: Role::OutgoingBottom,
            expected_jets: 2,
            jet_radius: self.jet_radius,
        }
    }

    /// The configured seed, or a fresh one from the thread RNG.
    pub fn resolve_seed(&self) -> u64 {
        match self.seed {
            Some(seed) => seed,
            None => {
                let seed = rand::random::<u64>();
                tracing::info!(seed, "no seed configured, drew one");
                seed
            }
        }
    }
}
