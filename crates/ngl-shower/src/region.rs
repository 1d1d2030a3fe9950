//! Veto regions for soft emissions.
//!
//! All regions answer one question through [`OutsideRegion`]: does a soft
//! gluon with this direction land where the observable vetoes radiation?

use crate::event::{Event, Role};
use ngl_core::{Error, FourVector, OutsideRegion, Result};
use serde::{Deserialize, Serialize};

/// Central rapidity slice `y_min <= |rap| < y_max`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RapidityGap {
    y_min: f64,
    y_max: f64,
}

impl RapidityGap {
    /// Create a gap; requires `0 <= y_min < y_max`.
    pub fn new(y_min: f64, y_max: f64) -> Result<Self> {
        if !(y_min >= 0.0 && y_max > y_min) {
            return Err(Error::Validation(format!(
                "rapidity gap needs 0 <= y_min < y_max, got [{}, {})",
                y_min, y_max
            )));
        }
        Ok(Self { y_min, y_max })
    }

    /// Symmetric gap `|rap| < y_max`.
    pub fn central(y_max: f64) -> Result<Self> {
        Self::new(0.0, y_max)
    }

    /// Lower `|rap|` edge.
    pub fn y_min(&self) -> f64 {
        self.y_min
    }

    /// Upper `|rap|` edge.
    pub fn y_max(&self) -> f64 {
        self.y_max
    }
}

impl OutsideRegion for RapidityGap {
    fn outside(&self, direction: &FourVector) -> bool {
        let y = direction.rap().abs();
        y >= self.y_min && y < self.y_max
    }
}

/// Rapidity gap with cones of radius `R` around jet axes cut out.
#[derive(Debug, Clone, PartialEq)]
pub struct GapWithoutJets {
    gap: RapidityGap,
    axes: Vec<FourVector>,
    radius2: f64,
}

impl GapWithoutJets {
    /// Gap minus cones around explicit axes.
    pub fn new(gap: RapidityGap, axes: Vec<FourVector>, jet_radius: f64) -> Result<Self> {
        if !(jet_radius.is_finite() && jet_radius >= 0.0) {
            return Err(Error::Validation(format!("jet_radius must be >= 0, got {}", jet_radius)));
        }
        let axes = axes.iter().map(FourVector::direction).collect();
        Ok(Self { gap, axes, radius2: jet_radius * jet_radius })
    }

    /// Gap minus cones around the `role` particles of `event`.
    ///
    /// Fails with [`Error::IncompleteEvent`] unless exactly `expected_jets`
    /// such particles exist.
    pub fn around(
        event: &Event,
        role: Role,
        expected_jets: usize,
        gap: RapidityGap,
        jet_radius: f64,
    ) -> Result<Self> {
        let axes = event.particles(role);
        if axes.len() != expected_jets {
            return Err(Error::IncompleteEvent(format!(
                "expected {} jets of {:?}, found {}",
                expected_jets,
                role,
                axes.len()
            )));
        }
        Self::new(gap, axes, jet_radius)
    }

    /// Jet axes (unit-energy directions).
    pub fn axes(&self) -> &[FourVector] {
        &self.axes
    }
}

impl OutsideRegion for GapWithoutJets {
    fn outside(&self, direction: &FourVector) -> bool {
        self.gap.outside(direction) && self.axes.iter().all(|axis| direction.r2(axis) > self.radius2)
    }
}

/// Any of the built-in regions.
#[derive(Debug, Clone, PartialEq)]
pub enum Region {
    /// See [`RapidityGap`].
    Gap(RapidityGap),
    /// See [`GapWithoutJets`].
    GapWithoutJets(GapWithoutJets),
}

impl OutsideRegion for Region {
    fn outside(&self, direction: &FourVector) -> bool {
        match self {
            Region::Gap(g) => g.outside(direction),
            Region::GapWithoutJets(g) => g.outside(direction),
        }
    }
}

/// Serializable description of a [`Region`], resolved per event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RegionSpec {
    /// `y_min <= |rap| < y_max`.
    RapidityGap {
        /// Lower edge.
        #[serde(default)]
        y_min: f64,
        /// Upper edge.
        y_max: f64,
    },
    /// Gap minus cones around the event's `jets` particles.
    GapWithoutJets {
        /// Lower edge.
        #[serde(default)]
        y_min: f64,
        /// Upper edge.
        y_max: f64,
        /// Particles used as jet axes.
        jets: Role,
        /// Required multiplicity of `jets`.
        expected_jets: usize,
        /// Cone radius in (rap, phi).
        jet_radius: f64,
    },
}

impl RegionSpec {
    /// Resolve the region for one event.
    pub fn build(&self, event: &Event) -> Result<Region> {
        match *self {
            RegionSpec::RapidityGap { y_min, y_max } => {
                Ok(Region::Gap(RapidityGap::new(y_min, y_max)?))
            }
            RegionSpec::GapWithoutJets { y_min, y_max, jets, expected_jets, jet_radius } => {
                let gap = RapidityGap::new(y_min, y_max)?;
                Ok(Region::GapWithoutJets(GapWithoutJets::around(
                    event,
                    jets,
                    expected_jets,
                    gap,
                    jet_radius,
                )?))
            }
        }
    }
}
