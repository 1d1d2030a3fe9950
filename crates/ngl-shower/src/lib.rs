//! # ngl-shower
//!
//! Monte-Carlo resummation of non-global logarithms.
//!
//! - [`Event`]: dipoles from explicit legs or from a color-tagged record
//! - [`Radiator`]: the eikonal pattern of one dipole
//! - [`Shower`]: repetitions of the dipole cascade with a veto region
//! - [`Resummation`]: per-event results folded into `S(t)` and the
//!   fixed-order coefficients
//! - [`run_batch`]: the multi-event driver
//!
//! ```no_run
//! use ngl_core::FourVector;
//! use ngl_shower::{Event, RapidityGap, Shower, ShowerSettings};
//!
//! let event = Event::from_legs(&[(
//!     FourVector::new(1.0, 0.0, 0.0, 1.0),
//!     FourVector::new(1.0, 0.0, 0.0, -1.0),
//! )])?;
//! let gap = RapidityGap::central(0.8)?;
//! let result = Shower::new(&event, &gap, ShowerSettings::default())?.shower()?;
//! println!("S(t) = {:?}", result.res_ll.entries);
//! # Ok::<(), ngl_core::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod batch;
pub mod config;
pub mod event;
pub mod histogram;
pub mod radiator;
pub mod region;
pub mod resummation;
pub mod shower;

pub use batch::{BatchOptions, EVENT_BATCH, event_seed, run_batch, shower_event};
pub use config::{DIPOLE_CUTOFF, EVENTS_CUTOFF, RunConfig};
pub use event::{
    Event, EventRecord, Particle, ParticleRecord, ProductionDipoles, Role, Status, Topology,
    records_from_jsonl,
};
pub use histogram::Histogram;
pub use radiator::{Radiator, Split};
pub use region::{GapWithoutJets, RapidityGap, Region, RegionSpec};
pub use resummation::{BinEstimate, Resummation, ResummationReport};
pub use shower::{Shower, ShowerResult, ShowerSettings, Tally, repetition_rng};
