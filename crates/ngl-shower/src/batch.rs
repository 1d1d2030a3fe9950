//! Batch driver: read records, reconstruct and select events, shower them in
//! parallel, and fold the results into a [`Resummation`].

use crate::event::{Event, EventRecord, Topology};
use crate::resummation::Resummation;
use crate::shower::{Shower, ShowerResult, ShowerSettings};
use ngl_core::{Error, OutsideRegion, Result};
use rayon::prelude::*;

/// Valid events buffered before a parallel shower pass.
pub const EVENT_BATCH: usize = 256;

/// Options of a batch run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchOptions {
    /// Shower settings; `seed` is the base of the per-event seeds.
    pub settings: ShowerSettings,
    /// Dipole reconstruction.
    pub topology: Topology,
    /// Stop reading after this many records.
    pub max_events: usize,
    /// Valid events showered per parallel pass.
    pub batch_size: usize,
}

/// Seed of the `index`-th valid event of a run seeded with `seed`.
#[inline]
pub fn event_seed(seed: u64, index: u64) -> u64 {
    seed ^ index.wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

/// Shower one prepared event with its per-event seed.
pub fn shower_event<R: OutsideRegion + ?Sized>(
    event: &Event,
    region: &R,
    settings: &ShowerSettings,
    index: u64,
) -> Result<ShowerResult> {
    let settings = ShowerSettings { seed: event_seed(settings.seed, index), ..*settings };
    Shower::new(event, region, settings)?.shower()
}

/// Run the full resummation over `records`.
///
/// Records are read sequentially (up to `max_events`). Events that are
/// incomplete for the topology or for `region_factory` are counted and
/// skipped, as are events rejected by `selector`. Every other error aborts.
///
/// At most `batch_size` prepared events are held at once; each full buffer is
/// showered in parallel and folded in reading order. Seeds follow the valid
/// event ordinal, so the result does not depend on `batch_size`.
pub fn run_batch<I, S, F, R>(
    records: I,
    options: &BatchOptions,
    selector: S,
    region_factory: F,
) -> Result<Resummation>
where
    I: IntoIterator<Item = Result<EventRecord>>,
    S: Fn(&Event) -> bool,
    F: Fn(&Event) -> Result<R>,
    R: OutsideRegion,
{
    let settings = options.settings;
    settings.validate()?;
    if options.batch_size == 0 {
        return Err(Error::Validation("batch_size must be > 0".into()));
    }
    let mut agg = Resummation::new(settings.n_bins, settings.t_max, settings.nsh)?;

    let mut jobs: Vec<(Event, R)> = Vec::with_capacity(options.batch_size);
    let mut showered = 0usize;
    for record in records {
        if agg.n_events() >= options.max_events {
            break;
        }
        let record = record?;
        agg.observe_weight(record.weight);
        match prepare(&record, &options.topology, &selector, &region_factory)? {
            Some(job) => {
                agg.record_event(true);
                jobs.push(job);
            }
            None => agg.record_event(false),
        }
        if jobs.len() >= options.batch_size {
            showered += shower_pending(&mut jobs, showered, &settings, &mut agg)?;
            tracing::debug!(n_events = agg.n_events(), showered, "batch showered");
        }
    }
    showered += shower_pending(&mut jobs, showered, &settings, &mut agg)?;
    tracing::info!(n_events = agg.n_events(), n_valid_events = showered, "events showered");
    Ok(agg)
}

/// Shower the buffered events in parallel, fold them in order and empty the
/// buffer. `offset` is the valid ordinal of the first buffered event.
fn shower_pending<R: OutsideRegion>(
    jobs: &mut Vec<(Event, R)>,
    offset: usize,
    settings: &ShowerSettings,
    agg: &mut Resummation,
) -> Result<usize> {
    let results = jobs
        .par_iter()
        .enumerate()
        .map(|(i, (event, region))| shower_event(event, region, settings, (offset + i) as u64))
        .collect::<Result<Vec<_>>>()?;
    for result in &results {
        agg.add(result)?;
    }
    let n = jobs.len();
    jobs.clear();
    Ok(n)
}

fn prepare<S, F, R>(
    record: &EventRecord,
    topology: &Topology,
    selector: &S,
    region_factory: &F,
) -> Result<Option<(Event, R)>>
where
    S: Fn(&Event) -> bool,
    F: Fn(&Event) -> Result<R>,
{
    let event = match Event::from_record(record, topology) {
        Ok(event) => event,
        Err(e) if e.is_incomplete_event() => {
            tracing::debug!(reason = %e, "skipping event");
            return Ok(None);
        }
        Err(e) => return Err(e),
    };
    if !selector(&event) {
        tracing::debug!("event rejected by selection");
        return Ok(None);
    }
    match region_factory(&event) {
        Ok(region) => Ok(Some((event, region))),
        Err(e) if e.is_incomplete_event() => {
            tracing::debug!(reason = %e, "skipping event");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}
