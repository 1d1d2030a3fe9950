//! Events: the dipole configuration a shower starts from.
//!
//! An [`Event`] is either fed an explicit list of dipoles or reconstructed
//! from a particle-level [`EventRecord`] using its color tags. Records are a
//! plain serde structure; the JSON-lines reader here is the only I/O.

use ngl_core::{Dipole, Error, FourVector, Result};
use serde::{Deserialize, Serialize};
use std::io::BufRead;
use std::str::FromStr;

/// PDG id of the top quark.
const TOP_ID: i32 = 6;

fn default_weight() -> f64 {
    1.0
}

/// One particle line of an event record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticleRecord {
    /// PDG particle id.
    pub id: i32,
    /// -1 incoming, 1 outgoing, 2 intermediate.
    pub status: i32,
    /// Energy.
    pub e: f64,
    /// x-momentum.
    pub px: f64,
    /// y-momentum.
    pub py: f64,
    /// z-momentum.
    pub pz: f64,
    /// `[color, anticolor]` tags, 0 for none.
    #[serde(default)]
    pub color: [u32; 2],
    /// 1-based indices of the mothers, 0 for none.
    #[serde(default)]
    pub mothers: [usize; 2],
}

/// A parsed event: weight plus particle lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Event weight.
    #[serde(default = "default_weight")]
    pub weight: f64,
    /// Particle lines in record order.
    pub particles: Vec<ParticleRecord>,
}

/// Read one [`EventRecord`] per line of JSON, skipping blank lines.
///
/// The iterator is lazy and single-pass.
pub fn records_from_jsonl<R: BufRead>(reader: R) -> impl Iterator<Item = Result<EventRecord>> {
    reader.lines().filter_map(|line| match line {
        Err(e) => Some(Err(Error::from(e))),
        Ok(l) if l.trim().is_empty() => None,
        Ok(l) => Some(serde_json::from_str(&l).map_err(Error::from)),
    })
}

/// Particle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Initial-state parton.
    Incoming,
    /// Final-state particle.
    Outgoing,
    /// Intermediate resonance.
    Intermediate,
    /// Anything else the record carries.
    Other(i32),
}

impl From<i32> for Status {
    fn from(code: i32) -> Self {
        match code {
            -1 => Status::Incoming,
            1 => Status::Outgoing,
            2 => Status::Intermediate,
            other => Status::Other(other),
        }
    }
}

/// Particle collections exposed to analyses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Incoming quarks and gluons.
    IncomingParton,
    /// Top quarks as intermediate resonances.
    IntermediateTop,
    /// Final-state top quarks.
    OutgoingTop,
    /// Final-state bottom quarks.
    OutgoingBottom,
    /// Final-state electrons and positrons.
    OutgoingElectron,
    /// Final-state muons.
    OutgoingMuon,
    /// Final-state electron neutrinos.
    OutgoingENeutrino,
    /// Final-state muon neutrinos.
    OutgoingMNeutrino,
    /// Final-state gluons.
    OutgoingGluon,
}

impl Role {
    /// Whether `particle` belongs to this collection.
    pub fn matches(self, particle: &Particle) -> bool {
        let id = particle.id.abs();
        match self {
            Role::IncomingParton => particle.status == Status::Incoming && particle.is_colored(),
            Role::IntermediateTop => particle.status == Status::Intermediate && id == TOP_ID,
            Role::OutgoingTop => particle.status == Status::Outgoing && id == TOP_ID,
            Role::OutgoingBottom => particle.status == Status::Outgoing && id == 5,
            Role::OutgoingElectron => particle.status == Status::Outgoing && id == 11,
            Role::OutgoingMuon => particle.status == Status::Outgoing && id == 13,
            Role::OutgoingENeutrino => particle.status == Status::Outgoing && id == 12,
            Role::OutgoingMNeutrino => particle.status == Status::Outgoing && id == 14,
            Role::OutgoingGluon => particle.status == Status::Outgoing && id == 21,
        }
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        serde_json::from_value(serde_json::Value::String(s.to_string()))
            .map_err(|_| Error::Validation(format!("unknown particle role '{}'", s)))
    }
}

/// A particle of a reconstructed event.
#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    /// PDG id.
    pub id: i32,
    /// Status.
    pub status: Status,
    /// Momentum.
    pub momentum: FourVector,
    /// `[color, anticolor]` tags.
    pub color: [u32; 2],
    /// 1-based mother indices (0 = none).
    pub mothers: [usize; 2],
}

impl Particle {
    /// Carries at least one color tag.
    pub fn is_colored(&self) -> bool {
        self.color != [0, 0]
    }

    /// Color flow as if every particle were outgoing (incoming tags are swapped).
    fn outgoing_flow(&self) -> [u32; 2] {
        match self.status {
            Status::Incoming => [self.color[1], self.color[0]],
            _ => self.color,
        }
    }

    fn has_mother(&self, index: usize) -> bool {
        self.mothers.contains(&(index + 1))
    }

    fn has_known_mothers(&self) -> bool {
        self.mothers != [0, 0]
    }
}

impl From<&ParticleRecord> for Particle {
    fn from(r: &ParticleRecord) -> Self {
        Particle {
            id: r.id,
            status: Status::from(r.status),
            momentum: FourVector::new(r.e, r.px, r.py, r.pz),
            color: r.color,
            mothers: r.mothers,
        }
    }
}

/// Which particles span the production dipoles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductionDipoles {
    /// Incoming partons with the intermediate top pair (plus any extra
    /// production-level radiation).
    #[default]
    Intermediate,
    /// Incoming partons with every colored final-state particle.
    Outgoing,
    /// No production dipoles.
    None,
}

impl FromStr for ProductionDipoles {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "intermediate" => Ok(ProductionDipoles::Intermediate),
            "outgoing" => Ok(ProductionDipoles::Outgoing),
            "none" => Ok(ProductionDipoles::None),
            other => Err(Error::Validation(format!(
                "unknown production dipoles '{}' (expected intermediate|outgoing|none)",
                other
            ))),
        }
    }
}

/// Dipole topology to reconstruct from a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Topology {
    /// Production dipoles.
    #[serde(default)]
    pub production: ProductionDipoles,
    /// Add one top–bottom dipole per decaying top.
    #[serde(default)]
    pub decay_dipoles: bool,
}

/// Dipole configuration of one physics event.
#[derive(Debug, Clone)]
pub struct Event {
    dipoles: Vec<Dipole>,
    weight: f64,
    particles: Vec<Particle>,
}

impl Event {
    /// Event from an explicit dipole list, with weight 1.
    pub fn from_dipoles(dipoles: Vec<Dipole>) -> Result<Self> {
        if dipoles.is_empty() {
            return Err(Error::Validation("an event needs at least one dipole".into()));
        }
        Ok(Self { dipoles, weight: 1.0, particles: Vec::new() })
    }

    /// Event from leg pairs; every pair is validated as a [`Dipole`].
    pub fn from_legs(legs: &[(FourVector, FourVector)]) -> Result<Self> {
        let dipoles = legs.iter().map(|&(a, b)| Dipole::new(a, b)).collect::<Result<Vec<_>>>()?;
        Self::from_dipoles(dipoles)
    }

    /// Override the event weight.
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    /// Reconstruct the dipoles of `record` for `topology`.
    ///
    /// Returns [`Error::IncompleteEvent`] when the record lacks the particles
    /// the topology needs, and [`Error::Validation`] for unphysical legs.
    pub fn from_record(record: &EventRecord, topology: &Topology) -> Result<Self> {
        let particles: Vec<Particle> = record.particles.iter().map(Particle::from).collect();
        let tops: Vec<usize> = (0..particles.len())
            .filter(|&i| Role::IntermediateTop.matches(&particles[i]))
            .collect();

        let members: Vec<usize> = match topology.production {
            ProductionDipoles::Intermediate => {
                if tops.len() != 2 {
                    return Err(Error::IncompleteEvent(format!(
                        "expected 2 intermediate top quarks, found {}",
                        tops.len()
                    )));
                }
                (0..particles.len())
                    .filter(|&i| {
                        let p = &particles[i];
                        match p.status {
                            Status::Incoming => p.is_colored(),
                            Status::Intermediate => tops.contains(&i),
                            Status::Outgoing => {
                                p.is_colored() && !descends_from(&particles, i, &tops)
                            }
                            Status::Other(_) => false,
                        }
                    })
                    .collect()
            }
            ProductionDipoles::Outgoing => (0..particles.len())
                .filter(|&i| {
                    let p = &particles[i];
                    p.is_colored() && matches!(p.status, Status::Incoming | Status::Outgoing)
                })
                .collect(),
            ProductionDipoles::None => Vec::new(),
        };

        let mut dipoles = color_connected_dipoles(&particles, &members)?;

        if topology.decay_dipoles {
            if tops.is_empty() {
                return Err(Error::IncompleteEvent("decay dipoles need intermediate tops".into()));
            }
            for &t in &tops {
                let top = &particles[t];
                let daughters: Vec<&Particle> = particles
                    .iter()
                    .filter(|q| {
                        q.status == Status::Outgoing
                            && q.is_colored()
                            && shares_color_line(top, q)
                            && (!q.has_known_mothers() || q.has_mother(t))
                    })
                    .collect();
                if daughters.len() != 1 {
                    return Err(Error::IncompleteEvent(format!(
                        "top at line {} has {} colored daughters, expected 1",
                        t + 1,
                        daughters.len()
                    )));
                }
                dipoles.push(Dipole::new(top.momentum, daughters[0].momentum)?);
            }
        }

        if dipoles.is_empty() {
            return Err(Error::IncompleteEvent("no color-connected dipoles".into()));
        }
        Ok(Self { dipoles, weight: record.weight, particles })
    }

    /// Active dipoles.
    pub fn dipoles(&self) -> &[Dipole] {
        &self.dipoles
    }

    /// Event weight.
    pub fn weight(&self) -> f64 {
        self.weight
    }

    /// Momenta of one particle collection, in record order.
    pub fn particles(&self, role: Role) -> Vec<FourVector> {
        self.particles.iter().filter(|p| role.matches(p)).map(|p| p.momentum).collect()
    }

    /// Size of one particle collection.
    pub fn count(&self, role: Role) -> usize {
        self.particles.iter().filter(|p| role.matches(p)).count()
    }
}

/// Whether any ancestor of particle `i`, following `mothers` through any
/// number of generations, is one of `ancestors`.
fn descends_from(particles: &[Particle], i: usize, ancestors: &[usize]) -> bool {
    let mut seen = vec![false; particles.len()];
    let mut stack: Vec<usize> =
        particles[i].mothers.iter().filter_map(|&m| m.checked_sub(1)).collect();
    while let Some(m) = stack.pop() {
        if m >= particles.len() || seen[m] {
            continue;
        }
        if ancestors.contains(&m) {
            return true;
        }
        seen[m] = true;
        stack.extend(particles[m].mothers.iter().filter_map(|&k| k.checked_sub(1)));
    }
    false
}

/// Same color (or anticolor) line for a decaying particle and its daughter.
fn shares_color_line(parent: &Particle, daughter: &Particle) -> bool {
    let [c, a] = parent.color;
    (c != 0 && daughter.color[0] == c) || (a != 0 && daughter.color[1] == a)
}

/// One dipole per color line shared between two members.
fn color_connected_dipoles(particles: &[Particle], members: &[usize]) -> Result<Vec<Dipole>> {
    let mut dipoles = Vec::new();
    for (k, &i) in members.iter().enumerate() {
        for &j in &members[k + 1..] {
            let fi = particles[i].outgoing_flow();
            let fj = particles[j].outgoing_flow();
            let lines = usize::from(fi[0] != 0 && fi[0] == fj[1])
                + usize::from(fi[1] != 0 && fi[1] == fj[0]);
            for _ in 0..lines {
                dipoles.push(Dipole::new(particles[i].momentum, particles[j].momentum)?);
            }
        }
    }
    Ok(dipoles)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    fn line(id: i32, status: i32, p: [f64; 4], color: [u32; 2], mothers: [usize; 2]) -> ParticleRecord {
        ParticleRecord { id, status, e: p[0], px: p[1], py: p[2], pz: p[3], color, mothers }
    }

    /// gg → t t̄ → (b W⁺)(b̄ W⁻) → b e⁺ ν b̄ μ⁻ ν̄ with standard color tags.
    pub(crate) fn ttbar_record(weight: f64) -> EventRecord {
        EventRecord {
            weight,
            particles: vec![
                line(21, -1, [500.0, 0.0, 0.0, 500.0], [501, 502], [0, 0]),
                line(21, -1, [500.0, 0.0, 0.0, -500.0], [503, 501], [0, 0]),
                line(6, 2, [500.0, 100.0, 50.0, 200.0], [503, 0], [1, 2]),
                line(-6, 2, [500.0, -100.0, -50.0, -200.0], [0, 502], [1, 2]),
                line(24, 2, [300.0, 80.0, 0.0, 150.0], [0, 0], [3, 0]),
                line(5, 1, [200.0, 20.0, 50.0, 150.0], [503, 0], [3, 0]),
                line(-24, 2, [300.0, -80.0, 0.0, -150.0], [0, 0], [4, 0]),
                line(-5, 1, [200.0, -20.0, -50.0, -150.0], [0, 502], [4, 0]),
                line(-11, 1, [150.0, 40.0, 0.0, 100.0], [0, 0], [5, 0]),
                line(12, 1, [150.0, 40.0, 0.0, 50.0], [0, 0], [5, 0]),
                line(13, 1, [150.0, -40.0, 0.0, -100.0], [0, 0], [7, 0]),
                line(-14, 1, [150.0, -40.0, 0.0, -50.0], [0, 0], [7, 0]),
            ],
        }
    }

    #[test]
    fn test_from_dipoles_defaults() {
        let ev = Event::from_legs(&[(
            FourVector::new(1.0, 0.0, 0.0, 1.0),
            FourVector::new(1.0, 0.0, 0.0, -1.0),
        )])
        .unwrap();
        assert_eq!(ev.dipoles().len(), 1);
        assert_eq!(ev.weight(), 1.0);
        assert_eq!(ev.with_weight(0.25).weight(), 0.25);
    }

    #[test]
    fn test_empty_dipole_list_is_rejected() {
        assert!(matches!(Event::from_dipoles(vec![]), Err(Error::Validation(_))));
    }

    #[test]
    fn test_intermediate_production_dipoles() {
        let ev = Event::from_record(&ttbar_record(0.5), &Topology::default()).unwrap();
        // g1(501,502) g2(503,501) t(503) tbar(-502): lines g1-g2, g1-tbar, g2-t.
        assert_eq!(ev.dipoles().len(), 3);
        assert_eq!(ev.weight(), 0.5);
    }

    /// The dilepton record with the W⁻ decaying to d ū instead of μ⁻ ν̄.
    fn semileptonic_record() -> EventRecord {
        let mut rec = ttbar_record(1.0);
        rec.particles.truncate(10);
        rec.particles.push(line(1, 1, [150.0, -40.0, 0.0, -100.0], [601, 0], [7, 0]));
        rec.particles.push(line(-2, 1, [150.0, -40.0, 10.0, -50.0], [0, 601], [7, 0]));
        rec
    }

    #[test]
    fn test_w_decay_quarks_are_not_production_particles() {
        let rec = semileptonic_record();
        let ev = Event::from_record(&rec, &Topology::default()).unwrap();
        assert_eq!(ev.dipoles().len(), 3);
        assert!(ev.dipoles().iter().all(|d| d.a().pz != -100.0 && d.b().pz != -50.0));

        let both = Topology { production: ProductionDipoles::Intermediate, decay_dipoles: true };
        assert_eq!(Event::from_record(&rec, &both).unwrap().dipoles().len(), 5);

        // Every colored outgoing particle counts when the tops are not intermediate.
        let outgoing = Topology { production: ProductionDipoles::Outgoing, decay_dipoles: false };
        assert_eq!(Event::from_record(&rec, &outgoing).unwrap().dipoles().len(), 4);
    }

    #[test]
    fn test_ancestry_follows_generations() {
        let particles: Vec<Particle> =
            semileptonic_record().particles.iter().map(Particle::from).collect();
        // ū (line 12) ← W⁻ (line 7) ← t̄ (line 4).
        assert!(descends_from(&particles, 11, &[3]));
        assert!(!descends_from(&particles, 11, &[2]));
        assert!(descends_from(&particles, 5, &[2]));
        assert!(!descends_from(&particles, 0, &[2, 3]));
    }

    #[test]
    fn test_decay_dipoles() {
        let topo = Topology { production: ProductionDipoles::None, decay_dipoles: true };
        let ev = Event::from_record(&ttbar_record(1.0), &topo).unwrap();
        assert_eq!(ev.dipoles().len(), 2);
        assert_eq!(ev.dipoles()[0].a().e, 500.0);
        assert_eq!(ev.dipoles()[0].b().pz, 150.0);
        assert_eq!(ev.dipoles()[1].b().pz, -150.0);
    }

    #[test]
    fn test_outgoing_production_dipoles() {
        let topo = Topology { production: ProductionDipoles::Outgoing, decay_dipoles: false };
        let ev = Event::from_record(&ttbar_record(1.0), &topo).unwrap();
        // g1-g2 plus g1-bbar (502) and g2-b (503).
        assert_eq!(ev.dipoles().len(), 3);
    }

    #[test]
    fn test_missing_top_is_incomplete() {
        let mut rec = ttbar_record(1.0);
        rec.particles.remove(3);
        let err = Event::from_record(&rec, &Topology::default()).unwrap_err();
        assert!(err.is_incomplete_event());
    }

    #[test]
    fn test_roles() {
        let ev = Event::from_record(&ttbar_record(1.0), &Topology::default()).unwrap();
        assert_eq!(ev.count(Role::IntermediateTop), 2);
        assert_eq!(ev.count(Role::OutgoingBottom), 2);
        assert_eq!(ev.count(Role::OutgoingElectron), 1);
        assert_eq!(ev.count(Role::OutgoingMuon), 1);
        assert_eq!(ev.count(Role::OutgoingENeutrino), 1);
        assert_eq!(ev.count(Role::OutgoingMNeutrino), 1);
        assert_eq!(ev.count(Role::IncomingParton), 2);
        assert_eq!(ev.particles(Role::OutgoingBottom)[1].pz, -150.0);
    }

    #[test]
    fn test_role_and_production_parsing() {
        assert_eq!("outgoing_bottom".parse::<Role>().unwrap(), Role::OutgoingBottom);
        assert!("charm".parse::<Role>().is_err());
        assert_eq!("none".parse::<ProductionDipoles>().unwrap(), ProductionDipoles::None);
        assert!("decay".parse::<ProductionDipoles>().is_err());
    }

    #[test]
    fn test_jsonl_reader_skips_blank_lines() {
        let rec = ttbar_record(2.0);
        let text = format!("{}\n\n{}\n", serde_json::to_string(&rec).unwrap(), "{\"particles\": []}");
        let records: Vec<EventRecord> =
            records_from_jsonl(text.as_bytes()).collect::<Result<_>>().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0], rec);
        assert_eq!(records[1].weight, 1.0);
    }

    #[test]
    fn test_jsonl_reader_reports_bad_lines() {
        let mut it = records_from_jsonl("not json\n".as_bytes());
        assert!(matches!(it.next(), Some(Err(Error::Json(_)))));
    }
}
