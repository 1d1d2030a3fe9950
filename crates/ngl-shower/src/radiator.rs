//! Soft-gluon radiation pattern of a single dipole.
//!
//! For legs with unit-energy directions `n_a`, `n_b` and a light-like
//! emission direction `n`, the eikonal radiator is
//!
//! ```text
//! W(n) = n_a·n_b / ((n_a·n)(n_b·n)) - ½ n_a² / (n_a·n)² - ½ n_b² / (n_b·n)²
//! ```
//!
//! which is non-negative, and `W dΩ` is Lorentz invariant. Emission density
//! per unit evolution time is `W dΩ / (2π)`. Everything is evaluated in the
//! *dipole frame* (rest frame of `n_a + n_b`), where both legs are back to
//! back and the collinear cutoff is a plain bound `|η| <= cutoff`.
//! In that frame the density in `(η, φ)` is `f(η) dη dφ / (2π)` with
//! `f(η) = W(tanh η) / cosh²η`, which is exactly 2 for massless legs.

use ngl_core::{Dipole, Error, FourVector, Result};
use rand::Rng;
use std::f64::consts::PI;

/// Simpson intervals used for the rate of massive dipoles.
const RATE_INTERVALS: usize = 512;

/// Legs with a dipole-frame speed above this are treated as massless.
const MASSLESS_BETA: f64 = 1.0 - 1e-9;

/// Accept-reject attempts before sampling gives up.
const MAX_REJECTION_TRIES: usize = 1_000_000;

/// Children whose legs are closer than this (`n_a·n_b`) are merged into their parent.
pub const MIN_SPLIT_OPENING: f64 = 1e-10;

/// Unit-energy lab legs with `|n²|` below this are light-like.
const LIGHT_LIKE_MASS2: f64 = 1e-9;

/// A dipole prepared for emission: frame, total rate and sampling bound.
#[derive(Debug, Clone)]
pub struct Radiator {
    legs: [FourVector; 2],
    frame: [f64; 3],
    axis: [f64; 3],
    e1: [f64; 3],
    e2: [f64; 3],
    beta_a: f64,
    beta_b: f64,
    massless: bool,
    cutoff: f64,
    rate: f64,
    bound: f64,
}

/// Outcome of splitting a dipole at an emitted gluon.
#[derive(Debug, Clone)]
pub enum Split {
    /// `(a, b)` became `(a, n)` and `(n, b)`.
    Two(Radiator, Radiator),
    /// The gluon was collinear to one leg; only the other child survives.
    Collinear(Radiator),
    /// The gluon was collinear to both legs; the dipole is unchanged.
    Absorbed,
}

impl Radiator {
    /// Prepare `dipole` for emission with collinear cutoff `cutoff`.
    pub fn new(dipole: &Dipole, cutoff: f64) -> Result<Self> {
        if !cutoff.is_finite() || cutoff <= 0.0 {
            return Err(Error::Validation(format!("cutoff must be finite and > 0, got {}", cutoff)));
        }
        let [na, nb] = dipole.directions();
        let frame = (na + nb).velocity();
        let to_frame = [-frame[0], -frame[1], -frame[2]];
        let a_cm = na.boost(to_frame);
        let b_cm = nb.boost(to_frame);

        let pa = a_cm.p_abs();
        let pb = b_cm.p_abs();
        let mut beta_a = (pa / a_cm.e).min(1.0);
        let mut beta_b = (pb / b_cm.e).min(1.0);
        let axis = if pa > 1e-14 {
            scale(a_cm.p3(), 1.0 / pa)
        } else if pb > 1e-14 {
            scale(b_cm.p3(), -1.0 / pb)
        } else {
            [0.0, 0.0, 1.0]
        };
        let (e1, e2) = orthonormal_basis(axis);

        // Narrow dipoles lose the frame speeds to rounding; trust the lab legs.
        let light_like =
            na.mass2().abs() < LIGHT_LIKE_MASS2 && nb.mass2().abs() < LIGHT_LIKE_MASS2;
        let massless = light_like || (beta_a > MASSLESS_BETA && beta_b > MASSLESS_BETA);
        if massless {
            beta_a = 1.0;
            beta_b = 1.0;
        }

        let mut radiator = Self {
            legs: [na, nb],
            frame,
            axis,
            e1,
            e2,
            beta_a,
            beta_b,
            massless,
            cutoff,
            rate: 0.0,
            bound: 2.0 * (1.0 + beta_a * beta_b),
        };
        radiator.rate = if massless { 4.0 * cutoff } else { radiator.integrate_density() };
        Ok(radiator)
    }

    /// Prepare the dipole spanned by two legs.
    pub fn between(a: FourVector, b: FourVector, cutoff: f64) -> Result<Self> {
        Self::new(&Dipole::new(a, b)?, cutoff)
    }

    /// Unit-energy leg directions in the lab frame.
    pub fn legs(&self) -> &[FourVector; 2] {
        &self.legs
    }

    /// Total emission rate per unit evolution time inside the cutoff.
    #[inline]
    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Leg speeds in the dipole frame.
    #[cfg(test)]
    pub(crate) fn betas(&self) -> (f64, f64) {
        (self.beta_a, self.beta_b)
    }

    /// Whether both legs are light-like.
    pub fn is_massless(&self) -> bool {
        self.massless
    }

    /// Rapidity density `f(η)` in the dipole frame.
    pub fn density(&self, eta: f64) -> f64 {
        if self.massless {
            return 2.0;
        }
        let c = eta.tanh();
        let s2 = 1.0 - c * c;
        let (ba, bb) = (self.beta_a, self.beta_b);
        let da = 1.0 - ba * c;
        let db = 1.0 + bb * c;
        let w = (1.0 + ba * bb) / (da * db)
            - 0.5 * (1.0 - ba * ba) / (da * da)
            - 0.5 * (1.0 - bb * bb) / (db * db);
        (w * s2).max(0.0)
    }

    /// Radiator `W(n)` for a light-like lab direction `n`.
    #[cfg(test)]
    pub(crate) fn pattern(&self, n: &FourVector) -> f64 {
        let [na, nb] = &self.legs;
        let an = na.dot(n);
        let bn = nb.dot(n);
        na.dot(nb) / (an * bn) - 0.5 * na.mass2() / (an * an) - 0.5 * nb.mass2() / (bn * bn)
    }

    /// Rapidity of a lab direction measured in the dipole frame.
    #[cfg(test)]
    pub(crate) fn frame_rapidity(&self, n: &FourVector) -> f64 {
        let cm = n.boost([-self.frame[0], -self.frame[1], -self.frame[2]]);
        let c = dot3(cm.p3(), self.axis) / cm.p_abs();
        c.clamp(-1.0, 1.0).atanh()
    }

    fn integrate_density(&self) -> f64 {
        let n = RATE_INTERVALS;
        let h = 2.0 * self.cutoff / n as f64;
        let x0 = -self.cutoff;
        let mut sum = self.density(x0) + self.density(self.cutoff);
        for i in 1..n {
            let weight = if i % 2 == 1 { 4.0 } else { 2.0 };
            sum += weight * self.density(x0 + i as f64 * h);
        }
        sum * h / 3.0
    }

    /// Draw an emission direction (light-like, unit energy, lab frame).
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<FourVector> {
        let eta = if self.massless {
            self.cutoff * (2.0 * rng.random::<f64>() - 1.0)
        } else {
            self.sample_rapidity(rng)?
        };
        let phi = 2.0 * PI * rng.random::<f64>();

        let c = eta.tanh();
        let s = 1.0 / eta.cosh();
        let (sin_phi, cos_phi) = phi.sin_cos();
        let mut dir = [0.0; 3];
        for k in 0..3 {
            dir[k] = s * cos_phi * self.e1[k] + s * sin_phi * self.e2[k] + c * self.axis[k];
        }
        let k_cm = FourVector::new(1.0, dir[0], dir[1], dir[2]);
        Ok(FourVector::massless(k_cm.boost(self.frame).p3()))
    }

    fn sample_rapidity<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<f64> {
        for _ in 0..MAX_REJECTION_TRIES {
            let eta = self.cutoff * (2.0 * rng.random::<f64>() - 1.0);
            if rng.random::<f64>() * self.bound < self.density(eta) {
                return Ok(eta);
            }
        }
        Err(Error::Computation(format!(
            "rapidity sampling did not converge (rate={}, betas=({}, {}))",
            self.rate, self.beta_a, self.beta_b
        )))
    }

    /// Split at the emitted gluon `n` into the two daughter dipoles.
    ///
    /// A daughter whose opening is at most [`MIN_SPLIT_OPENING`] is dropped.
    pub fn split(&self, n: FourVector) -> Result<Split> {
        let [a, b] = self.legs;
        let first = (a.dot(&n) > MIN_SPLIT_OPENING).then_some(a);
        let second = (n.dot(&b) > MIN_SPLIT_OPENING).then_some(b);
        match (first, second) {
            (Some(a), Some(b)) => Ok(Split::Two(
                Self::between(a, n, self.cutoff)?,
                Self::between(n, b, self.cutoff)?,
            )),
            (None, Some(b)) => Ok(Split::Collinear(Self::between(n, b, self.cutoff)?)),
            (Some(a), None) => Ok(Split::Collinear(Self::between(a, n, self.cutoff)?)),
            (None, None) => Ok(Split::Absorbed),
        }
    }
}

#[inline]
fn dot3(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

#[inline]
fn scale(a: [f64; 3], s: f64) -> [f64; 3] {
    [a[0] * s, a[1] * s, a[2] * s]
}

fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [a[1] * b[2] - a[2] * b[1], a[2] * b[0] - a[0] * b[2], a[0] * b[1] - a[1] * b[0]]
}

/// Two unit vectors completing `axis` to a right-handed basis.
fn orthonormal_basis(axis: [f64; 3]) -> ([f64; 3], [f64; 3]) {
    let helper = if axis[0].abs() < 0.9 { [1.0, 0.0, 0.0] } else { [0.0, 1.0, 0.0] };
    let proj = dot3(helper, axis);
    let v = [helper[0] - proj * axis[0], helper[1] - proj * axis[1], helper[2] - proj * axis[2]];
    let e1 = scale(v, 1.0 / dot3(v, v).sqrt());
    (e1, cross(axis, e1))
}
