//! Lorentz four-vectors and the kinematic quantities derived from them.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::ops::{Add, Div, Mul, Neg, Sub};

/// Rapidity returned for vectors on (or beyond) the light cone along the beam.
///
/// `rap()` is clamped to `[-RAPIDITY_LIMIT, RAPIDITY_LIMIT]`; a massless
/// vector with `pz == E` yields `+RAPIDITY_LIMIT` instead of `+inf`.
pub const RAPIDITY_LIMIT: f64 = 1.0e3;

/// Four-vector `(E, px, py, pz)` with metric `(+, -, -, -)`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FourVector {
    /// Energy component.
    pub e: f64,
    /// x-momentum.
    pub px: f64,
    /// y-momentum.
    pub py: f64,
    /// z-momentum (beam axis).
    pub pz: f64,
}

impl FourVector {
    /// Create a four-vector from its components.
    pub const fn new(e: f64, px: f64, py: f64, pz: f64) -> Self {
        Self { e, px, py, pz }
    }

    /// Light-like vector with unit energy pointing along `dir`.
    ///
    /// `dir` must be non-zero; it is normalized here.
    pub fn massless(dir: [f64; 3]) -> Self {
        let norm = (dir[0] * dir[0] + dir[1] * dir[1] + dir[2] * dir[2]).sqrt();
        Self::new(1.0, dir[0] / norm, dir[1] / norm, dir[2] / norm)
    }

    /// Spatial components.
    #[inline]
    pub fn p3(&self) -> [f64; 3] {
        [self.px, self.py, self.pz]
    }

    /// `|p|`.
    #[inline]
    pub fn p_abs(&self) -> f64 {
        (self.px * self.px + self.py * self.py + self.pz * self.pz).sqrt()
    }

    /// Transverse momentum.
    #[inline]
    pub fn pt(&self) -> f64 {
        self.px.hypot(self.py)
    }

    /// Transverse energy `E * pT / |p|` (0 for a vector at rest).
    pub fn et(&self) -> f64 {
        let p = self.p_abs();
        if p <= 0.0 { 0.0 } else { self.e * self.pt() / p }
    }

    /// Rapidity `½ ln((E+pz)/(E-pz))`, clamped to `±RAPIDITY_LIMIT`.
    pub fn rap(&self) -> f64 {
        let plus = self.e + self.pz;
        let minus = self.e - self.pz;
        if minus <= 0.0 && plus <= 0.0 {
            return 0.0;
        }
        if minus <= 0.0 {
            return RAPIDITY_LIMIT;
        }
        if plus <= 0.0 {
            return -RAPIDITY_LIMIT;
        }
        (0.5 * (plus / minus).ln()).clamp(-RAPIDITY_LIMIT, RAPIDITY_LIMIT)
    }

    /// Azimuthal angle in `(-π, π]`; 0 along the beam.
    pub fn phi(&self) -> f64 {
        if self.px == 0.0 && self.py == 0.0 { 0.0 } else { self.py.atan2(self.px) }
    }

    /// Minkowski product.
    #[inline]
    pub fn dot(&self, other: &FourVector) -> f64 {
        self.e * other.e - self.px * other.px - self.py * other.py - self.pz * other.pz
    }

    /// Invariant mass squared.
    #[inline]
    pub fn mass2(&self) -> f64 {
        self.dot(self)
    }

    /// Invariant mass; negative `mass2` from rounding maps to 0.
    pub fn mass(&self) -> f64 {
        self.mass2().max(0.0).sqrt()
    }

    /// Angular separation `ΔR² = Δy² + Δφ²` with Δφ wrapped into `(-π, π]`.
    pub fn r2(&self, other: &FourVector) -> f64 {
        let dy = self.rap() - other.rap();
        let dphi = wrap_phi(self.phi() - other.phi());
        dy * dy + dphi * dphi
    }

    /// Velocity `p / E` (zero for `E == 0`).
    pub fn velocity(&self) -> [f64; 3] {
        if self.e == 0.0 {
            return [0.0; 3];
        }
        [self.px / self.e, self.py / self.e, self.pz / self.e]
    }

    /// The vector scaled to unit energy (the "jet axis" of a momentum).
    pub fn direction(&self) -> FourVector {
        *self / self.e
    }

    /// Boost by velocity `beta` (same convention as ROOT's `TLorentzVector::Boost`).
    ///
    /// Boosting by `-v` where `v = P.velocity()` moves into the rest frame of `P`.
    pub fn boost(&self, beta: [f64; 3]) -> FourVector {
        let b2 = beta[0] * beta[0] + beta[1] * beta[1] + beta[2] * beta[2];
        if b2 <= 0.0 {
            return *self;
        }
        let gamma = 1.0 / (1.0 - b2).sqrt();
        let bp = beta[0] * self.px + beta[1] * self.py + beta[2] * self.pz;
        let gamma2 = (gamma - 1.0) / b2;
        let k = gamma2 * bp + gamma * self.e;
        FourVector::new(
            gamma * (self.e + bp),
            self.px + k * beta[0],
            self.py + k * beta[1],
            self.pz + k * beta[2],
        )
    }

    /// `true` when every component is finite.
    pub fn is_finite(&self) -> bool {
        self.e.is_finite() && self.px.is_finite() && self.py.is_finite() && self.pz.is_finite()
    }
}

/// Wrap an angle difference into `(-π, π]`.
pub fn wrap_phi(dphi: f64) -> f64 {
    let mut d = dphi % (2.0 * PI);
    if d > PI {
        d -= 2.0 * PI;
    } else if d <= -PI {
        d += 2.0 * PI;
    }
    d
}

impl Add for FourVector {
    type Output = FourVector;

    fn add(self, rhs: FourVector) -> FourVector {
        FourVector::new(self.e + rhs.e, self.px + rhs.px, self.py + rhs.py, self.pz + rhs.pz)
    }
}

impl Sub for FourVector {
    type Output = FourVector;

    fn sub(self, rhs: FourVector) -> FourVector {
        FourVector::new(self.e - rhs.e, self.px - rhs.px, self.py - rhs.py, self.pz - rhs.pz)
    }
}

impl Neg for FourVector {
    type Output = FourVector;

    fn neg(self) -> FourVector {
        FourVector::new(-self.e, -self.px, -self.py, -self.pz)
    }
}

impl Mul<f64> for FourVector {
    type Output = FourVector;

    fn mul(self, rhs: f64) -> FourVector {
        FourVector::new(self.e * rhs, self.px * rhs, self.py * rhs, self.pz * rhs)
    }
}

impl Div<f64> for FourVector {
    type Output = FourVector;

    fn div(self, rhs: f64) -> FourVector {
        FourVector::new(self.e / rhs, self.px / rhs, self.py / rhs, self.pz / rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_rapidity_forward_massless_is_clamped() {
        let v = FourVector::new(1.0, 0.0, 0.0, 1.0);
        assert_eq!(v.rap(), RAPIDITY_LIMIT);
        let w = FourVector::new(1.0, 0.0, 0.0, -1.0);
        assert_eq!(w.rap(), -RAPIDITY_LIMIT);
    }

    #[test]
    fn test_rapidity_value() {
        let v = FourVector::new(2.0, 0.5, 0.0, 1.0);
        assert_relative_eq!(v.rap(), 0.5 * (3.0f64).ln(), epsilon = 1e-14);
        assert_eq!(FourVector::new(1.0, 1.0, 0.0, 0.0).rap(), 0.0);
    }

    #[test]
    fn test_rapidity_never_nan() {
        let unphysical = FourVector::new(0.0, 0.0, 0.0, 0.0);
        assert!(!unphysical.rap().is_nan());
        let tachyon = FourVector::new(1.0, 0.0, 0.0, 2.0);
        assert_eq!(tachyon.rap(), RAPIDITY_LIMIT);
    }

    #[test]
    fn test_transverse_quantities() {
        let v = FourVector::new(5.0, 3.0, 0.0, 4.0);
        assert_relative_eq!(v.pt(), 3.0, epsilon = 1e-14);
        assert_relative_eq!(v.p_abs(), 5.0, epsilon = 1e-14);
        assert_relative_eq!(v.et(), 3.0, epsilon = 1e-14);
        assert_eq!(FourVector::new(1.0, 0.0, 0.0, 0.0).et(), 0.0);
    }

    #[test]
    fn test_minkowski_product() {
        let a = FourVector::new(1.0, 0.0, 0.0, 1.0);
        let b = FourVector::new(1.0, 0.0, 0.0, -1.0);
        assert_relative_eq!(a.dot(&b), 2.0);
        assert_relative_eq!((a + b).mass(), 2.0);
        assert_relative_eq!(a.mass2(), 0.0);
    }

    #[test]
    fn test_r2_wraps_azimuth() {
        let a = FourVector::new(1.0, (PI - 0.1).cos(), (PI - 0.1).sin(), 0.0);
        let b = FourVector::new(1.0, (-PI + 0.1).cos(), (-PI + 0.1).sin(), 0.0);
        assert_relative_eq!(a.r2(&b), 0.04, epsilon = 1e-12);
    }

    #[test]
    fn test_wrap_phi_range() {
        assert_relative_eq!(wrap_phi(2.0 * PI + 0.5), 0.5, epsilon = 1e-12);
        assert_relative_eq!(wrap_phi(PI + 0.5), -PI + 0.5, epsilon = 1e-12);
        assert_relative_eq!(wrap_phi(-PI), PI, epsilon = 1e-12);
        assert_relative_eq!(wrap_phi(0.5), 0.5);
    }

    #[test]
    fn test_boost_roundtrip_preserves_mass() {
        let v = FourVector::new(3.0, 1.0, -0.5, 2.0);
        let beta = [0.3, -0.2, 0.6];
        let boosted = v.boost(beta);
        assert_relative_eq!(boosted.mass2(), v.mass2(), epsilon = 1e-12);
        let back = boosted.boost([-beta[0], -beta[1], -beta[2]]);
        assert_relative_eq!(back.e, v.e, epsilon = 1e-12);
        assert_relative_eq!(back.px, v.px, epsilon = 1e-12);
        assert_relative_eq!(back.py, v.py, epsilon = 1e-12);
        assert_relative_eq!(back.pz, v.pz, epsilon = 1e-12);
    }

    #[test]
    fn test_boost_into_rest_frame() {
        let p = FourVector::new(5.0, 0.0, 3.0, 0.0);
        let v = p.velocity();
        let rest = p.boost([-v[0], -v[1], -v[2]]);
        assert_relative_eq!(rest.p_abs(), 0.0, epsilon = 1e-12);
        assert_relative_eq!(rest.e, 4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_direction_and_arithmetic() {
        let v = FourVector::new(2.0, 2.0, 0.0, 0.0);
        assert_eq!(v.direction(), FourVector::new(1.0, 1.0, 0.0, 0.0));
        assert_eq!(v - v, FourVector::default());
        assert_eq!(v * 0.5, v / 2.0);
        assert_eq!(-v + v, FourVector::default());
    }

    #[test]
    fn test_massless_constructor() {
        let v = FourVector::massless([0.0, 3.0, 4.0]);
        assert_relative_eq!(v.e, 1.0);
        assert_relative_eq!(v.mass2(), 0.0, epsilon = 1e-14);
        assert_relative_eq!(v.py, 0.6);
    }
}
