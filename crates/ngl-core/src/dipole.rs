//! Color dipoles: the radiating objects of the soft-gluon shower.

use crate::vector::FourVector;
use crate::{Error, Result};

/// Below this value of `n_a · n_b` two light-like legs count as collinear.
const MIN_OPENING: f64 = 1e-12;

/// A color-connected pair of legs.
///
/// Legs keep the momenta they were built from; the shower only ever uses
/// their directions `p / E`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dipole {
    legs: [FourVector; 2],
}

impl Dipole {
    /// Build a dipole, checking that both legs are physical.
    ///
    /// Legs must be finite, have `E > 0` and `|p| <= E` (up to rounding), and
    /// must not be collinear light-like vectors (such a pair does not radiate).
    pub fn new(a: FourVector, b: FourVector) -> Result<Self> {
        for (i, leg) in [a, b].iter().enumerate() {
            if !leg.is_finite() {
                return Err(Error::Validation(format!("dipole leg {} is not finite: {:?}", i, leg)));
            }
            if leg.e <= 0.0 {
                return Err(Error::Validation(format!(
                    "dipole leg {} must have positive energy, got {}",
                    i, leg.e
                )));
            }
            if leg.p_abs() > leg.e * (1.0 + 1e-9) {
                return Err(Error::Validation(format!(
                    "dipole leg {} is space-like (|p|={} > E={})",
                    i,
                    leg.p_abs(),
                    leg.e
                )));
            }
        }
        let opening = a.direction().dot(&b.direction());
        if opening <= MIN_OPENING {
            return Err(Error::Validation("dipole legs are collinear and light-like".into()));
        }
        Ok(Self { legs: [a, b] })
    }

    /// Both legs as given.
    pub fn legs(&self) -> &[FourVector; 2] {
        &self.legs
    }

    /// Leg `a`.
    pub fn a(&self) -> &FourVector {
        &self.legs[0]
    }

    /// Leg `b`.
    pub fn b(&self) -> &FourVector {
        &self.legs[1]
    }

    /// Both legs scaled to unit energy, `n = p / E`.
    pub fn directions(&self) -> [FourVector; 2] {
        [self.legs[0].direction(), self.legs[1].direction()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_back_to_back_dipole() {
        let d = Dipole::new(FourVector::new(1.0, 0.0, 0.0, 1.0), FourVector::new(1.0, 0.0, 0.0, -1.0))
            .unwrap();
        assert_eq!(d.a().pz, 1.0);
        assert_eq!(d.b().pz, -1.0);
    }

    #[test]
    fn test_directions_have_unit_energy() {
        let d = Dipole::new(FourVector::new(4.0, 0.0, 0.0, 2.0), FourVector::new(2.0, 1.0, 0.0, 0.0))
            .unwrap();
        let [na, nb] = d.directions();
        assert_eq!(na, FourVector::new(1.0, 0.0, 0.0, 0.5));
        assert_eq!(nb, FourVector::new(1.0, 0.5, 0.0, 0.0));
    }

    #[test]
    fn test_rejects_non_positive_energy() {
        let good = FourVector::new(1.0, 0.0, 0.0, 1.0);
        assert!(Dipole::new(FourVector::new(0.0, 0.0, 0.0, 0.0), good).is_err());
        assert!(Dipole::new(good, FourVector::new(-1.0, 0.0, 0.0, -1.0)).is_err());
    }

    #[test]
    fn test_rejects_space_like_and_collinear() {
        let good = FourVector::new(1.0, 0.0, 0.0, 1.0);
        assert!(Dipole::new(FourVector::new(1.0, 0.0, 0.0, -2.0), good).is_err());
        assert!(Dipole::new(good, FourVector::new(3.0, 0.0, 0.0, 3.0)).is_err());
        assert!(Dipole::new(FourVector::new(f64::NAN, 0.0, 0.0, 0.0), good).is_err());
    }

    #[test]
    fn test_static_leg_is_allowed() {
        let at_rest = FourVector::new(173.0, 0.0, 0.0, 0.0);
        assert!(Dipole::new(at_rest, FourVector::new(1.0, 1.0, 0.0, 0.0)).is_ok());
    }
}
