//! Core traits for ngl-resum
//!
//! The shower engine never knows which observable it resums. The observable
//! enters only through [`OutsideRegion`], so the engine (ngl-shower) stays
//! independent of any concrete analysis.

use crate::vector::FourVector;

/// Veto-region predicate.
///
/// `outside(v)` is `true` when the direction `v` lies in the region where the
/// observable forbids soft radiation (e.g. the rapidity gap between jets).
/// A shower repetition ends as soon as a gluon is emitted there.
pub trait OutsideRegion: Send + Sync {
    /// Classify an emission direction.
    fn outside(&self, direction: &FourVector) -> bool;
}

impl<F> OutsideRegion for F
where
    F: Fn(&FourVector) -> bool + Send + Sync,
{
    fn outside(&self, direction: &FourVector) -> bool {
        self(direction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Everywhere;

    impl OutsideRegion for Everywhere {
        fn outside(&self, _direction: &FourVector) -> bool {
            true
        }
    }

    #[test]
    fn test_struct_region() {
        let v = FourVector::new(1.0, 0.0, 1.0, 0.0);
        assert!(Everywhere.outside(&v));
    }

    #[test]
    fn test_closure_region() {
        let y_max = 0.8;
        let central = move |v: &FourVector| v.rap().abs() < y_max;
        assert!(central.outside(&FourVector::new(1.0, 1.0, 0.0, 0.0)));
        assert!(!central.outside(&FourVector::new(1.0, 0.1, 0.0, 0.99)));
    }

    #[test]
    fn test_dyn_region() {
        let region: &dyn OutsideRegion = &Everywhere;
        assert!(region.outside(&FourVector::new(1.0, 0.0, 0.0, 1.0)));
    }
}
