//! Window boundary predicates

use crate::Result;
use crate::error::ValidationError;
use std::fmt;

/// Decides when the block being accumulated is complete
pub trait BoundaryPredicate<E> {
    /// Called after `element` was appended; `len` is the block length including it
    fn is_boundary(&mut self, element: &E, len: usize) -> bool;

    /// Called after every completed block
    fn reset(&mut self) {}
}

/// Block boundary of a discretized flow
pub enum Boundary<E> {
    /// Fixed block length; zero is rejected when the window is built
    Count(usize),
    /// Closure over `(element, block length so far)`
    Predicate(Box<dyn FnMut(&E, usize) -> bool>),
    /// Stateful predicate object
    Custom(Box<dyn BoundaryPredicate<E>>),
}

impl<E> Boundary<E> {
    /// Fixed-length blocks; `length` must be greater than zero
    pub fn count(length: usize) -> Result<Self> {
        if length == 0 {
            return Err(ValidationError::non_positive("window length", length).into());
        }
        Ok(Self::Count(length))
    }

    pub fn when<F>(predicate: F) -> Self
    where
        F: FnMut(&E, usize) -> bool + 'static,
    {
        Self::Predicate(Box::new(predicate))
    }

    pub fn custom<P>(predicate: P) -> Self
    where
        P: BoundaryPredicate<E> + 'static,
    {
        Self::Custom(Box::new(predicate))
    }

    pub(crate) fn validate(&self) -> Result<()> {
        match self {
            Self::Count(0) => Err(ValidationError::non_positive("window length", 0).into()),
            _ => Ok(()),
        }
    }

    pub(crate) fn fires(&mut self, element: &E, len: usize) -> bool {
        match self {
            Self::Count(length) => len >= *length,
            Self::Predicate(predicate) => predicate(element, len),
            Self::Custom(predicate) => predicate.is_boundary(element, len),
        }
    }

    pub(crate) fn reset(&mut self) {
        if let Self::Custom(predicate) = self {
            predicate.reset();
        }
    }
}

impl<E> fmt::Debug for Boundary<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Count(length) => f.debug_tuple("Count").field(length).finish(),
            Self::Predicate(_) => f.write_str("Predicate"),
            Self::Custom(_) => f.write_str("Custom"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_fires_at_length() {
        let mut boundary: Boundary<i32> = Boundary::count(2).unwrap();
        assert!(!boundary.fires(&1, 1));
        assert!(boundary.fires(&2, 2));
    }

    #[test]
    fn test_zero_count_rejected() {
        assert!(Boundary::<i32>::count(0).is_err());
        assert!(Boundary::<i32>::Count(0).validate().is_err());
        assert!(Boundary::<i32>::Count(3).validate().is_ok());
    }

    #[test]
    fn test_custom_predicate_is_reset() {
        struct Budget {
            spent: i32,
        }

        impl BoundaryPredicate<i32> for Budget {
            fn is_boundary(&mut self, element: &i32, _len: usize) -> bool {
                self.spent += element;
                self.spent >= 10
            }

            fn reset(&mut self) {
                self.spent = 0;
            }
        }

        let mut boundary = Boundary::custom(Budget { spent: 0 });
        assert!(!boundary.fires(&6, 1));
        assert!(boundary.fires(&6, 2));
        boundary.reset();
        assert!(!boundary.fires(&6, 1));
    }
}
