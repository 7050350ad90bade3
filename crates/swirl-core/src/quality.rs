//! Codec quality level.

use std::fmt;

use crate::error::QualityError;

/// Lossy compression quality in `[1, 100]`.
///
/// Lower values compress harder at lower fidelity, following conventional
/// JPEG quality semantics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Quality(u8);

impl Quality {
    /// Strongest compression.
    pub const MIN: Quality = Quality(1);
    /// Highest fidelity.
    pub const MAX: Quality = Quality(100);
    /// Quality used when none is configured.
    pub const DEFAULT: Quality = Quality(75);

    /// Validate a quality value.
    pub fn new(value: i64) -> Result<Self, QualityError> {
        if (1..=100).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(QualityError { value })
        }
    }

    /// The quality as a plain integer.
    pub fn get(self) -> u8 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<i32> for Quality {
    type Error = QualityError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Self::new(value as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_are_inclusive() {
        assert_eq!(Quality::new(1).unwrap(), Quality::MIN);
        assert_eq!(Quality::new(100).unwrap(), Quality::MAX);
        assert_eq!(Quality::new(0), Err(QualityError { value: 0 }));
        assert_eq!(Quality::new(101), Err(QualityError { value: 101 }));
        assert!(Quality::try_from(-5).is_err());
    }

    #[test]
    fn default_is_seventy_five() {
        assert_eq!(Quality::default().get(), 75);
    }
}
