//! Invertible subject/zone code encoding

use gapstat_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// `code = subject + zone * base`.
///
/// Decoding is unambiguous as long as every subject category is below
/// `base` and zone codes are non-negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlayEncoding {
    base: i64,
}

impl OverlayEncoding {
    pub fn new(base: i64) -> Result<Self> {
        if base < 2 {
            return Err(Error::InvalidParameter {
                name: "base",
                value: base.to_string(),
                reason: "encoding base must be at least 2".into(),
            });
        }
        Ok(Self { base })
    }

    pub fn base(&self) -> i64 {
        self.base
    }

    /// Combined code for a `(subject, zone)` pair
    pub fn encode(&self, subject: i64, zone: i64) -> Result<i64> {
        if !(0..self.base).contains(&subject) {
            return Err(Error::CategoryOutOfDomain {
                value: subject,
                base: self.base,
            });
        }
        if zone < 0 {
            return Err(Error::InvalidZone { code: zone });
        }
        zone.checked_mul(self.base)
            .and_then(|z| z.checked_add(subject))
            .ok_or(Error::InvalidZone { code: zone })
    }

    /// `(subject, zone)` for a combined code
    pub fn decode(&self, code: i64) -> (i64, i64) {
        (code.rem_euclid(self.base), code.div_euclid(self.base))
    }
}

impl Default for OverlayEncoding {
    fn default() -> Self {
        Self { base: 10 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let enc = OverlayEncoding::default();
        for subject in 0..10 {
            for zone in [0, 1, 2, 9, 10, 11, 250, 4_000_000] {
                let code = enc.encode(subject, zone).unwrap();
                assert_eq!(enc.decode(code), (subject, zone));
            }
        }
    }

    #[test]
    fn test_documented_example() {
        let enc = OverlayEncoding::default();
        assert_eq!(enc.encode(3, 2).unwrap(), 23);
        assert_eq!(enc.decode(41), (1, 4));
    }

    #[test]
    fn test_subject_outside_base() {
        let enc = OverlayEncoding::new(4).unwrap();
        assert!(matches!(
            enc.encode(4, 1),
            Err(Error::CategoryOutOfDomain { value: 4, base: 4 })
        ));
        assert!(enc.encode(-1, 1).is_err());
    }

    #[test]
    fn test_small_base_rejected() {
        assert!(OverlayEncoding::new(1).is_err());
    }
}
