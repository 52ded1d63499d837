use anyhow::Result;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::error::ShiftError;

/// How a source coordinate that falls off the end of an axis is pulled back in.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum BorderMode {
    /// Saturate at the edge element: -1 -> 0, n -> n-1.
    #[default]
    Nearest,
    /// Mirror about the edge element without repeating it: -1 -> 1, n -> n-2.
    Reflect,
}

impl BorderMode {
    pub fn parse(mode: &str) -> Result<Self> {
        mode.parse::<BorderMode>()
            .map_err(|_| ShiftError::unknown_border_mode(mode).into())
    }

    /// Source coordinate read by output coordinate `o` on an axis of `size`
    /// elements when that axis is shifted by `shift`.
    /// `size` must be positive; the result always lies in `0..size`.
    pub fn source_index(self, o: usize, shift: i64, size: usize) -> usize {
        debug_assert!(size > 0);
        let n = size as i128;
        let c = o as i128 - shift as i128;
        if (0..n).contains(&c) {
            return c as usize;
        }
        match self {
            BorderMode::Nearest => c.clamp(0, n - 1) as usize,
            BorderMode::Reflect => {
                if n == 1 {
                    return 0;
                }
                // the reflected sequence repeats with period 2(n-1)
                let period = 2 * (n - 1);
                let m = c.rem_euclid(period);
                (if m < n { m } else { period - m }) as usize
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_parse() {
        assert_eq!(BorderMode::parse("nearest").unwrap(), BorderMode::Nearest);
        assert_eq!(BorderMode::parse("reflect").unwrap(), BorderMode::Reflect);
        let err = BorderMode::parse("wrap").unwrap_err();
        assert!(err.downcast_ref::<ShiftError>().unwrap().is_configuration());
        for mode in BorderMode::iter() {
            assert_eq!(BorderMode::parse(&mode.to_string()).unwrap(), mode);
        }
    }

    #[test]
    fn test_nearest() {
        let m = BorderMode::Nearest;
        let row: Vec<_> = (0..4).map(|o| m.source_index(o, 1, 4)).collect();
        assert_eq!(row, vec![0, 0, 1, 2]);
        let row: Vec<_> = (0..4).map(|o| m.source_index(o, -1, 4)).collect();
        assert_eq!(row, vec![1, 2, 3, 3]);
        // shift beyond the axis saturates everything at the edge
        let row: Vec<_> = (0..4).map(|o| m.source_index(o, 9, 4)).collect();
        assert_eq!(row, vec![0, 0, 0, 0]);
        let row: Vec<_> = (0..4).map(|o| m.source_index(o, -9, 4)).collect();
        assert_eq!(row, vec![3, 3, 3, 3]);
    }

    #[test]
    fn test_reflect() {
        let m = BorderMode::Reflect;
        let row: Vec<_> = (0..4).map(|o| m.source_index(o, 1, 4)).collect();
        assert_eq!(row, vec![1, 0, 1, 2]);
        let row: Vec<_> = (0..4).map(|o| m.source_index(o, -1, 4)).collect();
        assert_eq!(row, vec![1, 2, 3, 2]);
    }

    #[test]
    fn test_reflect_large_shift() {
        let m = BorderMode::Reflect;
        // coordinates -6..=6 on a 4 element axis bounce 0 1 2 3 2 1 0 ...
        let expected = [0, 1, 2, 3, 2, 1, 0, 1, 2, 3, 2, 1, 0];
        for (k, want) in expected.iter().enumerate() {
            let c = k as i64 - 6;
            assert_eq!(m.source_index(0, -c, 4), *want, "coordinate {c}");
        }
        assert!(m.source_index(2, i64::MIN, 4) < 4);
        assert!(m.source_index(3, i64::MAX, 5) < 5);
    }

    #[test]
    fn test_single_element_axis() {
        for mode in BorderMode::iter() {
            for shift in [-3, -1, 0, 1, 7] {
                assert_eq!(mode.source_index(0, shift, 1), 0);
            }
        }
    }
}
