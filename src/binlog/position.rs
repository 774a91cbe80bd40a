//! Binlog Positions
//!
//! A position is a binlog file name plus a byte offset. Comparison is
//! lexicographic on the file name, then numeric on the offset; a
//! position with an empty file name is treated as absent.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Position within the source's binary log
#[derive(
    Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct BinlogPosition {
    pub name: String,
    pub offset: u64,
}

impl BinlogPosition {
    pub fn new(name: impl Into<String>, offset: u64) -> Self {
        Self {
            name: name.into(),
            offset,
        }
    }

    /// An empty file name means no position has been recorded yet
    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
    }

    /// The smaller of two positions, ignoring absent ones. Returns the
    /// empty position when both are absent.
    pub fn min_of(a: &BinlogPosition, b: &BinlogPosition) -> BinlogPosition {
        match (a.is_empty(), b.is_empty()) {
            (true, true) => BinlogPosition::default(),
            (true, false) => b.clone(),
            (false, true) => a.clone(),
            (false, false) => {
                if a <= b {
                    a.clone()
                } else {
                    b.clone()
                }
            }
        }
    }
}

impl fmt::Display for BinlogPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering() {
        let a = BinlogPosition::new("mysql-bin.000001", 4000);
        let b = BinlogPosition::new("mysql-bin.000001", 9000);
        let c = BinlogPosition::new("mysql-bin.000002", 4);

        assert!(a < b);
        assert!(b < c);
        assert!(a < c);
    }

    #[test]
    fn test_min_of_ignores_absent() {
        let present = BinlogPosition::new("mysql-bin.000002", 128);
        let later = BinlogPosition::new("mysql-bin.000003", 4);
        let absent = BinlogPosition::default();

        assert_eq!(BinlogPosition::min_of(&present, &later), present);
        assert_eq!(BinlogPosition::min_of(&later, &present), present);
        assert_eq!(BinlogPosition::min_of(&absent, &present), present);
        assert_eq!(BinlogPosition::min_of(&present, &absent), present);
        assert_eq!(BinlogPosition::min_of(&absent, &absent), absent);
    }
}
