//! # KNX Group Addresses
//!
//! A bus group is addressed by a 16-bit value laid out as
//! `0mmm msss gggg gggg` (main group, sub group, group). The gateway
//! protocol carries the packed form; humans write `main/sub/group`.

use crate::error::KnxMuxError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A packed 16-bit KNX group address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupAddress(u16);

impl GroupAddress {
    /// Builds an address from its main/sub/group components.
    ///
    /// The components must fit their bit fields (main 4 bits, sub 3 bits,
    /// group 8 bits); out-of-range input is rejected rather than truncated.
    pub fn new(main: u8, sub: u8, group: u8) -> Result<Self, KnxMuxError> {
        if main > 0x0f {
            return Err(KnxMuxError::InvalidGroupAddress(format!(
                "main group {main} exceeds 15"
            )));
        }
        if sub > 0x07 {
            return Err(KnxMuxError::InvalidGroupAddress(format!(
                "sub group {sub} exceeds 7"
            )));
        }
        Ok(GroupAddress(
            ((main as u16) << 11) | ((sub as u16) << 8) | group as u16,
        ))
    }

    /// Wraps a packed wire-form address. The reserved high bit is cleared.
    pub fn from_raw(raw: u16) -> Self {
        GroupAddress(raw & 0x7fff)
    }

    /// The packed wire form, as sent in command parameters.
    pub fn raw(&self) -> u16 {
        self.0
    }

    /// Main group component (0-15).
    pub fn main(&self) -> u8 {
        ((self.0 >> 11) & 0x0f) as u8
    }

    /// Sub group component (0-7).
    pub fn sub(&self) -> u8 {
        ((self.0 >> 8) & 0x07) as u8
    }

    /// Group component (0-255).
    pub fn group(&self) -> u8 {
        (self.0 & 0xff) as u8
    }
}

impl FromStr for GroupAddress {
    type Err = KnxMuxError;

    /// Parses the textual `main/sub/group` form, e.g. `"3/2/18"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('/');
        let mut next = |what: &str| -> Result<u8, KnxMuxError> {
            parts
                .next()
                .ok_or_else(|| {
                    KnxMuxError::InvalidGroupAddress(format!("missing {what} in {s:?}"))
                })?
                .parse::<u8>()
                .map_err(|_| KnxMuxError::InvalidGroupAddress(format!("bad {what} in {s:?}")))
        };
        let main = next("main group")?;
        let sub = next("sub group")?;
        let group = next("group")?;
        if parts.next().is_some() {
            return Err(KnxMuxError::InvalidGroupAddress(format!(
                "trailing components in {s:?}"
            )));
        }
        GroupAddress::new(main, sub, group)
    }
}

impl fmt::Display for GroupAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.main(), self.sub(), self.group())
    }
}

impl From<GroupAddress> for u16 {
    fn from(addr: GroupAddress) -> Self {
        addr.raw()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packing() {
        let addr = GroupAddress::new(3, 2, 18).unwrap();
        assert_eq!(addr.raw(), (3 << 11) | (2 << 8) | 18);
        assert_eq!(addr.main(), 3);
        assert_eq!(addr.sub(), 2);
        assert_eq!(addr.group(), 18);
    }

    #[test]
    fn test_string_round_trip() {
        let addr: GroupAddress = "3/2/18".parse().unwrap();
        assert_eq!(addr.to_string(), "3/2/18");
        assert_eq!(GroupAddress::from_raw(addr.raw()), addr);
    }

    #[test]
    fn test_out_of_range_components_rejected() {
        assert!(GroupAddress::new(16, 0, 0).is_err());
        assert!(GroupAddress::new(0, 8, 0).is_err());
        assert!("31/1/1".parse::<GroupAddress>().is_err());
        assert!("1/2".parse::<GroupAddress>().is_err());
        assert!("1/2/3/4".parse::<GroupAddress>().is_err());
        assert!("a/b/c".parse::<GroupAddress>().is_err());
    }

    #[test]
    fn test_from_raw_clears_reserved_bit() {
        let addr = GroupAddress::from_raw(0xffff);
        assert_eq!(addr.raw(), 0x7fff);
    }
}
