use std::fmt;
use std::str::FromStr;

use macaddr::MacAddr6;

use crate::MacchangerError;

/// Bit 0 of the first octet: group (multicast) address.
pub const MULTICAST_BIT: u8 = 0x01;
/// Bit 1 of the first octet: software-assigned address.
pub const LOCALLY_ADMINISTERED_BIT: u8 = 0x02;

/// A 48-bit link-layer address.
///
/// Parses from six colon-separated hex pairs (either case) and always renders
/// as lowercase pairs joined by `:`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MacAddress(MacAddr6);

impl MacAddress {
    pub fn new(octets: [u8; 6]) -> Self {
        MacAddress(MacAddr6::from(octets))
    }

    pub fn octets(&self) -> [u8; 6] {
        let mut octets = [0u8; 6];
        octets.copy_from_slice(self.0.as_bytes());
        octets
    }

    pub fn is_locally_administered(&self) -> bool {
        self.0.as_bytes()[0] & LOCALLY_ADMINISTERED_BIT != 0
    }

    pub fn is_multicast(&self) -> bool {
        self.0.as_bytes()[0] & MULTICAST_BIT != 0
    }

    /// All octets zero. Drivers without a burned-in address report this.
    pub fn is_unspecified(&self) -> bool {
        self.0.as_bytes().iter().all(|b| *b == 0)
    }

    pub fn is_broadcast(&self) -> bool {
        self.0.as_bytes().iter().all(|b| *b == 0xff)
    }
}

impl From<[u8; 6]> for MacAddress {
    fn from(octets: [u8; 6]) -> Self {
        MacAddress::new(octets)
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = self.0.as_bytes();
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            b[0], b[1], b[2], b[3], b[4], b[5]
        )
    }
}

impl FromStr for MacAddress {
    type Err = MacchangerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: String| MacchangerError::InvalidAddress {
            address: s.to_owned(),
            reason,
        };

        if s.is_empty() {
            return Err(invalid("address is empty".to_owned()));
        }
        if s.contains('-') {
            return Err(invalid("only ':' is accepted as a separator".to_owned()));
        }

        let groups: Vec<&str> = s.split(':').collect();
        if groups.len() != 6 {
            return Err(invalid(format!(
                "expected 6 colon-separated groups, found {}",
                groups.len()
            )));
        }

        let mut octets = [0u8; 6];
        for (octet, group) in octets.iter_mut().zip(&groups) {
            if group.len() != 2 || !group.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(invalid(format!(
                    "group `{group}` is not a two-digit hex number"
                )));
            }
            *octet = u8::from_str_radix(group, 16)
                .map_err(|e| invalid(format!("group `{group}`: {e}")))?;
        }

        Ok(MacAddress::new(octets))
    }
}
