//! Legacy-format type definitions
//!
//! Editions, record-layout constants, and the format-level error type for
//! the MaxMind legacy (`.dat`) database family.

use std::fmt;

/// Structural marker that introduces the structure-info block at the end of
/// a database file.
pub const STRUCTURE_MARKER: [u8; 3] = [0xFF, 0xFF, 0xFF];

/// Maximum number of positions scanned backwards from the end of the buffer
/// when searching for the structure marker.
pub const STRUCTURE_INFO_MAX_SIZE: usize = 20;

/// Maximum number of bytes scanned backwards for the database-info string.
pub const DATABASE_INFO_MAX_SIZE: usize = 100;

/// Terminal-pointer base for country editions. Pointers at or above this
/// value encode a country index rather than a node offset.
pub const COUNTRY_BEGIN: u32 = 16_776_960;

/// Terminal-pointer base for region edition rev0.
pub const STATE_BEGIN_REV0: u32 = 16_700_000;

/// Terminal-pointer base for region edition rev1.
pub const STATE_BEGIN_REV1: u32 = 16_000_000;

/// Child-pointer width for standard editions.
pub const STANDARD_RECORD_LENGTH: usize = 3;

/// Child-pointer width for org/ISP editions.
pub const ORG_RECORD_LENGTH: usize = 4;

/// Width of the little-endian node count in the structure-info block.
pub const SEGMENT_RECORD_LENGTH: usize = 3;

/// Bounded scan window for decoding a single city record.
pub const FULL_RECORD_LENGTH: usize = 50;

/// Smallest buffer that can hold a coherent database: one root node.
pub const MIN_BUFFER_SIZE: usize = 2 * STANDARD_RECORD_LENGTH;

/// Errors raised by the legacy-format loader and decoder.
///
/// `Truncated` and `UnsupportedEdition` are load-time failures: the database
/// is not constructed. `Corrupt` is a lookup-time failure: the traversal
/// reached the record region but the record could not be decoded. It is
/// reported to the caller of the lookup and leaves the database fully
/// usable for subsequent lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatError {
    /// Buffer is too short to hold the structure it declares
    Truncated {
        /// Actual buffer size in bytes
        size: usize,
        /// Minimum required size in bytes
        required: usize,
    },
    /// Edition id is unknown, or known but not queryable by this crate
    UnsupportedEdition(u8),
    /// Traversal or record decoding hit malformed data
    Corrupt(String),
}

impl fmt::Display for DatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatError::Truncated { size, required } => {
                write!(
                    f,
                    "truncated database: {} bytes (need at least {})",
                    size, required
                )
            }
            DatError::UnsupportedEdition(id) => write!(f, "unsupported database edition {}", id),
            DatError::Corrupt(msg) => write!(f, "corrupt data: {}", msg),
        }
    }
}

impl std::error::Error for DatError {}

/// Database edition declared by the structure-info block.
///
/// Only the country and city families can be queried; the remaining
/// editions are recognized so a file can be identified, but constructing a
/// [`crate::Database`] over them fails with
/// [`DatError::UnsupportedEdition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edition {
    /// IPv4 country database (the default when no marker is present)
    Country,
    /// IPv4 city database, revision 0
    CityRev0,
    /// IPv4 city database, revision 1 (adds the metro/area combo field)
    CityRev1,
    /// IPv4 region database, revision 0
    RegionRev0,
    /// IPv4 region database, revision 1
    RegionRev1,
    /// Organization database
    Org,
    /// ISP database
    Isp,
    /// Domain database
    Domain,
    /// Autonomous-system-number database
    Asnum,
    /// Proxy database
    Proxy,
    /// Connection-speed database
    Netspeed,
    /// IPv6 country database
    CountryV6,
    /// IPv6 city database, revision 0
    CityRev0V6,
    /// IPv6 city database, revision 1
    CityRev1V6,
    /// IPv6 autonomous-system-number database
    AsnumV6,
    /// IPv6 ISP database
    IspV6,
    /// IPv6 organization database
    OrgV6,
    /// IPv6 domain database
    DomainV6,
}

impl Edition {
    /// Map a structure-info edition byte to an edition.
    ///
    /// Ids of 106 and above have already been normalized by the caller
    /// (the on-disk encoding offsets them by 105).
    pub fn from_id(id: u8) -> Result<Self, DatError> {
        match id {
            1 => Ok(Edition::Country),
            2 => Ok(Edition::CityRev1),
            3 => Ok(Edition::RegionRev1),
            4 => Ok(Edition::Isp),
            5 => Ok(Edition::Org),
            6 => Ok(Edition::CityRev0),
            7 => Ok(Edition::RegionRev0),
            8 => Ok(Edition::Proxy),
            9 => Ok(Edition::Asnum),
            10 => Ok(Edition::Netspeed),
            11 => Ok(Edition::Domain),
            12 => Ok(Edition::CountryV6),
            21 => Ok(Edition::AsnumV6),
            22 => Ok(Edition::IspV6),
            23 => Ok(Edition::OrgV6),
            24 => Ok(Edition::DomainV6),
            30 => Ok(Edition::CityRev1V6),
            31 => Ok(Edition::CityRev0V6),
            other => Err(DatError::UnsupportedEdition(other)),
        }
    }

    /// True if the edition indexes IPv6 address space.
    pub fn is_v6(self) -> bool {
        matches!(
            self,
            Edition::CountryV6
                | Edition::CityRev0V6
                | Edition::CityRev1V6
                | Edition::AsnumV6
                | Edition::IspV6
                | Edition::OrgV6
                | Edition::DomainV6
        )
    }

    /// True for the country family (terminal pointers encode country
    /// indices relative to [`COUNTRY_BEGIN`]).
    pub fn is_country(self) -> bool {
        matches!(self, Edition::Country | Edition::CountryV6)
    }

    /// True for the city family (terminal pointers resolve into the
    /// record-data region).
    pub fn is_city(self) -> bool {
        matches!(
            self,
            Edition::CityRev0 | Edition::CityRev1 | Edition::CityRev0V6 | Edition::CityRev1V6
        )
    }

    /// True for city revision 1, which appends the metro/area combo field.
    pub fn is_city_rev1(self) -> bool {
        matches!(self, Edition::CityRev1 | Edition::CityRev1V6)
    }

    /// True if the structure-info block declares an explicit node count for
    /// this edition.
    pub fn declares_segment_count(self) -> bool {
        matches!(
            self,
            Edition::CityRev0
                | Edition::CityRev1
                | Edition::CityRev0V6
                | Edition::CityRev1V6
                | Edition::Org
                | Edition::Isp
                | Edition::Domain
                | Edition::Asnum
                | Edition::AsnumV6
                | Edition::IspV6
                | Edition::OrgV6
                | Edition::DomainV6
        )
    }

    /// Child-pointer width in bytes for this edition.
    pub fn record_length(self) -> usize {
        match self {
            Edition::Org | Edition::Isp => ORG_RECORD_LENGTH,
            _ => STANDARD_RECORD_LENGTH,
        }
    }

    /// Address bit length walked by the lookup trie (32 or 128).
    pub fn bit_length(self) -> u32 {
        if self.is_v6() {
            128
        } else {
            32
        }
    }
}

impl fmt::Display for Edition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Edition::Country => "country",
            Edition::CityRev0 => "city rev0",
            Edition::CityRev1 => "city rev1",
            Edition::RegionRev0 => "region rev0",
            Edition::RegionRev1 => "region rev1",
            Edition::Org => "org",
            Edition::Isp => "isp",
            Edition::Domain => "domain",
            Edition::Asnum => "asnum",
            Edition::Proxy => "proxy",
            Edition::Netspeed => "netspeed",
            Edition::CountryV6 => "country v6",
            Edition::CityRev0V6 => "city rev0 v6",
            Edition::CityRev1V6 => "city rev1 v6",
            Edition::AsnumV6 => "asnum v6",
            Edition::IspV6 => "isp v6",
            Edition::OrgV6 => "org v6",
            Edition::DomainV6 => "domain v6",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edition_ids_round_trip() {
        for id in [1u8, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 21, 22, 23, 24, 30, 31] {
            assert!(Edition::from_id(id).is_ok(), "id {} should parse", id);
        }
        assert_eq!(
            Edition::from_id(42),
            Err(DatError::UnsupportedEdition(42))
        );
    }

    #[test]
    fn test_record_lengths() {
        assert_eq!(Edition::CityRev1.record_length(), 3);
        assert_eq!(Edition::Org.record_length(), 4);
        assert_eq!(Edition::Isp.record_length(), 4);
    }

    #[test]
    fn test_bit_lengths() {
        assert_eq!(Edition::CityRev1.bit_length(), 32);
        assert_eq!(Edition::CityRev1V6.bit_length(), 128);
        assert_eq!(Edition::CountryV6.bit_length(), 128);
    }
}
