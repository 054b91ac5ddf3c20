//! Source addressing.
//!
//! A [`Usage`] names a logical control ("gamepad south button") independently of the device
//! that produces it. An [`Endpoint`] qualifies a usage with the source it comes from, or leaves
//! the source open (`source_id == 0`) to mean "any source".
//!
//! Both are plain bit-packed integers: equality and hashing operate on the raw value, and they
//! serialize transparently as that value.
//!
//! ## Bit layout
//! ```text
//! Usage    (32): [31..16] page   [15..0] id
//! Endpoint (64): [31..0]  usage  [35..32] protocol  [51..36] source id  [55..52] source type
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Logical identity of a control: HID-style usage page + usage id.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Usage(u32);

impl Usage {
    /// The invalid (unassigned) usage.
    pub const INVALID: Usage = Usage(0);

    #[inline]
    pub const fn new(value: u32) -> Self {
        Usage(value)
    }

    /// Build a usage from its page and id halves.
    #[inline]
    pub const fn from_parts(page: u16, id: u16) -> Self {
        Usage(((page as u32) << 16) | id as u32)
    }

    #[inline]
    pub const fn value(self) -> u32 {
        self.0
    }

    /// Usage page (high 16 bits).
    #[inline]
    pub const fn page(self) -> u16 {
        (self.0 >> 16) as u16
    }

    /// Usage id within the page (low 16 bits).
    #[inline]
    pub const fn id(self) -> u16 {
        self.0 as u16
    }

    #[inline]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl From<u32> for Usage {
    fn from(value: u32) -> Self {
        Usage(value)
    }
}

impl fmt::Display for Usage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04x}:{:04x}", self.page(), self.id())
    }
}

/// Kind of source an [`Endpoint`] refers to (4 bits).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum SourceType {
    /// A physical device (or "any device" when the source id is zero).
    Device = 0,
    /// A virtual device fed by the application or a test harness.
    Virtual = 1,
    /// A derived node inside the pipeline.
    Derived = 2,
    /// A device on a remote host.
    Remote = 3,
}

impl SourceType {
    /// Decode a 4-bit source type, `None` for unassigned values.
    pub const fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            0 => Some(SourceType::Device),
            1 => Some(SourceType::Virtual),
            2 => Some(SourceType::Derived),
            3 => Some(SourceType::Remote),
            _ => None,
        }
    }
}

const USAGE_MASK: u64 = 0xFFFF_FFFF;
const PROTOCOL_SHIFT: u32 = 32;
const PROTOCOL_BITS: u32 = 4;
const PROTOCOL_MASK: u64 = (1 << PROTOCOL_BITS) - 1;
const SOURCE_ID_SHIFT: u32 = 36;
const SOURCE_ID_MASK: u64 = 0xFFFF;
const SOURCE_TYPE_SHIFT: u32 = 52;
const SOURCE_TYPE_MASK: u64 = 0xF;

/// Physical or abstract source address: a [`Usage`] plus protocol and source identity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Endpoint(u64);

impl Endpoint {
    /// Largest protocol value that fits the 4-bit protocol field.
    pub const MAX_PROTOCOL: u8 = PROTOCOL_MASK as u8;

    /// Pack all fields.
    ///
    /// # Errors
    /// [`Error::FieldOutOfRange`] if `protocol` exceeds [`Endpoint::MAX_PROTOCOL`]. All other
    /// fields use exact-width integer types and cannot overflow their allocation.
    pub fn new(usage: Usage, protocol: u8, source_id: u16, source_type: SourceType) -> Result<Self> {
        if protocol > Self::MAX_PROTOCOL {
            return Err(Error::FieldOutOfRange {
                field: "protocol",
                value: u64::from(protocol),
                bits: PROTOCOL_BITS,
            });
        }
        Ok(Self::pack(usage, protocol, source_id, source_type))
    }

    /// Wildcard endpoint: the usage on any device.
    #[inline]
    pub const fn from_usage(usage: Usage) -> Self {
        Self::pack(usage, 0, 0, SourceType::Device)
    }

    /// The usage on one concrete device.
    #[inline]
    pub const fn from_device_and_usage(device_id: u16, usage: Usage) -> Self {
        Self::pack(usage, 0, device_id, SourceType::Device)
    }

    /// Reinterpret a raw 64-bit value.
    #[inline]
    pub const fn from_bits(bits: u64) -> Self {
        Endpoint(bits)
    }

    const fn pack(usage: Usage, protocol: u8, source_id: u16, source_type: SourceType) -> Self {
        Endpoint(
            usage.value() as u64
                | ((protocol as u64 & PROTOCOL_MASK) << PROTOCOL_SHIFT)
                | ((source_id as u64) << SOURCE_ID_SHIFT)
                | ((source_type as u64) << SOURCE_TYPE_SHIFT),
        )
    }

    #[inline]
    pub const fn bits(self) -> u64 {
        self.0
    }

    #[inline]
    pub const fn usage(self) -> Usage {
        Usage::new((self.0 & USAGE_MASK) as u32)
    }

    #[inline]
    pub const fn protocol(self) -> u8 {
        ((self.0 >> PROTOCOL_SHIFT) & PROTOCOL_MASK) as u8
    }

    #[inline]
    pub const fn source_id(self) -> u16 {
        ((self.0 >> SOURCE_ID_SHIFT) & SOURCE_ID_MASK) as u16
    }

    /// Source type, `None` if the raw bits hold an unassigned value.
    #[inline]
    pub const fn source_type(self) -> Option<SourceType> {
        SourceType::from_bits(((self.0 >> SOURCE_TYPE_SHIFT) & SOURCE_TYPE_MASK) as u8)
    }

    /// True when the endpoint accepts any source of its usage.
    #[inline]
    pub const fn is_wildcard(self) -> bool {
        self.source_id() == 0
    }
}

impl From<Usage> for Endpoint {
    fn from(usage: Usage) -> Self {
        Endpoint::from_usage(usage)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{:04x}", self.usage(), self.source_id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Usage::from_parts(0x05, 0x01), 1)]
    #[case(Usage::from_parts(0xFFFF, 0xFFFF), 0xFFFF)]
    #[case(Usage::new(0x8000_0001), 0x7FFF)]
    #[case(Usage::INVALID, 0)]
    fn device_and_usage_round_trip(#[case] usage: Usage, #[case] device_id: u16) {
        let endpoint = Endpoint::from_device_and_usage(device_id, usage);
        assert_eq!(endpoint.usage(), usage);
        assert_eq!(endpoint.source_id(), device_id);
        assert_eq!(endpoint.source_type(), Some(SourceType::Device));
        assert_eq!(endpoint.protocol(), 0);
    }

    #[test]
    fn from_usage_is_wildcard() {
        let usage = Usage::from_parts(0x05, 0x20);
        let endpoint = Endpoint::from_usage(usage);
        assert!(endpoint.is_wildcard());
        assert_eq!(endpoint.usage(), usage);
        assert_eq!(endpoint.bits(), u64::from(usage.value()));
    }

    #[test]
    fn usage_parts() {
        let usage = Usage::from_parts(0x1234, 0xabcd);
        assert_eq!(usage.value(), 0x1234_abcd);
        assert_eq!(usage.page(), 0x1234);
        assert_eq!(usage.id(), 0xabcd);
        assert_eq!(usage.to_string(), "1234:abcd");
        assert!(!Usage::INVALID.is_valid());
    }

    #[test]
    fn new_packs_every_field() {
        let usage = Usage::from_parts(1, 2);
        let endpoint = Endpoint::new(usage, 15, 0xBEEF, SourceType::Remote).unwrap();
        assert_eq!(endpoint.usage(), usage);
        assert_eq!(endpoint.protocol(), 15);
        assert_eq!(endpoint.source_id(), 0xBEEF);
        assert_eq!(endpoint.source_type(), Some(SourceType::Remote));
    }

    #[test]
    fn protocol_wider_than_four_bits_is_rejected() {
        let err = Endpoint::new(Usage::new(1), 16, 0, SourceType::Device).unwrap_err();
        assert!(matches!(
            err,
            Error::FieldOutOfRange {
                field: "protocol",
                value: 16,
                bits: 4
            }
        ));
    }

    #[test]
    fn unknown_source_type_decodes_to_none() {
        let endpoint = Endpoint::from_bits(0xF << 52);
        assert_eq!(endpoint.source_type(), None);
    }

    #[test]
    fn serializes_as_plain_integers() {
        let endpoint = Endpoint::from_device_and_usage(3, Usage::new(7));
        let json = serde_json::to_string(&endpoint).unwrap();
        assert_eq!(json, endpoint.bits().to_string());
        let back: Endpoint = serde_json::from_str(&json).unwrap();
        assert_eq!(back, endpoint);
        assert_eq!(serde_json::to_string(&Usage::new(42)).unwrap(), "42");
    }
}
