//! CBOR wire constants.

// Major type values (bits 7-5 of the initial byte).
pub const MAJOR_UIN: u8 = 0b000;
pub const MAJOR_NIN: u8 = 0b001;
pub const MAJOR_BIN: u8 = 0b010;
pub const MAJOR_STR: u8 = 0b011;
pub const MAJOR_ARR: u8 = 0b100;
pub const MAJOR_MAP: u8 = 0b101;
pub const MAJOR_TAG: u8 = 0b110;
pub const MAJOR_TKN: u8 = 0b111;

// Major type overlays (major shifted to bits 7-5).
pub const OVERLAY_UIN: u8 = 0b000_00000;
pub const OVERLAY_NIN: u8 = 0b001_00000;
pub const OVERLAY_BIN: u8 = 0b010_00000;
pub const OVERLAY_STR: u8 = 0b011_00000;
pub const OVERLAY_ARR: u8 = 0b100_00000;
pub const OVERLAY_MAP: u8 = 0b101_00000;
pub const OVERLAY_TAG: u8 = 0b110_00000;
pub const OVERLAY_TKN: u8 = 0b111_00000;

/// Mask for the additional-info field (bits 4-0).
pub const MINOR_MASK: u8 = 0b11111;

/// Additional-info value marking indefinite length (or, for major type 7,
/// the break stop code).
pub const MINOR_INDEFINITE: u8 = 31;

// Extension (major type 7) additional-info assignments.
pub const TKN_FALSE: u8 = 20;
pub const TKN_TRUE: u8 = 21;
pub const TKN_NULL: u8 = 22;
pub const TKN_UNDEFINED: u8 = 23;
pub const TKN_SIMPLE: u8 = 24;
pub const TKN_F16: u8 = 25;
pub const TKN_F32: u8 = 26;
pub const TKN_F64: u8 = 27;

/// CBOR "break" stop code terminating indefinite-length items.
pub const CBOR_END: u8 = 0xff;

/// Upper bound (exclusive) for payload lengths, container sizes and tag
/// values accepted by this implementation.
pub const MAX_LENGTH: u64 = 1 << 31;
