use thiserror::Error;

use crate::block_map::BlockMapError;

/// Intel-HEX parse failure. `record` is the 1-based index of the offending record.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("malformed input before record {record} at offset {offset}: {snippet:?}")]
    MalformedInput {
        record: usize,
        offset: usize,
        snippet: String,
    },

    #[error("record {record}: expected {expected} hex digits, found {actual}")]
    LengthMismatch {
        record: usize,
        expected: usize,
        actual: usize,
    },

    #[error("checksum mismatch in record {record}: expected {expected:02X}, got {actual:02X}")]
    ChecksumMismatch {
        record: usize,
        expected: u8,
        actual: u8,
    },

    #[error("unknown record type in record {record}: {record_type:02X}")]
    UnknownRecordType { record: usize, record_type: u8 },

    #[error("record {record} of type {record_type:02X} must have offset 0, got {offset:#06X}")]
    InvalidOffset {
        record: usize,
        record_type: u8,
        offset: u16,
    },

    #[error("record {record} of type {record_type:02X} must carry 2 data bytes, got {length}")]
    InvalidExtensionLength {
        record: usize,
        record_type: u8,
        length: usize,
    },

    #[error(
        "data record {record} at offset {offset:#06X} with {length} bytes crosses a 64 KiB boundary"
    )]
    AddressWindowOverflow {
        record: usize,
        offset: u16,
        length: usize,
    },

    #[error("duplicate data at address {address:#X} in record {record}")]
    DuplicateAddress { record: usize, address: u32 },

    #[error("data after EOF record {record} at offset {offset}")]
    TrailingDataAfterEof { record: usize, offset: usize },

    #[error("no EOF record after {records} records")]
    MissingEof { records: usize },

    #[error("no Intel-HEX records found")]
    EmptyInput,

    #[error(transparent)]
    Join(#[from] BlockMapError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WriteError {
    #[error("bytes per record must be in 1..=255, got {0}")]
    InvalidLineSize(usize),

    #[error("block at {address:#X} with {length} bytes exceeds the 32-bit address space")]
    AddressOverflow { address: u32, length: usize },

    #[error("block at {address:#X} overlaps data already written up to {cursor:#X}")]
    OverlappingBlocks { address: u32, cursor: u64 },
}
