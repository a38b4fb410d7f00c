//! Intel HEX codec and sparse block map.
//!
//! Parse text with [`parse_intel_hex`], reshape the resulting [`BlockMap`]
//! with `join`, `slice`, `paginate` or [`overlap_block_maps`], and emit it
//! again with [`write_intel_hex`].

pub mod address;
pub mod block_map;
pub mod error;
pub mod io;
pub mod ops;

pub use address::{AddressError, Span, parse_address};
pub use block_map::{BlockMap, BlockMapError};
pub use error::Error;
pub use io::{
    IntelHexWriteOptions, MAX_BYTES_PER_LINE, ParseError, WriteError, parse_intel_hex,
    write_intel_hex, write_intel_hex_lines,
};
pub use ops::{
    OpsError, Overlaps, PageOptions, PaddingOptions, flatten_overlaps, from_padded_buffer,
    overlap_block_maps,
};
