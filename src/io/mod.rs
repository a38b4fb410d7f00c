mod error;
mod intel_hex;
mod scanner;

pub use error::{ParseError, WriteError};
pub use intel_hex::{
    IntelHexWriteOptions, MAX_BYTES_PER_LINE, parse_intel_hex, write_intel_hex,
    write_intel_hex_lines,
};
