use log::debug;

use super::OpsError;
use crate::BlockMap;
use crate::address::ADDRESS_SPACE_END;

/// Options for extracting data from a padded flat buffer.
#[derive(Debug, Clone)]
pub struct PaddingOptions {
    /// Byte value treated as filler (default 0xFF)
    pub pad_byte: u8,
    /// Runs of at least this many pad bytes split the data (default 64)
    pub min_pad_length: usize,
}

impl Default for PaddingOptions {
    fn default() -> Self {
        Self {
            pad_byte: 0xFF,
            min_pad_length: 64,
        }
    }
}

/// Split a flat image (address 0 at `bytes[0]`) into blocks separated by runs
/// of at least `min_pad_length` pad bytes. Returned blocks are views into `bytes`.
///
/// Shorter pad runs stay inside the surrounding block, and so do trailing pad
/// bytes when the buffer ends before a full run.
pub fn from_padded_buffer<'a>(
    bytes: &'a [u8],
    options: &PaddingOptions,
) -> Result<BlockMap<&'a [u8]>, OpsError> {
    if bytes.len() as u64 > ADDRESS_SPACE_END {
        return Err(OpsError::AddressOverflow {
            length: bytes.len(),
        });
    }

    let mut map = BlockMap::new();
    let mut consecutive_pads = 0usize;
    let mut run_start = 0usize;
    let mut last_non_pad: Option<usize> = None;
    let mut skipping = false;

    for (addr, &byte) in bytes.iter().enumerate() {
        if byte == options.pad_byte {
            consecutive_pads += 1;
            if !skipping && consecutive_pads >= options.min_pad_length {
                if let Some(last) = last_non_pad {
                    map.set(run_start as u32, &bytes[run_start..=last]);
                }
                skipping = true;
            }
        } else {
            if skipping {
                skipping = false;
                run_start = addr;
            }
            last_non_pad = Some(addr);
            consecutive_pads = 0;
        }
    }

    if !skipping && last_non_pad.is_some() {
        map.set(run_start as u32, &bytes[run_start..]);
    }

    debug!(
        "from_padded_buffer: {} bytes into {} blocks",
        bytes.len(),
        map.len()
    );
    Ok(map)
}
