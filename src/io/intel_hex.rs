use log::{debug, trace};

use super::scanner::{RawRecord, RecordScanner};
use super::{ParseError, WriteError};
use crate::BlockMap;
use crate::address::Span;

const RECORD_DATA: u8 = 0x00;
const RECORD_EOF: u8 = 0x01;
const RECORD_EXTENDED_SEGMENT: u8 = 0x02;
const RECORD_START_SEGMENT: u8 = 0x03;
const RECORD_EXTENDED_LINEAR: u8 = 0x04;
const RECORD_START_LINEAR: u8 = 0x05;

/// Size of one address window addressable by a 16-bit load offset.
const WINDOW_SIZE: u32 = 0x10000;

/// Length, offset and type bytes preceding the data.
const HEADER_LEN: usize = 4;

pub const MAX_BYTES_PER_LINE: usize = 255;

#[derive(Debug, Clone)]
pub struct IntelHexWriteOptions {
    /// Maximum data bytes per record, 1..=255.
    pub bytes_per_line: usize,
}

impl Default for IntelHexWriteOptions {
    fn default() -> Self {
        Self { bytes_per_line: 16 }
    }
}

/// A decoded record with its checksum verified.
struct Record {
    offset: u16,
    record_type: u8,
    data: Vec<u8>,
}

impl Record {
    fn decode(raw: &RawRecord<'_>) -> Result<Self, ParseError> {
        let declared = hex_byte(&raw.payload.as_bytes()[..2]) as usize;
        let expected = 2 * (HEADER_LEN + declared);
        if raw.payload.len() != expected {
            return Err(ParseError::LengthMismatch {
                record: raw.index,
                expected,
                actual: raw.payload.len(),
            });
        }

        let bytes: Vec<u8> = raw.payload.as_bytes().chunks_exact(2).map(hex_byte).collect();
        let actual = hex_byte(raw.checksum.as_bytes());
        let expected = checksum(&bytes);
        if actual != expected {
            return Err(ParseError::ChecksumMismatch {
                record: raw.index,
                expected,
                actual,
            });
        }

        Ok(Self {
            offset: u16::from_be_bytes([bytes[1], bytes[2]]),
            record_type: bytes[3],
            data: bytes[HEADER_LEN..].to_vec(),
        })
    }

    fn require_zero_offset(&self, index: usize) -> Result<(), ParseError> {
        if self.offset != 0 {
            return Err(ParseError::InvalidOffset {
                record: index,
                record_type: self.record_type,
                offset: self.offset,
            });
        }
        Ok(())
    }

    fn extension_base(&self, index: usize) -> Result<u32, ParseError> {
        match self.data[..] {
            [hi, lo] => Ok(u16::from_be_bytes([hi, lo]) as u32),
            _ => Err(ParseError::InvalidExtensionLength {
                record: index,
                record_type: self.record_type,
                length: self.data.len(),
            }),
        }
    }
}

/// Parse Intel-HEX text into a joined block map.
///
/// Contiguous data records are coalesced into runs of at most
/// `max_block_size` bytes; pass `usize::MAX` for no cap.
pub fn parse_intel_hex(text: &str, max_block_size: usize) -> Result<BlockMap, ParseError> {
    let mut blocks = BlockMap::new();
    let mut ulba: u32 = 0;
    let mut scanner = RecordScanner::new(text);

    for raw in scanner.by_ref() {
        let raw = raw?;
        let record = Record::decode(&raw)?;
        trace!(
            "record {}: type {:02X} offset {:#06X} len {}",
            raw.index,
            record.record_type,
            record.offset,
            record.data.len()
        );

        match record.record_type {
            RECORD_DATA => {
                // ulba <= 0xFFFF0000, so this cannot overflow
                let address = ulba + record.offset as u32;
                if blocks.has(address) {
                    return Err(ParseError::DuplicateAddress {
                        record: raw.index,
                        address,
                    });
                }
                if record.offset as usize + record.data.len() > WINDOW_SIZE as usize {
                    return Err(ParseError::AddressWindowOverflow {
                        record: raw.index,
                        offset: record.offset,
                        length: record.data.len(),
                    });
                }
                blocks.set(address, record.data);
            }
            RECORD_EOF => {
                record.require_zero_offset(raw.index)?;
                if raw.end != text.len() {
                    return Err(ParseError::TrailingDataAfterEof {
                        record: raw.index,
                        offset: raw.end,
                    });
                }
                debug!(
                    "parsed {} records into {} data records",
                    raw.index,
                    blocks.len()
                );
                return Ok(blocks.join(max_block_size)?);
            }
            RECORD_EXTENDED_SEGMENT => {
                record.require_zero_offset(raw.index)?;
                ulba = record.extension_base(raw.index)? << 4;
            }
            RECORD_EXTENDED_LINEAR => {
                record.require_zero_offset(raw.index)?;
                ulba = record.extension_base(raw.index)? << 16;
            }
            RECORD_START_SEGMENT | RECORD_START_LINEAR => {
                record.require_zero_offset(raw.index)?;
            }
            record_type => {
                return Err(ParseError::UnknownRecordType {
                    record: raw.index,
                    record_type,
                });
            }
        }
    }

    match scanner.records_seen() {
        0 => Err(ParseError::EmptyInput),
        records => Err(ParseError::MissingEof { records }),
    }
}

/// Encode a block map as Intel-HEX records, one string per line.
///
/// Blocks must not overlap; join them beforehand if in doubt. Every run of
/// data is preceded by an extended linear address record whenever it enters
/// a new 64 KiB window, and records never cross a window boundary.
pub fn write_intel_hex_lines<B: AsRef<[u8]>>(
    map: &BlockMap<B>,
    options: &IntelHexWriteOptions,
) -> Result<Vec<String>, WriteError> {
    let bytes_per_line = options.bytes_per_line;
    if bytes_per_line == 0 || bytes_per_line > MAX_BYTES_PER_LINE {
        return Err(WriteError::InvalidLineSize(bytes_per_line));
    }

    let mut lines = Vec::new();
    let mut current_window: Option<u16> = None;
    let mut cursor: u64 = 0;

    for (&address, block) in map {
        let data = block.as_ref();
        if data.is_empty() {
            continue;
        }

        let span = Span::of_block(address, data.len());
        if span.end() > u32::MAX as u64 {
            return Err(WriteError::AddressOverflow {
                address,
                length: data.len(),
            });
        }
        if span.start() < cursor {
            return Err(WriteError::OverlappingBlocks { address, cursor });
        }

        let mut addr = address;
        let mut data_offset = 0;
        while data_offset < data.len() {
            let window = (addr >> 16) as u16;
            if current_window != Some(window) {
                current_window = Some(window);
                lines.push(format_record(
                    RECORD_EXTENDED_LINEAR,
                    0,
                    &window.to_be_bytes(),
                ));
            }

            let offset_addr = (addr & 0xFFFF) as u16;
            let remaining_in_window = (WINDOW_SIZE - offset_addr as u32) as usize;
            let chunk_len = bytes_per_line
                .min(remaining_in_window)
                .min(data.len() - data_offset);

            let chunk = &data[data_offset..data_offset + chunk_len];
            lines.push(format_record(RECORD_DATA, offset_addr, chunk));

            data_offset += chunk_len;
            addr = addr.wrapping_add(chunk_len as u32);
        }
        cursor = span.end();
    }

    lines.push(format_record(RECORD_EOF, 0, &[]));
    debug!("encoded {} blocks into {} records", map.len(), lines.len());
    Ok(lines)
}

/// Encode a block map as newline-separated Intel-HEX text.
pub fn write_intel_hex<B: AsRef<[u8]>>(
    map: &BlockMap<B>,
    options: &IntelHexWriteOptions,
) -> Result<String, WriteError> {
    Ok(write_intel_hex_lines(map, options)?.join("\n"))
}

impl<B: AsRef<[u8]>> BlockMap<B> {
    pub fn to_hex_lines(&self, line_size: usize) -> Result<Vec<String>, WriteError> {
        write_intel_hex_lines(
            self,
            &IntelHexWriteOptions {
                bytes_per_line: line_size,
            },
        )
    }

    pub fn to_hex_string(&self, line_size: usize) -> Result<String, WriteError> {
        Ok(self.to_hex_lines(line_size)?.join("\n"))
    }
}

fn format_record(record_type: u8, address: u16, data: &[u8]) -> String {
    let addr_bytes = address.to_be_bytes();
    let header = [data.len() as u8, addr_bytes[0], addr_bytes[1], record_type];

    let mut line = String::with_capacity(1 + 2 * (header.len() + data.len() + 1));
    line.push(':');
    for &b in header.iter().chain(data) {
        push_hex_byte(&mut line, b);
    }
    let sum = header
        .iter()
        .chain(data)
        .fold(0u8, |acc, &b| acc.wrapping_add(b));
    push_hex_byte(&mut line, sum.wrapping_neg());
    line
}

fn push_hex_byte(line: &mut String, byte: u8) {
    const HEX_CHARS: &[u8; 16] = b"0123456789ABCDEF";
    line.push(HEX_CHARS[(byte >> 4) as usize] as char);
    line.push(HEX_CHARS[(byte & 0x0F) as usize] as char);
}

/// Two's-complement checksum over a record's bytes.
fn checksum(bytes: &[u8]) -> u8 {
    bytes
        .iter()
        .fold(0u8, |acc, &b| acc.wrapping_add(b))
        .wrapping_neg()
}

/// Decode two ASCII hex digits; the scanner guarantees they are valid.
fn hex_byte(pair: &[u8]) -> u8 {
    (hex_digit(pair[0]) << 4) | hex_digit(pair[1])
}

fn hex_digit(b: u8) -> u8 {
    match b {
        b'0'..=b'9' => b - b'0',
        b'A'..=b'F' => b - b'A' + 10,
        b'a'..=b'f' => b - b'a' + 10,
        _ => 0,
    }
}
