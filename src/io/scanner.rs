//! Cursor-based tokenizer splitting Intel-HEX text into raw records.
//!
//! A record is `:`, at least 8 hex digits of payload, 2 hex digits of
//! checksum and an optional `\r\n`, `\r` or `\n`. Records must follow each
//! other without any unmatched text in between.

use super::ParseError;

/// Longest excerpt of unmatched input quoted in an error.
const SNIPPET_LEN: usize = 16;

/// Minimum hex digits after the colon: length, offset, type and checksum.
const MIN_RECORD_DIGITS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RawRecord<'a> {
    /// 1-based record number.
    pub index: usize,
    /// Byte offset of the colon in the input.
    pub offset: usize,
    /// Hex digits of length, offset, type and data.
    pub payload: &'a str,
    /// The two checksum digits.
    pub checksum: &'a str,
    /// Byte offset just past the record and its line terminator.
    pub end: usize,
}

#[derive(Debug)]
pub(crate) struct RecordScanner<'a> {
    input: &'a str,
    cursor: usize,
    count: usize,
    failed: bool,
}

impl<'a> RecordScanner<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            cursor: 0,
            count: 0,
            failed: false,
        }
    }

    /// Number of records yielded so far.
    pub fn records_seen(&self) -> usize {
        self.count
    }

    /// Match one record starting exactly at `start`.
    fn match_at(&self, start: usize) -> Option<RawRecord<'a>> {
        let bytes = self.input.as_bytes();
        if bytes.get(start) != Some(&b':') {
            return None;
        }

        let digits_start = start + 1;
        let digits = bytes[digits_start..]
            .iter()
            .take_while(|b| b.is_ascii_hexdigit())
            .count();
        if digits < MIN_RECORD_DIGITS {
            return None;
        }

        let checksum_start = digits_start + digits - 2;
        let digits_end = digits_start + digits;
        let end = match &bytes[digits_end..] {
            [b'\r', b'\n', ..] => digits_end + 2,
            [b'\r', ..] | [b'\n', ..] => digits_end + 1,
            _ => digits_end,
        };

        Some(RawRecord {
            index: self.count + 1,
            offset: start,
            payload: &self.input[digits_start..checksum_start],
            checksum: &self.input[checksum_start..digits_end],
            end,
        })
    }

    /// Find the first record at or after the cursor.
    fn next_match(&self) -> Option<RawRecord<'a>> {
        self.input[self.cursor..]
            .match_indices(':')
            .find_map(|(pos, _)| self.match_at(self.cursor + pos))
    }

    fn snippet(&self, from: usize, to: usize) -> String {
        self.input[from..to].chars().take(SNIPPET_LEN).collect()
    }
}

impl<'a> Iterator for RecordScanner<'a> {
    type Item = Result<RawRecord<'a>, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.cursor >= self.input.len() {
            return None;
        }

        let record = self.next_match()?;
        if record.offset != self.cursor {
            self.failed = true;
            return Some(Err(ParseError::MalformedInput {
                record: record.index,
                offset: self.cursor,
                snippet: self.snippet(self.cursor, record.offset),
            }));
        }

        self.cursor = record.end;
        self.count += 1;
        Some(Ok(record))
    }
}
