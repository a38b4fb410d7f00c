use thiserror::Error;

/// One past the highest byte address of the 32-bit address space.
pub const ADDRESS_SPACE_END: u64 = 1 << 32;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("not a number: {0:?}")]
    NotANumber(String),

    #[error("address out of range: {0:?}")]
    OutOfRange(String),
}

/// Parse an address from decimal, hex (0x), or binary (0b).
pub fn parse_address(s: &str) -> Result<u32, AddressError> {
    let s = s.trim();
    let (negative, unsigned) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };

    let (radix, digits) = if let Some(hex) = unsigned
        .strip_prefix("0x")
        .or_else(|| unsigned.strip_prefix("0X"))
    {
        (16, hex)
    } else if let Some(bin) = unsigned
        .strip_prefix("0b")
        .or_else(|| unsigned.strip_prefix("0B"))
    {
        (2, bin)
    } else {
        (10, unsigned)
    };

    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return Err(AddressError::NotANumber(s.to_string()));
    }

    // Any negative value, even zero written as "-0", is not an address.
    if negative {
        return Err(AddressError::OutOfRange(s.to_string()));
    }

    u32::from_str_radix(digits, radix).map_err(|_| AddressError::OutOfRange(s.to_string()))
}

/// A half-open address range `[start, end)` computed in 64-bit space so that
/// blocks ending exactly at the top of the 32-bit space are representable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    start: u64,
    end: u64,
}

impl Span {
    pub fn new(start: u64, end: u64) -> Self {
        debug_assert!(start <= end, "span start exceeds end");
        Self { start, end }
    }

    /// Span covered by a block of `len` bytes at `address`.
    pub fn of_block(address: u32, len: usize) -> Self {
        let start = address as u64;
        Self::new(start, start.saturating_add(len as u64))
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn end(&self) -> u64 {
        self.end
    }

    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Return the non-empty intersection of two spans, if any.
    pub fn intersection(&self, other: &Span) -> Option<Span> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        (start < end).then_some(Span { start, end })
    }
}
