use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OpsError {
    #[error("page size must be greater than zero, got {0}")]
    InvalidPageSize(u32),

    #[error("buffer of {length} bytes does not fit the 32-bit address space")]
    AddressOverflow { length: usize },
}
