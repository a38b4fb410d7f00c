use thiserror::Error;

use crate::{BlockMapError, OpsError, ParseError, WriteError};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Write(#[from] WriteError),

    #[error(transparent)]
    BlockMap(#[from] BlockMapError),

    #[error(transparent)]
    Ops(#[from] OpsError),
}
