mod error;
mod overlap;
mod padding;
mod paginate;
mod slice;

pub use error::OpsError;
pub use overlap::{Overlaps, flatten_overlaps, overlap_block_maps};
pub use padding::{PaddingOptions, from_padded_buffer};
pub use paginate::PageOptions;
