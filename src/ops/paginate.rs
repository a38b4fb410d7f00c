use log::debug;

use super::OpsError;
use crate::BlockMap;
use crate::address::Span;

/// Options for paginate operations.
#[derive(Debug, Clone)]
pub struct PageOptions {
    /// Page size in bytes; pages start at multiples of it.
    pub page_size: u32,
    /// Byte to use for padding (default 0xFF)
    pub pad_byte: u8,
}

impl Default for PageOptions {
    fn default() -> Self {
        Self {
            page_size: 1024,
            pad_byte: 0xFF,
        }
    }
}

fn align_down(addr: u64, page_size: u64) -> u64 {
    addr - addr % page_size
}

impl<B: AsRef<[u8]>> BlockMap<B> {
    /// Re-chunk data into page-aligned blocks of exactly `page_size` bytes.
    /// Pages with no data are not created; unused bytes of a page hold the pad byte.
    pub fn paginate(&self, options: &PageOptions) -> Result<BlockMap, OpsError> {
        if options.page_size == 0 {
            return Err(OpsError::InvalidPageSize(options.page_size));
        }
        let page_size = options.page_size as u64;
        let mut pages = BlockMap::new();

        for (&addr, block) in self {
            let data = block.as_ref();
            let span = Span::of_block(addr, data.len());
            let mut page_addr = align_down(span.start(), page_size);

            while page_addr < span.end() {
                let page_span = Span::new(page_addr, page_addr + page_size);
                let Some(covered) = span.intersection(&page_span) else {
                    break;
                };

                // page_addr <= covered.start(), which is a u32 address
                let page = pages
                    .blocks_mut()
                    .entry(page_addr as u32)
                    .or_insert_with(|| vec![options.pad_byte; options.page_size as usize]);

                let src = (covered.start() - span.start()) as usize;
                let dst = (covered.start() - page_addr) as usize;
                let len = covered.len() as usize;
                page[dst..dst + len].copy_from_slice(&data[src..src + len]);

                page_addr += page_size;
            }
        }

        debug!(
            "paginate: {} blocks into {} pages of {} bytes",
            self.len(),
            pages.len(),
            options.page_size
        );
        Ok(pages)
    }
}
