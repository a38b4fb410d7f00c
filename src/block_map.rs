use std::collections::BTreeMap;
use std::collections::btree_map;

use log::{debug, trace};
use thiserror::Error;

use crate::address::{AddressError, Span, parse_address};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BlockMapError {
    #[error(
        "overlapping blocks at address {address:#X}: previous block covers {previous_start:#X}..{previous_end:#X}"
    )]
    OverlappingBlocks {
        address: u32,
        previous_start: u32,
        previous_end: u64,
    },

    #[error("invalid block key {key:?}: not an integer")]
    InvalidInput { key: String },

    #[error("invalid block address {key:?}: outside the 32-bit address space")]
    InvalidAddress { key: String },
}

/// A sparse set of byte blocks keyed by absolute start address.
///
/// Insertion never checks for overlap; `join()` and the Intel-HEX writer do,
/// and fail on it. Iteration is always in ascending address order.
///
/// `B` is the block storage: `Vec<u8>` for owned maps, `&[u8]` for zero-copy
/// views produced by `slice()`, `from_padded_buffer()` and `flatten_overlaps()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockMap<B = Vec<u8>> {
    blocks: BTreeMap<u32, B>,
}

impl<B> Default for BlockMap<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B> BlockMap<B> {
    pub fn new() -> Self {
        Self {
            blocks: BTreeMap::new(),
        }
    }

    pub fn from_blocks(blocks: impl IntoIterator<Item = (u32, B)>) -> Self {
        blocks.into_iter().collect()
    }

    /// Build from a collection keyed by address strings ("4096", "0x1000", ...).
    pub fn from_keyed<K, I>(entries: I) -> Result<Self, BlockMapError>
    where
        K: AsRef<str>,
        I: IntoIterator<Item = (K, B)>,
    {
        let mut map = Self::new();
        for (key, block) in entries {
            let key = key.as_ref();
            let address = parse_address(key).map_err(|e| match e {
                AddressError::NotANumber(_) => BlockMapError::InvalidInput {
                    key: key.to_string(),
                },
                AddressError::OutOfRange(_) => BlockMapError::InvalidAddress {
                    key: key.to_string(),
                },
            })?;
            map.set(address, block);
        }
        Ok(map)
    }

    /// Insert or overwrite the block at `address`. Returns the previous block.
    pub fn set(&mut self, address: u32, block: B) -> Option<B> {
        self.blocks.insert(address, block)
    }

    pub fn get(&self, address: u32) -> Option<&B> {
        self.blocks.get(&address)
    }

    pub fn has(&self, address: u32) -> bool {
        self.blocks.contains_key(&address)
    }

    pub fn remove(&mut self, address: u32) -> Option<B> {
        self.blocks.remove(&address)
    }

    pub fn clear(&mut self) {
        self.blocks.clear();
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn keys(&self) -> impl DoubleEndedIterator<Item = u32> + '_ {
        self.blocks.keys().copied()
    }

    pub fn values(&self) -> impl DoubleEndedIterator<Item = &B> + '_ {
        self.blocks.values()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, u32, B> {
        self.blocks.iter()
    }

    pub(crate) fn blocks_mut(&mut self) -> &mut BTreeMap<u32, B> {
        &mut self.blocks
    }

    /// The block with the greatest start address not above `address`.
    pub(crate) fn floor(&self, address: u32) -> Option<(u32, &B)> {
        self.blocks
            .range(..=address)
            .next_back()
            .map(|(&addr, block)| (addr, block))
    }
}

impl<B: AsRef<[u8]>> BlockMap<B> {
    pub fn total_len(&self) -> usize {
        self.blocks.values().map(|b| b.as_ref().len()).sum()
    }

    pub fn min_address(&self) -> Option<u32> {
        self.blocks.keys().next().copied()
    }

    /// One past the last byte of the highest-ending block.
    pub fn max_address(&self) -> Option<u64> {
        self.blocks
            .iter()
            .map(|(&addr, block)| Span::of_block(addr, block.as_ref().len()).end())
            .max()
    }

    /// Count gaps between consecutive blocks.
    pub fn gap_count(&self) -> usize {
        let spans: Vec<_> = self
            .blocks
            .iter()
            .map(|(&addr, block)| Span::of_block(addr, block.as_ref().len()))
            .collect();
        spans
            .windows(2)
            .filter(|w| w[0].end() != w[1].start())
            .count()
    }

    /// Coalesce adjacent blocks into freshly allocated runs of at most
    /// `max_block_size` bytes. Pass `usize::MAX` for no cap.
    ///
    /// A single block longer than the cap is kept whole. Fails if any block
    /// starts before the end of the previous one.
    pub fn join(&self, max_block_size: usize) -> Result<BlockMap, BlockMapError> {
        let mut runs: Vec<(u32, Vec<u8>)> = Vec::with_capacity(self.blocks.len());
        let mut run_end: Option<u64> = None;

        for (&addr, block) in &self.blocks {
            let data = block.as_ref();
            if let (Some(end), Some((run_start, run))) = (run_end, runs.last_mut()) {
                let start = addr as u64;
                if start < end {
                    return Err(BlockMapError::OverlappingBlocks {
                        address: addr,
                        previous_start: *run_start,
                        previous_end: end,
                    });
                }
                if start == end && run.len().saturating_add(data.len()) <= max_block_size {
                    run.extend_from_slice(data);
                    run_end = Some(end + data.len() as u64);
                    continue;
                }
            }
            trace!("join: new run at {addr:#X}");
            runs.push((addr, data.to_vec()));
            run_end = Some(Span::of_block(addr, data.len()).end());
        }

        debug!(
            "join: {} blocks into {} runs (max block size {max_block_size})",
            self.blocks.len(),
            runs.len()
        );
        Ok(BlockMap::from_blocks(runs))
    }

    /// Read a 32-bit word at `offset`. Returns None unless a single block
    /// holds all four bytes.
    pub fn get_u32(&self, offset: u32, little_endian: bool) -> Option<u32> {
        let wanted = Span::of_block(offset, 4);
        for (&addr, block) in &self.blocks {
            let data = block.as_ref();
            let span = Span::of_block(addr, data.len());
            if span.start() <= wanted.start() && wanted.end() <= span.end() {
                let at = (offset - addr) as usize;
                let word: [u8; 4] = data[at..at + 4].try_into().ok()?;
                return Some(if little_endian {
                    u32::from_le_bytes(word)
                } else {
                    u32::from_be_bytes(word)
                });
            }
        }
        None
    }

    /// True when every block of `other` is found in `self` with the same bytes.
    /// An empty block in `other` is never found.
    pub fn contains<C: AsRef<[u8]>>(&self, other: &BlockMap<C>) -> bool {
        other.iter().all(|(&addr, block)| {
            let block = block.as_ref();
            let Ok(joined) = self.slice(addr, block.len()).join(usize::MAX) else {
                return false;
            };
            joined.get(addr).is_some_and(|found| found.as_slice() == block)
        })
    }

    /// Deep copy into an owned map; every block is reallocated.
    pub fn to_owned_map(&self) -> BlockMap {
        self.blocks
            .iter()
            .map(|(&addr, block)| (addr, block.as_ref().to_vec()))
            .collect()
    }
}

impl<B> FromIterator<(u32, B)> for BlockMap<B> {
    fn from_iter<I: IntoIterator<Item = (u32, B)>>(iter: I) -> Self {
        Self {
            blocks: iter.into_iter().collect(),
        }
    }
}

impl<'a, B> IntoIterator for &'a BlockMap<B> {
    type Item = (&'a u32, &'a B);
    type IntoIter = btree_map::Iter<'a, u32, B>;

    fn into_iter(self) -> Self::IntoIter {
        self.blocks.iter()
    }
}

impl<B> IntoIterator for BlockMap<B> {
    type Item = (u32, B);
    type IntoIter = btree_map::IntoIter<u32, B>;

    fn into_iter(self) -> Self::IntoIter {
        self.blocks.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_last_write_wins() {
        let mut map = BlockMap::new();
        map.set(0x100, vec![0x01]);
        let previous = map.set(0x100, vec![0x02, 0x03]);
        assert_eq!(previous, Some(vec![0x01]));
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(0x100), Some(&vec![0x02, 0x03]));
    }

    #[test]
    fn test_has_remove_clear() {
        let mut map = BlockMap::from_blocks([(0x10, vec![1]), (0x20, vec![2])]);
        assert!(map.has(0x10));
        assert_eq!(map.remove(0x10), Some(vec![1]));
        assert!(!map.has(0x10));
        map.clear();
        assert!(map.is_empty());
    }

    #[test]
    fn test_iteration_is_ascending() {
        let map = BlockMap::from_blocks([
            (0x300, vec![0x03]),
            (0x100, vec![0x01]),
            (0x200, vec![0x02]),
        ]);
        assert_eq!(map.keys().collect::<Vec<_>>(), vec![0x100, 0x200, 0x300]);
    }

    #[test]
    fn test_from_keyed() {
        let map = BlockMap::from_keyed([("16", vec![0xAA]), ("0x20", vec![0xBB])]).unwrap();
        assert_eq!(map.get(16), Some(&vec![0xAA]));
        assert_eq!(map.get(0x20), Some(&vec![0xBB]));
    }

    #[test]
    fn test_from_keyed_rejects_non_numeric_key() {
        let result = BlockMap::from_keyed([("start", vec![0xAA])]);
        assert!(matches!(result, Err(BlockMapError::InvalidInput { .. })));
    }

    #[test]
    fn test_from_keyed_rejects_negative_key() {
        let result = BlockMap::from_keyed([("-4", vec![0xAA])]);
        assert!(matches!(result, Err(BlockMapError::InvalidAddress { .. })));
    }

    #[test]
    fn test_join_merges_contiguous() {
        let map = BlockMap::from_blocks([(0x100, vec![0x01, 0x02]), (0x102, vec![0x03, 0x04])]);
        let joined = map.join(usize::MAX).unwrap();
        assert_eq!(joined.len(), 1);
        assert_eq!(joined.get(0x100), Some(&vec![0x01, 0x02, 0x03, 0x04]));
    }

    #[test]
    fn test_join_preserves_gaps() {
        let map = BlockMap::from_blocks([(0x100, vec![0x01, 0x02]), (0x200, vec![0x03, 0x04])]);
        let joined = map.join(usize::MAX).unwrap();
        assert_eq!(joined.len(), 2);
        assert_eq!(joined.gap_count(), 1);
    }

    #[test]
    fn test_join_errors_on_overlap() {
        let map = BlockMap::from_blocks([
            (0, (0u8..10).collect::<Vec<_>>()),
            (5, (5u8..15).collect::<Vec<_>>()),
        ]);
        assert_eq!(
            map.join(usize::MAX),
            Err(BlockMapError::OverlappingBlocks {
                address: 5,
                previous_start: 0,
                previous_end: 10,
            })
        );
    }

    #[test]
    fn test_join_respects_max_block_size() {
        let map = BlockMap::from_blocks([
            (0, vec![0xAA; 4]),
            (4, vec![0xBB; 4]),
            (8, vec![0xCC; 4]),
        ]);
        let joined = map.join(8).unwrap();
        assert_eq!(joined.keys().collect::<Vec<_>>(), vec![0, 8]);
        assert_eq!(joined.get(0).unwrap().len(), 8);
        assert_eq!(joined.get(8), Some(&vec![0xCC; 4]));
    }

    #[test]
    fn test_join_keeps_oversized_block_whole() {
        let map = BlockMap::from_blocks([(0, vec![0xAA; 16]), (16, vec![0xBB; 2])]);
        let joined = map.join(8).unwrap();
        assert_eq!(joined.get(0).unwrap().len(), 16);
        assert_eq!(joined.get(16).unwrap().len(), 2);
    }

    #[test]
    fn test_join_is_idempotent() {
        let map = BlockMap::from_blocks([
            (0x10, vec![1, 2]),
            (0x12, vec![3]),
            (0x40, vec![4]),
        ]);
        let once = map.join(usize::MAX).unwrap();
        let twice = once.join(usize::MAX).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_join_block_ending_at_top_of_address_space() {
        let map = BlockMap::from_blocks([(0xFFFF_FFFE, vec![1]), (0xFFFF_FFFF, vec![2])]);
        let joined = map.join(usize::MAX).unwrap();
        assert_eq!(joined.get(0xFFFF_FFFE), Some(&vec![1, 2]));
        assert_eq!(joined.max_address(), Some(1 << 32));
    }

    #[test]
    fn test_get_u32_endianness() {
        let map = BlockMap::from_blocks([(0x100, vec![0x11, 0x22, 0x33, 0x44, 0x55])]);
        assert_eq!(map.get_u32(0x100, false), Some(0x1122_3344));
        assert_eq!(map.get_u32(0x101, true), Some(0x5544_3322));
    }

    #[test]
    fn test_get_u32_not_found() {
        let map = BlockMap::from_blocks([(0x100, vec![0x11, 0x22]), (0x102, vec![0x33, 0x44])]);
        // the word spans two blocks
        assert_eq!(map.get_u32(0x100, false), None);
        assert_eq!(map.get_u32(0x200, false), None);
        assert_eq!(map.get_u32(0x0FF, false), None);
    }

    #[test]
    fn test_contains() {
        let map = BlockMap::from_blocks([(0x100, vec![1, 2, 3]), (0x103, vec![4, 5])]);
        let inner = BlockMap::from_blocks([(0x102, vec![3, 4])]);
        let different = BlockMap::from_blocks([(0x102, vec![3, 9])]);
        let outside = BlockMap::from_blocks([(0x104, vec![5, 6])]);
        assert!(map.contains(&inner));
        assert!(!map.contains(&different));
        assert!(!map.contains(&outside));
        assert!(map.contains(&BlockMap::<Vec<u8>>::new()));
    }

    #[test]
    fn test_contains_empty_block_is_not_found() {
        let map = BlockMap::from_blocks([(0x100, vec![1, 2, 3])]);
        assert!(!map.contains(&BlockMap::from_blocks([(0x101, Vec::<u8>::new())])));
        assert!(!map.contains(&BlockMap::from_blocks([(0x500, Vec::<u8>::new())])));
    }

    #[test]
    fn test_from_keyed_trailing_b_is_not_binary() {
        let result = BlockMap::from_keyed([("10b", vec![0xAA]), ("1b", vec![0xBB])]);
        assert_eq!(
            result,
            Err(BlockMapError::InvalidInput {
                key: "10b".to_string()
            })
        );
    }

    #[test]
    fn test_to_owned_map_is_deep() {
        let source = vec![1u8, 2, 3, 4];
        let view = BlockMap::from_blocks([(0x10, &source[1..3])]);
        let owned = view.to_owned_map();
        drop(view);
        assert_eq!(owned.get(0x10), Some(&vec![2, 3]));
    }

    #[test]
    fn test_inspection_helpers() {
        let map = BlockMap::from_blocks([(0x10, vec![1, 2]), (0x20, vec![3])]);
        assert_eq!(map.total_len(), 3);
        assert_eq!(map.min_address(), Some(0x10));
        assert_eq!(map.max_address(), Some(0x21));
        assert_eq!(BlockMap::<Vec<u8>>::new().max_address(), None);
    }
}
