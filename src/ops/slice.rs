use crate::BlockMap;
use crate::address::Span;

impl<B: AsRef<[u8]>> BlockMap<B> {
    /// Keep only data within `[address, address + length)`, as views into
    /// this map. Blocks partially inside the range are clipped; `usize::MAX`
    /// slices to the end of the address space.
    pub fn slice(&self, address: u32, length: usize) -> BlockMap<&[u8]> {
        let range = Span::of_block(address, length);
        let mut sliced = BlockMap::new();

        for (&block_addr, block) in self {
            let data = block.as_ref();
            let span = Span::of_block(block_addr, data.len());
            if let Some(intersection) = span.intersection(&range) {
                let start = (intersection.start() - span.start()) as usize;
                let end = (intersection.end() - span.start()) as usize;
                // intersection.start() lies within a u32 block, so it fits
                sliced.set(intersection.start() as u32, &data[start..end]);
            }
        }

        sliced
    }

    /// Copy `[address, address + length)` into a single buffer, with
    /// `pad_byte` wherever no block holds data.
    ///
    /// The whole buffer is allocated up front, so `length` must be a real
    /// byte count; unlike `slice`, `usize::MAX` does not mean "to the end".
    pub fn slice_pad(&self, address: u32, length: usize, pad_byte: u8) -> Vec<u8> {
        let mut out = vec![pad_byte; length];
        for (&block_addr, data) in &self.slice(address, length) {
            let offset = (block_addr - address) as usize;
            out[offset..offset + data.len()].copy_from_slice(data);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use crate::BlockMap;

    #[test]
    fn test_slice_clips_block() {
        let map = BlockMap::from_blocks([(10, b"ABCDE".to_vec())]);
        let sliced = map.slice(12, 2);
        assert_eq!(sliced.len(), 1);
        assert_eq!(sliced.get(12), Some(&&b"CD"[..]));
    }

    #[test]
    fn test_slice_removes_outside() {
        let map = BlockMap::from_blocks([
            (0x1000, vec![0x01, 0x02]),
            (0x2000, vec![0x03, 0x04]),
            (0x3000, vec![0x05, 0x06]),
        ]);
        let sliced = map.slice(0x2000, 0x1000);
        assert_eq!(sliced.keys().collect::<Vec<_>>(), vec![0x2000]);
    }

    #[test]
    fn test_slice_adjacent_block_is_omitted() {
        let map = BlockMap::from_blocks([(0x10, vec![1, 2]), (0x14, vec![3])]);
        // [0x12, 0x14) touches both blocks without intersecting either
        assert!(map.slice(0x12, 2).is_empty());
    }

    #[test]
    fn test_slice_spanning_blocks() {
        let map = BlockMap::from_blocks([(0x10, vec![1, 2, 3]), (0x20, vec![4, 5, 6])]);
        let sliced = map.slice(0x11, 0x11);
        assert_eq!(sliced.get(0x11), Some(&&[2u8, 3][..]));
        assert_eq!(sliced.get(0x20), Some(&&[4u8, 5][..]));
    }

    #[test]
    fn test_slice_zero_length_is_empty() {
        let map = BlockMap::from_blocks([(0, vec![1, 2, 3])]);
        assert!(map.slice(1, 0).is_empty());
    }

    #[test]
    fn test_slice_to_end_of_space() {
        let map = BlockMap::from_blocks([(0x10, vec![1]), (0xFFFF_FFFF, vec![2])]);
        let sliced = map.slice(0x11, usize::MAX);
        assert_eq!(sliced.keys().collect::<Vec<_>>(), vec![0xFFFF_FFFF]);
    }

    #[test]
    fn test_slice_is_a_view() {
        let map = BlockMap::from_blocks([(0, vec![7u8; 8])]);
        let sliced = map.slice(2, 4);
        let view = *sliced.get(2).unwrap();
        assert!(std::ptr::eq(view.as_ptr(), map.get(0).unwrap()[2..].as_ptr()));
    }

    #[test]
    fn test_slice_pad() {
        let map = BlockMap::from_blocks([(0x10, vec![1, 2]), (0x14, vec![3])]);
        assert_eq!(
            map.slice_pad(0x0F, 7, 0xFF),
            vec![0xFF, 1, 2, 0xFF, 0xFF, 3, 0xFF]
        );
        assert_eq!(map.slice_pad(0x100, 2, 0x00), vec![0x00, 0x00]);
    }
}
