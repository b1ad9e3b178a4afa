//! Free-list allocator over a linear range.

use std::collections::BTreeMap;

/// A range handed out by [`VariableSizeAllocator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Allocation {
    pub offset: u64,
    pub size: u64,
}

impl Allocation {
    pub fn end(&self) -> u64 {
        self.offset + self.size
    }
}

/// Aligned first-fit allocator with coalescing frees.
///
/// Free blocks are kept sorted by offset. Padding skipped to satisfy an
/// alignment stays in the free list.
#[derive(Debug, Clone)]
pub struct VariableSizeAllocator {
    max_size: u64,
    free_size: u64,
    free_blocks: BTreeMap<u64, u64>,
}

impl VariableSizeAllocator {
    pub fn new(max_size: u64) -> Self {
        let mut free_blocks = BTreeMap::new();
        if max_size > 0 {
            free_blocks.insert(0, max_size);
        }
        Self {
            max_size,
            free_size: max_size,
            free_blocks,
        }
    }

    pub fn max_size(&self) -> u64 {
        self.max_size
    }

    pub fn free_size(&self) -> u64 {
        self.free_size
    }

    pub fn used_size(&self) -> u64 {
        self.max_size - self.free_size
    }

    /// True when nothing is allocated.
    pub fn is_empty(&self) -> bool {
        self.free_size == self.max_size
    }

    /// Allocate `size` units at an offset that is a multiple of `alignment`.
    ///
    /// Returns `None` for zero-sized requests and when no free block fits.
    pub fn allocate(&mut self, size: u64, alignment: u64) -> Option<Allocation> {
        if size == 0 || size > self.free_size {
            return None;
        }
        let alignment = alignment.max(1);

        let (block_offset, block_size, offset) =
            self.free_blocks.iter().find_map(|(&start, &len)| {
                let aligned = start.div_ceil(alignment) * alignment;
                (aligned + size <= start + len).then_some((start, len, aligned))
            })?;

        self.free_blocks.remove(&block_offset);
        if offset > block_offset {
            self.free_blocks.insert(block_offset, offset - block_offset);
        }
        let end = offset + size;
        let block_end = block_offset + block_size;
        if end < block_end {
            self.free_blocks.insert(end, block_end - end);
        }
        self.free_size -= size;

        Some(Allocation { offset, size })
    }

    /// Return a range to the free list, merging it with free neighbours.
    pub fn free(&mut self, allocation: Allocation) {
        debug_assert!(allocation.end() <= self.max_size);
        let mut offset = allocation.offset;
        let mut size = allocation.size;

        if let Some((&prev, &prev_size)) = self.free_blocks.range(..offset).next_back() {
            debug_assert!(prev + prev_size <= offset, "double free at {offset}");
            if prev + prev_size == offset {
                self.free_blocks.remove(&prev);
                offset = prev;
                size += prev_size;
            }
        }
        if let Some(&next_size) = self.free_blocks.get(&(offset + size)) {
            self.free_blocks.remove(&(offset + size));
            size += next_size;
        }

        self.free_blocks.insert(offset, size);
        self.free_size += allocation.size;
    }

    /// Grow the managed range to `new_max_size`.
    pub fn extend(&mut self, new_max_size: u64) {
        if new_max_size <= self.max_size {
            return;
        }
        let added = new_max_size - self.max_size;
        let old_max = self.max_size;
        self.max_size = new_max_size;
        self.free_size += added;
        match self.free_blocks.iter().next_back().map(|(&o, &s)| (o, s)) {
            Some((last, last_size)) if last + last_size == old_max => {
                self.free_blocks.insert(last, last_size + added);
            }
            _ => {
                self.free_blocks.insert(old_max, added);
            }
        }
    }

    /// Number of disjoint free blocks.
    pub fn free_block_count(&self) -> usize {
        self.free_blocks.len()
    }
}
