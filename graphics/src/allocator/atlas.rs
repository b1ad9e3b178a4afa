//! Rectangle allocator for texture atlas slices.

/// A rectangle in allocator units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct AtlasRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl AtlasRect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    fn right(&self) -> u32 {
        self.x + self.width
    }

    fn bottom(&self) -> u32 {
        self.y + self.height
    }

    pub fn intersects(&self, other: &AtlasRect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    /// The union of two rectangles that share one full edge.
    fn merge(&self, other: &AtlasRect) -> Option<AtlasRect> {
        if self.y == other.y && self.height == other.height {
            if self.right() == other.x {
                return Some(AtlasRect::new(self.x, self.y, self.width + other.width, self.height));
            }
            if other.right() == self.x {
                return Some(AtlasRect::new(other.x, self.y, self.width + other.width, self.height));
            }
        }
        if self.x == other.x && self.width == other.width {
            if self.bottom() == other.y {
                return Some(AtlasRect::new(self.x, self.y, self.width, self.height + other.height));
            }
            if other.bottom() == self.y {
                return Some(AtlasRect::new(
                    self.x,
                    other.y,
                    self.width,
                    self.height + other.height,
                ));
            }
        }
        None
    }
}

/// Best-fit guillotine allocator over a `width` x `height` grid.
///
/// Free space is a list of disjoint rectangles. Freed rectangles are merged
/// back with free neighbours that share a full edge.
#[derive(Debug, Clone)]
pub struct DynamicAtlasAllocator {
    width: u32,
    height: u32,
    free_rects: Vec<AtlasRect>,
    allocated_area: u64,
}

impl DynamicAtlasAllocator {
    pub fn new(width: u32, height: u32) -> Self {
        let free_rects = if width > 0 && height > 0 {
            vec![AtlasRect::new(0, 0, width, height)]
        } else {
            Vec::new()
        };
        Self {
            width,
            height,
            free_rects,
            allocated_area: 0,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn is_empty(&self) -> bool {
        self.allocated_area == 0
    }

    pub fn free_area(&self) -> u64 {
        self.width as u64 * self.height as u64 - self.allocated_area
    }

    pub fn allocate(&mut self, width: u32, height: u32) -> Option<AtlasRect> {
        if width == 0 || height == 0 {
            return None;
        }
        let (index, _) = self
            .free_rects
            .iter()
            .enumerate()
            .filter(|(_, r)| r.width >= width && r.height >= height)
            .min_by_key(|(_, r)| r.area())?;

        let rect = self.free_rects.swap_remove(index);
        let rest_w = rect.width - width;
        let rest_h = rect.height - height;

        // Split along the axis that keeps the larger leftover in one piece.
        let (right, below) = if rest_w > rest_h {
            (
                AtlasRect::new(rect.x + width, rect.y, rest_w, rect.height),
                AtlasRect::new(rect.x, rect.y + height, width, rest_h),
            )
        } else {
            (
                AtlasRect::new(rect.x + width, rect.y, rest_w, height),
                AtlasRect::new(rect.x, rect.y + height, rect.width, rest_h),
            )
        };
        for piece in [right, below] {
            if piece.area() > 0 {
                self.free_rects.push(piece);
            }
        }

        self.allocated_area += width as u64 * height as u64;
        Some(AtlasRect::new(rect.x, rect.y, width, height))
    }

    pub fn free(&mut self, rect: AtlasRect) {
        debug_assert!(
            !self.free_rects.iter().any(|r| r.intersects(&rect)),
            "double free of {rect:?}"
        );
        self.allocated_area -= rect.area();
        if self.allocated_area == 0 {
            self.free_rects = vec![AtlasRect::new(0, 0, self.width, self.height)];
            return;
        }

        let mut current = rect;
        while let Some((index, merged)) = self
            .free_rects
            .iter()
            .enumerate()
            .find_map(|(i, r)| current.merge(r).map(|m| (i, m)))
        {
            self.free_rects.swap_remove(index);
            current = merged;
        }
        self.free_rects.push(current);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocations_do_not_overlap() {
        let mut atlas = DynamicAtlasAllocator::new(8, 8);
        let rects: Vec<_> = (0..16).map(|_| atlas.allocate(2, 2).unwrap()).collect();
        for (i, a) in rects.iter().enumerate() {
            assert!(a.right() <= 8 && a.bottom() <= 8);
            for b in &rects[i + 1..] {
                assert!(!a.intersects(b));
            }
        }
        assert!(atlas.allocate(1, 1).is_none());
    }

    #[test]
    fn test_free_restores_full_area() {
        let mut atlas = DynamicAtlasAllocator::new(4, 4);
        let a = atlas.allocate(3, 1).unwrap();
        let b = atlas.allocate(1, 3).unwrap();
        let c = atlas.allocate(2, 2).unwrap();
        atlas.free(b);
        atlas.free(a);
        atlas.free(c);
        assert!(atlas.is_empty());
        assert_eq!(atlas.allocate(4, 4), Some(AtlasRect::new(0, 0, 4, 4)));
    }

    #[test]
    fn test_oversized_request() {
        let mut atlas = DynamicAtlasAllocator::new(4, 2);
        assert!(atlas.allocate(5, 1).is_none());
        assert!(atlas.allocate(4, 2).is_some());
    }
}
