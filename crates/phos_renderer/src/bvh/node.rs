use phos_math::simd::{Aabb8, LANES};

/// One 8-wide interior node.
///
/// Slot `i` is a child node when `count[i] == 0` and a leaf batch of
/// `count[i]` triangles otherwise; `offset[i]` indexes the node or batch
/// array respectively. Unused slots have empty bounds and are never hit.
#[derive(Debug, Clone, PartialEq)]
pub struct WideNode {
    pub bounds: Aabb8,
    pub offset: [u32; LANES],
    pub count: [u8; LANES],
}

impl Default for WideNode {
    fn default() -> Self {
        Self {
            bounds: Aabb8::EMPTY,
            offset: [u32::MAX; LANES],
            count: [0; LANES],
        }
    }
}

impl WideNode {
    #[inline]
    pub fn is_leaf(&self, slot: usize) -> bool {
        self.count[slot] > 0
    }

    /// Slots holding a child or a leaf.
    pub fn occupied(&self) -> impl Iterator<Item = usize> + '_ {
        (0..LANES).filter(move |&i| self.offset[i] != u32::MAX)
    }
}
