//! Per-worker scratch memory for transient shading objects.

use bumpalo::Bump;

use crate::error::{RenderError, RenderResult};

/// Bump allocator scoped to one tile.
///
/// Invariant: nothing allocated here owns a resource that needs cleanup.
/// [`TileArena::reset`] frees everything at once without running
/// destructors, which is only sound for types without drop glue. The
/// `T: Copy` bound on [`TileArena::alloc`] enforces this at compile time;
/// do not relax it.
pub struct TileArena {
    bump: Bump,
    budget: usize,
}

impl TileArena {
    /// Create an arena that refuses to grow past `budget` bytes.
    pub fn new(budget: usize) -> Self {
        let bump = Bump::with_capacity(budget.min(64 * 1024));
        bump.set_allocation_limit(Some(budget));
        Self { bump, budget }
    }

    /// Move `value` into the arena.
    ///
    /// The returned reference lives until the next [`reset`](Self::reset).
    pub fn alloc<T: Copy>(&self, value: T) -> RenderResult<&T> {
        self.bump
            .try_alloc(value)
            .map(|v| &*v)
            .map_err(|_| RenderError::ArenaExhausted {
                budget: self.budget,
            })
    }

    /// Bytes handed out since the last reset.
    pub fn allocated_bytes(&self) -> usize {
        self.bump.allocated_bytes()
    }

    /// Invalidate every allocation from this epoch.
    pub fn reset(&mut self) {
        self.bump.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alloc_and_reset() {
        let mut arena = TileArena::new(1 << 16);
        {
            let a = arena.alloc(7u64).unwrap();
            let b = arena.alloc([1.0f32; 4]).unwrap();
            assert_eq!(*a, 7);
            assert_eq!(b[3], 1.0);
        }
        assert!(arena.allocated_bytes() > 0);

        arena.reset();
        let c = arena.alloc(3u8).unwrap();
        assert_eq!(*c, 3);
    }

    #[test]
    fn test_budget_is_enforced() {
        let arena = TileArena::new(1024);
        let exhausted = (0..64)
            .map(|_| arena.alloc([0u8; 256]))
            .find_map(|r| r.err());
        assert_eq!(exhausted, Some(RenderError::ArenaExhausted { budget: 1024 }));
    }
}
