use std::fmt;

/// Position of a node inside the tree's node arena.
#[derive(Copy, Clone, Default, PartialEq, PartialOrd, Eq, Ord, Hash)]
pub struct NodeIndex(u32);

impl NodeIndex {
    /// Largest arena position an index can address.
    pub const MAX: usize = u32::MAX as usize;

    #[inline]
    pub fn new(x: usize) -> Self {
        debug_assert!(x < Self::MAX, "node arena overflow");
        NodeIndex(x as u32)
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for NodeIndex {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "NodeIndex({})", self.0)
    }
}
