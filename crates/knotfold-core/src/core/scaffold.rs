/// Index arithmetic for a fixed-shape complete binary tree over the polygon's vertices.
///
/// The tree is laid out in heap order: the root has id 1, node `i` has children
/// `2i` and `2i + 1`, and the leaves occupy ids `m..2m` where `m` is the vertex
/// count rounded up to a power of two. Leaf `m + v` corresponds to vertex `v`.
/// Vertices beyond `leaf_count` are padding; their ranges clip to empty and no
/// traversal ever descends into them.
///
/// The shape is fixed at construction and every query is O(1), so the engine can
/// store all per-node state in one flat array indexed by node id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeScaffold {
    leaf_count: usize,
    padded: usize,
    max_depth: u32,
}

impl TreeScaffold {
    /// Builds the scaffold for a polygon with `leaf_count` vertices.
    pub fn new(leaf_count: usize) -> Self {
        debug_assert!(leaf_count > 0, "scaffold needs at least one leaf");
        let padded = leaf_count.next_power_of_two();
        Self {
            leaf_count,
            padded,
            max_depth: padded.ilog2(),
        }
    }

    /// Number of real (non-padding) leaves, i.e. polygon vertices.
    pub fn leaf_count(&self) -> usize {
        self.leaf_count
    }

    /// Total number of node-id slots, including the unused slot 0.
    pub fn node_count(&self) -> usize {
        2 * self.padded
    }

    /// Depth of the leaf level; the root sits at depth 0.
    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    pub fn root(&self) -> usize {
        1
    }

    pub fn parent(&self, id: usize) -> usize {
        id >> 1
    }

    pub fn children(&self, id: usize) -> (usize, usize) {
        (2 * id, 2 * id + 1)
    }

    pub fn depth(&self, id: usize) -> u32 {
        debug_assert!(id >= 1 && id < self.node_count());
        id.ilog2()
    }

    pub fn is_leaf(&self, id: usize) -> bool {
        id >= self.padded
    }

    pub fn is_interior(&self, id: usize) -> bool {
        id < self.padded
    }

    /// Node id of the leaf holding vertex `vertex`.
    pub fn leaf_id(&self, vertex: usize) -> usize {
        debug_assert!(vertex < self.leaf_count);
        self.padded + vertex
    }

    /// Vertex index held by leaf node `id`.
    pub fn leaf_index(&self, id: usize) -> usize {
        debug_assert!(self.is_leaf(id));
        id - self.padded
    }

    /// Half-open vertex range `[begin, end)` covered by node `id`, clipped to
    /// the real leaf count. Padding-only subtrees yield an empty range.
    pub fn node_range(&self, id: usize) -> (usize, usize) {
        let depth = self.depth(id);
        let width = self.padded >> depth;
        let begin = (id - (1 << depth)) * width;
        let end = (begin + width).min(self.leaf_count);
        (begin.min(self.leaf_count), end)
    }
}
