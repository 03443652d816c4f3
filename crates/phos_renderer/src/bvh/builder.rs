//! Binned SAH construction of a binary tree, then collapse to 8-wide nodes.

use phos_core::GeometryPool;
use phos_math::simd::LANES;
use phos_math::{Aabb, Vec3};

use super::batch::TriangleBatch;
use super::node::WideNode;

/// Number of centroid bins evaluated per axis.
pub const SAH_BINS: usize = 12;

/// Largest leaf the builder will emit; one triangle batch.
pub const MAX_LEAF_SIZE: usize = LANES;

/// Cost of one traversal step relative to one triangle test.
const TRAVERSAL_COST: f32 = 1.0;

#[derive(Debug, Copy, Clone)]
struct PrimInfo {
    bounds: Aabb,
    centroid: Vec3,
    face: u32,
}

/// Binary build tree. Leaves refer to a range of the reordered primitives.
enum BuildNode {
    Leaf {
        bounds: Aabb,
        start: usize,
        count: usize,
    },
    Interior {
        bounds: Aabb,
        children: [Box<BuildNode>; 2],
    },
}

impl BuildNode {
    fn bounds(&self) -> &Aabb {
        match self {
            BuildNode::Leaf { bounds, .. } | BuildNode::Interior { bounds, .. } => bounds,
        }
    }
}

#[derive(Debug, Copy, Clone, Default)]
struct Bin {
    bounds: Aabb,
    count: usize,
}

#[derive(Debug, Copy, Clone)]
struct Split {
    axis: usize,
    bin: usize,
    cost: f32,
}

/// Result of a build: wide nodes (root first) and the leaf batches they
/// point to.
pub(crate) struct BuildOutput {
    pub nodes: Vec<WideNode>,
    pub batches: Vec<TriangleBatch>,
    pub depth: usize,
}

fn bin_index(centroid_bounds: &Aabb, centroid: Vec3, axis: usize) -> usize {
    let rel = centroid_bounds.offset(centroid)[axis];
    ((SAH_BINS as f32 * rel) as usize).min(SAH_BINS - 1)
}

/// Best SAH split over all non-flat axes, or `None` when no bin split
/// separates the primitives.
fn find_split(prims: &[PrimInfo], bounds: &Aabb, centroid_bounds: &Aabb) -> Option<Split> {
    let parent_area = bounds.area();
    let mut best: Option<Split> = None;

    for axis in 0..3 {
        if centroid_bounds.is_flat_on(axis) {
            continue;
        }

        let mut bins = [Bin::default(); SAH_BINS];
        for p in prims {
            let b = &mut bins[bin_index(centroid_bounds, p.centroid, axis)];
            b.count += 1;
            b.bounds = b.bounds.merge(&p.bounds);
        }

        // Right-to-left sweep for the suffix areas
        let mut right_area = [0.0f32; SAH_BINS];
        let mut right_count = [0usize; SAH_BINS];
        let mut acc = Bin::default();
        for i in (1..SAH_BINS).rev() {
            acc.bounds = acc.bounds.merge(&bins[i].bounds);
            acc.count += bins[i].count;
            right_area[i] = acc.bounds.area();
            right_count[i] = acc.count;
        }

        let mut left = Bin::default();
        for i in 0..SAH_BINS - 1 {
            left.bounds = left.bounds.merge(&bins[i].bounds);
            left.count += bins[i].count;
            let n_right = right_count[i + 1];
            if left.count == 0 || n_right == 0 {
                continue;
            }

            let weighted = left.count as f32 * left.bounds.area() + n_right as f32 * right_area[i + 1];
            let cost = if parent_area > 0.0 {
                TRAVERSAL_COST + weighted / parent_area
            } else {
                TRAVERSAL_COST + prims.len() as f32
            };

            if best.map_or(true, |b| cost < b.cost) {
                best = Some(Split { axis, bin: i, cost });
            }
        }
    }

    best
}

/// Move every primitive satisfying `left` to the front; returns how many.
fn partition(prims: &mut [PrimInfo], left: impl Fn(&PrimInfo) -> bool) -> usize {
    let mut mid = 0;
    for i in 0..prims.len() {
        if left(&prims[i]) {
            prims.swap(i, mid);
            mid += 1;
        }
    }
    mid
}

/// Split at the centroid median along the widest centroid axis.
fn median_split(prims: &mut [PrimInfo], centroid_bounds: &Aabb) -> usize {
    let axis = centroid_bounds.dominant_axis();
    let mid = prims.len() / 2;
    prims.select_nth_unstable_by(mid, |a, b| a.centroid[axis].total_cmp(&b.centroid[axis]));
    mid
}

fn build_recursive(prims: &mut [PrimInfo], start: usize, depth: usize, max_depth: &mut usize) -> BuildNode {
    *max_depth = (*max_depth).max(depth);

    let bounds = prims.iter().fold(Aabb::EMPTY, |b, p| b.merge(&p.bounds));
    let count = prims.len();
    if count == 1 {
        return BuildNode::Leaf { bounds, start, count };
    }

    let centroid_bounds = prims
        .iter()
        .fold(Aabb::EMPTY, |b, p| b.merge_point(p.centroid));

    let mid = match find_split(prims, &bounds, &centroid_bounds) {
        Some(split) => {
            let leaf_cost = count as f32;
            if count <= MAX_LEAF_SIZE && leaf_cost < split.cost {
                return BuildNode::Leaf { bounds, start, count };
            }
            let mid = partition(prims, |p| bin_index(&centroid_bounds, p.centroid, split.axis) <= split.bin);
            if mid == 0 || mid == count {
                median_split(prims, &centroid_bounds)
            } else {
                mid
            }
        }
        // Every centroid coincides: no bin split exists
        None => {
            if count <= MAX_LEAF_SIZE {
                return BuildNode::Leaf { bounds, start, count };
            }
            median_split(prims, &centroid_bounds)
        }
    };

    let (left, right) = prims.split_at_mut(mid);
    let l = build_recursive(left, start, depth + 1, max_depth);
    let r = build_recursive(right, start + mid, depth + 1, max_depth);

    BuildNode::Interior {
        bounds,
        children: [Box::new(l), Box::new(r)],
    }
}

struct Collapser<'a> {
    pool: &'a GeometryPool,
    prims: &'a [PrimInfo],
    nodes: Vec<WideNode>,
    batches: Vec<TriangleBatch>,
    depth: usize,
}

impl Collapser<'_> {
    fn batch(&mut self, start: usize, count: usize) -> u32 {
        let tris: Vec<(u32, [Vec3; 3])> = self.prims[start..start + count]
            .iter()
            .map(|p| (p.face, self.pool.triangle(p.face)))
            .collect();
        self.batches.push(TriangleBatch::new(&tris));
        (self.batches.len() - 1) as u32
    }

    /// Emit a wide node whose slots are `children`.
    fn emit(&mut self, children: Vec<&BuildNode>, depth: usize) -> u32 {
        self.depth = self.depth.max(depth);

        let index = self.nodes.len();
        self.nodes.push(WideNode::default());

        let mut node = WideNode::default();
        for (slot, child) in children.into_iter().enumerate() {
            node.bounds.set(slot, child.bounds());
            match child {
                BuildNode::Leaf { start, count, .. } => {
                    node.offset[slot] = self.batch(*start, *count);
                    node.count[slot] = *count as u8;
                }
                BuildNode::Interior { .. } => {
                    node.offset[slot] = self.collapse(child, depth + 1);
                    node.count[slot] = 0;
                }
            }
        }

        self.nodes[index] = node;
        index as u32
    }

    /// Pull grandchildren up until the node has [`LANES`] slots or only
    /// leaves remain, always opening the largest interior child first.
    fn collapse(&mut self, node: &BuildNode, depth: usize) -> u32 {
        let mut children: Vec<&BuildNode> = match node {
            BuildNode::Interior { children, .. } => children.iter().map(|c| c.as_ref()).collect(),
            BuildNode::Leaf { .. } => vec![node],
        };

        while children.len() < LANES {
            let largest = children
                .iter()
                .enumerate()
                .filter(|(_, c)| matches!(c, BuildNode::Interior { .. }))
                .max_by(|a, b| a.1.bounds().area().total_cmp(&b.1.bounds().area()))
                .map(|(i, _)| i);

            let Some(i) = largest else { break };
            if let BuildNode::Interior { children: grand, .. } = children.swap_remove(i) {
                children.push(&grand[0]);
                children.push(&grand[1]);
            }
        }

        self.emit(children, depth)
    }
}

/// Build the wide tree over every face in `faces`.
pub(crate) fn build(pool: &GeometryPool, faces: &[u32]) -> BuildOutput {
    if faces.is_empty() {
        return BuildOutput {
            nodes: Vec::new(),
            batches: Vec::new(),
            depth: 0,
        };
    }

    let mut prims: Vec<PrimInfo> = faces
        .iter()
        .map(|&face| {
            let [a, b, c] = pool.triangle(face);
            let bounds = Aabb::from_triangle(a, b, c);
            PrimInfo {
                bounds,
                centroid: bounds.centroid(),
                face,
            }
        })
        .collect();

    let mut binary_depth = 0;
    let root = build_recursive(&mut prims, 0, 0, &mut binary_depth);
    log::debug!("Binary SAH tree depth {}", binary_depth);

    let mut collapser = Collapser {
        pool,
        prims: &prims,
        nodes: Vec::new(),
        batches: Vec::new(),
        depth: 0,
    };
    collapser.collapse(&root, 1);

    BuildOutput {
        nodes: collapser.nodes,
        batches: collapser.batches,
        depth: collapser.depth,
    }
}
