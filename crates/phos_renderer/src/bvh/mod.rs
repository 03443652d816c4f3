//! Wide bounding volume hierarchy over the scene's triangles.
//!
//! Built with a binned SAH on a binary tree which is then collapsed into
//! 8-wide nodes, so every traversal step tests eight child boxes and every
//! leaf tests up to eight triangles with one SIMD batch.
//!
//! Two query styles share the tree:
//! - single rays ([`Bvh::intersect`], [`Bvh::occluded`]) with a
//!   nearest-first stack, pruned against the current closest hit;
//! - ray streams ([`Bvh::intersect_stream`]) where whole groups of rays walk
//!   the tree together, see [`stream`].

mod batch;
mod builder;
mod node;
pub mod stream;

use std::time::Instant;

use phos_core::{GeometryPool, Scene};
use phos_math::simd::{RayX8, LANES};
use phos_math::{Aabb, Ray, Vec3};

pub use batch::TriangleBatch;
pub use builder::{MAX_LEAF_SIZE, SAH_BINS};
pub use node::WideNode;
pub use stream::{RayStream, StreamStack};

/// Closest intersection along a ray.
///
/// `prim` is the face index in the scene's geometry pool; `(u, v)` are the
/// barycentric weights of its second and third corners.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Hit {
    pub t: f32,
    pub prim: u32,
    pub u: f32,
    pub v: f32,
}

#[derive(Debug, Copy, Clone)]
struct StackEntry {
    offset: u32,
    count: u8,
    dist: f32,
}

/// Hit slots ordered farthest first, so pushing them in order leaves the
/// nearest on top of a stack. Returns the number of entries written.
#[inline]
pub(crate) fn far_to_near(mask: u32, dist: &[f32; LANES], out: &mut [(f32, usize); LANES]) -> usize {
    let mut n = 0;
    let mut m = mask;
    while m != 0 {
        let slot = m.trailing_zeros() as usize;
        m &= m - 1;
        out[n] = (dist[slot], slot);
        n += 1;
    }
    out[..n].sort_unstable_by(|a, b| b.0.total_cmp(&a.0));
    n
}

/// 8-wide BVH. Read-only after [`Bvh::build`], shared by every worker.
#[derive(Debug, Clone, Default)]
pub struct Bvh {
    nodes: Vec<WideNode>,
    batches: Vec<TriangleBatch>,
    bounds: Aabb,
    depth: usize,
}

impl Bvh {
    /// Build over every triangle in `scene`.
    pub fn build(scene: &Scene) -> Self {
        let faces: Vec<u32> = scene.triangles().iter().map(|t| t.face).collect();
        Self::from_faces(&scene.pool, &faces)
    }

    /// Build over a subset of the faces in `pool`.
    pub fn from_faces(pool: &GeometryPool, faces: &[u32]) -> Self {
        let start = Instant::now();
        let out = builder::build(pool, faces);

        let bounds = out
            .nodes
            .first()
            .map(|root| root.occupied().fold(Aabb::EMPTY, |b, i| b.merge(&root.bounds.get(i))))
            .unwrap_or(Aabb::EMPTY);

        log::info!(
            "BVH built: {} triangles, {} nodes, {} leaves, depth {} in {:.2?}",
            faces.len(),
            out.nodes.len(),
            out.batches.len(),
            out.depth,
            start.elapsed()
        );

        Self {
            nodes: out.nodes,
            batches: out.batches,
            bounds,
            depth: out.depth,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn leaf_count(&self) -> usize {
        self.batches.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.batches.iter().map(|b| b.len()).sum()
    }

    /// Number of wide levels from the root to the deepest node.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    pub fn nodes(&self) -> &[WideNode] {
        &self.nodes
    }

    pub fn batches(&self) -> &[TriangleBatch] {
        &self.batches
    }

    /// Closest hit with `t` in `[0, t_max)`.
    pub fn intersect(&self, ray: &Ray, t_max: f32) -> Option<Hit> {
        self.traverse(ray, t_max, false)
    }

    /// True if anything lies along `direction` closer than `max_distance`.
    pub fn occluded(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> bool {
        self.traverse(&Ray::new(origin, direction), max_distance, true)
            .is_some()
    }

    fn traverse(&self, ray: &Ray, t_max: f32, any_hit: bool) -> Option<Hit> {
        if self.nodes.is_empty() {
            return None;
        }

        let r8 = RayX8::new(ray);
        let mut closest = t_max;
        let mut best = None;
        let mut order = [(0.0f32, 0usize); LANES];

        let mut stack: Vec<StackEntry> = Vec::with_capacity(64);
        stack.push(StackEntry {
            offset: 0,
            count: 0,
            dist: 0.0,
        });

        while let Some(entry) = stack.pop() {
            // Entered beyond the current closest hit
            if entry.dist > closest {
                continue;
            }

            if entry.count > 0 {
                if let Some(hit) = self.batches[entry.offset as usize].intersect(&r8, closest) {
                    if any_hit {
                        return Some(hit);
                    }
                    closest = hit.t;
                    best = Some(hit);
                }
                continue;
            }

            let node = &self.nodes[entry.offset as usize];
            let (mask, near) = node.bounds.intersect(&r8, closest);
            let n = far_to_near(mask, &near, &mut order);
            for &(dist, slot) in &order[..n] {
                stack.push(StackEntry {
                    offset: node.offset[slot],
                    count: node.count[slot],
                    dist,
                });
            }
        }

        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::triangle::intersect_brute_force;
    use phos_core::{shapes, Material, MeshData};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn random_soup(n: usize, seed: u64) -> Scene {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut positions = Vec::with_capacity(n * 3);
        for _ in 0..n {
            let c = Vec3::new(
                rng.gen_range(-10.0..10.0),
                rng.gen_range(-10.0..10.0),
                rng.gen_range(-10.0..10.0),
            );
            for _ in 0..3 {
                positions.push(
                    c + Vec3::new(
                        rng.gen_range(-0.5..0.5),
                        rng.gen_range(-0.5..0.5),
                        rng.gen_range(-0.5..0.5),
                    ),
                );
            }
        }
        let indices = (0..(n * 3) as u32).collect();

        let mut scene = Scene::new("soup");
        let m = scene.add_material(Material::default());
        scene.add_mesh(MeshData::new(positions, indices), m).unwrap();
        scene
    }

    fn all_triangles(scene: &Scene) -> Vec<(u32, [Vec3; 3])> {
        (0..scene.pool.faces.len() as u32)
            .map(|f| (f, scene.pool.triangle(f)))
            .collect()
    }

    #[test]
    fn test_empty_bvh() {
        let bvh = Bvh::build(&Scene::new("empty"));
        assert!(bvh.is_empty());
        assert!(bvh.intersect(&Ray::new(Vec3::ZERO, Vec3::X), f32::INFINITY).is_none());
        assert!(!bvh.occluded(Vec3::ZERO, Vec3::X, f32::INFINITY));
    }

    #[test]
    fn test_build_covers_every_triangle_once() {
        let scene = random_soup(500, 7);
        let bvh = Bvh::build(&scene);

        assert_eq!(bvh.triangle_count(), 500);
        let mut seen: Vec<u32> = bvh.batches().iter().flat_map(|b| b.prims().to_vec()).collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..500).collect::<Vec<_>>());
        assert!(bvh.batches().iter().all(|b| b.len() <= MAX_LEAF_SIZE));
        assert!(bvh.bounds().area() > 0.0);
    }

    #[test]
    fn test_child_bounds_contain_subtrees() {
        let scene = random_soup(300, 3);
        let bvh = Bvh::build(&scene);

        fn check(bvh: &Bvh, scene: &Scene, node: usize, parent: Aabb) {
            let n = &bvh.nodes()[node];
            for slot in n.occupied() {
                let b = n.bounds.get(slot);
                assert_eq!(parent.merge(&b), parent);
                if n.is_leaf(slot) {
                    for &prim in bvh.batches()[n.offset[slot] as usize].prims() {
                        let [a, c, d] = scene.pool.triangle(prim);
                        assert_eq!(b.merge(&Aabb::from_triangle(a, c, d)), b);
                    }
                } else {
                    check(bvh, scene, n.offset[slot] as usize, b);
                }
            }
        }
        check(&bvh, &scene, 0, bvh.bounds());
    }

    #[test]
    fn test_intersect_matches_brute_force() {
        let scene = random_soup(400, 11);
        let bvh = Bvh::build(&scene);
        let tris = all_triangles(&scene);
        let mut rng = StdRng::seed_from_u64(99);

        let mut hits = 0;
        for _ in 0..2000 {
            let origin = Vec3::new(
                rng.gen_range(-15.0..15.0),
                rng.gen_range(-15.0..15.0),
                rng.gen_range(-15.0..15.0),
            );
            let target = Vec3::new(
                rng.gen_range(-8.0..8.0),
                rng.gen_range(-8.0..8.0),
                rng.gen_range(-8.0..8.0),
            );
            let ray = Ray::new(origin, (target - origin).normalize());

            let expected = intersect_brute_force(&ray, &tris, f32::INFINITY);
            let got = bvh.intersect(&ray, f32::INFINITY);
            match (expected, got) {
                (None, None) => {}
                (Some(e), Some(g)) => {
                    hits += 1;
                    assert!((e.t - g.t).abs() < 1e-4, "t {} vs {}", e.t, g.t);
                    if e.prim != g.prim {
                        // Only acceptable when two faces are hit at the same distance
                        assert!((e.t - g.t).abs() < 1e-5);
                    }
                }
                other => panic!("brute force and BVH disagree: {other:?}"),
            }

            let occluded = bvh.occluded(ray.origin, ray.direction, 12.0);
            assert_eq!(occluded, expected.map_or(false, |h| h.t < 12.0));
        }
        assert!(hits > 100, "too few hits to be meaningful: {hits}");
    }

    #[test]
    fn test_closed_box_occludes_from_inside() {
        let mut scene = Scene::new("box");
        let m = scene.add_material(Material::default());
        scene
            .add_mesh(shapes::cuboid(Vec3::splat(-1.0), Vec3::splat(1.0)), m)
            .unwrap();
        let bvh = Bvh::build(&scene);

        for dir in [Vec3::X, -Vec3::Y, Vec3::new(1.0, 1.0, 1.0).normalize()] {
            let hit = bvh.intersect(&Ray::new(Vec3::ZERO, dir), f32::INFINITY).unwrap();
            assert!(hit.t > 0.9 && hit.t < 1.8);
            assert!(bvh.occluded(Vec3::ZERO, dir, 10.0));
            assert!(!bvh.occluded(Vec3::ZERO, dir, 0.5));
        }
    }

    #[test]
    fn test_far_to_near_order() {
        let dist = [5.0, 1.0, 3.0, 0.0, 0.0, 9.0, 0.0, 0.0];
        let mut out = [(0.0, 0); LANES];
        let n = far_to_near(0b0010_0111, &dist, &mut out);
        assert_eq!(n, 4);
        let slots: Vec<usize> = out[..n].iter().map(|e| e.1).collect();
        assert_eq!(slots, vec![5, 0, 2, 1]);
    }
}
