//! Breadth-first traversal of ray streams.
//!
//! A stream is a set of rays (indices into some struct-of-arrays storage)
//! that walk the tree together. At every interior node each ray of the
//! current group is tested against the eight child boxes and appended to the
//! list of every child it hits; each non-empty list becomes a new task.
//! Tasks are processed depth first, nearest child first, using the mean
//! entry distance of the rays in the list. Leaves test every ray of their
//! group against one triangle batch.
//!
//! Rays that finished (a stopped occlusion query, or a segment killed by the
//! caller) are filtered out before every box test.

use phos_math::simd::{RayX8, LANES};
use phos_math::Ray;

use super::{far_to_near, Bvh, Hit};

/// Struct-of-arrays storage that can be traversed as a stream.
///
/// Occlusion streams stop a ray at its first hit by reporting it done from
/// [`RayStream::is_done`] once something has been recorded.
pub trait RayStream {
    fn ray(&self, index: usize) -> Ray;

    /// Current search limit; shrinks as closer hits are recorded.
    fn t_max(&self, index: usize) -> f32;

    /// True once the ray needs no more tests.
    fn is_done(&self, index: usize) -> bool;

    /// Called for every hit closer than [`RayStream::t_max`].
    fn record(&mut self, index: usize, hit: &Hit);
}

#[derive(Debug, Copy, Clone)]
struct Task {
    offset: u32,
    count: u8,
    start: usize,
    len: usize,
}

/// Reusable scratch for [`Bvh::intersect_stream`].
///
/// Holds the broadcast rays, the stacked id lists and the per-child lists,
/// so a worker can traverse stream after stream without allocating.
#[derive(Debug, Default)]
pub struct StreamStack {
    rays: Vec<RayX8>,
    ids: Vec<u32>,
    tasks: Vec<Task>,
    lists: [Vec<u32>; LANES],
}

impl StreamStack {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Bvh {
    /// Trace every ray in `active` (indices into `stream`).
    ///
    /// Produces the same hits as calling [`Bvh::intersect`] once per ray, or
    /// [`Bvh::occluded`] for streams that finish a ray at its first hit.
    pub fn intersect_stream<S: RayStream>(&self, stream: &mut S, active: &[u32], scratch: &mut StreamStack) {
        if self.nodes.is_empty() || active.is_empty() {
            return;
        }

        let StreamStack {
            rays,
            ids,
            tasks,
            lists,
        } = scratch;

        // Ids below are positions in `active`
        rays.clear();
        rays.extend(active.iter().map(|&i| RayX8::new(&stream.ray(i as usize))));
        ids.clear();
        ids.extend(0..active.len() as u32);
        tasks.clear();
        tasks.push(Task {
            offset: 0,
            count: 0,
            start: 0,
            len: active.len(),
        });

        let mut dist = [0.0f32; LANES];
        let mut order = [(0.0f32, 0usize); LANES];

        while let Some(task) = tasks.pop() {
            let group = task.start..task.start + task.len;

            if task.count > 0 {
                let batch = &self.batches[task.offset as usize];
                for &k in &ids[group] {
                    let index = active[k as usize] as usize;
                    if stream.is_done(index) {
                        continue;
                    }
                    let t_max = stream.t_max(index);
                    if let Some(hit) = batch.intersect(&rays[k as usize], t_max) {
                        stream.record(index, &hit);
                    }
                }
                ids.truncate(task.start);
                continue;
            }

            let node = &self.nodes[task.offset as usize];
            for list in lists.iter_mut() {
                list.clear();
            }
            dist.fill(0.0);

            let mut mask = 0u32;
            for &k in &ids[group] {
                let index = active[k as usize] as usize;
                if stream.is_done(index) {
                    continue;
                }
                let (hits, near) = node.bounds.intersect(&rays[k as usize], stream.t_max(index));
                let mut m = hits;
                while m != 0 {
                    let slot = m.trailing_zeros() as usize;
                    m &= m - 1;
                    lists[slot].push(k);
                    dist[slot] += near[slot];
                }
                mask |= hits;
            }
            ids.truncate(task.start);

            for slot in 0..LANES {
                if !lists[slot].is_empty() {
                    dist[slot] /= lists[slot].len() as f32;
                }
            }

            let n = far_to_near(mask, &dist, &mut order);
            for &(_, slot) in &order[..n] {
                let start = ids.len();
                ids.extend_from_slice(&lists[slot]);
                tasks.push(Task {
                    offset: node.offset[slot],
                    count: node.count[slot],
                    start,
                    len: lists[slot].len(),
                });
            }
        }
    }
}
