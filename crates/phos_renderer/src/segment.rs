//! Struct-of-arrays path state for one tile.
//!
//! Every array is sized once per tile and indexed by segment id; nothing in
//! here allocates while a tile is being traced once the first tile has grown
//! the buffers.

use std::ops::{BitAnd, BitOr, Not};

use phos_core::MaterialId;
use phos_math::{Color, Ray, Vec2, Vec3};

use crate::bvh::{Hit, RayStream};
use crate::error::{RenderError, RenderResult};

/// Per-segment state bits.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct SegmentFlags(u8);

impl SegmentFlags {
    pub const NONE: SegmentFlags = SegmentFlags(0);
    /// Still being traced; mirrored by membership in the [`ActiveSet`].
    pub const ALIVE: SegmentFlags = SegmentFlags(1 << 0);
    /// The last intersection found a surface.
    pub const HIT: SegmentFlags = SegmentFlags(1 << 1);

    #[inline]
    pub fn contains(self, other: SegmentFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for SegmentFlags {
    type Output = SegmentFlags;

    fn bitor(self, rhs: SegmentFlags) -> SegmentFlags {
        SegmentFlags(self.0 | rhs.0)
    }
}

impl BitAnd for SegmentFlags {
    type Output = SegmentFlags;

    fn bitand(self, rhs: SegmentFlags) -> SegmentFlags {
        SegmentFlags(self.0 & rhs.0)
    }
}

impl Not for SegmentFlags {
    type Output = SegmentFlags;

    fn not(self) -> SegmentFlags {
        SegmentFlags(!self.0)
    }
}

/// One path per pixel sample, stored column-wise.
#[derive(Debug, Default)]
pub struct PathSegments {
    capacity: usize,

    /// Ray origin; the hit point after shading.
    pub origin: Vec<Vec3>,
    pub direction: Vec<Vec3>,
    /// Shading normal at the current hit, facing the viewer unless the
    /// surface transmits.
    pub normal: Vec<Vec3>,
    /// Path throughput.
    pub beta: Vec<Color>,
    /// Radiance gathered so far.
    pub radiance: Vec<Color>,
    /// Closest hit distance (`INFINITY` until something is hit).
    pub t: Vec<f32>,
    pub face: Vec<u32>,
    pub bary: Vec<Vec2>,
    pub material: Vec<MaterialId>,
    pub depth: Vec<u32>,
    /// Pixel the segment splats into, as an index inside its tile.
    pub pixel: Vec<u32>,
    pub flags: Vec<SegmentFlags>,
}

impl PathSegments {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            ..Default::default()
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    /// Clear and size every column for `count` fresh, dead segments.
    pub fn reset(&mut self, count: usize) -> RenderResult<()> {
        if count > self.capacity {
            return Err(RenderError::Capacity {
                needed: count,
                capacity: self.capacity,
            });
        }

        fn refill<T: Clone>(v: &mut Vec<T>, count: usize, value: T) {
            v.clear();
            v.resize(count, value);
        }

        refill(&mut self.origin, count, Vec3::ZERO);
        refill(&mut self.direction, count, Vec3::ZERO);
        refill(&mut self.normal, count, Vec3::ZERO);
        refill(&mut self.beta, count, Color::ZERO);
        refill(&mut self.radiance, count, Color::ZERO);
        refill(&mut self.t, count, f32::INFINITY);
        refill(&mut self.face, count, u32::MAX);
        refill(&mut self.bary, count, Vec2::ZERO);
        refill(&mut self.material, count, MaterialId(0));
        refill(&mut self.depth, count, 0);
        refill(&mut self.pixel, count, 0);
        refill(&mut self.flags, count, SegmentFlags::NONE);
        Ok(())
    }

    /// Start a camera path in slot `i`.
    pub fn spawn(&mut self, i: usize, ray: Ray, pixel: u32) {
        self.origin[i] = ray.origin;
        self.direction[i] = ray.direction;
        self.beta[i] = Color::ONE;
        self.radiance[i] = Color::ZERO;
        self.t[i] = f32::INFINITY;
        self.depth[i] = 0;
        self.pixel[i] = pixel;
        self.flags[i] = SegmentFlags::ALIVE;
    }

    /// Forget the previous hit before the next intersection pass.
    #[inline]
    pub fn clear_hit(&mut self, i: usize) {
        self.t[i] = f32::INFINITY;
        self.flags[i] = self.flags[i] & !SegmentFlags::HIT;
    }

    /// Continue the path from `origin` along `direction`.
    #[inline]
    pub fn redirect(&mut self, i: usize, origin: Vec3, direction: Vec3) {
        self.origin[i] = origin;
        self.direction[i] = direction;
    }

    #[inline]
    pub fn kill(&mut self, i: usize) {
        self.flags[i] = self.flags[i] & !SegmentFlags::ALIVE;
    }

    #[inline]
    pub fn is_alive(&self, i: usize) -> bool {
        self.flags[i].contains(SegmentFlags::ALIVE)
    }

    #[inline]
    pub fn is_hit(&self, i: usize) -> bool {
        self.flags[i].contains(SegmentFlags::HIT)
    }

    /// World-space hit point of the last intersection.
    #[inline]
    pub fn hit_point(&self, i: usize) -> Vec3 {
        self.origin[i] + self.direction[i] * self.t[i]
    }
}

impl RayStream for PathSegments {
    #[inline]
    fn ray(&self, index: usize) -> Ray {
        Ray::new(self.origin[index], self.direction[index])
    }

    #[inline]
    fn t_max(&self, index: usize) -> f32 {
        self.t[index]
    }

    #[inline]
    fn is_done(&self, index: usize) -> bool {
        !self.is_alive(index)
    }

    fn record(&mut self, index: usize, hit: &Hit) {
        self.t[index] = hit.t;
        self.face[index] = hit.prim;
        self.bary[index] = Vec2::new(hit.u, hit.v);
        self.flags[index] = self.flags[index] | SegmentFlags::HIT;
    }
}

/// Outcome of a shadow query.
///
/// Skipped queries are kept apart from tested ones so a query that was
/// never cast is neither counted as lit nor as shadowed.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Occlusion {
    /// Not cast: the light faces away, or the BSDF is black for it.
    #[default]
    Masked,
    /// Waiting for the occlusion pass.
    Pending,
    Unoccluded,
    Occluded,
}

/// Batched shadow rays for next-event estimation.
#[derive(Debug, Default)]
pub struct OcclusionQueries {
    pub origin: Vec<Vec3>,
    pub direction: Vec<Vec3>,
    pub max_distance: Vec<f32>,
    /// Radiance added to the owner if the query turns out unoccluded.
    pub contribution: Vec<Color>,
    /// Segment the query belongs to.
    pub owner: Vec<u32>,
    pub state: Vec<Occlusion>,
}

impl OcclusionQueries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.state.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.is_empty()
    }

    pub fn clear(&mut self) {
        self.origin.clear();
        self.direction.clear();
        self.max_distance.clear();
        self.contribution.clear();
        self.owner.clear();
        self.state.clear();
    }

    /// Queue a shadow ray.
    pub fn push(&mut self, owner: u32, origin: Vec3, direction: Vec3, max_distance: f32, contribution: Color) {
        self.origin.push(origin);
        self.direction.push(direction);
        self.max_distance.push(max_distance);
        self.contribution.push(contribution);
        self.owner.push(owner);
        self.state.push(Occlusion::Pending);
    }

    /// Record that `owner` has no shadow ray this bounce.
    pub fn push_masked(&mut self, owner: u32) {
        self.origin.push(Vec3::ZERO);
        self.direction.push(Vec3::ZERO);
        self.max_distance.push(0.0);
        self.contribution.push(Color::ZERO);
        self.owner.push(owner);
        self.state.push(Occlusion::Masked);
    }

    /// Indices of the queries still to be traced.
    pub fn pending(&self, out: &mut Vec<u32>) {
        out.clear();
        out.extend(
            self.state
                .iter()
                .enumerate()
                .filter(|(_, s)| **s == Occlusion::Pending)
                .map(|(i, _)| i as u32),
        );
    }

    /// Everything still pending after the occlusion pass reached its light.
    pub fn resolve(&mut self) {
        for s in &mut self.state {
            if *s == Occlusion::Pending {
                *s = Occlusion::Unoccluded;
            }
        }
    }
}

impl RayStream for OcclusionQueries {
    #[inline]
    fn ray(&self, index: usize) -> Ray {
        Ray::new(self.origin[index], self.direction[index])
    }

    #[inline]
    fn t_max(&self, index: usize) -> f32 {
        self.max_distance[index]
    }

    #[inline]
    fn is_done(&self, index: usize) -> bool {
        self.state[index] != Occlusion::Pending
    }

    fn record(&mut self, index: usize, _hit: &Hit) {
        self.state[index] = Occlusion::Occluded;
    }
}

/// Dense list of the alive segment ids.
#[derive(Debug, Default)]
pub struct ActiveSet {
    ids: Vec<u32>,
}

impl ActiveSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Activate `0..count`.
    pub fn fill(&mut self, count: usize) {
        self.ids.clear();
        self.ids.extend(0..count as u32);
    }

    /// Drop every id whose segment is no longer alive.
    pub fn compact(&mut self, segments: &PathSegments) {
        self.ids.retain(|&i| segments.is_alive(i as usize));
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.ids
    }
}

/// Hit segments grouped by material for deferred shading.
#[derive(Debug, Default)]
pub struct MaterialBuckets {
    buckets: Vec<Vec<u32>>,
}

impl MaterialBuckets {
    pub fn new(material_count: usize) -> Self {
        Self {
            buckets: vec![Vec::new(); material_count],
        }
    }

    pub fn clear(&mut self) {
        for b in &mut self.buckets {
            b.clear();
        }
    }

    pub fn push(&mut self, material: MaterialId, segment: u32) {
        let index = material.index();
        if index >= self.buckets.len() {
            self.buckets.resize(index + 1, Vec::new());
        }
        self.buckets[index].push(segment);
    }

    /// Non-empty buckets in material order.
    pub fn iter(&self) -> impl Iterator<Item = (MaterialId, &[u32])> {
        self.buckets
            .iter()
            .enumerate()
            .filter(|(_, b)| !b.is_empty())
            .map(|(i, b)| (MaterialId(i as u32), b.as_slice()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_reset_checks_capacity() {
        let mut segs = PathSegments::with_capacity(16);
        assert!(segs.reset(16).is_ok());
        assert_eq!(segs.len(), 16);
        assert_eq!(
            segs.reset(17),
            Err(RenderError::Capacity {
                needed: 17,
                capacity: 16
            })
        );
    }

    #[test]
    fn test_flags() {
        let mut segs = PathSegments::with_capacity(4);
        segs.reset(4).unwrap();
        segs.spawn(2, Ray::new(Vec3::ZERO, Vec3::Z), 0);
        assert!(segs.is_alive(2));
        assert!(!segs.is_hit(2));

        segs.record(
            2,
            &Hit {
                t: 3.0,
                prim: 9,
                u: 0.25,
                v: 0.5,
            },
        );
        assert!(segs.is_hit(2) && segs.is_alive(2));
        assert_eq!(segs.hit_point(2), Vec3::new(0.0, 0.0, 3.0));

        segs.clear_hit(2);
        assert!(!segs.is_hit(2) && segs.is_alive(2));
        segs.kill(2);
        assert!(!segs.is_alive(2));
        assert!(!segs.is_alive(0));
    }

    #[test]
    fn test_active_set_matches_alive_flags() {
        let n = 500;
        let mut segs = PathSegments::with_capacity(n);
        segs.reset(n).unwrap();
        for i in 0..n {
            segs.spawn(i, Ray::new(Vec3::ZERO, Vec3::X), i as u32);
        }
        let mut active = ActiveSet::new();
        active.fill(n);

        let mut rng = StdRng::seed_from_u64(17);
        for _ in 0..6 {
            for &i in active.as_slice() {
                if rng.gen::<f32>() < 0.3 {
                    segs.kill(i as usize);
                }
            }
            active.compact(&segs);

            // Bijection between the active set and the alive flags
            assert!(active.as_slice().iter().all(|&i| segs.is_alive(i as usize)));
            let alive = (0..n).filter(|&i| segs.is_alive(i)).count();
            assert_eq!(alive, active.len());
            assert!(active.as_slice().windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn test_occlusion_states_stay_distinct() {
        let mut q = OcclusionQueries::new();
        q.push(0, Vec3::ZERO, Vec3::X, 1.0, Color::ONE);
        q.push_masked(1);
        q.push(2, Vec3::ZERO, Vec3::Y, 1.0, Color::ONE);

        let mut pending = Vec::new();
        q.pending(&mut pending);
        assert_eq!(pending, vec![0, 2]);

        q.record(2, &Hit { t: 0.5, prim: 0, u: 0.0, v: 0.0 });
        assert!(q.is_done(2));
        q.resolve();

        assert_eq!(
            q.state,
            vec![Occlusion::Unoccluded, Occlusion::Masked, Occlusion::Occluded]
        );
    }

    #[test]
    fn test_material_buckets() {
        let mut buckets = MaterialBuckets::new(2);
        buckets.push(MaterialId(1), 4);
        buckets.push(MaterialId(1), 7);
        buckets.push(MaterialId(3), 1);

        let groups: Vec<(MaterialId, Vec<u32>)> = buckets.iter().map(|(m, ids)| (m, ids.to_vec())).collect();
        assert_eq!(
            groups,
            vec![(MaterialId(1), vec![4, 7]), (MaterialId(3), vec![1])]
        );

        buckets.clear();
        assert_eq!(buckets.iter().count(), 0);
    }
}
