//! Stream path integrator.
//!
//! A tile is traced as one batch: every pixel sample becomes a path segment,
//! and each bounce intersects all live segments at once, groups the hits by
//! material, and shades every group with one BSDF instance. Direct light
//! comes from next-event estimation with batched shadow rays; lights are
//! not in the BVH, so paths never hit them by chance.

use phos_core::{MaterialId, Scene, SceneError};
use phos_math::{sampling, Color, ColorExt, Frame, Vec2, Vec3};
use rand::Rng;

use crate::arena::TileArena;
use crate::bsdf::Bsdf;
use crate::bvh::{Bvh, StreamStack};
use crate::camera::Camera;
use crate::error::RenderResult;
use crate::film::{Film, Patch, Splat};
use crate::material::MaterialExt;
use crate::renderer::RenderConfig;
use crate::segment::{ActiveSet, MaterialBuckets, Occlusion, OcclusionQueries, PathSegments};
use crate::stats::RenderStats;

/// Distance new rays are pushed off a surface along its normal.
pub const RAY_EPSILON: f32 = 1e-4;

/// Shadow rays stop this far short of the light.
const SHADOW_EPSILON: f32 = 1e-3;

/// Russian roulette on throughput `beta`.
///
/// Terminates with probability `q = max(floor, 1 - luminance(beta))` and
/// otherwise returns `beta / (1 - q)`, so the expected throughput is
/// unchanged.
pub fn roulette(beta: Color, floor: f32, u: f32) -> Option<Color> {
    let q = (1.0 - beta.luminance()).max(floor);
    if u < q {
        None
    } else {
        Some(beta / (1.0 - q))
    }
}

/// Push `p` off the surface toward the side `w` leaves through.
#[inline]
fn offset_origin(p: Vec3, n: Vec3, w: Vec3) -> Vec3 {
    if w.dot(n) > 0.0 {
        p + n * RAY_EPSILON
    } else {
        p - n * RAY_EPSILON
    }
}

/// Per-worker buffers reused from tile to tile.
pub struct TileScratch {
    segments: PathSegments,
    queries: OcclusionQueries,
    query_ids: Vec<u32>,
    active: ActiveSet,
    buckets: MaterialBuckets,
    stack: StreamStack,
    arena: TileArena,
    splats: Vec<Splat>,
}

impl TileScratch {
    pub fn new(config: &RenderConfig, material_count: usize) -> Self {
        Self {
            segments: PathSegments::with_capacity(config.segments_per_patch()),
            queries: OcclusionQueries::new(),
            query_ids: Vec::new(),
            active: ActiveSet::new(),
            buckets: MaterialBuckets::new(material_count),
            stack: StreamStack::new(),
            arena: TileArena::new(config.arena_bytes),
            splats: Vec::new(),
        }
    }

    pub fn segments(&self) -> &PathSegments {
        &self.segments
    }
}

/// Read-only view of everything a worker needs to trace tiles.
pub struct Integrator<'s> {
    scene: &'s Scene,
    bvh: &'s Bvh,
    camera: &'s Camera,
    config: &'s RenderConfig,
    face_material: Vec<MaterialId>,
}

impl<'s> Integrator<'s> {
    pub fn new(scene: &'s Scene, bvh: &'s Bvh, camera: &'s Camera, config: &'s RenderConfig) -> Self {
        let mut face_material = vec![MaterialId(0); scene.pool.faces.len()];
        for mesh in &scene.meshes {
            for face in mesh.faces.clone() {
                face_material[face as usize] = mesh.material;
            }
        }

        Self {
            scene,
            bvh,
            camera,
            config,
            face_material,
        }
    }

    /// Trace every sample of `patch` to completion and splat the results
    /// into `film`. The scratch arena is reset before returning.
    pub fn render_patch<R: Rng>(
        &self,
        patch: &Patch,
        film: &Film,
        scratch: &mut TileScratch,
        rng: &mut R,
        stats: &RenderStats,
    ) -> RenderResult<()> {
        let TileScratch {
            segments,
            queries,
            query_ids,
            active,
            buckets,
            stack,
            arena,
            splats,
        } = scratch;

        let spd = self.config.samples_per_dimension;
        let count = (patch.pixel_count() * spd * spd) as usize;
        segments.reset(count)?;

        // One segment per (pixel, stratum)
        let mut slot = 0;
        for local in 0..patch.pixel_count() {
            let (x, y) = patch.pixel(local);
            for sy in 0..spd {
                for sx in 0..spd {
                    let s = sampling::stratified(sx, sy, spd, Vec2::new(rng.gen(), rng.gen()));
                    let lens = Vec2::new(rng.gen(), rng.gen());
                    let ray = self.camera.get_ray(x as f32 + s.x, y as f32 + s.y, lens);
                    segments.spawn(slot, ray, local);
                    slot += 1;
                }
            }
        }
        active.fill(count);

        let mut bounce = 0;
        while !active.is_empty() {
            for &i in active.as_slice() {
                segments.clear_hit(i as usize);
            }
            self.bvh.intersect_stream(segments, active.as_slice(), stack);
            stats.add_rays(active.len());

            buckets.clear();
            for &i in active.as_slice() {
                let i = i as usize;
                if segments.is_hit(i) {
                    let material = self.face_material[segments.face[i] as usize];
                    segments.material[i] = material;
                    buckets.push(material, i as u32);
                } else {
                    if let Some(env) = &self.scene.environment {
                        segments.radiance[i] += segments.beta[i] * env.eval(segments.direction[i]);
                    }
                    segments.kill(i);
                }
            }

            for (id, ids) in buckets.iter() {
                let material = self
                    .scene
                    .material(id)
                    .ok_or(SceneError::UnknownMaterial(id.0))?;
                let bsdf = material.instantiate(arena)?;

                self.prepare_hits(bsdf, ids, segments);
                if bsdf.has_distribution() && !self.scene.lights.is_empty() {
                    self.sample_direct(bsdf, ids, segments, queries, rng);
                    queries.pending(query_ids);
                    self.bvh.intersect_stream(queries, query_ids, stack);
                    stats.add_shadow_rays(query_ids.len());
                    queries.resolve();

                    for q in 0..queries.len() {
                        if queries.state[q] == Occlusion::Unoccluded {
                            segments.radiance[queries.owner[q] as usize] += queries.contribution[q];
                        }
                    }
                }
                self.continue_paths(bsdf, ids, segments, rng)?;
            }

            active.compact(segments);
            bounce += 1;
        }

        splats.clear();
        let mut dropped = 0usize;
        for i in 0..segments.len() {
            let (x, y) = patch.pixel(segments.pixel[i]);
            let mut radiance = segments.radiance[i];
            if !radiance.is_finite() {
                radiance = Color::ZERO;
                dropped += 1;
            }
            splats.push(Splat { x, y, radiance });
        }
        if dropped > 0 {
            log::warn!("Patch {}: dropped {} non-finite samples", patch.index, dropped);
        }
        film.apply_splats(splats);

        log::debug!(
            "Patch {} ({}x{} at {},{}) done after {} bounces, arena peak {} bytes",
            patch.index,
            patch.width,
            patch.height,
            patch.x,
            patch.y,
            bounce,
            arena.allocated_bytes()
        );

        stats.add_samples(count);
        stats.patch_done();
        arena.reset();
        Ok(())
    }

    /// Move each segment to its hit point and set up the shading normal.
    fn prepare_hits(&self, bsdf: &Bsdf<'_>, ids: &[u32], segments: &mut PathSegments) {
        let pool = &self.scene.pool;
        for &i in ids {
            let i = i as usize;
            let face = segments.face[i];
            let b = segments.bary[i];
            let p = segments.hit_point(i);

            let mut n = pool.shading_normal(face, b.x, b.y);
            if n == Vec3::ZERO {
                let [a, v1, v2] = pool.triangle(face);
                n = (v1 - a).cross(v2 - a).normalize_or_zero();
            }
            // Opaque surfaces are two-sided
            let wo = -segments.direction[i];
            if !bsdf.is_transmissive() && n.dot(wo) < 0.0 {
                n = -n;
            }

            segments.origin[i] = p;
            segments.normal[i] = n;
        }
    }

    /// Sample one light per segment and queue the shadow rays.
    fn sample_direct<R: Rng>(
        &self,
        bsdf: &Bsdf<'_>,
        ids: &[u32],
        segments: &PathSegments,
        queries: &mut OcclusionQueries,
        rng: &mut R,
    ) {
        let lights = &self.scene.lights;
        let light_count = lights.len();
        queries.clear();

        for &i in ids {
            let owner = i;
            let i = i as usize;
            let pick = ((rng.gen::<f32>() * light_count as f32) as usize).min(light_count - 1);
            let light = &lights[pick];
            let u = Vec2::new(rng.gen(), rng.gen());

            let p = segments.origin[i];
            let n = segments.normal[i];
            let ls = light.sample(p, u);

            let to_light = ls.point - p;
            let dist2 = to_light.length_squared();
            if dist2 <= 0.0 {
                queries.push_masked(owner);
                continue;
            }
            let dist = dist2.sqrt();
            let wi = to_light / dist;

            // Emitters are one-sided
            let cos_light = -wi.dot(ls.normal);
            if cos_light <= 0.0 {
                queries.push_masked(owner);
                continue;
            }

            let frame = Frame::from_normal(n);
            let f = bsdf.f(frame.to_local(wi), frame.to_local(-segments.direction[i]));
            let cos_surface = wi.dot(n).abs();
            if f.is_black() || cos_surface == 0.0 {
                queries.push_masked(owner);
                continue;
            }

            // Area density to solid angle, times the uniform light pick
            let pdf = ls.pdf_area * dist2 / cos_light / light_count as f32;
            let contribution = segments.beta[i] * f * light.emission * (cos_surface / pdf);

            queries.push(
                owner,
                offset_origin(p, n, wi),
                wi,
                (dist - SHADOW_EPSILON).max(0.0),
                contribution,
            );
        }
    }

    /// Sample the next direction of each segment, or retire it.
    fn continue_paths<R: Rng>(
        &self,
        bsdf: &Bsdf<'_>,
        ids: &[u32],
        segments: &mut PathSegments,
        rng: &mut R,
    ) -> RenderResult<()> {
        let sampleable = !bsdf.flags().is_empty();

        for &i in ids {
            let i = i as usize;
            if !sampleable {
                segments.kill(i);
                continue;
            }

            let n = segments.normal[i];
            let frame = Frame::from_normal(n);
            let wo = frame.to_local(-segments.direction[i]);
            let bs = bsdf.sample(wo, Vec2::new(rng.gen(), rng.gen()), rng.gen())?;
            if bs.pdf <= 0.0 || bs.f.is_black() {
                segments.kill(i);
                continue;
            }

            let wi = frame.to_world(bs.wi);
            let mut beta = segments.beta[i] * bs.f * (bs.wi.z.abs() / bs.pdf);

            segments.depth[i] += 1;
            if segments.depth[i] >= self.config.max_depth {
                segments.kill(i);
                continue;
            }
            if segments.depth[i] >= self.config.min_bounces {
                match roulette(beta, self.config.roulette_floor, rng.gen()) {
                    Some(b) => beta = b,
                    None => {
                        segments.kill(i);
                        continue;
                    }
                }
            }

            segments.beta[i] = beta;
            let origin = offset_origin(segments.origin[i], n, wi);
            segments.redirect(i, origin, wi);
        }
        Ok(())
    }
}
