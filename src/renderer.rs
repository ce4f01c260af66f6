//! The path integrator and the progressive tile-parallel driver.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use glam::DVec3;
use rayon::prelude::*;

use crate::direct::DirectSampler;
use crate::rng::{RandomSource, XoroshiroPlus128};
use crate::scene::Scene;

/// Process-wide estimator health counters.
pub struct EstimatorStats {
    vertices: AtomicU64,
    pdf_mismatches: AtomicU64,
}

lazy_static::lazy_static! {
    static ref ESTIMATOR_STATS: EstimatorStats = EstimatorStats {
        vertices: AtomicU64::new(0),
        pdf_mismatches: AtomicU64::new(0),
    };
}

impl EstimatorStats {
    pub fn instance() -> &'static EstimatorStats {
        &ESTIMATOR_STATS
    }

    fn record_vertex(&self) {
        self.vertices.fetch_add(1, Ordering::Relaxed);
    }

    fn record_pdf_mismatch(&self) {
        self.pdf_mismatches.fetch_add(1, Ordering::Relaxed);
    }

    /// Fraction of path vertices dropped because the mixture density
    /// vanished for a direction that was just sampled from it.
    pub fn pdf_mismatch_ratio(&self) -> f64 {
        let vertices = self.vertices.load(Ordering::Relaxed);
        if vertices == 0 {
            return 0.0;
        }
        self.pdf_mismatches.load(Ordering::Relaxed) as f64 / vertices as f64
    }
}

#[derive(Clone, Copy, Debug)]
pub struct RenderSettings {
    /// Probability of proposing from the direct luminaire sampler at a
    /// shading point that has one. 0 gives the pure BSDF estimator.
    pub p_direct: f64,
    pub max_depth: u32,
    /// First bounce at which Russian roulette may terminate the path.
    pub min_rr_bounces: u32,
    pub firefly_ceiling: f64,
    pub seed: u64,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            p_direct: 0.5,
            max_depth: 10,
            min_rr_bounces: 5,
            firefly_ceiling: 10000.0,
            seed: 38927482,
        }
    }
}

/// One-sample radiance estimate along the ray (ro, rd).
///
/// Balance-heuristic MIS: the sampled direction comes from a mixture of
/// the direct luminaire sampler and the surface BSDF, and the single
/// mixture density divides the throughput, so emission picked up on any
/// later bounce is weighted correctly no matter which branch found it.
pub fn radiance(
    scene: &Scene,
    ro: DVec3,
    rd: DVec3,
    random: &mut dyn RandomSource,
    settings: &RenderSettings,
) -> DVec3 {
    const SCENE_EPS: f64 = 1.0e-4;

    let mut ro = ro;
    let mut rd = rd;
    let mut lo = DVec3::ZERO;
    let mut throughput = DVec3::ONE;

    for bounce in 0..settings.max_depth {
        let (tmin, mut shading_point) = match scene.intersect(ro, rd) {
            Some(hit) => hit,
            None => {
                if let Some(environment) = scene.environment() {
                    lo += throughput * environment.radiance(rd);
                }
                break;
            }
        };

        shading_point.ng = shading_point.ng.normalize();
        let p = ro + rd * tmin;
        let wo = -rd;
        let bxdf = scene.material(shading_point.material);

        let direct = DirectSampler::new(scene, p);
        let p_direct = if direct.can_sample() {
            settings.p_direct
        } else {
            0.0
        };

        let wi = if random.uniform() < p_direct {
            direct.sample(random)
        } else {
            bxdf.sample(random, wo, &shading_point)
        };

        let pdf_direct = if direct.can_sample() {
            direct.pdf(wi)
        } else {
            0.0
        };
        let pdf_bxdf = bxdf.pdf(wo, wi, &shading_point);
        let pdf = p_direct * pdf_direct + (1.0 - p_direct) * pdf_bxdf;

        lo += throughput * bxdf.emission(wo, &shading_point);

        EstimatorStats::instance().record_vertex();
        if !(pdf > 0.0) {
            // the chosen branch just drew wi with positive density, so
            // both densities vanishing means a contract violation
            EstimatorStats::instance().record_pdf_mismatch();
            debug_assert!(pdf > 0.0, "mixture density vanished for a sampled direction");
            break;
        }

        let no_i = shading_point.ng.dot(wi);
        throughput *= bxdf.bxdf(wo, wi, &shading_point) * no_i.abs() / pdf;
        if throughput == DVec3::ZERO {
            break;
        }

        if bounce >= settings.min_rr_bounces {
            let q = throughput.max_element().min(1.0);
            if random.uniform() >= q {
                break;
            }
            throughput /= q;
        }

        // the offset flips with the side wi leaves from
        ro = p + shading_point.ng * (SCENE_EPS * no_i.signum());
        rd = wi;
    }

    lo
}

#[derive(Clone, Copy, Default)]
pub struct Pixel {
    pub color: DVec3,
    pub sample: u32,
}

/// Accumulation buffer plus one decorrelated random stream per pixel.
pub struct Film {
    width: usize,
    height: usize,
    pixels: Vec<Pixel>,
    randoms: Vec<XoroshiroPlus128>,
}

impl Film {
    pub fn new(width: usize, height: usize, seed: u64) -> Self {
        // one root stream; every pixel gets the next 2^64-long window
        let mut random = XoroshiroPlus128::new(seed);
        let mut randoms = Vec::with_capacity(width * height);
        for _ in 0..width * height {
            randoms.push(random.clone());
            random.jump();
        }
        Self {
            width,
            height,
            pixels: vec![Pixel::default(); width * height],
            randoms,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixel(&self, x: usize, y: usize) -> &Pixel {
        &self.pixels[y * self.width + x]
    }

    /// Linear RGB readout, color averaged over the sample count.
    pub fn to_rgb32f(&self) -> Vec<f32> {
        let mut data = Vec::with_capacity(self.pixels.len() * 3);
        for pixel in &self.pixels {
            let color = if pixel.sample == 0 {
                DVec3::ZERO
            } else {
                pixel.color / pixel.sample as f64
            };
            data.extend_from_slice(&[color.x as f32, color.y as f32, color.z as f32]);
        }
        data
    }
}

/// Progressive renderer. Each `step` adds one censored sample to every
/// pixel; pixels are partitioned by row across worker threads and no two
/// workers ever touch the same pixel or stream.
pub struct Renderer {
    scene: Arc<Scene>,
    film: Film,
    settings: RenderSettings,
    steps: u32,
    bad_sample_nan: AtomicU64,
    bad_sample_inf: AtomicU64,
    bad_sample_negative: AtomicU64,
    bad_sample_firefly: AtomicU64,
}

impl Renderer {
    pub fn new(scene: Arc<Scene>) -> Self {
        Self::with_settings(scene, RenderSettings::default())
    }

    pub fn with_settings(scene: Arc<Scene>, settings: RenderSettings) -> Self {
        let camera = scene.camera();
        let film = Film::new(
            camera.resolution_x as usize,
            camera.resolution_y as usize,
            settings.seed,
        );
        Self {
            scene,
            film,
            settings,
            steps: 0,
            bad_sample_nan: AtomicU64::new(0),
            bad_sample_inf: AtomicU64::new(0),
            bad_sample_negative: AtomicU64::new(0),
            bad_sample_firefly: AtomicU64::new(0),
        }
    }

    /// One progressive pass over all pixels, rows in parallel.
    pub fn step(&mut self) {
        self.steps += 1;

        let camera = self.scene.camera();
        let object_o = camera.eye
            + camera.forward * camera.focus_distance
            + camera.left * (camera.object_plane_width * 0.5)
            + camera.up * (camera.object_plane_height * 0.5);
        let r_vector = camera.right * camera.object_plane_width;
        let d_vector = camera.down * camera.object_plane_height;
        let eye = camera.eye;

        let width = self.film.width;
        let step_x = 1.0 / self.film.width as f64;
        let step_y = 1.0 / self.film.height as f64;

        let scene = self.scene.as_ref();
        let settings = self.settings;
        let bad_sample_nan = &self.bad_sample_nan;
        let bad_sample_inf = &self.bad_sample_inf;
        let bad_sample_negative = &self.bad_sample_negative;
        let bad_sample_firefly = &self.bad_sample_firefly;

        self.film
            .pixels
            .par_chunks_mut(width)
            .zip(self.film.randoms.par_chunks_mut(width))
            .enumerate()
            .for_each(|(y, (pixel_row, random_row))| {
                for x in 0..width {
                    let random = &mut random_row[x];

                    let u = random.uniform();
                    let v = random.uniform();
                    let p_object_plane = object_o
                        + r_vector * (step_x * (x as f64 + u))
                        + d_vector * (step_y * (y as f64 + v));
                    let d = (p_object_plane - eye).normalize();

                    let mut r = radiance(scene, eye, d, random, &settings);

                    // censor pathological samples so one bad path can
                    // never poison the accumulator
                    for i in 0..3 {
                        if r[i].is_nan() {
                            bad_sample_nan.fetch_add(1, Ordering::Relaxed);
                            r[i] = 0.0;
                        } else if !r[i].is_finite() {
                            bad_sample_inf.fetch_add(1, Ordering::Relaxed);
                            r[i] = 0.0;
                        } else if r[i] < 0.0 {
                            bad_sample_negative.fetch_add(1, Ordering::Relaxed);
                            r[i] = 0.0;
                        }
                        if r[i] > settings.firefly_ceiling {
                            bad_sample_firefly.fetch_add(1, Ordering::Relaxed);
                            r[i] = 0.0;
                        }
                    }

                    pixel_row[x].color += r;
                    pixel_row[x].sample += 1;
                }
            });
    }

    /// Keep stepping until `stop` is raised; checked between passes, so
    /// an in-flight pass always runs to completion.
    pub fn run_until(&mut self, stop: &AtomicBool) {
        while !stop.load(Ordering::Relaxed) {
            self.step();
        }
    }

    pub fn step_count(&self) -> u32 {
        self.steps
    }

    pub fn pixel(&self, x: usize, y: usize) -> (DVec3, u32) {
        let pixel = self.film.pixel(x, y);
        (pixel.color, pixel.sample)
    }

    pub fn film(&self) -> &Film {
        &self.film
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    pub fn bad_sample_nan(&self) -> u64 {
        self.bad_sample_nan.load(Ordering::Relaxed)
    }

    pub fn bad_sample_inf(&self) -> u64 {
        self.bad_sample_inf.load(Ordering::Relaxed)
    }

    pub fn bad_sample_negative(&self) -> u64 {
        self.bad_sample_negative.load(Ordering::Relaxed)
    }

    pub fn bad_sample_firefly(&self) -> u64 {
        self.bad_sample_firefly.load(Ordering::Relaxed)
    }
}
