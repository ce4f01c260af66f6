//! Direction and point sampling primitives, with the pdf of each draw in
//! a measure the estimator can mix under multiple importance sampling.

use glam::DVec3;

use crate::math::OrthonormalBasis;
use crate::rng::RandomSource;

pub fn uniform_on_unit_sphere(random: &mut (impl RandomSource + ?Sized)) -> DVec3 {
    let cos_theta = random.uniform_range(-1.0, 1.0);
    let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();
    let phi = random.uniform_range(0.0, std::f64::consts::TAU);
    DVec3::new(sin_theta * phi.cos(), sin_theta * phi.sin(), cos_theta)
}

/// Uniform over the z >= 0 hemisphere.
pub fn uniform_on_unit_hemisphere(random: &mut impl RandomSource) -> DVec3 {
    let z = random.uniform();
    let r = (1.0 - z * z).max(0.0).sqrt();
    let phi = random.uniform_range(0.0, std::f64::consts::TAU);
    DVec3::new(r * phi.cos(), r * phi.sin(), z)
}

/// p(w) = cos(theta) / pi around the unit normal `ng`.
pub struct CosThetaProportionalSampler;

impl CosThetaProportionalSampler {
    pub fn sample(random: &mut (impl RandomSource + ?Sized), ng: DVec3) -> DVec3 {
        // rejection sample the unit disk, project up
        let mut x;
        let mut y;
        loop {
            x = random.uniform_range(-1.0, 1.0);
            y = random.uniform_range(-1.0, 1.0);
            if x * x + y * y < 1.0 {
                break;
            }
        }
        let z = (1.0 - x * x - y * y).max(0.0).sqrt();

        let basis = OrthonormalBasis::new(ng);
        basis.local_to_global(DVec3::new(x, y, z))
    }

    pub fn pdf(sampled_wi: DVec3, ng: DVec3) -> f64 {
        let cos_theta = sampled_wi.dot(ng);
        if cos_theta < 0.0 {
            return 0.0;
        }
        cos_theta * std::f64::consts::FRAC_1_PI
    }
}

/// Barycentric weights of a uniform point on a triangle.
/// The first vertex carries `1 - u - v`.
#[derive(Clone, Copy, Debug)]
pub struct TriangleSample {
    pub u: f64,
    pub v: f64,
}

impl TriangleSample {
    pub fn evaluate(&self, p0: DVec3, p1: DVec3, p2: DVec3) -> DVec3 {
        (1.0 - self.u - self.v) * p0 + self.u * p1 + self.v * p2
    }
}

/// Uniform in area measure; pdf is 1 / area.
pub fn uniform_on_triangle(u: f64, v: f64) -> TriangleSample {
    if u + v > 1.0 {
        TriangleSample {
            u: 1.0 - u,
            v: 1.0 - v,
        }
    } else {
        TriangleSample { u, v }
    }
}

/// Change of measure from area density at the hit point to solid-angle
/// density at the shading point, for a hit at distance `t` on a surface
/// with unit normal `ns`.
pub fn pdf_area_to_solid_angle(pdf_area: f64, t: f64, ns: DVec3, wi: DVec3) -> f64 {
    pdf_area * t * t / wi.dot(ns).abs()
}

/// Discrete draws proportional to a running list of nonnegative weights.
#[derive(Clone, Default)]
pub struct ValueProportionalSampler {
    values: Vec<f64>,
    sum: f64,
}

impl ValueProportionalSampler {
    pub fn add(&mut self, value: f64) {
        debug_assert!(value >= 0.0 && value.is_finite());
        self.values.push(value);
        self.sum += value;
    }

    pub fn size(&self) -> usize {
        self.values.len()
    }

    pub fn probability(&self, i: usize) -> f64 {
        self.values[i] / self.sum
    }

    pub fn sample(&self, random: &mut (impl RandomSource + ?Sized)) -> usize {
        let x = random.uniform_range(0.0, self.sum);
        let mut accum = 0.0;
        for (i, value) in self.values.iter().enumerate() {
            accum += value;
            if x < accum {
                return i;
            }
        }
        self.values.len() - 1
    }
}
