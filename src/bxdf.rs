//! Material models. All variants share one capability set: emission,
//! reflectance value, proposal sampling, and the density of the proposal,
//! so the estimator can mix them under a single balance heuristic.

use glam::DVec3;

use crate::rng::RandomSource;
use crate::sampling::CosThetaProportionalSampler;

/// Index into the scene's material table. The table outlives every
/// estimator call, so a plain index stands in for a borrowed reference.
pub type MaterialId = usize;

/// Hit-point data the intersect kernel hands to the estimator.
/// `ng` is the geometric face normal as produced by the kernel: outward
/// for the triangle winding, not normalized, and possibly opposing the
/// incoming ray. Barycentric (u, v) weight the second and third vertex;
/// the first carries 1 - u - v.
#[derive(Clone, Copy, Debug)]
pub struct ShadingPoint {
    pub ng: DVec3,
    pub u: f64,
    pub v: f64,
    pub material: MaterialId,
}

#[derive(Clone, Debug)]
pub struct LambertianBrdf {
    pub le: DVec3,
    pub r: DVec3,
    pub back_emission: bool,
    /// Per-vertex shading normals, interpolated with the barycentrics.
    pub shading_normals: Option<[DVec3; 3]>,
}

impl Default for LambertianBrdf {
    fn default() -> Self {
        Self {
            le: DVec3::ZERO,
            r: DVec3::ONE,
            back_emission: false,
            shading_normals: None,
        }
    }
}

impl LambertianBrdf {
    pub fn diffuse(r: DVec3) -> Self {
        Self {
            r,
            ..Default::default()
        }
    }

    pub fn emissive(le: DVec3) -> Self {
        Self {
            le,
            ..Default::default()
        }
    }

    fn emission(&self, wo: DVec3, shading_point: &ShadingPoint) -> DVec3 {
        // emitters are one-sided unless flagged otherwise
        if !self.back_emission && shading_point.ng.dot(wo) < 0.0 {
            return DVec3::ZERO;
        }
        self.le
    }

    fn bxdf(&self, wo: DVec3, wi: DVec3, shading_point: &ShadingPoint) -> DVec3 {
        // zero contribution when wo, wi straddle the surface
        if shading_point.ng.dot(wi) * shading_point.ng.dot(wo) < 0.0 {
            return DVec3::ZERO;
        }

        if let Some(nv) = &self.shading_normals {
            let ns = ((1.0 - shading_point.u - shading_point.v) * nv[0]
                + shading_point.u * nv[1]
                + shading_point.v * nv[2])
                .normalize();
            let ratio = (ns.dot(wi) / shading_point.ng.dot(wi)).abs();
            return ratio * self.r * std::f64::consts::FRAC_1_PI;
        }

        self.r * std::f64::consts::FRAC_1_PI
    }

    fn sample(
        &self,
        random: &mut dyn RandomSource,
        wo: DVec3,
        shading_point: &ShadingPoint,
    ) -> DVec3 {
        let flipped = wo.dot(shading_point.ng) < 0.0;
        let ng = if flipped {
            -shading_point.ng
        } else {
            shading_point.ng
        };
        CosThetaProportionalSampler::sample(&mut *random, ng)
    }

    fn pdf(&self, wo: DVec3, sampled_wi: DVec3, shading_point: &ShadingPoint) -> f64 {
        // zero density when wo, wi straddle the surface
        if shading_point.ng.dot(sampled_wi) * shading_point.ng.dot(wo) < 0.0 {
            return 0.0;
        }
        let flipped = sampled_wi.dot(shading_point.ng) < 0.0;
        let ng = if flipped {
            -shading_point.ng
        } else {
            shading_point.ng
        };
        let p = CosThetaProportionalSampler::pdf(sampled_wi, ng);
        debug_assert!(p >= 0.0);
        p
    }
}

/// Closed set of material kinds, dispatched on the tag. Keeps the hot
/// loop free of virtual calls and per-hit allocation.
#[derive(Clone, Debug)]
pub enum Bxdf {
    Lambertian(LambertianBrdf),
}

impl Bxdf {
    /// Radiance emitted along `wo`.
    pub fn emission(&self, wo: DVec3, shading_point: &ShadingPoint) -> DVec3 {
        match self {
            Bxdf::Lambertian(brdf) => brdf.emission(wo, shading_point),
        }
    }

    /// Bidirectional reflectance value for the (wo, wi) pair.
    pub fn bxdf(&self, wo: DVec3, wi: DVec3, shading_point: &ShadingPoint) -> DVec3 {
        match self {
            Bxdf::Lambertian(brdf) => brdf.bxdf(wo, wi, shading_point),
        }
    }

    /// Draw a proposal direction from the material's preferred density.
    pub fn sample(
        &self,
        random: &mut dyn RandomSource,
        wo: DVec3,
        shading_point: &ShadingPoint,
    ) -> DVec3 {
        match self {
            Bxdf::Lambertian(brdf) => brdf.sample(random, wo, shading_point),
        }
    }

    /// Density `sample` would have produced `sampled_wi` with.
    pub fn pdf(&self, wo: DVec3, sampled_wi: DVec3, shading_point: &ShadingPoint) -> f64 {
        match self {
            Bxdf::Lambertian(brdf) => brdf.pdf(wo, sampled_wi, shading_point),
        }
    }

    /// Whether this material participates as a direct-sampling target.
    pub fn can_direct_sample(&self) -> bool {
        match self {
            Bxdf::Lambertian(_) => true,
        }
    }

    pub fn is_emissive(&self) -> bool {
        match self {
            Bxdf::Lambertian(brdf) => brdf.le != DVec3::ZERO,
        }
    }
}
