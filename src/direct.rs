//! Per-shading-point sampler over the scene's luminaires.

use glam::DVec3;

use crate::math::intersect_triangle;
use crate::rng::RandomSource;
use crate::sampling::{pdf_area_to_solid_angle, uniform_on_triangle, ValueProportionalSampler};
use crate::scene::{Luminaire, Scene};

const VISIBILITY_EPS: f64 = 1.0e-6;

/// Built fresh at each shading point `p`. Luminaires on whose emitting
/// side `p` lies are candidates; the rest carry weight zero, which also
/// keeps a point from sampling the triangle it sits on.
pub struct DirectSampler<'a> {
    p: DVec3,
    luminaires: Vec<&'a Luminaire>,
    selector: ValueProportionalSampler,
}

impl<'a> DirectSampler<'a> {
    pub fn new(scene: &'a Scene, p: DVec3) -> Self {
        let mut luminaires = Vec::new();
        let mut selector = ValueProportionalSampler::default();
        for luminaire in scene.luminaires() {
            if luminaire.plane.signed_distance(p) > VISIBILITY_EPS {
                luminaires.push(luminaire);
                selector.add(1.0);
            }
        }
        Self {
            p,
            luminaires,
            selector,
        }
    }

    pub fn can_sample(&self) -> bool {
        self.selector.size() != 0
    }

    /// Direction from `p` toward a uniform point on one luminaire.
    pub fn sample(&self, random: &mut dyn RandomSource) -> DVec3 {
        let index = self.selector.sample(&mut *random);
        let luminaire = self.luminaires[index];
        let bary = uniform_on_triangle(random.uniform(), random.uniform());
        let point = bary.evaluate(luminaire.points[0], luminaire.points[1], luminaire.points[2]);
        (point - self.p).normalize()
    }

    /// Solid-angle density of `sample` producing `wi`. Luminaires that
    /// overlap along the direction add coherently.
    pub fn pdf(&self, wi: DVec3) -> f64 {
        let mut sum_pdf = 0.0;
        for (index, luminaire) in self.luminaires.iter().enumerate() {
            let hit = intersect_triangle(
                self.p,
                wi,
                luminaire.points[0],
                luminaire.points[1],
                luminaire.points[2],
            );
            if let Some((t, _, _)) = hit {
                let pdf_area = 1.0 / luminaire.area;
                sum_pdf += self.selector.probability(index)
                    * pdf_area_to_solid_angle(pdf_area, t, luminaire.ng, wi);
            }
        }
        sum_pdf
    }
}
