// Contract checks for the material capability set.

use glam::DVec3;

use radiant::bxdf::{Bxdf, LambertianBrdf, ShadingPoint};
use radiant::rng::XoroshiroPlus128;
use radiant::sampling::uniform_on_unit_sphere;

fn shading_point(ng: DVec3) -> ShadingPoint {
    ShadingPoint {
        ng,
        u: 0.25,
        v: 0.25,
        material: 0,
    }
}

#[test]
fn lambertian_is_reciprocal_and_nonnegative() {
    let brdf = Bxdf::Lambertian(LambertianBrdf::diffuse(DVec3::new(0.8, 0.5, 0.2)));
    let sp = shading_point(DVec3::Y);

    let mut random = XoroshiroPlus128::new(2);
    for _ in 0..10000 {
        let wo = uniform_on_unit_sphere(&mut random);
        let wi = uniform_on_unit_sphere(&mut random);

        let forward = brdf.bxdf(wo, wi, &sp);
        let backward = brdf.bxdf(wi, wo, &sp);
        assert_eq!(forward, backward);
        assert!(forward.min_element() >= 0.0);

        // directions straddling the surface carry no contribution and no
        // density
        if sp.ng.dot(wo) * sp.ng.dot(wi) < 0.0 {
            assert_eq!(forward, DVec3::ZERO);
            assert_eq!(brdf.pdf(wo, wi, &sp), 0.0);
        }
    }
}

#[test]
fn lambertian_samples_on_the_outgoing_side() {
    let brdf = Bxdf::Lambertian(LambertianBrdf::diffuse(DVec3::splat(0.5)));
    let sp = shading_point(DVec3::Y);

    let mut random = XoroshiroPlus128::new(3);
    for _ in 0..10000 {
        let wo = uniform_on_unit_sphere(&mut random);
        let wi = brdf.sample(&mut random, wo, &sp);

        // proposals always share wo's side of the geometric normal
        assert!(sp.ng.dot(wo) * sp.ng.dot(wi) > 0.0);
        assert!(brdf.pdf(wo, wi, &sp) > 0.0);
    }
}

#[test]
fn emission_is_one_sided_by_default() {
    let le = DVec3::new(2.0, 1.0, 0.5);
    let sp = shading_point(DVec3::Y);

    let front = DVec3::new(0.3, 0.8, 0.1).normalize();
    let back = DVec3::new(0.3, -0.8, 0.1).normalize();

    let one_sided = Bxdf::Lambertian(LambertianBrdf::emissive(le));
    assert_eq!(one_sided.emission(front, &sp), le);
    assert_eq!(one_sided.emission(back, &sp), DVec3::ZERO);

    let two_sided = Bxdf::Lambertian(LambertianBrdf {
        le,
        back_emission: true,
        ..Default::default()
    });
    assert_eq!(two_sided.emission(back, &sp), le);
}

#[test]
fn shading_normals_scale_the_reflectance() {
    let nv = [DVec3::Y; 3];
    let brdf = Bxdf::Lambertian(LambertianBrdf {
        r: DVec3::splat(0.6),
        shading_normals: Some(nv),
        ..Default::default()
    });

    // identical shading and geometric normals cancel exactly
    let sp = shading_point(DVec3::Y);
    let wo = DVec3::new(0.0, 1.0, 0.0);
    let wi = DVec3::new(0.6, 0.8, 0.0).normalize();
    let value = brdf.bxdf(wo, wi, &sp);
    let plain = DVec3::splat(0.6) * std::f64::consts::FRAC_1_PI;
    assert!((value - plain).length() < 1.0e-12);
}
