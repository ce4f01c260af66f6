//! Environment lighting, including the alias-table importance sampler
//! over equirectangular radiance images.

use std::f64::consts::{PI, TAU};
use std::path::Path;

use glam::DVec3;
use thiserror::Error;

use crate::alias::{AliasTable, AliasTableError};
use crate::math::lerp;
use crate::rng::RandomSource;

#[derive(Debug, Error)]
pub enum EnvmapError {
    #[error("failed to load environment image")]
    Image(#[from] image::ImageError),
    #[error("environment image has no pixels")]
    EmptyImage,
    #[error("environment image carries no energy")]
    NoEnergy(#[from] AliasTableError),
}

/// Plain RGB radiance grid.
#[derive(Clone)]
pub struct Image2d {
    width: usize,
    height: usize,
    values: Vec<DVec3>,
}

impl Image2d {
    pub fn new(width: usize, height: usize, values: Vec<DVec3>) -> Self {
        assert_eq!(values.len(), width * height);
        Self {
            width,
            height,
            values,
        }
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, EnvmapError> {
        let bitmap = image::open(path)?.to_rgb32f();
        let (width, height) = bitmap.dimensions();
        let values = bitmap
            .pixels()
            .map(|p| DVec3::new(p.0[0] as f64, p.0[1] as f64, p.0[2] as f64))
            .collect();
        Ok(Self::new(width as usize, height as usize, values))
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn at(&self, x: usize, y: usize) -> DVec3 {
        self.values[y * self.width + x]
    }
}

pub fn luminance(radiance: DVec3) -> f64 {
    0.2126 * radiance.x + 0.7152 * radiance.y + 0.0722 * radiance.z
}

/// Radiance arriving from infinity. Implementations must keep `sample`
/// and `pdf` consistent: `pdf` evaluated at a sampled direction is the
/// density `sample` drew it with.
pub trait Environment: Send + Sync {
    fn radiance(&self, rd: DVec3) -> DVec3;
    fn sample(&self, random: &mut dyn RandomSource) -> DVec3;
    fn pdf(&self, rd: DVec3) -> f64;
}

pub struct ConstantEnvironment {
    pub radiance: DVec3,
}

impl Environment for ConstantEnvironment {
    fn radiance(&self, _rd: DVec3) -> DVec3 {
        self.radiance
    }

    fn sample(&self, random: &mut dyn RandomSource) -> DVec3 {
        crate::sampling::uniform_on_unit_sphere(random)
    }

    fn pdf(&self, _rd: DVec3) -> f64 {
        1.0 / (4.0 * PI)
    }
}

/// Importance sampler over an equirectangular radiance image.
///
/// Directional convention (used identically by `radiance`, `sample` and
/// `pdf`): the polar axis is +y, theta = acos(y) in [0, pi] maps to rows
/// top-down, and the image is azimuthally clockwise, phi = -2*pi * x / W
/// with phi measured from +z toward +x.
pub struct ImageEnvironment {
    image: Image2d,
    alias: AliasTable,
    pdf: Vec<f64>,
}

// solid angle of the band between two polar angles, per pixel column
fn solid_angle_sliced_sphere(beg_theta: f64, end_theta: f64, width: usize) -> f64 {
    let beg_y = beg_theta.cos();
    let end_y = end_theta.cos();
    (beg_y - end_y) * TAU / width as f64
}

impl ImageEnvironment {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, EnvmapError> {
        Self::from_image(Image2d::open(path)?)
    }

    pub fn from_image(image: Image2d) -> Result<Self, EnvmapError> {
        let (width, height) = (image.width(), image.height());
        if width == 0 || height == 0 {
            return Err(EnvmapError::EmptyImage);
        }
        let theta_step = PI / height as f64;

        // selection weight: luminance times pixel solid angle
        let mut weights = vec![0.0; width * height];
        for y in 0..height {
            let beg_theta = theta_step * y as f64;
            let sr = solid_angle_sliced_sphere(beg_theta, beg_theta + theta_step, width);
            for x in 0..width {
                weights[y * width + x] = luminance(image.at(x, y)) * sr;
            }
        }
        let alias = AliasTable::new(&weights)?;

        // selection probability converted to direction-space density
        let mut pdf = vec![0.0; width * height];
        for iy in 0..height {
            let beg_theta = theta_step * iy as f64;
            let sr = solid_angle_sliced_sphere(beg_theta, beg_theta + theta_step, width);
            for ix in 0..width {
                let index = iy * width + ix;
                pdf[index] = alias.probability(index) / sr;
            }
        }

        Ok(Self { image, alias, pdf })
    }

    /// theta in [0, pi], phi in [0, 2*pi). None when the direction is
    /// degenerate enough that acos/atan2 go non-finite.
    fn spherical_coordinate_positive(&self, rd: DVec3) -> Option<(f64, f64)> {
        let z = rd.y;
        let x = rd.z;
        let y = rd.x;
        let theta = z.acos();
        let mut phi = y.atan2(x);
        if phi < 0.0 {
            phi += TAU;
        }
        if !theta.is_finite() || !phi.is_finite() {
            return None;
        }
        Some((theta, phi))
    }

    fn pixel_of_direction(&self, rd: DVec3) -> Option<(usize, usize)> {
        let (theta, phi) = self.spherical_coordinate_positive(rd)?;

        // 1 - reverses the clockwise azimuth
        let u = 1.0 - phi / TAU;
        let v = theta / PI;

        let ix = ((u * self.image.width() as f64) as usize).min(self.image.width() - 1);
        let iy = ((v * self.image.height() as f64) as usize).min(self.image.height() - 1);
        Some((ix, iy))
    }
}

impl Environment for ImageEnvironment {
    fn radiance(&self, rd: DVec3) -> DVec3 {
        match self.pixel_of_direction(rd) {
            Some((ix, iy)) => self.image.at(ix, iy),
            None => DVec3::ZERO,
        }
    }

    fn sample(&self, random: &mut dyn RandomSource) -> DVec3 {
        let index = self.alias.sample(random.uniform(), random.uniform());
        let ix = index % self.image.width();
        let iy = index / self.image.width();

        // jitter inside the chosen pixel, uniform in azimuth and in
        // cos(theta) so the density is constant over the pixel footprint
        let sample_x = ix as f64 + random.uniform();
        let phi = -TAU * sample_x / self.image.width() as f64;

        let theta_step = PI / self.image.height() as f64;
        let beg_y = (theta_step * iy as f64).cos();
        let end_y = (theta_step * (iy + 1) as f64).cos();
        let y = lerp(beg_y, end_y, random.uniform());
        let r_xz = (1.0 - y * y).max(0.0).sqrt();

        DVec3::new(r_xz * phi.sin(), y, r_xz * phi.cos())
    }

    fn pdf(&self, rd: DVec3) -> f64 {
        match self.pixel_of_direction(rd) {
            Some((ix, iy)) => self.pdf[iy * self.image.width() + ix],
            None => 0.0,
        }
    }
}
