//! Immutable render-time scene: flattened triangle soup behind a BVH,
//! the material table, the cached luminaire list, and the camera.

use std::sync::Arc;

use glam::DVec3;
use thiserror::Error;

use crate::bvh::Bvh;
use crate::bxdf::{Bxdf, MaterialId, ShadingPoint};
use crate::envmap::Environment;
use crate::math::{self, PlaneEquation};

#[derive(Debug, Error)]
pub enum SceneError {
    #[error("scene has no camera")]
    MissingCamera,
    #[error("mesh supplies {materials} materials for {triangles} triangles")]
    MaterialCountMismatch { triangles: usize, materials: usize },
}

/// Pinhole camera with an explicit object-plane basis. All basis vectors
/// are unit length; `left = -right` and `up = -down`.
#[derive(Clone, Debug)]
pub struct Camera {
    pub resolution_x: u32,
    pub resolution_y: u32,
    pub eye: DVec3,
    pub forward: DVec3,
    pub right: DVec3,
    pub down: DVec3,
    pub up: DVec3,
    pub left: DVec3,
    pub object_plane_width: f64,
    pub object_plane_height: f64,
    pub focus_distance: f64,
}

impl Camera {
    /// Aim at `center` from `eye` with the given vertical field of view
    /// (radians). The object plane is placed at the focus distance
    /// `|center - eye|`.
    pub fn look_at(
        eye: DVec3,
        center: DVec3,
        up_hint: DVec3,
        fov_y: f64,
        resolution_x: u32,
        resolution_y: u32,
    ) -> Self {
        let forward = (center - eye).normalize();
        let right = forward.cross(up_hint).normalize();
        let down = forward.cross(right).normalize();

        let focus_distance = (center - eye).length();
        let object_plane_height = 2.0 * focus_distance * (fov_y * 0.5).tan();
        let object_plane_width =
            object_plane_height * resolution_x as f64 / resolution_y as f64;

        Self {
            resolution_x,
            resolution_y,
            eye,
            forward,
            right,
            down,
            up: -down,
            left: -right,
            object_plane_width,
            object_plane_height,
            focus_distance,
        }
    }
}

/// One emissive triangle, cached with everything the direct sampler
/// needs per shading point.
#[derive(Clone, Debug)]
pub struct Luminaire {
    pub points: [DVec3; 3],
    pub ng: DVec3,
    pub area: f64,
    pub plane: PlaneEquation,
    pub material: MaterialId,
}

/// Input geometry: triangle list with one material per primitive.
pub struct TriangleMesh {
    pub points: Vec<DVec3>,
    pub indices: Vec<[u32; 3]>,
    pub materials: Vec<Bxdf>,
}

impl TriangleMesh {
    /// Every primitive shares one material.
    pub fn uniform(points: Vec<DVec3>, indices: Vec<[u32; 3]>, material: Bxdf) -> Self {
        let materials = vec![material; indices.len()];
        Self {
            points,
            indices,
            materials,
        }
    }
}

pub struct SceneBuilder {
    meshes: Vec<TriangleMesh>,
    camera: Option<Camera>,
    environment: Option<Arc<dyn Environment>>,
}

impl SceneBuilder {
    pub fn new() -> Self {
        Self {
            meshes: Vec::new(),
            camera: None,
            environment: None,
        }
    }

    pub fn camera(mut self, camera: Camera) -> Self {
        self.camera = Some(camera);
        self
    }

    pub fn add_mesh(mut self, mesh: TriangleMesh) -> Self {
        self.meshes.push(mesh);
        self
    }

    pub fn environment(mut self, environment: Arc<dyn Environment>) -> Self {
        self.environment = Some(environment);
        self
    }

    pub fn build(self) -> Result<Scene, SceneError> {
        let camera = self.camera.ok_or(SceneError::MissingCamera)?;

        // flatten all meshes into one soup; one material entry per triangle
        let mut vertices = Vec::new();
        let mut triangles = Vec::new();
        let mut material_ids = Vec::new();
        let mut materials = Vec::new();
        for mesh in self.meshes {
            if mesh.materials.len() != mesh.indices.len() {
                return Err(SceneError::MaterialCountMismatch {
                    triangles: mesh.indices.len(),
                    materials: mesh.materials.len(),
                });
            }
            let offset = vertices.len() as u32;
            vertices.extend_from_slice(&mesh.points);
            for (triangle, material) in mesh.indices.iter().zip(mesh.materials) {
                triangles.push([
                    triangle[0] + offset,
                    triangle[1] + offset,
                    triangle[2] + offset,
                ]);
                material_ids.push(materials.len());
                materials.push(material);
            }
        }

        // enumerate emissive primitives once; the estimator samples these
        let mut luminaires = Vec::new();
        for (i, triangle) in triangles.iter().enumerate() {
            if !materials[material_ids[i]].is_emissive() {
                continue;
            }
            let p0 = vertices[triangle[0] as usize];
            let p1 = vertices[triangle[1] as usize];
            let p2 = vertices[triangle[2] as usize];
            let area = math::triangle_area(p0, p1, p2);
            if area <= 1.0e-12 {
                log::warn!("skipping degenerate luminaire triangle {}", i);
                continue;
            }
            let ng = math::triangle_normal(p0, p1, p2);
            luminaires.push(Luminaire {
                points: [p0, p1, p2],
                ng,
                area,
                plane: PlaneEquation::from_point_and_normal(p0, ng),
                material: material_ids[i],
            });
        }

        let bvh = Bvh::build(&vertices, &triangles);
        log::info!(
            "scene built: {} triangles, {} luminaires",
            triangles.len(),
            luminaires.len()
        );

        Ok(Scene {
            vertices,
            triangles,
            material_ids,
            materials,
            luminaires,
            bvh,
            camera,
            environment: self.environment,
        })
    }
}

impl Default for SceneBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Scene {
    vertices: Vec<DVec3>,
    triangles: Vec<[u32; 3]>,
    material_ids: Vec<MaterialId>,
    materials: Vec<Bxdf>,
    luminaires: Vec<Luminaire>,
    bvh: Bvh,
    camera: Camera,
    environment: Option<Arc<dyn Environment>>,
}

impl Scene {
    /// Nearest intersection along (0, inf). Callers are expected to have
    /// nudged `ro` off any surface they start on.
    pub fn intersect(&self, ro: DVec3, rd: DVec3) -> Option<(f64, ShadingPoint)> {
        let result = self.bvh.intersect_nearest(&self.vertices, &self.triangles, ro, rd);
        if !result.hit {
            return None;
        }

        let triangle = self.triangles[result.triangle_index as usize];
        let p0 = self.vertices[triangle[0] as usize];
        let p1 = self.vertices[triangle[1] as usize];
        let p2 = self.vertices[triangle[2] as usize];

        Some((
            result.t,
            ShadingPoint {
                // raw geometric normal for the winding; the estimator
                // normalizes
                ng: (p1 - p0).cross(p2 - p0),
                u: result.u,
                v: result.v,
                material: self.material_ids[result.triangle_index as usize],
            },
        ))
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn luminaires(&self) -> &[Luminaire] {
        &self.luminaires
    }

    pub fn materials(&self) -> &[Bxdf] {
        &self.materials
    }

    pub fn material(&self, id: MaterialId) -> &Bxdf {
        &self.materials[id]
    }

    pub fn environment(&self) -> Option<&dyn Environment> {
        self.environment.as_deref()
    }
}
