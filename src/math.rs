use glam::DVec3;

/// Right-handed frame with `zaxis` along the supplied unit vector.
///
/// Branchless construction from Duff et al., "Building an Orthonormal
/// Basis, Revisited", JCGT 2017.
pub struct OrthonormalBasis {
    pub xaxis: DVec3,
    pub yaxis: DVec3,
    pub zaxis: DVec3,
}

impl OrthonormalBasis {
    pub fn new(zaxis: DVec3) -> Self {
        let sign = 1.0f64.copysign(zaxis.z);
        let a = -1.0 / (sign + zaxis.z);
        let b = zaxis.x * zaxis.y * a;
        Self {
            xaxis: DVec3::new(1.0 + sign * zaxis.x * zaxis.x * a, sign * b, -sign * zaxis.x),
            yaxis: DVec3::new(b, sign + zaxis.y * zaxis.y * a, -zaxis.y),
            zaxis,
        }
    }

    pub fn local_to_global(&self, v: DVec3) -> DVec3 {
        self.xaxis * v.x + self.yaxis * v.y + self.zaxis * v.z
    }

    pub fn global_to_local(&self, v: DVec3) -> DVec3 {
        DVec3::new(self.xaxis.dot(v), self.yaxis.dot(v), self.zaxis.dot(v))
    }
}

/// ax + by + cz + d = 0, n = {a, b, c}
#[derive(Clone, Copy, Debug)]
pub struct PlaneEquation {
    pub n: DVec3,
    pub d: f64,
}

impl PlaneEquation {
    pub fn from_point_and_normal(point_on_plane: DVec3, normalized_normal: DVec3) -> Self {
        Self {
            n: normalized_normal,
            d: -point_on_plane.dot(normalized_normal),
        }
    }

    pub fn signed_distance(&self, p: DVec3) -> f64 {
        self.n.dot(p) + self.d
    }

    pub fn intersect_ray(&self, ro: DVec3, rd: DVec3) -> Option<f64> {
        let eps = 1.0e-5;
        let denom = self.n.dot(rd);
        if denom.abs() < eps {
            return None;
        }
        let tmin = -(self.n.dot(ro) + self.d) / denom;
        if tmin < 0.0 {
            return None;
        }
        Some(tmin)
    }
}

pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a * (1.0 - t) + b * t
}

pub fn triangle_normal(p0: DVec3, p1: DVec3, p2: DVec3) -> DVec3 {
    (p1 - p0).cross(p2 - p0).normalize()
}

pub fn triangle_area(p0: DVec3, p1: DVec3, p2: DVec3) -> f64 {
    0.5 * (p1 - p0).cross(p2 - p0).length()
}

/// Nearest hit of a ray against a single triangle, Möller-Trumbore.
/// Returns (t, u, v) with the first vertex carrying weight 1-u-v.
pub fn intersect_triangle(
    ro: DVec3,
    rd: DVec3,
    a: DVec3,
    b: DVec3,
    c: DVec3,
) -> Option<(f64, f64, f64)> {
    let edge1 = b - a;
    let edge2 = c - a;

    let pv = rd.cross(edge2);

    // determinant near zero: ray lies in the triangle plane
    let det = edge1.dot(pv);
    if det.abs() < 1.0e-12 {
        return None;
    }

    let inv_det = 1.0 / det;
    let tv = ro - a;

    let u = tv.dot(pv) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let qv = tv.cross(edge1);
    let v = rd.dot(qv) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = edge2.dot(qv) * inv_det;
    if t <= 0.0 {
        return None;
    }

    Some((t, u, v))
}
