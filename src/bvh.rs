//! Median-split bounding volume hierarchy over a flat triangle soup.
//! This is the crate's built-in intersect kernel; the estimator only ever
//! talks to it through `Scene::intersect`.

use glam::DVec3;

use crate::math::intersect_triangle;

#[derive(Clone, Copy, Default)]
struct BvhNode {
    aabb_min: DVec3,
    aabb_max: DVec3,
    // left child if triangle_count is 0, else first indirect index
    left_node_or_triangle_index: u32,
    triangle_count: u32,
}

impl BvhNode {
    fn update_aabb(&mut self, vertices: &[DVec3], triangles: &[[u32; 3]], indirect: &[u32]) {
        self.aabb_min = DVec3::splat(f64::INFINITY);
        self.aabb_max = DVec3::splat(f64::NEG_INFINITY);

        for i in 0..self.triangle_count {
            let triangle =
                triangles[indirect[(self.left_node_or_triangle_index + i) as usize] as usize];
            let v0 = vertices[triangle[0] as usize];
            let v1 = vertices[triangle[1] as usize];
            let v2 = vertices[triangle[2] as usize];

            self.aabb_min = self.aabb_min.min(v0.min(v1).min(v2));
            self.aabb_max = self.aabb_max.max(v0.max(v1).max(v2));
        }
    }

    fn is_leaf(&self) -> bool {
        self.triangle_count > 0
    }
}

#[derive(Clone, Copy)]
pub struct TraceResult {
    pub triangle_index: u32,
    pub t: f64,
    pub u: f64,
    pub v: f64,
    pub hit: bool,
}

impl Default for TraceResult {
    fn default() -> Self {
        Self {
            triangle_index: 0,
            t: f64::INFINITY,
            u: 0.0,
            v: 0.0,
            hit: false,
        }
    }
}

fn intersect_aabb(aabb_min: DVec3, aabb_max: DVec3, ro: DVec3, rd: DVec3, prev_min_t: f64) -> f64 {
    let tx1 = (aabb_min.x - ro.x) / rd.x;
    let tx2 = (aabb_max.x - ro.x) / rd.x;
    let mut tmin = tx1.min(tx2);
    let mut tmax = tx1.max(tx2);
    let ty1 = (aabb_min.y - ro.y) / rd.y;
    let ty2 = (aabb_max.y - ro.y) / rd.y;
    tmin = tmin.max(ty1.min(ty2));
    tmax = tmax.min(ty1.max(ty2));
    let tz1 = (aabb_min.z - ro.z) / rd.z;
    let tz2 = (aabb_max.z - ro.z) / rd.z;
    tmin = tmin.max(tz1.min(tz2));
    tmax = tmax.min(tz1.max(tz2));
    if tmax >= tmin && tmax > 0.0 && tmin < prev_min_t {
        tmin
    } else {
        f64::INFINITY
    }
}

pub struct Bvh {
    nodes: Vec<BvhNode>,
    indirect_indices: Vec<u32>,
}

impl Bvh {
    pub fn build(vertices: &[DVec3], triangles: &[[u32; 3]]) -> Bvh {
        if triangles.is_empty() {
            return Self {
                nodes: Vec::new(),
                indirect_indices: Vec::new(),
            };
        }

        let mut indirect_indices: Vec<u32> = (0..triangles.len() as u32).collect();
        let centroids = triangles
            .iter()
            .map(|triangle| {
                let v0 = vertices[triangle[0] as usize];
                let v1 = vertices[triangle[1] as usize];
                let v2 = vertices[triangle[2] as usize];
                (v0 + v1 + v2) / 3.0
            })
            .collect::<Vec<_>>();

        let mut nodes = vec![BvhNode::default(); triangles.len() * 2 - 1];
        let mut node_count = 1;

        let root = &mut nodes[0];
        root.left_node_or_triangle_index = 0;
        root.triangle_count = triangles.len() as u32;
        root.update_aabb(vertices, triangles, &indirect_indices);

        let mut stack = vec![0];
        while let Some(node_idx) = stack.pop() {
            let node = &mut nodes[node_idx];
            if node.triangle_count <= 2 {
                continue;
            }

            // split along the widest axis at the midpoint
            let extent = node.aabb_max - node.aabb_min;
            let mut axis = 0;
            if extent.y > extent.x {
                axis = 1;
            }
            if extent.z > extent[axis] {
                axis = 2;
            }
            let split = node.aabb_min[axis] + extent[axis] * 0.5;

            // partition the triangles
            let mut a = node.left_node_or_triangle_index;
            let mut b = a + node.triangle_count - 1;
            while a <= b {
                let centroid = centroids[indirect_indices[a as usize] as usize][axis];
                if centroid < split {
                    a += 1;
                } else {
                    indirect_indices.swap(a as usize, b as usize);
                    if b == 0 {
                        break;
                    }
                    b -= 1;
                }
            }

            // if either side comes out empty the split failed, keep the leaf
            let left_count = a - node.left_node_or_triangle_index;
            if left_count == 0 || left_count == node.triangle_count {
                continue;
            }

            // create children
            let prev_triangle_idx = node.left_node_or_triangle_index;
            let prev_triangle_count = node.triangle_count;
            let left_idx = node_count;
            let right_idx = node_count + 1;
            node_count += 2;
            node.left_node_or_triangle_index = left_idx as u32;
            node.triangle_count = 0;
            nodes[left_idx].left_node_or_triangle_index = prev_triangle_idx;
            nodes[left_idx].triangle_count = left_count;
            nodes[right_idx].left_node_or_triangle_index = a;
            nodes[right_idx].triangle_count = prev_triangle_count - left_count;
            nodes[left_idx].update_aabb(vertices, triangles, &indirect_indices);
            nodes[right_idx].update_aabb(vertices, triangles, &indirect_indices);

            stack.push(right_idx);
            stack.push(left_idx);
        }

        nodes.truncate(node_count);
        Self {
            nodes,
            indirect_indices,
        }
    }

    /// Nearest hit along the open interval (0, inf), front-to-back order.
    pub fn intersect_nearest(
        &self,
        vertices: &[DVec3],
        triangles: &[[u32; 3]],
        ro: DVec3,
        rd: DVec3,
    ) -> TraceResult {
        let mut result = TraceResult::default();
        if self.nodes.is_empty() {
            return result;
        }

        let mut stack = vec![0usize];
        while let Some(node_index) = stack.pop() {
            let node = &self.nodes[node_index];
            if node.is_leaf() {
                for i in 0..node.triangle_count {
                    let triangle_index =
                        self.indirect_indices[(node.left_node_or_triangle_index + i) as usize];
                    let triangle = triangles[triangle_index as usize];
                    let a = vertices[triangle[0] as usize];
                    let b = vertices[triangle[1] as usize];
                    let c = vertices[triangle[2] as usize];

                    if let Some((t, u, v)) = intersect_triangle(ro, rd, a, b, c) {
                        if t < result.t {
                            result = TraceResult {
                                triangle_index,
                                t,
                                u,
                                v,
                                hit: true,
                            };
                        }
                    }
                }
            } else {
                // visit the closer child first
                let mut min_index = node.left_node_or_triangle_index as usize;
                let mut max_index = min_index + 1;
                let min_child = &self.nodes[min_index];
                let max_child = &self.nodes[max_index];
                let mut min_dist =
                    intersect_aabb(min_child.aabb_min, min_child.aabb_max, ro, rd, result.t);
                let mut max_dist =
                    intersect_aabb(max_child.aabb_min, max_child.aabb_max, ro, rd, result.t);
                if min_dist > max_dist {
                    std::mem::swap(&mut min_index, &mut max_index);
                    std::mem::swap(&mut min_dist, &mut max_dist);
                }

                // if the closer child is missed, so is the other
                if min_dist.is_infinite() {
                    continue;
                }

                if max_dist.is_finite() {
                    stack.push(max_index);
                }
                stack.push(min_index); // popped first
            }
        }

        result
    }
}
