//! Camera frustum used to cull chunk bounds before drawing

use crate::core::types::{Mat4, Vec3, Vec4};
use super::aabb::Aabb;

/// Half-space `normal·p + distance >= 0`. Normals point into the frustum.
#[derive(Clone, Copy, Debug)]
pub struct Plane {
    pub normal: Vec3,
    pub distance: f32,
}

impl Plane {
    pub fn new(normal: Vec3, distance: f32) -> Self {
        Self { normal, distance }
    }

    /// Plane through `point` facing `normal`
    pub fn from_point_normal(point: Vec3, normal: Vec3) -> Self {
        let normal = normal.normalize_or_zero();
        Self {
            normal,
            distance: -normal.dot(point),
        }
    }

    /// Plane from packed `(a, b, c, d)` coefficients, rescaled to a unit normal
    fn from_coefficients(c: Vec4) -> Self {
        let len = c.truncate().length();
        if len == 0.0 {
            return Self::new(Vec3::ZERO, c.w);
        }
        Self::new(c.truncate() / len, c.w / len)
    }

    /// Signed distance, negative on the culled side
    pub fn distance_to_point(&self, point: Vec3) -> f32 {
        self.normal.dot(point) + self.distance
    }

    /// Box corner furthest along the normal. If it is behind the plane, so
    /// is the whole box.
    fn farthest_corner(&self, aabb: &Aabb) -> Vec3 {
        Vec3::select(self.normal.cmpge(Vec3::ZERO), aabb.max, aabb.min)
    }
}

/// Six inward-facing planes, ordered near, far, left, right, top, bottom
#[derive(Clone, Copy, Debug)]
pub struct Frustum {
    pub planes: [Plane; 6],
}

impl Frustum {
    /// Planes of the clip volume of `view_proj`, expressed in world space.
    ///
    /// Assumes glam's 0..1 depth range (`perspective_rh`, `orthographic_rh`).
    pub fn from_view_projection(view_proj: &Mat4) -> Self {
        let [x, y, z, w] = [0, 1, 2, 3].map(|i| view_proj.row(i));
        let plane = Plane::from_coefficients;
        Self {
            planes: [
                plane(z),
                plane(w - z),
                plane(w + x),
                plane(w - x),
                plane(w - y),
                plane(w + y),
            ],
        }
    }

    /// Build a frustum from a camera basis.
    ///
    /// `forward`, `right` and `up` must be orthonormal. `fov_y` is the full
    /// vertical field of view in radians and `aspect` is width / height.
    /// The four side planes pass through `position`; all normals point inward.
    #[allow(clippy::too_many_arguments)]
    pub fn from_camera(
        position: Vec3,
        forward: Vec3,
        right: Vec3,
        up: Vec3,
        fov_y: f32,
        aspect: f32,
        near: f32,
        far: f32,
    ) -> Self {
        let half_v = far * (fov_y * 0.5).tan();
        let half_h = half_v * aspect;
        let far_center = forward * far;

        let near_plane = Plane::from_point_normal(position + forward * near, forward);
        let far_plane = Plane::from_point_normal(position + far_center, -forward);
        let left = Plane::from_point_normal(position, (far_center - right * half_h).cross(up));
        let right_plane = Plane::from_point_normal(position, up.cross(far_center + right * half_h));
        let bottom = Plane::from_point_normal(position, right.cross(far_center - up * half_v));
        let top = Plane::from_point_normal(position, (far_center + up * half_v).cross(right));

        Self {
            planes: [near_plane, far_plane, left, right_plane, top, bottom],
        }
    }

    /// Point on the inner side of every plane
    pub fn contains_point(&self, point: Vec3) -> bool {
        self.planes.iter().all(|p| p.distance_to_point(point) >= 0.0)
    }

    /// Conservative box test for chunk culling.
    ///
    /// A box is dropped only when a single plane has it entirely on the
    /// outside; boxes straddling a corner of the frustum are kept.
    pub fn intersects_aabb(&self, aabb: &Aabb) -> bool {
        self.planes
            .iter()
            .all(|p| p.distance_to_point(p.farthest_corner(aabb)) >= 0.0)
    }
}
