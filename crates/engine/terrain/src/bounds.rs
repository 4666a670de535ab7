//! Bounding volumes for tile meshes

use glam::{DMat3, DVec3};
use serde::{Deserialize, Serialize};

/// Sphere enclosing a set of points
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingSphere {
    pub center: DVec3,
    pub radius: f64,
}

impl BoundingSphere {
    pub fn new(center: DVec3, radius: f64) -> Self {
        Self { center, radius }
    }

    /// Tight sphere around `points`
    ///
    /// Runs Ritter's algorithm and also builds the sphere centred on the
    /// axis-aligned bounding box, returning whichever is smaller.
    pub fn from_points(points: &[DVec3]) -> Self {
        let Some(&first) = points.first() else {
            return Self::default();
        };

        // Extreme points along each axis
        let mut min_point = [first; 3];
        let mut max_point = [first; 3];
        for &p in &points[1..] {
            for axis in 0..3 {
                if p[axis] < min_point[axis][axis] {
                    min_point[axis] = p;
                }
                if p[axis] > max_point[axis][axis] {
                    max_point[axis] = p;
                }
            }
        }

        let spans = [0, 1, 2].map(|axis| max_point[axis].distance_squared(min_point[axis]));
        let mut widest = 0;
        for axis in 1..3 {
            if spans[axis] > spans[widest] {
                widest = axis;
            }
        }
        let (diameter_a, diameter_b) = (min_point[widest], max_point[widest]);

        let mut ritter_center = (diameter_a + diameter_b) * 0.5;
        let mut radius_squared = diameter_b.distance_squared(ritter_center);
        let mut ritter_radius = radius_squared.sqrt();

        let min_box = DVec3::new(min_point[0].x, min_point[1].y, min_point[2].z);
        let max_box = DVec3::new(max_point[0].x, max_point[1].y, max_point[2].z);
        let naive_center = (min_box + max_box) * 0.5;
        let mut naive_radius: f64 = 0.0;

        for &p in points {
            naive_radius = naive_radius.max(p.distance(naive_center));

            let old_center_to_point_squared = p.distance_squared(ritter_center);
            if old_center_to_point_squared > radius_squared {
                let old_center_to_point = old_center_to_point_squared.sqrt();
                ritter_radius = (ritter_radius + old_center_to_point) * 0.5;
                radius_squared = ritter_radius * ritter_radius;
                let old_to_new = old_center_to_point - ritter_radius;
                ritter_center =
                    (ritter_center * ritter_radius + p * old_to_new) / old_center_to_point;
            }
        }

        if ritter_radius < naive_radius {
            Self::new(ritter_center, ritter_radius)
        } else {
            Self::new(naive_center, naive_radius)
        }
    }

    /// Same sphere shifted by `offset`
    pub fn translated(&self, offset: DVec3) -> Self {
        Self::new(self.center + offset, self.radius)
    }

    /// Check if a point lies inside, with a relative tolerance on the radius
    pub fn contains(&self, point: DVec3) -> bool {
        point.distance(self.center) <= self.radius * (1.0 + 1e-9) + 1e-9
    }
}

/// Box with arbitrary orientation
///
/// The columns of `half_axes` point from the centre to the middle of three
/// faces; their lengths are the half extents.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct OrientedBoundingBox {
    pub center: DVec3,
    pub half_axes: DMat3,
}

impl OrientedBoundingBox {
    /// Smallest box with the axes of `rotation` (orthonormal columns) that
    /// encloses `points`
    pub fn from_points_with_rotation(points: &[DVec3], rotation: DMat3) -> Self {
        if points.is_empty() {
            return Self::default();
        }
        let inverse = rotation.transpose();
        let mut min = DVec3::splat(f64::INFINITY);
        let mut max = DVec3::splat(f64::NEG_INFINITY);
        for &p in points {
            let local = inverse * p;
            min = min.min(local);
            max = max.max(local);
        }

        let half = (max - min) * 0.5;
        Self {
            center: rotation * ((min + max) * 0.5),
            half_axes: DMat3::from_cols(
                rotation.x_axis * half.x,
                rotation.y_axis * half.y,
                rotation.z_axis * half.z,
            ),
        }
    }

    /// Half extent along each box axis
    pub fn half_extents(&self) -> DVec3 {
        DVec3::new(
            self.half_axes.x_axis.length(),
            self.half_axes.y_axis.length(),
            self.half_axes.z_axis.length(),
        )
    }

    /// The eight corners of the box
    pub fn corners(&self) -> [DVec3; 8] {
        let (u, v, w) = (
            self.half_axes.x_axis,
            self.half_axes.y_axis,
            self.half_axes.z_axis,
        );
        let mut corners = [self.center; 8];
        for (i, corner) in corners.iter_mut().enumerate() {
            let sx = if i & 1 == 0 { -1.0 } else { 1.0 };
            let sy = if i & 2 == 0 { -1.0 } else { 1.0 };
            let sz = if i & 4 == 0 { -1.0 } else { 1.0 };
            *corner += u * sx + v * sy + w * sz;
        }
        corners
    }

    /// Check if a point lies inside (faces inclusive, small tolerance)
    pub fn contains(&self, point: DVec3) -> bool {
        let offset = point - self.center;
        [
            self.half_axes.x_axis,
            self.half_axes.y_axis,
            self.half_axes.z_axis,
        ]
        .iter()
        .all(|axis| {
            let length_squared = axis.length_squared();
            if length_squared == 0.0 {
                // Zero-length axis has no direction to test along
                return true;
            }
            let t = offset.dot(*axis) / length_squared;
            t.abs() <= 1.0 + 1e-9
        })
    }
}
