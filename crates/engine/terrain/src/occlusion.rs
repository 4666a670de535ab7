//! Horizon culling against an ellipsoid
//!
//! Positions are tested in the ellipsoid's scaled space, where the ellipsoid
//! becomes a unit sphere. A tile is hidden behind the horizon when its
//! occludee point (computed once at tessellation time) is not visible.

use glam::DVec3;

use crate::ellipsoid::Ellipsoid;

/// Determines whether points are hidden behind the ellipsoid's horizon as seen
/// from a camera
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EllipsoidalOccluder {
    ellipsoid: Ellipsoid,
    camera_position: DVec3,
    camera_position_in_scaled_space: DVec3,
    distance_to_limb_in_scaled_space_squared: f64,
}

impl EllipsoidalOccluder {
    pub fn new(ellipsoid: &Ellipsoid) -> Self {
        Self {
            ellipsoid: *ellipsoid,
            camera_position: DVec3::ZERO,
            camera_position_in_scaled_space: DVec3::ZERO,
            distance_to_limb_in_scaled_space_squared: -1.0,
        }
    }

    /// Occluder for a camera at `camera_position` (Cartesian, metres)
    pub fn with_camera_position(mut self, camera_position: DVec3) -> Self {
        self.set_camera_position(camera_position);
        self
    }

    pub fn set_camera_position(&mut self, camera_position: DVec3) {
        let cv = self
            .ellipsoid
            .transform_position_to_scaled_space(camera_position);
        self.camera_position = camera_position;
        self.camera_position_in_scaled_space = cv;
        self.distance_to_limb_in_scaled_space_squared = cv.length_squared() - 1.0;
    }

    pub fn ellipsoid(&self) -> &Ellipsoid {
        &self.ellipsoid
    }

    pub fn camera_position(&self) -> DVec3 {
        self.camera_position
    }

    /// Check if a Cartesian point is in front of the horizon
    pub fn is_point_visible(&self, occludee: DVec3) -> bool {
        let scaled = self.ellipsoid.transform_position_to_scaled_space(occludee);
        self.is_scaled_space_point_visible(scaled)
    }

    /// Check if a point already in scaled space is in front of the horizon
    pub fn is_scaled_space_point_visible(&self, occludee_scaled: DVec3) -> bool {
        let cv = self.camera_position_in_scaled_space;
        let vh_magnitude_squared = self.distance_to_limb_in_scaled_space_squared;
        let vt = occludee_scaled - cv;
        let vt_dot_vc = -vt.dot(cv);

        // Below the surface the culling plane passes through the camera
        let occluded = if vh_magnitude_squared < 0.0 {
            vt_dot_vc > 0.0
        } else {
            vt_dot_vc > vh_magnitude_squared
                && vt_dot_vc * vt_dot_vc / vt.length_squared() > vh_magnitude_squared
        };
        !occluded
    }

    /// Scaled-space point along `direction_to_point` that is visible exactly
    /// when any of `positions` may be visible
    ///
    /// Returns `None` when no such point exists, for example when the
    /// positions span more than a hemisphere.
    pub fn compute_horizon_culling_point(
        &self,
        direction_to_point: DVec3,
        positions: &[DVec3],
    ) -> Option<DVec3> {
        horizon_culling_point(&self.ellipsoid, direction_to_point, positions)
    }

    /// Like [`Self::compute_horizon_culling_point`], but against the
    /// ellipsoid shrunk by `minimum_height` when positions lie below its
    /// surface
    pub fn compute_horizon_culling_point_possibly_under_ellipsoid(
        &self,
        direction_to_point: DVec3,
        positions: &[DVec3],
        minimum_height: f64,
    ) -> Option<DVec3> {
        let shrunk = self.ellipsoid.possibly_shrunk(minimum_height);
        horizon_culling_point(&shrunk, direction_to_point, positions)
    }
}

fn horizon_culling_point(
    ellipsoid: &Ellipsoid,
    direction_to_point: DVec3,
    positions: &[DVec3],
) -> Option<DVec3> {
    let scaled_direction = scaled_space_direction(ellipsoid, direction_to_point);
    let mut result_magnitude: f64 = 0.0;
    for &position in positions {
        let candidate = magnitude(ellipsoid, position, scaled_direction);
        if candidate < 0.0 {
            return None;
        }
        result_magnitude = result_magnitude.max(candidate);
    }
    magnitude_to_point(scaled_direction, result_magnitude)
}

fn scaled_space_direction(ellipsoid: &Ellipsoid, direction_to_point: DVec3) -> DVec3 {
    if direction_to_point == DVec3::ZERO {
        return direction_to_point;
    }
    ellipsoid
        .transform_position_to_scaled_space(direction_to_point)
        .normalize_or_zero()
}

/// Distance along `scaled_direction` at which a point sees `position` exactly
/// on its horizon
fn magnitude(ellipsoid: &Ellipsoid, position: DVec3, scaled_direction: DVec3) -> f64 {
    let scaled_position = ellipsoid.transform_position_to_scaled_space(position);
    let magnitude_squared = scaled_position.length_squared();
    let magnitude = magnitude_squared.sqrt();
    let direction = scaled_position / magnitude;

    // Points below the surface count as on it
    let magnitude_squared = magnitude_squared.max(1.0);
    let magnitude = magnitude.max(1.0);

    let cos_alpha = direction.dot(scaled_direction);
    let sin_alpha = direction.cross(scaled_direction).length();
    let cos_beta = 1.0 / magnitude;
    let sin_beta = (magnitude_squared - 1.0).sqrt() * cos_beta;

    1.0 / (cos_alpha * cos_beta - sin_alpha * sin_beta)
}

fn magnitude_to_point(scaled_direction: DVec3, result_magnitude: f64) -> Option<DVec3> {
    if result_magnitude <= 0.0 || !result_magnitude.is_finite() {
        return None;
    }
    Some(scaled_direction * result_magnitude)
}
