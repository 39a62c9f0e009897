//! Conversions from the games' Z-up space into the Y-up space of built scenes

use glam::{EulerRot, Quat, Vec3};

/// Game units per scene unit
pub const WORLD_SCALE: f32 = 10.0;

/// Swaps the Y and Z axes. Used for positions, offsets and normals alike.
#[inline]
pub fn to_scene(v: Vec3) -> Vec3 {
    Vec3::new(v.x, v.z, v.y)
}

/// Scales a length from game units into scene units.
#[inline]
pub fn scale(value: f32) -> f32 {
    value * WORLD_SCALE
}

/// Converts a position into scene space, scaled.
#[inline]
pub fn to_scene_scaled(v: Vec3) -> Vec3 {
    to_scene(v) * WORLD_SCALE
}

/// Turns a pitch/yaw/roll triple (degrees) into a scene rotation.
///
/// The angles are negated, and applied roll first, then pitch, then yaw.
pub fn orientation(pyr: Vec3) -> Quat {
    Quat::from_euler(
        EulerRot::YXZ,
        (-pyr.y).to_radians(),
        (-pyr.x).to_radians(),
        (-pyr.z).to_radians(),
    )
}
