//! SO(3) utilities for comparing orientations.
//!
//! Unit quaternions double-cover SO(3): `q` and `-q` encode the same
//! rotation. Any distance between orientations must therefore be computed on
//! `|⟨q1, q2⟩|`, otherwise two identical rotations with opposite signs look
//! half a turn apart.

use nalgebra::UnitQuaternion;

/// Shortest-arc rotation angle between two orientations, in `[0, π]`.
///
/// ```text
/// θ = 2 · acos(|⟨q1, q2⟩|)
/// ```
#[inline]
pub fn quat_angle_between(q1: &UnitQuaternion<f64>, q2: &UnitQuaternion<f64>) -> f64 {
    let dot = q1.coords.dot(&q2.coords).abs().min(1.0);
    2.0 * dot.acos()
}
