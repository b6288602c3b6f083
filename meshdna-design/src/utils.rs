/*
meshdna, routing of polyhedral meshes into DNA nanostructures.
    Copyright (C) 2021  Nicolas Levy <nicolaspierrelevy@gmail.com> and Nicolas Schabanel <nicolas.schabanel@ens-lyon.fr>

    This program is free software: you can redistribute it and/or modify
    it under the terms of the GNU General Public License as published by
    the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.

    This program is distributed in the hope that it will be useful,
    but WITHOUT ANY WARRANTY; without even the implied warranty of
    MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
    GNU General Public License for more details.

    You should have received a copy of the GNU General Public License
    along with this program.  If not, see <https://www.gnu.org/licenses/>.
*/
use ultraviolet::{Mat3, Rotor3, Vec3};

/// Vectors shorter than this are considered to have no direction.
pub const EPSILON: f32 = 1e-5;

/// Normalized copy of `v`, or `None` if `v` is too short to define a direction.
pub fn direction(v: Vec3) -> Option<Vec3> {
    let mag = v.mag();
    if mag > EPSILON && mag.is_finite() {
        Some(v / mag)
    } else {
        None
    }
}

/// A unit vector orthogonal to the unit vector `v`.
pub fn any_orthogonal(v: Vec3) -> Vec3 {
    let other = if v.x.abs() < 0.9 {
        Vec3::unit_x()
    } else {
        Vec3::unit_y()
    };
    v.cross(other).normalized()
}

/// Rotate `v` by `angle` around the unit vector `axis`, counterclockwise when the axis points
/// toward the viewer.
pub fn rotate_around_axis(v: Vec3, axis: Vec3, angle: f32) -> Vec3 {
    let (sin, cos) = angle.sin_cos();
    v * cos + axis.cross(v) * sin + axis * (axis.dot(v) * (1. - cos))
}

/// The rotation that maps the x and y axis on `x` and `y`.
///
/// `x` and `y` must be orthonormal.
pub fn rotor_from_frame(x: Vec3, y: Vec3) -> Rotor3 {
    let z = x.cross(y);
    Mat3::new(x, y, z).into_rotor3().normalized()
}

/// Signed angle in `[0, 2π)` from `from` to `to` measured counterclockwise around `normal`.
///
/// Both vectors are projected on the plane orthogonal to `normal` first.
pub fn ccw_angle(from: Vec3, to: Vec3, normal: Vec3) -> f32 {
    let from = from - normal * from.dot(normal);
    let to = to - normal * to.dot(normal);
    let angle = normal.dot(from.cross(to)).atan2(from.dot(to));
    if angle < 0. {
        angle + std::f32::consts::TAU
    } else {
        angle
    }
}
