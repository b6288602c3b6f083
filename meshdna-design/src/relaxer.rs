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
//! Coarse relaxation of a cylinder model.
//!
//! Every cylinder is a free rigid body. Springs pull the connected prime ends together, a weak
//! tether holds each body near the place where it started and, for rigid bundles, stiff springs
//! keep the two cylinders of a bundle together. Cylinders whose axes come closer than one helix
//! diameter push each other away. The system is integrated one frame at a time so that the
//! caller can stop after any step.

use crate::cylinders::{CylinderId, CylinderModel, PrimePos};
use crate::utils::any_orthogonal;
use crate::RelaxParameters;
use mathru::algebra::linear::vector::vector::Vector;
use mathru::analysis::differential_equation::ordinary::{ExplicitODE, Kutta3};
use rand::Rng;
use rand_distr::{Distribution, Uniform};
use std::collections::HashSet;
use ultraviolet::{Bivec3, Mat3, Rotor3, Vec3};

/// Duration of one relaxation step, in seconds.
pub const TIME_STEP: f32 = 1. / 30.;
const SOLVER_STEP: f32 = 1e-3;

const MASS: f32 = 1.;
const K_SPRING: f32 = 2.;
/// Rest length of prime end springs, relative to the scale.
const SPRING_REST_LENGTH: f32 = 0.05;
const K_BUNDLE: f32 = 10.;
const K_TETHER: f32 = 1.;
const FLOOR_STRENGTH: f32 = 0.001;
/// Tether of cylinders that have no bundle partner.
const ISOLATED_FLOOR_STRENGTH: f32 = 2.;
const K_COLLISION: f32 = 10.;
const K_FRICTION: f32 = 1.;
const MAX_FORCE: f32 = 100.;
const INITIAL_SPEED: f32 = 0.2;

struct RigidCylinder {
    cylinder: CylinderId,
    half_length: f32,
    /// In the frame of the cylinder.
    inertia_inverse: Mat3,
    /// Where the tether pulls the center of the body.
    anchor: Vec3,
    tether_strength: f32,
}

/// A spring between two points attached to bodies. Points are given in the frame of their
/// body, relatively to its center.
struct Spring {
    body_0: usize,
    point_0: Vec3,
    body_1: usize,
    point_1: Vec3,
    rest_length: f32,
    stiffness: f32,
}

pub struct Relaxer {
    bodies: Vec<RigidCylinder>,
    springs: Vec<Spring>,
    /// Distance under which two axes repel each other.
    collision_distance: f32,
    /// Pairs `(i, j)`, `i < j`, of bodies joined at a prime end. They may touch at that end.
    joined: HashSet<(usize, usize)>,
    initial_state: Vector<f32>,
    last_state: Option<Vector<f32>>,
    time_span: (f32, f32),
}

impl Relaxer {
    pub fn new(model: &CylinderModel, parameters: &RelaxParameters) -> Self {
        Self::with_rng(model, parameters, &mut rand::thread_rng())
    }

    pub fn with_rng<R: Rng>(
        model: &CylinderModel,
        parameters: &RelaxParameters,
        rng: &mut R,
    ) -> Self {
        let na_parameters = model.parameters();
        let radius = na_parameters.radius * model.scale;
        let mut bodies = Vec::with_capacity(model.len());
        let mut joined = HashSet::new();
        let tether_strengths = tether_strengths(model, parameters.floor_constraints);

        for c in model.cylinders() {
            let length = c.world_length(na_parameters);
            let tether_strength = tether_strengths[c.id.0];
            for prime in PrimePos::ALL.iter() {
                if let Some((n, _)) = c.neighbour(*prime) {
                    if n != c.id {
                        joined.insert((c.id.0.min(n.0), c.id.0.max(n.0)));
                    }
                }
            }
            bodies.push(RigidCylinder {
                cylinder: c.id,
                half_length: length / 2.,
                inertia_inverse: inertia_cylinder(length, radius).inversed(),
                anchor: c.center(na_parameters),
                tether_strength,
            });
        }

        let local_point = |c: CylinderId, world: Vec3| {
            let cylinder = model.cylinder(c);
            (world - cylinder.center(na_parameters)).rotated_by(cylinder.orientation.reversed())
        };

        let mut springs = Vec::new();
        if parameters.spring_constraints {
            for c in model.cylinders() {
                for prime in [PrimePos::First3, PrimePos::Second5].iter() {
                    if let Some((n, p2)) = c.neighbour(*prime) {
                        let point_0 = c.prime_position(*prime, na_parameters);
                        let point_1 = model.cylinder(n).prime_position(p2, na_parameters);
                        springs.push(Spring {
                            body_0: c.id.0,
                            point_0: local_point(c.id, point_0),
                            body_1: n.0,
                            point_1: local_point(n, point_1),
                            rest_length: SPRING_REST_LENGTH * model.scale,
                            stiffness: K_SPRING,
                        });
                    }
                }
            }
        }
        if parameters.bundle_constraints {
            for b in model.bundles().iter().filter(|b| b.is_rigid) {
                if let [c0, c1] = b.cylinders[..] {
                    let (cyl_0, cyl_1) = (model.cylinder(c0), model.cylinder(c1));
                    let top_0 = cyl_0.position + cyl_0.axis() * 2. * bodies[c0.0].half_length;
                    let top_1 = cyl_1.position + cyl_1.axis() * 2. * bodies[c1.0].half_length;
                    let pairs = [
                        (cyl_0.position, top_1),
                        (top_0, cyl_1.position),
                        (cyl_0.center(na_parameters), cyl_1.center(na_parameters)),
                    ];
                    for (p0, p1) in pairs.iter() {
                        springs.push(Spring {
                            body_0: c0.0,
                            point_0: local_point(c0, *p0),
                            body_1: c1.0,
                            point_1: local_point(c1, *p1),
                            rest_length: (*p1 - *p0).mag(),
                            stiffness: K_BUNDLE,
                        });
                    }
                }
            }
        }

        let speed = Uniform::new_inclusive(-INITIAL_SPEED, INITIAL_SPEED);
        let mut state = Vec::with_capacity(13 * bodies.len());
        for body in bodies.iter() {
            let c = model.cylinder(body.cylinder);
            let position = c.center(na_parameters);
            state.push(position.x);
            state.push(position.y);
            state.push(position.z);

            let rotation = c.orientation;
            state.push(rotation.s);
            state.push(rotation.bv.xy);
            state.push(rotation.bv.xz);
            state.push(rotation.bv.yz);

            let linear_momentum = Vec3::new(
                speed.sample(rng),
                speed.sample(rng),
                speed.sample(rng),
            ) * MASS;
            state.push(linear_momentum.x);
            state.push(linear_momentum.y);
            state.push(linear_momentum.z);

            let angular_momentum = Vec3::zero();
            state.push(angular_momentum.x);
            state.push(angular_momentum.y);
            state.push(angular_momentum.z);
        }

        log::debug!(
            "Relaxer with {} bodies and {} springs",
            bodies.len(),
            springs.len()
        );
        Self {
            bodies,
            springs,
            collision_distance: 2. * radius,
            joined,
            initial_state: Vector::new_row(state.len(), state),
            last_state: None,
            time_span: (0., TIME_STEP),
        }
    }

    /// Advance the simulation by one time step and move the cylinders accordingly.
    ///
    /// The cylinders of `model` are all updated at once, after the integration.
    pub fn step(&mut self, model: &mut CylinderModel) {
        let solver = Kutta3::new(SOLVER_STEP);
        if let Ok((_, y)) = solver.solve(&*self) {
            if let Some(state) = y.last() {
                self.last_state = Some(state.clone());
            }
        }
        let (positions, rotations, _, _) = self.read_state(&self.init_cond());
        for (i, body) in self.bodies.iter().enumerate() {
            let (center, rotation) = (positions[i], rotations[i]);
            if !(center.x.is_finite() && center.y.is_finite() && center.z.is_finite()) {
                log::warn!("Cylinder {} diverged, not moving it", body.cylinder.0);
                continue;
            }
            let base = center - Vec3::unit_y().rotated_by(rotation) * body.half_length;
            model.set_transform(body.cylinder, base, rotation);
        }
    }

    /// Run `iterations` steps and return the relax score before and after.
    pub fn relax(&mut self, model: &mut CylinderModel, iterations: usize) -> (f32, f32) {
        let initial_score = model.relax_score();
        for _ in 0..iterations {
            self.step(model);
        }
        let final_score = model.relax_score();
        log::info!(
            "Relaxed {} steps, score {:.2} -> {:.2}",
            iterations,
            initial_score,
            final_score
        );
        (initial_score, final_score)
    }

    fn forces_and_torques(
        &self,
        positions: &[Vec3],
        orientations: &[Rotor3],
    ) -> (Vec<Vec3>, Vec<Vec3>) {
        let mut forces = vec![Vec3::zero(); self.bodies.len()];
        let mut torques = vec![Vec3::zero(); self.bodies.len()];

        for spring in self.springs.iter() {
            let point_0 =
                positions[spring.body_0] + spring.point_0.rotated_by(orientations[spring.body_0]);
            let point_1 =
                positions[spring.body_1] + spring.point_1.rotated_by(orientations[spring.body_1]);
            let len = (point_1 - point_0).mag();

            // The force applied on point 0
            let force = if len > 1e-5 {
                clamp(spring.stiffness * (len - spring.rest_length) * (point_1 - point_0) / len)
            } else {
                Vec3::zero()
            };

            forces[spring.body_0] += force;
            forces[spring.body_1] -= force;

            torques[spring.body_0] += (point_0 - positions[spring.body_0]).cross(force);
            torques[spring.body_1] += (point_1 - positions[spring.body_1]).cross(-force);
        }

        for i in 0..self.bodies.len() {
            for j in (i + 1)..self.bodies.len() {
                if self.joined.contains(&(i, j)) {
                    continue;
                }
                let (a, b) = self.axis_segment(i, positions[i], orientations[i]);
                let (c, d) = self.axis_segment(j, positions[j], orientations[j]);
                let (point_i, point_j) = closest_points(a, b, c, d);
                let vec = point_i - point_j;
                let dist = vec.mag();
                if dist >= self.collision_distance {
                    continue;
                }
                let dir = if dist > 1e-5 {
                    vec / dist
                } else {
                    any_orthogonal(b - a)
                };
                // The force applied on body i
                let force = clamp(K_COLLISION * (self.collision_distance - dist) * dir);
                forces[i] += force;
                forces[j] -= force;
                torques[i] += (point_i - positions[i]).cross(force);
                torques[j] += (point_j - positions[j]).cross(-force);
            }
        }

        for (i, body) in self.bodies.iter().enumerate() {
            if body.tether_strength > 0. {
                let pull = (body.anchor - positions[i]) * K_TETHER;
                let mag = pull.mag();
                forces[i] += if mag > body.tether_strength {
                    pull * (body.tether_strength / mag)
                } else {
                    pull
                };
            }
        }

        (forces, torques)
    }

    fn axis_segment(&self, body: usize, center: Vec3, orientation: Rotor3) -> (Vec3, Vec3) {
        let half = Vec3::unit_y().rotated_by(orientation) * self.bodies[body].half_length;
        (center - half, center + half)
    }

    fn read_state(&self, x: &Vector<f32>) -> (Vec<Vec3>, Vec<Rotor3>, Vec<Vec3>, Vec<Vec3>) {
        let mut positions = Vec::with_capacity(self.bodies.len());
        let mut rotations = Vec::with_capacity(self.bodies.len());
        let mut linear_momentums = Vec::with_capacity(self.bodies.len());
        let mut angular_momentums = Vec::with_capacity(self.bodies.len());
        let values: Vec<f32> = x.iter().cloned().collect();
        for chunk in values.chunks_exact(13) {
            positions.push(Vec3::new(chunk[0], chunk[1], chunk[2]));
            rotations.push(
                Rotor3::new(chunk[3], Bivec3::new(chunk[4], chunk[5], chunk[6])).normalized(),
            );
            linear_momentums.push(Vec3::new(chunk[7], chunk[8], chunk[9]));
            angular_momentums.push(Vec3::new(chunk[10], chunk[11], chunk[12]));
        }
        (positions, rotations, linear_momentums, angular_momentums)
    }
}

impl ExplicitODE<f32> for Relaxer {
    // For each body, the state holds
    // * 3 f32 for the position of the center
    // * 4 f32 for the rotation
    // * 3 f32 for linear momentum
    // * 3 f32 for angular momentum

    fn func(&self, _t: &f32, x: &Vector<f32>) -> Vector<f32> {
        let (positions, rotations, linear_momentums, angular_momentums) = self.read_state(x);
        let (forces, torques) = self.forces_and_torques(&positions, &rotations);

        let mut ret = Vec::with_capacity(13 * self.bodies.len());
        for (i, body) in self.bodies.iter().enumerate() {
            let d_position = linear_momentums[i] / MASS;
            ret.push(d_position.x);
            ret.push(d_position.y);
            ret.push(d_position.z);

            let local_momentum = angular_momentums[i].rotated_by(rotations[i].reversed());
            let omega = (body.inertia_inverse * local_momentum).rotated_by(rotations[i]);
            let d_rotation = 0.5
                * Rotor3::from_quaternion_array([omega.x, omega.y, omega.z, 0f32])
                * rotations[i];
            ret.push(d_rotation.s);
            ret.push(d_rotation.bv.xy);
            ret.push(d_rotation.bv.xz);
            ret.push(d_rotation.bv.yz);

            let d_linear_momentum = forces[i] - linear_momentums[i] * K_FRICTION / MASS;
            ret.push(d_linear_momentum.x);
            ret.push(d_linear_momentum.y);
            ret.push(d_linear_momentum.z);

            let d_angular_momentum = torques[i] - angular_momentums[i] * K_FRICTION / MASS;
            ret.push(d_angular_momentum.x);
            ret.push(d_angular_momentum.y);
            ret.push(d_angular_momentum.z);
        }

        Vector::new_row(ret.len(), ret)
    }

    fn time_span(&self) -> (f32, f32) {
        self.time_span
    }

    fn init_cond(&self) -> Vector<f32> {
        if let Some(state) = self.last_state.clone() {
            state
        } else {
            self.initial_state.clone()
        }
    }
}

fn clamp(force: Vec3) -> Vec3 {
    let mag = force.mag();
    if mag > MAX_FORCE {
        force * (MAX_FORCE / mag)
    } else {
        force
    }
}

/// Strength of the tether of each cylinder.
///
/// A cylinder without bundle partner is held strongly in place, unless one of its neighbours
/// already is.
fn tether_strengths(model: &CylinderModel, floor_constraints: bool) -> Vec<f32> {
    if !floor_constraints {
        return vec![0.; model.len()];
    }
    let mut visited = vec![false; model.len()];
    model
        .cylinders()
        .iter()
        .map(|c| {
            if !visited[c.id.0] && model.partner(c.id).is_none() {
                for prime in PrimePos::ALL.iter() {
                    if let Some((n, _)) = c.neighbour(*prime) {
                        visited[n.0] = true;
                    }
                }
                ISOLATED_FLOOR_STRENGTH
            } else {
                FLOOR_STRENGTH
            }
        })
        .collect()
}

/// The closest points of the segments [a, b] and [c, d].
///
/// When the segments are parallel the points are taken in the middle of their overlap.
fn closest_points(a: Vec3, b: Vec3, c: Vec3, d: Vec3) -> (Vec3, Vec3) {
    let u = b - a;
    let v = d - c;
    let w = a - c;
    let uu = u.mag_sq();
    let vv = v.mag_sq();
    if uu < 1e-10 || vv < 1e-10 {
        return (a, c);
    }
    let uv = u.dot(v);
    let denom = uu * vv - uv * uv;
    let (lambda, mu) = if denom < 1e-6 * uu * vv {
        let t_c = (c - a).dot(u) / uu;
        let t_d = (d - a).dot(u) / uu;
        let low = t_c.min(t_d).max(0.);
        let high = t_c.max(t_d).min(1.);
        let lambda = if low <= high {
            (low + high) / 2.
        } else if t_c.max(t_d) < 0. {
            0.
        } else {
            1.
        };
        let mu = ((a + u * lambda - c).dot(v) / vv).max(0.).min(1.);
        (lambda, mu)
    } else {
        let lambda = ((uv * v.dot(w) - vv * u.dot(w)) / denom).max(0.).min(1.);
        let mu = ((uv * lambda + v.dot(w)) / vv).max(0.).min(1.);
        // mu may have been clamped, project back on [a, b]
        let lambda = ((mu * uv - u.dot(w)) / uu).max(0.).min(1.);
        (lambda, mu)
    };
    (a + u * lambda, c + v * mu)
}

/// Inertia matrix of a cylinder of axis e_y, radius r and height h with respect to its center of
/// mass.
fn inertia_cylinder(h: f32, r: f32) -> Mat3 {
    let c = MASS * r * r / 2.;
    let a = MASS * (r * r / 4. + h * h / 12.);
    Mat3::new(a * Vec3::unit_x(), c * Vec3::unit_y(), a * Vec3::unit_z())
}
