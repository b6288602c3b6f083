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
//! Cylinders are the rigid double helices laid along the routed half-edges.
//!
//! The local frame of a cylinder has its y axis along the helix axis, oriented from the origin
//! to the destination of its half-edge. The first strand runs along +y and the second strand
//! runs back along -y. Local lengths are in nanometers, world lengths are local lengths
//! multiplied by the scale of the model.

use crate::graph::{EdgeId, Graph, HalfEdgeId};
use crate::parameters::{NaParameters, NaType};
use crate::routing::{Route, RoutingError};
use crate::utils::{any_orthogonal, direction, rotate_around_axis, rotor_from_frame};
use crate::RoutingParameters;
use ahash::AHashMap;
use ultraviolet::{Rotor3, Vec3};

/// Cylinders shorter than this cannot hold the crossovers placed near their ends.
pub const MIN_CYLINDER_LENGTH: usize = 31;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CylinderId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BundleId(pub usize);

/// The four strand ends of a cylinder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrimePos {
    First5,
    First3,
    Second5,
    Second3,
}

impl PrimePos {
    pub const ALL: [PrimePos; 4] = [
        PrimePos::First5,
        PrimePos::First3,
        PrimePos::Second5,
        PrimePos::Second3,
    ];

    fn index(self) -> usize {
        match self {
            Self::First5 => 0,
            Self::First3 => 1,
            Self::Second5 => 2,
            Self::Second3 => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoutingStrategy {
    Normal,
    /// The cylinder lies on an edge outside of the routing backbone. Its strand continues on
    /// the other cylinder of its bundle.
    Pseudoknot,
}

#[derive(Debug)]
pub enum CylinderError {
    InvalidScale(f32),
    ScaleTooSmall { cylinder: CylinderId, length: usize },
    Topology(String),
    Routing(RoutingError),
}

impl From<RoutingError> for CylinderError {
    fn from(e: RoutingError) -> Self {
        Self::Routing(e)
    }
}

impl std::fmt::Display for CylinderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidScale(scale) => write!(f, "Invalid scale {}.", scale),
            Self::ScaleTooSmall { length, .. } => write!(
                f,
                "A cylinder length is {} < {} nucleotides. Scale is too small.",
                length, MIN_CYLINDER_LENGTH
            ),
            Self::Topology(msg) => write!(f, "Inconsistent cylinder model: {}", msg),
            Self::Routing(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for CylinderError {}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Cylinder {
    pub id: CylinderId,
    /// World position of the base of the axis.
    pub position: Vec3,
    /// Maps the y axis on the helix axis, and the x axis on the direction pointing from the
    /// axis to the backbone of the first base pair.
    pub orientation: Rotor3,
    /// Number of base pairs.
    pub length: usize,
    pub scale: f32,
    pub routing_strategy: RoutingStrategy,
    pub bundle: Option<BundleId>,
    /// The half-edge along which the cylinder was created.
    pub half_edge: Option<HalfEdgeId>,
    neighbours: [Option<(CylinderId, PrimePos)>; 4],
}

impl Cylinder {
    pub fn new(
        id: CylinderId,
        position: Vec3,
        orientation: Rotor3,
        length: usize,
        scale: f32,
    ) -> Self {
        Self {
            id,
            position,
            orientation,
            length,
            scale,
            routing_strategy: RoutingStrategy::Normal,
            bundle: None,
            half_edge: None,
            neighbours: [None; 4],
        }
    }

    pub fn neighbour(&self, prime: PrimePos) -> Option<(CylinderId, PrimePos)> {
        self.neighbours[prime.index()]
    }

    pub fn is_fully_connected(&self) -> bool {
        self.neighbours.iter().all(Option::is_some)
    }

    /// Unit vector along the helix axis.
    pub fn axis(&self) -> Vec3 {
        Vec3::unit_y().rotated_by(self.orientation)
    }

    /// World length of the helix axis.
    pub fn world_length(&self, parameters: &NaParameters) -> f32 {
        self.length as f32 * parameters.rise * self.scale
    }

    pub fn center(&self, parameters: &NaParameters) -> Vec3 {
        self.position + self.axis() * (self.world_length(parameters) / 2.)
    }

    /// World position and orientation of the frame of a nucleotide.
    ///
    /// Nucleotides of the first strand are numbered from the base of the cylinder, those of the
    /// second strand from its top, so that `(first, i)` is paired with `(second, length - 1 - i)`.
    pub fn nucleotide_frame(
        &self,
        first_strand: bool,
        index: usize,
        parameters: &NaParameters,
    ) -> (Vec3, Rotor3) {
        let (pair_index, angle_shift, height_shift) = if first_strand {
            (index, 0., 0.)
        } else {
            (
                self.length.saturating_sub(1 + index),
                parameters.axis,
                parameters.inclination,
            )
        };
        let height = pair_index as f32 * parameters.rise + height_shift;
        let angle = pair_index as f32 * parameters.twist + angle_shift;
        let radial = rotate_around_axis(Vec3::unit_x(), Vec3::unit_y(), angle);
        // The backbone of a nucleotide is on its -y axis and its base normal on its -z axis.
        let (x, y) = if first_strand {
            (radial.cross(Vec3::unit_y()), -radial)
        } else {
            ((-radial).cross(Vec3::unit_y()), -radial)
        };
        let position =
            self.position + Vec3::new(0., height, 0.).rotated_by(self.orientation) * self.scale;
        let orientation = rotor_from_frame(
            x.rotated_by(self.orientation),
            y.rotated_by(self.orientation),
        );
        (position, orientation)
    }

    /// World position of the backbone of a nucleotide.
    pub fn backbone_position(
        &self,
        first_strand: bool,
        index: usize,
        parameters: &NaParameters,
    ) -> Vec3 {
        let (position, orientation) = self.nucleotide_frame(first_strand, index, parameters);
        position + (parameters.backbone_center() * self.scale).rotated_by(orientation)
    }

    /// World position of the backbone at a strand end.
    pub fn prime_position(&self, prime: PrimePos, parameters: &NaParameters) -> Vec3 {
        let last = self.length.saturating_sub(1);
        match prime {
            PrimePos::First5 => self.backbone_position(true, 0, parameters),
            PrimePos::First3 => self.backbone_position(true, last, parameters),
            PrimePos::Second5 => self.backbone_position(false, 0, parameters),
            PrimePos::Second3 => self.backbone_position(false, last, parameters),
        }
    }
}

/// The cylinders built on the two half-edges of an edge.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CylinderBundle {
    pub id: BundleId,
    pub cylinders: Vec<CylinderId>,
    /// The cylinders of a rigid bundle keep their relative position during relaxation.
    pub is_rigid: bool,
    pub edge: Option<EdgeId>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CylinderModel {
    pub scale: f32,
    pub na_type: NaType,
    cylinders: Vec<Cylinder>,
    bundles: Vec<CylinderBundle>,
}

impl CylinderModel {
    pub fn new(scale: f32, na_type: NaType) -> Self {
        Self {
            scale,
            na_type,
            cylinders: Vec::new(),
            bundles: Vec::new(),
        }
    }

    /// Create one cylinder per half-edge of the routes, connect the cylinders along each route
    /// and check that they are all long enough.
    pub fn from_routes(
        graph: &Graph,
        routes: &[Route],
        params: &RoutingParameters,
    ) -> Result<Self, CylinderError> {
        if !(params.scale.is_finite() && params.scale > 0.) {
            return Err(CylinderError::InvalidScale(params.scale));
        }
        let mut model = Self::new(params.scale, params.na_type);
        let offsets = VertexOffsets::new(
            graph,
            model.scale,
            model.parameters(),
            params.greedy_offset,
        );
        let mut bundle_of_edge: AHashMap<EdgeId, BundleId> = Default::default();

        let mut routes_cylinders = Vec::with_capacity(routes.len());
        for route in routes.iter() {
            let mut route_cylinders = Vec::with_capacity(route.len());
            for (he, strategy) in route.iter() {
                if he.0 >= graph.half_edges().len() {
                    return Err(RoutingError::UnknownHalfEdge(*he).into());
                }
                let id = model.create_cylinder(graph, *he, &offsets);
                let edge = graph.half_edge(*he).edge;
                let bundle = match bundle_of_edge.get(&edge) {
                    Some(bundle) => *bundle,
                    None => {
                        let bundle = model.create_bundle(Some(edge));
                        bundle_of_edge.insert(edge, bundle);
                        bundle
                    }
                };
                model.add_to_bundle(id, bundle);
                model.set_routing_strategy(id, *strategy);
                route_cylinders.push(id);
            }
            routes_cylinders.push(route_cylinders);
        }

        for route_cylinders in routes_cylinders.iter() {
            model.connect_route(route_cylinders)?;
        }

        // Lengths are checked once every cylinder has been created and connected.
        if let Some(c) = model
            .cylinders
            .iter()
            .find(|c| c.length < MIN_CYLINDER_LENGTH)
        {
            return Err(CylinderError::ScaleTooSmall {
                cylinder: c.id,
                length: c.length,
            });
        }
        log::info!(
            "Created {} cylinders in {} bundles",
            model.cylinders.len(),
            model.bundles.len()
        );
        Ok(model)
    }

    pub fn parameters(&self) -> &'static NaParameters {
        self.na_type.parameters()
    }

    pub fn cylinders(&self) -> &[Cylinder] {
        &self.cylinders
    }

    pub fn bundles(&self) -> &[CylinderBundle] {
        &self.bundles
    }

    pub fn cylinder(&self, id: CylinderId) -> &Cylinder {
        &self.cylinders[id.0]
    }

    pub fn get_cylinder(&self, id: CylinderId) -> Option<&Cylinder> {
        self.cylinders.get(id.0)
    }

    pub fn bundle(&self, id: BundleId) -> &CylinderBundle {
        &self.bundles[id.0]
    }

    pub fn len(&self) -> usize {
        self.cylinders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cylinders.is_empty()
    }

    /// Move a cylinder.
    pub fn set_transform(&mut self, id: CylinderId, position: Vec3, orientation: Rotor3) {
        if let Some(c) = self.cylinders.get_mut(id.0) {
            c.position = position;
            c.orientation = orientation;
        }
    }

    pub fn set_routing_strategy(&mut self, id: CylinderId, strategy: RoutingStrategy) {
        if let Some(c) = self.cylinders.get_mut(id.0) {
            c.routing_strategy = strategy;
        }
    }

    pub fn set_rigid(&mut self, bundle: BundleId, rigid: bool) {
        if let Some(b) = self.bundles.get_mut(bundle.0) {
            b.is_rigid = rigid;
        }
    }

    /// The other cylinder of the bundle of `id`, if any.
    pub fn partner(&self, id: CylinderId) -> Option<CylinderId> {
        let bundle = self.cylinder(id).bundle?;
        self.bundle(bundle)
            .cylinders
            .iter()
            .find(|c| **c != id)
            .cloned()
    }

    pub fn add_cylinder(
        &mut self,
        position: Vec3,
        orientation: Rotor3,
        length: usize,
    ) -> CylinderId {
        let id = CylinderId(self.cylinders.len());
        self.cylinders
            .push(Cylinder::new(id, position, orientation, length, self.scale));
        id
    }

    pub fn create_bundle(&mut self, edge: Option<EdgeId>) -> BundleId {
        let id = BundleId(self.bundles.len());
        self.bundles.push(CylinderBundle {
            id,
            cylinders: Vec::new(),
            is_rigid: true,
            edge,
        });
        id
    }

    pub fn add_to_bundle(&mut self, cylinder: CylinderId, bundle: BundleId) {
        self.bundles[bundle.0].cylinders.push(cylinder);
        self.cylinders[cylinder.0].bundle = Some(bundle);
    }

    /// Connect the prime end `p1` of `c1` with the prime end `p2` of `c2`, in both directions.
    pub fn connect(&mut self, c1: CylinderId, p1: PrimePos, c2: CylinderId, p2: PrimePos) {
        self.cylinders[c1.0].neighbours[p1.index()] = Some((c2, p2));
        self.cylinders[c2.0].neighbours[p2.index()] = Some((c1, p1));
    }

    fn create_cylinder(
        &mut self,
        graph: &Graph,
        he: HalfEdgeId,
        offsets: &VertexOffsets,
    ) -> CylinderId {
        let parameters = self.parameters();
        let p1 = graph.vertex(graph.origin(he)).position;
        let p2 = graph.vertex(graph.destination(he)).position;
        let edge_normal = graph.edge(graph.half_edge(he).edge).normal;

        let (orientation, length_bp, base) = match direction(p2 - p1) {
            Some(dir) => {
                let tangent =
                    direction(edge_normal.cross(dir)).unwrap_or_else(|| any_orthogonal(dir));
                let lateral = tangent * (-self.scale * parameters.radius);
                let p1_t = p1 + lateral + dir * offsets.get(he);
                let p2_t = p2 + lateral - dir * offsets.get(graph.twin(he));
                let available = if (p2_t - p1_t).dot(dir) < 0. {
                    0.
                } else {
                    (p2_t - p1_t).mag()
                };
                let bases_per_turn = parameters.bases_per_turn();
                let nb_turns = (available / self.scale / parameters.rise / bases_per_turn).floor();
                let length_bp = (nb_turns * bases_per_turn).floor().max(0.) as usize;
                let used = length_bp as f32 * self.scale * parameters.rise;
                let base = p1_t + dir * ((available - used) / 2.);
                let reference = rotate_around_axis(tangent, dir, parameters.axis);
                let orientation = rotor_from_frame(reference, dir);
                (orientation, length_bp, base)
            }
            None => {
                log::warn!("Half-edge {} has coincident endpoints", he.0);
                (Rotor3::identity(), 0, p1)
            }
        };
        let id = self.add_cylinder(base, orientation, length_bp);
        self.cylinders[id.0].half_edge = Some(he);
        id
    }

    /// Connect the 3' ends of each cylinder of a closed route to the 5' ends of the next one.
    ///
    /// After a pseudoknot cylinder, the route continues from the other cylinder of its bundle.
    fn connect_route(&mut self, route: &[CylinderId]) -> Result<(), CylinderError> {
        let mut prev = match route.first() {
            Some(c) => *c,
            None => return Ok(()),
        };
        for i in 1..=route.len() {
            let current = route[i % route.len()];
            self.connect(prev, PrimePos::First3, current, PrimePos::First5);
            self.connect(prev, PrimePos::Second5, current, PrimePos::Second3);

            prev = if self.cylinder(current).routing_strategy == RoutingStrategy::Pseudoknot {
                self.partner(current).ok_or_else(|| {
                    CylinderError::Topology(format!(
                        "pseudoknot cylinder {} has no partner",
                        current.0
                    ))
                })?
            } else {
                current
            };
        }
        Ok(())
    }

    /// Sum of the distances between connected prime ends, in nanometers.
    pub fn relax_score(&self) -> f32 {
        let parameters = self.parameters();
        let mut score = 0.;
        for c in self.cylinders.iter() {
            for prime in [PrimePos::First3, PrimePos::Second3].iter() {
                if let Some((n, p2)) = c.neighbour(*prime) {
                    if let Some(other) = self.get_cylinder(n) {
                        let d = c.prime_position(*prime, parameters)
                            - other.prime_position(p2, parameters);
                        score += d.mag();
                    }
                }
            }
        }
        score / self.scale
    }

    /// Check that neighbour relations are symmetric and that bundles and cylinders agree.
    pub fn check_invariants(&self) -> Result<(), CylinderError> {
        let topology = |msg: String| Err(CylinderError::Topology(msg));
        for (i, c) in self.cylinders.iter().enumerate() {
            if c.id.0 != i {
                return topology(format!("cylinder {} is stored at index {}", c.id.0, i));
            }
            for prime in PrimePos::ALL.iter() {
                if let Some((n, p2)) = c.neighbour(*prime) {
                    let back = self.get_cylinder(n).and_then(|n| n.neighbour(p2));
                    if back != Some((c.id, *prime)) {
                        return topology(format!(
                            "neighbour of cylinder {} at {:?} is not reciprocal",
                            i, prime
                        ));
                    }
                }
            }
            if let Some(b) = c.bundle {
                if !self
                    .bundles
                    .get(b.0)
                    .map(|b| b.cylinders.contains(&c.id))
                    .unwrap_or(false)
                {
                    return topology(format!("cylinder {} is not in its bundle", i));
                }
            }
        }
        Ok(())
    }
}

/// Distances by which cylinder ends are pulled back from the vertices.
struct VertexOffsets {
    /// Indexed by the half-edge leaving the vertex.
    offsets: Vec<f32>,
}

impl VertexOffsets {
    /// The ends of two bundles meeting at an angle θ do not overlap if they are pulled back
    /// by `w / tan(θ/2)` where `w` is the half width of a bundle.
    fn new(graph: &Graph, scale: f32, parameters: &NaParameters, greedy: bool) -> Self {
        let half_width = 2. * parameters.radius * scale;
        let mut offsets = vec![0f32; graph.half_edges().len()];
        for vertex in graph.vertices() {
            let leaving = vertex.half_edges();
            let directions: Vec<Option<Vec3>> = leaving
                .iter()
                .map(|he| direction(graph.half_edge_vector(*he)))
                .collect();
            let mut vertex_offsets = Vec::with_capacity(leaving.len());
            for (i, dir) in directions.iter().enumerate() {
                let min_angle = directions
                    .iter()
                    .enumerate()
                    .filter(|(j, _)| *j != i)
                    .filter_map(|(_, other)| {
                        let (a, b) = ((*dir)?, (*other)?);
                        Some(a.dot(b).max(-1.).min(1.).acos())
                    })
                    .fold(std::f32::consts::PI, f32::min);
                let tan = (min_angle / 2.).tan();
                let offset = if tan > 1e-6 {
                    half_width / tan
                } else {
                    f32::INFINITY
                };
                vertex_offsets.push(offset);
            }
            let uniform = vertex_offsets.iter().cloned().fold(0f32, f32::max);
            for (i, he) in leaving.iter().enumerate() {
                offsets[he.0] = if greedy { vertex_offsets[i] } else { uniform };
            }
        }
        Self { offsets }
    }

    fn get(&self, he: HalfEdgeId) -> f32 {
        let offset = self.offsets[he.0];
        // An infinite offset makes the available length negative, hence a zero length.
        if offset.is_finite() {
            offset
        } else {
            f32::MAX / 4.
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::MeshDescriptor;
    use crate::routing::{graph_to_wires, RoutingAlgorithm};
    use crate::tests::{cube, tetrahedron};
    use std::sync::Arc;

    fn tetrahedron_model(scale: f32) -> Result<CylinderModel, CylinderError> {
        let graph = Arc::new(Graph::from_mesh(&tetrahedron()).unwrap());
        let wires = graph_to_wires(RoutingAlgorithm::CycleCover, graph).unwrap();
        let params = RoutingParameters {
            scale,
            ..Default::default()
        };
        wires.to_cylinder_model(&params)
    }

    #[test]
    fn lengths_are_whole_turns() {
        let model = tetrahedron_model(0.1).unwrap();
        for c in model.cylinders() {
            // floor(k * 10.5) for an integer number of turns k
            let turns = (c.length as f32 / 10.5).round();
            assert_eq!(c.length, (turns * 10.5).floor() as usize);
        }
        assert_eq!(model.cylinders()[0].length, 399);
    }

    #[test]
    fn cylinders_are_fully_connected_and_symmetric() {
        let model = tetrahedron_model(0.1).unwrap();
        assert_eq!(model.len(), 12);
        assert_eq!(model.bundles().len(), 6);
        for c in model.cylinders() {
            assert!(c.is_fully_connected());
            for prime in PrimePos::ALL.iter() {
                let (n, p2) = c.neighbour(*prime).unwrap();
                assert_eq!(model.cylinder(n).neighbour(p2), Some((c.id, *prime)));
            }
        }
        model.check_invariants().unwrap();
    }

    #[test]
    fn large_scale_is_rejected() {
        match tetrahedron_model(100.) {
            Err(CylinderError::ScaleTooSmall { length, .. }) => assert!(length < 31),
            _ => panic!("expected a scale error"),
        }
        assert!(matches!(
            tetrahedron_model(-1.),
            Err(CylinderError::InvalidScale(_))
        ));
    }

    #[test]
    fn coincident_vertices_give_a_scale_error() {
        let mesh = MeshDescriptor {
            vertices: vec![[0., 0., 0.], [0., 0., 0.], [10., 0., 0.]],
            faces: vec![],
            edges: vec![[0, 1], [1, 2]],
        };
        let graph = Arc::new(Graph::from_mesh(&mesh).unwrap());
        let wires = graph_to_wires(RoutingAlgorithm::CycleCover, graph).unwrap();
        let ret = wires.to_cylinder_model(&Default::default());
        assert!(matches!(
            ret,
            Err(CylinderError::ScaleTooSmall { length: 0, .. })
        ));
    }

    #[test]
    fn bundle_cylinders_are_antiparallel_and_side_by_side() {
        let model = tetrahedron_model(0.1).unwrap();
        let parameters = model.parameters();
        for b in model.bundles() {
            assert_eq!(b.cylinders.len(), 2);
            let c1 = model.cylinder(b.cylinders[0]);
            let c2 = model.cylinder(b.cylinders[1]);
            assert!((c1.axis() + c2.axis()).mag() < 1e-4);
            assert_eq!(c1.length, c2.length);
            let d = c1.center(parameters) - c2.center(parameters);
            assert!((d.mag() - 2. * parameters.radius * model.scale).abs() < 1e-3);
        }
    }

    #[test]
    fn consecutive_prime_ends_are_close() {
        let model = tetrahedron_model(0.1).unwrap();
        let parameters = model.parameters();
        for c in model.cylinders() {
            let (n, p) = c.neighbour(PrimePos::First3).unwrap();
            let d = c.prime_position(PrimePos::First3, parameters)
                - model.cylinder(n).prime_position(p, parameters);
            // The ends are separated by the two vertex offsets
            assert!(d.mag() < 2.);
        }
    }

    #[test]
    fn pseudoknots_continue_on_their_partner() {
        let graph = Arc::new(Graph::from_mesh(&cube()).unwrap());
        let wires = graph_to_wires(RoutingAlgorithm::Veneziano, graph).unwrap();
        let model = wires.to_cylinder_model(&Default::default()).unwrap();
        model.check_invariants().unwrap();
        for c in model.cylinders() {
            assert!(c.is_fully_connected());
            if c.routing_strategy == RoutingStrategy::Pseudoknot {
                let partner = model.partner(c.id).unwrap();
                let (next, _) = model.cylinder(partner).neighbour(PrimePos::First3).unwrap();
                let (prev, _) = c.neighbour(PrimePos::First5).unwrap();
                let graph = wires.graph();
                let next_he = model.cylinder(next).half_edge.unwrap();
                let prev_he = model.cylinder(prev).half_edge.unwrap();
                assert_eq!(graph.destination(prev_he), graph.origin(next_he));
            }
        }
    }

    #[test]
    fn nucleotide_frames() {
        let model = tetrahedron_model(0.1).unwrap();
        let parameters = model.parameters();
        let c = &model.cylinders()[0];
        let (p0, r0) = c.nucleotide_frame(true, 0, parameters);
        assert!((p0 - c.position).mag() < 1e-5);
        // The base normal of the first strand points along the axis
        let normal = parameters.base_normal().rotated_by(r0);
        assert!((normal - c.axis()).mag() < 1e-4);
        let (_, r1) = c.nucleotide_frame(false, c.length - 1, parameters);
        let normal = parameters.base_normal().rotated_by(r1);
        assert!((normal + c.axis()).mag() < 1e-4);
        let bb = c.backbone_position(true, 0, parameters) - c.position;
        assert!((bb.mag() - parameters.radius_bb_center * model.scale).abs() < 1e-4);
    }

    #[test]
    fn model_round_trip() {
        let model = tetrahedron_model(0.1).unwrap();
        let json = serde_json::to_string(&model).unwrap();
        let reloaded: CylinderModel = serde_json::from_str(&json).unwrap();
        reloaded.check_invariants().unwrap();
        for (a, b) in model.cylinders().iter().zip(reloaded.cylinders()) {
            assert_eq!(a.id, b.id);
            assert_eq!(a.length, b.length);
            assert_eq!(a.bundle, b.bundle);
            for prime in PrimePos::ALL.iter() {
                assert_eq!(a.neighbour(*prime), b.neighbour(*prime));
            }
            assert!((a.position - b.position).mag() < 1e-5);
        }
    }
}
