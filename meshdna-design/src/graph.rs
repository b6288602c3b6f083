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
//! Half-edge representation of the mesh to be routed.
//!
//! Vertices, edges, half-edges and faces are stored in arenas and refer to each other by id.
//! A half-edge starts at its `origin` vertex and ends at the origin of its twin.

use super::utils::{any_orthogonal, direction};
use ahash::AHashMap;
use std::collections::VecDeque;
use ultraviolet::Vec3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VertexId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HalfEdgeId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FaceId(pub usize);

/// The data that a mesh loader must provide to build a `Graph`.
///
/// Edges that are not the side of any face can be given in `edges`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MeshDescriptor {
    pub vertices: Vec<[f32; 3]>,
    #[serde(default)]
    pub faces: Vec<Vec<usize>>,
    #[serde(default)]
    pub edges: Vec<[usize; 2]>,
}

#[derive(Debug)]
pub enum GraphError {
    EmptyMesh,
    VertexOutOfBounds { index: usize, nb_vertices: usize },
    DegenerateFace(usize),
    SelfLoop(usize),
    /// None of the half-edges leaving the vertex belong to a face.
    NoFaceInformation(VertexId),
    /// The faces around the vertex do not form a single fan.
    NonManifoldVertex(VertexId),
    InvalidReference(String),
}

impl std::fmt::Display for GraphError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyMesh => write!(f, "The mesh has no vertex."),
            Self::VertexOutOfBounds { index, nb_vertices } => write!(
                f,
                "Vertex index {} is out of bounds, the mesh has {} vertices.",
                index, nb_vertices
            ),
            Self::DegenerateFace(face) => {
                write!(f, "Face {} has less than three distinct vertices.", face)
            }
            Self::SelfLoop(v) => write!(f, "Edge from vertex {} to itself.", v),
            Self::NoFaceInformation(v) => {
                write!(f, "No face information around vertex {}.", v.0)
            }
            Self::NonManifoldVertex(v) => {
                write!(f, "The faces around vertex {} do not form a fan.", v.0)
            }
            Self::InvalidReference(msg) => write!(f, "Inconsistent graph: {}", msg),
        }
    }
}

impl std::error::Error for GraphError {}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub id: VertexId,
    pub position: Vec3,
    pub normal: Vec3,
    /// The half-edges whose origin is this vertex.
    half_edges: Vec<HalfEdgeId>,
}

impl Vertex {
    pub fn degree(&self) -> usize {
        self.half_edges.len()
    }

    pub fn half_edges(&self) -> &[HalfEdgeId] {
        &self.half_edges
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    pub half_edges: [HalfEdgeId; 2],
    /// A unit vector orthogonal to the edge, pointing away from the mesh.
    pub normal: Vec3,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HalfEdge {
    pub id: HalfEdgeId,
    pub edge: EdgeId,
    pub origin: VertexId,
    pub twin: HalfEdgeId,
    pub next: Option<HalfEdgeId>,
    pub prev: Option<HalfEdgeId>,
    pub face: Option<FaceId>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Face {
    pub id: FaceId,
    pub half_edges: Vec<HalfEdgeId>,
    pub normal: Vec3,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    vertices: Vec<Vertex>,
    edges: Vec<Edge>,
    half_edges: Vec<HalfEdge>,
    faces: Vec<Face>,
}

impl Graph {
    pub fn from_mesh(mesh: &MeshDescriptor) -> Result<Self, GraphError> {
        if mesh.vertices.is_empty() {
            return Err(GraphError::EmptyMesh);
        }
        let mut builder = GraphBuilder::new(mesh);
        for (face_idx, face) in mesh.faces.iter().enumerate() {
            builder.add_face(face_idx, face)?;
        }
        for [a, b] in mesh.edges.iter() {
            builder.half_edge_between(*a, *b)?;
        }
        let graph = builder.finish();
        log::info!(
            "Built graph with {} vertices, {} edges and {} faces",
            graph.vertices.len(),
            graph.edges.len(),
            graph.faces.len()
        );
        Ok(graph)
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn half_edges(&self) -> &[HalfEdge] {
        &self.half_edges
    }

    pub fn faces(&self) -> &[Face] {
        &self.faces
    }

    pub fn vertex(&self, id: VertexId) -> &Vertex {
        &self.vertices[id.0]
    }

    pub fn edge(&self, id: EdgeId) -> &Edge {
        &self.edges[id.0]
    }

    pub fn half_edge(&self, id: HalfEdgeId) -> &HalfEdge {
        &self.half_edges[id.0]
    }

    pub fn get_edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(id.0)
    }

    pub fn twin(&self, id: HalfEdgeId) -> HalfEdgeId {
        self.half_edge(id).twin
    }

    pub fn origin(&self, id: HalfEdgeId) -> VertexId {
        self.half_edge(id).origin
    }

    pub fn destination(&self, id: HalfEdgeId) -> VertexId {
        self.origin(self.twin(id))
    }

    /// The vector going from the origin to the destination of a half-edge.
    pub fn half_edge_vector(&self, id: HalfEdgeId) -> Vec3 {
        self.vertex(self.destination(id)).position - self.vertex(self.origin(id)).position
    }

    pub fn edge_vertices(&self, id: EdgeId) -> (VertexId, VertexId) {
        let he = self.edge(id).half_edges[0];
        (self.origin(he), self.destination(he))
    }

    /// The half-edges leaving `vertex`.
    pub fn adjacent_half_edges(&self, vertex: VertexId) -> &[HalfEdgeId] {
        &self.vertex(vertex).half_edges
    }

    pub fn adjacent_edges(&self, vertex: VertexId) -> Vec<EdgeId> {
        self.adjacent_half_edges(vertex)
            .iter()
            .map(|he| self.half_edge(*he).edge)
            .collect()
    }

    /// The half-edges leaving `vertex` in the order in which they are met when turning around
    /// the vertex from face to face.
    ///
    /// At a boundary vertex, the order starts from the border. Fails if the faces around the
    /// vertex are missing or do not form a single fan.
    pub fn topologically_ordered_adjacent_half_edges(
        &self,
        vertex: VertexId,
    ) -> Result<Vec<HalfEdgeId>, GraphError> {
        let outgoing = self.adjacent_half_edges(vertex);
        if outgoing.len() <= 1 {
            return Ok(outgoing.to_vec());
        }
        if outgoing.iter().all(|he| self.half_edge(*he).face.is_none()) {
            return Err(GraphError::NoFaceInformation(vertex));
        }
        let images: Vec<HalfEdgeId> = outgoing.iter().filter_map(|he| self.rotate(*he)).collect();
        let start = outgoing
            .iter()
            .find(|he| !images.contains(he))
            .cloned()
            .unwrap_or(outgoing[0]);

        let mut ret = vec![start];
        let mut current = start;
        while let Some(next) = self.rotate(current) {
            if next == start {
                break;
            }
            if ret.contains(&next) {
                return Err(GraphError::NonManifoldVertex(vertex));
            }
            ret.push(next);
            current = next;
        }
        if ret.len() != outgoing.len() {
            return Err(GraphError::NonManifoldVertex(vertex));
        }
        Ok(ret)
    }

    /// The next half-edge leaving the origin of `he` when turning through the face of `he`.
    fn rotate(&self, he: HalfEdgeId) -> Option<HalfEdgeId> {
        self.half_edge(he).prev.map(|prev| self.twin(prev))
    }

    pub fn centroid(&self) -> Vec3 {
        let sum = self
            .vertices
            .iter()
            .fold(Vec3::zero(), |acc, v| acc + v.position);
        sum / self.vertices.len().max(1) as f32
    }

    pub fn highest_degree_vertex(&self) -> Option<VertexId> {
        let mut ret: Option<&Vertex> = None;
        for v in self.vertices.iter() {
            if ret.map(|r| v.degree() > r.degree()).unwrap_or(true) {
                ret = Some(v);
            }
        }
        ret.filter(|v| v.degree() > 0).map(|v| v.id)
    }

    /// True if every vertex that has at least one edge can be reached from every other one.
    pub fn is_connected(&self) -> bool {
        let start = match self.vertices.iter().find(|v| v.degree() > 0) {
            Some(v) => v.id,
            None => return true,
        };
        let mut visited = vec![false; self.vertices.len()];
        visited[start.0] = true;
        let mut queue = VecDeque::new();
        queue.push_back(start);
        while let Some(v) = queue.pop_front() {
            for he in self.adjacent_half_edges(v) {
                let dest = self.destination(*he);
                if !visited[dest.0] {
                    visited[dest.0] = true;
                    queue.push_back(dest);
                }
            }
        }
        self.vertices
            .iter()
            .all(|v| v.degree() == 0 || visited[v.id.0])
    }

    /// Check the twin and incidence invariants, typically after loading a graph from a file.
    pub fn check_invariants(&self) -> Result<(), GraphError> {
        let invalid = |msg: String| Err(GraphError::InvalidReference(msg));
        for (i, he) in self.half_edges.iter().enumerate() {
            if he.id.0 != i {
                return invalid(format!("half-edge {} is stored at index {}", he.id.0, i));
            }
            let twin = match self.half_edges.get(he.twin.0) {
                Some(twin) => twin,
                None => return invalid(format!("half-edge {} has no twin", i)),
            };
            if twin.twin != he.id || twin.id == he.id {
                return invalid(format!("twin of half-edge {} is not reciprocal", i));
            }
            if twin.edge != he.edge {
                return invalid(format!("half-edge {} and its twin differ in edge", i));
            }
            if !self
                .vertices
                .get(he.origin.0)
                .map(|v| v.half_edges.contains(&he.id))
                .unwrap_or(false)
            {
                return invalid(format!("half-edge {} is not listed by its origin", i));
            }
            if let Some(next) = he.next {
                if self.half_edges.get(next.0).and_then(|n| n.prev) != Some(he.id) {
                    return invalid(format!("next and prev of half-edge {} mismatch", i));
                }
            }
        }
        for (i, e) in self.edges.iter().enumerate() {
            if e.id.0 != i {
                return invalid(format!("edge {} is stored at index {}", e.id.0, i));
            }
            for he in e.half_edges.iter() {
                if self.half_edges.get(he.0).map(|he| he.edge) != Some(e.id) {
                    return invalid(format!("edge {} does not own its half-edges", i));
                }
            }
        }
        for (i, v) in self.vertices.iter().enumerate() {
            if v.id.0 != i {
                return invalid(format!("vertex {} is stored at index {}", v.id.0, i));
            }
        }
        Ok(())
    }
}

struct GraphBuilder {
    vertices: Vec<Vertex>,
    edges: Vec<Edge>,
    half_edges: Vec<HalfEdge>,
    faces: Vec<Face>,
    edge_map: AHashMap<(usize, usize), HalfEdgeId>,
}

impl GraphBuilder {
    fn new(mesh: &MeshDescriptor) -> Self {
        let vertices = mesh
            .vertices
            .iter()
            .enumerate()
            .map(|(i, p)| Vertex {
                id: VertexId(i),
                position: (*p).into(),
                normal: Vec3::zero(),
                half_edges: Vec::new(),
            })
            .collect();
        Self {
            vertices,
            edges: Vec::new(),
            half_edges: Vec::new(),
            faces: Vec::new(),
            edge_map: Default::default(),
        }
    }

    fn check_index(&self, index: usize) -> Result<(), GraphError> {
        if index < self.vertices.len() {
            Ok(())
        } else {
            Err(GraphError::VertexOutOfBounds {
                index,
                nb_vertices: self.vertices.len(),
            })
        }
    }

    /// Return the half-edge going from `a` to `b`, creating the edge if needed.
    fn half_edge_between(&mut self, a: usize, b: usize) -> Result<HalfEdgeId, GraphError> {
        self.check_index(a)?;
        self.check_index(b)?;
        if a == b {
            return Err(GraphError::SelfLoop(a));
        }
        if let Some(he) = self.edge_map.get(&(a, b)) {
            return Ok(*he);
        }
        let edge = EdgeId(self.edges.len());
        let ab = HalfEdgeId(self.half_edges.len());
        let ba = HalfEdgeId(ab.0 + 1);
        self.half_edges.push(HalfEdge {
            id: ab,
            edge,
            origin: VertexId(a),
            twin: ba,
            next: None,
            prev: None,
            face: None,
        });
        self.half_edges.push(HalfEdge {
            id: ba,
            edge,
            origin: VertexId(b),
            twin: ab,
            next: None,
            prev: None,
            face: None,
        });
        self.edges.push(Edge {
            id: edge,
            half_edges: [ab, ba],
            normal: Vec3::zero(),
        });
        self.vertices[a].half_edges.push(ab);
        self.vertices[b].half_edges.push(ba);
        self.edge_map.insert((a, b), ab);
        self.edge_map.insert((b, a), ba);
        Ok(ab)
    }

    fn add_face(&mut self, face_idx: usize, face: &[usize]) -> Result<(), GraphError> {
        let mut corners: Vec<usize> = Vec::with_capacity(face.len());
        for v in face.iter() {
            self.check_index(*v)?;
            if corners.last() != Some(v) {
                corners.push(*v);
            }
        }
        while corners.len() > 1 && corners.first() == corners.last() {
            corners.pop();
        }
        let mut distinct = corners.clone();
        distinct.sort_unstable();
        distinct.dedup();
        if distinct.len() < 3 || distinct.len() != corners.len() {
            return Err(GraphError::DegenerateFace(face_idx));
        }

        let mut half_edges = Vec::with_capacity(corners.len());
        for i in 0..corners.len() {
            let he = self.half_edge_between(corners[i], corners[(i + 1) % corners.len()])?;
            half_edges.push(he);
        }

        if half_edges
            .iter()
            .any(|he| self.half_edges[he.0].face.is_some())
        {
            // Another face already uses one of these half-edges: either the winding is
            // inconsistent or the mesh is not manifold. The edges are kept without face data.
            log::warn!(
                "Face {} is not consistently oriented with its neighbours, ignoring its topology",
                face_idx
            );
            return Ok(());
        }

        let id = FaceId(self.faces.len());
        let n = half_edges.len();
        for i in 0..n {
            let he = &mut self.half_edges[half_edges[i].0];
            he.face = Some(id);
            he.next = Some(half_edges[(i + 1) % n]);
            he.prev = Some(half_edges[(i + n - 1) % n]);
        }
        let normal = newell_normal(
            &corners
                .iter()
                .map(|c| self.vertices[*c].position)
                .collect::<Vec<_>>(),
        );
        self.faces.push(Face {
            id,
            half_edges,
            normal,
        });
        Ok(())
    }

    fn finish(mut self) -> Graph {
        let centroid = {
            let sum = self
                .vertices
                .iter()
                .fold(Vec3::zero(), |acc, v| acc + v.position);
            sum / self.vertices.len() as f32
        };

        for v in self.vertices.iter_mut() {
            let mut normal = Vec3::zero();
            for he in v.half_edges.iter() {
                if let Some(face) = self.half_edges[he.0].face {
                    normal += self.faces[face.0].normal;
                }
            }
            v.normal = direction(normal)
                .or_else(|| direction(v.position - centroid))
                .unwrap_or_else(Vec3::unit_y);
        }

        for e in self.edges.iter_mut() {
            let [h1, h2] = e.half_edges;
            let a = self.vertices[self.half_edges[h1.0].origin.0].position;
            let b = self.vertices[self.half_edges[h2.0].origin.0].position;
            let mut normal = Vec3::zero();
            for he in [h1, h2].iter() {
                if let Some(face) = self.half_edges[he.0].face {
                    normal += self.faces[face.0].normal;
                }
            }
            let normal = direction(normal)
                .or_else(|| direction((a + b) / 2. - centroid))
                .unwrap_or_else(Vec3::unit_y);
            e.normal = match direction(b - a) {
                Some(dir) => direction(normal - dir * normal.dot(dir))
                    .unwrap_or_else(|| any_orthogonal(dir)),
                None => normal,
            };
        }

        Graph {
            vertices: self.vertices,
            edges: self.edges,
            half_edges: self.half_edges,
            faces: self.faces,
        }
    }
}

/// Normal of a polygon, robust to non planar polygons.
fn newell_normal(points: &[Vec3]) -> Vec3 {
    let mut normal = Vec3::zero();
    for i in 0..points.len() {
        let cur = points[i];
        let next = points[(i + 1) % points.len()];
        normal.x += (cur.y - next.y) * (cur.z + next.z);
        normal.y += (cur.z - next.z) * (cur.x + next.x);
        normal.z += (cur.x - next.x) * (cur.y + next.y);
    }
    direction(normal).unwrap_or_else(Vec3::zero)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{square_without_faces, tetrahedron};

    #[test]
    fn tetrahedron_has_consistent_twins() {
        let graph = Graph::from_mesh(&tetrahedron()).unwrap();
        assert_eq!(graph.vertices().len(), 4);
        assert_eq!(graph.edges().len(), 6);
        assert_eq!(graph.half_edges().len(), 12);
        for he in graph.half_edges() {
            assert_eq!(graph.twin(graph.twin(he.id)), he.id);
            assert_eq!(graph.destination(he.id), graph.origin(he.twin));
        }
        graph.check_invariants().unwrap();
    }

    #[test]
    fn tetrahedron_normals_point_outward() {
        let graph = Graph::from_mesh(&tetrahedron()).unwrap();
        for v in graph.vertices() {
            assert!(v.normal.dot(v.position) > 0.);
        }
        for e in graph.edges() {
            let (a, b) = graph.edge_vertices(e.id);
            let middle = (graph.vertex(a).position + graph.vertex(b).position) / 2.;
            assert!(e.normal.dot(middle) > 0.);
            let dir = graph.vertex(b).position - graph.vertex(a).position;
            assert!(e.normal.dot(dir).abs() < 1e-4);
        }
    }

    #[test]
    fn topological_order_follows_faces() {
        let graph = Graph::from_mesh(&tetrahedron()).unwrap();
        for v in graph.vertices() {
            let ordered = graph.topologically_ordered_adjacent_half_edges(v.id).unwrap();
            assert_eq!(ordered.len(), 3);
            for w in ordered.windows(2) {
                let prev = graph.half_edge(w[0]).prev.unwrap();
                assert_eq!(graph.twin(prev), w[1]);
                assert_eq!(graph.origin(w[1]), v.id);
            }
        }
    }

    #[test]
    fn ordering_fails_without_faces() {
        let graph = Graph::from_mesh(&square_without_faces()).unwrap();
        assert_eq!(graph.edges().len(), 5);
        let v = graph.highest_degree_vertex().unwrap();
        assert!(matches!(
            graph.topologically_ordered_adjacent_half_edges(v),
            Err(GraphError::NoFaceInformation(_))
        ));
    }

    #[test]
    fn duplicated_edges_are_merged() {
        let mesh = MeshDescriptor {
            vertices: vec![[0., 0., 0.], [1., 0., 0.]],
            faces: vec![],
            edges: vec![[0, 1], [1, 0], [0, 1]],
        };
        let graph = Graph::from_mesh(&mesh).unwrap();
        assert_eq!(graph.edges().len(), 1);
        assert_eq!(graph.adjacent_edges(VertexId(0)), vec![EdgeId(0)]);
    }

    #[test]
    fn invalid_meshes_are_rejected() {
        let mesh = MeshDescriptor {
            vertices: vec![[0., 0., 0.], [1., 0., 0.]],
            faces: vec![],
            edges: vec![[0, 2]],
        };
        assert!(matches!(
            Graph::from_mesh(&mesh),
            Err(GraphError::VertexOutOfBounds { index: 2, .. })
        ));
        let mesh = MeshDescriptor {
            vertices: vec![[0., 0., 0.], [1., 0., 0.], [0., 1., 0.]],
            faces: vec![vec![0, 1, 1]],
            edges: vec![],
        };
        assert!(matches!(
            Graph::from_mesh(&mesh),
            Err(GraphError::DegenerateFace(0))
        ));
        assert!(matches!(
            Graph::from_mesh(&MeshDescriptor::default()),
            Err(GraphError::EmptyMesh)
        ));
    }

    #[test]
    fn graph_round_trip() {
        let graph = Graph::from_mesh(&tetrahedron()).unwrap();
        let json = serde_json::to_string(&graph).unwrap();
        let reloaded: Graph = serde_json::from_str(&json).unwrap();
        reloaded.check_invariants().unwrap();
        assert_eq!(graph.half_edges(), reloaded.half_edges());
        for (a, b) in graph.vertices().iter().zip(reloaded.vertices()) {
            assert_eq!(a.id, b.id);
            assert_eq!(a.half_edges(), b.half_edges());
            assert!((a.position - b.position).mag() < 1e-6);
        }
    }
}
