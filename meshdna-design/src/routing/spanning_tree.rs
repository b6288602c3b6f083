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
//! Single trail routing: the trail runs twice along every edge of a spanning tree, once in each
//! direction. Edges outside of the tree are visited by a single half-edge each time the trail
//! passes by one of their endpoints, their cylinders are connected as pseudoknots.

use super::{Route, RoutingAlgorithm, RoutingError, WiresModel};
use crate::cylinders::RoutingStrategy;
use crate::graph::{EdgeId, Graph, HalfEdgeId, VertexId};
use ordered_float::OrderedFloat;
use std::collections::VecDeque;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct SpanningTreeRouting {
    graph: Arc<Graph>,
    /// The edges of the spanning tree, in the order in which they were added.
    tree: Vec<EdgeId>,
    in_tree: Vec<bool>,
    trail: Vec<HalfEdgeId>,
}

#[derive(Serialize, Deserialize)]
struct SpanningTreeJson {
    st: Vec<EdgeId>,
}

impl SpanningTreeRouting {
    pub fn new(graph: Arc<Graph>) -> Result<Self, RoutingError> {
        if graph.edges().is_empty() {
            return Err(RoutingError::EmptyGraph);
        }
        if !graph.is_connected() {
            return Err(RoutingError::DisconnectedGraph);
        }
        let tree = spanning_tree(&graph)?;
        Self::from_tree(graph, tree)
    }

    fn from_tree(graph: Arc<Graph>, tree: Vec<EdgeId>) -> Result<Self, RoutingError> {
        let mut in_tree = vec![false; graph.edges().len()];
        for e in tree.iter() {
            if let Some(flag) = in_tree.get_mut(e.0) {
                *flag = true;
            } else {
                return Err(RoutingError::UnknownEdge(*e));
            }
        }
        let start = tree
            .first()
            .map(|e| graph.edge(*e).half_edges[0])
            .ok_or(RoutingError::EmptyGraph)?;
        let trail = double_cover_trail(&graph, start, &in_tree);
        log::debug!(
            "Spanning tree of {} edges, trail of {} half-edges",
            tree.len(),
            trail.len()
        );
        Ok(Self {
            graph,
            tree,
            in_tree,
            trail,
        })
    }

    pub fn from_json(graph: Arc<Graph>, json: &serde_json::Value) -> Result<Self, RoutingError> {
        let data: SpanningTreeJson = serde_json::from_value(json.clone())?;
        Self::from_tree(graph, data.st)
    }

    pub fn tree(&self) -> &[EdgeId] {
        &self.tree
    }

    pub fn trail(&self) -> &[HalfEdgeId] {
        &self.trail
    }

    pub fn is_in_tree(&self, edge: EdgeId) -> bool {
        self.in_tree.get(edge.0).cloned().unwrap_or(false)
    }
}

impl WiresModel for SpanningTreeRouting {
    fn algorithm(&self) -> RoutingAlgorithm {
        RoutingAlgorithm::Veneziano
    }

    fn graph(&self) -> &Arc<Graph> {
        &self.graph
    }

    fn routes(&self) -> Vec<Route> {
        let route = self
            .trail
            .iter()
            .map(|he| {
                let strategy = if self.is_in_tree(self.graph.half_edge(*he).edge) {
                    RoutingStrategy::Normal
                } else {
                    RoutingStrategy::Pseudoknot
                };
                (*he, strategy)
            })
            .collect();
        vec![route]
    }

    fn len(&self) -> usize {
        1
    }

    fn to_json(&self) -> Result<serde_json::Value, RoutingError> {
        let data = SpanningTreeJson {
            st: self.tree.clone(),
        };
        Ok(serde_json::to_value(&data)?)
    }
}

/// Grow a spanning tree from the vertex of highest degree.
///
/// Edges are considered in the order in which they are discovered and kept if they reach a new
/// vertex. No weight is involved.
fn spanning_tree(graph: &Graph) -> Result<Vec<EdgeId>, RoutingError> {
    let start = graph
        .highest_degree_vertex()
        .ok_or(RoutingError::EmptyGraph)?;
    let mut visited = vec![false; graph.vertices().len()];
    let mut tree = Vec::new();
    let mut queue: VecDeque<EdgeId> = graph.adjacent_edges(start).into_iter().collect();

    while let Some(edge) = queue.pop_front() {
        let (v1, v2) = graph.edge_vertices(edge);
        if visited[v1.0] && visited[v2.0] {
            continue;
        }
        tree.push(edge);
        visited[v1.0] = true;
        visited[v2.0] = true;
        for v in [v1, v2].iter() {
            for neighbour in graph.adjacent_edges(*v) {
                let (a, b) = graph.edge_vertices(neighbour);
                if !visited[a.0] || !visited[b.0] {
                    queue.push_back(neighbour);
                }
            }
        }
    }
    Ok(tree)
}

/// Depth first traversal of the spanning tree that goes along each tree edge in both directions.
///
/// When a vertex is reached for the first time, the half-edges leaving it are explored in
/// rotational order, starting after the edge through which the vertex was reached. Half-edges
/// that are not part of the tree are added to the trail but not followed.
fn double_cover_trail(graph: &Graph, start: HalfEdgeId, in_tree: &[bool]) -> Vec<HalfEdgeId> {
    let mut trail = Vec::with_capacity(2 * graph.edges().len() + 1);
    let mut visited = vec![false; graph.vertices().len()];
    let mut stack = vec![start];

    while let Some(current) = stack.pop() {
        trail.push(current);
        if !in_tree[graph.half_edge(current).edge.0] {
            continue;
        }
        let vertex = graph.destination(current);
        if visited[vertex.0] {
            continue;
        }
        visited[vertex.0] = true;

        let neighbours = rotational_order(graph, vertex);
        let back = graph.twin(current);
        stack.push(back);
        let idx = neighbours.iter().position(|he| *he == back).unwrap_or(0);
        for i in 1..neighbours.len() {
            stack.push(neighbours[(idx + i) % neighbours.len()]);
        }
    }
    // The last half-edge closes the trail on the starting half-edge.
    trail.pop();
    trail
}

fn rotational_order(graph: &Graph, vertex: VertexId) -> Vec<HalfEdgeId> {
    match graph.topologically_ordered_adjacent_half_edges(vertex) {
        Ok(ordered) => ordered,
        Err(e) => {
            log::debug!("{}, using nearest neighbour order", e);
            nearest_neighbour_order(graph, vertex)
        }
    }
}

/// Best-effort ordering of the half-edges leaving `vertex` when the faces around it are unknown.
///
/// Starting from the first half-edge, repeatedly pick the half-edge whose destination is the
/// closest to the destination of the previously picked one. This greedy tour is not optimal.
pub fn nearest_neighbour_order(graph: &Graph, vertex: VertexId) -> Vec<HalfEdgeId> {
    let outgoing = graph.adjacent_half_edges(vertex);
    if outgoing.len() <= 2 {
        return outgoing.to_vec();
    }
    let position = |he: HalfEdgeId| graph.vertex(graph.destination(he)).position;
    let mut picked = vec![false; outgoing.len()];
    picked[0] = true;
    let mut ret = vec![outgoing[0]];

    while ret.len() < outgoing.len() {
        let current = match ret.last() {
            Some(he) => position(*he),
            None => break,
        };
        let closest = (0..outgoing.len())
            .filter(|i| !picked[*i])
            .min_by_key(|i| OrderedFloat((position(outgoing[*i]) - current).mag_sq()));
        match closest {
            Some(i) => {
                picked[i] = true;
                ret.push(outgoing[i]);
            }
            None => break,
        }
    }
    ret
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::MeshDescriptor;
    use crate::tests::{cube, square_without_faces, tetrahedron};

    fn check_trail(routing: &SpanningTreeRouting) {
        let graph = routing.graph();
        let trail = routing.trail();
        assert_eq!(trail.len(), 2 * graph.edges().len());
        let mut seen = vec![0; graph.half_edges().len()];
        for he in trail {
            seen[he.0] += 1;
        }
        assert!(seen.iter().all(|n| *n == 1));

        for i in 0..trail.len() {
            let current = trail[i];
            let next = trail[(i + 1) % trail.len()];
            if routing.is_in_tree(graph.half_edge(current).edge) {
                assert_eq!(graph.destination(current), graph.origin(next));
            } else {
                assert_eq!(graph.origin(current), graph.origin(next));
            }
        }
    }

    #[test]
    fn tree_spans_all_vertices() {
        let graph = Arc::new(Graph::from_mesh(&cube()).unwrap());
        let routing = SpanningTreeRouting::new(graph.clone()).unwrap();
        assert_eq!(routing.tree().len(), graph.vertices().len() - 1);
        let first = routing.tree()[0];
        let (a, b) = graph.edge_vertices(first);
        let max_degree = graph.vertex(graph.highest_degree_vertex().unwrap()).degree();
        assert!(graph.vertex(a).degree() == max_degree || graph.vertex(b).degree() == max_degree);
    }

    #[test]
    fn trail_covers_each_half_edge_once() {
        for mesh in [tetrahedron(), cube(), square_without_faces()].iter() {
            let graph = Arc::new(Graph::from_mesh(mesh).unwrap());
            let routing = SpanningTreeRouting::new(graph).unwrap();
            check_trail(&routing);
        }
    }

    #[test]
    fn pseudoknots_are_outside_of_the_tree() {
        let graph = Arc::new(Graph::from_mesh(&tetrahedron()).unwrap());
        let routing = SpanningTreeRouting::new(graph).unwrap();
        let route = &routing.routes()[0];
        let nb_pseudoknots = route
            .iter()
            .filter(|(_, s)| *s == RoutingStrategy::Pseudoknot)
            .count();
        // 6 edges, 3 of them in the tree
        assert_eq!(nb_pseudoknots, 6);
    }

    #[test]
    fn disconnected_graphs_are_rejected() {
        let mesh = MeshDescriptor {
            vertices: vec![[0., 0., 0.], [1., 0., 0.], [5., 0., 0.], [6., 0., 0.]],
            faces: vec![],
            edges: vec![[0, 1], [2, 3]],
        };
        let graph = Arc::new(Graph::from_mesh(&mesh).unwrap());
        assert!(matches!(
            SpanningTreeRouting::new(graph),
            Err(RoutingError::DisconnectedGraph)
        ));
    }

    #[test]
    fn nearest_neighbour_visits_everything() {
        let mesh = MeshDescriptor {
            vertices: vec![
                [0., 0., 0.],
                [1., 0., 0.],
                [-1., 0., 0.],
                [0.9, 0.5, 0.],
                [-0.9, 0.5, 0.],
            ],
            faces: vec![],
            edges: vec![[0, 1], [0, 2], [0, 3], [0, 4]],
        };
        let graph = Graph::from_mesh(&mesh).unwrap();
        let order = nearest_neighbour_order(&graph, VertexId(0));
        let destinations: Vec<usize> = order.iter().map(|he| graph.destination(*he).0).collect();
        assert_eq!(destinations, vec![1, 3, 4, 2]);
    }

    #[test]
    fn json_keeps_the_tree() {
        let graph = Arc::new(Graph::from_mesh(&cube()).unwrap());
        let routing = SpanningTreeRouting::new(graph.clone()).unwrap();
        let json = routing.to_json().unwrap();
        assert!(json.get("st").is_some());
        let reloaded = SpanningTreeRouting::from_json(graph, &json).unwrap();
        assert_eq!(reloaded.trail(), routing.trail());
    }
}
