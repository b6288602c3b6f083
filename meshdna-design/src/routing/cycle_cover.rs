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
//! Cycle cover routing: the doubled edges of the graph are decomposed into closed walks.
//!
//! At every vertex, each arriving half-edge must be continued by a leaving half-edge, and each
//! leaving half-edge must continue exactly one arriving half-edge. These continuations are the
//! edges of a perfect matching in the bipartite graph (arriving, leaving) of the vertex. The
//! weight of a continuation is the angle swept around the vertex normal when turning from the
//! arriving edge to the leaving one in the direction in which faces are wound, a U-turn costing a
//! full turn. Following the matched continuations yields the cycles.

use super::matching::min_weight_perfect_matching;
use super::{Route, RoutingAlgorithm, RoutingError, WiresModel};
use crate::cylinders::RoutingStrategy;
use crate::graph::{Graph, HalfEdgeId};
use crate::utils::ccw_angle;
use std::f32::consts::TAU;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct CycleCover {
    graph: Arc<Graph>,
    cycles: Vec<Vec<HalfEdgeId>>,
}

#[derive(Serialize, Deserialize)]
struct CycleCoverJson {
    cycles: Vec<Vec<HalfEdgeId>>,
}

impl CycleCover {
    pub fn new(graph: Arc<Graph>) -> Result<Self, RoutingError> {
        if graph.edges().is_empty() {
            return Err(RoutingError::EmptyGraph);
        }
        let successors = matched_successors(&graph);
        let cycles = follow_successors(&graph, &successors)?;
        log::debug!("Cycle cover of {} cycles", cycles.len());
        Ok(Self { graph, cycles })
    }

    pub fn from_json(graph: Arc<Graph>, json: &serde_json::Value) -> Result<Self, RoutingError> {
        let data: CycleCoverJson = serde_json::from_value(json.clone())?;
        let mut visits = vec![0usize; graph.half_edges().len()];
        for cycle in data.cycles.iter() {
            for (i, he) in cycle.iter().enumerate() {
                match visits.get_mut(he.0) {
                    Some(n) => *n += 1,
                    None => return Err(RoutingError::UnknownHalfEdge(*he)),
                }
                let next = cycle[(i + 1) % cycle.len()];
                if next.0 >= graph.half_edges().len() {
                    return Err(RoutingError::UnknownHalfEdge(next));
                }
                if graph.destination(*he) != graph.origin(next) {
                    return Err(RoutingError::InvalidWires(format!(
                        "half-edges {} and {} are not consecutive",
                        he.0, next.0
                    )));
                }
            }
        }
        if visits.iter().any(|n| *n != 1) {
            return Err(RoutingError::InvalidWires(String::from(
                "every half-edge must be visited exactly once",
            )));
        }
        Ok(Self {
            graph,
            cycles: data.cycles,
        })
    }

    pub fn cycles(&self) -> &[Vec<HalfEdgeId>] {
        &self.cycles
    }
}

impl WiresModel for CycleCover {
    fn algorithm(&self) -> RoutingAlgorithm {
        RoutingAlgorithm::CycleCover
    }

    fn graph(&self) -> &Arc<Graph> {
        &self.graph
    }

    fn routes(&self) -> Vec<Route> {
        self.cycles
            .iter()
            .map(|cycle| {
                cycle
                    .iter()
                    .map(|he| (*he, RoutingStrategy::Normal))
                    .collect()
            })
            .collect()
    }

    fn len(&self) -> usize {
        self.cycles.len()
    }

    fn to_json(&self) -> Result<serde_json::Value, RoutingError> {
        let data = CycleCoverJson {
            cycles: self.cycles.clone(),
        };
        Ok(serde_json::to_value(&data)?)
    }
}

/// For each half-edge, the half-edge that continues it in its cycle.
fn matched_successors(graph: &Graph) -> Vec<Option<HalfEdgeId>> {
    let mut successors = vec![None; graph.half_edges().len()];
    for vertex in graph.vertices() {
        let leaving = vertex.half_edges();
        if leaving.is_empty() {
            continue;
        }
        let directions: Vec<_> = leaving
            .iter()
            .map(|he| graph.half_edge_vector(*he))
            .collect();
        // The i-th arriving half-edge is the twin of the i-th leaving one, it comes from
        // `directions[i]`.
        let cost: Vec<Vec<f64>> = (0..leaving.len())
            .map(|i| {
                (0..leaving.len())
                    .map(|j| {
                        if i == j {
                            TAU as f64
                        } else {
                            ccw_angle(directions[j], directions[i], vertex.normal) as f64
                        }
                    })
                    .collect()
            })
            .collect();
        let matching = min_weight_perfect_matching(&cost);
        for (i, j) in matching.into_iter().enumerate() {
            successors[graph.twin(leaving[i]).0] = Some(leaving[j]);
        }
    }
    successors
}

fn follow_successors(
    graph: &Graph,
    successors: &[Option<HalfEdgeId>],
) -> Result<Vec<Vec<HalfEdgeId>>, RoutingError> {
    let mut used = vec![false; successors.len()];
    let mut cycles = Vec::new();
    for he in graph.half_edges() {
        if used[he.id.0] {
            continue;
        }
        let mut cycle = Vec::new();
        let mut current = he.id;
        while !used[current.0] {
            used[current.0] = true;
            cycle.push(current);
            current = successors[current.0].ok_or(RoutingError::UnknownHalfEdge(current))?;
        }
        if current != he.id {
            return Err(RoutingError::InvalidWires(format!(
                "continuations starting from half-edge {} do not close",
                he.id.0
            )));
        }
        cycles.push(cycle);
    }
    Ok(cycles)
}
