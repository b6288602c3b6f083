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
//! Routing of strands through the edges of a graph.
//!
//! A routing ("wires") is a set of closed walks over the half-edges of the graph. One cylinder
//! is created per visited half-edge and consecutive cylinders of a walk are connected.

mod cycle_cover;
mod matching;
mod spanning_tree;

pub use cycle_cover::CycleCover;
pub use matching::min_weight_perfect_matching;
pub use spanning_tree::{nearest_neighbour_order, SpanningTreeRouting};

use crate::cylinders::{CylinderError, CylinderModel, RoutingStrategy};
use crate::graph::{EdgeId, Graph, GraphError, HalfEdgeId};
use crate::RoutingParameters;
use std::sync::Arc;

/// The routing algorithms that can be applied to a graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoutingAlgorithm {
    /// A single trail running twice along a spanning tree, other edges are pseudoknots.
    #[serde(rename = "veneziano")]
    Veneziano,
    /// A decomposition of the doubled edges into cycles.
    #[serde(rename = "cycle_cover")]
    CycleCover,
}

impl RoutingAlgorithm {
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Veneziano => "veneziano",
            Self::CycleCover => "cycle_cover",
        }
    }
}

impl std::str::FromStr for RoutingAlgorithm {
    type Err = RoutingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "veneziano" | "spanning_tree" => Ok(Self::Veneziano),
            "cycle_cover" => Ok(Self::CycleCover),
            _ => Err(RoutingError::UnknownAlgorithm(s.to_string())),
        }
    }
}

impl std::fmt::Display for RoutingAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.tag())
    }
}

#[derive(Debug)]
pub enum RoutingError {
    EmptyGraph,
    DisconnectedGraph,
    UnknownAlgorithm(String),
    UnknownEdge(EdgeId),
    UnknownHalfEdge(HalfEdgeId),
    InvalidWires(String),
    Serialization(serde_json::Error),
    Graph(GraphError),
}

impl From<serde_json::Error> for RoutingError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e)
    }
}

impl From<GraphError> for RoutingError {
    fn from(e: GraphError) -> Self {
        Self::Graph(e)
    }
}

impl std::fmt::Display for RoutingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyGraph => write!(f, "The graph has no edge to route."),
            Self::DisconnectedGraph => write!(
                f,
                "The graph is not connected, a single trail cannot visit all its edges."
            ),
            Self::UnknownAlgorithm(tag) => write!(f, "Unknown routing algorithm {}.", tag),
            Self::UnknownEdge(e) => write!(f, "The routing refers to unknown edge {}.", e.0),
            Self::UnknownHalfEdge(he) => {
                write!(f, "The routing refers to unknown half-edge {}.", he.0)
            }
            Self::InvalidWires(msg) => write!(f, "Invalid routing: {}", msg),
            Self::Serialization(e) => write!(f, "Could not read routing: {}", e),
            Self::Graph(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for RoutingError {}

/// A closed walk, with the routing strategy of the cylinder built on each half-edge.
pub type Route = Vec<(HalfEdgeId, RoutingStrategy)>;

/// A routing of the edges of a graph.
pub trait WiresModel: std::fmt::Debug {
    fn algorithm(&self) -> RoutingAlgorithm;

    fn graph(&self) -> &Arc<Graph>;

    /// The closed walks along which cylinders are created and connected.
    fn routes(&self) -> Vec<Route>;

    /// Number of trails or cycles of the routing.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn to_json(&self) -> Result<serde_json::Value, RoutingError>;

    fn to_cylinder_model(&self, params: &RoutingParameters) -> Result<CylinderModel, CylinderError> {
        CylinderModel::from_routes(self.graph(), &self.routes(), params)
    }
}

/// Route `graph` with `algorithm`.
pub fn graph_to_wires(
    algorithm: RoutingAlgorithm,
    graph: Arc<Graph>,
) -> Result<Box<dyn WiresModel>, RoutingError> {
    let wires: Box<dyn WiresModel> = match algorithm {
        RoutingAlgorithm::Veneziano => Box::new(SpanningTreeRouting::new(graph)?),
        RoutingAlgorithm::CycleCover => Box::new(CycleCover::new(graph)?),
    };
    log::info!(
        "Generated {} route(s) with the {} algorithm",
        wires.len(),
        algorithm
    );
    Ok(wires)
}

/// Rebuild a routing from the output of `WiresModel::to_json`.
pub fn wires_from_json(
    tag: &str,
    graph: Arc<Graph>,
    json: &serde_json::Value,
) -> Result<Box<dyn WiresModel>, RoutingError> {
    let algorithm: RoutingAlgorithm = tag.parse()?;
    Ok(match algorithm {
        RoutingAlgorithm::Veneziano => Box::new(SpanningTreeRouting::from_json(graph, json)?),
        RoutingAlgorithm::CycleCover => Box::new(CycleCover::from_json(graph, json)?),
    })
}
