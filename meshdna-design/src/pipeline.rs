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
//! The chain of models built from a mesh, each generated on demand from the previous one.

use crate::cylinders::{CylinderError, CylinderModel};
use crate::graph::{Graph, GraphError, MeshDescriptor};
use crate::nucleotides::{cylinders_to_nucleotides_with_rng, NucleotideError, NucleotideModel};
use crate::primary::{set_random_primary, PrimaryError};
use crate::relaxer::Relaxer;
use crate::routing::{graph_to_wires, wires_from_json, RoutingAlgorithm, RoutingError, WiresModel};
use crate::{RelaxParameters, RoutingParameters};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;

#[derive(Debug)]
pub enum PipelineError {
    NoGraph,
    MissingModel(&'static str),
    Graph(GraphError),
    Routing(RoutingError),
    Cylinder(CylinderError),
    Nucleotide(NucleotideError),
    Primary(PrimaryError),
    Serialization(serde_json::Error),
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoGraph => write!(f, "No model is loaded."),
            Self::MissingModel(model) => write!(f, "No {} model has been generated.", model),
            Self::Graph(e) => write!(f, "{}", e),
            Self::Routing(e) => write!(f, "{}", e),
            Self::Cylinder(e) => write!(f, "{}", e),
            Self::Nucleotide(e) => write!(f, "{}", e),
            Self::Primary(e) => write!(f, "{}", e),
            Self::Serialization(e) => write!(f, "Could not read project: {}", e),
        }
    }
}

impl std::error::Error for PipelineError {}

impl From<GraphError> for PipelineError {
    fn from(e: GraphError) -> Self {
        Self::Graph(e)
    }
}

impl From<RoutingError> for PipelineError {
    fn from(e: RoutingError) -> Self {
        Self::Routing(e)
    }
}

impl From<CylinderError> for PipelineError {
    fn from(e: CylinderError) -> Self {
        Self::Cylinder(e)
    }
}

impl From<NucleotideError> for PipelineError {
    fn from(e: NucleotideError) -> Self {
        Self::Nucleotide(e)
    }
}

impl From<PrimaryError> for PipelineError {
    fn from(e: PrimaryError) -> Self {
        Self::Primary(e)
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e)
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProjectDump {
    params: RoutingParameters,
    #[serde(default)]
    relax_params: RelaxParameters,
    algorithm: RoutingAlgorithm,
    #[serde(default)]
    graph: Option<Graph>,
    #[serde(default)]
    wires: Option<serde_json::Value>,
    #[serde(default)]
    cm: Option<CylinderModel>,
    #[serde(default)]
    nm: Option<serde_json::Value>,
}

/// Caches the graph, the routing, the cylinder model and the nucleotide model of a design.
/// Changing an input drops every model built from it.
pub struct Pipeline {
    parameters: RoutingParameters,
    relax_parameters: RelaxParameters,
    algorithm: RoutingAlgorithm,
    graph: Option<Arc<Graph>>,
    wires: Option<Box<dyn WiresModel>>,
    cylinder_model: Option<CylinderModel>,
    nucleotide_model: Option<NucleotideModel>,
}

impl Pipeline {
    pub fn new(algorithm: RoutingAlgorithm, parameters: RoutingParameters) -> Self {
        Self {
            parameters,
            relax_parameters: Default::default(),
            algorithm,
            graph: None,
            wires: None,
            cylinder_model: None,
            nucleotide_model: None,
        }
    }

    pub fn parameters(&self) -> &RoutingParameters {
        &self.parameters
    }

    pub fn algorithm(&self) -> RoutingAlgorithm {
        self.algorithm
    }

    pub fn graph(&self) -> Option<&Graph> {
        self.graph.as_deref()
    }

    pub fn wires(&self) -> Option<&dyn WiresModel> {
        self.wires.as_deref()
    }

    pub fn cylinder_model(&self) -> Option<&CylinderModel> {
        self.cylinder_model.as_ref()
    }

    pub fn nucleotide_model(&self) -> Option<&NucleotideModel> {
        self.nucleotide_model.as_ref()
    }

    pub fn load_mesh(&mut self, mesh: &MeshDescriptor) -> Result<(), PipelineError> {
        self.set_graph(Graph::from_mesh(mesh)?);
        Ok(())
    }

    pub fn set_graph(&mut self, graph: Graph) {
        self.graph = Some(Arc::new(graph));
        self.wires = None;
        self.cylinder_model = None;
        self.nucleotide_model = None;
    }

    pub fn set_algorithm(&mut self, algorithm: RoutingAlgorithm) {
        if algorithm != self.algorithm {
            self.algorithm = algorithm;
            self.wires = None;
            self.cylinder_model = None;
            self.nucleotide_model = None;
        }
    }

    /// The routing does not depend on the parameters, only the models built from it are
    /// dropped.
    pub fn set_parameters(&mut self, parameters: RoutingParameters) {
        if parameters != self.parameters {
            self.parameters = parameters;
            self.cylinder_model = None;
            self.nucleotide_model = None;
        }
    }

    pub fn set_relax_parameters(&mut self, relax_parameters: RelaxParameters) {
        self.relax_parameters = relax_parameters;
    }

    fn rng(&self) -> StdRng {
        match self.parameters.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    pub fn generate_wires(&mut self) -> Result<&dyn WiresModel, PipelineError> {
        if self.wires.is_none() {
            let graph = self.graph.clone().ok_or(PipelineError::NoGraph)?;
            self.wires = Some(graph_to_wires(self.algorithm, graph)?);
        }
        self.wires
            .as_deref()
            .ok_or(PipelineError::MissingModel("routing"))
    }

    pub fn generate_cylinder_model(&mut self) -> Result<&CylinderModel, PipelineError> {
        if self.cylinder_model.is_none() {
            self.generate_wires()?;
            let wires = self
                .wires
                .as_ref()
                .ok_or(PipelineError::MissingModel("routing"))?;
            self.cylinder_model = Some(wires.to_cylinder_model(&self.parameters)?);
        }
        self.cylinder_model
            .as_ref()
            .ok_or(PipelineError::MissingModel("cylinder"))
    }

    pub fn generate_nucleotide_model(&mut self) -> Result<&NucleotideModel, PipelineError> {
        if self.nucleotide_model.is_none() {
            self.generate_cylinder_model()?;
            let mut rng = self.rng();
            let cm = self
                .cylinder_model
                .as_ref()
                .ok_or(PipelineError::MissingModel("cylinder"))?;
            self.nucleotide_model = Some(cylinders_to_nucleotides_with_rng(
                cm,
                &self.parameters,
                &mut rng,
            )?);
        }
        self.nucleotide_model
            .as_ref()
            .ok_or(PipelineError::MissingModel("nucleotide"))
    }

    /// Relax the cylinder model and drop the nucleotide model built before relaxation.
    /// Returns the relax score before and after.
    pub fn relax_cylinders(&mut self) -> Result<(f32, f32), PipelineError> {
        self.generate_cylinder_model()?;
        let mut rng = self.rng();
        let relax_parameters = self.relax_parameters;
        let cm = self
            .cylinder_model
            .as_mut()
            .ok_or(PipelineError::MissingModel("cylinder"))?;
        let mut relaxer = Relaxer::with_rng(cm, &relax_parameters, &mut rng);
        let scores = relaxer.relax(cm, relax_parameters.iterations);
        self.nucleotide_model = None;
        Ok(scores)
    }

    /// Resolve the degenerate bases of the nucleotide model.
    pub fn generate_primary(&mut self) -> Result<&NucleotideModel, PipelineError> {
        self.generate_nucleotide_model()?;
        let mut rng = self.rng();
        let gc_content = self.parameters.gc_content;
        let nm = self
            .nucleotide_model
            .as_mut()
            .ok_or(PipelineError::MissingModel("nucleotide"))?;
        let na_type = nm.na_type;
        set_random_primary(nm, gc_content, na_type, &mut rng)?;
        Ok(&*nm)
    }

    pub fn to_json(&self) -> Result<serde_json::Value, PipelineError> {
        let wires = match self.wires.as_ref() {
            Some(w) => Some(w.to_json()?),
            None => None,
        };
        let nm = match self.nucleotide_model.as_ref() {
            Some(nm) => Some(nm.to_json()?),
            None => None,
        };
        let dump = ProjectDump {
            params: self.parameters.clone(),
            relax_params: self.relax_parameters,
            algorithm: self.algorithm,
            graph: self.graph.as_deref().cloned(),
            wires,
            cm: self.cylinder_model.clone(),
            nm,
        };
        Ok(serde_json::to_value(dump)?)
    }

    pub fn load_json(json: &serde_json::Value) -> Result<Self, PipelineError> {
        let dump: ProjectDump = serde_json::from_value(json.clone())?;
        let graph = match dump.graph {
            Some(graph) => {
                graph.check_invariants()?;
                Some(Arc::new(graph))
            }
            None => None,
        };
        let wires = match (graph.as_ref(), dump.wires.as_ref()) {
            (Some(graph), Some(wires)) => Some(wires_from_json(
                dump.algorithm.tag(),
                graph.clone(),
                wires,
            )?),
            (None, Some(_)) => return Err(PipelineError::NoGraph),
            _ => None,
        };
        if let Some(cm) = dump.cm.as_ref() {
            cm.check_invariants()?;
        }
        let nucleotide_model = match dump.nm.as_ref() {
            Some(nm) => Some(NucleotideModel::from_json(nm)?),
            None => None,
        };
        log::info!("Loaded project routed with {}", dump.algorithm);
        Ok(Self {
            parameters: dump.params,
            relax_parameters: dump.relax_params,
            algorithm: dump.algorithm,
            graph,
            wires,
            cylinder_model: dump.cm,
            nucleotide_model,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::tetrahedron;

    fn pipeline() -> Pipeline {
        let parameters = RoutingParameters {
            seed: Some(1),
            ..Default::default()
        };
        Pipeline::new(RoutingAlgorithm::CycleCover, parameters)
    }

    #[test]
    fn no_graph_is_an_error() {
        let mut pipeline = pipeline();
        match pipeline.generate_wires() {
            Err(PipelineError::NoGraph) => (),
            _ => panic!("expected NoGraph"),
        }
        assert_eq!(PipelineError::NoGraph.to_string(), "No model is loaded.");
    }

    #[test]
    fn models_are_generated_on_demand() {
        let mut pipeline = pipeline();
        pipeline.load_mesh(&tetrahedron()).unwrap();
        let nb_nucleotides = pipeline.generate_nucleotide_model().unwrap().len();
        assert!(nb_nucleotides > 0);
        assert_eq!(pipeline.wires().unwrap().len(), 4);
        assert_eq!(pipeline.cylinder_model().unwrap().len(), 12);
    }

    #[test]
    fn new_parameters_invalidate_models() {
        let mut pipeline = pipeline();
        pipeline.load_mesh(&tetrahedron()).unwrap();
        pipeline.generate_nucleotide_model().unwrap();
        pipeline.set_parameters(RoutingParameters {
            scale: 0.2,
            ..pipeline.parameters().clone()
        });
        assert!(pipeline.wires().is_some());
        assert!(pipeline.cylinder_model().is_none());
        assert!(pipeline.nucleotide_model().is_none());
        pipeline.set_algorithm(RoutingAlgorithm::Veneziano);
        assert!(pipeline.wires().is_none());
    }

    #[test]
    fn relaxation_drops_nucleotides() {
        let mut pipeline = pipeline();
        pipeline.load_mesh(&tetrahedron()).unwrap();
        pipeline.set_relax_parameters(RelaxParameters {
            iterations: 5,
            ..Default::default()
        });
        pipeline.generate_nucleotide_model().unwrap();
        let (before, after) = pipeline.relax_cylinders().unwrap();
        assert!(before.is_finite() && after.is_finite());
        assert!(pipeline.nucleotide_model().is_none());
    }

    #[test]
    fn project_round_trip() {
        let mut pipeline = pipeline();
        pipeline.load_mesh(&tetrahedron()).unwrap();
        pipeline.generate_nucleotide_model().unwrap();
        let json = pipeline.to_json().unwrap();
        let loaded = Pipeline::load_json(&json).unwrap();
        assert_eq!(loaded.algorithm(), RoutingAlgorithm::CycleCover);
        assert_eq!(loaded.graph(), pipeline.graph());
        assert_eq!(loaded.cylinder_model(), pipeline.cylinder_model());
        assert_eq!(loaded.nucleotide_model(), pipeline.nucleotide_model());
        assert_eq!(
            loaded.wires().map(|w| w.routes()),
            pipeline.wires().map(|w| w.routes())
        );
    }
}
