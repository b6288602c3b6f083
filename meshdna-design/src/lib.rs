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
//! Routing of polyhedral meshes into DNA nanostructures.
//!
//! A mesh is turned into a half-edge [`graph::Graph`], routed by a [`routing::WiresModel`],
//! laid out as double helices in a [`cylinders::CylinderModel`] that the [`relaxer`] can
//! relax, and finally expanded into the strands of a [`nucleotides::NucleotideModel`].
//! [`pipeline::Pipeline`] chains these stages.

#[macro_use]
extern crate serde_derive;
extern crate serde;
/// Re-export ultraviolet for linear algebra
pub use ultraviolet;

mod config;
pub use config::{RelaxParameters, RoutingParameters};
mod parameters;
pub use parameters::{NaParameters, NaType};

pub mod cylinders;
pub mod graph;
pub mod nucleotides;
pub mod pipeline;
pub mod primary;
pub mod relaxer;
pub mod routing;
pub mod utils;

pub use cylinders::{CylinderError, CylinderModel};
pub use graph::{Graph, GraphError, MeshDescriptor};
pub use nucleotides::{NucleotideError, NucleotideModel};
pub use pipeline::{Pipeline, PipelineError};
pub use routing::{RoutingAlgorithm, RoutingError, WiresModel};

#[cfg(test)]
mod tests;
