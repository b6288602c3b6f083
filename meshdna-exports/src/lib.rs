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
//! Exports of nucleotide models to the file formats used to simulate and order DNA
//! nanostructures.

use meshdna_design::nucleotides::{NuclId, NucleotideModel};
use meshdna_design::primary::{complement, is_concrete, iupac_options};
use std::path::{Path, PathBuf};
use strum::Display;

pub mod oxdna;
pub mod strands;
pub mod unf;

/// The file formats to which an export is implemented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ExportType {
    Oxdna,
    Strands,
    Unf,
}

/// A value returned by the export functions when exports was successfull.
///
/// This means that both the format conversion and the write to the output file were successful.
pub enum ExportSuccess {
    Oxdna {
        topology: PathBuf,
        configuration: PathBuf,
        forces: PathBuf,
    },
    Strands(PathBuf),
    Unf(PathBuf),
}

const SUCCESSFUL_EXPORT_MSG_PREFIX: &str = "Successfully exported to";

impl ExportSuccess {
    /// A message telling that the export operation was successfull and giving the path to which
    /// the export was made
    pub fn message(&self) -> String {
        match self {
            Self::Oxdna {
                topology,
                configuration,
                forces,
            } => format!(
                "{SUCCESSFUL_EXPORT_MSG_PREFIX}\n{}\n{}\n{}",
                configuration.to_string_lossy(),
                topology.to_string_lossy(),
                forces.to_string_lossy()
            ),
            Self::Strands(p) | Self::Unf(p) => {
                format!("{SUCCESSFUL_EXPORT_MSG_PREFIX}\n{}", p.to_string_lossy())
            }
        }
    }
}

#[derive(Debug)]
pub enum ExportError {
    /// There is no nucleotide model to export.
    MissingModel,
    IOError(std::io::Error),
}

impl From<std::io::Error> for ExportError {
    fn from(e: std::io::Error) -> Self {
        Self::IOError(e)
    }
}

impl std::fmt::Display for ExportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingModel => write!(f, "No nucleotide model to export."),
            Self::IOError(e) => write!(f, "Could not write export: {e}"),
        }
    }
}

impl std::error::Error for ExportError {}

/// Concrete bases for every nucleotide, indexed by id. Degenerate codes take their first
/// option unless their partner already fixed them.
pub(crate) fn concrete_bases(nm: &NucleotideModel) -> Vec<char> {
    let na_type = nm.na_type;
    let mut bases: Vec<char> = Vec::with_capacity(nm.len());
    for n in nm.nucleotides() {
        let own = || {
            iupac_options(n.base, na_type)
                .and_then(|o| o.first().cloned())
                .unwrap_or('T')
        };
        let base = if is_concrete(n.base, na_type) {
            n.base
        } else {
            match n.pair {
                Some(NuclId(p)) if p < bases.len() => {
                    complement(bases[p], na_type).unwrap_or_else(own)
                }
                Some(p) if is_concrete(nm.nucleotide(p).base, na_type) => {
                    complement(nm.nucleotide(p).base, na_type).unwrap_or_else(own)
                }
                _ => own(),
            }
        };
        bases.push(base);
    }
    bases
}

pub fn export(
    nm: Option<&NucleotideModel>,
    export_type: ExportType,
    export_path: &Path,
) -> Result<ExportSuccess, ExportError> {
    let nm = nm.ok_or(ExportError::MissingModel)?;
    let success = match export_type {
        ExportType::Oxdna => {
            let configuration = export_path.to_path_buf();
            let topology = export_path.with_extension("top");
            let forces = export_path.with_extension("forces");
            let (config, topo) = oxdna::to_oxdna(nm);
            config.write(&configuration)?;
            topo.write(&topology)?;
            oxdna::write_forces(nm, &forces)?;
            ExportSuccess::Oxdna {
                topology,
                configuration,
                forces,
            }
        }
        ExportType::Strands => {
            strands::write_staple_list(nm, export_path)?;
            ExportSuccess::Strands(export_path.to_path_buf())
        }
        ExportType::Unf => {
            unf::write_unf(nm, export_path)?;
            ExportSuccess::Unf(export_path.to_path_buf())
        }
    };
    log::info!("{} export: {}", export_type, success.message());
    Ok(success)
}

pub type ExportResult = Result<ExportSuccess, ExportError>;

#[cfg(test)]
mod tests {
    use super::*;
    use meshdna_design::{MeshDescriptor, Pipeline, RoutingAlgorithm, RoutingParameters};

    pub(crate) fn tetrahedron_model() -> NucleotideModel {
        let mesh = MeshDescriptor {
            vertices: vec![
                [5., 5., 5.],
                [5., -5., -5.],
                [-5., 5., -5.],
                [-5., -5., 5.],
            ],
            faces: vec![vec![0, 1, 2], vec![1, 0, 3], vec![0, 2, 3], vec![2, 1, 3]],
            edges: vec![],
        };
        let parameters = RoutingParameters {
            scale: 0.5,
            seed: Some(0),
            ..Default::default()
        };
        let mut pipeline = Pipeline::new(RoutingAlgorithm::CycleCover, parameters);
        pipeline.load_mesh(&mesh).unwrap();
        pipeline.generate_nucleotide_model().unwrap().clone()
    }

    pub(crate) fn output_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("meshdna_exports_{}_{}", name, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn bases_are_concrete_and_complementary() {
        let nm = tetrahedron_model();
        let bases = concrete_bases(&nm);
        assert_eq!(bases.len(), nm.len());
        for n in nm.nucleotides() {
            assert!(is_concrete(bases[n.id.0], nm.na_type));
            if let Some(p) = n.pair {
                assert_eq!(complement(bases[n.id.0], nm.na_type), Some(bases[p.0]));
            }
        }
    }

    #[test]
    fn missing_model_is_an_error() {
        let dir = output_dir("missing");
        assert!(matches!(
            export(None, ExportType::Oxdna, &dir.join("design.dat")),
            Err(ExportError::MissingModel)
        ));
    }

    #[test]
    fn oxdna_export_writes_three_files() {
        let nm = tetrahedron_model();
        let dir = output_dir("oxdna");
        let success = export(Some(&nm), ExportType::Oxdna, &dir.join("design.dat")).unwrap();
        match success {
            ExportSuccess::Oxdna {
                topology,
                configuration,
                forces,
            } => {
                assert!(topology.exists());
                assert!(configuration.exists());
                assert!(forces.exists());
                assert_eq!(topology.extension().unwrap(), "top");
            }
            _ => panic!("expected an oxDNA export"),
        }
    }

    #[test]
    fn unf_export_writes_one_file() {
        let nm = tetrahedron_model();
        let path = output_dir("unf_export").join("design.unf");
        let success = export(Some(&nm), ExportType::Unf, &path).unwrap();
        assert!(matches!(&success, ExportSuccess::Unf(p) if p == &path));
        assert!(path.exists());
        assert!(success.message().ends_with("design.unf"));
    }
}
