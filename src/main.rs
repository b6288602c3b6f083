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
//! Command line front end: routes a mesh into a DNA nanostructure and writes its exports.

#[macro_use]
extern crate serde_derive;

use clap::Parser;
use meshdna_design::{MeshDescriptor, Pipeline, RelaxParameters, RoutingAlgorithm, RoutingParameters};
use meshdna_exports::{export, ExportType};
use std::path::{Path, PathBuf};
use std::process;

/// Content of the configuration file. Missing sections take their default values.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    routing: RoutingParameters,
    relax: RelaxParameters,
}

/// Route a polyhedral mesh into a DNA nanostructure
#[derive(Parser, Debug)]
#[command(name = "meshdna", version)]
struct Cli {
    /// Mesh description (JSON with vertices, faces and edges)
    mesh: PathBuf,

    /// Configuration file (JSON with "routing" and "relax" sections)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Routing algorithm: cycle_cover or veneziano
    #[arg(short, long, default_value = "cycle_cover")]
    algorithm: RoutingAlgorithm,

    /// Overrides the scale of the configuration file
    #[arg(short, long)]
    scale: Option<f32>,

    /// Overrides the scaffold of the configuration file: none, random or custom
    #[arg(long)]
    scaffold: Option<String>,

    /// Seed of the random generators
    #[arg(long)]
    seed: Option<u64>,

    /// Relax the cylinders before synthesis, with this many steps instead of the configured ones
    #[arg(short, long, num_args = 0..=1)]
    relax: Option<Option<usize>>,

    /// Output directory
    #[arg(short, long, default_value = ".")]
    output: PathBuf,
}

impl Cli {
    fn parameters(&self) -> Result<(RoutingParameters, RelaxParameters), String> {
        let config: ConfigFile = match self.config.as_ref() {
            Some(path) => read_json(path)?,
            None => Default::default(),
        };
        let mut routing = config.routing;
        if let Some(scale) = self.scale {
            routing.scale = scale;
        }
        if let Some(scaffold) = self.scaffold.as_ref() {
            routing.scaffold_name = scaffold.clone();
        }
        if self.seed.is_some() {
            routing.seed = self.seed;
        }
        let mut relax = config.relax;
        if let Some(Some(iterations)) = self.relax {
            relax.iterations = iterations;
        }
        Ok((routing, relax))
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("could not read {}: {e}", path.display()))?;
    serde_json::from_str(&content).map_err(|e| format!("could not parse {}: {e}", path.display()))
}

fn run(cli: &Cli) -> Result<(), String> {
    let (parameters, relax_parameters) = cli.parameters()?;
    log::info!("{}", parameters.formated_string());
    let mesh: MeshDescriptor = read_json(&cli.mesh)?;

    let mut pipeline = Pipeline::new(cli.algorithm, parameters);
    pipeline.set_relax_parameters(relax_parameters);
    pipeline.load_mesh(&mesh).map_err(|e| e.to_string())?;
    pipeline.generate_cylinder_model().map_err(|e| e.to_string())?;
    if cli.relax.is_some() && relax_parameters.iterations > 0 {
        let (before, after) = pipeline.relax_cylinders().map_err(|e| e.to_string())?;
        log::info!("Relax score {} -> {}", before, after);
    }
    pipeline
        .generate_nucleotide_model()
        .map_err(|e| e.to_string())?;

    std::fs::create_dir_all(&cli.output)
        .map_err(|e| format!("could not create {}: {e}", cli.output.display()))?;
    let project = pipeline.to_json().map_err(|e| e.to_string())?;
    let project_path = cli.output.join("project.json");
    std::fs::write(&project_path, project.to_string())
        .map_err(|e| format!("could not write {}: {e}", project_path.display()))?;

    let nm = pipeline.nucleotide_model();
    for (export_type, file) in [
        (ExportType::Oxdna, "design.dat"),
        (ExportType::Strands, "staples.csv"),
        (ExportType::Unf, "design.unf"),
    ] {
        let success = export(nm, export_type, &cli.output.join(file)).map_err(|e| e.to_string())?;
        println!("{}", success.message());
    }
    Ok(())
}

fn main() {
    pretty_env_logger::init();
    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        eprintln!("error: {e}");
        process::exit(1);
    }
}
