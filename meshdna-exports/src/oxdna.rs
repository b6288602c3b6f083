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
use super::concrete_bases;
use meshdna_design::nucleotides::{NuclId, Nucleotide, NucleotideModel};
use meshdna_design::ultraviolet::{Mat3, Rotor3, Vec3};
use meshdna_design::NaParameters;
use std::io::Write;
use std::path::Path;

pub const OXDNA_LEN_FACTOR: f32 = 1. / 0.8518;
pub const BACKBONE_TO_CM: f32 = 0.34 * OXDNA_LEN_FACTOR;
/// Stiffness and rest length of the traps holding paired nucleotides together, in oxDNA units.
const TRAP_STIFFNESS: f32 = 0.09;
const TRAP_REST_LENGTH: f32 = 1.2;

pub struct OxDnaNucl {
    pub position: Vec3,
    backbone_base: Vec3,
    pub normal: Vec3,
    velocity: Vec3,
    angular_velocity: Vec3,
}

impl OxDnaNucl {
    fn new(nucl: &Nucleotide, parameters: &NaParameters, scale: f32) -> Self {
        let backbone_position = nucl.backbone_center(parameters, scale) / scale;
        let a1 = nucl.hydrogen_facing_dir(parameters);
        let normal = nucl.base_normal(parameters);
        let cm_position = backbone_position * OXDNA_LEN_FACTOR + a1 * BACKBONE_TO_CM;
        Self {
            position: cm_position,
            backbone_base: a1,
            normal,
            velocity: Vec3::zero(),
            angular_velocity: Vec3::zero(),
        }
    }

    pub fn get_basis(&self) -> Rotor3 {
        let a1 = self.backbone_base.normalized();
        let a3 = -self.normal.normalized();
        let a2 = a3.cross(a1).normalized();
        let a3 = a1.cross(a2).normalized();

        Mat3::new(a1, a2, a3).into_rotor3()
    }
}

pub struct OxDnaConfig {
    time: f32,
    boundaries: [f32; 3],
    /// Etot, U and K
    kinetic_energies: [f32; 3],
    nucls: Vec<OxDnaNucl>,
}

impl OxDnaConfig {
    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<(), std::io::Error> {
        let mut file = std::fs::File::create(path)?;
        let max = self.boundaries[0].max(self.boundaries[1].max(self.boundaries[2]));
        writeln!(&mut file, "t = {}", self.time)?;
        writeln!(&mut file, "b = {} {} {}", max, max, max)?;
        writeln!(
            &mut file,
            "E = {} {} {}",
            self.kinetic_energies[0], self.kinetic_energies[1], self.kinetic_energies[2]
        )?;
        for n in self.nucls.iter() {
            writeln!(
                &mut file,
                "{} {} {} {} {} {} {} {} {} {} {} {} {} {} {}",
                n.position.x,
                n.position.y,
                n.position.z,
                n.backbone_base.x,
                n.backbone_base.y,
                n.backbone_base.z,
                n.normal.x,
                n.normal.y,
                n.normal.z,
                n.velocity.x,
                n.velocity.y,
                n.velocity.z,
                n.angular_velocity.x,
                n.angular_velocity.y,
                n.angular_velocity.z,
            )?;
        }
        Ok(())
    }

    pub fn nucls(&self) -> &[OxDnaNucl] {
        &self.nucls
    }
}

pub struct OxDnaTopology {
    nb_nucl: usize,
    nb_strand: usize,
    bounds: Vec<OxDnaBound>,
}

impl OxDnaTopology {
    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<(), std::io::Error> {
        let mut file = std::fs::File::create(path)?;
        writeln!(&mut file, "{} {}", self.nb_nucl, self.nb_strand)?;
        for bound in self.bounds.iter() {
            writeln!(
                &mut file,
                "{} {} {} {}",
                bound.strand_id, bound.base, bound.prime5, bound.prime3
            )?;
        }
        Ok(())
    }
}

struct OxDnaBound {
    /// 1-based
    strand_id: usize,
    base: char,
    prime5: isize,
    prime3: isize,
}

/// oxDNA particles are the nucleotides of the model, in id order.
pub fn to_oxdna(nm: &NucleotideModel) -> (OxDnaConfig, OxDnaTopology) {
    let parameters = nm.parameters();
    let bases = concrete_bases(nm);
    let mut boundaries = [0f32; 3];
    let mut nucls = Vec::with_capacity(nm.len());
    let mut bounds = Vec::with_capacity(nm.len());
    let index = |id: Option<NuclId>| id.map(|i| i.0 as isize).unwrap_or(-1);

    for n in nm.nucleotides() {
        let ox_nucl = OxDnaNucl::new(n, parameters, nm.scale);
        boundaries[0] = boundaries[0].max(4. * ox_nucl.position.x.abs());
        boundaries[1] = boundaries[1].max(4. * ox_nucl.position.y.abs());
        boundaries[2] = boundaries[2].max(4. * ox_nucl.position.z.abs());
        nucls.push(ox_nucl);
        bounds.push(OxDnaBound {
            strand_id: n.strand.map(|s| s.0 + 1).unwrap_or(0),
            base: bases[n.id.0],
            prime5: index(n.prev),
            prime3: index(n.next),
        });
    }

    let topo = OxDnaTopology {
        nb_nucl: nm.len(),
        nb_strand: nm.strands().len(),
        bounds,
    };
    let config = OxDnaConfig {
        time: 0f32,
        kinetic_energies: [0f32, 0f32, 0f32],
        boundaries,
        nucls,
    };
    (config, topo)
}

/// One mutual trap per paired nucleotide, so that base pairs survive the first steps of a
/// simulation.
pub fn write_forces<P: AsRef<Path>>(nm: &NucleotideModel, path: P) -> Result<(), std::io::Error> {
    let mut file = std::fs::File::create(path)?;
    for n in nm.nucleotides() {
        if let Some(pair) = n.pair {
            writeln!(&mut file, "{{")?;
            writeln!(&mut file, "type = mutual_trap")?;
            writeln!(&mut file, "particle = {}", n.id.0)?;
            writeln!(&mut file, "ref_particle = {}", pair.0)?;
            writeln!(&mut file, "stiff = {}", TRAP_STIFFNESS)?;
            writeln!(&mut file, "r0 = {}", TRAP_REST_LENGTH)?;
            writeln!(&mut file, "PBC = 1")?;
            writeln!(&mut file, "}}")?;
        }
    }
    Ok(())
}
