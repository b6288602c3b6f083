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
//! Geometric parameters of DNA and RNA double helices.

use std::f32::consts::TAU;
use std::fmt;
use ultraviolet::Vec3;

/// The kind of nucleic acid a design is made of.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NaType {
    #[serde(rename = "DNA")]
    Dna,
    #[serde(rename = "RNA")]
    Rna,
}

impl Default for NaType {
    fn default() -> Self {
        Self::Dna
    }
}

impl fmt::Display for NaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dna => write!(f, "DNA"),
            Self::Rna => write!(f, "RNA"),
        }
    }
}

impl NaType {
    pub fn parameters(&self) -> &'static NaParameters {
        match self {
            Self::Dna => &NaParameters::DNA,
            Self::Rna => &NaParameters::RNA,
        }
    }
}

/// Double helix parameters. Lengths are in nanometers, angles in radians.
///
/// Vectors are expressed in the frame of a nucleotide: the backbone lies on the negative y axis
/// and the base normal points along the negative z axis.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NaParameters {
    /// Distance between two consecutive base pairs along the axis of a helix.
    pub rise: f32,
    /// Radius of a helix.
    pub radius: f32,
    /// Rotation around the helix axis between two consecutive base pairs.
    pub twist: f32,
    /// Angle around the axis between the backbones of two paired nucleotides.
    pub axis: f32,
    /// Shift along the axis between two paired nucleotides.
    pub inclination: f32,
    /// Spacing between the backbones of two consecutive unpaired nucleotides.
    pub backbone_distance: f32,
    /// Distance between the helix axis and the center of a backbone.
    pub radius_bb_center: f32,
    pub backbone_center: [f32; 3],
    pub nucleobase_center: [f32; 3],
    pub base_normal: [f32; 3],
    pub hydrogen_facing_dir: [f32; 3],
}

impl NaParameters {
    pub const DNA: NaParameters = NaParameters {
        rise: 0.332,
        radius: 1.,
        twist: TAU / 10.5,
        axis: 2.86,
        inclination: 0.,
        backbone_distance: 1.,
        radius_bb_center: 0.8517,
        backbone_center: [0., -0.8517, 0.],
        nucleobase_center: [-0.058_066_32, -0.160_158_75, 0.],
        base_normal: [0., 0., -1.],
        hydrogen_facing_dir: [0.340_844_73, 0.940_119_6, 0.],
    };

    pub const RNA: NaParameters = NaParameters {
        rise: 0.281,
        radius: 1.,
        twist: TAU / 11.,
        axis: 1.9,
        inclination: -0.781,
        backbone_distance: 1.,
        radius_bb_center: 0.87,
        backbone_center: [0., -0.95, 0.],
        nucleobase_center: [0.358_569_5, -0.459_131_34, -0.346_270_99],
        base_normal: [-0.146_484_69, -0.216_468_89, -0.965_237_5],
        hydrogen_facing_dir: [0.563_181_1, 0.783_939_1, -0.261_278_7],
    };

    /// Number of base pairs in one full turn of the helix.
    pub fn bases_per_turn(&self) -> f32 {
        TAU / self.twist
    }

    pub fn backbone_center(&self) -> Vec3 {
        self.backbone_center.into()
    }

    pub fn nucleobase_center(&self) -> Vec3 {
        self.nucleobase_center.into()
    }

    pub fn base_normal(&self) -> Vec3 {
        self.base_normal.into()
    }

    pub fn hydrogen_facing_dir(&self) -> Vec3 {
        self.hydrogen_facing_dir.into()
    }

    pub fn formated_string(&self) -> String {
        use std::fmt::Write;
        let mut ret = String::new();
        writeln!(&mut ret, "  Rise: {:.3} nm", self.rise).unwrap_or_default();
        writeln!(&mut ret, "  Helix radius: {:.2} nm", self.radius).unwrap_or_default();
        writeln!(&mut ret, "  #Bases per turn: {:.2}", self.bases_per_turn()).unwrap_or_default();
        writeln!(
            &mut ret,
            "  Angle between paired backbones: {:.1}°",
            self.axis.to_degrees()
        )
        .unwrap_or_default();
        writeln!(&mut ret, "  Inclination: {:.3} nm", self.inclination).unwrap_or_default();
        ret
    }
}

impl std::default::Default for NaParameters {
    fn default() -> Self {
        Self::DNA
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dna_has_ten_and_a_half_bases_per_turn() {
        let p = NaParameters::DNA;
        assert!((p.bases_per_turn() - 10.5).abs() < 1e-4);
        assert!((NaParameters::RNA.bases_per_turn() - 11.).abs() < 1e-4);
    }

    #[test]
    fn backbone_lies_at_backbone_radius() {
        for p in [NaParameters::DNA, NaParameters::RNA].iter() {
            let bb = p.backbone_center();
            assert!(bb.x.abs() < 1e-6);
            assert!(bb.y < 0.);
        }
        assert!((NaParameters::DNA.backbone_center().mag() - 0.8517).abs() < 1e-5);
    }

    #[test]
    fn na_type_is_serialized_in_capitals() {
        let json = serde_json::to_string(&NaType::Rna).unwrap();
        assert_eq!(json, "\"RNA\"");
        assert_eq!(NaType::default().parameters(), &NaParameters::DNA);
    }
}
