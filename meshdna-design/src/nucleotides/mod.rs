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
//! Nucleotide level model of a design.
//!
//! Nucleotides live in an arena owned by the [`NucleotideModel`] and refer to each other by
//! [`NuclId`]. The backbone is a doubly linked list expressed with `prev`/`next` ids and base
//! pairing with symmetric `pair` ids, so crossovers and nicks only rewrite ids.

mod nicks;
mod strand;
mod synthesis;

pub use nicks::{add_strand_gaps, find_crossovers, split_long_strands};
pub use strand::{Strand, StrandId};
pub use synthesis::{cylinders_to_nucleotides, cylinders_to_nucleotides_with_rng};

use crate::cylinders::CylinderId;
use crate::parameters::{NaParameters, NaType};
use crate::primary::PrimaryError;
use ultraviolet::{Mat4, Rotor3, Slerp, Vec3};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NuclId(pub usize);

#[derive(Debug)]
pub enum NucleotideError {
    /// The cylinder model cannot be expanded into nucleotides.
    Topology(String),
    Primary(PrimaryError),
    Serialization(serde_json::Error),
}

impl From<PrimaryError> for NucleotideError {
    fn from(e: PrimaryError) -> Self {
        Self::Primary(e)
    }
}

impl From<serde_json::Error> for NucleotideError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e)
    }
}

impl std::fmt::Display for NucleotideError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Topology(msg) => write!(f, "Inconsistent cylinder model: {}", msg),
            Self::Primary(e) => write!(f, "{}", e),
            Self::Serialization(e) => write!(f, "Could not read nucleotide model: {}", e),
        }
    }
}

impl std::error::Error for NucleotideError {}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Nucleotide {
    pub id: NuclId,
    /// IUPAC code of the base.
    pub base: char,
    pub position: Vec3,
    pub orientation: Rotor3,
    pub prev: Option<NuclId>,
    pub next: Option<NuclId>,
    pub pair: Option<NuclId>,
    #[serde(default)]
    pub strand: Option<StrandId>,
    pub is_linker: bool,
    pub is_scaffold: bool,
    pub is_pseudo: bool,
    #[serde(default)]
    pub cylinder: Option<CylinderId>,
}

impl Nucleotide {
    fn new(id: NuclId, position: Vec3, orientation: Rotor3) -> Self {
        Self {
            id,
            base: 'N',
            position,
            orientation,
            prev: None,
            next: None,
            pair: None,
            strand: None,
            is_linker: false,
            is_scaffold: false,
            is_pseudo: false,
            cylinder: None,
        }
    }

    /// The 4x4 transform mapping the local frame of a nucleotide to world space.
    pub fn transform(&self, scale: f32) -> Mat4 {
        Mat4::from_translation(self.position)
            * self.orientation.into_matrix().into_homogeneous()
            * Mat4::from_scale(scale)
    }

    fn to_world(&self, local: Vec3, scale: f32) -> Vec3 {
        self.position + (local * scale).rotated_by(self.orientation)
    }

    pub fn backbone_center(&self, parameters: &NaParameters, scale: f32) -> Vec3 {
        self.to_world(parameters.backbone_center(), scale)
    }

    pub fn nucleobase_center(&self, parameters: &NaParameters, scale: f32) -> Vec3 {
        self.to_world(parameters.nucleobase_center(), scale)
    }

    /// Unit vector normal to the plane of the base.
    pub fn base_normal(&self, parameters: &NaParameters) -> Vec3 {
        parameters
            .base_normal()
            .rotated_by(self.orientation)
            .normalized()
    }

    pub fn hydrogen_facing_dir(&self, parameters: &NaParameters) -> Vec3 {
        parameters
            .hydrogen_facing_dir()
            .rotated_by(self.orientation)
            .normalized()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NucleotideModel {
    pub scale: f32,
    pub na_type: NaType,
    nucleotides: Vec<Nucleotide>,
    strands: Vec<Strand>,
}

impl NucleotideModel {
    pub fn new(scale: f32, na_type: NaType) -> Self {
        Self {
            scale,
            na_type,
            nucleotides: Vec::new(),
            strands: Vec::new(),
        }
    }

    pub fn parameters(&self) -> &'static NaParameters {
        self.na_type.parameters()
    }

    pub fn nucleotides(&self) -> &[Nucleotide] {
        &self.nucleotides
    }

    pub fn nucleotide(&self, id: NuclId) -> &Nucleotide {
        &self.nucleotides[id.0]
    }

    pub fn get_nucleotide(&self, id: NuclId) -> Option<&Nucleotide> {
        self.nucleotides.get(id.0)
    }

    pub(crate) fn nucleotide_mut(&mut self, id: NuclId) -> &mut Nucleotide {
        &mut self.nucleotides[id.0]
    }

    pub fn strands(&self) -> &[Strand] {
        &self.strands
    }

    pub fn strand(&self, id: StrandId) -> &Strand {
        &self.strands[id.0]
    }

    pub fn len(&self) -> usize {
        self.nucleotides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nucleotides.is_empty()
    }

    pub fn scaffold_strands(&self) -> impl Iterator<Item = &Strand> {
        self.strands.iter().filter(|s| s.is_scaffold)
    }

    pub fn staple_strands(&self) -> impl Iterator<Item = &Strand> {
        self.strands.iter().filter(|s| !s.is_scaffold)
    }

    pub fn add_nucleotide(&mut self, position: Vec3, orientation: Rotor3) -> NuclId {
        let id = NuclId(self.nucleotides.len());
        self.nucleotides
            .push(Nucleotide::new(id, position, orientation));
        id
    }

    /// Make `to` the successor of `from` on the backbone.
    pub fn link(&mut self, from: NuclId, to: NuclId) {
        self.nucleotides[from.0].next = Some(to);
        self.nucleotides[to.0].prev = Some(from);
    }

    /// Break the backbone after `id`. Returns false if `id` had no successor.
    pub fn nick_after(&mut self, id: NuclId) -> bool {
        if let Some(next) = self.nucleotides[id.0].next.take() {
            self.nucleotides[next.0].prev = None;
            true
        } else {
            false
        }
    }

    pub fn pair(&mut self, a: NuclId, b: NuclId) {
        self.nucleotides[a.0].pair = Some(b);
        self.nucleotides[b.0].pair = Some(a);
    }

    /// Splice two antiparallel chains: `chain_1[idx_1]` continues on `chain_2[idx_2]` and
    /// `chain_2[idx_2 - 1]` continues on `chain_1[idx_1 + 1]`.
    pub fn reroute(
        &mut self,
        chain_1: &[NuclId],
        chain_2: &[NuclId],
        idx_1: usize,
        idx_2: usize,
    ) -> Result<(), NucleotideError> {
        if idx_1 + 1 >= chain_1.len() || idx_2 == 0 || idx_2 >= chain_2.len() {
            return Err(NucleotideError::Topology(format!(
                "crossover {}/{} out of chains of length {}/{}",
                idx_1,
                idx_2,
                chain_1.len(),
                chain_2.len()
            )));
        }
        self.link(chain_1[idx_1], chain_2[idx_2]);
        self.link(chain_2[idx_2 - 1], chain_1[idx_1 + 1]);
        Ok(())
    }

    /// Link `from` to `to` through single stranded spacer nucleotides. Their number is the
    /// backbone gap divided by the backbone spacing, clamped to `[min, max]`.
    pub fn link_with_linkers(
        &mut self,
        from: NuclId,
        to: NuclId,
        min: usize,
        max: usize,
    ) -> Vec<NuclId> {
        let parameters = self.parameters();
        let scale = self.scale;
        let (p1, r1, is_scaffold) = {
            let n = &self.nucleotides[from.0];
            (n.position, n.orientation, n.is_scaffold)
        };
        let (p2, r2) = {
            let n = &self.nucleotides[to.0];
            (n.position, n.orientation)
        };
        let gap = (self.nucleotides[to.0].backbone_center(parameters, scale)
            - self.nucleotides[from.0].backbone_center(parameters, scale))
        .mag()
            / scale;
        let count = ((gap / parameters.backbone_distance).round() as usize).clamp(min, max.max(min));

        let mut linkers = Vec::with_capacity(count);
        let mut prev = from;
        for i in 0..count {
            let t = (i + 1) as f32 / (count + 1) as f32;
            let id = self.add_nucleotide(p1 * (1. - t) + p2 * t, r1.slerp(r2, t));
            {
                let n = self.nucleotide_mut(id);
                n.is_linker = true;
                n.is_scaffold = is_scaffold;
            }
            self.link(prev, id);
            linkers.push(id);
            prev = id;
        }
        self.link(prev, to);
        linkers
    }

    /// Checks that pairing is symmetric and that the backbone links are consistent.
    pub fn check_invariants(&self) -> Result<(), NucleotideError> {
        let len = self.nucleotides.len();
        let out_of_bounds = |id: Option<NuclId>| id.map(|i| i.0 >= len).unwrap_or(false);
        for (i, n) in self.nucleotides.iter().enumerate() {
            if n.id.0 != i {
                return Err(NucleotideError::Topology(format!(
                    "nucleotide {} is stored at {}",
                    n.id.0, i
                )));
            }
            if out_of_bounds(n.prev) || out_of_bounds(n.next) || out_of_bounds(n.pair) {
                return Err(NucleotideError::Topology(format!(
                    "nucleotide {} refers to an unknown nucleotide",
                    i
                )));
            }
            if let Some(p) = n.pair {
                if self.nucleotides[p.0].pair != Some(n.id) {
                    return Err(NucleotideError::Topology(format!(
                        "pairing of {} is not symmetric",
                        i
                    )));
                }
            }
            if let Some(next) = n.next {
                if self.nucleotides[next.0].prev != Some(n.id) {
                    return Err(NucleotideError::Topology(format!(
                        "backbone broken after {}",
                        i
                    )));
                }
            }
            if let Some(prev) = n.prev {
                if self.nucleotides[prev.0].next != Some(n.id) {
                    return Err(NucleotideError::Topology(format!(
                        "backbone broken before {}",
                        i
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    pub fn from_json(json: &serde_json::Value) -> Result<Self, NucleotideError> {
        let mut model: Self = serde_json::from_value(json.clone())?;
        model.check_invariants()?;
        model.concatenate_strands();
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(model: &mut NucleotideModel, len: usize) -> Vec<NuclId> {
        let ids: Vec<_> = (0..len)
            .map(|i| model.add_nucleotide(Vec3::new(0., i as f32, 0.), Rotor3::identity()))
            .collect();
        for w in ids.windows(2) {
            model.link(w[0], w[1]);
        }
        ids
    }

    #[test]
    fn reroute_swaps_successors() {
        let mut model = NucleotideModel::new(1., NaType::Dna);
        let a = chain(&mut model, 6);
        let b = chain(&mut model, 6);
        model.reroute(&a, &b, 2, 3).unwrap();
        assert_eq!(model.nucleotide(a[2]).next, Some(b[3]));
        assert_eq!(model.nucleotide(b[2]).next, Some(a[3]));
        model.check_invariants().unwrap();
        model.concatenate_strands();
        assert_eq!(model.strands().len(), 2);
        let lengths: Vec<_> = model.strands().iter().map(|s| s.len()).collect();
        assert_eq!(lengths, vec![6, 6]);
    }

    #[test]
    fn reroute_out_of_bounds_is_an_error() {
        let mut model = NucleotideModel::new(1., NaType::Dna);
        let a = chain(&mut model, 4);
        let b = chain(&mut model, 4);
        assert!(model.reroute(&a, &b, 3, 1).is_err());
        assert!(model.reroute(&a, &b, 1, 0).is_err());
    }

    #[test]
    fn linkers_are_clamped() {
        let mut model = NucleotideModel::new(1., NaType::Dna);
        let a = model.add_nucleotide(Vec3::zero(), Rotor3::identity());
        let b = model.add_nucleotide(Vec3::new(100., 0., 0.), Rotor3::identity());
        let linkers = model.link_with_linkers(a, b, 3, 5);
        assert_eq!(linkers.len(), 5);
        assert!(linkers.iter().all(|l| model.nucleotide(*l).is_linker));
        let c = model.add_nucleotide(Vec3::zero(), Rotor3::identity());
        let d = model.add_nucleotide(Vec3::zero(), Rotor3::identity());
        assert_eq!(model.link_with_linkers(c, d, 3, 5).len(), 3);
        model.check_invariants().unwrap();
    }

    #[test]
    fn linker_orientations_turn_at_constant_speed() {
        let mut model = NucleotideModel::new(1., NaType::Dna);
        let quarter_turn = crate::utils::rotor_from_frame(Vec3::unit_y(), -Vec3::unit_x());
        let a = model.add_nucleotide(Vec3::zero(), Rotor3::identity());
        let b = model.add_nucleotide(Vec3::zero(), quarter_turn);
        let linkers = model.link_with_linkers(a, b, 3, 3);
        assert_eq!(linkers.len(), 3);
        for (i, l) in linkers.iter().enumerate() {
            let angle = std::f32::consts::FRAC_PI_2 * (i + 1) as f32 / 4.;
            let x = Vec3::unit_x().rotated_by(model.nucleotide(*l).orientation);
            assert!((x - Vec3::new(angle.cos(), angle.sin(), 0.)).mag() < 1e-3);
        }
    }

    #[test]
    fn nick_breaks_backbone() {
        let mut model = NucleotideModel::new(1., NaType::Dna);
        let a = chain(&mut model, 5);
        assert!(model.nick_after(a[1]));
        assert!(!model.nick_after(a[4]));
        model.concatenate_strands();
        assert_eq!(model.strands().len(), 2);
    }

    #[test]
    fn transform_translates_to_position() {
        let mut model = NucleotideModel::new(0.5, NaType::Dna);
        let a = model.add_nucleotide(Vec3::new(1., 2., 3.), Rotor3::identity());
        let m = model.nucleotide(a).transform(model.scale);
        let p = m.transform_point3(Vec3::zero());
        assert!((p - Vec3::new(1., 2., 3.)).mag() < 1e-6);
    }
}
