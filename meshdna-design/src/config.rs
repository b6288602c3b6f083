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
//! User facing options of the routing pipeline.

use super::NaType;

/// Options consumed by the routing, cylinder, nucleotide and sequence stages.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RoutingParameters {
    pub na_type: NaType,
    /// World units per nanometer of design.
    pub scale: f32,
    pub min_linkers: usize,
    pub max_linkers: usize,
    /// IUPAC codes allowed for the unpaired bases joining two cylinders.
    pub linker_options: String,
    pub min_strand_length: usize,
    pub max_strand_length: usize,
    pub gc_content: f32,
    pub add_nicks: bool,
    pub scaffold_name: String,
    pub custom_scaffold: String,
    pub scaffold_offset: usize,
    pub scaffold_start: Option<usize>,
    pub greedy_offset: bool,
    pub seed: Option<u64>,
}

impl RoutingParameters {
    pub const DEFAULT_SCALE: f32 = 0.1;
    pub const DEFAULT_MIN_STRAND_LENGTH: usize = 20;
    pub const DEFAULT_MAX_STRAND_LENGTH: usize = 100;

    pub fn formated_string(&self) -> String {
        use std::fmt::Write;
        let mut ret = String::new();
        writeln!(&mut ret, "  Nucleic acid: {}", self.na_type).unwrap_or_default();
        writeln!(&mut ret, "  Scale: {}", self.scale).unwrap_or_default();
        writeln!(
            &mut ret,
            "  Linkers: {} to {}",
            self.min_linkers, self.max_linkers
        )
        .unwrap_or_default();
        writeln!(
            &mut ret,
            "  Strand length: {} to {}",
            self.min_strand_length, self.max_strand_length
        )
        .unwrap_or_default();
        writeln!(&mut ret, "  GC content: {:.0}%", self.gc_content * 100.).unwrap_or_default();
        writeln!(&mut ret, "  Nicks: {}", self.add_nicks).unwrap_or_default();
        writeln!(&mut ret, "  Scaffold: {}", self.scaffold_name).unwrap_or_default();
        ret
    }
}

impl Default for RoutingParameters {
    fn default() -> Self {
        Self {
            na_type: NaType::Dna,
            scale: Self::DEFAULT_SCALE,
            min_linkers: 3,
            max_linkers: 5,
            linker_options: String::from("W"),
            min_strand_length: Self::DEFAULT_MIN_STRAND_LENGTH,
            max_strand_length: Self::DEFAULT_MAX_STRAND_LENGTH,
            gc_content: 0.5,
            add_nicks: true,
            scaffold_name: String::from("none"),
            custom_scaffold: String::new(),
            scaffold_offset: 0,
            scaffold_start: None,
            greedy_offset: true,
            seed: None,
        }
    }
}

/// Which forces the relaxer applies.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RelaxParameters {
    pub iterations: usize,
    pub floor_constraints: bool,
    pub bundle_constraints: bool,
    pub spring_constraints: bool,
}

impl Default for RelaxParameters {
    fn default() -> Self {
        Self {
            iterations: 200,
            floor_constraints: true,
            bundle_constraints: true,
            spring_constraints: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_take_default_values() {
        let params: RoutingParameters =
            serde_json::from_str(r#"{"scale": 0.2, "addNicks": false, "naType": "RNA"}"#).unwrap();
        assert_eq!(params.scale, 0.2);
        assert!(!params.add_nicks);
        assert_eq!(params.na_type, NaType::Rna);
        assert_eq!(params.max_strand_length, 100);
        assert_eq!(params.linker_options, "W");
        assert_eq!(params.scaffold_start, None);
    }

    #[test]
    fn relax_parameters_use_camel_case() {
        let json = serde_json::to_value(&RelaxParameters::default()).unwrap();
        assert!(json.get("floorConstraints").is_some());
        assert!(json.get("springConstraints").is_some());
    }
}
