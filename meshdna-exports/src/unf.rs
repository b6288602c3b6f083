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
//! Export to the Unified Nanotechnology Format, a JSON description of the nucleotides of a
//! design.

use super::concrete_bases;
use meshdna_design::nucleotides::{NuclId, NucleotideModel};
use meshdna_design::ultraviolet::Vec3;
use serde_json::{json, Value};
use std::path::Path;

const UNF_VERSION: &str = "1.0.0";

fn index(id: Option<NuclId>) -> i64 {
    id.map(|NuclId(n)| n as i64).unwrap_or(-1)
}

fn coordinates(v: Vec3) -> Value {
    json!([v.x, v.y, v.z])
}

/// The UNF document of `nm`. Positions are given in units of the scale of the model.
pub fn to_unf(nm: &NucleotideModel, name: &str) -> Value {
    let parameters = nm.parameters();
    let bases = concrete_bases(nm);
    let na_strands: Vec<Value> = nm
        .strands()
        .iter()
        .map(|s| {
            let nucleotides: Vec<Value> = s
                .nucleotides
                .iter()
                .map(|id| {
                    let n = nm.nucleotide(*id);
                    json!({
                        "id": id.0,
                        "nbAbbrev": bases[id.0].to_string(),
                        "pair": index(n.pair),
                        "prev": index(n.prev),
                        "next": index(n.next),
                        "pdbId": 0,
                        "altPositions": [{
                            "nucleobaseCenter":
                                coordinates(n.nucleobase_center(parameters, nm.scale) / nm.scale),
                            "backboneCenter":
                                coordinates(n.backbone_center(parameters, nm.scale) / nm.scale),
                            "baseNormal": coordinates(n.base_normal(parameters)),
                            "hydrogenFaceDir": coordinates(n.hydrogen_facing_dir(parameters)),
                        }],
                    })
                })
                .collect();
            let name = if s.is_scaffold {
                format!("scaffold_{}", s.id.0)
            } else {
                format!("staple_{}", s.id.0)
            };
            json!({
                "id": s.id.0,
                "name": name,
                "isScaffold": s.is_scaffold,
                "naType": nm.na_type.to_string(),
                "color": "",
                "fivePrimeId": index(s.nucleotides.first().cloned()),
                "threePrimeId": index(s.nucleotides.last().cloned()),
                "pdbFileId": 0,
                "chainName": "",
                "nucleotides": nucleotides,
            })
        })
        .collect();
    json!({
        "format": "unf",
        "version": UNF_VERSION,
        "idCounter": nm.len(),
        "lengthUnits": "nm",
        "angularUnits": "deg",
        "name": name,
        "author": "",
        "creationDate": "",
        "doi": {},
        "simData": { "boxSize": [] },
        "externalFiles": [],
        "lattices": [],
        "structures": [{
            "id": 0,
            "name": name,
            "naStrands": na_strands,
            "aminoAcidChains": [],
        }],
        "molecules": {
            "ligands": [],
            "bonds": [],
            "nanostructures": [],
            "others": [],
        },
        "groups": [],
        "connections": [],
        "modifications": [],
        "misc": {},
    })
}

pub fn write_unf<P: AsRef<Path>>(nm: &NucleotideModel, path: P) -> Result<(), std::io::Error> {
    let path = path.as_ref();
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let content = serde_json::to_string_pretty(&to_unf(nm, &name))?;
    std::fs::write(path, content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{output_dir, tetrahedron_model};

    #[test]
    fn every_nucleotide_is_listed_once() {
        let nm = tetrahedron_model();
        let unf = to_unf(&nm, "tetrahedron");
        assert_eq!(unf["format"], "unf");
        let strands = unf["structures"][0]["naStrands"].as_array().unwrap();
        assert_eq!(strands.len(), nm.strands().len());
        assert_eq!(
            strands.iter().filter(|s| s["isScaffold"] == true).count(),
            nm.strands().iter().filter(|s| s.is_scaffold).count()
        );
        let mut seen = vec![false; nm.len()];
        for s in strands {
            for n in s["nucleotides"].as_array().unwrap() {
                let id = n["id"].as_u64().unwrap() as usize;
                assert!(!seen[id]);
                seen[id] = true;
                let nucl = nm.nucleotide(NuclId(id));
                assert_eq!(n["pair"].as_i64().unwrap(), index(nucl.pair));
                assert_eq!(n["next"].as_i64().unwrap(), index(nucl.next));
                let normal = &n["altPositions"][0]["baseNormal"];
                let norm: f64 = (0..3).map(|i| normal[i].as_f64().unwrap().powi(2)).sum();
                assert!((norm - 1.).abs() < 1e-3);
            }
        }
        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn positions_are_divided_by_the_scale() {
        let nm = tetrahedron_model();
        let unf = to_unf(&nm, "tetrahedron");
        let first = &unf["structures"][0]["naStrands"][0];
        let id = first["fivePrimeId"].as_u64().unwrap() as usize;
        let nucl = nm.nucleotide(NuclId(id));
        let expected = nucl.backbone_center(nm.parameters(), nm.scale) / nm.scale;
        let n = &first["nucleotides"][0]["altPositions"][0]["backboneCenter"];
        assert!((n[0].as_f64().unwrap() as f32 - expected.x).abs() < 1e-4);
        assert!((n[2].as_f64().unwrap() as f32 - expected.z).abs() < 1e-4);
    }

    #[test]
    fn unf_file_is_valid_json() {
        let nm = tetrahedron_model();
        let path = output_dir("unf").join("design.unf");
        write_unf(&nm, &path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        let value: Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value["name"], "design");
    }
}
