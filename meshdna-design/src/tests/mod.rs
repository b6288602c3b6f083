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

//! Fixture meshes and end to end scenarios.

use super::*;
use crate::nucleotides::{cylinders_to_nucleotides, NuclId};
use crate::primary::{complement, is_concrete, set_random_primary};
use crate::routing::graph_to_wires;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A regular tetrahedron with edges of length 10√2.
pub fn tetrahedron() -> MeshDescriptor {
    MeshDescriptor {
        vertices: vec![
            [5., 5., 5.],
            [5., -5., -5.],
            [-5., 5., -5.],
            [-5., -5., 5.],
        ],
        faces: vec![vec![0, 1, 2], vec![1, 0, 3], vec![0, 2, 3], vec![2, 1, 3]],
        edges: vec![],
    }
}

/// A cube of side 10 centered on the origin. Vertex `i` has coordinates given by the bits of `i`.
pub fn cube() -> MeshDescriptor {
    let vertices = (0..8)
        .map(|i| {
            let coord = |bit: usize| if i & bit == 0 { -5. } else { 5. };
            [coord(1), coord(2), coord(4)]
        })
        .collect();
    MeshDescriptor {
        vertices,
        faces: vec![
            vec![0, 2, 3, 1],
            vec![4, 5, 7, 6],
            vec![0, 1, 5, 4],
            vec![2, 6, 7, 3],
            vec![0, 4, 6, 2],
            vec![1, 3, 7, 5],
        ],
        edges: vec![],
    }
}

pub fn octahedron() -> MeshDescriptor {
    MeshDescriptor {
        vertices: vec![
            [5., 0., 0.],
            [-5., 0., 0.],
            [0., 5., 0.],
            [0., -5., 0.],
            [0., 0., 5.],
            [0., 0., -5.],
        ],
        faces: vec![
            vec![0, 2, 4],
            vec![1, 4, 2],
            vec![0, 4, 3],
            vec![1, 3, 4],
            vec![0, 5, 2],
            vec![1, 2, 5],
            vec![0, 3, 5],
            vec![1, 5, 3],
        ],
        edges: vec![],
    }
}

/// A square of `n` by `n` cells of side 10 in the xy plane, each cell cut in two triangles.
pub fn grid(n: usize) -> MeshDescriptor {
    let idx = |i: usize, j: usize| j * (n + 1) + i;
    let mut vertices = Vec::with_capacity((n + 1) * (n + 1));
    for j in 0..=n {
        for i in 0..=n {
            vertices.push([10. * i as f32, 10. * j as f32, 0.]);
        }
    }
    let mut faces = Vec::with_capacity(2 * n * n);
    for j in 0..n {
        for i in 0..n {
            faces.push(vec![idx(i, j), idx(i + 1, j), idx(i + 1, j + 1)]);
            faces.push(vec![idx(i, j), idx(i + 1, j + 1), idx(i, j + 1)]);
        }
    }
    MeshDescriptor {
        vertices,
        faces,
        edges: vec![],
    }
}

/// A square and one of its diagonals, given as edges only.
pub fn square_without_faces() -> MeshDescriptor {
    MeshDescriptor {
        vertices: vec![[0., 0., 0.], [10., 0., 0.], [10., 10., 0.], [0., 10., 0.]],
        faces: vec![],
        edges: vec![[0, 1], [1, 2], [2, 3], [3, 0], [0, 2]],
    }
}

fn cylinder_model(
    mesh: &MeshDescriptor,
    algorithm: RoutingAlgorithm,
    parameters: &RoutingParameters,
) -> Result<CylinderModel, CylinderError> {
    let graph = Arc::new(Graph::from_mesh(mesh).unwrap());
    let wires = graph_to_wires(algorithm, graph).unwrap();
    wires.to_cylinder_model(parameters)
}

fn check_nucleotide_model(nm: &NucleotideModel) {
    nm.check_invariants().unwrap();
    let total: usize = nm.strands().iter().map(|s| s.len()).sum();
    assert_eq!(total, nm.len());
    for (i, n) in nm.nucleotides().iter().enumerate() {
        assert_eq!(n.id, NuclId(i));
        if let Some(p) = n.pair {
            assert_ne!(n.is_scaffold, nm.nucleotide(p).is_scaffold);
            assert!(!n.is_linker);
        }
        assert!(n.position.x.is_finite() && n.position.y.is_finite() && n.position.z.is_finite());
    }
}

#[test]
fn scale_decides_feasibility() {
    init_logger();
    let small = RoutingParameters {
        scale: 0.1,
        ..Default::default()
    };
    assert!(cylinder_model(&tetrahedron(), RoutingAlgorithm::CycleCover, &small).is_ok());
    let large = RoutingParameters {
        scale: 100.,
        ..Default::default()
    };
    let err = cylinder_model(&tetrahedron(), RoutingAlgorithm::CycleCover, &large).unwrap_err();
    assert!(matches!(err, CylinderError::ScaleTooSmall { .. }));
    assert!(err.to_string().contains("< 31 nucleotides"));
}

#[test]
fn cycle_cover_nucleotides() {
    init_logger();
    let parameters = RoutingParameters {
        scale: 0.5,
        scaffold_name: "none".to_string(),
        seed: Some(0),
        ..Default::default()
    };
    let cm = cylinder_model(&tetrahedron(), RoutingAlgorithm::CycleCover, &parameters).unwrap();
    let nm = cylinders_to_nucleotides(&cm, &parameters).unwrap();
    assert!(!nm.is_empty());
    check_nucleotide_model(&nm);
    // One scaffold loop per face.
    assert_eq!(nm.scaffold_strands().count(), 4);
    assert!(nm.scaffold_strands().all(|s| s.is_cyclic));
    assert!(nm.staple_strands().all(|s| !s.is_cyclic));
    assert!(nm
        .nucleotides()
        .iter()
        .filter(|n| !n.is_linker)
        .all(|n| n.base == 'N'));
}

#[test]
fn staples_respect_length_bounds() {
    init_logger();
    let parameters = RoutingParameters {
        scale: 0.2,
        add_nicks: true,
        min_strand_length: 10,
        max_strand_length: 100,
        seed: Some(0),
        ..Default::default()
    };
    let cm = cylinder_model(&tetrahedron(), RoutingAlgorithm::CycleCover, &parameters).unwrap();
    let nm = cylinders_to_nucleotides(&cm, &parameters).unwrap();
    check_nucleotide_model(&nm);
    for s in nm.staple_strands() {
        assert!(s.len() <= 100, "staple of length {}", s.len());
        // Paired runs between linkers and strand ends overlap the scaffold enough.
        let mut run = 0;
        for n in s.nucleotides.iter() {
            if nm.nucleotide(*n).pair.is_some() {
                run += 1;
            } else {
                assert!(run == 0 || run >= 10, "paired run of length {}", run);
                run = 0;
            }
        }
        assert!(run == 0 || run >= 10, "paired run of length {}", run);
    }
}

#[test]
fn random_primary_is_complementary() {
    init_logger();
    let parameters = RoutingParameters {
        scale: 0.2,
        scaffold_name: "random".to_string(),
        seed: Some(5),
        ..Default::default()
    };
    let cm = cylinder_model(&tetrahedron(), RoutingAlgorithm::CycleCover, &parameters).unwrap();
    let mut nm = cylinders_to_nucleotides(&cm, &parameters).unwrap();
    let mut rng = StdRng::seed_from_u64(5);
    set_random_primary(&mut nm, 0.5, NaType::Dna, &mut rng).unwrap();
    for n in nm.nucleotides() {
        assert!(is_concrete(n.base, NaType::Dna));
        if let Some(p) = n.pair {
            assert_eq!(complement(n.base, NaType::Dna), Some(nm.nucleotide(p).base));
        }
    }
}

#[test]
fn rna_models_use_uracil() {
    let parameters = RoutingParameters {
        scale: 0.2,
        na_type: NaType::Rna,
        scaffold_name: "random".to_string(),
        seed: Some(2),
        ..Default::default()
    };
    let cm = cylinder_model(&tetrahedron(), RoutingAlgorithm::CycleCover, &parameters).unwrap();
    let mut nm = cylinders_to_nucleotides(&cm, &parameters).unwrap();
    let mut rng = StdRng::seed_from_u64(2);
    set_random_primary(&mut nm, 0.5, NaType::Rna, &mut rng).unwrap();
    assert!(nm.nucleotides().iter().all(|n| n.base != 'T'));
    assert!(nm.nucleotides().iter().any(|n| n.base == 'U'));
}

#[test]
fn veneziano_pipeline() {
    init_logger();
    let parameters = RoutingParameters {
        seed: Some(3),
        ..Default::default()
    };
    let mut pipeline = Pipeline::new(RoutingAlgorithm::Veneziano, parameters);
    pipeline.load_mesh(&cube()).unwrap();
    let nm = pipeline.generate_nucleotide_model().unwrap();
    check_nucleotide_model(nm);
    assert!(nm.nucleotides().iter().any(|n| n.is_pseudo));
    let cm = pipeline.cylinder_model().unwrap();
    assert_eq!(cm.len(), 24);
    assert_eq!(pipeline.wires().unwrap().len(), 1);
}

#[test]
fn nucleotide_model_round_trip() {
    let parameters = RoutingParameters {
        scale: 0.2,
        seed: Some(4),
        ..Default::default()
    };
    let cm = cylinder_model(&octahedron(), RoutingAlgorithm::CycleCover, &parameters).unwrap();
    let nm = cylinders_to_nucleotides(&cm, &parameters).unwrap();
    let json = nm.to_json().unwrap();
    let reloaded = NucleotideModel::from_json(&json).unwrap();
    assert_eq!(reloaded, nm);
}

#[test]
fn relaxed_models_still_synthesize() {
    init_logger();
    let parameters = RoutingParameters {
        seed: Some(6),
        ..Default::default()
    };
    let mut pipeline = Pipeline::new(RoutingAlgorithm::CycleCover, parameters);
    pipeline.load_mesh(&grid(2)).unwrap();
    pipeline.set_relax_parameters(RelaxParameters {
        iterations: 10,
        ..Default::default()
    });
    let (before, after) = pipeline.relax_cylinders().unwrap();
    assert!(before.is_finite() && after.is_finite());
    let nm = pipeline.generate_nucleotide_model().unwrap();
    check_nucleotide_model(nm);
}
