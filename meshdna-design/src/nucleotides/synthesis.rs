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
//! Expansion of a cylinder model into nucleotides.

use super::{add_strand_gaps, split_long_strands, NuclId, NucleotideError, NucleotideModel};
use crate::cylinders::{Cylinder, CylinderModel, PrimePos, RoutingStrategy, MIN_CYLINDER_LENGTH};
use crate::primary::set_primary_from_scaffold;
use crate::RoutingParameters;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Distance between a strand end and the first staple crossover.
const VERTEX_STAPLE_OFFSET: usize = 10;
/// Two helical turns.
const CROSSOVER_PERIOD: usize = 21;
/// Staple crossovers this close after the scaffold crossover of a pseudoknot are skipped.
const SCAFFOLD_CROSSOVER_CLEARANCE: usize = 15;

/// The nucleotides of a cylinder. `scaffold[i]` is paired with `staple[len - 1 - i]`.
struct Ladder {
    scaffold: Vec<NuclId>,
    staple: Vec<NuclId>,
}

pub fn cylinders_to_nucleotides(
    cm: &CylinderModel,
    parameters: &RoutingParameters,
) -> Result<NucleotideModel, NucleotideError> {
    let mut rng = match parameters.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    cylinders_to_nucleotides_with_rng(cm, parameters, &mut rng)
}

pub fn cylinders_to_nucleotides_with_rng<R: Rng>(
    cm: &CylinderModel,
    parameters: &RoutingParameters,
    rng: &mut R,
) -> Result<NucleotideModel, NucleotideError> {
    let mut nm = NucleotideModel::new(cm.scale, cm.na_type);
    let ladders: Vec<Ladder> = cm
        .cylinders()
        .iter()
        .map(|c| create_ladder(&mut nm, c, cm))
        .collect();
    connect_ladders(&mut nm, cm, &ladders, parameters)?;
    nm.concatenate_strands();

    if parameters.add_nicks {
        let nb_nicks = add_strand_gaps(&mut nm);
        let nb_splits = split_long_strands(
            &mut nm,
            parameters.min_strand_length,
            parameters.max_strand_length,
        );
        log::info!("Inserted {} nicks", nb_nicks + nb_splits);
    }
    nm.finalize_ids();
    set_primary_from_scaffold(&mut nm, parameters, rng)?;
    log::info!(
        "Nucleotide model: {} nucleotides, {} strands",
        nm.len(),
        nm.strands().len()
    );
    Ok(nm)
}

fn create_ladder(nm: &mut NucleotideModel, c: &Cylinder, cm: &CylinderModel) -> Ladder {
    let parameters = cm.parameters();
    let is_pseudo = c.routing_strategy == RoutingStrategy::Pseudoknot;
    let mut make_chain = |first_strand: bool| {
        let mut chain: Vec<NuclId> = Vec::with_capacity(c.length);
        for i in 0..c.length {
            let (position, orientation) = c.nucleotide_frame(first_strand, i, parameters);
            let id = nm.add_nucleotide(position, orientation);
            let n = nm.nucleotide_mut(id);
            n.is_scaffold = first_strand;
            n.is_pseudo = is_pseudo;
            n.cylinder = Some(c.id);
            if let Some(prev) = chain.last() {
                nm.link(*prev, id);
            }
            chain.push(id);
        }
        chain
    };
    let scaffold = make_chain(true);
    let staple = make_chain(false);
    for (i, s) in scaffold.iter().enumerate() {
        nm.pair(*s, staple[c.length - 1 - i]);
    }
    Ladder { scaffold, staple }
}

fn connect_ladders(
    nm: &mut NucleotideModel,
    cm: &CylinderModel,
    ladders: &[Ladder],
    parameters: &RoutingParameters,
) -> Result<(), NucleotideError> {
    let mut visited = vec![false; cm.len()];
    for c in cm.cylinders() {
        let missing = |prime: PrimePos| {
            NucleotideError::Topology(format!("cylinder {} has no {:?} neighbour", c.id.0, prime))
        };
        let (scaffold_next, _) = c
            .neighbour(PrimePos::First3)
            .ok_or_else(|| missing(PrimePos::First3))?;
        let (staple_next, _) = c
            .neighbour(PrimePos::Second3)
            .ok_or_else(|| missing(PrimePos::Second3))?;

        let cur = &ladders[c.id.0];
        if let (Some(from), Some(to)) = (
            cur.scaffold.last(),
            ladders[scaffold_next.0].scaffold.first(),
        ) {
            nm.link_with_linkers(*from, *to, parameters.min_linkers, parameters.max_linkers);
        }
        if let (Some(from), Some(to)) =
            (cur.staple.last(), ladders[staple_next.0].staple.first())
        {
            nm.link_with_linkers(*from, *to, parameters.min_linkers, parameters.max_linkers);
        }

        visited[c.id.0] = true;
        let other = cm.partner(c.id).ok_or_else(|| {
            NucleotideError::Topology(format!("cylinder {} is not in a bundle of two", c.id.0))
        })?;
        if visited[other.0] {
            continue;
        }
        let pair = &ladders[other.0];
        let length = c.length;
        if cm.cylinder(other).length != length {
            return Err(NucleotideError::Topology(format!(
                "cylinders {} and {} of a bundle have different lengths",
                c.id.0, other.0
            )));
        }
        if length < MIN_CYLINDER_LENGTH {
            return Err(NucleotideError::Topology(format!(
                "cylinder {} is too short for crossovers",
                c.id.0
            )));
        }

        nm.reroute(
            &cur.staple,
            &pair.staple,
            VERTEX_STAPLE_OFFSET,
            length - VERTEX_STAPLE_OFFSET,
        )?;
        nm.reroute(
            &pair.staple,
            &cur.staple,
            VERTEX_STAPLE_OFFSET,
            length - VERTEX_STAPLE_OFFSET,
        )?;

        let skipped = if c.routing_strategy == RoutingStrategy::Pseudoknot {
            let (co_1, co_2) = scaffold_crossover(length);
            nm.reroute(&cur.scaffold, &pair.scaffold, co_1, co_2)?;
            Some(co_1)
        } else {
            None
        };

        let nb_periodic = (length - CROSSOVER_PERIOD) / CROSSOVER_PERIOD;
        for i in 1..=nb_periodic {
            let idx_1 = VERTEX_STAPLE_OFFSET + CROSSOVER_PERIOD * i;
            let idx_2 = length - VERTEX_STAPLE_OFFSET - CROSSOVER_PERIOD * i;
            if let Some(co) = skipped {
                if idx_1 > co && idx_1 < co + SCAFFOLD_CROSSOVER_CLEARANCE {
                    continue;
                }
            }
            nm.reroute(&cur.staple, &pair.staple, idx_1, idx_2)?;
        }
        log::debug!(
            "bundle of cylinders {} and {}: {} periodic crossovers",
            c.id.0,
            other.0,
            nb_periodic
        );
    }
    Ok(())
}

/// Indices of the scaffold crossover of a pseudoknot bundle of length `length`, on the
/// scaffold of the first and second cylinder. The shift keeps the helical phase of both
/// scaffold segments.
fn scaffold_crossover(length: usize) -> (usize, usize) {
    let half = (length - CROSSOVER_PERIOD) / 2;
    let shift = if length % CROSSOVER_PERIOD == 0 { 5 } else { 0 };
    (half + 11 - shift, length - half + shift - 10)
}
