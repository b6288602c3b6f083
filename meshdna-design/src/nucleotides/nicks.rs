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
//! Nicks keep the staples within their length bounds.

use super::{NucleotideModel, Strand};

/// Staples up to this length are only cut when they hold exactly two crossovers.
const SHORT_STAPLE_LENGTH: usize = 50;

/// Positions `i` of a strand such that the strand leaves the helix of its partner after
/// `strand.nucleotides[i]`. Linkers are not crossovers, nor is the end of a linear strand.
pub fn find_crossovers(nm: &NucleotideModel, strand: &Strand) -> Vec<usize> {
    let nucs = &strand.nucleotides;
    let l = nucs.len();
    let last = if strand.is_cyclic { l } else { l.saturating_sub(1) };
    let mut crossovers = Vec::new();
    for i in 0..last {
        let pair = match nm.nucleotide(nucs[i]).pair {
            Some(p) => p,
            None => continue,
        };
        let pair_prev = match nm.nucleotide(pair).prev {
            Some(p) => p,
            None => continue,
        };
        let expected = nm.nucleotide(nucs[(i + 1) % l]).pair;
        if expected != Some(pair_prev) && !nm.nucleotide(pair_prev).is_linker {
            crossovers.push(i);
        }
    }
    crossovers
}

/// Cut the staples at every other crossover. Returns the number of nicks.
pub fn add_strand_gaps(nm: &mut NucleotideModel) -> usize {
    let mut cuts = Vec::new();
    for s in nm.staple_strands() {
        let crossovers = find_crossovers(nm, s);
        if s.len() > SHORT_STAPLE_LENGTH {
            let start = if crossovers.len() == 2 {
                0
            } else if crossovers.len() % 2 == 0 {
                1
            } else {
                2
            };
            cuts.extend(
                crossovers
                    .iter()
                    .skip(start)
                    .step_by(2)
                    .map(|i| s.nucleotides[*i]),
            );
        } else if crossovers.len() == 2 {
            cuts.push(s.nucleotides[crossovers[0]]);
        }
    }
    let nb_nicks = cuts.into_iter().filter(|n| nm.nick_after(*n)).count();
    nm.concatenate_strands();
    log::debug!("{} nicks at crossovers", nb_nicks);
    nb_nicks
}

/// Open the circular staples and split the staples longer than `max_length` at the crossover
/// closest to their middle, as long as both parts are at least `min_length` long.
/// Returns the number of nicks.
pub fn split_long_strands(nm: &mut NucleotideModel, min_length: usize, max_length: usize) -> usize {
    let mut nb_nicks = 0;
    loop {
        let mut cuts = Vec::new();
        for s in nm.staple_strands() {
            let crossovers = find_crossovers(nm, s);
            if s.is_cyclic {
                let idx = crossovers.first().cloned().unwrap_or(s.len() - 1);
                cuts.push(s.nucleotides[idx]);
                continue;
            }
            if s.len() <= max_length {
                continue;
            }
            let middle = s.len() as isize / 2;
            let best = crossovers
                .iter()
                .filter(|i| **i + 1 >= min_length && s.len() - **i - 1 >= min_length)
                .min_by_key(|i| (**i as isize + 1 - middle).abs());
            if let Some(i) = best {
                cuts.push(s.nucleotides[*i]);
            }
        }
        let performed = cuts.into_iter().filter(|n| nm.nick_after(*n)).count();
        if performed == 0 {
            break;
        }
        nb_nicks += performed;
        nm.concatenate_strands();
    }
    for s in nm.staple_strands() {
        if s.len() > max_length || s.len() < min_length {
            log::warn!(
                "Staple {} has length {}, outside of [{}, {}]",
                s.id.0,
                s.len(),
                min_length,
                max_length
            );
        }
    }
    nb_nicks
}
