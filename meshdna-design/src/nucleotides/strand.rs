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
use super::{NuclId, NucleotideModel};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StrandId(pub usize);

/// A maximal backbone chain, listed from its 5' end to its 3' end.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Strand {
    pub id: StrandId,
    pub nucleotides: Vec<NuclId>,
    pub is_scaffold: bool,
    /// The 3' end is linked back to the 5' end.
    pub is_cyclic: bool,
}

impl Strand {
    pub fn len(&self) -> usize {
        self.nucleotides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nucleotides.is_empty()
    }

    pub fn five_prime(&self) -> Option<NuclId> {
        self.nucleotides.first().cloned()
    }

    pub fn three_prime(&self) -> Option<NuclId> {
        self.nucleotides.last().cloned()
    }
}

impl NucleotideModel {
    /// Recompute the strands by following the backbone links. Linear strands come first, in
    /// the order of their 5' ends, then cyclic strands starting at their smallest id.
    pub fn concatenate_strands(&mut self) {
        let mut visited = vec![false; self.nucleotides.len()];
        let mut strands: Vec<Strand> = Vec::new();

        for i in 0..self.nucleotides.len() {
            if self.nucleotides[i].prev.is_none() && !visited[i] {
                let (nucleotides, is_scaffold, is_cyclic) = self.walk(NuclId(i), &mut visited);
                strands.push(Strand {
                    id: StrandId(strands.len()),
                    nucleotides,
                    is_scaffold,
                    is_cyclic,
                });
            }
        }
        for i in 0..self.nucleotides.len() {
            if !visited[i] {
                let (nucleotides, is_scaffold, is_cyclic) = self.walk(NuclId(i), &mut visited);
                strands.push(Strand {
                    id: StrandId(strands.len()),
                    nucleotides,
                    is_scaffold,
                    is_cyclic,
                });
            }
        }

        for s in strands.iter() {
            for n in s.nucleotides.iter() {
                self.nucleotides[n.0].strand = Some(s.id);
            }
        }
        log::debug!("{} strands", strands.len());
        self.strands = strands;
    }

    fn walk(&self, start: NuclId, visited: &mut [bool]) -> (Vec<NuclId>, bool, bool) {
        let mut nucleotides = Vec::new();
        let mut cur = Some(start);
        let mut is_cyclic = false;
        while let Some(id) = cur {
            if visited[id.0] {
                is_cyclic = id == start;
                break;
            }
            visited[id.0] = true;
            nucleotides.push(id);
            cur = self.nucleotides[id.0].next;
        }
        let is_scaffold = self.nucleotides[start.0].is_scaffold;
        (nucleotides, is_scaffold, is_cyclic)
    }

    /// Renumber the nucleotides so that each strand occupies consecutive ids, in strand order.
    pub fn finalize_ids(&mut self) {
        self.concatenate_strands();
        let order: Vec<NuclId> = self
            .strands
            .iter()
            .flat_map(|s| s.nucleotides.iter().cloned())
            .collect();
        let mut new_ids = vec![NuclId(0); self.nucleotides.len()];
        for (new, old) in order.iter().enumerate() {
            new_ids[old.0] = NuclId(new);
        }
        let remap = |id: Option<NuclId>| id.map(|i| new_ids[i.0]);

        let mut nucleotides = Vec::with_capacity(order.len());
        for old in order.iter() {
            let mut n = self.nucleotides[old.0].clone();
            n.id = new_ids[old.0];
            n.prev = remap(n.prev);
            n.next = remap(n.next);
            n.pair = remap(n.pair);
            nucleotides.push(n);
        }
        for s in self.strands.iter_mut() {
            for n in s.nucleotides.iter_mut() {
                *n = new_ids[n.0];
            }
        }
        self.nucleotides = nucleotides;
    }

    /// The bases of a strand from 5' to 3'.
    pub fn sequence(&self, strand: StrandId) -> String {
        self.strands[strand.0]
            .nucleotides
            .iter()
            .map(|n| self.nucleotides[n.0].base)
            .collect()
    }

    /// Bases paired with another nucleotide, over the whole model.
    pub fn nb_paired(&self) -> usize {
        self.nucleotides.iter().filter(|n| n.pair.is_some()).count()
    }
}
