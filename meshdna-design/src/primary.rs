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
//! Primary structure: base sequences of the scaffold and of the staples.
//!
//! Bases are IUPAC codes. A base that is not one of the four concrete nucleotides stands for
//! a constraint that [`set_random_primary`] resolves.

use crate::nucleotides::{NuclId, NucleotideModel};
use crate::parameters::NaType;
use crate::RoutingParameters;
use rand::seq::SliceRandom;
use rand::Rng;

const IUPAC_DNA: &[(char, &[char])] = &[
    ('A', &['A']),
    ('T', &['T']),
    ('G', &['G']),
    ('C', &['C']),
    ('W', &['A', 'T']),
    ('S', &['C', 'G']),
    ('M', &['A', 'C']),
    ('K', &['G', 'T']),
    ('R', &['A', 'G']),
    ('Y', &['C', 'T']),
    ('B', &['C', 'G', 'T']),
    ('D', &['A', 'G', 'T']),
    ('H', &['A', 'C', 'T']),
    ('V', &['A', 'C', 'G']),
    ('N', &['A', 'C', 'G', 'T']),
];

const IUPAC_RNA: &[(char, &[char])] = &[
    ('A', &['A']),
    ('U', &['U']),
    ('G', &['G']),
    ('C', &['C']),
    ('W', &['A', 'U']),
    ('S', &['C', 'G']),
    ('M', &['A', 'C']),
    ('K', &['G', 'U']),
    ('R', &['A', 'G']),
    ('Y', &['C', 'U']),
    ('B', &['C', 'G', 'U']),
    ('D', &['A', 'G', 'U']),
    ('H', &['A', 'C', 'U']),
    ('V', &['A', 'C', 'G']),
    ('N', &['A', 'C', 'G', 'U']),
];

/// Degenerate classes that may not repeat six times in a generated scaffold.
const FORBIDDEN_CLASSES: &[char] = &['M', 'K', 'W', 'S', 'R', 'Y'];
const MAX_HOMOPOLYMER: usize = 3;
const MAX_CLASS_RUN: usize = 5;

#[derive(Debug)]
pub enum PrimaryError {
    UnknownScaffold(String),
    ScaffoldTooShort { needed: usize, available: usize },
    InvalidBase(char),
    IncompatiblePair(NuclId, NuclId),
}

impl std::fmt::Display for PrimaryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownScaffold(name) => write!(f, "Unknown scaffold {}", name),
            Self::ScaffoldTooShort { needed, available } => write!(
                f,
                "The scaffold sequence has {} bases but {} are needed",
                available, needed
            ),
            Self::InvalidBase(c) => write!(f, "{} is not an IUPAC code", c),
            Self::IncompatiblePair(a, b) => {
                write!(f, "Nucleotides {} and {} carry bases that cannot pair", a.0, b.0)
            }
        }
    }
}

impl std::error::Error for PrimaryError {}

/// The concrete bases an IUPAC code stands for.
pub fn iupac_options(code: char, na_type: NaType) -> Option<&'static [char]> {
    let table = match na_type {
        NaType::Dna => IUPAC_DNA,
        NaType::Rna => IUPAC_RNA,
    };
    let code = code.to_ascii_uppercase();
    table.iter().find(|(c, _)| *c == code).map(|(_, o)| *o)
}

pub fn is_concrete(base: char, na_type: NaType) -> bool {
    iupac_options(base, na_type)
        .map(|o| o.len() == 1)
        .unwrap_or(false)
}

/// Watson-Crick complement of an IUPAC code.
pub fn complement(code: char, na_type: NaType) -> Option<char> {
    let c = match code.to_ascii_uppercase() {
        'A' => match na_type {
            NaType::Dna => 'T',
            NaType::Rna => 'U',
        },
        'T' if na_type == NaType::Dna => 'A',
        'U' if na_type == NaType::Rna => 'A',
        'G' => 'C',
        'C' => 'G',
        'W' => 'W',
        'S' => 'S',
        'M' => 'K',
        'K' => 'M',
        'R' => 'Y',
        'Y' => 'R',
        'B' => 'V',
        'V' => 'B',
        'D' => 'H',
        'H' => 'D',
        'N' => 'N',
        _ => return None,
    };
    Some(c)
}

fn is_gc(base: char) -> bool {
    base == 'G' || base == 'C'
}

/// Pick one of `options`, a G or C with probability `gc_content` when both kinds are present.
fn pick_base<R: Rng>(options: &[char], gc_content: f32, rng: &mut R) -> Option<char> {
    let (gc, at): (Vec<char>, Vec<char>) = options.iter().partition(|b| is_gc(**b));
    let group = if gc.is_empty() {
        at
    } else if at.is_empty() {
        gc
    } else if rng.gen_bool(gc_content.max(0.).min(1.) as f64) {
        gc
    } else {
        at
    };
    group.choose(rng).cloned()
}

/// True if appending `base` to `sequence` creates a homopolymer of four or six bases of a
/// degenerate class.
fn creates_forbidden_run(sequence: &[char], base: char, na_type: NaType) -> bool {
    let homopolymer = sequence.len() >= MAX_HOMOPOLYMER
        && sequence[sequence.len() - MAX_HOMOPOLYMER..]
            .iter()
            .all(|b| *b == base);
    if homopolymer {
        return true;
    }
    if sequence.len() < MAX_CLASS_RUN {
        return false;
    }
    let tail = &sequence[sequence.len() - MAX_CLASS_RUN..];
    FORBIDDEN_CLASSES.iter().any(|class| {
        iupac_options(*class, na_type)
            .map(|o| o.contains(&base) && tail.iter().all(|b| o.contains(b)))
            .unwrap_or(false)
    })
}

/// A random sequence with the target GC content, without the forbidden runs.
pub fn random_sequence<R: Rng>(
    length: usize,
    gc_content: f32,
    na_type: NaType,
    rng: &mut R,
) -> String {
    let all = iupac_options('N', na_type).unwrap_or(&[]);
    let mut sequence: Vec<char> = Vec::with_capacity(length);
    for _ in 0..length {
        let mut options = all.to_vec();
        let mut chosen = None;
        while let Some(base) = pick_base(&options, gc_content, rng) {
            if !creates_forbidden_run(&sequence, base, na_type) {
                chosen = Some(base);
                break;
            }
            options.retain(|b| *b != base);
        }
        sequence.push(chosen.unwrap_or('N'));
    }
    sequence.into_iter().collect()
}

fn validate_sequence(sequence: &str, na_type: NaType) -> Result<Vec<char>, PrimaryError> {
    sequence
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| {
            if iupac_options(c, na_type).is_some() {
                Ok(c.to_ascii_uppercase())
            } else {
                Err(PrimaryError::InvalidBase(c))
            }
        })
        .collect()
}

/// The scaffold nucleotides in the order the scaffold sequence is laid on them.
fn scaffold_order(nm: &NucleotideModel, start: Option<usize>) -> Vec<NuclId> {
    let mut order = Vec::new();
    for s in nm.scaffold_strands() {
        let mut nucleotides = s.nucleotides.clone();
        if let Some(pos) = start.and_then(|id| nucleotides.iter().position(|n| n.0 == id)) {
            nucleotides.rotate_left(pos);
            order.splice(0..0, nucleotides);
        } else {
            order.extend(nucleotides);
        }
    }
    order
}

/// Assign the scaffold sequence selected by the routing parameters, the complementary
/// staple bases and the linker constraints.
pub fn set_primary_from_scaffold<R: Rng>(
    nm: &mut NucleotideModel,
    parameters: &RoutingParameters,
    rng: &mut R,
) -> Result<(), PrimaryError> {
    let na_type = nm.na_type;
    let order = scaffold_order(nm, parameters.scaffold_start);
    let mut sequence = match parameters.scaffold_name.as_str() {
        "none" => None,
        "random" => Some(
            random_sequence(order.len(), parameters.gc_content, na_type, rng)
                .chars()
                .collect::<Vec<char>>(),
        ),
        "custom" => {
            let sequence = validate_sequence(&parameters.custom_scaffold, na_type)?;
            if sequence.len() < order.len() {
                return Err(PrimaryError::ScaffoldTooShort {
                    needed: order.len(),
                    available: sequence.len(),
                });
            }
            Some(sequence)
        }
        name => return Err(PrimaryError::UnknownScaffold(name.to_string())),
    };
    let linker_options = validate_sequence(&parameters.linker_options, na_type)?;

    if let Some(sequence) = sequence.as_mut() {
        if !sequence.is_empty() {
            let offset = parameters.scaffold_offset % sequence.len();
            sequence.rotate_left(offset);
        }
        for (id, base) in order.iter().zip(sequence.iter()) {
            nm.nucleotide_mut(*id).base = *base;
        }
    }

    let resolve_linkers = sequence.is_some();
    for i in 0..nm.len() {
        let id = NuclId(i);
        let (is_scaffold, pair, is_linker, base) = {
            let n = nm.nucleotide(id);
            (n.is_scaffold, n.pair, n.is_linker, n.base)
        };
        if is_scaffold {
            continue;
        }
        if let Some(pair) = pair {
            if sequence.is_some() {
                let scaffold_base = nm.nucleotide(pair).base;
                nm.nucleotide_mut(id).base = complement(scaffold_base, na_type).unwrap_or('N');
            }
        } else if is_linker && base == 'N' {
            let code = linker_options.choose(rng).cloned().unwrap_or('N');
            let base = if resolve_linkers {
                iupac_options(code, na_type)
                    .and_then(|o| pick_base(o, parameters.gc_content, rng))
                    .unwrap_or(code)
            } else {
                code
            };
            nm.nucleotide_mut(id).base = base;
        }
    }
    log::info!(
        "Primary structure: scaffold {}, {} scaffold bases",
        parameters.scaffold_name,
        order.len()
    );
    Ok(())
}

/// Replace every degenerate base by a concrete one compatible with its code and with its
/// partner.
pub fn set_random_primary<R: Rng>(
    nm: &mut NucleotideModel,
    gc_content: f32,
    na_type: NaType,
    rng: &mut R,
) -> Result<(), PrimaryError> {
    for i in 0..nm.len() {
        let id = NuclId(i);
        let (base, pair) = {
            let n = nm.nucleotide(id);
            (n.base, n.pair)
        };
        let options = iupac_options(base, na_type).ok_or(PrimaryError::InvalidBase(base))?;
        let pair_options = match pair {
            Some(p) => {
                let pair_base = nm.nucleotide(p).base;
                Some(iupac_options(pair_base, na_type).ok_or(PrimaryError::InvalidBase(pair_base))?)
            }
            None => None,
        };
        if options.len() == 1 && pair_options.map(|o| o.len() == 1).unwrap_or(true) {
            if let (Some(p), Some(o)) = (pair, pair_options) {
                if complement(options[0], na_type) != Some(o[0]) {
                    return Err(PrimaryError::IncompatiblePair(id, p));
                }
            }
            continue;
        }
        let compatible: Vec<char> = options
            .iter()
            .cloned()
            .filter(|b| {
                pair_options
                    .map(|o| complement(*b, na_type).map(|c| o.contains(&c)).unwrap_or(false))
                    .unwrap_or(true)
            })
            .collect();
        let chosen = if compatible.is_empty() {
            log::warn!("Base {} of nucleotide {} cannot pair with its partner", base, i);
            pick_base(options, gc_content, rng)
        } else {
            pick_base(&compatible, gc_content, rng)
        };
        if let Some(chosen) = chosen {
            nm.nucleotide_mut(id).base = chosen;
            if let (Some(p), Some(c)) = (pair, complement(chosen, na_type)) {
                nm.nucleotide_mut(p).base = c;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use ultraviolet::{Rotor3, Vec3};

    #[test]
    fn complement_is_an_involution() {
        for (code, _) in IUPAC_DNA.iter() {
            let c = complement(*code, NaType::Dna).unwrap();
            assert_eq!(complement(c, NaType::Dna), Some(*code));
        }
        assert_eq!(complement('A', NaType::Rna), Some('U'));
        assert_eq!(complement('T', NaType::Rna), None);
    }

    #[test]
    fn random_sequence_avoids_forbidden_runs() {
        let mut rng = StdRng::seed_from_u64(7);
        let seq: Vec<char> = random_sequence(5000, 0.5, NaType::Dna, &mut rng)
            .chars()
            .collect();
        assert_eq!(seq.len(), 5000);
        for w in seq.windows(4) {
            assert!(!w.iter().all(|b| *b == w[0]));
        }
        for w in seq.windows(6) {
            for class in FORBIDDEN_CLASSES {
                let o = iupac_options(*class, NaType::Dna).unwrap();
                assert!(!w.iter().all(|b| o.contains(b)));
            }
        }
        let gc = seq.iter().filter(|b| is_gc(**b)).count() as f32 / seq.len() as f32;
        assert!((gc - 0.5).abs() < 0.1);
    }

    #[test]
    fn custom_scaffold_is_validated() {
        assert!(matches!(
            validate_sequence("ACGX", NaType::Dna),
            Err(PrimaryError::InvalidBase('X'))
        ));
        assert_eq!(validate_sequence("ac gt", NaType::Dna).unwrap(), vec!['A', 'C', 'G', 'T']);
    }

    fn paired_model() -> NucleotideModel {
        let mut nm = NucleotideModel::new(1., NaType::Dna);
        let scaffold: Vec<_> = (0..8)
            .map(|_| nm.add_nucleotide(Vec3::zero(), Rotor3::identity()))
            .collect();
        let staple: Vec<_> = (0..8)
            .map(|_| nm.add_nucleotide(Vec3::zero(), Rotor3::identity()))
            .collect();
        for i in 0..8 {
            nm.nucleotide_mut(scaffold[i]).is_scaffold = true;
            nm.pair(scaffold[i], staple[7 - i]);
        }
        for w in scaffold.windows(2) {
            nm.link(w[0], w[1]);
        }
        for w in staple.windows(2) {
            nm.link(w[0], w[1]);
        }
        nm.concatenate_strands();
        nm
    }

    #[test]
    fn custom_scaffold_with_offset_and_complement() {
        let mut nm = paired_model();
        let parameters = RoutingParameters {
            scaffold_name: "custom".to_string(),
            custom_scaffold: "GGGGAAAATT".to_string(),
            scaffold_offset: 2,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(0);
        set_primary_from_scaffold(&mut nm, &parameters, &mut rng).unwrap();
        assert_eq!(nm.sequence(nm.strands()[0].id), "GGAAAATT");
        assert_eq!(nm.sequence(nm.strands()[1].id), "AATTTTCC");
    }

    #[test]
    fn short_custom_scaffold_is_an_error() {
        let mut nm = paired_model();
        let parameters = RoutingParameters {
            scaffold_name: "custom".to_string(),
            custom_scaffold: "ACGT".to_string(),
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(0);
        assert!(matches!(
            set_primary_from_scaffold(&mut nm, &parameters, &mut rng),
            Err(PrimaryError::ScaffoldTooShort { needed: 8, available: 4 })
        ));
        let parameters = RoutingParameters {
            scaffold_name: "p8064".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            set_primary_from_scaffold(&mut nm, &parameters, &mut rng),
            Err(PrimaryError::UnknownScaffold(_))
        ));
    }

    #[test]
    fn random_primary_respects_codes_and_pairs() {
        let mut nm = paired_model();
        nm.nucleotide_mut(NuclId(0)).base = 'S';
        nm.nucleotide_mut(NuclId(15)).base = 'W';
        let mut rng = StdRng::seed_from_u64(3);
        set_random_primary(&mut nm, 0.5, NaType::Dna, &mut rng).unwrap();
        for n in nm.nucleotides() {
            assert!(is_concrete(n.base, NaType::Dna));
            if let Some(p) = n.pair {
                assert_eq!(complement(n.base, NaType::Dna), Some(nm.nucleotide(p).base));
            }
        }
        // S pairs with W only through a warning, the scaffold code wins.
        assert!(is_gc(nm.nucleotide(NuclId(0)).base));
    }

    #[test]
    fn mismatched_concrete_pair_is_an_error() {
        let mut nm = paired_model();
        let mut rng = StdRng::seed_from_u64(1);
        set_random_primary(&mut nm, 0.5, NaType::Dna, &mut rng).unwrap();
        let base = nm.nucleotide(NuclId(2)).base;
        let partner = nm.nucleotide(NuclId(2)).pair.unwrap();
        nm.nucleotide_mut(partner).base = base;
        assert!(matches!(
            set_random_primary(&mut nm, 0.5, NaType::Dna, &mut rng),
            Err(PrimaryError::IncompatiblePair(NuclId(2), p)) if p == partner
        ));
    }
}
