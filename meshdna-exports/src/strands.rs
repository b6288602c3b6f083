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
//! A list of the staples to order, one per line: name, length and sequence.

use super::concrete_bases;
use itertools::Itertools;
use meshdna_design::nucleotides::{NucleotideModel, Strand};
use std::io::Write;
use std::path::Path;

const HEADER: &str = "Name,Length,Sequence";

fn staple_name(strand: &Strand) -> String {
    format!("staple_{}", strand.id.0)
}

/// The lines of the staple list, longest staples first.
pub fn staple_list(nm: &NucleotideModel) -> Vec<String> {
    let bases = concrete_bases(nm);
    nm.staple_strands()
        .sorted_by_key(|s| std::cmp::Reverse(s.len()))
        .map(|s| {
            let sequence: String = s.nucleotides.iter().map(|n| bases[n.0]).collect();
            [staple_name(s), s.len().to_string(), sequence].iter().join(",")
        })
        .collect()
}

pub fn write_staple_list<P: AsRef<Path>>(nm: &NucleotideModel, path: P) -> Result<(), std::io::Error> {
    let mut file = std::fs::File::create(path)?;
    writeln!(&mut file, "{}", HEADER)?;
    for line in staple_list(nm) {
        writeln!(&mut file, "{}", line)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{output_dir, tetrahedron_model};

    #[test]
    fn one_line_per_staple() {
        let nm = tetrahedron_model();
        let lines = staple_list(&nm);
        assert_eq!(lines.len(), nm.staple_strands().count());
        let mut previous = usize::MAX;
        for line in lines.iter() {
            let fields: Vec<&str> = line.split(',').collect();
            assert_eq!(fields.len(), 3);
            let length: usize = fields[1].parse().unwrap();
            assert_eq!(fields[2].len(), length);
            assert!(length <= previous);
            previous = length;
        }
    }

    #[test]
    fn staple_list_is_written() {
        let nm = tetrahedron_model();
        let path = output_dir("strands").join("staples.csv");
        crate::export(Some(&nm), crate::ExportType::Strands, &path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with(HEADER));
        assert_eq!(content.lines().count(), nm.staple_strands().count() + 1);
    }
}
