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
//! Minimum weight perfect matching in complete bipartite graphs.

/// Costs that are not finite are replaced by this value.
const MAX_COST: f64 = 1e12;

/// Compute a minimum weight perfect matching of the complete bipartite graph whose weights are
/// given by the square matrix `cost` (`cost[i][j]` is the weight of the edge between the `i`-th
/// left vertex and the `j`-th right vertex).
///
/// Returns, for each left vertex, the index of the right vertex it is matched with.
///
/// This is the Hungarian algorithm with potentials, it runs in O(n³).
pub fn min_weight_perfect_matching(cost: &[Vec<f64>]) -> Vec<usize> {
    let n = cost.len();
    if n == 0 {
        return Vec::new();
    }
    let weight = |i: usize, j: usize| {
        let c = cost[i].get(j).cloned().unwrap_or(MAX_COST);
        if c.is_finite() {
            c
        } else {
            MAX_COST
        }
    };

    // Vertices are 1-indexed, column 0 is a sentinel.
    let mut u = vec![0f64; n + 1];
    let mut v = vec![0f64; n + 1];
    let mut matched_row = vec![0usize; n + 1];
    let mut way = vec![0usize; n + 1];

    for row in 1..=n {
        matched_row[0] = row;
        let mut j0 = 0;
        let mut min_slack = vec![f64::INFINITY; n + 1];
        let mut used = vec![false; n + 1];
        loop {
            used[j0] = true;
            let i0 = matched_row[j0];
            let mut delta = f64::INFINITY;
            let mut j1 = 0;
            for j in 1..=n {
                if !used[j] {
                    let slack = weight(i0 - 1, j - 1) - u[i0] - v[j];
                    if slack < min_slack[j] {
                        min_slack[j] = slack;
                        way[j] = j0;
                    }
                    if min_slack[j] < delta {
                        delta = min_slack[j];
                        j1 = j;
                    }
                }
            }
            if j1 == 0 {
                break;
            }
            for j in 0..=n {
                if used[j] {
                    u[matched_row[j]] += delta;
                    v[j] -= delta;
                } else {
                    min_slack[j] -= delta;
                }
            }
            j0 = j1;
            if matched_row[j0] == 0 {
                break;
            }
        }
        // augmenting path
        while j0 != 0 {
            let j1 = way[j0];
            matched_row[j0] = matched_row[j1];
            j0 = j1;
        }
    }

    let mut ret = vec![0; n];
    for j in 1..=n {
        if matched_row[j] != 0 {
            ret[matched_row[j] - 1] = j - 1;
        }
    }
    ret
}
