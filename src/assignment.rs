use anyhow::bail;
use tracing::debug;

use crate::common::{Agent, Cell, PriorityStrategy};

/// Pairs every origin with a destination so that the summed Manhattan
/// distance is minimal. Agent ids follow the order of `origins`.
pub fn assign(
    origins: &[Cell],
    destinations: &[Cell],
    strategy: PriorityStrategy,
) -> anyhow::Result<Vec<Agent>> {
    if origins.len() != destinations.len() {
        bail!(
            "cannot assign {} origins to {} destinations",
            origins.len(),
            destinations.len()
        );
    }

    let costs: Vec<Vec<i64>> = origins
        .iter()
        .map(|origin| {
            destinations
                .iter()
                .map(|destination| origin.manhattan(destination) as i64)
                .collect()
        })
        .collect();
    let matching = hungarian(&costs);

    let agents: Vec<Agent> = origins
        .iter()
        .zip(matching)
        .enumerate()
        .map(|(id, (&origin, column))| Agent::new(id, origin, destinations[column], strategy))
        .collect();
    debug!("assigned agents: {agents:?}");
    Ok(agents)
}

/// Kuhn-Munkres with row/column potentials on a square matrix, O(n^3).
/// Returns the column matched to each row.
fn hungarian(costs: &[Vec<i64>]) -> Vec<usize> {
    let n = costs.len();
    // 1-based; column 0 is a virtual column used to seed each augmentation.
    let mut row_potential = vec![0i64; n + 1];
    let mut column_potential = vec![0i64; n + 1];
    let mut matched_row = vec![0usize; n + 1];
    let mut way = vec![0usize; n + 1];

    for row in 1..=n {
        matched_row[0] = row;
        let mut column = 0;
        let mut min_slack = vec![i64::MAX; n + 1];
        let mut used = vec![false; n + 1];

        loop {
            used[column] = true;
            let current_row = matched_row[column];
            let mut delta = i64::MAX;
            let mut next_column = 0;

            for j in 1..=n {
                if used[j] {
                    continue;
                }
                let slack = costs[current_row - 1][j - 1]
                    - row_potential[current_row]
                    - column_potential[j];
                if slack < min_slack[j] {
                    min_slack[j] = slack;
                    way[j] = column;
                }
                if min_slack[j] < delta {
                    delta = min_slack[j];
                    next_column = j;
                }
            }

            for j in 0..=n {
                if used[j] {
                    row_potential[matched_row[j]] += delta;
                    column_potential[j] -= delta;
                } else {
                    min_slack[j] -= delta;
                }
            }

            column = next_column;
            if matched_row[column] == 0 {
                break;
            }
        }

        // Flip the augmenting path back to the virtual column.
        while column != 0 {
            let previous = way[column];
            matched_row[column] = matched_row[previous];
            column = previous;
        }
    }

    let mut assignment = vec![0; n];
    for (column, &row) in matched_row.iter().enumerate().skip(1) {
        if row > 0 {
            assignment[row - 1] = column - 1;
        }
    }
    assignment
}
