//! Impact scoring: a deterministic 0-100 estimate per job.
//!
//! Inputs are the job's distinct tables, distinct columns, join-clause count,
//! and statement token count. Nothing here reads file-system metadata; sizes
//! and timestamps are not reproducible across environments and are excluded
//! by contract.

use crate::types::JobLineage;

const TABLE_WEIGHT: usize = 6;
const COLUMN_WEIGHT: usize = 2;
const JOIN_WEIGHT: usize = 8;
const TOKENS_PER_POINT: usize = 8;

/// Computes the impact score for one job. Pure: same lineage, same score.
pub fn impact(lineage: &JobLineage) -> u8 {
    let tables = lineage.tables.len();
    let columns: usize = lineage.columns.values().map(Vec::len).sum();
    let joins = lineage.inner_join.len() + lineage.left_join.len() + lineage.right_join.len();

    let raw = tables
        .saturating_mul(TABLE_WEIGHT)
        .saturating_add(columns.saturating_mul(COLUMN_WEIGHT))
        .saturating_add(joins.saturating_mul(JOIN_WEIGHT))
        .saturating_add(lineage.token_count / TOKENS_PER_POINT);

    raw.min(100) as u8
}
