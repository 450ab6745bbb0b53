//! Lineage extraction: merging a file's statement summaries into one job.
//!
//! One file yields exactly one job. Table sets and per-table column sets are
//! unioned; join-clause lists are concatenated in source order, duplicates
//! kept, since a clause may legitimately repeat across statements.

use crate::types::{JobLineage, SchemaCatalog, StatementSummary};

/// Merges the statements of one file into a [`JobLineage`].
///
/// Wildcard projections are expanded from the catalog when one is supplied;
/// without a catalog a wildcard contributes no columns, which is not an
/// error.
pub fn merge_statements(
    job_name: impl Into<String>,
    statements: Vec<StatementSummary>,
    catalog: Option<&SchemaCatalog>,
    token_count: usize,
) -> JobLineage {
    let mut lineage = JobLineage {
        job_name: job_name.into(),
        token_count,
        ..JobLineage::default()
    };

    for statement in statements {
        lineage.tables.extend(statement.tables);

        for (table, columns) in statement.columns {
            let merged = lineage.columns.entry(table).or_default();
            for column in columns {
                if !merged.iter().any(|c| *c == column) {
                    merged.push(column);
                }
            }
        }

        if let Some(catalog) = catalog {
            for table in &statement.wildcard_tables {
                if let Some(declared) = catalog.columns(table) {
                    // A table declared with zero columns must not create an
                    // empty columns entry.
                    if declared.is_empty() {
                        continue;
                    }
                    let merged = lineage.columns.entry(table.clone()).or_default();
                    for column in declared {
                        let column = column.to_ascii_lowercase();
                        if !merged.iter().any(|c| *c == column) {
                            merged.push(column);
                        }
                    }
                }
            }
        }

        lineage.inner_join.extend(statement.inner_join);
        lineage.left_join.extend(statement.left_join);
        lineage.right_join.extend(statement.right_join);
    }

    lineage
}
