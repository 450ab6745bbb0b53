//! Dependency resolution: virtual table references, topological order, ranks.
//!
//! A job `B` depends on job `A` when `B` references a table whose name equals
//! `A`'s job name — a virtual table reference. Those names are removed from
//! `B.tables` and recorded explicitly in `B.dependencies`; they may still
//! appear as column-map keys and inside join clauses, which is what the
//! join-clause invariant permits.

use crate::error::CycleError;
use crate::types::JobLineage;
use std::collections::{BTreeMap, BTreeSet};

/// A job with its inferred dependencies and topological rank.
#[derive(Debug, Clone)]
pub struct ResolvedJob {
    pub lineage: JobLineage,
    /// Topological depth: 1 + the maximum rank of the dependencies, 1 when
    /// there are none.
    pub rank: u32,
    pub dependencies: BTreeSet<String>,
}

/// Resolves cross-job dependencies and assigns ranks.
///
/// Fails atomically with [`CycleError`] when the graph is not acyclic; no
/// partial result is produced. Tie-breaking is alphabetical on job name, so
/// the outcome is deterministic for a given input set.
pub fn resolve(lineages: Vec<JobLineage>) -> Result<Vec<ResolvedJob>, CycleError> {
    let mut jobs: BTreeMap<String, JobLineage> = BTreeMap::new();
    for lineage in lineages {
        // First file wins on a duplicate stem.
        jobs.entry(lineage.job_name.clone()).or_insert(lineage);
    }
    let names: BTreeSet<String> = jobs.keys().cloned().collect();

    // Classify virtual table references. A job naming itself is a self-loop
    // and falls out of Kahn's algorithm as a cycle.
    let mut dependencies: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    let mut dependents: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, lineage) in jobs.iter_mut() {
        let deps: BTreeSet<String> = lineage
            .tables
            .iter()
            .filter(|t| names.contains(*t))
            .cloned()
            .collect();
        for dep in &deps {
            lineage.tables.remove(dep);
            dependents.entry(dep.clone()).or_default().push(name.clone());
        }
        dependencies.insert(name.clone(), deps);
    }

    // Kahn's algorithm over a BTreeSet ready queue: alphabetical among ties.
    let mut indegree: BTreeMap<String, usize> = dependencies
        .iter()
        .map(|(name, deps)| (name.clone(), deps.len()))
        .collect();
    let mut ready: BTreeSet<String> = indegree
        .iter()
        .filter(|(_, d)| **d == 0)
        .map(|(name, _)| name.clone())
        .collect();

    let mut ranks: BTreeMap<String, u32> = BTreeMap::new();
    while let Some(name) = ready.pop_first() {
        let rank = dependencies[&name]
            .iter()
            .map(|dep| ranks[dep])
            .max()
            .map_or(1, |max| max + 1);
        ranks.insert(name.clone(), rank);

        if let Some(downstream) = dependents.get(&name) {
            for dependent in downstream {
                if let Some(degree) = indegree.get_mut(dependent) {
                    *degree -= 1;
                    if *degree == 0 {
                        ready.insert(dependent.clone());
                    }
                }
            }
        }
    }

    if ranks.len() != jobs.len() {
        return Err(CycleError {
            members: cycle_members(&dependencies, &ranks),
        });
    }

    Ok(jobs
        .into_values()
        .map(|lineage| {
            let name = lineage.job_name.clone();
            ResolvedJob {
                rank: ranks[&name],
                dependencies: dependencies.remove(&name).unwrap_or_default(),
                lineage,
            }
        })
        .collect())
}

/// Narrows the residual (unranked) node set down to the jobs actually on a
/// cycle by repeatedly trimming residual nodes nothing residual depends on.
fn cycle_members(
    dependencies: &BTreeMap<String, BTreeSet<String>>,
    ranks: &BTreeMap<String, u32>,
) -> Vec<String> {
    let mut residual: BTreeSet<&str> = dependencies
        .keys()
        .filter(|name| !ranks.contains_key(*name))
        .map(String::as_str)
        .collect();

    loop {
        let trimmed: Vec<&str> = residual
            .iter()
            .copied()
            .filter(|name| {
                !residual.iter().any(|other| {
                    dependencies[*other].contains(*name) && *other != *name
                        || (*other == *name && dependencies[*name].contains(*name))
                })
            })
            .collect();
        if trimmed.is_empty() {
            break;
        }
        for name in trimmed {
            residual.remove(name);
        }
    }

    residual.into_iter().map(str::to_string).collect()
}
