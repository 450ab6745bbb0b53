//! End-to-end engine tests over realistic multi-file inputs.

use sqlgraph_core::{
    build_workflow, JobType, SqlFile, WorkflowError, WorkflowOptions, WorkflowRequest,
};

const JOB1_SQL: &str = "\
-- monthly chargeoff base
SELECT c.customer_id, c.customer_name,
       a.account_id, a.account_type, a.open_date,
       t.transaction_id, t.transaction_amount, t.transaction_date
FROM accounts a
INNER JOIN customers c ON a.customer_id = c.customer_id
LEFT JOIN transactions t ON a.account_id = t.account_id
LEFT JOIN branches b ON b.branch_id = t.branch_id;
";

const JOB2_SQL: &str = "\
SELECT j.transaction_id, j.transaction_amount,
       a.account_id, a.account_type,
       b.branch_name
FROM job1 j
LEFT JOIN accounts a ON j.account_id = a.account_id
LEFT JOIN branches b ON j.branch_id = b.branch_id;
";

fn request(files: Vec<SqlFile>) -> WorkflowRequest {
    WorkflowRequest {
        workflow_name: "chargeoff_monthly".to_string(),
        files,
        options: WorkflowOptions::default(),
    }
}

fn two_job_request() -> WorkflowRequest {
    request(vec![
        SqlFile::new("job1.sql", JOB1_SQL),
        SqlFile::new("job2.sql", JOB2_SQL),
    ])
}

#[test]
fn two_file_workflow_orders_and_links_jobs() {
    let response = build_workflow(&two_job_request()).unwrap();
    assert!(response.warnings.is_empty());

    let jobs = &response.spec.jobs;
    assert_eq!(jobs.len(), 2);

    let job1 = &jobs[0];
    assert_eq!(job1.job_name, "job1");
    assert_eq!(job1.rank, 1);
    assert!(job1.dependencies.is_empty());
    assert_eq!(job1.job_type, JobType::Ingest);
    for table in ["accounts", "customers", "transactions", "branches"] {
        assert!(job1.tables.contains(table), "job1 missing table {table}");
    }
    assert_eq!(job1.inner_join.len(), 1);
    assert_eq!(
        job1.inner_join[0].tables_used,
        ["accounts".to_string(), "customers".to_string()]
    );
    assert_eq!(job1.inner_join[0].attr_list, vec!["customer_id".to_string()]);
    assert_eq!(job1.left_join.len(), 2);
    assert_eq!(
        job1.left_join[0].tables_used,
        ["accounts".to_string(), "transactions".to_string()]
    );
    assert_eq!(job1.left_join[0].attr_list, vec!["account_id".to_string()]);
    assert_eq!(
        job1.left_join[1].tables_used,
        ["branches".to_string(), "transactions".to_string()]
    );
    assert_eq!(job1.left_join[1].attr_list, vec!["branch_id".to_string()]);

    let job2 = &jobs[1];
    assert_eq!(job2.job_name, "job2");
    assert_eq!(job2.rank, 2);
    assert_eq!(
        job2.dependencies.iter().collect::<Vec<_>>(),
        vec!["job1"]
    );
    assert_eq!(job2.job_type, JobType::Transform);
    // The upstream job is a virtual table, not a raw source table.
    assert!(!job2.tables.contains("job1"));
    assert!(job2.tables.contains("accounts"));
    assert!(job2.tables.contains("branches"));
    // Its columns survive under the job name.
    assert!(job2.columns["job1"].contains(&"transaction_id".to_string()));
    assert_eq!(
        job2.left_join[0].tables_used,
        ["job1".to_string(), "accounts".to_string()]
    );
    assert_eq!(
        job2.left_join[1].tables_used,
        ["job1".to_string(), "branches".to_string()]
    );
}

#[test]
fn every_join_table_is_a_table_or_dependency() {
    let response = build_workflow(&two_job_request()).unwrap();
    for job in &response.spec.jobs {
        for clause in job
            .inner_join
            .iter()
            .chain(&job.left_join)
            .chain(&job.right_join)
        {
            for table in &clause.tables_used {
                assert!(
                    job.tables.contains(table) || job.dependencies.contains(table),
                    "{}: join references {table} which is neither a table nor a dependency",
                    job.job_name
                );
            }
        }
    }
}

#[test]
fn rank_recurrence_holds_across_the_spec() {
    let response = build_workflow(&two_job_request()).unwrap();
    let jobs = &response.spec.jobs;
    for job in jobs {
        let expected = job
            .dependencies
            .iter()
            .map(|dep| {
                jobs.iter()
                    .find(|j| &j.job_name == dep)
                    .expect("dependency must exist in the spec")
                    .rank
            })
            .max()
            .map_or(1, |max| max + 1);
        assert_eq!(job.rank, expected, "rank recurrence violated for {}", job.job_name);
    }
}

#[test]
fn self_reference_fails_with_cycle_error() {
    let err = build_workflow(&request(vec![SqlFile::new(
        "own.sql",
        "SELECT o.amount FROM own o",
    )]))
    .unwrap_err();
    match err {
        WorkflowError::Cycle(cycle) => assert_eq!(cycle.members, vec!["own".to_string()]),
        other => panic!("expected CycleError, got {other:?}"),
    }
}

#[test]
fn malformed_file_becomes_warning_not_failure() {
    let response = build_workflow(&request(vec![
        SqlFile::new("good.sql", "SELECT a.account_id FROM accounts a"),
        SqlFile::new("broken.sql", "SELEC owner FORM accounts"),
    ]))
    .unwrap();
    assert_eq!(response.spec.jobs.len(), 1);
    assert_eq!(response.spec.jobs[0].job_name, "good");
    assert_eq!(response.warnings.len(), 1);
    assert_eq!(response.warnings[0].file, "broken.sql");
}

#[test]
fn same_input_yields_byte_identical_json() {
    let first = serde_json::to_string(&build_workflow(&two_job_request()).unwrap()).unwrap();
    let second = serde_json::to_string(&build_workflow(&two_job_request()).unwrap()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn impact_scores_are_bounded_and_reflect_complexity() {
    let response = build_workflow(&two_job_request()).unwrap();
    let job1 = &response.spec.jobs[0];
    let job2 = &response.spec.jobs[1];
    assert!(job1.impact <= 100 && job2.impact <= 100);
    // job1 touches more tables and joins than job2.
    assert!(job1.impact > job2.impact);
}

#[test]
fn file_order_does_not_change_the_output() {
    let reversed = request(vec![
        SqlFile::new("job2.sql", JOB2_SQL),
        SqlFile::new("job1.sql", JOB1_SQL),
    ]);
    let forward = serde_json::to_value(build_workflow(&two_job_request()).unwrap()).unwrap();
    let backward = serde_json::to_value(build_workflow(&reversed).unwrap()).unwrap();
    assert_eq!(forward, backward);
}
