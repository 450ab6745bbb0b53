//! AST walk turning one parsed statement into a [`StatementSummary`].
//!
//! Relations are canonicalized to their last dotted segment, lowercased, so
//! `PUBLIC.Accounts` and `accounts` resolve to the same identity and a job
//! file named `job1.sql` matches a reference to `job1` regardless of case.
//! CTE names and derived-table aliases are local: they never appear in the
//! summary's `tables`, columns, or join clauses.

use crate::types::{JoinClause, StatementSummary};
use sqlparser::ast::{
    self, Expr, FunctionArg, FunctionArgExpr, Join, JoinConstraint, JoinOperator, Query, Select,
    SelectItem, SetExpr, Statement, TableFactor,
};
use std::collections::{HashMap, HashSet};

/// Guard against pathological expression nesting.
const MAX_RECURSION_DEPTH: usize = 128;

/// Summarizes the tables, columns, and join clauses of one statement.
pub fn summarize_statement(statement: &Statement) -> StatementSummary {
    let mut builder = SummaryBuilder::default();
    builder.walk_statement(statement);
    builder.summary
}

/// A column reference found in an expression: optional qualifier + column.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ColumnRef {
    table: Option<String>,
    column: String,
}

#[derive(Default)]
struct SummaryBuilder {
    summary: StatementSummary,
    /// alias (lowercased) -> canonical relation name
    aliases: HashMap<String, String>,
    /// CTE names and derived-table aliases, excluded from lineage
    local_names: HashSet<String>,
}

impl SummaryBuilder {
    fn walk_statement(&mut self, statement: &Statement) {
        match statement {
            Statement::Query(query) => self.walk_query(query),
            // INSERT/CTAS/CREATE VIEW targets are the job's output, not a
            // source reference; only their SELECT sources contribute lineage.
            Statement::Insert(insert) => {
                if let Some(source) = &insert.source {
                    self.walk_query(source);
                }
            }
            Statement::CreateTable(create) => {
                if let Some(query) = &create.query {
                    self.walk_query(query);
                }
            }
            Statement::CreateView { query, .. } => self.walk_query(query),
            _ => {}
        }
    }

    fn walk_query(&mut self, query: &Query) {
        if let Some(with) = &query.with {
            for cte in &with.cte_tables {
                self.local_names
                    .insert(cte.alias.name.value.to_ascii_lowercase());
                self.walk_query(&cte.query);
            }
        }
        self.walk_set_expr(&query.body);
    }

    fn walk_set_expr(&mut self, body: &SetExpr) {
        match body {
            SetExpr::Select(select) => self.walk_select(select),
            SetExpr::Query(query) => self.walk_query(query),
            SetExpr::SetOperation { left, right, .. } => {
                self.walk_set_expr(left);
                self.walk_set_expr(right);
            }
            _ => {}
        }
    }

    fn walk_select(&mut self, select: &Select) {
        // Register every relation first so qualifiers resolve regardless of
        // where they appear in the clause order.
        let mut scope = Vec::new();
        for table_with_joins in &select.from {
            if let Some(name) = self.register_factor(&table_with_joins.relation) {
                scope.push(name);
            }
            for join in &table_with_joins.joins {
                if let Some(name) = self.register_factor(&join.relation) {
                    scope.push(name);
                }
            }
        }

        for table_with_joins in &select.from {
            let base = factor_name(&table_with_joins.relation);
            for join in &table_with_joins.joins {
                self.record_join(base.as_deref(), join);
            }
        }

        for item in &select.projection {
            match item {
                SelectItem::UnnamedExpr(expr) | SelectItem::ExprWithAlias { expr, .. } => {
                    self.record_expr_columns(expr, &scope);
                }
                SelectItem::QualifiedWildcard(kind, _) => {
                    // The kind displays as `a.*`; take the qualifier from the
                    // object name, not from the rendered string.
                    if let ast::SelectItemQualifiedWildcardKind::ObjectName(name) = kind {
                        let target = self.resolve(&last_segment(&name.to_string()));
                        if !self.local_names.contains(&target) {
                            self.summary.wildcard_tables.insert(target);
                        }
                    }
                }
                SelectItem::Wildcard(_) => {
                    for table in &scope {
                        self.summary.wildcard_tables.insert(table.clone());
                    }
                }
            }
        }

        if let Some(selection) = &select.selection {
            self.record_expr_columns(selection, &scope);
        }
        if let Some(having) = &select.having {
            self.record_expr_columns(having, &scope);
        }
    }

    /// Registers a FROM/JOIN relation: alias mapping, table-set membership,
    /// and recursion into derived subqueries. Returns the canonical name of
    /// non-local plain tables.
    fn register_factor(&mut self, factor: &TableFactor) -> Option<String> {
        match factor {
            TableFactor::Table { name, alias, .. } => {
                let canonical = last_segment(&name.to_string());
                if let Some(alias) = alias {
                    self.aliases
                        .insert(alias.name.value.to_ascii_lowercase(), canonical.clone());
                }
                if self.local_names.contains(&canonical) {
                    return None;
                }
                self.summary.tables.insert(canonical.clone());
                Some(canonical)
            }
            TableFactor::Derived {
                subquery, alias, ..
            } => {
                if let Some(alias) = alias {
                    self.local_names
                        .insert(alias.name.value.to_ascii_lowercase());
                }
                self.walk_query(subquery);
                None
            }
            TableFactor::NestedJoin {
                table_with_joins, ..
            } => {
                let base = self.register_factor(&table_with_joins.relation);
                for join in &table_with_joins.joins {
                    self.register_factor(&join.relation);
                    self.record_join(base.as_deref(), join);
                }
                base
            }
            _ => None,
        }
    }

    /// Records one join clause: its kind, the pair of relations joined, and
    /// the shared key columns.
    fn record_join(&mut self, base: Option<&str>, join: &Join) {
        let Some(constraint) = join_constraint(&join.join_operator) else {
            return;
        };
        let right = factor_name(&join.relation);

        let (tables_used, attr_list) = match constraint {
            JoinConstraint::On(expr) => {
                // Columns referenced in the ON condition count toward lineage.
                self.record_expr_columns(expr, &[]);

                let pairs = collect_equi_pairs(expr, 0);
                let mut attrs = Vec::new();
                for (left, right) in &pairs {
                    push_unique(&mut attrs, &left.column);
                    if right.column != left.column {
                        push_unique(&mut attrs, &right.column);
                    }
                }
                let tables = pairs
                    .first()
                    .and_then(|(l, r)| {
                        let lt = self.resolve(l.table.as_deref()?);
                        let rt = self.resolve(r.table.as_deref()?);
                        Some([lt, rt])
                    })
                    .or_else(|| Some([base?.to_string(), right.clone()?]));
                (tables, attrs)
            }
            JoinConstraint::Using(columns) => {
                let attrs: Vec<String> = columns
                    .iter()
                    .map(|c| last_segment(&c.to_string()))
                    .collect();
                let tables = base
                    .zip(right.as_deref())
                    .map(|(b, r)| [b.to_string(), r.to_string()]);
                (tables, attrs)
            }
            JoinConstraint::Natural | JoinConstraint::None => (
                base.zip(right.as_deref())
                    .map(|(b, r)| [b.to_string(), r.to_string()]),
                Vec::new(),
            ),
        };

        let Some(tables_used) = tables_used else {
            return;
        };
        // Join clauses naming a CTE or derived alias cannot be validated
        // against the job's tables; drop them rather than emit dangling refs.
        if tables_used
            .iter()
            .any(|t| self.local_names.contains(t.as_str()))
        {
            return;
        }

        let clause = JoinClause {
            tables_used,
            attr_list,
        };
        match &join.join_operator {
            JoinOperator::Join(_) | JoinOperator::Inner(_) => {
                self.summary.inner_join.push(clause)
            }
            JoinOperator::Left(_) | JoinOperator::LeftOuter(_) => {
                self.summary.left_join.push(clause)
            }
            JoinOperator::Right(_) | JoinOperator::RightOuter(_) => {
                self.summary.right_join.push(clause)
            }
            _ => {}
        }
    }

    /// Collects column references from an expression and attributes them to
    /// relations. Unqualified columns are attributed only when the scope has
    /// exactly one relation; otherwise they are unresolvable without a
    /// catalog and are dropped.
    fn record_expr_columns(&mut self, expr: &Expr, scope: &[String]) {
        let mut refs = Vec::new();
        let mut subqueries = Vec::new();
        collect_column_refs(expr, &mut refs, &mut subqueries, 0);

        for subquery in subqueries {
            self.walk_query(subquery);
        }

        for column_ref in refs {
            match column_ref.table {
                Some(qualifier) => {
                    let table = self.resolve(&qualifier);
                    if !self.local_names.contains(&table) {
                        self.summary.tables.insert(table.clone());
                        self.summary.add_column(&table, &column_ref.column);
                    }
                }
                None => {
                    if let [only] = scope {
                        self.summary.add_column(only, &column_ref.column);
                    }
                }
            }
        }
    }

    /// Resolves an alias or bare qualifier to its canonical relation name.
    fn resolve(&self, qualifier: &str) -> String {
        let lower = qualifier.to_ascii_lowercase();
        self.aliases.get(&lower).cloned().unwrap_or(lower)
    }
}

/// Canonical name of a plain table factor, aliases resolved by the caller.
fn factor_name(factor: &TableFactor) -> Option<String> {
    match factor {
        TableFactor::Table { name, .. } => Some(last_segment(&name.to_string())),
        _ => None,
    }
}

/// Lowercased last dotted segment, quotes trimmed.
fn last_segment(name: &str) -> String {
    name.rsplit('.')
        .next()
        .unwrap_or(name)
        .trim_matches(['"', '`'])
        .to_ascii_lowercase()
}

fn push_unique(attrs: &mut Vec<String>, column: &str) {
    if !attrs.iter().any(|a| a == column) {
        attrs.push(column.to_string());
    }
}

fn join_constraint(operator: &JoinOperator) -> Option<&JoinConstraint> {
    match operator {
        JoinOperator::Join(constraint)
        | JoinOperator::Inner(constraint)
        | JoinOperator::Left(constraint)
        | JoinOperator::LeftOuter(constraint)
        | JoinOperator::Right(constraint)
        | JoinOperator::RightOuter(constraint)
        | JoinOperator::FullOuter(constraint)
        | JoinOperator::CrossJoin(constraint) => Some(constraint),
        _ => None,
    }
}

fn expr_column_ref(expr: &Expr) -> Option<ColumnRef> {
    match expr {
        Expr::Identifier(ident) => Some(ColumnRef {
            table: None,
            column: ident.value.to_ascii_lowercase(),
        }),
        Expr::CompoundIdentifier(parts) if parts.len() >= 2 => {
            let column = parts.last()?.value.to_ascii_lowercase();
            let table = parts[parts.len() - 2].value.to_ascii_lowercase();
            Some(ColumnRef {
                table: Some(table),
                column,
            })
        }
        _ => None,
    }
}

/// Recursively collects column references and subqueries from an expression.
fn collect_column_refs<'a>(
    expr: &'a Expr,
    refs: &mut Vec<ColumnRef>,
    subqueries: &mut Vec<&'a Query>,
    depth: usize,
) {
    if depth > MAX_RECURSION_DEPTH {
        return;
    }
    let next = depth + 1;

    if let Some(column_ref) = expr_column_ref(expr) {
        refs.push(column_ref);
        return;
    }

    match expr {
        Expr::BinaryOp { left, right, .. } => {
            collect_column_refs(left, refs, subqueries, next);
            collect_column_refs(right, refs, subqueries, next);
        }
        Expr::UnaryOp { expr, .. } | Expr::Nested(expr) | Expr::Cast { expr, .. } => {
            collect_column_refs(expr, refs, subqueries, next);
        }
        Expr::IsNull(e) | Expr::IsNotNull(e) => {
            collect_column_refs(e, refs, subqueries, next);
        }
        Expr::IsFalse(e) | Expr::IsNotFalse(e) | Expr::IsTrue(e) | Expr::IsNotTrue(e) => {
            collect_column_refs(e, refs, subqueries, next);
        }
        Expr::Between {
            expr, low, high, ..
        } => {
            collect_column_refs(expr, refs, subqueries, next);
            collect_column_refs(low, refs, subqueries, next);
            collect_column_refs(high, refs, subqueries, next);
        }
        Expr::InList { expr, list, .. } => {
            collect_column_refs(expr, refs, subqueries, next);
            for item in list {
                collect_column_refs(item, refs, subqueries, next);
            }
        }
        Expr::Like { expr, pattern, .. } | Expr::ILike { expr, pattern, .. } => {
            collect_column_refs(expr, refs, subqueries, next);
            collect_column_refs(pattern, refs, subqueries, next);
        }
        Expr::Case {
            operand,
            conditions,
            else_result,
            ..
        } => {
            if let Some(operand) = operand {
                collect_column_refs(operand, refs, subqueries, next);
            }
            for when in conditions {
                collect_column_refs(&when.condition, refs, subqueries, next);
                collect_column_refs(&when.result, refs, subqueries, next);
            }
            if let Some(else_result) = else_result {
                collect_column_refs(else_result, refs, subqueries, next);
            }
        }
        Expr::Function(func) => {
            if let ast::FunctionArguments::List(args) = &func.args {
                for arg in &args.args {
                    if let FunctionArg::Unnamed(FunctionArgExpr::Expr(e))
                    | FunctionArg::Named {
                        arg: FunctionArgExpr::Expr(e),
                        ..
                    } = arg
                    {
                        collect_column_refs(e, refs, subqueries, next);
                    }
                }
            }
        }
        Expr::Tuple(exprs) => {
            for e in exprs {
                collect_column_refs(e, refs, subqueries, next);
            }
        }
        Expr::Subquery(query) | Expr::Exists { subquery: query, .. } => {
            subqueries.push(query);
        }
        Expr::InSubquery { expr, subquery, .. } => {
            collect_column_refs(expr, refs, subqueries, next);
            subqueries.push(subquery);
        }
        _ => {}
    }
}

/// Collects `a.x = b.y` equality pairs from a join ON condition, descending
/// through ANDed conjuncts.
fn collect_equi_pairs(expr: &Expr, depth: usize) -> Vec<(ColumnRef, ColumnRef)> {
    let mut pairs = Vec::new();
    if depth > MAX_RECURSION_DEPTH {
        return pairs;
    }
    match expr {
        Expr::BinaryOp { left, op, right } => match op {
            ast::BinaryOperator::Eq => {
                if let (Some(l), Some(r)) = (expr_column_ref(left), expr_column_ref(right)) {
                    pairs.push((l, r));
                }
            }
            ast::BinaryOperator::And => {
                pairs.extend(collect_equi_pairs(left, depth + 1));
                pairs.extend(collect_equi_pairs(right, depth + 1));
            }
            _ => {}
        },
        Expr::Nested(inner) => pairs.extend(collect_equi_pairs(inner, depth + 1)),
        _ => {}
    }
    pairs
}
