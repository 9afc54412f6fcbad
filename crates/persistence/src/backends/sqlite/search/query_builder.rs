//! SQL query builder for search.
//!
//! Translates resolved filters into SQL over `resources` joined with the
//! resource type's index table. Column names come from the static filter
//! table; every value is bound as a parameter.

use rusqlite::ToSql;
use rusqlite::types::ToSqlOutput;

use crate::search::{FilterKind, ResolvedFilter};
use crate::types::ResourceType;

/// A fragment of SQL with bound parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlFragment {
    /// The SQL clause.
    pub sql: String,
    /// Bound parameter values.
    pub params: Vec<SqlParam>,
}

/// A bound SQL parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    /// Text value.
    String(String),
    /// Integer value.
    Integer(i64),
}

impl ToSql for SqlParam {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            SqlParam::String(s) => s.to_sql(),
            SqlParam::Integer(i) => i.to_sql(),
        }
    }
}

impl SqlFragment {
    /// Creates a new SQL fragment.
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    /// Adds a parameter and returns its placeholder.
    pub fn add_param(&mut self, param: SqlParam) -> String {
        self.params.push(param);
        format!("?{}", self.params.len())
    }

    /// Parameters as a slice for rusqlite.
    pub fn bind(&self) -> Vec<&dyn ToSql> {
        self.params.iter().map(|p| p as &dyn ToSql).collect()
    }
}

/// Columns selected for each page row, in [`QueryBuilder::page_query`] order.
pub const PAGE_COLUMNS: &str = "r.id, r.version, r.data, r.created_at, r.last_updated";

/// Builds search SQL for one resource type.
#[derive(Debug, Clone, Copy)]
pub struct QueryBuilder {
    resource_type: ResourceType,
}

impl QueryBuilder {
    /// Creates a builder for the given type.
    pub fn new(resource_type: ResourceType) -> Self {
        Self { resource_type }
    }

    /// `SELECT COUNT(*)` over the full filtered set.
    pub fn count_query(&self, filters: &[ResolvedFilter]) -> SqlFragment {
        let mut fragment = SqlFragment::new("SELECT COUNT(*)");
        self.push_from_where(&mut fragment, filters);
        fragment
    }

    /// One page of the filtered set, oldest update first with id as tie-breaker.
    pub fn page_query(&self, filters: &[ResolvedFilter], limit: usize, offset: usize) -> SqlFragment {
        let mut fragment = SqlFragment::new(format!("SELECT {PAGE_COLUMNS}"));
        self.push_from_where(&mut fragment, filters);

        let limit = fragment.add_param(SqlParam::Integer(limit as i64));
        let offset = fragment.add_param(SqlParam::Integer(offset as i64));
        fragment.sql.push_str(&format!(
            " ORDER BY r.last_updated ASC, r.id ASC LIMIT {limit} OFFSET {offset}"
        ));
        fragment
    }

    fn push_from_where(&self, fragment: &mut SqlFragment, filters: &[ResolvedFilter]) {
        let type_param = fragment.add_param(SqlParam::String(self.resource_type.to_string()));
        fragment.sql.push_str(&format!(
            " FROM resources r JOIN {table} i ON i.id = r.id \
             WHERE r.resource_type = {type_param} AND r.is_deleted = 0",
            table = self.resource_type.index_table(),
        ));

        for filter in filters {
            let clause = Self::filter_clause(fragment, filter);
            fragment.sql.push_str(" AND ");
            fragment.sql.push_str(&clause);
        }
    }

    fn filter_clause(fragment: &mut SqlFragment, filter: &ResolvedFilter) -> String {
        let column = filter.column;
        match filter.kind {
            FilterKind::Exact | FilterKind::Reference => {
                let p = fragment.add_param(SqlParam::String(filter.value.clone()));
                format!("i.{column} = {p}")
            }
            FilterKind::Substring => {
                let p = fragment.add_param(SqlParam::String(escape_like(&filter.value)));
                // Column and value are both lowercased before they reach SQLite.
                format!("i.{column} LIKE '%' || {p} || '%' ESCAPE '\\'")
            }
            FilterKind::Day => {
                let p = fragment.add_param(SqlParam::String(filter.value.clone()));
                format!("substr(i.{column}, 1, 10) = {p}")
            }
            FilterKind::ResultReference => {
                let p = fragment.add_param(SqlParam::String(filter.value.clone()));
                format!(
                    "EXISTS (SELECT 1 FROM diagnostic_report_result x \
                     WHERE x.report_id = i.id AND x.{column} = {p})"
                )
            }
        }
    }
}

fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
