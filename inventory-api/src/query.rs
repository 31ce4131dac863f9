//! SQL composition for component search and distinct-value lookups.
//!
//! Column names come only from [`ComponentAttribute::column`]; every value
//! the caller supplies is bound as a parameter.

use inventory_core::{AttributeValue, ComponentAttribute, ComponentQuery, Timestamp, UserId};
use tokio_postgres::types::ToSql;

/// Columns selected for a component row, in the order `row_to_component` reads them.
pub const COMPONENT_COLUMNS: &str = "c.id, c.status, c.brand, c.model, c.model_year, c.type_id, \
     c.screen_size, c.resolution, c.processor_type, c.processor_cores, c.ram, \
     c.warranty_end_date, c.serial_number, c.\"condition\", c.notes, c.email_notified";

/// Latest ledger entry per component. Ties on `created_at` go to the highest id.
const LATEST_ENTRY_SUBQUERY: &str = "SELECT DISTINCT ON (component_id) component_id, user_id \
     FROM inventory_history ORDER BY component_id, created_at DESC, id DESC";

/// A bound query parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Text(String),
    Int(i32),
    Timestamp(Timestamp),
    Bool(bool),
    TextArray(Vec<String>),
}

impl SqlParam {
    pub fn as_sql(&self) -> &(dyn ToSql + Sync) {
        match self {
            SqlParam::Text(v) => v,
            SqlParam::Int(v) => v,
            SqlParam::Timestamp(v) => v,
            SqlParam::Bool(v) => v,
            SqlParam::TextArray(v) => v,
        }
    }
}

impl From<&AttributeValue> for SqlParam {
    fn from(value: &AttributeValue) -> Self {
        match value {
            AttributeValue::Text(v) => SqlParam::Text(v.clone()),
            AttributeValue::Int(v) => SqlParam::Int(*v),
            AttributeValue::Timestamp(v) => SqlParam::Timestamp(*v),
            AttributeValue::Bool(v) => SqlParam::Bool(*v),
        }
    }
}

/// SQL text plus its positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlQuery {
    pub sql: String,
    pub params: Vec<SqlParam>,
}

impl SqlQuery {
    fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    /// Bind a parameter and return its placeholder (`$n`).
    fn bind(&mut self, param: SqlParam) -> String {
        self.params.push(param);
        format!("${}", self.params.len())
    }

    /// Parameter references in the shape `tokio_postgres` expects.
    pub fn param_refs(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.params.iter().map(SqlParam::as_sql).collect()
    }
}

/// Escape `LIKE` metacharacters so the term matches literally.
pub fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for ch in term.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Build the component search.
///
/// Equality filters are ANDed. A search term matches brand, model or serial
/// number case-insensitively, or a component currently `Being Used` whose
/// latest ledger entry belongs to one of `matching_user_ids`.
pub fn component_search(query: &ComponentQuery, matching_user_ids: &[UserId]) -> SqlQuery {
    let search = query.filter.search.as_deref().filter(|s| !s.trim().is_empty());

    let mut q = SqlQuery::new(format!("SELECT {} FROM components c", COMPONENT_COLUMNS));
    if search.is_some() {
        q.sql.push_str(&format!(
            " LEFT JOIN ({}) last_ih ON last_ih.component_id = c.id",
            LATEST_ENTRY_SUBQUERY
        ));
    }

    let mut conditions = Vec::new();
    for (attribute, value) in &query.filter.equals {
        let placeholder = q.bind(SqlParam::from(value));
        conditions.push(format!("c.{} = {}", quoted(attribute.column()), placeholder));
    }

    if let Some(term) = search {
        let pattern = q.bind(SqlParam::Text(format!("%{}%", escape_like(term.trim()))));
        let users = q.bind(SqlParam::TextArray(matching_user_ids.to_vec()));
        conditions.push(format!(
            "(c.brand ILIKE {p} OR c.model ILIKE {p} OR c.serial_number ILIKE {p} \
             OR (c.status = 'Being Used' AND last_ih.user_id = ANY({u})))",
            p = pattern,
            u = users
        ));
    }

    if !conditions.is_empty() {
        q.sql.push_str(" WHERE ");
        q.sql.push_str(&conditions.join(" AND "));
    }

    match &query.sort {
        Some(sort) => q.sql.push_str(&format!(
            " ORDER BY c.{} {}, c.id ASC",
            quoted(sort.field.column()),
            sort.order.as_sql()
        )),
        None => q.sql.push_str(" ORDER BY c.id ASC"),
    }
    q
}

/// Distinct non-null values of one column, ascending.
pub fn attribute_values(attribute: ComponentAttribute) -> SqlQuery {
    let column = quoted(attribute.column());
    SqlQuery::new(format!(
        "SELECT DISTINCT {col} FROM components WHERE {col} IS NOT NULL ORDER BY {col} ASC",
        col = column
    ))
}

/// `condition` is a reserved word.
fn quoted(column: &str) -> String {
    if column == "condition" {
        "\"condition\"".to_string()
    } else {
        column.to_string()
    }
}
