//! Query construction for the persistence engine.
//!
//! The engine never speaks a backend's query language; it builds a small [`Expr`] tree and
//! hands it to the backend, which either evaluates it in process or translates it through
//! a [`QueryVisitor`].
//!
//! ```ignore
//! use docstore::query::{Query, Filter};
//!
//! let query = Query::builder()
//!     .filter(Filter::and([
//!         Filter::eq("listType", "editorial"),
//!         Filter::contains("title", "top"),
//!     ]))
//!     .limit(2)
//!     .build();
//! ```
//!
//! Field names may be dotted paths (`concept.uuid`) into nested documents.

use bson::Bson;

use crate::error::DocumentStoreError;

/// Field comparison operators for filter expressions.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldOp {
    /// Equal to (exact match).
    Eq,
    /// String field contains the value, ignoring case.
    Contains,
    /// Field equals any of the values in an array.
    AnyOf,
}

/// A filter expression for querying documents.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Logical AND of multiple expressions (all must match). An empty AND matches everything.
    And(Vec<Expr>),
    /// At least one element of the array `field` satisfies `expr`, with field names in
    /// `expr` relative to the element.
    ElemMatch {
        /// The array field to search.
        field: String,
        /// The expression each candidate element is tested against.
        expr: Box<Expr>,
    },
    /// Field comparison expression.
    Field {
        /// The field name to compare.
        field: String,
        /// The comparison operator.
        op: FieldOp,
        /// The value to compare against.
        value: Bson,
    },
}

impl Expr {
    /// Creates a field comparison expression.
    pub fn field(field: String, op: FieldOp, value: Bson) -> Self {
        Expr::Field { field, op, value }
    }
}

/// A structured query for retrieving documents.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    /// Optional filter expression; `None` matches every document.
    pub filter: Option<Expr>,
    /// Maximum number of documents to return.
    pub limit: Option<usize>,
}

impl Query {
    /// Creates a new query builder for fluent construction.
    pub fn builder() -> QueryBuilder {
        QueryBuilder::new()
    }
}

/// Helper struct for constructing filter expressions.
pub struct Filter;

impl Filter {
    /// Matches documents where the field equals the specified value.
    pub fn eq(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Eq, value.into())
    }

    /// Matches documents where the string field contains the value, ignoring case.
    pub fn contains(field: impl Into<String>, value: impl Into<String>) -> Expr {
        Expr::field(field.into(), FieldOp::Contains, Bson::String(value.into()))
    }

    /// Matches documents where the field equals any of the values.
    pub fn any_of<V: Into<Bson>>(field: impl Into<String>, values: impl IntoIterator<Item = V>) -> Expr {
        Expr::field(
            field.into(),
            FieldOp::AnyOf,
            Bson::Array(values.into_iter().map(Into::into).collect()),
        )
    }

    /// Matches documents where some element of the array field satisfies `expr`.
    pub fn elem_match(field: impl Into<String>, expr: Expr) -> Expr {
        Expr::ElemMatch { field: field.into(), expr: Box::new(expr) }
    }

    /// Combines multiple expressions such that all must match for a document to be included.
    pub fn and(exprs: impl IntoIterator<Item = Expr>) -> Expr {
        Expr::And(exprs.into_iter().collect())
    }
}

#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    query: Query,
}

impl QueryBuilder {
    /// Creates a new query builder.
    pub fn new() -> Self {
        QueryBuilder { query: Query::default() }
    }

    /// Sets the filter expression for this query.
    pub fn filter(mut self, filter: Expr) -> Self {
        self.query.filter = Some(filter);
        self
    }

    /// Sets the filter expression only when one is given.
    pub fn maybe_filter(mut self, filter: Option<Expr>) -> Self {
        self.query.filter = filter;
        self
    }

    /// Sets the maximum number of documents to return.
    pub fn limit(mut self, limit: usize) -> Self {
        self.query.limit = Some(limit);
        self
    }

    /// Builds and returns the final query.
    pub fn build(self) -> Query {
        self.query
    }
}

pub trait QueryVisitor {
    type Output;
    type Error: Into<DocumentStoreError>;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error>;
    fn visit_elem_match(&mut self, field: &str, expr: &Expr) -> Result<Self::Output, Self::Error>;
    fn visit_field(
        &mut self,
        field: &str,
        op: &FieldOp,
        value: &Bson,
    ) -> Result<Self::Output, Self::Error>;

    fn visit_expr(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        match expr {
            Expr::And(exprs) => self.visit_and(exprs),
            Expr::ElemMatch { field, expr } => self.visit_elem_match(field, expr),
            Expr::Field { field, op, value } => self.visit_field(field, op, value),
        }
    }
}
