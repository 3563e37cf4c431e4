//! A toolkit for building, mutating, serializing and structurally comparing
//! SPARQL graph patterns.
//!
//! Queries are plain in-memory trees: a [`Query`] owns a [`PatternTree`]
//! arena for its WHERE clause, plus solution modifiers (GROUP BY, HAVING,
//! ORDER BY, LIMIT/OFFSET, DISTINCT) and aggregations. Patterns are built
//! from detached [`Pattern`] values and attached with [`Query::add`];
//! attachment is move-only, so a node can never end up in two trees.
//!
//! Evaluation is not part of this crate: [`remote`] (feature `remote`) only
//! ships a serialized query to a SPARQL endpoint and decodes the JSON
//! results.

pub mod expr;
pub mod pattern;
pub mod query;
#[cfg(feature = "remote")]
pub mod remote;
pub mod shape;
pub(crate) mod util;

pub use pattern::{
    Bgp, Component, Filter, Pattern, PatternKey, PatternKind, PatternTree, TriplePattern,
    is_variable, variable_name,
};
pub use query::{
    AggregateFunction, AggregationExpression, GroupBy, Having, OrderBy, OrderKey, Projection,
    Query, QueryError, QueryResult,
};
pub use shape::{PatternShape, classify_shape};

pub mod prelude {
    pub use crate::expr::{FilterExpr, parse_filter};
    pub use crate::pattern::{Bgp, Filter, Pattern, PatternKey, PatternKind, TriplePattern};
    pub use crate::query::{
        AggregateFunction, AggregationExpression, GroupBy, Having, OrderBy, Query,
    };
    pub use crate::shape::{PatternShape, classify_shape};
}
