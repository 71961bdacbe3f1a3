//! Handoff boundary between the builder and the query executor.

use crate::qb::param::{BindKey, BindParams, BindType};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

/// The result of rendering a builder: PQL text plus its parameter table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuiltQuery {
    pub phql: String,
    pub params: BindParams,
}

impl BuiltQuery {
    /// Create a new built query.
    pub fn new(phql: String, params: BindParams) -> Self {
        Self { phql, params }
    }

    /// Bound values keyed by bind key.
    pub fn bind_values(&self) -> IndexMap<BindKey, Value> {
        self.params.values()
    }

    /// Declared bind types keyed by bind key.
    pub fn bind_types(&self) -> IndexMap<BindKey, BindType> {
        self.params.types()
    }
}

/// Turns rendered PQL into an executable query.
///
/// Implemented by whatever compiles PQL into a concrete SQL dialect and runs it;
/// the builder never looks inside the returned handle.
pub trait QueryFactory {
    /// The executable query handle.
    type Query;

    /// Create an executable query from rendered PQL and its bindings.
    fn create_query(&self, query: BuiltQuery) -> Self::Query;
}

impl<F, Q> QueryFactory for F
where
    F: Fn(BuiltQuery) -> Q,
{
    type Query = Q;

    fn create_query(&self, query: BuiltQuery) -> Q {
        self(query)
    }
}
