//! # pql
//!
//! A fluent builder for PQL, the SQL-like object query language: it assembles the
//! parts of a SELECT (sources, joins, WHERE/HAVING predicate trees, grouping,
//! ordering, pagination) and renders them into one PQL string plus a bind-parameter
//! table for an external executor.
//!
//! ## Features
//!
//! - **Call-order predicates**: `where_` resets, `and_where`/`or_where` wrap, and the
//!   rendered text parenthesizes every combination
//! - **Safe binding**: named (`:name:`) and positional (`?0`) keys, with generated
//!   unique keys for BETWEEN/IN helpers
//! - **Repeatable rendering**: `get_phql` never mutates the builder
//! - **Executor-agnostic**: `get_query` hands text and bindings to any [`QueryFactory`]
//!
//! ## Example
//!
//! ```ignore
//! use pql::qb::{self, LogicOp};
//!
//! let mut qb = qb::select_from("Robots");
//! qb.where_("type = 'virtual'", None)
//!     .between_where("year", 1990, 2000, LogicOp::And)
//!     .limit(10, Some(5))?;
//!
//! assert_eq!(
//!     qb.get_phql()?,
//!     "SELECT * FROM Robots WHERE (type = 'virtual') AND (year BETWEEN :AP0: AND :AP1:) LIMIT 10 OFFSET 5"
//! );
//! ```

pub mod config;
pub mod error;
pub mod qb;

pub use config::{AliasPolicy, BuilderConfig};
pub use error::{PqlError, PqlResult};

pub use qb::{
    select, select_from, select_with, BindKey, BindParams, BindType, BuiltQuery, ClauseList,
    EntityRef, Join, JoinType, LogicOp, Predicate, QueryFactory, SelectQb, Sources,
    OPERATOR_AND, OPERATOR_OR,
};
