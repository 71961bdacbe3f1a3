//! Query builder (QB) for PQL SELECT statements.
//!
//! # Features
//!
//! - **Predicate tree**: WHERE/HAVING are `Leaf`/`Combine` trees grown in call order,
//!   rendered with explicit parentheses so association never depends on precedence
//! - **Generated bind keys**: BETWEEN/IN helpers mint `:AP0:`, `:AP1:`, ... keys that
//!   stay unique for the lifetime of the builder
//! - **Shape-preserving registers**: columns, GROUP BY and ORDER BY keep the string or
//!   list form they were given
//! - **Executor boundary**: rendered text and bindings are handed to a [`QueryFactory`]
//!
//! # Usage
//!
//! ```ignore
//! use pql::qb::{self, LogicOp};
//! use pql::BindParams;
//!
//! let mut qb = qb::select();
//! qb.from(vec![("r", "Robots")])
//!     .left_join("RobotsParts", Some("rp.robots_id = r.id"), Some("rp"))
//!     .where_("r.type = :type:", Some(BindParams::new().set("type", "mechanical")))
//!     .in_where("r.id", vec![1, 2, 3], LogicOp::And)?
//!     .order_by("r.name")
//!     .limit(10, None)?;
//!
//! let phql = qb.get_phql()?;
//! ```

mod clause;
mod definition;
mod expr;
mod param;
mod select;
mod source;
mod traits;

pub use clause::ClauseList;
pub use definition::{BuilderDefinition, JoinDefinition, ModelsDefinition};
pub use expr::{Conditions, LogicOp, OPERATOR_AND, OPERATOR_OR, Predicate};
pub use param::{BindKey, BindParams, BindType, BoundParam};
pub use select::SelectQb;
pub use source::{EntityRef, Join, JoinType, Sources};
pub use traits::{BuiltQuery, QueryFactory};

use crate::config::BuilderConfig;

/// Create an empty SELECT builder.
pub fn select() -> SelectQb {
    SelectQb::new()
}

/// Create an empty SELECT builder with a custom configuration.
pub fn select_with(config: BuilderConfig) -> SelectQb {
    SelectQb::with_config(config)
}

/// Create a SELECT builder over the given sources.
pub fn select_from(models: impl Into<Sources>) -> SelectQb {
    let mut qb = SelectQb::new();
    qb.from(models);
    qb
}
