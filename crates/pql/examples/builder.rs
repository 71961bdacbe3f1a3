//! PQL builder example
//!
//! Run with: cargo run --example builder -p pql

use pql::qb::{self, LogicOp};
use pql::{BindParams, BindType, BuiltQuery, PqlError};

fn main() -> Result<(), PqlError> {
    let mut qb = qb::select();
    qb.columns(["r.id", "r.name", "COUNT(rp.id) AS parts"])
        .from(vec![("r", "Robots")])
        .left_join("RobotsParts", Some("rp.robots_id = r.id"), Some("rp"))
        .where_(
            "r.type = :type:",
            Some(BindParams::new().set_typed("type", "mechanical", BindType::Str)),
        )
        .between_where("r.year", 1990, 2010, LogicOp::And)
        .in_where("r.status", vec!["active", "repair"], LogicOp::Or)?
        .group_by(["r.id", "r.name"])
        .having("COUNT(rp.id) > 1", None)
        .order_by("r.name")
        .limit(10, Some(0))?;

    println!("PQL:\n  {}", qb.get_phql()?);

    let built = qb.get_query(&|query: BuiltQuery| query)?;
    println!("Bindings:");
    for (key, param) in built.params.iter() {
        println!("  {} = {} ({:?})", key.placeholder(), param.value, param.bind_type);
    }

    Ok(())
}
