//! Predicate tree for WHERE/HAVING conditions.
//!
//! A predicate is either a raw PQL fragment (`Leaf`) or two predicates joined by a
//! logical operator (`Combine`). The builder only ever grows the tree on the right:
//! every `and_*`/`or_*` call wraps the current root, so the tree is a left-leaning
//! chain in call order and rendering never has to infer precedence.

use crate::error::{PqlError, PqlResult};
use crate::qb::param::{BindParams, KeyGenerator};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Token accepted for [`LogicOp::And`].
pub const OPERATOR_AND: &str = "and";
/// Token accepted for [`LogicOp::Or`].
pub const OPERATOR_OR: &str = "or";

/// Logical operator used to combine predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LogicOp {
    #[default]
    And,
    Or,
}

impl LogicOp {
    /// The operator token (`"and"` / `"or"`).
    pub fn token(self) -> &'static str {
        match self {
            LogicOp::And => OPERATOR_AND,
            LogicOp::Or => OPERATOR_OR,
        }
    }

    /// The PQL keyword (`AND` / `OR`).
    pub fn keyword(self) -> &'static str {
        match self {
            LogicOp::And => "AND",
            LogicOp::Or => "OR",
        }
    }
}

impl FromStr for LogicOp {
    type Err = PqlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            OPERATOR_AND => Ok(LogicOp::And),
            OPERATOR_OR => Ok(LogicOp::Or),
            other => Err(PqlError::InvalidOperator(other.to_string())),
        }
    }
}

impl fmt::Display for LogicOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Predicate tree node.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Raw condition text, placeholders included.
    Leaf(String),

    /// `(left) OP (right)`
    Combine {
        left: Box<Predicate>,
        op: LogicOp,
        right: Box<Predicate>,
    },
}

impl Predicate {
    /// Create a leaf from raw condition text.
    pub fn leaf(text: impl Into<String>) -> Self {
        Predicate::Leaf(text.into())
    }

    /// Combine two predicates; `self` stays on the left.
    pub fn combine(self, op: LogicOp, right: Predicate) -> Self {
        Predicate::Combine {
            left: Box::new(self),
            op,
            right: Box::new(right),
        }
    }

    /// Number of leaves in the tree.
    pub fn leaf_count(&self) -> usize {
        match self {
            Predicate::Leaf(_) => 1,
            Predicate::Combine { left, right, .. } => left.leaf_count() + right.leaf_count(),
        }
    }

    /// Render by in-order traversal. Every `Combine` parenthesizes both sides.
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_into(&mut out);
        out
    }

    fn render_into(&self, out: &mut String) {
        match self {
            Predicate::Leaf(text) => out.push_str(text),
            Predicate::Combine { left, op, right } => {
                out.push('(');
                left.render_into(out);
                out.push_str(") ");
                out.push_str(op.keyword());
                out.push_str(" (");
                right.render_into(out);
                out.push(')');
            }
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// One predicate slot (WHERE or HAVING) and the operations that edit it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Conditions {
    root: Option<Predicate>,
}

impl Conditions {
    /// Create an empty slot.
    pub fn new() -> Self {
        Self { root: None }
    }

    /// Check if no predicate has been set.
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// The current tree root.
    pub fn root(&self) -> Option<&Predicate> {
        self.root.as_ref()
    }

    /// Replace the whole tree with a single leaf.
    pub fn reset(&mut self, text: impl Into<String>) {
        self.root = Some(Predicate::leaf(text));
    }

    /// Wrap the current root with `op` and a new leaf; an empty slot takes the leaf as root.
    pub fn push(&mut self, op: LogicOp, text: impl Into<String>) {
        let leaf = Predicate::leaf(text);
        self.root = Some(match self.root.take() {
            Some(root) => root.combine(op, leaf),
            None => leaf,
        });
    }

    /// Render the tree, `None` if empty.
    pub fn render(&self) -> Option<String> {
        self.root.as_ref().map(Predicate::render)
    }
}

/// A generated condition fragment and the values it binds.
#[derive(Debug, Clone)]
pub(crate) struct Fragment {
    pub(crate) text: String,
    pub(crate) params: BindParams,
}

/// `expr [NOT] BETWEEN :k0: AND :k1:`
pub(crate) fn between_fragment(
    keys: &mut KeyGenerator,
    taken: &BindParams,
    expr: &str,
    min: Value,
    max: Value,
    negated: bool,
) -> Fragment {
    let min_key = keys.next_free(taken);
    let max_key = keys.next_free(taken);
    let op = if negated { "NOT BETWEEN" } else { "BETWEEN" };
    let text = format!(
        "{} {} {} AND {}",
        expr,
        op,
        min_key.placeholder(),
        max_key.placeholder()
    );

    let mut params = BindParams::new();
    params.insert(min_key, min, None);
    params.insert(max_key, max, None);
    Fragment { text, params }
}

/// `expr [NOT] IN (:k0:, :k1:, ...)`
///
/// Fails before minting any key when `values` is empty.
pub(crate) fn in_fragment(
    keys: &mut KeyGenerator,
    taken: &BindParams,
    expr: &str,
    values: Vec<Value>,
    negated: bool,
) -> PqlResult<Fragment> {
    if values.is_empty() {
        return Err(PqlError::EmptyValueSet(expr.to_string()));
    }

    let mut params = BindParams::new();
    let placeholders: Vec<String> = values
        .into_iter()
        .map(|value| {
            let key = keys.next_free(taken);
            let placeholder = key.placeholder();
            params.insert(key, value, None);
            placeholder
        })
        .collect();

    let op = if negated { "NOT IN" } else { "IN" };
    let text = format!("{} {} ({})", expr, op, placeholders.join(", "));
    Ok(Fragment { text, params })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_leaf_renders_verbatim() {
        let p = Predicate::leaf("id = :id:");
        assert_eq!(p.render(), "id = :id:");
    }

    #[test]
    fn test_combine_parenthesizes_both_sides() {
        let p = Predicate::leaf("x=1").combine(LogicOp::And, Predicate::leaf("y=2"));
        assert_eq!(p.render(), "(x=1) AND (y=2)");
    }

    #[test]
    fn test_push_is_left_associative() {
        let mut c = Conditions::new();
        c.push(LogicOp::And, "a");
        c.push(LogicOp::And, "b");
        c.push(LogicOp::Or, "c");

        assert_eq!(c.render().as_deref(), Some("((a) AND (b)) OR (c)"));
        assert_eq!(c.root().map(Predicate::leaf_count), Some(3));
    }

    #[test]
    fn test_reset_discards_tree() {
        let mut c = Conditions::new();
        c.push(LogicOp::And, "a");
        c.push(LogicOp::Or, "b");
        c.reset("z=3");
        assert_eq!(c.render().as_deref(), Some("z=3"));
    }

    #[test]
    fn test_empty_conditions() {
        let c = Conditions::new();
        assert!(c.is_empty());
        assert_eq!(c.render(), None);
    }

    #[test]
    fn test_operator_tokens() {
        assert_eq!("and".parse::<LogicOp>().unwrap(), LogicOp::And);
        assert_eq!("or".parse::<LogicOp>().unwrap(), LogicOp::Or);
        assert_eq!(LogicOp::Or.token(), OPERATOR_OR);

        let err = "AND".parse::<LogicOp>().unwrap_err();
        assert!(matches!(err, PqlError::InvalidOperator(ref t) if t == "AND"));
    }

    #[test]
    fn test_between_fragment() {
        let mut keys = KeyGenerator::new("AP");
        let none = BindParams::new();
        let f = between_fragment(&mut keys, &none, "price", json!(10), json!(20), false);
        assert_eq!(f.text, "price BETWEEN :AP0: AND :AP1:");
        assert_eq!(f.params.value("AP0"), Some(&json!(10)));
        assert_eq!(f.params.value("AP1"), Some(&json!(20)));

        let f = between_fragment(&mut keys, &none, "price", json!(1), json!(2), true);
        assert_eq!(f.text, "price NOT BETWEEN :AP2: AND :AP3:");
    }

    #[test]
    fn test_in_fragment() {
        let mut keys = KeyGenerator::new("AP");
        let none = BindParams::new();
        let values = vec![json!(1), json!(2), json!(3)];
        let f = in_fragment(&mut keys, &none, "id", values, false).unwrap();
        assert_eq!(f.text, "id IN (:AP0:, :AP1:, :AP2:)");
        assert_eq!(f.params.len(), 3);

        let f = in_fragment(&mut keys, &none, "id", vec![json!(9)], true).unwrap();
        assert_eq!(f.text, "id NOT IN (:AP3:)");
    }

    #[test]
    fn test_empty_in_fragment_mints_nothing() {
        let mut keys = KeyGenerator::new("AP");
        let none = BindParams::new();
        let err = in_fragment(&mut keys, &none, "id", vec![], false).unwrap_err();
        assert!(err.is_empty_value_set());
        assert_eq!(keys.next_key().to_string(), "AP0");
    }

    #[test]
    fn test_fragment_skips_taken_keys() {
        let mut keys = KeyGenerator::new("AP");
        let taken = BindParams::new().set("AP0", "alice").set("AP2", "bob");
        let f = in_fragment(&mut keys, &taken, "id", vec![json!(1), json!(2)], false).unwrap();
        assert_eq!(f.text, "id IN (:AP1:, :AP3:)");
    }
}
