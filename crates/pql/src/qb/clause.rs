//! Flat clause registers: columns, GROUP BY, ORDER BY, LIMIT/OFFSET.

use crate::error::{PqlError, PqlResult};
use serde::{Deserialize, Serialize};

/// A clause given either as one string or as an ordered list of items.
///
/// `Single` renders verbatim; `Multiple` renders comma-joined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClauseList {
    Single(String),
    Multiple(Vec<String>),
}

impl ClauseList {
    /// Check if there is nothing to render.
    pub fn is_empty(&self) -> bool {
        match self {
            ClauseList::Single(s) => s.trim().is_empty(),
            ClauseList::Multiple(items) => items.iter().all(|s| s.trim().is_empty()),
        }
    }

    /// Render the register.
    pub fn render(&self) -> String {
        match self {
            ClauseList::Single(s) => s.clone(),
            ClauseList::Multiple(items) => items
                .iter()
                .filter(|s| !s.trim().is_empty())
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

impl From<&str> for ClauseList {
    fn from(s: &str) -> Self {
        ClauseList::Single(s.to_string())
    }
}

impl From<String> for ClauseList {
    fn from(s: String) -> Self {
        ClauseList::Single(s)
    }
}

impl From<Vec<String>> for ClauseList {
    fn from(items: Vec<String>) -> Self {
        ClauseList::Multiple(items)
    }
}

impl From<Vec<&str>> for ClauseList {
    fn from(items: Vec<&str>) -> Self {
        ClauseList::Multiple(items.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for ClauseList {
    fn from(items: &[&str]) -> Self {
        ClauseList::Multiple(items.iter().map(|s| s.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for ClauseList {
    fn from(items: [&str; N]) -> Self {
        ClauseList::Multiple(items.iter().map(|s| s.to_string()).collect())
    }
}

/// Validate a LIMIT value.
pub(crate) fn checked_limit(limit: i64) -> PqlResult<u64> {
    u64::try_from(limit).map_err(|_| PqlError::invalid_limit(limit))
}

/// Validate an OFFSET value.
pub(crate) fn checked_offset(offset: i64) -> PqlResult<u64> {
    u64::try_from(offset).map_err(|_| PqlError::invalid_offset(offset))
}

/// Render `LIMIT n[ OFFSET m]`. PQL has no bare OFFSET, so nothing renders without a limit.
pub(crate) fn render_limit(limit: Option<u64>, offset: Option<u64>) -> Option<String> {
    match (limit, offset) {
        (Some(limit), Some(offset)) => Some(format!("LIMIT {} OFFSET {}", limit, offset)),
        (Some(limit), None) => Some(format!("LIMIT {}", limit)),
        (None, _) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_renders_verbatim() {
        let c = ClauseList::from("id, name AS n");
        assert_eq!(c.render(), "id, name AS n");
    }

    #[test]
    fn test_multiple_joined() {
        let c = ClauseList::from(["r.id", "r.name AS robot_name"]);
        assert_eq!(c.render(), "r.id, r.name AS robot_name");
    }

    #[test]
    fn test_empty_registers() {
        assert!(ClauseList::from("").is_empty());
        assert!(ClauseList::from(Vec::<String>::new()).is_empty());
        assert!(!ClauseList::from(["id"]).is_empty());
    }

    #[test]
    fn test_limit_validation() {
        assert!(checked_limit(-1).unwrap_err().is_invalid_limit());
        assert!(checked_offset(-5).unwrap_err().is_invalid_limit());
        assert_eq!(checked_limit(0).unwrap(), 0);
    }

    #[test]
    fn test_limit_render() {
        assert_eq!(render_limit(Some(10), None).as_deref(), Some("LIMIT 10"));
        assert_eq!(render_limit(Some(10), Some(5)).as_deref(), Some("LIMIT 10 OFFSET 5"));
        assert_eq!(render_limit(None, Some(5)), None);
    }
}
