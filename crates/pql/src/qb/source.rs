//! FROM sources and JOIN clauses.
//!
//! Entity names are opaque here: nothing is resolved against model metadata, the
//! names and aliases are only stored, checked for alias reuse, and rendered.

use crate::error::PqlError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// An entity name with an optional alias.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

impl EntityRef {
    /// An unaliased entity.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: None,
        }
    }

    /// An aliased entity.
    pub fn aliased(name: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: Some(alias.into()),
        }
    }

    /// Render `Name[ AS alias]`.
    pub fn render(&self, escape: bool) -> String {
        let name = escape_ident(&self.name, escape);
        match &self.alias {
            Some(alias) => format!("{} AS {}", name, escape_ident(alias, escape)),
            None => name,
        }
    }
}

/// Wrap an identifier in `[...]` unless it already is.
pub(crate) fn escape_ident(ident: &str, escape: bool) -> String {
    if !escape || (ident.starts_with('[') && ident.ends_with(']')) {
        ident.to_string()
    } else {
        format!("[{}]", ident)
    }
}

/// The FROM source set, in the shape it was given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Sources {
    /// One unaliased entity set from a plain string.
    Single(String),
    /// Any other source set, in insertion order.
    Multiple(Vec<EntityRef>),
}

impl Sources {
    /// Flattened view of the entities.
    pub fn entities(&self) -> Vec<EntityRef> {
        match self {
            Sources::Single(name) => vec![EntityRef::new(name.clone())],
            Sources::Multiple(entities) => entities.clone(),
        }
    }

    /// Check if the set names no entity.
    pub fn is_empty(&self) -> bool {
        match self {
            Sources::Single(name) => name.trim().is_empty(),
            Sources::Multiple(entities) => entities.is_empty(),
        }
    }

    /// Append an entity, turning a `Single` set into `Multiple`. A blank `Single` is dropped.
    pub fn push(&mut self, entity: EntityRef) {
        match self {
            Sources::Single(name) if name.trim().is_empty() => {
                *self = Sources::Multiple(vec![entity]);
            }
            Sources::Single(name) => {
                let first = EntityRef::new(std::mem::take(name));
                *self = Sources::Multiple(vec![first, entity]);
            }
            Sources::Multiple(entities) => entities.push(entity),
        }
    }

    /// Render the comma-separated source list.
    pub fn render(&self, escape: bool) -> String {
        match self {
            Sources::Single(name) => escape_ident(name, escape),
            Sources::Multiple(entities) => entities
                .iter()
                .map(|e| e.render(escape))
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

impl From<&str> for Sources {
    fn from(name: &str) -> Self {
        Sources::Single(name.to_string())
    }
}

impl From<String> for Sources {
    fn from(name: String) -> Self {
        Sources::Single(name)
    }
}

impl From<EntityRef> for Sources {
    fn from(entity: EntityRef) -> Self {
        Sources::Multiple(vec![entity])
    }
}

impl From<Vec<EntityRef>> for Sources {
    fn from(entities: Vec<EntityRef>) -> Self {
        Sources::Multiple(entities)
    }
}

impl From<Vec<&str>> for Sources {
    fn from(names: Vec<&str>) -> Self {
        Sources::Multiple(names.into_iter().map(EntityRef::new).collect())
    }
}

/// `(alias, entity)` pairs.
impl From<Vec<(&str, &str)>> for Sources {
    fn from(pairs: Vec<(&str, &str)>) -> Self {
        Sources::Multiple(
            pairs
                .into_iter()
                .map(|(alias, name)| EntityRef::aliased(name, alias))
                .collect(),
        )
    }
}

/// Join type. An unspecified type is `Inner`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinType {
    #[default]
    Inner,
    Left,
    Right,
    Cross,
}

impl JoinType {
    /// The PQL keyword preceding `JOIN`.
    pub fn keyword(self) -> &'static str {
        match self {
            JoinType::Inner => "INNER",
            JoinType::Left => "LEFT",
            JoinType::Right => "RIGHT",
            JoinType::Cross => "CROSS",
        }
    }
}

/// One JOIN clause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Join {
    pub entity: EntityRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(default, rename = "type")]
    pub join_type: JoinType,
}

impl Join {
    /// Create a join clause.
    pub fn new(entity: EntityRef, condition: Option<String>, join_type: JoinType) -> Self {
        Self {
            entity,
            condition,
            join_type,
        }
    }

    /// Render `TYPE JOIN Entity[ AS alias][ ON condition]`.
    pub fn render(&self, escape: bool) -> String {
        let mut sql = format!(
            "{} JOIN {}",
            self.join_type.keyword(),
            self.entity.render(escape)
        );
        if let Some(condition) = self.condition.as_deref().filter(|c| !c.trim().is_empty()) {
            sql.push_str(" ON ");
            sql.push_str(condition);
        }
        sql
    }
}

/// Find alias collisions across sources and joins.
///
/// The first entity to claim an alias owns it; every later claim is reported.
pub(crate) fn duplicate_aliases(sources: Option<&Sources>, joins: &[Join]) -> Vec<PqlError> {
    let source_entities = sources.map(Sources::entities).unwrap_or_default();
    let entities = source_entities
        .iter()
        .chain(joins.iter().map(|j| &j.entity));

    let mut owners: HashMap<&str, &str> = HashMap::new();
    let mut duplicates = Vec::new();
    for entity in entities {
        let Some(alias) = entity.alias.as_deref() else {
            continue;
        };
        match owners.get(alias) {
            Some(existing) => duplicates.push(PqlError::DuplicateAlias {
                alias: alias.to_string(),
                existing: existing.to_string(),
                entity: entity.name.clone(),
            }),
            None => {
                owners.insert(alias, entity.name.as_str());
            }
        }
    }
    duplicates
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_render() {
        assert_eq!(EntityRef::new("Robots").render(false), "Robots");
        assert_eq!(EntityRef::aliased("Robots", "r").render(false), "Robots AS r");
        assert_eq!(EntityRef::aliased("Robots", "r").render(true), "[Robots] AS [r]");
    }

    #[test]
    fn test_escape_is_not_doubled() {
        assert_eq!(escape_ident("[Robots]", true), "[Robots]");
    }

    #[test]
    fn test_sources_shapes() {
        assert_eq!(Sources::from("Robots"), Sources::Single("Robots".into()));

        let pairs = Sources::from(vec![("r", "Robots"), ("p", "Parts")]);
        assert_eq!(pairs.render(false), "Robots AS r, Parts AS p");
    }

    #[test]
    fn test_push_promotes_single() {
        let mut sources = Sources::from("Robots");
        sources.push(EntityRef::aliased("Parts", "p"));
        assert_eq!(
            sources,
            Sources::Multiple(vec![EntityRef::new("Robots"), EntityRef::aliased("Parts", "p")])
        );
    }

    #[test]
    fn test_push_drops_blank_single() {
        let mut sources = Sources::from("");
        sources.push(EntityRef::new("Parts"));
        assert_eq!(sources, Sources::Multiple(vec![EntityRef::new("Parts")]));
        assert_eq!(sources.render(false), "Parts");
    }

    #[test]
    fn test_join_render() {
        let join = Join::new(
            EntityRef::aliased("RobotsParts", "rp"),
            Some("rp.robots_id = r.id".into()),
            JoinType::Left,
        );
        assert_eq!(join.render(false), "LEFT JOIN RobotsParts AS rp ON rp.robots_id = r.id");

        let cross = Join::new(EntityRef::new("Parts"), None, JoinType::Cross);
        assert_eq!(cross.render(false), "CROSS JOIN Parts");
    }

    #[test]
    fn test_duplicate_aliases_first_wins() {
        let sources = Sources::from(vec![("r", "Robots")]);
        let joins = vec![
            Join::new(EntityRef::aliased("Parts", "p"), None, JoinType::Inner),
            Join::new(EntityRef::aliased("Robots", "r"), None, JoinType::Inner),
        ];

        let dups = duplicate_aliases(Some(&sources), &joins);
        assert_eq!(dups.len(), 1);
        match &dups[0] {
            PqlError::DuplicateAlias { alias, existing, entity } => {
                assert_eq!(alias, "r");
                assert_eq!(existing, "Robots");
                assert_eq!(entity, "Robots");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_no_duplicates_without_aliases() {
        let sources = Sources::from(vec!["Robots", "Robots"]);
        assert!(duplicate_aliases(Some(&sources), &[]).is_empty());
    }
}
