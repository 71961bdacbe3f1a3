//! Declarative builder construction from serialized parameters.
//!
//! ```ignore
//! let qb = SelectQb::from_json(r#"{
//!     "models": {"r": "Robots"},
//!     "columns": ["r.id", "r.name"],
//!     "conditions": "r.type = :type:",
//!     "bind": {"type": "virtual"},
//!     "limit": 10
//! }"#)?;
//! ```

use crate::config::BuilderConfig;
use crate::error::PqlResult;
use crate::qb::clause::ClauseList;
use crate::qb::param::{BindKey, BindParams, BindType};
use crate::qb::select::SelectQb;
use crate::qb::source::{EntityRef, JoinType, Sources};
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;

/// FROM sources as they may appear in a definition.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ModelsDefinition {
    /// `"Robots"`
    Single(String),
    /// `["Robots", "Parts"]`
    List(Vec<String>),
    /// `{"r": "Robots"}`, alias to entity
    Aliased(IndexMap<String, String>),
}

impl From<ModelsDefinition> for Sources {
    fn from(models: ModelsDefinition) -> Self {
        match models {
            ModelsDefinition::Single(name) => Sources::Single(name),
            ModelsDefinition::List(names) => {
                Sources::Multiple(names.into_iter().map(EntityRef::new).collect())
            }
            ModelsDefinition::Aliased(pairs) => Sources::Multiple(
                pairs
                    .into_iter()
                    .map(|(alias, name)| EntityRef::aliased(name, alias))
                    .collect(),
            ),
        }
    }
}

/// One join in a definition.
#[derive(Debug, Clone, Deserialize)]
pub struct JoinDefinition {
    pub model: String,
    #[serde(default)]
    pub conditions: Option<String>,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default, rename = "type")]
    pub join_type: Option<JoinType>,
}

/// Everything a builder can be constructed from.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BuilderDefinition {
    pub models: Option<ModelsDefinition>,
    pub columns: Option<ClauseList>,
    pub conditions: Option<String>,
    /// Keys made of digits only are positional.
    pub bind: IndexMap<String, Value>,
    pub bind_types: IndexMap<String, BindType>,
    pub joins: Vec<JoinDefinition>,
    pub group: Option<ClauseList>,
    pub having: Option<String>,
    pub order: Option<ClauseList>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub distinct: Option<bool>,
    pub for_update: bool,
}

impl BuilderDefinition {
    fn bind_params(&self) -> BindParams {
        let mut params: BindParams = self
            .bind
            .iter()
            .map(|(k, v)| (BindKey::parse(k), v.clone()))
            .collect();
        for (key, bind_type) in &self.bind_types {
            params.declare_type(BindKey::parse(key), *bind_type);
        }
        params
    }
}

impl SelectQb {
    /// Build from a definition with the default configuration.
    pub fn from_definition(definition: BuilderDefinition) -> PqlResult<Self> {
        Self::from_definition_with_config(definition, BuilderConfig::default())
    }

    /// Build from a definition.
    pub fn from_definition_with_config(
        definition: BuilderDefinition,
        config: BuilderConfig,
    ) -> PqlResult<Self> {
        let mut qb = SelectQb::with_config(config);
        let params = definition.bind_params();

        if let Some(models) = definition.models {
            qb.from(Sources::from(models));
        }
        if let Some(columns) = definition.columns {
            qb.columns(columns);
        }
        for join in &definition.joins {
            qb.join(
                &join.model,
                join.conditions.as_deref(),
                join.alias.as_deref(),
                join.join_type,
            );
        }
        match definition.conditions.as_deref() {
            Some(conditions) => qb.where_(conditions, Some(params)),
            None => qb.set_bind_params(params, false),
        };
        if let Some(group) = definition.group {
            qb.group_by(group);
        }
        if let Some(having) = definition.having.as_deref() {
            qb.having(having, None);
        }
        if let Some(order) = definition.order {
            qb.order_by(order);
        }
        match (definition.limit, definition.offset) {
            (Some(limit), offset) => {
                qb.limit(limit, offset)?;
            }
            (None, Some(offset)) => {
                qb.offset(offset)?;
            }
            (None, None) => {}
        }
        qb.distinct(definition.distinct).for_update(definition.for_update);
        Ok(qb)
    }

    /// Build from a JSON definition.
    pub fn from_json(json: &str) -> PqlResult<Self> {
        let definition: BuilderDefinition = serde_json::from_str(json)?;
        Self::from_definition(definition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_full_definition() {
        let qb = SelectQb::from_json(
            r#"{
                "models": {"r": "Robots"},
                "columns": ["r.id", "r.name"],
                "joins": [{"model": "RobotsParts", "conditions": "rp.robots_id = r.id", "alias": "rp", "type": "left"}],
                "conditions": "r.type = :type:",
                "bind": {"type": "virtual"},
                "bind_types": {"type": "str"},
                "group": "r.id",
                "having": "COUNT(rp.id) > 1",
                "order": "r.name DESC",
                "limit": 10,
                "offset": 20,
                "distinct": true
            }"#,
        )
        .unwrap();

        assert_eq!(
            qb.get_phql().unwrap(),
            "SELECT DISTINCT r.id, r.name FROM Robots AS r \
             LEFT JOIN RobotsParts AS rp ON rp.robots_id = r.id \
             WHERE r.type = :type: GROUP BY r.id HAVING COUNT(rp.id) > 1 \
             ORDER BY r.name DESC LIMIT 10 OFFSET 20"
        );
        assert_eq!(qb.get_bind_params().value("type"), Some(&json!("virtual")));
        assert_eq!(qb.get_bind_types().get(&BindKey::from("type")), Some(&BindType::Str));
    }

    #[test]
    fn test_models_shapes() {
        let qb = SelectQb::from_json(r#"{"models": "Robots"}"#).unwrap();
        assert_eq!(qb.get_from(), Some(&Sources::Single("Robots".into())));

        let qb = SelectQb::from_json(r#"{"models": ["Robots", "Parts"]}"#).unwrap();
        assert_eq!(qb.get_phql().unwrap(), "SELECT * FROM Robots, Parts");
    }

    #[test]
    fn test_positional_bind_keys() {
        let qb = SelectQb::from_json(
            r#"{"models": "Robots", "conditions": "id = ?0", "bind": {"0": 7}}"#,
        )
        .unwrap();
        let param = qb.get_bind_params().get(&BindKey::Positional(0)).unwrap();
        assert_eq!(param.value, json!(7));
    }

    #[test]
    fn test_invalid_limit_in_definition() {
        let err = SelectQb::from_json(r#"{"models": "Robots", "limit": -3}"#).unwrap_err();
        assert!(err.is_invalid_limit());
    }

    #[test]
    fn test_malformed_json() {
        let err = SelectQb::from_json("{not json").unwrap_err();
        assert!(matches!(err, crate::PqlError::Definition(_)));
    }
}
