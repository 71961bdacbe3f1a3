//! SELECT query builder rendering to PQL.

use crate::config::{AliasPolicy, BuilderConfig};
use crate::error::{PqlError, PqlResult};
use crate::qb::clause::{self, ClauseList};
use crate::qb::expr::{self, Conditions, Fragment, LogicOp, Predicate};
use crate::qb::param::{BindKey, BindParams, BindType, KeyGenerator};
use crate::qb::source::{self, EntityRef, Join, JoinType, Sources};
use crate::qb::traits::{BuiltQuery, QueryFactory};
use indexmap::{IndexMap, IndexSet};
use serde_json::Value;

/// SELECT query builder with predicate-tree WHERE/HAVING.
///
/// Setters take `&mut self` and return `&mut Self` so calls chain; setters that can
/// reject their input return `PqlResult<&mut Self>` and leave the builder untouched
/// on error.
#[derive(Clone, Debug)]
pub struct SelectQb {
    config: BuilderConfig,
    /// FROM sources
    sources: Option<Sources>,
    /// JOIN clauses, in insertion order
    joins: Vec<Join>,
    /// SELECT columns
    columns: Option<ClauseList>,
    /// DISTINCT (Some(true)) / ALL (Some(false))
    distinct: Option<bool>,
    /// WHERE tree
    where_conditions: Conditions,
    /// HAVING tree
    having_conditions: Conditions,
    /// Bind parameters shared by WHERE and HAVING
    params: BindParams,
    /// Keys bound through HAVING; they survive a WHERE reset
    having_keys: IndexSet<BindKey>,
    /// Generated bind keys
    keys: KeyGenerator,
    /// GROUP BY
    group_by: Option<ClauseList>,
    /// ORDER BY
    order_by: Option<ClauseList>,
    /// LIMIT
    limit: Option<u64>,
    /// OFFSET
    offset: Option<u64>,
    /// FOR UPDATE
    for_update: bool,
}

impl Default for SelectQb {
    fn default() -> Self {
        Self::new()
    }
}

impl SelectQb {
    /// Create an empty builder with the default configuration.
    pub fn new() -> Self {
        Self::with_config(BuilderConfig::default())
    }

    /// Create an empty builder.
    pub fn with_config(config: BuilderConfig) -> Self {
        let keys = KeyGenerator::new(config.placeholder_prefix.clone());
        Self {
            config,
            sources: None,
            joins: Vec::new(),
            columns: None,
            distinct: None,
            where_conditions: Conditions::new(),
            having_conditions: Conditions::new(),
            params: BindParams::new(),
            having_keys: IndexSet::new(),
            keys,
            group_by: None,
            order_by: None,
            limit: None,
            offset: None,
            for_update: false,
        }
    }

    /// The configuration this builder renders with.
    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }

    // ==================== FROM ====================

    /// Replace the source set.
    pub fn from(&mut self, models: impl Into<Sources>) -> &mut Self {
        let sources = models.into();
        if self.config.alias_policy == AliasPolicy::Warn {
            for dup in source::duplicate_aliases(Some(&sources), &self.joins) {
                tracing::warn!(target: "pql.phql", "{}", dup);
            }
        }
        self.sources = Some(sources);
        self
    }

    /// Append one source without clearing the set.
    pub fn add_from(&mut self, model: &str, alias: Option<&str>) -> &mut Self {
        let entity = match alias {
            Some(alias) => EntityRef::aliased(model, alias),
            None => EntityRef::new(model),
        };
        self.warn_alias_reuse(&entity);
        match self.sources.as_mut() {
            Some(sources) => sources.push(entity),
            None => self.sources = Some(Sources::Multiple(vec![entity])),
        }
        self
    }

    /// The source set, in the shape it was given.
    pub fn get_from(&self) -> Option<&Sources> {
        self.sources.as_ref()
    }

    // ==================== JOIN ====================

    /// Append a join. The type defaults to INNER.
    pub fn join(
        &mut self,
        model: &str,
        conditions: Option<&str>,
        alias: Option<&str>,
        join_type: Option<JoinType>,
    ) -> &mut Self {
        let entity = match alias {
            Some(alias) => EntityRef::aliased(model, alias),
            None => EntityRef::new(model),
        };
        self.warn_alias_reuse(&entity);
        self.joins.push(Join::new(
            entity,
            conditions.map(str::to_string),
            join_type.unwrap_or_default(),
        ));
        self
    }

    /// Append an INNER JOIN.
    pub fn inner_join(
        &mut self,
        model: &str,
        conditions: Option<&str>,
        alias: Option<&str>,
    ) -> &mut Self {
        self.join(model, conditions, alias, Some(JoinType::Inner))
    }

    /// Append a LEFT JOIN.
    pub fn left_join(
        &mut self,
        model: &str,
        conditions: Option<&str>,
        alias: Option<&str>,
    ) -> &mut Self {
        self.join(model, conditions, alias, Some(JoinType::Left))
    }

    /// Append a RIGHT JOIN.
    pub fn right_join(
        &mut self,
        model: &str,
        conditions: Option<&str>,
        alias: Option<&str>,
    ) -> &mut Self {
        self.join(model, conditions, alias, Some(JoinType::Right))
    }

    /// Append a CROSS JOIN.
    pub fn cross_join(&mut self, model: &str, alias: Option<&str>) -> &mut Self {
        self.join(model, None, alias, Some(JoinType::Cross))
    }

    /// Joins in insertion order.
    pub fn get_joins(&self) -> &[Join] {
        &self.joins
    }

    fn warn_alias_reuse(&self, entity: &EntityRef) {
        if self.config.alias_policy != AliasPolicy::Warn {
            return;
        }
        let Some(alias) = entity.alias.as_deref() else {
            return;
        };
        let source_entities = self.sources.as_ref().map(Sources::entities).unwrap_or_default();
        let owner = source_entities
            .iter()
            .chain(self.joins.iter().map(|j| &j.entity))
            .find(|e| e.alias.as_deref() == Some(alias));
        if let Some(owner) = owner {
            tracing::warn!(
                target: "pql.phql",
                alias,
                existing = %owner.name,
                entity = %entity.name,
                "alias reused; both entities will render"
            );
        }
    }

    // ==================== SELECT columns ====================

    /// Set the columns (overwrites).
    pub fn columns(&mut self, columns: impl Into<ClauseList>) -> &mut Self {
        self.columns = Some(columns.into());
        self
    }

    /// The columns as last set.
    pub fn get_columns(&self) -> Option<&ClauseList> {
        self.columns.as_ref()
    }

    /// `Some(true)` renders `SELECT DISTINCT`, `Some(false)` renders `SELECT ALL`.
    pub fn distinct(&mut self, distinct: Option<bool>) -> &mut Self {
        self.distinct = distinct;
        self
    }

    pub fn get_distinct(&self) -> Option<bool> {
        self.distinct
    }

    // ==================== WHERE ====================

    /// Reset WHERE to a single condition and replace the parameter table.
    ///
    /// Bindings made through HAVING are carried over unless `bind` rebinds the key.
    pub fn where_(&mut self, conditions: &str, bind: Option<BindParams>) -> &mut Self {
        tracing::trace!(target: "pql.phql", conditions, "WHERE reset");
        self.where_conditions.reset(conditions);
        let mut params = bind.unwrap_or_default();
        for key in &self.having_keys {
            if params.contains_key(key) {
                continue;
            }
            if let Some(param) = self.params.get(key) {
                params.insert(key.clone(), param.value.clone(), param.bind_type);
            }
        }
        self.params = params;
        self
    }

    /// Combine a condition into WHERE with AND, merging its bindings.
    pub fn and_where(&mut self, conditions: &str, bind: Option<BindParams>) -> &mut Self {
        self.where_conditions.push(LogicOp::And, conditions);
        self.merge_bind(bind);
        self
    }

    /// Combine a condition into WHERE with OR, merging its bindings.
    pub fn or_where(&mut self, conditions: &str, bind: Option<BindParams>) -> &mut Self {
        self.where_conditions.push(LogicOp::Or, conditions);
        self.merge_bind(bind);
        self
    }

    /// `expr BETWEEN min AND max`, bound to generated keys.
    pub fn between_where(
        &mut self,
        expr: &str,
        min: impl Into<Value>,
        max: impl Into<Value>,
        op: LogicOp,
    ) -> &mut Self {
        let fragment = expr::between_fragment(
            &mut self.keys,
            &self.params,
            expr,
            min.into(),
            max.into(),
            false,
        );
        self.push_where(op, fragment)
    }

    /// `expr NOT BETWEEN min AND max`, bound to generated keys.
    pub fn not_between_where(
        &mut self,
        expr: &str,
        min: impl Into<Value>,
        max: impl Into<Value>,
        op: LogicOp,
    ) -> &mut Self {
        let fragment = expr::between_fragment(
            &mut self.keys,
            &self.params,
            expr,
            min.into(),
            max.into(),
            true,
        );
        self.push_where(op, fragment)
    }

    /// `expr IN (...)` with one generated key per value. Fails on an empty list.
    pub fn in_where<I, T>(
        &mut self,
        expr: &str,
        values: I,
        op: LogicOp,
    ) -> PqlResult<&mut Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<Value>,
    {
        let values = values.into_iter().map(Into::into).collect();
        let fragment = expr::in_fragment(&mut self.keys, &self.params, expr, values, false)?;
        Ok(self.push_where(op, fragment))
    }

    /// `expr NOT IN (...)` with one generated key per value. Fails on an empty list.
    pub fn not_in_where<I, T>(
        &mut self,
        expr: &str,
        values: I,
        op: LogicOp,
    ) -> PqlResult<&mut Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<Value>,
    {
        let values = values.into_iter().map(Into::into).collect();
        let fragment = expr::in_fragment(&mut self.keys, &self.params, expr, values, true)?;
        Ok(self.push_where(op, fragment))
    }

    /// The rendered WHERE tree.
    pub fn get_where(&self) -> Option<String> {
        self.where_conditions.render()
    }

    /// The WHERE tree itself.
    pub fn where_predicate(&self) -> Option<&Predicate> {
        self.where_conditions.root()
    }

    fn push_where(&mut self, op: LogicOp, fragment: Fragment) -> &mut Self {
        self.where_conditions.push(op, fragment.text);
        self.params.merge(fragment.params);
        self
    }

    // ==================== HAVING ====================

    /// Reset HAVING to a single condition. Bindings are merged, so WHERE bindings survive.
    pub fn having(&mut self, conditions: &str, bind: Option<BindParams>) -> &mut Self {
        self.having_conditions.reset(conditions);
        self.having_keys.clear();
        self.merge_having_bind(bind);
        self
    }

    /// Combine a condition into HAVING with AND.
    pub fn and_having(&mut self, conditions: &str, bind: Option<BindParams>) -> &mut Self {
        self.having_conditions.push(LogicOp::And, conditions);
        self.merge_having_bind(bind);
        self
    }

    /// Combine a condition into HAVING with OR.
    pub fn or_having(&mut self, conditions: &str, bind: Option<BindParams>) -> &mut Self {
        self.having_conditions.push(LogicOp::Or, conditions);
        self.merge_having_bind(bind);
        self
    }

    pub fn between_having(
        &mut self,
        expr: &str,
        min: impl Into<Value>,
        max: impl Into<Value>,
        op: LogicOp,
    ) -> &mut Self {
        let fragment = expr::between_fragment(
            &mut self.keys,
            &self.params,
            expr,
            min.into(),
            max.into(),
            false,
        );
        self.push_having(op, fragment)
    }

    pub fn not_between_having(
        &mut self,
        expr: &str,
        min: impl Into<Value>,
        max: impl Into<Value>,
        op: LogicOp,
    ) -> &mut Self {
        let fragment = expr::between_fragment(
            &mut self.keys,
            &self.params,
            expr,
            min.into(),
            max.into(),
            true,
        );
        self.push_having(op, fragment)
    }

    pub fn in_having<I, T>(
        &mut self,
        expr: &str,
        values: I,
        op: LogicOp,
    ) -> PqlResult<&mut Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<Value>,
    {
        let values = values.into_iter().map(Into::into).collect();
        let fragment = expr::in_fragment(&mut self.keys, &self.params, expr, values, false)?;
        Ok(self.push_having(op, fragment))
    }

    pub fn not_in_having<I, T>(
        &mut self,
        expr: &str,
        values: I,
        op: LogicOp,
    ) -> PqlResult<&mut Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<Value>,
    {
        let values = values.into_iter().map(Into::into).collect();
        let fragment = expr::in_fragment(&mut self.keys, &self.params, expr, values, true)?;
        Ok(self.push_having(op, fragment))
    }

    /// The rendered HAVING tree.
    pub fn get_having(&self) -> Option<String> {
        self.having_conditions.render()
    }

    /// The HAVING tree itself.
    pub fn having_predicate(&self) -> Option<&Predicate> {
        self.having_conditions.root()
    }

    fn push_having(&mut self, op: LogicOp, fragment: Fragment) -> &mut Self {
        self.having_conditions.push(op, fragment.text);
        self.merge_having_bind(Some(fragment.params));
        self
    }

    fn merge_having_bind(&mut self, bind: Option<BindParams>) {
        if let Some(bind) = bind {
            self.having_keys.extend(bind.iter().map(|(key, _)| key.clone()));
            self.params.merge(bind);
        }
    }

    // ==================== Bind parameters ====================

    fn merge_bind(&mut self, bind: Option<BindParams>) {
        if let Some(bind) = bind {
            self.params.merge(bind);
        }
    }

    /// Replace or merge the parameter table.
    pub fn set_bind_params(&mut self, params: BindParams, merge: bool) -> &mut Self {
        if merge {
            self.params.merge(params);
        } else {
            self.params = params;
        }
        self
    }

    /// Declare the type of a bound key.
    pub fn set_bind_type(&mut self, key: impl Into<BindKey>, bind_type: BindType) -> &mut Self {
        self.params.declare_type(key, bind_type);
        self
    }

    /// The parameter table.
    pub fn get_bind_params(&self) -> &BindParams {
        &self.params
    }

    /// Declared bind types.
    pub fn get_bind_types(&self) -> IndexMap<BindKey, BindType> {
        self.params.types()
    }

    // ==================== Ordering & Grouping ====================

    /// Set ORDER BY (overwrites). Direction goes in the text.
    pub fn order_by(&mut self, order_by: impl Into<ClauseList>) -> &mut Self {
        self.order_by = Some(order_by.into());
        self
    }

    pub fn get_order_by(&self) -> Option<&ClauseList> {
        self.order_by.as_ref()
    }

    /// Set GROUP BY (overwrites).
    pub fn group_by(&mut self, group: impl Into<ClauseList>) -> &mut Self {
        self.group_by = Some(group.into());
        self
    }

    pub fn get_group_by(&self) -> Option<&ClauseList> {
        self.group_by.as_ref()
    }

    // ==================== Pagination ====================

    /// Set LIMIT and OFFSET (overwrites both). Negative values are rejected.
    pub fn limit(&mut self, limit: i64, offset: Option<i64>) -> PqlResult<&mut Self> {
        let limit = clause::checked_limit(limit)?;
        let offset = offset.map(clause::checked_offset).transpose()?;
        self.limit = Some(limit);
        self.offset = offset;
        Ok(self)
    }

    /// Set OFFSET alone. It renders only together with a LIMIT.
    pub fn offset(&mut self, offset: i64) -> PqlResult<&mut Self> {
        self.offset = Some(clause::checked_offset(offset)?);
        Ok(self)
    }

    pub fn get_limit(&self) -> Option<u64> {
        self.limit
    }

    pub fn get_offset(&self) -> Option<u64> {
        self.offset
    }

    // ==================== Locking ====================

    /// Append `FOR UPDATE`.
    pub fn for_update(&mut self, for_update: bool) -> &mut Self {
        self.for_update = for_update;
        self
    }

    pub fn get_for_update(&self) -> bool {
        self.for_update
    }

    // ==================== Rendering ====================

    fn validate(&self) -> PqlResult<()> {
        match &self.sources {
            Some(sources) if !sources.is_empty() => {}
            _ => return Err(PqlError::incomplete("no source set; call from() or add_from() first")),
        }
        if self.config.alias_policy == AliasPolicy::Reject {
            if let Some(dup) = source::duplicate_aliases(self.sources.as_ref(), &self.joins)
                .into_iter()
                .next()
            {
                return Err(dup);
            }
        }
        Ok(())
    }

    fn build_phql(&self) -> PqlResult<String> {
        self.validate()?;
        let escape = self.config.escape_identifiers;

        let mut sql = String::from("SELECT ");
        match self.distinct {
            Some(true) => sql.push_str("DISTINCT "),
            Some(false) => sql.push_str("ALL "),
            None => {}
        }

        match self.columns.as_ref().filter(|c| !c.is_empty()) {
            Some(columns) => sql.push_str(&columns.render()),
            None => sql.push_str(&self.config.default_columns),
        }

        // validate() guarantees a source set
        if let Some(sources) = &self.sources {
            sql.push_str(" FROM ");
            sql.push_str(&sources.render(escape));
        }

        for join in &self.joins {
            sql.push(' ');
            sql.push_str(&join.render(escape));
        }

        if let Some(where_sql) = self.where_conditions.render() {
            sql.push_str(" WHERE ");
            sql.push_str(&where_sql);
        }

        if let Some(group) = self.group_by.as_ref().filter(|g| !g.is_empty()) {
            sql.push_str(" GROUP BY ");
            sql.push_str(&group.render());
        }

        if let Some(having_sql) = self.having_conditions.render() {
            sql.push_str(" HAVING ");
            sql.push_str(&having_sql);
        }

        if let Some(order) = self.order_by.as_ref().filter(|o| !o.is_empty()) {
            sql.push_str(" ORDER BY ");
            sql.push_str(&order.render());
        }

        if let Some(limit_sql) = clause::render_limit(self.limit, self.offset) {
            sql.push(' ');
            sql.push_str(&limit_sql);
        }

        if self.for_update {
            sql.push_str(" FOR UPDATE");
        }

        tracing::debug!(
            target: "pql.phql",
            phql = %sql,
            params = self.params.len(),
            "rendered PQL"
        );
        Ok(sql)
    }

    /// Render the PQL text.
    pub fn get_phql(&self) -> PqlResult<String> {
        self.build_phql()
    }

    /// Render the PQL text together with a snapshot of the parameter table.
    pub fn build(&self) -> PqlResult<BuiltQuery> {
        let phql = self.build_phql()?;
        Ok(BuiltQuery::new(phql, self.params.clone()))
    }

    /// Render and hand the result to `factory`, returning its query handle.
    pub fn get_query<F: QueryFactory>(&self, factory: &F) -> PqlResult<F::Query> {
        let built = self.build()?;
        Ok(factory.create_query(built))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn robots() -> SelectQb {
        let mut qb = SelectQb::new();
        qb.from("Robots");
        qb
    }

    #[test]
    fn test_only_from() {
        assert_eq!(robots().get_phql().unwrap(), "SELECT * FROM Robots");
    }

    #[test]
    fn test_render_is_idempotent() {
        let mut qb = robots();
        qb.where_("type = :type:", Some(BindParams::new().set("type", "mechanical")))
            .between_where("year", 1990, 2000, LogicOp::Or)
            .order_by("name");
        assert_eq!(qb.get_phql().unwrap(), qb.get_phql().unwrap());
    }

    #[test]
    fn test_from_overwrites() {
        let mut qb = SelectQb::new();
        qb.from("Robots").from("Parts");
        assert_eq!(qb.get_from(), Some(&Sources::Single("Parts".into())));
    }

    #[test]
    fn test_add_from_appends() {
        let mut qb = SelectQb::new();
        qb.add_from("Robots", Some("r")).add_from("Parts", Some("p"));
        assert_eq!(
            qb.get_phql().unwrap(),
            "SELECT * FROM Robots AS r, Parts AS p"
        );
    }

    #[test]
    fn test_where_then_and_where() {
        let mut qb = robots();
        qb.where_("x=1", None).and_where("y=2", None);
        assert_eq!(qb.get_where().as_deref(), Some("(x=1) AND (y=2)"));

        qb.where_("z=3", None);
        assert_eq!(qb.get_where().as_deref(), Some("z=3"));
    }

    #[test]
    fn test_left_associative_chain() {
        let mut qb = robots();
        qb.where_("a", None).and_where("b", None).or_where("c", None);
        assert_eq!(qb.get_where().as_deref(), Some("((a) AND (b)) OR (c)"));
    }

    #[test]
    fn test_and_where_on_empty_tree_sets_root() {
        let mut qb = robots();
        qb.and_where("a = 1", None);
        assert_eq!(qb.get_phql().unwrap(), "SELECT * FROM Robots WHERE a = 1");
    }

    #[test]
    fn test_where_replaces_params() {
        let mut qb = robots();
        qb.where_("a = :a:", Some(BindParams::new().set("a", 1)))
            .and_where("b = :b:", Some(BindParams::new().set("b", 2)));
        assert_eq!(qb.get_bind_params().len(), 2);

        qb.where_("c = :c:", Some(BindParams::new().set("c", 3)));
        assert_eq!(qb.get_bind_params().len(), 1);
        assert_eq!(qb.get_bind_params().value("c"), Some(&json!(3)));
    }

    #[test]
    fn test_in_where_arity() {
        let mut qb = robots();
        qb.in_where("id", vec![1, 2, 3], LogicOp::And).unwrap();
        assert_eq!(qb.get_where().as_deref(), Some("id IN (:AP0:, :AP1:, :AP2:)"));
        assert_eq!(qb.get_bind_params().len(), 3);
    }

    #[test]
    fn test_in_where_empty_is_rejected() {
        let mut qb = robots();
        qb.where_("a = 1", None);
        let err = qb.in_where("id", Vec::<i64>::new(), LogicOp::And).unwrap_err();
        assert!(err.is_empty_value_set());
        assert_eq!(qb.get_where().as_deref(), Some("a = 1"));
        assert!(qb.get_bind_params().is_empty());
    }

    #[test]
    fn test_repeated_in_where_keys_do_not_collide() {
        let mut qb = robots();
        qb.in_where("id", vec![1, 2], LogicOp::And)
            .unwrap()
            .in_where("id", vec![3, 4], LogicOp::Or)
            .unwrap();
        assert_eq!(
            qb.get_where().as_deref(),
            Some("(id IN (:AP0:, :AP1:)) OR (id IN (:AP2:, :AP3:))")
        );
        assert_eq!(qb.get_bind_params().len(), 4);
    }

    #[test]
    fn test_limit_validation() {
        let mut qb = robots();
        assert!(qb.limit(-1, None).unwrap_err().is_invalid_limit());
        assert_eq!(qb.get_limit(), None);

        qb.limit(10, Some(5)).unwrap();
        assert_eq!(qb.get_phql().unwrap(), "SELECT * FROM Robots LIMIT 10 OFFSET 5");
    }

    #[test]
    fn test_no_source_is_incomplete() {
        let qb = SelectQb::new();
        assert!(qb.get_phql().unwrap_err().is_incomplete());
    }

    #[test]
    fn test_custom_default_columns() {
        let mut qb = SelectQb::with_config(BuilderConfig::new().with_default_columns("Robots.*"));
        qb.from("Robots");
        assert_eq!(qb.get_phql().unwrap(), "SELECT Robots.* FROM Robots");
    }
}
