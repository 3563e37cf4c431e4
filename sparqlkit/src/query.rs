use crate::pattern::{
    Component, Filter, Pattern, PatternKey, PatternTree, TriplePattern,
    collect_expression_variables, is_variable, variable_name,
};
use crate::util::log;
use error_stack::report;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("unsupported component kind `{kind}` for {target}")]
    UnsupportedComponent {
        kind: &'static str,
        target: &'static str,
    },
    #[error("non-group-key variable in projection: {variable}")]
    GroupingValidation { variable: String },
    #[error("undeclared prefix `{prefix}:` in term `{term}`")]
    UndeclaredPrefix { prefix: String, term: String },
}

pub type QueryResult<T> = error_stack::Result<T, QueryError>;

/// An aggregation function usable in a SELECT clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunction {
    Count,
    Sum,
    Min,
    Max,
    Avg,
}

impl AggregateFunction {
    pub fn keyword(self) -> &'static str {
        match self {
            AggregateFunction::Count => "COUNT",
            AggregateFunction::Sum => "SUM",
            AggregateFunction::Min => "MIN",
            AggregateFunction::Max => "MAX",
            AggregateFunction::Avg => "AVG",
        }
    }

    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "COUNT" => Some(AggregateFunction::Count),
            "SUM" => Some(AggregateFunction::Sum),
            "MIN" => Some(AggregateFunction::Min),
            "MAX" => Some(AggregateFunction::Max),
            "AVG" => Some(AggregateFunction::Avg),
            _ => None,
        }
    }
}

impl fmt::Display for AggregateFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.keyword())
    }
}

/// `(FUNC(DISTINCT? operand) AS alias)`; the operand is a variable or `*`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregationExpression {
    pub function: AggregateFunction,
    pub variable: String,
    pub alias: String,
    pub distinct: bool,
}

impl AggregationExpression {
    pub fn new(
        function: AggregateFunction,
        variable: impl Into<String>,
        alias: impl Into<String>,
    ) -> Self {
        AggregationExpression {
            function,
            variable: variable.into(),
            alias: alias.into(),
            distinct: false,
        }
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }
}

impl fmt::Display for AggregationExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let distinct = if self.distinct { "DISTINCT " } else { "" };
        write!(
            f,
            "({}({}{}) AS {})",
            self.function, distinct, self.variable, self.alias
        )
    }
}

/// One ORDER BY sort key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderKey {
    pub variable: String,
    pub ascending: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub keys: Vec<OrderKey>,
}

impl OrderBy {
    /// One direction applied to every variable.
    pub fn new(variables: impl IntoIterator<Item = impl Into<String>>, ascending: bool) -> Self {
        OrderBy {
            keys: variables
                .into_iter()
                .map(|v| OrderKey {
                    variable: v.into(),
                    ascending,
                })
                .collect(),
        }
    }

    /// Per-variable directions; variables without a flag default to
    /// ascending.
    pub fn with_directions(
        variables: impl IntoIterator<Item = impl Into<String>>,
        ascending: impl IntoIterator<Item = bool>,
    ) -> Self {
        let mut flags = ascending.into_iter();
        OrderBy {
            keys: variables
                .into_iter()
                .map(|v| OrderKey {
                    variable: v.into(),
                    ascending: flags.next().unwrap_or(true),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupBy {
    pub variables: Vec<String>,
}

/// Post-aggregation restriction, top-level only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Having {
    pub expression: String,
}

impl From<&str> for Having {
    fn from(expression: &str) -> Self {
        Having {
            expression: expression.to_string(),
        }
    }
}

impl From<String> for Having {
    fn from(expression: String) -> Self {
        Having { expression }
    }
}

/// SELECT projection: wildcard or an explicit variable list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Projection {
    #[default]
    Wildcard,
    Variables(Vec<String>),
}

impl Projection {
    pub fn is_wildcard(&self) -> bool {
        matches!(self, Projection::Wildcard)
    }

    pub fn variables(&self) -> &[String] {
        match self {
            Projection::Wildcard => &[],
            Projection::Variables(vars) => vars,
        }
    }
}

/// The root entity: one WHERE pattern tree plus solution modifiers.
#[derive(Debug, Clone, Default)]
pub struct Query {
    projection: Projection,
    tree: PatternTree,
    pub filters: Vec<Filter>,
    pub having: Vec<Having>,
    pub order_by: Option<OrderBy>,
    group_by: Option<GroupBy>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    pub distinct: bool,
    aggregations: Vec<AggregationExpression>,
    pub graph: Option<String>,
    prefixes: BTreeMap<String, String>,
}

impl Query {
    pub fn new() -> Self {
        Query::default()
    }

    pub fn tree(&self) -> &PatternTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut PatternTree {
        &mut self.tree
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    pub fn group_by(&self) -> Option<&GroupBy> {
        self.group_by.as_ref()
    }

    pub fn aggregations(&self) -> &[AggregationExpression] {
        &self.aggregations
    }

    pub fn prefixes(&self) -> &BTreeMap<String, String> {
        &self.prefixes
    }

    /// Adds a component, dispatched by kind: patterns extend the WHERE
    /// clause (a second pattern turns the root into an ordered sequence),
    /// strings and [`Filter`]s become top-level filters. Bare triples are
    /// rejected; they belong inside a BGP.
    pub fn add(&mut self, component: impl Into<Component>) -> QueryResult<&mut Self> {
        match component.into() {
            Component::Pattern(pattern) => {
                self.add_pattern(pattern)?;
            }
            Component::Filter(filter) => self.filters.push(filter),
            other => {
                return Err(report!(QueryError::UnsupportedComponent {
                    kind: other.kind_name(),
                    target: "query",
                }));
            }
        }
        Ok(self)
    }

    /// Attaches a pattern to the WHERE clause, returning the key of the
    /// newly created node.
    pub fn add_pattern(&mut self, pattern: impl Into<Pattern>) -> QueryResult<PatternKey> {
        let pattern = pattern.into();
        self.validate_pattern_prefixes(&pattern)?;
        Ok(self.tree.push_root(pattern))
    }

    /// Replaces the projection. With GROUP BY present, every projected
    /// variable must be a grouping variable or an aggregation alias.
    pub fn set_projection(
        &mut self,
        variables: impl IntoIterator<Item = impl Into<String>>,
    ) -> QueryResult<&mut Self> {
        let variables: Vec<String> = variables.into_iter().map(Into::into).collect();
        if let Some(group_by) = &self.group_by {
            for variable in &variables {
                self.check_projected_variable(variable, group_by)?;
            }
        }
        self.projection = Projection::Variables(variables);
        Ok(self)
    }

    pub fn set_projection_wildcard(&mut self) -> &mut Self {
        self.projection = Projection::Wildcard;
        self
    }

    fn check_projected_variable(&self, variable: &str, group_by: &GroupBy) -> QueryResult<()> {
        let grouped = group_by.variables.iter().any(|v| v == variable);
        let aliased = self.aggregations.iter().any(|a| a.alias == variable);
        if grouped || aliased {
            Ok(())
        } else {
            Err(report!(QueryError::GroupingValidation {
                variable: variable.to_string(),
            }))
        }
    }

    /// Sets the GROUP BY variables, validating the existing projection and
    /// aggregations against them.
    pub fn add_group_by(
        &mut self,
        variables: impl IntoIterator<Item = impl Into<String>>,
    ) -> QueryResult<&mut Self> {
        let group_by = GroupBy {
            variables: variables.into_iter().map(Into::into).collect(),
        };
        for aggregation in &self.aggregations {
            if group_by.variables.iter().any(|v| *v == aggregation.variable) {
                return Err(report!(QueryError::GroupingValidation {
                    variable: aggregation.variable.clone(),
                }));
            }
        }
        if let Projection::Variables(vars) = &self.projection {
            for variable in vars {
                let aliased = self.aggregations.iter().any(|a| a.alias == *variable);
                if !aliased && !group_by.variables.iter().any(|v| v == variable) {
                    return Err(report!(QueryError::GroupingValidation {
                        variable: variable.clone(),
                    }));
                }
            }
        }
        self.group_by = Some(group_by);
        Ok(self)
    }

    /// `add_group_by` plus aggregations in one call.
    pub fn add_group_by_with(
        &mut self,
        variables: impl IntoIterator<Item = impl Into<String>>,
        aggregations: impl IntoIterator<Item = AggregationExpression>,
    ) -> QueryResult<&mut Self> {
        self.add_group_by(variables)?;
        for aggregation in aggregations {
            self.add_aggregation(aggregation)?;
        }
        Ok(self)
    }

    /// Adds an aggregation; aggregating a grouped variable is rejected.
    pub fn add_aggregation(
        &mut self,
        aggregation: AggregationExpression,
    ) -> QueryResult<&mut Self> {
        if let Some(group_by) = &self.group_by {
            if group_by.variables.iter().any(|v| *v == aggregation.variable) {
                return Err(report!(QueryError::GroupingValidation {
                    variable: aggregation.variable.clone(),
                }));
            }
        }
        self.aggregations.push(aggregation);
        Ok(self)
    }

    pub fn add_having(&mut self, having: impl Into<Having>) -> &mut Self {
        self.having.push(having.into());
        self
    }

    pub fn set_order_by(&mut self, order_by: OrderBy) -> &mut Self {
        self.order_by = Some(order_by);
        self
    }

    pub fn set_limit(&mut self, limit: u64) -> &mut Self {
        self.limit = Some(limit);
        self
    }

    pub fn set_offset(&mut self, offset: u64) -> &mut Self {
        self.offset = Some(offset);
        self
    }

    pub fn set_distinct(&mut self, distinct: bool) -> &mut Self {
        self.distinct = distinct;
        self
    }

    pub fn set_graph(&mut self, graph: impl Into<String>) -> &mut Self {
        self.graph = Some(graph.into());
        self
    }

    /// Declares the prefix mapping and validates every prefixed name already
    /// present in the WHERE clause against it.
    pub fn set_prefixes(
        &mut self,
        prefixes: impl IntoIterator<Item = (impl Into<String>, impl Into<String>)>,
    ) -> QueryResult<&mut Self> {
        self.prefixes = prefixes
            .into_iter()
            .map(|(p, iri)| (p.into(), iri.into()))
            .collect();
        for triple in self.tree.triples() {
            for term in triple.terms() {
                self.check_term_prefix(term)?;
            }
        }
        Ok(self)
    }

    pub fn clear_order_by(&mut self) -> bool {
        self.order_by.take().is_some()
    }

    pub fn clear_group_by(&mut self) -> bool {
        self.group_by.take().is_some()
    }

    pub fn remove_having(&mut self, index: usize) -> bool {
        if index < self.having.len() {
            self.having.remove(index);
            true
        } else {
            false
        }
    }

    pub fn remove_aggregation(&mut self, index: usize) -> bool {
        if index < self.aggregations.len() {
            self.aggregations.remove(index);
            true
        } else {
            false
        }
    }

    pub fn remove_filter(&mut self, index: usize) -> bool {
        if index < self.filters.len() {
            self.filters.remove(index);
            true
        } else {
            false
        }
    }

    /// Substitutes bound values for variables throughout the tree. Mapping
    /// keys may carry the `?` sigil or not. Resolved variables are dropped
    /// from the projection; an emptied projection is repopulated with the
    /// remaining free variables.
    pub fn instantiate(&mut self, mapping: &HashMap<String, String>) -> &mut Self {
        let named: HashMap<String, String> = mapping
            .iter()
            .map(|(k, v)| (k.strip_prefix('?').unwrap_or(k).to_string(), v.clone()))
            .collect();
        self.instantiate_named(&named);
        self
    }

    pub(crate) fn instantiate_named(&mut self, mapping: &HashMap<String, String>) {
        self.tree.instantiate(mapping);
        let mut refill = false;
        if let Projection::Variables(vars) = &mut self.projection {
            vars.retain(|v| {
                variable_name(v).is_some_and(|name| !mapping.contains_key(name))
            });
            refill = vars.is_empty();
        }
        if refill {
            let remaining = self.variables();
            log::debug!(
                "projection emptied by instantiation, repopulating with {} free variables",
                remaining.len()
            );
            self.projection = Projection::Variables(remaining);
        }
    }

    /// Returns a copy in which every BGP triple is probed through its own
    /// `SELECT *` subquery capped at `limit` rows. Useful for bounding the
    /// cost of each triple pattern at the endpoint.
    pub fn replace_triples_with_subqueries(&self, limit: u64) -> Query {
        let mut copy = self.clone();
        copy.tree.expand_triples_to_subqueries(limit);
        copy
    }

    /// Free variables of the query in serialization order: triples first,
    /// then filter and having expression text.
    pub fn variables(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.tree.collect_variables(&mut out);
        for filter in &self.filters {
            collect_expression_variables(&filter.expression, &mut out);
        }
        for having in &self.having {
            collect_expression_variables(&having.expression, &mut out);
        }
        out
    }

    /// All triples in serialization order, descending into subqueries.
    pub fn triples(&self) -> Vec<&TriplePattern> {
        self.tree.triples()
    }

    pub fn triple_count(&self) -> usize {
        self.tree.triple_count()
    }

    pub fn bgp_count(&self) -> usize {
        self.tree.bgp_count()
    }

    fn validate_pattern_prefixes(&self, pattern: &Pattern) -> QueryResult<()> {
        if self.prefixes.is_empty() {
            return Ok(());
        }
        let mut undeclared: Option<(String, String)> = None;
        pattern.for_each_triple(&mut |triple| {
            if undeclared.is_none() {
                for term in triple.terms() {
                    if let Some(prefix) = undeclared_prefix(term, &self.prefixes) {
                        undeclared = Some((prefix.to_string(), term.to_string()));
                        break;
                    }
                }
            }
        });
        match undeclared {
            Some((prefix, term)) => Err(report!(QueryError::UndeclaredPrefix { prefix, term })),
            None => Ok(()),
        }
    }

    fn check_term_prefix(&self, term: &str) -> QueryResult<()> {
        if let Some(prefix) = undeclared_prefix(term, &self.prefixes) {
            return Err(report!(QueryError::UndeclaredPrefix {
                prefix: prefix.to_string(),
                term: term.to_string(),
            }));
        }
        Ok(())
    }
}

/// The prefix of a prefixed-name term that is missing from `declared`.
/// Returns `None` for variables, bracketed IRIs, literals, the default
/// (empty) prefix and declared prefixes.
fn undeclared_prefix<'a>(term: &'a str, declared: &BTreeMap<String, String>) -> Option<&'a str> {
    if is_variable(term)
        || term.starts_with('<')
        || term.starts_with('"')
        || term.starts_with('\'')
        || term.parse::<f64>().is_ok()
        || term == "true"
        || term == "false"
    {
        return None;
    }
    let (prefix, _) = term.split_once(':')?;
    if prefix.is_empty() || declared.contains_key(prefix) {
        None
    } else {
        Some(prefix)
    }
}
