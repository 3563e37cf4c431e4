use crate::query::{Query, QueryError, QueryResult};
use derive_more::From;
use error_stack::report;
use std::collections::HashMap;

pub mod iso;
pub mod serialize;

/// `true` if the term carries the `?` variable sigil.
///
/// Every term in a pattern is a tagged string: a leading `?` marks a
/// variable, anything else (IRI, prefixed name, literal) is a constant.
pub fn is_variable(term: &str) -> bool {
    term.starts_with('?')
}

/// The sigil-stripped name of a variable term, or `None` for a constant.
pub fn variable_name(term: &str) -> Option<&str> {
    term.strip_prefix('?')
}

/// Appends every `?var` token found in an expression string to `out`,
/// skipping duplicates. Used to treat filter/having text as a variable
/// source without parsing it.
pub(crate) fn collect_expression_variables(text: &str, out: &mut Vec<String>) {
    let mut rest = text;
    while let Some(pos) = rest.find('?') {
        let tail = &rest[pos + 1..];
        let end = tail
            .find(|c: char| !c.is_ascii_alphanumeric() && c != '_')
            .unwrap_or(tail.len());
        if end > 0 {
            let var = format!("?{}", &tail[..end]);
            if !out.contains(&var) {
                out.push(var);
            }
        }
        rest = &tail[end..];
    }
}

/// A subject/predicate/object template where any position may be a variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriplePattern {
    pub subject: String,
    pub predicate: String,
    pub object: String,
}

impl TriplePattern {
    pub fn new(
        subject: impl Into<String>,
        predicate: impl Into<String>,
        object: impl Into<String>,
    ) -> Self {
        TriplePattern {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
        }
    }

    pub fn terms(&self) -> [&str; 3] {
        [&self.subject, &self.predicate, &self.object]
    }

    /// `true` if subject, predicate and object are all variables.
    pub fn is_all_variables(&self) -> bool {
        self.terms().iter().all(|t| is_variable(t))
    }
}

impl<S: Into<String>, P: Into<String>, O: Into<String>> From<(S, P, O)> for TriplePattern {
    fn from((s, p, o): (S, P, O)) -> Self {
        TriplePattern::new(s, p, o)
    }
}

/// A free-form boolean expression scoped to a BGP, a group, or the query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub expression: String,
}

impl Filter {
    pub fn new(expression: impl Into<String>) -> Self {
        Filter {
            expression: expression.into(),
        }
    }
}

impl From<&str> for Filter {
    fn from(expression: &str) -> Self {
        Filter::new(expression)
    }
}

impl From<String> for Filter {
    fn from(expression: String) -> Self {
        Filter::new(expression)
    }
}

/// A basic graph pattern: an ordered block of triple patterns plus the
/// filters scoped to it. Order is significant for serialization only, not
/// for matching.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bgp {
    pub triples: Vec<TriplePattern>,
    pub filters: Vec<Filter>,
}

impl Bgp {
    pub fn new(triples: impl IntoIterator<Item = TriplePattern>) -> Self {
        Bgp {
            triples: triples.into_iter().collect(),
            filters: Vec::new(),
        }
    }

    pub fn with_filters(
        triples: impl IntoIterator<Item = TriplePattern>,
        filters: impl IntoIterator<Item = Filter>,
    ) -> Self {
        Bgp {
            triples: triples.into_iter().collect(),
            filters: filters.into_iter().collect(),
        }
    }

    /// Adds a component, dispatched by kind: triple tuples and
    /// [`TriplePattern`]s extend the triple block, strings and [`Filter`]s
    /// become scoped filters. Graph patterns are not valid BGP children.
    pub fn add(&mut self, component: impl Into<Component>) -> QueryResult<&mut Self> {
        match component.into() {
            Component::Triple(t) => self.triples.push(t),
            Component::Filter(f) => self.filters.push(f),
            other => {
                return Err(report!(QueryError::UnsupportedComponent {
                    kind: other.kind_name(),
                    target: "basic graph pattern",
                }));
            }
        }
        Ok(self)
    }
}

/// A detached graph pattern value, used to build trees before attachment.
///
/// Attaching a `Pattern` to a [`Query`] (or a [`PatternTree`]) consumes it
/// and allocates arena nodes with parent links, so the same node can never
/// be referenced from two places.
#[derive(Debug, Clone)]
pub enum Pattern {
    Bgp(Bgp),
    /// Two alternatives; semantically commutative.
    Union(Box<Pattern>, Box<Pattern>),
    /// Left-outer-join semantics at evaluation time.
    Optional(Box<Pattern>),
    /// An explicit brace level kept as syntax, with its own scoped filters.
    Group(Box<Pattern>, Vec<Filter>),
    /// A full nested query.
    SubQuery(Box<Query>),
    /// Sibling patterns juxtaposed in one scope; order-significant.
    Sequence(Vec<Pattern>),
}

impl Pattern {
    pub fn union(left: impl Into<Pattern>, right: impl Into<Pattern>) -> Pattern {
        Pattern::Union(Box::new(left.into()), Box::new(right.into()))
    }

    pub fn optional(inner: impl Into<Pattern>) -> Pattern {
        Pattern::Optional(Box::new(inner.into()))
    }

    pub fn group(inner: impl Into<Pattern>) -> Pattern {
        Pattern::Group(Box::new(inner.into()), Vec::new())
    }

    pub fn group_with_filters(
        inner: impl Into<Pattern>,
        filters: impl IntoIterator<Item = Filter>,
    ) -> Pattern {
        Pattern::Group(Box::new(inner.into()), filters.into_iter().collect())
    }

    pub fn subquery(query: Query) -> Pattern {
        Pattern::SubQuery(Box::new(query))
    }

    pub fn sequence(items: impl IntoIterator<Item = Pattern>) -> Pattern {
        Pattern::Sequence(items.into_iter().collect())
    }

    /// Walks all triples of this detached value, including nested subqueries.
    pub(crate) fn for_each_triple(&self, f: &mut impl FnMut(&TriplePattern)) {
        match self {
            Pattern::Bgp(bgp) => bgp.triples.iter().for_each(&mut *f),
            Pattern::Union(l, r) => {
                l.for_each_triple(f);
                r.for_each_triple(f);
            }
            Pattern::Optional(inner) | Pattern::Group(inner, _) => inner.for_each_triple(f),
            Pattern::SubQuery(q) => q.triples().into_iter().for_each(|t| f(t)),
            Pattern::Sequence(items) => items.iter().for_each(|p| p.for_each_triple(f)),
        }
    }
}

impl From<Bgp> for Pattern {
    fn from(bgp: Bgp) -> Self {
        Pattern::Bgp(bgp)
    }
}

impl From<Query> for Pattern {
    fn from(query: Query) -> Self {
        Pattern::subquery(query)
    }
}

/// A value accepted by the `add` entry points, dispatched by kind.
#[derive(Debug, Clone)]
pub enum Component {
    Triple(TriplePattern),
    Filter(Filter),
    Pattern(Pattern),
}

impl Component {
    pub(crate) fn kind_name(&self) -> &'static str {
        match self {
            Component::Triple(_) => "triple pattern",
            Component::Filter(_) => "filter",
            Component::Pattern(_) => "graph pattern",
        }
    }
}

impl From<TriplePattern> for Component {
    fn from(t: TriplePattern) -> Self {
        Component::Triple(t)
    }
}

impl<S: Into<String>, P: Into<String>, O: Into<String>> From<(S, P, O)> for Component {
    fn from(t: (S, P, O)) -> Self {
        Component::Triple(t.into())
    }
}

impl From<Filter> for Component {
    fn from(f: Filter) -> Self {
        Component::Filter(f)
    }
}

impl From<&str> for Component {
    fn from(expression: &str) -> Self {
        Component::Filter(Filter::new(expression))
    }
}

impl From<String> for Component {
    fn from(expression: String) -> Self {
        Component::Filter(Filter::new(expression))
    }
}

impl From<Pattern> for Component {
    fn from(p: Pattern) -> Self {
        Component::Pattern(p)
    }
}

impl From<Bgp> for Component {
    fn from(bgp: Bgp) -> Self {
        Component::Pattern(Pattern::Bgp(bgp))
    }
}

impl From<Query> for Component {
    fn from(query: Query) -> Self {
        Component::Pattern(Pattern::subquery(query))
    }
}

/// Handle to a node in a [`PatternTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, From)]
pub struct PatternKey(pub(crate) u32);

/// An attached pattern node. The closed set of variants means every
/// traversal is checked exhaustively by the compiler.
#[derive(Debug, Clone)]
pub enum PatternKind {
    Bgp(Bgp),
    Union { left: PatternKey, right: PatternKey },
    Optional { inner: PatternKey },
    Group { inner: PatternKey, filters: Vec<Filter> },
    SubQuery(Box<Query>),
    Sequence(Vec<PatternKey>),
}

#[derive(Debug, Clone)]
struct PatternNode {
    kind: PatternKind,
    /// Non-owning back-reference; `None` only for the root.
    parent: Option<PatternKey>,
}

/// The arena holding a query's WHERE pattern.
///
/// Nodes live in a key -> node map and reference children by key; each node
/// stores a parent back-reference so detachment is O(1) and cascades upward
/// without a tree search.
#[derive(Debug, Clone, Default)]
pub struct PatternTree {
    nodes: HashMap<PatternKey, PatternNode>,
    max_key: u32,
    root: Option<PatternKey>,
}

impl PatternTree {
    pub fn new() -> Self {
        PatternTree::default()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    pub fn root(&self) -> Option<PatternKey> {
        self.root
    }

    pub fn kind(&self, key: PatternKey) -> Option<&PatternKind> {
        self.nodes.get(&key).map(|n| &n.kind)
    }

    pub fn kind_mut(&mut self, key: PatternKey) -> Option<&mut PatternKind> {
        self.nodes.get_mut(&key).map(|n| &mut n.kind)
    }

    pub fn parent(&self, key: PatternKey) -> Option<PatternKey> {
        self.nodes.get(&key).and_then(|n| n.parent)
    }

    pub fn contains(&self, key: PatternKey) -> bool {
        self.nodes.contains_key(&key)
    }

    fn reserve(&mut self) -> PatternKey {
        let key = PatternKey(self.max_key);
        self.max_key += 1;
        key
    }

    /// Moves a detached pattern value into the arena below `parent`,
    /// returning the key of its topmost node.
    pub(crate) fn attach(&mut self, pattern: Pattern, parent: Option<PatternKey>) -> PatternKey {
        let key = self.reserve();
        let kind = match pattern {
            Pattern::Bgp(bgp) => PatternKind::Bgp(bgp),
            Pattern::Union(l, r) => {
                let left = self.attach(*l, Some(key));
                let right = self.attach(*r, Some(key));
                PatternKind::Union { left, right }
            }
            Pattern::Optional(inner) => {
                let inner = self.attach(*inner, Some(key));
                PatternKind::Optional { inner }
            }
            Pattern::Group(inner, filters) => {
                let inner = self.attach(*inner, Some(key));
                PatternKind::Group { inner, filters }
            }
            Pattern::SubQuery(q) => PatternKind::SubQuery(q),
            Pattern::Sequence(items) => {
                let keys = items
                    .into_iter()
                    .map(|p| self.attach(p, Some(key)))
                    .collect();
                PatternKind::Sequence(keys)
            }
        };
        self.nodes.insert(key, PatternNode { kind, parent });
        key
    }

    /// Attaches a pattern at the top level. If the tree already holds a
    /// root, the root is converted into an ordered sequence containing the
    /// previous pattern and the new one, preserving arrival order.
    pub fn push_root(&mut self, pattern: Pattern) -> PatternKey {
        match self.root {
            None => {
                let key = self.attach(pattern, None);
                self.root = Some(key);
                key
            }
            Some(root) => {
                let root_is_sequence = matches!(
                    self.nodes.get(&root).map(|n| &n.kind),
                    Some(PatternKind::Sequence(_))
                );
                if root_is_sequence {
                    let key = self.attach(pattern, Some(root));
                    if let Some(PatternKind::Sequence(items)) = self.kind_mut(root) {
                        items.push(key);
                    }
                    key
                } else {
                    let seq = self.reserve();
                    if let Some(node) = self.nodes.get_mut(&root) {
                        node.parent = Some(seq);
                    }
                    let key = self.attach(pattern, Some(seq));
                    self.nodes.insert(
                        seq,
                        PatternNode {
                            kind: PatternKind::Sequence(vec![root, key]),
                            parent: None,
                        },
                    );
                    self.root = Some(seq);
                    key
                }
            }
        }
    }

    /// Detaches the node (and its subtree) from the tree.
    ///
    /// Returns `false` for an unknown or already-detached key; detaching a
    /// detached node is a no-op, not an error. A wrapper left without its
    /// required child is removed as well, cascading upward until a node
    /// survives or the root is cleared.
    pub fn remove(&mut self, key: PatternKey) -> bool {
        let Some(node) = self.nodes.get(&key) else {
            return false;
        };
        let parent = node.parent;
        self.free(key);
        match parent {
            None => {
                if self.root == Some(key) {
                    self.root = None;
                }
            }
            Some(parent) => self.child_removed(parent, key),
        }
        true
    }

    /// Removes one triple from a BGP node by index. No-op (`false`) if the
    /// key is not a BGP or the index is out of range.
    pub fn remove_triple(&mut self, key: PatternKey, index: usize) -> bool {
        match self.kind_mut(key) {
            Some(PatternKind::Bgp(bgp)) if index < bgp.triples.len() => {
                bgp.triples.remove(index);
                true
            }
            _ => false,
        }
    }

    /// Removes one scoped filter from a BGP or group node by index.
    pub fn remove_filter(&mut self, key: PatternKey, index: usize) -> bool {
        let filters = match self.kind_mut(key) {
            Some(PatternKind::Bgp(bgp)) => &mut bgp.filters,
            Some(PatternKind::Group { filters, .. }) => filters,
            _ => return false,
        };
        if index < filters.len() {
            filters.remove(index);
            true
        } else {
            false
        }
    }

    /// Adds a triple or filter to an attached BGP node.
    pub fn add_to_bgp(
        &mut self,
        key: PatternKey,
        component: impl Into<Component>,
    ) -> QueryResult<()> {
        let Some(PatternKind::Bgp(bgp)) = self.kind_mut(key) else {
            return Err(report!(QueryError::UnsupportedComponent {
                kind: "graph pattern",
                target: "basic graph pattern",
            }));
        };
        bgp.add(component)?;
        Ok(())
    }

    /// Adds a scoped filter to an attached BGP or group node.
    pub fn add_filter(&mut self, key: PatternKey, filter: impl Into<Filter>) -> bool {
        match self.kind_mut(key) {
            Some(PatternKind::Bgp(bgp)) => {
                bgp.filters.push(filter.into());
                true
            }
            Some(PatternKind::Group { filters, .. }) => {
                filters.push(filter.into());
                true
            }
            _ => false,
        }
    }

    /// Replaces the triples of every BGP by a sequence of single-triple
    /// subqueries, each `SELECT * ... LIMIT limit`. Nested subqueries are
    /// rewritten through their own query.
    pub(crate) fn expand_triples_to_subqueries(&mut self, limit: u64) {
        let keys: Vec<PatternKey> = self.nodes.keys().copied().collect();
        for key in keys {
            let triples = match self.kind_mut(key) {
                Some(PatternKind::Bgp(bgp)) if !bgp.triples.is_empty() => {
                    std::mem::take(&mut bgp.triples)
                }
                Some(PatternKind::SubQuery(query)) => {
                    let rewritten = query.replace_triples_with_subqueries(limit);
                    **query = rewritten;
                    continue;
                }
                _ => continue,
            };
            let children: Vec<PatternKey> = triples
                .into_iter()
                .map(|triple| {
                    let mut subquery = Query::new();
                    subquery
                        .tree_mut()
                        .push_root(Pattern::Bgp(Bgp::new([triple])));
                    subquery.set_limit(limit);
                    self.attach(Pattern::subquery(subquery), Some(key))
                })
                .collect();
            if let Some(kind) = self.kind_mut(key) {
                *kind = PatternKind::Sequence(children);
            }
        }
    }

    fn free(&mut self, key: PatternKey) {
        let Some(node) = self.nodes.remove(&key) else {
            return;
        };
        match node.kind {
            PatternKind::Bgp(_) | PatternKind::SubQuery(_) => {}
            PatternKind::Union { left, right } => {
                self.free(left);
                self.free(right);
            }
            PatternKind::Optional { inner } | PatternKind::Group { inner, .. } => self.free(inner),
            PatternKind::Sequence(items) => {
                for item in items {
                    self.free(item);
                }
            }
        }
    }

    fn child_removed(&mut self, parent: PatternKey, removed: PatternKey) {
        enum Followup {
            Cascade,
            Collapse,
            Keep,
        }
        let followup = match self.nodes.get_mut(&parent) {
            None => return,
            Some(node) => match &mut node.kind {
                // Wrappers never retain a missing child.
                PatternKind::Union { .. }
                | PatternKind::Optional { .. }
                | PatternKind::Group { .. } => Followup::Cascade,
                PatternKind::Sequence(items) => {
                    items.retain(|k| *k != removed);
                    match items.len() {
                        0 => Followup::Cascade,
                        1 => Followup::Collapse,
                        _ => Followup::Keep,
                    }
                }
                PatternKind::Bgp(_) | PatternKind::SubQuery(_) => Followup::Keep,
            },
        };
        match followup {
            Followup::Cascade => {
                self.remove(parent);
            }
            Followup::Collapse => self.collapse_sequence(parent),
            Followup::Keep => {}
        }
    }

    /// Replaces a single-element sequence by its remaining element.
    fn collapse_sequence(&mut self, seq: PatternKey) {
        let Some(PatternKind::Sequence(items)) = self.kind(seq) else {
            return;
        };
        let only = items[0];
        let grandparent = self.nodes.get(&seq).and_then(|n| n.parent);
        if let Some(node) = self.nodes.get_mut(&only) {
            node.parent = grandparent;
        }
        self.nodes.remove(&seq);
        match grandparent {
            None => self.root = Some(only),
            Some(gp) => self.replace_child(gp, seq, only),
        }
    }

    fn replace_child(&mut self, parent: PatternKey, old: PatternKey, new: PatternKey) {
        let Some(node) = self.nodes.get_mut(&parent) else {
            return;
        };
        match &mut node.kind {
            PatternKind::Union { left, right } => {
                if *left == old {
                    *left = new;
                }
                if *right == old {
                    *right = new;
                }
            }
            PatternKind::Optional { inner } | PatternKind::Group { inner, .. } => {
                if *inner == old {
                    *inner = new;
                }
            }
            PatternKind::Sequence(items) => {
                for item in items.iter_mut() {
                    if *item == old {
                        *item = new;
                    }
                }
            }
            PatternKind::Bgp(_) | PatternKind::SubQuery(_) => {}
        }
    }

    /// Substitutes bound variables in every triple of the tree. Mapping keys
    /// are sigil-stripped variable names; nested subqueries instantiate
    /// through their own query.
    pub(crate) fn instantiate(&mut self, mapping: &HashMap<String, String>) {
        for node in self.nodes.values_mut() {
            match &mut node.kind {
                PatternKind::Bgp(bgp) => {
                    for triple in &mut bgp.triples {
                        bind_term(&mut triple.subject, mapping);
                        bind_term(&mut triple.predicate, mapping);
                        bind_term(&mut triple.object, mapping);
                    }
                }
                PatternKind::SubQuery(query) => {
                    query.instantiate_named(mapping);
                }
                _ => {}
            }
        }
    }

    pub fn triple_count(&self) -> usize {
        self.root.map_or(0, |root| self.triple_count_at(root))
    }

    fn triple_count_at(&self, key: PatternKey) -> usize {
        match self.kind(key) {
            Some(PatternKind::Bgp(bgp)) => bgp.triples.len(),
            Some(PatternKind::Union { left, right }) => {
                self.triple_count_at(*left) + self.triple_count_at(*right)
            }
            Some(PatternKind::Optional { inner }) | Some(PatternKind::Group { inner, .. }) => {
                self.triple_count_at(*inner)
            }
            Some(PatternKind::SubQuery(query)) => query.triple_count(),
            Some(PatternKind::Sequence(items)) => {
                items.iter().map(|k| self.triple_count_at(*k)).sum()
            }
            None => 0,
        }
    }

    pub fn bgp_count(&self) -> usize {
        self.root.map_or(0, |root| self.bgp_count_at(root))
    }

    fn bgp_count_at(&self, key: PatternKey) -> usize {
        match self.kind(key) {
            Some(PatternKind::Bgp(_)) => 1,
            Some(PatternKind::Union { left, right }) => {
                self.bgp_count_at(*left) + self.bgp_count_at(*right)
            }
            Some(PatternKind::Optional { inner }) | Some(PatternKind::Group { inner, .. }) => {
                self.bgp_count_at(*inner)
            }
            Some(PatternKind::SubQuery(query)) => query.bgp_count(),
            Some(PatternKind::Sequence(items)) => {
                items.iter().map(|k| self.bgp_count_at(*k)).sum()
            }
            None => 0,
        }
    }

    /// Collects free variables in serialization order (first occurrence
    /// wins), including `?var` tokens inside scoped filter expressions.
    pub(crate) fn collect_variables(&self, out: &mut Vec<String>) {
        if let Some(root) = self.root {
            self.collect_variables_at(root, out);
        }
    }

    fn collect_variables_at(&self, key: PatternKey, out: &mut Vec<String>) {
        match self.kind(key) {
            Some(PatternKind::Bgp(bgp)) => {
                for triple in &bgp.triples {
                    for term in triple.terms() {
                        if is_variable(term) && !out.iter().any(|v| v == term) {
                            out.push(term.to_string());
                        }
                    }
                }
                for filter in &bgp.filters {
                    collect_expression_variables(&filter.expression, out);
                }
            }
            Some(PatternKind::Union { left, right }) => {
                self.collect_variables_at(*left, out);
                self.collect_variables_at(*right, out);
            }
            Some(PatternKind::Optional { inner }) => self.collect_variables_at(*inner, out),
            Some(PatternKind::Group { inner, filters }) => {
                self.collect_variables_at(*inner, out);
                for filter in filters {
                    collect_expression_variables(&filter.expression, out);
                }
            }
            Some(PatternKind::SubQuery(query)) => {
                for var in query.variables() {
                    if !out.contains(&var) {
                        out.push(var);
                    }
                }
            }
            Some(PatternKind::Sequence(items)) => {
                for item in items {
                    self.collect_variables_at(*item, out);
                }
            }
            None => {}
        }
    }

    /// All triple patterns of the tree in serialization order, descending
    /// into nested subqueries.
    pub fn triples(&self) -> Vec<&TriplePattern> {
        let mut out = Vec::new();
        if let Some(root) = self.root {
            self.triples_at(root, &mut out);
        }
        out
    }

    fn triples_at<'a>(&'a self, key: PatternKey, out: &mut Vec<&'a TriplePattern>) {
        match self.kind(key) {
            Some(PatternKind::Bgp(bgp)) => out.extend(bgp.triples.iter()),
            Some(PatternKind::Union { left, right }) => {
                self.triples_at(*left, out);
                self.triples_at(*right, out);
            }
            Some(PatternKind::Optional { inner }) | Some(PatternKind::Group { inner, .. }) => {
                self.triples_at(*inner, out);
            }
            Some(PatternKind::SubQuery(query)) => out.extend(query.triples()),
            Some(PatternKind::Sequence(items)) => {
                for item in items {
                    self.triples_at(*item, out);
                }
            }
            None => {}
        }
    }
}

fn bind_term(term: &mut String, mapping: &HashMap<String, String>) {
    if let Some(name) = variable_name(term) {
        if let Some(value) = mapping.get(name) {
            *term = bound_term(value);
        }
    }
}

/// Wraps a bound value as an IRI unless it is already bracketed or shaped
/// like a literal (quoted, numeric, boolean).
pub(crate) fn bound_term(value: &str) -> String {
    let literal_shaped = value.starts_with('<')
        || value.starts_with('"')
        || value.starts_with('\'')
        || value == "true"
        || value == "false"
        || value.parse::<f64>().is_ok();
    if literal_shaped {
        value.to_string()
    } else {
        format!("<{value}>")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sigil_tagging() {
        assert!(is_variable("?s"));
        assert!(!is_variable(":p"));
        assert!(!is_variable("<http://example.org/p>"));
        assert_eq!(variable_name("?name"), Some("name"));
        assert_eq!(variable_name("\"name\""), None);
    }

    #[test]
    fn expression_variable_scan() {
        let mut vars = Vec::new();
        collect_expression_variables("(?age > 25) && REGEX(STR(?name), '^A')", &mut vars);
        assert_eq!(vars, vec!["?age".to_string(), "?name".to_string()]);
    }

    #[test]
    fn bound_term_wrapping() {
        assert_eq!(bound_term("example.org/bob"), "<example.org/bob>");
        assert_eq!(bound_term("<http://example.org/john>"), "<http://example.org/john>");
        assert_eq!(bound_term("\"John Doe\""), "\"John Doe\"");
        assert_eq!(bound_term("42"), "42");
        assert_eq!(bound_term("true"), "true");
    }

    #[test]
    fn push_root_builds_sequence_in_arrival_order() {
        let mut tree = PatternTree::new();
        let first = tree.push_root(Pattern::Bgp(Bgp::new([TriplePattern::new("?s", ":p", "?o")])));
        assert_eq!(tree.root(), Some(first));

        let second = tree.push_root(Pattern::optional(Bgp::new([TriplePattern::new(
            "?s", ":q", "?x",
        )])));
        let root = tree.root().unwrap();
        match tree.kind(root).unwrap() {
            PatternKind::Sequence(items) => assert_eq!(items, &vec![first, second]),
            other => panic!("expected sequence root, got {other:?}"),
        }
    }

    #[test]
    fn remove_detached_key_is_noop() {
        let mut tree = PatternTree::new();
        let key = tree.push_root(Pattern::Bgp(Bgp::default()));
        assert!(tree.remove(key));
        assert!(!tree.remove(key));
        assert!(tree.is_empty());
    }
}
