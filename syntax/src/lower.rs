//! Lowers the order-preserving AST into a [`sparqlkit::Query`].
//!
//! Rules applied here, in textual order per scope: runs of triples merge
//! into one BGP (a FILTER does not break the run, operator patterns do);
//! filters attach to their scope's BGP when one exists and float up to the
//! enclosing group or query otherwise; redundant `{ {X} }` nesting
//! collapses unless nesting preservation is requested; a single-element
//! scope lowers to that pattern directly, a mixed scope to an ordered
//! sequence.

use crate::ast::{
    AggregateArg, GroupAst, GroupElement, QueryAst, SelectItem, SelectItems,
};
use crate::{ParseError, ParseOptions, ParseResult};
use error_stack::{ResultExt, report};
use sparqlkit::{
    AggregateFunction, AggregationExpression, Bgp, Filter, OrderBy, Pattern, Query, TriplePattern,
};

pub fn lower_query(ast: QueryAst, options: ParseOptions) -> ParseResult<Query> {
    let mut query = Query::new();

    let scope = lower_group(ast.group, &options);
    if let Some(pattern) = scope.pattern {
        query
            .add(pattern)
            .change_context(ParseError::Construction)
            .attach_printable("failed to attach the WHERE pattern")?;
    }
    for filter in scope.filters {
        query
            .add(filter)
            .change_context(ParseError::Construction)?;
    }

    if let Some(graph) = ast.graph {
        query.set_graph(graph);
    }
    query.set_distinct(ast.select.distinct);

    let is_wildcard = matches!(ast.select.items, SelectItems::Wildcard);
    let mut plain_variables = Vec::new();
    if let SelectItems::Items(items) = ast.select.items {
        for item in items {
            match item {
                SelectItem::Variable(variable) => plain_variables.push(variable),
                SelectItem::Aggregate(aggregate) => {
                    let function = AggregateFunction::from_keyword(&aggregate.function)
                        .ok_or_else(|| report!(ParseError::Construction))
                        .attach_printable_lazy(|| {
                            format!("unknown aggregate function `{}`", aggregate.function)
                        })?;
                    let variable = match aggregate.argument {
                        AggregateArg::Wildcard => "*".to_string(),
                        AggregateArg::Variable(variable) => variable,
                    };
                    let mut expression =
                        AggregationExpression::new(function, variable, aggregate.alias);
                    if aggregate.distinct {
                        expression = expression.distinct();
                    }
                    query
                        .add_aggregation(expression)
                        .change_context(ParseError::Construction)?;
                }
            }
        }
    }

    if let Some(group_by) = ast.group_by {
        query
            .add_group_by(group_by)
            .change_context(ParseError::Construction)?;
    }
    if !is_wildcard {
        query
            .set_projection(plain_variables)
            .change_context(ParseError::Construction)?;
    }

    for having in ast.having {
        query.add_having(having.to_text());
    }
    if let Some(keys) = ast.order_by {
        query.set_order_by(OrderBy::with_directions(
            keys.iter().map(|key| key.variable.clone()),
            keys.iter().map(|key| key.ascending),
        ));
    }
    if let Some(limit) = ast.limit {
        query.set_limit(limit);
    }
    if let Some(offset) = ast.offset {
        query.set_offset(offset);
    }
    if !ast.prefixes.is_empty() {
        query
            .set_prefixes(ast.prefixes)
            .change_context(ParseError::Construction)?;
    }

    Ok(query)
}

struct LoweredScope {
    pattern: Option<Pattern>,
    /// Filters that found no BGP in their scope.
    filters: Vec<Filter>,
}

impl LoweredScope {
    /// Folds leftover filters back in by wrapping the scope in a group, so
    /// they are not lost when the scope becomes an operator branch.
    fn into_pattern(self) -> Option<Pattern> {
        if self.filters.is_empty() {
            self.pattern
        } else {
            let inner = self
                .pattern
                .unwrap_or_else(|| Pattern::Bgp(Bgp::default()));
            Some(Pattern::group_with_filters(inner, self.filters))
        }
    }
}

fn lower_group(group: GroupAst, options: &ParseOptions) -> LoweredScope {
    let mut parts: Vec<Pattern> = Vec::new();
    let mut scope_filters: Vec<Filter> = Vec::new();
    let mut current: Option<Bgp> = None;

    fn flush(current: &mut Option<Bgp>, parts: &mut Vec<Pattern>) {
        if let Some(bgp) = current.take() {
            parts.push(Pattern::Bgp(bgp));
        }
    }

    for (element, _span) in group.elements {
        match element {
            GroupElement::Bgp(triples) => {
                let bgp = current.get_or_insert_with(Bgp::default);
                bgp.triples.extend(
                    triples
                        .into_iter()
                        .map(|t| TriplePattern::new(t.subject, t.predicate, t.object)),
                );
            }
            GroupElement::Filter(expression) => {
                let filter = Filter::new(expression.to_text());
                if let Some(bgp) = current.as_mut() {
                    bgp.filters.push(filter);
                } else if let Some(Pattern::Bgp(bgp)) = parts.last_mut() {
                    bgp.filters.push(filter);
                } else {
                    scope_filters.push(filter);
                }
            }
            GroupElement::Union(left, right) => {
                flush(&mut current, &mut parts);
                parts.push(Pattern::union(
                    lower_branch(left, options),
                    lower_branch(right, options),
                ));
            }
            GroupElement::Optional(inner) => {
                flush(&mut current, &mut parts);
                parts.push(Pattern::optional(lower_branch(inner, options)));
            }
            GroupElement::Group(inner) => {
                flush(&mut current, &mut parts);
                let scope = lower_group(inner, options);
                if options.preserve_nesting {
                    let inner_pattern = scope
                        .pattern
                        .unwrap_or_else(|| Pattern::Bgp(Bgp::default()));
                    parts.push(Pattern::Group(Box::new(inner_pattern), scope.filters));
                } else if let Some(pattern) = scope.into_pattern() {
                    // redundant nesting collapses to the inner pattern
                    parts.push(pattern);
                }
            }
        }
    }
    flush(&mut current, &mut parts);

    let pattern = match parts.len() {
        0 => None,
        1 => parts.pop(),
        _ => Some(Pattern::Sequence(parts)),
    };
    LoweredScope {
        pattern,
        filters: scope_filters,
    }
}

/// Lowers a UNION/OPTIONAL branch; the operator's own braces are part of
/// its syntax, so the branch is never wrapped in an extra group.
fn lower_branch(group: GroupAst, options: &ParseOptions) -> Pattern {
    lower_group(group, options)
        .into_pattern()
        .unwrap_or_else(|| Pattern::Bgp(Bgp::default()))
}
