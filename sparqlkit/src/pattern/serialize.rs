//! Canonical query text rendering. Nesting is indented two spaces per
//! level; the output of [`Query::to_query_string`] parses back to a
//! structurally isomorphic tree for the supported grammar subset.

use crate::pattern::{Filter, PatternKey, PatternKind, PatternTree};
use crate::query::{Projection, Query};
use std::fmt::Write;

fn indent(out: &mut String, level: usize) {
    for _ in 0..level {
        out.push_str("  ");
    }
}

fn write_filters(out: &mut String, filters: &[Filter], level: usize) {
    for filter in filters {
        indent(out, level);
        let _ = writeln!(out, "FILTER({})", filter.expression);
    }
}

impl PatternTree {
    pub(crate) fn serialize_into(&self, key: PatternKey, level: usize, out: &mut String) {
        match self.kind(key) {
            Some(PatternKind::Bgp(bgp)) => {
                for triple in &bgp.triples {
                    indent(out, level);
                    let _ = writeln!(
                        out,
                        "{} {} {} .",
                        triple.subject, triple.predicate, triple.object
                    );
                }
                write_filters(out, &bgp.filters, level);
            }
            Some(PatternKind::Union { left, right }) => {
                indent(out, level);
                out.push_str("{\n");
                self.serialize_into(*left, level + 1, out);
                indent(out, level);
                out.push_str("} UNION {\n");
                self.serialize_into(*right, level + 1, out);
                indent(out, level);
                out.push_str("}\n");
            }
            Some(PatternKind::Optional { inner }) => {
                indent(out, level);
                out.push_str("OPTIONAL {\n");
                self.serialize_into(*inner, level + 1, out);
                indent(out, level);
                out.push_str("}\n");
            }
            Some(PatternKind::Group { inner, filters }) => {
                indent(out, level);
                out.push_str("{\n");
                self.serialize_into(*inner, level + 1, out);
                write_filters(out, filters, level + 1);
                indent(out, level);
                out.push_str("}\n");
            }
            Some(PatternKind::SubQuery(query)) => {
                indent(out, level);
                out.push_str("{\n");
                for line in query.to_query_string().lines() {
                    indent(out, level);
                    out.push_str(line);
                    out.push('\n');
                }
                indent(out, level);
                out.push_str("}\n");
            }
            Some(PatternKind::Sequence(items)) => {
                for item in items {
                    self.serialize_into(*item, level, out);
                }
            }
            None => {}
        }
    }
}

impl Query {
    /// Renders the query as canonical SPARQL text.
    pub fn to_query_string(&self) -> String {
        let mut out = String::new();
        for (prefix, iri) in self.prefixes() {
            let _ = writeln!(out, "PREFIX {prefix}: <{iri}>");
        }

        out.push_str("SELECT ");
        if self.distinct {
            out.push_str("DISTINCT ");
        }
        out.push_str(&self.projection_text());
        out.push('\n');

        if let Some(graph) = &self.graph {
            let _ = writeln!(out, "FROM <{graph}>");
        }

        out.push_str("WHERE {\n");
        if let Some(root) = self.tree().root() {
            self.tree().serialize_into(root, 1, &mut out);
        }
        write_filters(&mut out, &self.filters, 1);
        out.push('}');

        if let Some(group_by) = self.group_by() {
            let _ = write!(out, "\nGROUP BY {}", group_by.variables.join(" "));
        }
        for having in &self.having {
            let _ = write!(out, "\nHAVING({})", having.expression);
        }
        if let Some(order_by) = &self.order_by {
            let keys: Vec<String> = order_by
                .keys
                .iter()
                .map(|key| {
                    let direction = if key.ascending { "ASC" } else { "DESC" };
                    format!("{direction}({})", key.variable)
                })
                .collect();
            let _ = write!(out, "\nORDER BY {}", keys.join(" "));
        }
        if let Some(limit) = self.limit {
            let _ = write!(out, "\nLIMIT {limit}");
        }
        if let Some(offset) = self.offset {
            let _ = write!(out, "\nOFFSET {offset}");
        }
        out
    }

    fn projection_text(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        if self.aggregations().is_empty() {
            match self.projection() {
                Projection::Wildcard => parts.push("*".to_string()),
                Projection::Variables(vars) => parts.extend(vars.iter().cloned()),
            }
        } else {
            if let Projection::Variables(vars) = self.projection() {
                parts.extend(vars.iter().cloned());
            }
            parts.extend(self.aggregations().iter().map(|a| a.to_string()));
        }
        parts.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use crate::pattern::{Bgp, Filter, Pattern, TriplePattern};
    use crate::query::{AggregateFunction, AggregationExpression, OrderBy, Query};

    #[test]
    fn serializes_modifiers_in_fixed_order() {
        let mut query = Query::new();
        query
            .add(Bgp::new([
                TriplePattern::new("?person", ":age", "?age"),
                TriplePattern::new("?person", ":name", "?name"),
            ]))
            .unwrap();
        query
            .add_aggregation(AggregationExpression::new(
                AggregateFunction::Count,
                "?person",
                "?count",
            ))
            .unwrap();
        query.add_group_by(["?age"]).unwrap();
        query.set_projection(["?age"]).unwrap();
        query.add_having("COUNT(?person) > 10");
        query.set_order_by(OrderBy::new(["?age"], false));
        query.set_limit(10).set_offset(20).set_distinct(true);

        let text = query.to_query_string();
        assert!(text.starts_with("SELECT DISTINCT ?age (COUNT(?person) AS ?count)\n"));
        let group_pos = text.find("GROUP BY ?age").unwrap();
        let having_pos = text.find("HAVING(COUNT(?person) > 10)").unwrap();
        let order_pos = text.find("ORDER BY DESC(?age)").unwrap();
        let limit_pos = text.find("LIMIT 10").unwrap();
        let offset_pos = text.find("OFFSET 20").unwrap();
        assert!(group_pos < having_pos);
        assert!(having_pos < order_pos);
        assert!(order_pos < limit_pos);
        assert!(limit_pos < offset_pos);
    }

    #[test]
    fn serializes_union_and_scoped_filters() {
        let mut query = Query::new();
        query
            .add(Pattern::union(
                Bgp::with_filters(
                    [TriplePattern::new("?s", ":p", "?o")],
                    [Filter::new("?o > 5")],
                ),
                Bgp::new([TriplePattern::new("?o", ":q", "?s")]),
            ))
            .unwrap();

        let text = query.to_query_string();
        assert!(text.contains("{\n    ?s :p ?o .\n    FILTER(?o > 5)\n  } UNION {\n"));
    }

    #[test]
    fn serializes_subquery_reindented() {
        let mut inner = Query::new();
        inner
            .add(Bgp::new([TriplePattern::new("?s", ":p", "?o")]))
            .unwrap();
        inner.set_projection(["?o"]).unwrap();
        inner.set_limit(300);

        let mut outer = Query::new();
        outer.add(inner).unwrap();

        let text = outer.to_query_string();
        assert!(text.contains("WHERE {\n  {\n  SELECT ?o\n"));
        assert!(text.contains("LIMIT 300"));
    }
}
