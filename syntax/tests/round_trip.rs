use proptest::prelude::*;
use sparqlkit::prelude::*;
use sparqlkit_syntax::parse_query;

fn bgp(triples: &[(&str, &str, &str)]) -> Bgp {
    Bgp::new(triples.iter().map(|(s, p, o)| TriplePattern::new(*s, *p, *o)))
}

fn round_trips(query: &Query) {
    let text = query.to_query_string();
    let reparsed = parse_query(&text).unwrap_or_else(|e| panic!("reparse of\n{text}\nfailed: {e:?}"));
    assert!(
        query.is_isomorphic(&reparsed),
        "round trip lost structure for\n{text}"
    );
}

#[test]
fn bgp_with_filters_round_trips() {
    let mut query = Query::new();
    query
        .add(Bgp::with_filters(
            [
                TriplePattern::new("?person", ":name", "?name"),
                TriplePattern::new("?person", ":age", "?age"),
            ],
            [Filter::new("?age > 25")],
        ))
        .unwrap();
    round_trips(&query);
}

#[test]
fn union_round_trips() {
    let mut query = Query::new();
    query
        .add(Pattern::union(
            bgp(&[("?s", ":p", "?o"), ("?o", ":q", "?x")]),
            bgp(&[("?o", ":r", "?s")]),
        ))
        .unwrap();
    round_trips(&query);
}

#[test]
fn sequence_with_optional_round_trips() {
    let mut query = Query::new();
    query.add(bgp(&[("?s", "?p", "?o")])).unwrap();
    query
        .add(Pattern::optional(bgp(&[("?o", ":p1", "?x")])))
        .unwrap();
    round_trips(&query);
}

#[test]
fn nested_union_inside_optional_round_trips() {
    let mut query = Query::new();
    query.add(bgp(&[("?s", ":type", ":Person")])).unwrap();
    query
        .add(Pattern::optional(Pattern::union(
            bgp(&[("?s", ":name", "?n")]),
            bgp(&[("?s", ":label", "?n")]),
        )))
        .unwrap();
    round_trips(&query);
}

#[test]
fn modifier_rich_query_round_trips() {
    let mut query = Query::new();
    query
        .add(bgp(&[
            ("?person", ":age", "?age"),
            ("?person", ":salary", "?salary"),
        ]))
        .unwrap();
    query
        .add_aggregation(
            AggregationExpression::new(AggregateFunction::Avg, "?salary", "?avgSalary").distinct(),
        )
        .unwrap();
    query.add_group_by(["?age"]).unwrap();
    query.set_projection(["?age"]).unwrap();
    query.add_having("AVG(?salary) > 10000");
    query.set_order_by(OrderBy::with_directions(["?age"], [false]));
    query.set_limit(5).set_offset(10).set_distinct(true);

    let text = query.to_query_string();
    let reparsed = parse_query(&text).unwrap();
    assert!(query.is_isomorphic(&reparsed));
    assert_eq!(reparsed.limit, Some(5));
    assert_eq!(reparsed.offset, Some(10));
    assert!(reparsed.distinct);
    assert_eq!(reparsed.having[0].expression, "AVG(?salary) > 10000");
    assert_eq!(reparsed.aggregations().len(), 1);
    assert!(reparsed.aggregations()[0].distinct);
}

#[test]
fn parse_serialize_parse_is_stable() {
    let first = parse_query(
        "SELECT DISTINCT ?person ?name
         WHERE {
             ?person :name ?name .
             ?person :age ?age .
             FILTER(?age > 25)
             OPTIONAL { ?person :email ?email . }
             { ?person :likes ?hobby . } UNION { ?hobby :likedBy ?person . }
         }
         ORDER BY ?name DESC(?age)
         LIMIT 10",
    )
    .unwrap();
    let second = parse_query(&first.to_query_string()).unwrap();
    assert!(first.is_isomorphic(&second));
    assert_eq!(first.to_query_string(), second.to_query_string());
}

const SUBJECTS: [&str; 4] = ["?a", "?b", "?c", ":s"];
const PREDICATES: [&str; 4] = ["?p", ":p", ":q", "?q"];
const OBJECTS: [&str; 5] = ["?o", "?a", "\"v\"", ":r", "42"];

fn triples_from(indices: &[(usize, usize, usize)]) -> Vec<TriplePattern> {
    indices
        .iter()
        .map(|(s, p, o)| {
            TriplePattern::new(
                SUBJECTS[s % SUBJECTS.len()],
                PREDICATES[p % PREDICATES.len()],
                OBJECTS[o % OBJECTS.len()],
            )
        })
        .collect()
}

fn rename_variables(triples: &[TriplePattern]) -> Vec<TriplePattern> {
    let rename = |term: &str| {
        if term.starts_with('?') {
            format!("{term}r")
        } else {
            term.to_string()
        }
    };
    triples
        .iter()
        .map(|t| {
            TriplePattern::new(
                rename(&t.subject),
                rename(&t.predicate),
                rename(&t.object),
            )
        })
        .collect()
}

proptest! {
    #[test]
    fn permuting_and_renaming_a_bgp_preserves_isomorphism(
        indices in proptest::collection::vec((0usize..8, 0usize..8, 0usize..8), 1..6),
        rotation in 0usize..6,
    ) {
        let triples = triples_from(&indices);
        let mut renamed = rename_variables(&triples);
        let len = renamed.len();
        renamed.rotate_left(rotation % len);

        let mut query_a = Query::new();
        query_a.add(Bgp::new(triples)).unwrap();
        let mut query_b = Query::new();
        query_b.add(Bgp::new(renamed)).unwrap();

        prop_assert!(query_a.is_isomorphic(&query_b));
        prop_assert!(query_b.is_isomorphic(&query_a));
    }

    #[test]
    fn generated_bgps_survive_serialize_then_parse(
        indices in proptest::collection::vec((0usize..8, 0usize..8, 0usize..8), 1..6),
    ) {
        let triples = triples_from(&indices);
        let mut query = Query::new();
        query.add(Bgp::new(triples)).unwrap();

        let text = query.to_query_string();
        let reparsed = parse_query(&text).unwrap();
        prop_assert!(query.is_isomorphic(&reparsed));
    }
}
