use sparqlkit::prelude::*;

fn bgp(triples: &[(&str, &str, &str)]) -> Bgp {
    Bgp::new(triples.iter().map(|(s, p, o)| TriplePattern::new(*s, *p, *o)))
}

fn query_of(pattern: impl Into<Pattern>) -> Query {
    let mut query = Query::new();
    query.add(pattern.into()).unwrap();
    query
}

#[test]
fn reflexive() {
    let query = query_of(Pattern::union(
        bgp(&[("?s", ":p", "?o")]),
        Pattern::optional(bgp(&[("?s", ":q", "?x")])),
    ));
    assert!(query.is_isomorphic(&query));

    let empty = Query::new();
    assert!(empty.is_isomorphic(&empty));
}

#[test_log::test]
fn renaming_invariant_bgps() {
    // BGP[(?s,:p,?o), (?s,?p2,?o2)] vs BGP[(?s1,?p4,?o3), (?s1,:p,?o5)]
    // under s->s1, p2->p4, o2->o3, o->o5
    let a = query_of(bgp(&[("?s", ":p", "?o"), ("?s", "?p2", "?o2")]));
    let b = query_of(bgp(&[("?s1", "?p4", "?o3"), ("?s1", ":p", "?o5")]));
    assert!(a.is_isomorphic(&b));

    // changing the target's constant predicate breaks the match
    let c = query_of(bgp(&[("?s1", "?p4", "?o3"), ("?s1", ":p1", "?o5")]));
    assert!(!a.is_isomorphic(&c));
}

#[test]
fn inconsistent_mapping_is_rejected() {
    let a = query_of(bgp(&[("?s", ":p", "?o"), ("?s", ":q", "?x")]));
    let b = query_of(bgp(&[("?s", ":p", "?o"), ("?t", ":q", "?x")]));
    assert!(!a.is_isomorphic(&b));
}

#[test_log::test]
fn bgp_sizes_must_match() {
    let a = query_of(bgp(&[("?s", ":p", "?o")]));
    let b = query_of(bgp(&[("?s", ":p", "?o"), ("?o", ":q", "?x")]));
    assert!(!a.is_isomorphic(&b));
}

#[test]
fn constants_must_match_exactly() {
    let a = query_of(bgp(&[
        ("?s", ":predicate1", "?o"),
        ("?s", ":predicate2", "\"value\""),
    ]));
    let b = query_of(bgp(&[
        ("?x", ":predicate1", "?y"),
        ("?x", ":predicate2", "\"different\""),
    ]));
    assert!(!a.is_isomorphic(&b));

    let c = query_of(bgp(&[
        ("?x", ":predicate1", "?y"),
        ("?x", ":predicate2", "\"value\""),
    ]));
    assert!(a.is_isomorphic(&c));
}

#[test]
fn union_is_commutative() {
    let a = query_of(Pattern::union(
        bgp(&[("?s", ":p", "?o")]),
        bgp(&[("?s", ":q", "?o")]),
    ));
    let b = query_of(Pattern::union(
        bgp(&[("?x", ":q", "?y")]),
        bgp(&[("?x", ":p", "?y")]),
    ));
    assert!(a.is_isomorphic(&b));
}

#[test]
fn nested_unions_commute() {
    let a = query_of(Pattern::union(
        Pattern::union(
            bgp(&[("?s1", "?p1", "?o1")]),
            bgp(&[("?o1", "?p2", "?o2")]),
        ),
        bgp(&[("?s1", ":p22", "?o23")]),
    ));
    let b = query_of(Pattern::union(
        bgp(&[("?s11", ":p22", "?o23")]),
        Pattern::union(
            bgp(&[("?s11", "?p1", "?o1")]),
            bgp(&[("?o1", "?p2", "?o2")]),
        ),
    ));
    assert!(a.is_isomorphic(&b));
}

#[test]
fn bgp_triple_order_is_insensitive() {
    let a = query_of(bgp(&[
        ("?s", ":p", "?o"),
        ("?o", ":q", "?x"),
        ("?x", ":r", "?s"),
    ]));
    let b = query_of(bgp(&[
        ("?x2", ":r", "?s2"),
        ("?s2", ":p", "?o2"),
        ("?o2", ":q", "?x2"),
    ]));
    assert!(a.is_isomorphic(&b));
}

#[test]
fn sequences_are_order_sensitive() {
    let a = query_of(Pattern::sequence([
        Pattern::Bgp(bgp(&[("?s", "?p", "?o")])),
        Pattern::optional(bgp(&[("?s", ":p1", "?o2")])),
    ]));
    let b = query_of(Pattern::sequence([
        Pattern::Bgp(bgp(&[("?subject", "?predicate", "?object")])),
        Pattern::optional(bgp(&[("?subject", ":p1", "?object2")])),
    ]));
    assert!(a.is_isomorphic(&b));

    let swapped = query_of(Pattern::sequence([
        Pattern::optional(bgp(&[("?subject", ":p1", "?object2")])),
        Pattern::Bgp(bgp(&[("?subject", "?predicate", "?object")])),
    ]));
    assert!(!a.is_isomorphic(&swapped));
}

#[test]
fn mixed_patterns_with_union_inside_optional() {
    let a = query_of(Pattern::sequence([
        Pattern::Bgp(bgp(&[("?s", ":type", ":Person")])),
        Pattern::optional(Pattern::union(
            bgp(&[("?s", ":name", "?name")]),
            bgp(&[("?s", ":label", "?name")]),
        )),
    ]));
    let b = query_of(Pattern::sequence([
        Pattern::Bgp(bgp(&[("?x", ":type", ":Person")])),
        Pattern::optional(Pattern::union(
            bgp(&[("?x", ":label", "?y")]),
            bgp(&[("?x", ":name", "?y")]),
        )),
    ]));
    assert!(a.is_isomorphic(&b));
}

#[test]
fn group_wrappers_are_transparent() {
    let a = query_of(Pattern::group(bgp(&[("?s", ":p", "?o")])));
    let b = query_of(Pattern::group(bgp(&[("?x", ":p", "?y")])));
    assert!(a.is_isomorphic(&b));

    let nested_a = query_of(Pattern::group(Pattern::group(bgp(&[("?s", ":p", "?o")]))));
    let nested_b = query_of(Pattern::group(Pattern::group(bgp(&[("?x", ":p", "?y")]))));
    assert!(nested_a.is_isomorphic(&nested_b));

    // kinds must still line up
    assert!(!a.is_isomorphic(&nested_b));
}

#[test]
fn subqueries_compare_in_their_own_scope() {
    let mut sub_a = Query::new();
    sub_a.add(bgp(&[("?s", ":p", "?o")])).unwrap();
    sub_a.set_projection(["?o"]).unwrap();
    let a = query_of(Pattern::subquery(sub_a));

    let mut sub_b = Query::new();
    sub_b.add(bgp(&[("?subj", ":p", "?obj")])).unwrap();
    sub_b.set_projection(["?obj"]).unwrap();
    let b = query_of(Pattern::subquery(sub_b));

    assert!(a.is_isomorphic(&b));
}

#[test]
fn filters_and_modifiers_carry_no_weight() {
    let mut a = Query::new();
    a.add(Bgp::with_filters(
        [TriplePattern::new("?s", ":p", "?o")],
        [Filter::new("?o > 10")],
    ))
    .unwrap();
    a.set_order_by(OrderBy::new(["?o"], true));
    a.set_projection(["?s", "?o"]).unwrap();

    let mut b = Query::new();
    b.add(Bgp::with_filters(
        [TriplePattern::new("?x", ":p", "?y")],
        [Filter::new("?y < 5")],
    ))
    .unwrap();
    b.set_order_by(OrderBy::new(["?x"], false));
    b.set_projection(["?x"]).unwrap();
    b.set_limit(7);

    assert!(a.is_isomorphic(&b));
}

#[test]
fn kind_mismatch_is_false() {
    let a = query_of(bgp(&[("?s", ":p", "?o")]));
    let b = query_of(Pattern::optional(bgp(&[("?s", ":p", "?o")])));
    assert!(!a.is_isomorphic(&b));
}

mod properties {
    use super::*;
    use proptest::prelude::*;

    const TERMS: [&str; 8] = ["?a", "?b", "?c", "?d", ":p", ":q", "\"v\"", "42"];

    fn build(indices: &[(usize, usize, usize)]) -> Query {
        query_of(Bgp::new(indices.iter().map(|(s, p, o)| {
            TriplePattern::new(
                TERMS[s % TERMS.len()],
                TERMS[p % TERMS.len()],
                TERMS[o % TERMS.len()],
            )
        })))
    }

    proptest! {
        #[test]
        fn reflexive_on_random_bgps(
            indices in proptest::collection::vec((0usize..8, 0usize..8, 0usize..8), 1..7),
        ) {
            let query = build(&indices);
            prop_assert!(query.is_isomorphic(&query));
        }

        #[test]
        fn triple_rotation_never_changes_the_result(
            indices in proptest::collection::vec((0usize..8, 0usize..8, 0usize..8), 1..7),
            other in proptest::collection::vec((0usize..8, 0usize..8, 0usize..8), 1..7),
            rotation in 0usize..8,
        ) {
            let fixed = build(&other);
            let original = build(&indices);

            let mut rotated_indices = indices.clone();
            let len = rotated_indices.len();
            rotated_indices.rotate_left(rotation % len);
            let rotated = build(&rotated_indices);

            prop_assert_eq!(
                original.is_isomorphic(&fixed),
                rotated.is_isomorphic(&fixed)
            );
        }
    }
}
