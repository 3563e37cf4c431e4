//! Structural equivalence of pattern trees up to consistent variable
//! renaming and UNION-branch commutativity.
//!
//! The search is a backtracking bipartite match per BGP under one shared,
//! injective variable mapping; branches explore snapshots of the mapping
//! and commit them on success. Worst case is exponential in per-BGP triple
//! count; fine for real queries (tens of triples), not for adversarial
//! input.

use crate::pattern::{PatternKey, PatternKind, PatternTree, TriplePattern, variable_name};
use crate::query::Query;
use crate::util::log;
use std::collections::HashMap;

/// An injective partial mapping from source variable names to target
/// variable names, maintained in both directions so injectivity checks are
/// O(1).
#[derive(Debug, Clone, Default)]
pub(crate) struct VarMapping {
    forward: HashMap<String, String>,
    reverse: HashMap<String, String>,
}

impl VarMapping {
    pub(crate) fn new() -> Self {
        VarMapping::default()
    }

    /// Records `source -> target` if it is consistent with the mapping so
    /// far: an already-mapped source must map to the same target, and a
    /// target may be the image of at most one source.
    pub(crate) fn unify(&mut self, source: &str, target: &str) -> bool {
        if let Some(existing) = self.forward.get(source) {
            return existing == target;
        }
        if self.reverse.contains_key(target) {
            return false;
        }
        self.forward.insert(source.to_string(), target.to_string());
        self.reverse.insert(target.to_string(), source.to_string());
        true
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.forward.len()
    }
}

impl Query {
    /// `true` iff the two queries' WHERE trees are structurally identical
    /// under some injective variable renaming, treating UNION branches as
    /// unordered. Filters, solution modifiers, projection and limit/offset
    /// carry no weight.
    pub fn is_isomorphic(&self, other: &Query) -> bool {
        let mut mapping = VarMapping::new();
        trees_isomorphic(self.tree(), other.tree(), &mut mapping)
    }
}

pub(crate) fn trees_isomorphic(a: &PatternTree, b: &PatternTree, mapping: &mut VarMapping) -> bool {
    match (a.root(), b.root()) {
        (None, None) => true,
        (Some(ra), Some(rb)) => compare(a, ra, b, rb, mapping),
        _ => false,
    }
}

fn compare(
    a: &PatternTree,
    ka: PatternKey,
    b: &PatternTree,
    kb: PatternKey,
    mapping: &mut VarMapping,
) -> bool {
    match (a.kind(ka), b.kind(kb)) {
        (Some(PatternKind::Bgp(bgp_a)), Some(PatternKind::Bgp(bgp_b))) => {
            compare_bgps(&bgp_a.triples, &bgp_b.triples, mapping)
        }
        (
            Some(PatternKind::Union {
                left: la,
                right: ra,
            }),
            Some(PatternKind::Union {
                left: lb,
                right: rb,
            }),
        ) => {
            // UNION is commutative: try both pairings on snapshots of the
            // mapping, committing whichever succeeds.
            let mut snapshot = mapping.clone();
            if compare(a, *la, b, *lb, &mut snapshot) && compare(a, *ra, b, *rb, &mut snapshot) {
                *mapping = snapshot;
                return true;
            }
            let mut snapshot = mapping.clone();
            if compare(a, *la, b, *rb, &mut snapshot) && compare(a, *ra, b, *lb, &mut snapshot) {
                *mapping = snapshot;
                return true;
            }
            false
        }
        (
            Some(PatternKind::Optional { inner: ia }),
            Some(PatternKind::Optional { inner: ib }),
        ) => compare(a, *ia, b, *ib, mapping),
        // The group wrapper carries no equivalence weight.
        (
            Some(PatternKind::Group { inner: ia, .. }),
            Some(PatternKind::Group { inner: ib, .. }),
        ) => compare(a, *ia, b, *ib, mapping),
        // Variable scopes are not unified across a subquery boundary.
        (Some(PatternKind::SubQuery(qa)), Some(PatternKind::SubQuery(qb))) => {
            qa.is_isomorphic(qb)
        }
        (Some(PatternKind::Sequence(xs)), Some(PatternKind::Sequence(ys))) => {
            // Sibling juxtaposition is order-significant, unlike UNION.
            xs.len() == ys.len()
                && xs
                    .iter()
                    .zip(ys.iter())
                    .all(|(x, y)| compare(a, *x, b, *y, mapping))
        }
        _ => false,
    }
}

fn compare_bgps(a: &[TriplePattern], b: &[TriplePattern], mapping: &mut VarMapping) -> bool {
    if a.len() != b.len() {
        log::trace!(
            "BGP size mismatch: {} vs {} triples",
            a.len(),
            b.len()
        );
        return false;
    }
    let mut used = vec![false; b.len()];
    match_triples(a, b, 0, &mut used, mapping)
}

fn match_triples(
    a: &[TriplePattern],
    b: &[TriplePattern],
    index: usize,
    used: &mut Vec<bool>,
    mapping: &mut VarMapping,
) -> bool {
    if index == a.len() {
        return true;
    }
    for (candidate, triple_b) in b.iter().enumerate() {
        if used[candidate] {
            continue;
        }
        let mut attempt = mapping.clone();
        if compare_triples(&a[index], triple_b, &mut attempt) {
            used[candidate] = true;
            if match_triples(a, b, index + 1, used, &mut attempt) {
                *mapping = attempt;
                return true;
            }
            // backtrack
            used[candidate] = false;
        }
    }
    false
}

fn compare_triples(a: &TriplePattern, b: &TriplePattern, mapping: &mut VarMapping) -> bool {
    compare_terms(&a.subject, &b.subject, mapping)
        && compare_terms(&a.predicate, &b.predicate, mapping)
        && compare_terms(&a.object, &b.object, mapping)
}

fn compare_terms(a: &str, b: &str, mapping: &mut VarMapping) -> bool {
    match (variable_name(a), variable_name(b)) {
        (Some(va), Some(vb)) => mapping.unify(va, vb),
        _ => a == b,
    }
}
