//! Topological classification of a flat triple block.
//!
//! Triples are treated as directed edges (subject -> object, labeled by
//! predicate) over the graph of terms; duplicate endpoint pairs collapse to
//! one edge, as in a simple digraph.

use crate::pattern::{Bgp, TriplePattern};
use petgraph::Direction;
use petgraph::graphmap::{DiGraphMap, UnGraphMap};
use petgraph::visit::Bfs;
use std::fmt;

/// The shape of the term graph spanned by a set of triple patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternShape {
    Empty,
    SingleTriple,
    Path,
    Star,
    Cycle,
    Tree,
    Flower,
    Complex,
}

impl fmt::Display for PatternShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PatternShape::Empty => "Empty",
            PatternShape::SingleTriple => "Single-triple",
            PatternShape::Path => "Path",
            PatternShape::Star => "Star",
            PatternShape::Cycle => "Cycle",
            PatternShape::Tree => "Tree",
            PatternShape::Flower => "Flower",
            PatternShape::Complex => "Complex",
        };
        write!(f, "{name}")
    }
}

impl Bgp {
    pub fn shape(&self) -> PatternShape {
        classify_shape(&self.triples)
    }
}

pub fn classify_shape(triples: &[TriplePattern]) -> PatternShape {
    if triples.is_empty() {
        return PatternShape::Empty;
    }
    if triples.len() == 1 {
        return PatternShape::SingleTriple;
    }

    let mut directed: DiGraphMap<&str, ()> = DiGraphMap::new();
    let mut undirected: UnGraphMap<&str, ()> = UnGraphMap::new();
    for triple in triples {
        directed.add_edge(&triple.subject, &triple.object, ());
        undirected.add_edge(&triple.subject, &triple.object, ());
    }

    let in_degree = |n: &str| directed.neighbors_directed(n, Direction::Incoming).count();
    let out_degree = |n: &str| directed.neighbors_directed(n, Direction::Outgoing).count();
    let degree = |n: &str| undirected.neighbors(n).count();

    // Cycle: as many nodes as triples, every node passed through exactly once.
    if directed.node_count() == triples.len()
        && directed.nodes().all(|n| in_degree(n) == 1 && out_degree(n) == 1)
    {
        return PatternShape::Cycle;
    }

    // Path: a linear chain with exactly two endpoints.
    if directed.nodes().all(|n| in_degree(n) <= 1 && out_degree(n) <= 1) {
        let endpoints = directed
            .nodes()
            .filter(|n| in_degree(n) + out_degree(n) == 1)
            .count();
        if endpoints == 2 {
            return PatternShape::Path;
        }
    }

    // Star: one center, every other node a leaf, no degree-2 nodes.
    let degrees: Vec<usize> = undirected.nodes().map(degree).collect();
    if degrees.iter().filter(|d| **d > 1).count() == 1
        && degrees.iter().all(|d| *d == 1 || *d > 2)
    {
        return PatternShape::Star;
    }

    let connected = is_connected(&undirected);
    let acyclic = undirected.edge_count() == undirected.node_count() - 1;
    if connected && acyclic {
        let hubs: Vec<&str> = undirected.nodes().filter(|n| degree(n) > 2).collect();
        if hubs.is_empty() {
            return PatternShape::Path;
        }
        // A flower is a tree with one hub and exactly one stem: a branch of
        // length >= 2 that is itself a simple path.
        if hubs.len() == 1 && stem_count(&undirected, hubs[0]) == 1 {
            return PatternShape::Flower;
        }
        return PatternShape::Tree;
    }

    PatternShape::Complex
}

fn is_connected(graph: &UnGraphMap<&str, ()>) -> bool {
    let Some(start) = graph.nodes().next() else {
        return true;
    };
    component_of(graph, start).len() == graph.node_count()
}

fn component_of<'a>(graph: &UnGraphMap<&'a str, ()>, start: &'a str) -> Vec<&'a str> {
    let mut component = Vec::new();
    let mut bfs = Bfs::new(graph, start);
    while let Some(node) = bfs.next(graph) {
        component.push(node);
    }
    component
}

fn stem_count<'a>(graph: &UnGraphMap<&'a str, ()>, hub: &'a str) -> usize {
    let mut pruned = graph.clone();
    pruned.remove_node(hub);

    let mut stems = 0;
    for neighbor in graph.neighbors(hub) {
        let component = component_of(&pruned, neighbor);
        if component.len() > 1 {
            let degrees: Vec<usize> =
                component.iter().map(|n| pruned.neighbors(n).count()).collect();
            let is_path = degrees.iter().all(|d| *d <= 2)
                && degrees.iter().filter(|d| **d == 1).count() == 2;
            if is_path {
                stems += 1;
            }
        }
    }
    stems
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triples(terms: &[(&str, &str, &str)]) -> Vec<TriplePattern> {
        terms.iter()
            .map(|(s, p, o)| TriplePattern::new(*s, *p, *o))
            .collect()
    }

    #[test]
    fn empty_and_single() {
        assert_eq!(classify_shape(&[]), PatternShape::Empty);
        let t = triples(&[("?s", "?p", "?o")]);
        assert_eq!(classify_shape(&t), PatternShape::SingleTriple);
        assert_eq!(Bgp::new(t).shape().to_string(), "Single-triple");
    }

    #[test]
    fn path() {
        let t = triples(&[
            ("?s1", "?p1", "?o1"),
            ("?o1", "?p2", "?o2"),
            ("?o2", "?p3", "?o3"),
        ]);
        assert_eq!(classify_shape(&t), PatternShape::Path);
    }

    #[test]
    fn star_out_and_in() {
        let out = triples(&[
            ("?s", "?p1", "?o1"),
            ("?s", "?p2", "?o2"),
            ("?s", "?p3", "?o3"),
            ("?s", "?p4", "?o4"),
        ]);
        assert_eq!(classify_shape(&out), PatternShape::Star);

        let inward = triples(&[
            ("?s1", "?p1", "?o"),
            ("?s2", "?p2", "?o"),
            ("?s3", "?p3", "?o"),
            ("?s4", "?p4", "?o"),
        ]);
        assert_eq!(classify_shape(&inward), PatternShape::Star);
    }

    #[test]
    fn cycle() {
        let t = triples(&[
            ("?a", "?p1", "?b"),
            ("?b", "?p2", "?c"),
            ("?c", "?p3", "?a"),
        ]);
        assert_eq!(classify_shape(&t), PatternShape::Cycle);
    }

    #[test]
    fn tree() {
        let t = triples(&[
            ("?root", "?p1", "?child1"),
            ("?root", "?p2", "?child2"),
            ("?child1", "?p3", "?grandchild1"),
            ("?child1", "?p4", "?grandchild2"),
            ("?child2", "?p5", "?grandchild3"),
            ("?child2", "?p6", "?grandchild4"),
        ]);
        assert_eq!(classify_shape(&t), PatternShape::Tree);
    }

    #[test]
    fn flower() {
        let t = triples(&[
            ("?s1", "?p1", "?s2"),
            ("?s2", "?p2", "?s3"),
            ("?s3", "?p3", "?center"),
            ("?center", "?p4", "?o1"),
            ("?center", "?p5", "?o2"),
            ("?center", "?p6", "?o3"),
        ]);
        assert_eq!(classify_shape(&t), PatternShape::Flower);
    }

    #[test]
    fn complex() {
        let t = triples(&[
            ("?s1", "?p1", "?o1"),
            ("?o1", "?p2", "?o2"),
            ("?o2", "?p3", "?s1"),
            ("?o2", "?p4", "?o3"),
            ("?o3", "?p5", "?o4"),
            ("?o4", "?p6", "?o2"),
        ]);
        assert_eq!(classify_shape(&t), PatternShape::Complex);
    }
}
