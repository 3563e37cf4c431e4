//! The order-preserving intermediate representation between the grammar and
//! the pattern tree.
//!
//! Each braced scope is an ordered list of single-kind elements, emitted in
//! textual order by the parser, so mixed scopes (a BGP segment, then an
//! OPTIONAL, then another BGP segment) survive exactly as written.

use crate::Spanned;
use derive_more::From;

#[derive(Debug, Clone)]
pub struct QueryAst {
    pub prefixes: Vec<(String, String)>,
    pub select: SelectAst,
    /// `FROM` graph IRI, brackets stripped.
    pub graph: Option<String>,
    pub group: GroupAst,
    pub group_by: Option<Vec<String>>,
    pub having: Vec<HavingAst>,
    pub order_by: Option<Vec<OrderKeyAst>>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct SelectAst {
    pub distinct: bool,
    pub items: SelectItems,
}

#[derive(Debug, Clone)]
pub enum SelectItems {
    Wildcard,
    Items(Vec<SelectItem>),
}

#[derive(Debug, Clone, From)]
pub enum SelectItem {
    Variable(String),
    Aggregate(AggregateAst),
}

/// `(FUNC(DISTINCT? var|*) AS alias)` in a SELECT clause.
#[derive(Debug, Clone)]
pub struct AggregateAst {
    pub function: String,
    pub distinct: bool,
    pub argument: AggregateArg,
    pub alias: String,
}

#[derive(Debug, Clone)]
pub enum AggregateArg {
    Wildcard,
    Variable(String),
}

/// One braced scope: its elements in textual order.
#[derive(Debug, Clone, Default)]
pub struct GroupAst {
    pub elements: Vec<Spanned<GroupElement>>,
}

#[derive(Debug, Clone)]
pub enum GroupElement {
    /// A run of consecutive triple patterns.
    Bgp(Vec<TripleAst>),
    Union(GroupAst, GroupAst),
    Optional(GroupAst),
    /// A nested brace level with no operator keyword.
    Group(GroupAst),
    Filter(ExprAst),
}

#[derive(Debug, Clone)]
pub struct TripleAst {
    pub subject: String,
    pub predicate: String,
    pub object: String,
}

/// A FILTER expression; rendered back to canonical text when lowered.
#[derive(Debug, Clone)]
pub enum ExprAst {
    Term(String),
    Paren(Box<ExprAst>),
    Binary {
        left: Box<ExprAst>,
        op: &'static str,
        right: Box<ExprAst>,
    },
}

impl ExprAst {
    pub fn binary(left: ExprAst, op: &'static str, right: ExprAst) -> ExprAst {
        ExprAst::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    /// Canonical infix text: explicit parens only where the source had
    /// them, single spaces around operators.
    pub fn to_text(&self) -> String {
        match self {
            ExprAst::Term(term) => term.clone(),
            ExprAst::Paren(inner) => format!("({})", inner.to_text()),
            ExprAst::Binary { left, op, right } => {
                format!("{} {op} {}", left.to_text(), right.to_text())
            }
        }
    }
}

/// A HAVING expression; aggregate-function terms, comparisons and AND/OR
/// combinations.
#[derive(Debug, Clone)]
pub enum HavingAst {
    Comparison {
        left: HavingTerm,
        op: &'static str,
        right: HavingTerm,
    },
    And(Box<HavingAst>, Box<HavingAst>),
    Or(Box<HavingAst>, Box<HavingAst>),
}

#[derive(Debug, Clone)]
pub enum HavingTerm {
    /// `FUNC(arg)`, rendered without any extra parenthesization.
    Aggregate { function: String, argument: String },
    Term(String),
}

impl HavingTerm {
    fn to_text(&self) -> String {
        match self {
            HavingTerm::Aggregate { function, argument } => format!("{function}({argument})"),
            HavingTerm::Term(term) => term.clone(),
        }
    }
}

impl HavingAst {
    /// Canonical text: a lone comparison is unparenthesized; AND/OR
    /// operands are parenthesized.
    pub fn to_text(&self) -> String {
        match self {
            HavingAst::Comparison { left, op, right } => {
                format!("{} {op} {}", left.to_text(), right.to_text())
            }
            HavingAst::And(left, right) => {
                format!("({}) AND ({})", left.to_text(), right.to_text())
            }
            HavingAst::Or(left, right) => {
                format!("({}) OR ({})", left.to_text(), right.to_text())
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct OrderKeyAst {
    pub variable: String,
    pub ascending: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expr_text_keeps_source_parens() {
        let expr = ExprAst::binary(
            ExprAst::Paren(Box::new(ExprAst::binary(
                ExprAst::Term("?x".into()),
                "+",
                ExprAst::Term("1".into()),
            ))),
            ">",
            ExprAst::Term("10".into()),
        );
        assert_eq!(expr.to_text(), "(?x + 1) > 10");
    }

    #[test]
    fn having_text_normalization() {
        let lone = HavingAst::Comparison {
            left: HavingTerm::Aggregate {
                function: "COUNT".into(),
                argument: "?person".into(),
            },
            op: ">",
            right: HavingTerm::Term("10".into()),
        };
        assert_eq!(lone.to_text(), "COUNT(?person) > 10");

        let combined = HavingAst::And(
            Box::new(lone),
            Box::new(HavingAst::Comparison {
                left: HavingTerm::Aggregate {
                    function: "AVG".into(),
                    argument: "?salary".into(),
                },
                op: ">",
                right: HavingTerm::Term("10000".into()),
            }),
        );
        assert_eq!(
            combined.to_text(),
            "(COUNT(?person) > 10) AND (AVG(?salary) > 10000)"
        );
    }
}
