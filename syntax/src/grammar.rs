//! Token-level grammar for the supported SPARQL subset.
//!
//! The parser is written so each braced scope naturally yields its elements
//! in textual order (see [`crate::ast::GroupAst`]); there is no
//! reorder-after-match step.

use crate::ast::{
    AggregateArg, AggregateAst, ExprAst, GroupAst, GroupElement, HavingAst, HavingTerm,
    OrderKeyAst, QueryAst, SelectAst, SelectItem, SelectItems, TripleAst,
};
use crate::{Span, Token};
use chumsky::{input::ValueInput, prelude::*};

fn strip_brackets(iri: &str) -> String {
    iri.trim_start_matches('<').trim_end_matches('>').to_string()
}

pub fn query_parser<'tokens, 'src: 'tokens, I>()
-> impl Parser<'tokens, I, QueryAst, extra::Err<Rich<'tokens, Token<'src>, Span>>>
where
    I: ValueInput<'tokens, Token = Token<'src>, Span = Span>,
{
    let variable = select! { Token::Var(v) => v.to_string() }.labelled("variable");
    let iri = select! {
        Token::Iri(i) => i.to_string(),
        Token::Prefixed(p) => p.to_string(),
    }
    .labelled("IRI");
    let literal = select! {
        Token::Str(s) => s.to_string(),
        Token::Num(n) => n.to_string(),
        Token::Bool(b) => b.to_string(),
    }
    .labelled("literal");

    // subject/predicate position vs. object position
    let term_sp = variable.clone().or(iri.clone());
    let term_obj = variable.clone().or(iri).or(literal);

    let triple = term_sp
        .clone()
        .then(term_sp)
        .then(term_obj.clone())
        .then_ignore(just(Token::Ctrl('.')))
        .map(|((subject, predicate), object)| TripleAst {
            subject,
            predicate,
            object,
        })
        .labelled("triple pattern");

    let bgp = triple
        .repeated()
        .at_least(1)
        .collect::<Vec<_>>()
        .map(GroupElement::Bgp);

    let cmp_op = choice((
        just(Token::Op("<=")).to("<="),
        just(Token::Op(">=")).to(">="),
        just(Token::Op("!=")).to("!="),
        just(Token::Op("=")).to("="),
        just(Token::Op("<")).to("<"),
        just(Token::Op(">")).to(">"),
    ));

    // comparison over arithmetic over parenthesization
    let expr_term = term_obj.clone();
    let expr_cmp_op = cmp_op.clone();
    let expr = recursive(move |expr| {
        let base = expr
            .delimited_by(just(Token::Ctrl('(')), just(Token::Ctrl(')')))
            .map(|inner| ExprAst::Paren(Box::new(inner)))
            .or(expr_term.map(ExprAst::Term));

        let mul_op = just(Token::Ctrl('*'))
            .to("*")
            .or(just(Token::Op("/")).to("/"));
        let product = base.clone().foldl(
            mul_op.then(base).repeated(),
            |left, (op, right)| ExprAst::binary(left, op, right),
        );

        let add_op = just(Token::Op("+"))
            .to("+")
            .or(just(Token::Op("-")).to("-"));
        let sum = product.clone().foldl(
            add_op.then(product).repeated(),
            |left, (op, right)| ExprAst::binary(left, op, right),
        );

        sum.clone()
            .then(expr_cmp_op.then(sum).or_not())
            .map(|(left, comparison)| match comparison {
                Some((op, right)) => ExprAst::binary(left, op, right),
                None => left,
            })
    });

    let filter_element = just(Token::FilterKw)
        .ignore_then(expr.delimited_by(just(Token::Ctrl('(')), just(Token::Ctrl(')'))))
        .map(GroupElement::Filter)
        .labelled("FILTER");

    let group = recursive(move |group| {
        let braced = group.delimited_by(just(Token::Ctrl('{')), just(Token::Ctrl('}')));

        let union = braced
            .clone()
            .then_ignore(just(Token::UnionKw))
            .then(braced.clone())
            .map(|(left, right)| GroupElement::Union(left, right));

        let optional = just(Token::OptionalKw)
            .ignore_then(braced.clone())
            .map(GroupElement::Optional);

        let nested = braced.map(GroupElement::Group);

        let element = choice((bgp, union, optional, nested, filter_element));

        element
            .map_with(|element, e| (element, e.span()))
            .repeated()
            .collect::<Vec<_>>()
            .map(|elements| GroupAst { elements })
    });

    let aggregate_fn = select! { Token::Agg(f) => f.to_string() };

    let aggregate = just(Token::Ctrl('('))
        .ignore_then(aggregate_fn.clone())
        .then_ignore(just(Token::Ctrl('(')))
        .then(just(Token::Distinct).or_not())
        .then(
            just(Token::Ctrl('*'))
                .to(AggregateArg::Wildcard)
                .or(variable.clone().map(AggregateArg::Variable)),
        )
        .then_ignore(just(Token::Ctrl(')')))
        .then_ignore(just(Token::As))
        .then(variable.clone())
        .then_ignore(just(Token::Ctrl(')')))
        .map(|(((function, distinct), argument), alias)| {
            SelectItem::Aggregate(AggregateAst {
                function,
                distinct: distinct.is_some(),
                argument,
                alias,
            })
        })
        .labelled("aggregate expression");

    let select_item = variable.clone().map(SelectItem::Variable).or(aggregate);

    let select = just(Token::Select)
        .ignore_then(just(Token::Distinct).or_not())
        .then(
            just(Token::Ctrl('*')).to(SelectItems::Wildcard).or(
                select_item
                    .repeated()
                    .at_least(1)
                    .collect::<Vec<_>>()
                    .map(SelectItems::Items),
            ),
        )
        .map(|(distinct, items)| SelectAst {
            distinct: distinct.is_some(),
            items,
        });

    let prefix_decl = just(Token::Prefix)
        .ignore_then(select! { Token::Prefixed(p) => p.to_string() })
        .then(select! { Token::Iri(i) => i.to_string() })
        .map(|(prefix, iri)| {
            (
                prefix.trim_end_matches(':').to_string(),
                strip_brackets(&iri),
            )
        })
        .labelled("PREFIX declaration");

    let from = just(Token::From)
        .ignore_then(select! { Token::Iri(i) => i.to_string() })
        .map(|iri| strip_brackets(&iri));

    let group_by = just(Token::Group)
        .ignore_then(just(Token::By))
        .ignore_then(variable.clone().repeated().at_least(1).collect::<Vec<_>>());

    let aggregate_term = aggregate_fn
        .then(
            variable
                .clone()
                .or(just(Token::Ctrl('*')).to("*".to_string()))
                .delimited_by(just(Token::Ctrl('(')), just(Token::Ctrl(')'))),
        )
        .map(|(function, argument)| HavingTerm::Aggregate { function, argument });
    let having_operand = aggregate_term.or(term_obj.map(HavingTerm::Term));

    let having_comparison = having_operand
        .clone()
        .then(cmp_op)
        .then(having_operand)
        .map(|((left, op), right)| HavingAst::Comparison { left, op, right });

    let logic_op = choice((
        just(Token::And).to(true),
        just(Token::Op("&&")).to(true),
        just(Token::Or).to(false),
        just(Token::Op("||")).to(false),
    ));

    let having_expr = recursive(move |having_expr| {
        let atom = having_comparison
            .or(having_expr.delimited_by(just(Token::Ctrl('(')), just(Token::Ctrl(')'))));
        atom.clone()
            .foldl(logic_op.then(atom).repeated(), |left, (is_and, right)| {
                if is_and {
                    HavingAst::And(Box::new(left), Box::new(right))
                } else {
                    HavingAst::Or(Box::new(left), Box::new(right))
                }
            })
    });

    let having_clause = just(Token::Having)
        .ignore_then(having_expr.delimited_by(just(Token::Ctrl('(')), just(Token::Ctrl(')'))));

    let order_key = variable
        .clone()
        .map(|variable| OrderKeyAst {
            variable,
            ascending: true,
        })
        .or(just(Token::Asc)
            .to(true)
            .or(just(Token::Desc).to(false))
            .then(
                variable
                    .clone()
                    .delimited_by(just(Token::Ctrl('(')), just(Token::Ctrl(')'))),
            )
            .map(|(ascending, variable)| OrderKeyAst {
                variable,
                ascending,
            }));

    let order_by = just(Token::Order)
        .ignore_then(just(Token::By))
        .ignore_then(order_key.repeated().at_least(1).collect::<Vec<_>>());

    let number = select! { Token::Num(n) => n };
    let limit = just(Token::Limit).ignore_then(number.clone().try_map(|n: &str, span| {
        n.parse::<u64>()
            .map_err(|_| Rich::custom(span, format!("invalid LIMIT value `{n}`")))
    }));
    let offset = just(Token::Offset).ignore_then(number.try_map(|n: &str, span| {
        n.parse::<u64>()
            .map_err(|_| Rich::custom(span, format!("invalid OFFSET value `{n}`")))
    }));

    prefix_decl
        .repeated()
        .collect::<Vec<_>>()
        .then(select)
        .then(from.or_not())
        .then_ignore(just(Token::Where))
        .then(group.delimited_by(just(Token::Ctrl('{')), just(Token::Ctrl('}'))))
        .then(group_by.or_not())
        .then(having_clause.repeated().collect::<Vec<_>>())
        .then(order_by.or_not())
        .then(limit.or_not())
        .then(offset.or_not())
        .then_ignore(end())
        .map(
            |(
                (((((((prefixes, select), graph), group), group_by), having), order_by), limit),
                offset,
            )| QueryAst {
                prefixes,
                select,
                graph,
                group,
                group_by,
                having,
                order_by,
                limit,
                offset,
            },
        )
}
