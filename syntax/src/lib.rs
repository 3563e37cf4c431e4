//! Grammar support for `sparqlkit`: a lexer and parser for the supported
//! SPARQL subset (basic patterns, UNION, OPTIONAL, nested groups, filters,
//! aggregation, GROUP BY/HAVING, ORDER BY, LIMIT/OFFSET, prefixes).
//!
//! Parsing is a three-stage pipeline: [`lexer`] turns text into spanned
//! tokens, [`grammar::query_parser`] turns tokens into an order-preserving
//! [`ast::QueryAst`], and [`lower`] builds the final [`sparqlkit::Query`].
//! Parsing is all-or-nothing: any failure yields a [`ParseError`] and no
//! query.

pub mod ast;
pub mod grammar;
pub mod lower;

use chumsky::prelude::*;
use error_stack::report;
use sparqlkit::Query;
use std::fmt;
use thiserror::Error;

pub type Span = SimpleSpan;
pub type Spanned<T> = (T, Span);

#[derive(Clone, Debug, PartialEq)]
pub enum Token<'src> {
    /// `?name`, sigil included.
    Var(&'src str),
    /// `<iri>`, brackets included.
    Iri(&'src str),
    /// `pfx:local`, `:local` or `pfx:`.
    Prefixed(&'src str),
    /// Quoted string, quotes included.
    Str(&'src str),
    Num(&'src str),
    Bool(bool),
    /// `= != < > <= >= + - / && ||`
    Op(&'src str),
    /// `{ } ( ) . , *`
    Ctrl(char),
    Ident(&'src str),
    /// COUNT / SUM / MIN / MAX / AVG
    Agg(&'src str),
    Select,
    Distinct,
    Where,
    FilterKw,
    OptionalKw,
    UnionKw,
    Prefix,
    From,
    Order,
    Group,
    By,
    Having,
    Limit,
    Offset,
    As,
    Asc,
    Desc,
    And,
    Or,
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Var(s)
            | Token::Iri(s)
            | Token::Prefixed(s)
            | Token::Str(s)
            | Token::Num(s)
            | Token::Op(s)
            | Token::Ident(s)
            | Token::Agg(s) => write!(f, "{s}"),
            Token::Bool(b) => write!(f, "{b}"),
            Token::Ctrl(c) => write!(f, "{c}"),
            Token::Select => write!(f, "SELECT"),
            Token::Distinct => write!(f, "DISTINCT"),
            Token::Where => write!(f, "WHERE"),
            Token::FilterKw => write!(f, "FILTER"),
            Token::OptionalKw => write!(f, "OPTIONAL"),
            Token::UnionKw => write!(f, "UNION"),
            Token::Prefix => write!(f, "PREFIX"),
            Token::From => write!(f, "FROM"),
            Token::Order => write!(f, "ORDER"),
            Token::Group => write!(f, "GROUP"),
            Token::By => write!(f, "BY"),
            Token::Having => write!(f, "HAVING"),
            Token::Limit => write!(f, "LIMIT"),
            Token::Offset => write!(f, "OFFSET"),
            Token::As => write!(f, "AS"),
            Token::Asc => write!(f, "ASC"),
            Token::Desc => write!(f, "DESC"),
            Token::And => write!(f, "AND"),
            Token::Or => write!(f, "OR"),
        }
    }
}

pub fn lexer<'src>()
-> impl Parser<'src, &'src str, Vec<Spanned<Token<'src>>>, extra::Err<Rich<'src, char, Span>>> {
    // ?name
    let variable = just('?')
        .then(text::ascii::ident())
        .to_slice()
        .map(Token::Var);

    // <http://...> with no spaces inside, so `<` followed by whitespace falls
    // through to the comparison operator below
    let iri = just('<')
        .then(none_of("<> \t\r\n").repeated().at_least(1))
        .then(just('>'))
        .to_slice()
        .map(Token::Iri);

    let string_double = just('"')
        .then(none_of("\"").repeated())
        .then(just('"'))
        .to_slice()
        .map(Token::Str);
    let string_single = just('\'')
        .then(none_of("'").repeated())
        .then(just('\''))
        .to_slice()
        .map(Token::Str);

    let num = text::int(10)
        .then(just('.').then(text::digits(10)).or_not())
        .to_slice()
        .map(Token::Num);

    // pfx:local, :local, pfx:
    let prefixed = text::ascii::ident()
        .or_not()
        .then(just(':'))
        .then(text::ascii::ident().or_not())
        .to_slice()
        .map(Token::Prefixed);

    let ident = text::ascii::ident().map(|s: &str| match s {
        "SELECT" => Token::Select,
        "DISTINCT" => Token::Distinct,
        "WHERE" => Token::Where,
        "FILTER" => Token::FilterKw,
        "OPTIONAL" => Token::OptionalKw,
        "UNION" => Token::UnionKw,
        "PREFIX" => Token::Prefix,
        "FROM" => Token::From,
        "ORDER" => Token::Order,
        "GROUP" => Token::Group,
        "BY" => Token::By,
        "HAVING" => Token::Having,
        "LIMIT" => Token::Limit,
        "OFFSET" => Token::Offset,
        "AS" => Token::As,
        "ASC" => Token::Asc,
        "DESC" => Token::Desc,
        "AND" => Token::And,
        "OR" => Token::Or,
        "COUNT" | "SUM" | "MIN" | "MAX" | "AVG" => Token::Agg(s),
        "true" => Token::Bool(true),
        "false" => Token::Bool(false),
        _ => Token::Ident(s),
    });

    let op = choice((
        just("<="),
        just(">="),
        just("!="),
        just("&&"),
        just("||"),
        just("="),
        just("<"),
        just(">"),
        just("+"),
        just("-"),
        just("/"),
    ))
    .map(Token::Op);

    let ctrl = one_of("{}().,*").map(Token::Ctrl);

    let token = choice((
        variable,
        iri,
        string_double,
        string_single,
        num,
        prefixed,
        ident,
        op,
        ctrl,
    ));

    let comment = just('#')
        .then(any().and_is(just('\n').not()).repeated())
        .padded();

    token
        .map_with(|tok, e| (tok, e.span()))
        .padded_by(comment.repeated())
        .padded()
        // If we encounter an error, skip and attempt to lex the next character as a token instead
        .recover_with(skip_then_retry_until(any().ignored(), end()))
        .repeated()
        .collect()
}

/// How the parser handles syntactic nesting.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParseOptions {
    /// Keep every brace level as an explicit group wrapper instead of
    /// collapsing redundant nesting.
    pub preserve_nesting: bool,
}

impl ParseOptions {
    pub fn preserve_nesting() -> Self {
        ParseOptions {
            preserve_nesting: true,
        }
    }
}

/// One spanned message out of the lexer or parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub message: String,
    pub span: std::ops::Range<usize>,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("query text does not match the grammar: {}", first_message(.diagnostics))]
    Grammar { diagnostics: Vec<Diagnostic> },
    #[error("query construction failed")]
    Construction,
}

fn first_message(diagnostics: &[Diagnostic]) -> &str {
    diagnostics
        .first()
        .map(|d| d.message.as_str())
        .unwrap_or("unknown error")
}

pub type ParseResult<T> = error_stack::Result<T, ParseError>;

/// Parses query text into a [`Query`] with default options (redundant
/// nesting collapsed).
pub fn parse_query(src: &str) -> ParseResult<Query> {
    parse_query_with(src, ParseOptions::default())
}

pub fn parse_query_with(src: &str, options: ParseOptions) -> ParseResult<Query> {
    let (tokens, lex_errors) = lexer().parse(src).into_output_errors();
    let diagnostics: Vec<Diagnostic> = lex_errors
        .iter()
        .map(|e| Diagnostic {
            message: e.to_string(),
            span: e.span().into_range(),
        })
        .collect();
    let tokens = match tokens {
        Some(tokens) if diagnostics.is_empty() => tokens,
        _ => return Err(report!(ParseError::Grammar { diagnostics })),
    };

    let (ast, parse_errors) = grammar::query_parser()
        .parse(
            tokens
                .as_slice()
                .map((src.len()..src.len()).into(), |(t, s)| (t, s)),
        )
        .into_output_errors();
    let diagnostics: Vec<Diagnostic> = parse_errors
        .iter()
        .map(|e| Diagnostic {
            message: e.to_string(),
            span: e.span().into_range(),
        })
        .collect();
    let ast = match ast {
        Some(ast) if diagnostics.is_empty() => ast,
        _ => return Err(report!(ParseError::Grammar { diagnostics })),
    };

    lower::lower_query(ast, options)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(src: &str) -> Vec<Token<'_>> {
        lexer()
            .parse(src)
            .into_result()
            .expect("lexes")
            .into_iter()
            .map(|(t, _)| t)
            .collect()
    }

    #[test]
    fn lexes_terms() {
        assert_eq!(
            lex("?s :p <http://example.org/x> \"lit\" 42 true ."),
            vec![
                Token::Var("?s"),
                Token::Prefixed(":p"),
                Token::Iri("<http://example.org/x>"),
                Token::Str("\"lit\""),
                Token::Num("42"),
                Token::Bool(true),
                Token::Ctrl('.'),
            ]
        );
    }

    #[test]
    fn comparison_is_not_an_iri() {
        assert_eq!(
            lex("?o < 5"),
            vec![Token::Var("?o"), Token::Op("<"), Token::Num("5")]
        );
    }

    #[test]
    fn keywords_and_prefixed_names() {
        assert_eq!(
            lex("PREFIX foaf: <http://xmlns.com/foaf/0.1/>"),
            vec![
                Token::Prefix,
                Token::Prefixed("foaf:"),
                Token::Iri("<http://xmlns.com/foaf/0.1/>"),
            ]
        );
        assert_eq!(lex("rdf:type"), vec![Token::Prefixed("rdf:type")]);
    }

    #[test]
    fn comments_are_skipped() {
        assert_eq!(
            lex("?s # subject\n?p"),
            vec![Token::Var("?s"), Token::Var("?p")]
        );
    }
}
