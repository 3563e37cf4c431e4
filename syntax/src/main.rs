//! Parses a SPARQL query from a file (or a built-in sample), prints the
//! reserialized query plus a structural summary, and renders parse errors
//! as labeled reports.
//!
//! Run with: cargo run -p sparqlkit_syntax -- path/to/query.rq

use ariadne::{Color, Label, Report, ReportKind, sources};
use chumsky::prelude::*;
use sparqlkit::classify_shape;
use sparqlkit_syntax::{ParseOptions, grammar, lexer, lower};
use std::{env, fs};

const SAMPLE: &str = "\
SELECT DISTINCT ?person ?name
WHERE {
  ?person :name ?name .
  ?person :age ?age .
  FILTER(?age > 25)
  OPTIONAL { ?person :email ?email . }
  { ?person :likes ?hobby . } UNION { ?hobby :likedBy ?person . }
}
ORDER BY ?name DESC(?age)
LIMIT 10
";

fn main() {
    let (filename, src) = match env::args().nth(1) {
        Some(path) => {
            let src = fs::read_to_string(&path).expect("Failed to read file");
            (path, src)
        }
        None => ("<sample>".to_string(), SAMPLE.to_string()),
    };

    let (tokens, errs) = lexer().parse(src.as_str()).into_output_errors();

    let parse_errs = if let Some(tokens) = &tokens {
        let (ast, parse_errs) = grammar::query_parser()
            .parse(
                tokens
                    .as_slice()
                    .map((src.len()..src.len()).into(), |(t, s)| (t, s)),
            )
            .into_output_errors();

        if let Some(ast) = ast.filter(|_| errs.len() + parse_errs.len() == 0) {
            match lower::lower_query(ast, ParseOptions::default()) {
                Ok(query) => {
                    println!("{}", query.to_query_string());
                    println!();
                    println!("triple patterns: {}", query.triple_count());
                    println!("basic graph patterns: {}", query.bgp_count());
                    println!("variables: {}", query.variables().join(" "));
                    let triples: Vec<_> =
                        query.triples().into_iter().cloned().collect();
                    println!("shape: {}", classify_shape(&triples));
                }
                Err(report) => eprintln!("{report:?}"),
            }
        }

        parse_errs
    } else {
        Vec::new()
    };

    errs.into_iter()
        .map(|e| e.map_token(|c| c.to_string()))
        .chain(
            parse_errs
                .into_iter()
                .map(|e| e.map_token(|tok| tok.to_string())),
        )
        .for_each(|e| {
            Report::build(ReportKind::Error, (filename.clone(), e.span().into_range()))
                .with_config(ariadne::Config::new().with_index_type(ariadne::IndexType::Byte))
                .with_message(e.to_string())
                .with_label(
                    Label::new((filename.clone(), e.span().into_range()))
                        .with_message(e.reason().to_string())
                        .with_color(Color::Red),
                )
                .with_labels(e.contexts().map(|(label, span)| {
                    Label::new((filename.clone(), span.into_range()))
                        .with_message(format!("while parsing this {label}"))
                        .with_color(Color::Yellow)
                }))
                .finish()
                .print(sources([(filename.clone(), src.clone())]))
                .unwrap()
        });
}
