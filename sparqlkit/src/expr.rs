//! A small AST for FILTER expressions plus a regex-based fallback parser.
//!
//! This is a self-contained utility: query filters are carried as free-form
//! expression strings, and this module is the escape hatch for callers that
//! want to build or inspect them structurally.

use regex_lite::Regex;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    And,
    Or,
    Equals,
    NotEquals,
    LessThan,
    LessThanEquals,
    GreaterThan,
    GreaterThanEquals,
    Plus,
    Minus,
    Multiply,
    Divide,
    In,
}

impl BinaryOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOperator::And => "&&",
            BinaryOperator::Or => "||",
            BinaryOperator::Equals => "=",
            BinaryOperator::NotEquals => "!=",
            BinaryOperator::LessThan => "<",
            BinaryOperator::LessThanEquals => "<=",
            BinaryOperator::GreaterThan => ">",
            BinaryOperator::GreaterThanEquals => ">=",
            BinaryOperator::Plus => "+",
            BinaryOperator::Minus => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::In => "IN",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Not,
    Negative,
    Positive,
}

impl UnaryOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOperator::Not => "!",
            UnaryOperator::Negative => "-",
            UnaryOperator::Positive => "+",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    String {
        value: String,
        language: Option<String>,
        datatype: Option<String>,
    },
    Number(String),
    Boolean(bool),
    Uri(String),
}

impl LiteralValue {
    pub fn string(value: impl Into<String>) -> Self {
        LiteralValue::String {
            value: value.into(),
            language: None,
            datatype: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterExpr {
    /// A variable, including the `?` sigil.
    Variable(String),
    Literal(LiteralValue),
    Binary {
        left: Box<FilterExpr>,
        operator: BinaryOperator,
        right: Box<FilterExpr>,
    },
    Unary {
        operator: UnaryOperator,
        operand: Box<FilterExpr>,
    },
    Call {
        function: String,
        arguments: Vec<FilterExpr>,
    },
}

impl FilterExpr {
    pub fn to_sparql(&self) -> String {
        match self {
            FilterExpr::Variable(name) => name.clone(),
            FilterExpr::Literal(lit) => match lit {
                LiteralValue::String {
                    value,
                    language,
                    datatype,
                } => {
                    let mut out = format!("\"{value}\"");
                    if let Some(language) = language {
                        out.push('@');
                        out.push_str(language);
                    } else if let Some(datatype) = datatype {
                        out.push_str("^^<");
                        out.push_str(datatype);
                        out.push('>');
                    }
                    out
                }
                LiteralValue::Number(n) => n.clone(),
                LiteralValue::Boolean(b) => b.to_string(),
                LiteralValue::Uri(uri) => format!("<{uri}>"),
            },
            FilterExpr::Binary {
                left,
                operator: BinaryOperator::In,
                right,
            } => {
                // the value list is carried as a synthetic `List` call
                let values = match right.as_ref() {
                    FilterExpr::Call {
                        function,
                        arguments,
                    } if function == "List" => arguments
                        .iter()
                        .map(FilterExpr::to_sparql)
                        .collect::<Vec<_>>()
                        .join(", "),
                    other => other.to_sparql(),
                };
                format!("{} IN ({values})", left.to_sparql())
            }
            FilterExpr::Binary {
                left,
                operator,
                right,
            } => format!(
                "({} {} {})",
                left.to_sparql(),
                operator.symbol(),
                right.to_sparql()
            ),
            FilterExpr::Unary { operator, operand } => {
                format!("{}({})", operator.symbol(), operand.to_sparql())
            }
            FilterExpr::Call {
                function,
                arguments,
            } => {
                let args = arguments
                    .iter()
                    .map(FilterExpr::to_sparql)
                    .collect::<Vec<_>>()
                    .join(", ");
                if function == "EXISTS" || function == "NOT EXISTS" {
                    format!("{function} {{ {args} }}")
                } else {
                    format!("{function}({args})")
                }
            }
        }
    }
}

impl fmt::Display for FilterExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_sparql())
    }
}

pub fn variable(name: impl Into<String>) -> FilterExpr {
    FilterExpr::Variable(name.into())
}

fn binary(left: FilterExpr, operator: BinaryOperator, right: FilterExpr) -> FilterExpr {
    FilterExpr::Binary {
        left: Box::new(left),
        operator,
        right: Box::new(right),
    }
}

pub fn equals(left: FilterExpr, right: FilterExpr) -> FilterExpr {
    binary(left, BinaryOperator::Equals, right)
}

pub fn not_equals(left: FilterExpr, right: FilterExpr) -> FilterExpr {
    binary(left, BinaryOperator::NotEquals, right)
}

pub fn less_than(left: FilterExpr, right: FilterExpr) -> FilterExpr {
    binary(left, BinaryOperator::LessThan, right)
}

pub fn less_than_equals(left: FilterExpr, right: FilterExpr) -> FilterExpr {
    binary(left, BinaryOperator::LessThanEquals, right)
}

pub fn greater_than(left: FilterExpr, right: FilterExpr) -> FilterExpr {
    binary(left, BinaryOperator::GreaterThan, right)
}

pub fn greater_than_equals(left: FilterExpr, right: FilterExpr) -> FilterExpr {
    binary(left, BinaryOperator::GreaterThanEquals, right)
}

pub fn not(operand: FilterExpr) -> FilterExpr {
    FilterExpr::Unary {
        operator: UnaryOperator::Not,
        operand: Box::new(operand),
    }
}

/// Right-folds the expressions into a chain of `&&`; `None` when empty.
pub fn and_all(exprs: impl IntoIterator<Item = FilterExpr>) -> Option<FilterExpr> {
    fold_right(exprs, BinaryOperator::And)
}

/// Right-folds the expressions into a chain of `||`; `None` when empty.
pub fn or_all(exprs: impl IntoIterator<Item = FilterExpr>) -> Option<FilterExpr> {
    fold_right(exprs, BinaryOperator::Or)
}

fn fold_right(
    exprs: impl IntoIterator<Item = FilterExpr>,
    operator: BinaryOperator,
) -> Option<FilterExpr> {
    let mut exprs: Vec<FilterExpr> = exprs.into_iter().collect();
    let mut result = exprs.pop()?;
    while let Some(prev) = exprs.pop() {
        result = binary(prev, operator, result);
    }
    Some(result)
}

pub fn str_fn(argument: FilterExpr) -> FilterExpr {
    FilterExpr::Call {
        function: "STR".to_string(),
        arguments: vec![argument],
    }
}

pub fn regex_fn(text: FilterExpr, pattern: FilterExpr, flags: Option<FilterExpr>) -> FilterExpr {
    let mut arguments = vec![text, pattern];
    if let Some(flags) = flags {
        arguments.push(flags);
    }
    FilterExpr::Call {
        function: "REGEX".to_string(),
        arguments,
    }
}

pub fn exists(pattern: impl Into<String>) -> FilterExpr {
    FilterExpr::Call {
        function: "EXISTS".to_string(),
        arguments: vec![FilterExpr::Literal(LiteralValue::string(pattern))],
    }
}

pub fn in_list(
    variable: FilterExpr,
    values: impl IntoIterator<Item = FilterExpr>,
) -> FilterExpr {
    let list = FilterExpr::Call {
        function: "List".to_string(),
        arguments: values.into_iter().collect(),
    };
    binary(variable, BinaryOperator::In, list)
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("could not parse filter expression: {input}")]
pub struct ExprParseError {
    pub input: String,
}

/// Parses a restricted filter grammar into a [`FilterExpr`].
///
/// Handled forms: top-level `&&`/`||` chains, a leading `!`, simple
/// variable comparisons, and `REGEX(STR(?var), 'pattern'[, 'flags'])`.
/// Anything else fails with [`ExprParseError`].
pub fn parse_filter(input: &str) -> Result<FilterExpr, ExprParseError> {
    FilterParser::new().parse(input)
}

pub struct FilterParser {
    comparison: Regex,
    regex_call: Regex,
    number: Regex,
}

impl Default for FilterParser {
    fn default() -> Self {
        FilterParser::new()
    }
}

impl FilterParser {
    pub fn new() -> Self {
        FilterParser {
            comparison: Regex::new(r"^(\?[A-Za-z0-9_]+)\s*(<=|>=|!=|=|<|>)\s*(.+)$")
                .expect("hard-coded pattern compiles"),
            regex_call: Regex::new(
                r#"(?i)^REGEX\s*\(\s*STR\s*\(\s*(\?[A-Za-z0-9_]+)\s*\)\s*,\s*["']([^"']*)["']\s*(?:,\s*["']([^"']*)["']\s*)?\)$"#,
            )
            .expect("hard-coded pattern compiles"),
            number: Regex::new(r"^\d+(\.\d*)?$").expect("hard-coded pattern compiles"),
        }
    }

    pub fn parse(&self, input: &str) -> Result<FilterExpr, ExprParseError> {
        let input = input.trim();

        if input.contains("&&") {
            let parts = input
                .split("&&")
                .map(|part| self.parse(part))
                .collect::<Result<Vec<_>, _>>()?;
            if let Some(expr) = and_all(parts) {
                return Ok(expr);
            }
        }
        if input.contains("||") {
            let parts = input
                .split("||")
                .map(|part| self.parse(part))
                .collect::<Result<Vec<_>, _>>()?;
            if let Some(expr) = or_all(parts) {
                return Ok(expr);
            }
        }
        if let Some(rest) = input.strip_prefix('!') {
            return Ok(not(self.parse(rest)?));
        }

        if let Some(caps) = self.regex_call.captures(input) {
            let var = variable(&caps[1]);
            let pattern = FilterExpr::Literal(LiteralValue::string(&caps[2]));
            let flags = caps
                .get(3)
                .map(|m| FilterExpr::Literal(LiteralValue::string(m.as_str())));
            return Ok(regex_fn(str_fn(var), pattern, flags));
        }

        if let Some(caps) = self.comparison.captures(input) {
            let left = variable(&caps[1]);
            let right = self.parse_value(caps[3].trim());
            let expr = match &caps[2] {
                "=" => equals(left, right),
                "!=" => not_equals(left, right),
                "<" => less_than(left, right),
                "<=" => less_than_equals(left, right),
                ">" => greater_than(left, right),
                _ => greater_than_equals(left, right),
            };
            return Ok(expr);
        }

        Err(ExprParseError {
            input: input.to_string(),
        })
    }

    fn parse_value(&self, value: &str) -> FilterExpr {
        if (value.starts_with('"') && value.ends_with('"') && value.len() >= 2)
            || (value.starts_with('\'') && value.ends_with('\'') && value.len() >= 2)
        {
            return FilterExpr::Literal(LiteralValue::string(&value[1..value.len() - 1]));
        }
        if value.starts_with('?') {
            return variable(value);
        }
        if self.number.is_match(value) {
            return FilterExpr::Literal(LiteralValue::Number(value.to_string()));
        }
        match value {
            "true" => FilterExpr::Literal(LiteralValue::Boolean(true)),
            "false" => FilterExpr::Literal(LiteralValue::Boolean(false)),
            other => FilterExpr::Literal(LiteralValue::string(other)),
        }
    }
}
