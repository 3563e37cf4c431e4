//! Synchronous execution of a serialized query against a SPARQL endpoint.
//!
//! This is the only boundary-crossing operation in the crate, and it is
//! deliberately narrow: one form-encoded POST, one decoded JSON results
//! object. Failures come back as values carrying both the message and the
//! query text, so callers can render the two together.

use crate::query::Query;
use crate::util::log;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

pub const RESULTS_CONTENT_TYPE: &str = "application/sparql-results+json";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// The SPARQL JSON results document: `head.vars` + `results.bindings`.
#[derive(Debug, Clone, Deserialize)]
pub struct QueryResults {
    pub head: ResultsHead,
    #[serde(default)]
    pub results: ResultsBody,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResultsHead {
    #[serde(default)]
    pub vars: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResultsBody {
    #[serde(default)]
    pub bindings: Vec<HashMap<String, BoundValue>>,
}

/// One bound value inside a solution row.
#[derive(Debug, Clone, Deserialize)]
pub struct BoundValue {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
    #[serde(default)]
    pub datatype: Option<String>,
    #[serde(default, rename = "xml:lang")]
    pub language: Option<String>,
}

/// A failed execution, carrying the original query text alongside the
/// transport or decoding message.
#[derive(Error, Debug)]
#[error("{message}")]
pub struct RemoteError {
    pub message: String,
    pub query: String,
}

impl Query {
    /// Serializes the query and executes it against `endpoint`.
    pub fn run(&self, endpoint: &str) -> Result<QueryResults, RemoteError> {
        execute(endpoint, &self.to_query_string())
    }
}

/// POSTs `query_text` to `endpoint` as a form-encoded body and decodes the
/// JSON results.
pub fn execute(endpoint: &str, query_text: &str) -> Result<QueryResults, RemoteError> {
    log::debug!("executing query against {endpoint}");
    let agent = ureq::AgentBuilder::new().timeout(REQUEST_TIMEOUT).build();
    let response = agent
        .post(endpoint)
        .set("Accept", RESULTS_CONTENT_TYPE)
        .set("Content-Type", "application/x-www-form-urlencoded")
        .send_form(&[("query", query_text)])
        .map_err(|e| RemoteError {
            message: e.to_string(),
            query: query_text.to_string(),
        })?;
    response.into_json::<QueryResults>().map_err(|e| RemoteError {
        message: format!("failed to decode results: {e}"),
        query: query_text.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_results_document() {
        let doc = r#"{
            "head": { "vars": ["name", "population"] },
            "results": {
                "bindings": [
                    {
                        "name": { "type": "literal", "value": "Berlin", "xml:lang": "de" },
                        "population": {
                            "type": "literal",
                            "value": "3645000",
                            "datatype": "http://www.w3.org/2001/XMLSchema#integer"
                        }
                    }
                ]
            }
        }"#;
        let results: QueryResults = serde_json::from_str(doc).unwrap();
        assert_eq!(results.head.vars, vec!["name", "population"]);
        assert_eq!(results.results.bindings.len(), 1);
        let row = &results.results.bindings[0];
        assert_eq!(row["name"].value, "Berlin");
        assert_eq!(row["name"].language.as_deref(), Some("de"));
        assert_eq!(row["population"].kind, "literal");
        assert_eq!(
            row["population"].datatype.as_deref(),
            Some("http://www.w3.org/2001/XMLSchema#integer")
        );
    }

    #[test]
    fn decodes_empty_results() {
        let doc = r#"{ "head": { "vars": [] } }"#;
        let results: QueryResults = serde_json::from_str(doc).unwrap();
        assert!(results.results.bindings.is_empty());
    }
}
