//! Boolean query model and the incremental query builder.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Field a search term is restricted to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QueryField {
    #[serde(rename = "Title")]
    Title,
    #[serde(rename = "Title/Abstract")]
    TitleAbstract,
    #[serde(rename = "Text")]
    Text,
}

impl QueryField {
    pub const ALL: [QueryField; 3] = [QueryField::Title, QueryField::TitleAbstract, QueryField::Text];

    /// Tag used inside the brackets of a rendered term
    pub fn tag(&self) -> &'static str {
        match self {
            QueryField::Title => "Title",
            QueryField::TitleAbstract => "Title/Abstract",
            QueryField::Text => "Text",
        }
    }
}

impl fmt::Display for QueryField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for QueryField {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        QueryField::ALL
            .into_iter()
            .find(|field| field.tag().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| QueryError::UnknownField(s.to_string()))
    }
}

/// Boolean operator joining two terms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Condition {
    And,
    Or,
}

impl Condition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Condition::And => "AND",
            Condition::Or => "OR",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Condition {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AND" => Ok(Condition::And),
            "OR" => Ok(Condition::Or),
            _ => Err(QueryError::UnknownCondition(s.to_string())),
        }
    }
}

/// One unit of a query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum QueryToken {
    Term { field: QueryField, text: String },
    Operator { condition: Condition },
}

impl fmt::Display for QueryToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryToken::Term { field, text } => write!(f, "{}[{}]", text, field),
            QueryToken::Operator { condition } => write!(f, "{}", condition),
        }
    }
}

/// Position of the builder in the term/operator alternation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuilderState {
    /// No tokens yet
    Empty,
    /// Last token is a term; the query is complete
    HasTerm,
    /// Last token is an operator; a term must follow
    ExpectingTerm,
}

/// Errors raised while assembling a query
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    #[error("Please enter a search term before adding")]
    EmptyTerm,

    #[error("A condition needs a preceding search term")]
    MissingTerm,

    #[error("Two conditions cannot follow each other")]
    ConsecutiveOperators,

    #[error("The query ends with a condition; add another term")]
    DanglingOperator,

    #[error("The query is empty")]
    EmptyQuery,

    #[error("Unknown field '{0}' (expected Title, Title/Abstract or Text)")]
    UnknownField(String),

    #[error("Unknown condition '{0}' (expected AND or OR)")]
    UnknownCondition(String),
}

/// Incremental builder for multi-term queries.
///
/// In strict mode the builder enforces `Term (Operator Term)*`. In lenient
/// mode consecutive operators and a trailing operator are passed through to
/// the provider verbatim; a condition still needs at least one term before it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryBuilder {
    tokens: Vec<QueryToken>,
    strict: bool,
}

impl Default for QueryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryBuilder {
    /// Create a strict builder
    pub fn new() -> Self {
        Self {
            tokens: Vec::new(),
            strict: true,
        }
    }

    /// Create a builder that passes malformed alternation through
    pub fn lenient() -> Self {
        Self {
            tokens: Vec::new(),
            strict: false,
        }
    }

    pub fn with_strict(strict: bool) -> Self {
        if strict {
            Self::new()
        } else {
            Self::lenient()
        }
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    pub fn tokens(&self) -> &[QueryToken] {
        &self.tokens
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn state(&self) -> BuilderState {
        match self.tokens.last() {
            None => BuilderState::Empty,
            Some(QueryToken::Term { .. }) => BuilderState::HasTerm,
            Some(QueryToken::Operator { .. }) => BuilderState::ExpectingTerm,
        }
    }

    /// Append a field-qualified term
    pub fn add_term(&mut self, field: QueryField, text: impl Into<String>) -> Result<&mut Self, QueryError> {
        let text = text.into();
        let text = text.trim();
        if text.is_empty() {
            return Err(QueryError::EmptyTerm);
        }

        self.tokens.push(QueryToken::Term {
            field,
            text: text.to_string(),
        });
        Ok(self)
    }

    /// Append a boolean operator
    pub fn add_condition(&mut self, condition: Condition) -> Result<&mut Self, QueryError> {
        match self.state() {
            BuilderState::Empty => return Err(QueryError::MissingTerm),
            BuilderState::ExpectingTerm if self.strict => {
                return Err(QueryError::ConsecutiveOperators)
            }
            _ => {}
        }

        self.tokens.push(QueryToken::Operator { condition });
        Ok(self)
    }

    /// Render every token in insertion order, joined by single spaces
    pub fn render(&self) -> String {
        self.tokens
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Render the query for execution, checking that it is complete
    pub fn build(&self) -> Result<String, QueryError> {
        match self.state() {
            BuilderState::Empty => Err(QueryError::EmptyQuery),
            BuilderState::ExpectingTerm if self.strict => Err(QueryError::DanglingOperator),
            _ => Ok(self.render()),
        }
    }
}

impl fmt::Display for QueryBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_field_qualified_terms() {
        let mut builder = QueryBuilder::new();
        builder
            .add_term(QueryField::TitleAbstract, "Kawasaki")
            .unwrap()
            .add_condition(Condition::And)
            .unwrap()
            .add_term(QueryField::Text, "Adalimumab")
            .unwrap();

        assert_eq!(builder.render(), "Kawasaki[Title/Abstract] AND Adalimumab[Text]");
        assert_eq!(builder.build().unwrap(), builder.render());
    }

    #[test]
    fn test_state_transitions() {
        let mut builder = QueryBuilder::new();
        assert_eq!(builder.state(), BuilderState::Empty);

        builder.add_term(QueryField::Title, "fever").unwrap();
        assert_eq!(builder.state(), BuilderState::HasTerm);

        builder.add_condition(Condition::Or).unwrap();
        assert_eq!(builder.state(), BuilderState::ExpectingTerm);

        builder.add_term(QueryField::Title, "rash").unwrap();
        assert_eq!(builder.state(), BuilderState::HasTerm);
    }

    #[test]
    fn test_empty_term_rejected() {
        let mut builder = QueryBuilder::new();
        assert_eq!(builder.add_term(QueryField::Title, "").unwrap_err(), QueryError::EmptyTerm);
        assert_eq!(builder.add_term(QueryField::Title, "   ").unwrap_err(), QueryError::EmptyTerm);
        assert!(builder.is_empty());
    }

    #[test]
    fn test_condition_requires_term() {
        let mut builder = QueryBuilder::new();
        assert_eq!(builder.add_condition(Condition::And).unwrap_err(), QueryError::MissingTerm);

        let mut lenient = QueryBuilder::lenient();
        assert_eq!(lenient.add_condition(Condition::And).unwrap_err(), QueryError::MissingTerm);
    }

    #[test]
    fn test_strict_rejects_consecutive_operators() {
        let mut builder = QueryBuilder::new();
        builder.add_term(QueryField::Title, "a").unwrap();
        builder.add_condition(Condition::And).unwrap();

        assert_eq!(
            builder.add_condition(Condition::Or).unwrap_err(),
            QueryError::ConsecutiveOperators
        );
        assert_eq!(builder.tokens().len(), 2);
        assert_eq!(builder.build().unwrap_err(), QueryError::DanglingOperator);
        // rendering an incomplete query is still allowed
        assert_eq!(builder.render(), "a[Title] AND");
    }

    #[test]
    fn test_lenient_passes_through() {
        let mut builder = QueryBuilder::lenient();
        builder.add_term(QueryField::Text, "a").unwrap();
        builder.add_condition(Condition::And).unwrap();
        builder.add_condition(Condition::Or).unwrap();

        assert_eq!(builder.build().unwrap(), "a[Text] AND OR");
    }

    #[test]
    fn test_empty_query_cannot_be_built() {
        assert_eq!(QueryBuilder::new().build().unwrap_err(), QueryError::EmptyQuery);
        assert_eq!(QueryBuilder::new().render(), "");
    }

    #[test]
    fn test_render_is_repeatable() {
        let mut builder = QueryBuilder::new();
        builder.add_term(QueryField::Title, "x").unwrap();
        let first = builder.render();
        assert_eq!(builder.render(), first);
        assert_eq!(builder.tokens().len(), 1);
    }

    #[test]
    fn test_parse_field_and_condition() {
        assert_eq!("title/abstract".parse::<QueryField>().unwrap(), QueryField::TitleAbstract);
        assert_eq!("TEXT".parse::<QueryField>().unwrap(), QueryField::Text);
        assert!("Author".parse::<QueryField>().is_err());

        assert_eq!("and".parse::<Condition>().unwrap(), Condition::And);
        assert_eq!(" OR ".parse::<Condition>().unwrap(), Condition::Or);
        assert!("NOT".parse::<Condition>().is_err());
    }
}
