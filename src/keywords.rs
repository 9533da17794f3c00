//! Boolean keyword expressions over comment text.
//!
//! The language is deliberately tiny: comma-separated clauses are OR-ed, each
//! clause is split on `OR`, then on `AND`, and an operand may start with
//! `NOT`. Operator keywords are case-insensitive and must be surrounded by
//! whitespace. Every operand is a case-insensitive substring test. There is no
//! grouping; parentheses and quotes are literal text.
//!
//! Malformed expressions never fail: they degrade to "text contains any of
//! the words in the expression".

const OR: &str = "OR";
const AND: &str = "AND";
const NOT: &str = "NOT";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeywordFilter {
    MatchAll,
    Expression(Vec<Clause>),
    AnyTerm(Vec<String>),
}

/// One comma-delimited clause: OR over its conjunctions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clause {
    alternatives: Vec<Conjunction>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Conjunction {
    terms: Vec<Term>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Term {
    needle: String,
    negated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeywordParseError {
    #[error("empty operand in {0:?}")]
    EmptyOperand(String),
    #[error("dangling {operator} in {part:?}")]
    DanglingOperator {
        operator: &'static str,
        part: String,
    },
}

impl KeywordFilter {
    pub fn parse(expression: &str) -> Self {
        if expression.trim().is_empty() {
            return Self::MatchAll;
        }

        match parse_expression(expression) {
            Ok(clauses) => Self::Expression(clauses),
            Err(err) => {
                tracing::debug!(%err, expression, "keyword expression anomaly; matching any term");
                Self::AnyTerm(fallback_terms(expression))
            }
        }
    }

    pub fn from_option(expression: Option<&str>) -> Self {
        expression.map_or(Self::MatchAll, Self::parse)
    }

    pub fn is_match_all(&self) -> bool {
        matches!(self, Self::MatchAll)
    }

    pub fn matches(&self, text: &str) -> bool {
        let haystack = text.to_lowercase();
        match self {
            Self::MatchAll => true,
            Self::Expression(clauses) => clauses.iter().any(|clause| clause.matches(&haystack)),
            Self::AnyTerm(terms) => terms.iter().any(|term| haystack.contains(term.as_str())),
        }
    }
}

impl Clause {
    fn matches(&self, haystack: &str) -> bool {
        self.alternatives
            .iter()
            .any(|conjunction| conjunction.terms.iter().all(|term| term.matches(haystack)))
    }
}

impl Term {
    fn matches(&self, haystack: &str) -> bool {
        haystack.contains(self.needle.as_str()) != self.negated
    }
}

/// Evaluates `expression` against `text`, parsing it on every call.
///
/// Use [`KeywordFilter::parse`] when the same expression is applied to many
/// texts.
pub fn matches(text: &str, expression: &str) -> bool {
    KeywordFilter::parse(expression).matches(text)
}

pub fn parse_expression(expression: &str) -> Result<Vec<Clause>, KeywordParseError> {
    expression.split(',').map(parse_clause).collect()
}

fn parse_clause(raw: &str) -> Result<Clause, KeywordParseError> {
    let clause = raw.trim();
    if clause.is_empty() {
        return Err(KeywordParseError::EmptyOperand(raw.to_owned()));
    }

    let alternatives = split_on_keyword(clause, OR)
        .into_iter()
        .map(parse_conjunction)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Clause { alternatives })
}

fn parse_conjunction(raw: &str) -> Result<Conjunction, KeywordParseError> {
    let part = raw.trim();
    if part.is_empty() {
        return Err(KeywordParseError::EmptyOperand(raw.to_owned()));
    }

    let terms = split_on_keyword(part, AND)
        .into_iter()
        .map(parse_term)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Conjunction { terms })
}

fn parse_term(raw: &str) -> Result<Term, KeywordParseError> {
    let term = raw.trim();
    if term.is_empty() {
        return Err(KeywordParseError::EmptyOperand(raw.to_owned()));
    }
    check_dangling_operators(term)?;

    let (needle, negated) = match strip_keyword_prefix(term, NOT) {
        Some(rest) => (rest, true),
        None => (term, false),
    };

    Ok(Term {
        needle: needle.to_lowercase(),
        negated,
    })
}

fn check_dangling_operators(term: &str) -> Result<(), KeywordParseError> {
    let mut words = term.split_whitespace();
    let first = words.next().unwrap_or_default();
    let last = words.next_back().unwrap_or(first);

    for operator in [AND, OR] {
        if first.eq_ignore_ascii_case(operator) || last.eq_ignore_ascii_case(operator) {
            return Err(KeywordParseError::DanglingOperator {
                operator,
                part: term.to_owned(),
            });
        }
    }
    if last.eq_ignore_ascii_case(NOT) {
        return Err(KeywordParseError::DanglingOperator {
            operator: NOT,
            part: term.to_owned(),
        });
    }
    Ok(())
}

/// Splits on `keyword` where it is preceded and followed by whitespace.
/// Parts are returned untrimmed.
fn split_on_keyword<'a>(s: &'a str, keyword: &str) -> Vec<&'a str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut prev_is_whitespace = false;

    for (idx, ch) in s.char_indices() {
        if prev_is_whitespace && idx >= start && keyword_at(s, idx, keyword) {
            parts.push(&s[start..idx]);
            start = idx + keyword.len();
        }
        prev_is_whitespace = ch.is_whitespace();
    }
    parts.push(&s[start..]);
    parts
}

fn keyword_at(s: &str, idx: usize, keyword: &str) -> bool {
    let end = idx + keyword.len();
    s.get(idx..end)
        .is_some_and(|word| word.eq_ignore_ascii_case(keyword))
        && s[end..].chars().next().is_some_and(char::is_whitespace)
}

fn strip_keyword_prefix<'a>(term: &'a str, keyword: &str) -> Option<&'a str> {
    if keyword_at(term, 0, keyword) {
        Some(term[keyword.len()..].trim())
    } else {
        None
    }
}

fn fallback_terms(expression: &str) -> Vec<String> {
    expression
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|term| !term.is_empty())
        .map(str::to_lowercase)
        .collect()
}
