//! Label selectors used to pick the definitions a duck type considers
use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
    str::FromStr,
};

use serde::{Deserialize, Serialize};

use crate::error::ParseSelectorError;

// local type aliases
type Map = BTreeMap<String, String>;
type Expressions = Vec<Expression>;

/// A selector expression with existing operations
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub enum Expression {
    /// The label value is one of the given values
    In(String, BTreeSet<String>),
    /// The label is absent or its value is none of the given values
    NotIn(String, BTreeSet<String>),
    /// The label has exactly this value
    Equal(String, String),
    /// The label is absent or has a different value
    NotEqual(String, String),
    /// The label key is present
    Exists(String),
    /// The label key is absent
    DoesNotExist(String),
}

/// Perform selection on a list of expressions
///
/// An empty selector matches everything.
#[derive(Clone, Debug, Eq, PartialEq, Default, Deserialize, Serialize)]
pub struct Selector(Expressions);

impl Selector {
    /// Indicates whether this label selector matches everything
    pub fn selects_all(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether every expression of the selector holds for the given labels
    pub fn matches(&self, labels: &Map) -> bool {
        self.0.iter().all(|expr| expr.matches(labels))
    }
}

impl FromStr for Selector {
    type Err = ParseSelectorError;

    /// Parses the string form of a selector, e.g. `teach.me.how/ducky=true,env in (a,b)`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        split_requirements(s)?
            .into_iter()
            .map(parse_requirement)
            .collect::<Result<Expressions, _>>()
            .map(Selector)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let selectors: Vec<String> = self.0.iter().map(|e| e.to_string()).collect();
        f.write_str(&selectors.join(","))
    }
}

impl FromIterator<(String, String)> for Selector {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, v)| Expression::Equal(k, v)).collect())
    }
}

impl FromIterator<Expression> for Selector {
    fn from_iter<T: IntoIterator<Item = Expression>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<Expression> for Selector {
    fn from(value: Expression) -> Self {
        Self(vec![value])
    }
}

// === Expression ===

impl Expression {
    fn matches(&self, labels: &Map) -> bool {
        match self {
            Expression::In(key, values) => match labels.get(key) {
                Some(v) => values.contains(v),
                None => false,
            },
            Expression::NotIn(key, values) => match labels.get(key) {
                Some(v) => !values.contains(v),
                None => true,
            },
            Expression::Exists(key) => labels.contains_key(key),
            Expression::DoesNotExist(key) => !labels.contains_key(key),
            Expression::Equal(key, value) => labels.get(key) == Some(value),
            Expression::NotEqual(key, value) => labels.get(key) != Some(value),
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |values: &BTreeSet<String>| values.iter().cloned().collect::<Vec<_>>().join(",");
        match self {
            Expression::In(key, values) => write!(f, "{key} in ({})", join(values)),
            Expression::NotIn(key, values) => write!(f, "{key} notin ({})", join(values)),
            Expression::Equal(key, value) => write!(f, "{key}={value}"),
            Expression::NotEqual(key, value) => write!(f, "{key}!={value}"),
            Expression::Exists(key) => write!(f, "{key}"),
            Expression::DoesNotExist(key) => write!(f, "!{key}"),
        }
    }
}

// === Parsing ===

/// Splits on commas that are not inside a value set
fn split_requirements(s: &str) -> Result<Vec<&str>, ParseSelectorError> {
    let mut requirements = vec![];
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                requirements.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(ParseSelectorError::UnterminatedSet(s[start..].trim().to_string()));
    }
    requirements.push(&s[start..]);
    Ok(requirements.into_iter().filter(|r| !r.trim().is_empty()).collect())
}

fn parse_requirement(req: &str) -> Result<Expression, ParseSelectorError> {
    let req = req.trim();
    let key_of = |key: &str| {
        let key = key.trim();
        if key.is_empty() {
            Err(ParseSelectorError::MissingKey(req.to_string()))
        } else if key.contains(|c: char| c.is_whitespace() || "()=!,".contains(c)) {
            Err(ParseSelectorError::UnknownOperator(req.to_string()))
        } else {
            Ok(key.to_string())
        }
    };

    if let Some(key) = req.strip_prefix('!') {
        return Ok(Expression::DoesNotExist(key_of(key)?));
    }
    if let Some((key, value)) = req.split_once("!=") {
        return Ok(Expression::NotEqual(key_of(key)?, value.trim().to_string()));
    }
    if let Some((key, value)) = req.split_once("==").or_else(|| req.split_once('=')) {
        return Ok(Expression::Equal(key_of(key)?, value.trim().to_string()));
    }
    let Some((key, rest)) = req.split_once(char::is_whitespace) else {
        return Ok(Expression::Exists(key_of(req)?));
    };

    let rest = rest.trim_start();
    let (set, negate) = match (rest.strip_prefix("notin"), rest.strip_prefix("in")) {
        (Some(set), _) => (set, true),
        (None, Some(set)) => (set, false),
        (None, None) => return Err(ParseSelectorError::UnknownOperator(req.to_string())),
    };
    // the operator must end at whitespace or the opening parenthesis
    if !set.starts_with(|c: char| c.is_whitespace() || c == '(') {
        return Err(ParseSelectorError::UnknownOperator(req.to_string()));
    }
    let key = key_of(key)?;
    let values: BTreeSet<String> = set
        .trim()
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .ok_or_else(|| ParseSelectorError::UnterminatedSet(req.to_string()))?
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
        .collect();
    if values.is_empty() {
        return Err(ParseSelectorError::EmptySet(req.to_string()));
    }
    Ok(if negate {
        Expression::NotIn(key, values)
    } else {
        Expression::In(key, values)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(pairs: &[(&str, &str)]) -> Map {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_raw_matches() {
        for (selector, labels, matches, msg) in &[
            (Selector::default(), Default::default(), true, "empty match"),
            (
                Selector::from_iter(Some(("foo".to_string(), "bar".to_string()))),
                labels(&[("foo", "bar")]),
                true,
                "exact label match",
            ),
            (
                Selector::from_iter(Some(("foo".to_string(), "bar".to_string()))),
                labels(&[("foo", "bar"), ("bah", "baz")]),
                true,
                "sufficient label match",
            ),
            (
                Selector::from(Expression::NotEqual("foo".into(), "bar".into())),
                labels(&[("foo", "bar"), ("bah", "baz")]),
                false,
                "NotEqual expression match",
            ),
            (
                Selector::from(Expression::NotIn("foo".into(), ["quux".to_string()].into())),
                labels(&[("foo", "bar")]),
                true,
                "NotIn expression match",
            ),
            (
                Selector::from(Expression::NotIn("foo".into(), ["bar".to_string()].into())),
                labels(&[("foo", "bar")]),
                false,
                "NotIn expression non-match",
            ),
            (
                Selector(vec![
                    Expression::Equal("foo".to_string(), "bar".to_string()),
                    Expression::In("bah".into(), ["bar".to_string()].into()),
                ]),
                labels(&[("foo", "bar"), ("bah", "baz")]),
                false,
                "matches labels but not expressions",
            ),
        ] {
            assert_eq!(selector.matches(labels), *matches, "{}", msg);
        }
    }

    #[test]
    fn parses_equality_requirements() {
        let selector: Selector = "teach.me.how/ducky=true".parse().unwrap();
        assert_eq!(
            selector,
            Selector::from(Expression::Equal("teach.me.how/ducky".into(), "true".into()))
        );
        assert!(selector.matches(&labels(&[("teach.me.how/ducky", "true")])));
        assert!(!selector.matches(&labels(&[("teach.me.how/ducky", "false")])));

        let selector: Selector = "a==b, c!=d".parse().unwrap();
        assert_eq!(
            selector,
            Selector(vec![
                Expression::Equal("a".into(), "b".into()),
                Expression::NotEqual("c".into(), "d".into()),
            ])
        );
    }

    #[test]
    fn parses_set_and_existence_requirements() {
        let selector: Selector = "env in (prod, qa),tier notin (web),managed,!legacy".parse().unwrap();
        assert_eq!(
            selector,
            Selector(vec![
                Expression::In("env".into(), ["prod".to_string(), "qa".to_string()].into()),
                Expression::NotIn("tier".into(), ["web".to_string()].into()),
                Expression::Exists("managed".into()),
                Expression::DoesNotExist("legacy".into()),
            ])
        );
        assert!(selector.matches(&labels(&[("env", "qa"), ("managed", "")])));
        assert!(!selector.matches(&labels(&[("env", "qa"), ("managed", ""), ("legacy", "1")])));
        assert_eq!(
            selector.to_string(),
            "env in (prod,qa),tier notin (web),managed,!legacy"
        );
    }

    #[test]
    fn empty_string_selects_all() {
        let selector: Selector = "".parse().unwrap();
        assert!(selector.selects_all());
        assert!(selector.matches(&Map::new()));
    }

    #[test]
    fn rejects_malformed_requirements() {
        assert_eq!(
            "=true".parse::<Selector>(),
            Err(ParseSelectorError::MissingKey("=true".into()))
        );
        assert_eq!(
            "env in (a,b".parse::<Selector>(),
            Err(ParseSelectorError::UnterminatedSet("env in (a,b".into()))
        );
        assert_eq!(
            "env within (a)".parse::<Selector>(),
            Err(ParseSelectorError::UnknownOperator("env within (a)".into()))
        );
        for (selector, err, msg) in [
            (
                "!teach.me.how/ducky=true",
                ParseSelectorError::UnknownOperator("!teach.me.how/ducky=true".into()),
                "negated key with a value",
            ),
            (
                "!a!=b",
                ParseSelectorError::UnknownOperator("!a!=b".into()),
                "negated key with a not-equal value",
            ),
            (
                "a=b!=c",
                ParseSelectorError::UnknownOperator("a=b!=c".into()),
                "equality inside a not-equal key",
            ),
            (
                "env inx (a)",
                ParseSelectorError::UnknownOperator("env inx (a)".into()),
                "operator running into other text",
            ),
            (
                "env notinx (a)",
                ParseSelectorError::UnknownOperator("env notinx (a)".into()),
                "negated operator running into other text",
            ),
            ("a in ()", ParseSelectorError::EmptySet("a in ()".into()), "empty in set"),
            (
                "a notin ( , )",
                ParseSelectorError::EmptySet("a notin ( , )".into()),
                "blank notin set",
            ),
        ] {
            assert_eq!(selector.parse::<Selector>(), Err(err), "{}", msg);
        }
        assert_eq!(
            "env in(a)".parse::<Selector>(),
            Ok(Selector::from(Expression::In("env".into(), ["a".to_string()].into()))),
            "operator directly followed by the set"
        );
    }
}
