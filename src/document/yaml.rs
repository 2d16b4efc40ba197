//! YAML field patching by query path

use std::path::Path;

use serde_yaml::{Mapping, Value};
use tracing::debug;

use super::write_atomically;
use crate::domain::{DaneelError, Result};

/// One step of a parsed field query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryStep {
    Key(String),
    Index(usize),
}

/// Parse `a.b[2].c` into `[Key(a), Key(b), Index(2), Key(c)]`.
///
/// Each dot-separated segment is a non-empty key followed by any number of
/// bracketed, non-negative indices.
pub fn parse_query(query: &str) -> Result<Vec<QueryStep>> {
    if query.trim().is_empty() {
        return Err(DaneelError::path_query(query, "query is empty"));
    }

    let mut steps = Vec::new();
    for segment in query.split('.') {
        let (key, mut rest) = match segment.find('[') {
            Some(pos) => segment.split_at(pos),
            None => (segment, ""),
        };

        if key.is_empty() {
            return Err(DaneelError::path_query(
                query,
                format!("segment '{}' has no key", segment),
            ));
        }
        if key.contains(']') {
            return Err(DaneelError::path_query(
                query,
                format!("unexpected ']' in '{}'", segment),
            ));
        }
        steps.push(QueryStep::Key(key.to_string()));

        while !rest.is_empty() {
            let Some(inner) = rest.strip_prefix('[') else {
                return Err(DaneelError::path_query(
                    query,
                    format!("unexpected text '{}' after index", rest),
                ));
            };
            let Some(close) = inner.find(']') else {
                return Err(DaneelError::path_query(
                    query,
                    format!("unclosed bracket in '{}'", segment),
                ));
            };
            steps.push(QueryStep::Index(parse_index(query, inner[..close].trim())?));
            rest = &inner[close + 1..];
        }
    }

    Ok(steps)
}

fn parse_index(query: &str, raw: &str) -> Result<usize> {
    match raw.parse::<i64>() {
        Ok(n) if n < 0 => Err(DaneelError::path_query(
            query,
            format!("index {} is out of range", n),
        )),
        Ok(n) => usize::try_from(n)
            .map_err(|_| DaneelError::path_query(query, format!("index {} is out of range", n))),
        Err(_) => Err(DaneelError::path_query(
            query,
            format!("index '{}' is not a number", raw),
        )),
    }
}

/// Set the field addressed by `query` inside `root`, creating missing
/// mappings and padding sequences on the way.
pub fn set_field(root: &mut Value, query: &str, value: Value) -> Result<()> {
    let steps = parse_query(query)?;
    let last = steps.len() - 1;

    let mut current = root;
    for (i, step) in steps.iter().enumerate() {
        current = descend(current, step, i == last, query)?;
    }
    *current = value;

    Ok(())
}

fn descend<'v>(node: &'v mut Value, step: &QueryStep, is_last: bool, query: &str) -> Result<&'v mut Value> {
    match step {
        QueryStep::Key(key) => {
            if node.is_null() {
                *node = Value::Mapping(Mapping::new());
            }
            match node {
                Value::Mapping(map) => Ok(map
                    .entry(Value::String(key.clone()))
                    .or_insert(Value::Null)),
                other => Err(DaneelError::path_query(
                    query,
                    format!("cannot look up '{}' in {}", key, value_kind(other)),
                )),
            }
        }
        QueryStep::Index(index) => {
            // A null or an empty-mapping placeholder becomes the sequence
            // the query asks for.
            let placeholder = match node {
                Value::Null => true,
                Value::Mapping(map) => map.is_empty(),
                _ => false,
            };
            if placeholder {
                *node = Value::Sequence(Vec::new());
            }
            match node {
                Value::Sequence(seq) => {
                    if seq.len() <= *index {
                        let filler = if is_last {
                            Value::Null
                        } else {
                            Value::Mapping(Mapping::new())
                        };
                        seq.resize(index + 1, filler);
                    }
                    Ok(&mut seq[*index])
                }
                other => Err(DaneelError::path_query(
                    query,
                    format!("cannot index [{}] into {}", index, value_kind(other)),
                )),
            }
        }
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

/// Set one field of the YAML document at `path` and rewrite the file.
pub fn update_yaml(path: &Path, query: &str, value: impl Into<Value>) -> Result<()> {
    if !path.is_file() {
        return Err(DaneelError::not_found("YAML file", path));
    }

    let content = std::fs::read_to_string(path)?;
    let mut document: Value = serde_yaml::from_str(&content).map_err(|e| DaneelError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    set_field(&mut document, query, value.into())?;

    let rendered = serde_yaml::to_string(&document).map_err(|e| DaneelError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    write_atomically(path, &rendered)?;

    debug!("Updated {} in {}", query, path.display());
    Ok(())
}
