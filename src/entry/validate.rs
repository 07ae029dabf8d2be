use serde_json::{Map, Value};

use super::{Bench, Commit, EntryRecord, Person};
use crate::error::ValidationError;

type Object = Map<String, Value>;

fn as_object<'a>(value: &'a Value, path: &str) -> Result<&'a Object, ValidationError> {
    value
        .as_object()
        .ok_or_else(|| ValidationError::wrong_type(path, "object"))
}

fn required<'a>(obj: &'a Object, key: &str) -> Result<&'a Value, ValidationError> {
    match obj.get(key) {
        None | Some(Value::Null) => Err(ValidationError::missing(key)),
        Some(v) => Ok(v),
    }
}

fn required_string(obj: &Object, key: &str) -> Result<String, ValidationError> {
    required(obj, key)?
        .as_str()
        .map(ToOwned::to_owned)
        .ok_or_else(|| ValidationError::wrong_type(key, "string"))
}

fn optional_string(obj: &Object, key: &str) -> Result<Option<String>, ValidationError> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(ValidationError::wrong_type(key, "string")),
    }
}

fn person(obj: &Object, key: &str) -> Result<Person, ValidationError> {
    let inner = as_object(required(obj, key)?, key)?;
    let parse = || -> Result<Person, ValidationError> {
        Ok(Person {
            email: required_string(inner, "email")?,
            name: required_string(inner, "name")?,
            username: optional_string(inner, "username")?,
        })
    };
    parse().map_err(|e| e.within(key))
}

fn commit(obj: &Object) -> Result<Commit, ValidationError> {
    let distinct = required(obj, "distinct")?
        .as_bool()
        .ok_or_else(|| ValidationError::wrong_type("distinct", "boolean"))?;
    Ok(Commit {
        author: person(obj, "author")?,
        committer: person(obj, "committer")?,
        distinct,
        id: required_string(obj, "id")?,
        message: required_string(obj, "message")?,
        timestamp: required_string(obj, "timestamp")?,
        tree_id: optional_string(obj, "tree_id")?,
        url: optional_string(obj, "url")?,
    })
}

fn bench(value: &Value) -> Result<Bench, ValidationError> {
    let obj = as_object(value, "")?;
    let raw_value = match required(obj, "value")? {
        Value::Number(n) => n.clone(),
        _ => return Err(ValidationError::wrong_type("value", "number")),
    };
    Ok(Bench {
        name: required_string(obj, "name")?,
        raw_value,
        range: optional_string(obj, "range")?,
        unit: required_string(obj, "unit")?,
        extra: optional_string(obj, "extra")?,
    })
}

fn date(obj: &Object) -> Result<i64, ValidationError> {
    match required(obj, "date")? {
        Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| ValidationError::wrong_type("date", "integer")),
        _ => Err(ValidationError::wrong_type("date", "integer")),
    }
}

/// Structurally validate an untyped entry (the producer's wire form) and
/// convert it into an [`EntryRecord`].
///
/// Field names are checked, not the bench names: any string is a valid
/// bench name. Unknown fields are ignored.
///
/// # Errors
/// Returns a [`ValidationError`] naming the first offending field path.
pub fn entry_from_json(value: &Value) -> Result<EntryRecord, ValidationError> {
    let obj = as_object(value, "")?;

    let commit_obj = as_object(required(obj, "commit")?, "commit")?;
    let commit = commit(commit_obj).map_err(|e| e.within("commit"))?;

    let date = date(obj)?;
    let tool = required_string(obj, "tool")?;

    let benches = required(obj, "benches")?
        .as_array()
        .ok_or_else(|| ValidationError::wrong_type("benches", "array"))?
        .iter()
        .enumerate()
        .map(|(i, b)| bench(b).map_err(|e| e.within(&format!("benches[{i}]"))))
        .collect::<Result<Vec<_>, _>>()?;

    let entry = EntryRecord {
        commit,
        date,
        tool,
        benches,
    };
    entry.validate()?;
    Ok(entry)
}
