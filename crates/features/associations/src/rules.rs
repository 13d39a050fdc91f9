//! Parsing of the declarative rule and condition files.

use crate::error::{AssociationError, AssociationErrorExt};
use pim_domain::object::absolize;
use pim_domain::value::Value;
use serde::Deserialize;
use serde_json::Value as Json;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// The forward relationship name and its inverse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Types {
    pub forward: String,
    pub reverse: String,
}

/// One relationship type pair fanned out to a set of endpoint paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub types: Types,
    pub paths: Vec<String>,
}

/// Forward path to the relationships it declares.
pub type Rules = BTreeMap<String, Vec<Endpoint>>;

/// A gate: the rules in `file` become active once `property` on `interface`
/// at `path` holds one of `values`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub path: String,
    pub interface: String,
    pub property: String,
    pub values: Vec<Value>,
    /// The file whose `associations` block this condition unlocks.
    pub file: PathBuf,
    /// Value observed while restoring, checked by the argument-less match.
    pub actual_value: Option<Value>,
}

impl Condition {
    /// Returns `true` if `value` is one of the acceptable values.
    #[must_use]
    pub fn accepts(&self, value: &Value) -> bool {
        self.values.iter().any(|v| v.matches(value))
    }
}

#[derive(Deserialize)]
struct RawRule {
    path: String,
    endpoints: Vec<RawEndpoint>,
}

#[derive(Deserialize)]
struct RawEndpoint {
    types: RawTypes,
    paths: Vec<String>,
}

#[derive(Deserialize)]
struct RawTypes {
    #[serde(rename = "fType")]
    forward: String,
    #[serde(rename = "rType")]
    reverse: String,
}

#[derive(Deserialize)]
struct RawCondition {
    path: String,
    interface: String,
    property: String,
    values: Vec<Json>,
}

fn malformed(message: impl Into<std::borrow::Cow<'static, str>>, file: &Path) -> AssociationError {
    AssociationError::MalformedDeclaration {
        message: message.into(),
        context: Some(file.display().to_string().into()),
    }
}

fn non_empty<'a>(field: &'static str, value: &'a str, file: &Path) -> Result<&'a str, AssociationError> {
    if value.is_empty() {
        Err(malformed(format!("empty `{field}`"), file))
    } else {
        Ok(value)
    }
}

pub(crate) fn read_json(file: &Path) -> Result<Json, AssociationError> {
    let data = fs::read(file).context(format!("Failed to read {}", file.display()))?;
    serde_json::from_slice(&data).map_err(|err| malformed(err.to_string(), file))
}

/// Converts the rule array of a primary file or of a gate's `associations` block.
///
/// Forward and endpoint paths are anchored below `root`. Several entries for the
/// same forward path accumulate.
///
/// # Errors
///
/// Returns [`AssociationError::MalformedDeclaration`] for a wrong shape or an empty field.
pub fn parse_rules(json: &Json, root: &str, file: &Path) -> Result<Rules, AssociationError> {
    let raw: Vec<RawRule> =
        serde_json::from_value(json.clone()).map_err(|err| malformed(err.to_string(), file))?;

    let mut rules = Rules::new();
    for rule in raw {
        let path = absolize(root, non_empty("path", &rule.path, file)?);
        let endpoints = rules.entry(path).or_default();
        for endpoint in rule.endpoints {
            let forward = non_empty("fType", &endpoint.types.forward, file)?.to_owned();
            let reverse = non_empty("rType", &endpoint.types.reverse, file)?.to_owned();
            if endpoint.paths.is_empty() {
                return Err(malformed("empty `paths`", file));
            }
            let paths = endpoint
                .paths
                .iter()
                .map(|p| non_empty("paths", p, file).map(|p| absolize(root, p)))
                .collect::<Result<Vec<_>, _>>()?;
            endpoints.push(Endpoint { types: Types { forward, reverse }, paths });
        }
    }
    Ok(rules)
}

/// Loads a primary rule file: a top-level array of rules.
///
/// # Errors
///
/// Returns [`AssociationError::Io`] if the file cannot be read and
/// [`AssociationError::MalformedDeclaration`] if its content is invalid.
pub fn load_rules(file: &Path, root: &str) -> Result<Rules, AssociationError> {
    parse_rules(&read_json(file)?, root, file)
}

/// Loads the `associations` block of an activated gate file.
///
/// # Errors
///
/// Same as [`load_rules`]; a gate file without the block is malformed.
pub fn load_gated_rules(file: &Path, root: &str) -> Result<Rules, AssociationError> {
    let json = read_json(file)?;
    let block = json.get("associations").ok_or_else(|| malformed("missing `associations`", file))?;
    parse_rules(block, root, file)
}

/// Reads the `condition` block of a file, if it has one.
///
/// # Errors
///
/// Returns [`AssociationError::MalformedDeclaration`] if the block is present but
/// incomplete, or a value is neither a supported scalar nor a byte array.
pub fn load_condition(file: &Path, root: &str) -> Result<Option<Condition>, AssociationError> {
    let json = read_json(file)?;
    let Some(block) = json.get("condition") else {
        return Ok(None);
    };

    let raw: RawCondition =
        serde_json::from_value(block.clone()).map_err(|err| malformed(err.to_string(), file))?;
    if raw.values.is_empty() {
        return Err(malformed("empty `values`", file));
    }

    let values =
        raw.values.iter().map(|v| parse_value(v, file)).collect::<Result<Vec<_>, _>>()?;

    Ok(Some(Condition {
        path: absolize(root, non_empty("path", &raw.path, file)?),
        interface: non_empty("interface", &raw.interface, file)?.to_owned(),
        property: non_empty("property", &raw.property, file)?.to_owned(),
        values,
        file: file.to_path_buf(),
        actual_value: None,
    }))
}

/// Maps an untyped JSON scalar or byte array onto a [`Value`].
fn parse_value(raw: &Json, file: &Path) -> Result<Value, AssociationError> {
    match raw {
        Json::Bool(b) => Ok(Value::Bool(*b)),
        Json::String(s) => Ok(Value::String(s.clone())),
        Json::Number(n) => n
            .as_i64()
            .map(Value::Int64)
            .or_else(|| n.as_u64().map(Value::UInt64))
            .ok_or_else(|| malformed(format!("unsupported number {n}"), file)),
        Json::Array(items) => items
            .iter()
            .map(|item| item.as_u64().and_then(|b| u8::try_from(b).ok()))
            .collect::<Option<Vec<u8>>>()
            .map(Value::Bytes)
            .ok_or_else(|| malformed("byte arrays may only hold 0..=255", file)),
        other => Err(malformed(format!("unsupported value {other}"), file)),
    }
}
