//! Partial-update operations
//!
//! A patch is an ordered list of field-level operations addressed by JSON
//! pointers. Operations are applied one after another, so each sees the
//! document left by the previous one, and the whole list is atomic: if any
//! operation fails, the document is left untouched.

use super::errors::{AzLearnError, ErrorKind, RequestError};
use super::result::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Largest number of operations a single patch may carry
pub const MAX_PATCH_OPERATIONS: usize = 10;

/// A single patch operation
///
/// Serializes to the service's wire shape, e.g.
/// `{"op":"add","path":"/history/0","value":{...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum PatchOperation {
    /// Create or replace an object member, replace an array element,
    /// or append with `-`
    Set { path: String, value: Value },
    /// Create or replace an object member, insert into an array at an index
    /// (shifting later elements), or append with `-`
    Add { path: String, value: Value },
    /// Remove an existing member or array element
    Remove { path: String },
    /// Replace an existing member or array element
    Replace { path: String, value: Value },
    /// Add a number to a numeric member, creating it if absent
    #[serde(rename = "incr")]
    Increment { path: String, value: Value },
}

impl PatchOperation {
    /// `set` operation with any serializable value
    pub fn set(path: impl Into<String>, value: impl Serialize) -> Result<Self> {
        Ok(PatchOperation::Set {
            path: path.into(),
            value: serde_json::to_value(value)?,
        })
    }

    /// `add` operation with any serializable value
    pub fn add(path: impl Into<String>, value: impl Serialize) -> Result<Self> {
        Ok(PatchOperation::Add {
            path: path.into(),
            value: serde_json::to_value(value)?,
        })
    }

    /// `remove` operation
    pub fn remove(path: impl Into<String>) -> Self {
        PatchOperation::Remove { path: path.into() }
    }

    /// `replace` operation with any serializable value
    pub fn replace(path: impl Into<String>, value: impl Serialize) -> Result<Self> {
        Ok(PatchOperation::Replace {
            path: path.into(),
            value: serde_json::to_value(value)?,
        })
    }

    /// `incr` operation
    pub fn increment(path: impl Into<String>, by: impl Into<serde_json::Number>) -> Self {
        PatchOperation::Increment {
            path: path.into(),
            value: Value::Number(by.into()),
        }
    }

    /// JSON pointer targeted by this operation
    pub fn path(&self) -> &str {
        match self {
            PatchOperation::Set { path, .. }
            | PatchOperation::Add { path, .. }
            | PatchOperation::Remove { path }
            | PatchOperation::Replace { path, .. }
            | PatchOperation::Increment { path, .. } => path,
        }
    }

    /// Wire name of the operation
    pub fn op_name(&self) -> &'static str {
        match self {
            PatchOperation::Set { .. } => "set",
            PatchOperation::Add { .. } => "add",
            PatchOperation::Remove { .. } => "remove",
            PatchOperation::Replace { .. } => "replace",
            PatchOperation::Increment { .. } => "incr",
        }
    }
}

impl fmt::Display for PatchOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.op_name(), self.path())
    }
}

/// Renders an operation list for logging, e.g. `set /status; add /history/0`
pub fn describe(ops: &[PatchOperation]) -> String {
    ops.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Splits a JSON pointer into unescaped reference tokens
///
/// `~1` decodes to `/` and `~0` to `~`. The root pointer is rejected since
/// a patch always targets a member.
pub fn parse_pointer(path: &str) -> Result<Vec<String>> {
    let Some(rest) = path.strip_prefix('/') else {
        return Err(AzLearnError::Validation(format!(
            "Patch path '{path}' must start with '/'"
        )));
    };
    if rest.is_empty() {
        return Err(AzLearnError::Validation(
            "Patch path cannot target the document root".to_string(),
        ));
    }
    Ok(rest
        .split('/')
        .map(|token| token.replace("~1", "/").replace("~0", "~"))
        .collect())
}

/// Checks the operation list before anything is applied
///
/// Rejects empty or oversized lists, malformed paths, and any operation that
/// touches `/id` or the partition key path.
pub fn validate(ops: &[PatchOperation], partition_key_path: &str) -> Result<()> {
    if ops.is_empty() {
        return Err(AzLearnError::Validation(
            "Patch requires at least one operation".to_string(),
        ));
    }
    if ops.len() > MAX_PATCH_OPERATIONS {
        return Err(AzLearnError::Validation(format!(
            "Patch carries {} operations, the limit is {MAX_PATCH_OPERATIONS}",
            ops.len()
        )));
    }

    let pk_tokens = parse_pointer(partition_key_path)?;
    for op in ops {
        let tokens = parse_pointer(op.path())?;
        if tokens.len() == 1 && tokens[0] == "id" {
            return Err(AzLearnError::Validation(
                "Patch cannot modify the document id".to_string(),
            ));
        }
        if tokens.starts_with(&pk_tokens) {
            return Err(AzLearnError::Validation(format!(
                "Patch cannot modify the partition key path '{partition_key_path}'"
            )));
        }
    }
    Ok(())
}

/// Applies the operations in order to `document`
///
/// The document is only replaced once every operation has succeeded.
pub fn apply(
    document: &mut Value,
    ops: &[PatchOperation],
    partition_key_path: &str,
) -> Result<()> {
    validate(ops, partition_key_path)?;

    let mut working = document.clone();
    for op in ops {
        apply_one(&mut working, op)?;
    }
    *document = working;
    Ok(())
}

fn apply_one(document: &mut Value, op: &PatchOperation) -> Result<()> {
    let tokens = parse_pointer(op.path())?;
    let (last, parents) = match tokens.split_last() {
        Some(split) => split,
        None => return Err(precondition(op, "empty path")),
    };

    let mut target = document;
    for token in parents {
        target = match target {
            Value::Object(map) => map
                .get_mut(token.as_str())
                .ok_or_else(|| precondition(op, &format!("member '{token}' does not exist")))?,
            Value::Array(items) => {
                let index = array_index(token, items.len(), false)
                    .ok_or_else(|| precondition(op, &format!("index '{token}' is out of range")))?;
                &mut items[index]
            }
            _ => {
                return Err(precondition(
                    op,
                    &format!("'{token}' is not inside an object or array"),
                ))
            }
        };
    }

    match target {
        Value::Object(map) => match op {
            PatchOperation::Set { value, .. } | PatchOperation::Add { value, .. } => {
                map.insert(last.clone(), value.clone());
            }
            PatchOperation::Replace { value, .. } => {
                let slot = map
                    .get_mut(last.as_str())
                    .ok_or_else(|| precondition(op, "target does not exist"))?;
                *slot = value.clone();
            }
            PatchOperation::Remove { .. } => {
                map.remove(last.as_str())
                    .ok_or_else(|| precondition(op, "target does not exist"))?;
            }
            PatchOperation::Increment { value, .. } => {
                let current = map.get(last.as_str());
                let next = increment(current, value, op)?;
                map.insert(last.clone(), next);
            }
        },
        Value::Array(items) => {
            let len = items.len();
            match op {
                PatchOperation::Add { value, .. } => {
                    let index = array_index(last, len, true)
                        .ok_or_else(|| precondition(op, "index is out of range"))?;
                    items.insert(index, value.clone());
                }
                PatchOperation::Set { value, .. } => {
                    if last == "-" {
                        items.push(value.clone());
                    } else {
                        let index = array_index(last, len, false)
                            .ok_or_else(|| precondition(op, "index is out of range"))?;
                        items[index] = value.clone();
                    }
                }
                PatchOperation::Replace { value, .. } => {
                    let index = array_index(last, len, false)
                        .ok_or_else(|| precondition(op, "index is out of range"))?;
                    items[index] = value.clone();
                }
                PatchOperation::Remove { .. } => {
                    let index = array_index(last, len, false)
                        .ok_or_else(|| precondition(op, "index is out of range"))?;
                    items.remove(index);
                }
                PatchOperation::Increment { value, .. } => {
                    let index = array_index(last, len, false)
                        .ok_or_else(|| precondition(op, "index is out of range"))?;
                    let next = increment(Some(&items[index]), value, op)?;
                    items[index] = next;
                }
            }
        }
        _ => return Err(precondition(op, "parent is not an object or array")),
    }
    Ok(())
}

/// Resolves an array reference token. `-` means "one past the end" and is
/// only accepted where an insert position is allowed.
fn array_index(token: &str, len: usize, allow_end: bool) -> Option<usize> {
    if token == "-" {
        return allow_end.then_some(len);
    }
    // Leading zeros are not valid pointer indices
    if token.len() > 1 && token.starts_with('0') {
        return None;
    }
    let index: usize = token.parse().ok()?;
    let bound = if allow_end { len + 1 } else { len };
    (index < bound).then_some(index)
}

fn increment(current: Option<&Value>, by: &Value, op: &PatchOperation) -> Result<Value> {
    let Value::Number(by) = by else {
        return Err(bad_request(op, "increment value must be a number"));
    };
    let current = match current {
        None => return Ok(Value::Number(by.clone())),
        Some(Value::Number(n)) => n,
        Some(_) => return Err(bad_request(op, "target is not a number")),
    };

    if let (Some(a), Some(b)) = (current.as_i64(), by.as_i64()) {
        if let Some(sum) = a.checked_add(b) {
            return Ok(Value::from(sum));
        }
    }
    let sum = current.as_f64().unwrap_or_default() + by.as_f64().unwrap_or_default();
    serde_json::Number::from_f64(sum)
        .map(Value::Number)
        .ok_or_else(|| bad_request(op, "increment produced a non-finite number"))
}

fn precondition(op: &PatchOperation, detail: &str) -> AzLearnError {
    AzLearnError::precondition_failed(format!("{op}: {detail}"))
}

fn bad_request(op: &PatchOperation, detail: &str) -> AzLearnError {
    RequestError::new(ErrorKind::BadRequest, format!("{op}: {detail}")).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const PK: &str = "/phone";

    fn doc() -> Value {
        json!({
            "id": "a",
            "phone": "123",
            "status": 2,
            "comment": null,
            "history": [],
            "counter": 1
        })
    }

    #[test]
    fn test_sequential_adds_at_head_reverse_order() {
        let mut d = doc();
        let ops = vec![
            PatchOperation::add("/history/0", json!("A")).unwrap(),
            PatchOperation::add("/history/0", json!("B")).unwrap(),
            PatchOperation::add("/history/0", json!("C")).unwrap(),
        ];
        apply(&mut d, &ops, PK).unwrap();
        assert_eq!(d["history"], json!(["C", "B", "A"]));
    }

    #[test]
    fn test_add_dash_appends() {
        let mut d = doc();
        let ops = vec![
            PatchOperation::add("/history/-", 1).unwrap(),
            PatchOperation::add("/history/-", 2).unwrap(),
        ];
        apply(&mut d, &ops, PK).unwrap();
        assert_eq!(d["history"], json!([1, 2]));
    }

    #[test]
    fn test_remove_shifts_down() {
        let mut d = json!({"id": "a", "phone": "1", "history": [0, 1, 2]});
        apply(&mut d, &[PatchOperation::remove("/history/1")], PK).unwrap();
        assert_eq!(d["history"], json!([0, 2]));
    }

    #[test]
    fn test_set_replaces_array_element_and_creates_member() {
        let mut d = json!({"id": "a", "phone": "1", "history": [0, 1]});
        let ops = vec![
            PatchOperation::set("/history/1", 9).unwrap(),
            PatchOperation::set("/lineOfBiz", "test").unwrap(),
        ];
        apply(&mut d, &ops, PK).unwrap();
        assert_eq!(d["history"], json!([0, 9]));
        assert_eq!(d["lineOfBiz"], "test");
    }

    #[test]
    fn test_failure_leaves_document_untouched() {
        let mut d = doc();
        let before = d.clone();
        let ops = vec![
            PatchOperation::set("/status", 1).unwrap(),
            PatchOperation::remove("/history/3"),
        ];
        let err = apply(&mut d, &ops, PK).unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::PreconditionFailed));
        assert_eq!(d, before);
    }

    #[test]
    fn test_missing_parent_is_precondition_failed() {
        let mut d = doc();
        let err = apply(&mut d, &[PatchOperation::set("/missing/child", 1).unwrap()], PK)
            .unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::PreconditionFailed));
    }

    #[test]
    fn test_replace_and_remove_require_target() {
        let mut d = doc();
        assert!(apply(&mut d, &[PatchOperation::replace("/nope", 1).unwrap()], PK).is_err());
        assert!(apply(&mut d, &[PatchOperation::remove("/nope")], PK).is_err());
        apply(&mut d, &[PatchOperation::replace("/status", 0).unwrap()], PK).unwrap();
        assert_eq!(d["status"], 0);
    }

    #[test]
    fn test_add_index_past_end_fails() {
        let mut d = doc();
        let err = apply(&mut d, &[PatchOperation::add("/history/1", 1).unwrap()], PK).unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::PreconditionFailed));
    }

    #[test]
    fn test_increment() {
        let mut d = doc();
        let ops = vec![
            PatchOperation::increment("/counter", 4),
            PatchOperation::increment("/fresh", 2),
        ];
        apply(&mut d, &ops, PK).unwrap();
        assert_eq!(d["counter"], 5);
        assert_eq!(d["fresh"], 2);

        let err = apply(&mut d, &[PatchOperation::increment("/phone", 1)], "/other").unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::BadRequest));
    }

    #[test]
    fn test_id_and_partition_key_are_protected() {
        let mut d = doc();
        let id_err = apply(&mut d, &[PatchOperation::set("/id", "b").unwrap()], PK).unwrap_err();
        assert!(matches!(id_err, AzLearnError::Validation(_)));
        let pk_err = apply(&mut d, &[PatchOperation::set("/phone", "9").unwrap()], PK).unwrap_err();
        assert!(matches!(pk_err, AzLearnError::Validation(_)));
    }

    #[test]
    fn test_operation_limits() {
        let mut d = doc();
        assert!(apply(&mut d, &[], PK).is_err());
        let many: Vec<_> = (0..11).map(|i| PatchOperation::set("/x", i).unwrap()).collect();
        assert!(apply(&mut d, &many, PK).is_err());
    }

    #[test]
    fn test_pointer_escapes() {
        assert_eq!(parse_pointer("/a~1b/c~0d").unwrap(), vec!["a/b", "c~d"]);
        assert!(parse_pointer("no-slash").is_err());
        assert!(parse_pointer("/").is_err());
    }

    #[test]
    fn test_wire_shape() {
        let op = PatchOperation::increment("/n", 1);
        assert_eq!(
            serde_json::to_value(&op).unwrap(),
            json!({"op": "incr", "path": "/n", "value": 1})
        );
        let op = PatchOperation::remove("/history/1");
        assert_eq!(
            serde_json::to_value(&op).unwrap(),
            json!({"op": "remove", "path": "/history/1"})
        );
    }

    #[test]
    fn test_describe() {
        let ops = vec![
            PatchOperation::set("/status", 1).unwrap(),
            PatchOperation::remove("/history/1"),
        ];
        assert_eq!(describe(&ops), "set /status; remove /history/1");
    }
}
