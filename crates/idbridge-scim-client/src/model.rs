//! SCIM resource parsing and request payloads.
//!
//! Provider resources arrive as loosely-typed JSON; parsing is lenient on
//! purpose (a resource lacking its id or principal name is skipped rather
//! than failing the whole list), while the payloads we send are built from
//! typed values.

use idbridge_core::{Group, User};
use serde::Serialize;
use serde_json::{json, Value};

/// SCIM Core User schema URI.
pub const USER_SCHEMA: &str = "urn:ietf:params:scim:schemas:core:2.0:User";

/// SCIM Core Group schema URI.
pub const GROUP_SCHEMA: &str = "urn:ietf:params:scim:schemas:core:2.0:Group";

/// SCIM PatchOp message schema URI (RFC 7644 §3.5.2).
pub const PATCH_OP_SCHEMA: &str = "urn:ietf:params:scim:api:messages:2.0:PatchOp";

/// A provider-side user. Missing string attributes are kept as empty
/// strings so attribute deltas reduce to plain equality.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScimUser {
    /// Provider-assigned resource id.
    pub id: String,
    /// The `userName`, canonically the user's email.
    pub email: String,
    /// Correlation to the source identity; empty when never provisioned
    /// by us.
    pub external_id: String,
    pub full_name: String,
    pub first_name: String,
    pub last_name: String,
    pub active: bool,
    /// Ids of the provider groups the user belongs to.
    pub groups: Vec<String>,
}

/// A provider-side group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScimGroup {
    pub id: String,
    pub name: String,
    pub external_id: String,
    /// Member user resource ids from the initial snapshot.
    pub members: Vec<String>,
}

fn string_at(value: &Value, key: &str) -> String {
    value.get(key).and_then(Value::as_str).unwrap_or_default().to_string()
}

/// Parse a User resource. Returns `None` when `id` or `userName` is
/// missing; such resources are silently skipped.
pub fn parse_user(value: &Value) -> Option<ScimUser> {
    let id = value.get("id")?.as_str()?.to_string();
    let email = value.get("userName")?.as_str()?.to_string();

    let (first_name, last_name) = match value.get("name") {
        Some(name) => (string_at(name, "givenName"), string_at(name, "familyName")),
        None => (String::new(), String::new()),
    };

    let groups = value
        .get("groups")
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(|entry| entry.get("value"))
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Some(ScimUser {
        id,
        email,
        external_id: string_at(value, "externalId"),
        full_name: string_at(value, "displayName"),
        first_name,
        last_name,
        active: value.get("active").and_then(Value::as_bool).unwrap_or_default(),
        groups,
    })
}

/// Parse a Group resource. Returns `None` when `id` or `displayName` is
/// missing.
pub fn parse_group(value: &Value) -> Option<ScimGroup> {
    let id = value.get("id")?.as_str()?.to_string();
    let name = value.get("displayName")?.as_str()?.to_string();

    let members = value
        .get("members")
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(|entry| entry.get("value"))
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Some(ScimGroup {
        id,
        name,
        external_id: string_at(value, "externalId"),
        members,
    })
}

/// One PATCH operation (RFC 7644 §3.5.2).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatchOp {
    pub op: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl PatchOp {
    pub fn replace(path: impl Into<String>, value: Value) -> Self {
        Self {
            op: "replace".to_string(),
            path: Some(path.into()),
            value: Some(value),
        }
    }

    pub fn add(path: impl Into<String>, value: Value) -> Self {
        Self {
            op: "add".to_string(),
            path: Some(path.into()),
            value: Some(value),
        }
    }

    pub fn remove(path: impl Into<String>) -> Self {
        Self {
            op: "remove".to_string(),
            path: Some(path.into()),
            value: None,
        }
    }
}

/// A PATCH request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatchRequest {
    pub schemas: Vec<String>,

    #[serde(rename = "Operations")]
    pub operations: Vec<PatchOp>,
}

impl PatchRequest {
    pub fn new(operations: Vec<PatchOp>) -> Self {
        Self {
            schemas: vec![PATCH_OP_SCHEMA.to_string()],
            operations,
        }
    }
}

/// POST body creating a provider user from a source user.
pub fn user_create_payload(user: &User) -> Value {
    json!({
        "schemas": [USER_SCHEMA],
        "userName": user.email,
        "externalId": user.id,
        "active": user.active,
        "name": {
            "givenName": user.first_name,
            "familyName": user.last_name,
        },
        "displayName": user.full_name,
    })
}

/// POST body creating a provider group from a source group.
pub fn group_create_payload(group: &Group) -> Value {
    json!({
        "schemas": [GROUP_SCHEMA],
        "displayName": group.name,
        "externalId": group.id,
    })
}

/// Attribute delta between a source user and its provider counterpart.
///
/// Matching is case-insensitive but writes preserve the source casing, so
/// the comparison here is exact.
pub fn user_diff_ops(desired: &User, current: &ScimUser) -> Vec<PatchOp> {
    let mut ops = Vec::new();
    if desired.email != current.email {
        ops.push(PatchOp::replace("userName", json!(desired.email)));
    }
    if desired.id != current.external_id {
        ops.push(PatchOp::replace("externalId", json!(desired.id)));
    }
    if desired.active != current.active {
        ops.push(PatchOp::replace("active", json!(desired.active)));
    }
    if desired.first_name != current.first_name {
        ops.push(PatchOp::replace("name.givenName", json!(desired.first_name)));
    }
    if desired.last_name != current.last_name {
        ops.push(PatchOp::replace("name.familyName", json!(desired.last_name)));
    }
    if desired.full_name != current.full_name {
        ops.push(PatchOp::replace("displayName", json!(desired.full_name)));
    }
    ops
}

/// Attribute delta between a source group and its provider counterpart.
pub fn group_diff_ops(desired: &Group, current: &ScimGroup) -> Vec<PatchOp> {
    let mut ops = Vec::new();
    if desired.name != current.name {
        ops.push(PatchOp::replace("displayName", json!(desired.name)));
    }
    if desired.id != current.external_id {
        ops.push(PatchOp::replace("externalId", json!(desired.id)));
    }
    ops
}
