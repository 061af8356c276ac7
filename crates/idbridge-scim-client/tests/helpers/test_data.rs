//! Generators for SCIM resources and source snapshot entities.

#![allow(dead_code)]

use idbridge_core::{Group, User};
use serde_json::{json, Value};

/// A minimal SCIM User resource as a provider would return it.
pub fn user_resource(id: &str, email: &str, external_id: Option<&str>, active: bool) -> Value {
    json!({
        "schemas": ["urn:ietf:params:scim:schemas:core:2.0:User"],
        "id": id,
        "externalId": external_id,
        "userName": email,
        "active": active,
    })
}

/// A fully-attributed SCIM User resource.
pub fn user_resource_full(
    id: &str,
    email: &str,
    external_id: Option<&str>,
    active: bool,
    first_name: &str,
    last_name: &str,
    display_name: &str,
) -> Value {
    json!({
        "schemas": ["urn:ietf:params:scim:schemas:core:2.0:User"],
        "id": id,
        "externalId": external_id,
        "userName": email,
        "active": active,
        "displayName": display_name,
        "name": {"givenName": first_name, "familyName": last_name},
    })
}

/// A SCIM Group resource with members.
pub fn group_resource(
    id: &str,
    display_name: &str,
    external_id: Option<&str>,
    member_ids: &[&str],
) -> Value {
    let members: Vec<Value> = member_ids
        .iter()
        .map(|mid| json!({"value": mid, "$ref": format!("/Users/{mid}")}))
        .collect();
    json!({
        "schemas": ["urn:ietf:params:scim:schemas:core:2.0:Group"],
        "id": id,
        "externalId": external_id,
        "displayName": display_name,
        "members": members,
    })
}

/// A single-page SCIM ListResponse covering all resources.
pub fn list_response(resources: Vec<Value>) -> Value {
    let total = resources.len();
    json!({
        "schemas": ["urn:ietf:params:scim:api:messages:2.0:ListResponse"],
        "totalResults": total,
        "startIndex": 1,
        "itemsPerPage": total,
        "Resources": resources,
    })
}

/// An empty ListResponse.
pub fn empty_list_response() -> Value {
    list_response(Vec::new())
}

/// A source user with the display name derived from the name parts.
pub fn source_user(id: &str, email: &str, first: &str, last: &str, groups: &[&str]) -> User {
    User {
        id: id.to_string(),
        email: email.to_string(),
        full_name: User::derived_full_name(first, last),
        first_name: first.to_string(),
        last_name: last.to_string(),
        active: true,
        groups: groups.iter().map(|g| g.to_string()).collect(),
    }
}

/// A source group.
pub fn source_group(id: &str, name: &str) -> Group {
    Group {
        id: id.to_string(),
        name: name.to_string(),
    }
}
