use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Free-form attribute map attached to an object (colors, sizes, prices...).
pub type Attributes = Map<String, Value>;

/// An object as returned by the upstream list / get endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Object {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Attributes>,
}

/// An object returned by create / update / partial update. Upstream stamps
/// `createdAt` on create and `updatedAt` on the update variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedObject {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Attributes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// Client-supplied body for create and full update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectPayload {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Attributes>,
}

impl ObjectPayload {
    /// The only business rule the gateway enforces: a name must be present.
    pub fn is_valid(&self) -> bool {
        !self.name.trim().is_empty()
    }
}

/// Client-supplied body for partial update. Absent fields are left untouched
/// upstream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Attributes>,
}

impl ObjectPatch {
    pub fn is_valid(&self) -> bool {
        let name_ok = match &self.name {
            Some(name) => !name.trim().is_empty(),
            None => true,
        };
        name_ok && (self.name.is_some() || self.data.is_some())
    }
}

/// Upstream answer to a delete, e.g. `{"message": "Object with id = 7 has been deleted."}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteConfirmation {
    pub message: String,
}
