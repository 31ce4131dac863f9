//! Request and response bodies that only exist on the wire.
//!
//! Entities that are returned as-is (`Component`, `ComponentType`,
//! `InventoryHistoryEntry`, ...) serialise straight from `inventory-core`.

use inventory_core::{ComponentDraft, ComponentId, ComponentStatus, ComponentTypeId, Timestamp};
use serde::{Deserialize, Deserializer, Serialize};

// ============================================================================
// COMPONENTS
// ============================================================================

/// Client-writable component fields.
///
/// Omitted text fields are stored as empty strings. A missing `status`
/// means "Ready to Use" on create and "unchanged" on update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ComponentInput {
    #[serde(default, deserialize_with = "blank_status")]
    pub status: Option<ComponentStatus>,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub model_year: Option<i32>,
    pub type_id: ComponentTypeId,
    #[serde(default)]
    pub screen_size: String,
    #[serde(default)]
    pub resolution: String,
    #[serde(default)]
    pub processor_type: String,
    #[serde(default)]
    pub processor_cores: Option<i32>,
    #[serde(default)]
    pub ram: Option<i32>,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub warranty_end_date: Timestamp,
    #[serde(default)]
    pub serial_number: String,
    #[serde(default)]
    pub condition: String,
    #[serde(default)]
    pub notes: String,
}

/// Reads `status` as a display string; blank or null is unset.
fn blank_status<'de, D>(deserializer: D) -> Result<Option<ComponentStatus>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(_) => ComponentStatus::parse_or_default(raw.as_deref())
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

impl From<ComponentInput> for ComponentDraft {
    fn from(input: ComponentInput) -> Self {
        ComponentDraft {
            status: input.status,
            brand: input.brand,
            model: input.model,
            model_year: input.model_year,
            type_id: input.type_id,
            screen_size: input.screen_size,
            resolution: input.resolution,
            processor_type: input.processor_type,
            processor_cores: input.processor_cores,
            ram: input.ram,
            warranty_end_date: input.warranty_end_date,
            serial_number: input.serial_number,
            condition: input.condition,
            notes: input.notes,
        }
    }
}

/// Request to create a component on behalf of a directory user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CreateComponentRequest {
    pub component: ComponentInput,
    /// Directory id of the user who added the component
    pub user_id: String,
}

/// Presigned download URLs for a component's images.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ImageListResponse {
    pub images: Vec<String>,
}

/// Response to a successful image upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ImageUploadResponse {
    pub key: String,
}

// ============================================================================
// HISTORY
// ============================================================================

/// Request to append a ledger entry.
///
/// `operation_type` is kept as a string so unknown values surface as a
/// validation error instead of a deserialisation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct RecordHistoryRequest {
    pub component_id: ComponentId,
    pub user_id: String,
    /// One of `Added`, `Assigned` or `Returned`
    pub operation_type: String,
}

// ============================================================================
// DIRECTORY
// ============================================================================

/// Profile photo as a data URL, or an empty string when there is none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct PhotoResponse {
    pub photo_url: String,
}

/// Public identifiers the web client needs to start a sign-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct PublicAuthConfig {
    pub tenant_id: String,
    pub client_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_input_defaults_missing_text_fields() {
        let json = r#"{"typeId":1,"warrantyEndDate":"2030-01-01T00:00:00Z","brand":"Dell"}"#;
        let input: ComponentInput = serde_json::from_str(json).unwrap();
        let draft = ComponentDraft::from(input);
        assert_eq!(draft.brand, "Dell");
        assert_eq!(draft.notes, "");
        assert_eq!(draft.status, None);
        assert_eq!(draft.ram, None);
    }

    #[test]
    fn test_component_input_reads_display_status() {
        let json = r#"{"typeId":1,"warrantyEndDate":"2030-01-01T00:00:00Z","status":"Being Used"}"#;
        let input: ComponentInput = serde_json::from_str(json).unwrap();
        assert_eq!(input.status, Some(ComponentStatus::BeingUsed));
    }

    #[test]
    fn test_component_input_blank_status_is_unset() {
        let json = r#"{"component":{"typeId":1,"warrantyEndDate":"2030-01-01T00:00:00Z","status":""},"userId":"u1"}"#;
        let req: CreateComponentRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.component.status, None);

        let json = r#"{"typeId":1,"warrantyEndDate":"2030-01-01T00:00:00Z","status":null}"#;
        let input: ComponentInput = serde_json::from_str(json).unwrap();
        assert_eq!(input.status, None);
    }

    #[test]
    fn test_component_input_rejects_unknown_status() {
        let json = r#"{"typeId":1,"warrantyEndDate":"2030-01-01T00:00:00Z","status":"Lost"}"#;
        assert!(serde_json::from_str::<ComponentInput>(json).is_err());
    }

    #[test]
    fn test_record_history_request_is_camel_case() {
        let json = r#"{"componentId":7,"userId":"u1","operationType":"Assigned"}"#;
        let req: RecordHistoryRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.component_id, 7);
        assert_eq!(req.operation_type, "Assigned");
    }

    #[test]
    fn test_photo_response_field_name() {
        let json = serde_json::to_string(&PhotoResponse {
            photo_url: String::new(),
        })
        .unwrap();
        assert_eq!(json, r#"{"photoUrl":""}"#);
    }
}
