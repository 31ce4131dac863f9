//! Entity structures

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::{
    AttributeValue, ComponentAttribute, ComponentId, ComponentStatus, ComponentTypeId, HistoryId,
    OperationType, Timestamp, UserId,
};

/// Attributes every component type carries so warranty tracking works.
pub const REQUIRED_TYPE_ATTRIBUTES: [&str; 2] = ["warrantyEndDate", "serialNumber"];

// ============================================================================
// COMPONENT TYPE
// ============================================================================

/// Named schema describing which attributes a class of components exposes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ComponentType {
    pub id: ComponentTypeId,
    pub name: String,
    pub attributes: Vec<String>,
}

/// Input for creating or overwriting a component type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct NewComponentType {
    pub name: String,
    #[serde(default)]
    pub attributes: Vec<String>,
}

impl NewComponentType {
    pub fn new(name: impl Into<String>, attributes: Vec<String>) -> Self {
        Self {
            name: name.into(),
            attributes,
        }
    }

    /// Attributes as an ordered set with the required ones appended.
    ///
    /// First occurrence wins; blank names are dropped.
    pub fn with_required_attributes(mut self) -> Self {
        let mut normalized: Vec<String> = Vec::with_capacity(self.attributes.len() + 2);
        let supplied = self.attributes.drain(..);
        let required = REQUIRED_TYPE_ATTRIBUTES.iter().map(|s| s.to_string());
        for attr in supplied.chain(required) {
            let attr = attr.trim().to_string();
            if !attr.is_empty() && !normalized.contains(&attr) {
                normalized.push(attr);
            }
        }
        self.attributes = normalized;
        self
    }
}

// ============================================================================
// COMPONENT
// ============================================================================

/// A tracked inventory item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Component {
    pub id: ComponentId,
    pub status: ComponentStatus,
    pub brand: String,
    pub model: String,
    pub model_year: Option<i32>,
    pub type_id: ComponentTypeId,
    pub screen_size: String,
    pub resolution: String,
    pub processor_type: String,
    pub processor_cores: Option<i32>,
    pub ram: Option<i32>,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub warranty_end_date: Timestamp,
    pub serial_number: String,
    pub condition: String,
    pub notes: String,
    pub email_notified: bool,
}

/// The client-writable fields of a component.
///
/// `status: None` means "default" on create and "keep current" on update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentDraft {
    pub status: Option<ComponentStatus>,
    pub brand: String,
    pub model: String,
    pub model_year: Option<i32>,
    pub type_id: ComponentTypeId,
    pub screen_size: String,
    pub resolution: String,
    pub processor_type: String,
    pub processor_cores: Option<i32>,
    pub ram: Option<i32>,
    pub warranty_end_date: Timestamp,
    pub serial_number: String,
    pub condition: String,
    pub notes: String,
}

impl Component {
    /// Materialise a freshly created component.
    pub fn from_draft(id: ComponentId, draft: ComponentDraft) -> Self {
        Self {
            id,
            status: draft.status.unwrap_or_default(),
            brand: draft.brand,
            model: draft.model,
            model_year: draft.model_year,
            type_id: draft.type_id,
            screen_size: draft.screen_size,
            resolution: draft.resolution,
            processor_type: draft.processor_type,
            processor_cores: draft.processor_cores,
            ram: draft.ram,
            warranty_end_date: draft.warranty_end_date,
            serial_number: draft.serial_number,
            condition: draft.condition,
            notes: draft.notes,
            email_notified: false,
        }
    }

    /// Overwrite every mutable field from `draft`.
    ///
    /// A changed warranty end date re-arms the expiry notifier. Returns
    /// whether that happened.
    pub fn overwrite_with(&mut self, draft: ComponentDraft) -> bool {
        let warranty_changed = self.warranty_end_date != draft.warranty_end_date;
        if let Some(status) = draft.status {
            self.status = status;
        }
        self.brand = draft.brand;
        self.model = draft.model;
        self.model_year = draft.model_year;
        self.type_id = draft.type_id;
        self.screen_size = draft.screen_size;
        self.resolution = draft.resolution;
        self.processor_type = draft.processor_type;
        self.processor_cores = draft.processor_cores;
        self.ram = draft.ram;
        self.warranty_end_date = draft.warranty_end_date;
        self.serial_number = draft.serial_number;
        self.condition = draft.condition;
        self.notes = draft.notes;
        if warranty_changed {
            self.email_notified = false;
        }
        warranty_changed
    }

    /// Typed value of one attribute; `None` for a NULL column.
    pub fn attribute_value(&self, attribute: ComponentAttribute) -> Option<AttributeValue> {
        use ComponentAttribute as A;
        let text = |s: &str| Some(AttributeValue::Text(s.to_string()));
        match attribute {
            A::Id => Some(AttributeValue::Int(self.id)),
            A::Status => text(self.status.as_db_str()),
            A::Brand => text(&self.brand),
            A::Model => text(&self.model),
            A::ModelYear => self.model_year.map(AttributeValue::Int),
            A::TypeId => Some(AttributeValue::Int(self.type_id)),
            A::ScreenSize => text(&self.screen_size),
            A::Resolution => text(&self.resolution),
            A::ProcessorType => text(&self.processor_type),
            A::ProcessorCores => self.processor_cores.map(AttributeValue::Int),
            A::Ram => self.ram.map(AttributeValue::Int),
            A::WarrantyEndDate => Some(AttributeValue::Timestamp(self.warranty_end_date)),
            A::SerialNumber => text(&self.serial_number),
            A::Condition => text(&self.condition),
            A::Notes => text(&self.notes),
            A::EmailNotified => Some(AttributeValue::Bool(self.email_notified)),
        }
    }

    /// Ascending order on one attribute with NULLs last, as Postgres sorts.
    pub fn cmp_by(&self, other: &Self, attribute: ComponentAttribute) -> Ordering {
        match (self.attribute_value(attribute), other.attribute_value(attribute)) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }
}

// ============================================================================
// INVENTORY HISTORY
// ============================================================================

/// Immutable record of one state-changing action on a component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct InventoryHistoryEntry {
    pub id: HistoryId,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub created_at: Timestamp,
    pub component_id: ComponentId,
    pub user_id: UserId,
    pub operation_type: OperationType,
    /// Display name frozen at write time.
    pub user_name: String,
}

/// A ledger entry about to be appended. The store assigns id and timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewHistoryEntry {
    pub component_id: ComponentId,
    pub user_id: UserId,
    pub operation_type: OperationType,
    pub user_name: String,
}

impl NewHistoryEntry {
    pub fn new(
        component_id: ComponentId,
        user_id: impl Into<UserId>,
        operation_type: OperationType,
        user_name: impl Into<String>,
    ) -> Self {
        Self {
            component_id,
            user_id: user_id.into(),
            operation_type,
            user_name: user_name.into(),
        }
    }
}

impl InventoryHistoryEntry {
    /// Newest-first order: later `created_at` wins, ties go to the higher id.
    pub fn recency_cmp(&self, other: &Self) -> Ordering {
        self.created_at
            .cmp(&other.created_at)
            .then(self.id.cmp(&other.id))
    }
}

// ============================================================================
// DIRECTORY USERS
// ============================================================================

/// A user as reported by the external directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct DirectoryUser {
    pub id: UserId,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

impl DirectoryUser {
    /// "First Last", the form frozen into ledger entries.
    pub fn full_name(&self) -> String {
        [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Case-insensitive substring match on the display name.
    pub fn display_name_contains(&self, term: &str) -> bool {
        let needle = term.to_lowercase();
        self.display_name
            .as_deref()
            .map(|name| name.to_lowercase().contains(&needle))
            .unwrap_or(false)
    }
}

/// Identity shown for the latest actor on a component.
///
/// When the directory can no longer resolve the user, only `display_name`
/// is filled, from the name frozen in the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct InteractantUser {
    pub id: Option<UserId>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

impl InteractantUser {
    pub fn from_snapshot(user_name: &str) -> Self {
        Self {
            id: None,
            first_name: None,
            last_name: None,
            email: None,
            display_name: Some(user_name.to_string()),
        }
    }
}

impl From<DirectoryUser> for InteractantUser {
    fn from(user: DirectoryUser) -> Self {
        Self {
            id: Some(user.id),
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            display_name: user.display_name,
        }
    }
}

/// Latest actor on a component together with its current status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct LastInteraction {
    pub last_interactant_user: InteractantUser,
    pub component_status: ComponentStatus,
}
