//! Component attribute schema.
//!
//! Every queryable column of a component is named here together with its
//! declared value kind. Filters, sorting and the distinct-values lookup all
//! resolve a client-supplied name through [`ComponentAttribute::parse`], so
//! an unknown name never reaches a query and every value is typed before it
//! is compared.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{ComponentStatus, Timestamp, ValidationError};

/// Declared value kind of a component attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeKind {
    Text,
    Int,
    Status,
    Timestamp,
    Bool,
}

/// A queryable component column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum ComponentAttribute {
    Id,
    Status,
    Brand,
    Model,
    ModelYear,
    TypeId,
    ScreenSize,
    Resolution,
    ProcessorType,
    ProcessorCores,
    Ram,
    WarrantyEndDate,
    SerialNumber,
    Condition,
    Notes,
    EmailNotified,
}

impl ComponentAttribute {
    pub const ALL: [ComponentAttribute; 16] = [
        ComponentAttribute::Id,
        ComponentAttribute::Status,
        ComponentAttribute::Brand,
        ComponentAttribute::Model,
        ComponentAttribute::ModelYear,
        ComponentAttribute::TypeId,
        ComponentAttribute::ScreenSize,
        ComponentAttribute::Resolution,
        ComponentAttribute::ProcessorType,
        ComponentAttribute::ProcessorCores,
        ComponentAttribute::Ram,
        ComponentAttribute::WarrantyEndDate,
        ComponentAttribute::SerialNumber,
        ComponentAttribute::Condition,
        ComponentAttribute::Notes,
        ComponentAttribute::EmailNotified,
    ];

    /// Attributes accepted as exact-match filters on the listing endpoint.
    pub const FILTERABLE: [ComponentAttribute; 10] = [
        ComponentAttribute::Status,
        ComponentAttribute::Brand,
        ComponentAttribute::TypeId,
        ComponentAttribute::ModelYear,
        ComponentAttribute::ScreenSize,
        ComponentAttribute::ProcessorType,
        ComponentAttribute::ProcessorCores,
        ComponentAttribute::Ram,
        ComponentAttribute::SerialNumber,
        ComponentAttribute::Condition,
    ];

    /// Column name in the `components` table.
    pub fn column(&self) -> &'static str {
        match self {
            ComponentAttribute::Id => "id",
            ComponentAttribute::Status => "status",
            ComponentAttribute::Brand => "brand",
            ComponentAttribute::Model => "model",
            ComponentAttribute::ModelYear => "model_year",
            ComponentAttribute::TypeId => "type_id",
            ComponentAttribute::ScreenSize => "screen_size",
            ComponentAttribute::Resolution => "resolution",
            ComponentAttribute::ProcessorType => "processor_type",
            ComponentAttribute::ProcessorCores => "processor_cores",
            ComponentAttribute::Ram => "ram",
            ComponentAttribute::WarrantyEndDate => "warranty_end_date",
            ComponentAttribute::SerialNumber => "serial_number",
            ComponentAttribute::Condition => "condition",
            ComponentAttribute::Notes => "notes",
            ComponentAttribute::EmailNotified => "email_notified",
        }
    }

    /// Field name in the JSON representation.
    pub fn json_name(&self) -> &'static str {
        match self {
            ComponentAttribute::Id => "id",
            ComponentAttribute::Status => "status",
            ComponentAttribute::Brand => "brand",
            ComponentAttribute::Model => "model",
            ComponentAttribute::ModelYear => "modelYear",
            ComponentAttribute::TypeId => "typeId",
            ComponentAttribute::ScreenSize => "screenSize",
            ComponentAttribute::Resolution => "resolution",
            ComponentAttribute::ProcessorType => "processorType",
            ComponentAttribute::ProcessorCores => "processorCores",
            ComponentAttribute::Ram => "ram",
            ComponentAttribute::WarrantyEndDate => "warrantyEndDate",
            ComponentAttribute::SerialNumber => "serialNumber",
            ComponentAttribute::Condition => "condition",
            ComponentAttribute::Notes => "notes",
            ComponentAttribute::EmailNotified => "emailNotified",
        }
    }

    pub fn kind(&self) -> AttributeKind {
        match self {
            ComponentAttribute::Id
            | ComponentAttribute::ModelYear
            | ComponentAttribute::TypeId
            | ComponentAttribute::ProcessorCores
            | ComponentAttribute::Ram => AttributeKind::Int,
            ComponentAttribute::Status => AttributeKind::Status,
            ComponentAttribute::WarrantyEndDate => AttributeKind::Timestamp,
            ComponentAttribute::EmailNotified => AttributeKind::Bool,
            ComponentAttribute::Brand
            | ComponentAttribute::Model
            | ComponentAttribute::ScreenSize
            | ComponentAttribute::Resolution
            | ComponentAttribute::ProcessorType
            | ComponentAttribute::SerialNumber
            | ComponentAttribute::Condition
            | ComponentAttribute::Notes => AttributeKind::Text,
        }
    }

    pub fn is_filterable(&self) -> bool {
        Self::FILTERABLE.contains(self)
    }

    /// Resolve a client-supplied name, accepting both the JSON (camelCase)
    /// and the column (snake_case) spelling.
    pub fn parse(name: &str) -> Result<Self, ValidationError> {
        let trimmed = name.trim();
        Self::ALL
            .into_iter()
            .find(|attr| attr.json_name() == trimmed || attr.column() == trimmed)
            .ok_or_else(|| ValidationError::UnknownAttribute {
                name: name.to_string(),
            })
    }

    /// Parse a raw filter value according to this attribute's kind.
    pub fn parse_value(&self, raw: &str) -> Result<AttributeValue, ValidationError> {
        let invalid = |reason: String| ValidationError::InvalidValue {
            field: self.json_name().to_string(),
            reason,
        };
        match self.kind() {
            AttributeKind::Text => Ok(AttributeValue::Text(raw.to_string())),
            AttributeKind::Status => ComponentStatus::from_db_str(raw)
                .map(|s| AttributeValue::Text(s.as_db_str().to_string()))
                .map_err(|e| invalid(e.to_string())),
            AttributeKind::Int => raw
                .trim()
                .parse::<i32>()
                .map(AttributeValue::Int)
                .map_err(|e| invalid(e.to_string())),
            AttributeKind::Bool => raw
                .trim()
                .parse::<bool>()
                .map(AttributeValue::Bool)
                .map_err(|e| invalid(e.to_string())),
            AttributeKind::Timestamp => raw
                .trim()
                .parse::<Timestamp>()
                .map(AttributeValue::Timestamp)
                .map_err(|e| invalid(e.to_string())),
        }
    }
}

impl fmt::Display for ComponentAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.json_name())
    }
}

/// A single typed attribute value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AttributeValue {
    Text(String),
    Int(i32),
    Timestamp(Timestamp),
    Bool(bool),
}

/// Distinct values of one attribute, typed by the attribute's declared kind.
///
/// Serialises as a plain JSON array of strings, numbers or booleans.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum AttributeValues {
    Text(Vec<String>),
    Int(Vec<i32>),
    #[cfg_attr(feature = "openapi", schema(value_type = Vec<String>))]
    Timestamp(Vec<Timestamp>),
    Bool(Vec<bool>),
}

impl AttributeValues {
    /// Empty result of the right shape for `attribute`.
    pub fn empty_for(attribute: ComponentAttribute) -> Self {
        match attribute.kind() {
            AttributeKind::Text | AttributeKind::Status => AttributeValues::Text(Vec::new()),
            AttributeKind::Int => AttributeValues::Int(Vec::new()),
            AttributeKind::Timestamp => AttributeValues::Timestamp(Vec::new()),
            AttributeKind::Bool => AttributeValues::Bool(Vec::new()),
        }
    }

    /// Build from values already sorted ascending and de-duplicated.
    ///
    /// Values whose variant does not match the attribute's kind are dropped.
    pub fn collect(attribute: ComponentAttribute, values: Vec<AttributeValue>) -> Self {
        let mut out = Self::empty_for(attribute);
        for value in values {
            match (&mut out, value) {
                (AttributeValues::Text(v), AttributeValue::Text(s)) => v.push(s),
                (AttributeValues::Int(v), AttributeValue::Int(i)) => v.push(i),
                (AttributeValues::Timestamp(v), AttributeValue::Timestamp(t)) => v.push(t),
                (AttributeValues::Bool(v), AttributeValue::Bool(b)) => v.push(b),
                _ => {}
            }
        }
        out
    }

    pub fn len(&self) -> usize {
        match self {
            AttributeValues::Text(v) => v.len(),
            AttributeValues::Int(v) => v.len(),
            AttributeValues::Timestamp(v) => v.len(),
            AttributeValues::Bool(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_both_spellings() {
        assert_eq!(
            ComponentAttribute::parse("modelYear"),
            Ok(ComponentAttribute::ModelYear)
        );
        assert_eq!(
            ComponentAttribute::parse("model_year"),
            Ok(ComponentAttribute::ModelYear)
        );
        assert!(ComponentAttribute::parse("password; DROP TABLE").is_err());
    }

    #[test]
    fn test_filterable_excludes_free_text_columns() {
        assert!(ComponentAttribute::Brand.is_filterable());
        assert!(!ComponentAttribute::Notes.is_filterable());
        assert!(!ComponentAttribute::Model.is_filterable());
    }

    #[test]
    fn test_parse_value_by_kind() {
        assert_eq!(
            ComponentAttribute::Ram.parse_value("16"),
            Ok(AttributeValue::Int(16))
        );
        assert!(ComponentAttribute::Ram.parse_value("sixteen").is_err());
        assert_eq!(
            ComponentAttribute::Status.parse_value("being used"),
            Ok(AttributeValue::Text("Being Used".to_string()))
        );
        assert!(ComponentAttribute::Status.parse_value("lost").is_err());
    }

    #[test]
    fn test_values_serialize_as_plain_arrays() {
        let ints = AttributeValues::collect(
            ComponentAttribute::ProcessorCores,
            vec![AttributeValue::Int(4), AttributeValue::Int(8)],
        );
        assert_eq!(serde_json::to_string(&ints).unwrap(), "[4,8]");

        let text = AttributeValues::collect(
            ComponentAttribute::Brand,
            vec![AttributeValue::Text("Dell".into()), AttributeValue::Int(3)],
        );
        assert_eq!(serde_json::to_string(&text).unwrap(), "[\"Dell\"]");
    }

    #[test]
    fn test_empty_values_keep_kind() {
        let empty = AttributeValues::empty_for(ComponentAttribute::Ram);
        assert!(matches!(empty, AttributeValues::Int(ref v) if v.is_empty()));
        assert!(empty.is_empty());
    }
}
