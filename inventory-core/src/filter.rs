//! Component listing query: equality filters, free-text search and sort.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::{
    AttributeValue, Component, ComponentAttribute, ComponentStatus, UserId, ValidationError,
};

/// Sort direction. Anything other than `desc` means ascending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn parse_lenient(raw: Option<&str>) -> Self {
        match raw {
            Some(s) if s.trim().eq_ignore_ascii_case("desc") => SortOrder::Desc,
            _ => SortOrder::Asc,
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComponentSort {
    pub field: ComponentAttribute,
    pub order: SortOrder,
}

/// Filters applied to the component listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComponentFilter {
    /// Exact-match predicates, ANDed together.
    pub equals: Vec<(ComponentAttribute, AttributeValue)>,
    /// Free-text term matched against brand, model, serial number and the
    /// current user's display name.
    pub search: Option<String>,
}

impl ComponentFilter {
    pub fn with_equals(mut self, attribute: ComponentAttribute, value: AttributeValue) -> Self {
        self.equals.push((attribute, value));
        self
    }

    pub fn with_search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    /// Whether every equality predicate holds for `component`.
    pub fn matches_fields(&self, component: &Component) -> bool {
        self.equals
            .iter()
            .all(|(attr, value)| component.attribute_value(*attr).as_ref() == Some(value))
    }

    /// Whether `component` satisfies the free-text term.
    ///
    /// `latest_user_id` is the actor of the component's most recent ledger
    /// entry; `matching_user_ids` are the directory users whose display
    /// name contains the term.
    pub fn matches_search(
        &self,
        component: &Component,
        latest_user_id: Option<&str>,
        matching_user_ids: &[UserId],
    ) -> bool {
        let Some(term) = self.search.as_deref() else {
            return true;
        };
        let needle = term.to_lowercase();
        let text_hit = [&component.brand, &component.model, &component.serial_number]
            .iter()
            .any(|field| field.to_lowercase().contains(&needle));
        if text_hit {
            return true;
        }
        component.status == ComponentStatus::BeingUsed
            && latest_user_id
                .map(|id| matching_user_ids.iter().any(|m| m == id))
                .unwrap_or(false)
    }
}

/// Complete listing request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComponentQuery {
    pub filter: ComponentFilter,
    pub sort: Option<ComponentSort>,
}

impl ComponentQuery {
    /// Build from raw query-string parameters.
    ///
    /// Unknown keys are ignored. Known filter keys with unparseable values,
    /// and `sort` naming an unknown attribute, are rejected.
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, ValidationError> {
        let mut filter = ComponentFilter::default();

        // Stable predicate order keeps generated SQL deterministic.
        for attr in ComponentAttribute::FILTERABLE {
            let raw = params
                .get(attr.json_name())
                .or_else(|| params.get(attr.column()));
            if let Some(raw) = raw {
                filter.equals.push((attr, attr.parse_value(raw)?));
            }
        }

        filter.search = params
            .get("search")
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        let sort = match params.get("sort").map(|s| s.trim()).filter(|s| !s.is_empty()) {
            Some(name) => Some(ComponentSort {
                field: ComponentAttribute::parse(name)?,
                order: SortOrder::parse_lenient(params.get("order").map(String::as_str)),
            }),
            None => None,
        };

        Ok(Self { filter, sort })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_order_defaults_to_ascending() {
        assert_eq!(SortOrder::parse_lenient(None), SortOrder::Asc);
        assert_eq!(SortOrder::parse_lenient(Some("sideways")), SortOrder::Asc);
        assert_eq!(SortOrder::parse_lenient(Some("DESC")), SortOrder::Desc);
    }

    #[test]
    fn test_from_params_collects_filters_in_both_spellings() {
        let q = ComponentQuery::from_params(&params(&[
            ("status", "Being Used"),
            ("brand", "Dell"),
            ("type_id", "3"),
            ("processorCores", "8"),
            ("unrelated", "x"),
        ]))
        .unwrap();
        assert_eq!(q.filter.equals.len(), 4);
        assert!(q
            .filter
            .equals
            .contains(&(ComponentAttribute::TypeId, AttributeValue::Int(3))));
        assert!(q.sort.is_none());
        assert!(q.filter.search.is_none());
    }

    #[test]
    fn test_from_params_rejects_bad_values() {
        assert!(ComponentQuery::from_params(&params(&[("ram", "lots")])).is_err());
        assert!(ComponentQuery::from_params(&params(&[("sort", "1; --")])).is_err());
    }

    #[test]
    fn test_from_params_sort_and_search() {
        let q = ComponentQuery::from_params(&params(&[
            ("sort", "warranty_end_date"),
            ("order", "desc"),
            ("search", "  jane "),
        ]))
        .unwrap();
        assert_eq!(
            q.sort,
            Some(ComponentSort {
                field: ComponentAttribute::WarrantyEndDate,
                order: SortOrder::Desc
            })
        );
        assert_eq!(q.filter.search.as_deref(), Some("jane"));
    }

    #[test]
    fn test_blank_search_is_ignored() {
        let q = ComponentQuery::from_params(&params(&[("search", "   ")])).unwrap();
        assert!(q.filter.search.is_none());
    }
}
