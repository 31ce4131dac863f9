//! Property-Based Tests for component search SQL composition
//!
//! **Property: every caller-supplied value is bound, never inlined**
//!
//! For any search term and filter set, the generated SQL references exactly
//! as many placeholders as there are bound parameters and never contains the
//! search pattern.

use inventory_api::query::{component_search, escape_like, SqlParam};
use inventory_core::{AttributeValue, ComponentAttribute, ComponentFilter, ComponentQuery};
use proptest::prelude::*;

fn placeholder_count(sql: &str) -> usize {
    (1..=16).filter(|n| sql.contains(&format!("${}", n))).count()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_search_term_is_bound(term in "[a-zA-Z0-9%_'\\\\ ]{1,24}", brand in "[a-zA-Z]{1,12}") {
        prop_assume!(!term.trim().is_empty());
        let query = ComponentQuery {
            filter: ComponentFilter::default()
                .with_equals(ComponentAttribute::Brand, AttributeValue::Text(brand.clone()))
                .with_search(term.clone()),
            sort: None,
        };
        let q = component_search(&query, &["u1".to_string()]);

        prop_assert_eq!(q.params.len(), 3);
        prop_assert_eq!(placeholder_count(&q.sql), q.params.len());
        prop_assert_eq!(&q.params[0], &SqlParam::Text(brand));
        let expected = SqlParam::Text(format!("%{}%", escape_like(term.trim())));
        prop_assert_eq!(&q.params[1], &expected);
        let pattern = format!("%{}%", term.trim());
        prop_assert!(!q.sql.contains(&pattern));
    }

    #[test]
    fn prop_escape_like_leaves_no_bare_wildcards(term in ".{0,32}") {
        let escaped = escape_like(&term);
        let mut chars = escaped.chars();
        while let Some(c) = chars.next() {
            if c == '\\' {
                let next = chars.next();
                prop_assert!(matches!(next, Some('\\') | Some('%') | Some('_')));
            } else {
                prop_assert!(c != '%' && c != '_');
            }
        }
    }
}
