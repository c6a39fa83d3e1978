//! Property-based tests for path and name validation.
//!
//! These tests use proptest to generate random inputs and verify that
//! invariants hold for all possible inputs.

#[cfg(test)]
mod proptest_tests {
    use crate::group_filter::GroupFilterDirective;
    use crate::validate::{check_project_path, compose_path, is_group_name, normalize_path};
    use proptest::prelude::*;

    // ============================================================================
    // normalize_path property tests
    // ============================================================================

    proptest! {
        /// Property: normalizing twice gives the same result as normalizing once
        #[test]
        fn normalize_path_is_idempotent(path in "[a-z./]{0,30}") {
            let once = normalize_path(&path);
            prop_assert_eq!(normalize_path(&once), once);
        }

        /// Property: normalized paths have no empty or "." components
        #[test]
        fn normalize_path_drops_empty_and_dot(path in "[a-z./]{1,30}") {
            let result = normalize_path(&path);
            if result != "." && result != "/" {
                let body = result.trim_start_matches('/');
                for part in body.split('/') {
                    prop_assert!(!part.is_empty(), "empty component in {:?}", result);
                    prop_assert_ne!(part, ".");
                }
            }
        }

        /// Property: ".." only survives at the start of a relative path
        #[test]
        fn normalize_path_keeps_parent_dirs_leading(path in "(\\.\\.|[a-z]{1,3})(/(\\.\\.|[a-z]{1,3})){0,6}") {
            let result = normalize_path(&path);
            let parts: Vec<&str> = result.split('/').collect();
            let first_regular = parts.iter().position(|p| *p != "..").unwrap_or(parts.len());
            prop_assert!(parts[first_regular..].iter().all(|p| *p != ".."));
        }

        /// Property: absolute paths stay absolute and never climb above the root
        #[test]
        fn normalize_path_absolute_stays_rooted(path in "/[a-z./]{0,30}") {
            let result = normalize_path(&path);
            prop_assert!(result.starts_with('/'));
            prop_assert!(result.split('/').all(|p| p != ".."));
        }
    }

    // ============================================================================
    // compose_path property tests
    // ============================================================================

    proptest! {
        /// Property: composing with empty prefixes is the identity up to normalization
        #[test]
        fn compose_path_ignores_empty_prefixes(path in "[a-z]{1,8}(/[a-z]{1,8}){0,4}") {
            prop_assert_eq!(compose_path(&["", "", &path]), path);
        }

        /// Property: relative segments are joined in order
        #[test]
        fn compose_path_joins_in_order(
            prefix in "[a-z]{1,8}",
            inner in "[a-z]{1,8}",
            name in "[a-z]{1,8}",
        ) {
            let result = compose_path(&[&prefix, &inner, &name]);
            prop_assert_eq!(result, format!("{}/{}/{}", prefix, inner, name));
        }

        /// Property: a prefixed project path is legal whenever the unprefixed one is
        #[test]
        fn compose_path_prefix_preserves_legality(
            prefix in "[a-z]{1,8}",
            path in "[a-z]{1,8}(/[a-z]{1,8}){0,3}",
        ) {
            prop_assert!(check_project_path("p", &path).is_ok());
            prop_assert!(check_project_path("p", &compose_path(&[&prefix, &path])).is_ok());
        }
    }

    // ============================================================================
    // group name property tests
    // ============================================================================

    proptest! {
        /// Property: plain identifiers are valid group names
        #[test]
        fn identifiers_are_group_names(name in "[a-zA-Z_][a-zA-Z0-9_.]{0,20}") {
            prop_assert!(is_group_name(&name));
        }

        /// Property: names containing a separator are never valid
        #[test]
        fn separators_are_rejected(
            head in "[a-z]{1,5}",
            sep in "[ ,:\t]",
            tail in "[a-z]{0,5}",
        ) {
            let name = format!("{}{}{}", head, sep, tail);
            prop_assert!(!is_group_name(&name));
        }

        /// Property: a directive parses exactly when its group name is valid
        #[test]
        fn directive_parse_matches_group_grammar(sign in "[+-]", name in "[a-z+:, -]{0,8}") {
            let token = format!("{}{}", sign, name);
            let parsed = GroupFilterDirective::parse(&token);
            prop_assert_eq!(parsed.is_ok(), is_group_name(&name));
            if let Ok(directive) = parsed {
                prop_assert_eq!(directive.to_string(), token);
            }
        }
    }
}
