//! # Group and Project Filters
//!
//! Projects may be tagged with groups, and manifests enable or disable
//! groups with `group-filter:` directives such as `-optional` or `+extra`.
//! Because every document reached during import resolution may carry its
//! own `group-filter:`, resolution records one batch of directives per
//! document in a [`DirectiveLog`] and computes the final disabled set from
//! it afterwards.
//!
//! ## Replay contract
//!
//! Batches are appended in resolution order. For a single document the
//! order is: batches from its `self: import:` chain, then its own batch,
//! then batches from its projects' imports. The disabled set is computed by
//! replaying the batches from the most recently appended to the first one
//! appended, so a batch appended earlier overrides any later one that
//! names the same group. In practice the top-level manifest's own batch
//! beats everything reached through project imports.
//!
//! ## Project filters
//!
//! Independently of groups, the `manifest.project-filter` configuration
//! option holds `+regex`/`-regex` rules matched against whole project
//! names. The last matching rule decides; see [`ProjectFilter`].

use regex::Regex;
use std::collections::BTreeSet;
use std::fmt;

use crate::error::{Error, Result};
use crate::validate::is_group_name;

/// One `+group` or `-group` token.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupFilterDirective {
    pub group: String,
    /// `true` for `+group`
    pub enable: bool,
}

impl GroupFilterDirective {
    /// Parses a `+group` or `-group` token.
    pub fn parse(token: &str) -> std::result::Result<Self, String> {
        let (enable, group) = match token.chars().next() {
            Some('+') => (true, &token[1..]),
            Some('-') => (false, &token[1..]),
            _ => {
                return Err(format!(
                    "group filter item {:?} must start with \"+\" or \"-\"",
                    token
                ))
            }
        };
        if !is_group_name(group) {
            return Err(format!("invalid group name {:?} in {:?}", group, token));
        }
        Ok(GroupFilterDirective {
            group: group.to_string(),
            enable,
        })
    }
}

impl fmt::Display for GroupFilterDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", if self.enable { '+' } else { '-' }, self.group)
    }
}

/// An ordered list of directives from one source.
pub type GroupFilter = Vec<GroupFilterDirective>;

/// Applies `filter` to `disabled` in order: `-g` adds `g`, `+g` removes it.
pub fn update_disabled_groups(disabled: &mut BTreeSet<String>, filter: &[GroupFilterDirective]) {
    for directive in filter {
        if directive.enable {
            disabled.remove(&directive.group);
        } else {
            disabled.insert(directive.group.clone());
        }
    }
}

/// Parses the comma-separated `manifest.group-filter` configuration value.
///
/// Invalid items are dropped with a warning rather than failing.
pub fn parse_config_group_filter(raw: &str) -> GroupFilter {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .filter_map(|item| match GroupFilterDirective::parse(item) {
            Ok(directive) => Some(directive),
            Err(complaint) => {
                log::warn!(
                    "ignoring invalid manifest.group-filter item {:?}: {}",
                    item,
                    complaint
                );
                None
            }
        })
        .collect()
}

/// Group-filter batches recorded during resolution, in append order.
#[derive(Debug, Clone, Default)]
pub struct DirectiveLog {
    batches: Vec<GroupFilter>,
}

impl DirectiveLog {
    pub fn append(&mut self, batch: GroupFilter) {
        log::debug!(
            "group-filter batch {}: {}",
            self.batches.len(),
            display_filter(&batch)
        );
        self.batches.push(batch);
    }

    pub fn is_empty(&self) -> bool {
        self.batches.iter().all(Vec::is_empty)
    }

    pub fn batches(&self) -> &[GroupFilter] {
        &self.batches
    }

    /// Replays every batch, most recently appended first.
    pub fn disabled_groups(&self) -> BTreeSet<String> {
        let mut disabled = BTreeSet::new();
        for batch in self.batches.iter().rev() {
            update_disabled_groups(&mut disabled, batch);
        }
        disabled
    }
}

/// Renders directives as a comma-separated list for messages.
pub fn display_filter(filter: &[GroupFilterDirective]) -> String {
    filter
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// One `+regex` or `-regex` rule from `manifest.project-filter`.
#[derive(Debug, Clone)]
pub struct ProjectFilterRule {
    /// Anchored so it must match the whole name
    pub pattern: Regex,
    pub make_active: bool,
}

/// Outcome of evaluating the project filter for one project.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterVerdict {
    Active,
    Inactive,
    /// No rule matched; group logic decides
    NoMatch,
}

/// The parsed `manifest.project-filter` option.
#[derive(Debug, Clone, Default)]
pub struct ProjectFilter {
    rules: Vec<ProjectFilterRule>,
}

impl ProjectFilter {
    /// Parses a comma-separated list of `+regex`/`-regex` items.
    ///
    /// Empty items are skipped. Anything else that is not a sign followed
    /// by a valid regular expression is an error.
    pub fn parse(raw: &str) -> Result<Self> {
        let mut rules = Vec::new();
        for item in raw.split(',').map(str::trim) {
            if item.is_empty() {
                continue;
            }
            let make_active = match item.chars().next() {
                Some('+') => true,
                Some('-') => false,
                _ => {
                    return Err(Error::MalformedConfig {
                        message: format!(
                            "invalid manifest.project-filter item {:?}: it must start with \"+\" or \"-\"",
                            item
                        ),
                    })
                }
            };
            let body = &item[1..];
            if body.is_empty() {
                return Err(Error::MalformedConfig {
                    message: format!(
                        "invalid manifest.project-filter item {:?}: a regular expression is required after the sign",
                        item
                    ),
                });
            }
            let pattern = Regex::new(&format!("^(?:{})$", body)).map_err(|e| {
                Error::MalformedConfig {
                    message: format!(
                        "invalid manifest.project-filter item {:?}: {}",
                        item, e
                    ),
                }
            })?;
            rules.push(ProjectFilterRule {
                pattern,
                make_active,
            });
        }
        Ok(ProjectFilter { rules })
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn rules(&self) -> &[ProjectFilterRule] {
        &self.rules
    }

    /// Evaluates the rules against a project name; the last match wins.
    pub fn evaluate(&self, name: &str) -> FilterVerdict {
        self.rules
            .iter()
            .rev()
            .find(|rule| rule.pattern.is_match(name))
            .map(|rule| {
                if rule.make_active {
                    FilterVerdict::Active
                } else {
                    FilterVerdict::Inactive
                }
            })
            .unwrap_or(FilterVerdict::NoMatch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(tokens: &[&str]) -> GroupFilter {
        tokens
            .iter()
            .map(|t| GroupFilterDirective::parse(t).unwrap())
            .collect()
    }

    #[test]
    fn test_parse_directive() {
        let d = GroupFilterDirective::parse("+foo").unwrap();
        assert!(d.enable);
        assert_eq!(d.group, "foo");
        assert_eq!(d.to_string(), "+foo");
        let d = GroupFilterDirective::parse("-3").unwrap();
        assert!(!d.enable);
        assert_eq!(d.group, "3");
    }

    #[test]
    fn test_parse_directive_rejects() {
        assert!(GroupFilterDirective::parse("foo").is_err());
        assert!(GroupFilterDirective::parse("+").is_err());
        assert!(GroupFilterDirective::parse("-").is_err());
        assert!(GroupFilterDirective::parse("+-foo").is_err());
        assert!(GroupFilterDirective::parse("+a b").is_err());
        assert!(GroupFilterDirective::parse("+a:b").is_err());
        assert!(GroupFilterDirective::parse("").is_err());
    }

    #[test]
    fn test_update_disabled_groups_in_order() {
        let mut disabled = BTreeSet::new();
        update_disabled_groups(&mut disabled, &batch(&["-a", "-b", "+a"]));
        assert_eq!(disabled, BTreeSet::from(["b".to_string()]));
    }

    #[test]
    fn test_earlier_batch_overrides_later() {
        let mut log = DirectiveLog::default();
        log.append(batch(&["-foo"]));
        log.append(batch(&["+foo", "-bar"]));
        let disabled = log.disabled_groups();
        assert!(disabled.contains("foo"));
        assert!(disabled.contains("bar"));

        let mut log = DirectiveLog::default();
        log.append(batch(&["+foo"]));
        log.append(batch(&["-foo"]));
        assert!(log.disabled_groups().is_empty());
    }

    #[test]
    fn test_log_emptiness() {
        let mut log = DirectiveLog::default();
        assert!(log.is_empty());
        log.append(batch(&["-x"]));
        assert!(!log.is_empty());
        assert_eq!(log.batches().len(), 1);
    }

    #[test]
    fn test_config_group_filter_drops_invalid() {
        testing_logger::setup();
        let filter = parse_config_group_filter("-foo, bogus ,+bar,,+");
        assert_eq!(display_filter(&filter), "-foo,+bar");
        testing_logger::validate(|captured| {
            let warnings: Vec<_> = captured
                .iter()
                .filter(|l| l.level == log::Level::Warn)
                .collect();
            assert_eq!(warnings.len(), 2);
            assert!(warnings[0].body.contains("bogus"));
        });
    }

    #[test]
    fn test_project_filter_last_match_wins() {
        let filter = ProjectFilter::parse("-.*,+hal_.*, -hal_bad").unwrap();
        assert_eq!(filter.evaluate("zephyr"), FilterVerdict::Inactive);
        assert_eq!(filter.evaluate("hal_good"), FilterVerdict::Active);
        assert_eq!(filter.evaluate("hal_bad"), FilterVerdict::Inactive);
    }

    #[test]
    fn test_project_filter_full_match_only() {
        let filter = ProjectFilter::parse("-hal").unwrap();
        assert_eq!(filter.evaluate("hal"), FilterVerdict::Inactive);
        assert_eq!(filter.evaluate("hal_nordic"), FilterVerdict::NoMatch);
        assert_eq!(filter.evaluate("myhal"), FilterVerdict::NoMatch);
    }

    #[test]
    fn test_project_filter_errors() {
        for raw in ["hal", "+", "-", "+a,-", "+(unclosed"] {
            let err = ProjectFilter::parse(raw).unwrap_err();
            assert!(
                matches!(err, Error::MalformedConfig { .. }),
                "{raw} gave {err}"
            );
        }
        assert!(ProjectFilter::parse("").unwrap().is_empty());
        assert!(ProjectFilter::parse(" , ").unwrap().is_empty());
    }
}
