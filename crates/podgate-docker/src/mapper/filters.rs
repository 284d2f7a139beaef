//! Docker `filters` query parameter.
//!
//! Docker clients encode filters as JSON in one of two shapes:
//!
//! ```text
//! {"label": {"a=b": true, "c": true}}   current
//! {"label": ["a=b", "c"]}               legacy
//! ```
//!
//! Both decode to the same key → value set mapping.

use super::reference::Reference;
use crate::error::{DockerError, Result};
use podgate_core::podman::{Image, ImageSearchFilter};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};

const LABEL: &str = "label";
const REFERENCE: &str = "reference";
const IS_AUTOMATED: &str = "is-automated";
const IS_OFFICIAL: &str = "is-official";
const STARS: &str = "stars";

#[derive(Deserialize)]
#[serde(untagged)]
enum FilterValues {
    Set(BTreeMap<String, bool>),
    List(Vec<String>),
}

/// Parsed filter arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filters {
    fields: BTreeMap<String, BTreeSet<String>>,
}

impl Filters {
    /// Parses the JSON `filters` parameter. Absent or empty input yields no
    /// filters.
    ///
    /// # Errors
    ///
    /// Returns `BadRequest` if the input is not a filter document.
    pub fn parse(raw: Option<&str>) -> Result<Self> {
        let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
            return Ok(Self::default());
        };

        let decoded: HashMap<String, FilterValues> = serde_json::from_str(raw)
            .map_err(|e| DockerError::bad_request(format!("invalid filters: {e}")))?;

        let fields = decoded
            .into_iter()
            .map(|(key, values)| {
                let values = match values {
                    FilterValues::Set(set) => set.into_keys().collect(),
                    FilterValues::List(list) => list.into_iter().collect(),
                };
                (key, values)
            })
            .collect();

        Ok(Self { fields })
    }

    /// Adds one value under `key`.
    pub fn add(&mut self, key: &str, value: impl Into<String>) {
        self.fields
            .entry(key.to_string())
            .or_default()
            .insert(value.into());
    }

    /// Returns true if any value was given for `key`.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.fields.get(key).is_some_and(|v| !v.is_empty())
    }

    /// Returns the values given for `key`, sorted.
    pub fn get(&self, key: &str) -> impl Iterator<Item = &str> {
        self.fields
            .get(key)
            .into_iter()
            .flat_map(|values| values.iter().map(String::as_str))
    }

    /// Returns true if no values were given for `key`, or `value` is one of
    /// them.
    #[must_use]
    pub fn exact_match(&self, key: &str, value: &str) -> bool {
        match self.fields.get(key) {
            Some(values) if !values.is_empty() => values.contains(value),
            _ => true,
        }
    }

    /// Matches `key=value` / `key` filters against a label map.
    ///
    /// Every filter value must match: a bare key needs the label to exist,
    /// `key=value` needs the exact value. Unlabelled sources never match an
    /// active filter.
    #[must_use]
    pub fn match_kv_list(&self, key: &str, labels: &HashMap<String, String>) -> bool {
        let Some(values) = self.fields.get(key).filter(|v| !v.is_empty()) else {
            return true;
        };
        if labels.is_empty() {
            return false;
        }

        values.iter().all(|filter| match filter.split_once('=') {
            Some((k, v)) => labels.get(k).is_some_and(|actual| actual == v),
            None => labels.contains_key(filter.as_str()),
        })
    }

    /// Returns true if `image` passes the `label` and `reference` filters.
    #[must_use]
    pub fn matches_image(&self, image: &Image) -> bool {
        if self.contains(LABEL) && !self.match_kv_list(LABEL, &image.labels) {
            return false;
        }
        if self.contains(REFERENCE) {
            return self
                .get(REFERENCE)
                .any(|pattern| reference_matches(pattern, &image.repo_tags));
        }
        true
    }

    /// Builds the Podman search filter from `is-automated`, `is-official`
    /// and `stars`.
    ///
    /// # Errors
    ///
    /// Returns `BadRequest` if `stars` is not an integer.
    pub fn search_filter(&self) -> Result<ImageSearchFilter> {
        let mut filter = ImageSearchFilter {
            is_automated: self.tri_state(IS_AUTOMATED),
            is_official: self.tri_state(IS_OFFICIAL),
            ..Default::default()
        };

        if let Some(stars) = self.get(STARS).next() {
            filter.star_count = stars
                .parse()
                .map_err(|_| DockerError::bad_request(format!("invalid filter 'stars={stars}'")))?;
        }

        Ok(filter)
    }

    fn tri_state(&self, key: &str) -> Option<bool> {
        if !self.contains(key) {
            return None;
        }
        if self.exact_match(key, "true") {
            Some(true)
        } else if self.exact_match(key, "false") {
            Some(false)
        } else {
            None
        }
    }
}

/// `name` matches any tag of the repository, `name:tag` only that tag.
fn reference_matches(pattern: &str, repo_tags: &[String]) -> bool {
    let pattern = Reference::split(pattern);
    let prefix = format!("{}:", pattern.name);

    repo_tags.iter().any(|repo_tag| {
        repo_tag.starts_with(&prefix)
            && match pattern.tag.filter(|t| !t.is_empty()) {
                Some(tag) => repo_tag.ends_with(&format!(":{tag}")),
                None => true,
            }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn image(tags: &[&str], labels: &[(&str, &str)]) -> Image {
        Image {
            id: "sha256:abc".to_string(),
            repo_tags: tags.iter().map(ToString::to_string).collect(),
            labels: labels
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn parses_both_encodings() {
        let current = Filters::parse(Some(r#"{"label":{"a=b":true,"c":true}}"#)).unwrap();
        let legacy = Filters::parse(Some(r#"{"label":["a=b","c"]}"#)).unwrap();
        assert_eq!(current, legacy);
        assert_eq!(current.get("label").collect::<Vec<_>>(), vec!["a=b", "c"]);
    }

    #[test]
    fn empty_input_is_no_filters() {
        assert_eq!(Filters::parse(None).unwrap(), Filters::default());
        assert_eq!(Filters::parse(Some("")).unwrap(), Filters::default());
    }

    #[test]
    fn malformed_filters_are_bad_request() {
        let err = Filters::parse(Some("{label")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest);
        let err = Filters::parse(Some(r#"{"label":"a=b"}"#)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest);
    }

    #[test]
    fn label_filter_requires_every_value() {
        let mut filters = Filters::default();
        filters.add("label", "env=prod");
        filters.add("label", "team");

        assert!(filters.matches_image(&image(&[], &[("env", "prod"), ("team", "x")])));
        assert!(!filters.matches_image(&image(&[], &[("env", "prod")])));
        assert!(!filters.matches_image(&image(&[], &[("env", "dev"), ("team", "x")])));
    }

    #[test]
    fn label_filter_ignores_extra_labels() {
        let mut filters = Filters::default();
        filters.add("label", "env=prod");
        assert!(filters.matches_image(&image(&[], &[("env", "prod"), ("other", "1")])));
    }

    #[test]
    fn unlabelled_image_fails_label_filter() {
        let mut filters = Filters::default();
        filters.add("label", "env");
        assert!(!filters.matches_image(&image(&["foo:latest"], &[])));
    }

    #[test]
    fn reference_without_tag_matches_any_tag() {
        let mut filters = Filters::default();
        filters.add("reference", "foo");
        assert!(filters.matches_image(&image(&["foo:latest"], &[])));
        assert!(filters.matches_image(&image(&["foo:1.0"], &[])));
        assert!(!filters.matches_image(&image(&["foobar:latest"], &[])));
    }

    #[test]
    fn reference_with_tag_requires_suffix() {
        let mut filters = Filters::default();
        filters.add("reference", "foo:latest");
        assert!(filters.matches_image(&image(&["foo:latest"], &[])));
        assert!(!filters.matches_image(&image(&["foo:1.0"], &[])));
    }

    #[test]
    fn any_reference_pattern_suffices() {
        let mut filters = Filters::default();
        filters.add("reference", "foo:1.0");
        filters.add("reference", "bar");
        assert!(filters.matches_image(&image(&["bar:edge"], &[])));
        assert!(!filters.matches_image(&image(&["baz:1.0"], &[])));
    }

    #[test]
    fn reference_filter_excludes_untagged_images() {
        let mut filters = Filters::default();
        filters.add("reference", "foo");
        assert!(!filters.matches_image(&image(&[], &[])));
    }

    #[test]
    fn search_filter_tri_state() {
        let filters = Filters::parse(Some(r#"{"is-official":["true"],"is-automated":["false"],"stars":["3"]}"#)).unwrap();
        let filter = filters.search_filter().unwrap();
        assert_eq!(filter.is_official, Some(true));
        assert_eq!(filter.is_automated, Some(false));
        assert_eq!(filter.star_count, 3);

        let unset = Filters::default().search_filter().unwrap();
        assert_eq!(unset.is_official, None);
        assert_eq!(unset.is_automated, None);
        assert_eq!(unset.star_count, 0);
    }

    #[test]
    fn non_integer_stars_is_bad_request() {
        let filters = Filters::parse(Some(r#"{"stars":["many"]}"#)).unwrap();
        assert_eq!(filters.search_filter().unwrap_err().kind(), ErrorKind::BadRequest);
    }
}
