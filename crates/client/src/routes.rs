use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use onboard_core::Section;

/// Per-section record endpoints.
///
/// Paths are relative to the client's base URL and carry no trailing slash.
/// Any section without an override uses its default route.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SectionRoutes {
    overrides: BTreeMap<Section, String>,
}

impl SectionRoutes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in route of a section.
    pub fn default_route(section: Section) -> &'static str {
        match section {
            Section::Personal => "/employee-upload/personal-details",
            Section::Address => "/employee-upload/address-details",
            Section::Identity => "/employee-upload/identity-documents",
            Section::Education => "/education/employee-education-document",
            Section::Experience => "/employee-upload/experience-details",
        }
    }

    /// Override the route of one section.
    #[must_use]
    pub fn with(mut self, section: Section, route: impl Into<String>) -> Self {
        self.set(section, route);
        self
    }

    pub fn set(&mut self, section: Section, route: impl Into<String>) {
        let route = route.into();
        let route = format!("/{}", route.trim_matches('/'));
        self.overrides.insert(section, route);
    }

    /// Route of a section, honoring overrides.
    pub fn route(&self, section: Section) -> &str {
        self.overrides
            .get(&section)
            .map_or_else(|| Self::default_route(section), String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let routes = SectionRoutes::new();
        assert_eq!(
            routes.route(Section::Address),
            "/employee-upload/address-details"
        );
        assert_eq!(
            routes.route(Section::Education),
            "/education/employee-education-document"
        );
    }

    #[test]
    fn overrides_are_normalized() {
        let routes = SectionRoutes::new().with(Section::Identity, "v2/identity/");
        assert_eq!(routes.route(Section::Identity), "/v2/identity");
        assert_eq!(
            routes.route(Section::Personal),
            "/employee-upload/personal-details"
        );
    }

    #[test]
    fn deserializes_from_section_map() {
        let routes: SectionRoutes =
            serde_json::from_str(r#"{"experience": "/jobs"}"#).unwrap();
        assert_eq!(routes.route(Section::Experience), "/jobs");
    }
}
