use crate::wizard::ProjectData;

pub const PROJECT_ADDRESS_TOKEN: &str = "{PROJECT_ADDRESS}";
pub const NEW_ARCHITECTURE_STYLE_TOKEN: &str = "{NEW_ARCHITECTURE_STYLE}";
pub const EXISTING_BUILDING_DESC_TOKEN: &str = "{EXISTING_BUILDING_DESC}";

const LOCATION_FALLBACK: &str = "the specified location";
const REQUIREMENTS_FALLBACK: &str = "the new architectural style";
// Not derived from the uploaded photo.
const EXISTING_BUILDING_DESC: &str = "The existing red brick building";

fn or_fallback<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.is_empty() {
        fallback
    } else {
        value
    }
}

/// Replaces every occurrence of the three known placeholders. Matching is
/// literal and case-sensitive; any other `{TOKEN}` is left as written.
pub fn render(template: &str, data: &ProjectData) -> String {
    template
        .replace(
            PROJECT_ADDRESS_TOKEN,
            or_fallback(&data.location, LOCATION_FALLBACK),
        )
        .replace(
            NEW_ARCHITECTURE_STYLE_TOKEN,
            or_fallback(&data.requirements, REQUIREMENTS_FALLBACK),
        )
        .replace(EXISTING_BUILDING_DESC_TOKEN, EXISTING_BUILDING_DESC)
}

/// Without a project the template is shown raw.
pub fn render_optional(template: &str, data: Option<&ProjectData>) -> String {
    match data {
        Some(data) => render(template, data),
        None => template.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project(location: &str, requirements: &str) -> ProjectData {
        ProjectData::new(location, requirements, None, None)
    }

    #[test]
    fn substitutes_location_and_falls_back_when_empty() {
        assert_eq!(render("{PROJECT_ADDRESS}", &project("Seoul", "x")), "Seoul");
        assert_eq!(
            render("{PROJECT_ADDRESS}", &project("", "x")),
            "the specified location"
        );
        assert_eq!(
            render("{NEW_ARCHITECTURE_STYLE}", &project("x", "")),
            "the new architectural style"
        );
    }

    #[test]
    fn existing_building_is_a_fixed_literal() {
        for data in [project("Seoul", "glass"), project("", ""), project("a", "b")] {
            assert_eq!(
                render("{EXISTING_BUILDING_DESC}", &data),
                "The existing red brick building"
            );
        }
    }

    #[test]
    fn replaces_every_occurrence_and_leaves_unknown_tokens() {
        let data = project("Busan", "timber pavilion");
        let rendered = render(
            "{PROJECT_ADDRESS} / {PROJECT_ADDRESS} / {NEW_ARCHITECTURE_STYLE} / {UNKNOWN} / {project_address}",
            &data,
        );
        assert_eq!(
            rendered,
            "Busan / Busan / timber pavilion / {UNKNOWN} / {project_address}"
        );
    }

    #[test]
    fn placeholders_are_substituted_in_fixed_order() {
        let data = project("{NEW_ARCHITECTURE_STYLE}", "brutalist");
        assert_eq!(render("{PROJECT_ADDRESS}", &data), "brutalist");
        let data = project("Lot 7", "{PROJECT_ADDRESS}");
        assert_eq!(render("{NEW_ARCHITECTURE_STYLE}", &data), "{PROJECT_ADDRESS}");
    }

    #[test]
    fn renders_raw_without_project() {
        assert_eq!(
            render_optional("at {PROJECT_ADDRESS}", None),
            "at {PROJECT_ADDRESS}"
        );
    }
}
