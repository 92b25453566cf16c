//! Spatial filter settings and their query-string encoding.

use serde::{Deserialize, Serialize};

use super::resource::Resource;

/// Lower/upper bound of a range filter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterRange {
    pub min: f64,
    pub max: f64,
}

/// The user-facing input behind a filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FilterInput {
    #[serde(alias = "boolean")]
    Bool { value: bool },
    #[serde(alias = "slider")]
    Range { value: FilterRange },
    /// Any other input kind; never sent to the analysis API.
    #[serde(other)]
    Unsupported,
}

/// One spatial filter as selected by the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterSetting {
    pub id: String,
    #[serde(default)]
    pub active: bool,
    pub input: FilterInput,
    /// Resources this filter applies to; `None` means all of them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub energy_type: Option<Vec<String>>,
}

impl FilterSetting {
    pub fn applies_to(&self, resource: Resource) -> bool {
        match &self.energy_type {
            Some(types) => types.iter().any(|t| resource.matches(t)),
            None => true,
        }
    }

    /// `key=value` or `key=min,max`, or `None` when the filter contributes nothing.
    pub fn query_pair(&self, resource: Resource) -> Option<String> {
        if !self.active || !self.applies_to(resource) {
            return None;
        }
        match &self.input {
            FilterInput::Range { value } => Some(format!("{}={},{}", self.id, value.min, value.max)),
            FilterInput::Bool { value } => Some(format!("{}={}", self.id, value)),
            FilterInput::Unsupported => None,
        }
    }
}

/// Encode the active filters for `resource` as an `&`-joined query string.
pub fn filter_query_string(filters: &[FilterSetting], resource: Resource) -> String {
    filters
        .iter()
        .filter_map(|f| f.query_pair(resource))
        .collect::<Vec<_>>()
        .join("&")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(id: &str, min: f64, max: f64, active: bool) -> FilterSetting {
        FilterSetting {
            id: id.to_string(),
            active,
            input: FilterInput::Range {
                value: FilterRange { min, max },
            },
            energy_type: None,
        }
    }

    #[test]
    fn test_query_string_mixes_ranges_and_booleans() {
        let filters = vec![
            range("f_slope", 0.0, 12.5, true),
            FilterSetting {
                id: "f_protected".into(),
                active: true,
                input: FilterInput::Bool { value: false },
                energy_type: None,
            },
            range("f_pop", 0.0, 100.0, false),
        ];
        assert_eq!(
            filter_query_string(&filters, Resource::Solar),
            "f_slope=0,12.5&f_protected=false"
        );
    }

    #[test]
    fn test_unsupported_inputs_are_skipped() {
        let json = r#"[{"id": "f_text", "active": true, "input": {"type": "text", "value": "x"}}]"#;
        let filters: Vec<FilterSetting> = serde_json::from_str(json).unwrap();
        assert_eq!(filters[0].input, FilterInput::Unsupported);
        assert_eq!(filter_query_string(&filters, Resource::Wind), "");
    }

    #[test]
    fn test_filters_respect_energy_type() {
        let mut f = range("f_depth", 0.0, 50.0, true);
        f.energy_type = Some(vec!["offshore".into()]);
        assert_eq!(f.query_pair(Resource::Solar), None);
        assert_eq!(f.query_pair(Resource::OffshoreWind).as_deref(), Some("f_depth=0,50"));
    }

    #[test]
    fn test_slider_alias() {
        let json = r#"{"id": "f_gsa", "active": true, "input": {"type": "slider", "value": {"min": 1, "max": 2}}}"#;
        let f: FilterSetting = serde_json::from_str(json).unwrap();
        assert_eq!(f.query_pair(Resource::Solar).as_deref(), Some("f_gsa=1,2"));
    }
}
