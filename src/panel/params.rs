//! Query parameter metadata and validation
//!
//! Every panel declares its query parameters up front: whether each is
//! required, its default, an example value, and optionally a closed set of
//! accepted values. The declaration drives both request validation and the
//! generated help document.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::json;

/// Metadata for a single query parameter
#[derive(Debug, Clone, Default)]
pub struct ParamMeta {
    /// Whether the parameter must be present
    pub required: bool,
    /// Example value shown in help output
    pub example: Option<&'static str>,
    /// Value applied when the parameter is absent
    pub default: Option<&'static str>,
    /// Closed set of accepted values, if any
    pub available: Option<&'static [&'static str]>,
    /// Human-readable description
    pub description: Option<&'static str>,
}

impl ParamMeta {
    /// A required parameter
    #[must_use]
    pub const fn required() -> Self {
        Self {
            required: true,
            example: None,
            default: None,
            available: None,
            description: None,
        }
    }

    /// An optional parameter
    #[must_use]
    pub const fn optional() -> Self {
        Self {
            required: false,
            example: None,
            default: None,
            available: None,
            description: None,
        }
    }

    /// Set the example value
    #[must_use]
    pub const fn with_example(mut self, example: &'static str) -> Self {
        self.example = Some(example);
        self
    }

    /// Set the default value
    #[must_use]
    pub const fn with_default(mut self, default: &'static str) -> Self {
        self.default = Some(default);
        self
    }

    /// Restrict to a closed set of values
    #[must_use]
    pub const fn with_available(mut self, available: &'static [&'static str]) -> Self {
        self.available = Some(available);
        self
    }

    /// Set the description
    #[must_use]
    pub const fn with_description(mut self, description: &'static str) -> Self {
        self.description = Some(description);
        self
    }
}

/// A named parameter declaration
///
/// Panels expose these as an ordered slice; order is reflected in help
/// output and example URLs.
#[derive(Debug, Clone)]
pub struct QueryParam {
    /// Parameter name as it appears in the query string
    pub name: &'static str,
    /// Parameter metadata
    pub meta: ParamMeta,
}

impl QueryParam {
    /// Create a parameter declaration
    #[must_use]
    pub const fn new(name: &'static str, meta: ParamMeta) -> Self {
        Self { name, meta }
    }
}

/// One validation problem with a request's query parameters
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ParamIssue {
    /// The parameter the issue is about
    pub param: String,
    /// Issue kind: `missing` or `invalid`
    pub error: &'static str,
    /// Human-readable message
    pub message: String,
    /// The rejected value, for `invalid` issues
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// Validate and normalize a request's query parameters
///
/// Declared parameters are checked in order: missing required parameters
/// and out-of-set values produce issues; absent optional parameters with a
/// default get the default applied. Undeclared query parameters are
/// ignored.
#[must_use]
pub fn validate(
    declared: &[QueryParam],
    query: &HashMap<String, String>,
) -> (HashMap<String, String>, Vec<ParamIssue>) {
    let mut normalized = HashMap::new();
    let mut issues = Vec::new();

    for param in declared {
        let value = query.get(param.name);

        let Some(value) = value else {
            if param.meta.required {
                issues.push(ParamIssue {
                    param: param.name.to_string(),
                    error: "missing",
                    message: "parameter is required".to_string(),
                    value: None,
                });
                continue;
            }
            if let Some(default) = param.meta.default {
                normalized.insert(param.name.to_string(), default.to_string());
            }
            continue;
        };

        if let Some(available) = param.meta.available {
            if !available.contains(&value.as_str()) {
                issues.push(ParamIssue {
                    param: param.name.to_string(),
                    error: "invalid",
                    message: format!("must be one of {available:?}"),
                    value: Some(value.clone()),
                });
                continue;
            }
        }

        normalized.insert(param.name.to_string(), value.clone());
    }

    (normalized, issues)
}

/// Build an example request URL from the required parameters
///
/// Uses the example value when present, falling back to the default, then
/// to a `<name>` placeholder.
#[must_use]
pub fn example_url(id: &str, declared: &[QueryParam]) -> String {
    let parts: Vec<String> = declared
        .iter()
        .filter(|p| p.meta.required)
        .map(|p| {
            let value = p
                .meta
                .example
                .or(p.meta.default)
                .map_or_else(|| format!("<{}>", p.name), ToString::to_string);
            format!("{}={}", p.name, value)
        })
        .collect();

    format!("/board/{id}?{}", parts.join("&"))
}

/// Build the help document for a panel
#[must_use]
pub fn help_doc(id: &str, description: &str, declared: &[QueryParam]) -> serde_json::Value {
    let mut params = serde_json::Map::new();
    for param in declared {
        params.insert(
            param.name.to_string(),
            json!({
                "required": param.meta.required,
                "example": param.meta.example,
                "default": param.meta.default,
                "available": param.meta.available,
                "description": param.meta.description,
            }),
        );
    }

    json!({
        "name": id,
        "description": description,
        "method": "GET",
        "endpoint": format!("/board/{id}"),
        "query_params": params,
        "example": example_url(id, declared),
    })
}
