//! Selection strategies for locating form controls.
//!
//! Selectors are preferentially attribute based (`data-testid`, `id`); the
//! label-adjacency strategy locates the first control of a given tag that
//! follows a `<label>` whose normalised text contains a given string, and is
//! meant only for controls that carry no stable identifier.
//!
//! Every selector renders to a JavaScript expression that evaluates to the
//! element or `null`. String operands are embedded as JSON literals so
//! user-supplied text can never break out of the generated script.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Control tag targeted by a label-adjacency selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlTag {
    /// `<input>`
    Input,
    /// `<select>`
    Select,
    /// `<textarea>`
    Textarea,
}

impl ControlTag {
    /// Tag name as used in XPath/CSS
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Select => "select",
            Self::Textarea => "textarea",
        }
    }
}

/// Selector type for locating elements
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "by", content = "value", rename_all = "snake_case")]
pub enum Selector {
    /// Test ID selector (`data-testid` attribute)
    TestId(String),
    /// Element id
    Id(String),
    /// CSS selector (e.g., `button.primary`)
    Css(String),
    /// XPath selector
    XPath(String),
    /// Control whose `placeholder` attribute starts with the given text
    Placeholder(String),
    /// First control of `control` kind following a label containing `label`
    LabelFollowing {
        /// Label text to match (normalised, substring)
        label: String,
        /// Kind of control to pick after the label
        control: ControlTag,
    },
    /// Button whose normalised text contains `text`
    ButtonText {
        /// Button text to match
        text: String,
        /// Restrict to `type="submit"` buttons
        submit: bool,
    },
}

impl Selector {
    /// Create a test ID selector
    #[must_use]
    pub fn test_id(id: impl Into<String>) -> Self {
        Self::TestId(id.into())
    }

    /// Create an element id selector
    #[must_use]
    pub fn id(id: impl Into<String>) -> Self {
        Self::Id(id.into())
    }

    /// Create a CSS selector
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    /// Create an XPath selector
    #[must_use]
    pub fn xpath(expr: impl Into<String>) -> Self {
        Self::XPath(expr.into())
    }

    /// Create a placeholder-prefix selector
    #[must_use]
    pub fn placeholder(text: impl Into<String>) -> Self {
        Self::Placeholder(text.into())
    }

    /// Create a label-adjacency selector
    #[must_use]
    pub fn after_label(label: impl Into<String>, control: ControlTag) -> Self {
        Self::LabelFollowing {
            label: label.into(),
            control,
        }
    }

    /// Create a button-text selector
    #[must_use]
    pub fn button(text: impl Into<String>) -> Self {
        Self::ButtonText {
            text: text.into(),
            submit: false,
        }
    }

    /// Create a submit-button-text selector
    #[must_use]
    pub fn submit_button(text: impl Into<String>) -> Self {
        Self::ButtonText {
            text: text.into(),
            submit: true,
        }
    }

    /// Whether this selector relies on a stable attribute rather than page text
    #[must_use]
    pub const fn is_stable(&self) -> bool {
        matches!(self, Self::TestId(_) | Self::Id(_) | Self::Css(_))
    }

    /// XPath equivalent for text-based strategies, if any
    #[must_use]
    pub fn to_xpath(&self) -> Option<String> {
        match self {
            Self::XPath(x) => Some(x.clone()),
            Self::LabelFollowing { label, control } => Some(format!(
                "//label[contains(normalize-space(), {})]/following::{}[1]",
                xpath_literal(label),
                control.as_str()
            )),
            Self::ButtonText { text, submit } => {
                let submit_clause = if *submit { "@type='submit' and " } else { "" };
                Some(format!(
                    "//button[{submit_clause}contains(normalize-space(), {})]",
                    xpath_literal(text)
                ))
            }
            _ => None,
        }
    }

    /// Convert to a JavaScript expression evaluating to the element or `null`
    #[must_use]
    pub fn to_query(&self) -> String {
        match self {
            Self::TestId(id) => css_query(&format!("[data-testid={}]", js_string(id))),
            Self::Id(id) => format!("document.getElementById({})", js_string(id)),
            Self::Css(css) => css_query(css),
            Self::Placeholder(text) => {
                css_query(&format!("[placeholder^={}]", js_string(text)))
            }
            Self::XPath(_) | Self::LabelFollowing { .. } | Self::ButtonText { .. } => {
                let xpath = self.to_xpath().unwrap_or_default();
                format!(
                    "document.evaluate({}, document, null, XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue",
                    js_string(&xpath)
                )
            }
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TestId(id) => write!(f, "testid={id}"),
            Self::Id(id) => write!(f, "id={id}"),
            Self::Css(css) => write!(f, "css={css}"),
            Self::XPath(x) => write!(f, "xpath={x}"),
            Self::Placeholder(p) => write!(f, "placeholder^={p}"),
            Self::LabelFollowing { label, control } => {
                write!(f, "label={label} >> {}", control.as_str())
            }
            Self::ButtonText { text, submit } => {
                if *submit {
                    write!(f, "submit-button={text}")
                } else {
                    write!(f, "button={text}")
                }
            }
        }
    }
}

/// Render a Rust string as a JavaScript string literal
#[must_use]
pub fn js_string(value: &str) -> String {
    // JSON string literals are valid JavaScript string literals
    serde_json::Value::String(value.to_string()).to_string()
}

/// Render a string as an XPath 1.0 literal, splitting on quotes when needed
#[must_use]
pub fn xpath_literal(value: &str) -> String {
    if !value.contains('\'') {
        return format!("'{value}'");
    }
    if !value.contains('"') {
        return format!("\"{value}\"");
    }
    let parts: Vec<String> = value.split('\'').map(|p| format!("'{p}'")).collect();
    format!("concat({})", parts.join(", \"'\", "))
}

fn css_query(css: &str) -> String {
    format!("document.querySelector({})", js_string(css))
}
