//! Typed page scripts.
//!
//! The flow never hands raw JavaScript to a session. It builds a
//! [`PageScript`], which a real session renders with [`PageScript::to_js`]
//! and a scripted session interprets directly. Every rendered script is an
//! expression producing a JSON string, so the result crosses the CDP
//! boundary as plain text regardless of `undefined`/`null` semantics.

use crate::locator::{js_string, Selector};
use serde::{Deserialize, Serialize};

/// How a value is written into a control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BindingMode {
    /// Call the prototype's native `value` setter, then dispatch `input` and
    /// `change`. Required for controlled inputs whose framework intercepts
    /// the instance `value` property.
    #[default]
    Native,
    /// Assign `el.value` directly, then dispatch `input` and `change`.
    Attribute,
}

/// A script evaluated in the page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageScript {
    /// Whether the selector matches an element (`bool`)
    Exists(Selector),
    /// Current `value` of a control (`string | null`)
    ReadValue(Selector),
    /// Write a value into a text control (`bool`: element found)
    AssignValue {
        /// Target control
        selector: Selector,
        /// Value to write
        value: String,
        /// Write path
        binding: BindingMode,
    },
    /// State of a select control (`SelectSnapshot | null`)
    ReadSelect(Selector),
    /// Pick an option of a select by value (`bool`: option existed)
    ChooseOption {
        /// Target select
        selector: Selector,
        /// Option value
        value: String,
        /// Write path
        binding: BindingMode,
    },
    /// Check the radio input with `value` within the group matched by `selector` (`bool`)
    CheckRadio {
        /// Selector matching any radio of the group
        selector: Selector,
        /// Radio value to check
        value: String,
    },
    /// Number of files attached to a file input (`number | null`)
    FileCount(Selector),
    /// Direct activation via `HTMLElement.click()` (`bool`: element found)
    Activate(Selector),
    /// Whether the rendered body text contains the given text (`bool`)
    TextPresent(String),
    /// `localStorage` item (`string | null`)
    StorageItem(String),
    /// Serialized document (`string`)
    PageSource,
}

impl PageScript {
    /// Short name used in logs and call histories
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Exists(_) => "exists",
            Self::ReadValue(_) => "read_value",
            Self::AssignValue { .. } => "assign_value",
            Self::ReadSelect(_) => "read_select",
            Self::ChooseOption { .. } => "choose_option",
            Self::CheckRadio { .. } => "check_radio",
            Self::FileCount(_) => "file_count",
            Self::Activate(_) => "activate",
            Self::TextPresent(_) => "text_present",
            Self::StorageItem(_) => "storage_item",
            Self::PageSource => "page_source",
        }
    }

    /// Selector the script targets, if any
    #[must_use]
    pub const fn selector(&self) -> Option<&Selector> {
        match self {
            Self::Exists(s)
            | Self::ReadValue(s)
            | Self::ReadSelect(s)
            | Self::FileCount(s)
            | Self::Activate(s)
            | Self::AssignValue { selector: s, .. }
            | Self::ChooseOption { selector: s, .. }
            | Self::CheckRadio { selector: s, .. } => Some(s),
            Self::TextPresent(_) | Self::StorageItem(_) | Self::PageSource => None,
        }
    }

    /// Render to a JavaScript expression returning a JSON string
    #[must_use]
    pub fn to_js(&self) -> String {
        let body = match self {
            Self::Exists(sel) => format!("return !!({});", sel.to_query()),
            Self::ReadValue(sel) => format!(
                "const el = {}; return el ? String(el.value) : null;",
                sel.to_query()
            ),
            Self::AssignValue {
                selector,
                value,
                binding,
            } => format!(
                "const el = {}; if (!el) return false; {} return true;",
                selector.to_query(),
                write_value(binding, &js_string(value))
            ),
            Self::ReadSelect(sel) => format!(
                "const el = {}; if (!el) return null; \
                 return {{ disabled: !!el.disabled, value: String(el.value), \
                 options: Array.from(el.options).map(o => ({{ value: o.value, label: o.text.trim() }})) }};",
                sel.to_query()
            ),
            Self::ChooseOption {
                selector,
                value,
                binding,
            } => {
                let v = js_string(value);
                format!(
                    "const el = {}; if (!el) return false; \
                     if (!Array.from(el.options).some(o => o.value === {v})) return false; \
                     {} return true;",
                    selector.to_query(),
                    write_value(binding, &v)
                )
            }
            Self::CheckRadio { selector, value } => format!(
                "const first = {}; if (!first) return false; \
                 const group = first.name ? document.getElementsByName(first.name) : [first]; \
                 const el = Array.from(group).find(r => r.value === {}); \
                 if (!el) return false; el.click(); return !!el.checked;",
                selector.to_query(),
                js_string(value)
            ),
            Self::FileCount(sel) => format!(
                "const el = {}; return el && el.files ? el.files.length : null;",
                sel.to_query()
            ),
            Self::Activate(sel) => format!(
                "const el = {}; if (!el) return false; el.click(); return true;",
                sel.to_query()
            ),
            Self::TextPresent(text) => format!(
                "return !!document.body && document.body.innerText.includes({});",
                js_string(text)
            ),
            Self::StorageItem(key) => {
                format!("return window.localStorage.getItem({});", js_string(key))
            }
            Self::PageSource => "return document.documentElement.outerHTML;".to_string(),
        };
        format!("JSON.stringify((() => {{ {body} }})() ?? null)")
    }
}

fn write_value(binding: &BindingMode, literal: &str) -> String {
    let assign = match binding {
        BindingMode::Native => format!(
            "const proto = el instanceof HTMLTextAreaElement ? HTMLTextAreaElement.prototype \
             : el instanceof HTMLSelectElement ? HTMLSelectElement.prototype \
             : HTMLInputElement.prototype; \
             Object.getOwnPropertyDescriptor(proto, 'value').set.call(el, {literal});"
        ),
        BindingMode::Attribute => format!("el.value = {literal};"),
    };
    format!(
        "{assign} el.dispatchEvent(new Event('input', {{ bubbles: true }})); \
         el.dispatchEvent(new Event('change', {{ bubbles: true }}));"
    )
}
