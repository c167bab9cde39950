//! Page objects and the locator registry.
//!
//! A form version is described once as an ordered set of immutable
//! [`FieldDescriptor`]s. Each descriptor carries its selection strategies,
//! stable attribute selectors first and label-adjacency fallbacks after; the
//! [`LocatorRegistry`] resolves a logical field name against the current DOM
//! by trying them in order.

use crate::driver::{element_exists, BrowserSession};
use crate::locator::Selector;
use crate::result::{FormError, FormResult};
use crate::wait::{is_timeout, wait_for, WaitOptions};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of form control a field is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// Single-line text or numeric input
    Text,
    /// Multi-line text area
    Textarea,
    /// `<select>` control
    Select,
    /// Radio group
    Radio,
    /// File input
    File,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Text => "text",
            Self::Textarea => "textarea",
            Self::Select => "select",
            Self::Radio => "radio",
            Self::File => "file",
        };
        f.write_str(name)
    }
}

/// Immutable description of one logical form field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    name: String,
    kind: FieldKind,
    strategies: Vec<Selector>,
    required: bool,
    depends_on: Option<String>,
    digits_only: bool,
}

impl FieldDescriptor {
    /// Create a descriptor with a primary selector
    #[must_use]
    pub fn new(name: impl Into<String>, kind: FieldKind, selector: Selector) -> Self {
        Self {
            name: name.into(),
            kind,
            strategies: vec![selector],
            required: false,
            depends_on: None,
            digits_only: false,
        }
    }

    /// Add a fallback strategy, tried after the ones already present
    #[must_use]
    pub fn or(mut self, selector: Selector) -> Self {
        self.strategies.push(selector);
        self
    }

    /// Mark the field as required for submission
    #[must_use]
    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Declare the parent of a cascade
    #[must_use]
    pub fn depends_on(mut self, parent: impl Into<String>) -> Self {
        self.depends_on = Some(parent.into());
        self
    }

    /// The control keeps only digits of whatever is written
    #[must_use]
    pub const fn digits_only(mut self) -> Self {
        self.digits_only = true;
        self
    }

    /// Logical name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Control kind
    #[must_use]
    pub const fn kind(&self) -> FieldKind {
        self.kind
    }

    /// Selection strategies in preference order
    #[must_use]
    pub fn strategies(&self) -> &[Selector] {
        &self.strategies
    }

    /// Whether a value is required before submission
    #[must_use]
    pub const fn is_required(&self) -> bool {
        self.required
    }

    /// Parent field of a cascade, if any
    #[must_use]
    pub fn parent(&self) -> Option<&str> {
        self.depends_on.as_deref()
    }

    /// Whether written values are reduced to digits
    #[must_use]
    pub const fn is_digits_only(&self) -> bool {
        self.digits_only
    }

    /// Value as the control will hold it after a write
    #[must_use]
    pub fn normalize(&self, value: &str) -> String {
        if self.digits_only {
            value.chars().filter(char::is_ascii_digit).collect()
        } else {
            value.to_string()
        }
    }

    fn strategies_label(&self) -> String {
        self.strategies
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" | ")
    }
}

/// Registry of the fields of one form version
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocatorRegistry {
    fields: Vec<FieldDescriptor>,
}

impl LocatorRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a field (a later registration of the same name replaces it)
    #[must_use]
    pub fn with_field(mut self, field: FieldDescriptor) -> Self {
        if let Some(existing) = self.fields.iter_mut().find(|f| f.name == field.name) {
            *existing = field;
        } else {
            self.fields.push(field);
        }
        self
    }

    /// Descriptor of a logical field
    #[must_use]
    pub fn descriptor(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// All descriptors in registration order
    #[must_use]
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Required descriptors
    pub fn required_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|f| f.required)
    }

    /// Resolve a logical field against the current DOM snapshot.
    ///
    /// Strategies are tried in preference order; the first one matching an
    /// element wins.
    pub async fn resolve(
        &self,
        session: &dyn BrowserSession,
        name: &str,
    ) -> FormResult<Selector> {
        let field = self.descriptor(name).ok_or_else(|| FormError::LocatorNotFound {
            field: name.to_string(),
            selector: "<unregistered>".to_string(),
        })?;
        match first_match(session, field).await? {
            Some(selector) => Ok(selector),
            None => Err(FormError::LocatorNotFound {
                field: field.name.clone(),
                selector: field.strategies_label(),
            }),
        }
    }

    /// Resolve a logical field, polling until it renders or `options` expires
    pub async fn resolve_within(
        &self,
        session: &dyn BrowserSession,
        name: &str,
        options: &WaitOptions,
    ) -> FormResult<Selector> {
        let field = self.descriptor(name).ok_or_else(|| FormError::LocatorNotFound {
            field: name.to_string(),
            selector: "<unregistered>".to_string(),
        })?;
        let found = wait_for(
            move || async move { first_match(session, field).await },
            options,
            name,
        )
        .await;
        match found {
            Ok(result) => {
                tracing::debug!(field = name, selector = %result.value, attempts = result.attempts, "field located");
                Ok(result.value)
            }
            Err(err) if is_timeout(&err) => Err(FormError::LocatorNotFound {
                field: field.name.clone(),
                selector: field.strategies_label(),
            }),
            Err(err) => Err(err),
        }
    }

    /// Fields in population order.
    ///
    /// Independent fields first (registration order), then every cascade
    /// with each parent before its children, then file attachments last.
    #[must_use]
    pub fn population_order(&self) -> Vec<&FieldDescriptor> {
        let has_children = |name: &str| self.fields.iter().any(|f| f.parent() == Some(name));
        let mut order: Vec<&FieldDescriptor> = self
            .fields
            .iter()
            .filter(|f| f.kind != FieldKind::File && f.parent().is_none() && !has_children(&f.name))
            .collect();

        let roots = self
            .fields
            .iter()
            .filter(|f| f.kind != FieldKind::File && f.parent().is_none() && has_children(&f.name));
        for root in roots {
            self.push_cascade(root, &mut order);
        }

        // Children whose parent is not registered still get populated
        for field in &self.fields {
            if field.kind != FieldKind::File && !order.iter().any(|f| f.name == field.name) {
                order.push(field);
            }
        }

        order.extend(self.fields.iter().filter(|f| f.kind == FieldKind::File));
        order
    }

    fn push_cascade<'a>(&'a self, field: &'a FieldDescriptor, order: &mut Vec<&'a FieldDescriptor>) {
        if order.iter().any(|f| f.name == field.name) {
            return;
        }
        order.push(field);
        for child in self.fields.iter().filter(|f| f.parent() == Some(field.name.as_str())) {
            if child.kind != FieldKind::File {
                self.push_cascade(child, order);
            }
        }
    }
}

async fn first_match(
    session: &dyn BrowserSession,
    field: &FieldDescriptor,
) -> FormResult<Option<Selector>> {
    for selector in &field.strategies {
        if element_exists(session, selector).await? {
            return Ok(Some(selector.clone()));
        }
    }
    Ok(None)
}

/// A page (or modal) of the application under test
pub trait PageObject {
    /// Path of the page relative to the base URL
    fn path(&self) -> &str;

    /// Fields of the page
    fn registry(&self) -> &LocatorRegistry;

    /// Control that submits the form
    fn submit_control(&self) -> &Selector;

    /// Element whose presence signals the initial render has finished
    fn ready_marker(&self) -> &Selector {
        self.submit_control()
    }

    /// Get the page name for logging/debugging
    fn page_name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// A generic page object built from a registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormPage {
    name: String,
    path: String,
    submit: Selector,
    registry: LocatorRegistry,
}

impl FormPage {
    /// Create a page object
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        path: impl Into<String>,
        submit: Selector,
        registry: LocatorRegistry,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            submit,
            registry,
        }
    }

    /// Replace the page path
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Register or replace a field
    #[must_use]
    pub fn with_field(mut self, field: FieldDescriptor) -> Self {
        self.registry = self.registry.with_field(field);
        self
    }
}

impl PageObject for FormPage {
    fn path(&self) -> &str {
        &self.path
    }

    fn registry(&self) -> &LocatorRegistry {
        &self.registry
    }

    fn submit_control(&self) -> &Selector {
        &self.submit
    }

    fn page_name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::locator::ControlTag;
    use crate::mock::{MockElement, ScriptedSession};

    fn registry() -> LocatorRegistry {
        LocatorRegistry::new()
            .with_field(
                FieldDescriptor::new("images", FieldKind::File, Selector::id("images")).required(),
            )
            .with_field(
                FieldDescriptor::new("district", FieldKind::Select, Selector::test_id("district"))
                    .depends_on("province"),
            )
            .with_field(FieldDescriptor::new("title", FieldKind::Text, Selector::test_id("title")))
            .with_field(FieldDescriptor::new("brand", FieldKind::Select, Selector::test_id("brand")))
            .with_field(
                FieldDescriptor::new("model", FieldKind::Select, Selector::test_id("model"))
                    .depends_on("brand"),
            )
            .with_field(FieldDescriptor::new("province", FieldKind::Select, Selector::test_id("province")))
            .with_field(FieldDescriptor::new("year", FieldKind::Text, Selector::test_id("year")))
    }

    mod descriptor_tests {
        use super::*;

        #[test]
        fn test_builder() {
            let field = FieldDescriptor::new("year", FieldKind::Text, Selector::test_id("year"))
                .or(Selector::after_label("Năm sản xuất", ControlTag::Input))
                .required()
                .digits_only();
            assert_eq!(field.strategies().len(), 2);
            assert!(field.is_required());
            assert!(field.strategies()[0].is_stable());
        }

        #[test]
        fn test_normalize_digits() {
            let field =
                FieldDescriptor::new("price", FieldKind::Text, Selector::test_id("price")).digits_only();
            assert_eq!(field.normalize("650 triệu"), "650");
            let plain = FieldDescriptor::new("title", FieldKind::Text, Selector::test_id("title"));
            assert_eq!(plain.normalize("Vios 2020"), "Vios 2020");
        }

        #[test]
        fn test_reregistration_replaces() {
            let reg = LocatorRegistry::new()
                .with_field(FieldDescriptor::new("a", FieldKind::Text, Selector::id("a")))
                .with_field(FieldDescriptor::new("a", FieldKind::Textarea, Selector::id("b")));
            assert_eq!(reg.fields().len(), 1);
            assert_eq!(reg.descriptor("a").unwrap().kind(), FieldKind::Textarea);
        }
    }

    mod order_tests {
        use super::*;

        #[test]
        fn test_population_order() {
            let reg = registry();
            let names: Vec<&str> = reg.population_order().iter().map(|f| f.name()).collect();
            assert_eq!(
                names,
                vec!["title", "year", "brand", "model", "province", "district", "images"]
            );
        }

        #[test]
        fn test_parent_precedes_child() {
            let reg = registry();
            let order = reg.population_order();
            let pos = |n: &str| order.iter().position(|f| f.name() == n).unwrap();
            assert!(pos("brand") < pos("model"));
            assert!(pos("province") < pos("district"));
            assert_eq!(pos("images"), order.len() - 1);
        }

        #[test]
        fn test_orphan_child_still_ordered() {
            let reg = LocatorRegistry::new().with_field(
                FieldDescriptor::new("model", FieldKind::Select, Selector::test_id("model"))
                    .depends_on("brand"),
            );
            assert_eq!(reg.population_order().len(), 1);
        }
    }

    mod page_tests {
        use super::*;

        #[test]
        fn test_ready_marker_defaults_to_submit() {
            let page = FormPage::new(
                "listing",
                "/create-listing",
                Selector::submit_button("Đăng tin"),
                registry(),
            );
            assert_eq!(page.ready_marker(), &Selector::submit_button("Đăng tin"));
            assert_eq!(page.page_name(), "listing");
            assert_eq!(page.with_path("/new").path(), "/new");
        }
    }

    mod resolve_tests {
        use super::*;

        #[tokio::test]
        async fn test_prefers_stable_selector() {
            let label = Selector::after_label("Tiêu đề", ControlTag::Input);
            let session = ScriptedSession::new()
                .with_element(Selector::test_id("title"), MockElement::text(""))
                .with_element(label.clone(), MockElement::text(""));
            let reg = LocatorRegistry::new().with_field(
                FieldDescriptor::new("title", FieldKind::Text, Selector::test_id("title")).or(label),
            );
            assert_eq!(
                reg.resolve(&session, "title").await.unwrap(),
                Selector::test_id("title")
            );
        }

        #[tokio::test]
        async fn test_falls_back_to_label() {
            let label = Selector::after_label("Tiêu đề", ControlTag::Input);
            let session = ScriptedSession::new().with_element(label.clone(), MockElement::text(""));
            let reg = LocatorRegistry::new().with_field(
                FieldDescriptor::new("title", FieldKind::Text, Selector::test_id("title"))
                    .or(label.clone()),
            );
            assert_eq!(reg.resolve(&session, "title").await.unwrap(), label);
        }

        #[tokio::test]
        async fn test_not_found_lists_strategies() {
            let session = ScriptedSession::new();
            let reg = registry();
            let err = reg.resolve(&session, "title").await.unwrap_err();
            match err {
                FormError::LocatorNotFound { field, selector } => {
                    assert_eq!(field, "title");
                    assert!(selector.contains("testid=title"));
                }
                other => panic!("unexpected error: {other}"),
            }
        }

        #[tokio::test]
        async fn test_unregistered_name() {
            let session = ScriptedSession::new();
            let err = registry().resolve(&session, "colour").await.unwrap_err();
            assert_eq!(err.kind(), "LocatorNotFound");
        }

        #[tokio::test]
        async fn test_resolve_within_waits_for_render() {
            use std::time::Duration;
            let session = ScriptedSession::new().with_element(
                Selector::test_id("title"),
                MockElement::text("").appearing_after(Duration::from_millis(30)),
            );
            let opts = WaitOptions::new().with_timeout(1_000).with_poll_interval(5);
            let selector = registry()
                .resolve_within(&session, "title", &opts)
                .await
                .unwrap();
            assert_eq!(selector, Selector::test_id("title"));
        }

        #[tokio::test]
        async fn test_resolve_within_times_out_as_not_found() {
            let session = ScriptedSession::new();
            let opts = WaitOptions::new().with_timeout(20).with_poll_interval(5);
            let err = registry()
                .resolve_within(&session, "year", &opts)
                .await
                .unwrap_err();
            assert_eq!(err.kind(), "LocatorNotFound");
        }
    }
}
