//! Scripted in-memory session.
//!
//! [`ScriptedSession`] models just enough of a rendered page to drive a full
//! run without a browser: controls keyed by selector, asynchronously
//! populated cascades, delayed value binding, a blocking native dialog,
//! `localStorage`, rendered text and the browsing location. Reactions to
//! activating a control are scripted as a chain of timed [`Effect`]s.
//!
//! Time is evaluated lazily: pending effects are applied whenever the
//! session is observed, so no background task is involved.

use crate::dialog::Dialog;
use crate::driver::{BrowserSession, SelectOption, SelectSnapshot};
use crate::locator::Selector;
use crate::result::{FormError, FormResult};
use crate::script::{BindingMode, PageScript};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Eq)]
enum MockKind {
    Text,
    Select,
    Radio(Vec<String>),
    File,
    Button,
}

/// A control of the modelled page
#[derive(Debug, Clone)]
pub struct MockElement {
    kind: MockKind,
    value: String,
    disabled: bool,
    options: Vec<SelectOption>,
    framework_bound: bool,
    digits_only: bool,
    settle_after: Duration,
    appears_after: Duration,
    files: usize,
}

impl MockElement {
    fn new(kind: MockKind) -> Self {
        Self {
            kind,
            value: String::new(),
            disabled: false,
            options: Vec::new(),
            framework_bound: false,
            digits_only: false,
            settle_after: Duration::ZERO,
            appears_after: Duration::ZERO,
            files: 0,
        }
    }

    /// Text input or textarea holding `value`
    #[must_use]
    pub fn text(value: &str) -> Self {
        let mut el = Self::new(MockKind::Text);
        el.value = value.to_string();
        el
    }

    /// Select with the given options, first one selected
    #[must_use]
    pub fn select(options: Vec<SelectOption>) -> Self {
        let mut el = Self::new(MockKind::Select);
        el.value = options.first().map(|o| o.value.clone()).unwrap_or_default();
        el.options = options;
        el
    }

    /// Radio group with the given values, none checked
    #[must_use]
    pub fn radio(values: &[&str]) -> Self {
        Self::new(MockKind::Radio(values.iter().map(ToString::to_string).collect()))
    }

    /// File input
    #[must_use]
    pub fn file() -> Self {
        Self::new(MockKind::File)
    }

    /// Button
    #[must_use]
    pub fn button() -> Self {
        Self::new(MockKind::Button)
    }

    /// Start disabled
    #[must_use]
    pub const fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    /// Value is owned by a framework: plain attribute writes are lost
    #[must_use]
    pub const fn framework_bound(mut self) -> Self {
        self.framework_bound = true;
        self
    }

    /// Keep only the digits of written values
    #[must_use]
    pub const fn digits_only(mut self) -> Self {
        self.digits_only = true;
        self
    }

    /// Written values become observable only after `delay`
    #[must_use]
    pub const fn settling_after(mut self, delay: Duration) -> Self {
        self.settle_after = delay;
        self
    }

    /// Render only `delay` after the last navigation
    #[must_use]
    pub const fn appearing_after(mut self, delay: Duration) -> Self {
        self.appears_after = delay;
        self
    }
}

/// Reaction of the modelled application
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Raise a native alert
    OpenDialog(String),
    /// Write a `localStorage` item
    SetStorage(String, String),
    /// Navigate to a path on the current origin
    Redirect(String),
    /// Render a piece of text
    RenderText(String),
    /// Render the current value of a control
    RenderValueOf(Selector),
}

#[derive(Debug)]
struct ElementState {
    spec: MockElement,
    pending: Option<(String, Instant)>,
}

impl ElementState {
    fn commit(&mut self, now: Instant) {
        if let Some((value, at)) = self.pending.take() {
            if now >= at {
                self.spec.value = value;
            } else {
                self.pending = Some((value, at));
            }
        }
    }
}

#[derive(Debug)]
struct CascadeRule {
    parent: Selector,
    child: Selector,
    options: Vec<SelectOption>,
    delay: Duration,
}

#[derive(Debug)]
struct State {
    url: String,
    epoch: Instant,
    elements: HashMap<Selector, ElementState>,
    storage: HashMap<String, String>,
    texts: Vec<String>,
    dialog: Option<Dialog>,
    chain: VecDeque<(Duration, Effect)>,
    anchor: Instant,
    on_activate: HashMap<Selector, Vec<(Duration, Effect)>>,
    cascades: Vec<CascadeRule>,
    populations: Vec<(Instant, Selector, Vec<SelectOption>)>,
    history: Vec<String>,
    closed: bool,
}

impl State {
    fn tick(&mut self) {
        let now = Instant::now();

        let (due, later): (Vec<_>, Vec<_>) =
            self.populations.drain(..).partition(|(at, _, _)| now >= *at);
        self.populations = later;
        for (_, child, options) in due {
            if let Some(el) = self.elements.get_mut(&child) {
                el.spec.disabled = false;
                el.spec.value = options.first().map(|o| o.value.clone()).unwrap_or_default();
                el.spec.options = options;
            }
        }

        while let Some((delay, effect)) = self.chain.front().cloned() {
            // A native dialog blocks every scripted reaction except another dialog
            if self.dialog.is_some() {
                break;
            }
            if now < self.anchor + delay {
                break;
            }
            let _ = self.chain.pop_front();
            self.anchor = now;
            self.apply(effect);
        }

        for el in self.elements.values_mut() {
            el.commit(now);
        }
    }

    fn apply(&mut self, effect: Effect) {
        match effect {
            Effect::OpenDialog(message) => self.dialog = Some(Dialog::alert(message)),
            Effect::SetStorage(key, value) => {
                let _ = self.storage.insert(key, value);
            }
            Effect::Redirect(path) => {
                self.url = format!("{}{}", origin(&self.url), path);
                self.epoch = Instant::now();
            }
            Effect::RenderText(text) => self.texts.push(text),
            Effect::RenderValueOf(selector) => {
                if let Some(el) = self.elements.get(&selector) {
                    self.texts.push(el.spec.value.clone());
                }
            }
        }
    }

    fn visible(&self, selector: &Selector) -> Option<&ElementState> {
        self.elements
            .get(selector)
            .filter(|el| self.epoch.elapsed() >= el.spec.appears_after)
    }

    fn visible_mut(&mut self, selector: &Selector) -> Option<&mut ElementState> {
        let elapsed = self.epoch.elapsed();
        self.elements
            .get_mut(selector)
            .filter(|el| elapsed >= el.spec.appears_after)
    }

    fn write(&mut self, selector: &Selector, value: &str, binding: BindingMode) -> bool {
        let now = Instant::now();
        let Some(el) = self.visible_mut(selector) else {
            return false;
        };
        if el.spec.framework_bound && binding == BindingMode::Attribute {
            return true;
        }
        let value = if el.spec.digits_only {
            value.chars().filter(char::is_ascii_digit).collect()
        } else {
            value.to_string()
        };
        if el.spec.settle_after.is_zero() {
            el.spec.value = value;
            el.pending = None;
        } else {
            el.pending = Some((value, now + el.spec.settle_after));
        }
        true
    }

    fn choose(&mut self, selector: &Selector, value: &str, binding: BindingMode) -> bool {
        let chosen = match self.visible_mut(selector) {
            Some(el) if !el.spec.disabled && el.spec.options.iter().any(|o| o.value == value) => {
                if !(el.spec.framework_bound && binding == BindingMode::Attribute) {
                    el.spec.value = value.to_string();
                }
                true
            }
            _ => false,
        };
        if chosen && !value.is_empty() {
            let now = Instant::now();
            let triggered: Vec<_> = self
                .cascades
                .iter()
                .filter(|rule| &rule.parent == selector)
                .map(|rule| (now + rule.delay, rule.child.clone(), rule.options.clone()))
                .collect();
            self.populations.extend(triggered);
        }
        chosen
    }

    fn run(&mut self, script: &PageScript) -> Value {
        match script {
            PageScript::Exists(sel) => json!(self.visible(sel).is_some()),
            PageScript::ReadValue(sel) => match self.visible(sel) {
                Some(el) => json!(el.spec.value),
                None => Value::Null,
            },
            PageScript::AssignValue {
                selector,
                value,
                binding,
            } => json!(self.write(selector, value, *binding)),
            PageScript::ReadSelect(sel) => match self.visible(sel) {
                Some(el) if el.spec.kind == MockKind::Select => json!(SelectSnapshot {
                    disabled: el.spec.disabled,
                    value: el.spec.value.clone(),
                    options: el.spec.options.clone(),
                }),
                _ => Value::Null,
            },
            PageScript::ChooseOption {
                selector,
                value,
                binding,
            } => json!(self.choose(selector, value, *binding)),
            PageScript::CheckRadio { selector, value } => match self.visible_mut(selector) {
                Some(el) => {
                    let known = matches!(&el.spec.kind, MockKind::Radio(values) if values.contains(value));
                    if known {
                        el.spec.value = value.clone();
                    }
                    json!(known)
                }
                None => json!(false),
            },
            PageScript::FileCount(sel) => match self.visible(sel) {
                Some(el) if el.spec.kind == MockKind::File => json!(el.spec.files),
                _ => Value::Null,
            },
            PageScript::Activate(sel) => {
                if self.visible(sel).is_none() {
                    return json!(false);
                }
                if let Some(effects) = self.on_activate.get(sel).cloned() {
                    if self.chain.is_empty() {
                        self.anchor = Instant::now();
                    }
                    self.chain.extend(effects);
                }
                json!(true)
            }
            PageScript::TextPresent(text) => json!(self.texts.iter().any(|t| t.contains(text.as_str()))),
            PageScript::StorageItem(key) => match self.storage.get(key) {
                Some(v) => json!(v),
                None => Value::Null,
            },
            PageScript::PageSource => json!(format!(
                "<html><body>{}</body></html>",
                self.texts.join("\n")
            )),
        }
    }
}

fn origin(url: &str) -> &str {
    let after_scheme = url.find("://").map_or(0, |i| i + 3);
    match url[after_scheme..].find('/') {
        Some(i) => &url[..after_scheme + i],
        None => url,
    }
}

/// In-memory session driven by a scripted page model
#[derive(Debug, Clone)]
pub struct ScriptedSession {
    state: Arc<Mutex<State>>,
}

impl Default for ScriptedSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedSession {
    /// Create an empty page at `about:blank`
    #[must_use]
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            state: Arc::new(Mutex::new(State {
                url: "about:blank".to_string(),
                epoch: now,
                elements: HashMap::new(),
                storage: HashMap::new(),
                texts: Vec::new(),
                dialog: None,
                chain: VecDeque::new(),
                anchor: now,
                on_activate: HashMap::new(),
                cascades: Vec::new(),
                populations: Vec::new(),
                history: Vec::new(),
                closed: false,
            })),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start at `url`
    #[must_use]
    pub fn at(self, url: &str) -> Self {
        self.state().url = url.to_string();
        self
    }

    /// Add a control
    #[must_use]
    pub fn with_element(self, selector: Selector, element: MockElement) -> Self {
        let _ = self.state().elements.insert(
            selector,
            ElementState {
                spec: element,
                pending: None,
            },
        );
        self
    }

    /// Render a piece of text
    #[must_use]
    pub fn with_text(self, text: &str) -> Self {
        self.state().texts.push(text.to_string());
        self
    }

    /// Start with a dialog open
    #[must_use]
    pub fn with_dialog(self, dialog: Dialog) -> Self {
        self.state().dialog = Some(dialog);
        self
    }

    /// Start with a `localStorage` item
    #[must_use]
    pub fn with_storage(self, key: &str, value: &str) -> Self {
        let _ = self
            .state()
            .storage
            .insert(key.to_string(), value.to_string());
        self
    }

    /// Choosing a non-empty value on `parent` enables `child` with `options` after `delay`
    #[must_use]
    pub fn cascade(
        self,
        parent: Selector,
        child: Selector,
        options: Vec<SelectOption>,
        delay: Duration,
    ) -> Self {
        self.state().cascades.push(CascadeRule {
            parent,
            child,
            options,
            delay,
        });
        self
    }

    /// Activating `selector` runs `effects` in order, each `delay` after the previous one
    #[must_use]
    pub fn on_activate(self, selector: Selector, effects: Vec<(Duration, Effect)>) -> Self {
        let _ = self.state().on_activate.insert(selector, effects);
        self
    }

    /// Current value of a control
    #[must_use]
    pub fn value_of(&self, selector: &Selector) -> Option<String> {
        let mut state = self.state();
        state.tick();
        state.elements.get(selector).map(|el| el.spec.value.clone())
    }

    /// Number of files attached to a control
    #[must_use]
    pub fn files_of(&self, selector: &Selector) -> usize {
        self.state().elements.get(selector).map_or(0, |el| el.spec.files)
    }

    /// Current location
    #[must_use]
    pub fn url(&self) -> String {
        self.state().url.clone()
    }

    /// Get call history
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.state().history.clone()
    }

    /// Check if method was called
    #[must_use]
    pub fn was_called(&self, method: &str) -> bool {
        self.state().history.iter().any(|c| c.starts_with(method))
    }

    /// Whether the session was closed
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state().closed
    }

    fn record(state: &mut State, entry: String) {
        state.history.push(entry);
    }

    fn ensure_open(state: &State) -> FormResult<()> {
        if state.closed {
            Err(FormError::session("session is closed"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl BrowserSession for ScriptedSession {
    async fn navigate(&mut self, url: &str) -> FormResult<()> {
        let mut state = self.state();
        Self::ensure_open(&state)?;
        Self::record(&mut state, format!("navigate:{url}"));
        state.tick();
        if state.dialog.is_some() {
            return Err(FormError::Navigation {
                url: url.to_string(),
                message: "a dialog is blocking the page".to_string(),
            });
        }
        state.url = url.to_string();
        state.epoch = Instant::now();
        Ok(())
    }

    async fn current_url(&self) -> FormResult<String> {
        let mut state = self.state();
        Self::ensure_open(&state)?;
        state.tick();
        Ok(state.url.clone())
    }

    async fn evaluate(&self, script: &PageScript) -> FormResult<Value> {
        let mut state = self.state();
        Self::ensure_open(&state)?;
        let entry = match script.selector() {
            Some(sel) => format!("{}:{sel}", script.name()),
            None => script.name().to_string(),
        };
        Self::record(&mut state, entry);
        state.tick();
        if let Some(dialog) = &state.dialog {
            return Err(FormError::session(format!(
                "unexpected alert open: {}",
                dialog.message()
            )));
        }
        Ok(state.run(script))
    }

    async fn pending_dialog(&self) -> FormResult<Option<Dialog>> {
        let mut state = self.state();
        Self::ensure_open(&state)?;
        state.tick();
        Ok(state.dialog.clone())
    }

    async fn accept_dialog(&self) -> FormResult<()> {
        let mut state = self.state();
        Self::ensure_open(&state)?;
        Self::record(&mut state, "accept_dialog".to_string());
        state.tick();
        if state.dialog.take().is_none() {
            return Err(FormError::session("no dialog to accept"));
        }
        state.anchor = Instant::now();
        Ok(())
    }

    async fn attach_files(&self, selector: &Selector, files: &[PathBuf]) -> FormResult<()> {
        let mut state = self.state();
        Self::ensure_open(&state)?;
        Self::record(&mut state, format!("attach_files:{selector}"));
        state.tick();
        match state.visible_mut(selector) {
            Some(el) if el.spec.kind == MockKind::File => {
                el.spec.files = files.len();
                Ok(())
            }
            _ => Err(FormError::LocatorNotFound {
                field: selector.to_string(),
                selector: selector.to_string(),
            }),
        }
    }

    async fn close(&mut self) -> FormResult<()> {
        let mut state = self.state();
        Self::record(&mut state, "close".to_string());
        state.closed = true;
        Ok(())
    }
}
