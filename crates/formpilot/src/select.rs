//! Dependent-select resolver.
//!
//! Options of a dependent select arrive asynchronously after its parent is
//! chosen. A select moves through
//! `Disabled → Polling → Populated → Selected`: it is polled until it is
//! enabled and holds more than the placeholder entry, and only then is an
//! option chosen. For a cascade, the child is not polled before the parent
//! has reached `Selected`.

use crate::driver::{evaluate_as, read_select, BrowserSession, SelectSnapshot};
use crate::locator::Selector;
use crate::result::{FormError, FormResult};
use crate::script::{BindingMode, PageScript};
use crate::wait::{is_timeout, wait_for, wait_until, WaitOptions};
use std::cell::Cell;
use std::fmt;

/// Resolution phase of a select control
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectPhase {
    /// Absent or disabled
    Disabled,
    /// Enabled but holding only the placeholder
    Polling,
    /// Enabled with real options
    Populated,
    /// An option has been chosen
    Selected(String),
}

impl SelectPhase {
    /// Phase implied by an observation (never `Selected`)
    #[must_use]
    pub fn classify(snapshot: Option<&SelectSnapshot>) -> Self {
        match snapshot {
            None => Self::Disabled,
            Some(s) if s.disabled => Self::Disabled,
            Some(s) if s.is_populated() => Self::Populated,
            Some(_) => Self::Polling,
        }
    }

    const fn rank(&self) -> u8 {
        match self {
            Self::Disabled => 0,
            Self::Polling => 1,
            Self::Populated => 2,
            Self::Selected(_) => 3,
        }
    }
}

impl fmt::Display for SelectPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => write!(f, "disabled"),
            Self::Polling => write!(f, "polling"),
            Self::Populated => write!(f, "populated"),
            Self::Selected(v) => write!(f, "selected({v})"),
        }
    }
}

/// What to pick once a select is populated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice<'v> {
    /// First option with a non-empty value
    FirstAvailable,
    /// The option with this value, once it exists
    Value(&'v str),
}

impl<'v> Choice<'v> {
    /// `Value` when given and non-blank, `FirstAvailable` otherwise
    #[must_use]
    pub fn from_option(value: Option<&'v str>) -> Self {
        value
            .filter(|v| !v.trim().is_empty())
            .map_or(Self::FirstAvailable, Self::Value)
    }

    fn pick(self, snapshot: &SelectSnapshot) -> Option<String> {
        match self {
            Self::FirstAvailable => snapshot.first_available().map(|o| o.value.clone()),
            Self::Value(v) => snapshot.has_option(v).then(|| v.to_string()),
        }
    }
}

/// Values chosen for a cascade
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CascadeSelection {
    /// Value chosen on the parent
    pub parent: String,
    /// Value chosen on the child
    pub child: String,
}

/// Polls select controls until populated and chooses an option
#[derive(Clone, Copy)]
pub struct SelectResolver<'a> {
    session: &'a dyn BrowserSession,
    binding: BindingMode,
    wait: WaitOptions,
}

impl fmt::Debug for SelectResolver<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectResolver")
            .field("binding", &self.binding)
            .field("wait", &self.wait)
            .finish_non_exhaustive()
    }
}

impl<'a> SelectResolver<'a> {
    /// Create a resolver
    #[must_use]
    pub fn new(session: &'a dyn BrowserSession, wait: WaitOptions) -> Self {
        Self {
            session,
            binding: BindingMode::default(),
            wait,
        }
    }

    /// Set the write path used when choosing an option
    #[must_use]
    pub const fn with_binding(mut self, binding: BindingMode) -> Self {
        self.binding = binding;
        self
    }

    /// Wait for real options and choose the first non-empty one
    pub async fn select_first_available(&self, selector: &Selector) -> FormResult<String> {
        self.select(selector, Choice::FirstAvailable).await
    }

    /// Wait until an option with `value` exists and choose it
    pub async fn select_value(&self, selector: &Selector, value: &str) -> FormResult<String> {
        self.select(selector, Choice::Value(value)).await
    }

    /// Resolve a (parent, child) cascade, parent first
    pub async fn resolve_cascade(
        &self,
        parent: &Selector,
        parent_choice: Choice<'_>,
        child: &Selector,
        child_choice: Choice<'_>,
    ) -> FormResult<CascadeSelection> {
        let parent_value = self.select(parent, parent_choice).await?;
        tracing::debug!(%parent, %child, value = %parent_value, "cascade parent selected");
        let child_value = self.select(child, child_choice).await?;
        Ok(CascadeSelection {
            parent: parent_value,
            child: child_value,
        })
    }

    /// Drive one select through its phases
    pub async fn select(&self, selector: &Selector, choice: Choice<'_>) -> FormResult<String> {
        let value = self.await_populated(selector, choice).await?;

        let script = PageScript::ChooseOption {
            selector: selector.clone(),
            value: value.clone(),
            binding: self.binding,
        };
        let chosen: bool = evaluate_as(self.session, &script).await?;
        if !chosen {
            return Err(FormError::FieldNotSettled {
                selector: selector.to_string(),
                expected: value,
                observed: None,
            });
        }
        self.await_selected(selector, &value).await?;
        tracing::debug!(%selector, phase = %SelectPhase::Selected(value.clone()), "select resolved");
        Ok(value)
    }

    async fn await_populated(&self, selector: &Selector, choice: Choice<'_>) -> FormResult<String> {
        let session = self.session;
        let phase = Cell::new(SelectPhase::Disabled);
        let seen_element = Cell::new(false);
        let option_count = Cell::new(0_usize);
        let (phase_ref, seen_ref, count_ref) = (&phase, &seen_element, &option_count);

        let waited = wait_for(
            move || async move {
                let snapshot = read_select(session, selector).await?;
                if let Some(s) = &snapshot {
                    seen_ref.set(true);
                    count_ref.set(s.options.len());
                }
                let next = SelectPhase::classify(snapshot.as_ref());
                let previous = phase_ref.replace(next.clone());
                if previous.rank() != next.rank() {
                    tracing::debug!(%selector, from = %previous, to = %next, "select phase");
                }
                Ok(snapshot
                    .filter(SelectSnapshot::is_populated)
                    .and_then(|s| choice.pick(&s)))
            },
            &self.wait,
            "select options",
        )
        .await;

        match waited {
            Ok(result) => Ok(result.value),
            Err(err) if is_timeout(&err) => {
                if !seen_element.get() {
                    return Err(FormError::LocatorNotFound {
                        field: selector.to_string(),
                        selector: selector.to_string(),
                    });
                }
                let selector = match choice {
                    Choice::FirstAvailable => selector.to_string(),
                    Choice::Value(v) => format!("{selector} (option {v:?})"),
                };
                tracing::warn!(%selector, option_count = option_count.get(), "select never populated");
                Err(FormError::NoOptionsAvailable {
                    selector,
                    option_count: option_count.get(),
                })
            }
            Err(err) => Err(err),
        }
    }

    async fn await_selected(&self, selector: &Selector, value: &str) -> FormResult<()> {
        let session = self.session;
        let settled = wait_until(
            move || async move {
                Ok(read_select(session, selector)
                    .await?
                    .is_some_and(|s| s.value == value))
            },
            &self.wait,
            "select value",
        )
        .await;
        match settled {
            Ok(_) => Ok(()),
            Err(err) if is_timeout(&err) => {
                let observed = read_select(self.session, selector).await?.map(|s| s.value);
                Err(FormError::FieldNotSettled {
                    selector: selector.to_string(),
                    expected: value.to_string(),
                    observed,
                })
            }
            Err(err) => Err(err),
        }
    }
}
