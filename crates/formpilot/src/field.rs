//! Synchronized field setter.
//!
//! Writing into a framework-controlled input is only half the job: the write
//! must reach the framework's own state, and the flow must not move on until
//! the element reports the intended value. [`FieldSetter`] writes through the
//! configured [`BindingMode`], dispatches `input`/`change`, and then polls the
//! element until its value reads back as written.

use crate::driver::{evaluate_as, read_value, BrowserSession};
use crate::locator::Selector;
use crate::result::{FormError, FormResult};
use crate::script::{BindingMode, PageScript};
use crate::wait::{is_timeout, wait_for, wait_until, WaitOptions};
use std::path::PathBuf;

/// Writes values into controls and waits for them to settle
#[derive(Clone, Copy)]
pub struct FieldSetter<'a> {
    session: &'a dyn BrowserSession,
    binding: BindingMode,
    wait: WaitOptions,
}

impl std::fmt::Debug for FieldSetter<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldSetter")
            .field("binding", &self.binding)
            .field("wait", &self.wait)
            .finish_non_exhaustive()
    }
}

impl<'a> FieldSetter<'a> {
    /// Create a setter using native binding
    #[must_use]
    pub fn new(session: &'a dyn BrowserSession, wait: WaitOptions) -> Self {
        Self {
            session,
            binding: BindingMode::default(),
            wait,
        }
    }

    /// Set the write path
    #[must_use]
    pub const fn with_binding(mut self, binding: BindingMode) -> Self {
        self.binding = binding;
        self
    }

    /// Write `value` and wait until the control reports it.
    ///
    /// Writing the same value again is a no-op from the page's point of view:
    /// the control still reads back `value` afterwards.
    pub async fn set_value(&self, selector: &Selector, value: &str) -> FormResult<()> {
        let script = PageScript::AssignValue {
            selector: selector.clone(),
            value: value.to_string(),
            binding: self.binding,
        };
        let found: bool = evaluate_as(self.session, &script).await?;
        if !found {
            return Err(FormError::LocatorNotFound {
                field: selector.to_string(),
                selector: selector.to_string(),
            });
        }

        let session = self.session;
        let settled = wait_until(
            move || async move {
                Ok(read_value(session, selector).await?.as_deref() == Some(value))
            },
            &self.wait,
            "field value",
        )
        .await;

        match settled {
            Ok(result) => {
                tracing::debug!(%selector, attempts = result.attempts, "field settled");
                Ok(())
            }
            Err(err) if is_timeout(&err) => {
                let observed = read_value(self.session, selector).await?;
                tracing::warn!(%selector, expected = value, ?observed, "field did not settle");
                Err(FormError::FieldNotSettled {
                    selector: selector.to_string(),
                    expected: value.to_string(),
                    observed,
                })
            }
            Err(err) => Err(err),
        }
    }

    /// Check the radio with `value` in the group matched by `selector`
    pub async fn check_radio(&self, selector: &Selector, value: &str) -> FormResult<()> {
        let script = PageScript::CheckRadio {
            selector: selector.clone(),
            value: value.to_string(),
        };
        let session = self.session;
        let checked = wait_until(
            move || {
                let script = script.clone();
                async move { evaluate_as::<bool>(session, &script).await }
            },
            &self.wait,
            "radio checked",
        )
        .await;
        match checked {
            Ok(_) => {
                tracing::debug!(%selector, value, "radio checked");
                Ok(())
            }
            Err(err) if is_timeout(&err) => Err(FormError::LocatorNotFound {
                field: selector.to_string(),
                selector: format!("{selector} [value={value}]"),
            }),
            Err(err) => Err(err),
        }
    }

    /// Attach files and wait until the input reports them
    pub async fn attach_file(&self, selector: &Selector, files: &[PathBuf]) -> FormResult<()> {
        self.session.attach_files(selector, files).await?;
        let expected = files.len();
        let session = self.session;
        let attached = wait_for(
            move || async move {
                let count: Option<usize> =
                    evaluate_as(session, &PageScript::FileCount(selector.clone())).await?;
                Ok(count.filter(|n| *n >= expected))
            },
            &self.wait,
            "file attachment",
        )
        .await;
        match attached {
            Ok(result) => {
                tracing::debug!(%selector, files = result.value, "files attached");
                Ok(())
            }
            Err(err) if is_timeout(&err) => {
                let observed: Option<usize> =
                    evaluate_as(self.session, &PageScript::FileCount(selector.clone())).await?;
                Err(FormError::FieldNotSettled {
                    selector: selector.to_string(),
                    expected: format!("{expected} file(s)"),
                    observed: observed.map(|n| format!("{n} file(s)")),
                })
            }
            Err(err) => Err(err),
        }
    }
}
