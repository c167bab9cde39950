//! Browser control over the Chrome `DevTools` Protocol.
//!
//! When compiled with the `browser` feature, [`ChromiumSession`] launches a
//! chromium instance through chromiumoxide and implements
//! [`BrowserSession`](crate::driver::BrowserSession) on its single page.
//! Native dialogs are tracked by a listener task, since a blocked page cannot
//! evaluate scripts.

use serde::{Deserialize, Serialize};

/// Default viewport width
pub const DEFAULT_VIEWPORT_WIDTH: u32 = 1440;

/// Default viewport height
pub const DEFAULT_VIEWPORT_HEIGHT: u32 = 900;

/// Browser session configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Run in headless mode
    pub headless: bool,
    /// Viewport width
    pub viewport_width: u32,
    /// Viewport height
    pub viewport_height: u32,
    /// Path to chromium binary (None = auto-detect)
    pub chromium_path: Option<String>,
    /// Sandbox mode (disable for containers)
    pub sandbox: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport_width: DEFAULT_VIEWPORT_WIDTH,
            viewport_height: DEFAULT_VIEWPORT_HEIGHT,
            chromium_path: None,
            sandbox: true,
        }
    }
}

impl SessionConfig {
    /// Set viewport dimensions
    #[must_use]
    pub const fn with_viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport_width = width;
        self.viewport_height = height;
        self
    }

    /// Set headless mode
    #[must_use]
    pub const fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set chromium path
    #[must_use]
    pub fn with_chromium_path(mut self, path: impl Into<String>) -> Self {
        self.chromium_path = Some(path.into());
        self
    }

    /// Disable sandbox (for containers/CI)
    #[must_use]
    pub const fn with_no_sandbox(mut self) -> Self {
        self.sandbox = false;
        self
    }
}

// ============================================================================
// CDP implementation (when `browser` feature is enabled)
// ============================================================================

#[cfg(feature = "browser")]
mod cdp {
    use super::SessionConfig;
    use crate::dialog::{Dialog, DialogType};
    use crate::driver::BrowserSession;
    use crate::locator::Selector;
    use crate::result::{FormError, FormResult};
    use crate::script::PageScript;
    use async_trait::async_trait;
    use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig as CdpConfig};
    use chromiumoxide::cdp::browser_protocol::dom::SetFileInputFilesParams;
    use chromiumoxide::cdp::browser_protocol::page::{
        EventJavascriptDialogClosed, EventJavascriptDialogOpening, HandleJavaScriptDialogParams,
    };
    use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
    use chromiumoxide::page::Page as CdpPage;
    use futures::StreamExt;
    use serde_json::Value;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex, PoisonError};
    use tokio::task::JoinHandle;

    type DialogSlot = Arc<Mutex<Option<Dialog>>>;

    fn cdp_error(e: impl std::fmt::Display) -> FormError {
        FormError::session(e.to_string())
    }

    fn dialog_type(raw: &str) -> DialogType {
        match raw {
            "confirm" => DialogType::Confirm,
            "prompt" => DialogType::Prompt,
            "beforeunload" => DialogType::BeforeUnload,
            _ => DialogType::Alert,
        }
    }

    /// Stop the background tasks whatever the outcome of closing the browser
    fn release(closed: FormResult<()>, tasks: [&JoinHandle<()>; 2]) -> FormResult<()> {
        for task in tasks {
            task.abort();
        }
        closed
    }

    /// Single-page chromium session
    pub struct ChromiumSession {
        config: SessionConfig,
        browser: tokio::sync::Mutex<Option<CdpBrowser>>,
        page: CdpPage,
        dialog: DialogSlot,
        handler: JoinHandle<()>,
        listener: JoinHandle<()>,
    }

    impl std::fmt::Debug for ChromiumSession {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("ChromiumSession")
                .field("config", &self.config)
                .finish_non_exhaustive()
        }
    }

    impl ChromiumSession {
        /// Launch chromium and open a blank page
        ///
        /// # Errors
        ///
        /// Returns error if the browser cannot be launched
        pub async fn launch(config: SessionConfig) -> FormResult<Self> {
            let mut builder =
                CdpConfig::builder().window_size(config.viewport_width, config.viewport_height);

            if !config.headless {
                builder = builder.with_head();
            }

            if !config.sandbox {
                builder = builder.no_sandbox();
            }

            if let Some(ref path) = config.chromium_path {
                builder = builder.chrome_executable(path);
            }

            let cdp_config = builder
                .build()
                .map_err(|message| FormError::BrowserLaunch { message })?;

            let (browser, mut handler) =
                CdpBrowser::launch(cdp_config)
                    .await
                    .map_err(|e| FormError::BrowserLaunch {
                        message: e.to_string(),
                    })?;

            let handler = tokio::spawn(async move {
                while let Some(event) = handler.next().await {
                    if event.is_err() {
                        break;
                    }
                }
            });

            let page = browser.new_page("about:blank").await.map_err(cdp_error)?;
            let dialog: DialogSlot = Arc::new(Mutex::new(None));
            let listener = Self::listen_for_dialogs(&page, Arc::clone(&dialog)).await?;

            tracing::info!(
                headless = config.headless,
                width = config.viewport_width,
                height = config.viewport_height,
                "browser launched"
            );

            Ok(Self {
                config,
                browser: tokio::sync::Mutex::new(Some(browser)),
                page,
                dialog,
                handler,
                listener,
            })
        }

        async fn listen_for_dialogs(page: &CdpPage, slot: DialogSlot) -> FormResult<JoinHandle<()>> {
            let mut opening = page
                .event_listener::<EventJavascriptDialogOpening>()
                .await
                .map_err(cdp_error)?;
            let mut closed = page
                .event_listener::<EventJavascriptDialogClosed>()
                .await
                .map_err(cdp_error)?;

            Ok(tokio::spawn(async move {
                loop {
                    tokio::select! {
                        Some(event) = opening.next() => {
                            let dialog = Dialog::new(dialog_type(event.r#type.as_ref()), event.message.clone());
                            tracing::debug!(message = dialog.message(), "dialog opened");
                            *slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(dialog);
                        }
                        Some(_) = closed.next() => {
                            *slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
                        }
                        else => break,
                    }
                }
            }))
        }

        fn open_dialog(&self) -> Option<Dialog> {
            self.dialog
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }

        /// Get the session configuration
        #[must_use]
        pub const fn config(&self) -> &SessionConfig {
            &self.config
        }
    }

    #[async_trait]
    impl BrowserSession for ChromiumSession {
        async fn navigate(&mut self, url: &str) -> FormResult<()> {
            tracing::debug!(url, "navigating");
            let _ = self
                .page
                .goto(url)
                .await
                .map_err(|e| FormError::Navigation {
                    url: url.to_string(),
                    message: e.to_string(),
                })?;
            Ok(())
        }

        async fn current_url(&self) -> FormResult<String> {
            Ok(self
                .page
                .url()
                .await
                .map_err(cdp_error)?
                .unwrap_or_else(|| "about:blank".to_string()))
        }

        async fn evaluate(&self, script: &PageScript) -> FormResult<Value> {
            if let Some(dialog) = self.open_dialog() {
                return Err(FormError::session(format!(
                    "unexpected alert open: {}",
                    dialog.message()
                )));
            }
            let result = self
                .page
                .evaluate(script.to_js())
                .await
                .map_err(|e| FormError::session(format!("`{}` failed: {e}", script.name())))?;
            let raw: String = result.into_value().map_err(cdp_error)?;
            Ok(serde_json::from_str(&raw)?)
        }

        async fn pending_dialog(&self) -> FormResult<Option<Dialog>> {
            Ok(self.open_dialog())
        }

        async fn accept_dialog(&self) -> FormResult<()> {
            let _ = self
                .page
                .execute(HandleJavaScriptDialogParams::new(true))
                .await
                .map_err(cdp_error)?;
            *self.dialog.lock().unwrap_or_else(PoisonError::into_inner) = None;
            Ok(())
        }

        async fn attach_files(&self, selector: &Selector, files: &[PathBuf]) -> FormResult<()> {
            let lookup = EvaluateParams::builder()
                .expression(selector.to_query())
                .return_by_value(false)
                .build()
                .map_err(FormError::session)?;
            let response = self.page.execute(lookup).await.map_err(cdp_error)?;
            let object_id = response.result.result.object_id.clone().ok_or_else(|| {
                FormError::LocatorNotFound {
                    field: selector.to_string(),
                    selector: selector.to_string(),
                }
            })?;

            let paths: Vec<String> = files.iter().map(|p| p.display().to_string()).collect();
            let params = SetFileInputFilesParams::builder()
                .files(paths)
                .object_id(object_id)
                .build()
                .map_err(FormError::session)?;
            let _ = self.page.execute(params).await.map_err(cdp_error)?;
            Ok(())
        }

        async fn close(&mut self) -> FormResult<()> {
            let browser = self.browser.lock().await.take();
            let closed = match browser {
                Some(mut browser) => browser.close().await.map(|_| ()).map_err(cdp_error),
                None => Ok(()),
            };
            match &closed {
                Ok(()) => tracing::info!("browser closed"),
                Err(err) => tracing::warn!(error = %err, "browser close failed"),
            }
            release(closed, [&self.listener, &self.handler])
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_dialog_type_mapping() {
            assert_eq!(dialog_type("alert"), DialogType::Alert);
            assert_eq!(dialog_type("confirm"), DialogType::Confirm);
            assert_eq!(dialog_type("beforeunload"), DialogType::BeforeUnload);
        }

        #[tokio::test]
        #[allow(clippy::unwrap_used)]
        async fn test_failed_close_still_stops_tasks() {
            let listener = tokio::spawn(std::future::pending::<()>());
            let handler = tokio::spawn(std::future::pending::<()>());
            let result = release(Err(FormError::session("connection reset")), [&listener, &handler]);

            assert!(matches!(result, Err(FormError::Session { .. })));
            assert!(listener.await.unwrap_err().is_cancelled());
            assert!(handler.await.unwrap_err().is_cancelled());
        }
    }
}

#[cfg(feature = "browser")]
pub use cdp::ChromiumSession;
