//! UI facade.
//!
//! `Ui` is the application-facing surface for dialogs and UI-thread
//! marshalling. It resolves the host's [`PlatformUiProvider`] from the
//! context's service registry on first use and caches the resolved
//! instance for the life of the facade.

pub mod provider;

use std::sync::{Arc, OnceLock};

use crate::core::dispatcher::{AsyncExecutor, BoxFuture, UiTask};
use crate::core::{AppContext, ErrorReport, SubscriptionKey, TitledError};

pub use provider::{PlatformUiProvider, UiError, UiResult, UnsupportedPlatformProvider};

/// Title used for untitled error reports surfaced as alerts.
const GENERIC_ERROR_TITLE: &str = "System Error";

struct UiInner {
    ctx: AppContext,
    provider: OnceLock<Arc<dyn PlatformUiProvider>>,
}

/// Cheap-clone handle over the resolved platform provider.
#[derive(Clone)]
pub struct Ui {
    inner: Arc<UiInner>,
}

impl Ui {
    pub fn new(ctx: &AppContext) -> Self {
        Self {
            inner: Arc::new(UiInner {
                ctx: ctx.clone(),
                provider: OnceLock::new(),
            }),
        }
    }

    /// First call resolves from the registry; a missing binding degrades
    /// to [`UnsupportedPlatformProvider`] so the misconfiguration surfaces
    /// as a descriptive error from the first operation.
    fn provider(&self) -> Arc<dyn PlatformUiProvider> {
        Arc::clone(self.inner.provider.get_or_init(|| {
            match self.inner.ctx.services().get::<dyn PlatformUiProvider>() {
                Ok(provider) => provider,
                Err(error) => {
                    tracing::warn!(%error, "falling back to the unsupported-platform provider");
                    Arc::new(UnsupportedPlatformProvider)
                }
            }
        }))
    }

    pub fn show_alert(&self, title: &str, message: &str) -> BoxFuture<UiResult<()>> {
        self.provider().show_alert(title, message)
    }

    pub fn show_confirmation(&self, title: &str, message: &str) -> BoxFuture<UiResult<bool>> {
        self.provider().show_confirmation(title, message)
    }

    pub fn invoke_on_ui_thread(&self, task: UiTask) -> UiResult<()> {
        self.provider().invoke_on_ui_thread(task)
    }

    pub fn invoke_on_ui_thread_async(&self, task: UiTask) -> BoxFuture<UiResult<()>> {
        self.provider().invoke_on_ui_thread_async(task)
    }
}

/// Installs the single startup subscriber that surfaces every report from
/// the context's error funnel as an alert. Titled reports use their own
/// title; anything else gets the generic one.
pub fn install_error_alerts(ctx: &AppContext, executor: Arc<dyn AsyncExecutor>) -> SubscriptionKey {
    let ui = Ui::new(ctx);
    ctx.on_error_occurred().subscribe(move |report| {
        let (title, message) = alert_parts(report);
        let ui = ui.clone();
        executor.spawn(Box::pin(async move {
            if let Err(error) = ui.show_alert(&title, &message).await {
                tracing::warn!(%error, %title, "error report could not be surfaced");
            }
        }));
    })
}

fn alert_parts(report: &ErrorReport) -> (String, String) {
    match report.downcast_ref::<TitledError>() {
        Some(titled) => (titled.title().to_string(), titled.to_string()),
        None => (GENERIC_ERROR_TITLE.to_string(), report.to_string()),
    }
}
