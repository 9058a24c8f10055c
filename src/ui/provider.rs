//! Platform UI provider port.
//!
//! The runtime stays toolkit-agnostic: each host binds one
//! `PlatformUiProvider` into the service registry and the [`Ui`] facade
//! resolves it on first use. Hosts without a native UI leave the binding
//! out and get [`UnsupportedPlatformProvider`], which turns every call
//! into a descriptive configuration error instead of a panic.
//!
//! [`Ui`]: super::Ui

use crate::core::dispatcher::{BoxFuture, UiTask};

pub type UiResult<T> = std::result::Result<T, UiError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiError {
    PlatformNotSupported,
}

impl std::fmt::Display for UiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UiError::PlatformNotSupported => {
                write!(f, "no platform UI provider is registered for this host")
            }
        }
    }
}

impl std::error::Error for UiError {}

/// Host-side implementation of dialogs and UI-thread marshalling.
///
/// Dialog methods return owned futures, so implementations copy the title
/// and message out of the borrowed arguments before going async.
pub trait PlatformUiProvider: Send + Sync {
    fn show_alert(&self, title: &str, message: &str) -> BoxFuture<UiResult<()>>;

    /// Two-button confirmation; resolves to the user's choice.
    fn show_confirmation(&self, title: &str, message: &str) -> BoxFuture<UiResult<bool>>;

    fn invoke_on_ui_thread(&self, task: UiTask) -> UiResult<()>;

    fn invoke_on_ui_thread_async(&self, task: UiTask) -> BoxFuture<UiResult<()>>;
}

/// Fallback provider for hosts that never bound a real one. Every
/// operation fails with [`UiError::PlatformNotSupported`].
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedPlatformProvider;

impl PlatformUiProvider for UnsupportedPlatformProvider {
    fn show_alert(&self, _title: &str, _message: &str) -> BoxFuture<UiResult<()>> {
        Box::pin(async { Err(UiError::PlatformNotSupported) })
    }

    fn show_confirmation(&self, _title: &str, _message: &str) -> BoxFuture<UiResult<bool>> {
        Box::pin(async { Err(UiError::PlatformNotSupported) })
    }

    fn invoke_on_ui_thread(&self, _task: UiTask) -> UiResult<()> {
        Err(UiError::PlatformNotSupported)
    }

    fn invoke_on_ui_thread_async(&self, _task: UiTask) -> BoxFuture<UiResult<()>> {
        Box::pin(async { Err(UiError::PlatformNotSupported) })
    }
}
