//! Application context: the process-wide policy object.
//!
//! One `AppContext` is created at startup and cloned (cheaply) into view
//! models and commands. It carries everything that used to be hidden
//! global state: the service registry, the UI-thread dispatcher, the
//! command-refresh policy, the optional requery relay, and the
//! application-wide error funnel.

use std::sync::{Arc, RwLock};

use super::command::RequeryRelay;
use super::dispatcher::{InlineDispatcher, UiDispatcher};
use super::event::Event;
use super::service::ServiceRegistry;

/// Payload of the error funnel: any error a view model reports through
/// `notify_error_occurred`, possibly wrapped in a [`TitledError`].
pub type ErrorReport = Arc<dyn std::error::Error + Send + Sync>;

/// An error carrying a short dialog title distinct from its message.
#[derive(Debug)]
pub struct TitledError {
    title: String,
    source: ErrorReport,
}

impl TitledError {
    pub fn new(title: impl Into<String>, source: ErrorReport) -> Self {
        Self {
            title: title.into(),
            source,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }
}

impl std::fmt::Display for TitledError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.source)
    }
}

impl std::error::Error for TitledError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&*self.source as &(dyn std::error::Error + 'static))
    }
}

/// How a view model refreshes command enablement after a property change.
///
/// The two strategies are mutually exclusive by construction; there is no
/// precedence question to answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommandRefresh {
    /// Collect the view model's tracked commands and raise their
    /// can-execute-changed notification in one batched UI-thread dispatch.
    #[default]
    Requery,
    /// Re-fire property-changed for each tracked command-bearing property
    /// name; bindings re-read the property and requery implicitly.
    NotifyProperties,
    /// No refresh pass.
    None,
}

struct ContextInner {
    services: ServiceRegistry,
    dispatcher: RwLock<Arc<dyn UiDispatcher>>,
    command_refresh: RwLock<CommandRefresh>,
    requery_relay: RwLock<Option<Arc<dyn RequeryRelay>>>,
    error_occurred: Event<ErrorReport>,
}

#[derive(Clone)]
pub struct AppContext {
    inner: Arc<ContextInner>,
}

impl AppContext {
    /// A context with an inline dispatcher and the default
    /// [`CommandRefresh::Requery`] policy. Hosts with a real UI loop
    /// install their dispatcher before constructing view models.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ContextInner {
                services: ServiceRegistry::new(),
                dispatcher: RwLock::new(Arc::new(InlineDispatcher)),
                command_refresh: RwLock::new(CommandRefresh::default()),
                requery_relay: RwLock::new(None),
                error_occurred: Event::new(),
            }),
        }
    }

    pub fn services(&self) -> &ServiceRegistry {
        &self.inner.services
    }

    pub fn dispatcher(&self) -> Arc<dyn UiDispatcher> {
        Arc::clone(&self.inner.dispatcher.read().expect("context poisoned"))
    }

    pub fn set_dispatcher(&self, dispatcher: impl UiDispatcher + 'static) {
        *self.inner.dispatcher.write().expect("context poisoned") = Arc::new(dispatcher);
    }

    pub fn command_refresh(&self) -> CommandRefresh {
        *self.inner.command_refresh.read().expect("context poisoned")
    }

    pub fn set_command_refresh(&self, policy: CommandRefresh) {
        *self.inner.command_refresh.write().expect("context poisoned") = policy;
    }

    pub fn requery_relay(&self) -> Option<Arc<dyn RequeryRelay>> {
        self.inner
            .requery_relay
            .read()
            .expect("context poisoned")
            .clone()
    }

    pub fn set_requery_relay(&self, relay: Arc<dyn RequeryRelay>) {
        *self.inner.requery_relay.write().expect("context poisoned") = Some(relay);
    }

    /// The application-wide error funnel. Exactly one subscriber installed
    /// at startup is expected to surface reports to the user.
    pub fn on_error_occurred(&self) -> &Event<ErrorReport> {
        &self.inner.error_occurred
    }

    pub fn report_error(&self, report: ErrorReport) {
        tracing::error!(error = %report, "view model reported an error");
        self.inner.error_occurred.emit(&report);
    }

    /// True when both handles point at the same context.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Default for AppContext {
    fn default() -> Self {
        Self::new()
    }
}
