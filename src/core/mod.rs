//! Framework primitives.
//!
//! Core abstractions for the presentation runtime:
//! - Event: multi-subscriber change notification
//! - Command: delegate command with enablement tracking
//! - ServiceRegistry: interface-to-implementation resolution
//! - AppContext: process-wide policy (dispatcher, refresh, error funnel)

pub mod command;
pub mod context;
pub mod dispatcher;
pub mod event;
pub mod service;

pub use command::{Command, CommandParam, RequeryPool, RequeryRelay};
pub use context::{AppContext, CommandRefresh, ErrorReport, TitledError};
pub use dispatcher::{
    ui_channel, AsyncExecutor, BoxFuture, ChannelDispatcher, InlineDispatcher, TokioExecutor,
    UiDispatcher, UiTask, UiTaskReceiver,
};
pub use event::{Event, SubscriptionKey};
pub use service::{Registration, ServiceError, ServiceRegistry};
