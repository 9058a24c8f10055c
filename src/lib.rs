//! mvvmkit - presentation-layer runtime for native UI hosts
//!
//! Module structure:
//! - core: framework primitives (Event, Command, ServiceRegistry, AppContext)
//! - viewmodel: observable view-model base and validation engine
//! - ui: platform provider contract and the Ui facade
//! - logging: tracing setup helper for host applications

pub mod core;
pub mod logging;
pub mod ui;
pub mod viewmodel;
