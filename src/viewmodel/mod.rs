//! Observable view-model base.
//!
//! `ViewModel` is the aggregate the rest of the runtime hangs off:
//! busy/loaded/editable state, property-change notification with
//! side-effect hooks, the lazily created validator, and the command
//! refresh pass driven by the context policy.
//!
//! Application view models embed it by composition:
//!
//! ```ignore
//! struct LoginViewModel {
//!     vm: ViewModel,
//!     user_name: String,
//! }
//!
//! impl LoginViewModel {
//!     fn set_user_name(&mut self, value: String) {
//!         self.user_name = value;
//!         self.vm.notify_property_changed("UserName", true);
//!     }
//! }
//! ```

pub mod list;
pub mod validator;

use std::sync::Arc;

use crate::core::{AppContext, Command, CommandRefresh, ErrorReport, Event, TitledError};

pub use list::{group_into_tree, ListViewModel, TreeNode};
pub use validator::{PropertyName, Validator, ALL_PROPERTIES};

type ChangeAction = Box<dyn Fn() + Send + Sync>;

pub struct ViewModel {
    ctx: AppContext,
    data_changed: bool,
    is_loaded: bool,
    is_busy: bool,
    is_editable: bool,
    disable_busy_changed: bool,
    validator: Option<Validator>,
    property_change_actions: Vec<(PropertyName, ChangeAction)>,
    /// Explicit descriptor table of command-bearing members; replaces the
    /// reflective member scan.
    commands: Vec<Command>,
    command_properties: Vec<PropertyName>,
    validated_properties: Vec<PropertyName>,
    property_changed: Event<PropertyName>,
    busy_changed: Event<bool>,
    loaded_changed: Event<bool>,
    completed: Event<bool>,
    errors_changed: Event<PropertyName>,
}

impl ViewModel {
    pub fn new(ctx: &AppContext) -> Self {
        Self {
            ctx: ctx.clone(),
            data_changed: false,
            is_loaded: false,
            is_busy: false,
            is_editable: false,
            disable_busy_changed: false,
            validator: None,
            property_change_actions: Vec::new(),
            commands: Vec::new(),
            command_properties: Vec::new(),
            validated_properties: Vec::new(),
            property_changed: Event::new(),
            busy_changed: Event::new(),
            loaded_changed: Event::new(),
            completed: Event::new(),
            errors_changed: Event::new(),
        }
    }

    pub fn ctx(&self) -> &AppContext {
        &self.ctx
    }

    // ----- events -----

    pub fn on_property_changed(&self) -> &Event<PropertyName> {
        &self.property_changed
    }

    pub fn on_busy_changed(&self) -> &Event<bool> {
        &self.busy_changed
    }

    pub fn on_loaded_changed(&self) -> &Event<bool> {
        &self.loaded_changed
    }

    /// Fired by transient dialogs/workflows to signal "close me".
    pub fn on_completed(&self) -> &Event<bool> {
        &self.completed
    }

    pub fn on_errors_changed(&self) -> &Event<PropertyName> {
        &self.errors_changed
    }

    // ----- state flags -----

    pub fn data_changed(&self) -> bool {
        self.data_changed
    }

    pub fn set_data_changed(&mut self, value: bool) {
        self.data_changed = value;
    }

    pub fn is_loaded(&self) -> bool {
        self.is_loaded
    }

    pub fn set_is_loaded(&mut self, value: bool) {
        if self.is_loaded == value {
            return;
        }
        self.is_loaded = value;
        self.loaded_changed.emit(&value);
    }

    pub fn is_busy(&self) -> bool {
        self.is_busy
    }

    pub fn is_busy_reversed(&self) -> bool {
        !self.is_busy
    }

    pub fn set_is_busy(&mut self, value: bool) {
        if self.is_busy == value {
            return;
        }
        self.is_busy = value;
        if !self.disable_busy_changed {
            self.notify_property_changed("IsBusy", true);
            self.notify_property_changed("IsBusyReversed", true);
            self.busy_changed.emit(&value);
        }
    }

    pub fn disable_busy_changed(&self) -> bool {
        self.disable_busy_changed
    }

    /// Suppresses the busy notifications and event without suppressing
    /// the underlying flag mutation.
    pub fn set_disable_busy_changed(&mut self, value: bool) {
        self.disable_busy_changed = value;
    }

    pub fn is_editable(&self) -> bool {
        self.is_editable
    }

    pub fn is_editable_reversed(&self) -> bool {
        !self.is_editable
    }

    pub fn set_is_editable(&mut self, value: bool) {
        if self.is_editable == value {
            return;
        }
        self.is_editable = value;
        self.notify_property_changed("IsEditable", true);
        self.notify_property_changed("IsEditableReversed", true);
    }

    // ----- change notification -----

    /// Raises the change event for `property`: marks `data_changed` iff
    /// `has_changed`, runs the registered side-effect action, then applies
    /// the context's command-refresh policy.
    pub fn notify_property_changed(&mut self, property: &str, has_changed: bool) {
        if has_changed {
            self.data_changed = true;
        }
        self.property_changed.emit(&PropertyName::from(property));
        self.run_change_action(property);
        self.refresh_commands();
    }

    /// Notifies each listed property; an empty list means "everything may
    /// have changed" and behaves like [`notify_all_properties_changed`].
    ///
    /// [`notify_all_properties_changed`]: Self::notify_all_properties_changed
    pub fn notify_properties_changed<I, S>(&mut self, properties: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut any = false;
        for property in properties {
            any = true;
            self.notify_property_changed(property.as_ref(), true);
        }
        if !any {
            self.notify_all_properties_changed();
        }
    }

    /// One empty-name change event (the "all properties" convention),
    /// every registered side-effect action, then one refresh pass.
    pub fn notify_all_properties_changed(&mut self) {
        self.data_changed = true;
        self.property_changed.emit(&PropertyName::from(ALL_PROPERTIES));
        for (_, action) in &self.property_change_actions {
            action();
        }
        self.refresh_commands();
    }

    /// Registers a side-effect hook run whenever `property` changes,
    /// before any command refresh. One hook per property; re-registering
    /// replaces.
    pub fn when_property_changed(
        &mut self,
        property: impl Into<PropertyName>,
        action: impl Fn() + Send + Sync + 'static,
    ) {
        let property = property.into();
        let action: ChangeAction = Box::new(action);
        match self
            .property_change_actions
            .iter()
            .position(|(name, _)| *name == property)
        {
            Some(index) => self.property_change_actions[index] = (property, action),
            None => self.property_change_actions.push((property, action)),
        }
    }

    fn run_change_action(&self, property: &str) {
        if let Some((_, action)) = self
            .property_change_actions
            .iter()
            .find(|(name, _)| name.as_str() == property)
        {
            action();
        }
    }

    fn refresh_commands(&self) {
        match self.ctx.command_refresh() {
            CommandRefresh::Requery => {
                Command::bulk_notify(&self.ctx, self.commands.iter().cloned());
            }
            CommandRefresh::NotifyProperties => {
                for property in &self.command_properties {
                    self.property_changed.emit(property);
                }
            }
            CommandRefresh::None => {}
        }
    }

    // ----- command descriptor table -----

    /// Adds a command to the requery pass. Idempotent per command handle.
    pub fn track_command(&mut self, command: &Command) {
        if !self.commands.iter().any(|c| c.ptr_eq(command)) {
            self.commands.push(command.clone());
        }
    }

    /// Adds a command-bearing property name for the
    /// [`CommandRefresh::NotifyProperties`] strategy.
    pub fn track_command_property(&mut self, property: impl Into<PropertyName>) {
        let property = property.into();
        if !self.command_properties.contains(&property) {
            self.command_properties.push(property);
        }
    }

    pub fn tracked_commands(&self) -> &[Command] {
        &self.commands
    }

    // ----- validation -----

    pub fn validator(&self) -> Option<&Validator> {
        self.validator.as_ref()
    }

    /// The owned validator, created empty on first access and wired to
    /// this view model's errors-changed event.
    pub fn validator_mut(&mut self) -> &mut Validator {
        let errors_changed = self.errors_changed.clone();
        self.validator
            .get_or_insert_with(|| Validator::attached(errors_changed))
    }

    pub fn add_validation(
        &mut self,
        property: impl Into<PropertyName>,
        message: impl Into<String>,
        predicate: impl Fn() -> bool + Send + Sync + 'static,
    ) {
        self.validator_mut().add_validation(property, message, predicate);
    }

    pub fn remove_validation(&mut self, property: &str) {
        self.validator_mut().remove_validation(property);
    }

    /// Marks `property` as part of the full [`validate`](Self::validate)
    /// pass; replaces the declarative validated-property scan.
    pub fn mark_validated(&mut self, property: impl Into<PropertyName>) {
        let property = property.into();
        if !self.validated_properties.contains(&property) {
            self.validated_properties.push(property);
        }
    }

    pub fn validate_property(&mut self, property: &str) {
        if let Some(validator) = &mut self.validator {
            validator.validate_property(property);
        }
    }

    /// Notify and validate in one step.
    pub fn notify_and_validate_property(&mut self, property: &str, has_changed: bool) {
        self.notify_property_changed(property, has_changed);
        self.validate_property(property);
    }

    pub fn validate_properties<I, S>(&mut self, properties: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if let Some(validator) = &mut self.validator {
            validator.validate_properties(properties);
        }
    }

    pub fn validate_all_properties(&mut self) {
        if let Some(validator) = &mut self.validator {
            validator.validate_all_properties();
        }
    }

    /// Full validation ritual: clears all prior errors, marks
    /// `data_changed`, fires the "all properties changed" notification,
    /// then re-runs only the rules for properties registered via
    /// [`mark_validated`](Self::mark_validated).
    pub fn validate(&mut self) {
        if let Some(validator) = &mut self.validator {
            validator.clear_errors_silent();
        }
        self.notify_all_properties_changed();

        let marked = self.validated_properties.clone();
        if let Some(validator) = &mut self.validator {
            for property in &marked {
                validator.validate_property(property.as_str());
            }
        }
    }

    pub fn has_errors(&self) -> bool {
        self.validator.as_ref().is_some_and(Validator::has_errors)
    }

    pub fn is_valid(&self) -> bool {
        !self.has_errors()
    }

    pub fn errors_for(&self, property: &str) -> Option<&[String]> {
        self.validator.as_ref().and_then(|v| v.errors_for(property))
    }

    pub fn error_messages(&self) -> String {
        self.validator
            .as_ref()
            .map(Validator::error_messages)
            .unwrap_or_default()
    }

    // ----- failure & completion -----

    /// Reports an operation failure through the application-wide error
    /// funnel under a generic title, flipping `is_busy` back off first.
    pub fn notify_error_occurred(
        &mut self,
        error: impl std::error::Error + Send + Sync + 'static,
    ) {
        self.report_error(Arc::new(error));
    }

    /// Titled variant: the report carries a short dialog title distinct
    /// from the error message. Blank titles degrade to the untitled path
    /// so no alert ends up with an empty header.
    pub fn notify_error_occurred_titled(
        &mut self,
        title: impl Into<String>,
        error: impl std::error::Error + Send + Sync + 'static,
    ) {
        let title = title.into();
        if title.trim().is_empty() {
            self.report_error(Arc::new(error));
            return;
        }
        let report: ErrorReport = Arc::new(TitledError::new(title, Arc::new(error)));
        self.report_error(report);
    }

    fn report_error(&mut self, report: ErrorReport) {
        self.set_is_busy(false);
        self.ctx.report_error(report);
    }

    /// Signals workflow completion to whatever hosts this view model.
    pub fn notify_on_complete(&self, result: bool) {
        self.completed.emit(&result);
    }
}
