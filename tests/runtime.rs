//! End-to-end scenarios wiring the registry, context, view models,
//! commands, validation and the UI facade together the way a host would.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use mvvmkit::core::{
    ui_channel, AppContext, AsyncExecutor, BoxFuture, Command, TitledError, UiTask,
};
use mvvmkit::ui::{install_error_alerts, PlatformUiProvider, UiResult};
use mvvmkit::viewmodel::ViewModel;

trait AuthService: Send + Sync + std::fmt::Debug {
    fn check(&self, user: &str, password: &str) -> bool;
}

#[derive(Debug, Default)]
struct LocalAuth;

impl AuthService for LocalAuth {
    fn check(&self, user: &str, password: &str) -> bool {
        !user.is_empty() && password == "secret"
    }
}

/// Minimal application view model composed over the runtime base.
struct LoginViewModel {
    vm: ViewModel,
    user_name: Arc<Mutex<String>>,
    password: Arc<Mutex<String>>,
    logged_in: Arc<AtomicBool>,
    login: Command,
}

impl LoginViewModel {
    fn new(ctx: &AppContext) -> Self {
        let mut vm = ViewModel::new(ctx);
        let user_name = Arc::new(Mutex::new(String::new()));
        let password = Arc::new(Mutex::new(String::new()));
        let logged_in = Arc::new(AtomicBool::new(false));

        let auth = ctx
            .services()
            .get::<dyn AuthService>()
            .expect("auth service registered at startup");

        let login = {
            let user_name = Arc::clone(&user_name);
            let password = Arc::clone(&password);
            let logged_in = Arc::clone(&logged_in);
            let guard_name = Arc::clone(&user_name);
            Command::guarded(
                ctx,
                move || {
                    let ok = auth.check(
                        &user_name.lock().unwrap(),
                        &password.lock().unwrap(),
                    );
                    logged_in.store(ok, Ordering::SeqCst);
                },
                move || !guard_name.lock().unwrap().is_empty(),
            )
        };

        let rule_name = Arc::clone(&user_name);
        vm.add_validation("UserName", "User name is required", move || {
            !rule_name.lock().unwrap().is_empty()
        });
        vm.mark_validated("UserName");
        vm.track_command(&login);

        Self {
            vm,
            user_name,
            password,
            logged_in,
            login,
        }
    }

    fn set_user_name(&mut self, value: &str) {
        *self.user_name.lock().unwrap() = value.to_string();
        self.vm.notify_and_validate_property("UserName", true);
    }

    fn set_password(&mut self, value: &str) {
        *self.password.lock().unwrap() = value.to_string();
        self.vm.notify_property_changed("Password", true);
    }
}

struct RecordingProvider {
    alerts: Arc<Mutex<Vec<(String, String)>>>,
}

impl PlatformUiProvider for RecordingProvider {
    fn show_alert(&self, title: &str, message: &str) -> BoxFuture<UiResult<()>> {
        self.alerts
            .lock()
            .unwrap()
            .push((title.to_string(), message.to_string()));
        Box::pin(async { Ok(()) })
    }

    fn show_confirmation(&self, _title: &str, _message: &str) -> BoxFuture<UiResult<bool>> {
        Box::pin(async { Ok(true) })
    }

    fn invoke_on_ui_thread(&self, task: UiTask) -> UiResult<()> {
        task();
        Ok(())
    }

    fn invoke_on_ui_thread_async(&self, task: UiTask) -> BoxFuture<UiResult<()>> {
        task();
        Box::pin(async { Ok(()) })
    }
}

struct BlockingExecutor;

impl AsyncExecutor for BlockingExecutor {
    fn spawn(&self, task: BoxFuture) {
        tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap()
            .block_on(task);
    }
}

fn ctx_with_auth() -> AppContext {
    let ctx = AppContext::new();
    ctx.services()
        .bind::<dyn AuthService>(|| Arc::new(LocalAuth));
    ctx
}

#[test]
fn login_flow_enables_command_through_one_queued_requery() {
    let ctx = ctx_with_auth();
    let (dispatcher, mut ui_loop) = ui_channel();
    ctx.set_dispatcher(dispatcher);

    let mut login = LoginViewModel::new(&ctx);
    let requeried = Arc::new(AtomicUsize::new(0));
    let requeried2 = Arc::clone(&requeried);
    login.login.on_can_execute_changed(move || {
        requeried2.fetch_add(1, Ordering::SeqCst);
    });

    assert!(!login.login.can_execute(None));
    assert!(!login.vm.data_changed());

    login.set_user_name("bob");

    // The requery is queued, not run, until the UI loop drains it.
    assert_eq!(requeried.load(Ordering::SeqCst), 0);
    assert_eq!(ui_loop.drain(), 1);
    assert_eq!(requeried.load(Ordering::SeqCst), 1);

    assert!(login.login.can_execute(None));
    assert!(login.vm.data_changed());
    assert!(login.vm.is_valid());

    login.set_password("secret");
    login.login.execute(None);
    assert!(login.logged_in.load(Ordering::SeqCst));
}

#[test]
fn full_validation_pass_gates_an_empty_form() {
    let ctx = ctx_with_auth();
    let mut login = LoginViewModel::new(&ctx);

    login.vm.validate();
    assert!(login.vm.has_errors());
    assert_eq!(login.vm.error_messages(), "User name is required");
    assert_eq!(
        login.vm.errors_for("UserName"),
        Some(&["User name is required".to_string()][..])
    );

    login.set_user_name("bob");
    login.vm.validate();
    assert!(login.vm.is_valid());
}

#[test]
fn unregistered_service_failure_names_the_type() {
    let ctx = AppContext::new();
    let err = ctx.services().get::<dyn AuthService>().unwrap_err();
    assert!(err.to_string().contains("AuthService"));
    assert!(err.to_string().contains("not registered"));
}

#[test]
fn singleton_binding_controls_instance_identity() {
    let ctx = AppContext::new();
    ctx.services()
        .bind::<dyn AuthService>(|| Arc::new(LocalAuth));

    let first = ctx.services().get::<dyn AuthService>().unwrap();
    let second = ctx.services().get::<dyn AuthService>().unwrap();
    assert!(!Arc::ptr_eq(&first, &second));

    let singleton_ctx = AppContext::new();
    singleton_ctx
        .services()
        .bind_singleton::<dyn AuthService>(|| Arc::new(LocalAuth));

    let first = singleton_ctx.services().get::<dyn AuthService>().unwrap();
    let second = singleton_ctx.services().get::<dyn AuthService>().unwrap();
    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn reported_errors_surface_as_alerts_and_reset_busy() {
    #[derive(Debug)]
    struct LoginFailed;
    impl std::fmt::Display for LoginFailed {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "invalid credentials")
        }
    }
    impl std::error::Error for LoginFailed {}

    let ctx = ctx_with_auth();
    let alerts = Arc::new(Mutex::new(Vec::new()));
    let alerts2 = Arc::clone(&alerts);
    ctx.services().bind::<dyn PlatformUiProvider>(move || {
        Arc::new(RecordingProvider {
            alerts: Arc::clone(&alerts2),
        })
    });
    install_error_alerts(&ctx, Arc::new(BlockingExecutor));

    let mut login = LoginViewModel::new(&ctx);
    login.vm.set_is_busy(true);

    login.vm.notify_error_occurred(LoginFailed);
    assert!(!login.vm.is_busy());

    login.vm.notify_error_occurred_titled("Login", LoginFailed);

    assert_eq!(
        *alerts.lock().unwrap(),
        vec![
            ("System Error".to_string(), "invalid credentials".to_string()),
            ("Login".to_string(), "invalid credentials".to_string()),
        ]
    );
}

#[test]
fn titled_reports_keep_their_source_chain() {
    let ctx = ctx_with_auth();
    let seen_title = Arc::new(Mutex::new(None));

    let seen2 = Arc::clone(&seen_title);
    ctx.on_error_occurred().subscribe(move |report| {
        if let Some(titled) = report.downcast_ref::<TitledError>() {
            *seen2.lock().unwrap() = Some(titled.title().to_string());
            assert!(std::error::Error::source(titled).is_some());
        }
    });

    let mut vm = ViewModel::new(&ctx);
    vm.notify_error_occurred_titled(
        "Sync",
        std::io::Error::new(std::io::ErrorKind::Other, "offline"),
    );

    assert_eq!(seen_title.lock().unwrap().as_deref(), Some("Sync"));
}

#[test]
fn bulk_notification_is_one_dispatch_in_input_order() {
    let ctx = AppContext::new();
    let (dispatcher, mut ui_loop) = ui_channel();
    ctx.set_dispatcher(dispatcher);

    let order = Arc::new(Mutex::new(Vec::new()));
    let mut commands = Vec::new();
    for name in ["save", "delete", "refresh"] {
        let command = Command::new(&ctx, || {});
        let order2 = Arc::clone(&order);
        command.on_can_execute_changed(move || {
            order2.lock().unwrap().push(name);
        });
        commands.push(command);
    }

    Command::bulk_notify(&ctx, commands);

    assert_eq!(ui_loop.drain(), 1);
    assert_eq!(*order.lock().unwrap(), vec!["save", "delete", "refresh"]);
}

#[test]
fn busy_transition_notifies_both_names_once() {
    let ctx = ctx_with_auth();
    let mut login = LoginViewModel::new(&ctx);

    let names = Arc::new(Mutex::new(Vec::new()));
    let names2 = Arc::clone(&names);
    login.vm.on_property_changed().subscribe(move |name| {
        names2.lock().unwrap().push(name.to_string());
    });

    let payloads = Arc::new(Mutex::new(Vec::new()));
    let payloads2 = Arc::clone(&payloads);
    login.vm.on_busy_changed().subscribe(move |value| {
        payloads2.lock().unwrap().push(*value);
    });

    login.vm.set_is_busy(true);
    login.vm.set_is_busy(true);

    assert_eq!(*names.lock().unwrap(), vec!["IsBusy", "IsBusyReversed"]);
    assert_eq!(*payloads.lock().unwrap(), vec![true]);
}
