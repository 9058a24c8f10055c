//! Delegate command: an invokable unit that tracks its own enablement.
//!
//! A `Command` wraps either a zero-argument or a parameterised handler,
//! an optional enablement predicate, and a can-execute-changed event that
//! platform bindings subscribe to. Handles are cheap clones; identity is
//! the inner allocation.
//!
//! Enablement predicates must be side-effect free and fast: they run
//! synchronously, potentially many times per UI frame.

use std::any::Any;
use std::sync::{Arc, Mutex};

use super::context::AppContext;
use super::event::{Event, SubscriptionKey};

/// Opaque parameter passed from a platform binding; handlers downcast it.
pub type CommandParam = dyn Any + Send + Sync;

enum Handler {
    Simple(Box<dyn Fn() + Send + Sync>),
    WithParam(Box<dyn Fn(Option<&CommandParam>) + Send + Sync>),
}

type Predicate = Box<dyn Fn(Option<&CommandParam>) -> bool + Send + Sync>;

struct CommandInner {
    ctx: AppContext,
    handler: Handler,
    can_execute: Option<Predicate>,
    can_execute_changed: Event<()>,
}

#[derive(Clone)]
pub struct Command {
    inner: Arc<CommandInner>,
}

impl Command {
    pub fn new(ctx: &AppContext, execute: impl Fn() + Send + Sync + 'static) -> Self {
        Self::build(ctx, Handler::Simple(Box::new(execute)), None)
    }

    /// Zero-argument handler guarded by a zero-argument predicate.
    pub fn guarded(
        ctx: &AppContext,
        execute: impl Fn() + Send + Sync + 'static,
        can_execute: impl Fn() -> bool + Send + Sync + 'static,
    ) -> Self {
        Self::build(
            ctx,
            Handler::Simple(Box::new(execute)),
            Some(Box::new(move |_| can_execute())),
        )
    }

    /// Zero-argument handler guarded by a parameterised predicate, for
    /// bindings whose enablement depends on the bound parameter even
    /// though the action itself ignores it.
    pub fn guarded_with_param(
        ctx: &AppContext,
        execute: impl Fn() + Send + Sync + 'static,
        can_execute: impl Fn(Option<&CommandParam>) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self::build(
            ctx,
            Handler::Simple(Box::new(execute)),
            Some(Box::new(can_execute)),
        )
    }

    pub fn with_param(
        ctx: &AppContext,
        execute: impl Fn(Option<&CommandParam>) + Send + Sync + 'static,
    ) -> Self {
        Self::build(ctx, Handler::WithParam(Box::new(execute)), None)
    }

    /// Parameterised handler guarded by a zero-argument predicate.
    pub fn with_param_simply_guarded(
        ctx: &AppContext,
        execute: impl Fn(Option<&CommandParam>) + Send + Sync + 'static,
        can_execute: impl Fn() -> bool + Send + Sync + 'static,
    ) -> Self {
        Self::build(
            ctx,
            Handler::WithParam(Box::new(execute)),
            Some(Box::new(move |_| can_execute())),
        )
    }

    /// Parameterised handler guarded by a parameterised predicate.
    pub fn with_param_guarded(
        ctx: &AppContext,
        execute: impl Fn(Option<&CommandParam>) + Send + Sync + 'static,
        can_execute: impl Fn(Option<&CommandParam>) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self::build(
            ctx,
            Handler::WithParam(Box::new(execute)),
            Some(Box::new(can_execute)),
        )
    }

    fn build(ctx: &AppContext, handler: Handler, can_execute: Option<Predicate>) -> Self {
        Self {
            inner: Arc::new(CommandInner {
                ctx: ctx.clone(),
                handler,
                can_execute,
                can_execute_changed: Event::new(),
            }),
        }
    }

    /// True when no predicate is set, otherwise the predicate's result.
    pub fn can_execute(&self, param: Option<&CommandParam>) -> bool {
        match &self.inner.can_execute {
            None => true,
            Some(predicate) => predicate(param),
        }
    }

    pub fn execute(&self, param: Option<&CommandParam>) {
        match &self.inner.handler {
            Handler::Simple(execute) => execute(),
            Handler::WithParam(execute) => execute(param),
        }
    }

    /// Attaches a can-execute-changed listener. When a requery relay is
    /// installed on the context, the command is also handed to the relay
    /// so an external sweep can drive its re-evaluation.
    pub fn on_can_execute_changed(
        &self,
        listener: impl Fn() + Send + Sync + 'static,
    ) -> SubscriptionKey {
        let key = self.inner.can_execute_changed.subscribe(move |_| listener());
        if let Some(relay) = self.inner.ctx.requery_relay() {
            relay.attach(self);
        }
        key
    }

    pub fn remove_can_execute_changed(&self, key: SubscriptionKey) {
        self.inner.can_execute_changed.unsubscribe(key);
        if !self.inner.can_execute_changed.has_subscribers() {
            if let Some(relay) = self.inner.ctx.requery_relay() {
                relay.detach(self);
            }
        }
    }

    /// Fires can-execute-changed, either inline or as one task scheduled
    /// through the context dispatcher.
    pub fn raise_can_execute_changed(&self, on_ui_thread: bool) {
        if on_ui_thread {
            let command = self.clone();
            self.inner.ctx.dispatcher().dispatch(Box::new(move || {
                command.inner.can_execute_changed.emit(&());
            }));
        } else {
            self.inner.can_execute_changed.emit(&());
        }
    }

    /// Raises can-execute-changed for every command in iteration order
    /// using exactly one UI-thread dispatch, regardless of count.
    pub fn bulk_notify(ctx: &AppContext, commands: impl IntoIterator<Item = Command>) {
        let commands: Vec<Command> = commands.into_iter().collect();
        if commands.is_empty() {
            return;
        }

        tracing::trace!(count = commands.len(), "bulk can-execute-changed");
        ctx.dispatcher().dispatch(Box::new(move || {
            for command in &commands {
                command.raise_can_execute_changed(false);
            }
        }));
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

/// Receives commands as UI bindings attach to them, so the host can
/// re-evaluate many commands via one externally driven sweep instead of
/// per-command raises.
pub trait RequeryRelay: Send + Sync {
    fn attach(&self, command: &Command);
    fn detach(&self, command: &Command);
}

/// Default relay: keeps the set of live commands and raises them all in
/// one batched dispatch on [`sweep`](RequeryPool::sweep).
#[derive(Default)]
pub struct RequeryPool {
    commands: Mutex<Vec<Command>>,
}

impl RequeryPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.commands.lock().expect("requery pool poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn sweep(&self, ctx: &AppContext) {
        let commands = self
            .commands
            .lock()
            .expect("requery pool poisoned")
            .clone();
        Command::bulk_notify(ctx, commands);
    }
}

impl RequeryRelay for RequeryPool {
    fn attach(&self, command: &Command) {
        let mut commands = self.commands.lock().expect("requery pool poisoned");
        if !commands.iter().any(|c| c.ptr_eq(command)) {
            commands.push(command.clone());
        }
    }

    fn detach(&self, command: &Command) {
        self.commands
            .lock()
            .expect("requery pool poisoned")
            .retain(|c| !c.ptr_eq(command));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::dispatcher::{UiDispatcher, UiTask};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct CountingDispatcher {
        hops: Arc<AtomicUsize>,
    }

    impl UiDispatcher for CountingDispatcher {
        fn dispatch(&self, task: UiTask) {
            self.hops.fetch_add(1, Ordering::SeqCst);
            task();
        }
    }

    fn counting_ctx() -> (AppContext, Arc<AtomicUsize>) {
        let ctx = AppContext::new();
        let hops = Arc::new(AtomicUsize::new(0));
        ctx.set_dispatcher(CountingDispatcher {
            hops: Arc::clone(&hops),
        });
        (ctx, hops)
    }

    #[test]
    fn test_can_execute_defaults_to_true() {
        let ctx = AppContext::new();
        let command = Command::new(&ctx, || {});
        assert!(command.can_execute(None));
    }

    #[test]
    fn test_guarded_uses_predicate() {
        let ctx = AppContext::new();
        let enabled = Arc::new(AtomicBool::new(false));

        let enabled2 = Arc::clone(&enabled);
        let command = Command::guarded(&ctx, || {}, move || enabled2.load(Ordering::SeqCst));

        assert!(!command.can_execute(None));
        enabled.store(true, Ordering::SeqCst);
        assert!(command.can_execute(None));
    }

    #[test]
    fn test_execute_runs_simple_handler() {
        let ctx = AppContext::new();
        let ran = Arc::new(AtomicUsize::new(0));

        let ran2 = Arc::clone(&ran);
        let command = Command::new(&ctx, move || {
            ran2.fetch_add(1, Ordering::SeqCst);
        });

        command.execute(None);
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_execute_passes_parameter() {
        let ctx = AppContext::new();
        let seen = Arc::new(AtomicUsize::new(0));

        let seen2 = Arc::clone(&seen);
        let command = Command::with_param(&ctx, move |param| {
            let value = param.and_then(|p| p.downcast_ref::<usize>()).copied();
            seen2.store(value.unwrap_or(0), Ordering::SeqCst);
        });

        command.execute(Some(&7usize));
        assert_eq!(seen.load(Ordering::SeqCst), 7);
    }

    #[test]
    fn test_simple_handler_with_param_predicate() {
        let ctx = AppContext::new();
        let ran = Arc::new(AtomicUsize::new(0));

        let ran2 = Arc::clone(&ran);
        let command = Command::guarded_with_param(
            &ctx,
            move || {
                ran2.fetch_add(1, Ordering::SeqCst);
            },
            |param| param.and_then(|p| p.downcast_ref::<bool>()).copied() == Some(true),
        );

        assert!(command.can_execute(Some(&true)));
        assert!(!command.can_execute(None));

        command.execute(Some(&true));
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_param_handler_with_simple_guard() {
        let ctx = AppContext::new();
        let enabled = Arc::new(AtomicBool::new(false));
        let seen = Arc::new(AtomicUsize::new(0));

        let enabled2 = Arc::clone(&enabled);
        let seen2 = Arc::clone(&seen);
        let command = Command::with_param_simply_guarded(
            &ctx,
            move |param| {
                let value = param.and_then(|p| p.downcast_ref::<usize>()).copied();
                seen2.store(value.unwrap_or(0), Ordering::SeqCst);
            },
            move || enabled2.load(Ordering::SeqCst),
        );

        assert!(!command.can_execute(Some(&3usize)));
        enabled.store(true, Ordering::SeqCst);
        assert!(command.can_execute(Some(&3usize)));

        command.execute(Some(&3usize));
        assert_eq!(seen.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_param_guarded_predicate_sees_parameter() {
        let ctx = AppContext::new();
        let command = Command::with_param_guarded(
            &ctx,
            |_| {},
            |param| param.and_then(|p| p.downcast_ref::<bool>()).copied() == Some(true),
        );

        assert!(command.can_execute(Some(&true)));
        assert!(!command.can_execute(Some(&false)));
        assert!(!command.can_execute(None));
    }

    #[test]
    fn test_raise_inline_fires_subscribers() {
        let ctx = AppContext::new();
        let command = Command::new(&ctx, || {});
        let fired = Arc::new(AtomicUsize::new(0));

        let fired2 = Arc::clone(&fired);
        command.on_can_execute_changed(move || {
            fired2.fetch_add(1, Ordering::SeqCst);
        });

        command.raise_can_execute_changed(false);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_raise_on_ui_thread_uses_one_hop() {
        let (ctx, hops) = counting_ctx();
        let command = Command::new(&ctx, || {});
        let fired = Arc::new(AtomicUsize::new(0));

        let fired2 = Arc::clone(&fired);
        command.on_can_execute_changed(move || {
            fired2.fetch_add(1, Ordering::SeqCst);
        });

        command.raise_can_execute_changed(true);
        assert_eq!(hops.load(Ordering::SeqCst), 1);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_bulk_notify_is_one_hop_in_order() {
        let (ctx, hops) = counting_ctx();
        let order = Arc::new(Mutex::new(Vec::new()));

        let mut commands = Vec::new();
        for name in ["first", "second", "third"] {
            let command = Command::new(&ctx, || {});
            let order2 = Arc::clone(&order);
            command.on_can_execute_changed(move || {
                order2.lock().unwrap().push(name);
            });
            commands.push(command);
        }

        Command::bulk_notify(&ctx, commands);

        assert_eq!(hops.load(Ordering::SeqCst), 1);
        assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_bulk_notify_empty_skips_dispatch() {
        let (ctx, hops) = counting_ctx();
        Command::bulk_notify(&ctx, Vec::new());
        assert_eq!(hops.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_relay_tracks_subscribed_commands() {
        let ctx = AppContext::new();
        let pool = Arc::new(RequeryPool::new());
        ctx.set_requery_relay(Arc::clone(&pool) as Arc<dyn RequeryRelay>);

        let command = Command::new(&ctx, || {});
        let key = command.on_can_execute_changed(|| {});
        assert_eq!(pool.len(), 1);

        // Second subscription must not duplicate the entry.
        command.on_can_execute_changed(|| {});
        assert_eq!(pool.len(), 1);

        command.remove_can_execute_changed(key);
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_relay_detaches_after_last_unsubscribe() {
        let ctx = AppContext::new();
        let pool = Arc::new(RequeryPool::new());
        ctx.set_requery_relay(Arc::clone(&pool) as Arc<dyn RequeryRelay>);

        let command = Command::new(&ctx, || {});
        let key = command.on_can_execute_changed(|| {});
        command.remove_can_execute_changed(key);

        assert!(pool.is_empty());
    }

    #[test]
    fn test_pool_sweep_raises_all_in_one_hop() {
        let (ctx, hops) = counting_ctx();
        let pool = Arc::new(RequeryPool::new());
        ctx.set_requery_relay(Arc::clone(&pool) as Arc<dyn RequeryRelay>);

        let raised = Arc::new(AtomicUsize::new(0));
        let mut commands = Vec::new();
        for _ in 0..3 {
            let command = Command::new(&ctx, || {});
            let raised2 = Arc::clone(&raised);
            command.on_can_execute_changed(move || {
                raised2.fetch_add(1, Ordering::SeqCst);
            });
            commands.push(command);
        }

        hops.store(0, Ordering::SeqCst);
        pool.sweep(&ctx);

        assert_eq!(hops.load(Ordering::SeqCst), 1);
        assert_eq!(raised.load(Ordering::SeqCst), 3);
    }
}
