//! UI-thread marshalling.
//!
//! The runtime never touches a toolkit directly; it hands closures to a
//! [`UiDispatcher`] installed on the [`AppContext`](super::AppContext) at
//! startup. Hosts with a real UI loop install a [`ChannelDispatcher`] and
//! drain the paired [`UiTaskReceiver`] from that loop; headless hosts and
//! tests use [`InlineDispatcher`].

use std::future::Future;
use std::pin::Pin;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

pub type UiTask = Box<dyn FnOnce() + Send>;
pub type BoxFuture<T = ()> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

pub trait UiDispatcher: Send + Sync {
    /// Schedules `task` to run on the UI thread. One call is one hop.
    fn dispatch(&self, task: UiTask);
}

/// Runs every task immediately on the calling thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineDispatcher;

impl UiDispatcher for InlineDispatcher {
    fn dispatch(&self, task: UiTask) {
        task();
    }
}

/// Queues tasks for a UI loop to drain.
#[derive(Clone)]
pub struct ChannelDispatcher {
    tx: Sender<UiTask>,
}

pub struct UiTaskReceiver {
    rx: Receiver<UiTask>,
}

pub fn ui_channel() -> (ChannelDispatcher, UiTaskReceiver) {
    let (tx, rx) = mpsc::channel();
    (ChannelDispatcher { tx }, UiTaskReceiver { rx })
}

impl UiDispatcher for ChannelDispatcher {
    fn dispatch(&self, task: UiTask) {
        // Receiver gone means the UI loop has shut down; nothing left to
        // notify.
        if self.tx.send(task).is_err() {
            tracing::trace!("ui task dropped: dispatcher receiver closed");
        }
    }
}

impl UiTaskReceiver {
    pub fn try_recv(&mut self) -> Result<UiTask, TryRecvError> {
        self.rx.try_recv()
    }

    /// Runs every queued task, returning how many ran.
    pub fn drain(&mut self) -> usize {
        let mut ran = 0;
        while let Ok(task) = self.rx.try_recv() {
            task();
            ran += 1;
        }
        ran
    }
}

pub trait AsyncExecutor: Send + Sync {
    fn spawn(&self, task: BoxFuture);
}

/// [`AsyncExecutor`] backed by a tokio runtime handle.
#[derive(Clone)]
pub struct TokioExecutor {
    handle: tokio::runtime::Handle,
}

impl TokioExecutor {
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }

    /// Captures the runtime of the calling context.
    ///
    /// Panics outside a tokio runtime, same as `Handle::current`.
    pub fn current() -> Self {
        Self {
            handle: tokio::runtime::Handle::current(),
        }
    }
}

impl AsyncExecutor for TokioExecutor {
    fn spawn(&self, task: BoxFuture) {
        self.handle.spawn(task);
    }
}
