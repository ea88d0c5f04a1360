//! The operation surface a task sees while it runs.
//!
//! A [`Scope`] is handed to [`Fiber::resume`](crate::Fiber::resume) and
//! borrows the scheduler tables for exactly that resumption, which is
//! what makes the context-restricted operations of the runtime —
//! `attach_wait`, `resolve` — impossible to reach from outside a task.
//!
//! Re-entrancy rule: attaching from task context only marks the child
//! not-started and asks the reactor to break the next poll; the child is
//! never run synchronously, so chained attachments cannot grow the call
//! stack.

use crate::reactor::Reactor;
use crate::runtime::core::Scheduler;
use crate::runtime::task::{Fiber, TaskId, Values, Wait};

use std::time::Duration;

/// The running task's window into the runtime.
pub struct Scope<'a> {
    pub(crate) sched: &'a mut Scheduler,
    pub(crate) reactor: &'a mut Reactor,
    pub(crate) current: TaskId,
}

impl Scope<'_> {
    /// Identity of the running task.
    pub fn task_id(&self) -> TaskId {
        self.current
    }

    /// Attaches a sibling task.
    ///
    /// The child starts on the loop's next start pass, never within the
    /// current resumption.
    pub fn attach(&mut self, fiber: impl Fiber + 'static, args: Values) -> TaskId {
        let id = self.sched.insert(Box::new(fiber), args);
        self.reactor.request_break();
        id
    }

    /// Attaches a child task and prepares a join on it.
    ///
    /// Returns the [`Wait::Join`] the caller must yield as this
    /// resumption's step; once the child finishes, the caller resumes
    /// with [`Resume::Joined`](crate::Resume::Joined) carrying the
    /// child's return values, in order, exactly once.
    pub fn attach_wait(&mut self, fiber: impl Fiber + 'static, args: Values) -> Wait {
        let child = self.attach(fiber, args);
        self.sched.set_waiter(child, self.current);
        self.sched.set_pending_join(self.current, child);
        Wait::Join(child)
    }

    /// Builds a name-resolution wait for the caller to yield.
    ///
    /// The task resumes with
    /// [`Resume::Resolved`](crate::Resume::Resolved) once the OS
    /// resolver answers; a failed lookup is delivered as an ordinary
    /// `Err` value.
    pub fn resolve(&self, host: impl Into<String>, port: Option<&str>) -> Wait {
        Wait::Resolve {
            host: host.into(),
            port: port.map(str::to_owned),
        }
    }

    /// Requests the loop to stop. Idempotent.
    pub fn stop(&mut self) {
        self.reactor.request_stop();
    }

    /// Requests the loop to stop after `duration`.
    pub fn stop_after(&mut self, duration: Duration) {
        self.reactor.request_stop_after(duration);
    }
}
