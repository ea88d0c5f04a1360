//! Task primitives: identity, lifecycle state, and the yield protocol.
//!
//! A task is a resumable unit of cooperative execution. Its continuation
//! is an explicit state machine implementing [`Fiber`]: each call to
//! `resume` runs the task until it either finishes ([`Step::Done`]) or
//! suspends by requesting a wait ([`Step::Wait`]). The value injected at
//! the next resumption ([`Resume`]) is exactly the result of the awaited
//! condition, so the suspend/resume-with-injected-value contract holds
//! even without stack switching.

use crate::error::Fault;
use crate::resolver::Resolution;
use crate::runtime::scope::Scope;
use crate::utils::Key;

use std::any::Any;
use std::os::unix::io::RawFd;
use std::time::Duration;

/// Identity of a task.
///
/// Generation-checked: once the task finishes, every outstanding copy of
/// its id goes stale and is detected on use, so a late wake-up or a
/// vanished waiter degrades to a safe no-op instead of touching a reused
/// slot.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct TaskId(pub(crate) Key);

/// Lifecycle state of a task. A task occupies exactly one state at any
/// time.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum State {
    /// Created but not yet run; starts on the next `start_all_new` pass.
    NotStarted,

    /// Currently executing. At most one task is `Running` at any time.
    Running,

    /// Suspended on a wait request.
    Waiting,

    /// Returned, faulted, or was discarded; its slot is reclaimed.
    Finished,
}

/// Positional values passed to a task entry and returned from it.
///
/// Returned values become the payload delivered to a waiter, in order,
/// exactly once.
pub type Values = Vec<Box<dyn Any>>;

/// A wait request yielded by a task to request suspension.
#[derive(Debug)]
pub enum Wait {
    /// Suspend until the descriptor is writable.
    Write(RawFd),

    /// Suspend until the descriptor is readable.
    Read(RawFd),

    /// Suspend until a name resolution completes.
    Resolve {
        /// Host name or address literal to resolve.
        host: String,

        /// Optional service name or port number.
        port: Option<String>,
    },

    /// Suspend for a duration.
    Timeout(Duration),

    /// Suspend until the child created by
    /// [`Scope::attach_wait`](crate::Scope::attach_wait) finishes.
    ///
    /// Only `attach_wait` produces a valid join wait; yielding a
    /// fabricated one is a usage error fatal to the yielding task.
    Join(TaskId),
}

/// The value a task is resumed with.
pub enum Resume {
    /// First run: the positional arguments supplied to `attach` or
    /// `attach_wait`.
    Start(Values),

    /// A read, write, or timeout wait was satisfied. Carries nothing.
    Ready,

    /// The joined child finished; carries its return values, in order.
    Joined(Values),

    /// The name resolution completed, successfully or not. A failed
    /// lookup is an ordinary value here, never a fault.
    Resolved(Result<Resolution, String>),
}

/// Outcome of one resumption.
pub enum Step {
    /// The task suspends on a wait request.
    Wait(Wait),

    /// The task finished and returns these values.
    Done(Values),
}

/// A resumable cooperative task body.
///
/// Implemented directly for state-machine structs, and via the blanket
/// impl for `FnMut` closures, so simple tasks can be written inline:
///
/// ```rust,ignore
/// rt.attach(
///     |_scope: &mut Scope<'_>, _input: Resume| -> Result<Step, Fault> {
///         Ok(Step::Done(Vec::new()))
///     },
///     Vec::new(),
/// );
/// ```
pub trait Fiber {
    /// Runs the task until its next suspension point or completion.
    ///
    /// An `Err` is a fault in the task's own logic; it propagates to the
    /// caller of `run()` unless fault isolation is configured.
    fn resume(&mut self, scope: &mut Scope<'_>, input: Resume) -> Result<Step, Fault>;
}

impl<F> Fiber for F
where
    F: FnMut(&mut Scope<'_>, Resume) -> Result<Step, Fault>,
{
    fn resume(&mut self, scope: &mut Scope<'_>, input: Resume) -> Result<Step, Fault> {
        self(scope, input)
    }
}

/// A task slot in the scheduler's registry.
pub(crate) struct Task {
    /// Current lifecycle state.
    pub(crate) state: State,

    /// The captured continuation. Taken out of the slot while the task
    /// runs, so the scheduler tables stay borrowable from task context.
    pub(crate) fiber: Option<Box<dyn Fiber>>,

    /// Arguments for the first run.
    pub(crate) start: Option<Values>,

    /// The task waiting on this one, if any. Never extends this task's
    /// lifetime; a stale waiter id is skipped at delivery.
    pub(crate) waiter: Option<TaskId>,

    /// The outstanding reactor watch for the current wait, if any.
    /// At most one exists per unresolved wait request.
    pub(crate) watch: Option<Key>,

    /// Child recorded by `attach_wait`, consumed when the matching join
    /// wait is dispatched.
    pub(crate) pending_join: Option<TaskId>,

    /// Whether the current wait is a join. A child's finish resumes its
    /// waiter only while this is set; a waiter suspended on anything
    /// else is left alone.
    pub(crate) joining: bool,
}

impl Task {
    /// Creates a slot in `NotStarted` holding the entry and its
    /// arguments.
    pub(crate) fn new(fiber: Box<dyn Fiber>, args: Values) -> Self {
        Self {
            state: State::NotStarted,
            fiber: Some(fiber),
            start: Some(args),
            waiter: None,
            watch: None,
            pending_join: None,
            joining: false,
        }
    }
}
