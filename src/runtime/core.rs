//! The scheduler and the loop driver.
//!
//! The [`Runtime`] owns the three collaborating components — reactor,
//! resolver, and the task registry — and implements the task lifecycle
//! protocol on top of them:
//!
//! 1. `attach` marks a task not-started and breaks the current poll,
//! 2. `start_all_new` runs a snapshot of not-started tasks to their
//!    first yield,
//! 3. a yielded wait request is dispatched into a watch or a query,
//! 4. a fired watch resumes exactly one task with its result,
//! 5. a finished task hands its return values to its waiter, if any.
//!
//! Everything happens on one thread; a context switch occurs only at an
//! explicit yield point or at task completion, so the registry needs no
//! locking.

use crate::error::Error;
use crate::reactor::{Reactor, Tick, Wakeup};
use crate::resolver::Resolver;
use crate::runtime::builder::RuntimeBuilder;
use crate::runtime::dispatch;
use crate::runtime::scope::Scope;
use crate::runtime::task::{Fiber, Resume, State, Step, Task, TaskId, Values};
use crate::utils::{Arena, Key};

use std::time::Duration;

/// The task registry: the arena of live tasks plus the not-started set.
///
/// Entries disappear exactly when their task finishes or is discarded;
/// waiter relations reference tasks by generation-checked id and never
/// extend a task's lifetime.
pub(crate) struct Scheduler {
    /// All live tasks.
    pub(crate) tasks: Arena<Task>,

    /// Tasks attached but not yet run, in attach order.
    pub(crate) not_started: Vec<TaskId>,
}

impl Scheduler {
    fn new() -> Self {
        Self {
            tasks: Arena::new(64),
            not_started: Vec::new(),
        }
    }

    /// Creates a task in `NotStarted` and records it for the next start
    /// pass.
    pub(crate) fn insert(&mut self, fiber: Box<dyn Fiber>, args: Values) -> TaskId {
        let id = TaskId(self.tasks.insert(Task::new(fiber, args)));
        self.not_started.push(id);
        log::debug!("attached task {:?}", id);
        id
    }

    /// Records that `waiter` joins on `child`.
    pub(crate) fn set_waiter(&mut self, child: TaskId, waiter: TaskId) {
        if let Some(slot) = self.tasks.get_mut(child.0) {
            slot.waiter = Some(waiter);
        }
    }

    /// Records the child a running task is about to yield a join wait
    /// for.
    pub(crate) fn set_pending_join(&mut self, id: TaskId, child: TaskId) {
        if let Some(slot) = self.tasks.get_mut(id.0) {
            slot.pending_join = Some(child);
        }
    }

    /// Consumes the recorded pending join of `id`, if any.
    pub(crate) fn take_pending_join(&mut self, id: TaskId) -> Option<TaskId> {
        self.tasks.get_mut(id.0).and_then(|slot| slot.pending_join.take())
    }

    /// Marks `id` as suspended on a join wait.
    pub(crate) fn set_join_wait(&mut self, id: TaskId) {
        if let Some(slot) = self.tasks.get_mut(id.0) {
            slot.joining = true;
        }
    }

    /// Records the outstanding watch of a waiting task.
    pub(crate) fn set_watch(&mut self, id: TaskId, watch: Key) {
        if let Some(slot) = self.tasks.get_mut(id.0) {
            slot.watch = Some(watch);
        }
    }
}

/// A single-threaded cooperative runtime instance.
///
/// Each instance owns one reactor, one resolver bridge, and one task
/// registry; multiple independent runtimes may coexist in a process.
pub struct Runtime {
    reactor: Reactor,
    resolver: Resolver,
    sched: Scheduler,
    isolate_faults: bool,
}

impl Runtime {
    /// Creates a runtime with default configuration.
    pub fn new() -> Result<Self, Error> {
        RuntimeBuilder::new().build()
    }

    pub(crate) fn with_options(
        resolver_threads: usize,
        isolate_faults: bool,
    ) -> Result<Self, Error> {
        Ok(Self {
            reactor: Reactor::new()?,
            resolver: Resolver::new(resolver_threads)?,
            sched: Scheduler::new(),
            isolate_faults,
        })
    }

    /// Attaches a task from the embedding application.
    ///
    /// The task starts on the loop's next start pass; attaching breaks
    /// any current poll so that pass comes promptly.
    pub fn attach(&mut self, fiber: impl Fiber + 'static, args: Values) -> TaskId {
        let id = self.sched.insert(Box::new(fiber), args);
        self.reactor.request_break();
        id
    }

    /// Current lifecycle state of a task.
    ///
    /// A stale id means the task finished and was reclaimed, so it
    /// reports [`State::Finished`].
    pub fn state(&self, id: TaskId) -> State {
        self.sched
            .tasks
            .get(id.0)
            .map_or(State::Finished, |slot| slot.state)
    }

    /// Number of live tasks, counting not-started and waiting ones.
    pub fn task_count(&self) -> usize {
        self.sched.tasks.len()
    }

    /// Number of name resolutions currently in flight.
    pub fn pending_resolutions(&self) -> usize {
        self.resolver.pending()
    }

    /// The name of the underlying event multiplexer facility.
    pub fn backend_name(&self) -> &'static str {
        self.reactor.backend_name()
    }

    /// Requests the loop to stop. Idempotent.
    pub fn stop(&mut self) {
        self.reactor.request_stop();
    }

    /// Requests the loop to stop after `duration`.
    pub fn stop_after(&mut self, duration: Duration) {
        self.reactor.request_stop_after(duration);
    }

    /// Drives the loop until stop is requested or no work remains.
    ///
    /// Each pass starts all newly attached tasks, then polls the reactor
    /// and delivers the fired wake-ups in readiness-report order. A
    /// multiplexer failure or an unisolated task fault aborts the loop
    /// and propagates.
    pub fn run(&mut self) -> Result<(), Error> {
        let mut fired = Vec::new();

        loop {
            self.start_all_new()?;

            let tick = self.reactor.run_once(true, &mut fired)?;

            // A stop request still lets already-fired wake-ups drain.
            for wakeup in fired.drain(..) {
                self.deliver(wakeup)?;
            }

            match tick {
                Tick::Stopped => break,
                Tick::NoEvents => {
                    if self.sched.not_started.is_empty() {
                        break;
                    }
                }
                Tick::Continue => {}
            }
        }

        Ok(())
    }

    /// Performs one non-blocking pass of the loop.
    ///
    /// For embeddings interleaving this runtime with their own control
    /// loop. Returns whether runnable work remains.
    pub fn poll_once(&mut self) -> Result<bool, Error> {
        self.start_all_new()?;

        let mut fired = Vec::new();
        let tick = self.reactor.run_once(false, &mut fired)?;

        for wakeup in fired.drain(..) {
            self.deliver(wakeup)?;
        }

        Ok(match tick {
            Tick::Stopped => false,
            Tick::NoEvents | Tick::Continue => {
                self.reactor.has_watches() || !self.sched.not_started.is_empty()
            }
        })
    }

    /// Runs a snapshot of the not-started set to their first yield.
    ///
    /// Tasks attached during this pass go to the next snapshot; they are
    /// never started within the current one.
    fn start_all_new(&mut self) -> Result<(), Error> {
        let batch = std::mem::take(&mut self.sched.not_started);

        for id in batch {
            let args = match self.sched.tasks.get_mut(id.0) {
                Some(slot) => slot.start.take().unwrap_or_default(),
                None => continue,
            };
            self.run_thread(id, Resume::Start(args))?;
        }

        Ok(())
    }

    /// Routes one fired wake-up back into the scheduler.
    fn deliver(&mut self, wakeup: Wakeup) -> Result<(), Error> {
        match wakeup {
            Wakeup::Task(id) => self.run_thread(id, Resume::Ready),
            Wakeup::Resolver => {
                let completed = self.resolver.on_ready(&mut self.reactor)?;
                for completion in completed {
                    self.run_thread(completion.task, Resume::Resolved(completion.result))?;
                }
                Ok(())
            }
            // Stop timers are folded into the tick by the reactor.
            Wakeup::Stop => Ok(()),
        }
    }

    /// Resumes a task with the result of its awaited condition.
    ///
    /// A stale id is a safe no-op: the task finished before this wake-up
    /// arrived.
    fn run_thread(&mut self, id: TaskId, input: Resume) -> Result<(), Error> {
        let Some(slot) = self.sched.tasks.get_mut(id.0) else {
            log::trace!("wake-up for stale task {:?} dropped", id);
            return Ok(());
        };
        let Some(mut fiber) = slot.fiber.take() else {
            return Ok(());
        };
        slot.state = State::Running;
        slot.watch = None;
        slot.joining = false;
        // A join recorded by attach_wait is only redeemable within the
        // resumption that recorded it.
        slot.pending_join = None;

        let step = {
            let Self {
                sched, reactor, ..
            } = self;
            let mut scope = Scope {
                sched,
                reactor,
                current: id,
            };
            fiber.resume(&mut scope, input)
        };

        match step {
            Ok(Step::Done(values)) => self.finish_thread(id, values),
            Ok(Step::Wait(wait)) => {
                if let Some(slot) = self.sched.tasks.get_mut(id.0) {
                    slot.fiber = Some(fiber);
                    slot.state = State::Waiting;
                }

                match dispatch::dispatch(
                    &mut self.sched,
                    &mut self.reactor,
                    &mut self.resolver,
                    id,
                    wait,
                ) {
                    Ok(()) => Ok(()),
                    Err(err @ (Error::Protocol(_) | Error::Usage(_))) => {
                        log::error!("discarding task {:?}: {}", id, err);
                        self.discard(id);
                        Ok(())
                    }
                    Err(err) => Err(err),
                }
            }
            Err(fault) => {
                self.discard(id);
                if self.isolate_faults {
                    log::error!("isolated fault in task {:?}: {}", id, fault);
                    Ok(())
                } else {
                    Err(Error::Task(fault))
                }
            }
        }
    }

    /// Retires a finished task and resolves its waiter.
    ///
    /// The waiter, when present and still in its join wait, is resumed
    /// with the finished task's return values — in order, exactly once.
    fn finish_thread(&mut self, id: TaskId, values: Values) -> Result<(), Error> {
        let Some(slot) = self.sched.tasks.remove(id.0) else {
            return Ok(());
        };
        log::debug!("task {:?} finished", id);

        if let Some(waiter) = slot.waiter {
            match self.sched.tasks.get(waiter.0) {
                Some(w) if w.state == State::Waiting && w.joining => {
                    return self.run_thread(waiter, Resume::Joined(values));
                }
                _ => log::debug!("waiter of {:?} is gone or not in a join wait", id),
            }
        }

        Ok(())
    }

    /// Removes a task that can no longer make progress, cancelling its
    /// outstanding watch. Its waiter, if any, is left to drain out with
    /// the loop.
    fn discard(&mut self, id: TaskId) {
        if let Some(slot) = self.sched.tasks.remove(id.0) {
            if let Some(watch) = slot.watch {
                self.reactor.cancel(watch);
            }
        }
    }
}
