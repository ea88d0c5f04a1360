//! The wait dispatcher.
//!
//! Translates a task's yielded wait request into the registration that
//! will eventually resume it: a reactor watch for read/write/timeout
//! waits, a resolver submission for resolve waits, and nothing at all
//! for join waits — those are resumed by `finish_thread` when the child
//! returns.
//!
//! A malformed request is a defect in the yielding task: the resulting
//! `Protocol`/`Usage` error is fatal to that task only, and tasks
//! waiting on valid requests are unaffected.

use crate::error::Error;
use crate::reactor::{Interest, Reactor, Wakeup};
use crate::resolver::Resolver;
use crate::runtime::core::Scheduler;
use crate::runtime::task::{TaskId, Wait};

use std::os::unix::io::RawFd;

/// Installs the registration for one yielded wait request.
///
/// The caller has already parked the task in `Waiting`; on success the
/// task's single outstanding watch is recorded in its slot.
pub(crate) fn dispatch(
    sched: &mut Scheduler,
    reactor: &mut Reactor,
    resolver: &mut Resolver,
    id: TaskId,
    wait: Wait,
) -> Result<(), Error> {
    match wait {
        Wait::Read(fd) => watch_io(sched, reactor, id, fd, Interest::READ),
        Wait::Write(fd) => watch_io(sched, reactor, id, fd, Interest::WRITE),
        Wait::Timeout(duration) => {
            let key = reactor.register_timer(duration, Wakeup::Task(id));
            sched.set_watch(id, key);
            Ok(())
        }
        Wait::Resolve { host, port } => resolver.submit(reactor, &host, port.as_deref(), id),
        Wait::Join(child) => {
            // Only the join recorded by attach_wait in this same
            // resumption is valid; resumption comes from the child's
            // finish, so no watch is installed.
            if sched.take_pending_join(id) == Some(child) {
                sched.set_join_wait(id);
                Ok(())
            } else {
                Err(Error::Usage(
                    "join wait must come from attach_wait in the yielding task".into(),
                ))
            }
        }
    }
}

/// Registers a one-shot readiness watch resuming `id`.
fn watch_io(
    sched: &mut Scheduler,
    reactor: &mut Reactor,
    id: TaskId,
    fd: RawFd,
    interest: Interest,
) -> Result<(), Error> {
    if fd < 0 {
        return Err(Error::Protocol(format!("cannot wait on negative fd {fd}")));
    }

    // The fd came from the task, so a refused registration is its
    // defect, not a reactor fault.
    let key = reactor
        .register_io(fd, interest, Wakeup::Task(id))
        .map_err(|err| Error::Protocol(format!("cannot watch fd {fd}: {err}")))?;
    sched.set_watch(id, key);

    Ok(())
}
