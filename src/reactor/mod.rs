//! Reactor core and event handling.
//!
//! The reactor owns the OS event multiplexer and everything registered
//! with it:
//! - one-shot I/O readiness watches,
//! - one-shot timers,
//! - the stop/break control flags of the loop driver.
//!
//! Unlike a free-running reactor thread, this one is polled inline: the
//! loop driver calls [`Reactor::run_once`] for each pass, and fired
//! watches come back as [`Wakeup`]s to be delivered by the scheduler in
//! the order the kernel reported readiness.

mod event;
mod timer;

pub(crate) mod poller;

use event::Event;
use poller::Poller;
use timer::TimerEntry;

pub(crate) use poller::common::Interest;

use crate::error::Error;
use crate::runtime::task::TaskId;
use crate::utils::{Arena, Key};

use std::collections::{BinaryHeap, HashMap};
use std::io;
use std::os::unix::io::RawFd;
use std::time::{Duration, Instant};

/// What a fired watch wakes up.
#[derive(Clone, Copy, Debug)]
pub(crate) enum Wakeup {
    /// Resume one task with the result of its wait.
    Task(TaskId),

    /// Drain the resolver's shared completion channel.
    Resolver,

    /// Request the loop to stop (armed by `request_stop_after`).
    Stop,
}

/// What a watch is attached to.
enum WatchKind {
    /// An (fd, interest) registration in the poller.
    Io(RawFd),

    /// A deadline in the timer heap.
    Timer,
}

/// A live registration correlating one fd or timer with a wake-up.
struct WatchEntry {
    kind: WatchKind,
    wakeup: Wakeup,
}

/// Watches sharing one registered descriptor.
///
/// Several tasks may wait on the same fd; the poller holds a single
/// registration per descriptor whose interest is the union of the
/// waiters', and a readiness report fans out to every watch it
/// satisfies.
#[derive(Default)]
struct FdWaiters {
    readers: Vec<Key>,
    writers: Vec<Key>,
}

impl FdWaiters {
    fn interest(&self) -> Interest {
        Interest {
            read: !self.readers.is_empty(),
            write: !self.writers.is_empty(),
        }
    }

    fn is_empty(&self) -> bool {
        self.readers.is_empty() && self.writers.is_empty()
    }
}

/// Outcome of one reactor pass.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum Tick {
    /// Events may still arrive; keep looping.
    Continue,

    /// Nothing is registered; polling would block forever.
    NoEvents,

    /// A stop request took effect.
    Stopped,
}

/// The reactor.
pub(crate) struct Reactor {
    /// Platform-specific poller.
    poller: Poller,

    /// Live watches, keyed by generation-checked arena keys.
    watches: Arena<WatchEntry>,

    /// Watch keys grouped by registered descriptor.
    ios: HashMap<RawFd, FdWaiters>,

    /// Min-heap of pending timers ordered by deadline.
    timers: BinaryHeap<TimerEntry>,

    /// Buffer reused to collect translated poller events.
    events: Vec<Event>,

    /// A stop request is pending.
    stop: bool,

    /// The next poll must not block, so freshly attached tasks start
    /// promptly.
    break_pending: bool,
}

impl Reactor {
    /// Creates the reactor and its multiplexer instance.
    pub(crate) fn new() -> Result<Self, Error> {
        let poller = Poller::new().map_err(Error::Init)?;

        Ok(Self {
            poller,
            watches: Arena::new(64),
            ios: HashMap::new(),
            timers: BinaryHeap::new(),
            events: Vec::with_capacity(64),
            stop: false,
            break_pending: false,
        })
    }

    /// The name of the underlying multiplexer facility.
    pub(crate) fn backend_name(&self) -> &'static str {
        self.poller.name()
    }

    /// Registers a one-shot readiness watch on `fd`.
    ///
    /// The returned key identifies the watch until it fires or is
    /// cancelled. A descriptor already watched by other tasks is not
    /// re-registered; its OS registration is widened to the union of
    /// interests.
    pub(crate) fn register_io(
        &mut self,
        fd: RawFd,
        interest: Interest,
        wakeup: Wakeup,
    ) -> io::Result<Key> {
        let key = self.watches.insert(WatchEntry {
            kind: WatchKind::Io(fd),
            wakeup,
        });

        let waiters = self.ios.entry(fd).or_default();
        let fresh = waiters.is_empty();
        let before = waiters.interest();
        if interest.read {
            waiters.readers.push(key);
        }
        if interest.write {
            waiters.writers.push(key);
        }
        let after = waiters.interest();

        let registered = if fresh {
            self.poller.register(fd, fd as u64, after)
        } else if before != after {
            self.poller.modify(fd, fd as u64, after)
        } else {
            Ok(())
        };

        if let Err(err) = registered {
            self.watches.remove(key);
            self.drop_io_waiter(fd, key);
            return Err(err);
        }

        log::trace!("registered io watch {:?} on fd {}", key, fd);
        Ok(key)
    }

    /// Detaches one watch key from its descriptor's waiter group,
    /// narrowing or dropping the OS registration accordingly.
    fn drop_io_waiter(&mut self, fd: RawFd, key: Key) {
        let remaining = match self.ios.get_mut(&fd) {
            Some(waiters) => {
                waiters.readers.retain(|k| *k != key);
                waiters.writers.retain(|k| *k != key);
                if waiters.is_empty() {
                    None
                } else {
                    Some(waiters.interest())
                }
            }
            None => return,
        };

        match remaining {
            None => {
                self.ios.remove(&fd);
                let _ = self.poller.deregister(fd);
            }
            Some(interest) => {
                let _ = self.poller.modify(fd, fd as u64, interest);
            }
        }
    }

    /// Registers a one-shot timer firing after `duration`.
    pub(crate) fn register_timer(&mut self, duration: Duration, wakeup: Wakeup) -> Key {
        let key = self.watches.insert(WatchEntry {
            kind: WatchKind::Timer,
            wakeup,
        });

        self.timers.push(TimerEntry {
            deadline: Instant::now() + duration,
            key,
        });

        log::trace!("registered timer watch {:?} for {:?}", key, duration);
        key
    }

    /// Cancels a watch.
    ///
    /// Generation-checked: cancelling a watch that already fired (or was
    /// never valid) is a no-op. Timer entries are dropped lazily when
    /// their deadline pops.
    pub(crate) fn cancel(&mut self, key: Key) {
        if let Some(entry) = self.watches.remove(key) {
            if let WatchKind::Io(fd) = entry.kind {
                self.drop_io_waiter(fd, key);
            }
        }
    }

    /// Requests the loop to stop. Idempotent.
    ///
    /// The request takes effect once the current pass has drained its
    /// already-fired wake-ups.
    pub(crate) fn request_stop(&mut self) {
        if !self.stop {
            log::debug!("stop requested");
            self.stop = true;
        }
    }

    /// Arms an internal timer that requests a stop after `duration`.
    pub(crate) fn request_stop_after(&mut self, duration: Duration) {
        self.register_timer(duration, Wakeup::Stop);
    }

    /// Makes the next poll non-blocking so the driver returns to starting
    /// newly attached tasks without waiting for an event.
    pub(crate) fn request_break(&mut self) {
        self.break_pending = true;
    }

    /// Whether any watch or timer is still registered.
    pub(crate) fn has_watches(&self) -> bool {
        !self.watches.is_empty() || !self.timers.is_empty()
    }

    /// Performs one poll step.
    ///
    /// Fired watches are removed and their wake-ups appended to `fired`
    /// in readiness-report order (timers after I/O within one pass; the
    /// relative order of simultaneously ready events is unspecified).
    /// Multiplexer failures are fatal and propagate to the caller.
    pub(crate) fn run_once(
        &mut self,
        blocking: bool,
        fired: &mut Vec<Wakeup>,
    ) -> Result<Tick, Error> {
        if self.stop {
            self.stop = false;
            self.break_pending = false;
            return Ok(Tick::Stopped);
        }

        if !self.has_watches() {
            self.break_pending = false;
            return Ok(Tick::NoEvents);
        }

        let timeout = if !blocking || self.break_pending {
            Some(Duration::ZERO)
        } else {
            self.timers
                .peek()
                .map(|t| t.deadline.saturating_duration_since(Instant::now()))
        };
        self.break_pending = false;

        self.events.clear();
        self.poller
            .poll(&mut self.events, timeout)
            .map_err(Error::Reactor)?;

        // Fired I/O watches, in kernel-report order. Readiness is a
        // condition, not a consumable: every watch the report satisfies
        // fires, not just the first.
        for event in self.events.drain(..) {
            let fd = event.token as RawFd;

            // The watches may have been cancelled between firing and now.
            let (due, remaining) = match self.ios.get_mut(&fd) {
                Some(waiters) => {
                    let mut due = Vec::new();
                    if event.readable {
                        due.append(&mut waiters.readers);
                    }
                    if event.writable {
                        due.append(&mut waiters.writers);
                    }

                    let remaining = if waiters.is_empty() {
                        None
                    } else {
                        Some(waiters.interest())
                    };
                    (due, remaining)
                }
                None => continue,
            };

            match remaining {
                None => {
                    self.ios.remove(&fd);
                    let _ = self.poller.deregister(fd);
                }
                Some(interest) => {
                    let _ = self.poller.modify(fd, fd as u64, interest);
                }
            }

            for key in due {
                let Some(entry) = self.watches.remove(key) else {
                    continue;
                };

                match entry.wakeup {
                    Wakeup::Stop => self.stop = true,
                    wakeup => fired.push(wakeup),
                }
            }
        }

        // Expired timers, skipping lazily cancelled entries.
        let now = Instant::now();
        while let Some(timer) = self.timers.peek() {
            if timer.deadline > now {
                break;
            }

            let key = self.timers.pop().map(|t| t.key);
            let Some(key) = key else { break };

            let Some(entry) = self.watches.remove(key) else {
                continue;
            };

            match entry.wakeup {
                Wakeup::Stop => self.stop = true,
                wakeup => fired.push(wakeup),
            }
        }

        if self.stop {
            self.stop = false;
            return Ok(Tick::Stopped);
        }

        Ok(Tick::Continue)
    }
}
