//! Asynchronous name resolution bridge.
//!
//! The OS resolver is always delegated to; this module only bridges its
//! blocking interface onto the single scheduling thread. A small worker
//! pool performs `getaddrinfo` calls and posts completions back through:
//! - one mpsc channel carrying the results, and
//! - one shared eventfd that wakes the reactor.
//!
//! The eventfd is registered with the reactor if and only if at least one
//! query is in flight, and every wake-up drains *all* queued completions,
//! never just one — eventfd counters coalesce, and draining one result
//! per wake would starve the rest.
//!
//! In-flight queries are not cancelled: a worker finishes in the
//! background and its completion is dropped harmlessly if the owning task
//! is gone by then.

use crate::error::Error;
use crate::reactor::{Interest, Reactor, Wakeup};
use crate::runtime::task::TaskId;
use crate::utils::Key;

use std::ffi::{CStr, CString};
use std::io;
use std::os::unix::io::RawFd;
use std::sync::mpsc::{Receiver, Sender, channel};
use std::sync::{Arc, Mutex};
use std::thread;

/// Normalized output of one successful name lookup.
///
/// Field values are the raw `addrinfo` integers for the first result the
/// resolver returned, plus the raw socket address bytes, ready to hand to
/// `socket(2)`/`connect(2)` without re-interpretation.
#[derive(Clone, Debug)]
pub struct Resolution {
    /// Address family (`AF_INET`, `AF_INET6`, ...).
    pub family: i32,

    /// Socket type (`SOCK_STREAM`, `SOCK_DGRAM`, ...).
    pub socktype: i32,

    /// Protocol number.
    pub protocol: i32,

    /// Raw `sockaddr` bytes.
    pub addr: Vec<u8>,
}

/// One completed query, ready to be delivered to its task.
pub(crate) struct Completion {
    /// The task that yielded the resolve wait.
    pub(crate) task: TaskId,

    /// The lookup outcome; the error string is the OS resolver's own
    /// wording and is delivered as an ordinary value, never as a fault.
    pub(crate) result: Result<Resolution, String>,
}

/// A query handed to the worker pool.
struct Job {
    host: CString,
    service: Option<CString>,
    task: TaskId,
}

/// The shared completion eventfd.
///
/// Workers hold clones of the `Arc` so the descriptor outlives the
/// resolver if lookups are still in flight when the runtime goes away.
struct NotifyFd(RawFd);

// The wrapped value is a plain descriptor; writes from worker threads and
// reads from the scheduling thread are independent syscalls.
unsafe impl Send for NotifyFd {}
unsafe impl Sync for NotifyFd {}

impl NotifyFd {
    fn new() -> io::Result<Self> {
        let fd = unsafe { libc::eventfd(0, libc::EFD_NONBLOCK | libc::EFD_CLOEXEC) };
        if fd < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(Self(fd))
    }

    fn fd(&self) -> RawFd {
        self.0
    }

    /// Bumps the eventfd counter, waking a blocked poll.
    fn signal(&self) {
        let buf: u64 = 1;
        unsafe {
            libc::write(self.0, (&raw const buf).cast(), 8);
        }
    }

    /// Consumes the accumulated counter.
    fn drain(&self) {
        let mut buf: u64 = 0;
        unsafe {
            libc::read(self.0, (&raw mut buf).cast(), 8);
        }
    }
}

impl Drop for NotifyFd {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.0);
        }
    }
}

/// The resolver bridge owned by the runtime.
pub(crate) struct Resolver {
    /// Sender side of the job channel; dropping it retires the workers.
    jobs: Sender<Job>,

    /// Receiver side of the shared completion channel.
    results: Receiver<Completion>,

    /// Shared completion eventfd.
    notify: Arc<NotifyFd>,

    /// Number of in-flight queries.
    pending: usize,

    /// The shared completion watch; `Some` iff `pending > 0`.
    watch: Option<Key>,
}

impl Resolver {
    /// Spawns the worker pool and creates the completion channel.
    pub(crate) fn new(workers: usize) -> Result<Self, Error> {
        let (jobs, jobs_rx) = channel::<Job>();
        let jobs_rx = Arc::new(Mutex::new(jobs_rx));
        let (results_tx, results) = channel::<Completion>();
        let notify = Arc::new(NotifyFd::new().map_err(Error::Init)?);

        for i in 0..workers {
            let jobs_rx = Arc::clone(&jobs_rx);
            let results_tx = results_tx.clone();
            let notify = Arc::clone(&notify);

            thread::Builder::new()
                .name(format!("treadle-resolver-{i}"))
                .spawn(move || worker_loop(jobs_rx, results_tx, notify))
                .map_err(Error::Init)?;
        }

        Ok(Self {
            jobs,
            results,
            notify,
            pending: 0,
            watch: None,
        })
    }

    /// Number of in-flight queries.
    pub(crate) fn pending(&self) -> usize {
        self.pending
    }

    /// Submits one query on behalf of `task`.
    ///
    /// Submission failure is synchronous and returned immediately; once
    /// this returns `Ok`, the task is guaranteed exactly one completion.
    /// Registers the shared completion watch on the 0 → 1 transition.
    pub(crate) fn submit(
        &mut self,
        reactor: &mut Reactor,
        host: &str,
        port: Option<&str>,
        task: TaskId,
    ) -> Result<(), Error> {
        let host = CString::new(host)
            .map_err(|_| Error::Protocol("resolve host contains an interior NUL byte".into()))?;
        let service = port
            .map(CString::new)
            .transpose()
            .map_err(|_| Error::Protocol("resolve port contains an interior NUL byte".into()))?;

        self.jobs
            .send(Job {
                host,
                service,
                task,
            })
            .map_err(|_| Error::Reactor(io::Error::other("resolver worker pool is gone")))?;

        self.pending += 1;
        if self.watch.is_none() {
            let key = reactor
                .register_io(self.notify.fd(), Interest::READ, Wakeup::Resolver)
                .map_err(Error::Reactor)?;
            self.watch = Some(key);
        }

        log::debug!("resolve submitted for {:?}, {} pending", task, self.pending);
        Ok(())
    }

    /// Handles one firing of the shared completion watch.
    ///
    /// Drains the eventfd counter and every queued completion, then
    /// re-registers the watch only if queries remain in flight.
    pub(crate) fn on_ready(&mut self, reactor: &mut Reactor) -> Result<Vec<Completion>, Error> {
        // The watch is one-shot; the reactor already dropped it.
        self.watch = None;
        self.notify.drain();

        let mut completed = Vec::new();
        while let Ok(completion) = self.results.try_recv() {
            self.pending -= 1;
            completed.push(completion);
        }

        if self.pending > 0 {
            let key = reactor
                .register_io(self.notify.fd(), Interest::READ, Wakeup::Resolver)
                .map_err(Error::Reactor)?;
            self.watch = Some(key);
        }

        log::debug!(
            "drained {} resolutions, {} still pending",
            completed.len(),
            self.pending
        );
        Ok(completed)
    }
}

/// Body of one resolver worker thread.
///
/// Exits when the job channel closes, i.e. when the runtime is dropped;
/// a lookup already underway still completes and signals in the
/// background.
fn worker_loop(jobs: Arc<Mutex<Receiver<Job>>>, results: Sender<Completion>, notify: Arc<NotifyFd>) {
    loop {
        let job = {
            let Ok(guard) = jobs.lock() else { break };
            guard.recv()
        };
        let Ok(job) = job else { break };

        let result = lookup(&job.host, job.service.as_deref());

        if results
            .send(Completion {
                task: job.task,
                result,
            })
            .is_err()
        {
            break;
        }
        notify.signal();
    }
}

/// One blocking `getaddrinfo` call, normalized to a [`Resolution`].
fn lookup(host: &CStr, service: Option<&CStr>) -> Result<Resolution, String> {
    // Safety: addrinfo is a plain C struct; all-zeroes is its documented
    // "no constraints" state before the fields below are set.
    let mut hints: libc::addrinfo = unsafe { std::mem::zeroed() };
    hints.ai_family = libc::AF_UNSPEC;
    hints.ai_flags = libc::AI_V4MAPPED | libc::AI_ADDRCONFIG;

    let mut list: *mut libc::addrinfo = std::ptr::null_mut();
    let rc = unsafe {
        libc::getaddrinfo(
            host.as_ptr(),
            service.map_or(std::ptr::null(), CStr::as_ptr),
            &hints,
            &mut list,
        )
    };

    if rc != 0 {
        return Err(gai_error(rc));
    }
    if list.is_null() {
        return Err("name resolved to no addresses".into());
    }

    // First result only; the remaining entries are freed with the list.
    // Safety: getaddrinfo returned 0 with a non-null list, so the head
    // entry and its ai_addr are valid until freeaddrinfo.
    let resolution = unsafe {
        let info = &*list;
        let addr =
            std::slice::from_raw_parts(info.ai_addr.cast::<u8>(), info.ai_addrlen as usize)
                .to_vec();
        Resolution {
            family: info.ai_family,
            socktype: info.ai_socktype,
            protocol: info.ai_protocol,
            addr,
        }
    };

    unsafe {
        libc::freeaddrinfo(list);
    }

    Ok(resolution)
}

/// The OS resolver's own wording for a `getaddrinfo` failure.
fn gai_error(rc: i32) -> String {
    // Safety: gai_strerror returns a pointer to a static message table.
    unsafe { CStr::from_ptr(libc::gai_strerror(rc)) }
        .to_string_lossy()
        .into_owned()
}
