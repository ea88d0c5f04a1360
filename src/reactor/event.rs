/// An I/O event reported by the poller.
///
/// An `Event` carries readiness information for one registered file
/// descriptor. It is produced by the poller and consumed by the reactor,
/// which resolves the token back to the watch that requested it.
pub(crate) struct Event {
    /// Token the descriptor was registered under; carries the fd itself,
    /// since all watches on one descriptor share a single registration.
    pub(crate) token: u64,

    /// The file descriptor is readable.
    pub(crate) readable: bool,

    /// The file descriptor is writable.
    pub(crate) writable: bool,
}
