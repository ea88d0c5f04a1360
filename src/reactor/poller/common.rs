/// Readiness interests for a registered file descriptor.
#[derive(Clone, Copy, PartialEq, Eq)]
pub(crate) struct Interest {
    pub(crate) read: bool,
    pub(crate) write: bool,
}

impl Interest {
    /// Interest in read readiness only.
    pub(crate) const READ: Self = Self {
        read: true,
        write: false,
    };

    /// Interest in write readiness only.
    pub(crate) const WRITE: Self = Self {
        read: false,
        write: true,
    };
}
