use crate::error::ChatError;

/// What the caller should do after an event has been handled.
///
/// `Quit` replaces a process-wide exit: the event loop returns and `main`
/// decides how to end the process.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Lifecycle notifications raised by the transport.
///
/// Each role implements the hooks it cares about; the rest are no-ops.
/// A client never listens, so it leaves the listening hooks alone.
pub trait SessionHooks {
    /// Whatever identifies the other end of a connection for this role.
    type Peer;

    fn connection_established(&mut self, _peer: &Self::Peer) {}

    fn connection_closed(&mut self, _peer: &Self::Peer) {}

    /// The peer went away without a clean close.
    fn connection_exception(&mut self, _peer: &Self::Peer, _error: &ChatError) -> Flow {
        Flow::Continue
    }

    fn listening_started(&mut self) {}

    fn listening_stopped(&mut self) {}

    fn server_closed(&mut self) {}
}
