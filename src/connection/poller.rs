//! Readiness Poller
//!
//! A bounded wait on a single socket descriptor, built on `poll(2)`.

use std::io;
use std::os::unix::io::RawFd;
use std::time::{Duration, Instant};

/// Which kind of readiness to wait for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// The socket can accept a write (also: a pending connect has finished).
    Send,
    /// The socket has data to read, or the peer closed.
    Recv,
}

impl Direction {
    fn events(self) -> libc::c_short {
        match self {
            Direction::Send => libc::POLLOUT,
            Direction::Recv => libc::POLLIN,
        }
    }
}

/// Waits up to `timeout` for `fd` to become ready in `direction`.
///
/// Error and hang-up conditions report as ready so that the following
/// read, write or `SO_ERROR` query observes them.
pub fn poll_ready(fd: RawFd, direction: Direction, timeout: Duration) -> io::Result<bool> {
    let deadline = Instant::now().checked_add(timeout);
    let mut pfd = libc::pollfd {
        fd,
        events: direction.events(),
        revents: 0,
    };

    loop {
        let remaining = match deadline {
            Some(deadline) => deadline.saturating_duration_since(Instant::now()),
            None => timeout,
        };
        let r = unsafe { libc::poll(&mut pfd, 1, timeout_millis(remaining)) };

        if r < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                continue;
            }
            return Err(err);
        }
        if r == 0 {
            return Ok(false);
        }

        if pfd.revents & libc::POLLNVAL != 0 {
            return Err(io::Error::from_raw_os_error(libc::EBADF));
        }
        let ready = direction.events() | libc::POLLERR | libc::POLLHUP;
        return Ok(pfd.revents & ready != 0);
    }
}

/// Milliseconds for `poll(2)`, rounded up so short waits do not become
/// busy polls.
fn timeout_millis(timeout: Duration) -> libc::c_int {
    let mut ms = timeout.as_millis();
    if timeout.subsec_nanos() % 1_000_000 != 0 {
        ms += 1;
    }
    ms.min(libc::c_int::MAX as u128) as libc::c_int
}
