//! Edge-triggered readiness wait used by the interrupt detector.
//!
//! An epoll instance watches the interrupt line's value file together with
//! the read end of a pipe. Writing to the pipe through [`StopTrigger`] wakes
//! the waiter so the detector thread can be stopped while it is blocked.

use log::trace;
use std::io;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};

const EDGE_TOKEN: u64 = 1;
const STOP_TOKEN: u64 = 2;

/// Why [`EdgeWaiter::wait`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Wakeup {
    /// The watched descriptor signalled an edge.
    Edge,
    /// [`StopTrigger::trigger`] was called.
    Stop,
}

#[derive(Debug)]
pub(crate) struct EdgeWaiter {
    epoll: OwnedFd,
    // Kept open for as long as it is registered.
    _source: OwnedFd,
    _stop_rx: OwnedFd,
}

/// Wakes the matching [`EdgeWaiter`] for good.
#[derive(Debug)]
pub(crate) struct StopTrigger {
    stop_tx: OwnedFd,
}

fn cvt(ret: libc::c_int) -> io::Result<libc::c_int> {
    if ret < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(ret)
    }
}

fn epoll_add(epoll: RawFd, fd: RawFd, events: u32, token: u64) -> io::Result<()> {
    let mut event = libc::epoll_event { events, u64: token };
    // SAFETY: both descriptors are open and `event` is a valid epoll_event.
    cvt(unsafe { libc::epoll_ctl(epoll, libc::EPOLL_CTL_ADD, fd, &mut event) })?;
    Ok(())
}

/// Builds a waiter on `source` (normally the sysfs `value` file) and its stop trigger.
pub(crate) fn edge_waiter(source: OwnedFd) -> io::Result<(EdgeWaiter, StopTrigger)> {
    // SAFETY: plain syscall, the result is checked before use.
    let epoll_fd = cvt(unsafe { libc::epoll_create1(libc::EPOLL_CLOEXEC) })?;
    // SAFETY: epoll_fd was just created and is owned by nobody else.
    let epoll = unsafe { OwnedFd::from_raw_fd(epoll_fd) };

    let mut fds = [0 as libc::c_int; 2];
    // SAFETY: `fds` has room for the two descriptors pipe2 writes.
    cvt(unsafe { libc::pipe2(fds.as_mut_ptr(), libc::O_CLOEXEC) })?;
    // SAFETY: pipe2 succeeded, so both descriptors are open and ours.
    let (stop_rx, stop_tx) =
        unsafe { (OwnedFd::from_raw_fd(fds[0]), OwnedFd::from_raw_fd(fds[1])) };

    let edge_events = (libc::EPOLLIN | libc::EPOLLPRI | libc::EPOLLERR | libc::EPOLLET) as u32;
    epoll_add(epoll.as_raw_fd(), source.as_raw_fd(), edge_events, EDGE_TOKEN)?;
    epoll_add(
        epoll.as_raw_fd(),
        stop_rx.as_raw_fd(),
        libc::EPOLLIN as u32,
        STOP_TOKEN,
    )?;

    Ok((
        EdgeWaiter {
            epoll,
            _source: source,
            _stop_rx: stop_rx,
        },
        StopTrigger { stop_tx },
    ))
}

impl EdgeWaiter {
    /// Blocks without timeout until an edge or a stop request arrives.
    ///
    /// A stop request wins over an edge reported in the same wake-up.
    /// Signal interruptions surface as [`io::ErrorKind::Interrupted`].
    pub(crate) fn wait(&mut self) -> io::Result<Wakeup> {
        let mut events = [libc::epoll_event { events: 0, u64: 0 }; 2];
        // SAFETY: `events` is valid for `events.len()` entries.
        let n = cvt(unsafe {
            libc::epoll_wait(
                self.epoll.as_raw_fd(),
                events.as_mut_ptr(),
                events.len() as libc::c_int,
                -1,
            )
        })?;
        let ready = &events[..n as usize];
        trace!("epoll woke with {} event(s)", ready.len());
        // epoll_event is packed on some targets, so copy the field out.
        if ready.iter().any(|e| {
            let token = e.u64;
            token == STOP_TOKEN
        }) {
            Ok(Wakeup::Stop)
        } else {
            Ok(Wakeup::Edge)
        }
    }
}

impl StopTrigger {
    pub(crate) fn trigger(&self) -> io::Result<()> {
        let byte = [1u8];
        // SAFETY: writes one byte from a valid buffer to an open pipe.
        let ret = unsafe { libc::write(self.stop_tx.as_raw_fd(), byte.as_ptr().cast(), 1) };
        if ret < 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(())
        }
    }
}
