//! Controlling-terminal plumbing: termios modes, readiness polling, window size

use std::io;
use std::os::unix::io::RawFd;
use std::time::Duration;

use tracing::debug;

use super::process::TerminalSize;

/// Holds the terminal's original settings while it is switched to raw mode.
///
/// The original settings are written back exactly once, when the guard is
/// dropped, however the relay loop ends.
pub struct RawModeGuard {
    fd: RawFd,
    original: libc::termios,
}

impl RawModeGuard {
    /// Capture the current settings of `fd` and switch it to raw mode.
    pub fn enter(fd: RawFd) -> io::Result<Self> {
        let original = get_attrs(fd)?;
        let mut guard = Self { fd, original };
        guard.resume_raw()?;
        Ok(guard)
    }

    /// (Re-)enter raw mode: unbuffered, no echo, no signal keys.
    pub fn resume_raw(&mut self) -> io::Result<()> {
        let mut raw = self.original;
        // SAFETY: cfmakeraw only mutates the termios struct it is given.
        unsafe { libc::cfmakeraw(&mut raw) };
        set_attrs(self.fd, &raw)
    }

    /// Switch to line mode for the action menu.
    ///
    /// This is the original line discipline except that Ctrl-C ends the line
    /// (it arrives in the input as 0x03) instead of raising SIGINT in daneel
    /// itself.
    pub fn enter_menu_mode(&mut self) -> io::Result<()> {
        let mut menu = self.original;
        menu.c_lflag &= !libc::ISIG;
        menu.c_cc[libc::VEOL] = super::KEY_INTERRUPT;
        set_attrs(self.fd, &menu)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if let Err(e) = set_attrs(self.fd, &self.original) {
            debug!("Failed to restore terminal settings: {}", e);
        }
    }
}

fn get_attrs(fd: RawFd) -> io::Result<libc::termios> {
    // SAFETY: termios is plain data; tcgetattr fills it or fails.
    let mut attrs: libc::termios = unsafe { std::mem::zeroed() };
    let rc = unsafe { libc::tcgetattr(fd, &mut attrs) };
    if rc != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(attrs)
}

fn set_attrs(fd: RawFd, attrs: &libc::termios) -> io::Result<()> {
    // TCSADRAIN lets pending output reach the screen before the switch
    let rc = unsafe { libc::tcsetattr(fd, libc::TCSADRAIN, attrs) };
    if rc != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// The EOF character configured on the terminal behind `fd`.
pub fn eof_char(fd: RawFd) -> Option<u8> {
    get_attrs(fd)
        .ok()
        .map(|attrs| attrs.c_cc[libc::VEOF])
        .filter(|c| *c != 0)
}

/// Which of the polled descriptors are ready.
#[derive(Debug, Clone, Copy, Default)]
pub struct Readiness {
    pub input: bool,
    pub output: bool,
}

/// Wait up to `timeout` for either descriptor to become readable.
///
/// Hang-ups and errors count as readable so the following read observes
/// the EOF.
pub fn poll_pair(input: RawFd, output: RawFd, timeout: Duration) -> io::Result<Readiness> {
    let mut fds = [
        libc::pollfd {
            fd: input,
            events: libc::POLLIN,
            revents: 0,
        },
        libc::pollfd {
            fd: output,
            events: libc::POLLIN,
            revents: 0,
        },
    ];
    let ready = poll(&mut fds, timeout)?;
    if ready == 0 {
        return Ok(Readiness::default());
    }

    let readable = |revents: libc::c_short| {
        revents & (libc::POLLIN | libc::POLLHUP | libc::POLLERR | libc::POLLNVAL) != 0
    };
    Ok(Readiness {
        input: readable(fds[0].revents),
        output: readable(fds[1].revents),
    })
}

/// Wait up to `timeout` for `fd` to become readable.
pub fn poll_readable(fd: RawFd, timeout: Duration) -> io::Result<bool> {
    let mut fds = [libc::pollfd {
        fd,
        events: libc::POLLIN,
        revents: 0,
    }];
    Ok(poll(&mut fds, timeout)? > 0)
}

fn poll(fds: &mut [libc::pollfd], timeout: Duration) -> io::Result<usize> {
    let timeout_ms = libc::c_int::try_from(timeout.as_millis()).unwrap_or(libc::c_int::MAX);
    loop {
        // SAFETY: fds points at a live slice of the given length.
        let rc = unsafe { libc::poll(fds.as_mut_ptr(), fds.len() as libc::nfds_t, timeout_ms) };
        if rc >= 0 {
            return Ok(rc as usize);
        }
        let err = io::Error::last_os_error();
        if err.kind() != io::ErrorKind::Interrupted {
            return Err(err);
        }
    }
}

/// Read a single byte from `fd`; `None` means end of input.
pub fn read_byte(fd: RawFd) -> io::Result<Option<u8>> {
    let mut byte = 0u8;
    loop {
        // SAFETY: reading one byte into a stack variable.
        let n = unsafe { libc::read(fd, (&mut byte as *mut u8).cast(), 1) };
        match n {
            0 => return Ok(None),
            1 => return Ok(Some(byte)),
            _ => {
                let err = io::Error::last_os_error();
                if err.kind() != io::ErrorKind::Interrupted {
                    return Err(err);
                }
            }
        }
    }
}

/// Unbuffered reader over a raw descriptor. In line mode each `read`
/// returns at most one line, so nothing meant for the relay is swallowed.
pub struct FdReader(pub RawFd);

impl io::Read for FdReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            // SAFETY: buf is a valid writable slice of buf.len() bytes.
            let n = unsafe { libc::read(self.0, buf.as_mut_ptr().cast(), buf.len()) };
            if n >= 0 {
                return Ok(n as usize);
            }
            let err = io::Error::last_os_error();
            if err.kind() != io::ErrorKind::Interrupted {
                return Err(err);
            }
        }
    }
}

/// Size of the terminal on standard output, if it is one.
pub fn terminal_size() -> Option<TerminalSize> {
    // SAFETY: winsize is plain data filled by the ioctl.
    let mut ws: libc::winsize = unsafe { std::mem::zeroed() };
    let rc = unsafe { libc::ioctl(libc::STDOUT_FILENO, libc::TIOCGWINSZ, &mut ws) };
    if rc != 0 || ws.ws_row == 0 || ws.ws_col == 0 {
        return None;
    }
    Some(TerminalSize {
        rows: ws.ws_row,
        cols: ws.ws_col,
    })
}

/// Send `signal` to process group `pgid`, or to `pid` when no group is known.
pub fn signal_process(pgid: Option<libc::pid_t>, pid: Option<u32>, signal: libc::c_int) -> io::Result<()> {
    let target = match (pgid, pid) {
        (Some(group), _) if group > 0 => -group,
        (_, Some(pid)) => pid as libc::pid_t,
        _ => {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                "process has no pid to signal",
            ));
        }
    };
    // SAFETY: kill has no memory-safety preconditions.
    let rc = unsafe { libc::kill(target, signal) };
    if rc != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}
