use std::fs::OpenOptions;
use std::os::fd::AsRawFd;
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;

use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::stream::LinkStream;

/// Serial device transport.
///
/// Opens a tty node read/write without making it the controlling terminal,
/// then switches the line to raw 8N1 at the requested speed. Reads block
/// until at least one byte is available.
pub struct SerialDevice;

impl SerialDevice {
    /// Open and configure a serial device node (blocking).
    pub fn open(path: impl AsRef<Path>, baud_rate: u32) -> Result<LinkStream> {
        let path = path.as_ref();
        let speed = speed_for(baud_rate).ok_or(TransportError::UnsupportedBaud(baud_rate))?;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NOCTTY)
            .open(path)
            .map_err(|e| TransportError::Open {
                path: path.to_path_buf(),
                source: e,
            })?;

        configure_raw(&file, speed).map_err(|e| TransportError::Configure {
            path: path.to_path_buf(),
            source: e,
        })?;

        info!(?path, baud_rate, "opened serial device");
        Ok(LinkStream::from_device(file))
    }
}

/// Map a numeric baud rate to its termios speed constant.
pub fn speed_for(baud_rate: u32) -> Option<libc::speed_t> {
    let speed = match baud_rate {
        9600 => libc::B9600,
        19200 => libc::B19200,
        38400 => libc::B38400,
        57600 => libc::B57600,
        115200 => libc::B115200,
        230400 => libc::B230400,
        _ => return None,
    };
    Some(speed)
}

fn configure_raw(file: &std::fs::File, speed: libc::speed_t) -> std::io::Result<()> {
    let fd = file.as_raw_fd();

    // SAFETY: termios is a plain C struct; all-zero is a valid value that
    // tcgetattr fully overwrites before use.
    let mut tio: libc::termios = unsafe { std::mem::zeroed() };

    // SAFETY: `fd` is an open descriptor owned by `file` for the duration of
    // this call and `tio` is a valid writable termios.
    if unsafe { libc::tcgetattr(fd, &mut tio) } != 0 {
        return Err(std::io::Error::last_os_error());
    }

    // SAFETY: `tio` is a valid termios obtained from tcgetattr.
    unsafe { libc::cfmakeraw(&mut tio) };
    tio.c_cflag |= libc::CLOCAL | libc::CREAD;
    tio.c_cflag &= !libc::CSTOPB;
    tio.c_cc[libc::VMIN] = 1;
    tio.c_cc[libc::VTIME] = 0;

    // SAFETY: `tio` is valid and `speed` is one of the B* constants.
    let rc = unsafe { libc::cfsetispeed(&mut tio, speed) | libc::cfsetospeed(&mut tio, speed) };
    if rc != 0 {
        return Err(std::io::Error::last_os_error());
    }

    // SAFETY: `fd` is open and `tio` is a fully initialised termios.
    if unsafe { libc::tcsetattr(fd, libc::TCSANOW, &tio) } != 0 {
        return Err(std::io::Error::last_os_error());
    }

    debug!(fd, "serial line set to raw 8N1");
    Ok(())
}
