//! Linux transport: `ioctl` on the coprocessor character device for
//! commands and payload fetches, a POSIX message queue for event records.
//!
//! Enabled with the `posix` cargo feature.

use std::ffi::CString;
use std::fs::{File, OpenOptions};
use std::io;
use std::os::fd::AsRawFd;
use std::sync::Mutex;

use crate::config::CoprocConfig;
use crate::error::{Error, QueueError};
use crate::logging::Logger;
use crate::proto::codec::EVENT_RECORD_SIZE;
use crate::proto::transport::{RawCommand, RawPayloadRequest, Transport};
use crate::sync::lock;
use crate::{log_debug, log_info, log_warn};

#[cfg(target_env = "musl")]
type IoctlRequest = libc::c_int;
#[cfg(not(target_env = "musl"))]
type IoctlRequest = libc::c_ulong;

fn last_errno() -> i32 {
    io::Error::last_os_error().raw_os_error().unwrap_or(libc::EIO)
}

pub struct PosixTransport {
    device: File,
    queue: libc::mqd_t,
    /// `mq_receive` needs a buffer of at least the queue's message size.
    scratch: Mutex<Vec<u8>>,
    send_command: IoctlRequest,
    fetch_payload: IoctlRequest,
    log: Logger,
}

impl PosixTransport {
    pub fn open(config: &CoprocConfig, log: Logger) -> Result<Self, Error> {
        let device = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&config.device_path)
            .map_err(|_| Error::Init("cannot open coprocessor device"))?;

        let name = CString::new(config.event_queue.as_str())
            .map_err(|_| Error::Init("event queue name contains NUL"))?;
        // SAFETY: `name` is a valid NUL-terminated string for the call.
        let queue = unsafe { libc::mq_open(name.as_ptr(), libc::O_RDONLY) };
        if queue < 0 {
            return Err(Error::Queue(QueueError::Os(last_errno())));
        }

        // SAFETY: all-zero is a valid `mq_attr`; the kernel fills it in.
        let mut attr: libc::mq_attr = unsafe { std::mem::zeroed() };
        // SAFETY: `queue` is open and `attr` outlives the call.
        if unsafe { libc::mq_getattr(queue, &mut attr) } < 0 {
            let errno = last_errno();
            // SAFETY: `queue` was opened above and is not used again.
            unsafe { libc::mq_close(queue) };
            return Err(Error::Queue(QueueError::Os(errno)));
        }
        let scratch_len = usize::try_from(attr.mq_msgsize)
            .unwrap_or(EVENT_RECORD_SIZE)
            .max(EVENT_RECORD_SIZE);

        log_info!(
            log,
            "opened {} and queue {} (msgsize {})",
            config.device_path,
            config.event_queue,
            scratch_len
        );
        Ok(Self {
            device,
            queue,
            scratch: Mutex::new(vec![0u8; scratch_len]),
            send_command: config.ioctl_send_command as IoctlRequest,
            fetch_payload: config.ioctl_fetch_payload as IoctlRequest,
            log,
        })
    }

    fn ioctl<T>(&self, request: IoctlRequest, arg: *mut T) -> i32 {
        // SAFETY: `arg` points at a live `#[repr(C)]` block whose buffers
        // are borrowed for the duration of this call.
        let ret = unsafe { libc::ioctl(self.device.as_raw_fd(), request, arg) };
        if ret < 0 { last_errno() } else { 0 }
    }
}

impl Drop for PosixTransport {
    fn drop(&mut self) {
        // SAFETY: the descriptor is owned by `self` and closed once.
        if unsafe { libc::mq_close(self.queue) } < 0 {
            log_debug!(self.log, "mq_close failed (errno {})", last_errno());
        }
    }
}

impl Transport for PosixTransport {
    fn control(&self, cmd: &mut RawCommand<'_>) -> i32 {
        self.ioctl(self.send_command, cmd.as_mut_ptr())
    }

    fn fetch_payload(&self, req: &mut RawPayloadRequest<'_>) -> i32 {
        self.ioctl(self.fetch_payload, req.as_mut_ptr())
    }

    fn read_event(&self, record: &mut [u8; EVENT_RECORD_SIZE]) -> Result<(), QueueError> {
        let mut scratch = lock(&self.scratch);
        let mut prio: libc::c_uint = 0;
        loop {
            // SAFETY: `scratch` is exclusively borrowed and its length is
            // passed alongside the pointer.
            let n = unsafe {
                libc::mq_receive(
                    self.queue,
                    scratch.as_mut_ptr().cast(),
                    scratch.len(),
                    &mut prio,
                )
            };
            if n < 0 {
                return Err(match last_errno() {
                    libc::EINTR => QueueError::Interrupted,
                    libc::EBADF => QueueError::Closed,
                    errno => QueueError::Os(errno),
                });
            }
            let n = n as usize;
            if n >= EVENT_RECORD_SIZE {
                record.copy_from_slice(&scratch[..EVENT_RECORD_SIZE]);
                return Ok(());
            }
            log_warn!(self.log, "dropping short event record ({} bytes)", n);
        }
    }
}
