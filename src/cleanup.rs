//! Destruction-time cleanups.
//!
//! A [`Cleanup`] is a `(handler, data)` pair registered with
//! [`Pool::add_cleanup`](crate::Pool::add_cleanup). Handlers run when the
//! pool drops, most recent first. The nodes and their payloads live inside
//! the pool's own block chain, so registration costs one or two bump
//! allocations and nothing is freed individually.

/// A cleanup callback. Receives the node's raw `data` payload.
///
/// Handlers are `unsafe fn`: they reinterpret the payload that the registrant
/// stored, and the registrant is responsible for keeping the two consistent.
pub type CleanupHandler = unsafe fn(*mut u8);

/// One registered cleanup. Obtained from
/// [`Pool::add_cleanup`](crate::Pool::add_cleanup); the caller installs a
/// handler and fills the payload through [`data`](Cleanup::data).
#[repr(C)]
pub struct Cleanup {
    /// Callback to run at pool destruction; `None` means the node is inert.
    pub(crate) handler: Option<CleanupHandler>,
    /// Opaque payload, usually pool-allocated; null when registered with
    /// `data_size` 0.
    pub(crate) data: *mut u8,
    pub(crate) next: *mut Cleanup,
}

impl Cleanup {
    pub(crate) fn new(data: *mut u8, next: *mut Cleanup) -> Self {
        Self {
            handler: None,
            data,
            next,
        }
    }

    /// Install the callback to run when the pool drops.
    pub fn set_handler(&mut self, handler: CleanupHandler) {
        self.handler = Some(handler);
    }

    /// The payload pointer allocated at registration (null if `data_size`
    /// was 0).
    #[must_use]
    pub fn data(&self) -> *mut u8 {
        self.data
    }
}

#[cfg(unix)]
pub use file::{FileCleanup, close_file, delete_file};

#[cfg(unix)]
mod file {
    use super::CleanupHandler;
    use crate::pool::Pool;
    use std::ffi::CStr;
    use std::io;
    use std::os::unix::io::RawFd;

    /// Payload for the bundled file cleanups. Store one of these behind
    /// [`Cleanup::data`] (registered with `data_size =
    /// size_of::<FileCleanup>()`).
    #[repr(C)]
    pub struct FileCleanup {
        /// Descriptor to close.
        pub fd: RawFd,
        /// NUL-terminated path for [`delete_file`], typically pool-allocated.
        /// Null for close-only cleanups.
        pub name: *const libc::c_char,
    }

    /// Bundled handler: close the descriptor in a [`FileCleanup`] payload.
    ///
    /// # Safety
    ///
    /// `data` must point to a valid [`FileCleanup`].
    pub unsafe fn close_file(data: *mut u8) {
        // Safety: contract above.
        let fd = unsafe { (*data.cast::<FileCleanup>()).fd };
        log::debug!("file cleanup: fd:{fd}");

        // Safety: FFI call to close.
        if unsafe { libc::close(fd) } == -1 {
            log::error!("close() fd:{fd} failed: {}", io::Error::last_os_error());
        }
    }

    /// Bundled handler: delete the named file, then close its descriptor.
    /// A missing target is not an error (the file may have been renamed or
    /// already removed).
    ///
    /// # Safety
    ///
    /// `data` must point to a valid [`FileCleanup`] whose `name`, when
    /// non-null, is a NUL-terminated path that outlives the call.
    pub unsafe fn delete_file(data: *mut u8) {
        let cf = data.cast::<FileCleanup>();
        // Safety: contract above.
        let (fd, name) = unsafe { ((*cf).fd, (*cf).name) };
        log::debug!("file cleanup: fd:{fd}");

        if !name.is_null() {
            // Safety: name is NUL-terminated per the contract; FFI unlink.
            if unsafe { libc::unlink(name) } == -1 {
                let err = io::Error::last_os_error();
                if err.raw_os_error() != Some(libc::ENOENT) {
                    // Safety: same NUL-termination contract.
                    let shown = unsafe { CStr::from_ptr(name) };
                    log::error!("unlink() {:?} failed: {err}", shown.to_string_lossy());
                }
            }
        }

        // Safety: FFI call to close.
        if unsafe { libc::close(fd) } == -1 {
            log::error!("close() fd:{fd} failed: {}", io::Error::last_os_error());
        }
    }

    impl Pool {
        /// Run the close-file cleanup registered for `fd` ahead of pool
        /// destruction, then disarm it so the drop pass skips it.
        ///
        /// Walks the cleanup list for a node whose handler is [`close_file`]
        /// and whose payload names `fd`; other nodes are untouched. Returns
        /// after the first match (or after a full fruitless walk).
        pub fn run_cleanup_file(&mut self, fd: RawFd) {
            let mut c = self.cleanup;
            while !c.is_null() {
                // Safety: cleanup nodes live in block memory owned by self.
                let node = unsafe { &mut *c };
                if let Some(handler) = node.handler {
                    if std::ptr::fn_addr_eq(handler, close_file as CleanupHandler) {
                        // Safety: close_file nodes carry a FileCleanup payload.
                        let cf_fd = unsafe { (*node.data.cast::<FileCleanup>()).fd };
                        if cf_fd == fd {
                            // Safety: handler/data installed together.
                            unsafe { handler(node.data) };
                            node.handler = None;
                            return;
                        }
                    }
                }
                c = node.next;
            }
        }
    }
}
