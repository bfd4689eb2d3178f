use std::fmt;
use std::ptr::NonNull;

/// Error reported by every allocation entry point.
#[derive(Debug)]
pub enum AllocError {
    /// The system heap refused a request of `size` bytes.
    OutOfMemory { size: usize },
    /// The requested alignment is not a power of two.
    BadAlignment { align: usize },
}

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllocError::OutOfMemory { size } => {
                write!(f, "heap allocation of {size} bytes failed")
            }
            AllocError::BadAlignment { align } => {
                write!(f, "alignment {align} is not a power of two")
            }
        }
    }
}

impl std::error::Error for AllocError {}

/// Abstract interface for the system heap underneath every pool.
///
/// Pools own raw memory obtained here; blocks and aligned large allocations
/// go through [`alloc_aligned`](HeapOps::alloc_aligned), plain large
/// allocations through [`alloc`](HeapOps::alloc). Everything is returned with
/// [`free`](HeapOps::free).
pub(crate) trait HeapOps {
    /// Allocate `size` bytes at the heap's default alignment.
    unsafe fn alloc(size: usize) -> Result<NonNull<u8>, AllocError>;

    /// Allocate `size` bytes aligned to `align` (a power of two).
    unsafe fn alloc_aligned(size: usize, align: usize) -> Result<NonNull<u8>, AllocError>;

    /// Return memory previously obtained from `alloc` or `alloc_aligned`.
    unsafe fn free(ptr: NonNull<u8>);

    /// OS page size (default/minimum).
    fn page_size() -> usize;
}

pub(crate) struct PlatformHeap;

#[cfg(unix)]
mod unix {
    use super::{AllocError, HeapOps, PlatformHeap};
    use std::io;
    use std::ptr::NonNull;

    impl HeapOps for PlatformHeap {
        unsafe fn alloc(size: usize) -> Result<NonNull<u8>, AllocError> {
            // malloc(0) may legally return null; always request at least one byte.
            let request = size.max(1);
            // Safety: FFI call to malloc.
            let ptr = unsafe { libc::malloc(request) };
            NonNull::new(ptr.cast::<u8>()).ok_or(AllocError::OutOfMemory { size })
        }

        unsafe fn alloc_aligned(size: usize, align: usize) -> Result<NonNull<u8>, AllocError> {
            if !align.is_power_of_two() {
                return Err(AllocError::BadAlignment { align });
            }
            // posix_memalign additionally requires a multiple of the pointer size.
            let align = align.max(std::mem::size_of::<*mut u8>());
            let request = size.max(1);

            let mut out: *mut libc::c_void = std::ptr::null_mut();
            // Safety: FFI call to posix_memalign; `out` is a valid out-pointer
            // and `align` satisfies the preconditions checked above.
            let rc = unsafe { libc::posix_memalign(&mut out, align, request) };
            if rc != 0 {
                return Err(AllocError::OutOfMemory { size });
            }
            NonNull::new(out.cast::<u8>()).ok_or(AllocError::OutOfMemory { size })
        }

        unsafe fn free(ptr: NonNull<u8>) {
            // Safety: FFI call to free; memory from malloc and posix_memalign
            // is released the same way.
            unsafe { libc::free(ptr.as_ptr().cast::<libc::c_void>()) };
        }

        fn page_size() -> usize {
            use std::sync::OnceLock;
            static CACHED: OnceLock<usize> = OnceLock::new();
            *CACHED.get_or_init(|| {
                // Safety: FFI call to sysconf.
                let raw = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
                assert!(
                    raw > 0,
                    "sysconf(_SC_PAGESIZE) failed: {}",
                    io::Error::last_os_error()
                );
                #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
                {
                    raw as usize
                }
            })
        }
    }
}

#[cfg(windows)]
mod windows {
    use super::{AllocError, HeapOps, PlatformHeap};
    use std::ptr::NonNull;

    // The libc crate does not bind the CRT heap-alignment pair; declare the
    // MSVC symbols directly. Memory from _aligned_malloc must be released
    // with _aligned_free (and plain malloc memory must not be), so every
    // heap call goes through this pair to keep `free` uniform.
    unsafe extern "C" {
        fn _aligned_malloc(size: usize, alignment: usize) -> *mut libc::c_void;
        fn _aligned_free(ptr: *mut libc::c_void);
    }

    /// Win32 SYSTEM_INFO, fields laid out per sysinfoapi.h (the union at
    /// offset 0 is flattened to its wProcessorArchitecture form).
    #[repr(C)]
    #[allow(non_camel_case_types, non_snake_case, dead_code)]
    struct SYSTEM_INFO {
        wProcessorArchitecture: u16,
        wReserved: u16,
        dwPageSize: u32,
        lpMinimumApplicationAddress: *mut libc::c_void,
        lpMaximumApplicationAddress: *mut libc::c_void,
        dwActiveProcessorMask: usize,
        dwNumberOfProcessors: u32,
        dwProcessorType: u32,
        dwAllocationGranularity: u32,
        wProcessorLevel: u16,
        wProcessorRevision: u16,
    }

    unsafe extern "system" {
        fn GetSystemInfo(info: *mut SYSTEM_INFO);
    }

    const DEFAULT_ALIGN: usize = 16;

    impl HeapOps for PlatformHeap {
        unsafe fn alloc(size: usize) -> Result<NonNull<u8>, AllocError> {
            // Safety: delegated; DEFAULT_ALIGN is a power of two.
            unsafe { Self::alloc_aligned(size, DEFAULT_ALIGN) }
        }

        unsafe fn alloc_aligned(size: usize, align: usize) -> Result<NonNull<u8>, AllocError> {
            if !align.is_power_of_two() {
                return Err(AllocError::BadAlignment { align });
            }
            let request = size.max(1);
            // Safety: FFI call to _aligned_malloc.
            let ptr = unsafe { _aligned_malloc(request, align) };
            NonNull::new(ptr.cast::<u8>()).ok_or(AllocError::OutOfMemory { size })
        }

        unsafe fn free(ptr: NonNull<u8>) {
            // Safety: FFI call to _aligned_free; every allocation above came
            // from _aligned_malloc.
            unsafe { _aligned_free(ptr.as_ptr().cast::<libc::c_void>()) };
        }

        fn page_size() -> usize {
            use std::sync::OnceLock;
            static CACHED: OnceLock<usize> = OnceLock::new();
            // Safety: FFI call to GetSystemInfo on a zeroed out-struct.
            *CACHED.get_or_init(|| unsafe {
                let mut info: SYSTEM_INFO = std::mem::zeroed();
                GetSystemInfo(&mut info);
                info.dwPageSize as usize
            })
        }
    }
}
