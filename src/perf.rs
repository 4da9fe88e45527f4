//! Host profiler guest-info registry.
//!
//! The sampling profiler keeps a single global slot for the provider that
//! answers "what was the guest doing" from its interrupt handler. The slot
//! is read lock-free on every sample; writes happen only at provider
//! registration and removal, serialized by a spin lock.

use core::ptr;
use core::sync::atomic::{AtomicPtr, Ordering};

use spin::Mutex;

/// Guest-info callbacks registered by a hypervisor.
///
/// All three run in interrupt context on the sampled CPU and must not
/// block or allocate.
#[derive(Debug)]
pub struct GuestInfoCallbacks {
    /// Whether the sampled CPU was running a guest.
    pub is_in_guest: fn() -> bool,
    /// Whether the interrupted guest was in user mode.
    pub is_user_mode: fn() -> bool,
    /// Guest instruction pointer, or 0 when not in a guest.
    pub get_guest_ip: fn() -> u64,
}

/// Error types for guest-info registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Another provider already occupies the registry slot.
    RegistrationConflict,
    /// The given provider is not the registered one.
    NotRegistered,
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::RegistrationConflict => {
                write!(f, "A guest info provider is already registered")
            }
            Self::NotRegistered => write!(f, "Guest info provider is not registered"),
        }
    }
}

impl core::error::Error for Error {}

impl From<Error> for axerrno::AxError {
    fn from(err: Error) -> Self {
        match err {
            Error::RegistrationConflict => axerrno::ax_err_type!(AlreadyExists, err),
            Error::NotRegistered => axerrno::ax_err_type!(NotFound, err),
        }
    }
}

/// The registered provider, or null.
static GUEST_CBS: AtomicPtr<GuestInfoCallbacks> = AtomicPtr::new(ptr::null_mut());

/// Serializes register/unregister.
static REGISTRATION_LOCK: Mutex<()> = Mutex::new(());

/// Register the guest-info provider.
///
/// Fails with [`Error::RegistrationConflict`] if any provider is already
/// registered, including `cbs` itself.
pub fn register_guest_info_callbacks(cbs: &'static GuestInfoCallbacks) -> Result<(), Error> {
    let _guard = REGISTRATION_LOCK.lock();

    if !GUEST_CBS.load(Ordering::Acquire).is_null() {
        return Err(Error::RegistrationConflict);
    }

    GUEST_CBS.store(ptr::from_ref(cbs).cast_mut(), Ordering::Release);
    debug!("Registered guest info callbacks at {:p}", cbs);
    Ok(())
}

/// Unregister the guest-info provider.
///
/// Fails with [`Error::NotRegistered`] unless `cbs` is the registered one.
pub fn unregister_guest_info_callbacks(cbs: &'static GuestInfoCallbacks) -> Result<(), Error> {
    let _guard = REGISTRATION_LOCK.lock();

    if !ptr::eq(GUEST_CBS.load(Ordering::Acquire), cbs) {
        return Err(Error::NotRegistered);
    }

    GUEST_CBS.store(ptr::null_mut(), Ordering::Release);
    debug!("Unregistered guest info callbacks at {:p}", cbs);
    Ok(())
}

/// The registered provider, if any.
#[inline]
pub fn guest_info_callbacks() -> Option<&'static GuestInfoCallbacks> {
    let cbs = GUEST_CBS.load(Ordering::Acquire);
    // Only `&'static` references are ever stored.
    unsafe { cbs.as_ref() }
}

/// Whether `cbs` is the registered provider.
pub fn is_registered(cbs: &'static GuestInfoCallbacks) -> bool {
    ptr::eq(GUEST_CBS.load(Ordering::Acquire), cbs)
}
