//! Sample classification for the host profiler.
//!
//! When a counter overflows, the profiler asks the registered guest-info
//! provider whether the interrupt landed in a guest before deciding which
//! instruction pointer and origin to record.

use crate::perf;

/// Where a sample was taken, as perf record misc values.
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleOrigin {
    /// Host kernel / hypervisor code.
    HostKernel = 1,
    /// Host user space.
    HostUser = 2,
    /// Guest kernel.
    GuestKernel = 4,
    /// Guest user space.
    GuestUser = 5,
}

impl SampleOrigin {
    /// Whether the sample was taken inside a guest.
    pub fn is_guest(&self) -> bool {
        matches!(self, SampleOrigin::GuestKernel | SampleOrigin::GuestUser)
    }

    /// Short label for display.
    pub fn label(&self) -> &'static str {
        match self {
            SampleOrigin::HostKernel => "host-kernel",
            SampleOrigin::HostUser => "host-user",
            SampleOrigin::GuestKernel => "guest-kernel",
            SampleOrigin::GuestUser => "guest-user",
        }
    }
}

/// Classify the sample using the registered guest-info provider.
///
/// `host_user` is the privilege of the interrupted host context and is
/// used only when no guest was running.
pub fn misc_flags(host_user: bool) -> SampleOrigin {
    if let Some(cbs) = perf::guest_info_callbacks()
        && (cbs.is_in_guest)()
    {
        return if (cbs.is_user_mode)() {
            SampleOrigin::GuestUser
        } else {
            SampleOrigin::GuestKernel
        };
    }

    if host_user {
        SampleOrigin::HostUser
    } else {
        SampleOrigin::HostKernel
    }
}

/// The instruction pointer to record: the guest's when in a guest,
/// otherwise `host_ip`.
pub fn instruction_pointer(host_ip: u64) -> u64 {
    match perf::guest_info_callbacks() {
        Some(cbs) if (cbs.is_in_guest)() => (cbs.get_guest_ip)(),
        _ => host_ip,
    }
}
