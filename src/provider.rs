//! Guest-info queries answered for the host profiler.
//!
//! Each query reads the current CPU's running vCPU slot. Host code is the
//! common case when a sample lands, so the empty slot is the short path.

use crate::perf::GuestInfoCallbacks;
use crate::percpu;

/// Whether the current CPU is running a guest.
pub fn is_in_guest() -> bool {
    percpu::running_vcpu().is_some()
}

/// Whether the guest on the current CPU was in user mode.
///
/// False when no guest is running.
pub fn is_user_mode() -> bool {
    match percpu::running_vcpu() {
        Some(vcpu) => vcpu.is_user_mode(),
        None => false,
    }
}

/// Guest instruction pointer on the current CPU, or 0 outside a guest.
pub fn get_guest_ip() -> u64 {
    match percpu::running_vcpu() {
        Some(vcpu) => vcpu.pc(),
        None => 0,
    }
}

/// The callback bundle registered by [`crate::init`].
pub static AXVISOR_GUEST_CBS: GuestInfoCallbacks = GuestInfoCallbacks {
    is_in_guest,
    is_user_mode,
    get_guest_ip,
};
