//! Per-CPU running vCPU slots.
//!
//! One slot per physical CPU holds a pointer to the [`GuestCpuContext`] of
//! the vCPU currently running there, or null while the CPU runs host code.
//! Only the owning CPU's scheduler writes its slot; interrupt handlers on
//! that CPU read it without locking.

use core::ptr;
use core::sync::atomic::{AtomicPtr, Ordering};

use crate::platform;
use crate::vcpu::GuestCpuContext;

/// Maximum number of physical CPUs tracked.
pub const MAX_CPUS: usize = 64;

/// Table of per-CPU running vCPU slots.
pub struct RunningVcpus<const N: usize> {
    slots: [AtomicPtr<GuestCpuContext>; N],
}

impl<const N: usize> RunningVcpus<N> {
    /// Create a table with every CPU running host code.
    pub const fn new() -> Self {
        Self {
            slots: [const { AtomicPtr::new(ptr::null_mut()) }; N],
        }
    }

    /// Number of CPU slots.
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Publish `ctx` as running on `cpu`.
    ///
    /// The release store makes the context's fields visible to any reader
    /// that observes the pointer. Out-of-range CPUs are ignored.
    ///
    /// # Safety
    /// `ctx` must stay valid until [`Self::clear`] is called for `cpu`.
    pub unsafe fn set(&self, cpu: usize, ctx: &GuestCpuContext) {
        if let Some(slot) = self.slots.get(cpu) {
            slot.store(ptr::from_ref(ctx).cast_mut(), Ordering::Release);
        }
    }

    /// Mark `cpu` as running host code.
    pub fn clear(&self, cpu: usize) {
        if let Some(slot) = self.slots.get(cpu) {
            slot.store(ptr::null_mut(), Ordering::Release);
        }
    }

    /// The context running on `cpu`, if any.
    #[inline]
    pub fn get(&self, cpu: usize) -> Option<&GuestCpuContext> {
        let ptr = self.slots.get(cpu)?.load(Ordering::Acquire);
        // Non-null pointers were published by `set`, whose caller keeps
        // them valid until `clear`.
        unsafe { ptr.as_ref() }
    }

    /// Whether `cpu` is running a guest.
    #[inline]
    pub fn is_in_guest(&self, cpu: usize) -> bool {
        self.get(cpu).is_some()
    }

    /// Whether the guest on `cpu` was interrupted in user mode.
    #[inline]
    pub fn is_user_mode(&self, cpu: usize) -> bool {
        match self.get(cpu) {
            Some(ctx) => ctx.is_user_mode(),
            None => false,
        }
    }

    /// Guest PC on `cpu`, or 0 when no guest is running.
    #[inline]
    pub fn guest_ip(&self, cpu: usize) -> u64 {
        match self.get(cpu) {
            Some(ctx) => ctx.pc(),
            None => 0,
        }
    }
}

impl<const N: usize> Default for RunningVcpus<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Global running vCPU table.
pub static RUNNING_VCPUS: RunningVcpus<MAX_CPUS> = RunningVcpus::new();

/// Publish `ctx` as the vCPU running on the current CPU.
///
/// Called by the scheduler immediately before entering the guest.
///
/// # Safety
/// `ctx` must stay valid until [`vcpu_put`] is called on this CPU.
pub unsafe fn vcpu_load(ctx: &GuestCpuContext) {
    unsafe { RUNNING_VCPUS.set(platform::cpu_id() as usize, ctx) }
}

/// Clear the current CPU's running vCPU.
///
/// Called by the scheduler immediately after returning to the host.
pub fn vcpu_put() {
    RUNNING_VCPUS.clear(platform::cpu_id() as usize);
}

/// The vCPU context running on the current CPU, if any.
#[inline]
pub fn running_vcpu() -> Option<&'static GuestCpuContext> {
    RUNNING_VCPUS.get(platform::cpu_id() as usize)
}
