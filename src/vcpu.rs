//! Guest CPU context published by the vCPU scheduler.
//!
//! The scheduler keeps one [`GuestCpuContext`] per vCPU and refreshes it
//! with the guest's saved PC and PSTATE whenever the vCPU traps to EL2.
//! Interrupt handlers on the same core read it through [`crate::percpu`].

use core::sync::atomic::{AtomicU64, Ordering};

/// PSTATE bit set when the guest executes in AArch32 state.
const PSR_MODE32_BIT: u64 = 0x10;

/// AArch64 mode field, `M[3:0]`.
const PSR_MODE_MASK: u64 = 0x0f;

/// AArch64 EL0 with SP_EL0.
const PSR_MODE_EL0T: u64 = 0x00;

/// AArch32 mode field, `M[4:0]`.
const PSR_AA32_MODE_MASK: u64 = 0x1f;

/// AArch32 User mode.
const PSR_AA32_MODE_USR: u64 = 0x10;

/// Privilege level of the interrupted guest code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrivilegeMode {
    /// Guest kernel (EL1, or any AArch32 mode above USR).
    Privileged,
    /// Guest user space (EL0t, or AArch32 USR).
    Unprivileged,
}

impl PrivilegeMode {
    /// Decode the privilege level from a saved guest PSTATE.
    pub fn from_pstate(pstate: u64) -> Self {
        let privileged = if pstate & PSR_MODE32_BIT != 0 {
            (pstate & PSR_AA32_MODE_MASK) > PSR_AA32_MODE_USR
        } else {
            (pstate & PSR_MODE_MASK) != PSR_MODE_EL0T
        };

        if privileged {
            PrivilegeMode::Privileged
        } else {
            PrivilegeMode::Unprivileged
        }
    }
}

/// Saved execution state of one guest vCPU.
///
/// Only the owning core writes these fields; the interrupt path reads
/// them on that same core, so relaxed accesses are enough.
#[derive(Debug, Default)]
pub struct GuestCpuContext {
    /// Guest program counter (ELR_EL2 at the last exit).
    pc: AtomicU64,
    /// Guest PSTATE (SPSR_EL2 at the last exit).
    pstate: AtomicU64,
}

impl GuestCpuContext {
    /// Create a context with the given PC and PSTATE.
    pub const fn new(pc: u64, pstate: u64) -> Self {
        Self {
            pc: AtomicU64::new(pc),
            pstate: AtomicU64::new(pstate),
        }
    }

    /// Guest program counter.
    #[inline]
    pub fn pc(&self) -> u64 {
        self.pc.load(Ordering::Relaxed)
    }

    /// Raw guest PSTATE.
    #[inline]
    pub fn pstate(&self) -> u64 {
        self.pstate.load(Ordering::Relaxed)
    }

    /// Decoded privilege level.
    #[inline]
    pub fn mode(&self) -> PrivilegeMode {
        PrivilegeMode::from_pstate(self.pstate())
    }

    /// Whether the guest was running in user space.
    #[inline]
    pub fn is_user_mode(&self) -> bool {
        self.mode() == PrivilegeMode::Unprivileged
    }

    /// Set the guest program counter.
    pub fn set_pc(&self, pc: u64) {
        self.pc.store(pc, Ordering::Relaxed);
    }

    /// Set the guest PSTATE.
    pub fn set_pstate(&self, pstate: u64) {
        self.pstate.store(pstate, Ordering::Relaxed);
    }

    /// Refresh both fields from a guest exit.
    ///
    /// The two stores are separate, so while the context is published this
    /// must run with IRQs masked on the owning CPU. Otherwise a sampling
    /// interrupt between them pairs the new PC with the old PSTATE.
    pub fn sync_from_exit(&self, pc: u64, pstate: u64) {
        self.set_pc(pc);
        self.set_pstate(pstate);
    }
}
