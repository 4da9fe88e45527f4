//! AxVisor guest execution-context provider for sampling profilers.
//!
//! When a counter overflow interrupt lands on a physical CPU, the host
//! profiler needs to know whether a guest was running there, at which
//! privilege level, and at which guest PC. This crate answers those
//! questions from the per-CPU running vCPU slots and advertises whether
//! guest-aware hardware counters can be used at all.
//!
//! # Features
//!
//! - `axhal` - Real platform (CPU id, PMU registers) instead of mocks
//! - `protected-mode` - Guests are isolated from host counter access
//! - `static-key` - Patched branch for the availability fast path
//! - `test-utils` - Reset helpers for tests
//!
//! # Quick Start
//!
//! ```ignore
//! use axperf::{GuestCpuContext, vcpu_load, vcpu_put};
//!
//! // Once, during hypervisor bring-up
//! axperf::init()?;
//!
//! // While a vCPU is scheduled on this CPU
//! let ctx = GuestCpuContext::default();
//! unsafe { vcpu_load(&ctx) };
//! while !need_resched() {
//!     // Guest exits arrive with IRQs masked. Sync before unmasking so a
//!     // pending counter overflow sees the new PC and PSTATE together.
//!     let (elr_el2, spsr_el2) = run_guest();
//!     ctx.sync_from_exit(elr_el2, spsr_el2);
//!     handle_exit_with_irqs_enabled();
//! }
//! vcpu_put();
//!
//! // At shutdown
//! axperf::teardown()?;
//! ```

#![no_std]

#[macro_use]
extern crate log;

// =============================================================================
// Platform Abstraction (for testing support)
// =============================================================================

pub mod platform;

pub mod pmu;

// =============================================================================
// Guest Context
// =============================================================================

pub mod availability;

pub mod percpu;

pub mod vcpu;

// =============================================================================
// Profiler Integration
// =============================================================================

pub mod perf;

pub mod provider;

pub mod sample;

// Re-export key types for convenience
pub use availability::{Availability, availability, is_available};
pub use perf::{Error, GuestInfoCallbacks};
pub use percpu::{MAX_CPUS, RunningVcpus, running_vcpu, vcpu_load, vcpu_put};
pub use sample::SampleOrigin;
pub use vcpu::{GuestCpuContext, PrivilegeMode};

// =============================================================================
// Initialization
// =============================================================================

/// Initialize guest profiling support.
///
/// Computes the guest PMU availability flag, then registers the guest-info
/// callbacks with the host profiler. Registration happens whatever the flag
/// says. Must be called once during hypervisor bring-up, serialized with
/// [`teardown`].
///
/// # Errors
/// [`Error::RegistrationConflict`] if a guest-info provider is already
/// registered. Bring-up should fail rather than continue without it.
pub fn init() -> Result<(), Error> {
    info!("Initializing axperf...");

    let avail = availability::compute_availability();
    info!("  - guest PMU {}", avail.label());

    if let Err(e) = perf::register_guest_info_callbacks(&provider::AXVISOR_GUEST_CBS) {
        warn!("  - failed to register guest info callbacks: {}", e);
        return Err(e);
    }

    info!("axperf initialization complete");
    Ok(())
}

/// Unregister the guest-info callbacks.
///
/// The availability flag keeps its value.
///
/// # Errors
/// [`Error::NotRegistered`] if [`init`] has not registered them.
pub fn teardown() -> Result<(), Error> {
    if let Err(e) = perf::unregister_guest_info_callbacks(&provider::AXVISOR_GUEST_CBS) {
        warn!("axperf teardown: {}", e);
        return Err(e);
    }

    info!("axperf torn down");
    Ok(())
}

/// Whether [`init`] currently has the callbacks registered.
pub fn is_registered() -> bool {
    perf::is_registered(&provider::AXVISOR_GUEST_CBS)
}
