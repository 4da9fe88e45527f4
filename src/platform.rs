//! Platform abstraction layer for kernel operations.
//!
//! This module provides an abstraction over platform-specific operations
//! (CPU ID, PMU capabilities) to allow testing in user space.

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// Platform operations trait.
///
/// Abstracts over kernel-specific operations to enable mock testing.
pub trait PlatformOps {
    /// Get current CPU ID.
    fn cpu_id() -> u32;

    /// Number of general-purpose hardware counters on this CPU.
    fn pmu_num_counters() -> u32;

    /// Whether guests run isolated from host counter access.
    fn is_protected_mode() -> bool;
}

// =============================================================================
// Real Implementation (kernel environment with axhal)
// =============================================================================

/// Real platform operations using axhal.
#[cfg(all(not(test), feature = "axhal"))]
pub struct RealPlatform;

#[cfg(all(not(test), feature = "axhal"))]
impl PlatformOps for RealPlatform {
    fn cpu_id() -> u32 {
        axhal::percpu::this_cpu_id() as u32
    }

    fn pmu_num_counters() -> u32 {
        crate::pmu::num_counters()
    }

    fn is_protected_mode() -> bool {
        cfg!(feature = "protected-mode")
    }
}

// =============================================================================
// Mock Implementation (test environment or no axhal)
// =============================================================================

/// Mock CPU ID for testing.
static MOCK_CPU_ID: AtomicU32 = AtomicU32::new(0);

/// Mock counter count. Six matches a Cortex-A PMUv3 implementation.
static MOCK_NUM_COUNTERS: AtomicU32 = AtomicU32::new(6);

/// Mock protected-mode state.
static MOCK_PROTECTED_MODE: AtomicBool = AtomicBool::new(cfg!(feature = "protected-mode"));

/// Mock platform operations for testing.
#[cfg(any(test, not(feature = "axhal")))]
pub struct MockPlatform;

#[cfg(any(test, not(feature = "axhal")))]
impl PlatformOps for MockPlatform {
    fn cpu_id() -> u32 {
        MOCK_CPU_ID.load(Ordering::Relaxed)
    }

    fn pmu_num_counters() -> u32 {
        MOCK_NUM_COUNTERS.load(Ordering::Relaxed)
    }

    fn is_protected_mode() -> bool {
        MOCK_PROTECTED_MODE.load(Ordering::Relaxed)
    }
}

/// Set mock CPU ID for testing.
pub fn set_mock_cpu_id(id: u32) {
    MOCK_CPU_ID.store(id, Ordering::Relaxed);
}

/// Set the mock hardware counter count.
pub fn set_mock_num_counters(count: u32) {
    MOCK_NUM_COUNTERS.store(count, Ordering::Relaxed);
}

/// Set the mock protected-mode state.
pub fn set_mock_protected_mode(enabled: bool) {
    MOCK_PROTECTED_MODE.store(enabled, Ordering::Relaxed);
}

// =============================================================================
// Platform Type Alias
// =============================================================================

/// The active platform implementation.
///
/// In kernel environment with axhal: RealPlatform (uses axhal and PMU registers)
/// In test environment or without axhal: MockPlatform (uses atomic counters)
#[cfg(all(not(test), feature = "axhal"))]
pub type Platform = RealPlatform;

#[cfg(any(test, not(feature = "axhal")))]
pub type Platform = MockPlatform;

// =============================================================================
// Convenience Functions
// =============================================================================

/// Get current CPU ID.
#[inline]
pub fn cpu_id() -> u32 {
    Platform::cpu_id()
}

/// Get the number of hardware performance counters.
#[inline]
pub fn pmu_num_counters() -> u32 {
    Platform::pmu_num_counters()
}

/// Check whether protected (isolated) virtualization mode is active.
#[inline]
pub fn is_protected_mode() -> bool {
    Platform::is_protected_mode()
}

// =============================================================================
// Tests
// =============================================================================
