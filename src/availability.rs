//! Guest PMU availability flag.
//!
//! A process-wide flag telling other subsystems whether guest-aware
//! hardware performance counters can be used. It is computed once by
//! [`crate::init`] and read on every sampling interrupt, so reading it
//! is a single relaxed load (or a patched branch with `static-key`).

use core::sync::atomic::{AtomicU8, Ordering};

use crate::platform;

/// Availability of guest-aware performance counters.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    /// Not computed yet.
    Unknown = 0,
    /// No counters, or protected mode denies host access to them.
    Disabled = 1,
    /// Counters exist and the host may use them for guests.
    Enabled = 2,
}

impl Availability {
    fn from_raw(raw: u8) -> Self {
        match raw {
            1 => Availability::Disabled,
            2 => Availability::Enabled,
            _ => Availability::Unknown,
        }
    }

    /// Short label for display.
    pub fn label(&self) -> &'static str {
        match self {
            Availability::Unknown => "unknown",
            Availability::Disabled => "disabled",
            Availability::Enabled => "enabled",
        }
    }
}

static GUEST_PMU_AVAILABLE: AtomicU8 = AtomicU8::new(Availability::Unknown as u8);

#[cfg(feature = "static-key")]
static_keys::define_static_key_false!(GUEST_PMU_KEY);

/// Decide availability from host capabilities.
///
/// Never fails: missing hardware or isolation both yield `Disabled`.
pub fn evaluate(num_counters: u32, protected_mode: bool) -> Availability {
    if num_counters > 0 && !protected_mode {
        Availability::Enabled
    } else {
        Availability::Disabled
    }
}

/// Probe host capabilities and publish the result.
pub fn compute_availability() -> Availability {
    let num_counters = platform::pmu_num_counters();
    let protected_mode = platform::is_protected_mode();
    let result = evaluate(num_counters, protected_mode);

    debug!(
        "guest PMU: {} counters, protected mode {}, availability {}",
        num_counters,
        if protected_mode { "on" } else { "off" },
        result.label()
    );

    publish(result);
    result
}

fn publish(value: Availability) {
    GUEST_PMU_AVAILABLE.store(value as u8, Ordering::Relaxed);

    #[cfg(feature = "static-key")]
    {
        // Keys must not be patched before the jump table is sorted; this is
        // a no-op once done.
        static_keys::global_init();
        set_static_key(value);
    }
}

#[cfg(feature = "static-key")]
fn set_static_key(value: Availability) {
    // Callers serialize init, and `global_init` has run.
    unsafe {
        match value {
            Availability::Enabled => GUEST_PMU_KEY.enable(),
            _ => GUEST_PMU_KEY.disable(),
        }
    }
}

/// Current availability, including whether it has been computed.
pub fn availability() -> Availability {
    Availability::from_raw(GUEST_PMU_AVAILABLE.load(Ordering::Relaxed))
}

/// Fast check for the sampling path.
#[cfg(not(feature = "static-key"))]
#[inline(always)]
pub fn is_available() -> bool {
    GUEST_PMU_AVAILABLE.load(Ordering::Relaxed) == Availability::Enabled as u8
}

/// Fast check for the sampling path.
#[cfg(feature = "static-key")]
#[inline(always)]
pub fn is_available() -> bool {
    static_keys::static_branch_unlikely!(GUEST_PMU_KEY)
}

/// Return the flag to its uncomputed state.
#[cfg(feature = "test-utils")]
pub fn reset_for_test() {
    publish(Availability::Unknown);
}
