//! AArch64 PMU discovery.
//!
//! Reads the debug feature register and the PMU control register to find
//! out how many event counters this CPU implements.

/// `ID_AA64DFR0_EL1.PMUVer` field shift.
const DFR0_PMUVER_SHIFT: u64 = 8;

/// `ID_AA64DFR0_EL1.PMUVer` field mask (after shifting).
const DFR0_PMUVER_MASK: u64 = 0xf;

/// `PMUVer` value for an IMPLEMENTATION DEFINED, non-architected PMU.
const PMUVER_IMP_DEF: u64 = 0xf;

/// `PMCR_EL0.N` field shift.
const PMCR_N_SHIFT: u64 = 11;

/// `PMCR_EL0.N` field mask (after shifting).
const PMCR_N_MASK: u64 = 0x1f;

/// Whether `ID_AA64DFR0_EL1` advertises an architected PMUv3.
pub fn pmuv3_implemented(dfr0: u64) -> bool {
    let pmuver = (dfr0 >> DFR0_PMUVER_SHIFT) & DFR0_PMUVER_MASK;
    pmuver != 0 && pmuver != PMUVER_IMP_DEF
}

/// Number of event counters encoded in `PMCR_EL0`.
pub fn pmcr_num_counters(pmcr: u64) -> u32 {
    ((pmcr >> PMCR_N_SHIFT) & PMCR_N_MASK) as u32
}

/// Counter count from raw register values.
///
/// `PMCR_EL0` is only meaningful when the feature register says a PMUv3
/// exists, so `pmcr` is ignored otherwise.
pub fn counters_from_regs(dfr0: u64, pmcr: u64) -> u32 {
    if pmuv3_implemented(dfr0) {
        pmcr_num_counters(pmcr)
    } else {
        0
    }
}

/// Probe the current CPU for its event counter count.
///
/// Returns 0 on architectures without PMUv3 support.
#[cfg(target_arch = "aarch64")]
pub fn num_counters() -> u32 {
    let dfr0: u64;
    unsafe {
        core::arch::asm!("mrs {}, id_aa64dfr0_el1", out(reg) dfr0);
    }
    if !pmuv3_implemented(dfr0) {
        debug!("PMUv3 not implemented (ID_AA64DFR0_EL1={:#x})", dfr0);
        return 0;
    }

    let pmcr: u64;
    unsafe {
        core::arch::asm!("mrs {}, pmcr_el0", out(reg) pmcr);
    }
    pmcr_num_counters(pmcr)
}

#[cfg(not(target_arch = "aarch64"))]
pub fn num_counters() -> u32 {
    0
}
