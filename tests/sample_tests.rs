//! Integration tests for profiler sample classification.
//!
//! Tests origin and instruction pointer selection through the registered
//! guest-info callbacks.

use core::marker::PhantomData;

use axperf::percpu::RUNNING_VCPUS;
use axperf::platform::set_mock_cpu_id;
use axperf::sample::{SampleOrigin, instruction_pointer, misc_flags};
use axperf::{GuestCpuContext, vcpu_load, vcpu_put};
use spin::Mutex;

/// Registration, the running vCPU table and the mock platform are global.
static TEST_LOCK: Mutex<()> = Mutex::new(());

const HOST_IP: u64 = 0xffff_0000_8010_0000;

/// A context published on one CPU; the slot is cleared on drop, so a
/// failed assertion never leaves a stale pointer in the global table.
struct LoadedVcpu<'a> {
    cpu: usize,
    _ctx: PhantomData<&'a GuestCpuContext>,
}

impl<'a> LoadedVcpu<'a> {
    fn on(cpu: u32, ctx: &'a GuestCpuContext) -> Self {
        set_mock_cpu_id(cpu);
        unsafe { vcpu_load(ctx) };
        Self {
            cpu: cpu as usize,
            _ctx: PhantomData,
        }
    }
}

impl Drop for LoadedVcpu<'_> {
    fn drop(&mut self) {
        RUNNING_VCPUS.clear(self.cpu);
    }
}

fn with_provider<F: FnOnce()>(f: F) {
    let _ = axperf::teardown();
    axperf::init().unwrap();
    f();
    axperf::teardown().unwrap();
}

// =============================================================================
// No Provider Tests
// =============================================================================

#[test]
fn test_without_provider_uses_host_state() {
    let _guard = TEST_LOCK.lock();
    let _ = axperf::teardown();

    let ctx = GuestCpuContext::new(0xABCD_0000, 0x0);
    let _loaded = LoadedVcpu::on(0, &ctx);

    // The guest is running but nobody registered to say so.
    assert_eq!(misc_flags(false), SampleOrigin::HostKernel);
    assert_eq!(misc_flags(true), SampleOrigin::HostUser);
    assert_eq!(instruction_pointer(HOST_IP), HOST_IP);
}

// =============================================================================
// Provider Tests
// =============================================================================

#[test]
fn test_host_sample_with_provider() {
    let _guard = TEST_LOCK.lock();
    set_mock_cpu_id(0);
    vcpu_put();

    with_provider(|| {
        assert_eq!(misc_flags(false), SampleOrigin::HostKernel);
        assert_eq!(misc_flags(true), SampleOrigin::HostUser);
        assert_eq!(instruction_pointer(HOST_IP), HOST_IP);
    });
}

#[test]
fn test_guest_user_sample() {
    let _guard = TEST_LOCK.lock();

    with_provider(|| {
        let ctx = GuestCpuContext::new(0xABCD_0000, 0x0);
        let _loaded = LoadedVcpu::on(1, &ctx);

        // Host privilege is irrelevant inside a guest.
        assert_eq!(misc_flags(false), SampleOrigin::GuestUser);
        assert_eq!(misc_flags(true), SampleOrigin::GuestUser);
        assert_eq!(instruction_pointer(HOST_IP), 0xABCD_0000);
    });
}

#[test]
fn test_guest_kernel_sample() {
    let _guard = TEST_LOCK.lock();

    with_provider(|| {
        let ctx = GuestCpuContext::new(0xffff_8000_1000_0000, 0x3c5);
        let _loaded = LoadedVcpu::on(1, &ctx);

        assert_eq!(misc_flags(false), SampleOrigin::GuestKernel);
        assert_eq!(instruction_pointer(HOST_IP), 0xffff_8000_1000_0000);
    });
}

#[test]
fn test_guest_on_other_cpu_is_host_sample() {
    let _guard = TEST_LOCK.lock();

    with_provider(|| {
        let ctx = GuestCpuContext::new(0x40_2000, 0x0);
        let _loaded = LoadedVcpu::on(2, &ctx);

        set_mock_cpu_id(3);
        assert_eq!(misc_flags(true), SampleOrigin::HostUser);
        assert_eq!(instruction_pointer(HOST_IP), HOST_IP);
    });
}
