//! Random-byte generation, with or without a hardware entropy device.
//! Grounded on `original_source/apps/random/random.{h,c}`: the header's
//! contract is that software fallback is "always available, no init
//! required," which is exactly [`virtio::rng::VirtioRngContext::fill`]'s
//! behavior, so both app modes end up sharing the same context.

use crate::devices::DeviceRegistry;
use crate::drivers::resource::ResourceManager;
use crate::drivers::virtio;

static mut RNG_CONTEXT: virtio::rng::VirtioRngContext = virtio::rng::VirtioRngContext::new();
static mut RNG_BOUND: bool = false;

/// `random-software`: generate bytes without ever touching a device.
/// The xorshift fallback needs no `bring_up`, so this just calls
/// `fill` on an unbound context.
pub fn run_software() {
    crate::arch::puts("[random] generating bytes from the software PRNG...\n");
    let mut buf = [0u8; 16];
    // SAFETY: single-threaded app dispatch, see `netdev::acquire_one`.
    let result = unsafe { RNG_CONTEXT.fill(&mut buf) };
    print_result(&buf, result);
}

/// `random-hardware`: try to acquire the VirtIO entropy device first;
/// falls back to software transparently either way, matching
/// `random_hardware_init` being merely "optional."
pub fn run_hardware(registry: &mut DeviceRegistry, resources: &mut ResourceManager) {
    crate::arch::puts("[random] acquiring hardware entropy device...\n");
    // SAFETY: single-threaded app dispatch.
    unsafe {
        if !RNG_BOUND {
            let ctx = core::ptr::addr_of_mut!(RNG_CONTEXT);
            if resources
                .acquire_available(registry, &virtio::rng::DRIVER, ctx as *mut ())
                .is_ok()
            {
                RNG_BOUND = true;
            } else {
                crate::arch::puts("[random] no hardware RNG found, using software fallback\n");
            }
        }
        let mut buf = [0u8; 16];
        let result = RNG_CONTEXT.fill(&mut buf);
        print_result(&buf, result);
    }
}

fn print_result(buf: &[u8], result: crate::error::KResult<()>) {
    if result.is_err() {
        crate::arch::puts("[random] failed to generate bytes\n");
        return;
    }
    crate::arch::puts("[random] bytes: ");
    for b in buf {
        crate::arch::put_hex8(*b);
    }
    crate::arch::puts("\n");
}
