//! Freestanding kernel core: device/driver/resource plane, the three
//! NIC drivers plus VirtIO entropy, the wire-protocol stack, and the
//! bundled diagnostic apps, wired together by [`kernel_main`].

#![no_std]
#![cfg_attr(target_arch = "x86_64", feature(abi_x86_interrupt))]

#[cfg(test)]
extern crate std;

use core::panic::PanicInfo;

pub mod apps;
pub mod arch;
pub mod devices;
pub mod drivers;
pub mod error;
pub mod fdt;
pub mod log_service;
pub mod net;

use devices::DeviceRegistry;
use drivers::resource::ResourceManager;

#[cfg(not(test))]
#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    arch::puts("[PANIC] ");
    if let Some(location) = info.location() {
        arch::puts(location.file());
        arch::puts(":");
        let mut digits = [0u8; 10];
        let n = net::write_decimal(location.line(), &mut digits);
        arch::puts(core::str::from_utf8(&digits[..n]).unwrap_or(""));
    }
    arch::puts("\n");
    arch::halt();
}

/// Discovers every device the platform's bus enumerator can find. PCI
/// on x86_64 (the VMM exposes a real ECAM or legacy config space),
/// virtio-mmio's fixed QEMU `virt` slot layout everywhere else.
fn enumerate_devices(registry: &mut DeviceRegistry) {
    #[cfg(target_arch = "x86_64")]
    {
        devices::pci::enumerate(registry);
    }
    #[cfg(not(target_arch = "x86_64"))]
    {
        devices::virtio_mmio::enumerate(
            registry,
            devices::virtio_mmio::DEFAULT_BASE,
            devices::virtio_mmio::DEFAULT_STRIDE,
            devices::virtio_mmio::DEFAULT_COUNT,
        );
    }
    registry.build_tree();
}

/// Bring-up sequence: log service, trap handler, device enumeration,
/// then a single left-to-right pass over the command line applying
/// `log=`/`log.<tag>=` and `app=<name>` tokens in the order they
/// appear, ignoring anything neither recognizes. Never returns.
///
/// `boot_param` is the architecture-specific boot pointer the entry
/// stub in `main.rs` forwards unexamined: a Multiboot2 info address on
/// x86_64, the flattened device tree's physical address elsewhere.
pub fn kernel_main(boot_param: usize) -> ! {
    log_service::init();
    arch::install_trap_handler();

    let mut registry = DeviceRegistry::new();
    let mut resources = ResourceManager::new();
    enumerate_devices(&mut registry);
    registry.print_tree();

    if let Some(cmdline) = arch::cmdline(boot_param) {
        for token in cmdline.split_whitespace() {
            if log_service::apply_cmdline_token(token) {
                continue;
            }
            apps::apply_cmdline_token(token, &mut registry, &mut resources);
        }
    }

    arch::halt();
}
