//! Prints the MAC address of one specific driver family, or of every
//! network device the kernel can find. Grounded on
//! `original_source/apps/netdev-mac/mac_{virtio_net,e1000,rtl8139,all}.c`.

use super::netdev::{self, NetDevice, MAX_NET_DEVICES};
use crate::devices::DeviceRegistry;
use crate::drivers::resource::ResourceManager;
use crate::drivers::{e1000, rtl8139, virtio};

fn print_mac_line(label: &str, mac: Option<[u8; 6]>) {
    crate::arch::puts("[");
    crate::arch::puts(label);
    crate::arch::puts("] MAC: ");
    match mac {
        Some(mac) => crate::net::print_mac(mac),
        None => crate::arch::puts("(unavailable)"),
    }
    crate::arch::puts("\n");
}

static mut RTL8139_SOLO: [rtl8139::Rtl8139Context; MAX_NET_DEVICES] =
    [const { rtl8139::Rtl8139Context::new() }; MAX_NET_DEVICES];
static mut VIRTIO_NET_SOLO: [virtio::net::VirtioNetContext; MAX_NET_DEVICES] =
    [const { virtio::net::VirtioNetContext::new() }; MAX_NET_DEVICES];
static mut E1000_SOLO: [e1000::E1000Context; MAX_NET_DEVICES] =
    [const { e1000::E1000Context::new() }; MAX_NET_DEVICES];
static mut RTL8139_SOLO_NEXT: usize = 0;
static mut VIRTIO_NET_SOLO_NEXT: usize = 0;
static mut E1000_SOLO_NEXT: usize = 0;

pub fn run_virtio_net(registry: &mut DeviceRegistry, resources: &mut ResourceManager) {
    // SAFETY: single-threaded app dispatch, see `netdev::acquire_one`.
    unsafe {
        if VIRTIO_NET_SOLO_NEXT >= MAX_NET_DEVICES {
            crate::arch::puts("[virtio-net] maximum number of devices reached\n");
            return;
        }
        let ctx = &mut VIRTIO_NET_SOLO[VIRTIO_NET_SOLO_NEXT];
        match resources.acquire_available(registry, &virtio::net::DRIVER, ctx as *mut _ as *mut ()) {
            Ok(_) => {
                VIRTIO_NET_SOLO_NEXT += 1;
                print_mac_line("virtio-net", Some(ctx.mac()));
            }
            Err(_) => crate::arch::puts("[virtio-net] no available device\n"),
        }
    }
}

pub fn run_e1000(registry: &mut DeviceRegistry, resources: &mut ResourceManager) {
    // SAFETY: single-threaded app dispatch, see `netdev::acquire_one`.
    unsafe {
        if E1000_SOLO_NEXT >= MAX_NET_DEVICES {
            crate::arch::puts("[e1000] maximum number of devices reached\n");
            return;
        }
        let ctx = &mut E1000_SOLO[E1000_SOLO_NEXT];
        match resources.acquire_available(registry, &e1000::DRIVER, ctx as *mut _ as *mut ()) {
            Ok(_) => {
                E1000_SOLO_NEXT += 1;
                print_mac_line("e1000", Some(ctx.mac()));
            }
            Err(_) => crate::arch::puts("[e1000] no available device\n"),
        }
    }
}

pub fn run_rtl8139(registry: &mut DeviceRegistry, resources: &mut ResourceManager) {
    // SAFETY: single-threaded app dispatch, see `netdev::acquire_one`.
    unsafe {
        if RTL8139_SOLO_NEXT >= MAX_NET_DEVICES {
            crate::arch::puts("[rtl8139] maximum number of devices reached\n");
            return;
        }
        let ctx = &mut RTL8139_SOLO[RTL8139_SOLO_NEXT];
        match resources.acquire_available(registry, &rtl8139::DRIVER, ctx as *mut _ as *mut ()) {
            Ok(_) => {
                RTL8139_SOLO_NEXT += 1;
                print_mac_line("rtl8139", Some(ctx.mac()));
            }
            Err(_) => crate::arch::puts("[rtl8139] no available device\n"),
        }
    }
}

pub fn run_all(registry: &mut DeviceRegistry, resources: &mut ResourceManager) {
    let mut devices: [Option<(crate::drivers::resource::ResourceHandle, NetDevice)>; 12] =
        [const { None }; 12];
    let count = netdev::acquire_all(registry, resources, &mut devices);
    for slot in devices.iter().take(count) {
        let Some((handle, device)) = slot else { continue };
        resources.print_tag(registry, *handle);
        crate::arch::puts(" Initializing...\n");
        resources.print_tag(registry, *handle);
        crate::arch::puts(" MAC: ");
        crate::net::print_mac(device.mac());
        crate::arch::puts("\n");
    }
}
