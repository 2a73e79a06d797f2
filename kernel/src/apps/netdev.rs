//! Driver-agnostic network device handle: acquires whichever of the
//! three NIC drivers matches, in the same rtl8139-then-virtio-then-e1000
//! probe order as `original_source/apps/netdev-mac/netdev.c`'s
//! `netdev_acquire_all`, and dispatches MAC/transmit/receive to
//! whichever one actually bound. The original leaves `netdev_transmit`/
//! `netdev_receive` as TODOs for e1000 and rtl8139; since this port's
//! drivers for those two are complete, the dispatch here is too.

use crate::devices::DeviceRegistry;
use crate::drivers::resource::{ResourceHandle, ResourceManager};
use crate::drivers::{e1000, rtl8139, virtio};
use crate::error::KResult;

/// How many simultaneous instances of each driver this app layer can
/// hold open at once. The original source tracks up to 12 per driver
/// in its generic `netdev_acquire_all`; this port uses a smaller pool
/// since each Rust context embeds its own packet buffers inline rather
/// than pointing at a shared heap arena.
pub const MAX_NET_DEVICES: usize = 4;

static mut RTL8139_POOL: [rtl8139::Rtl8139Context; MAX_NET_DEVICES] =
    [const { rtl8139::Rtl8139Context::new() }; MAX_NET_DEVICES];
static mut VIRTIO_NET_POOL: [virtio::net::VirtioNetContext; MAX_NET_DEVICES] =
    [const { virtio::net::VirtioNetContext::new() }; MAX_NET_DEVICES];
static mut E1000_POOL: [e1000::E1000Context; MAX_NET_DEVICES] =
    [const { e1000::E1000Context::new() }; MAX_NET_DEVICES];

static mut RTL8139_NEXT: usize = 0;
static mut VIRTIO_NET_NEXT: usize = 0;
static mut E1000_NEXT: usize = 0;

/// A bound network device. Holds the raw context pointer the matching
/// driver's `init_context` already populated via `bring_up`, plus the
/// resource handle proving exclusive ownership.
pub enum NetDevice {
    Rtl8139(*mut rtl8139::Rtl8139Context),
    VirtioNet(*mut virtio::net::VirtioNetContext),
    E1000(*mut e1000::E1000Context),
}

impl NetDevice {
    pub fn mac(&self) -> [u8; 6] {
        match *self {
            // SAFETY: the pointer was handed out by `acquire_one` from a
            // `'static` pool slot reserved exclusively for this handle's
            // lifetime by the resource manager.
            NetDevice::Rtl8139(p) => unsafe { (*p).mac() },
            NetDevice::VirtioNet(p) => unsafe { (*p).mac() },
            NetDevice::E1000(p) => unsafe { (*p).mac() },
        }
    }

    pub fn transmit(&self, payload: &[u8]) -> KResult<()> {
        match *self {
            // SAFETY: see `mac`.
            NetDevice::Rtl8139(p) => unsafe { (*p).transmit(payload) },
            NetDevice::VirtioNet(p) => unsafe { (*p).transmit(payload) },
            NetDevice::E1000(p) => unsafe { (*p).transmit(payload) },
        }
    }

    pub fn receive(&self, out: &mut [u8]) -> KResult<usize> {
        match *self {
            // SAFETY: see `mac`.
            NetDevice::Rtl8139(p) => unsafe { (*p).receive(out) },
            NetDevice::VirtioNet(p) => unsafe { (*p).receive(out) },
            NetDevice::E1000(p) => unsafe { (*p).receive(out) },
        }
    }
}

/// Tries to acquire one more device of each driver family in turn
/// (rtl8139, then virtio-net, then e1000), returning the first that
/// matches an unallocated device. `None` once every pool is either
/// full or no matching device remains.
fn acquire_one(
    registry: &mut DeviceRegistry,
    resources: &mut ResourceManager,
) -> Option<(ResourceHandle, NetDevice)> {
    // SAFETY: single-threaded cooperative app dispatch; no interrupts
    // are enabled while apps run, so these static pools are never
    // accessed concurrently.
    unsafe {
        if RTL8139_NEXT < MAX_NET_DEVICES {
            let ctx = &mut RTL8139_POOL[RTL8139_NEXT] as *mut rtl8139::Rtl8139Context;
            if let Ok(handle) =
                resources.acquire_available(registry, &rtl8139::DRIVER, ctx as *mut ())
            {
                RTL8139_NEXT += 1;
                return Some((handle, NetDevice::Rtl8139(ctx)));
            }
        }
        if VIRTIO_NET_NEXT < MAX_NET_DEVICES {
            let ctx = &mut VIRTIO_NET_POOL[VIRTIO_NET_NEXT] as *mut virtio::net::VirtioNetContext;
            if let Ok(handle) =
                resources.acquire_available(registry, &virtio::net::DRIVER, ctx as *mut ())
            {
                VIRTIO_NET_NEXT += 1;
                return Some((handle, NetDevice::VirtioNet(ctx)));
            }
        }
        if E1000_NEXT < MAX_NET_DEVICES {
            let ctx = &mut E1000_POOL[E1000_NEXT] as *mut e1000::E1000Context;
            if let Ok(handle) = resources.acquire_available(registry, &e1000::DRIVER, ctx as *mut ())
            {
                E1000_NEXT += 1;
                return Some((handle, NetDevice::E1000(ctx)));
            }
        }
    }
    None
}

/// Fills `out` with up to `out.len()` acquired network devices,
/// returning how many were found.
pub fn acquire_all(
    registry: &mut DeviceRegistry,
    resources: &mut ResourceManager,
    out: &mut [Option<(ResourceHandle, NetDevice)>],
) -> usize {
    let mut count = 0;
    while count < out.len() {
        match acquire_one(registry, resources) {
            Some(found) => {
                out[count] = Some(found);
                count += 1;
            }
            None => break,
        }
    }
    count
}
