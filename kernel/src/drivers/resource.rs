//! Resource manager: the gatekeeper. `acquire_available` walks the
//! device list for the first unallocated device matching a driver's ID
//! table, reserves a slot in the static pool, and calls
//! `init_context`. `release` is the inverse. Grounded directly on the
//! original `resources.c`'s pool/allocations-list design, adapted to
//! borrow a `DeviceRegistry` instead of a raw device linked list.

use super::Driver;
use crate::devices::DeviceRegistry;
use crate::error::{KResult, KernelError};

pub const MAX_RESOURCE_ALLOCATIONS: usize = 16;

struct Slot {
    in_use: bool,
    device_idx: usize,
    driver: Option<&'static Driver>,
    context: *mut (),
}

impl Slot {
    const fn empty() -> Self {
        Slot {
            in_use: false,
            device_idx: 0,
            driver: None,
            context: core::ptr::null_mut(),
        }
    }
}

/// Opaque handle proving exclusive possession of a device. Indexes into
/// the resource manager's static pool.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct ResourceHandle(usize);

pub struct ResourceManager {
    pool: [Slot; MAX_RESOURCE_ALLOCATIONS],
}

impl ResourceManager {
    pub const fn new() -> Self {
        ResourceManager {
            pool: [const { Slot::empty() }; MAX_RESOURCE_ALLOCATIONS],
        }
    }

    fn device_is_allocated(&self, device_idx: usize) -> bool {
        self.pool.iter().any(|s| s.in_use && s.device_idx == device_idx)
    }

    fn alloc_slot(&mut self) -> Option<usize> {
        self.pool.iter().position(|s| !s.in_use).map(|i| {
            self.pool[i].in_use = true;
            i
        })
    }

    /// Finds the first unallocated device matching `driver`'s ID table,
    /// calls `driver.init_context(context, device)`, and on success
    /// returns a handle. On `init_context` failure the candidate is
    /// treated as a non-match and the next device is tried — never
    /// surfaced as an error until every candidate is exhausted.
    pub fn acquire_available(
        &mut self,
        registry: &mut DeviceRegistry,
        driver: &'static Driver,
        context: *mut (),
    ) -> KResult<ResourceHandle> {
        let mut cursor = registry.first();
        while let Some(idx) = cursor {
            cursor = registry.next(idx);

            let matches = match registry.get(idx) {
                Some(dev) => driver.matches(dev),
                None => false,
            };
            if !matches || self.device_is_allocated(idx) {
                continue;
            }

            let Some(slot_idx) = self.alloc_slot() else {
                return Err(KernelError::ResourceExhausted);
            };

            let init_result = {
                let Some(dev) = registry.get_mut(idx) else {
                    self.pool[slot_idx] = Slot::empty();
                    continue;
                };
                (driver.init_context)(context, dev)
            };

            if init_result != 0 {
                self.pool[slot_idx] = Slot::empty();
                continue;
            }

            self.pool[slot_idx].device_idx = idx;
            self.pool[slot_idx].driver = Some(driver);
            self.pool[slot_idx].context = context;
            registry.set_driver(idx, driver.name, driver.version);

            return Ok(ResourceHandle(slot_idx));
        }

        Err(KernelError::Configuration("no matching unallocated device"))
    }

    pub fn release(&mut self, registry: &mut DeviceRegistry, handle: ResourceHandle) {
        let slot = &mut self.pool[handle.0];
        if !slot.in_use {
            return;
        }
        if let Some(driver) = slot.driver {
            (driver.deinit_context)(slot.context);
        }
        registry.unmap_mmio(slot.device_idx);
        registry.clear_driver(slot.device_idx);
        *slot = Slot::empty();
    }

    pub fn device_index(&self, handle: ResourceHandle) -> Option<usize> {
        let slot = &self.pool[handle.0];
        slot.in_use.then_some(slot.device_idx)
    }

    /// Produces the `"[bus:dev|driver@version]"` tag used by logging
    /// throughout the core.
    pub fn print_tag(&self, registry: &DeviceRegistry, handle: ResourceHandle) {
        let slot = &self.pool[handle.0];
        if !slot.in_use {
            return;
        }
        let Some(driver) = slot.driver else { return };
        let Some(dev) = registry.get(slot.device_idx) else {
            return;
        };
        crate::arch::puts("[");
        crate::arch::put_hex8(dev.bus);
        crate::arch::puts(":");
        crate::arch::put_hex8(dev.device_num);
        crate::arch::puts("|");
        crate::arch::puts(driver.name);
        crate::arch::puts("@");
        crate::arch::puts(driver.version);
        crate::arch::puts("]");
    }
}

impl Default for ResourceManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::{Device, DeviceState};
    use crate::drivers::{DriverType, IdEntry};

    fn test_device(vendor: u16, device_id: u16) -> Device {
        Device {
            compatible: None,
            name: None,
            reg_base: 0,
            reg_size: 0,
            vendor_id: vendor,
            device_id,
            bus: 0,
            device_num: 0,
            function: 0,
            state: DeviceState::Discovered,
            driver_name: None,
            driver_version: None,
            parent: None,
            first_child: None,
            next_sibling: None,
            depth: 0,
            next: None,
        }
    }

    fn ok_init(_ctx: *mut (), _dev: &mut Device) -> i32 {
        0
    }
    fn noop_deinit(_ctx: *mut ()) {}

    static TEST_TABLE: &[IdEntry] = &[IdEntry {
        compatible: None,
        vendor_id: 0x1234,
        device_id: 0x5678,
    }];

    static TEST_DRIVER: Driver = Driver {
        name: "test-driver",
        version: "0.1.0",
        kind: DriverType::Unknown,
        id_table: TEST_TABLE,
        init_context: ok_init,
        deinit_context: noop_deinit,
    };

    #[test]
    fn release_unbinds_the_device() {
        let mut registry = DeviceRegistry::new();
        registry.push(test_device(0x1234, 0x5678));
        let mut mgr = ResourceManager::new();

        let handle = mgr
            .acquire_available(&mut registry, &TEST_DRIVER, core::ptr::null_mut())
            .expect("acquire succeeds");
        let idx = mgr.device_index(handle).unwrap();
        assert_eq!(registry.get(idx).unwrap().state, DeviceState::Bound);

        mgr.release(&mut registry, handle);

        let dev = registry.get(idx).unwrap();
        assert_eq!(dev.state, DeviceState::Discovered);
        assert!(dev.driver_name.is_none());
        assert!(dev.driver_version.is_none());
    }

    #[test]
    fn acquire_then_second_acquire_fails_then_release_then_reacquire_succeeds() {
        let mut registry = DeviceRegistry::new();
        registry.push(test_device(0x1234, 0x5678));
        let mut mgr = ResourceManager::new();

        let h1 = mgr
            .acquire_available(&mut registry, &TEST_DRIVER, core::ptr::null_mut())
            .expect("first acquire succeeds");

        let second = mgr.acquire_available(&mut registry, &TEST_DRIVER, core::ptr::null_mut());
        assert!(second.is_err());

        mgr.release(&mut registry, h1);

        let h3 = mgr.acquire_available(&mut registry, &TEST_DRIVER, core::ptr::null_mut());
        assert!(h3.is_ok());
    }

    #[test]
    fn pool_exhaustion_returns_resource_exhausted() {
        let mut registry = DeviceRegistry::new();
        for _ in 0..(MAX_RESOURCE_ALLOCATIONS + 1) {
            registry.push(test_device(0x1234, 0x5678));
        }
        let mut mgr = ResourceManager::new();
        for _ in 0..MAX_RESOURCE_ALLOCATIONS {
            assert!(mgr
                .acquire_available(&mut registry, &TEST_DRIVER, core::ptr::null_mut())
                .is_ok());
        }
        let overflow = mgr.acquire_available(&mut registry, &TEST_DRIVER, core::ptr::null_mut());
        assert_eq!(overflow, Err(KernelError::ResourceExhausted));
    }
}
