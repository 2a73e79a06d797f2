//! Driver descriptor and ID-table matcher. A driver is a pure,
//! `'static` data value — there is no global mutable driver list. Each
//! driver module publishes a single constant descriptor via a getter
//! function, and the caller hands that descriptor directly to the
//! resource manager. This inverts the classic "register everything,
//! probe everything" model; see `SPEC_FULL.md` §4.5 / DESIGN.md.

pub mod e1000;
pub mod resource;
pub mod rtl8139;
pub mod virtio;

use crate::devices::Device;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverType {
    Network,
    Storage,
    Display,
    Input,
    Random,
    Unknown,
}

/// One entry in a driver's ID table. A device matches an entry if
/// either its `compatible` string equals the entry's (when both are
/// present), or its `(vendor_id, device_id)` pair equals the entry's
/// (when both are non-zero).
#[derive(Clone, Copy)]
pub struct IdEntry {
    pub compatible: Option<&'static str>,
    pub vendor_id: u16,
    pub device_id: u16,
}

/// Immutable driver descriptor. Context is passed as an untyped raw
/// pointer: the caller owns the backing storage (typically a `static`
/// array of per-instance contexts) and the driver's hooks know the real
/// type — mirroring the source's `void *ctx` out-parameter convention,
/// which the target language expresses as a lifetime relationship
/// (the resource handle borrows the context for as long as it lives).
pub struct Driver {
    pub name: &'static str,
    pub version: &'static str,
    pub kind: DriverType,
    pub id_table: &'static [IdEntry],
    pub init_context: fn(ctx: *mut (), device: &mut Device) -> i32,
    pub deinit_context: fn(ctx: *mut ()),
}

impl Driver {
    pub fn matches(&self, device: &Device) -> bool {
        for entry in self.id_table {
            if let (Some(entry_compat), Some(dev_compat)) = (entry.compatible, device.compatible) {
                if entry_compat == dev_compat {
                    return true;
                }
            }
            if entry.vendor_id != 0
                && entry.device_id != 0
                && entry.vendor_id == device.vendor_id
                && entry.device_id == device.device_id
            {
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::DeviceState;

    fn device(compatible: Option<&'static str>, vendor: u16, device_id: u16) -> Device {
        Device {
            compatible,
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

    fn noop_init(_ctx: *mut (), _dev: &mut Device) -> i32 {
        0
    }
    fn noop_deinit(_ctx: *mut ()) {}

    #[test]
    fn matches_by_compatible_string() {
        static TABLE: &[IdEntry] = &[IdEntry {
            compatible: Some("virtio,net"),
            vendor_id: 0,
            device_id: 0,
        }];
        let driver = Driver {
            name: "virtio-net",
            version: "0.1.0",
            kind: DriverType::Network,
            id_table: TABLE,
            init_context: noop_init,
            deinit_context: noop_deinit,
        };
        assert!(driver.matches(&device(Some("virtio,net"), 0, 0)));
        assert!(!driver.matches(&device(Some("virtio,blk"), 0, 0)));
    }

    #[test]
    fn matches_by_vendor_and_device_id() {
        static TABLE: &[IdEntry] = &[IdEntry {
            compatible: None,
            vendor_id: 0x8086,
            device_id: 0x100e,
        }];
        let driver = Driver {
            name: "e1000",
            version: "0.1.0",
            kind: DriverType::Network,
            id_table: TABLE,
            init_context: noop_init,
            deinit_context: noop_deinit,
        };
        assert!(driver.matches(&device(None, 0x8086, 0x100e)));
        assert!(!driver.matches(&device(None, 0x8086, 0x1000)));
    }
}
