//! Broadcasts an ARP request from the first acquired device and listens
//! for replies on every other acquired device. Grounded on
//! `original_source/apps/arp-broadcast/arp_broadcast.c`.

use super::netdev::{self, NetDevice};
use crate::devices::DeviceRegistry;
use crate::drivers::resource::{ResourceHandle, ResourceManager};
use crate::net::arp;

const SENDER_IP: u32 = 0x0A000201; // 10.0.2.1
const TARGET_IP: u32 = 0x0A00020F; // 10.0.2.15
const MIN_DEVICES: usize = 3;

pub fn run(registry: &mut DeviceRegistry, resources: &mut ResourceManager) {
    let mut devices: [Option<(ResourceHandle, NetDevice)>; MIN_DEVICES] = [const { None }; MIN_DEVICES];
    let count = netdev::acquire_all(registry, resources, &mut devices);
    if count < MIN_DEVICES {
        crate::arch::puts("[arp-broadcast] need at least 3 network devices\n");
        return;
    }

    for slot in devices.iter().take(count) {
        let Some((handle, device)) = slot else { continue };
        resources.print_tag(registry, *handle);
        crate::arch::puts(" MAC: ");
        crate::net::print_mac(device.mac());
        crate::arch::puts("\n");
    }

    let (_, sender) = devices[0].as_ref().expect("checked count above");
    let sender_mac = sender.mac();

    let mut request = [0u8; arp::PACKET_SIZE];
    arp::build_request(&mut request, sender_mac, SENDER_IP, TARGET_IP);
    crate::arch::puts("[arp-broadcast] sending: ");
    if let Some(header) = arp::parse(&request) {
        arp::print(&header, 0);
    }
    if sender.transmit(&request).is_err() {
        crate::arch::puts("[arp-broadcast] transmit failed\n");
        return;
    }

    for slot in devices.iter().take(count).skip(1) {
        let Some((handle, device)) = slot else { continue };
        let mut frame = [0u8; arp::PACKET_SIZE];
        match device.receive(&mut frame) {
            Ok(len) if len >= arp::PACKET_SIZE => {
                resources.print_tag(registry, *handle);
                crate::arch::puts(" received: ");
                if let Some(header) = arp::parse(&frame[..len]) {
                    arp::print(&header, 0);
                } else {
                    crate::arch::puts("(not an ARP packet)\n");
                }
            }
            Ok(_) => {
                resources.print_tag(registry, *handle);
                crate::arch::puts(" received a runt frame\n");
            }
            Err(_) => {
                resources.print_tag(registry, *handle);
                crate::arch::puts(" no reply\n");
            }
        }
    }
}
