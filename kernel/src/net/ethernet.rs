//! Ethernet II framing: a 14-byte destination/source/type header.
//! Grounded on `original_source/apps/network/ethernet/ethernet.{h,c}`.

use super::{arp, ipv4};

pub const HEADER_LEN: usize = 14;
pub const ETH_P_IP: u16 = 0x0800;
pub const ETH_P_ARP: u16 = 0x0806;

/// Writes a 14-byte Ethernet header into `buf[0..14]`.
pub fn build_header(buf: &mut [u8], dst: [u8; 6], src: [u8; 6], eth_type: u16) {
    buf[0..6].copy_from_slice(&dst);
    buf[6..12].copy_from_slice(&src);
    buf[12..14].copy_from_slice(&eth_type.to_be_bytes());
}

pub fn dst_mac(frame: &[u8]) -> [u8; 6] {
    frame[0..6].try_into().unwrap()
}

pub fn src_mac(frame: &[u8]) -> [u8; 6] {
    frame[6..12].try_into().unwrap()
}

pub fn eth_type(frame: &[u8]) -> u16 {
    u16::from_be_bytes([frame[12], frame[13]])
}

/// Prints the Ethernet header and dispatches to the payload's own
/// printer (IPv4 or ARP), matching `ethernet_print`'s layout.
pub fn print(frame: &[u8], leftpad: usize) {
    if frame.len() < HEADER_LEN {
        crate::arch::puts("Ethernet frame too small\n");
        return;
    }
    let ty = eth_type(frame);
    for _ in 0..leftpad {
        crate::arch::puts(" ");
    }
    crate::arch::puts("Ethernet ");
    super::print_mac(src_mac(frame));
    crate::arch::puts(" -> ");
    super::print_mac(dst_mac(frame));
    crate::arch::puts(" type=0x");
    crate::arch::put_hex16(ty);
    crate::arch::puts(" len=");
    super::print_decimal_u16(frame.len() as u16);
    crate::arch::puts("\n");

    let payload = &frame[HEADER_LEN..];
    match ty {
        ETH_P_IP => ipv4::print(payload, leftpad + 2),
        ETH_P_ARP => {
            if let Some(header) = arp::parse_body(payload) {
                arp::print(&header, leftpad + 2);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_then_read_round_trips_fields() {
        let mut buf = [0u8; HEADER_LEN];
        let dst = [0x11, 0x22, 0x33, 0x44, 0x55, 0x66];
        let src = [0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff];
        build_header(&mut buf, dst, src, ETH_P_ARP);
        assert_eq!(dst_mac(&buf), dst);
        assert_eq!(src_mac(&buf), src);
        assert_eq!(eth_type(&buf), ETH_P_ARP);
    }
}
