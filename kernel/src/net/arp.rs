//! ARP: request/reply construction and parsing over a full Ethernet
//! frame. Grounded on `original_source/apps/network/arp/arp.{h,c}`.

use super::ethernet;

pub const HW_ETHER: u16 = 1;
pub const OP_REQUEST: u16 = 1;
pub const OP_REPLY: u16 = 2;

/// Total size of an Ethernet header plus the 28-byte ARP body.
pub const PACKET_SIZE: usize = ethernet::HEADER_LEN + BODY_LEN;
const BODY_LEN: usize = 28;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArpHeader {
    pub hw_type: u16,
    pub proto_type: u16,
    pub hw_len: u8,
    pub proto_len: u8,
    pub opcode: u16,
    pub sender_mac: [u8; 6],
    pub sender_ip: u32,
    pub target_mac: [u8; 6],
    pub target_ip: u32,
}

fn write_body(buf: &mut [u8], header: &ArpHeader) {
    buf[0..2].copy_from_slice(&header.hw_type.to_be_bytes());
    buf[2..4].copy_from_slice(&header.proto_type.to_be_bytes());
    buf[4] = header.hw_len;
    buf[5] = header.proto_len;
    buf[6..8].copy_from_slice(&header.opcode.to_be_bytes());
    buf[8..14].copy_from_slice(&header.sender_mac);
    buf[14..18].copy_from_slice(&header.sender_ip.to_be_bytes());
    buf[18..24].copy_from_slice(&header.target_mac);
    buf[24..28].copy_from_slice(&header.target_ip.to_be_bytes());
}

/// Parses a 28-byte ARP body (the buffer immediately following an
/// Ethernet header). Returns `None` if `body` is too short.
pub fn parse_body(body: &[u8]) -> Option<ArpHeader> {
    if body.len() < BODY_LEN {
        return None;
    }
    Some(ArpHeader {
        hw_type: u16::from_be_bytes([body[0], body[1]]),
        proto_type: u16::from_be_bytes([body[2], body[3]]),
        hw_len: body[4],
        proto_len: body[5],
        opcode: u16::from_be_bytes([body[6], body[7]]),
        sender_mac: body[8..14].try_into().unwrap(),
        sender_ip: u32::from_be_bytes(body[14..18].try_into().unwrap()),
        target_mac: body[18..24].try_into().unwrap(),
        target_ip: u32::from_be_bytes(body[24..28].try_into().unwrap()),
    })
}

/// Parses a full `PACKET_SIZE`-byte Ethernet+ARP packet, returning the
/// ARP body. Returns `None` if `packet` is shorter than `PACKET_SIZE`.
pub fn parse(packet: &[u8]) -> Option<ArpHeader> {
    if packet.len() < PACKET_SIZE {
        return None;
    }
    parse_body(&packet[ethernet::HEADER_LEN..])
}

/// Builds a full broadcast ARP request (`PACKET_SIZE` bytes) into `buf`.
pub fn build_request(buf: &mut [u8], sender_mac: [u8; 6], sender_ip: u32, target_ip: u32) {
    ethernet::build_header(buf, super::BROADCAST_MAC, sender_mac, ethernet::ETH_P_ARP);
    let header = ArpHeader {
        hw_type: HW_ETHER,
        proto_type: ethernet::ETH_P_IP,
        hw_len: 6,
        proto_len: 4,
        opcode: OP_REQUEST,
        sender_mac,
        sender_ip,
        target_mac: [0; 6],
        target_ip,
    };
    write_body(&mut buf[ethernet::HEADER_LEN..PACKET_SIZE], &header);
}

/// Builds a full unicast ARP reply (`PACKET_SIZE` bytes) into `buf`.
pub fn build_reply(
    buf: &mut [u8],
    sender_mac: [u8; 6],
    sender_ip: u32,
    target_mac: [u8; 6],
    target_ip: u32,
) {
    ethernet::build_header(buf, target_mac, sender_mac, ethernet::ETH_P_ARP);
    let header = ArpHeader {
        hw_type: HW_ETHER,
        proto_type: ethernet::ETH_P_IP,
        hw_len: 6,
        proto_len: 4,
        opcode: OP_REPLY,
        sender_mac,
        sender_ip,
        target_mac,
        target_ip,
    };
    write_body(&mut buf[ethernet::HEADER_LEN..PACKET_SIZE], &header);
}

pub fn print(header: &ArpHeader, leftpad: usize) {
    for _ in 0..leftpad {
        crate::arch::puts(" ");
    }
    match header.opcode {
        OP_REQUEST => {
            crate::arch::puts("ARP Request: who-has ");
            super::print_ipv4(header.target_ip);
            crate::arch::puts(" tell ");
            super::print_ipv4(header.sender_ip);
            crate::arch::puts(" (");
            super::print_mac(header.sender_mac);
            crate::arch::puts(")\n");
        }
        OP_REPLY => {
            crate::arch::puts("ARP Reply: ");
            super::print_ipv4(header.sender_ip);
            crate::arch::puts(" is-at ");
            super::print_mac(header.sender_mac);
            crate::arch::puts("\n");
        }
        other => {
            crate::arch::puts("ARP opcode=");
            crate::arch::put_hex16(other);
            crate::arch::puts("\n");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SENDER_MAC: [u8; 6] = [0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF];

    #[test]
    fn build_reply_to_request_produces_exact_layout() {
        // target-IP 10.0.2.15, sender 10.0.2.2, sender-MAC AA:BB:CC:DD:EE:FF
        let requester_mac = [0x52, 0x54, 0x00, 0x12, 0x34, 0x56];
        let mut buf = [0u8; PACKET_SIZE];
        build_reply(&mut buf, SENDER_MAC, 0x0A000202, requester_mac, 0x0A00020F);

        assert_eq!(ethernet::dst_mac(&buf), requester_mac);
        assert_eq!(ethernet::src_mac(&buf), SENDER_MAC);
        assert_eq!(ethernet::eth_type(&buf), ethernet::ETH_P_ARP);

        let header = parse(&buf).expect("full packet parses");
        assert_eq!(header.opcode, OP_REPLY);
        assert_eq!(header.hw_type, HW_ETHER);
        assert_eq!(header.proto_type, ethernet::ETH_P_IP);
        assert_eq!(header.hw_len, 6);
        assert_eq!(header.proto_len, 4);
        assert_eq!(header.sender_mac, SENDER_MAC);
        assert_eq!(header.sender_ip, 0x0A000202);
        assert_eq!(header.target_mac, requester_mac);
        assert_eq!(header.target_ip, 0x0A00020F);
    }

    #[test]
    fn build_request_is_broadcast_with_zero_target_mac() {
        let mut buf = [0u8; PACKET_SIZE];
        build_request(&mut buf, SENDER_MAC, 0x0A000201, 0x0A00020F);
        assert_eq!(ethernet::dst_mac(&buf), super::super::BROADCAST_MAC);
        let header = parse(&buf).unwrap();
        assert_eq!(header.opcode, OP_REQUEST);
        assert_eq!(header.target_mac, [0; 6]);
    }

    #[test]
    fn parse_rejects_short_packets() {
        let buf = [0u8; PACKET_SIZE - 1];
        assert!(parse(&buf).is_none());
    }
}
