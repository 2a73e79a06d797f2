//! Paravirtualized NIC driver: VirtIO 1.0-legacy network, RX=queue 0,
//! TX=queue 1, N=16 descriptors per queue. The hard part of the core;
//! grounded in `original_source/drivers/virtio_rng/virtio_rng.c` for
//! the actual bring-up/ring algorithm (the only complete legacy
//! virtqueue implementation in the pack) and in
//! `original_source/drivers/virtio_net/virtio_net.c` for the ID table,
//! transport-detection heuristic, and MAC-read offset.

use super::queue::{desc_flags, NicQueue};
use super::Transport;
use crate::devices::Device;
use crate::drivers::{Driver, DriverType, IdEntry};
use crate::error::{KResult, KernelError};

pub const QUEUE_SIZE: u16 = NicQueue::N as u16;
pub const MAX_PKT: usize = 2048;
pub const HEADER_LEN: usize = 10;
const POLL_ITERATIONS: u32 = 100_000;
const QUEUE_RX: u16 = 0;
const QUEUE_TX: u16 = 1;

/// On the load/store architecture with alignment enforcement, an
/// Ethernet frame's IP header (at byte 14) needs to land 4-byte
/// aligned, so RX/TX buffers reserve a 2-byte pad before the frame.
#[cfg(target_arch = "aarch64")]
const FRAME_OFFSET: usize = 2;
#[cfg(not(target_arch = "aarch64"))]
const FRAME_OFFSET: usize = 0;

pub struct VirtioNetContext {
    transport: Option<Transport>,
    mac: [u8; 6],
    rx: NicQueue,
    tx: NicQueue,
    initialized: bool,
}

impl VirtioNetContext {
    pub const fn new() -> Self {
        VirtioNetContext {
            transport: None,
            mac: [0; 6],
            rx: NicQueue::new(),
            tx: NicQueue::new(),
            initialized: false,
        }
    }

    pub fn mac(&self) -> [u8; 6] {
        self.mac
    }

    /// §4.7.4 Transmit.
    pub fn transmit(&mut self, payload: &[u8]) -> KResult<()> {
        if !self.initialized {
            return Err(KernelError::Configuration("not initialized"));
        }
        if payload.len() > MAX_PKT - HEADER_LEN {
            return Err(KernelError::Configuration("payload too large"));
        }
        let Some(i) = self.tx.find_free() else {
            return Err(KernelError::ResourceExhausted);
        };
        self.tx.mark_in_use(i);

        let buf = &mut self.tx.buffers[i];
        for b in buf.iter_mut().take(HEADER_LEN + FRAME_OFFSET) {
            *b = 0;
        }
        buf[FRAME_OFFSET + HEADER_LEN..FRAME_OFFSET + HEADER_LEN + payload.len()]
            .copy_from_slice(payload);

        let addr = buf.as_ptr() as u64 + FRAME_OFFSET as u64;
        let len = (HEADER_LEN + payload.len()) as u32;
        self.tx.write_desc(i, addr, len, 0, 0);
        self.tx.push_avail(i as u16);

        let transport = self.transport.as_ref().expect("initialized");
        transport.notify(QUEUE_TX);

        let saved_last = self.tx.last_used_idx();
        for _ in 0..POLL_ITERATIONS {
            if self.tx.used_idx() != saved_last {
                self.tx.advance_last_used();
                self.tx.clear_in_use(i);
                return Ok(());
            }
            core::hint::spin_loop();
        }
        self.tx.clear_in_use(i);
        Err(KernelError::Timeout)
    }

    /// §4.7.5 Receive.
    pub fn receive(&mut self, out: &mut [u8]) -> KResult<usize> {
        if !self.initialized {
            return Err(KernelError::Configuration("not initialized"));
        }
        if !self.rx.has_used() {
            return Err(KernelError::WouldBlock);
        }

        let used = self.rx.read_used();
        self.rx.advance_last_used();

        if used.id as usize >= NicQueue::N {
            self.refill_rx(used.id as usize % NicQueue::N);
            return Err(KernelError::RingProtocol("descriptor id out of range"));
        }
        if used.len == 0 || used.len as usize > MAX_PKT || (used.len as usize) < HEADER_LEN {
            self.refill_rx(used.id as usize);
            return Err(KernelError::RingProtocol("bad completion length"));
        }

        let payload_len = used.len as usize - HEADER_LEN;
        let copy_len = payload_len.min(out.len());
        let id = used.id as usize;
        let buf = &self.rx.buffers[id];
        out[..copy_len]
            .copy_from_slice(&buf[FRAME_OFFSET + HEADER_LEN..FRAME_OFFSET + HEADER_LEN + copy_len]);

        self.refill_rx(id);
        Ok(copy_len)
    }

    fn refill_rx(&mut self, id: usize) {
        let addr = self.rx.buffers[id].as_ptr() as u64 + FRAME_OFFSET as u64;
        self.rx.write_desc(id, addr, MAX_PKT as u32, desc_flags::WRITE, 0);
        self.rx.push_avail(id as u16);
        if let Some(transport) = self.transport.as_ref() {
            transport.notify(QUEUE_RX);
        }
    }

    fn bring_up(&mut self, device: &Device) -> Result<(), ()> {
        let transport = Transport::detect(device.reg_base);
        super::reset_and_negotiate(&transport)?;

        super::init_queue(&transport, QUEUE_RX, QUEUE_SIZE, self.rx.base_addr())?;
        super::init_queue(&transport, QUEUE_TX, QUEUE_SIZE, self.tx.base_addr())?;

        for i in 0..NicQueue::N {
            let addr = self.rx.buffers[i].as_ptr() as u64 + FRAME_OFFSET as u64;
            self.rx.write_desc(i, addr, MAX_PKT as u32, desc_flags::WRITE, 0);
            self.rx.mark_in_use(i);
            self.rx.push_avail(i as u16);
        }

        super::finish_bring_up(&transport)?;

        if transport.is_mmio() {
            transport.notify(QUEUE_RX);
        }

        let mut mac = [0u8; 6];
        for (i, byte) in mac.iter_mut().enumerate() {
            *byte = transport.read_config_u8(i);
        }

        self.transport = Some(transport);
        self.mac = mac;
        self.initialized = true;
        Ok(())
    }
}

impl Default for VirtioNetContext {
    fn default() -> Self {
        Self::new()
    }
}

const VIRTIO_VENDOR: u16 = 0x1af4;
const DEVICE_ID_NET_LEGACY: u16 = 0x1000;
const DEVICE_ID_NET_MODERN: u16 = 0x1041;

static ID_TABLE: &[IdEntry] = &[
    IdEntry {
        compatible: Some("virtio,net"),
        vendor_id: VIRTIO_VENDOR,
        device_id: DEVICE_ID_NET_MODERN,
    },
    IdEntry {
        compatible: None,
        vendor_id: VIRTIO_VENDOR,
        device_id: DEVICE_ID_NET_MODERN,
    },
    IdEntry {
        compatible: Some("virtio,net"),
        vendor_id: VIRTIO_VENDOR,
        device_id: DEVICE_ID_NET_LEGACY,
    },
    IdEntry {
        compatible: None,
        vendor_id: VIRTIO_VENDOR,
        device_id: DEVICE_ID_NET_LEGACY,
    },
];

fn init_context(ctx: *mut (), device: &mut Device) -> i32 {
    if ctx.is_null() {
        return -1;
    }
    // SAFETY: `ctx` is a caller-owned `VirtioNetContext` whose address
    // the caller passed to `acquire_available`; the driver contract
    // guarantees it outlives the resulting resource handle.
    let context = unsafe { &mut *(ctx as *mut VirtioNetContext) };
    match context.bring_up(device) {
        Ok(()) => 0,
        Err(()) => {
            log::debug!(target: "virtio-net", "bring-up failed for device at {:#x}", device.reg_base);
            -1
        }
    }
}

fn deinit_context(ctx: *mut ()) {
    if ctx.is_null() {
        return;
    }
    // SAFETY: see `init_context`.
    let context = unsafe { &mut *(ctx as *mut VirtioNetContext) };
    if let Some(transport) = context.transport.take() {
        transport.write_status(0);
    }
    context.initialized = false;
}

pub static DRIVER: Driver = Driver {
    name: "virtio-net",
    version: "0.1.0",
    kind: DriverType::Network,
    id_table: ID_TABLE,
    init_context,
    deinit_context,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transmit_advances_avail_and_used_for_small_payload() {
        let mut ctx = VirtioNetContext::new();
        ctx.initialized = true;
        ctx.transport = Some(Transport::Mmio { base: 0 });
        // With no real device attached, transmit will not see used.idx
        // advance, so the only thing we can assert without hardware is
        // that avail.idx advances by exactly one per call, matching the
        // "after TX of k packets, avail.idx has advanced by k" invariant.
        let before = ctx.tx.avail_idx();
        let payload = [0xab_u8; 64];
        let _ = ctx.transmit(&payload);
        assert_eq!(ctx.tx.avail_idx(), before.wrapping_add(1));
    }

    #[test]
    fn receive_on_empty_ring_is_would_block() {
        let mut ctx = VirtioNetContext::new();
        ctx.initialized = true;
        let mut buf = [0u8; 64];
        assert_eq!(ctx.receive(&mut buf), Err(KernelError::WouldBlock));
    }
}
