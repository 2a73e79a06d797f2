//! Architecture-independent memory barrier abstractions.
//!
//! Centralizes fence/barrier operations so that the virtqueue and
//! device-enumeration code never need scattered `#[cfg(target_arch)]`
//! blocks of inline assembly.

/// Full read/write memory fence. This is what the split-virtqueue
/// protocol needs around `avail.idx` writes and `used.idx` reads: the
/// device must observe descriptor/ring contents before the index bump,
/// and the driver must not read a used-ring slot until the fence after
/// the device's index write has been crossed.
#[inline(always)]
pub fn full_fence() {
    #[cfg(target_arch = "x86_64")]
    {
        core::sync::atomic::fence(core::sync::atomic::Ordering::SeqCst);
    }

    #[cfg(target_arch = "aarch64")]
    // SAFETY: `dsb sy` only orders memory accesses; no other side effects.
    unsafe {
        core::arch::asm!("dsb sy", options(nostack, nomem, preserves_flags));
    }

    #[cfg(target_arch = "riscv64")]
    // SAFETY: `fence rw, rw` only orders memory accesses; no other side effects.
    unsafe {
        core::arch::asm!("fence rw, rw", options(nostack, nomem, preserves_flags));
    }
}

/// Instruction-stream synchronization barrier, used after installing the
/// trap vector so the core sees the write before a trap can fire through it.
#[inline(always)]
pub fn instruction_sync_barrier() {
    #[cfg(target_arch = "x86_64")]
    {
        // Strongly ordered model; nothing to do.
    }

    #[cfg(target_arch = "aarch64")]
    // SAFETY: `isb` only flushes the instruction pipeline.
    unsafe {
        core::arch::asm!("isb", options(nostack, nomem, preserves_flags));
    }

    #[cfg(target_arch = "riscv64")]
    // SAFETY: `fence.i` only synchronizes instruction/data streams.
    unsafe {
        core::arch::asm!("fence.i", options(nostack, nomem));
    }
}
