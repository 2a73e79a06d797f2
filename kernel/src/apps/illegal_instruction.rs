//! Deliberately executes an illegal instruction, exercising the
//! platform port's synchronous-trap path end to end. Grounded on
//! `original_source/apps/illegal-instruction/app_illegal_instruction.c`.

/// Never returns: the trap handler installed by
/// [`crate::arch::install_trap_handler`] diverts control flow into
/// [`crate::error::report_fatal`] before the instruction after the
/// trap would execute.
pub fn run() -> ! {
    crate::arch::puts("[illegal-instruction] executing an illegal instruction...\n");
    trap();
    // Only reached if the platform port failed to install a trap
    // handler for this architecture.
    crate::arch::halt();
}

#[cfg(target_arch = "aarch64")]
fn trap() {
    // SAFETY: deliberately undefined; the whole point of this app is
    // to drive the synchronous-exception path.
    unsafe { core::arch::asm!(".word 0x00000000") }
}

#[cfg(target_arch = "x86_64")]
fn trap() {
    // SAFETY: see the aarch64 arm.
    unsafe { core::arch::asm!("ud2") }
}

#[cfg(target_arch = "riscv64")]
fn trap() {
    // SAFETY: see the aarch64 arm.
    unsafe { core::arch::asm!(".word 0x00000000") }
}
