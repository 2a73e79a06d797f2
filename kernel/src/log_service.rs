//! Hierarchical, heap-free log-tag service: a default level plus
//! per-tag overrides, driven by the `log=<level>` / `log.<tag>=<level>`
//! command-line tokens. Implements [`log::Log`] so the rest of the
//! kernel just calls `log::info!(target: "virtio-net", "...")`.

use core::sync::atomic::{AtomicU8, Ordering};
use spin::Mutex;

pub const MAX_LOG_TAGS: usize = 32;
const TAG_CAPACITY: usize = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogLevel {
    Error = 0,
    Warn = 1,
    Info = 2,
    Debug = 3,
}

impl LogLevel {
    fn from_str(s: &str) -> Option<LogLevel> {
        match s {
            "error" => Some(LogLevel::Error),
            "warn" => Some(LogLevel::Warn),
            "info" => Some(LogLevel::Info),
            "debug" => Some(LogLevel::Debug),
            _ => None,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warn => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
        }
    }

    fn from_log(level: log::Level) -> LogLevel {
        match level {
            log::Level::Error => LogLevel::Error,
            log::Level::Warn => LogLevel::Warn,
            log::Level::Info => LogLevel::Info,
            _ => LogLevel::Debug,
        }
    }
}

struct TagSlot {
    name: [u8; TAG_CAPACITY],
    name_len: u8,
    level: AtomicU8,
    used: bool,
}

impl TagSlot {
    const fn empty() -> Self {
        TagSlot {
            name: [0; TAG_CAPACITY],
            name_len: 0,
            level: AtomicU8::new(LogLevel::Info as u8),
            used: false,
        }
    }

    fn name(&self) -> &str {
        core::str::from_utf8(&self.name[..self.name_len as usize]).unwrap_or("")
    }
}

struct TagTable {
    slots: [TagSlot; MAX_LOG_TAGS],
    default_level: AtomicU8,
}

static TABLE: Mutex<TagTable> = Mutex::new(TagTable {
    slots: [const { TagSlot::empty() }; MAX_LOG_TAGS],
    default_level: AtomicU8::new(LogLevel::Info as u8),
});

/// Registers a tag (idempotent) and returns its current effective level.
pub fn register(tag: &str) -> LogLevel {
    let mut table = TABLE.lock();
    let default = table.default_level.load(Ordering::Relaxed);
    if let Some(slot) = find_slot(&table, tag) {
        return level_from_u8(table.slots[slot].level.load(Ordering::Relaxed));
    }
    for slot in table.slots.iter_mut() {
        if !slot.used {
            let bytes = tag.as_bytes();
            let n = bytes.len().min(TAG_CAPACITY);
            slot.name[..n].copy_from_slice(&bytes[..n]);
            slot.name_len = n as u8;
            slot.used = true;
            slot.level.store(default, Ordering::Relaxed);
            return level_from_u8(default);
        }
    }
    level_from_u8(default)
}

fn find_slot(table: &TagTable, tag: &str) -> Option<usize> {
    table
        .slots
        .iter()
        .position(|s| s.used && s.name() == tag)
}

fn level_from_u8(v: u8) -> LogLevel {
    match v {
        0 => LogLevel::Error,
        1 => LogLevel::Warn,
        2 => LogLevel::Info,
        _ => LogLevel::Debug,
    }
}

/// Applies `log=<level>`: sets the default level, retroactively applied
/// to every already-registered tag (per the command-line token contract).
pub fn set_default_level(level: LogLevel) {
    let table = TABLE.lock();
    table.default_level.store(level as u8, Ordering::Relaxed);
    for slot in table.slots.iter() {
        if slot.used {
            slot.level.store(level as u8, Ordering::Relaxed);
        }
    }
}

/// Applies `log.<tag>=<level>`: overrides one tag, registering it first
/// if it hasn't been seen yet (prospective application).
pub fn set_tag_level(tag: &str, level: LogLevel) {
    let mut table = TABLE.lock();
    if let Some(idx) = find_slot(&table, tag) {
        table.slots[idx].level.store(level as u8, Ordering::Relaxed);
        return;
    }
    for slot in table.slots.iter_mut() {
        if !slot.used {
            let bytes = tag.as_bytes();
            let n = bytes.len().min(TAG_CAPACITY);
            slot.name[..n].copy_from_slice(&bytes[..n]);
            slot.name_len = n as u8;
            slot.used = true;
            slot.level.store(level as u8, Ordering::Relaxed);
            return;
        }
    }
}

/// Parses a `log=<level>` or `log.<tag>=<level>` token. Returns `true`
/// if it was recognized as a log-configuration token.
pub fn apply_cmdline_token(token: &str) -> bool {
    let Some(rest) = token.strip_prefix("log") else {
        return false;
    };
    if let Some(value) = rest.strip_prefix('=') {
        if let Some(level) = LogLevel::from_str(value) {
            set_default_level(level);
        }
        return true;
    }
    if let Some(tag_and_value) = rest.strip_prefix('.') {
        if let Some((tag, value)) = tag_and_value.split_once('=') {
            if let Some(level) = LogLevel::from_str(value) {
                set_tag_level(tag, level);
            }
        }
        return true;
    }
    false
}

fn effective_level(tag: &str) -> LogLevel {
    let table = TABLE.lock();
    match find_slot(&table, tag) {
        Some(idx) => level_from_u8(table.slots[idx].level.load(Ordering::Relaxed)),
        None => level_from_u8(table.default_level.load(Ordering::Relaxed)),
    }
}

pub fn log_line(level: LogLevel, tag: &str, args: core::fmt::Arguments) {
    use core::fmt::Write;
    crate::arch::puts("[");
    crate::arch::puts(level.as_str());
    crate::arch::puts("][");
    crate::arch::puts(tag);
    crate::arch::puts("] ");
    let mut sink = ConsoleWriter;
    let _ = sink.write_fmt(args);
    crate::arch::puts("\n");
}

/// The one console line the platform port's Fatal path prints, per the
/// error-handling design's "print a short diagnostic and halt."
pub fn log_line_fatal(address: usize, reason: &str) {
    crate::arch::puts("[ERROR][fatal] ");
    crate::arch::puts(reason);
    crate::arch::puts(" at 0x");
    crate::arch::put_hex64(address as u64);
    crate::arch::puts("\n");
}

struct ConsoleWriter;

impl core::fmt::Write for ConsoleWriter {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        crate::arch::puts(s);
        Ok(())
    }
}

pub struct KernelLogger;

impl log::Log for KernelLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        effective_level(metadata.target()) >= LogLevel::from_log(metadata.level())
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        log_line(LogLevel::from_log(record.level()), record.target(), *record.args());
    }

    fn flush(&self) {}
}

pub static LOGGER: KernelLogger = KernelLogger;

pub fn init() {
    register("kernel");
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(log::LevelFilter::Debug);
}

#[cfg(test)]
mod tests {
    use super::*;

    // The log table is a single global, so tests that mutate it run
    // under one lock to avoid stomping on each other's tags.
    static TEST_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn unrecognized_token_is_not_a_log_token() {
        let _guard = TEST_LOCK.lock();
        assert!(!apply_cmdline_token("app=http-hello"));
        assert!(!apply_cmdline_token("quiet"));
    }

    #[test]
    fn default_level_applies_retroactively() {
        let _guard = TEST_LOCK.lock();
        let tag = "retro-test-tag";
        register(tag);
        assert!(apply_cmdline_token("log=warn"));
        assert_eq!(effective_level(tag), LogLevel::Warn);
        assert!(apply_cmdline_token("log=debug"));
        assert_eq!(effective_level(tag), LogLevel::Debug);
    }

    #[test]
    fn tag_override_wins_over_default() {
        let _guard = TEST_LOCK.lock();
        assert!(apply_cmdline_token("log=warn"));
        assert!(apply_cmdline_token("log.virtio-net=debug"));
        assert_eq!(effective_level("virtio-net"), LogLevel::Debug);
        assert_eq!(effective_level("some-other-tag"), LogLevel::Warn);
    }

    #[test]
    fn unrecognized_level_value_is_still_a_recognized_shape() {
        let _guard = TEST_LOCK.lock();
        // Matches `app=` parsing's convention: malformed values are
        // dropped, but the token shape itself was still "ours."
        assert!(apply_cmdline_token("log=verbose"));
        assert!(apply_cmdline_token("log.some-tag=verbose"));
    }

    #[test]
    fn ordering_matches_command_line_scenario() {
        let _guard = TEST_LOCK.lock();
        // "log=warn log.virtio-net=debug app=http-hello app=mac-all"
        // processed left to right: the tag override must survive the
        // earlier blanket default.
        for token in ["log=warn", "log.virtio-net=debug"] {
            assert!(apply_cmdline_token(token));
        }
        assert!(!apply_cmdline_token("app=http-hello"));
        assert!(!apply_cmdline_token("app=mac-all"));
        assert_eq!(effective_level("virtio-net"), LogLevel::Debug);
    }
}
