//! Bundled applications, dispatched by `app=<name>` command-line
//! tokens. Each token is looked up once, left to right, and its app
//! runs to completion (or, for the two polling servers, forever) before
//! the next token is considered — grounded on how each
//! `original_source/apps/*` program was a standalone `app_*` entry
//! point the platform's command-line parser invoked by name.

pub mod arp_broadcast;
pub mod http_hello;
pub mod illegal_instruction;
pub mod mac_print;
pub mod netdev;
pub mod packet_print;
pub mod random_app;

use crate::devices::DeviceRegistry;
use crate::drivers::resource::ResourceManager;

/// Runs the app named by `name`, if recognized. Returns `false` for an
/// unrecognized name so the caller can apply the permissive
/// "unknown tokens ignored" command-line rule.
pub fn dispatch(name: &str, registry: &mut DeviceRegistry, resources: &mut ResourceManager) -> bool {
    match name {
        "illegal-instruction" => illegal_instruction::run(),
        "random-software" => random_app::run_software(),
        "random-hardware" => random_app::run_hardware(registry, resources),
        "mac-virtio-net" => mac_print::run_virtio_net(registry, resources),
        "mac-e1000" => mac_print::run_e1000(registry, resources),
        "mac-rtl8139" => mac_print::run_rtl8139(registry, resources),
        "mac-all" => mac_print::run_all(registry, resources),
        "arp-broadcast" => arp_broadcast::run(registry, resources),
        "packet-print" => packet_print::run(registry, resources),
        "http-hello" => http_hello::run(registry, resources),
        _ => return false,
    }
    true
}

/// Parses `app=<name>` tokens. Returns `true` if the token was in the
/// right shape to be an app invocation, regardless of whether `name`
/// was recognized (matching `log.apply_cmdline_token`'s convention of
/// reporting shape-recognition, not success).
pub fn apply_cmdline_token(
    token: &str,
    registry: &mut DeviceRegistry,
    resources: &mut ResourceManager,
) -> bool {
    let Some(name) = token.strip_prefix("app=") else {
        return false;
    };
    dispatch(name, registry, resources);
    true
}
