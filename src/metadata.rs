//! Package metadata generated by `build.rs` from `Cargo.toml`.

include!(concat!(env!("OUT_DIR"), "/pkg_info.rs"));

/// Version tag written next to every persisted snapshot.
pub const SCHEMA_VERSION: u32 = 4;
