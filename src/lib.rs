//! PXE Crab
//!
//! Serves [PXELINUX] configuration files over HTTP, choosing what a network booting machine
//! sees from its IP address and the time of day.
//!
//! Machines are organised in machine groups identified by [IP range specifications][ip_ranges].
//! Schedule entries bind a group to a menu during a daily time window, either as an interactive
//! text or graphical menu, or as a direct boot of the menu's first item. Menus may nest other
//! menus, including cyclically, and are [rendered][render] with every menu expanded exactly once.
//!
//! [PXELINUX]: https://wiki.syslinux.org/wiki/index.php?title=PXELINUX
//!
#![warn(clippy::pedantic)]

pub mod api;
pub mod boot_store;
pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod ip_ranges;
pub mod model;
pub mod render;
pub mod resolve;

pub use api::new as new_http;
pub use boot_store::{FileBootStore, InMemoryBootStore};
pub use catalog::Catalog;
pub use config::{Config, SharedConfig};
pub use engine::Engine;
pub use ip_ranges::IpRanges;
