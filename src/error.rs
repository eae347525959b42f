//! Error types.

use crate::model::{hms, EntryId};
use crate::render::RenderError;
use std::net::IpAddr;
use time::Time;

/// Error enumerates the possible PXE Crab error states.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Returned when neither the requesting address nor the
    /// [fallback address][`crate::config::Config::fallback_addr`] has an active schedule entry.
    #[error("no active schedule entry for {addr} at {}", hms(.time))]
    NotFound { addr: IpAddr, time: Time },

    /// Returned when the selected schedule entry can't be rendered, e.g. a direct boot menu
    /// without items.
    #[error(transparent)]
    Render(#[from] RenderError),

    /// Returned when a configuration is requested for a machine group name that doesn't exist.
    #[error("no machine group named \"{0}\"")]
    UnknownGroup(String),

    /// Returned when a configuration is requested for a machine group with no addresses.
    #[error("machine group \"{0}\" has no addresses")]
    EmptyGroup(String),

    /// Returned when a summary is requested for a menu label that doesn't exist.
    #[error("no menu labelled \"{0}\"")]
    UnknownMenu(String),

    /// Returned when a PXELINUX hex token isn't exactly 8 hexadecimal digits.
    #[error("\"{0}\" is not an 8 digit hexadecimal IPv4 address")]
    InvalidHexAddr(String),

    /// Returned when a raw address in a request path isn't an IPv4 or IPv6 address.
    #[error("\"{0}\" is not an IP address")]
    InvalidAddr(String),

    /// Returned when two entities of the same kind share an identifier.
    #[error("duplicate {kind} id {id}")]
    DuplicateId { kind: &'static str, id: u32 },

    /// Returned when two entities of the same kind share a label or name.
    #[error("duplicate {kind} label \"{label}\"")]
    DuplicateLabel { kind: &'static str, label: String },

    /// Returned when an entity references another entity that doesn't exist.
    #[error("{from} references unknown {kind} {id}")]
    DanglingReference {
        from: String,
        kind: &'static str,
        id: u32,
    },

    /// Returned when a schedule entry ends before it starts.
    #[error("schedule entry {0} has a time window that ends before it starts")]
    InvalidTimeWindow(EntryId),

    /// Returned when a boot item has an empty kernel path.
    #[error("boot item \"{0}\" has an empty kernel path")]
    EmptyKernel(String),

    /// Returned when the configured UTC offset is out of range.
    #[error("invalid UTC offset")]
    InvalidUtcOffset(#[from] time::error::ComponentRange),

    /// Returned when a generic IO error occurs.
    #[error("an IO error occurred")]
    IO(#[from] std::io::Error),

    /// Returned when processing JSON from disk (e.g. when
    /// [loading a `Config`][crate::config::Config::try_from_file], or
    /// [loading a `FileBootStore`][crate::boot_store::file::FileBootStore::try_from_file]) fails
    /// due to invalid JSON content or invalid boot data.
    #[error("invalid JSON: {0}")]
    InvalidJSON(#[from] serde_json::Error),
}
