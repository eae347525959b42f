//! HTTP API serving PXELINUX configurations.
//!
//! All configuration endpoints respond with a `text/plain` PXELINUX configuration, or with
//! HTTP 404 (Not Found) and a JSON error body when no schedule entry applies to the client at the
//! current time of day (even after trying the
//! [fallback address][`crate::config::Config::fallback_addr`]) or the applicable entry can't be
//! rendered.
//!
//! # API Endpoints
//!
//! ## `/healthcheck` (GET)
//!
//!   Returns HTTP 200 (OK) and the JSON body `{"ok":"healthy"}` when the service is operational.
//!
//! ## `/pxelinux.cfg/:hex` (GET)
//!
//!   The path PXELINUX requests over HTTP, where `:hex` is the client's IPv4 address as 8
//!   hexadecimal digits in network byte order, e.g. `C0A80105` for `192.168.1.5`. Returns HTTP
//!   400 (Bad Request) for anything that isn't exactly 8 hexadecimal digits. The bare `/:hex`
//!   form and a trailing slash are accepted as well.
//!
//!   ```bash
//!   ❯ curl http://localhost:8080/pxelinux.cfg/C0A80105
//!   DEFAULT /static/menu.c32
//!   timeout 100
//!
//!   menu title Main
//!   ...
//!   ```
//!
//! ## `/ip/:addr` (GET)
//!
//!   The configuration for an IPv4 or IPv6 address written out in full.
//!
//! ## `/group/:name` (GET)
//!
//!   The configuration for the first address of the named machine group.
//!
//! ## `/self` (GET)
//!
//!   The configuration for the requesting client. The address is taken from the
//!   [forwarded header][`crate::config::Config::forwarded_header`] when present (the first entry
//!   if it holds a list), and from the connection's peer address otherwise. IPv4-mapped IPv6
//!   addresses from dual-stack sockets are treated as IPv4.
//!
//! ## `/menu/:label/summary` (GET)
//!
//!   A plain text outline of a menu's items and sub-menus.

mod api_error;
mod model;
mod routes;
pub mod server;

pub use server::new;
