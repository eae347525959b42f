//! Schedule resolution.
//!
//! Finds the schedule entry that applies to a client address at a time of day:
//!
//! 1. The first machine group (in ascending id order) whose IP ranges contain the address is
//!    the client's group. Later groups are never consulted, even if they also match.
//! 2. Of that group's schedule entries, those whose inclusive window contains the time are
//!    active. The active entry with the lowest `(priority, time_start, time_end)` wins, and
//!    exact ties go to the lowest entry id.
//! 3. When no group matches, or the matching group has no active entry, resolution is retried
//!    once with the fallback address. Administrators bind a catch-all group to that address.
use crate::catalog::Catalog;
use crate::error::Error;
use crate::model::{hms, MachineGroup, Menu, ScheduleEntry};
use crate::render::RenderError;
use std::net::{IpAddr, Ipv4Addr};
use time::Time;

/// The default address used when a client matches no schedule entry of its own.
pub const DEFAULT_FALLBACK_ADDR: IpAddr = IpAddr::V4(Ipv4Addr::BROADCAST);

/// The outcome of a successful resolution.
#[derive(Debug, Clone, Copy)]
pub struct Selection<'a> {
    pub group: &'a MachineGroup,
    pub entry: &'a ScheduleEntry,
    pub menu: &'a Menu,
}

#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    catalog: &'a Catalog,
    fallback: IpAddr,
}

impl<'a> Resolver<'a> {
    #[must_use]
    pub fn new(catalog: &'a Catalog, fallback: IpAddr) -> Self {
        Self { catalog, fallback }
    }

    /// Resolve the schedule entry for `addr` at `now`, falling back at most once.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when neither `addr` nor the fallback address has an active
    /// schedule entry.
    pub fn resolve(&self, addr: IpAddr, now: Time) -> Result<Selection<'a>, Error> {
        if let Some(selection) = self.select(addr, now)? {
            return Ok(selection);
        }
        if addr != self.fallback {
            tracing::debug!(
                "no active schedule entry for {addr}, trying fallback {}",
                self.fallback
            );
            if let Some(selection) = self.select(self.fallback, now)? {
                return Ok(selection);
            }
        }
        tracing::info!(%addr, time = %hms(&now), "no boot configuration found");
        Err(Error::NotFound { addr, time: now })
    }

    /// The active entry for `addr` without any fallback.
    fn select(&self, addr: IpAddr, now: Time) -> Result<Option<Selection<'a>>, Error> {
        let catalog = self.catalog;
        let Some(group) = catalog
            .machine_groups()
            .iter()
            .find(|group| group.ip_ranges.contains(addr))
        else {
            return Ok(None);
        };

        let Some(entry) = catalog
            .schedule_for(group.id)
            .filter(|entry| entry.is_active(now))
            .min_by_key(|entry| entry.sort_key())
        else {
            tracing::debug!(
                "machine group \"{}\" has no schedule entry active at {}",
                group.name,
                hms(&now)
            );
            return Ok(None);
        };

        let menu = catalog
            .menu(entry.menu)
            .ok_or(RenderError::MissingMenu(entry.menu))?;
        tracing::debug!(
            "{addr} matched machine group \"{}\", schedule entry {}, menu \"{}\"",
            group.name,
            entry.id,
            menu.label
        );
        Ok(Some(Selection { group, entry, menu }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EntryId, GroupId, MenuId};
    use serde_json::json;
    use time::macros::time;

    fn catalog(groups: serde_json::Value, schedule: serde_json::Value) -> Catalog {
        serde_json::from_value(json!({
            "items": [
                { "id": 1, "label": "local", "title": "Local disk", "kernel": "LOCALBOOT" }
            ],
            "menus": [
                { "id": 1, "label": "main", "title": "Main" },
                { "id": 2, "label": "night", "title": "Night" },
                { "id": 3, "label": "catchall", "title": "Catch all" }
            ],
            "machine_groups": groups,
            "schedule": schedule,
        }))
        .unwrap()
    }

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn test_matches_group_and_window() {
        let catalog = catalog(
            json!([{ "id": 1, "name": "lab", "ip_ranges": "192.168.1.0/24" }]),
            json!([
                { "id": 1, "group": 1, "menu": 1, "ui": "text",
                  "time_start": "08:00:00", "time_end": "18:00:00" },
                { "id": 2, "group": 1, "menu": 2, "ui": "text",
                  "time_start": "18:00:01", "time_end": "23:59:59" }
            ]),
        );
        let resolver = Resolver::new(&catalog, DEFAULT_FALLBACK_ADDR);

        let day = resolver.resolve(ip("192.168.1.5"), time!(10:00:00)).unwrap();
        assert_eq!(day.group.id, GroupId(1));
        assert_eq!(day.menu.id, MenuId(1));

        let night = resolver.resolve(ip("192.168.1.5"), time!(20:00:00)).unwrap();
        assert_eq!(night.menu.id, MenuId(2));

        assert!(matches!(
            resolver.resolve(ip("192.168.1.5"), time!(07:00:00)),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn test_lowest_priority_wins() {
        let catalog = catalog(
            json!([{ "id": 1, "name": "lab", "ip_ranges": "10.0.0.0/8" }]),
            json!([
                { "id": 1, "group": 1, "menu": 1, "ui": "text", "priority": 50 },
                { "id": 2, "group": 1, "menu": 2, "ui": "text", "priority": 10,
                  "time_start": "09:00:00", "time_end": "17:00:00" }
            ]),
        );
        let resolver = Resolver::new(&catalog, DEFAULT_FALLBACK_ADDR);
        assert_eq!(
            resolver.resolve(ip("10.1.1.1"), time!(12:00:00)).unwrap().menu.id,
            MenuId(2)
        );
        assert_eq!(
            resolver.resolve(ip("10.1.1.1"), time!(08:00:00)).unwrap().menu.id,
            MenuId(1)
        );
    }

    #[test]
    fn test_earlier_window_breaks_priority_ties() {
        let catalog = catalog(
            json!([{ "id": 1, "name": "lab", "ip_ranges": "10.0.0.0/8" }]),
            json!([
                { "id": 1, "group": 1, "menu": 1, "ui": "text",
                  "time_start": "06:00:00", "time_end": "20:00:00" },
                { "id": 2, "group": 1, "menu": 2, "ui": "text",
                  "time_start": "06:00:00", "time_end": "12:00:00" }
            ]),
        );
        let resolver = Resolver::new(&catalog, DEFAULT_FALLBACK_ADDR);
        assert_eq!(
            resolver.resolve(ip("10.1.1.1"), time!(10:00:00)).unwrap().entry.id,
            EntryId(2)
        );
    }

    #[test]
    fn test_exact_ties_go_to_lowest_entry_id() {
        let catalog = catalog(
            json!([{ "id": 1, "name": "lab", "ip_ranges": "10.0.0.0/8" }]),
            json!([
                { "id": 7, "group": 1, "menu": 2, "ui": "text" },
                { "id": 3, "group": 1, "menu": 1, "ui": "text" },
                { "id": 5, "group": 1, "menu": 3, "ui": "text" }
            ]),
        );
        let resolver = Resolver::new(&catalog, DEFAULT_FALLBACK_ADDR);
        for _ in 0..10 {
            let selection = resolver.resolve(ip("10.1.1.1"), time!(12:00:00)).unwrap();
            assert_eq!(selection.entry.id, EntryId(3));
        }
    }

    #[test]
    fn test_first_matching_group_only() {
        let catalog = catalog(
            json!([
                { "id": 2, "name": "wide", "ip_ranges": "10.0.0.0/8" },
                { "id": 1, "name": "narrow", "ip_ranges": "10.1.0.0/16" }
            ]),
            json!([
                { "id": 1, "group": 2, "menu": 2, "ui": "text" },
                { "id": 2, "group": 1, "menu": 1, "ui": "text",
                  "time_start": "08:00:00", "time_end": "09:00:00" }
            ]),
        );
        let resolver = Resolver::new(&catalog, DEFAULT_FALLBACK_ADDR);
        assert_eq!(
            resolver.resolve(ip("10.1.1.1"), time!(08:30:00)).unwrap().group.name,
            "narrow"
        );
        // "narrow" matches first but has nothing active, and "wide" is never consulted.
        assert!(resolver.resolve(ip("10.1.1.1"), time!(12:00:00)).is_err());
        assert_eq!(
            resolver.resolve(ip("10.2.1.1"), time!(12:00:00)).unwrap().group.name,
            "wide"
        );
    }

    #[test]
    fn test_fallback_when_no_group_matches() {
        let catalog = catalog(
            json!([
                { "id": 1, "name": "lab", "ip_ranges": "192.168.1.0/24" },
                { "id": 2, "name": "default", "ip_ranges": "255.255.255.255" }
            ]),
            json!([
                { "id": 1, "group": 1, "menu": 1, "ui": "text" },
                { "id": 2, "group": 2, "menu": 3, "ui": "none" }
            ]),
        );
        let resolver = Resolver::new(&catalog, DEFAULT_FALLBACK_ADDR);
        let selection = resolver.resolve(ip("172.16.0.1"), time!(12:00:00)).unwrap();
        assert_eq!(selection.group.name, "default");
        assert_eq!(selection.menu.id, MenuId(3));
    }

    #[test]
    fn test_fallback_when_group_has_no_active_window() {
        let catalog = catalog(
            json!([
                { "id": 1, "name": "lab", "ip_ranges": "192.168.1.0/24" },
                { "id": 2, "name": "default", "ip_ranges": "255.255.255.255" }
            ]),
            json!([
                { "id": 1, "group": 1, "menu": 1, "ui": "text",
                  "time_start": "08:00:00", "time_end": "18:00:00" },
                { "id": 2, "group": 2, "menu": 3, "ui": "text" }
            ]),
        );
        let resolver = Resolver::new(&catalog, DEFAULT_FALLBACK_ADDR);
        let selection = resolver.resolve(ip("192.168.1.5"), time!(22:00:00)).unwrap();
        assert_eq!(selection.group.name, "default");
    }

    #[test]
    fn test_fallback_is_tried_once() {
        let catalog = catalog(
            json!([{ "id": 1, "name": "default", "ip_ranges": "255.255.255.255" }]),
            json!([
                { "id": 1, "group": 1, "menu": 3, "ui": "text",
                  "time_start": "08:00:00", "time_end": "09:00:00" }
            ]),
        );
        let resolver = Resolver::new(&catalog, DEFAULT_FALLBACK_ADDR);
        match resolver.resolve(ip("172.16.0.1"), time!(12:00:00)) {
            Err(Error::NotFound { addr, time }) => {
                assert_eq!(addr, ip("172.16.0.1"));
                assert_eq!(time, time!(12:00:00));
            }
            other => panic!("expected NotFound, got {other:?}"),
        }
        assert!(matches!(
            resolver.resolve(DEFAULT_FALLBACK_ADDR, time!(12:00:00)),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn test_custom_fallback_address() {
        let catalog = catalog(
            json!([{ "id": 1, "name": "default", "ip_ranges": "::" }]),
            json!([{ "id": 1, "group": 1, "menu": 3, "ui": "text" }]),
        );
        let resolver = Resolver::new(&catalog, ip("::"));
        assert_eq!(
            resolver.resolve(ip("10.0.0.1"), time!(12:00:00)).unwrap().menu.id,
            MenuId(3)
        );
    }

    #[test]
    fn test_empty_catalog_is_not_found() {
        let catalog = Catalog::default();
        let resolver = Resolver::new(&catalog, DEFAULT_FALLBACK_ADDR);
        assert!(matches!(
            resolver.resolve(ip("10.0.0.1"), time!(12:00:00)),
            Err(Error::NotFound { .. })
        ));
    }
}
