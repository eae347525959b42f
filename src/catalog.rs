//! A validated, immutable snapshot of all boot data.
//!
//! The catalog is deserialized from a [`CatalogDocument`] and rejected as a whole if any part of
//! it is malformed: duplicate ids or labels, unparseable IP ranges, dangling references, or
//! schedule windows that end before they start. Once built, every reference inside a catalog
//! resolves.
//!
//! Example document:
//!
//! ```json
//! {
//!   "items": [
//!     { "id": 1, "label": "local", "title": "Boot from disk", "kernel": "LOCALBOOT" }
//!   ],
//!   "menus": [
//!     { "id": 1, "label": "main", "title": "Main", "items": [ { "item": 1, "priority": 10 } ] }
//!   ],
//!   "machine_groups": [
//!     { "id": 1, "name": "lab", "ip_ranges": "192.168.1.0/24" }
//!   ],
//!   "schedule": [
//!     { "id": 1, "group": 1, "menu": 1, "ui": "text",
//!       "time_start": "08:00:00", "time_end": "18:00:00" }
//!   ]
//! }
//! ```
use crate::error::Error;
use crate::model::{BootItem, GroupId, ItemId, MachineGroup, Menu, MenuId, ScheduleEntry};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::hash::Hash;

/// The serialized form of a [`Catalog`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogDocument {
    #[serde(default)]
    pub items: Vec<BootItem>,
    #[serde(default)]
    pub menus: Vec<Menu>,
    #[serde(default)]
    pub machine_groups: Vec<MachineGroup>,
    #[serde(default)]
    pub schedule: Vec<ScheduleEntry>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "CatalogDocument", into = "CatalogDocument")]
pub struct Catalog {
    items: Vec<BootItem>,
    menus: Vec<Menu>,
    machine_groups: Vec<MachineGroup>,
    schedule: Vec<ScheduleEntry>,
    item_index: HashMap<ItemId, usize>,
    menu_index: HashMap<MenuId, usize>,
}

impl Catalog {
    /// Validate a document and index it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateId`] or [`Error::DuplicateLabel`] for clashing entities,
    /// [`Error::DanglingReference`] for references to entities that don't exist,
    /// [`Error::InvalidTimeWindow`] for schedule entries ending before they start and
    /// [`Error::EmptyKernel`] for boot items without a binary.
    pub fn new(doc: CatalogDocument) -> Result<Self, Error> {
        let CatalogDocument {
            items,
            menus,
            mut machine_groups,
            mut schedule,
        } = doc;

        let item_index = index_by_id("item", items.iter().map(|i| i.id))?;
        let menu_index = index_by_id("menu", menus.iter().map(|m| m.id))?;
        index_by_id("machine group", machine_groups.iter().map(|g| g.id))?;
        index_by_id("schedule entry", schedule.iter().map(|e| e.id))?;

        unique_labels("item", items.iter().map(|i| i.label.as_str()))?;
        unique_labels("menu", menus.iter().map(|m| m.label.as_str()))?;
        unique_labels("machine group", machine_groups.iter().map(|g| g.name.as_str()))?;

        for item in &items {
            if item.kernel.to_string().is_empty() {
                return Err(Error::EmptyKernel(item.label.clone()));
            }
        }

        for menu in &menus {
            let from = format!("menu \"{}\"", menu.label);
            for entry in &menu.items {
                if !item_index.contains_key(&entry.item) {
                    return Err(dangling(&from, "item", entry.item.0));
                }
            }
            for entry in &menu.submenus {
                if !menu_index.contains_key(&entry.menu) {
                    return Err(dangling(&from, "menu", entry.menu.0));
                }
            }
        }

        let group_ids: HashSet<GroupId> = machine_groups.iter().map(|g| g.id).collect();
        for entry in &schedule {
            let from = format!("schedule entry {}", entry.id);
            if !group_ids.contains(&entry.group) {
                return Err(dangling(&from, "machine group", entry.group.0));
            }
            if !menu_index.contains_key(&entry.menu) {
                return Err(dangling(&from, "menu", entry.menu.0));
            }
            if entry.time_start > entry.time_end {
                return Err(Error::InvalidTimeWindow(entry.id));
            }
        }

        machine_groups.sort_by_key(|g| g.id);
        schedule.sort_by_key(|e| e.id);

        Ok(Self {
            items,
            menus,
            machine_groups,
            schedule,
            item_index,
            menu_index,
        })
    }

    #[must_use]
    pub fn item(&self, id: ItemId) -> Option<&BootItem> {
        self.item_index.get(&id).map(|&idx| &self.items[idx])
    }

    #[must_use]
    pub fn menu(&self, id: MenuId) -> Option<&Menu> {
        self.menu_index.get(&id).map(|&idx| &self.menus[idx])
    }

    #[must_use]
    pub fn menu_by_label(&self, label: &str) -> Option<&Menu> {
        self.menus.iter().find(|m| m.label == label)
    }

    /// Machine groups in ascending id order.
    #[must_use]
    pub fn machine_groups(&self) -> &[MachineGroup] {
        &self.machine_groups
    }

    #[must_use]
    pub fn group_by_name(&self, name: &str) -> Option<&MachineGroup> {
        self.machine_groups.iter().find(|g| g.name == name)
    }

    /// Schedule entries of one machine group, in ascending id order.
    pub fn schedule_for(&self, group: GroupId) -> impl Iterator<Item = &ScheduleEntry> {
        self.schedule.iter().filter(move |e| e.group == group)
    }
}

impl TryFrom<CatalogDocument> for Catalog {
    type Error = Error;

    fn try_from(doc: CatalogDocument) -> Result<Self, Self::Error> {
        Catalog::new(doc)
    }
}

impl From<Catalog> for CatalogDocument {
    fn from(catalog: Catalog) -> Self {
        CatalogDocument {
            items: catalog.items,
            menus: catalog.menus,
            machine_groups: catalog.machine_groups,
            schedule: catalog.schedule,
        }
    }
}

fn index_by_id<K>(
    kind: &'static str,
    ids: impl Iterator<Item = K>,
) -> Result<HashMap<K, usize>, Error>
where
    K: Copy + Eq + Hash + Into<u32>,
{
    let mut index = HashMap::new();
    for (idx, id) in ids.enumerate() {
        if index.insert(id, idx).is_some() {
            return Err(Error::DuplicateId {
                kind,
                id: id.into(),
            });
        }
    }
    Ok(index)
}

fn unique_labels<'a>(
    kind: &'static str,
    labels: impl Iterator<Item = &'a str>,
) -> Result<(), Error> {
    let mut seen = HashSet::new();
    for label in labels {
        if !seen.insert(label) {
            return Err(Error::DuplicateLabel {
                kind,
                label: label.to_string(),
            });
        }
    }
    Ok(())
}

fn dangling(from: &str, kind: &'static str, id: u32) -> Error {
    Error::DanglingReference {
        from: from.to_string(),
        kind,
        id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document() -> serde_json::Value {
        json!({
            "items": [
                { "id": 1, "label": "local", "title": "Local disk", "kernel": "LOCALBOOT" },
                { "id": 2, "label": "memtest", "title": "Memtest", "kernel": "/memtest86" }
            ],
            "menus": [
                { "id": 1, "label": "main", "title": "Main",
                  "items": [ { "item": 1, "priority": 1 } ],
                  "submenus": [ { "menu": 2, "priority": 1 } ] },
                { "id": 2, "label": "tools", "title": "Tools",
                  "items": [ { "item": 2, "priority": 1 } ],
                  "submenus": [ { "menu": 1, "priority": 1 } ] }
            ],
            "machine_groups": [
                { "id": 2, "name": "office", "ip_ranges": "10.0.0.0/8" },
                { "id": 1, "name": "lab", "ip_ranges": "192.168.1.0/24" }
            ],
            "schedule": [
                { "id": 1, "group": 1, "menu": 1, "ui": "text" }
            ]
        })
    }

    fn load(doc: serde_json::Value) -> Result<Catalog, serde_json::Error> {
        serde_json::from_value(doc)
    }

    #[test]
    fn test_load_valid_document() {
        let catalog = load(document()).unwrap();
        assert_eq!(catalog.menu(MenuId(2)).unwrap().label, "tools");
        assert_eq!(catalog.item(ItemId(2)).unwrap().label, "memtest");
        assert_eq!(catalog.menu_by_label("main").unwrap().id, MenuId(1));
        assert_eq!(catalog.group_by_name("office").unwrap().id, GroupId(2));
        let order: Vec<GroupId> = catalog.machine_groups().iter().map(|g| g.id).collect();
        assert_eq!(order, vec![GroupId(1), GroupId(2)]);
        assert_eq!(catalog.schedule_for(GroupId(1)).count(), 1);
        assert_eq!(catalog.schedule_for(GroupId(2)).count(), 0);
    }

    #[test]
    fn test_duplicate_menu_label_is_rejected() {
        let mut doc = document();
        doc["menus"][1]["label"] = json!("main");
        let err = Catalog::new(serde_json::from_value(doc).unwrap()).unwrap_err();
        assert!(matches!(err, Error::DuplicateLabel { kind: "menu", .. }));
    }

    #[test]
    fn test_duplicate_id_is_rejected() {
        let mut doc = document();
        doc["items"][1]["id"] = json!(1);
        let err = Catalog::new(serde_json::from_value(doc).unwrap()).unwrap_err();
        assert!(matches!(err, Error::DuplicateId { kind: "item", id: 1 }));
    }

    #[test]
    fn test_dangling_submenu_is_rejected() {
        let mut doc = document();
        doc["menus"][0]["submenus"][0]["menu"] = json!(9);
        let err = Catalog::new(serde_json::from_value(doc).unwrap()).unwrap_err();
        assert!(matches!(err, Error::DanglingReference { kind: "menu", id: 9, .. }));
    }

    #[test]
    fn test_reversed_window_is_rejected() {
        let mut doc = document();
        doc["schedule"][0]["time_start"] = json!("18:00:00");
        doc["schedule"][0]["time_end"] = json!("08:00:00");
        let err = Catalog::new(serde_json::from_value(doc).unwrap()).unwrap_err();
        assert!(matches!(err, Error::InvalidTimeWindow(_)));
    }

    #[test]
    fn test_invalid_ip_ranges_are_rejected_at_load() {
        let mut doc = document();
        doc["machine_groups"][0]["ip_ranges"] = json!("('10.0.0.20', '10.0.0.1')");
        assert!(load(doc).is_err());
    }

    #[test]
    fn test_round_trips_through_document() {
        let catalog = load(document()).unwrap();
        let encoded = serde_json::to_value(&catalog).unwrap();
        assert_eq!(encoded["machine_groups"][0]["ip_ranges"], "192.168.1.0/24");
        let reloaded = load(encoded).unwrap();
        assert_eq!(reloaded.menu(MenuId(1)), catalog.menu(MenuId(1)));
    }
}
