//! Boot data entities.
//!
//! These are read-only to PXE Crab: they are loaded as part of a
//! [`Catalog`][crate::catalog::Catalog] and never mutated while serving requests.

use crate::ip_ranges::IpRanges;
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use serde_with::{DeserializeFromStr, SerializeDisplay};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use time::format_description::FormatItem;
use time::macros::{format_description, time};
use time::Time;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<$name> for u32 {
            fn from(id: $name) -> u32 {
                id.0
            }
        }
    };
}

id_type!(
    /// Identifies a [`BootItem`].
    ItemId
);
id_type!(
    /// Identifies a [`Menu`].
    MenuId
);
id_type!(
    /// Identifies a [`MachineGroup`]. Groups are matched in ascending id order.
    GroupId
);
id_type!(
    /// Identifies a [`ScheduleEntry`]. Breaks exact ties between overlapping entries.
    EntryId
);

lazy_static! {
    static ref HMS_FORMAT: &'static [FormatItem<'static>] =
        format_description!("[hour]:[minute]:[second]");
}

time::serde::format_description!(hms_format, Time, "[hour]:[minute]:[second]");

/// Format a time of day as `HH:MM:SS`.
#[must_use]
pub fn hms(t: &Time) -> String {
    t.format(*HMS_FORMAT).unwrap_or_else(|_| t.to_string())
}

/// What a [`BootItem`] boots: either a binary, or the first local disk.
#[derive(Debug, Clone, PartialEq, Eq, SerializeDisplay, DeserializeFromStr)]
pub enum Kernel {
    LocalBoot,
    Path(String),
}

impl Kernel {
    const LOCALBOOT: &'static str = "LOCALBOOT";
}

impl FromStr for Kernel {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim() {
            Self::LOCALBOOT => Kernel::LocalBoot,
            path => Kernel::Path(path.to_string()),
        })
    }
}

impl fmt::Display for Kernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kernel::LocalBoot => f.write_str(Self::LOCALBOOT),
            Kernel::Path(path) => f.write_str(path),
        }
    }
}

/// A single bootable option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootItem {
    pub id: ItemId,
    /// Unique identifier, used by PXELINUX to re-identify the item.
    pub label: String,
    /// Shown in boot menus.
    pub title: String,
    pub kernel: Kernel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initrd: Option<String>,
    /// Kernel command line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub append: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipappend: Option<u8>,
}

/// A [`BootItem`] reference inside a [`Menu`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    pub item: ItemId,
    pub priority: i32,
}

/// A sub-menu reference inside a [`Menu`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubMenu {
    pub menu: MenuId,
    pub priority: i32,
}

/// A node in the (possibly cyclic) menu graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Menu {
    pub id: MenuId,
    /// Unique identifier, used by PXELINUX to jump between menus.
    pub label: String,
    pub title: String,
    /// Guards entering the menu when used as a sub-menu, or the PXELINUX prompt when used as the
    /// main menu.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// URL of a 640x480 PNG or JPEG image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub items: Vec<MenuItem>,
    #[serde(default)]
    pub submenus: Vec<SubMenu>,
}

impl Menu {
    /// Item references ordered by priority. Equal priorities keep their declared order.
    #[must_use]
    pub fn sorted_items(&self) -> Vec<MenuItem> {
        let mut items = self.items.clone();
        items.sort_by_key(|i| i.priority);
        items
    }

    /// Sub-menu references ordered by priority. Equal priorities keep their declared order.
    #[must_use]
    pub fn sorted_submenus(&self) -> Vec<SubMenu> {
        let mut submenus = self.submenus.clone();
        submenus.sort_by_key(|m| m.priority);
        submenus
    }
}

/// A named set of client machines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineGroup {
    pub id: GroupId,
    pub name: String,
    pub ip_ranges: IpRanges,
    #[serde(default)]
    pub owner: String,
}

/// How PXELINUX presents a scheduled menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UiMode {
    /// Boot the menu's first item directly, without showing a menu.
    None,
    /// Graphical menu.
    Vesa,
    /// Text menu.
    Text,
}

impl UiMode {
    /// The PXELINUX module that displays the menu, if any.
    #[must_use]
    pub fn binary(self) -> Option<&'static str> {
        match self {
            UiMode::None => None,
            UiMode::Vesa => Some("vesamenu.c32"),
            UiMode::Text => Some("menu.c32"),
        }
    }
}

fn default_time_start() -> Time {
    Time::MIDNIGHT
}

fn default_time_end() -> Time {
    time!(23:59:59)
}

fn default_priority() -> i32 {
    50
}

fn default_timeout() -> u16 {
    100
}

/// Binds a [`MachineGroup`] to a [`Menu`] during an inclusive time-of-day window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub id: EntryId,
    pub group: GroupId,
    pub menu: MenuId,
    #[serde(with = "hms_format", default = "default_time_start")]
    pub time_start: Time,
    #[serde(with = "hms_format", default = "default_time_end")]
    pub time_end: Time,
    #[serde(default = "default_priority")]
    pub priority: i32,
    pub ui: UiMode,
    /// Deciseconds before the default entry is booted.
    #[serde(default = "default_timeout")]
    pub timeout: u16,
}

impl ScheduleEntry {
    #[must_use]
    pub fn is_active(&self, now: Time) -> bool {
        self.time_start <= now && now <= self.time_end
    }

    /// Lower keys win when several entries are active at once.
    #[must_use]
    pub fn sort_key(&self) -> (i32, Time, Time, EntryId) {
        (self.priority, self.time_start, self.time_end, self.id)
    }
}
