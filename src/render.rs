//! PXELINUX configuration rendering.
//!
//! Menus form a directed graph that may contain cycles. Rendering walks the graph from the
//! scheduled menu, expanding every reachable menu exactly once inside a `menu begin`/`menu end`
//! block. Any later reference to an already expanded menu becomes a `menu goto` entry instead,
//! and references back to the root become `menu goto .top`.
//!
//! The set of expanded menus belongs to one rendering pass and is never stored on the menus
//! themselves, so the same [`Catalog`] can be rendered concurrently.
use crate::catalog::Catalog;
use crate::model::{BootItem, ItemId, Kernel, Menu, MenuId, SubMenu};
use crate::resolve::Selection;
use std::collections::HashSet;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("menu \"{0}\" has no items to boot directly")]
    NoDirectBootItem(String),
    #[error("menu {0} does not exist")]
    MissingMenu(MenuId),
    #[error("boot item {0} does not exist")]
    MissingItem(ItemId),
}

/// Renders [`Selection`]s from one [`Catalog`].
#[derive(Debug, Clone, Copy)]
pub struct Renderer<'a> {
    catalog: &'a Catalog,
    static_url: &'a str,
}

impl<'a> Renderer<'a> {
    /// `static_url` is prepended to the menu module names in menu documents.
    #[must_use]
    pub fn new(catalog: &'a Catalog, static_url: &'a str) -> Self {
        Self {
            catalog,
            static_url,
        }
    }

    /// Render the configuration a resolved schedule entry asks for.
    ///
    /// # Errors
    ///
    /// Returns a [`RenderError`] if the selection can't be rendered completely.
    pub fn render(&self, selection: &Selection<'_>) -> Result<String, RenderError> {
        match selection.entry.ui.binary() {
            None => self.direct_boot(selection.menu),
            Some(binary) => self.menu_document(selection.menu, binary, selection.entry.timeout),
        }
    }

    /// A configuration that boots the menu's highest ranked item without showing a menu.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::NoDirectBootItem`] if the menu has no items.
    pub fn direct_boot(&self, menu: &Menu) -> Result<String, RenderError> {
        let entry = menu
            .sorted_items()
            .into_iter()
            .next()
            .ok_or_else(|| RenderError::NoDirectBootItem(menu.label.clone()))?;
        let item = self.item(entry.item)?;

        let mut lines = vec![format!("DEFAULT {}", item.label)];
        item_lines(item, &mut lines);
        Ok(finish(&lines))
    }

    /// A full menu configuration displayed by the given PXELINUX module.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::MissingMenu`] or [`RenderError::MissingItem`] if a reference in
    /// the menu graph doesn't resolve.
    pub fn menu_document(
        &self,
        menu: &Menu,
        binary: &str,
        timeout: u16,
    ) -> Result<String, RenderError> {
        let mut lines = vec![
            format!("DEFAULT {}{binary}", self.static_url),
            format!("timeout {timeout}"),
        ];
        let mut visited = HashSet::from([menu.id]);
        self.menu_lines(menu, &mut visited, &mut lines)?;
        Ok(finish(&lines))
    }

    /// Walk the menu graph depth first from `top` with an explicit stack, so the depth of a
    /// menu chain never grows the call stack.
    fn menu_lines(
        &self,
        top: &Menu,
        visited: &mut HashSet<MenuId>,
        lines: &mut Vec<String>,
    ) -> Result<(), RenderError> {
        self.menu_header(top, top.id, lines)?;
        let mut stack = vec![Frame::new(top)];

        while let Some(frame) = stack.last_mut() {
            let entry = match frame.submenus.get(frame.cursor) {
                Some(entry) => *entry,
                None => {
                    stack.pop();
                    if !stack.is_empty() {
                        lines.push("menu end".to_string());
                    }
                    continue;
                }
            };
            frame.cursor += 1;

            let submenu = self.menu(entry.menu)?;
            if visited.contains(&submenu.id) {
                lines.push(format!("label {}", submenu.label));
                if submenu.id == top.id {
                    lines.push("menu goto .top".to_string());
                } else {
                    lines.push(format!("menu goto {}", submenu.label));
                }
                lines.push(format!("menu label {}", submenu.title));
            } else {
                visited.insert(submenu.id);
                lines.push(format!("menu begin {}", submenu.label));
                if let Some(password) = non_empty(&submenu.password) {
                    lines.push(format!("menu passwd {password}"));
                }
                self.menu_header(submenu, top.id, lines)?;
                stack.push(Frame::new(submenu));
            }
        }
        Ok(())
    }

    /// Title, root password, background and items of one menu block.
    fn menu_header(
        &self,
        menu: &Menu,
        top: MenuId,
        lines: &mut Vec<String>,
    ) -> Result<(), RenderError> {
        lines.push(String::new());
        lines.push(format!("menu title {}", menu.title));
        if menu.id == top {
            if let Some(password) = non_empty(&menu.password) {
                lines.push(format!("menu master passwd {password}"));
            }
        }
        if let Some(background) = non_empty(&menu.background) {
            lines.push(format!("menu background {background}"));
        }
        for entry in menu.sorted_items() {
            item_lines(self.item(entry.item)?, lines);
        }
        Ok(())
    }

    /// A plain text outline of a menu's direct items and sub-menus.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::MissingMenu`] or [`RenderError::MissingItem`] if a direct
    /// reference doesn't resolve.
    pub fn summary(&self, menu: &Menu) -> Result<String, RenderError> {
        let mut lines = vec![format!("{} ({})", menu.title, menu.label)];
        if !menu.owner.is_empty() {
            lines.push(format!("Owner: {}", menu.owner));
        }
        lines.push("Items:".to_string());
        for entry in menu.sorted_items() {
            let item = self.item(entry.item)?;
            lines.push(format!("\"{}\" ({})", item.title, item.label));
        }
        lines.push("Sub-menus:".to_string());
        for entry in menu.sorted_submenus() {
            let submenu = self.menu(entry.menu)?;
            lines.push(format!("\"{}\" ({})", submenu.title, submenu.label));
        }
        Ok(finish(&lines))
    }

    fn item(&self, id: ItemId) -> Result<&'a BootItem, RenderError> {
        self.catalog.item(id).ok_or(RenderError::MissingItem(id))
    }

    fn menu(&self, id: MenuId) -> Result<&'a Menu, RenderError> {
        self.catalog.menu(id).ok_or(RenderError::MissingMenu(id))
    }
}

/// An expanded menu and the position of the next sub-menu reference to visit.
struct Frame {
    submenus: Vec<SubMenu>,
    cursor: usize,
}

impl Frame {
    fn new(menu: &Menu) -> Self {
        Self {
            submenus: menu.sorted_submenus(),
            cursor: 0,
        }
    }
}

fn item_lines(item: &BootItem, lines: &mut Vec<String>) {
    lines.push(String::new());
    lines.push(format!("label {}", item.label));
    lines.push(format!("menu label {}", item.title));
    match &item.kernel {
        Kernel::LocalBoot => lines.push("localboot 0".to_string()),
        Kernel::Path(path) => {
            lines.push(format!("kernel {path}"));
            if let Some(initrd) = non_empty(&item.initrd) {
                lines.push(format!("initrd {initrd}"));
            }
            if let Some(append) = non_empty(&item.append) {
                lines.push(format!("append {append}"));
            }
            if let Some(password) = non_empty(&item.password) {
                lines.push(format!("menu passwd {password}"));
            }
            if let Some(ipappend) = item.ipappend {
                lines.push(format!("ipappend {ipappend}"));
            }
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn finish(lines: &[String]) -> String {
    let mut out = lines.join("\n");
    out.push('\n');
    out
}
