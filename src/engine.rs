//! Lookup of complete PXELINUX configurations.
//!
//! Ties [`Resolver`] and [`Renderer`] together. A configuration is either rendered completely
//! or not at all: any failure is reported as an [`Error`] and no partial document is returned.
use crate::catalog::Catalog;
use crate::error::Error;
use crate::model::hms;
use crate::render::Renderer;
use crate::resolve::Resolver;
use std::net::IpAddr;
use time::Time;

#[derive(Debug, Clone, Copy)]
pub struct Engine<'a> {
    catalog: &'a Catalog,
    fallback: IpAddr,
    static_url: &'a str,
}

impl<'a> Engine<'a> {
    #[must_use]
    pub fn new(catalog: &'a Catalog, fallback: IpAddr, static_url: &'a str) -> Self {
        Self {
            catalog,
            fallback,
            static_url,
        }
    }

    /// The configuration for a client address at a time of day.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no schedule entry applies, or [`Error::Render`] if the
    /// applicable entry can't be rendered.
    pub fn config_for_addr(&self, addr: IpAddr, now: Time) -> Result<String, Error> {
        let selection = Resolver::new(self.catalog, self.fallback).resolve(addr, now)?;
        Renderer::new(self.catalog, self.static_url)
            .render(&selection)
            .map_err(|err| {
                tracing::warn!(
                    %addr,
                    time = %hms(&now),
                    "schedule entry {} can't be rendered: {err}",
                    selection.entry.id
                );
                err.into()
            })
    }

    /// The configuration for the first address of a named machine group.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownGroup`] or [`Error::EmptyGroup`] if the group has no address to
    /// resolve, otherwise as [`Engine::config_for_addr`].
    pub fn config_for_group(&self, name: &str, now: Time) -> Result<String, Error> {
        let group = self
            .catalog
            .group_by_name(name)
            .ok_or_else(|| Error::UnknownGroup(name.to_string()))?;
        let addr = group
            .ip_ranges
            .first_address()
            .ok_or_else(|| Error::EmptyGroup(name.to_string()))?;
        self.config_for_addr(addr, now)
    }

    /// A plain text outline of the menu with the given label.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownMenu`] if there is no such menu.
    pub fn menu_summary(&self, label: &str) -> Result<String, Error> {
        let menu = self
            .catalog
            .menu_by_label(label)
            .ok_or_else(|| Error::UnknownMenu(label.to_string()))?;
        Ok(Renderer::new(self.catalog, self.static_url).summary(menu)?)
    }
}
