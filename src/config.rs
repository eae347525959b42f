use crate::boot_store::{DynBootStore, FileBootStore, InMemoryBootStore};
use crate::error::Error;
use crate::resolve::DEFAULT_FALLBACK_ADDR;
use serde::Deserialize;
use serde_with::{serde_as, DurationSeconds};
use std::fs::File;
use std::io::BufReader;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use time::{OffsetDateTime, Time, UtcOffset};
use tokio::sync::RwLock;

pub type SharedConfig = Arc<Config>;

fn default_fallback_addr() -> IpAddr {
    DEFAULT_FALLBACK_ADDR
}

fn default_forwarded_header() -> String {
    "x-real-ip".to_string()
}

#[serde_as]
#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    pub api_bind_addr: SocketAddr,
    #[serde_as(as = "DurationSeconds<u64>")]
    pub api_timeout: Duration,
    /// JSON boot data document. Without one an empty in-memory catalog is served.
    #[serde(default)]
    pub store_path: Option<String>,
    /// Prefix for the PXELINUX menu modules named in menu documents.
    #[serde(default)]
    pub static_url: String,
    /// Resolved instead of client addresses that have no schedule entry of their own.
    #[serde(default = "default_fallback_addr")]
    pub fallback_addr: IpAddr,
    /// Offset of the schedule's wall clock from UTC.
    #[serde(default)]
    pub utc_offset_seconds: i32,
    /// Request header naming the client address when serving behind a reverse proxy.
    #[serde(default = "default_forwarded_header")]
    pub forwarded_header: String,
}

impl Config {
    /// Load and validate a [`Config`] from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IO`] or [`Error::InvalidJSON`] if the file can't be read or parsed, and
    /// [`Error::InvalidUtcOffset`] if the UTC offset is out of range.
    pub fn try_from_file(p: impl AsRef<Path>) -> Result<Self, Error> {
        let f = File::open(p)?;
        let reader = BufReader::new(f);
        let conf: Config = serde_json::from_reader(reader)?;
        UtcOffset::from_whole_seconds(conf.utc_offset_seconds)?;
        Ok(conf)
    }

    /// Build the boot store described by this config.
    ///
    /// # Errors
    ///
    /// Returns an error if the [`store_path`][Config::store_path] document can't be loaded.
    pub async fn boot_store(&self) -> Result<DynBootStore, Error> {
        let boot_store: DynBootStore = match &self.store_path {
            Some(path) => Arc::new(RwLock::new(FileBootStore::try_from_file(path).await?)),
            None => Arc::new(RwLock::new(InMemoryBootStore::default())),
        };
        Ok(boot_store)
    }

    #[must_use]
    pub fn utc_offset(&self) -> UtcOffset {
        UtcOffset::from_whole_seconds(self.utc_offset_seconds).unwrap_or(UtcOffset::UTC)
    }

    /// The current wall clock time of day, truncated to whole seconds.
    #[must_use]
    pub fn time_of_day(&self) -> Time {
        let now = OffsetDateTime::now_utc().to_offset(self.utc_offset()).time();
        now.replace_nanosecond(0).unwrap_or(now)
    }
}
