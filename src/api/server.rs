use crate::api::routes;
use crate::boot_store::DynBootStore;
use crate::catalog::Catalog;
use crate::config::SharedConfig;
use crate::engine::Engine;
use std::future::Future;
use std::net::SocketAddr;

#[derive(Clone)]
pub(super) struct AppState {
    pub config: SharedConfig,
    pub boot_store: DynBootStore,
}

impl AppState {
    pub fn engine<'a>(&'a self, catalog: &'a Catalog) -> Engine<'a> {
        Engine::new(catalog, self.config.fallback_addr, &self.config.static_url)
    }
}

pub fn new(
    config: SharedConfig,
    boot_store: DynBootStore,
) -> impl Future<Output = hyper::Result<()>> {
    axum::Server::bind(&config.api_bind_addr).serve(
        routes::new(AppState { config, boot_store })
            .into_make_service_with_connect_info::<SocketAddr>(),
    )
}
