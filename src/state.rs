use crate::adapters::TokioTimeProvider;
use crate::auth::SessionCookies;
use crate::config::AppConfig;
use crate::live::{ConnectionRegistry, Dispatcher, RefreshScheduler};
use crate::store::Store;

use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub store: Store,
    pub cookies: SessionCookies,
    pub time: TokioTimeProvider,
    pub connections: Arc<ConnectionRegistry>,
    pub dispatcher: Dispatcher<Store, TokioTimeProvider>,
    pub scheduler: RefreshScheduler<Store, TokioTimeProvider>,
}

impl AppState {
    pub fn new(config: AppConfig, store: Store) -> Self {
        let time = TokioTimeProvider;
        let connections = Arc::new(ConnectionRegistry::new());
        let dispatcher = Dispatcher::new(Arc::clone(&connections), store.clone(), time);
        let scheduler = RefreshScheduler::new(
            store.clone(),
            time,
            Arc::clone(&connections),
            config.refresh_interval,
        );
        Self {
            cookies: SessionCookies::from_config(&config.session),
            config,
            store,
            time,
            connections,
            dispatcher,
            scheduler,
        }
    }
}
