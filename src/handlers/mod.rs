pub mod health;
pub mod redirect;
pub mod register;

pub use health::{health_handler, openapi_handler};
pub use redirect::{home_handler, redirect_handler};
pub use register::register_handler;

#[cfg(test)]
pub(crate) mod test_support {
    use crate::config::Config;
    use crate::routes;
    use crate::state::AppState;
    use crate::store::{CreateOutcome, LinkStore};
    use async_trait::async_trait;
    use axum::{Router, extract::connect_info::MockConnectInfo};
    use std::net::{IpAddr, Ipv4Addr, SocketAddr};
    use std::sync::Arc;

    pub const ALLOWED_IP: IpAddr = IpAddr::V4(Ipv4Addr::new(203, 0, 113, 7));
    pub const OTHER_IP: IpAddr = IpAddr::V4(Ipv4Addr::new(198, 51, 100, 9));
    pub const HOME: &str = "https://home.example.org/";

    /// Store whose every call fails, as when the database is unreachable
    pub struct FailingStore;

    #[async_trait]
    impl LinkStore for FailingStore {
        async fn fetch(&self, _short_path: &str) -> anyhow::Result<Option<String>> {
            Err(anyhow::anyhow!("store unavailable"))
        }

        async fn create(&self, _short_path: &str, _long_url: &str) -> anyhow::Result<CreateOutcome> {
            Err(anyhow::anyhow!("store unavailable"))
        }

        async fn health_check(&self) -> anyhow::Result<()> {
            Err(anyhow::anyhow!("store unavailable"))
        }
    }

    /// Full router over `store`, with requests arriving from `peer`
    pub fn app_from(store: Arc<dyn LinkStore>, peer: IpAddr) -> Router {
        app_with_config(store, Config::for_tests(ALLOWED_IP), peer)
    }

    pub fn app_with_config(store: Arc<dyn LinkStore>, config: Config, peer: IpAddr) -> Router {
        let state = AppState {
            store,
            config: Arc::new(config),
        };

        routes::router(state).layer(MockConnectInfo(SocketAddr::new(peer, 40123)))
    }
}
