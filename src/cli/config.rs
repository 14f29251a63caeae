use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::api::ApiClient;
use crate::auth::{JwtDecoder, SystemClock};
use crate::config::PanelConfig;
use crate::session::{navigate, CredentialStore, DashboardPage, FileCredentialStore, RenderDecision, Route, SessionGuard};

const TOKEN_FILE: &str = "token";

pub fn get_config_dir() -> anyhow::Result<PathBuf> {
    let config_dir = if let Ok(custom_dir) = std::env::var("HOTEL_ADMIN_CONFIG_DIR") {
        PathBuf::from(custom_dir)
    } else {
        let home = std::env::var("HOME").map_err(|_| anyhow::anyhow!("HOME environment variable not set"))?;
        PathBuf::from(home).join(".config").join("hotel-admin")
    };

    if !config_dir.exists() {
        fs::create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}

pub fn token_path(config_dir: &Path) -> PathBuf {
    config_dir.join(TOKEN_FILE)
}

/// Everything a command needs: settings, the shared token file and an HTTP
/// client that reads its bearer token from that file.
pub struct CliContext {
    pub config: PanelConfig,
    pub store: Arc<FileCredentialStore>,
    pub client: ApiClient,
}

impl CliContext {
    pub fn load() -> anyhow::Result<Self> {
        let config = crate::config::config().clone();
        Self::with_config_dir(config, &get_config_dir()?)
    }

    pub fn with_config_dir(config: PanelConfig, config_dir: &Path) -> anyhow::Result<Self> {
        let store = Arc::new(FileCredentialStore::new(
            token_path(config_dir),
            Duration::from_millis(config.session.watch_interval_ms),
        ));
        let credentials: Arc<dyn CredentialStore> = store.clone();
        let client = ApiClient::new(&config.api, credentials)?;
        tracing::debug!("Using API at {} with token file {}", client.base_url(), store.path().display());
        Ok(Self { config, store, client })
    }

    pub fn guard(&self) -> SessionGuard {
        SessionGuard::new(
            self.store.clone(),
            Arc::new(JwtDecoder),
            Arc::new(SystemClock),
            &self.config.session,
        )
    }

    /// Mount a guard and check that `page` may be shown.
    pub fn open_page(&self, page: DashboardPage) -> anyhow::Result<SessionGuard> {
        let mut guard = self.guard();
        guard.mount();

        let route = Route::Dashboard(page);
        match navigate(&route, &guard.state().status, &self.config.session) {
            RenderDecision::Render => Ok(guard),
            RenderDecision::RedirectTo(target) => {
                tracing::debug!("{} redirected to {}", route.path(), target);
                Err(anyhow::anyhow!("not logged in (run `hotel-admin auth login <email>`)"))
            }
            other => Err(anyhow::anyhow!("Cannot open {}: {:?}", route.path(), other)),
        }
    }
}
