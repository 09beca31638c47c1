//! Process-wide pool of provider connections.
//!
//! Connecting to providers is expensive (process spawn + handshake +
//! discovery), so the pool connects lazily on first use and keeps the
//! result as an immutable [`PoolSnapshot`]. [`ProviderPool::refresh`]
//! swaps in a new snapshot; turns that already hold the old one finish
//! against it.

use super::client::{McpClient, ProviderSpec};
use super::error::Result;
use super::protocol::RemoteToolDefinition;
use futures::FutureExt;
use futures::future::BoxFuture;
use std::sync::{Arc, OnceLock};
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

/// Opens a client for a spec
pub type Connector =
    Arc<dyn Fn(ProviderSpec) -> BoxFuture<'static, Result<McpClient>> + Send + Sync>;

static GLOBAL_POOL: OnceLock<Arc<ProviderPool>> = OnceLock::new();

/// A connected provider and the tools it announced
pub struct ConnectedProvider {
    pub client: Arc<McpClient>,
    pub tools: Vec<RemoteToolDefinition>,
}

impl ConnectedProvider {
    pub fn id(&self) -> &str {
        &self.client.spec().id
    }
}

/// Providers that failed to connect or list tools
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderFailure {
    pub provider_id: String,
    pub message: String,
}

/// Immutable view of the pool at one point in time
#[derive(Default)]
pub struct PoolSnapshot {
    pub providers: Vec<ConnectedProvider>,
    pub failures: Vec<ProviderFailure>,
}

impl PoolSnapshot {
    pub fn provider(&self, id: &str) -> Option<&ConnectedProvider> {
        self.providers.iter().find(|p| p.id() == id)
    }

    pub fn tool_count(&self) -> usize {
        self.providers.iter().map(|p| p.tools.len()).sum()
    }

    /// Whether every provider is still usable with its announced tools
    fn is_current(&self) -> bool {
        self.providers
            .iter()
            .all(|p| p.client.is_alive() && !p.client.tools_changed())
    }
}

pub struct ProviderPool {
    specs: Vec<ProviderSpec>,
    connector: Connector,
    snapshot: RwLock<Option<Arc<PoolSnapshot>>>,
    /// Serializes (re)connects so concurrent turns share one build
    build_lock: Mutex<()>,
}

impl ProviderPool {
    /// Pool that spawns real provider processes
    pub fn new(specs: Vec<ProviderSpec>) -> Self {
        let connector: Connector = Arc::new(|spec| McpClient::connect(spec).boxed());
        Self::with_connector(specs, connector)
    }

    pub fn with_connector(specs: Vec<ProviderSpec>, connector: Connector) -> Self {
        Self {
            specs,
            connector,
            snapshot: RwLock::new(None),
            build_lock: Mutex::new(()),
        }
    }

    /// Install the process-wide pool. The first call wins; later calls
    /// return the already installed pool.
    pub fn init_global(specs: Vec<ProviderSpec>) -> Arc<ProviderPool> {
        Arc::clone(GLOBAL_POOL.get_or_init(|| Arc::new(ProviderPool::new(specs))))
    }

    pub fn global() -> Option<Arc<ProviderPool>> {
        GLOBAL_POOL.get().cloned()
    }

    pub fn configured_count(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Current snapshot, connecting on first use. A snapshot with a dead
    /// provider or a changed tool list is rebuilt.
    pub async fn snapshot(&self) -> Arc<PoolSnapshot> {
        if let Some(current) = self.snapshot.read().await.as_ref()
            && current.is_current()
        {
            return Arc::clone(current);
        }

        let _guard = self.build_lock.lock().await;
        // Another turn may have rebuilt while we waited
        if let Some(current) = self.snapshot.read().await.as_ref()
            && current.is_current()
        {
            return Arc::clone(current);
        }
        self.rebuild().await
    }

    /// Reconnect every provider and swap in the new snapshot
    pub async fn refresh(&self) -> Arc<PoolSnapshot> {
        let _guard = self.build_lock.lock().await;
        self.rebuild().await
    }

    async fn rebuild(&self) -> Arc<PoolSnapshot> {
        let snapshot = Arc::new(self.connect_all().await);
        *self.snapshot.write().await = Some(Arc::clone(&snapshot));
        snapshot
    }

    async fn connect_all(&self) -> PoolSnapshot {
        let attempts = self.specs.iter().cloned().map(|spec| {
            let connector = Arc::clone(&self.connector);
            async move {
                let id = spec.id.clone();
                let outcome = async {
                    let client = connector(spec).await?;
                    let tools = client.list_tools().await?;
                    Ok::<_, super::error::McpError>(ConnectedProvider {
                        client: Arc::new(client),
                        tools,
                    })
                }
                .await;
                (id, outcome)
            }
        });

        let mut snapshot = PoolSnapshot::default();
        for (id, outcome) in futures::future::join_all(attempts).await {
            match outcome {
                Ok(provider) => {
                    info!(provider = %id, tools = provider.tools.len(), "Provider connected");
                    snapshot.providers.push(provider);
                }
                Err(e) => {
                    warn!(provider = %id, "Provider unavailable: {}", e);
                    snapshot.failures.push(ProviderFailure {
                        provider_id: id,
                        message: e.to_string(),
                    });
                }
            }
        }
        snapshot
    }
}
