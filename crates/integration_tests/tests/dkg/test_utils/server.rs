use anyhow::{bail, Result};
use axum_server::Handle;
use dkgnode_driver::{Config, Controller, DkgOptions, MemoryStorage, Operator, OperatorOwner};
use dkgnode_server::{HttpNetwork, NodeServer};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use url::Url;

const ADDR: &str = "127.0.0.1:0";

/// Node served over HTTP on a local port.
pub struct HttpNode {
    pub url: Url,
    pub controller: Arc<Controller>,
    pub network: Arc<HttpNetwork>,
    pub _shutdown: ShutdownHandle,
}

/// Ensure the server is shutdown when the handle is dropped.
pub struct ShutdownHandle(Handle);

impl Drop for ShutdownHandle {
    fn drop(&mut self) {
        tracing::info!("shutdown node server");
        self.0.shutdown();
    }
}

/// Start a node server and wait until it is listening.
pub async fn spawn_node(
    owner: Arc<OperatorOwner>,
    directory: Vec<Operator>,
    options: DkgOptions,
) -> Result<HttpNode> {
    let storage = Arc::new(MemoryStorage::new(directory));
    let network = Arc::new(HttpNetwork::new(vec![])?);
    let controller = Arc::new(Controller::new(Config {
        operator: owner,
        network: network.clone(),
        storage: storage.clone(),
        options,
    }));

    let handle = Handle::new();
    let server = NodeServer::new(Arc::clone(&controller), storage, None);
    let addr: SocketAddr = ADDR.parse()?;
    let listen = handle.clone();
    tokio::spawn(async move {
        if let Err(e) = server.start(addr, listen).await {
            tracing::error!(error = %e, "node server");
        }
    });

    let Ok(Some(addr)) =
        tokio::time::timeout(Duration::from_secs(5), handle.listening()).await
    else {
        bail!("node server did not start");
    };
    tracing::info!("server has started {:#?}", addr);

    Ok(HttpNode {
        url: format!("http://{}", addr).parse()?,
        controller,
        network,
        _shutdown: ShutdownHandle(handle),
    })
}
