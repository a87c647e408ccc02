use anyhow::{bail, Result};
use dkgnode_driver::{
    crypto::sign_transport, keypair::generate_keypair, Config, Controller,
    DkgOptions, InstanceState, MemoryStorage, Operator, OperatorOwner,
};
use dkgnode_protocol::{
    encode, Identifier, Init, OperatorId, SignedTransport, Transport,
    TransportType,
};
use std::{collections::BTreeMap, sync::Arc, time::Duration};

mod network;
mod server;

pub use network::LocalNetwork;
pub use server::spawn_node;

/// Key size for test operators.
pub const KEY_BITS: usize = 1024;

pub fn init_tracing() {
    use tracing_subscriber::{
        layer::SubscriberExt, util::SubscriberInitExt,
    };
    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "dkgnode_driver=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().without_time())
        .try_init();
}

pub fn options() -> DkgOptions {
    DkgOptions {
        phase_interval: 1000,
        session_timeout: 60,
        start_delay: 200,
    }
}

/// Operator keys for a directory of identifiers.
pub fn owners(
    ids: &[OperatorId],
) -> Result<BTreeMap<OperatorId, Arc<OperatorOwner>>> {
    let mut owners = BTreeMap::new();
    for id in ids {
        owners.insert(
            *id,
            Arc::new(OperatorOwner::new(*id, generate_keypair(KEY_BITS)?)),
        );
    }
    Ok(owners)
}

pub struct Node {
    pub owner: Arc<OperatorOwner>,
    pub controller: Arc<Controller>,
    pub storage: Arc<MemoryStorage>,
}

/// Operator nodes connected by a [LocalNetwork].
pub struct Cluster {
    pub network: Arc<LocalNetwork>,
    pub owners: BTreeMap<OperatorId, Arc<OperatorOwner>>,
    pub nodes: BTreeMap<OperatorId, Node>,
}

impl Cluster {
    /// Start a node for each of `running`, every node knows
    /// the keys of all of `directory`.
    pub async fn new(
        running: &[OperatorId],
        directory: &[OperatorId],
        options: DkgOptions,
    ) -> Result<Self> {
        let owners = owners(directory)?;
        let network = Arc::new(LocalNetwork::default());
        let mut nodes = BTreeMap::new();
        for id in running {
            let Some(owner) = owners.get(id).cloned() else {
                bail!("operator {} is not in the directory", id);
            };
            let storage = Arc::new(MemoryStorage::new(
                owners.values().map(|o| o.operator()),
            ));
            let controller = Arc::new(Controller::new(Config {
                operator: Arc::clone(&owner),
                network: network.clone(),
                storage: storage.clone(),
                options: options.clone(),
            }));
            network.join(&controller).await;
            nodes.insert(
                *id,
                Node {
                    owner,
                    controller,
                    storage,
                },
            );
        }
        Ok(Self {
            network,
            owners,
            nodes,
        })
    }

    pub fn owner(&self, id: OperatorId) -> Result<&Arc<OperatorOwner>> {
        match self.owners.get(&id) {
            Some(owner) => Ok(owner),
            None => bail!("unknown operator {}", id),
        }
    }

    pub fn node(&self, id: OperatorId) -> Result<&Node> {
        match self.nodes.get(&id) {
            Some(node) => Ok(node),
            None => bail!("no node for operator {}", id),
        }
    }

    /// Deliver an init message to every node.
    pub async fn init(&self, message: &SignedTransport) -> Result<()> {
        for node in self.nodes.values() {
            node.controller.process(message.clone()).await?;
        }
        Ok(())
    }

    /// Wait until every node reaches `expected`.
    pub async fn wait_for(
        &self,
        identifier: &Identifier,
        expected: InstanceState,
        timeout: Duration,
    ) -> Result<()> {
        for node in self.nodes.values() {
            wait_for_state(&node.controller, identifier, expected, timeout)
                .await?;
        }
        Ok(())
    }
}

pub fn init(operators: Vec<OperatorId>, threshold: u64) -> Init {
    Init {
        operators,
        threshold,
        withdrawal_credentials: vec![0u8; 30],
        fork: [0; 4],
    }
}

/// Sign a payload as a session message.
pub async fn signed(
    owner: &OperatorOwner,
    identifier: Identifier,
    kind: TransportType,
    data: Vec<u8>,
) -> Result<SignedTransport> {
    let message = Transport {
        kind,
        identifier,
        data,
    };
    Ok(sign_transport(&owner.private_key, owner.id, message).await?)
}

/// Signed init message for a new session.
pub async fn init_message(
    owner: &OperatorOwner,
    init: &Init,
) -> Result<(Identifier, SignedTransport)> {
    let identifier = Identifier::random();
    let message =
        signed(owner, identifier, TransportType::Init, encode(init).await?)
            .await?;
    Ok((identifier, message))
}

pub async fn wait_for_state(
    controller: &Controller,
    identifier: &Identifier,
    expected: InstanceState,
    timeout: Duration,
) -> Result<()> {
    let poll = async {
        loop {
            let state = match controller.get_instance(identifier).await {
                Some(instance) => Some(instance.state().await),
                None => None,
            };
            match state {
                Some(state) if state == expected => return Ok(()),
                Some(state) if state.is_terminal() => {
                    bail!(
                        "operator {} reached {:?}, expected {:?}",
                        controller.operator_id(),
                        state,
                        expected
                    )
                }
                _ => tokio::time::sleep(Duration::from_millis(50)).await,
            }
        }
    };
    match tokio::time::timeout(timeout, poll).await {
        Ok(result) => result,
        Err(_) => bail!(
            "operator {} did not reach {:?}",
            controller.operator_id(),
            expected
        ),
    }
}

pub fn directory(owners: &BTreeMap<OperatorId, Arc<OperatorOwner>>) -> Vec<Operator> {
    owners.values().map(|o| o.operator()).collect()
}
