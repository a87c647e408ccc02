use dkgnode_protocol::{
    decode, Identifier, Init, OperatorId, SignedTransport, TransportType,
};
use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    sync::Arc,
};
use tokio::sync::RwLock;

use crate::{
    crypto::verify_transport, deposit::WITHDRAWAL_CREDENTIALS_LEN, Config,
    Error, Instance, InstanceState, Result,
};

/// Registry of key generation sessions for the local operator.
///
/// Init messages create sessions, all other messages are
/// routed to the session named by their identifier.
pub struct Controller {
    config: Config,
    instances: RwLock<HashMap<Identifier, Arc<Instance>>>,
}

impl Controller {
    /// Create a controller.
    pub fn new(config: Config) -> Self {
        Self {
            config,
            instances: Default::default(),
        }
    }

    /// Local operator identifier.
    pub fn operator_id(&self) -> OperatorId {
        self.config.operator.id
    }

    /// Process an inbound message.
    pub async fn process(&self, message: SignedTransport) -> Result<()> {
        let identifier = message.message.identifier;
        tracing::debug!(
            id = %identifier,
            kind = %message.message.kind,
            signer = message.signer,
            "process message"
        );
        match message.message.kind {
            TransportType::Init => self.process_init(message).await,
            TransportType::InitReshare => Err(Error::ReshareNotSupported),
            _ => {
                let instance = self
                    .get_instance(&identifier)
                    .await
                    .ok_or(Error::SessionNotFound(identifier))?;
                instance.process(&message).await
            }
        }
    }

    async fn process_init(&self, message: SignedTransport) -> Result<()> {
        let identifier = message.message.identifier;
        let init: Init = decode(&message.message.data)
            .await
            .map_err(dkgnode_protocol::Error::from)?;
        validate_init(&init, self.config.operator.id)?;

        if !init.operators.contains(&message.signer) {
            return Err(Error::UnknownSigner(message.signer));
        }

        let mut operators = BTreeMap::new();
        for id in &init.operators {
            let operator = self
                .config
                .storage
                .get_operator(*id)
                .await
                .map_err(|e| {
                    tracing::warn!(operator = id, error = %e, "resolve operator");
                    Error::OperatorResolutionFailed(*id)
                })?
                .ok_or(Error::OperatorResolutionFailed(*id))?;
            operators.insert(*id, operator);
        }

        if let Some(signer) = operators.get(&message.signer) {
            verify_transport(&signer.public_key, &message).await?;
        }

        let instance = {
            let mut writer = self.instances.write().await;
            if writer.contains_key(&identifier) {
                return Err(Error::SessionAlreadyExists(identifier));
            }
            let instance = Arc::new(Instance::new(
                identifier,
                init,
                operators,
                self.config.clone(),
            ));
            writer.insert(identifier, Arc::clone(&instance));
            instance
        };

        tracing::info!(
            id = %identifier,
            operators = ?instance.init().operators,
            threshold = instance.init().threshold,
            "session created"
        );

        let delay = self.config.options.start_delay();
        let instance = Arc::downgrade(&instance);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(instance) = instance.upgrade() else {
                return;
            };
            if let Err(e) = instance.start().await {
                tracing::error!(
                    id = %instance.identifier(),
                    error = %e,
                    "session start"
                );
            }
        });

        Ok(())
    }

    /// Find a session.
    pub async fn get_instance(
        &self,
        identifier: &Identifier,
    ) -> Option<Arc<Instance>> {
        let reader = self.instances.read().await;
        reader.get(identifier).cloned()
    }

    /// Remove a session and abort its tasks.
    pub async fn remove_instance(
        &self,
        identifier: &Identifier,
    ) -> Option<Arc<Instance>> {
        let mut writer = self.instances.write().await;
        let instance = writer.remove(identifier);
        if let Some(instance) = &instance {
            instance.shutdown();
        }
        instance
    }

    /// Identifiers and states of all sessions.
    pub async fn sessions(&self) -> Vec<(Identifier, InstanceState)> {
        let instances: Vec<Arc<Instance>> = {
            let reader = self.instances.read().await;
            reader.values().cloned().collect()
        };
        let mut sessions = Vec::with_capacity(instances.len());
        for instance in instances {
            sessions.push((*instance.identifier(), instance.state().await));
        }
        sessions
    }
}

/// Check the parameters of an init message for the local operator.
pub fn validate_init(init: &Init, local: OperatorId) -> Result<()> {
    if init.operators.is_empty() {
        return Err(Error::InvalidInit("no operators".to_owned()));
    }
    let unique: BTreeSet<&OperatorId> = init.operators.iter().collect();
    if unique.len() != init.operators.len() {
        return Err(Error::InvalidInit("duplicate operator".to_owned()));
    }
    if init.threshold == 0 || init.threshold > init.operators.len() as u64 {
        return Err(Error::InvalidInit(format!(
            "threshold {} for {} operators",
            init.threshold,
            init.operators.len()
        )));
    }
    if init.withdrawal_credentials.len() > WITHDRAWAL_CREDENTIALS_LEN {
        return Err(Error::InvalidInit(format!(
            "withdrawal credentials must be at most {} bytes",
            WITHDRAWAL_CREDENTIALS_LEN
        )));
    }
    if !init.operators.contains(&local) {
        return Err(Error::NotParticipant(local));
    }
    Ok(())
}
