//! Key generation session for a single validator key.
//!
//! An instance moves through the following states:
//!
//! 1. `Created` after an init message is accepted.
//! 2. `ExchangeCollecting` once the local exchange key is broadcast.
//! 3. `DkgRunning` when every operator has sent an exchange key.
//! 4. `OutputCollecting` when the local output is broadcast.
//! 5. `Finished` when every operator reported the same validator key.
//!
//! Any failure moves the instance to `Errored` and a session
//! that misses its deadline moves to `TimedOut`.
use bls12_381::{G1Projective, Scalar};
use dkgnode_protocol::{
    decode, encode, Exchange, Identifier, Init, KyberMessage, OperatorId,
    Output, SignedTransport, TransportType,
};
use ff::Field;
use group::Curve;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use std::{
    collections::BTreeMap,
    sync::{Arc, Weak},
};
use tokio::{
    sync::{oneshot, Mutex},
    task::AbortHandle,
};

use crate::{
    bls::{self, SecretShare},
    crypto::{encrypt, verify_transport},
    deposit::deposit_signing_root,
    dkg::{self, DkgResult, Incoming, Node, Protocol},
    Board, Config, Error, KeyGenOutput, Operator, Result,
};

/// State of a key generation session.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub enum InstanceState {
    /// Session accepted, not started.
    Created,
    /// Collecting exchange keys.
    ExchangeCollecting,
    /// Sub-protocol is running.
    DkgRunning,
    /// Collecting outputs.
    OutputCollecting,
    /// Session completed.
    Finished,
    /// Session failed.
    Errored,
    /// Session missed its deadline.
    TimedOut,
}

impl InstanceState {
    /// Whether the session can no longer make progress.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Errored | Self::TimedOut)
    }

    /// Whether sub-protocol bundles are routed in this state.
    fn accepts_bundles(&self) -> bool {
        matches!(
            self,
            Self::Created | Self::ExchangeCollecting | Self::DkgRunning
        )
    }
}

struct State {
    state: InstanceState,
    ephemeral_secret: Option<Scalar>,
    exchanges: BTreeMap<OperatorId, Exchange>,
    outputs: BTreeMap<OperatorId, Output>,
    own_output: Option<Output>,
    share: Option<SecretShare>,
    key_gen_output: Option<KeyGenOutput>,
    /// Inbound queues until the sub-protocol takes them.
    incoming: Option<Incoming>,
}

/// Key generation session.
pub struct Instance {
    identifier: Identifier,
    init: Init,
    operators: BTreeMap<OperatorId, Operator>,
    config: Config,
    board: Arc<Board>,
    state: Mutex<State>,
    tasks: std::sync::Mutex<Vec<AbortHandle>>,
}

impl Instance {
    /// Create a session for a validated init message.
    ///
    /// Every operator listed in the init message must be
    /// present in `operators`.
    pub fn new(
        identifier: Identifier,
        init: Init,
        operators: BTreeMap<OperatorId, Operator>,
        config: Config,
    ) -> Self {
        let (board, incoming) = Board::new(
            identifier,
            Arc::clone(&config.operator),
            Arc::clone(&config.network),
            operators.len(),
        );
        Self {
            identifier,
            init,
            operators,
            config,
            board: Arc::new(board),
            state: Mutex::new(State {
                state: InstanceState::Created,
                ephemeral_secret: None,
                exchanges: Default::default(),
                outputs: Default::default(),
                own_output: None,
                share: None,
                key_gen_output: None,
                incoming: Some(incoming),
            }),
            tasks: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Session identifier.
    pub fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    /// Init message of the session.
    pub fn init(&self) -> &Init {
        &self.init
    }

    /// Current state.
    pub async fn state(&self) -> InstanceState {
        self.state.lock().await.state
    }

    /// Whether the session finished.
    pub async fn is_finished(&self) -> bool {
        self.state().await == InstanceState::Finished
    }

    /// Output of a finished session.
    pub async fn key_gen_output(&self) -> Option<KeyGenOutput> {
        self.state.lock().await.key_gen_output.clone()
    }

    fn track(&self, handle: AbortHandle) {
        if let Ok(mut tasks) = self.tasks.lock() {
            tasks.push(handle);
        }
    }

    /// Operators whose exchange key was recorded.
    pub async fn exchange_signers(&self) -> Vec<OperatorId> {
        self.state.lock().await.exchanges.keys().copied().collect()
    }

    /// Operators whose output was recorded.
    pub async fn output_signers(&self) -> Vec<OperatorId> {
        self.state.lock().await.outputs.keys().copied().collect()
    }

    /// Move to a terminal state and release the inbound queues.
    fn halt(&self, state: &mut State, next: InstanceState) {
        state.state = next;
        state.incoming.take();
        self.board.halt();
    }

    /// Abort every task spawned for the session.
    pub fn shutdown(&self) {
        self.board.halt();
        if let Ok(mut tasks) = self.tasks.lock() {
            for task in tasks.drain(..) {
                task.abort();
            }
        }
    }

    /// Generate the ephemeral key and broadcast the exchange message.
    pub async fn start(self: &Arc<Self>) -> Result<()> {
        let public_key = {
            let mut state = self.state.lock().await;
            if state.state != InstanceState::Created {
                return Err(Error::AlreadyStarted(self.identifier));
            }
            let secret = Scalar::random(&mut OsRng);
            state.ephemeral_secret = Some(secret);
            state.state = InstanceState::ExchangeCollecting;
            (G1Projective::generator() * secret)
                .to_affine()
                .to_compressed()
        };

        self.spawn_deadline();

        let exchange = Exchange {
            public_key: public_key.to_vec(),
        };
        let data = encode(&exchange)
            .await
            .map_err(dkgnode_protocol::Error::from)?;
        tracing::info!(
            id = %self.identifier,
            operator = self.config.operator.id,
            "broadcast exchange"
        );
        self.board.broadcast(TransportType::Exchange, data).await
    }

    fn spawn_deadline(self: &Arc<Self>) {
        let instance = Arc::downgrade(self);
        let timeout = self.config.options.session_timeout();
        let task = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            if let Some(instance) = instance.upgrade() {
                instance.on_deadline().await;
            }
        });
        self.track(task.abort_handle());
    }

    async fn on_deadline(&self) {
        let mut state = self.state.lock().await;
        if state.state.is_terminal() {
            return;
        }
        tracing::warn!(
            id = %self.identifier,
            state = ?state.state,
            "session timed out"
        );
        self.halt(&mut state, InstanceState::TimedOut);
        drop(state);
        self.shutdown();
    }

    /// Process a signed message for this session.
    pub async fn process(self: &Arc<Self>, message: &SignedTransport) -> Result<()> {
        let signer = message.signer;
        let operator = self
            .operators
            .get(&signer)
            .ok_or(Error::UnknownSigner(signer))?;
        verify_transport(&operator.public_key, message).await?;

        let data = &message.message.data;
        match message.message.kind {
            TransportType::Exchange => {
                let exchange: Exchange = decode_payload(data).await?;
                self.process_exchange(signer, exchange).await
            }
            TransportType::KyberWrapped => {
                let kyber: KyberMessage = decode_payload(data).await?;
                self.process_kyber(signer, kyber).await
            }
            TransportType::Output => {
                let output: Output = decode_payload(data).await?;
                self.process_output(signer, output).await
            }
            kind @ (TransportType::Init | TransportType::InitReshare) => {
                Err(Error::UnknownMessageType(kind))
            }
        }
    }

    async fn process_exchange(
        self: &Arc<Self>,
        signer: OperatorId,
        exchange: Exchange,
    ) -> Result<()> {
        let public_key = bls::g1_from_bytes(&exchange.public_key)?;
        if bool::from(public_key.is_identity()) {
            return Err(Error::InvalidEncoding("exchange key"));
        }

        let mut state = self.state.lock().await;
        if state.state.is_terminal() {
            return Err(Error::SessionHalted(self.identifier, state.state));
        }
        if state.exchanges.contains_key(&signer) {
            return Err(Error::DuplicateMessage(
                TransportType::Exchange,
                signer,
            ));
        }
        state.exchanges.insert(signer, exchange);
        tracing::debug!(
            id = %self.identifier,
            signer,
            exchanges = state.exchanges.len(),
            "exchange received"
        );

        if state.exchanges.len() == self.operators.len()
            && state.state == InstanceState::ExchangeCollecting
        {
            if let Err(e) = self.start_dkg(&mut state) {
                self.halt(&mut state, InstanceState::Errored);
                drop(state);
                tracing::error!(id = %self.identifier, error = %e, "dkg start");
                self.shutdown();
                return Err(e);
            }
        }
        Ok(())
    }

    /// Build the sub-protocol from the exchange keys and spawn it
    /// along with the task waiting for its result.
    fn start_dkg(self: &Arc<Self>, state: &mut State) -> Result<()> {
        let longterm = state
            .ephemeral_secret
            .ok_or(Error::AlreadyStarted(self.identifier))?;
        let nodes = state
            .exchanges
            .iter()
            .map(|(id, exchange)| {
                Ok(Node {
                    index: *id,
                    public: bls::g1_from_bytes(&exchange.public_key)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let incoming = state
            .incoming
            .take()
            .ok_or(Error::AlreadyStarted(self.identifier))?;

        let config = dkg::Config {
            longterm,
            nonce: Sha256::digest(self.identifier.as_ref()).into(),
            nodes,
            threshold: self.init.threshold as usize,
            phase_interval: self.config.options.phase_interval(),
        };
        let board: Arc<dyn dkg::Board> = self.board.clone();
        let handle = Protocol::new(config, board, incoming)?.spawn();
        for task in handle.abort_handles() {
            self.track(task.clone());
        }
        state.state = InstanceState::DkgRunning;
        tracing::info!(id = %self.identifier, "dkg started");

        let instance = Arc::downgrade(self);
        let finalize = tokio::spawn(wait_for_dkg(instance, handle.result));
        self.track(finalize.abort_handle());
        Ok(())
    }

    async fn process_kyber(
        &self,
        signer: OperatorId,
        message: KyberMessage,
    ) -> Result<()> {
        let state = self.state().await;
        if !state.accepts_bundles() {
            tracing::debug!(
                id = %self.identifier,
                signer,
                ?state,
                "bundle ignored"
            );
            return Ok(());
        }
        // queue outside the state lock, the sub-protocol
        // may be waiting to push through the network
        self.board.dispatch(signer, message).await
    }

    /// Handle the sub-protocol result.
    async fn on_dkg_result(
        &self,
        result: std::result::Result<DkgResult, dkg::Error>,
    ) -> Result<()> {
        let output = {
            let mut state = self.state.lock().await;
            if state.state != InstanceState::DkgRunning {
                return Ok(());
            }
            match self.build_output(&mut state, result) {
                Ok(output) => output,
                Err(e) => {
                    self.halt(&mut state, InstanceState::Errored);
                    return Err(e);
                }
            }
        };

        let data = encode(&output)
            .await
            .map_err(dkgnode_protocol::Error::from)?;
        tracing::info!(
            id = %self.identifier,
            validator_pk = %hex::encode(output.validator_public_key),
            "broadcast output"
        );
        self.board.broadcast(TransportType::Output, data).await?;
        self.try_finish().await
    }

    fn build_output(
        &self,
        state: &mut State,
        result: std::result::Result<DkgResult, dkg::Error>,
    ) -> Result<Output> {
        let result = result?;
        let operator = &self.config.operator;
        if result.key.share.index != operator.id {
            return Err(Error::ShareIndexMismatch(
                operator.id,
                result.key.share.index,
            ));
        }

        let share = bls::result_to_share_secret_key(&result.key);
        let validator_public_key =
            bls::results_to_validator_pk(&result.key).to_compressed();
        let encrypted_share = encrypt(
            &operator.private_key.to_public_key(),
            &share.to_bytes(),
        )?;
        let root = deposit_signing_root(
            &validator_public_key,
            &self.init.withdrawal_credentials,
            &self.init.fork,
        )?;

        let output = Output {
            encrypted_share,
            share_public_key: share.public_key().to_compressed().to_vec(),
            validator_public_key,
            deposit_data_partial_signature: share.sign(&root),
        };
        state.share = Some(share);
        state.own_output = Some(output.clone());
        state.state = InstanceState::OutputCollecting;
        Ok(output)
    }

    async fn process_output(
        &self,
        signer: OperatorId,
        output: Output,
    ) -> Result<()> {
        {
            let mut state = self.state.lock().await;
            if state.state.is_terminal() {
                return Err(Error::SessionHalted(
                    self.identifier,
                    state.state,
                ));
            }
            if state.outputs.contains_key(&signer) {
                return Err(Error::DuplicateMessage(
                    TransportType::Output,
                    signer,
                ));
            }
            state.outputs.insert(signer, output);
        }
        self.try_finish().await
    }

    /// Finish once the local output exists and every operator
    /// reported an output.
    async fn try_finish(&self) -> Result<()> {
        let output = {
            let mut state = self.state.lock().await;
            if state.state != InstanceState::OutputCollecting
                || state.outputs.len() != self.operators.len()
            {
                return Ok(());
            }
            let (Some(own), Some(share)) =
                (state.own_output.as_ref(), state.share)
            else {
                return Ok(());
            };

            let validator_pk = own.validator_public_key;
            if let Some((id, _)) = state
                .outputs
                .iter()
                .find(|(_, o)| o.validator_public_key != validator_pk)
            {
                let id = *id;
                self.halt(&mut state, InstanceState::Errored);
                self.shutdown();
                return Err(Error::ValidatorKeyInconsistency(id));
            }

            let output = KeyGenOutput {
                identifier: self.identifier,
                share,
                outputs: state.outputs.clone(),
                validator_pk,
                threshold: self.init.threshold,
            };
            state.key_gen_output = Some(output.clone());
            self.halt(&mut state, InstanceState::Finished);
            output
        };

        tracing::info!(
            id = %self.identifier,
            validator_pk = %hex::encode(output.validator_pk),
            "key generation finished"
        );
        if let Err(e) = self.config.storage.save_key_gen_output(&output).await
        {
            tracing::error!(id = %self.identifier, error = %e, "save output");
        }
        self.shutdown();
        Ok(())
    }
}

impl Drop for Instance {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn wait_for_dkg(
    instance: Weak<Instance>,
    result: oneshot::Receiver<std::result::Result<DkgResult, dkg::Error>>,
) {
    let result = result.await.unwrap_or(Err(dkg::Error::Cancelled));
    let Some(instance) = instance.upgrade() else {
        return;
    };
    if let Err(e) = instance.on_dkg_result(result).await {
        tracing::error!(
            id = %instance.identifier,
            error = %e,
            "key generation failed"
        );
        if instance.state().await.is_terminal() {
            instance.shutdown();
        }
    }
}

async fn decode_payload<T>(data: &[u8]) -> Result<T>
where
    T: binary_stream::futures::Decodable + Default,
{
    Ok(decode(data).await.map_err(dkgnode_protocol::Error::from)?)
}
