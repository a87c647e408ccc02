use bls12_381::{G1Projective, Scalar};
use ff::Field;
use group::Curve;
use rand::rngs::OsRng;
use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};
use tokio::{sync::oneshot, task::AbortHandle};

use super::{
    ecies, Board, Config, Deal, DealBundle, DistKeyShare, DkgResult,
    Error, Incoming, Justification, JustificationBundle, Phase,
    PriPoly, PriShare, PubPoly, Response, ResponseBundle, TimePhaser,
};
use crate::bls::{scalar_from_be_bytes, scalar_to_be_bytes};

/// Handle to a spawned protocol run.
pub struct DkgHandle {
    /// Receives the outcome of the run exactly once.
    pub result: oneshot::Receiver<Result<DkgResult, Error>>,
    handles: Vec<AbortHandle>,
}

impl DkgHandle {
    /// Handles to abort the protocol tasks.
    pub fn abort_handles(&self) -> &[AbortHandle] {
        &self.handles
    }
}

/// State of a single protocol run.
pub struct Protocol {
    config: Config,
    index: u64,
    board: Arc<dyn Board>,
    incoming: Option<Incoming>,
    phase: Phase,
    poly: PriPoly,

    deals: BTreeMap<u64, DealBundle>,
    responses: BTreeMap<u64, ResponseBundle>,
    justifications: BTreeMap<u64, JustificationBundle>,

    /// Commitments of dealers with well-formed bundles.
    commitments: BTreeMap<u64, PubPoly>,
    /// Verified shares for the local node by dealer.
    shares: BTreeMap<u64, Scalar>,
    /// Complaining share holders by dealer.
    complaints: BTreeMap<u64, BTreeSet<u64>>,
    disqualified: BTreeSet<u64>,
}

impl Protocol {
    /// Create a protocol run.
    pub fn new(
        config: Config,
        board: Arc<dyn Board>,
        incoming: Incoming,
    ) -> Result<Self, Error> {
        let total = config.nodes.len();
        if total == 0 {
            return Err(Error::InvalidConfig("no nodes".to_owned()));
        }
        let indices: BTreeSet<u64> =
            config.nodes.iter().map(|n| n.index).collect();
        if indices.len() != total {
            return Err(Error::InvalidConfig(
                "duplicate node index".to_owned(),
            ));
        }
        if config.threshold == 0 || config.threshold > total {
            return Err(Error::InvalidConfig(format!(
                "threshold {} for {} nodes",
                config.threshold, total
            )));
        }

        let public = (G1Projective::generator() * config.longterm).to_affine();
        let index = config
            .nodes
            .iter()
            .find(|n| n.public == public)
            .map(|n| n.index)
            .ok_or(Error::NotInNodes)?;

        let poly = PriPoly::random(config.threshold, &mut OsRng);

        Ok(Self {
            config,
            index,
            board,
            incoming: Some(incoming),
            phase: Phase::Init,
            poly,
            deals: Default::default(),
            responses: Default::default(),
            justifications: Default::default(),
            commitments: Default::default(),
            shares: Default::default(),
            complaints: Default::default(),
            disqualified: Default::default(),
        })
    }

    /// Share index of the local node.
    pub fn index(&self) -> u64 {
        self.index
    }

    /// Spawn the phaser and the protocol tasks.
    pub fn spawn(self) -> DkgHandle {
        let (phaser, phases) = TimePhaser::new(self.config.phase_interval);
        let (tx, rx) = oneshot::channel();
        let phaser = tokio::spawn(phaser.start());
        let phaser_handle = phaser.abort_handle();
        let task = tokio::spawn(async move {
            let result = self.run(phases).await;
            phaser_handle.abort();
            if tx.send(result).is_err() {
                tracing::debug!("dkg result receiver dropped");
            }
        });
        DkgHandle {
            result: rx,
            handles: vec![phaser.abort_handle(), task.abort_handle()],
        }
    }

    /// Drive the protocol to completion.
    pub async fn run(
        mut self,
        mut phases: tokio::sync::mpsc::Receiver<Phase>,
    ) -> Result<DkgResult, Error> {
        let Incoming {
            mut deals,
            mut responses,
            mut justifications,
        } = self.incoming.take().ok_or(Error::Cancelled)?;

        loop {
            tokio::select! {
                phase = phases.recv() => {
                    let Some(phase) = phase else {
                        return Err(Error::Cancelled);
                    };
                    tracing::debug!(index = self.index, ?phase, "dkg phase");
                    match phase {
                        Phase::Init => {}
                        Phase::Deal => self.send_deals().await?,
                        Phase::Response => self.send_responses().await,
                        Phase::Justification => {
                            if let Some(result) =
                                self.send_justifications().await?
                            {
                                return Ok(result);
                            }
                        }
                        Phase::Finish => {
                            self.phase = Phase::Finish;
                            self.process_justifications();
                            return self.finalize();
                        }
                    }
                }
                Some(bundle) = deals.recv() => self.on_deal(bundle),
                Some(bundle) = responses.recv() => self.on_response(bundle),
                Some(bundle) = justifications.recv() => {
                    self.on_justification(bundle)
                }
            }
        }
    }

    fn is_node(&self, index: u64) -> bool {
        self.config.nodes.iter().any(|n| n.index == index)
    }

    fn check_session(&self, session_id: &[u8], index: u64) -> bool {
        if session_id != self.config.nonce {
            tracing::warn!(index, "bundle for another session");
            return false;
        }
        if !self.is_node(index) {
            tracing::warn!(index, "bundle from unknown node");
            return false;
        }
        true
    }

    fn on_deal(&mut self, bundle: DealBundle) {
        if self.phase >= Phase::Response {
            tracing::debug!(dealer = bundle.dealer_index, "late deal bundle");
            return;
        }
        if self.check_session(&bundle.session_id, bundle.dealer_index) {
            self.deals.entry(bundle.dealer_index).or_insert(bundle);
        }
    }

    fn on_response(&mut self, bundle: ResponseBundle) {
        if self.phase >= Phase::Justification {
            tracing::debug!(holder = bundle.share_index, "late response bundle");
            return;
        }
        if self.check_session(&bundle.session_id, bundle.share_index) {
            self.responses.entry(bundle.share_index).or_insert(bundle);
        }
    }

    fn on_justification(&mut self, bundle: JustificationBundle) {
        if self.phase >= Phase::Finish {
            tracing::debug!(
                dealer = bundle.dealer_index,
                "late justification bundle"
            );
            return;
        }
        if self.check_session(&bundle.session_id, bundle.dealer_index) {
            self.justifications
                .entry(bundle.dealer_index)
                .or_insert(bundle);
        }
    }

    async fn send_deals(&mut self) -> Result<(), Error> {
        self.phase = Phase::Deal;
        let mut deals = Vec::with_capacity(self.config.nodes.len());
        for node in &self.config.nodes {
            let share = scalar_to_be_bytes(&self.poly.eval(node.index));
            let encrypted_share = ecies::encrypt(
                &node.public,
                &share,
                &self.config.nonce,
                &mut OsRng,
            )?;
            deals.push(Deal {
                share_index: node.index,
                encrypted_share,
            });
        }
        let bundle = DealBundle {
            dealer_index: self.index,
            deals,
            public: DealBundle::encode_public(&self.poly.commit()),
            session_id: self.config.nonce.to_vec(),
        };
        self.deals.insert(self.index, bundle.clone());
        self.board.push_deals(&bundle).await;
        Ok(())
    }

    /// Verify the deal of a dealer for the local node.
    fn verify_deal(&mut self, bundle: &DealBundle) -> bool {
        let dealer = bundle.dealer_index;
        let public = match bundle.public_poly() {
            Ok(public) if public.threshold() == self.config.threshold => {
                public
            }
            _ => {
                tracing::warn!(dealer, "malformed commitments");
                self.disqualified.insert(dealer);
                return false;
            }
        };
        self.commitments.insert(dealer, public.clone());

        let Some(deal) =
            bundle.deals.iter().find(|d| d.share_index == self.index)
        else {
            tracing::warn!(dealer, "no deal for local node");
            return false;
        };

        let share = ecies::decrypt(
            &self.config.longterm,
            &deal.encrypted_share,
            &self.config.nonce,
        )
        .ok()
        .and_then(|plain| scalar_from_be_bytes(&plain).ok());

        match share {
            Some(share) if public.verify_share(self.index, &share) => {
                self.shares.insert(dealer, share);
                true
            }
            _ => {
                tracing::warn!(dealer, "invalid deal for local node");
                false
            }
        }
    }

    async fn send_responses(&mut self) {
        self.phase = Phase::Response;
        let dealers: Vec<u64> =
            self.config.nodes.iter().map(|n| n.index).collect();
        let mut responses = Vec::with_capacity(dealers.len());
        for dealer in dealers {
            let status = match self.deals.get(&dealer).cloned() {
                Some(bundle) => self.verify_deal(&bundle),
                None => {
                    tracing::warn!(dealer, "missing deal bundle");
                    false
                }
            };
            responses.push(Response {
                dealer_index: dealer,
                status,
            });
        }
        let bundle = ResponseBundle {
            share_index: self.index,
            responses,
            session_id: self.config.nonce.to_vec(),
        };
        self.responses.insert(self.index, bundle.clone());
        self.board.push_responses(&bundle).await;
    }

    /// Process responses and send justifications when the
    /// local node has complaints against it.
    ///
    /// Finishes early when there are no complaints.
    async fn send_justifications(
        &mut self,
    ) -> Result<Option<DkgResult>, Error> {
        self.phase = Phase::Justification;
        for (holder, bundle) in &self.responses {
            for response in &bundle.responses {
                if !response.status && self.is_node(response.dealer_index) {
                    self.complaints
                        .entry(response.dealer_index)
                        .or_default()
                        .insert(*holder);
                }
            }
        }

        if self.complaints.is_empty() {
            tracing::debug!(index = self.index, "no complaints");
            return self.finalize().map(Some);
        }

        if let Some(holders) = self.complaints.get(&self.index) {
            let justifications = holders
                .iter()
                .map(|holder| {
                    Justification::new(*holder, &self.poly.eval(*holder))
                })
                .collect();
            let bundle = JustificationBundle {
                dealer_index: self.index,
                justifications,
                session_id: self.config.nonce.to_vec(),
            };
            tracing::info!(
                index = self.index,
                complaints = holders.len(),
                "justifying complaints"
            );
            self.justifications.insert(self.index, bundle.clone());
            self.board.push_justifications(&bundle).await;
        }
        Ok(None)
    }

    fn process_justifications(&mut self) {
        for (dealer, holders) in &self.complaints {
            let Some(public) = self.commitments.get(dealer) else {
                self.disqualified.insert(*dealer);
                continue;
            };
            let Some(bundle) = self.justifications.get(dealer) else {
                tracing::warn!(dealer, "complaints not justified");
                self.disqualified.insert(*dealer);
                continue;
            };
            for holder in holders {
                let share = bundle
                    .justifications
                    .iter()
                    .find(|j| j.share_index == *holder)
                    .and_then(|j| j.share().ok());
                match share {
                    Some(share) if public.verify_share(*holder, &share) => {
                        if *holder == self.index {
                            self.shares.insert(*dealer, share);
                        }
                    }
                    _ => {
                        tracing::warn!(
                            dealer,
                            holder,
                            "invalid justification"
                        );
                        self.disqualified.insert(*dealer);
                        break;
                    }
                }
            }
        }
    }

    fn finalize(&self) -> Result<DkgResult, Error> {
        let mut qual = Vec::new();
        let mut value = Scalar::ZERO;
        let mut public: Option<PubPoly> = None;
        for node in &self.config.nodes {
            if self.disqualified.contains(&node.index) {
                continue;
            }
            let (Some(commits), Some(share)) = (
                self.commitments.get(&node.index),
                self.shares.get(&node.index),
            ) else {
                continue;
            };
            value += share;
            public = match public {
                None => Some(commits.clone()),
                Some(sum) => Some(
                    sum.add(commits)
                        .ok_or(Error::InvalidBundle("commitment length"))?,
                ),
            };
            qual.push(node.index);
        }

        if qual.len() < self.config.threshold {
            return Err(Error::NotEnoughQualified(
                qual.len(),
                self.config.threshold,
            ));
        }
        let public = public.ok_or(Error::NotEnoughQualified(
            0,
            self.config.threshold,
        ))?;

        tracing::info!(index = self.index, qual = ?qual, "dkg finished");

        Ok(DkgResult {
            qual,
            key: DistKeyShare {
                commits: public.commits().to_vec(),
                share: PriShare {
                    index: self.index,
                    value,
                },
            },
        })
    }
}
