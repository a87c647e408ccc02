use anyhow::Result;
use bls12_381::{G1Affine, G1Projective, Scalar};
use dkgnode_driver::{Error, Instance, InstanceState, OperatorOwner};
use dkgnode_protocol::{encode, Exchange, Identifier, TransportType};
use group::Curve;
use std::{sync::Arc, time::Duration};

use crate::test_utils::{
    init, init_message, options, signed, wait_for_state, Cluster,
};

async fn exchange(
    owner: &OperatorOwner,
    identifier: Identifier,
    secret: u64,
) -> Result<dkgnode_protocol::SignedTransport> {
    let public_key = (G1Projective::generator() * Scalar::from(secret))
        .to_affine()
        .to_compressed()
        .to_vec();
    signed(
        owner,
        identifier,
        TransportType::Exchange,
        encode(&Exchange { public_key }).await?,
    )
    .await
}

/// Single running node for operator 538 with a larger directory.
async fn single() -> Result<Cluster> {
    Cluster::new(&[538], &[538, 539, 540], options()).await
}

/// Start a session of 538 and 539 on the single node and wait
/// for the local exchange key.
async fn started(cluster: &Cluster) -> Result<(Identifier, Arc<Instance>)> {
    let (identifier, message) =
        init_message(cluster.owner(538)?, &init(vec![538, 539], 2)).await?;
    cluster.init(&message).await?;
    let controller = &cluster.node(538)?.controller;
    wait_for_state(
        controller,
        &identifier,
        InstanceState::ExchangeCollecting,
        Duration::from_secs(5),
    )
    .await?;
    let instance = controller
        .get_instance(&identifier)
        .await
        .ok_or_else(|| anyhow::anyhow!("no session"))?;
    tokio::time::timeout(Duration::from_secs(5), async {
        while instance.exchange_signers().await != vec![538] {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await?;
    Ok((identifier, instance))
}

#[tokio::test]
async fn reject_unknown_signer_and_bad_signature() -> Result<()> {
    let cluster = single().await?;
    let (identifier, instance) = started(&cluster).await?;
    let controller = &cluster.node(538)?.controller;

    // 540 is known to the directory but not part of the session
    let outsider = exchange(cluster.owner(540)?, identifier, 3).await?;
    assert!(matches!(
        controller.process(outsider).await,
        Err(Error::UnknownSigner(540))
    ));

    let mut forged = exchange(cluster.owner(538)?, identifier, 3).await?;
    forged.signer = 539;
    assert!(matches!(
        controller.process(forged).await,
        Err(Error::InvalidSignature(539))
    ));

    assert_eq!(vec![538], instance.exchange_signers().await);
    assert_eq!(InstanceState::ExchangeCollecting, instance.state().await);
    Ok(())
}

#[tokio::test]
async fn reject_identity_exchange_key() -> Result<()> {
    let cluster = single().await?;
    let (identifier, instance) = started(&cluster).await?;

    let message = signed(
        cluster.owner(539)?,
        identifier,
        TransportType::Exchange,
        encode(&Exchange {
            public_key: G1Affine::identity().to_compressed().to_vec(),
        })
        .await?,
    )
    .await?;
    assert!(matches!(
        cluster.node(538)?.controller.process(message).await,
        Err(Error::InvalidEncoding(_))
    ));
    assert_eq!(vec![538], instance.exchange_signers().await);
    assert_eq!(InstanceState::ExchangeCollecting, instance.state().await);
    Ok(())
}

#[tokio::test]
async fn reject_duplicate_exchange_after_dkg_start() -> Result<()> {
    let cluster = single().await?;
    let (identifier, instance) = started(&cluster).await?;
    let controller = &cluster.node(538)?.controller;

    controller
        .process(exchange(cluster.owner(539)?, identifier, 5).await?)
        .await?;
    assert_eq!(InstanceState::DkgRunning, instance.state().await);

    for (owner, secret) in [(539, 6), (538, 7)] {
        assert!(matches!(
            controller
                .process(exchange(cluster.owner(owner)?, identifier, secret).await?)
                .await,
            Err(Error::DuplicateMessage(TransportType::Exchange, id)) if id == owner
        ));
    }
    assert_eq!(vec![538, 539], instance.exchange_signers().await);
    assert_eq!(InstanceState::DkgRunning, instance.state().await);
    Ok(())
}

#[tokio::test]
async fn reject_duplicate_exchange() -> Result<()> {
    let cluster = single().await?;
    let (identifier, message) =
        init_message(cluster.owner(538)?, &init(vec![538, 539], 2)).await?;
    cluster.init(&message).await?;
    let controller = &cluster.node(538)?.controller;

    controller
        .process(exchange(cluster.owner(539)?, identifier, 5).await?)
        .await?;
    assert!(matches!(
        controller
            .process(exchange(cluster.owner(539)?, identifier, 6).await?)
            .await,
        Err(Error::DuplicateMessage(TransportType::Exchange, 539))
    ));
    Ok(())
}

#[tokio::test]
async fn reject_duplicate_init() -> Result<()> {
    let cluster = single().await?;
    let (identifier, message) =
        init_message(cluster.owner(538)?, &init(vec![538, 539], 2)).await?;
    let controller = &cluster.node(538)?.controller;
    controller.process(message.clone()).await?;
    assert!(matches!(
        controller.process(message).await,
        Err(Error::SessionAlreadyExists(id)) if id == identifier
    ));
    assert_eq!(1, controller.sessions().await.len());
    Ok(())
}

#[tokio::test]
async fn reject_unknown_session() -> Result<()> {
    let cluster = single().await?;
    let identifier = Identifier::random();
    let message = exchange(cluster.owner(539)?, identifier, 2).await?;
    assert!(matches!(
        cluster.node(538)?.controller.process(message).await,
        Err(Error::SessionNotFound(id)) if id == identifier
    ));
    Ok(())
}

#[tokio::test]
async fn reject_reshare() -> Result<()> {
    let cluster = single().await?;
    let message = signed(
        cluster.owner(538)?,
        Identifier::random(),
        TransportType::InitReshare,
        vec![],
    )
    .await?;
    assert!(matches!(
        cluster.node(538)?.controller.process(message).await,
        Err(Error::ReshareNotSupported)
    ));
    Ok(())
}

#[tokio::test]
async fn reject_bad_init() -> Result<()> {
    let cluster = single().await?;
    let controller = &cluster.node(538)?.controller;
    let owner = cluster.owner(538)?;

    let (_, message) = init_message(owner, &init(vec![538, 777], 2)).await?;
    assert!(matches!(
        controller.process(message).await,
        Err(Error::OperatorResolutionFailed(777))
    ));

    let (_, message) = init_message(owner, &init(vec![539, 540], 2)).await?;
    assert!(matches!(
        controller.process(message).await,
        Err(Error::NotParticipant(538))
    ));

    let (_, message) = init_message(owner, &init(vec![538, 539], 3)).await?;
    assert!(matches!(
        controller.process(message).await,
        Err(Error::InvalidInit(_))
    ));

    // signer must be one of the session operators
    let (_, message) =
        init_message(cluster.owner(540)?, &init(vec![538, 539], 2)).await?;
    assert!(matches!(
        controller.process(message).await,
        Err(Error::UnknownSigner(540))
    ));

    let (_, mut message) =
        init_message(owner, &init(vec![538, 539], 2)).await?;
    message.message.data.truncate(4);
    let result = controller.process(message).await;
    assert!(matches!(&result, Err(e) if e.is_decode()));

    assert!(controller.sessions().await.is_empty());
    Ok(())
}

#[tokio::test]
async fn reject_init_as_session_message() -> Result<()> {
    let cluster = single().await?;
    let owner = cluster.owner(538)?;
    let (identifier, message) =
        init_message(owner, &init(vec![538, 539], 2)).await?;
    cluster.init(&message).await?;

    let instance = cluster
        .node(538)?
        .controller
        .get_instance(&identifier)
        .await
        .ok_or_else(|| anyhow::anyhow!("no session"))?;
    assert!(matches!(
        instance.process(&message).await,
        Err(Error::UnknownMessageType(TransportType::Init))
    ));
    assert!(matches!(
        instance.start().await,
        Ok(()) | Err(Error::AlreadyStarted(_))
    ));
    assert!(matches!(
        instance.start().await,
        Err(Error::AlreadyStarted(_))
    ));
    Ok(())
}
