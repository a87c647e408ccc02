use anyhow::Result;
use dkgnode_driver::{dkg::DealBundle, DkgOptions, Error, InstanceState};
use dkgnode_protocol::{encode, KyberMessage, KyberMessageType, TransportType};
use std::{sync::Arc, time::Duration};

use crate::test_utils::{
    init, init_message, options, signed, wait_for_state, Cluster,
};

#[tokio::test]
async fn session_times_out() -> Result<()> {
    let options = DkgOptions {
        session_timeout: 1,
        start_delay: 0,
        ..options()
    };
    // 539 never runs a node
    let cluster = Cluster::new(&[538], &[538, 539], options).await?;
    let (identifier, message) =
        init_message(cluster.owner(538)?, &init(vec![538, 539], 2)).await?;
    cluster.init(&message).await?;

    let controller = &cluster.node(538)?.controller;
    wait_for_state(
        controller,
        &identifier,
        InstanceState::TimedOut,
        Duration::from_secs(5),
    )
    .await?;

    let late = crate::test_utils::signed(
        cluster.owner(539)?,
        identifier,
        dkgnode_protocol::TransportType::Exchange,
        dkgnode_protocol::encode(&dkgnode_protocol::Exchange {
            public_key: bls12_381::G1Affine::generator()
                .to_compressed()
                .to_vec(),
        })
        .await?,
    )
    .await?;
    assert!(matches!(
        controller.process(late).await,
        Err(Error::SessionHalted(_, InstanceState::TimedOut))
    ));

    assert!(controller.remove_instance(&identifier).await.is_some());
    assert!(controller.get_instance(&identifier).await.is_none());
    Ok(())
}

#[tokio::test]
async fn timeout_releases_queued_bundles() -> Result<()> {
    let options = DkgOptions {
        session_timeout: 1,
        start_delay: 0,
        ..options()
    };
    let cluster = Cluster::new(&[538], &[538, 539], options).await?;
    let (identifier, message) =
        init_message(cluster.owner(538)?, &init(vec![538, 539], 2)).await?;
    cluster.init(&message).await?;

    let controller = Arc::clone(&cluster.node(538)?.controller);
    wait_for_state(
        &controller,
        &identifier,
        InstanceState::ExchangeCollecting,
        Duration::from_secs(5),
    )
    .await?;

    // the deal queue holds one bundle per operator, the
    // sub-protocol never starts so the third deal waits
    let deal = DealBundle {
        dealer_index: 539,
        deals: vec![],
        public: vec![],
        session_id: vec![0u8; 32],
    };
    let wrapped = encode(&KyberMessage {
        kind: KyberMessageType::Deal,
        data: serde_json::to_vec(&deal)?,
    })
    .await?;
    let mut tasks = Vec::new();
    for _ in 0..3 {
        let message = signed(
            cluster.owner(539)?,
            identifier,
            TransportType::KyberWrapped,
            wrapped.clone(),
        )
        .await?;
        let controller = Arc::clone(&controller);
        tasks.push(tokio::spawn(
            async move { controller.process(message).await },
        ));
    }

    wait_for_state(
        &controller,
        &identifier,
        InstanceState::TimedOut,
        Duration::from_secs(5),
    )
    .await?;

    for task in tasks {
        tokio::time::timeout(Duration::from_secs(2), task).await???;
    }
    Ok(())
}
