use anyhow::Result;
use bls12_381::G1Projective;
use dkgnode_driver::{
    bls::{self, SecretShare},
    crypto::decrypt,
    deposit::deposit_signing_root,
    dkg::recover_secret,
    InstanceState, Storage,
};
use dkgnode_protocol::{decode, Output, TransportType};
use group::Curve;
use std::time::Duration;

use crate::test_utils::{init, init_message, init_tracing, options, Cluster};

const OPERATORS: [u64; 4] = [538, 539, 540, 541];

#[tokio::test(flavor = "multi_thread")]
async fn keygen_four_operators() -> Result<()> {
    init_tracing();
    let cluster = Cluster::new(&OPERATORS, &OPERATORS, options()).await?;
    let init = init(OPERATORS.to_vec(), 3);
    let (identifier, message) =
        init_message(cluster.owner(538)?, &init).await?;
    cluster.init(&message).await?;
    cluster
        .wait_for(&identifier, InstanceState::Finished, Duration::from_secs(30))
        .await?;

    let mut outputs = Vec::new();
    for (id, node) in &cluster.nodes {
        let instance = node
            .controller
            .get_instance(&identifier)
            .await
            .ok_or_else(|| anyhow::anyhow!("no session on {}", id))?;
        let output = instance
            .key_gen_output()
            .await
            .ok_or_else(|| anyhow::anyhow!("no output on {}", id))?;
        assert_eq!(3, output.threshold);
        assert_eq!(OPERATORS.to_vec(), instance.output_signers().await);
        assert_eq!(OPERATORS.len(), output.outputs.len());
        assert!(node
            .storage
            .get_key_gen_output(&output.validator_pk)
            .await?
            .is_some());
        outputs.push((*id, output));
    }

    let validator_pk = outputs[0].1.validator_pk;
    for (_, output) in &outputs {
        assert_eq!(validator_pk, output.validator_pk);
        assert_eq!(outputs[0].1.outputs, output.outputs);
    }

    let root = deposit_signing_root(
        &validator_pk,
        &init.withdrawal_credentials,
        &init.fork,
    )?;

    let broadcast = cluster
        .network
        .sent(&identifier, TransportType::Output)
        .await;
    assert_eq!(OPERATORS.len(), broadcast.len());

    let mut shares = Vec::new();
    let mut partials = Vec::new();
    for signed in broadcast {
        let id = signed.signer;
        let output: Output = decode(&signed.message.data).await?;
        assert_eq!(validator_pk, output.validator_public_key);
        assert_eq!(Some(&output), outputs[0].1.outputs.get(&id));

        let owner = cluster.owner(id)?;
        let share = SecretShare::from_bytes(&decrypt(
            &owner.private_key,
            &output.encrypted_share,
        )?)?;
        assert_eq!(
            share.public_key().to_compressed().to_vec(),
            output.share_public_key
        );
        let local = outputs
            .iter()
            .find(|(operator, _)| *operator == id)
            .map(|(_, o)| o.share.to_bytes());
        assert_eq!(Some(share.to_bytes()), local);

        assert!(bls::verify(
            &output.share_public_key,
            &root,
            &output.deposit_data_partial_signature,
        ));
        shares.push((id, *share.scalar()));
        partials.push((id, output.deposit_data_partial_signature.to_vec()));
    }

    // any three shares recover the validator key
    let subset = &shares[1..];
    let secret = recover_secret(subset)
        .ok_or_else(|| anyhow::anyhow!("recover secret"))?;
    assert_eq!(
        validator_pk,
        (G1Projective::generator() * secret).to_affine().to_compressed()
    );

    // and three partial signatures aggregate to a deposit signature
    let signature = bls::aggregate_partial_signatures(&partials[..3])?;
    assert!(bls::verify(&validator_pk, &root, &signature));

    // two shares are not enough
    let pair = recover_secret(&shares[..2])
        .ok_or_else(|| anyhow::anyhow!("recover secret"))?;
    assert_ne!(
        validator_pk,
        (G1Projective::generator() * pair).to_affine().to_compressed()
    );
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn keygen_single_operator() -> Result<()> {
    init_tracing();
    let cluster = Cluster::new(&[538], &[538], options()).await?;
    let (identifier, message) =
        init_message(cluster.owner(538)?, &init(vec![538], 1)).await?;
    cluster.init(&message).await?;
    cluster
        .wait_for(&identifier, InstanceState::Finished, Duration::from_secs(30))
        .await?;

    let instance = cluster
        .node(538)?
        .controller
        .get_instance(&identifier)
        .await
        .ok_or_else(|| anyhow::anyhow!("no session"))?;
    let output = instance
        .key_gen_output()
        .await
        .ok_or_else(|| anyhow::anyhow!("no output"))?;
    assert_eq!(
        output.validator_pk,
        output.share.public_key().to_compressed()
    );
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn forged_output_breaks_consistency() -> Result<()> {
    init_tracing();
    let cluster = Cluster::new(&OPERATORS, &OPERATORS, options()).await?;
    let (identifier, message) =
        init_message(cluster.owner(538)?, &init(OPERATORS.to_vec(), 3))
            .await?;
    cluster.init(&message).await?;

    // operator 539 reports a different validator key to 538 only
    let forged = Output {
        encrypted_share: vec![1],
        share_public_key: vec![2; 48],
        validator_public_key: [0xAA; 48],
        deposit_data_partial_signature: [0; 96],
    };
    let forged = crate::test_utils::signed(
        cluster.owner(539)?,
        identifier,
        TransportType::Output,
        dkgnode_protocol::encode(&forged).await?,
    )
    .await?;
    cluster.node(538)?.controller.process(forged).await?;

    let timeout = Duration::from_secs(30);
    crate::test_utils::wait_for_state(
        &cluster.node(538)?.controller,
        &identifier,
        InstanceState::Errored,
        timeout,
    )
    .await?;
    for id in [539, 540, 541] {
        crate::test_utils::wait_for_state(
            &cluster.node(id)?.controller,
            &identifier,
            InstanceState::Finished,
            timeout,
        )
        .await?;
    }
    Ok(())
}
