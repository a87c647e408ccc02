use anyhow::Result;
use dkgnode_driver::{
    bls, deposit::deposit_signing_root, InstanceState, KeyGenResult,
};
use dkgnode_protocol::encode;
use dkgnode_server::ApiResponse;
use reqwest::StatusCode;
use std::time::Duration;

use crate::test_utils::{
    directory, init, init_message, init_tracing, options, owners, spawn_node,
    wait_for_state,
};

const OPERATORS: [u64; 3] = [538, 539, 540];

#[tokio::test(flavor = "multi_thread")]
async fn keygen_over_http() -> Result<()> {
    init_tracing();
    let owners = owners(&OPERATORS)?;
    let mut nodes = Vec::new();
    for owner in owners.values() {
        nodes.push(
            spawn_node(owner.clone(), directory(&owners), options()).await?,
        );
    }
    for node in &nodes {
        for peer in &nodes {
            node.network.add_peer(peer.url.clone()).await;
        }
    }

    let client = reqwest::Client::new();
    let init = init(OPERATORS.to_vec(), 2);
    let (identifier, message) = init_message(&owners[&538], &init).await?;
    let body = encode(&message).await?;
    for node in &nodes {
        let response = client
            .post(node.url.join("consume")?)
            .body(body.clone())
            .send()
            .await?;
        assert_eq!(StatusCode::OK, response.status());
    }

    // a second delivery of the same init is refused
    let response = client
        .post(nodes[0].url.join("consume")?)
        .body(body)
        .send()
        .await?;
    assert_eq!(StatusCode::INTERNAL_SERVER_ERROR, response.status());
    let reply: ApiResponse = serde_json::from_slice(&response.bytes().await?)?;
    assert!(reply.error.is_some());

    for node in &nodes {
        wait_for_state(
            &node.controller,
            &identifier,
            InstanceState::Finished,
            Duration::from_secs(30),
        )
        .await?;
    }

    let output = nodes[0]
        .controller
        .get_instance(&identifier)
        .await
        .ok_or_else(|| anyhow::anyhow!("no session"))?
        .key_gen_output()
        .await
        .ok_or_else(|| anyhow::anyhow!("no output"))?;
    let validator_pk = hex::encode(output.validator_pk);
    let root = deposit_signing_root(
        &output.validator_pk,
        &init.withdrawal_credentials,
        &init.fork,
    )?;

    for node in &nodes {
        let response = client
            .get(node.url.join(&format!("dkg/{}", validator_pk))?)
            .send()
            .await?;
        assert_eq!(StatusCode::OK, response.status());
        let result: KeyGenResult =
            serde_json::from_slice(&response.bytes().await?)?;
        assert_eq!(identifier, result.identifier);
        assert_eq!(validator_pk, result.validator_pk);
        assert_eq!(OPERATORS.len(), result.outputs.len());
        assert_eq!(2, result.threshold);
        for output in result.outputs.values() {
            assert_eq!(validator_pk, output.validator_public_key);
        }

        // any two published partial signatures sign the deposit
        let partials = result
            .outputs
            .iter()
            .take(2)
            .map(|(id, o)| Ok((*id, hex::decode(&o.deposit_data_signature)?)))
            .collect::<Result<Vec<_>>>()?;
        let signature = bls::aggregate_partial_signatures(&partials)?;
        assert!(bls::verify(&output.validator_pk, &root, &signature));
    }
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn http_errors() -> Result<()> {
    init_tracing();
    let owners = owners(&[538])?;
    let node = spawn_node(owners[&538].clone(), directory(&owners), options())
        .await?;
    let client = reqwest::Client::new();

    let response = client
        .post(node.url.join("consume")?)
        .body(vec![1, 2, 3])
        .send()
        .await?;
    assert_eq!(StatusCode::BAD_REQUEST, response.status());

    let response = client.get(node.url.join("dkg/not-hex")?).send().await?;
    assert_eq!(StatusCode::BAD_REQUEST, response.status());

    let response = client
        .get(node.url.join(&format!("dkg/{}", hex::encode([7u8; 48])))?)
        .send()
        .await?;
    assert_eq!(StatusCode::NOT_FOUND, response.status());
    Ok(())
}
