//! Start a key generation session.
use anyhow::{anyhow, bail, Result};
use dkgnode_driver::{
    crypto::sign_transport, keypair::decode_private_key, validate_init,
};
use dkgnode_protocol::{
    encode, Identifier, Init, OperatorId, Transport, TransportType,
    FORK_VERSION_LEN,
};
use futures::future::join_all;
use std::{path::PathBuf, str::FromStr};
use tokio::fs;
use url::Url;

/// Operator node reachable at a base URL.
#[derive(Debug, Clone)]
pub struct NodeAddress {
    pub id: OperatorId,
    pub url: Url,
}

impl FromStr for NodeAddress {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let (id, url) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected id=url, got '{}'", s))?;
        Ok(Self {
            id: id.trim().parse()?,
            url: url.trim().parse()?,
        })
    }
}

/// Sign an init message and send it to every node.
pub async fn run(
    keystore: PathBuf,
    operator_id: OperatorId,
    nodes: Vec<NodeAddress>,
    threshold: u64,
    withdrawal_credentials: String,
    fork_version: String,
) -> Result<()> {
    let key = decode_private_key(fs::read_to_string(&keystore).await?)?;

    let fork = hex::decode(fork_version.trim_start_matches("0x"))?;
    let fork: [u8; FORK_VERSION_LEN] = fork.as_slice().try_into().map_err(
        |_| anyhow!("fork version must be {} bytes", FORK_VERSION_LEN),
    )?;

    let init = Init {
        operators: nodes.iter().map(|n| n.id).collect(),
        threshold,
        withdrawal_credentials: hex::decode(
            withdrawal_credentials.trim_start_matches("0x"),
        )?,
        fork,
    };
    validate_init(&init, operator_id)?;

    let identifier = Identifier::random();
    let message = Transport {
        kind: TransportType::Init,
        identifier,
        data: encode(&init).await?,
    };
    let signed = sign_transport(&key, operator_id, message).await?;
    let body = encode(&signed).await?;

    let client = reqwest::Client::new();
    let results = join_all(nodes.iter().map(|node| {
        let client = client.clone();
        let body = body.clone();
        async move {
            let response = client
                .post(node.url.join("consume")?)
                .header("content-type", "application/octet-stream")
                .body(body)
                .send()
                .await?;
            let status = response.status();
            let text = response.text().await?;
            anyhow::Ok((status, text))
        }
    }))
    .await;

    let mut failed = 0;
    for (node, result) in nodes.iter().zip(results) {
        match result {
            Ok((status, _)) if status.is_success() => {
                tracing::info!(operator = node.id, url = %node.url, "init accepted");
            }
            Ok((status, text)) => {
                failed += 1;
                tracing::error!(operator = node.id, %status, body = %text, "init rejected");
            }
            Err(e) => {
                failed += 1;
                tracing::error!(operator = node.id, error = %e, "init");
            }
        }
    }

    if failed > 0 {
        bail!("{} of {} nodes did not accept the session", failed, nodes.len());
    }

    println!("{}", identifier);
    Ok(())
}
