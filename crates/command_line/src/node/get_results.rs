//! Fetch key generation results from operator nodes.
use anyhow::{anyhow, bail, Result};
use dkgnode_driver::{bls, KeyGenResult};
use dkgnode_protocol::OperatorId;
use futures::future::join_all;
use reqwest::StatusCode;
use std::collections::BTreeMap;

use super::init::NodeAddress;

/// Query every node for the result of a validator key and print
/// the operator outputs along with the aggregated deposit signature.
pub async fn run(validator_pk: String, nodes: Vec<NodeAddress>) -> Result<()> {
    let validator_pk = validator_pk.trim_start_matches("0x").to_owned();
    hex::decode(&validator_pk)?;

    let client = reqwest::Client::new();
    let results = join_all(nodes.iter().map(|node| {
        let client = client.clone();
        let path = format!("dkg/{}", validator_pk);
        async move {
            let response = client.get(node.url.join(&path)?).send().await?;
            let status = response.status();
            let body = response.bytes().await?;
            if status == StatusCode::NOT_FOUND {
                return anyhow::Ok(None);
            }
            if !status.is_success() {
                bail!("{}: {}", status, String::from_utf8_lossy(&body));
            }
            let result: KeyGenResult = serde_json::from_slice(&body)?;
            Ok(Some(result))
        }
    }))
    .await;

    let mut found = Vec::new();
    for (node, result) in nodes.iter().zip(results) {
        match result {
            Ok(Some(result)) => found.push((node.id, result)),
            Ok(None) => {
                tracing::warn!(operator = node.id, "no result");
            }
            Err(e) => {
                tracing::error!(operator = node.id, error = %e, "get result");
            }
        }
    }

    let (_, first) = found
        .first()
        .ok_or_else(|| anyhow!("no node has a result for {}", validator_pk))?;
    let signature = aggregate(&found, first.threshold)?;

    println!("{}", serde_json::to_string_pretty(&first)?);
    match signature {
        Some(signature) => println!("deposit signature: {}", hex::encode(signature)),
        None => tracing::warn!(
            threshold = first.threshold,
            "not enough partial signatures for the deposit signature"
        ),
    }
    Ok(())
}

/// Aggregate the partial signatures every node published for itself.
fn aggregate(
    found: &[(OperatorId, KeyGenResult)],
    threshold: u64,
) -> Result<Option<[u8; 96]>> {
    let mut partials = BTreeMap::new();
    for (id, result) in found {
        if let Some(output) = result.outputs.get(id) {
            partials.insert(*id, hex::decode(&output.deposit_data_signature)?);
        }
    }
    if (partials.len() as u64) < threshold {
        return Ok(None);
    }
    let partials: Vec<(u64, Vec<u8>)> = partials
        .into_iter()
        .take(threshold as usize)
        .collect();
    Ok(Some(bls::aggregate_partial_signatures(&partials)?))
}
