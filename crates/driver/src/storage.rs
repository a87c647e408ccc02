use async_trait::async_trait;
use dkgnode_protocol::OperatorId;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::{KeyGenOutput, Operator, Result};

/// Operator directory and key generation output storage.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Resolve an operator.
    async fn get_operator(&self, id: OperatorId) -> Result<Option<Operator>>;

    /// Persist a key generation output.
    async fn save_key_gen_output(&self, output: &KeyGenOutput) -> Result<()>;

    /// Find a key generation output by validator public key.
    async fn get_key_gen_output(
        &self,
        validator_pk: &[u8],
    ) -> Result<Option<KeyGenOutput>>;
}

/// Storage held in memory.
#[derive(Default)]
pub struct MemoryStorage {
    operators: RwLock<HashMap<OperatorId, Operator>>,
    outputs: RwLock<HashMap<Vec<u8>, KeyGenOutput>>,
}

impl MemoryStorage {
    /// Create storage with an operator directory.
    pub fn new(operators: impl IntoIterator<Item = Operator>) -> Self {
        Self {
            operators: RwLock::new(
                operators.into_iter().map(|o| (o.id, o)).collect(),
            ),
            outputs: Default::default(),
        }
    }

    /// Register an operator.
    pub async fn add_operator(&self, operator: Operator) {
        let mut writer = self.operators.write().await;
        writer.insert(operator.id, operator);
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn get_operator(&self, id: OperatorId) -> Result<Option<Operator>> {
        let reader = self.operators.read().await;
        Ok(reader.get(&id).cloned())
    }

    async fn save_key_gen_output(&self, output: &KeyGenOutput) -> Result<()> {
        let mut writer = self.outputs.write().await;
        writer.insert(output.validator_pk.to_vec(), output.clone());
        Ok(())
    }

    async fn get_key_gen_output(
        &self,
        validator_pk: &[u8],
    ) -> Result<Option<KeyGenOutput>> {
        let reader = self.outputs.read().await;
        Ok(reader.get(validator_pk).cloned())
    }
}
