use async_trait::async_trait;
use ethers::types::{H256, U256};
use rand::RngCore;
use std::time::Duration;

use crate::abi::{address_word, u256_word};
use crate::error::TradeError;
use crate::models::{
    Commitment, ProofArtifact, TradeIntent, MAX_WORKING_SIZE, MIN_WORKING_SIZE,
};

/// Produces a proof bound to a commitment. The orchestrator depends only on
/// this trait and the `ProofArtifact` shape, so a real prover can replace the
/// placeholder without touching the state machine.
#[async_trait]
pub trait ProofGenerator: Send + Sync {
    async fn prove(
        &self,
        commitment: &Commitment,
        intent: &TradeIntent,
    ) -> Result<ProofArtifact, TradeError>;
}

/// Ordered public inputs the verifier checks without learning the private
/// trade parameters: commitment hash, trader (padded to a 32-byte field),
/// then the bound-check anchors. This ordering is a versioned interface
/// shared with the on-chain verifier — reordering on one side only fails
/// every trade at verification, with no client-detectable error.
pub fn public_inputs(commitment: &Commitment, intent: &TradeIntent) -> Vec<H256> {
    vec![
        commitment.hash,
        address_word(commitment.trader),
        u256_word(U256::from(MIN_WORKING_SIZE)),
        u256_word(U256::from(MAX_WORKING_SIZE)),
        u256_word(U256::from(intent.leverage)),
    ]
}

/// Development stand-in for a real zero-knowledge prover: random proof bytes
/// with the correct public-input vector and a simulated proving delay.
pub struct PlaceholderProver {
    pub latency: Duration,
}

impl PlaceholderProver {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }
}

impl Default for PlaceholderProver {
    fn default() -> Self {
        Self::new(Duration::from_millis(1200))
    }
}

#[async_trait]
impl ProofGenerator for PlaceholderProver {
    async fn prove(
        &self,
        commitment: &Commitment,
        intent: &TradeIntent,
    ) -> Result<ProofArtifact, TradeError> {
        tokio::time::sleep(self.latency).await;
        let mut proof = vec![0u8; 256];
        rand::thread_rng().fill_bytes(&mut proof);
        Ok(ProofArtifact {
            proof,
            public_inputs: public_inputs(commitment, intent),
            commitment_hash: commitment.hash,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commitment::derive;
    use crate::models::{Denomination, Direction};
    use ethers::types::Address;

    fn fixtures() -> (Commitment, TradeIntent) {
        let intent = TradeIntent {
            size: 1.0,
            direction: Direction::Short,
            pair_id: 0,
            leverage: 25,
            denomination: Denomination::Native,
        };
        let commitment = derive(&intent, Address::repeat_byte(0xAA), 12345);
        (commitment, intent)
    }

    #[test]
    fn public_input_order_is_frozen() {
        let (commitment, intent) = fixtures();
        let inputs = public_inputs(&commitment, &intent);
        assert_eq!(inputs.len(), 5);
        assert_eq!(inputs[0], commitment.hash);
        assert_eq!(inputs[1], address_word(commitment.trader));
        assert_eq!(inputs[2], u256_word(U256::from(MIN_WORKING_SIZE)));
        assert_eq!(inputs[3], u256_word(U256::from(MAX_WORKING_SIZE)));
        assert_eq!(inputs[4], u256_word(U256::from(25u64)));
    }

    #[tokio::test]
    async fn placeholder_binds_the_artifact_to_the_commitment() {
        let (commitment, intent) = fixtures();
        let prover = PlaceholderProver::new(Duration::from_millis(1));
        let artifact = prover.prove(&commitment, &intent).await.unwrap();
        assert_eq!(artifact.commitment_hash, commitment.hash);
        assert_eq!(artifact.public_inputs, public_inputs(&commitment, &intent));
        assert_eq!(artifact.proof.len(), 256);
    }
}
