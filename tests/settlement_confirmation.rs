mod common;

use common::{contract, MockTransport};
use darkpool_client::models::Denomination;
use darkpool_client::settlement::SettlementClient;
use darkpool_client::TradeError;
use ethers::types::{H256, U256};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

fn client(transport: &Arc<MockTransport>) -> SettlementClient<MockTransport> {
    SettlementClient::new(Arc::clone(transport), contract(), Duration::from_secs(5))
}

#[tokio::test]
async fn a_reverted_commitment_tx_is_not_a_confirmation() {
    let transport = MockTransport::with_balance(10_000);
    transport.receipt_status_ok.store(false, Ordering::SeqCst);
    let settlement = client(&transport);

    match settlement.submit_commitment(H256::repeat_byte(5)).await {
        Err(TradeError::ContractRevert(detail)) => {
            assert!(detail.contains("submitCommitment reverted on-chain"));
        }
        other => panic!("reverted commitment tx was accepted: {:?}", other.map(|r| r.tx_hash)),
    }
}

#[tokio::test]
async fn a_reverted_deposit_tx_is_not_a_top_up() {
    let transport = MockTransport::with_balance(10_000);
    transport.receipt_status_ok.store(false, Ordering::SeqCst);
    let settlement = client(&transport);

    match settlement
        .deposit(Denomination::Stable, U256::from(1_202u64))
        .await
    {
        Err(TradeError::ContractRevert(detail)) => {
            assert!(detail.contains("deposit reverted on-chain"));
        }
        other => panic!("reverted deposit tx was accepted: {:?}", other.map(|r| r.tx_hash)),
    }
}
