use std::env;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct Config {
    pub rpc_url: String,
    pub settlement_contract_address: String,
    pub ledger_db_path: String,
    pub rpc_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenv::dotenv().ok();
        let timeout_secs = env::var("RPC_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(30);
        Ok(Self {
            rpc_url: env::var("RPC_URL")?,
            settlement_contract_address: env::var("SETTLEMENT_CONTRACT_ADDRESS")?,
            ledger_db_path: env::var("LEDGER_DB_PATH")
                .unwrap_or_else(|_| "./ledger-db".to_string()),
            rpc_timeout: Duration::from_secs(timeout_secs),
        })
    }
}
