use ethers::types::U256;

use crate::models::{BalanceSnapshot, CollateralQuote, Denomination, FEE_RATE_BPS};

/// Computes the collateral requirement for a working size at a given leverage
/// and settlement denomination, and checks it against a balance snapshot.
///
/// A `None` snapshot means the balance read failed. Per the protocol boundary
/// an unknown balance is never treated as zero, so the quote reports
/// `sufficient` and leaves enforcement to the settlement contract.
pub fn quote(
    working_size: U256,
    leverage: u32,
    denomination: Denomination,
    snapshot: Option<&BalanceSnapshot>,
) -> CollateralQuote {
    debug_assert!(leverage >= 1, "leverage is validated before quoting");

    let collateral = working_size / (U256::from(leverage) * denomination.unit_scale());
    let fee = collateral * U256::from(FEE_RATE_BPS) / U256::from(10_000u64);
    let total = collateral + fee;
    let sufficient = match snapshot {
        Some(snap) => snap.available >= total,
        None => true,
    };

    CollateralQuote {
        collateral,
        fee,
        total,
        denomination,
        sufficient,
    }
}
