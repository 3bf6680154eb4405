// src/abi.rs
//
// Typed call codec for the settlement contract: 4-byte selectors from the
// canonical signature, 32-byte-aligned big-endian parameters. Selector values
// and parameter order are the compatibility contract with the deployed
// contract and must match it exactly.

use ethers::abi::{self, ParamType, Token};
use ethers::types::{Address, Bytes, H256, U256};
use ethers::utils::id;

use crate::error::TradeError;
use crate::models::{Denomination, ProofArtifact};

pub const SUBMIT_COMMITMENT_SIG: &str = "submitCommitment(bytes32)";
pub const EXECUTE_TRADE_SIG: &str = "executeTrade(bytes,bytes32[],bytes32,uint256,bool,bool)";
pub const DEPOSIT_SIG: &str = "deposit(bool,uint256)";
pub const BALANCE_OF_SIG: &str = "balanceOf(address,bool)";

// Custom errors raised by the settlement contract.
pub const INVALID_COMMITMENT_ERROR_SIG: &str = "InvalidCommitment()";
pub const INSUFFICIENT_BALANCE_ERROR_SIG: &str = "InsufficientBalance()";

/// `Error(string)` — the standard Solidity revert-with-reason selector.
const ERROR_STRING_SELECTOR: [u8; 4] = [0x08, 0xc3, 0x79, 0xa0];

pub fn selector(signature: &str) -> [u8; 4] {
    id(signature)
}

fn encode_call(signature: &str, tokens: &[Token]) -> Bytes {
    let mut data = selector(signature).to_vec();
    data.extend_from_slice(&abi::encode(tokens));
    Bytes::from(data)
}

/// Left-pads a 20-byte address into a 32-byte word.
pub fn address_word(addr: Address) -> H256 {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(addr.as_bytes());
    H256::from(word)
}

pub fn u256_word(value: U256) -> H256 {
    let mut word = [0u8; 32];
    value.to_big_endian(&mut word);
    H256::from(word)
}

pub fn submit_commitment_call(hash: H256) -> Bytes {
    encode_call(
        SUBMIT_COMMITMENT_SIG,
        &[Token::FixedBytes(hash.as_bytes().to_vec())],
    )
}

pub fn execute_trade_call(
    artifact: &ProofArtifact,
    working_size: U256,
    is_long: bool,
    denomination: Denomination,
) -> Bytes {
    let inputs = artifact
        .public_inputs
        .iter()
        .map(|h| Token::FixedBytes(h.as_bytes().to_vec()))
        .collect();
    encode_call(
        EXECUTE_TRADE_SIG,
        &[
            Token::Bytes(artifact.proof.clone()),
            Token::Array(inputs),
            Token::FixedBytes(artifact.commitment_hash.as_bytes().to_vec()),
            Token::Uint(working_size),
            Token::Bool(is_long),
            Token::Bool(denomination.flag()),
        ],
    )
}

pub fn deposit_call(denomination: Denomination, amount: U256) -> Bytes {
    encode_call(
        DEPOSIT_SIG,
        &[Token::Bool(denomination.flag()), Token::Uint(amount)],
    )
}

pub fn balance_of_call(trader: Address, denomination: Denomination) -> Bytes {
    encode_call(
        BALANCE_OF_SIG,
        &[Token::Address(trader), Token::Bool(denomination.flag())],
    )
}

/// Decodes the `(uint256 available, uint256 locked)` return of `balanceOf`.
pub fn decode_balance_return(data: &[u8]) -> Result<(U256, U256), TradeError> {
    let tokens = abi::decode(&[ParamType::Uint(256), ParamType::Uint(256)], data)
        .map_err(|e| TradeError::ContractRevert(format!("malformed balanceOf return: {}", e)))?;
    match (tokens[0].clone().into_uint(), tokens[1].clone().into_uint()) {
        (Some(available), Some(locked)) => Ok((available, locked)),
        _ => Err(TradeError::ContractRevert(
            "malformed balanceOf return".to_string(),
        )),
    }
}

/// Maps raw revert bytes onto the protocol taxonomy. Unknown payloads become
/// `ContractRevert` with the payload surfaced for diagnostics.
pub fn decode_revert(data: &[u8]) -> TradeError {
    if data.len() >= 4 {
        let sel: [u8; 4] = data[..4].try_into().unwrap_or_default();
        if sel == selector(INVALID_COMMITMENT_ERROR_SIG) {
            return TradeError::InvalidCommitment;
        }
        if sel == selector(INSUFFICIENT_BALANCE_ERROR_SIG) {
            return TradeError::InsufficientBalance;
        }
        if sel == ERROR_STRING_SELECTOR {
            if let Ok(tokens) = abi::decode(&[ParamType::String], &data[4..]) {
                if let Some(reason) = tokens[0].clone().into_string() {
                    return TradeError::ContractRevert(reason);
                }
            }
        }
    }
    TradeError::ContractRevert(format!("unknown revert: 0x{}", hex::encode(data)))
}
