//! Event/function signature hashing and minimal log field decoding.
//!
//! We only ever decode a handful of fixed-layout events, so instead of a
//! full ABI layer we compute topic hashes and selectors from the canonical
//! signatures and slice 32-byte words out of log data directly.

use alloy::primitives::{Address, B256, U256};
use std::sync::LazyLock;

// ─── Canonical signatures ─────────────────────────────────────────────────────

/// Lending-pool token withdrawal: (redeemer, redeemAmount, redeemTokens),
/// all non-indexed.
pub const REDEEM_EVENT: &str = "Redeem(address,uint256,uint256)";

/// Emitted by the comptroller when a new pool token is listed.
pub const MARKET_LISTED_EVENT: &str = "MarketListed(address)";

/// Answer submitted to the reality oracle.
pub const LOG_NEW_ANSWER_EVENT: &str =
    "LogNewAnswer(bytes32,bytes32,bytes32,address,uint256,uint256,bool)";

/// Committed answer revealed on the reality oracle.
pub const LOG_ANSWER_REVEAL_EVENT: &str =
    "LogAnswerReveal(bytes32,address,bytes32,bytes32,uint256,uint256)";

/// Zero-argument pool revival function watched by the unkill agent.
pub const UNKILL_FUNCTION: &str = "unkill_me()";

/// ERC-20 view used to size redemptions against the pool.
pub const TOTAL_SUPPLY_FUNCTION: &str = "totalSupply()";

/// Reality-module view returning the active oracle address.
pub const ORACLE_FUNCTION: &str = "oracle()";

// ─── Topic0 hashes, computed once on first use ────────────────────────────────

pub static REDEEM_TOPIC: LazyLock<B256> = LazyLock::new(|| event_topic(REDEEM_EVENT));
pub static MARKET_LISTED_TOPIC: LazyLock<B256> =
    LazyLock::new(|| event_topic(MARKET_LISTED_EVENT));
pub static LOG_NEW_ANSWER_TOPIC: LazyLock<B256> =
    LazyLock::new(|| event_topic(LOG_NEW_ANSWER_EVENT));
pub static LOG_ANSWER_REVEAL_TOPIC: LazyLock<B256> =
    LazyLock::new(|| event_topic(LOG_ANSWER_REVEAL_EVENT));

/// Compute keccak256 hash of a byte slice.
pub fn keccak256(data: &[u8]) -> B256 {
    use tiny_keccak::{Hasher, Keccak};
    let mut hasher = Keccak::v256();
    let mut output = [0u8; 32];
    hasher.update(data);
    hasher.finalize(&mut output);
    B256::from(output)
}

/// topic0 for an event signature.
pub fn event_topic(signature: &str) -> B256 {
    keccak256(signature.as_bytes())
}

/// 4-byte function selector for a function signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    let mut sel = [0u8; 4];
    sel.copy_from_slice(&hash[..4]);
    sel
}

/// The `index`-th 32-byte word of ABI-encoded data, as a uint256.
/// Returns `None` when the data is too short.
pub fn word(data: &[u8], index: usize) -> Option<U256> {
    let start = index * 32;
    let end = start + 32;
    if data.len() < end {
        return None;
    }
    let bytes: [u8; 32] = data[start..end].try_into().ok()?;
    Some(U256::from_be_bytes(bytes))
}

/// The `index`-th word of ABI-encoded data, interpreted as an address
/// (the low 20 bytes of the word).
pub fn word_address(data: &[u8], index: usize) -> Option<Address> {
    let start = index * 32;
    let end = start + 32;
    if data.len() < end {
        return None;
    }
    Some(Address::from_slice(&data[start + 12..end]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::b256;

    #[test]
    fn keccak_empty_input() {
        assert_eq!(
            keccak256(b""),
            b256!("c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"),
        );
    }

    #[test]
    fn erc20_transfer_topic() {
        assert_eq!(
            event_topic("Transfer(address,address,uint256)"),
            b256!("ddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef"),
        );
    }

    #[test]
    fn erc20_transfer_selector() {
        assert_eq!(selector("transfer(address,uint256)"), [0xa9, 0x05, 0x9c, 0xbb]);
    }

    #[test]
    fn word_decoding() {
        let mut data = vec![0u8; 64];
        data[31] = 7;
        data[63] = 9;
        assert_eq!(word(&data, 0), Some(U256::from(7)));
        assert_eq!(word(&data, 1), Some(U256::from(9)));
        assert_eq!(word(&data, 2), None);
        assert_eq!(word(&data[..16], 0), None);
    }

    #[test]
    fn address_word_decoding() {
        let addr = Address::repeat_byte(0xab);
        let mut data = vec![0u8; 32];
        data[12..].copy_from_slice(addr.as_slice());
        assert_eq!(word_address(&data, 0), Some(addr));
        assert_eq!(word_address(&data[..16], 0), None);
    }
}
