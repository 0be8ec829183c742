//! Decoding of serialized Solana transactions.
//!
//! Accepts the bytes a chain reader hands over, in raw bincode, base58 or
//! base64 form, for both legacy and v0 messages, and rebuilds the crate's
//! [`Transaction`] model with per-account signer and writable flags taken
//! from the message header.

use log::{debug, warn};
use solana_message::{MessageHeader, VersionedMessage};
use solana_transaction::versioned::VersionedTransaction;

use crate::errors::{GuardError, GuardResult};
use crate::models::{AccountRef, Instruction, Transaction};

/// Parse a serialized transaction in any supported encoding.
///
/// Tries raw bincode first, then base58 text, then base64 text, and returns
/// the first successful decode.
pub fn parse_transaction(transaction_data: &[u8]) -> GuardResult<Transaction> {
    let result = try_parse_binary(transaction_data)
        .or_else(|e| {
            debug!("Binary parsing failed: {}", e);
            try_parse_base58(transaction_data)
        })
        .or_else(|e| {
            debug!("Base58 parsing failed: {}", e);
            try_parse_base64(transaction_data)
        });

    match &result {
        Ok(tx) => debug!("Decoded transaction {} with {} instructions", tx.id, tx.instructions.len()),
        Err(e) => warn!("All parsing methods failed: {}", e),
    }

    result
}

fn try_parse_binary(data: &[u8]) -> GuardResult<Transaction> {
    let versioned: VersionedTransaction = bincode::deserialize(data)
        .map_err(|e| GuardError::Decode(format!("Failed to deserialize transaction: {}", e)))?;
    from_versioned(&versioned)
}

fn try_parse_base58(data: &[u8]) -> GuardResult<Transaction> {
    let text = std::str::from_utf8(data)
        .map_err(|_| GuardError::Decode("Not a valid UTF-8 string for base58 decoding".to_string()))?;
    let decoded = bs58::decode(text.trim())
        .into_vec()
        .map_err(|_| GuardError::Decode("Not a valid base58 encoded transaction".to_string()))?;
    try_parse_binary(&decoded)
}

fn try_parse_base64(data: &[u8]) -> GuardResult<Transaction> {
    let text = std::str::from_utf8(data)
        .map_err(|_| GuardError::Decode("Not a valid UTF-8 string for base64 decoding".to_string()))?;
    let decoded = base64::decode(text.trim())
        .map_err(|_| GuardError::Decode("Not a valid base64 encoded transaction".to_string()))?;
    try_parse_binary(&decoded)
}

/// Rebuild the instruction list of a decoded transaction.
pub fn from_versioned(tx: &VersionedTransaction) -> GuardResult<Transaction> {
    let id = tx
        .signatures
        .first()
        .map(|sig| sig.to_string())
        .unwrap_or_default();

    let message: &VersionedMessage = &tx.message;
    let keys = message.static_account_keys();
    let header = message.header();

    let mut instructions = Vec::with_capacity(message.instructions().len());
    for (position, compiled) in message.instructions().iter().enumerate() {
        let program_id = keys
            .get(compiled.program_id_index as usize)
            .copied()
            .ok_or_else(|| {
                GuardError::Decode(format!(
                    "instruction {} program index {} out of range",
                    position, compiled.program_id_index
                ))
            })?;

        let mut accounts = Vec::with_capacity(compiled.accounts.len());
        for &index in &compiled.accounts {
            let index = index as usize;
            // Indices past the static keys point into address lookup tables
            let pubkey = keys.get(index).copied().ok_or_else(|| {
                GuardError::Decode(format!(
                    "instruction {} references account {} outside the static keys; lookup tables are not resolved",
                    position, index
                ))
            })?;
            accounts.push(AccountRef {
                pubkey,
                is_signer: is_signer(header, index),
                is_writable: is_writable(header, keys.len(), index),
            });
        }

        instructions.push(Instruction::new(program_id, accounts, compiled.data.clone()));
    }

    Ok(Transaction {
        id,
        instructions,
        ..Default::default()
    })
}

fn is_signer(header: &MessageHeader, index: usize) -> bool {
    index < header.num_required_signatures as usize
}

fn is_writable(header: &MessageHeader, num_keys: usize, index: usize) -> bool {
    let num_signed = header.num_required_signatures as usize;
    if index < num_signed {
        index < num_signed.saturating_sub(header.num_readonly_signed_accounts as usize)
    } else {
        let num_unsigned = num_keys.saturating_sub(num_signed);
        index - num_signed < num_unsigned.saturating_sub(header.num_readonly_unsigned_accounts as usize)
    }
}
