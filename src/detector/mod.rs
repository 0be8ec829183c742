//! Detection of dangerous instruction shapes
//!
//! | id    | shape                                                  | severity |
//! |-------|--------------------------------------------------------|----------|
//! | P-101 | mint authority set to none                             | Critical |
//! | P-102 | freeze authority set to none                           | Critical |
//! | P-103 | authority handed to a key that does not sign the tx    | Warning  |
//! | P-104 | account closed without first moving its balance out    | Alert    |


use std::collections::HashSet;
use std::sync::Arc;

use log::{debug, warn};
use solana_pubkey::Pubkey;

use crate::decoder::{AuthorityType, DecodedInstruction, InstructionDecoder, SplTokenDecoder};
use crate::models::{PatternId, SecurityWarning, Transaction};

/// Scans a transaction's instructions for known dangerous patterns
#[derive(Clone)]
pub struct PatternDetector {
    decoder: Arc<dyn InstructionDecoder>,
}

impl Default for PatternDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PatternDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatternDetector").finish_non_exhaustive()
    }
}

impl PatternDetector {
    /// Detector using the SPL Token decoder
    pub fn new() -> Self {
        Self::with_decoder(Arc::new(SplTokenDecoder::new()))
    }

    /// Detector using a custom decoder
    pub fn with_decoder(decoder: Arc<dyn InstructionDecoder>) -> Self {
        Self { decoder }
    }

    /// Detect every pattern occurrence, in instruction order.
    ///
    /// Malformed payloads never match a pattern. Each one yields a single
    /// `DECODE-FAILURE` warning so the miss stays visible.
    ///
    /// The signer set checked by P-103 is transaction-wide: Solana signatures
    /// cover the whole message, so it is collected once before the single
    /// detection pass.
    pub fn detect(&self, transaction: &Transaction) -> Vec<SecurityWarning> {
        let signers = transaction.signers();
        // Accounts whose balance has already been moved out
        let mut drained: HashSet<Pubkey> = HashSet::new();
        let mut warnings = Vec::new();

        for (position, instruction) in transaction.instructions.iter().enumerate() {
            let decoded = match self.decoder.decode(instruction) {
                Ok(Some(decoded)) => decoded,
                Ok(None) => continue,
                Err(e) => {
                    warn!(
                        "Could not decode instruction {} of transaction {}: {}",
                        position, transaction.id, e
                    );
                    warnings.push(SecurityWarning::new(
                        PatternId::DecodeFailure,
                        format!("Instruction {} could not be decoded: {}", position, e),
                        Some(instruction.program_id),
                    ));
                    continue;
                }
            };

            match decoded {
                DecodedInstruction::SetAuthority { target, authority_type, new_authority } => {
                    match (authority_type, new_authority) {
                        (AuthorityType::MintTokens, None) => warnings.push(SecurityWarning::new(
                            PatternId::MintKill,
                            format!("Instruction {} permanently removes the mint authority of {}", position, target),
                            Some(target),
                        )),
                        (AuthorityType::FreezeAccount, None) => warnings.push(SecurityWarning::new(
                            PatternId::FreezeKill,
                            format!("Instruction {} permanently removes the freeze authority of {}", position, target),
                            Some(target),
                        )),
                        (_, Some(new_authority)) if !signers.contains(&new_authority) => {
                            warnings.push(SecurityWarning::new(
                                PatternId::SignerMismatch,
                                format!(
                                    "Instruction {} hands {:?} authority of {} to {}, which does not sign the transaction",
                                    position, authority_type, target, new_authority
                                ),
                                Some(new_authority),
                            ))
                        }
                        _ => {}
                    }
                }
                DecodedInstruction::Transfer { source, .. } => {
                    drained.insert(source);
                }
                DecodedInstruction::CloseAccount { account, .. } => {
                    if !drained.contains(&account) {
                        warnings.push(SecurityWarning::new(
                            PatternId::DangerousClose,
                            format!(
                                "Instruction {} closes {} without a preceding transfer of its balance",
                                position, account
                            ),
                            Some(account),
                        ));
                    }
                }
                DecodedInstruction::Other { .. } => {}
            }
        }

        debug!(
            "Detected {} warnings in {} instructions of transaction {}",
            warnings.len(),
            transaction.instructions.len(),
            transaction.id
        );
        warnings
    }
}
