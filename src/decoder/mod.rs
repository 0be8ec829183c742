//! Instruction decoding for security analysis.
//!
//! The pattern detector never looks at raw payload bytes itself. It asks an
//! [`InstructionDecoder`] for a [`DecodedInstruction`], so callers with their
//! own program layouts can plug in a different decoder.

pub mod wire;

use solana_pubkey::Pubkey;

use crate::constants::token::{authority_types, tags, COPTION_NONE, COPTION_SOME, TOKEN_PROGRAMS};
use crate::errors::{GuardError, GuardResult};
use crate::models::Instruction;

/// Kind of authority changed by a `SetAuthority` instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorityType {
    MintTokens,
    FreezeAccount,
    AccountOwner,
    CloseAccount,
    Other(u8),
}

impl From<u8> for AuthorityType {
    fn from(value: u8) -> Self {
        match value {
            authority_types::MINT_TOKENS => AuthorityType::MintTokens,
            authority_types::FREEZE_ACCOUNT => AuthorityType::FreezeAccount,
            authority_types::ACCOUNT_OWNER => AuthorityType::AccountOwner,
            authority_types::CLOSE_ACCOUNT => AuthorityType::CloseAccount,
            other => AuthorityType::Other(other),
        }
    }
}

/// Security-relevant view of an instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedInstruction {
    /// Authority change on a mint or token account
    SetAuthority {
        target: Pubkey,
        authority_type: AuthorityType,
        new_authority: Option<Pubkey>,
    },
    /// Balance moved out of `source`
    Transfer {
        source: Pubkey,
        destination: Pubkey,
        amount: u64,
    },
    /// Account closed, lamports sent to `destination`
    CloseAccount {
        account: Pubkey,
        destination: Pubkey,
    },
    /// Recognized program, instruction not relevant to any pattern
    Other { tag: u8 },
}

/// Turns raw instructions into [`DecodedInstruction`]s.
pub trait InstructionDecoder: Send + Sync {
    /// `Ok(None)` when the program is not understood by this decoder,
    /// `Err` when the program is understood but the payload is malformed.
    fn decode(&self, instruction: &Instruction) -> GuardResult<Option<DecodedInstruction>>;
}

/// Decoder for the SPL Token and Token-2022 instruction layout
#[derive(Debug, Clone, Default)]
pub struct SplTokenDecoder;

impl SplTokenDecoder {
    pub fn new() -> Self {
        Self
    }

    /// Whether `program_id` uses the SPL Token layout
    pub fn supports(program_id: &Pubkey) -> bool {
        TOKEN_PROGRAMS.contains(program_id)
    }
}

impl InstructionDecoder for SplTokenDecoder {
    fn decode(&self, instruction: &Instruction) -> GuardResult<Option<DecodedInstruction>> {
        if !Self::supports(&instruction.program_id) {
            return Ok(None);
        }

        let (&tag, rest) = instruction
            .data
            .split_first()
            .ok_or_else(|| GuardError::Decode("empty token instruction payload".to_string()))?;

        let decoded = match tag {
            tags::TRANSFER => DecodedInstruction::Transfer {
                source: account_at(instruction, 0)?,
                destination: account_at(instruction, 1)?,
                amount: read_u64(rest, 0)?,
            },
            tags::TRANSFER_CHECKED => {
                // decimals byte follows the amount
                if rest.len() < 9 {
                    return Err(GuardError::Decode(format!(
                        "TransferChecked payload too short: {} bytes",
                        instruction.data.len()
                    )));
                }
                DecodedInstruction::Transfer {
                    source: account_at(instruction, 0)?,
                    destination: account_at(instruction, 2)?,
                    amount: read_u64(rest, 0)?,
                }
            }
            tags::SET_AUTHORITY => {
                let authority_type = rest
                    .first()
                    .copied()
                    .map(AuthorityType::from)
                    .ok_or_else(|| GuardError::Decode("SetAuthority missing authority type".to_string()))?;
                let new_authority = read_coption_pubkey(&rest[1..])?;
                DecodedInstruction::SetAuthority {
                    target: account_at(instruction, 0)?,
                    authority_type,
                    new_authority,
                }
            }
            tags::CLOSE_ACCOUNT => DecodedInstruction::CloseAccount {
                account: account_at(instruction, 0)?,
                destination: account_at(instruction, 1)?,
            },
            other => DecodedInstruction::Other { tag: other },
        };

        Ok(Some(decoded))
    }
}

fn account_at(instruction: &Instruction, index: usize) -> GuardResult<Pubkey> {
    instruction
        .account(index)
        .map(|a| a.pubkey)
        .ok_or_else(|| {
            GuardError::Decode(format!(
                "instruction {:?} expects an account at position {}, found {} accounts",
                instruction.discriminant(),
                index,
                instruction.accounts.len()
            ))
        })
}

fn read_u64(data: &[u8], offset: usize) -> GuardResult<u64> {
    data.get(offset..offset + 8)
        .and_then(|bytes| <[u8; 8]>::try_from(bytes).ok())
        .map(u64::from_le_bytes)
        .ok_or_else(|| GuardError::Decode(format!("expected u64 at offset {}", offset)))
}

fn read_coption_pubkey(data: &[u8]) -> GuardResult<Option<Pubkey>> {
    match data.first().copied() {
        Some(COPTION_NONE) => Ok(None),
        Some(COPTION_SOME) => data
            .get(1..33)
            .and_then(|bytes| <[u8; 32]>::try_from(bytes).ok())
            .map(|bytes| Some(Pubkey::new_from_array(bytes)))
            .ok_or_else(|| GuardError::Decode("truncated authority pubkey".to_string())),
        Some(other) => Err(GuardError::Decode(format!("invalid option tag {}", other))),
        None => Err(GuardError::Decode("missing authority option".to_string())),
    }
}

/// Encoders for the token instructions the detector cares about.
///
/// Handy for building fixtures and for callers assembling transactions.
pub mod encode {
    use super::*;
    use crate::models::AccountRef;

    /// `SetAuthority` on `target`, signed by `current_authority`
    pub fn set_authority(
        program_id: Pubkey,
        target: Pubkey,
        current_authority: Pubkey,
        authority_type: u8,
        new_authority: Option<Pubkey>,
    ) -> Instruction {
        let mut data = vec![tags::SET_AUTHORITY, authority_type];
        match new_authority {
            Some(key) => {
                data.push(COPTION_SOME);
                data.extend_from_slice(key.as_ref());
            }
            None => data.push(COPTION_NONE),
        }
        Instruction::new(
            program_id,
            vec![AccountRef::writable(target), AccountRef::signer(current_authority)],
            data,
        )
    }

    /// `Transfer` of `amount` from `source` to `destination`
    pub fn transfer(program_id: Pubkey, source: Pubkey, destination: Pubkey, owner: Pubkey, amount: u64) -> Instruction {
        let mut data = vec![tags::TRANSFER];
        data.extend_from_slice(&amount.to_le_bytes());
        Instruction::new(
            program_id,
            vec![
                AccountRef::writable(source),
                AccountRef::writable(destination),
                AccountRef::signer(owner),
            ],
            data,
        )
    }

    /// `CloseAccount` of `account`, lamports to `destination`
    pub fn close_account(program_id: Pubkey, account: Pubkey, destination: Pubkey, owner: Pubkey) -> Instruction {
        Instruction::new(
            program_id,
            vec![
                AccountRef::writable(account),
                AccountRef::writable(destination),
                AccountRef::signer(owner),
            ],
            vec![tags::CLOSE_ACCOUNT],
        )
    }
}
