//! Instruction model consumed by the pattern detector

use serde::{Serialize, Deserialize};
use solana_pubkey::Pubkey;

/// One operation within a transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    /// Program that executes the instruction
    pub program_id: Pubkey,
    /// Accounts in the order the program expects them
    pub accounts: Vec<AccountRef>,
    /// Raw instruction payload
    pub data: Vec<u8>,
}

/// An account referenced by an instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountRef {
    /// Account address
    pub pubkey: Pubkey,
    /// Is this account a signer?
    pub is_signer: bool,
    /// Is this account writable?
    pub is_writable: bool,
}

impl Instruction {
    /// Create a new instruction
    pub fn new(program_id: Pubkey, accounts: Vec<AccountRef>, data: Vec<u8>) -> Self {
        Self {
            program_id,
            accounts,
            data,
        }
    }

    /// Opcode/discriminant byte, if the payload is not empty
    pub fn discriminant(&self) -> Option<u8> {
        self.data.first().copied()
    }

    /// Account at `index`, if present
    pub fn account(&self, index: usize) -> Option<&AccountRef> {
        self.accounts.get(index)
    }

    /// Accounts flagged as signers
    pub fn signers(&self) -> impl Iterator<Item = &Pubkey> {
        self.accounts.iter().filter(|a| a.is_signer).map(|a| &a.pubkey)
    }
}

impl AccountRef {
    /// Writable signer
    pub fn signer(pubkey: Pubkey) -> Self {
        Self { pubkey, is_signer: true, is_writable: true }
    }

    /// Writable, not a signer
    pub fn writable(pubkey: Pubkey) -> Self {
        Self { pubkey, is_signer: false, is_writable: true }
    }

    /// Read-only, not a signer
    pub fn readonly(pubkey: Pubkey) -> Self {
        Self { pubkey, is_signer: false, is_writable: false }
    }
}

impl From<&solana_instruction::AccountMeta> for AccountRef {
    fn from(meta: &solana_instruction::AccountMeta) -> Self {
        Self {
            pubkey: meta.pubkey,
            is_signer: meta.is_signer,
            is_writable: meta.is_writable,
        }
    }
}

impl From<&solana_instruction::Instruction> for Instruction {
    fn from(ix: &solana_instruction::Instruction) -> Self {
        Self {
            program_id: ix.program_id,
            accounts: ix.accounts.iter().map(AccountRef::from).collect(),
            data: ix.data.clone(),
        }
    }
}
