//! Transaction model

use std::collections::HashSet;

use serde::{Serialize, Deserialize};
use solana_pubkey::Pubkey;

use crate::models::instruction::Instruction;

/// Lifecycle status of a transaction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    #[default]
    Pending,
    Executed,
    Failed,
}

/// Privacy requirements attached to a transaction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivacyMetadata {
    /// The caller wants the transaction executed privately
    pub requires_privacy: bool,
    /// State compression is enabled for the transaction
    pub compression_enabled: bool,
}

/// A decoded transaction as handed over by the chain reader.
///
/// The guard only ever borrows a transaction. Producing a transaction in a
/// different state means building a new value, see [`Transaction::with_status`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Transaction identifier (usually the first signature)
    pub id: String,
    /// Instructions in execution order
    pub instructions: Vec<Instruction>,
    /// Lifecycle status
    #[serde(default)]
    pub status: TransactionStatus,
    /// Assets whose risk should be assessed
    #[serde(default)]
    pub asset_addresses: Vec<Pubkey>,
    /// Privacy requirements, if any
    #[serde(default)]
    pub privacy: Option<PrivacyMetadata>,
    /// Actual slippage observed for the trade, opting into the slippage check
    #[serde(default)]
    pub slippage: Option<f64>,
}

impl Transaction {
    /// Create an empty pending transaction
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Append an instruction
    pub fn with_instruction(mut self, instruction: Instruction) -> Self {
        self.instructions.push(instruction);
        self
    }

    /// Set the assets to assess
    pub fn with_assets(mut self, assets: impl IntoIterator<Item = Pubkey>) -> Self {
        self.asset_addresses = assets.into_iter().collect();
        self
    }

    /// Attach privacy metadata
    pub fn with_privacy(mut self, requires_privacy: bool, compression_enabled: bool) -> Self {
        self.privacy = Some(PrivacyMetadata { requires_privacy, compression_enabled });
        self
    }

    /// Attach the actual slippage of the trade
    pub fn with_slippage(mut self, slippage: f64) -> Self {
        self.slippage = Some(slippage);
        self
    }

    /// Same transaction in a different lifecycle state
    pub fn with_status(mut self, status: TransactionStatus) -> Self {
        self.status = status;
        self
    }

    /// Every account that signs at least one instruction
    pub fn signers(&self) -> HashSet<Pubkey> {
        self.instructions
            .iter()
            .flat_map(|ix| ix.signers())
            .copied()
            .collect()
    }

    /// Whether the caller asked for privacy without compression
    pub fn privacy_without_compression(&self) -> bool {
        self.privacy
            .map(|p| p.requires_privacy && !p.compression_enabled)
            .unwrap_or(false)
    }
}
