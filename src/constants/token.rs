//! SPL Token program constants

use solana_pubkey::{pubkey, Pubkey};

/// SPL Token program
pub const TOKEN_PROGRAM_ID: Pubkey = pubkey!("TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA");

/// SPL Token-2022 program
pub const TOKEN_2022_PROGRAM_ID: Pubkey = pubkey!("TokenzQdBNbLqP5VEhdkAS6EPFLC1PHnBqCXEpPxuEb");

/// Programs sharing the SPL Token instruction layout
pub const TOKEN_PROGRAMS: [Pubkey; 2] = [TOKEN_PROGRAM_ID, TOKEN_2022_PROGRAM_ID];

/// Instruction tags (first payload byte)
pub mod tags {
    pub const TRANSFER: u8 = 3;
    pub const SET_AUTHORITY: u8 = 6;
    pub const CLOSE_ACCOUNT: u8 = 9;
    pub const TRANSFER_CHECKED: u8 = 12;
}

/// `AuthorityType` discriminants carried by `SetAuthority`
pub mod authority_types {
    pub const MINT_TOKENS: u8 = 0;
    pub const FREEZE_ACCOUNT: u8 = 1;
    pub const ACCOUNT_OWNER: u8 = 2;
    pub const CLOSE_ACCOUNT: u8 = 3;
}

/// `COption` tag for an absent value
pub const COPTION_NONE: u8 = 0;

/// `COption` tag for a present value
pub const COPTION_SOME: u8 = 1;
