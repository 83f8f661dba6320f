mod action;
mod authority;
mod b58;
mod block;
mod codec;
mod key;
mod name;
mod table;
mod transaction;

pub use {
  action::Action,
  authority::{
    permissions,
    Authority,
    InvalidAuthority,
    KeyWeight,
    Permission,
    PermissionLevel,
    PermissionLevelWeight,
  },
  b58::ToBase58String,
  block::Block,
  codec::{DecodeError, Reader, Writer},
  key::{Error as KeyError, PublicKey},
  name::{Error as NameError, Name},
  table::{Row, RowKey, TableId},
  transaction::Transaction,
};

/// The built-in system account, `eosio`.
pub const SYSTEM_ACCOUNT: Name = Name::from_u64(0x5530ea0000000000);
