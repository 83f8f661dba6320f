use {
  crate::{Name, NameError, PublicKey},
  serde::{Deserialize, Serialize},
  std::{collections::BTreeSet, fmt::Display, str::FromStr},
  thiserror::Error,
};

/// Well known permission names.
pub mod permissions {
  use crate::Name;

  pub const OWNER: Name = Name::from_u64(0xa726ab8000000000);
  pub const ACTIVE: Name = Name::from_u64(0x3232eda800000000);
  pub const CODE: Name = Name::from_u64(0x5530ea01144a8000);
}

/// An `(actor, permission)` pair, written `actor@permission`.
#[derive(
  Debug,
  Copy,
  Clone,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
  Serialize,
  Deserialize,
)]
pub struct PermissionLevel {
  pub actor: Name,
  pub permission: Name,
}

impl PermissionLevel {
  pub fn new(actor: Name, permission: Name) -> Self {
    Self { actor, permission }
  }

  pub fn active(actor: Name) -> Self {
    Self::new(actor, permissions::ACTIVE)
  }

  pub fn owner(actor: Name) -> Self {
    Self::new(actor, permissions::OWNER)
  }
}

/// Parses `actor@permission`, a bare `actor` means `actor@active`.
impl FromStr for PermissionLevel {
  type Err = NameError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.split_once('@') {
      Some((actor, permission)) => Ok(Self::new(actor.parse()?, permission.parse()?)),
      None => Ok(Self::active(s.parse()?)),
    }
  }
}

impl Display for PermissionLevel {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}@{}", self.actor, self.permission)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyWeight {
  pub key: PublicKey,
  pub weight: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionLevelWeight {
  pub permission: PermissionLevel,
  pub weight: u16,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InvalidAuthority {
  #[error("authority threshold must be greater than zero")]
  ZeroThreshold,

  #[error("authority entries must have non-zero weights")]
  ZeroWeight,

  #[error("key {0} appears more than once in the authority")]
  DuplicateKey(PublicKey),

  #[error("permission {0} appears more than once in the authority")]
  DuplicateAccount(PermissionLevel),

  #[error(
    "total authority weight {total} can never reach threshold {threshold}"
  )]
  Unreachable { threshold: u32, total: u32 },
}

/// Weighted set of keys and account permissions guarding a permission.
///
/// An authorization attempt succeeds when the sum of weights of the
/// satisfied entries is greater or equal to the threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authority {
  pub threshold: u32,

  #[serde(default)]
  pub keys: Vec<KeyWeight>,

  #[serde(default)]
  pub accounts: Vec<PermissionLevelWeight>,
}

impl Authority {
  pub fn new(threshold: u32) -> Self {
    Self {
      threshold,
      keys: vec![],
      accounts: vec![],
    }
  }

  /// Single key authority with threshold 1.
  pub fn from_key(key: PublicKey) -> Self {
    Self::new(1).with_key(key, 1)
  }

  pub fn with_key(mut self, key: PublicKey, weight: u16) -> Self {
    self.keys.push(KeyWeight { key, weight });
    self.keys.sort_by(|a, b| a.key.cmp(&b.key));
    self
  }

  pub fn with_account(mut self, permission: PermissionLevel, weight: u16) -> Self {
    self.accounts.push(PermissionLevelWeight { permission, weight });
    self.accounts.sort_by(|a, b| a.permission.cmp(&b.permission));
    self
  }

  pub fn total_weight(&self) -> u32 {
    self
      .keys
      .iter()
      .map(|k| k.weight as u32)
      .chain(self.accounts.iter().map(|a| a.weight as u32))
      .sum()
  }

  /// Checks that the authority is well formed and satisfiable.
  pub fn validate(&self) -> Result<(), InvalidAuthority> {
    if self.threshold == 0 {
      return Err(InvalidAuthority::ZeroThreshold);
    }

    let mut keys = BTreeSet::new();
    for k in &self.keys {
      if k.weight == 0 {
        return Err(InvalidAuthority::ZeroWeight);
      }
      if !keys.insert(k.key) {
        return Err(InvalidAuthority::DuplicateKey(k.key));
      }
    }

    let mut accounts = BTreeSet::new();
    for a in &self.accounts {
      if a.weight == 0 {
        return Err(InvalidAuthority::ZeroWeight);
      }
      if !accounts.insert(a.permission) {
        return Err(InvalidAuthority::DuplicateAccount(a.permission));
      }
    }

    let total = self.total_weight();
    if total < self.threshold {
      return Err(InvalidAuthority::Unreachable {
        threshold: self.threshold,
        total,
      });
    }

    Ok(())
  }
}

/// A named node in an account's permission tree.
///
/// The parent is stored by name, `owner` is the root and has
/// an empty parent name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
  pub parent: Name,
  pub authority: Authority,
}
