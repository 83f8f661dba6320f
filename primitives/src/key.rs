use {
  crate::b58::ToBase58String,
  ed25519_dalek::SecretKey,
  serde::{Deserialize, Deserializer, Serialize, Serializer},
  std::{
    fmt::{Debug, Display},
    str::FromStr,
  },
  thiserror::Error,
};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Error {
  #[error("public key is not valid base58: {0}")]
  Encoding(String),

  #[error("public key must be 32 bytes long, got {0}")]
  Length(usize),

  #[error("invalid ed25519 secret key")]
  Secret,
}

/// Ed25519 public key that may appear in a permission authority.
///
/// The tester never verifies signatures, it only tracks which public
/// keys it holds secrets for. An authority key weight counts toward
/// the threshold when the tester keyring contains that key.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PublicKey([u8; 32]);

impl PublicKey {
  /// Derives the public key that corresponds to a 32 byte ed25519 secret.
  pub fn from_secret(secret: &[u8; 32]) -> Result<Self, Error> {
    let secret = SecretKey::from_bytes(secret).map_err(|_| Error::Secret)?;
    Ok(ed25519_dalek::PublicKey::from(&secret).into())
  }

  pub fn as_bytes(&self) -> &[u8; 32] {
    &self.0
  }
}

impl From<ed25519_dalek::PublicKey> for PublicKey {
  fn from(p: ed25519_dalek::PublicKey) -> Self {
    Self(*p.as_bytes())
  }
}

impl From<[u8; 32]> for PublicKey {
  fn from(bytes: [u8; 32]) -> Self {
    Self(bytes)
  }
}

impl Display for PublicKey {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0.to_b58())
  }
}

impl Debug for PublicKey {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "pubkey({})", self.0.to_b58())
  }
}

impl FromStr for PublicKey {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let bytes = bs58::decode(s)
      .into_vec()
      .map_err(|e| Error::Encoding(e.to_string()))?;
    let len = bytes.len();
    Ok(Self(bytes.try_into().map_err(|_| Error::Length(len))?))
  }
}

impl Serialize for PublicKey {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&self.to_string())
  }
}

impl<'de> Deserialize<'de> for PublicKey {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let s = String::deserialize(deserializer)?;
    s.parse().map_err(serde::de::Error::custom)
  }
}
