use {
  crate::{b58::ToBase58String, Transaction},
  multihash::{Multihash, MultihashDigest},
  once_cell::sync::OnceCell,
  serde::{Deserialize, Serialize},
  time::OffsetDateTime,
};

#[derive(Clone, Serialize, Deserialize)]
pub struct Block {
  pub number: u64,
  pub parent: Multihash,
  pub timestamp: OffsetDateTime,
  pub transactions: Vec<Transaction>,

  #[serde(skip)]
  hash_cache: OnceCell<Multihash>,
}

impl Block {
  pub fn new(
    parent: &Block,
    timestamp: OffsetDateTime,
    transactions: Vec<Transaction>,
  ) -> Self {
    Self {
      number: parent.number + 1,
      parent: *parent.hash(),
      timestamp,
      transactions,
      hash_cache: Default::default(),
    }
  }

  /// The implicit block every chain starts from. Its number is zero
  /// and it carries no transactions.
  pub fn zero(timestamp: OffsetDateTime) -> Self {
    Self {
      number: 0,
      parent: Multihash::default(),
      timestamp,
      transactions: vec![],
      hash_cache: OnceCell::new(),
    }
  }

  pub fn hash(&self) -> &Multihash {
    self.hash_cache.get_or_init(|| {
      // serializing plain structs and vectors into a vec never fails
      let bytes = rmp_serde::to_vec(self).unwrap_or_default();
      multihash::Code::Sha3_256.digest(&bytes)
    })
  }
}

impl core::fmt::Debug for Block {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    f.debug_struct("Block")
      .field("number", &self.number)
      .field("parent", &self.parent.to_b58())
      .field("hash", &self.hash().to_b58())
      .field("timestamp", &self.timestamp)
      .field("transactions", &self.transactions.len())
      .finish()
  }
}
