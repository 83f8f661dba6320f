use {
  crate::Action,
  multihash::{Multihash, MultihashDigest},
  serde::{Deserialize, Serialize},
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
  /// Position of this transaction in the chain history.
  ///
  /// Makes the id of two otherwise identical transactions
  /// pushed in the same block distinct.
  pub sequence: u64,

  /// Top level actions, executed in order. Either all of them
  /// and their notifications and inline actions succeed or the
  /// entire transaction is discarded.
  pub actions: Vec<Action>,
}

impl Transaction {
  pub fn new(sequence: u64, actions: Vec<Action>) -> Self {
    Self { sequence, actions }
  }

  pub fn id(&self) -> Multihash {
    // serializing plain structs and vectors into a vec never fails
    let bytes = rmp_serde::to_vec(self).unwrap_or_default();
    multihash::Code::Sha3_256.digest(&bytes)
  }
}
