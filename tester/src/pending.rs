use {
  chaintester_primitives::{Block, Transaction},
  chaintester_vm::StateDiff,
  time::OffsetDateTime,
};

/// Transactions executed since the last produced block together
/// with their accumulated table writes.
#[derive(Debug, Default)]
pub struct PendingBlock {
  txs: Vec<Transaction>,
  diff: StateDiff,
}

impl PendingBlock {
  /// Adds a successfully executed transaction and its writes.
  pub fn consume(&mut self, tx: Transaction, diff: StateDiff) {
    self.txs.push(tx);
    self.diff.apply(diff);
  }

  pub fn diff(&self) -> &StateDiff {
    &self.diff
  }

  pub fn len(&self) -> usize {
    self.txs.len()
  }

  /// Seals the pending transactions into a block on top of `parent`
  /// and returns it with the writes to commit. Leaves the pending
  /// block empty.
  pub fn produce(
    &mut self,
    parent: &Block,
    timestamp: OffsetDateTime,
  ) -> (Block, StateDiff) {
    let txs = std::mem::take(&mut self.txs);
    let diff = std::mem::take(&mut self.diff);
    (Block::new(parent, timestamp, txs), diff)
  }
}
