use {
  chaintester_primitives::{Row, RowKey, TableId},
  serde::{Deserialize, Serialize},
  std::collections::{BTreeMap, BTreeSet},
};

/// Represents a change in contract table state.
///
/// State diffs are meant to be accumulated and logically the entire
/// table state of the chain is the result of cumulative application
/// of consecutive state diffs.
///
/// An action produces a state diff, a transaction merges the diffs of
/// all its actions and a block merges the diffs of all its transactions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateDiff {
  upserts: BTreeMap<RowKey, Row>,
  deletes: BTreeSet<RowKey>,
}

impl StateDiff {
  /// Inserts or updates a row under a given key.
  ///
  /// If the state diff had a row stored under this key
  /// then the old value is returned, otherwise `None` is returned.
  pub fn set(&mut self, key: RowKey, row: Row) -> Option<Row> {
    self.deletes.remove(&key);
    self.upserts.insert(key, row)
  }

  /// Removes the row under a given key.
  ///
  /// If the state diff contained a row at the given key
  /// then the removed value is returned, otherwise `None`.
  pub fn remove(&mut self, key: &RowKey) -> Option<Row> {
    self.deletes.insert(*key);
    self.upserts.remove(key)
  }

  /// Merges a state diff with a newer diff.
  ///
  /// Applying the resulting diff is equivalent to
  /// applying the two merged diffs consecutively on
  /// any state store.
  pub fn merge(self, newer: StateDiff) -> StateDiff {
    let mut upserts = self.upserts;
    let mut deletes = self.deletes;
    for (key, row) in newer.upserts {
      deletes.remove(&key);
      upserts.insert(key, row);
    }
    for key in newer.deletes {
      upserts.remove(&key);
      deletes.insert(key);
    }
    StateDiff { upserts, deletes }
  }

  pub fn apply(&mut self, diff: StateDiff) {
    *self = std::mem::take(self).merge(diff);
  }

  pub fn is_empty(&self) -> bool {
    self.upserts.is_empty() && self.deletes.is_empty()
  }

  /// What this diff says about a key:
  ///   - `None` => the diff does not touch this key,
  ///   - `Some(None)` => the row was deleted,
  ///   - `Some(Some(row))` => the row was created or changed.
  pub fn lookup(&self, key: &RowKey) -> Option<Option<&Row>> {
    if let Some(row) = self.upserts.get(key) {
      Some(Some(row))
    } else if self.deletes.contains(key) {
      Some(None)
    } else {
      None
    }
  }

  /// Iterate over all row changes in a state diff.
  ///
  /// There are two variants of changes:
  ///   1. (RowKey, Row) => the row under a given key was created or changed.
  ///   2. (RowKey, None) => the row under a given key was deleted.
  pub fn iter(&self) -> impl Iterator<Item = (&RowKey, Option<&Row>)> {
    self
      .upserts
      .iter()
      .map(|(key, row)| (key, Some(row)))
      .chain(self.deletes.iter().map(|key| (key, None)))
  }
}

/// Read access to contract tables.
pub trait State {
  fn get(&self, key: &RowKey) -> Option<Row>;

  /// All rows of one table, ordered by primary key.
  fn scan(&self, table: &TableId) -> BTreeMap<u64, Row>;
}

/// Committed table state.
#[derive(Debug, Default)]
pub struct InMemoryStateStore {
  data: BTreeMap<RowKey, Row>,
}

impl InMemoryStateStore {
  pub fn iter(&self) -> impl Iterator<Item = (&RowKey, &Row)> {
    self.data.iter()
  }

  pub fn apply(&mut self, diff: StateDiff) {
    for (k, v) in diff.upserts {
      self.data.insert(k, v);
    }

    for key in diff.deletes {
      self.data.remove(&key);
    }
  }
}

impl State for InMemoryStateStore {
  fn get(&self, key: &RowKey) -> Option<Row> {
    self.data.get(key).cloned()
  }

  fn scan(&self, table: &TableId) -> BTreeMap<u64, Row> {
    self
      .data
      .range(table.key(u64::MIN)..=table.key(u64::MAX))
      .map(|(key, row)| (key.primary, row.clone()))
      .collect()
  }
}

/// A state diff layered on top of a base state.
///
/// Reads consult the diff first and fall through to the base
/// for keys the diff does not touch. This is how pending writes
/// are observed before they are committed.
pub struct Overlay<'a> {
  base: &'a dyn State,
  diff: &'a StateDiff,
}

impl<'a> Overlay<'a> {
  pub fn new(base: &'a dyn State, diff: &'a StateDiff) -> Self {
    Self { base, diff }
  }
}

impl State for Overlay<'_> {
  fn get(&self, key: &RowKey) -> Option<Row> {
    match self.diff.lookup(key) {
      Some(row) => row.cloned(),
      None => self.base.get(key),
    }
  }

  fn scan(&self, table: &TableId) -> BTreeMap<u64, Row> {
    let mut rows = self.base.scan(table);
    for (key, row) in self.diff.iter() {
      if key.table != *table {
        continue;
      }
      match row {
        Some(row) => rows.insert(key.primary, row.clone()),
        None => rows.remove(&key.primary),
      };
    }
    rows
  }
}
