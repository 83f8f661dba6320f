use {
  crate::Name,
  serde::{Deserialize, Serialize},
  std::fmt::Display,
};

/// Identifies one table instance: the rows stored by contract `code`
/// in table `table` under scope `scope`.
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
pub struct TableId {
  pub code: Name,
  pub scope: Name,
  pub table: Name,
}

impl TableId {
  pub fn new(code: Name, scope: Name, table: Name) -> Self {
    Self { code, scope, table }
  }

  pub fn key(&self, primary: u64) -> RowKey {
    RowKey {
      table: *self,
      primary,
    }
  }
}

impl Display for TableId {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}/{}/{}", self.code, self.scope, self.table)
  }
}

/// Globally unique location of a row. Ordering groups rows of the same
/// table together, sorted by primary key.
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
pub struct RowKey {
  pub table: TableId,
  pub primary: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
  /// Account billed for the storage of this row.
  pub payer: Name,

  /// Serialized row contents, opaque to the chain.
  pub value: Vec<u8>,

  /// Secondary `u64` index values, position `i` belongs to
  /// secondary index `i`.
  #[serde(default)]
  pub secondary: Vec<u64>,
}

impl Row {
  pub fn new(payer: Name, value: Vec<u8>) -> Self {
    Self {
      payer,
      value,
      secondary: vec![],
    }
  }

  pub fn with_secondary(mut self, secondary: Vec<u64>) -> Self {
    self.secondary = secondary;
    self
  }
}
