use {
  crate::Error,
  chaintester_primitives::{Name, Row},
  chaintester_vm::Abi,
  serde::{Deserialize, Serialize},
  serde_json::Value,
  std::collections::BTreeMap,
};

/// A table read, modeled after the `get_table_rows` chain API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableQuery {
  /// Read committed state only, otherwise pending writes are
  /// visible as well.
  pub on_chain: bool,
  pub code: Name,
  pub scope: Name,
  pub table: Name,

  /// Inclusive bounds, as a decimal `u64` or a name. Empty
  /// means unbounded.
  pub lower_bound: String,
  pub upper_bound: String,
  pub limit: usize,

  /// 1 is the primary key, `n >= 2` is secondary index `n - 2`.
  pub index_position: usize,
  pub reverse: bool,

  /// Decode rows with the contract ABI, otherwise rows are
  /// returned as hex strings.
  pub json: bool,
}

impl TableQuery {
  pub fn new(code: Name, scope: Name, table: Name) -> Self {
    Self {
      on_chain: true,
      code,
      scope,
      table,
      lower_bound: String::new(),
      upper_bound: String::new(),
      limit: 10,
      index_position: 1,
      reverse: false,
      json: true,
    }
  }

  pub fn off_chain(mut self) -> Self {
    self.on_chain = false;
    self
  }

  pub fn bounds(mut self, lower: impl Into<String>, upper: impl Into<String>) -> Self {
    self.lower_bound = lower.into();
    self.upper_bound = upper.into();
    self
  }

  pub fn limit(mut self, limit: usize) -> Self {
    self.limit = limit;
    self
  }

  pub fn index(mut self, index_position: usize) -> Self {
    self.index_position = index_position;
    self
  }

  pub fn reverse(mut self) -> Self {
    self.reverse = true;
    self
  }

  pub fn raw(mut self) -> Self {
    self.json = false;
    self
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableRow {
  /// Primary key of the row.
  pub key: u64,
  pub payer: Name,
  pub data: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TableRows {
  pub rows: Vec<TableRow>,

  /// True when rows beyond `limit` matched the query.
  pub more: bool,

  /// Index key of the first row that was not returned, empty
  /// unless `more` is set.
  pub next_key: String,
}

impl TableRows {
  pub fn keys(&self) -> Vec<u64> {
    self.rows.iter().map(|r| r.key).collect()
  }
}

/// Parses a query bound, decimal numbers first and names otherwise.
pub fn parse_bound(bound: &str) -> Result<Option<u64>, Error> {
  let bound = bound.trim();
  if bound.is_empty() {
    return Ok(None);
  }
  if let Ok(value) = bound.parse::<u64>() {
    return Ok(Some(value));
  }
  Name::new(bound)
    .map(|name| Some(name.as_u64()))
    .map_err(|e| Error::InvalidQuery(format!("bound '{bound}': {e}")))
}

/// Applies a query to all rows of its table.
pub(crate) fn select(
  rows: BTreeMap<u64, Row>,
  query: &TableQuery,
  abi: &Abi,
) -> Result<TableRows, Error> {
  let lower = parse_bound(&query.lower_bound)?;
  let upper = parse_bound(&query.upper_bound)?;

  // (index key, primary key, row) in index order
  let mut entries: Vec<(u64, u64, Row)> = match query.index_position {
    0 => {
      return Err(Error::InvalidQuery(
        "index positions start at 1".to_string(),
      ))
    }
    1 => rows.into_iter().map(|(pk, row)| (pk, pk, row)).collect(),
    n => {
      let index = n - 2;
      let mut entries: Vec<_> = rows
        .into_iter()
        .filter_map(|(pk, row)| {
          row.secondary.get(index).copied().map(|sec| (sec, pk, row))
        })
        .collect();
      entries.sort_by_key(|(sec, pk, _)| (*sec, *pk));
      entries
    }
  };

  entries.retain(|(key, ..)| {
    lower.map_or(true, |l| *key >= l) && upper.map_or(true, |u| *key <= u)
  });
  if query.reverse {
    entries.reverse();
  }

  let mut result = TableRows::default();
  let mut entries = entries.into_iter();
  for (_, pk, row) in entries.by_ref().take(query.limit) {
    let data = match query.json {
      true => abi.decode_row(query.table, &row.value)?,
      false => Value::String(hex::encode(&row.value)),
    };
    result.rows.push(TableRow {
      key: pk,
      payer: row.payer,
      data,
    });
  }

  if let Some((next, ..)) = entries.next() {
    result.more = true;
    result.next_key = next.to_string();
  }

  Ok(result)
}

#[cfg(test)]
mod tests {
  use {
    super::{parse_bound, select, TableQuery},
    crate::Error,
    chaintester_primitives::{Name, Row, Writer},
    chaintester_vm::Abi,
    std::collections::BTreeMap,
  };

  const ABI: &str = r#"{
    "version": "eosio::abi/1.1",
    "structs": [{
      "name": "entry",
      "base": "",
      "fields": [{ "name": "id", "type": "uint64" }]
    }],
    "tables": [{ "name": "entries", "index_type": "i64", "type": "entry" }]
  }"#;

  fn rows() -> BTreeMap<u64, Row> {
    [(1u64, 30u64), (2, 10), (3, 20), (4, 10), (5, 50)]
      .into_iter()
      .map(|(pk, sec)| {
        let mut w = Writer::new();
        w.write_u64(pk);
        (pk, Row::new(Name::default(), w.into_bytes()).with_secondary(vec![sec]))
      })
      .collect()
  }

  fn query() -> anyhow::Result<TableQuery> {
    Ok(TableQuery::new(
      "hello".parse()?,
      "hello".parse()?,
      "entries".parse()?,
    ))
  }

  #[test]
  fn bounds_parse_numbers_then_names() -> anyhow::Result<()> {
    assert_eq!(parse_bound("")?, None);
    assert_eq!(parse_bound("42")?, Some(42));
    assert_eq!(parse_bound("alice")?, Some(Name::new("alice")?.as_u64()));
    assert!(matches!(parse_bound("Not-A-Name"), Err(Error::InvalidQuery(_))));
    Ok(())
  }

  #[test]
  fn primary_index_paging() -> anyhow::Result<()> {
    let abi = Abi::from_json(ABI.as_bytes())?;

    let all = select(rows(), &query()?, &abi)?;
    assert_eq!(all.keys(), vec![1, 2, 3, 4, 5]);
    assert_eq!(all.rows[0].data["id"], 1);
    assert!(!all.more);
    assert!(all.next_key.is_empty());

    let page = select(rows(), &query()?.bounds("2", "4"), &abi)?;
    assert_eq!(page.keys(), vec![2, 3, 4]);

    let page = select(rows(), &query()?.limit(2), &abi)?;
    assert_eq!(page.keys(), vec![1, 2]);
    assert!(page.more);
    assert_eq!(page.next_key, "3");

    let page = select(rows(), &query()?.reverse().limit(2), &abi)?;
    assert_eq!(page.keys(), vec![5, 4]);
    assert_eq!(page.next_key, "3");

    let none = select(rows(), &query()?.bounds("4", "2"), &abi)?;
    assert!(none.rows.is_empty());

    let raw = select(rows(), &query()?.raw().limit(1), &abi)?;
    assert_eq!(raw.rows[0].data, "0100000000000000");
    Ok(())
  }

  #[test]
  fn secondary_index() -> anyhow::Result<()> {
    let abi = Abi::from_json(ABI.as_bytes())?;

    let by_sec = select(rows(), &query()?.index(2), &abi)?;
    assert_eq!(by_sec.keys(), vec![2, 4, 3, 1, 5]);

    let page = select(rows(), &query()?.index(2).bounds("10", "20").limit(2), &abi)?;
    assert_eq!(page.keys(), vec![2, 4]);
    assert_eq!(page.next_key, "20");

    let missing = select(rows(), &query()?.index(3), &abi)?;
    assert!(missing.rows.is_empty());

    assert!(matches!(
      select(rows(), &query()?.index(0), &abi),
      Err(Error::InvalidQuery(_))
    ));
    Ok(())
  }
}
