use {
  crate::{
    authority::AuthorityStore,
    state::{Overlay, State, StateDiff},
  },
  chaintester_primitives::{
    Action,
    DecodeError,
    Name,
    PermissionLevel,
    Reader,
    Row,
    RowKey,
    TableId,
  },
  multihash::{Code, MultihashDigest},
  ripemd::Ripemd160,
  sha1::{Digest, Sha1},
  thiserror::Error,
  time::OffsetDateTime,
};

/// Reasons for a contract to abort an action.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Error {
  #[error("assertion failure with message: {0}")]
  Assert(String),

  #[error("missing authority of {0}")]
  MissingAuth(Name),

  #[error("missing authority of {0}")]
  MissingAuth2(PermissionLevel),

  #[error("account '{0}' does not exist")]
  UnknownAccount(Name),

  #[error("row with primary key {} already exists in {}", .0.primary, .0.table)]
  DuplicateKey(RowKey),

  #[error("row with primary key {} not found in {}", .0.primary, .0.table)]
  RowNotFound(RowKey),

  #[error("malformed action data: {0}")]
  Decode(#[from] DecodeError),

  #[error("engine error: {0}")]
  Engine(String),
}

/// Everything a contract produced while handling an action besides
/// its table writes.
#[derive(Debug, Default)]
pub struct Effects {
  pub console: String,
  pub recipients: Vec<Name>,
  pub inline_actions: Vec<Action>,
}

/// The view of the chain a contract gets while handling one action.
///
/// Reads observe the chain state below plus all writes made earlier
/// in the same transaction. Writes are collected in the transaction
/// diff and only reach the chain when the whole transaction succeeds.
pub struct ApplyContext<'a> {
  receiver: Name,
  action: &'a Action,
  block_num: u64,
  block_time: OffsetDateTime,
  state: &'a dyn State,
  diff: &'a mut StateDiff,
  authorities: &'a AuthorityStore,
  effects: Effects,
}

impl<'a> ApplyContext<'a> {
  pub fn new(
    receiver: Name,
    action: &'a Action,
    block: (u64, OffsetDateTime),
    state: &'a dyn State,
    diff: &'a mut StateDiff,
    authorities: &'a AuthorityStore,
  ) -> Self {
    Self {
      receiver,
      action,
      block_num: block.0,
      block_time: block.1,
      state,
      diff,
      authorities,
      effects: Effects::default(),
    }
  }

  /// Account whose code is currently running.
  pub fn receiver(&self) -> Name {
    self.receiver
  }

  /// Contract the action was sent to. Differs from the receiver
  /// when handling a notification.
  pub fn first_receiver(&self) -> Name {
    self.action.account
  }

  pub fn action_name(&self) -> Name {
    self.action.name
  }

  pub fn data(&self) -> &[u8] {
    &self.action.data
  }

  /// Binary reader positioned at the start of the action payload.
  pub fn reader(&self) -> Reader<'_> {
    Reader::new(&self.action.data)
  }

  pub fn authorization(&self) -> &[PermissionLevel] {
    &self.action.authorization
  }

  pub fn block_num(&self) -> u64 {
    self.block_num
  }

  pub fn block_time(&self) -> OffsetDateTime {
    self.block_time
  }

  pub fn has_auth(&self, account: Name) -> bool {
    self.action.authorization.iter().any(|a| a.actor == account)
  }

  pub fn require_auth(&self, account: Name) -> Result<(), Error> {
    match self.has_auth(account) {
      true => Ok(()),
      false => Err(Error::MissingAuth(account)),
    }
  }

  pub fn require_auth2(&self, level: PermissionLevel) -> Result<(), Error> {
    match self.action.authorization.contains(&level) {
      true => Ok(()),
      false => Err(Error::MissingAuth2(level)),
    }
  }

  pub fn is_account(&self, account: Name) -> bool {
    self.authorities.is_account(account)
  }

  /// Appends to the console output of this action.
  pub fn print(&mut self, message: impl AsRef<str>) {
    self.effects.console.push_str(message.as_ref());
  }

  /// Aborts the action with `message` unless `condition` holds.
  pub fn check(&self, condition: bool, message: impl Into<String>) -> Result<(), Error> {
    match condition {
      true => Ok(()),
      false => Err(Error::Assert(message.into())),
    }
  }

  pub fn sha256(&self, data: &[u8]) -> [u8; 32] {
    multihash_digest(Code::Sha2_256, data)
  }

  pub fn sha512(&self, data: &[u8]) -> [u8; 64] {
    multihash_digest(Code::Sha2_512, data)
  }

  pub fn sha1(&self, data: &[u8]) -> [u8; 20] {
    Sha1::digest(data).into()
  }

  pub fn ripemd160(&self, data: &[u8]) -> [u8; 20] {
    Ripemd160::digest(data).into()
  }

  /// Aborts the action unless `data` hashes to `hash`.
  pub fn assert_sha256(&self, data: &[u8], hash: &[u8; 32]) -> Result<(), Error> {
    self.check(&self.sha256(data) == hash, "sha256 hash mismatch")
  }

  pub fn assert_sha512(&self, data: &[u8], hash: &[u8; 64]) -> Result<(), Error> {
    self.check(&self.sha512(data) == hash, "sha512 hash mismatch")
  }

  pub fn assert_sha1(&self, data: &[u8], hash: &[u8; 20]) -> Result<(), Error> {
    self.check(&self.sha1(data) == hash, "sha1 hash mismatch")
  }

  pub fn assert_ripemd160(&self, data: &[u8], hash: &[u8; 20]) -> Result<(), Error> {
    self.check(&self.ripemd160(data) == hash, "ripemd160 hash mismatch")
  }

  /// Schedules a notification of this action to `recipient`.
  pub fn require_recipient(&mut self, recipient: Name) -> Result<(), Error> {
    if !self.is_account(recipient) {
      return Err(Error::UnknownAccount(recipient));
    }
    if recipient != self.receiver && !self.effects.recipients.contains(&recipient) {
      self.effects.recipients.push(recipient);
    }
    Ok(())
  }

  /// Schedules an action to run after this action and its
  /// notifications complete.
  pub fn send_inline(&mut self, action: Action) -> Result<(), Error> {
    if !self.is_account(action.account) {
      return Err(Error::UnknownAccount(action.account));
    }
    self.effects.inline_actions.push(action);
    Ok(())
  }

  pub fn find(&self, code: Name, scope: Name, table: Name, primary: u64) -> Option<Row> {
    self.view().get(&TableId::new(code, scope, table).key(primary))
  }

  /// First row with a primary key not less than `primary`.
  pub fn lower_bound(
    &self,
    code: Name,
    scope: Name,
    table: Name,
    primary: u64,
  ) -> Option<(u64, Row)> {
    self
      .rows(code, scope, table)
      .into_iter()
      .find(|(key, _)| *key >= primary)
  }

  /// First row with a primary key greater than `primary`.
  pub fn upper_bound(
    &self,
    code: Name,
    scope: Name,
    table: Name,
    primary: u64,
  ) -> Option<(u64, Row)> {
    self
      .rows(code, scope, table)
      .into_iter()
      .find(|(key, _)| *key > primary)
  }

  /// All rows of a table ordered by primary key.
  pub fn rows(&self, code: Name, scope: Name, table: Name) -> Vec<(u64, Row)> {
    self
      .view()
      .scan(&TableId::new(code, scope, table))
      .into_iter()
      .collect()
  }

  /// Rows ordered by `(secondary[index], primary)`, rows without a value
  /// for that index are not part of it.
  fn secondary(&self, code: Name, scope: Name, table: Name, index: usize) -> Vec<(u64, u64, Row)> {
    let mut rows: Vec<_> = self
      .rows(code, scope, table)
      .into_iter()
      .filter_map(|(primary, row)| {
        row.secondary.get(index).copied().map(|sec| (sec, primary, row))
      })
      .collect();
    rows.sort_by_key(|(sec, primary, _)| (*sec, *primary));
    rows
  }

  /// First row whose secondary key `index` equals `value`.
  pub fn find_secondary(
    &self,
    code: Name,
    scope: Name,
    table: Name,
    index: usize,
    value: u64,
  ) -> Option<(u64, Row)> {
    self
      .secondary(code, scope, table, index)
      .into_iter()
      .find(|(sec, ..)| *sec == value)
      .map(|(_, primary, row)| (primary, row))
  }

  pub fn lower_bound_secondary(
    &self,
    code: Name,
    scope: Name,
    table: Name,
    index: usize,
    value: u64,
  ) -> Option<(u64, Row)> {
    self
      .secondary(code, scope, table, index)
      .into_iter()
      .find(|(sec, ..)| *sec >= value)
      .map(|(_, primary, row)| (primary, row))
  }

  pub fn upper_bound_secondary(
    &self,
    code: Name,
    scope: Name,
    table: Name,
    index: usize,
    value: u64,
  ) -> Option<(u64, Row)> {
    self
      .secondary(code, scope, table, index)
      .into_iter()
      .find(|(sec, ..)| *sec > value)
      .map(|(_, primary, row)| (primary, row))
  }

  /// Stores a new row in one of the receiver's tables.
  pub fn emplace(
    &mut self,
    scope: Name,
    table: Name,
    primary: u64,
    row: Row,
  ) -> Result<(), Error> {
    let key = self.own_table(scope, table).key(primary);
    if self.view().get(&key).is_some() {
      return Err(Error::DuplicateKey(key));
    }
    let row = self.with_payer(row)?;
    self.diff.set(key, row);
    Ok(())
  }

  /// Replaces an existing row in one of the receiver's tables.
  pub fn modify(
    &mut self,
    scope: Name,
    table: Name,
    primary: u64,
    row: Row,
  ) -> Result<(), Error> {
    let key = self.own_table(scope, table).key(primary);
    if self.view().get(&key).is_none() {
      return Err(Error::RowNotFound(key));
    }
    let row = self.with_payer(row)?;
    self.diff.set(key, row);
    Ok(())
  }

  pub fn erase(&mut self, scope: Name, table: Name, primary: u64) -> Result<(), Error> {
    let key = self.own_table(scope, table).key(primary);
    if self.view().get(&key).is_none() {
      return Err(Error::RowNotFound(key));
    }
    self.diff.remove(&key);
    Ok(())
  }

  /// Console output so far.
  pub fn console(&self) -> &str {
    &self.effects.console
  }

  pub fn into_effects(self) -> Effects {
    self.effects
  }

  fn view(&self) -> Overlay<'_> {
    Overlay::new(self.state, &*self.diff)
  }

  /// Contracts only ever write to their own tables.
  fn own_table(&self, scope: Name, table: Name) -> TableId {
    TableId::new(self.receiver, scope, table)
  }

  /// An empty payer bills the receiver, any other payer must
  /// have authorized the action.
  fn with_payer(&self, mut row: Row) -> Result<Row, Error> {
    if row.payer.is_empty() {
      row.payer = self.receiver;
    } else if row.payer != self.receiver {
      self.require_auth(row.payer)?;
    }
    Ok(row)
  }
}

fn multihash_digest<const N: usize>(code: Code, data: &[u8]) -> [u8; N] {
  let hash = code.digest(data);
  let mut out = [0; N];
  out.copy_from_slice(hash.digest());
  out
}
