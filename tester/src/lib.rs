//! Deterministic in-process chain simulator for contract tests.
//!
//! A [`ChainTester`] hosts a single-node chain: contracts are deployed
//! to accounts, actions are pushed into a pending block and blocks are
//! produced only when the test asks for it. Table state can be read
//! either as committed by the last produced block (on-chain) or
//! including pending writes (off-chain).

mod config;
mod error;
mod pending;
mod query;
mod system;

pub use {
  chaintester_primitives::{
    permissions,
    Action,
    Authority,
    Block,
    Name,
    PermissionLevel,
    PublicKey,
    Reader,
    Row,
    Transaction,
    Writer,
    SYSTEM_ACCOUNT,
  },
  chaintester_vm::{
    Abi,
    ActionTrace,
    ApplyContext,
    ApplyError,
    Contract,
    Engine,
    ExecutionError,
    NativeEngine,
    DEFAULT_MAX_AUTHORITY_DEPTH,
    DEFAULT_MAX_INLINE_ACTION_DEPTH,
  },
  config::ChainConfig,
  error::Error,
  query::{parse_bound, TableQuery, TableRow, TableRows},
};
use {
  chaintester_primitives::{Permission, TableId, ToBase58String},
  chaintester_vm::{
    execute,
    AbiError,
    AuthorityStore,
    Code,
    Environment,
    InMemoryStateStore,
    Overlay,
    State,
  },
  multihash::{Multihash, MultihashDigest},
  pending::PendingBlock,
  serde_json::Value,
  std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
    time::{Duration, Instant},
  },
  time::OffsetDateTime,
  tracing::{debug, info},
};

/// Arguments of a pushed action.
#[derive(Debug, Clone)]
pub enum ActionArgs {
  /// Structured arguments, encoded with the contract ABI.
  Json(Value),

  /// Already serialized payload, passed to the contract as is.
  Raw(Vec<u8>),
}

impl From<Value> for ActionArgs {
  fn from(value: Value) -> Self {
    Self::Json(value)
  }
}

impl From<Vec<u8>> for ActionArgs {
  fn from(bytes: Vec<u8>) -> Self {
    Self::Raw(bytes)
  }
}

impl From<&[u8]> for ActionArgs {
  fn from(bytes: &[u8]) -> Self {
    Self::Raw(bytes.to_vec())
  }
}

/// Receipt of a successfully pushed transaction.
#[derive(Debug, Clone)]
pub struct TransactionTrace {
  pub id: Multihash,

  /// Number of the pending block the transaction was added to.
  pub block_num: u64,
  pub elapsed: Duration,

  /// Console output of all actions in execution order, empty
  /// unless `contracts_console` is enabled.
  pub console: String,
  pub action_traces: Vec<ActionTrace>,
}

/// A permission of an account as returned by [`ChainTester::get_account`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionInfo {
  pub name: Name,
  pub parent: Name,
  pub authority: Authority,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountInfo {
  pub name: Name,
  pub permissions: Vec<PermissionInfo>,
  pub code_hash: Option<Multihash>,
}

/// State of a live chain.
struct Chain {
  config: ChainConfig,
  engine: Arc<dyn Engine>,
  authorities: AuthorityStore,
  codes: BTreeMap<Name, Code>,
  committed: InMemoryStateStore,
  pending: PendingBlock,
  head: Block,
  keys: BTreeSet<PublicKey>,
  default_key: PublicKey,
  sequence: u64,
}

/// Single-node chain simulator.
///
/// All operations are synchronous. Independent testers share nothing
/// mutable and may run on separate threads. After [`ChainTester::free`]
/// every operation fails with [`Error::InvalidState`], dropping the
/// tester releases its state as well.
pub struct ChainTester {
  chain: Option<Chain>,
}

impl ChainTester {
  /// A chain with default configuration and an engine without
  /// any registered contracts.
  pub fn create() -> Result<Self, Error> {
    Self::new(NativeEngine::new())
  }

  pub fn new(engine: impl Engine + 'static) -> Result<Self, Error> {
    Self::with_config(ChainConfig::default(), Arc::new(engine))
  }

  pub fn with_config(
    config: ChainConfig,
    engine: Arc<dyn Engine>,
  ) -> Result<Self, Error> {
    let seed = multihash::Code::Sha3_256.digest(config.default_key_seed.as_bytes());
    let mut secret = [0u8; 32];
    secret.copy_from_slice(&seed.digest()[..32]);
    let default_key = PublicKey::from_secret(&secret)?;

    let mut authorities = AuthorityStore::new(config.max_authority_depth);
    let auth = Authority::from_key(default_key);
    authorities.create_account(SYSTEM_ACCOUNT, auth.clone(), auth.clone())?;
    for account in &config.genesis_accounts {
      authorities.create_account(account.parse()?, auth.clone(), auth.clone())?;
    }

    let head = Block::zero(config.genesis_time);
    info!(
      "created chain with {} accounts, default key {default_key}",
      authorities.accounts().count()
    );

    Ok(Self {
      chain: Some(Chain {
        engine,
        authorities,
        codes: BTreeMap::new(),
        committed: InMemoryStateStore::default(),
        pending: PendingBlock::default(),
        head,
        keys: [default_key].into(),
        default_key,
        sequence: 0,
        config,
      }),
    })
  }

  fn chain(&self) -> Result<&Chain, Error> {
    self.chain.as_ref().ok_or(Error::InvalidState)
  }

  fn chain_mut(&mut self) -> Result<&mut Chain, Error> {
    self.chain.as_mut().ok_or(Error::InvalidState)
  }

  /// Releases all chain state.
  pub fn free(&mut self) -> Result<(), Error> {
    match self.chain.take() {
      Some(chain) => {
        info!("freed chain at block {}", chain.head.number);
        Ok(())
      }
      None => Err(Error::InvalidState),
    }
  }

  pub fn is_freed(&self) -> bool {
    self.chain.is_none()
  }

  pub fn default_key(&self) -> Result<PublicKey, Error> {
    Ok(self.chain()?.default_key)
  }

  /// Adds a key to the tester keyring. Authorities listing the
  /// key are satisfied by it from now on.
  pub fn import_key(&mut self, secret: &[u8; 32]) -> Result<PublicKey, Error> {
    let key = PublicKey::from_secret(secret)?;
    self.chain_mut()?.keys.insert(key);
    Ok(key)
  }

  pub fn is_account(&self, name: Name) -> Result<bool, Error> {
    Ok(self.chain()?.authorities.is_account(name))
  }

  pub fn get_account(&self, name: Name) -> Result<AccountInfo, Error> {
    let chain = self.chain()?;
    if !chain.authorities.is_account(name) {
      return Err(Error::UnknownAccount(name));
    }
    Ok(AccountInfo {
      name,
      permissions: chain
        .authorities
        .permissions_of(name)
        .map(|(perm, Permission { parent, authority })| PermissionInfo {
          name: perm,
          parent: *parent,
          authority: authority.clone(),
        })
        .collect(),
      code_hash: chain.codes.get(&name).map(|c| *c.hash()),
    })
  }

  /// Creates an account with the given owner and active authorities.
  pub fn create_account(
    &mut self,
    creator: Name,
    name: Name,
    owner: Authority,
    active: Authority,
  ) -> Result<(), Error> {
    let chain = self.chain_mut()?;
    if !chain.authorities.is_account(creator) {
      return Err(Error::UnknownAccount(creator));
    }
    chain.authorities.create_account(name, owner, active)?;
    info!("{creator} created account {name}");
    Ok(())
  }

  /// Creates or replaces a permission of an account. `owner` takes
  /// an empty parent, every other permission needs an existing one.
  pub fn update_authority(
    &mut self,
    account: Name,
    permission: Name,
    parent: Name,
    authority: Authority,
  ) -> Result<(), Error> {
    let chain = self.chain_mut()?;
    chain
      .authorities
      .update(PermissionLevel::new(account, permission), parent, authority)?;
    info!("updated authority {account}@{permission}");
    Ok(())
  }

  pub fn delete_authority(&mut self, account: Name, permission: Name) -> Result<(), Error> {
    let chain = self.chain_mut()?;
    chain
      .authorities
      .delete(PermissionLevel::new(account, permission))?;
    info!("deleted authority {account}@{permission}");
    Ok(())
  }

  /// Requires `permission` of `account` to authorize `code::action`.
  /// An empty action name covers every action of the contract.
  pub fn link_authority(
    &mut self,
    account: Name,
    code: Name,
    action: Name,
    permission: Name,
  ) -> Result<(), Error> {
    self
      .chain_mut()?
      .authorities
      .link(account, code, action, permission)?;
    Ok(())
  }

  pub fn unlink_authority(
    &mut self,
    account: Name,
    code: Name,
    action: Name,
  ) -> Result<(), Error> {
    self.chain_mut()?.authorities.unlink(account, code, action)?;
    Ok(())
  }

  /// Deploys or replaces the contract of an account. An empty ABI
  /// leaves the contract without one.
  pub fn deploy_contract(
    &mut self,
    account: Name,
    bytecode: impl Into<Vec<u8>>,
    abi: &str,
  ) -> Result<(), Error> {
    let chain = self.chain_mut()?;
    if !chain.authorities.is_account(account) {
      return Err(Error::UnknownAccount(account));
    }

    let code = Code::new(bytecode.into(), abi.as_bytes())?;
    info!(
      "deployed {} bytes of code to {account}, code hash {}",
      code.bytecode().len(),
      code.hash().to_b58()
    );
    chain.codes.insert(account, code);
    Ok(())
  }

  /// Pushes a single action in its own transaction.
  pub fn push_action(
    &mut self,
    contract: Name,
    action: Name,
    args: impl Into<ActionArgs>,
    authorizations: &[PermissionLevel],
  ) -> Result<TransactionTrace, Error> {
    let chain = self.chain()?;
    let data = chain.encode_args(contract, action, args.into())?;
    self.push_transaction(vec![Action::new(
      contract,
      action,
      authorizations.to_vec(),
      data,
    )])
  }

  /// Pushes a transaction made of several actions. Either all of
  /// them succeed or none of their writes become visible.
  pub fn push_transaction(
    &mut self,
    actions: Vec<Action>,
  ) -> Result<TransactionTrace, Error> {
    let chain = self.chain_mut()?;
    if actions.is_empty() {
      return Err(Error::ExecutionFailure(ExecutionError::EmptyTransaction));
    }

    let started = Instant::now();
    // failed pushes leave the sequence untouched
    let tx = Transaction::new(chain.sequence + 1, actions);
    let block_num = chain.head.number + 1;

    let is_system = |a: &Action| system::is_system_action(a.account, a.name);
    let action_traces = if tx.actions.iter().all(is_system) {
      chain.apply_system(&tx)?
    } else if tx.actions.iter().any(is_system) {
      return Err(Error::MixedTransaction);
    } else {
      let pending = Overlay::new(&chain.committed, chain.pending.diff());
      let env = Environment {
        state: &pending,
        authorities: &chain.authorities,
        codes: &chain.codes,
        engine: chain.engine.as_ref(),
        keys: &chain.keys,
        block_num,
        block_time: chain.block_time(block_num),
        max_inline_depth: chain.config.max_inline_action_depth,
        contracts_console: chain.config.contracts_console,
      };
      let executed = execute(&env, &tx)?;
      chain.pending.consume(tx.clone(), executed.diff);
      executed.traces
    };

    chain.sequence = tx.sequence;
    let trace = TransactionTrace {
      id: tx.id(),
      block_num,
      elapsed: started.elapsed(),
      console: action_traces.iter().map(|t| t.console.as_str()).collect(),
      action_traces,
    };
    debug!(
      "pushed transaction {} into block {block_num} with {} action traces, {} pending",
      trace.id.to_b58(),
      trace.action_traces.len(),
      chain.pending.len()
    );
    Ok(trace)
  }

  /// Seals the pending block and commits its writes.
  pub fn produce_block(&mut self) -> Result<Block, Error> {
    let chain = self.chain_mut()?;
    let number = chain.head.number + 1;
    let timestamp = chain.block_time(number);
    let (block, diff) = chain.pending.produce(&chain.head, timestamp);
    let writes = diff.iter().count();
    chain.committed.apply(diff);
    chain.head = block.clone();
    info!(
      "produced block {} with {} transactions and {writes} table writes",
      block.number,
      block.transactions.len()
    );
    Ok(block)
  }

  pub fn produce_blocks(&mut self, count: usize) -> Result<(), Error> {
    for _ in 0..count {
      self.produce_block()?;
    }
    Ok(())
  }

  /// Number of the last produced block, zero before the first one.
  pub fn head_block_num(&self) -> Result<u64, Error> {
    Ok(self.chain()?.head.number)
  }

  pub fn head_block(&self) -> Result<Block, Error> {
    Ok(self.chain()?.head.clone())
  }

  /// Number of the block pushed transactions are added to.
  pub fn pending_block_num(&self) -> Result<u64, Error> {
    Ok(self.chain()?.head.number + 1)
  }

  /// Rows of a table with primary keys within the inclusive bounds,
  /// ascending by primary key and truncated to `limit`.
  ///
  /// A table the contract ABI does not declare is an error, a declared
  /// table without rows in the scope is an empty result.
  #[allow(clippy::too_many_arguments)]
  pub fn get_table_rows(
    &self,
    on_chain: bool,
    contract: Name,
    scope: Name,
    table: Name,
    lower_bound: &str,
    upper_bound: &str,
    limit: usize,
  ) -> Result<TableRows, Error> {
    let mut query = TableQuery::new(contract, scope, table)
      .bounds(lower_bound, upper_bound)
      .limit(limit);
    query.on_chain = on_chain;
    self.get_table_rows_by(&query)
  }

  pub fn get_table_rows_by(&self, query: &TableQuery) -> Result<TableRows, Error> {
    let chain = self.chain()?;
    if !chain.authorities.is_account(query.code) {
      return Err(Error::UnknownAccount(query.code));
    }

    let abi = chain
      .codes
      .get(&query.code)
      .and_then(Code::abi)
      .filter(|abi| abi.table_type(query.table).is_some())
      .ok_or(Error::UnknownTable {
        contract: query.code,
        table: query.table,
      })?;

    let table = TableId::new(query.code, query.scope, query.table);
    let rows = match query.on_chain {
      true => chain.committed.scan(&table),
      false => Overlay::new(&chain.committed, chain.pending.diff()).scan(&table),
    };
    query::select(rows, query, abi)
  }
}

impl Drop for ChainTester {
  fn drop(&mut self) {
    if let Some(chain) = self.chain.take() {
      debug!("released chain at block {}", chain.head.number);
    }
  }
}

impl Chain {
  fn block_time(&self, number: u64) -> OffsetDateTime {
    let nanos = u64::try_from(self.config.block_interval.as_nanos())
      .unwrap_or(u64::MAX)
      .saturating_mul(number);
    self.config.genesis_time + Duration::from_nanos(nanos)
  }

  fn encode_args(
    &self,
    contract: Name,
    action: Name,
    args: ActionArgs,
  ) -> Result<Vec<u8>, Error> {
    if !self.authorities.is_account(contract) {
      return Err(Error::UnknownAccount(contract));
    }

    match args {
      ActionArgs::Raw(bytes) => Ok(bytes),
      // system actions take their JSON arguments verbatim
      ActionArgs::Json(value) if system::is_system_action(contract, action) => {
        serde_json::to_vec(&value).map_err(|e| Error::Abi(e.into()))
      }
      ActionArgs::Json(value) => match self.codes.get(&contract).and_then(Code::abi) {
        Some(abi) => Ok(abi.encode_action(action, &value)?),
        None => Err(Error::Abi(AbiError::UnknownAction(action))),
      },
    }
  }

  fn apply_system(&mut self, tx: &Transaction) -> Result<Vec<ActionTrace>, Error> {
    // authority changes are applied immediately, stage them on a copy
    // so a failing action leaves the authorities untouched
    let mut authorities = self.authorities.clone();
    let mut traces = Vec::with_capacity(tx.actions.len());
    for (i, action) in tx.actions.iter().enumerate() {
      let started = Instant::now();
      system::apply(&mut authorities, &self.keys, action)?;
      traces.push(ActionTrace {
        action_ordinal: i as u32 + 1,
        creator_action_ordinal: 0,
        receiver: SYSTEM_ACCOUNT,
        action: action.clone(),
        console: String::new(),
        elapsed: started.elapsed(),
      });
    }
    self.authorities = authorities;
    self.pending.consume(tx.clone(), Default::default());
    Ok(traces)
  }
}
