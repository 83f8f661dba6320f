use {
  crate::{
    authority::{AuthorityStore, Error as AuthorityError, Provided},
    code::Code,
    context::{ApplyContext, Effects, Error as ApplyError},
    engine::Engine,
    state::{State, StateDiff},
  },
  chaintester_primitives::{
    permissions,
    Action,
    Name,
    PermissionLevel,
    PublicKey,
    Transaction,
  },
  std::{
    collections::{BTreeMap, BTreeSet},
    time::{Duration, Instant},
  },
  thiserror::Error,
  time::OffsetDateTime,
  tracing::{debug, info},
};

/// Default limit of nested inline actions.
pub const DEFAULT_MAX_INLINE_ACTION_DEPTH: usize = 4;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Error {
  #[error("authorization failure: {0}")]
  Authorization(#[from] AuthorityError),

  #[error("account '{0}' does not exist")]
  UnknownAccount(Name),

  #[error("account '{0}' has no contract deployed")]
  NoCode(Name),

  #[error("transaction has no actions")]
  EmptyTransaction,

  #[error("inline actions nested deeper than {0} levels")]
  InlineDepth(usize),

  #[error("'{receiver}' failed to apply '{action}': {source}")]
  Apply {
    receiver: Name,
    action: Name,
    console: String,
    source: ApplyError,
  },
}

/// Record of one action handler invocation.
///
/// Traces are listed in execution order. Ordinals start at 1, a
/// creator ordinal of 0 marks an action of the transaction itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionTrace {
  pub action_ordinal: u32,
  pub creator_action_ordinal: u32,
  pub receiver: Name,
  pub action: Action,

  /// Contract console output, empty unless console capture is enabled.
  pub console: String,
  pub elapsed: Duration,
}

/// Result of a successful transaction execution.
#[derive(Debug)]
pub struct Executed {
  pub traces: Vec<ActionTrace>,
  pub diff: StateDiff,
}

/// Chain context a transaction executes in.
pub struct Environment<'a> {
  /// Table state the transaction reads, usually pending writes
  /// layered over committed state.
  pub state: &'a dyn State,
  pub authorities: &'a AuthorityStore,
  pub codes: &'a BTreeMap<Name, Code>,
  pub engine: &'a dyn Engine,

  /// Public keys of the tester keyring, they satisfy
  /// authorities of declared authorizations.
  pub keys: &'a BTreeSet<PublicKey>,
  pub block_num: u64,
  pub block_time: OffsetDateTime,
  pub max_inline_depth: usize,
  pub contracts_console: bool,
}

/// Executes a transaction.
///
/// Declared authorizations of every action are checked against the
/// linked minimum permissions and the tester keyring, then the actions
/// run in order together with their notifications and inline actions.
///
/// On success the returned diff holds all table writes of the
/// transaction, on failure nothing the transaction did is observable.
pub fn execute(env: &Environment<'_>, tx: &Transaction) -> Result<Executed, Error> {
  if tx.actions.is_empty() {
    return Err(Error::EmptyTransaction);
  }

  let no_permissions = BTreeSet::new();
  for action in &tx.actions {
    if !env.authorities.is_account(action.account) {
      return Err(Error::UnknownAccount(action.account));
    }
    if action.authorization.is_empty() {
      return Err(Error::Authorization(AuthorityError::NoAuthorization {
        code: action.account,
        action: action.name,
      }));
    }
    for declared in &action.authorization {
      env.authorities.check_declared(
        *declared,
        action.account,
        action.name,
        Provided {
          keys: env.keys,
          permissions: &no_permissions,
        },
      )?;
    }
  }

  let mut run = Run {
    env,
    diff: StateDiff::default(),
    traces: vec![],
  };

  for action in &tx.actions {
    run.action(action, 0, 0)?;
  }

  info!(
    "executed transaction with {} actions, {} traces",
    tx.actions.len(),
    run.traces.len()
  );

  Ok(Executed {
    traces: run.traces,
    diff: run.diff,
  })
}

/// State of one transaction execution.
struct Run<'e, 'a> {
  env: &'e Environment<'a>,
  diff: StateDiff,
  traces: Vec<ActionTrace>,
}

impl Run<'_, '_> {
  /// Runs an action on its receiver, then on every notified account,
  /// then all inline actions they sent, depth first.
  fn action(&mut self, action: &Action, depth: usize, creator: u32) -> Result<(), Error> {
    let env = self.env;
    if depth > env.max_inline_depth {
      return Err(Error::InlineDepth(env.max_inline_depth));
    }

    let code = env
      .codes
      .get(&action.account)
      .ok_or(Error::NoCode(action.account))?;

    let mut notified = vec![action.account];
    let mut queue = vec![];
    let mut inline = vec![];

    let (ordinal, effects) = self.apply(code, action, action.account, creator)?;
    queue.extend(effects.recipients);
    inline.extend(effects.inline_actions.into_iter().map(|a| (action.account, ordinal, a)));

    let mut next = 0;
    while next < queue.len() {
      let recipient = queue[next];
      next += 1;

      if notified.contains(&recipient) {
        continue;
      }
      notified.push(recipient);

      let Some(code) = env.codes.get(&recipient) else {
        debug!("skipping notification of {recipient}, no contract deployed");
        continue;
      };

      let (ordinal, effects) = self.apply(code, action, recipient, creator)?;
      queue.extend(effects.recipients);
      inline.extend(effects.inline_actions.into_iter().map(|a| (recipient, ordinal, a)));
    }

    for (sender, ordinal, inline_action) in inline {
      self.authorize_inline(action, sender, &inline_action)?;
      self.action(&inline_action, depth + 1, ordinal)?;
    }

    Ok(())
  }

  /// An inline authorization is valid when the parent action carried
  /// it or when the sender's `eosio.code` permission satisfies it.
  fn authorize_inline(
    &self,
    parent: &Action,
    sender: Name,
    inline: &Action,
  ) -> Result<(), Error> {
    let no_keys = BTreeSet::new();
    let granted: BTreeSet<_> = parent
      .authorization
      .iter()
      .copied()
      .chain(std::iter::once(PermissionLevel::new(sender, permissions::CODE)))
      .collect();

    for declared in &inline.authorization {
      self.env.authorities.check_declared(
        *declared,
        inline.account,
        inline.name,
        Provided {
          keys: &no_keys,
          permissions: &granted,
        },
      )?;
    }
    Ok(())
  }

  fn apply(
    &mut self,
    code: &Code,
    action: &Action,
    receiver: Name,
    creator: u32,
  ) -> Result<(u32, Effects), Error> {
    let env = self.env;
    let started = Instant::now();

    let mut ctx = ApplyContext::new(
      receiver,
      action,
      (env.block_num, env.block_time),
      env.state,
      &mut self.diff,
      env.authorities,
    );

    if let Err(source) = env.engine.apply(code, &mut ctx) {
      let console = ctx.into_effects().console;
      if env.contracts_console && !console.is_empty() {
        info!(target: "contracts_console", "[{receiver}] {console}");
      }
      return Err(Error::Apply {
        receiver,
        action: action.name,
        console,
        source,
      });
    }

    let mut effects = ctx.into_effects();
    let console = match env.contracts_console {
      true => {
        if !effects.console.is_empty() {
          info!(target: "contracts_console", "[{receiver}] {}", effects.console);
        }
        std::mem::take(&mut effects.console)
      }
      false => String::new(),
    };

    let ordinal = self.traces.len() as u32 + 1;
    self.traces.push(ActionTrace {
      action_ordinal: ordinal,
      creator_action_ordinal: creator,
      receiver,
      action: action.clone(),
      console,
      elapsed: started.elapsed(),
    });

    debug!("{receiver} applied {}::{}", action.account, action.name);
    Ok((ordinal, effects))
  }
}

#[cfg(test)]
mod tests {
  use {
    super::{execute, Environment, Error},
    crate::{
      authority::{AuthorityStore, Error as AuthorityError},
      code::Code,
      context::{ApplyContext, Error as ApplyError},
      engine::NativeEngine,
      state::{InMemoryStateStore, State},
    },
    chaintester_primitives::{
      permissions,
      Action,
      Authority,
      Name,
      PermissionLevel,
      PublicKey,
      Row,
      TableId,
      Transaction,
    },
    std::collections::{BTreeMap, BTreeSet},
    time::OffsetDateTime,
  };

  const TOKEN: &[u8] = b"\0asm\x01\0\0\0\0\x06\x05token";
  const WATCHER: &[u8] = b"\0asm\x01\0\0\0\0\x08\x07watcher";

  fn name(s: &str) -> Name {
    s.parse().unwrap()
  }

  /// `transfer(to)`: notifies `to`, stores a row and, when sent to
  /// `alice`, forwards an inline `log` to itself.
  fn token(ctx: &mut ApplyContext<'_>) -> Result<(), ApplyError> {
    if ctx.receiver() != ctx.first_receiver() {
      return Ok(());
    }
    match ctx.action_name().to_string().as_str() {
      "transfer" => {
        let to = ctx.reader().read_name()?;
        ctx.require_recipient(to)?;
        ctx.print(format!("transfer to {to}"));
        let n = ctx.rows(ctx.receiver(), ctx.receiver(), name("log")).len() as u64;
        ctx.emplace(ctx.receiver(), name("log"), n, Row::new(Name::default(), vec![1]))?;
        if to == name("alice") {
          let receiver = ctx.receiver();
          ctx.send_inline(Action::new(
            receiver,
            name("log"),
            vec![PermissionLevel::active(receiver)],
            vec![],
          ))?;
        }
        Ok(())
      }
      "log" => {
        let n = ctx.rows(ctx.receiver(), ctx.receiver(), name("log")).len() as u64;
        ctx.emplace(ctx.receiver(), name("log"), n, Row::new(Name::default(), vec![2]))
      }
      "fail" => {
        ctx.emplace(ctx.receiver(), name("log"), 99, Row::new(Name::default(), vec![]))?;
        ctx.print("about to fail");
        ctx.check(false, "always fails")
      }
      "recurse" => {
        let receiver = ctx.receiver();
        ctx.send_inline(Action::new(
          receiver,
          name("recurse"),
          vec![PermissionLevel::active(receiver)],
          vec![],
        ))
      }
      "steal" => ctx.send_inline(Action::new(
        ctx.receiver(),
        name("log"),
        vec![PermissionLevel::active(name("bob"))],
        vec![],
      )),
      _ => Ok(()),
    }
  }

  fn watcher(ctx: &mut ApplyContext<'_>) -> Result<(), ApplyError> {
    ctx.print(format!("seen {}", ctx.action_name()));
    Ok(())
  }

  struct Fixture {
    authorities: AuthorityStore,
    codes: BTreeMap<Name, Code>,
    engine: NativeEngine,
    keys: BTreeSet<PublicKey>,
    store: InMemoryStateStore,
  }

  impl Fixture {
    fn new() -> anyhow::Result<Self> {
      let key = PublicKey::from_secret(&[7; 32])?;
      let mut authorities = AuthorityStore::default();
      for n in ["alice", "bob", "token"] {
        authorities.create_account(name(n), Authority::from_key(key), Authority::from_key(key))?;
      }

      // token@active is also satisfied by token@eosio.code
      authorities.update(
        PermissionLevel::active(name("token")),
        permissions::OWNER,
        Authority::from_key(key)
          .with_account(PermissionLevel::new(name("token"), permissions::CODE), 1),
      )?;

      let mut codes = BTreeMap::new();
      codes.insert(name("token"), Code::new(TOKEN.to_vec(), b"")?);
      codes.insert(name("alice"), Code::new(WATCHER.to_vec(), b"")?);

      Ok(Self {
        authorities,
        codes,
        engine: NativeEngine::new()
          .with_contract(TOKEN, token)
          .with_contract(WATCHER, watcher),
        keys: [key].into(),
        store: InMemoryStateStore::default(),
      })
    }

    fn env(&self, contracts_console: bool) -> Environment<'_> {
      Environment {
        state: &self.store,
        authorities: &self.authorities,
        codes: &self.codes,
        engine: &self.engine,
        keys: &self.keys,
        block_num: 1,
        block_time: OffsetDateTime::UNIX_EPOCH,
        max_inline_depth: 4,
        contracts_console,
      }
    }
  }

  fn push(to: &str, action: &str, actor: &str) -> Transaction {
    Transaction::new(1, vec![Action::new(
      name("token"),
      name(action),
      vec![PermissionLevel::active(name(actor))],
      name(to).as_u64().to_le_bytes().to_vec(),
    )])
  }

  #[test]
  fn notifications_then_inline_actions() -> anyhow::Result<()> {
    let fixture = Fixture::new()?;
    let out = execute(&fixture.env(true), &push("alice", "transfer", "bob"))?;

    let order: Vec<_> = out
      .traces
      .iter()
      .map(|t| (t.receiver.to_string(), t.action.name.to_string()))
      .collect();
    assert_eq!(order, vec![
      ("token".to_string(), "transfer".to_string()),
      ("alice".to_string(), "transfer".to_string()),
      ("token".to_string(), "log".to_string()),
    ]);
    assert_eq!(out.traces[0].console, "transfer to alice");
    assert_eq!(out.traces[1].console, "seen transfer");
    assert_eq!(out.traces[2].creator_action_ordinal, 1);

    let table = TableId::new(name("token"), name("token"), name("log"));
    assert_eq!(out.diff.iter().count(), 2);
    assert_eq!(out.diff.lookup(&table.key(1)).flatten().map(|r| r.value.clone()), Some(vec![2]));
    Ok(())
  }

  #[test]
  fn notifying_account_without_code_is_skipped() -> anyhow::Result<()> {
    let fixture = Fixture::new()?;
    let out = execute(&fixture.env(false), &push("bob", "transfer", "bob"))?;
    assert_eq!(out.traces.len(), 1);
    assert!(out.traces[0].console.is_empty());
    Ok(())
  }

  #[test]
  fn failures_leave_no_trace() -> anyhow::Result<()> {
    let fixture = Fixture::new()?;
    let err = execute(&fixture.env(true), &push("bob", "fail", "bob")).unwrap_err();
    match err {
      Error::Apply { source, console, .. } => {
        assert_eq!(source, ApplyError::Assert("always fails".into()));
        assert_eq!(console, "about to fail");
      }
      other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(fixture.store.iter().count(), 0);
    Ok(())
  }

  #[test]
  fn inline_depth_is_bounded() -> anyhow::Result<()> {
    let fixture = Fixture::new()?;
    assert_eq!(
      execute(&fixture.env(false), &push("bob", "recurse", "bob")).unwrap_err(),
      Error::InlineDepth(4)
    );
    Ok(())
  }

  #[test]
  fn inline_authorization() -> anyhow::Result<()> {
    let fixture = Fixture::new()?;

    // bob@active was declared by the parent
    execute(&fixture.env(false), &push("bob", "steal", "bob"))?;

    // neither declared by the parent nor satisfied by token@eosio.code
    assert!(matches!(
      execute(&fixture.env(false), &push("bob", "steal", "alice")),
      Err(Error::Authorization(AuthorityError::Unsatisfied(_)))
    ));
    Ok(())
  }

  #[test]
  fn declared_authorization_is_checked() -> anyhow::Result<()> {
    let mut fixture = Fixture::new()?;
    fixture.keys.clear();
    assert!(matches!(
      execute(&fixture.env(false), &push("bob", "transfer", "bob")),
      Err(Error::Authorization(AuthorityError::Unsatisfied(_)))
    ));
    assert!(matches!(
      execute(&fixture.env(false), &Transaction::new(1, vec![])),
      Err(Error::EmptyTransaction)
    ));
    Ok(())
  }

  #[test]
  fn actions_without_authorization_are_rejected() -> anyhow::Result<()> {
    let fixture = Fixture::new()?;
    let unsigned = Transaction::new(1, vec![Action::new(
      name("token"),
      name("log"),
      vec![],
      vec![],
    )]);
    assert_eq!(
      execute(&fixture.env(false), &unsigned).unwrap_err(),
      Error::Authorization(AuthorityError::NoAuthorization {
        code: name("token"),
        action: name("log"),
      })
    );
    Ok(())
  }
}
