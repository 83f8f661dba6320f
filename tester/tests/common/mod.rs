#![allow(dead_code)]

use {
  chaintester::{
    permissions,
    Action,
    ApplyContext,
    ApplyError,
    ChainConfig,
    ChainTester,
    Name,
    NativeEngine,
    PermissionLevel,
    Reader,
    Row,
    Writer,
  },
  std::sync::Arc,
  tracing_subscriber::EnvFilter,
};

pub const HELLO_ABI: &str = r#"{
  "version": "eosio::abi/1.1",
  "types": [],
  "structs": [
    {
      "name": "record",
      "base": "",
      "fields": [
        { "name": "account", "type": "name" },
        { "name": "count", "type": "uint64" }
      ]
    },
    {
      "name": "entry",
      "base": "",
      "fields": [
        { "name": "id", "type": "uint64" },
        { "name": "value", "type": "string" },
        { "name": "rank", "type": "uint64" }
      ]
    },
    { "name": "inc", "base": "", "fields": [{ "name": "user", "type": "name" }] },
    { "name": "remove", "base": "", "fields": [{ "name": "id", "type": "uint64" }] },
    { "name": "fail", "base": "", "fields": [] },
    { "name": "notify", "base": "", "fields": [{ "name": "to", "type": "name" }] },
    { "name": "forward", "base": "", "fields": [{ "name": "to", "type": "name" }] }
  ],
  "actions": [
    { "name": "inc", "type": "inc", "ricardian_contract": "" },
    { "name": "insert", "type": "entry", "ricardian_contract": "" },
    { "name": "remove", "type": "remove", "ricardian_contract": "" },
    { "name": "fail", "type": "fail", "ricardian_contract": "" },
    { "name": "notify", "type": "notify", "ricardian_contract": "" },
    { "name": "forward", "type": "forward", "ricardian_contract": "" }
  ],
  "tables": [
    {
      "name": "counter",
      "index_type": "i64",
      "key_names": [],
      "key_types": [],
      "type": "record"
    },
    {
      "name": "mytable",
      "index_type": "i64",
      "key_names": [],
      "key_types": [],
      "type": "entry"
    }
  ]
}"#;

pub const WATCHER_ABI: &str = r#"{
  "version": "eosio::abi/1.1",
  "structs": [
    {
      "name": "sighting",
      "base": "",
      "fields": [
        { "name": "code", "type": "name" },
        { "name": "action", "type": "name" }
      ]
    },
    { "name": "hi", "base": "", "fields": [] }
  ],
  "actions": [{ "name": "hi", "type": "hi", "ricardian_contract": "" }],
  "tables": [{ "name": "seen", "index_type": "i64", "type": "sighting" }]
}"#;

pub fn n(s: &str) -> Name {
  s.parse().expect("valid name in test")
}

pub fn auth(s: &str) -> PermissionLevel {
  s.parse().expect("valid permission level in test")
}

/// Smallest valid WebAssembly module carrying `tag` in a custom
/// section, so that every tag has a distinct code hash.
pub fn wasm_module(tag: &str) -> Vec<u8> {
  let mut section = Writer::new();
  section.write_str(tag);

  let mut module = Writer::new();
  module
    .write_raw(b"\0asm")
    .write_u32(1)
    .write_u8(0)
    .write_bytes(&section.into_bytes());
  module.into_bytes()
}

pub fn hello_wasm() -> Vec<u8> {
  wasm_module("hello")
}

pub fn watcher_wasm() -> Vec<u8> {
  wasm_module("watcher")
}

pub fn init_tracing() {
  let _ = tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .with_test_writer()
    .try_init();
}

pub fn engine() -> NativeEngine {
  NativeEngine::new()
    .with_contract(&hello_wasm(), hello_contract)
    .with_contract(&watcher_wasm(), watcher_contract)
}

/// Default genesis, both test contracts registered with the engine and
/// the hello contract deployed to `hello`.
pub fn setup() -> anyhow::Result<ChainTester> {
  init_tracing();
  let config = ChainConfig {
    contracts_console: true,
    ..Default::default()
  };
  let mut chain = ChainTester::with_config(config, Arc::new(engine()))?;
  chain.deploy_contract(n("hello"), hello_wasm(), HELLO_ABI)?;
  Ok(chain)
}

/// Counters per user, a keyed table with a secondary index, and
/// notification and inline action plumbing.
pub fn hello_contract(ctx: &mut ApplyContext<'_>) -> Result<(), ApplyError> {
  let receiver = ctx.receiver();
  if receiver != ctx.first_receiver() {
    return Ok(());
  }

  match ctx.action_name().to_string().as_str() {
    "inc" => {
      let user = ctx.reader().read_name()?;
      ctx.require_auth(user)?;

      let table = n("counter");
      let previous = match ctx.find(receiver, receiver, table, user.as_u64()) {
        Some(row) => {
          let mut r = Reader::new(&row.value);
          r.read_name()?;
          Some(r.read_u64()?)
        }
        None => None,
      };

      let count = previous.unwrap_or(0) + 1;
      let mut w = Writer::new();
      w.write_name(user).write_u64(count);
      let row = Row::new(user, w.into_bytes());
      match previous {
        Some(_) => ctx.modify(receiver, table, user.as_u64(), row)?,
        None => ctx.emplace(receiver, table, user.as_u64(), row)?,
      }
      ctx.print(format!("count of {user} is {count}"));
      Ok(())
    }
    "insert" => {
      let mut r = ctx.reader();
      let id = r.read_u64()?;
      r.read_string()?;
      let rank = r.read_u64()?;
      r.finish()?;

      let row = Row::new(Name::default(), ctx.data().to_vec()).with_secondary(vec![rank]);
      ctx.emplace(receiver, n("mytable"), id, row)
    }
    "remove" => {
      let id = ctx.reader().read_u64()?;
      ctx.erase(receiver, n("mytable"), id)
    }
    "fail" => {
      ctx.emplace(receiver, n("mytable"), 999, Row::new(Name::default(), vec![]))?;
      ctx.print("about to fail");
      ctx.check(false, "fail action always fails")
    }
    "notify" => {
      let to = ctx.reader().read_name()?;
      ctx.require_recipient(to)
    }
    "forward" => {
      let to = ctx.reader().read_name()?;
      ctx.send_inline(Action::new(
        to,
        n("hi"),
        vec![PermissionLevel::new(receiver, permissions::ACTIVE)],
        vec![],
      ))
    }
    _ => ctx.check(false, "unknown action"),
  }
}

/// Records every action it receives, directly or as a notification.
pub fn watcher_contract(ctx: &mut ApplyContext<'_>) -> Result<(), ApplyError> {
  let receiver = ctx.receiver();
  let seen = ctx.rows(receiver, receiver, n("seen")).len() as u64;

  let mut w = Writer::new();
  w.write_name(ctx.first_receiver()).write_name(ctx.action_name());
  ctx.emplace(receiver, n("seen"), seen, Row::new(Name::default(), w.into_bytes()))?;

  let message = format!("{receiver} saw {}::{}", ctx.first_receiver(), ctx.action_name());
  ctx.print(message);
  Ok(())
}
