use {
  crate::{
    code::{code_hash, Code},
    context::{ApplyContext, Error as ApplyError},
  },
  chaintester_primitives::ToBase58String,
  multihash::Multihash,
  std::{collections::HashMap, sync::Arc},
};

/// Runs contract code.
///
/// The harness treats bytecode as opaque and hands it to the engine
/// together with the context of the action being handled. Engines are
/// shared between testers, possibly across threads.
pub trait Engine: Send + Sync {
  fn apply(&self, code: &Code, ctx: &mut ApplyContext<'_>) -> Result<(), ApplyError>;
}

/// Contract logic written in Rust, invoked by the [`NativeEngine`].
pub trait Contract: Send + Sync {
  fn apply(&self, ctx: &mut ApplyContext<'_>) -> Result<(), ApplyError>;
}

impl<F> Contract for F
where
  F: Fn(&mut ApplyContext<'_>) -> Result<(), ApplyError> + Send + Sync,
{
  fn apply(&self, ctx: &mut ApplyContext<'_>) -> Result<(), ApplyError> {
    self(ctx)
  }
}

/// Engine that dispatches on the code hash of the deployed bytecode
/// to native contract implementations.
///
/// Deploying a module registered here runs the matching native contract,
/// so tests exercise the complete deploy/push/query path without
/// compiling contracts to WebAssembly.
#[derive(Default, Clone)]
pub struct NativeEngine {
  contracts: HashMap<Multihash, Arc<dyn Contract>>,
}

impl NativeEngine {
  pub fn new() -> Self {
    Self::default()
  }

  /// Registers the contract that runs for the given bytecode and
  /// returns its code hash.
  pub fn register(
    &mut self,
    bytecode: &[u8],
    contract: impl Contract + 'static,
  ) -> Multihash {
    let hash = code_hash(bytecode);
    self.contracts.insert(hash, Arc::new(contract));
    hash
  }

  pub fn with_contract(
    mut self,
    bytecode: &[u8],
    contract: impl Contract + 'static,
  ) -> Self {
    self.register(bytecode, contract);
    self
  }
}

impl Engine for NativeEngine {
  fn apply(&self, code: &Code, ctx: &mut ApplyContext<'_>) -> Result<(), ApplyError> {
    match self.contracts.get(code.hash()) {
      Some(contract) => contract.apply(ctx),
      None => Err(ApplyError::Engine(format!(
        "no native contract registered for code {}",
        code.hash().to_b58()
      ))),
    }
  }
}

impl std::fmt::Debug for NativeEngine {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("NativeEngine")
      .field("contracts", &self.contracts.len())
      .finish()
  }
}
