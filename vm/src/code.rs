use {
  crate::abi::{Abi, Error as AbiError},
  multihash::{Multihash, MultihashDigest},
  thiserror::Error,
  tracing::debug,
  wasmer::{Cranelift, Module, Store},
};

#[derive(Debug, Error)]
pub enum Error {
  #[error("contract bytecode is empty")]
  Empty,

  #[error("malformed WebAssembly module: {0}")]
  Malformed(String),

  #[error("invalid contract ABI: {0}")]
  Abi(#[from] AbiError),
}

/// Code hash of a contract, SHA3-256 multihash of its bytecode.
pub fn code_hash(bytecode: &[u8]) -> Multihash {
  multihash::Code::Sha3_256.digest(bytecode)
}

/// Runs the WebAssembly validator over the bytecode without
/// instantiating it.
pub fn validate_bytecode(bytecode: &[u8]) -> Result<(), Error> {
  if bytecode.is_empty() {
    return Err(Error::Empty);
  }

  let store = Store::new(Cranelift::default());
  Module::validate(&store, bytecode)
    .map_err(|e| Error::Malformed(e.to_string()))
}

/// Contract deployed to an account.
#[derive(Debug, Clone)]
pub struct Code {
  bytecode: Vec<u8>,
  hash: Multihash,
  abi: Option<Abi>,
}

impl Code {
  /// Validates bytecode and ABI. An empty ABI document means the
  /// contract has no ABI and action payloads are passed as raw bytes.
  pub fn new(bytecode: Vec<u8>, abi: &[u8]) -> Result<Self, Error> {
    validate_bytecode(&bytecode)?;
    let abi = match abi.iter().all(u8::is_ascii_whitespace) {
      true => None,
      false => Some(Abi::from_json(abi)?),
    };

    let hash = code_hash(&bytecode);
    debug!(
      "validated {} bytes of bytecode, abi: {}",
      bytecode.len(),
      abi.is_some()
    );

    Ok(Self {
      bytecode,
      hash,
      abi,
    })
  }

  pub fn bytecode(&self) -> &[u8] {
    &self.bytecode
  }

  pub fn hash(&self) -> &Multihash {
    &self.hash
  }

  pub fn abi(&self) -> Option<&Abi> {
    self.abi.as_ref()
  }
}
