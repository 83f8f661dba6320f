use {
  chaintester_primitives::{KeyError, Name, NameError},
  chaintester_vm::{
    AbiError,
    ApplyError,
    AuthorityError,
    CodeError,
    ExecutionError,
  },
  thiserror::Error,
};

#[derive(Debug, Error)]
pub enum Error {
  #[error("account '{0}' does not exist")]
  UnknownAccount(Name),

  #[error("account '{0}' already exists")]
  AccountExists(Name),

  #[error("invalid permission: {0}")]
  InvalidPermission(AuthorityError),

  #[error("invalid contract code: {0}")]
  InvalidCode(CodeError),

  #[error("authorization failure: {0}")]
  AuthorizationFailure(String),

  #[error("execution failure: {0}")]
  ExecutionFailure(ExecutionError),

  #[error("table '{table}' is not declared in the ABI of '{contract}'")]
  UnknownTable { contract: Name, table: Name },

  #[error("invalid table query: {0}")]
  InvalidQuery(String),

  #[error("system actions cannot share a transaction with contract actions")]
  MixedTransaction,

  #[error("ABI error: {0}")]
  Abi(#[from] AbiError),

  #[error("invalid name: {0}")]
  InvalidName(#[from] NameError),

  #[error("invalid key: {0}")]
  InvalidKey(#[from] KeyError),

  #[error("chain tester was freed")]
  InvalidState,
}

impl From<AuthorityError> for Error {
  fn from(e: AuthorityError) -> Self {
    match e {
      AuthorityError::UnknownAccount(name) => Error::UnknownAccount(name),
      AuthorityError::AccountExists(name) => Error::AccountExists(name),
      AuthorityError::Unsatisfied(_)
      | AuthorityError::Irrelevant { .. }
      | AuthorityError::NoAuthorization { .. } => {
        Error::AuthorizationFailure(e.to_string())
      }
      e => Error::InvalidPermission(e),
    }
  }
}

impl From<CodeError> for Error {
  fn from(e: CodeError) -> Self {
    match e {
      CodeError::Abi(e) => Error::Abi(e),
      e => Error::InvalidCode(e),
    }
  }
}

impl From<ExecutionError> for Error {
  fn from(e: ExecutionError) -> Self {
    match e {
      ExecutionError::UnknownAccount(name)
      | ExecutionError::Authorization(AuthorityError::UnknownAccount(name)) => {
        Error::UnknownAccount(name)
      }
      // every other reason for a declared or inline authorization
      // to be rejected, including permissions that do not exist
      ExecutionError::Authorization(e) => {
        Error::AuthorizationFailure(e.to_string())
      }
      ExecutionError::Apply {
        source: ApplyError::MissingAuth(_) | ApplyError::MissingAuth2(_),
        ..
      } => Error::AuthorizationFailure(e.to_string()),
      e => Error::ExecutionFailure(e),
    }
  }
}
