mod abi;
mod authority;
mod code;
mod context;
mod engine;
mod execution;
mod state;

pub use {
  abi::{
    Abi,
    AbiDef,
    ActionDef,
    Error as AbiError,
    FieldDef,
    StructDef,
    TableDef,
    TypeDef,
  },
  authority::{
    AuthorityStore,
    Error as AuthorityError,
    Provided,
    DEFAULT_MAX_AUTHORITY_DEPTH,
  },
  code::{code_hash, validate_bytecode, Code, Error as CodeError},
  context::{ApplyContext, Effects, Error as ApplyError},
  engine::{Contract, Engine, NativeEngine},
  execution::{
    execute,
    ActionTrace,
    Environment,
    Error as ExecutionError,
    Executed,
    DEFAULT_MAX_INLINE_ACTION_DEPTH,
  },
  state::{InMemoryStateStore, Overlay, State, StateDiff},
};
