use {
  crate::{DEFAULT_MAX_AUTHORITY_DEPTH, DEFAULT_MAX_INLINE_ACTION_DEPTH},
  std::time::Duration,
  time::{macros::datetime, OffsetDateTime},
};

/// Parameters of a simulated chain.
///
/// Construct with struct update syntax to change individual values:
///
/// ```ignore
/// let config = ChainConfig {
///   contracts_console: true,
///   ..Default::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct ChainConfig {
  /// Capture contract console output in action traces and
  /// log it under the `contracts_console` target.
  pub contracts_console: bool,

  /// Accounts created at genesis in addition to `eosio`, all of
  /// them controlled by the default key.
  pub genesis_accounts: Vec<String>,

  /// Timestamp of block zero.
  pub genesis_time: OffsetDateTime,

  /// Block `n` is timestamped `genesis_time + n * block_interval`.
  pub block_interval: Duration,

  /// Deepest allowed nesting of inline actions.
  pub max_inline_action_depth: usize,

  /// Deepest allowed recursion through account permissions
  /// while checking an authority.
  pub max_authority_depth: usize,

  /// The default key secret is derived from this seed, so every
  /// chain with the same seed has the same default key.
  pub default_key_seed: String,
}

impl Default for ChainConfig {
  fn default() -> Self {
    Self {
      contracts_console: false,
      genesis_accounts: ["alice", "bob", "charlie", "david", "eve", "hello"]
        .into_iter()
        .map(String::from)
        .collect(),
      genesis_time: datetime!(2020-01-01 0:00 UTC),
      block_interval: Duration::from_millis(500),
      max_inline_action_depth: DEFAULT_MAX_INLINE_ACTION_DEPTH,
      max_authority_depth: DEFAULT_MAX_AUTHORITY_DEPTH,
      default_key_seed: "chaintester default key".into(),
    }
  }
}
