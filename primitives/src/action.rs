use {
  crate::{Name, PermissionLevel},
  serde::{Deserialize, Serialize},
};

/// A call of a contract action.
///
/// The payload is opaque to the chain, it is usually the binary
/// encoding of the action's ABI struct.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
  /// Account whose code handles the action.
  pub account: Name,
  pub name: Name,
  pub authorization: Vec<PermissionLevel>,
  pub data: Vec<u8>,
}

impl Action {
  pub fn new(
    account: Name,
    name: Name,
    authorization: Vec<PermissionLevel>,
    data: Vec<u8>,
  ) -> Self {
    Self {
      account,
      name,
      authorization,
      data,
    }
  }
}

impl core::fmt::Debug for Action {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    f.debug_struct("Action")
      .field("account", &self.account)
      .field("name", &self.name)
      .field("authorization", &self.authorization)
      .field("data", &hex::encode(&self.data))
      .finish()
  }
}
