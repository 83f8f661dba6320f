use {
  chaintester_primitives::{
    permissions,
    Authority,
    InvalidAuthority,
    Name,
    Permission,
    PermissionLevel,
    PublicKey,
  },
  petgraph::{algo::is_cyclic_directed, graphmap::DiGraphMap},
  std::collections::{BTreeMap, BTreeSet},
  thiserror::Error,
  tracing::debug,
};

/// Recursion limit when account permissions reference other
/// account permissions.
pub const DEFAULT_MAX_AUTHORITY_DEPTH: usize = 6;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Error {
  #[error("account '{0}' does not exist")]
  UnknownAccount(Name),

  #[error("account '{0}' already exists")]
  AccountExists(Name),

  #[error("permission {0} does not exist")]
  UnknownPermission(PermissionLevel),

  #[error("parent permission '{parent}' of {permission} does not exist")]
  MissingParent {
    permission: PermissionLevel,
    parent: Name,
  },

  #[error("the owner permission of '{0}' cannot have a parent")]
  OwnerHasParent(Name),

  #[error("permission {0} must have a parent")]
  ParentRequired(PermissionLevel),

  #[error("setting the parent of {0} would create a cycle")]
  Cycle(PermissionLevel),

  #[error("permission {0} is reserved")]
  Reserved(PermissionLevel),

  #[error("permission {0} still has child permissions")]
  HasChildren(PermissionLevel),

  #[error("permission {0} is linked to an action")]
  Linked(PermissionLevel),

  #[error("no link from '{account}' for action '{code}::{action}'")]
  UnknownLink {
    account: Name,
    code: Name,
    action: Name,
  },

  #[error("invalid authority for {0}: {1}")]
  InvalidAuthority(PermissionLevel, InvalidAuthority),

  #[error("missing authority of {0}")]
  Unsatisfied(PermissionLevel),

  #[error("{declared} does not satisfy the minimum permission {required}")]
  Irrelevant {
    declared: PermissionLevel,
    required: PermissionLevel,
  },

  #[error("{code}::{action} declares no authorization")]
  NoAuthorization { code: Name, action: Name },
}

/// What is presented to an authorization check: keys held by the
/// tester keyring and permissions already granted to the caller.
#[derive(Debug, Clone, Copy)]
pub struct Provided<'a> {
  pub keys: &'a BTreeSet<PublicKey>,
  pub permissions: &'a BTreeSet<PermissionLevel>,
}

/// Arena of all account permissions, keyed by `(account, permission)`.
///
/// Parents are stored by name and resolved through the arena, so a
/// permission tree is never an owned recursive structure.
#[derive(Debug, Clone)]
pub struct AuthorityStore {
  accounts: BTreeSet<Name>,
  permissions: BTreeMap<PermissionLevel, Permission>,

  /// `(account, code, action)` -> permission name. The empty action
  /// name links every action of the code.
  links: BTreeMap<(Name, Name, Name), Name>,
  max_depth: usize,
}

impl Default for AuthorityStore {
  fn default() -> Self {
    Self::new(DEFAULT_MAX_AUTHORITY_DEPTH)
  }
}

impl AuthorityStore {
  pub fn new(max_depth: usize) -> Self {
    Self {
      accounts: BTreeSet::new(),
      permissions: BTreeMap::new(),
      links: BTreeMap::new(),
      max_depth,
    }
  }

  pub fn is_account(&self, name: Name) -> bool {
    self.accounts.contains(&name)
  }

  pub fn accounts(&self) -> impl Iterator<Item = Name> + '_ {
    self.accounts.iter().copied()
  }

  /// Creates an account with its `owner` and `active` permissions,
  /// `active` being a child of `owner`.
  pub fn create_account(
    &mut self,
    name: Name,
    owner: Authority,
    active: Authority,
  ) -> Result<(), Error> {
    if self.is_account(name) {
      return Err(Error::AccountExists(name));
    }

    self.check_authority(PermissionLevel::owner(name), &owner)?;
    self.check_authority(PermissionLevel::active(name), &active)?;

    self.accounts.insert(name);
    self.permissions.insert(PermissionLevel::owner(name), Permission {
      parent: Name::default(),
      authority: owner,
    });
    self.permissions.insert(PermissionLevel::active(name), Permission {
      parent: permissions::OWNER,
      authority: active,
    });

    debug!("created account {name}");
    Ok(())
  }

  pub fn get(&self, level: &PermissionLevel) -> Option<&Permission> {
    self.permissions.get(level)
  }

  /// All permissions of one account, ordered by permission name.
  pub fn permissions_of(
    &self,
    account: Name,
  ) -> impl Iterator<Item = (Name, &Permission)> + '_ {
    self
      .permissions
      .range(
        PermissionLevel::new(account, Name::from_u64(u64::MIN))
          ..=PermissionLevel::new(account, Name::from_u64(u64::MAX)),
      )
      .map(|(level, perm)| (level.permission, perm))
  }

  /// Creates or replaces a permission.
  pub fn update(
    &mut self,
    level: PermissionLevel,
    parent: Name,
    authority: Authority,
  ) -> Result<(), Error> {
    if !self.is_account(level.actor) {
      return Err(Error::UnknownAccount(level.actor));
    }

    if level.permission == permissions::CODE || level.permission.is_empty() {
      return Err(Error::Reserved(level));
    }

    if level.permission == permissions::OWNER {
      if !parent.is_empty() {
        return Err(Error::OwnerHasParent(level.actor));
      }
    } else {
      if parent.is_empty() {
        return Err(Error::ParentRequired(level));
      }
      if !self
        .permissions
        .contains_key(&PermissionLevel::new(level.actor, parent))
      {
        return Err(Error::MissingParent {
          permission: level,
          parent,
        });
      }
      if parent == level.permission || self.creates_cycle(level, parent) {
        return Err(Error::Cycle(level));
      }
    }

    self.check_authority(level, &authority)?;
    self
      .permissions
      .insert(level, Permission { parent, authority });

    debug!("updated permission {level} (parent: '{parent}')");
    Ok(())
  }

  pub fn delete(&mut self, level: PermissionLevel) -> Result<(), Error> {
    if level.permission == permissions::OWNER
      || level.permission == permissions::ACTIVE
    {
      return Err(Error::Reserved(level));
    }

    if !self.permissions.contains_key(&level) {
      return Err(Error::UnknownPermission(level));
    }

    if self
      .permissions_of(level.actor)
      .any(|(_, p)| p.parent == level.permission)
    {
      return Err(Error::HasChildren(level));
    }

    if self
      .links
      .iter()
      .any(|((account, _, _), perm)| *account == level.actor && *perm == level.permission)
    {
      return Err(Error::Linked(level));
    }

    self.permissions.remove(&level);
    debug!("deleted permission {level}");
    Ok(())
  }

  /// Makes `permission` the minimum permission required by `account` to
  /// authorize `code::action`. An empty action links every action of the
  /// contract.
  pub fn link(
    &mut self,
    account: Name,
    code: Name,
    action: Name,
    permission: Name,
  ) -> Result<(), Error> {
    if !self.is_account(account) {
      return Err(Error::UnknownAccount(account));
    }
    if !self.is_account(code) {
      return Err(Error::UnknownAccount(code));
    }

    let level = PermissionLevel::new(account, permission);
    if permission == permissions::OWNER {
      return Err(Error::Reserved(level));
    }
    if !self.permissions.contains_key(&level) {
      return Err(Error::UnknownPermission(level));
    }

    self.links.insert((account, code, action), permission);
    debug!("linked {code}::{action} to {level}");
    Ok(())
  }

  pub fn unlink(
    &mut self,
    account: Name,
    code: Name,
    action: Name,
  ) -> Result<(), Error> {
    self
      .links
      .remove(&(account, code, action))
      .map(|_| ())
      .ok_or(Error::UnknownLink {
        account,
        code,
        action,
      })
  }

  /// Permission of `account` required to authorize `code::action`.
  pub fn min_permission(&self, account: Name, code: Name, action: Name) -> Name {
    self
      .links
      .get(&(account, code, action))
      .or_else(|| self.links.get(&(account, code, Name::default())))
      .copied()
      .unwrap_or(permissions::ACTIVE)
  }

  /// True if `ancestor` is `permission` itself or one of its parents.
  pub fn is_ancestor(&self, account: Name, ancestor: Name, permission: Name) -> bool {
    let mut current = permission;
    // a permission tree is acyclic, the bound guards corrupt input only
    for _ in 0..=self.permissions.len() {
      if current == ancestor {
        return true;
      }
      match self.permissions.get(&PermissionLevel::new(account, current)) {
        Some(perm) if !perm.parent.is_empty() => current = perm.parent,
        _ => return false,
      }
    }
    false
  }

  /// Verifies that a declared authorization may be used for
  /// `code::action` and that its authority is satisfied.
  pub fn check_declared(
    &self,
    declared: PermissionLevel,
    code: Name,
    action: Name,
    provided: Provided<'_>,
  ) -> Result<(), Error> {
    if !self.is_account(declared.actor) {
      return Err(Error::UnknownAccount(declared.actor));
    }
    if !self.permissions.contains_key(&declared) {
      return Err(Error::UnknownPermission(declared));
    }

    let required = self.min_permission(declared.actor, code, action);
    if !self.is_ancestor(declared.actor, declared.permission, required) {
      return Err(Error::Irrelevant {
        declared,
        required: PermissionLevel::new(declared.actor, required),
      });
    }

    self.check(declared, provided)
  }

  /// Verifies that the authority of a permission is satisfied.
  pub fn check(
    &self,
    level: PermissionLevel,
    provided: Provided<'_>,
  ) -> Result<(), Error> {
    match self.satisfied(level, provided, 0) {
      true => Ok(()),
      false => Err(Error::Unsatisfied(level)),
    }
  }

  fn satisfied(
    &self,
    level: PermissionLevel,
    provided: Provided<'_>,
    depth: usize,
  ) -> bool {
    if depth > self.max_depth {
      return false;
    }

    // a granted permission also covers its descendants
    if provided.permissions.iter().any(|granted| {
      granted.actor == level.actor
        && self.is_ancestor(level.actor, granted.permission, level.permission)
    }) {
      return true;
    }

    let Some(perm) = self.permissions.get(&level) else {
      return false;
    };

    let mut weight = 0u32;
    for key in &perm.authority.keys {
      if provided.keys.contains(&key.key) {
        weight += key.weight as u32;
      }
    }
    for account in &perm.authority.accounts {
      if weight >= perm.authority.threshold {
        break;
      }
      if self.satisfied(account.permission, provided, depth + 1) {
        weight += account.weight as u32;
      }
    }
    weight >= perm.authority.threshold
  }

  fn check_authority(
    &self,
    level: PermissionLevel,
    authority: &Authority,
  ) -> Result<(), Error> {
    authority
      .validate()
      .map_err(|e| Error::InvalidAuthority(level, e))?;

    for account in &authority.accounts {
      let actor = account.permission.actor;
      if actor != level.actor && !self.is_account(actor) {
        return Err(Error::UnknownAccount(actor));
      }
    }
    Ok(())
  }

  fn creates_cycle(&self, level: PermissionLevel, parent: Name) -> bool {
    let mut graph = DiGraphMap::<Name, ()>::new();
    for (name, perm) in self.permissions_of(level.actor) {
      if name != level.permission && !perm.parent.is_empty() {
        graph.add_edge(name, perm.parent, ());
      }
    }
    graph.add_edge(level.permission, parent, ());
    is_cyclic_directed(&graph)
  }
}
