//! Native handlers of the `eosio` system actions that manage
//! accounts and permissions.

use {
  crate::Error,
  chaintester_primitives::{
    Action,
    Authority,
    Name,
    PermissionLevel,
    PublicKey,
    SYSTEM_ACCOUNT,
  },
  chaintester_vm::{AuthorityError, AuthorityStore, Provided},
  serde::Deserialize,
  std::collections::BTreeSet,
  tracing::info,
};

#[derive(Debug, Deserialize)]
struct NewAccount {
  creator: Name,
  name: Name,
  owner: Authority,
  active: Authority,
}

#[derive(Debug, Deserialize)]
struct UpdateAuth {
  account: Name,
  permission: Name,
  parent: Name,
  auth: Authority,
}

#[derive(Debug, Deserialize)]
struct DeleteAuth {
  account: Name,
  permission: Name,
}

#[derive(Debug, Deserialize)]
struct LinkAuth {
  account: Name,
  code: Name,
  #[serde(rename = "type")]
  action: Name,
  requirement: Name,
}

#[derive(Debug, Deserialize)]
struct UnlinkAuth {
  account: Name,
  code: Name,
  #[serde(rename = "type")]
  action: Name,
}

const NEWACCOUNT: &str = "newaccount";
const UPDATEAUTH: &str = "updateauth";
const DELETEAUTH: &str = "deleteauth";
const LINKAUTH: &str = "linkauth";
const UNLINKAUTH: &str = "unlinkauth";

/// True for actions handled natively by the system account.
pub fn is_system_action(contract: Name, action: Name) -> bool {
  contract == SYSTEM_ACCOUNT
    && [NEWACCOUNT, UPDATEAUTH, DELETEAUTH, LINKAUTH, UNLINKAUTH]
      .iter()
      .any(|a| Name::new(a).map(|n| n == action).unwrap_or(false))
}

/// Applies a system action. Its payload is the JSON encoding of
/// the action arguments.
pub fn apply(
  authorities: &mut AuthorityStore,
  keys: &BTreeSet<PublicKey>,
  action: &Action,
) -> Result<(), Error> {
  let name = action.name.to_string();
  match name.as_str() {
    NEWACCOUNT => {
      let args: NewAccount = parse(&action.data)?;
      let required = authorities.min_permission(args.creator, SYSTEM_ACCOUNT, action.name);
      authorize(authorities, keys, action, PermissionLevel::new(args.creator, required))?;
      authorities.create_account(args.name, args.owner, args.active)?;
      info!("{} created account {}", args.creator, args.name);
    }
    UPDATEAUTH => {
      let args: UpdateAuth = parse(&action.data)?;
      let target = PermissionLevel::new(args.account, args.permission);
      let required = match authorities.get(&target) {
        Some(_) => args.permission,
        None => args.parent,
      };
      authorize(authorities, keys, action, PermissionLevel::new(args.account, required))?;
      authorities.update(target, args.parent, args.auth)?;
      info!("updated authority {target}");
    }
    DELETEAUTH => {
      let args: DeleteAuth = parse(&action.data)?;
      let target = PermissionLevel::new(args.account, args.permission);
      authorize(authorities, keys, action, target)?;
      authorities.delete(target)?;
      info!("deleted authority {target}");
    }
    LINKAUTH => {
      let args: LinkAuth = parse(&action.data)?;
      let required = authorities.min_permission(args.account, SYSTEM_ACCOUNT, action.name);
      authorize(authorities, keys, action, PermissionLevel::new(args.account, required))?;
      authorities.link(args.account, args.code, args.action, args.requirement)?;
      info!(
        "linked {}::{} to {}@{}",
        args.code, args.action, args.account, args.requirement
      );
    }
    UNLINKAUTH => {
      let args: UnlinkAuth = parse(&action.data)?;
      let required = authorities.min_permission(args.account, SYSTEM_ACCOUNT, action.name);
      authorize(authorities, keys, action, PermissionLevel::new(args.account, required))?;
      authorities.unlink(args.account, args.code, args.action)?;
      info!("unlinked {}::{} for {}", args.code, args.action, args.account);
    }
    _ => {
      return Err(Error::ExecutionFailure(
        chaintester_vm::ExecutionError::NoCode(SYSTEM_ACCOUNT),
      ))
    }
  }
  Ok(())
}

fn parse<'de, T: Deserialize<'de>>(data: &'de [u8]) -> Result<T, Error> {
  serde_json::from_slice(data).map_err(|e| Error::Abi(e.into()))
}

/// Every declared authorization must be satisfied by the keyring and
/// one of them must be `required` or one of its ancestors.
fn authorize(
  authorities: &AuthorityStore,
  keys: &BTreeSet<PublicKey>,
  action: &Action,
  required: PermissionLevel,
) -> Result<(), Error> {
  if !authorities.is_account(required.actor) {
    return Err(Error::UnknownAccount(required.actor));
  }
  if action.authorization.is_empty() {
    return Err(AuthorityError::NoAuthorization {
      code: action.account,
      action: action.name,
    }
    .into());
  }

  let no_permissions = BTreeSet::new();
  let provided = Provided {
    keys,
    permissions: &no_permissions,
  };

  for declared in &action.authorization {
    authorities
      .check(*declared, provided)
      .map_err(|e| Error::AuthorizationFailure(e.to_string()))?;
  }

  let covered = action.authorization.iter().any(|declared| {
    declared.actor == required.actor
      && authorities.is_ancestor(required.actor, declared.permission, required.permission)
  });

  match covered {
    true => Ok(()),
    false => Err(Error::AuthorizationFailure(format!(
      "missing authority of {required}"
    ))),
  }
}
