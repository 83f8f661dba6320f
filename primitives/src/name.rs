use {
  serde::{Deserialize, Deserializer, Serialize, Serializer},
  std::{
    fmt::{Debug, Display},
    str::FromStr,
  },
  thiserror::Error,
};

const CHARMAP: &[u8; 32] = b".12345abcdefghijklmnopqrstuvwxyz";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Error {
  #[error("name '{0}' is longer than 13 characters")]
  TooLong(String),

  #[error("name '{0}' contains invalid character '{1}'")]
  InvalidCharacter(String, char),

  #[error(
    "the 13th character of name '{0}' must be one of '.', '1'-'5' or 'a'-'j'"
  )]
  InvalidThirteenthCharacter(String),
}

/// Identifies accounts, actions, tables, scopes and permissions.
///
/// A name is a 64 bit integer rendered as up to 13 characters from the
/// alphabet `.12345abcdefghijklmnopqrstuvwxyz`. The first 12 characters
/// take 5 bits each, the 13th character only gets the remaining 4 bits,
/// so it is limited to `.12345abcdefghij`. The empty string is name zero.
#[derive(
  Copy, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
pub struct Name(u64);

impl Name {
  pub const fn from_u64(value: u64) -> Self {
    Self(value)
  }

  pub const fn as_u64(&self) -> u64 {
    self.0
  }

  pub const fn is_empty(&self) -> bool {
    self.0 == 0
  }

  pub fn new(s: &str) -> Result<Self, Error> {
    if s.len() > 13 {
      return Err(Error::TooLong(s.into()));
    }

    let mut value = 0u64;
    for (i, c) in s.chars().enumerate() {
      let symbol = char_to_symbol(c)
        .ok_or_else(|| Error::InvalidCharacter(s.into(), c))?;
      if i < 12 {
        value |= (symbol & 0x1f) << (64 - 5 * (i + 1));
      } else {
        if symbol > 0x0f {
          return Err(Error::InvalidThirteenthCharacter(s.into()));
        }
        value |= symbol;
      }
    }
    Ok(Self(value))
  }
}

fn char_to_symbol(c: char) -> Option<u64> {
  match c {
    'a'..='z' => Some(c as u64 - 'a' as u64 + 6),
    '1'..='5' => Some(c as u64 - '1' as u64 + 1),
    '.' => Some(0),
    _ => None,
  }
}

impl From<u64> for Name {
  fn from(value: u64) -> Self {
    Self(value)
  }
}

impl From<Name> for u64 {
  fn from(name: Name) -> Self {
    name.0
  }
}

impl FromStr for Name {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Name::new(s)
  }
}

impl TryFrom<&str> for Name {
  type Error = Error;

  fn try_from(value: &str) -> Result<Self, Self::Error> {
    Name::new(value)
  }
}

impl Display for Name {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let mut chars = [b'.'; 13];
    let mut tmp = self.0;
    for i in 0..13 {
      let mask = if i == 0 { 0x0f } else { 0x1f };
      chars[12 - i] = CHARMAP[(tmp & mask) as usize];
      tmp >>= if i == 0 { 4 } else { 5 };
    }

    let len = chars
      .iter()
      .rposition(|c| *c != b'.')
      .map(|pos| pos + 1)
      .unwrap_or(0);

    // every byte comes from CHARMAP, which is ascii
    f.write_str(std::str::from_utf8(&chars[..len]).map_err(|_| std::fmt::Error)?)
  }
}

impl Debug for Name {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "name({self})")
  }
}

impl Serialize for Name {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&self.to_string())
  }
}

impl<'de> Deserialize<'de> for Name {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let s = String::deserialize(deserializer)?;
    Name::new(&s).map_err(serde::de::Error::custom)
  }
}
