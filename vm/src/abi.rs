use {
  chaintester_primitives::{DecodeError, Name, NameError, Reader, Writer},
  serde::{Deserialize, Serialize},
  serde_json::{Map, Value},
  std::collections::HashMap,
  thiserror::Error,
};

/// Nesting limit for typedef resolution and value encoding.
const MAX_DEPTH: usize = 32;

#[derive(Debug, Error)]
pub enum Error {
  #[error("malformed ABI document: {0}")]
  Json(#[from] serde_json::Error),

  #[error("type '{0}' is not defined in the ABI")]
  UnknownType(String),

  #[error("action '{0}' is not defined in the ABI")]
  UnknownAction(Name),

  #[error("table '{0}' is not defined in the ABI")]
  UnknownTable(Name),

  #[error("expected {expected} for type '{ty}', got {got}")]
  TypeMismatch {
    ty: String,
    expected: &'static str,
    got: Value,
  },

  #[error("missing field '{field}' of struct '{ty}'")]
  MissingField { ty: String, field: String },

  #[error("value {value} is out of range for type '{ty}'")]
  OutOfRange { ty: String, value: String },

  #[error("invalid {ty} value '{value}'")]
  InvalidValue { ty: String, value: String },

  #[error("invalid name: {0}")]
  Name(#[from] NameError),

  #[error("binary decoding failed: {0}")]
  Decode(#[from] DecodeError),

  #[error("type nesting deeper than {MAX_DEPTH} levels in '{0}'")]
  TooDeep(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDef {
  pub new_type_name: String,
  #[serde(rename = "type")]
  pub ty: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
  pub name: String,
  #[serde(rename = "type")]
  pub ty: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructDef {
  pub name: String,
  #[serde(default)]
  pub base: String,
  #[serde(default)]
  pub fields: Vec<FieldDef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionDef {
  pub name: Name,
  #[serde(rename = "type")]
  pub ty: String,
  #[serde(default)]
  pub ricardian_contract: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDef {
  pub name: Name,
  #[serde(default)]
  pub index_type: String,
  #[serde(default)]
  pub key_names: Vec<String>,
  #[serde(default)]
  pub key_types: Vec<String>,
  #[serde(rename = "type")]
  pub ty: String,
}

/// The JSON ABI document as produced by contract toolchains.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbiDef {
  #[serde(default)]
  pub version: String,
  #[serde(default)]
  pub types: Vec<TypeDef>,
  #[serde(default)]
  pub structs: Vec<StructDef>,
  #[serde(default)]
  pub actions: Vec<ActionDef>,
  #[serde(default)]
  pub tables: Vec<TableDef>,
}

/// A validated ABI, indexed for encoding action arguments and
/// decoding table rows.
#[derive(Debug, Clone)]
pub struct Abi {
  def: AbiDef,
  typedefs: HashMap<String, String>,
  structs: HashMap<String, StructDef>,
  actions: HashMap<Name, String>,
  tables: HashMap<Name, String>,
}

impl Abi {
  pub fn from_json(json: &[u8]) -> Result<Self, Error> {
    Self::new(serde_json::from_slice(json)?)
  }

  pub fn new(def: AbiDef) -> Result<Self, Error> {
    let abi = Self {
      typedefs: def
        .types
        .iter()
        .map(|t| (t.new_type_name.clone(), t.ty.clone()))
        .collect(),
      structs: def
        .structs
        .iter()
        .map(|s| (s.name.clone(), s.clone()))
        .collect(),
      actions: def.actions.iter().map(|a| (a.name, a.ty.clone())).collect(),
      tables: def.tables.iter().map(|t| (t.name, t.ty.clone())).collect(),
      def,
    };

    for s in abi.def.structs.iter() {
      if !s.base.is_empty() {
        abi.check_type(&s.base)?;
      }
      for field in &s.fields {
        abi.check_type(&field.ty)?;
      }
    }
    for ty in abi.actions.values().chain(abi.tables.values()) {
      abi.check_type(ty)?;
    }

    Ok(abi)
  }

  pub fn def(&self) -> &AbiDef {
    &self.def
  }

  pub fn action_type(&self, action: Name) -> Option<&str> {
    self.actions.get(&action).map(String::as_str)
  }

  pub fn table_type(&self, table: Name) -> Option<&str> {
    self.tables.get(&table).map(String::as_str)
  }

  pub fn encode_action(
    &self,
    action: Name,
    args: &Value,
  ) -> Result<Vec<u8>, Error> {
    let ty = self
      .action_type(action)
      .ok_or(Error::UnknownAction(action))?;
    self.encode(ty, args)
  }

  pub fn decode_action(&self, action: Name, data: &[u8]) -> Result<Value, Error> {
    let ty = self
      .action_type(action)
      .ok_or(Error::UnknownAction(action))?;
    self.decode(ty, data)
  }

  pub fn decode_row(&self, table: Name, data: &[u8]) -> Result<Value, Error> {
    let ty = self.table_type(table).ok_or(Error::UnknownTable(table))?;
    self.decode(ty, data)
  }

  pub fn encode(&self, ty: &str, value: &Value) -> Result<Vec<u8>, Error> {
    let mut w = Writer::new();
    self.encode_value(ty, value, &mut w, 0)?;
    Ok(w.into_bytes())
  }

  /// Decodes a value of the given type, all input must be consumed.
  pub fn decode(&self, ty: &str, data: &[u8]) -> Result<Value, Error> {
    let mut r = Reader::new(data);
    let value = self.decode_value(ty, &mut r, 0)?;
    r.finish()?;
    Ok(value)
  }

  fn resolve<'a>(&'a self, ty: &'a str) -> Result<&'a str, Error> {
    let mut current = ty;
    for _ in 0..MAX_DEPTH {
      match self.typedefs.get(current) {
        Some(next) => current = next,
        None => return Ok(current),
      }
    }
    Err(Error::TooDeep(ty.into()))
  }

  fn check_type(&self, ty: &str) -> Result<(), Error> {
    let mut current = ty;
    for _ in 0..MAX_DEPTH {
      let resolved = self.resolve(current)?;
      if let Some(inner) = resolved
        .strip_suffix("[]")
        .or_else(|| resolved.strip_suffix('?'))
      {
        current = inner;
        continue;
      }
      if is_builtin(resolved) || self.structs.contains_key(resolved) {
        return Ok(());
      }
      return Err(Error::UnknownType(resolved.into()));
    }
    Err(Error::TooDeep(ty.into()))
  }

  fn encode_value(
    &self,
    ty: &str,
    value: &Value,
    w: &mut Writer,
    depth: usize,
  ) -> Result<(), Error> {
    if depth > MAX_DEPTH {
      return Err(Error::TooDeep(ty.into()));
    }

    let ty = self.resolve(ty)?;
    if let Some(inner) = ty.strip_suffix("[]") {
      let items = value.as_array().ok_or_else(|| mismatch(ty, "array", value))?;
      w.write_varuint32(items.len() as u32);
      for item in items {
        self.encode_value(inner, item, w, depth + 1)?;
      }
      return Ok(());
    }

    if let Some(inner) = ty.strip_suffix('?') {
      if value.is_null() {
        w.write_u8(0);
      } else {
        w.write_u8(1);
        self.encode_value(inner, value, w, depth + 1)?;
      }
      return Ok(());
    }

    if is_builtin(ty) {
      return encode_builtin(ty, value, w);
    }

    let def = self
      .structs
      .get(ty)
      .ok_or_else(|| Error::UnknownType(ty.into()))?;
    let object = value
      .as_object()
      .ok_or_else(|| mismatch(ty, "object", value))?;

    if !def.base.is_empty() {
      self.encode_value(&def.base, value, w, depth + 1)?;
    }
    for field in &def.fields {
      let fval = match object.get(&field.name) {
        Some(v) => v,
        // absent optionals encode as null
        None if field.ty.ends_with('?') => &Value::Null,
        None => {
          return Err(Error::MissingField {
            ty: ty.into(),
            field: field.name.clone(),
          })
        }
      };
      self.encode_value(&field.ty, fval, w, depth + 1)?;
    }
    Ok(())
  }

  fn decode_value(
    &self,
    ty: &str,
    r: &mut Reader<'_>,
    depth: usize,
  ) -> Result<Value, Error> {
    if depth > MAX_DEPTH {
      return Err(Error::TooDeep(ty.into()));
    }

    let ty = self.resolve(ty)?;
    if let Some(inner) = ty.strip_suffix("[]") {
      let len = r.read_varuint32()? as usize;
      let mut items = Vec::with_capacity(len.min(r.remaining()));
      for _ in 0..len {
        items.push(self.decode_value(inner, r, depth + 1)?);
      }
      return Ok(Value::Array(items));
    }

    if let Some(inner) = ty.strip_suffix('?') {
      return match r.read_bool()? {
        false => Ok(Value::Null),
        true => self.decode_value(inner, r, depth + 1),
      };
    }

    if is_builtin(ty) {
      return decode_builtin(ty, r);
    }

    let mut object = Map::new();
    self.decode_struct(ty, r, &mut object, depth)?;
    Ok(Value::Object(object))
  }

  fn decode_struct(
    &self,
    ty: &str,
    r: &mut Reader<'_>,
    object: &mut Map<String, Value>,
    depth: usize,
  ) -> Result<(), Error> {
    let ty = self.resolve(ty)?;
    let def = self
      .structs
      .get(ty)
      .ok_or_else(|| Error::UnknownType(ty.into()))?;

    if !def.base.is_empty() {
      self.decode_struct(&def.base, r, object, depth + 1)?;
    }
    for field in &def.fields {
      let value = self.decode_value(&field.ty, r, depth + 1)?;
      object.insert(field.name.clone(), value);
    }
    Ok(())
  }
}

const BUILTINS: &[&str] = &[
  "bool",
  "int8",
  "uint8",
  "int16",
  "uint16",
  "int32",
  "uint32",
  "int64",
  "uint64",
  "int128",
  "uint128",
  "varuint32",
  "float32",
  "float64",
  "name",
  "string",
  "bytes",
  "checksum256",
  "symbol_code",
  "symbol",
  "asset",
];

fn is_builtin(ty: &str) -> bool {
  BUILTINS.contains(&ty)
}

fn mismatch(ty: &str, expected: &'static str, got: &Value) -> Error {
  Error::TypeMismatch {
    ty: ty.into(),
    expected,
    got: got.clone(),
  }
}

fn invalid(ty: &str, value: impl ToString) -> Error {
  Error::InvalidValue {
    ty: ty.into(),
    value: value.to_string(),
  }
}

fn unsigned(ty: &str, value: &Value, bits: u32) -> Result<u128, Error> {
  let v: u128 = match value {
    Value::Number(n) => n
      .as_u64()
      .map(u128::from)
      .ok_or_else(|| Error::OutOfRange {
        ty: ty.into(),
        value: n.to_string(),
      })?,
    Value::String(s) => s.trim().parse().map_err(|_| invalid(ty, s))?,
    other => return Err(mismatch(ty, "unsigned integer", other)),
  };
  if bits < 128 && v >> bits != 0 {
    return Err(Error::OutOfRange {
      ty: ty.into(),
      value: v.to_string(),
    });
  }
  Ok(v)
}

fn signed(ty: &str, value: &Value, bits: u32) -> Result<i128, Error> {
  let v: i128 = match value {
    Value::Number(n) => match (n.as_i64(), n.as_u64()) {
      (Some(v), _) => v as i128,
      (None, Some(v)) => v as i128,
      _ => {
        return Err(Error::OutOfRange {
          ty: ty.into(),
          value: n.to_string(),
        })
      }
    },
    Value::String(s) => s.trim().parse().map_err(|_| invalid(ty, s))?,
    other => return Err(mismatch(ty, "integer", other)),
  };
  if bits < 128 {
    let max = (1i128 << (bits - 1)) - 1;
    let min = -(1i128 << (bits - 1));
    if v < min || v > max {
      return Err(Error::OutOfRange {
        ty: ty.into(),
        value: v.to_string(),
      });
    }
  }
  Ok(v)
}

fn as_str<'a>(ty: &str, value: &'a Value) -> Result<&'a str, Error> {
  value.as_str().ok_or_else(|| mismatch(ty, "string", value))
}

fn encode_builtin(ty: &str, value: &Value, w: &mut Writer) -> Result<(), Error> {
  match ty {
    "bool" => {
      w.write_bool(value.as_bool().ok_or_else(|| mismatch(ty, "bool", value))?);
    }
    "uint8" | "uint16" | "uint32" | "uint64" | "uint128" => {
      let bits = bits_of(ty);
      let v = unsigned(ty, value, bits)?;
      w.write_raw(&v.to_le_bytes()[..(bits / 8) as usize]);
    }
    "int8" | "int16" | "int32" | "int64" | "int128" => {
      let bits = bits_of(ty);
      let v = signed(ty, value, bits)?;
      w.write_raw(&v.to_le_bytes()[..(bits / 8) as usize]);
    }
    "varuint32" => {
      w.write_varuint32(unsigned(ty, value, 32)? as u32);
    }
    "float32" => {
      let v = value.as_f64().ok_or_else(|| mismatch(ty, "number", value))?;
      w.write_raw(&(v as f32).to_le_bytes());
    }
    "float64" => {
      let v = value.as_f64().ok_or_else(|| mismatch(ty, "number", value))?;
      w.write_raw(&v.to_le_bytes());
    }
    "name" => {
      w.write_name(Name::new(as_str(ty, value)?)?);
    }
    "string" => {
      w.write_str(as_str(ty, value)?);
    }
    "bytes" => {
      let s = as_str(ty, value)?;
      w.write_bytes(&hex::decode(s).map_err(|_| invalid(ty, s))?);
    }
    "checksum256" => {
      let s = as_str(ty, value)?;
      let bytes = hex::decode(s).map_err(|_| invalid(ty, s))?;
      if bytes.len() != 32 {
        return Err(invalid(ty, s));
      }
      w.write_raw(&bytes);
    }
    "symbol_code" => {
      w.write_u64(symbol_code(as_str(ty, value)?)?);
    }
    "symbol" => {
      w.write_u64(symbol(as_str(ty, value)?)?);
    }
    "asset" => {
      let (amount, sym) = asset(as_str(ty, value)?)?;
      w.write_i64(amount).write_u64(sym);
    }
    _ => return Err(Error::UnknownType(ty.into())),
  }
  Ok(())
}

fn decode_builtin(ty: &str, r: &mut Reader<'_>) -> Result<Value, Error> {
  Ok(match ty {
    "bool" => Value::Bool(r.read_bool()?),
    "uint8" | "uint16" | "uint32" | "uint64" | "uint128" => {
      let bits = bits_of(ty);
      let mut buf = [0u8; 16];
      buf[..(bits / 8) as usize].copy_from_slice(r.read_raw((bits / 8) as usize)?);
      let v = u128::from_le_bytes(buf);
      match u64::try_from(v) {
        Ok(v) if bits <= 64 => Value::from(v),
        _ => Value::String(v.to_string()),
      }
    }
    "int8" | "int16" | "int32" | "int64" | "int128" => {
      let bytes = (bits_of(ty) / 8) as usize;
      let raw = r.read_raw(bytes)?;
      let fill = if raw[bytes - 1] & 0x80 != 0 { 0xff } else { 0x00 };
      let mut buf = [fill; 16];
      buf[..bytes].copy_from_slice(raw);
      let v = i128::from_le_bytes(buf);
      match i64::try_from(v) {
        Ok(v) if bytes <= 8 => Value::from(v),
        _ => Value::String(v.to_string()),
      }
    }
    "varuint32" => Value::from(r.read_varuint32()?),
    "float32" => {
      let mut buf = [0u8; 4];
      buf.copy_from_slice(r.read_raw(4)?);
      float(f32::from_le_bytes(buf) as f64)
    }
    "float64" => {
      let mut buf = [0u8; 8];
      buf.copy_from_slice(r.read_raw(8)?);
      float(f64::from_le_bytes(buf))
    }
    "name" => Value::String(r.read_name()?.to_string()),
    "string" => Value::String(r.read_string()?),
    "bytes" => Value::String(hex::encode(r.read_bytes()?)),
    "checksum256" => Value::String(hex::encode(r.read_raw(32)?)),
    "symbol_code" => Value::String(format_symbol_code(r.read_u64()?)),
    "symbol" => Value::String(format_symbol(r.read_u64()?)),
    "asset" => {
      let amount = r.read_i64()?;
      Value::String(format_asset(amount, r.read_u64()?))
    }
    _ => return Err(Error::UnknownType(ty.into())),
  })
}

fn bits_of(ty: &str) -> u32 {
  ty.trim_start_matches("uint")
    .trim_start_matches("int")
    .parse()
    .unwrap_or(64)
}

fn float(v: f64) -> Value {
  serde_json::Number::from_f64(v)
    .map(Value::Number)
    .unwrap_or(Value::Null)
}

fn symbol_code(s: &str) -> Result<u64, Error> {
  if s.is_empty() || s.len() > 7 || !s.bytes().all(|c| c.is_ascii_uppercase()) {
    return Err(invalid("symbol_code", s));
  }
  Ok(
    s.bytes()
      .enumerate()
      .fold(0u64, |acc, (i, c)| acc | (c as u64) << (8 * i)),
  )
}

fn format_symbol_code(mut value: u64) -> String {
  let mut out = String::new();
  while value & 0xff != 0 {
    out.push((value & 0xff) as u8 as char);
    value >>= 8;
  }
  out
}

/// Parses `"4,EOS"`.
fn symbol(s: &str) -> Result<u64, Error> {
  let (precision, code) = s.split_once(',').ok_or_else(|| invalid("symbol", s))?;
  let precision: u8 = precision.trim().parse().map_err(|_| invalid("symbol", s))?;
  if precision > 18 {
    return Err(invalid("symbol", s));
  }
  Ok(symbol_code(code.trim())? << 8 | precision as u64)
}

fn format_symbol(value: u64) -> String {
  format!("{},{}", value & 0xff, format_symbol_code(value >> 8))
}

/// Parses `"1.0000 EOS"` into the amount in the smallest units and the
/// symbol, precision is the number of fraction digits.
fn asset(s: &str) -> Result<(i64, u64), Error> {
  let (amount, code) = s.trim().split_once(' ').ok_or_else(|| invalid("asset", s))?;
  let (negative, digits) = match amount.strip_prefix('-') {
    Some(rest) => (true, rest),
    None => (false, amount),
  };
  let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits, ""));
  if int_part.is_empty()
    || !int_part.bytes().all(|c| c.is_ascii_digit())
    || !frac_part.bytes().all(|c| c.is_ascii_digit())
    || frac_part.len() > 18
  {
    return Err(invalid("asset", s));
  }

  let magnitude: i128 = format!("{int_part}{frac_part}")
    .parse()
    .map_err(|_| invalid("asset", s))?;
  let amount = if negative { -magnitude } else { magnitude };
  let amount = i64::try_from(amount).map_err(|_| Error::OutOfRange {
    ty: "asset".into(),
    value: s.into(),
  })?;

  let sym = symbol_code(code.trim())? << 8 | frac_part.len() as u64;
  Ok((amount, sym))
}

fn format_asset(amount: i64, sym: u64) -> String {
  let precision = (sym & 0xff) as u32;
  let sign = if amount < 0 { "-" } else { "" };
  let abs = amount.unsigned_abs();
  let code = format_symbol_code(sym >> 8);
  if precision == 0 {
    return format!("{sign}{abs} {code}");
  }
  let scale = 10u64.pow(precision.min(19));
  format!(
    "{sign}{}.{:0width$} {code}",
    abs / scale,
    abs % scale,
    width = precision as usize
  )
}

#[cfg(test)]
mod tests {
  use {
    super::{Abi, Error},
    chaintester_primitives::{Name, Reader, Writer},
    serde_json::json,
  };

  const ABI: &str = r#"{
    "version": "eosio::abi/1.1",
    "types": [{ "new_type_name": "account_name", "type": "name" }],
    "structs": [
      {
        "name": "record",
        "base": "",
        "fields": [
          { "name": "account", "type": "account_name" },
          { "name": "count", "type": "uint64" }
        ]
      },
      { "name": "inc", "base": "", "fields": [{ "name": "n", "type": "name" }] },
      {
        "name": "transfer",
        "base": "",
        "fields": [
          { "name": "from", "type": "name" },
          { "name": "to", "type": "name" },
          { "name": "quantity", "type": "asset" },
          { "name": "memo", "type": "string" }
        ]
      },
      {
        "name": "extended",
        "base": "record",
        "fields": [
          { "name": "tags", "type": "string[]" },
          { "name": "note", "type": "string?" },
          { "name": "delta", "type": "int32" }
        ]
      }
    ],
    "actions": [
      { "name": "inc", "type": "inc", "ricardian_contract": "" },
      { "name": "transfer", "type": "transfer", "ricardian_contract": "" }
    ],
    "tables": [
      {
        "name": "mytable",
        "index_type": "i64",
        "key_names": [],
        "key_types": [],
        "type": "record"
      }
    ]
  }"#;

  #[test]
  fn encode_action_args() -> anyhow::Result<()> {
    let abi = Abi::from_json(ABI.as_bytes())?;
    let data = abi.encode_action("inc".parse()?, &json!({ "n": "alice" }))?;
    assert_eq!(data, Name::new("alice")?.as_u64().to_le_bytes().to_vec());
    Ok(())
  }

  #[test]
  fn decode_table_row() -> anyhow::Result<()> {
    let abi = Abi::from_json(ABI.as_bytes())?;
    let mut w = Writer::new();
    w.write_name("alice".parse()?).write_u64(2);

    let row = abi.decode_row("mytable".parse()?, &w.into_bytes())?;
    assert_eq!(row, json!({ "account": "alice", "count": 2 }));
    Ok(())
  }

  #[test]
  fn asset_and_string_fields() -> anyhow::Result<()> {
    let abi = Abi::from_json(ABI.as_bytes())?;
    let args = json!({
      "from": "hello",
      "to": "alice",
      "quantity": "0.5000 EOS",
      "memo": "hello, world"
    });
    let data = abi.encode_action("transfer".parse()?, &args)?;

    let mut r = Reader::new(&data);
    assert_eq!(r.read_name()?, Name::new("hello")?);
    assert_eq!(r.read_name()?, Name::new("alice")?);
    assert_eq!(r.read_i64()?, 5000);
    assert_eq!(r.read_u64()?, (b'E' as u64) << 8 | (b'O' as u64) << 16 | (b'S' as u64) << 24 | 4);
    assert_eq!(r.read_string()?, "hello, world");
    r.finish()?;

    assert_eq!(abi.decode_action("transfer".parse()?, &data)?, args);

    let negative = json!({
      "from": "hello", "to": "alice", "quantity": "-12 TOK", "memo": ""
    });
    let data = abi.encode_action("transfer".parse()?, &negative)?;
    assert_eq!(abi.decode_action("transfer".parse()?, &data)?, negative);
    Ok(())
  }

  #[test]
  fn struct_base_arrays_and_optionals() -> anyhow::Result<()> {
    let abi = Abi::from_json(ABI.as_bytes())?;
    let value = json!({
      "account": "bob",
      "count": 7,
      "tags": ["a", "b"],
      "note": null,
      "delta": -3
    });
    let data = abi.encode("extended", &value)?;
    assert_eq!(abi.decode("extended", &data)?, value);

    // absent optional fields are encoded as null
    let without_note = json!({
      "account": "bob", "count": 7, "tags": [], "delta": 0
    });
    let data = abi.encode("extended", &without_note)?;
    assert_eq!(abi.decode("extended", &data)?["note"], json!(null));
    Ok(())
  }

  #[test]
  fn numeric_strings_are_accepted() -> anyhow::Result<()> {
    let abi = Abi::from_json(ABI.as_bytes())?;
    let data = abi.encode("record", &json!({ "account": "", "count": "42" }))?;
    assert_eq!(abi.decode("record", &data)?["count"], json!(42));
    Ok(())
  }

  #[test]
  fn abi_negative() -> anyhow::Result<()> {
    let abi = Abi::from_json(ABI.as_bytes())?;

    assert!(matches!(
      abi.encode_action("inc".parse()?, &json!({})),
      Err(Error::MissingField { .. })
    ));
    assert!(matches!(
      abi.encode_action("nope".parse()?, &json!({})),
      Err(Error::UnknownAction(_))
    ));
    assert!(matches!(
      abi.encode("record", &json!({ "account": "alice", "count": -1 })),
      Err(Error::OutOfRange { .. })
    ));
    assert!(matches!(
      abi.encode("extended", &json!({
        "account": "a", "count": 1, "tags": [], "delta": 3000000000u64
      })),
      Err(Error::OutOfRange { .. })
    ));
    assert!(matches!(
      abi.encode_action("inc".parse()?, &json!({ "n": "Alice" })),
      Err(Error::Name(_))
    ));
    assert!(matches!(
      abi.decode("record", &[0u8; 4]),
      Err(Error::Decode(_))
    ));
    assert!(matches!(abi.decode("record", &[0u8; 17]), Err(Error::Decode(_))));

    assert!(matches!(
      Abi::from_json(br#"{"structs":[{"name":"a","fields":[{"name":"x","type":"nope"}]}]}"#),
      Err(Error::UnknownType(_))
    ));
    assert!(matches!(Abi::from_json(b"not json"), Err(Error::Json(_))));
    assert!(matches!(
      Abi::from_json(br#"{"types":[{"new_type_name":"a","type":"b"},{"new_type_name":"b","type":"a"}],"structs":[{"name":"s","fields":[{"name":"x","type":"a"}]}]}"#),
      Err(Error::TooDeep(_))
    ));
    Ok(())
  }
}
