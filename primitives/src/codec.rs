use {crate::Name, thiserror::Error};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DecodeError {
  #[error("unexpected end of input, needed {needed} more bytes")]
  UnexpectedEof { needed: usize },

  #[error("varuint32 does not fit in 32 bits")]
  VarintOverflow,

  #[error("string is not valid utf-8")]
  InvalidUtf8,

  #[error("invalid boolean byte {0}")]
  InvalidBool(u8),

  #[error("{0} trailing bytes after decoding")]
  TrailingBytes(usize),
}

/// Appends values in the chain binary format.
///
/// Integers are little-endian, variable length sequences are prefixed
/// with their length encoded as LEB128 `varuint32`.
#[derive(Debug, Default, Clone)]
pub struct Writer {
  buf: Vec<u8>,
}

impl Writer {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn into_bytes(self) -> Vec<u8> {
    self.buf
  }

  pub fn write_raw(&mut self, bytes: &[u8]) -> &mut Self {
    self.buf.extend_from_slice(bytes);
    self
  }

  pub fn write_u8(&mut self, v: u8) -> &mut Self {
    self.write_raw(&[v])
  }

  pub fn write_bool(&mut self, v: bool) -> &mut Self {
    self.write_u8(v as u8)
  }

  pub fn write_u16(&mut self, v: u16) -> &mut Self {
    self.write_raw(&v.to_le_bytes())
  }

  pub fn write_u32(&mut self, v: u32) -> &mut Self {
    self.write_raw(&v.to_le_bytes())
  }

  pub fn write_u64(&mut self, v: u64) -> &mut Self {
    self.write_raw(&v.to_le_bytes())
  }

  pub fn write_u128(&mut self, v: u128) -> &mut Self {
    self.write_raw(&v.to_le_bytes())
  }

  pub fn write_i64(&mut self, v: i64) -> &mut Self {
    self.write_raw(&v.to_le_bytes())
  }

  pub fn write_varuint32(&mut self, mut v: u32) -> &mut Self {
    loop {
      let byte = (v & 0x7f) as u8;
      v >>= 7;
      if v == 0 {
        self.buf.push(byte);
        break;
      }
      self.buf.push(byte | 0x80);
    }
    self
  }

  pub fn write_name(&mut self, name: Name) -> &mut Self {
    self.write_u64(name.as_u64())
  }

  pub fn write_bytes(&mut self, bytes: &[u8]) -> &mut Self {
    self.write_varuint32(bytes.len() as u32);
    self.write_raw(bytes)
  }

  pub fn write_str(&mut self, s: &str) -> &mut Self {
    self.write_bytes(s.as_bytes())
  }
}

/// Reads values written by [`Writer`].
#[derive(Debug, Clone)]
pub struct Reader<'a> {
  data: &'a [u8],
  pos: usize,
}

impl<'a> Reader<'a> {
  pub fn new(data: &'a [u8]) -> Self {
    Self { data, pos: 0 }
  }

  pub fn remaining(&self) -> usize {
    self.data.len() - self.pos
  }

  /// Fails if there is unread input left.
  pub fn finish(&self) -> Result<(), DecodeError> {
    match self.remaining() {
      0 => Ok(()),
      n => Err(DecodeError::TrailingBytes(n)),
    }
  }

  pub fn read_raw(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
    if self.remaining() < len {
      return Err(DecodeError::UnexpectedEof {
        needed: len - self.remaining(),
      });
    }
    let data: &'a [u8] = self.data;
    let out = &data[self.pos..self.pos + len];
    self.pos += len;
    Ok(out)
  }

  fn read_array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
    let mut out = [0u8; N];
    out.copy_from_slice(self.read_raw(N)?);
    Ok(out)
  }

  pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
    Ok(self.read_raw(1)?[0])
  }

  pub fn read_bool(&mut self) -> Result<bool, DecodeError> {
    match self.read_u8()? {
      0 => Ok(false),
      1 => Ok(true),
      b => Err(DecodeError::InvalidBool(b)),
    }
  }

  pub fn read_u16(&mut self) -> Result<u16, DecodeError> {
    Ok(u16::from_le_bytes(self.read_array()?))
  }

  pub fn read_u32(&mut self) -> Result<u32, DecodeError> {
    Ok(u32::from_le_bytes(self.read_array()?))
  }

  pub fn read_u64(&mut self) -> Result<u64, DecodeError> {
    Ok(u64::from_le_bytes(self.read_array()?))
  }

  pub fn read_u128(&mut self) -> Result<u128, DecodeError> {
    Ok(u128::from_le_bytes(self.read_array()?))
  }

  pub fn read_i64(&mut self) -> Result<i64, DecodeError> {
    Ok(i64::from_le_bytes(self.read_array()?))
  }

  pub fn read_varuint32(&mut self) -> Result<u32, DecodeError> {
    let mut value: u64 = 0;
    let mut shift = 0;
    loop {
      let byte = self.read_u8()?;
      value |= ((byte & 0x7f) as u64) << shift;
      if value > u32::MAX as u64 {
        return Err(DecodeError::VarintOverflow);
      }
      if byte & 0x80 == 0 {
        return Ok(value as u32);
      }
      shift += 7;
      if shift > 28 {
        return Err(DecodeError::VarintOverflow);
      }
    }
  }

  pub fn read_name(&mut self) -> Result<Name, DecodeError> {
    Ok(Name::from_u64(self.read_u64()?))
  }

  pub fn read_bytes(&mut self) -> Result<&'a [u8], DecodeError> {
    let len = self.read_varuint32()? as usize;
    self.read_raw(len)
  }

  pub fn read_string(&mut self) -> Result<String, DecodeError> {
    let bytes = self.read_bytes()?;
    String::from_utf8(bytes.to_vec()).map_err(|_| DecodeError::InvalidUtf8)
  }
}

#[cfg(test)]
mod tests {
  use {
    super::{DecodeError, Reader, Writer},
    crate::Name,
  };

  #[test]
  fn varuint32_encoding() -> anyhow::Result<()> {
    let mut w = Writer::new();
    w.write_varuint32(0).write_varuint32(127).write_varuint32(128);
    w.write_varuint32(300).write_varuint32(u32::MAX);
    let bytes = w.into_bytes();
    assert_eq!(&bytes[..4], &[0x00, 0x7f, 0x80, 0x01]);
    assert_eq!(&bytes[4..6], &[0xac, 0x02]);

    let mut r = Reader::new(&bytes);
    assert_eq!(r.read_varuint32()?, 0);
    assert_eq!(r.read_varuint32()?, 127);
    assert_eq!(r.read_varuint32()?, 128);
    assert_eq!(r.read_varuint32()?, 300);
    assert_eq!(r.read_varuint32()?, u32::MAX);
    r.finish()?;
    Ok(())
  }

  #[test]
  fn record_layout() -> anyhow::Result<()> {
    let mut w = Writer::new();
    w.write_name("alice".parse()?).write_u64(2).write_str("hi");
    let bytes = w.into_bytes();
    assert_eq!(bytes.len(), 8 + 8 + 1 + 2);

    let mut r = Reader::new(&bytes);
    assert_eq!(r.read_name()?, Name::new("alice")?);
    assert_eq!(r.read_u64()?, 2);
    assert_eq!(r.read_string()?, "hi");
    assert!(r.finish().is_ok());
    Ok(())
  }

  #[test]
  fn decode_negative() {
    let mut r = Reader::new(&[1, 2, 3]);
    assert_eq!(r.read_u64(), Err(DecodeError::UnexpectedEof { needed: 5 }));

    let mut r = Reader::new(&[0xff, 0xff, 0xff, 0xff, 0x7f]);
    assert_eq!(r.read_varuint32(), Err(DecodeError::VarintOverflow));

    let mut r = Reader::new(&[2]);
    assert_eq!(r.read_bool(), Err(DecodeError::InvalidBool(2)));

    let r = Reader::new(&[0]);
    assert_eq!(r.finish(), Err(DecodeError::TrailingBytes(1)));
  }
}
