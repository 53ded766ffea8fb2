use integer_encoding::VarInt;

use crate::error::{Error, Result};

/// appends marshaled v to dst.
pub fn marshal_var_int<T: VarInt>(dst: &mut Vec<u8>, v: T) {
    let mut buf: [u8; 10] = [0; 10];
    let size = v.encode_var(&mut buf);
    dst.extend_from_slice(&buf[0..size]);
}

/// returns unmarshalled int from src along with the remaining tail of src.
pub fn unmarshal_var_int<T: VarInt>(src: &[u8]) -> Result<(T, &[u8])> {
    match T::decode_var(src) {
        Some((v, ofs)) => Ok((v, &src[ofs..])),
        _ => Err(Error::new("error decoding var int")),
    }
}

#[inline]
pub fn marshal_var_usize(dst: &mut Vec<u8>, v: usize) {
    marshal_var_int(dst, v)
}

pub fn unmarshal_var_usize(src: &[u8]) -> Result<(usize, &[u8])> {
    unmarshal_var_int::<usize>(src)
}

/// marshal_bytes appends the length-prefixed b to dst.
pub fn marshal_bytes(dst: &mut Vec<u8>, b: &[u8]) {
    marshal_var_usize(dst, b.len());
    if !b.is_empty() {
        dst.extend_from_slice(b);
    }
}

/// unmarshal_bytes returns the length-prefixed bytes at the start of src and the remaining tail.
pub fn unmarshal_bytes(src: &[u8]) -> Result<(&[u8], &[u8])> {
    let (len, tail) = unmarshal_var_usize(src)?;
    if tail.len() < len {
        return Err(Error::new(format!(
            "unexpected end of data: want {} bytes; got {}",
            len,
            tail.len()
        )));
    }
    Ok((&tail[..len], &tail[len..]))
}

#[inline]
pub fn marshal_string(dst: &mut Vec<u8>, s: &str) {
    marshal_bytes(dst, s.as_bytes())
}

pub fn unmarshal_string(src: &[u8]) -> Result<(String, &[u8])> {
    let (b, tail) = unmarshal_bytes(src)?;
    match std::str::from_utf8(b) {
        Ok(s) => Ok((s.to_string(), tail)),
        Err(_) => Err(Error::new("invalid utf8 string")),
    }
}
