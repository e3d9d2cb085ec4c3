//! Binary representation of benchmark input files: a flat sequence of 8-byte IEEE-754 doubles.
//!
//! The engine sums values in native byte order, so files meant for it are written with
//! [`Endian::Native`]. Little and big endian are available for producing files on one
//! machine and reading them on another.

use std::{io::Write, str::FromStr};

pub const F64_SIZE: usize = std::mem::size_of::<f64>();

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Endian {
    Little,
    Big,
    #[default]
    Native,
}

impl Endian {
    pub fn encode(self, value: f64) -> [u8; F64_SIZE] {
        match self {
            Endian::Little => value.to_le_bytes(),
            Endian::Big => value.to_be_bytes(),
            Endian::Native => value.to_ne_bytes(),
        }
    }

    pub fn decode(self, bytes: [u8; F64_SIZE]) -> f64 {
        match self {
            Endian::Little => f64::from_le_bytes(bytes),
            Endian::Big => f64::from_be_bytes(bytes),
            Endian::Native => f64::from_ne_bytes(bytes),
        }
    }
}

impl FromStr for Endian {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "little" | "le" => Ok(Endian::Little),
            "big" | "be" => Ok(Endian::Big),
            "native" | "ne" => Ok(Endian::Native),
            x => Err(format!("invalid byte order: {x:?}, expected little, big or native")),
        }
    }
}

/// Encode `values` into a freshly allocated byte vector.
pub fn encode_all(values: &[f64], endian: Endian) -> Vec<u8> {
    let mut out = Vec::with_capacity(values.len() * F64_SIZE);
    for v in values {
        out.extend_from_slice(&endian.encode(*v));
    }
    out
}

/// Decode `bytes` as doubles. Trailing bytes that don't form a whole double are ignored.
pub fn decode_all(bytes: &[u8], endian: Endian) -> impl Iterator<Item = f64> + '_ {
    bytes.chunks_exact(F64_SIZE).map(move |c| {
        let mut raw = [0u8; F64_SIZE];
        raw.copy_from_slice(c);
        endian.decode(raw)
    })
}

/// Streams doubles into a [`Write`] in the chosen byte order.
pub struct F64Writer<W: Write> {
    inner: W,
    endian: Endian,
    written: u64,
}

impl<W: Write> F64Writer<W> {
    pub fn new(inner: W, endian: Endian) -> Self {
        Self {
            inner,
            endian,
            written: 0,
        }
    }

    pub fn write(&mut self, value: f64) -> std::io::Result<()> {
        self.inner.write_all(&self.endian.encode(value))?;
        self.written += 1;
        Ok(())
    }

    /// Number of values written so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn finish(mut self) -> std::io::Result<W> {
        self.inner.flush()?;
        Ok(self.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_byte_orders() {
        assert_eq!(Endian::Little.encode(1.0), [0, 0, 0, 0, 0, 0, 0xf0, 0x3f]);
        assert_eq!(Endian::Big.encode(1.0), [0x3f, 0xf0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(Endian::Big.decode([0x40, 0, 0, 0, 0, 0, 0, 0]), 2.0);
    }

    #[test]
    fn writer_matches_encode_all() {
        let values: Vec<f64> = (0..100).map(|i| i as f64 * 0.25 - 3.0).collect();
        for endian in [Endian::Little, Endian::Big, Endian::Native] {
            let mut w = F64Writer::new(Vec::new(), endian);
            for v in &values {
                w.write(*v).unwrap();
            }
            assert_eq!(w.written(), 100);
            let bytes = w.finish().unwrap();
            assert_eq!(bytes, encode_all(&values, endian));
            let decoded: Vec<f64> = decode_all(&bytes, endian).collect();
            assert_eq!(decoded, values);
        }
    }

    #[test]
    fn decode_ignores_trailing_partial_value() {
        let mut bytes = encode_all(&[1.5, -2.5], Endian::Little);
        bytes.extend_from_slice(&[1, 2, 3]);
        let decoded: Vec<f64> = decode_all(&bytes, Endian::Little).collect();
        assert_eq!(decoded, vec![1.5, -2.5]);
    }

    #[test]
    fn parse_endian() {
        assert_eq!("little".parse::<Endian>(), Ok(Endian::Little));
        assert_eq!("be".parse::<Endian>(), Ok(Endian::Big));
        assert_eq!("native".parse::<Endian>(), Ok(Endian::Native));
        assert!("middle".parse::<Endian>().is_err());
    }
}
