//! Transport encoding for complex sample arrays.
//!
//! A payload is a `{dtype, buffer}` pair: the dtype tag names the element layout and the
//! buffer carries the interleaved little-endian `re, im` components, base64 encoded.
//! Decoding an encoded array yields the same dtype and bit-identical elements.
use std::fmt;
use std::str::FromStr;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use rustfft::num_complex::{Complex, Complex32, Complex64};
use serde::{Deserialize, Serialize};
use crate::dsp::AnalysisError;
/// Element layout of a serialized sample payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SampleDtype {
    /// Two `f32` components, 8 bytes per sample.
    Complex64,
    /// Two `f64` components, 16 bytes per sample.
    Complex128,
}
impl SampleDtype {
    pub fn as_str(&self) -> &'static str {
        match self {
            SampleDtype::Complex64 => "complex64",
            SampleDtype::Complex128 => "complex128",
        }
    }
    pub fn element_size(&self) -> usize {
        match self {
            SampleDtype::Complex64 => 8,
            SampleDtype::Complex128 => 16,
        }
    }
}
impl fmt::Display for SampleDtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
impl FromStr for SampleDtype {
    type Err = AnalysisError;
    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag {
            "complex64" | "<c8" | "cf32_le" => Ok(SampleDtype::Complex64),
            "complex128" | "<c16" | "cf64_le" => Ok(SampleDtype::Complex128),
            other => Err(AnalysisError::Decode(format!("unrecognized dtype tag {other:?}"))),
        }
    }
}
/// Wire form of a sample array.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedSamples {
    pub dtype: String,
    pub buffer: String,
}
/// Decoded samples, keeping the precision they were encoded with.
#[derive(Clone, Debug, PartialEq)]
pub enum SampleArray {
    Complex64(Vec<Complex32>),
    Complex128(Vec<Complex64>),
}
impl SampleArray {
    pub fn dtype(&self) -> SampleDtype {
        match self {
            SampleArray::Complex64(_) => SampleDtype::Complex64,
            SampleArray::Complex128(_) => SampleDtype::Complex128,
        }
    }
    pub fn len(&self) -> usize {
        match self {
            SampleArray::Complex64(v) => v.len(),
            SampleArray::Complex128(v) => v.len(),
        }
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
    /// Raw interleaved little-endian bytes, the layout of a `cf32_le` / `cf64_le` data file.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        match self {
            SampleArray::Complex64(v) => interleave_f32(v),
            SampleArray::Complex128(v) => interleave_f64(v),
        }
    }
    /// SigMF `core:datatype` for [`SampleArray::to_le_bytes`].
    pub fn sigmf_datatype(&self) -> &'static str {
        match self {
            SampleArray::Complex64(_) => "cf32_le",
            SampleArray::Complex128(_) => "cf64_le",
        }
    }
    /// Widens to `f64` components for analysis.
    pub fn to_complex128(&self) -> Vec<Complex64> {
        match self {
            SampleArray::Complex64(v) => v
                .iter()
                .map(|c| Complex64::new(c.re as f64, c.im as f64))
                .collect(),
            SampleArray::Complex128(v) => v.clone(),
        }
    }
}
pub fn encode(samples: &SampleArray) -> SerializedSamples {
    match samples {
        SampleArray::Complex64(v) => encode_complex64(v),
        SampleArray::Complex128(v) => encode_complex128(v),
    }
}
pub fn encode_complex64(samples: &[Complex32]) -> SerializedSamples {
    wrap(SampleDtype::Complex64, &interleave_f32(samples))
}
pub fn encode_complex128(samples: &[Complex64]) -> SerializedSamples {
    wrap(SampleDtype::Complex128, &interleave_f64(samples))
}
fn interleave_f32(samples: &[Complex32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * SampleDtype::Complex64.element_size());
    for c in samples {
        bytes.extend_from_slice(&c.re.to_le_bytes());
        bytes.extend_from_slice(&c.im.to_le_bytes());
    }
    bytes
}
fn interleave_f64(samples: &[Complex64]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * SampleDtype::Complex128.element_size());
    for c in samples {
        bytes.extend_from_slice(&c.re.to_le_bytes());
        bytes.extend_from_slice(&c.im.to_le_bytes());
    }
    bytes
}
fn wrap(dtype: SampleDtype, bytes: &[u8]) -> SerializedSamples {
    SerializedSamples {
        dtype: dtype.to_string(),
        buffer: STANDARD.encode(bytes),
    }
}
pub fn decode(store: &SerializedSamples) -> Result<SampleArray, AnalysisError> {
    let dtype: SampleDtype = store.dtype.parse()?;
    let bytes = STANDARD
        .decode(store.buffer.as_bytes())
        .map_err(|e| AnalysisError::Decode(format!("invalid base64 payload: {e}")))?;
    if bytes.len() % dtype.element_size() != 0 {
        return Err(AnalysisError::Decode(format!(
            "payload of {} bytes is not a multiple of the {}-byte {} element",
            bytes.len(),
            dtype.element_size(),
            dtype
        )));
    }
    let array = match dtype {
        SampleDtype::Complex64 => SampleArray::Complex64(
            bytes
                .chunks_exact(8)
                .map(|b| Complex::new(f32_le(&b[..4]), f32_le(&b[4..])))
                .collect(),
        ),
        SampleDtype::Complex128 => SampleArray::Complex128(
            bytes
                .chunks_exact(16)
                .map(|b| Complex::new(f64_le(&b[..8]), f64_le(&b[8..])))
                .collect(),
        ),
    };
    Ok(array)
}
fn f32_le(bytes: &[u8]) -> f32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(bytes);
    f32::from_le_bytes(raw)
}
fn f64_le(bytes: &[u8]) -> f64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(bytes);
    f64::from_le_bytes(raw)
}
#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;
    fn random_complex128(n: usize) -> Vec<Complex64> {
        let mut rng = rand::thread_rng();
        (0..n)
            .map(|_| Complex64::new(rng.gen::<f64>(), rng.gen::<f64>()))
            .collect()
    }
    #[test]
    fn complex128_round_trip_is_bit_exact() {
        let samples = SampleArray::Complex128(random_complex128(5));
        let store = encode(&samples);
        assert_eq!(store.dtype, "complex128");
        let out = decode(&store).unwrap();
        assert_eq!(out.dtype(), SampleDtype::Complex128);
        assert_eq!(out, samples);
    }
    #[test]
    fn complex64_keeps_its_precision() {
        let samples = SampleArray::Complex64(vec![
            Complex32::new(0.1, -0.2),
            Complex32::new(f32::MAX, f32::MIN_POSITIVE),
            Complex32::new(-0.0, 3.5e-40),
        ]);
        let out = decode(&encode(&samples)).unwrap();
        let (SampleArray::Complex64(a), SampleArray::Complex64(b)) = (&samples, &out) else {
            panic!("dtype changed across round trip");
        };
        for (x, y) in a.iter().zip(b) {
            assert_eq!(x.re.to_bits(), y.re.to_bits());
            assert_eq!(x.im.to_bits(), y.im.to_bits());
        }
    }
    #[test]
    fn empty_array_round_trips() {
        let store = encode_complex64(&[]);
        assert!(store.buffer.is_empty());
        let out = decode(&store).unwrap();
        assert!(out.is_empty());
        assert_eq!(out.dtype(), SampleDtype::Complex64);
    }
    #[test]
    fn store_survives_json() {
        let store = encode_complex128(&random_complex128(3));
        let json = serde_json::to_string(&store).unwrap();
        assert!(json.contains("\"dtype\""));
        assert!(json.contains("\"buffer\""));
        let back: SerializedSamples = serde_json::from_str(&json).unwrap();
        assert_eq!(back, store);
    }
    #[test]
    fn unknown_dtype_is_rejected() {
        let store = SerializedSamples {
            dtype: "int32".into(),
            buffer: String::new(),
        };
        assert!(matches!(decode(&store), Err(AnalysisError::Decode(_))));
    }
    #[test]
    fn ragged_payload_is_rejected() {
        let store = SerializedSamples {
            dtype: "complex128".into(),
            buffer: STANDARD.encode([0u8; 12]),
        };
        assert!(matches!(decode(&store), Err(AnalysisError::Decode(_))));
        let garbage = SerializedSamples {
            dtype: "complex64".into(),
            buffer: "not base64!".into(),
        };
        assert!(decode(&garbage).is_err());
    }
    #[test]
    fn sigmf_tags_are_aliases() {
        assert_eq!("cf32_le".parse::<SampleDtype>().unwrap(), SampleDtype::Complex64);
        assert_eq!("cf64_le".parse::<SampleDtype>().unwrap(), SampleDtype::Complex128);
    }
    #[test]
    fn raw_bytes_read_back_as_sigmf_data() {
        let samples = SampleArray::Complex64(vec![Complex32::new(0.5, -0.25), Complex32::new(1.0, 0.0)]);
        let datatype = crate::sigmf::SigMfDatatype::parse(samples.sigmf_datatype()).unwrap();
        assert_eq!(datatype.decode(&samples.to_le_bytes()), samples.to_complex128());
    }
}
