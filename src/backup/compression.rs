use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::error::{CoreError, CoreResult};

/// zlib/deflate wrapper over a serialized snapshot payload. Reports the
/// compression ratio alongside the compressed bytes.
pub struct CompressedPayload {
    pub bytes: Vec<u8>,
    pub ratio: f64,
}

pub fn compress(payload: &[u8]) -> CoreResult<CompressedPayload> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(payload)
        .map_err(CoreError::from)?;
    let bytes = encoder.finish().map_err(CoreError::from)?;

    let ratio = if bytes.is_empty() {
        1.0
    } else {
        payload.len() as f64 / bytes.len() as f64
    };

    Ok(CompressedPayload { bytes, ratio })
}

pub fn decompress(compressed: &[u8]) -> CoreResult<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(compressed);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out).map_err(CoreError::from)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_arbitrary_payload() {
        let payload = br#"{"hello":"world","values":[1,2,3,4,5]}"#.repeat(50);
        let compressed = compress(&payload).unwrap();
        assert!(compressed.ratio >= 1.0);
        let restored = decompress(&compressed.bytes).unwrap();
        assert_eq!(restored, payload);
    }
}
