use std::path::Path;

use memmap2::Mmap;

use super::params::{CheckpointParams, WeightDType};
use crate::error::{ModelError, Result};

/// A checkpoint directory: `params.json` plus a memory-mapped weight file.
pub struct Checkpoint {
    pub params: CheckpointParams,
    mmap: Mmap,
}

impl Checkpoint {
    /// Open a checkpoint directory and map its weight file.
    ///
    /// The weight file must hold exactly `vocab_size * vocab_size` little-endian
    /// elements of `params.dtype`.
    pub fn open(ckpt_dir: &Path) -> Result<Checkpoint> {
        let params = CheckpointParams::load(ckpt_dir)?;
        if params.vocab_size == 0 {
            return Err(ModelError::InvalidCheckpoint(
                "vocab_size must be positive".to_string(),
            ));
        }

        let expected = params.weights_len()?;

        let path = ckpt_dir.join(&params.weights);
        let file = std::fs::File::open(&path)?;
        let mmap = unsafe { Mmap::map(&file)? };

        if mmap.len() != expected {
            return Err(ModelError::InvalidCheckpoint(format!(
                "{}: expected {} bytes for a {}x{} {} table, found {}",
                path.display(),
                expected,
                params.vocab_size,
                params.vocab_size,
                params.dtype,
                mmap.len()
            )));
        }

        log::info!(
            "opened checkpoint {} (vocab {}, context {}, {})",
            ckpt_dir.display(),
            params.vocab_size,
            params.max_seq_len,
            params.dtype
        );
        Ok(Checkpoint { params, mmap })
    }

    /// Raw bytes of the weight table.
    pub fn weight_bytes(&self) -> &[u8] {
        &self.mmap
    }

    /// The weight table widened to f32.
    pub fn weights_f32(&self) -> Vec<f32> {
        match self.params.dtype {
            WeightDType::F32 => dequantize_f32(&self.mmap),
            WeightDType::F16 => dequantize_f16(&self.mmap),
        }
    }
}

/// Reinterpret raw bytes as f32 values (little-endian).
fn dequantize_f32(data: &[u8]) -> Vec<f32> {
    data.chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}

/// Convert f16 values to f32.
fn dequantize_f16(data: &[u8]) -> Vec<f32> {
    data.chunks_exact(2)
        .map(|b| half::f16::from_le_bytes([b[0], b[1]]).to_f32())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn write_checkpoint(dir: &Path, params: &str, weights: &[u8]) {
        std::fs::write(dir.join("params.json"), params).unwrap();
        std::fs::write(dir.join("consolidated.bin"), weights).unwrap();
    }

    #[test]
    fn test_open_f32() {
        let dir = tempfile::tempdir().unwrap();
        let values = [0.5f32, -1.0, 2.0, 3.25];
        let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        write_checkpoint(dir.path(), r#"{"vocab_size": 2, "max_seq_len": 8}"#, &bytes);

        let ckpt = Checkpoint::open(dir.path()).unwrap();
        assert_eq!(ckpt.params.vocab_size, 2);
        assert_eq!(ckpt.weight_bytes().len(), 16);
        assert_eq!(ckpt.weights_f32(), values.to_vec());
    }

    #[test]
    fn test_open_f16() {
        let dir = tempfile::tempdir().unwrap();
        let values = [0.5f32, -1.0, 2.0, 0.1];
        let bytes: Vec<u8> = values
            .iter()
            .flat_map(|v| half::f16::from_f32(*v).to_le_bytes())
            .collect();
        write_checkpoint(
            dir.path(),
            r#"{"vocab_size": 2, "max_seq_len": 8, "dtype": "f16"}"#,
            &bytes,
        );

        let weights = Checkpoint::open(dir.path()).unwrap().weights_f32();
        assert_eq!(weights.len(), 4);
        assert_relative_eq!(weights[0], 0.5);
        assert_relative_eq!(weights[1], -1.0);
        assert_relative_eq!(weights[3], 0.1, epsilon = 1e-3);
    }

    #[test]
    fn test_size_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        write_checkpoint(dir.path(), r#"{"vocab_size": 2, "max_seq_len": 8}"#, &[0u8; 12]);
        assert!(matches!(
            Checkpoint::open(dir.path()),
            Err(ModelError::InvalidCheckpoint(_))
        ));
    }

    #[test]
    fn test_oversized_vocab_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write_checkpoint(
            dir.path(),
            r#"{"vocab_size": 4294967296, "max_seq_len": 8}"#,
            &[0u8; 4],
        );
        assert!(matches!(
            Checkpoint::open(dir.path()),
            Err(ModelError::InvalidCheckpoint(_))
        ));
    }

    #[test]
    fn test_missing_params() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(Checkpoint::open(dir.path()), Err(ModelError::Io(_))));
    }
}
