use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};

/// Element type of the weight table stored in a checkpoint.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum WeightDType {
    #[default]
    F32,
    F16,
}

impl WeightDType {
    /// Size of a single element in bytes.
    pub fn size_in_bytes(&self) -> usize {
        match self {
            WeightDType::F32 => 4,
            WeightDType::F16 => 2,
        }
    }
}

impl fmt::Display for WeightDType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WeightDType::F32 => write!(f, "f32"),
            WeightDType::F16 => write!(f, "f16"),
        }
    }
}

/// Contents of `params.json` in a checkpoint directory.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CheckpointParams {
    pub vocab_size: usize,
    /// Context length the weights were prepared for.
    pub max_seq_len: usize,
    #[serde(default)]
    pub dtype: WeightDType,
    /// Weight file name, relative to the checkpoint directory.
    #[serde(default = "default_weights_file")]
    pub weights: String,
}

fn default_weights_file() -> String {
    "consolidated.bin".to_string()
}

impl CheckpointParams {
    pub const FILE_NAME: &'static str = "params.json";

    /// Read `params.json` from a checkpoint directory.
    pub fn load(ckpt_dir: &Path) -> Result<CheckpointParams> {
        let text = std::fs::read_to_string(ckpt_dir.join(Self::FILE_NAME))?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Expected byte length of the weight file.
    /// Expected size of the weight file in bytes.
    pub fn weights_len(&self) -> Result<usize> {
        self.vocab_size
            .checked_mul(self.vocab_size)
            .and_then(|n| n.checked_mul(self.dtype.size_in_bytes()))
            .ok_or_else(|| {
                ModelError::InvalidCheckpoint(format!(
                    "a {}x{} {} table does not fit in memory",
                    self.vocab_size, self.vocab_size, self.dtype
                ))
            })
    }
}
