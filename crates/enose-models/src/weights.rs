//! Raw weight memory images.

use crate::error::{ModelError, Result};
use crate::memfile;
use bytes::Bytes;
use enose_core::{Matrix, WeightStore};
use std::path::Path;
use tracing::debug;

/// One weight memory as loaded from disk, before it is bound to a core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeightImage {
    /// Which memory this image initialises
    pub matrix: Matrix,
    /// Two's-complement bytes in address order (cheap to clone)
    pub data: Bytes,
}

impl WeightImage {
    /// Wrap signed weights
    pub fn from_values(matrix: Matrix, values: &[i8]) -> Self {
        let data: Vec<u8> = values.iter().map(|&v| v.to_le_bytes()[0]).collect();
        Self {
            matrix,
            data: Bytes::from(data),
        }
    }

    /// Read a `.mem` or `.coe` file, chosen by extension (`.hex` is `.mem`).
    ///
    /// # Errors
    ///
    /// `FileNotFound`, `Io` or `Parse`.
    pub fn from_file(matrix: Matrix, path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ModelError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let text = std::fs::read_to_string(path)?;
        let is_coe = path
            .extension()
            .is_some_and(|e| e.eq_ignore_ascii_case("coe"));
        let values = if is_coe {
            memfile::parse_coe(&text)
        } else {
            memfile::parse_mem_bytes(&text)
        }
        .map_err(|e| ModelError::parse_error(format!("{}: {e}", path.display())))?;
        debug!("{matrix}: {} entries from {}", values.len(), path.display());
        Ok(Self::from_values(matrix, &values))
    }

    /// Entry count
    pub fn depth(&self) -> usize {
        self.data.len()
    }

    /// Signed weights in address order
    pub fn values(&self) -> Vec<i8> {
        self.data.iter().map(|&b| i8::from_le_bytes([b])).collect()
    }

    /// Fail unless the image holds exactly `rows × cols` entries
    ///
    /// # Errors
    ///
    /// `Shape` on mismatch.
    pub fn check_shape(&self, rows: usize, cols: usize) -> Result<()> {
        if self.depth() == rows * cols {
            Ok(())
        } else {
            Err(ModelError::shape(format!(
                "{} holds {} entries, geometry needs {rows}×{cols} = {}",
                self.matrix,
                self.depth(),
                rows * cols
            )))
        }
    }
}

/// Bind W1 and W2 images to a geometry.
///
/// # Errors
///
/// `Shape` if either image does not match.
pub fn build_store(
    n_in: usize,
    n_hidden: usize,
    n_out: usize,
    w1: &WeightImage,
    w2: &WeightImage,
) -> Result<WeightStore> {
    w1.check_shape(n_in, n_hidden)?;
    w2.check_shape(n_hidden, n_out)?;
    Ok(WeightStore::new(n_in, n_hidden, n_out, w1.values(), w2.values())?)
}
