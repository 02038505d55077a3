//! Binary model artifact.
//!
//! Layout:
//!
//! ```text
//! magic "OCMV" | u32 version | u32 n_features | u32 conv_channels
//! | u32 kernel_size | u32 hidden_dim | u32 n_outputs
//! | conv weight | conv bias
//! | fwd w_ih | fwd w_hh | fwd b_ih | fwd b_hh
//! | bwd w_ih | bwd w_hh | bwd b_ih | bwd b_hh
//! | head weight | head bias
//! ```
//!
//! Header integers are little-endian. Tensors are row-major f32 in host
//! byte order.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use bytemuck::{cast_slice, pod_read_unaligned};
use memmap2::MmapOptions;
use ndarray::{Array1, Array2};
use ocelli_model::{BiGru, CnnBiGru, Conv1d, GruCell, Linear, ModelArgs};

use crate::error::{EvalError, Result};

pub const MAGIC: &[u8; 4] = b"OCMV";
pub const FORMAT_VERSION: u32 = 1;

fn write_u32(f: &mut impl Write, v: usize) -> Result<()> {
    let v = u32::try_from(v)
        .map_err(|_| EvalError::invalid_artifact(format!("dimension {v} does not fit in u32")))?;
    f.write_all(&v.to_le_bytes())?;
    Ok(())
}

fn write_tensor<'a>(f: &mut impl Write, values: impl Iterator<Item = &'a f32>) -> Result<()> {
    let flat: Vec<f32> = values.copied().collect();
    f.write_all(cast_slice(&flat))?;
    Ok(())
}

fn write_linear(f: &mut impl Write, l: &Linear) -> Result<()> {
    write_tensor(f, l.weight().iter())?;
    match l.bias() {
        Some(b) => write_tensor(f, b.iter()),
        None => write_tensor(f, Array1::<f32>::zeros(l.out_features()).iter()),
    }
}

fn write_gru(f: &mut impl Write, cell: &GruCell) -> Result<()> {
    let (w_ih, w_hh, b_ih, b_hh) = cell.weights();
    write_tensor(f, w_ih.iter())?;
    write_tensor(f, w_hh.iter())?;
    write_tensor(f, b_ih.iter())?;
    write_tensor(f, b_hh.iter())
}

/// Writes `model` to `path`, replacing any existing file.
pub fn save_model(model: &CnnBiGru, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let mut f = BufWriter::new(File::create(path)?);
    f.write_all(MAGIC)?;
    f.write_all(&FORMAT_VERSION.to_le_bytes())?;
    let a = &model.args;
    for dim in [a.n_features, a.conv_channels, a.kernel_size, a.hidden_dim, a.n_outputs] {
        write_u32(&mut f, dim)?;
    }
    write_linear(&mut f, model.conv().kernel())?;
    write_gru(&mut f, &model.gru().forward)?;
    write_gru(&mut f, &model.gru().backward)?;
    write_linear(&mut f, model.head())?;
    f.flush()?;
    tracing::info!("Saved model artifact to {}", path.display());
    Ok(())
}

/// Reads an artifact into memory and decodes it.
pub fn load_model(path: impl AsRef<Path>) -> Result<CnnBiGru> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|e| missing_or_io(path, e))?;
    tracing::debug!(bytes = bytes.len(), "read model artifact");
    decode(&bytes)
}

/// Memory-maps an artifact and decodes it.
pub fn load_model_mmap(path: impl AsRef<Path>) -> Result<CnnBiGru> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| missing_or_io(path, e))?;
    let mmap = unsafe { MmapOptions::new().map(&file)? };
    tracing::debug!(bytes = mmap.len(), "mapped model artifact");
    decode(&mmap[..])
}

fn missing_or_io(path: &Path, e: std::io::Error) -> EvalError {
    if e.kind() == std::io::ErrorKind::NotFound {
        EvalError::ModelNotFound {
            path: path.to_path_buf(),
        }
    } else {
        e.into()
    }
}

/// Cursor over the artifact bytes.
struct Cursor<'a> {
    buf: &'a [u8],
    offset: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, len: usize, what: &str) -> Result<&'a [u8]> {
        let end = self
            .offset
            .checked_add(len)
            .filter(|&end| end <= self.buf.len())
            .ok_or_else(|| {
                EvalError::invalid_artifact(format!(
                    "truncated while reading {what} at byte {}",
                    self.offset
                ))
            })?;
        let out = &self.buf[self.offset..end];
        self.offset = end;
        Ok(out)
    }

    fn u32(&mut self, what: &str) -> Result<u32> {
        let raw = self.take(4, what)?;
        Ok(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
    }

    fn dim(&mut self, what: &str) -> Result<usize> {
        Ok(self.u32(what)? as usize)
    }

    fn floats(&mut self, len: usize, what: &str) -> Result<Vec<f32>> {
        let bytes = len
            .checked_mul(4)
            .ok_or_else(|| EvalError::invalid_artifact(format!("{what} is too large")))?;
        let raw = self.take(bytes, what)?;
        Ok(raw.chunks_exact(4).map(pod_read_unaligned::<f32>).collect())
    }

    fn matrix(&mut self, rows: usize, cols: usize, what: &str) -> Result<Array2<f32>> {
        let len = rows
            .checked_mul(cols)
            .ok_or_else(|| EvalError::invalid_artifact(format!("{what} is too large")))?;
        let data = self.floats(len, what)?;
        Array2::from_shape_vec((rows, cols), data)
            .map_err(|e| EvalError::invalid_artifact(format!("{what}: {e}")))
    }

    fn vector(&mut self, len: usize, what: &str) -> Result<Array1<f32>> {
        Ok(Array1::from(self.floats(len, what)?))
    }

    fn gru(&mut self, input: usize, hidden: usize, what: &str) -> Result<GruCell> {
        let w_ih = self.matrix(3 * hidden, input, what)?;
        let w_hh = self.matrix(3 * hidden, hidden, what)?;
        let b_ih = self.vector(3 * hidden, what)?;
        let b_hh = self.vector(3 * hidden, what)?;
        Ok(GruCell::from_parts(w_ih, w_hh, b_ih, b_hh)?)
    }
}

fn decode(buf: &[u8]) -> Result<CnnBiGru> {
    let mut cur = Cursor { buf, offset: 0 };
    if cur.take(4, "magic")? != MAGIC {
        return Err(EvalError::invalid_artifact("bad magic bytes"));
    }
    let version = cur.u32("version")?;
    if version != FORMAT_VERSION {
        return Err(EvalError::UnsupportedVersion {
            version,
            expected: FORMAT_VERSION,
        });
    }
    let args = ModelArgs {
        n_features: cur.dim("n_features")?,
        conv_channels: cur.dim("conv_channels")?,
        kernel_size: cur.dim("kernel_size")?,
        hidden_dim: cur.dim("hidden_dim")?,
        n_outputs: cur.dim("n_outputs")?,
    };
    args.validate()?;

    let window = args.kernel_size * args.n_features;
    let conv_w = cur.matrix(args.conv_channels, window, "conv weight")?;
    let conv_b = cur.vector(args.conv_channels, "conv bias")?;
    let conv = Conv1d::from_parts(conv_w, conv_b, args.n_features, args.kernel_size)?;

    let forward = cur.gru(args.conv_channels, args.hidden_dim, "forward gru")?;
    let backward = cur.gru(args.conv_channels, args.hidden_dim, "backward gru")?;

    let head_w = cur.matrix(args.n_outputs, 2 * args.hidden_dim, "head weight")?;
    let head_b = cur.vector(args.n_outputs, "head bias")?;
    let head = Linear::from_parts(head_w, Some(head_b))?;

    if cur.offset != buf.len() {
        return Err(EvalError::invalid_artifact(format!(
            "{} trailing bytes after head",
            buf.len() - cur.offset
        )));
    }
    Ok(CnnBiGru::from_parts(args, conv, BiGru { forward, backward }, head)?)
}
