//! Dataset loading for the binary vector-sequence file formats.
//!
//! Three little-endian formats are supported:
//!
//! - `.fvecs`: concatenated records of `[i32 dim][dim x f32]`. The record
//!   count is `filesize / ((dim + 1) * 4)`. Loading fails if the first
//!   record's dim does not match the configured dimension.
//! - `.lens`: a raw `i32` array of sequence lengths. The i-th sequence
//!   occupies the next `lens[i]` vectors of the `.fvecs` stream.
//! - `.ivecs`: same record schema as `.fvecs` but with `i32` payload;
//!   used for groundtruth (one record of k sequence ids per query).
//!
//! Files are memory-mapped and decoded into flat owned buffers; everything
//! downstream borrows from the loaded dataset.

use crate::error::{Error, Result};
use byteorder::{ByteOrder, LittleEndian};
use memmap2::Mmap;
use std::fs::File;
use std::path::Path;

/// A collection of variable-length vector sequences over one flat buffer.
///
/// Vectors of sequence `sid` occupy vector ids `off(sid) .. off(sid) + len(sid)`
/// in insertion order; `sum(len) == vec_count` always holds.
#[derive(Debug, Clone)]
pub struct SequenceDataset {
    dim: usize,
    data: Vec<f32>,
    seq_lens: Vec<usize>,
    seq_offs: Vec<usize>,
}

impl SequenceDataset {
    /// Load a dataset from an `.fvecs` vector file and a `.lens` length file.
    pub fn load(dim: usize, vector_path: impl AsRef<Path>, length_path: impl AsRef<Path>) -> Result<Self> {
        if dim == 0 {
            return Err(Error::invalid_arg("dim", "dimension must be at least 1"));
        }
        let data = read_fvecs(dim, vector_path.as_ref())?;
        let seq_lens = read_lens(length_path.as_ref())?;

        let vec_count = data.len() / dim;
        let total: usize = seq_lens.iter().sum();
        if total != vec_count {
            return Err(Error::invalid_arg(
                "lens",
                format!("sequence lengths sum to {} but the vector file holds {}", total, vec_count),
            ));
        }

        Ok(Self::from_parts(dim, data, seq_lens))
    }

    /// Build a dataset from in-memory sequences. Used by tests and benches.
    pub fn from_sequences(dim: usize, sequences: &[Vec<f32>]) -> Result<Self> {
        let mut data = Vec::new();
        let mut seq_lens = Vec::with_capacity(sequences.len());
        for seq in sequences {
            if seq.len() % dim != 0 {
                return Err(Error::WrongDimension {
                    expected: dim,
                    got: seq.len(),
                });
            }
            seq_lens.push(seq.len() / dim);
            data.extend_from_slice(seq);
        }
        Ok(Self::from_parts(dim, data, seq_lens))
    }

    fn from_parts(dim: usize, data: Vec<f32>, seq_lens: Vec<usize>) -> Self {
        let mut seq_offs = Vec::with_capacity(seq_lens.len());
        let mut off = 0;
        for &len in &seq_lens {
            seq_offs.push(off);
            off += len;
        }
        Self {
            dim,
            data,
            seq_lens,
            seq_offs,
        }
    }

    /// Vector dimension.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of sequences.
    pub fn seq_count(&self) -> usize {
        self.seq_lens.len()
    }

    /// Total number of vectors across all sequences.
    pub fn vec_count(&self) -> usize {
        self.data.len() / self.dim
    }

    /// The whole flat vector buffer.
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Length (in vectors) of sequence `sid`.
    pub fn seq_len(&self, sid: usize) -> usize {
        self.seq_lens[sid]
    }

    /// First vector id of sequence `sid`.
    pub fn seq_off(&self, sid: usize) -> usize {
        self.seq_offs[sid]
    }

    /// All sequence lengths.
    pub fn seq_lens(&self) -> &[usize] {
        &self.seq_lens
    }

    /// The flat `len * dim` strip of sequence `sid`.
    pub fn sequence(&self, sid: usize) -> &[f32] {
        let start = self.seq_offs[sid] * self.dim;
        &self.data[start..start + self.seq_lens[sid] * self.dim]
    }

    /// A single vector by global vector id.
    pub fn vector(&self, vid: usize) -> &[f32] {
        &self.data[vid * self.dim..(vid + 1) * self.dim]
    }
}

fn map_file(path: &Path) -> Result<Mmap> {
    let file = File::open(path).map_err(Error::io_err(path, "open"))?;
    // Safety: the mapping is read-only and the file is not mutated while mapped.
    unsafe { Mmap::map(&file) }.map_err(Error::io_err(path, "mmap"))
}

fn read_fvecs(dim: usize, path: &Path) -> Result<Vec<f32>> {
    let mmap = map_file(path)?;
    let bytes: &[u8] = &mmap;

    if bytes.len() < 4 {
        return Err(Error::invalid_arg("fvecs", format!("{} is too short", path.display())));
    }

    let file_dim = LittleEndian::read_i32(&bytes[0..4]);
    if file_dim != dim as i32 {
        return Err(Error::WrongDimension {
            expected: dim,
            got: file_dim.max(0) as usize,
        });
    }

    let record = (dim + 1) * 4;
    let count = bytes.len() / record;
    let mut data = vec![0.0f32; count * dim];
    for i in 0..count {
        let start = i * record + 4;
        LittleEndian::read_f32_into(&bytes[start..start + dim * 4], &mut data[i * dim..(i + 1) * dim]);
    }
    Ok(data)
}

fn read_lens(path: &Path) -> Result<Vec<usize>> {
    let mmap = map_file(path)?;
    let bytes: &[u8] = &mmap;

    let count = bytes.len() / 4;
    let mut lens = vec![0i32; count];
    LittleEndian::read_i32_into(&bytes[..count * 4], &mut lens);
    Ok(lens.into_iter().map(|l| l.max(0) as usize).collect())
}

/// Read a groundtruth `.ivecs` file: one record of k sequence ids per query.
pub fn read_groundtruth(path: impl AsRef<Path>) -> Result<Vec<Vec<u32>>> {
    let path = path.as_ref();
    let mmap = map_file(path)?;
    let bytes: &[u8] = &mmap;

    if bytes.len() < 4 {
        return Err(Error::invalid_arg("ivecs", format!("{} is too short", path.display())));
    }

    let k = LittleEndian::read_i32(&bytes[0..4]);
    if k <= 0 {
        return Err(Error::invalid_arg("ivecs", format!("invalid record width {}", k)));
    }
    let k = k as usize;

    let record = (k + 1) * 4;
    let count = bytes.len() / record;
    let mut gts = Vec::with_capacity(count);
    for i in 0..count {
        let start = i * record + 4;
        let mut ids = vec![0i32; k];
        LittleEndian::read_i32_into(&bytes[start..start + k * 4], &mut ids);
        gts.push(ids.into_iter().map(|id| id.max(0) as u32).collect());
    }
    Ok(gts)
}
