//! Vector/sequence id mapping tables.
//!
//! Built once during index construction and immutable afterwards:
//! `v2s` maps a global vector id to its sequence, `v2l` to its position
//! inside that sequence, `s2v` maps a sequence to its first vector id.

/// Global vector id.
pub type Vid = u32;
/// Sequence id.
pub type Sid = u32;
/// Position of a vector inside its sequence.
pub type Lid = u32;

/// Immutable id translation tables between vectors and sequences.
#[derive(Debug, Clone)]
pub struct SequenceMap {
    v2s: Vec<Sid>,
    v2l: Vec<Lid>,
    s2v: Vec<Vid>,
    lens: Vec<u32>,
}

impl SequenceMap {
    /// Build the tables from per-sequence lengths.
    pub fn new(seq_lens: &[usize]) -> Self {
        let vec_count: usize = seq_lens.iter().sum();
        let mut v2s = Vec::with_capacity(vec_count);
        let mut v2l = Vec::with_capacity(vec_count);
        let mut s2v = Vec::with_capacity(seq_lens.len());

        let mut off = 0u32;
        for (sid, &len) in seq_lens.iter().enumerate() {
            s2v.push(off);
            for lid in 0..len {
                v2s.push(sid as Sid);
                v2l.push(lid as Lid);
            }
            off += len as u32;
        }

        Self {
            v2s,
            v2l,
            s2v,
            lens: seq_lens.iter().map(|&l| l as u32).collect(),
        }
    }

    /// Total number of vectors.
    pub fn vec_count(&self) -> usize {
        self.v2s.len()
    }

    /// Number of sequences.
    pub fn seq_count(&self) -> usize {
        self.s2v.len()
    }

    /// Sequence owning vector `vid`.
    #[inline]
    pub fn sid_of(&self, vid: Vid) -> Sid {
        self.v2s[vid as usize]
    }

    /// Position of vector `vid` inside its sequence.
    #[inline]
    pub fn lid_of(&self, vid: Vid) -> Lid {
        self.v2l[vid as usize]
    }

    /// First vector id of sequence `sid`.
    #[inline]
    pub fn off_of(&self, sid: Sid) -> Vid {
        self.s2v[sid as usize]
    }

    /// Length of sequence `sid`.
    #[inline]
    pub fn len_of(&self, sid: Sid) -> u32 {
        self.lens[sid as usize]
    }

    /// The raw `v2s` table.
    pub fn v2s(&self) -> &[Sid] {
        &self.v2s
    }
}
