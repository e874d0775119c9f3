//! K-mer extraction: plain, minimizer and shaped (spaced) modes.

use crate::codec::{canonical_representation, char_to_value, fmix64, BITS_PER_CHAR};
use crate::error::{Error, Result};
use std::collections::VecDeque;

/// Toggle mask used to break ties in minimizer ordering. Fixed so that
/// databases built with the same parameters are reproducible across builds.
pub const TOGGLE_MASK: u64 = 0xe37e28c4271b5a2d;

pub const MIN_K: usize = 1;
pub const MAX_K: usize = 31;

/// The three supported extraction strategies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KmerMode {
    Plain,
    Minimizer { m: usize },
    Shaped { pattern: Vec<bool> },
}

/// Parameters describing how fingerprints are derived from a sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KmerParams {
    pub k: usize,
    pub mode: KmerMode,
}

impl KmerParams {
    pub fn plain(k: usize) -> Result<Self> {
        validate_k(k)?;
        Ok(Self { k, mode: KmerMode::Plain })
    }

    pub fn minimizer(k: usize, m: usize) -> Result<Self> {
        validate_k(k)?;
        if m == 0 || m >= k {
            return Err(Error::config(format!(
                "minimizer length {} must be in 1..{} for k={}",
                m, k, k
            )));
        }
        Ok(Self { k, mode: KmerMode::Minimizer { m } })
    }

    /// Builds a shaped-kmer configuration from a pattern of `O` (include) and
    /// `-` (skip) characters. `k` is the count of `O`s in the pattern.
    pub fn shaped(pattern_str: &str) -> Result<Self> {
        let pattern: Vec<bool> = pattern_str
            .chars()
            .map(|c| match c {
                'O' => Ok(true),
                '-' => Ok(false),
                other => Err(Error::config(format!("invalid shape character '{}'", other))),
            })
            .collect::<Result<_>>()?;
        let k = pattern.iter().filter(|&&b| b).count();
        validate_k(k)?;
        if pattern.is_empty() {
            return Err(Error::config("shape pattern must not be empty"));
        }
        Ok(Self { k, mode: KmerMode::Shaped { pattern } })
    }

    pub fn window(&self) -> usize {
        match &self.mode {
            KmerMode::Plain => self.k,
            KmerMode::Minimizer { .. } => self.k,
            KmerMode::Shaped { pattern } => pattern.len(),
        }
    }
}

fn validate_k(k: usize) -> Result<()> {
    if k < MIN_K || k > MAX_K {
        return Err(Error::config(format!("k must be within {}..={}, got {}", MIN_K, MAX_K, k)));
    }
    Ok(())
}

/// Extracts the fingerprint stream for `seq` under `params`, in positional
/// order.
pub fn extract(seq: &[u8], params: &KmerParams) -> Vec<u64> {
    match &params.mode {
        KmerMode::Plain => extract_plain(seq, params.k),
        KmerMode::Minimizer { m } => extract_minimizer(seq, params.k, *m),
        KmerMode::Shaped { pattern } => extract_shaped(seq, pattern),
    }
}

fn extract_plain(seq: &[u8], k: usize) -> Vec<u64> {
    let mask = (1u64 << (k * BITS_PER_CHAR)) - 1;
    let mut value: u64 = 0;
    let mut valid: usize = 0;
    let mut out = Vec::new();
    for &c in seq {
        match char_to_value(c) {
            Some(code) => {
                value = ((value << BITS_PER_CHAR) | code) & mask;
                valid += 1;
                if valid >= k {
                    out.push(canonical_representation(value, k));
                }
            }
            None => {
                value = 0;
                valid = 0;
            }
        }
    }
    out
}

struct MinimizerWindow {
    queue: VecDeque<(u64, usize)>,
    capacity: usize,
}

impl MinimizerWindow {
    fn new(capacity: usize) -> Self {
        Self { queue: VecDeque::with_capacity(capacity + 1), capacity }
    }

    fn reset(&mut self) {
        self.queue.clear();
    }

    /// Pushes a new candidate at position `pos`, evicts out-of-window and
    /// dominated entries, and returns the current window minimum's key.
    fn push(&mut self, key: u64, pos: usize) -> u64 {
        while let Some(&(back_key, _)) = self.queue.back() {
            if back_key >= key {
                self.queue.pop_back();
            } else {
                break;
            }
        }
        self.queue.push_back((key, pos));
        while let Some(&(_, front_pos)) = self.queue.front() {
            if front_pos + self.capacity <= pos {
                self.queue.pop_front();
            } else {
                break;
            }
        }
        self.queue.front().map(|&(key, _)| key).unwrap_or(key)
    }
}

fn extract_minimizer(seq: &[u8], k: usize, m: usize) -> Vec<u64> {
    let window_capacity = k - m + 1;
    let m_mask = (1u64 << (m * BITS_PER_CHAR)) - 1;
    let toggle_masked = TOGGLE_MASK & m_mask;

    let mut m_value: u64 = 0;
    let mut valid: usize = 0;
    let mut window = MinimizerWindow::new(window_capacity);
    let mut m_pos: usize = 0;
    let mut out = Vec::new();

    for &c in seq {
        match char_to_value(c) {
            Some(code) => {
                m_value = ((m_value << BITS_PER_CHAR) | code) & m_mask;
                valid += 1;
                if valid >= m {
                    let ck = canonical_representation(m_value, m) ^ toggle_masked;
                    let front_key = window.push(ck, m_pos);
                    m_pos += 1;
                    if valid >= k {
                        out.push(front_key ^ toggle_masked);
                    }
                } else {
                    m_pos += 1;
                }
            }
            None => {
                m_value = 0;
                valid = 0;
                m_pos = 0;
                window.reset();
            }
        }
    }
    out
}

fn extract_shaped(seq: &[u8], pattern: &[bool]) -> Vec<u64> {
    let window = pattern.len();
    let k = pattern.iter().filter(|&&b| b).count();
    if seq.len() < window {
        return Vec::new();
    }
    let mut out = Vec::with_capacity(seq.len() - window + 1);
    for start in 0..=seq.len() - window {
        let mut value: u64 = 0;
        let mut ok = true;
        for (offset, &include) in pattern.iter().enumerate() {
            if !include {
                continue;
            }
            match char_to_value(seq[start + offset]) {
                Some(code) => value = (value << BITS_PER_CHAR) | code,
                None => {
                    ok = false;
                    break;
                }
            }
        }
        if ok {
            out.push(canonical_representation(value, k));
        }
    }
    out
}
