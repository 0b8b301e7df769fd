use std::hash::{Hash, Hasher};

use docrag_core::error::Result;
use docrag_core::traits::Embedder;
use twox_hash::XxHash64;

/// Feature-hashing embedder: deterministic, offline, L2-normalized.
///
/// ASCII words hash whole; every CJK character hashes on its own and together
/// with its successor, so Chinese text without spaces still shares features.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dim: usize,
}

impl HashEmbedder {
    pub fn new(dim: usize) -> Self { Self { dim: dim.max(1) } }

    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        for (i, feature) in features(text).iter().enumerate() {
            let mut hasher = XxHash64::with_seed(0);
            feature.hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h as usize) % self.dim;
            let val = (((h >> 32) as u32) as f32) / (u32::MAX as f32);
            v[idx] += val + (i as f32 % 3.0) * 0.01;
        }
        let norm = (v.iter().map(|x| x * x).sum::<f32>()).sqrt().max(1e-6);
        for x in &mut v { *x /= norm; }
        v
    }
}

impl Embedder for HashEmbedder {
    fn dim(&self) -> usize { self.dim }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}

fn features(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    for word in text.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
        let chars: Vec<char> = word.chars().collect();
        let mut ascii = String::new();
        for (i, &c) in chars.iter().enumerate() {
            if c.is_ascii() {
                ascii.push(c.to_ascii_lowercase());
                continue;
            }
            if !ascii.is_empty() { out.push(std::mem::take(&mut ascii)); }
            out.push(c.to_string());
            if let Some(&next) = chars.get(i + 1).filter(|n| !n.is_ascii()) {
                out.push(format!("{c}{next}"));
            }
        }
        if !ascii.is_empty() { out.push(ascii); }
    }
    out
}
