//! Таблица субсловных эмбеддингов.
//!
//! Хранит плотные векторы известных слов и корзины хешированных символьных
//! n-грамм (3..5) с маркерами границ слова. Вектор слова — среднее по
//! вектору слова (если слово известно) и векторам его n-грамм, так что и
//! слова вне словаря эмбеддингов получают осмысленное представление.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use candle_core::{DType, Device};
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::errors::{Result, XmorphyError};

/// Минимальная длина n-граммы.
const MIN_NGRAM: usize = 3;

/// Максимальная длина n-граммы.
const MAX_NGRAM: usize = 5;

/// Боковой словарь эмбеддингов.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingsVocab {
    /// Известные слова в порядке строк матрицы.
    pub words: Vec<String>,
    /// Число корзин n-грамм.
    pub buckets: usize,
    /// Размерность векторов.
    pub dim: usize,
}

/// Таблица эмбеддингов: строки слов, затем корзины n-грамм.
pub struct Embeddings {
    words: HashMap<String, usize>,
    matrix: Vec<f32>,
    dim: usize,
    buckets: usize,
    n_words: usize,
}

impl Embeddings {
    /// Загружает эмбеддинги из файла safetensors и бокового JSON.
    ///
    /// Тензор `vectors` должен иметь форму `(слова + корзины, dim)`.
    pub fn from_files<P: AsRef<Path>, Q: AsRef<Path>>(weights: P, vocab: Q) -> Result<Self> {
        let vocab_file = File::open(vocab.as_ref()).map_err(|e| {
            XmorphyError::invalid_argument(
                "vocab",
                format!("Failed to open embeddings vocab: {}", e),
            )
        })?;
        let vocab: EmbeddingsVocab = serde_json::from_reader(BufReader::new(vocab_file))?;

        let tensors = candle_core::safetensors::load(weights.as_ref(), &Device::Cpu)
            .map_err(|e| XmorphyError::corrupt_model(format!("{}", e)))?;
        let vectors = tensors
            .get("vectors")
            .ok_or_else(|| XmorphyError::corrupt_model("embeddings tensor \"vectors\" is missing"))?
            .to_dtype(DType::F32)?;

        let dims = vectors.dims().to_vec();
        let expected_rows = vocab.words.len() + vocab.buckets;
        if dims.len() != 2 || dims[0] != expected_rows || dims[1] != vocab.dim {
            return Err(XmorphyError::vocab_mismatch(format!(
                "embeddings matrix is {:?}, vocabulary expects ({}, {})",
                dims, expected_rows, vocab.dim
            )));
        }

        let matrix: Vec<f32> = vectors.flatten_all()?.to_vec1::<f32>()?;
        let words = vocab
            .words
            .iter()
            .enumerate()
            .map(|(i, w)| (w.to_uppercase(), i))
            .collect();
        Ok(Self {
            words,
            matrix,
            dim: vocab.dim,
            buckets: vocab.buckets,
            n_words: vocab.words.len(),
        })
    }

    /// Создаёт таблицу без известных слов с детерминированным заполнением
    /// корзин.
    ///
    /// Используется тестами и как запасной вариант при отсутствии файла
    /// эмбеддингов: векторы не обучены, но стабильны между запусками.
    pub fn with_dim(dim: usize, buckets: usize) -> Self {
        let mut matrix = Vec::with_capacity(buckets * dim);
        for row in 0..buckets {
            for col in 0..dim {
                let h = fnv1a(&[(row & 0xff) as u8, (row >> 8) as u8, col as u8]);
                matrix.push(((h % 1000) as f32 / 1000.0 - 0.5) * 0.2);
            }
        }
        Self {
            words: HashMap::new(),
            matrix,
            dim,
            buckets,
            n_words: 0,
        }
    }

    /// Размерность векторов.
    #[inline(always)]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Вектор слова: среднее по строке слова и корзинам его n-грамм.
    pub fn embed(&self, word: &str) -> Vec<f32> {
        let upper = word.to_uppercase();
        let mut acc = vec![0.0f32; self.dim];
        let mut count = 0usize;

        if let Some(&row) = self.words.get(&upper) {
            self.add_row(&mut acc, row);
            count += 1;
        }
        if self.buckets > 0 {
            let bounded = format!("<{}>", upper);
            let chars: Vec<char> = bounded.chars().collect();
            for n in MIN_NGRAM..=MAX_NGRAM {
                if chars.len() < n {
                    break;
                }
                for start in 0..=chars.len() - n {
                    let ngram: String = chars[start..start + n].iter().collect();
                    let bucket = (fnv1a(ngram.as_bytes()) as usize) % self.buckets;
                    self.add_row(&mut acc, self.n_words + bucket);
                    count += 1;
                }
            }
        }

        if count > 0 {
            let inv = 1.0 / count as f32;
            for v in &mut acc {
                *v *= inv;
            }
        }
        acc
    }

    #[inline]
    fn add_row(&self, acc: &mut [f32], row: usize) {
        let start = row * self.dim;
        for (a, v) in acc.iter_mut().zip(&self.matrix[start..start + self.dim]) {
            *a += v;
        }
    }
}

/// FNV-1a, схема хеширования n-грамм fasttext.
#[inline]
fn fnv1a(bytes: &[u8]) -> u32 {
    let mut h: u32 = 2_166_136_261;
    for &b in bytes {
        h ^= u32::from(b);
        h = h.wrapping_mul(16_777_619);
    }
    h
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic() {
        let emb = Embeddings::with_dim(16, 32);
        let a = emb.embed("столы");
        let b = emb.embed("столы");
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
    }

    #[test]
    fn test_case_insensitive() {
        let emb = Embeddings::with_dim(8, 32);
        assert_eq!(emb.embed("Стол"), emb.embed("СТОЛ"));
    }

    #[test]
    fn test_different_words_differ() {
        let emb = Embeddings::with_dim(16, 64);
        assert_ne!(emb.embed("стол"), emb.embed("гулять"));
    }

    #[test]
    fn test_short_word() {
        let emb = Embeddings::with_dim(8, 16);
        // Even a single-letter word has boundary-marked trigrams.
        let v = emb.embed("я");
        assert_eq!(v.len(), 8);
        assert!(v.iter().any(|&x| x != 0.0));
    }

    #[test]
    fn test_fnv1a_reference() {
        // FNV-1a of an empty input is the offset basis.
        assert_eq!(fnv1a(b""), 2_166_136_261);
    }
}
