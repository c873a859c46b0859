//! Нейронные классификаторы и кодирование признаков.
//!
//! Все классификаторы (дизамбигуатор, сегментатор) разделяют одну роль:
//! принять матрицу признаков, прогнать предобученную модель и раскодировать
//! метки. Роль выражена общим скорером [`model::ScoringModel`] и парой
//! обёрток с собственным кодированием входа и декодированием выхода.

pub mod disambiguator;
pub mod embeddings;
pub mod features;
pub mod model;
pub mod segmenter;

pub use disambiguator::Disambiguator;
pub use embeddings::Embeddings;
pub use model::{ModelVocab, ScoringModel};
pub use segmenter::Segmenter;
