//! # XMorphy
//!
//! Морфологический анализатор и дизамбигуатор русского языка.
//!
//! ## Обзор
//!
//! Библиотека получает сырой текст и для каждого токена строит множество
//! кандидатных морфологических интерпретаций (лемма, часть речи,
//! грамматические признаки), выбирает наиболее вероятную в контексте,
//! размечает морфемы слова (приставка / корень / суффикс / окончание) и
//! умеет порождать словоформы по лемме и целевому тегу.
//!
//! ## Основные возможности
//!
//! - **Компактный словарь**: минимальный ациклический граф слов (DAWG) с
//!   упакованными парадигмами, пригодный для отображения в память
//! - **Предсказание слов вне словаря**: кандидаты по суффиксному DAWG и
//!   частотам
//! - **Нейронная дизамбигуация**: предобученная модель выбирает одну
//!   интерпретацию на токен по контексту
//! - **Сегментация морфем**: посимвольный классификатор с грамматикой
//!   допустимых разметок
//! - **Синтез**: порождение формы по лемме и целевому тегу
//!
//! ## Пример
//!
//! ```
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use xmorphy::dictionary::{DictionaryBuilder, Lexeme};
//! use xmorphy::engine::Engine;
//! use xmorphy::tag::MorphTag;
//!
//! let noun = MorphTag::NOUN | MorphTag::MASC | MorphTag::INAN;
//! let mut builder = DictionaryBuilder::new();
//! builder.add_lexeme(Lexeme::from_pairs(&[
//!     ("стол", noun | MorphTag::SING | MorphTag::NOMN),
//!     ("столы", noun | MorphTag::PLUR | MorphTag::NOMN),
//!     ("столам", noun | MorphTag::PLUR | MorphTag::DATV),
//! ])?)?;
//! let dict = builder.build_dictionary()?;
//!
//! let engine = Engine::with_fresh_models(dict)?;
//! let infos = engine.analyze("столы");
//! assert!(infos.iter().any(|i| i.lemma.to_string() == "СТОЛ"));
//!
//! let forms = engine.synthesize("стол", noun | MorphTag::PLUR | MorphTag::DATV);
//! assert_eq!(forms[0].to_string(), "СТОЛАМ");
//! # Ok(())
//! # }
//! ```
#![cfg_attr(docsrs, feature(doc_cfg))]

#[cfg(not(any(target_pointer_width = "32", target_pointer_width = "64")))]
compile_error!("`target_pointer_width` must be 32 or 64");

/// Словарный анализатор и синтез форм.
pub mod analyzer;

/// Юникодный слой: графемы и неизменяемые строки.
pub mod chars;

/// Движок DAWG.
pub mod dawg;

/// Словарь: контейнер, парадигмы, построитель.
pub mod dictionary;

/// Оркестратор конвейера.
pub mod engine;

/// Типы ошибок.
pub mod errors;

/// Нейронные классификаторы и признаки.
pub mod ml;

/// Потоковый разбор словаря OpenCorpora.
///
/// Доступен при включённой фиче `compile`.
#[cfg(feature = "compile")]
#[cfg_attr(docsrs, doc(cfg(feature = "compile")))]
pub mod opencorpora;

/// Морфологические теги.
pub mod tag;

/// Токенизатор.
pub mod tokenizer;

/// Вспомогательные функции.
pub mod utils;

/// Контейнеры результатов анализа.
pub mod wordform;

#[cfg(test)]
mod test_utils;

// Re-exports
pub use analyzer::MorphAnalyzer;
pub use dictionary::{Dictionary, DictionaryBuilder};
pub use engine::{Engine, SentenceResult};
pub use errors::{Result, XmorphyError};
pub use tag::MorphTag;
pub use wordform::{MorphInfo, PhemTag, WordForm};

/// Номер версии библиотеки.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
