//! Оркестратор конвейера анализа.
//!
//! [`Engine`] владеет словарём, таблицей эмбеддингов и обеими моделями;
//! все ресурсы загружаются один раз и далее неизменяемы, поэтому движок
//! свободно разделяется между параллельными вызовами. Каждый вызов
//! [`Engine::process`] прогоняет стадии токенизация → словарный анализ →
//! дизамбигуация → сегментация морфем; стадии читают лишь поля,
//! заполненные предыдущими стадиями, и пишут только свои.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::analyzer::MorphAnalyzer;
use crate::chars::UniString;
use crate::dictionary::Dictionary;
use crate::errors::{Result, XmorphyError};
use crate::ml::{Disambiguator, Embeddings, Segmenter};
use crate::tag::MorphTag;
use crate::tokenizer::{tokenize, TokenKind};
use crate::wordform::{MorphInfo, WordForm};

/// Переменная окружения, переопределяющая каталог ресурсов.
pub const DATA_DIR_ENV: &str = "XMORPHY_DATA_DIR";

/// Имя файла основного словаря.
pub const DICT_FILE: &str = "main.dict";

/// Имена файлов моделей и их боковых словарей.
pub const EMBEDDINGS_FILE: &str = "embeddings.safetensors";
pub const EMBEDDINGS_VOCAB_FILE: &str = "embeddings.vocab.json";
pub const MORPH_MODEL_FILE: &str = "morph.safetensors";
pub const MORPH_VOCAB_FILE: &str = "morph.vocab.json";
pub const PHEM_MODEL_FILE: &str = "phem.safetensors";
pub const PHEM_VOCAB_FILE: &str = "phem.vocab.json";

/// Результат обработки одного предложения.
#[derive(Debug, Clone)]
pub struct SentenceResult {
    /// Токены предложения в исходном порядке, включая разделители.
    pub words: Vec<WordForm>,
}

/// Движок морфологического анализа.
pub struct Engine {
    dict: Arc<Dictionary>,
    embeddings: Embeddings,
    disambiguator: Disambiguator,
    segmenter: Segmenter,
}

impl Engine {
    /// Создаёт движок из готовых компонентов.
    pub fn new(
        dict: Dictionary,
        embeddings: Embeddings,
        disambiguator: Disambiguator,
        segmenter: Segmenter,
    ) -> Self {
        Self {
            dict: Arc::new(dict),
            embeddings,
            disambiguator,
            segmenter,
        }
    }

    /// Создаёт движок со свежеинициализированными моделями.
    ///
    /// Вселенная тегов дизамбигуатора собирается по парадигмам словаря.
    /// Разметка таким движком не обучена, но все контракты конвейера
    /// соблюдаются; вариант полезен в тестах и для обкатки словарей.
    pub fn with_fresh_models(dict: Dictionary) -> Result<Self> {
        let embeddings = Embeddings::with_dim(32, 1024);
        let mut tags: Vec<MorphTag> = vec![];
        {
            let paradigms = dict.paradigms();
            for pid in 0..paradigms.num_paradigms() as u32 {
                let Some(len) = paradigms.len(pid) else { continue };
                for idx in 0..len {
                    if let Some(record) = paradigms.record(pid, idx) {
                        if !tags.contains(&record.tag) {
                            tags.push(record.tag);
                        }
                    }
                }
            }
        }
        if tags.is_empty() {
            tags.push(MorphTag::UNKN);
        }
        let disambiguator = Disambiguator::with_tags(tags, embeddings.dim())?;
        let segmenter = Segmenter::with_init()?;
        Ok(Self::new(dict, embeddings, disambiguator, segmenter))
    }

    /// Загружает движок из каталога ресурсов.
    ///
    /// Каталог берётся из аргумента, иначе из переменной окружения
    /// `XMORPHY_DATA_DIR`. Все ошибки загрузки фатальны и прерывают вызов;
    /// после успешной загрузки установившаяся обработка ошибок загрузки не
    /// порождает.
    pub fn load(dir: Option<&Path>) -> Result<Self> {
        let dir: PathBuf = match dir {
            Some(d) => d.to_path_buf(),
            None => std::env::var_os(DATA_DIR_ENV)
                .map(PathBuf::from)
                .ok_or_else(|| {
                    XmorphyError::invalid_argument(
                        "dir",
                        format!(
                            "no resource directory given and {} is not set",
                            DATA_DIR_ENV
                        ),
                    )
                })?,
        };

        log::info!("loading engine resources from {}", dir.display());
        let dict = Dictionary::from_path(dir.join(DICT_FILE))?;
        let embeddings = Embeddings::from_files(
            dir.join(EMBEDDINGS_FILE),
            dir.join(EMBEDDINGS_VOCAB_FILE),
        )?;
        let disambiguator = Disambiguator::from_files(
            dir.join(MORPH_MODEL_FILE),
            dir.join(MORPH_VOCAB_FILE),
            embeddings.dim(),
        )?;
        let segmenter =
            Segmenter::from_files(dir.join(PHEM_MODEL_FILE), dir.join(PHEM_VOCAB_FILE))?;
        Ok(Self::new(dict, embeddings, disambiguator, segmenter))
    }

    /// Словарь движка.
    #[inline(always)]
    pub fn dictionary(&self) -> &Dictionary {
        &self.dict
    }

    /// Кандидатные интерпретации одного слова.
    pub fn analyze(&self, word: &str) -> Vec<MorphInfo> {
        MorphAnalyzer::new(&self.dict).analyze(&UniString::from_str(word))
    }

    /// Синтез словоформ по лемме и целевому тегу.
    ///
    /// Неизвестная лемма даёт пустой результат.
    pub fn synthesize(&self, lemma: &str, target: MorphTag) -> Vec<UniString> {
        MorphAnalyzer::new(&self.dict).synthesize(&UniString::from_str(lemma), target)
    }

    /// Полный конвейер обработки текста.
    ///
    /// Порядок токенов на выходе равен порядку во входе; конкатенация
    /// текстов токенов восстанавливает исходную строку.
    pub fn process(&self, text: &str) -> Result<Vec<SentenceResult>> {
        let analyzer = MorphAnalyzer::new(&self.dict);
        let mut sentences: Vec<SentenceResult> = vec![];
        let mut current: Vec<WordForm> = vec![];

        for token in tokenize(text) {
            let is_newline = token.kind == TokenKind::Sepr && token.text.contains('\n');
            let mut form = WordForm::new(token.text, token.kind, token.range);
            self.annotate(&analyzer, &mut form);
            let is_sentence_end = form.kind == TokenKind::Pnct
                && form.text.chars().any(|c| matches!(c, '.' | '!' | '?' | '…'));
            current.push(form);
            if is_sentence_end || is_newline {
                sentences.push(SentenceResult {
                    words: std::mem::take(&mut current),
                });
            }
        }
        if !current.is_empty() {
            sentences.push(SentenceResult { words: current });
        }

        for sentence in &mut sentences {
            self.disambiguator
                .disambiguate(&mut sentence.words, &self.embeddings)?;
            for form in &mut sentence.words {
                if form.is_word() {
                    self.segmenter.segment(form, &self.dict)?;
                }
            }
        }
        Ok(sentences)
    }

    /// Первичная аннотация токена до дизамбигуации.
    fn annotate(&self, analyzer: &MorphAnalyzer<'_>, form: &mut WordForm) {
        match form.kind {
            TokenKind::Word => {
                if form.is_cyrillic() {
                    form.infos = analyzer.analyze(&form.norm);
                } else {
                    // Latin and mixed-script words bypass the analyzer.
                    let mut info = MorphInfo::unknown(&form.norm);
                    info.tag = MorphTag::X;
                    form.infos = vec![info];
                }
            }
            TokenKind::Numb => {
                let mut info = MorphInfo::unknown(&form.norm);
                info.tag = MorphTag::NUM;
                form.infos = vec![info];
            }
            TokenKind::Pnct => {
                let mut info = MorphInfo::unknown(&form.norm);
                info.tag = MorphTag::PUNCT;
                form.infos = vec![info];
            }
            TokenKind::Sepr | TokenKind::Other => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::small_dictionary;
    use crate::wordform::PhemTag;

    fn engine() -> Engine {
        Engine::with_fresh_models(small_dictionary()).unwrap()
    }

    #[test]
    fn test_process_reconstruction() {
        let engine = engine();
        let input = "Привет, мир! Столы стоят.\nКоты варят.";
        let sentences = engine.process(input).unwrap();
        let reconstructed: String = sentences
            .iter()
            .flat_map(|s| s.words.iter())
            .map(|w| w.text.as_str())
            .collect();
        assert_eq!(reconstructed, input);
        assert!(sentences.len() >= 3);
    }

    #[test]
    fn test_process_analyzes_words() {
        let engine = engine();
        let sentences = engine.process("столы стоят").unwrap();
        let words: Vec<&WordForm> = sentences
            .iter()
            .flat_map(|s| s.words.iter())
            .filter(|w| w.is_word())
            .collect();
        assert_eq!(words.len(), 2);
        // A dictionary word resolves to its lemma.
        assert!(words[0]
            .infos
            .iter()
            .any(|i| i.lemma.to_string() == "СТОЛ"));
        // Every word ends up with at least one interpretation.
        assert!(words.iter().all(|w| !w.infos.is_empty()));
    }

    #[test]
    fn test_process_segments_words() {
        let engine = engine();
        let sentences = engine.process("переподготовка").unwrap();
        let word = sentences
            .iter()
            .flat_map(|s| s.words.iter())
            .find(|w| w.is_word())
            .unwrap();
        assert_eq!(word.phem.len(), word.norm.len());
        assert!(
            crate::ml::segmenter::legal(&word.phem)
                || word.phem.iter().all(|&t| t == PhemTag::Unknown)
        );
    }

    #[test]
    fn test_numbers_and_latin_bypass() {
        let engine = engine();
        let sentences = engine.process("стол 123 table").unwrap();
        let forms: Vec<&WordForm> = sentences
            .iter()
            .flat_map(|s| s.words.iter())
            .filter(|w| !w.text.trim().is_empty())
            .collect();
        assert_eq!(forms[1].best().unwrap().tag, MorphTag::NUM);
        assert_eq!(forms[2].best().unwrap().tag, MorphTag::X);
    }

    #[test]
    fn test_sentence_split() {
        let engine = engine();
        let sentences = engine.process("Коты варят. Столы стоят").unwrap();
        assert_eq!(sentences.len(), 2);
    }

    #[test]
    fn test_synthesize_via_engine() {
        let engine = engine();
        let forms = engine.synthesize("стол", MorphTag::NOUN | MorphTag::PLUR | MorphTag::DATV);
        assert_eq!(forms.len(), 1);
        assert_eq!(forms[0].to_string(), "СТОЛАМ");
    }

    #[test]
    fn test_load_missing_dir() {
        let result = Engine::load(Some(Path::new("/nonexistent/xmorphy-data")));
        assert!(result.is_err());
    }
}
