//! Построение бинарного словаря из списка лексем.
//!
//! Построитель принимает лексемы (упорядоченные списки пар «форма — тег»,
//! где первая форма — лемма), выводит для каждой лексемы парадигму,
//! дедуплицирует парадигмы и собирает три DAWG вместе с упакованным
//! хранилищем парадигм в файл словаря.

use std::collections::BTreeMap;

use hashbrown::HashMap;

use crate::chars::UniString;
use crate::dictionary::paradigm::{ParadigmWriter, RecordSpec, TransformSpec};
use crate::dictionary::{
    assemble_file, encode_main_payload, encode_suffix_payload, Dictionary,
};
use crate::dawg::DawgBuilder;
use crate::errors::{Result, XmorphyError};
use crate::tag::MorphTag;

/// Максимальная длина суффикса, индексируемого для предсказания.
const MAX_GUESS_SUFFIX: usize = 5;

/// Максимальное число записей статистики на один суффикс.
const MAX_SUFFIX_ENTRIES: usize = 10;

/// Продуктивные приставки, попадающие в префиксный DAWG.
///
/// Инвентарь соответствует приставочному словарю исходного сегментатора.
pub const DEFAULT_PREFIXES: &[&str] = &[
    "БЕЗ", "БЕС", "В", "ВЗ", "ВОЗ", "ВОС", "ВС", "ВЫ", "ДО", "ЗА", "ИЗ", "ИС",
    "НА", "НАД", "НАИ", "НЕ", "НИЗ", "НИС", "О", "ОБ", "ОТ", "ПЕРЕ", "ПО",
    "ПОД", "ПРЕ", "ПРЕД", "ПРИ", "ПРО", "РАЗ", "РАС", "С", "СО", "У", "ЧЕРЕЗ",
    "ЧРЕЗ",
];

/// Лексема: упорядоченный список форм с тегами.
///
/// Первая форма — начальная (лемма).
#[derive(Debug, Clone)]
pub struct Lexeme {
    forms: Vec<(UniString, MorphTag)>,
}

impl Lexeme {
    /// Создаёт лексему из списка форм.
    ///
    /// # Ошибки
    ///
    /// Возвращает ошибку, если список пуст или какая-либо форма пуста.
    pub fn new(forms: Vec<(UniString, MorphTag)>) -> Result<Self> {
        if forms.is_empty() {
            return Err(XmorphyError::invalid_argument(
                "forms",
                "a lexeme must have at least one form",
            ));
        }
        if forms.iter().any(|(f, _)| f.is_empty()) {
            return Err(XmorphyError::invalid_argument(
                "forms",
                "a lexeme form must be non-empty",
            ));
        }
        Ok(Self { forms })
    }

    /// Создаёт лексему из пар строк и тегов.
    pub fn from_pairs(pairs: &[(&str, MorphTag)]) -> Result<Self> {
        Self::new(
            pairs
                .iter()
                .map(|&(s, t)| (UniString::from_str(s), t))
                .collect(),
        )
    }

    /// Формы лексемы.
    #[inline(always)]
    pub fn forms(&self) -> &[(UniString, MorphTag)] {
        &self.forms
    }
}

/// Построитель бинарного словаря.
///
/// # Пример
///
/// ```
/// use xmorphy::dictionary::{DictionaryBuilder, Lexeme};
/// use xmorphy::tag::MorphTag;
///
/// let noun = MorphTag::NOUN | MorphTag::MASC;
/// let mut builder = DictionaryBuilder::new();
/// builder
///     .add_lexeme(Lexeme::from_pairs(&[
///         ("стол", noun | MorphTag::SING | MorphTag::NOMN),
///         ("столы", noun | MorphTag::PLUR | MorphTag::NOMN),
///     ]).unwrap())
///     .unwrap();
/// let dict = builder.build_dictionary().unwrap();
/// assert_eq!(dict.main_dawg().num_keys(), 2);
/// ```
pub struct DictionaryBuilder {
    lexemes: Vec<Lexeme>,
    prefixes: Vec<String>,
}

impl Default for DictionaryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DictionaryBuilder {
    /// Создаёт построитель со стандартным инвентарём приставок.
    pub fn new() -> Self {
        Self {
            lexemes: vec![],
            prefixes: DEFAULT_PREFIXES.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Заменяет инвентарь приставок.
    pub fn with_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.prefixes = prefixes
            .into_iter()
            .map(|s| s.as_ref().to_string())
            .collect();
        self
    }

    /// Добавляет лексему.
    pub fn add_lexeme(&mut self, lexeme: Lexeme) -> Result<&mut Self> {
        self.lexemes.push(lexeme);
        Ok(self)
    }

    /// Число добавленных лексем.
    #[inline(always)]
    pub fn num_lexemes(&self) -> usize {
        self.lexemes.len()
    }

    /// Собирает файл словаря.
    pub fn build(&self) -> Result<Vec<u8>> {
        let mut paradigms: Vec<Vec<RecordSpec>> = vec![];
        let mut paradigm_ids: HashMap<Vec<RecordSpec>, u32> = HashMap::new();

        let mut main_entries: BTreeMap<UniString, Vec<(u32, u16)>> = BTreeMap::new();
        let mut suffix_stats: BTreeMap<UniString, HashMap<(u32, u16), u32>> = BTreeMap::new();

        for lexeme in &self.lexemes {
            let forms: Vec<(UniString, MorphTag)> = lexeme
                .forms
                .iter()
                .map(|(f, t)| (f.to_upper(), *t))
                .collect();
            let lemma = &forms[0].0;

            // The stem is the longest common prefix of all the forms;
            // suppletive lexemes degrade to an empty stem and full-form
            // endings, which still round-trips.
            let mut stem_len = lemma.len();
            for (form, _) in &forms[1..] {
                let common = lemma
                    .chars()
                    .iter()
                    .zip(form.chars().iter())
                    .take_while(|(a, b)| a == b)
                    .count();
                stem_len = stem_len.min(common);
            }
            let lemma_cut = u16::try_from(lemma.len() - stem_len)?;

            let descriptor: Vec<RecordSpec> = forms
                .iter()
                .map(|(form, tag)| {
                    let ending = form.cut_left(stem_len).to_string();
                    RecordSpec {
                        tag: *tag,
                        transform: TransformSpec {
                            left_cut: 0,
                            right_cut: lemma_cut,
                            left_add: String::new(),
                            right_add: ending.clone(),
                        },
                        ending,
                    }
                })
                .collect();

            let pid = match paradigm_ids.get(&descriptor) {
                Some(&pid) => pid,
                None => {
                    let pid = u32::try_from(paradigms.len())?;
                    paradigm_ids.insert(descriptor.clone(), pid);
                    paradigms.push(descriptor);
                    pid
                }
            };

            for (idx, (form, _)) in forms.iter().enumerate() {
                let idx = u16::try_from(idx)?;
                let entries = main_entries.entry(form.clone()).or_default();
                if !entries.contains(&(pid, idx)) {
                    entries.push((pid, idx));
                }
                for cut in 1..=form.len().min(MAX_GUESS_SUFFIX) {
                    let rev_suffix = form.suffix(cut).reversed();
                    *suffix_stats
                        .entry(rev_suffix)
                        .or_default()
                        .entry((pid, idx))
                        .or_insert(0) += 1;
                }
            }
        }

        let num_keys = main_entries.len();
        let mut main_builder = DawgBuilder::new();
        for (surface, mut entries) in main_entries {
            entries.sort_unstable();
            main_builder.insert(&surface, &encode_main_payload(&entries))?;
        }
        let main_blob = main_builder.finalize()?;

        let mut suffix_builder = DawgBuilder::new();
        for (rev_suffix, stats) in suffix_stats {
            let mut entries: Vec<(u32, u16, u32)> = stats
                .into_iter()
                .map(|((pid, idx), freq)| (pid, idx, freq))
                .collect();
            entries.sort_unstable_by(|a, b| b.2.cmp(&a.2).then(a.0.cmp(&b.0)).then(a.1.cmp(&b.1)));
            entries.truncate(MAX_SUFFIX_ENTRIES);
            suffix_builder.insert(&rev_suffix, &encode_suffix_payload(&entries))?;
        }
        let suffix_blob = suffix_builder.finalize()?;

        let mut prefixes: Vec<UniString> = self
            .prefixes
            .iter()
            .map(|p| UniString::from_str(p).to_upper())
            .collect();
        prefixes.sort_unstable();
        prefixes.dedup();
        let mut prefix_builder = DawgBuilder::new();
        for prefix in &prefixes {
            prefix_builder.insert(prefix, &[])?;
        }
        let prefix_blob = prefix_builder.finalize()?;

        let (paradigm_blob, lemma_blob) = ParadigmWriter::new().write(&paradigms)?;

        log::debug!(
            "built dictionary: {} lexemes, {} paradigms, {} surface keys",
            self.lexemes.len(),
            paradigms.len(),
            num_keys,
        );

        assemble_file(
            &main_blob,
            &suffix_blob,
            &prefix_blob,
            &paradigm_blob,
            &lemma_blob,
        )
    }

    /// Собирает словарь и сразу загружает его в память.
    pub fn build_dictionary(&self) -> Result<Dictionary> {
        Dictionary::from_bytes(self.build()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noun(extra: MorphTag) -> MorphTag {
        MorphTag::NOUN | MorphTag::MASC | extra
    }

    #[test]
    fn test_paradigm_dedup() {
        let mut builder = DictionaryBuilder::new();
        for (lemma, plural) in [("СТОЛ", "СТОЛЫ"), ("СТВОЛ", "СТВОЛЫ")] {
            builder
                .add_lexeme(
                    Lexeme::from_pairs(&[
                        (lemma, noun(MorphTag::SING | MorphTag::NOMN)),
                        (plural, noun(MorphTag::PLUR | MorphTag::NOMN)),
                    ])
                    .unwrap(),
                )
                .unwrap();
        }
        let dict = builder.build_dictionary().unwrap();
        // The two lexemes inflect identically and must share one paradigm.
        assert_eq!(dict.paradigms().num_paradigms(), 1);
        assert_eq!(dict.main_dawg().num_keys(), 4);
    }

    #[test]
    fn test_suppletive_lexeme() {
        let mut builder = DictionaryBuilder::new();
        builder
            .add_lexeme(
                Lexeme::from_pairs(&[
                    ("ЧЕЛОВЕК", noun(MorphTag::SING | MorphTag::NOMN)),
                    ("ЛЮДИ", noun(MorphTag::PLUR | MorphTag::NOMN)),
                ])
                .unwrap(),
            )
            .unwrap();
        let dict = builder.build_dictionary().unwrap();
        let paradigms = dict.paradigms();
        let surface = UniString::from_str("ЛЮДИ");
        let payload = dict.main_dawg().lookup(&surface).unwrap();
        let (pid, idx) = crate::dictionary::decode_main_payload(payload)
            .next()
            .unwrap()
            .unwrap();
        let lemma = paradigms.restore_lemma(pid, idx, &surface).unwrap();
        assert_eq!(lemma.to_string(), "ЧЕЛОВЕК");
    }

    #[test]
    fn test_prefix_dawg() {
        let dict = DictionaryBuilder::new().build_dictionary().unwrap();
        let prefix = dict.prefix_dawg();
        assert!(prefix.contains_key(&UniString::from_str("ПЕРЕ")));
        assert!(prefix.contains_key(&UniString::from_str("ПОД")));
        assert!(!prefix.contains_key(&UniString::from_str("ЖЖЖ")));
    }

    #[test]
    fn test_empty_lexeme_rejected() {
        assert!(Lexeme::new(vec![]).is_err());
        assert!(Lexeme::from_pairs(&[("", MorphTag::NOUN)]).is_err());
    }
}
