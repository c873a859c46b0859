//! Предсказатель разборов для слов вне словаря.
//!
//! Перевёрнутая поверхностная форма ищется в суффиксном DAWG; принимающие
//! состояния на всё более коротких перевёрнутых префиксах (то есть всё более
//! длинных суффиксах слова) дают кандидатные парадигмы. Кандидаты
//! ранжируются по эмпирической частоте связи «суффикс — парадигма»,
//! сохранённой в полезной нагрузке. Суффиксы длиной в одну графему
//! используются лишь тогда, когда более длинные не дали ничего.

use hashbrown::HashMap;

use crate::chars::UniString;
use crate::dictionary::{decode_suffix_payload, Dictionary};
use crate::wordform::{InfoSource, MorphInfo};

/// Число возвращаемых кандидатов по умолчанию.
pub const DEFAULT_TOP_K: usize = 5;

/// Максимальная длина суффикса, участвующего в предсказании.
const MAX_SUFFIX: usize = 5;

/// Предсказатель по суффиксам.
pub struct SuffixGuesser<'a> {
    dict: &'a Dictionary,
    top_k: usize,
}

impl<'a> SuffixGuesser<'a> {
    /// Создаёт предсказатель со стандартным порогом кандидатов.
    pub fn new(dict: &'a Dictionary) -> Self {
        Self {
            dict,
            top_k: DEFAULT_TOP_K,
        }
    }

    /// Переопределяет число возвращаемых кандидатов.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    /// Предлагает интерпретации для слова вне словаря.
    ///
    /// Слово должно быть уже нормализовано к верхнему регистру.
    pub fn propose(&self, norm: &UniString) -> Vec<MorphInfo> {
        if norm.len() < 2 {
            return vec![];
        }
        let longest = MAX_SUFFIX.min(norm.len() - 1);
        let mut candidates = self.collect(norm, 2..=longest);
        if candidates.is_empty() {
            // The floor: single-grapheme suffixes only when nothing longer
            // matched.
            candidates = self.collect(norm, 1..=1usize.min(longest));
        }
        candidates
    }

    /// Собирает кандидатов для суффиксов указанных длин.
    fn collect(
        &self,
        norm: &UniString,
        lengths: std::ops::RangeInclusive<usize>,
    ) -> Vec<MorphInfo> {
        let suffix_dawg = self.dict.suffix_dawg();
        let paradigms = self.dict.paradigms();

        // (pid, form) → (длина суффикса, частота); более длинный суффикс
        // всегда предпочтительнее.
        let mut stats: HashMap<(u32, u16), (usize, u32)> = HashMap::new();
        for len in lengths.rev() {
            if len == 0 || len >= norm.len() {
                continue;
            }
            let rev_suffix = norm.suffix(len).reversed();
            let Some(payload) = suffix_dawg.lookup(&rev_suffix) else {
                continue;
            };
            for entry in decode_suffix_payload(payload) {
                let Ok((pid, idx, freq)) = entry else { continue };
                stats
                    .entry((pid, idx))
                    .and_modify(|best| {
                        if (len, freq) > *best {
                            *best = (len, freq);
                        }
                    })
                    .or_insert((len, freq));
            }
        }

        let mut ranked: Vec<((u32, u16), (usize, u32))> = stats.into_iter().collect();
        ranked.sort_unstable_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked.truncate(self.top_k);

        let mut infos = vec![];
        for ((pid, idx), (_, freq)) in ranked {
            let Some(record) = paradigms.record(pid, idx) else {
                continue;
            };
            let Some(lemma) = paradigms.restore_lemma(pid, idx, norm) else {
                continue;
            };
            if lemma.is_empty() {
                continue;
            }
            let stem_len = paradigms
                .stem_len(pid, idx, norm.len())
                .unwrap_or(norm.len());
            infos.push(MorphInfo {
                lemma,
                tag: record.tag,
                prob: freq as f32,
                paradigm_id: pid,
                form_idx: idx,
                stem_len: stem_len as u16,
                source: InfoSource::Guesser,
            });
        }
        infos
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tag::MorphTag;
    use crate::test_utils::small_dictionary;

    #[test]
    fn test_verb_cohort() {
        let dict = small_dictionary();
        let guesser = SuffixGuesser::new(&dict);
        let infos = guesser.propose(&UniString::from_str("ГУГЛИТЬ"));
        assert!(!infos.is_empty());
        assert!(infos.iter().any(|i| i.tag.pos() == MorphTag::VERB));
        assert!(infos
            .iter()
            .any(|i| i.lemma.to_string() == "ГУГЛИТЬ"));
    }

    #[test]
    fn test_noun_cohort() {
        let dict = small_dictionary();
        let guesser = SuffixGuesser::new(&dict);
        // ЗАВОДАМ matches the -АМ dative-plural cohort of the nouns.
        let infos = guesser.propose(&UniString::from_str("ЗАВОДАМ"));
        assert!(!infos.is_empty());
        let dative = infos
            .iter()
            .find(|i| (MorphTag::NOUN | MorphTag::PLUR | MorphTag::DATV).subsumes(i.tag));
        let dative = dative.expect("a dative plural guess");
        assert_eq!(dative.lemma.to_string(), "ЗАВОД");
    }

    #[test]
    fn test_top_k_limit() {
        let dict = small_dictionary();
        let guesser = SuffixGuesser::new(&dict).with_top_k(1);
        let infos = guesser.propose(&UniString::from_str("ГУГЛИТЬ"));
        assert!(infos.len() <= 1);
    }

    #[test]
    fn test_too_short_word() {
        let dict = small_dictionary();
        let guesser = SuffixGuesser::new(&dict);
        assert!(guesser.propose(&UniString::from_str("Я")).is_empty());
    }

    #[test]
    fn test_no_match() {
        let dict = small_dictionary();
        let guesser = SuffixGuesser::new(&dict);
        assert!(guesser.propose(&UniString::from_str("ЪЪЪЪ")).is_empty());
    }
}
