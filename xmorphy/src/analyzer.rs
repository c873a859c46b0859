//! Словарный анализатор и синтез форм.
//!
//! Анализатор раскрывает словарные попадания в списки кандидатных
//! интерпретаций, разбирает дефисные композиты покомпонентно и для слов
//! вне словаря обращается к предсказателю по суффиксам. Синтез решает
//! обратную задачу: по лемме и целевому тегу порождает словоформу.

pub mod guesser;

use hashbrown::HashSet;

use crate::chars::{Char, UniString};
use crate::dictionary::{decode_main_payload, Dictionary};
use crate::tag::MorphTag;
use crate::wordform::{InfoSource, MorphInfo};

pub use guesser::SuffixGuesser;

/// Словарный морфологический анализатор.
///
/// Дешёвое представление над неизменяемым словарём; создаётся на время
/// вызова и может свободно порождаться в параллельных потоках.
pub struct MorphAnalyzer<'a> {
    dict: &'a Dictionary,
    guesser: SuffixGuesser<'a>,
}

impl<'a> MorphAnalyzer<'a> {
    /// Создаёт анализатор над словарём.
    pub fn new(dict: &'a Dictionary) -> Self {
        Self {
            dict,
            guesser: SuffixGuesser::new(dict),
        }
    }

    /// Возвращает кандидатные интерпретации словоформы.
    ///
    /// Слово нормализуется к верхнему регистру; при промахе основного
    /// словаря дефисные композиты разбираются покомпонентно, затем
    /// вступает предсказатель по суффиксам. Если кандидатов нет вовсе,
    /// возвращается единственная интерпретация-заглушка UNKN — пустой
    /// разбор восстановим и не является ошибкой.
    pub fn analyze(&self, word: &UniString) -> Vec<MorphInfo> {
        let norm = word.to_upper();
        let mut infos = self.analyze_dictionary(&norm);

        if infos.is_empty() && norm.contains(Char::new('-')) {
            infos = self.analyze_compound(&norm);
        }
        if infos.is_empty() {
            infos = self.guesser.propose(&norm);
        }
        if infos.is_empty() {
            return vec![MorphInfo::unknown(&norm)];
        }

        dedup_infos(&mut infos);
        finish_probs(&mut infos);
        infos
    }

    /// Разбор строго по основному словарю, без запасных путей.
    pub(crate) fn analyze_dictionary(&self, norm: &UniString) -> Vec<MorphInfo> {
        let paradigms = self.dict.paradigms();
        let mut infos = vec![];
        let Some(payload) = self.dict.main_dawg().lookup(norm) else {
            return infos;
        };
        for entry in decode_main_payload(payload) {
            let Ok((pid, idx)) = entry else { continue };
            let Some(record) = paradigms.record(pid, idx) else {
                continue;
            };
            let Some(lemma) = paradigms.restore_lemma(pid, idx, norm) else {
                continue;
            };
            let stem_len = paradigms
                .stem_len(pid, idx, norm.len())
                .unwrap_or(norm.len());
            infos.push(MorphInfo {
                lemma,
                tag: record.tag,
                prob: 1.0,
                paradigm_id: pid,
                form_idx: idx,
                stem_len: stem_len as u16,
                source: InfoSource::Dictionary,
            });
        }
        infos
    }

    /// Разбор дефисного композита.
    ///
    /// Каждая часть анализируется независимо; интерпретация композита —
    /// декартово произведение интерпретаций частей, отфильтрованное по
    /// совместимости частей речи.
    fn analyze_compound(&self, norm: &UniString) -> Vec<MorphInfo> {
        let parts = norm.split(Char::new('-'));
        if parts.len() < 2 || parts.iter().any(|p| p.is_empty()) {
            return vec![];
        }

        let mut part_infos: Vec<Vec<MorphInfo>> = vec![];
        for part in &parts {
            let infos = self.analyze_dictionary(part);
            if infos.is_empty() {
                return vec![];
            }
            part_infos.push(infos);
        }

        // The Cartesian product over two and more parts degrades fast, so
        // only the adjacent-pair compatibility is enforced.
        let mut result = vec![];
        let head = part_infos.last().expect("at least two parts");
        let first = &part_infos[0];
        for left in first {
            for right in head {
                if left.tag.pos() != right.tag.pos() {
                    continue;
                }
                let mut lemma = left.lemma.clone();
                for (i, part) in parts.iter().enumerate().skip(1) {
                    lemma = lemma.concat(&UniString::from_str("-"));
                    if i + 1 == parts.len() {
                        lemma = lemma.concat(&right.lemma);
                    } else {
                        lemma = lemma.concat(part);
                    }
                }
                result.push(MorphInfo {
                    lemma,
                    tag: right.tag,
                    prob: 1.0,
                    paradigm_id: right.paradigm_id,
                    form_idx: right.form_idx,
                    stem_len: norm.len() as u16,
                    source: InfoSource::Dictionary,
                });
            }
        }
        result
    }

    /// Порождает словоформы по лемме и целевому тегу.
    ///
    /// Возвращаются все формы парадигмы леммы, чей тег является битовым
    /// надмножеством целевого. Неизвестная лемма даёт пустой результат.
    pub fn synthesize(&self, lemma: &UniString, target: MorphTag) -> Vec<UniString> {
        let norm = lemma.to_upper();
        let paradigms = self.dict.paradigms();
        let mut result: Vec<UniString> = vec![];
        let mut seen_paradigms: HashSet<u32> = HashSet::new();

        let Some(payload) = self.dict.main_dawg().lookup(&norm) else {
            return result;
        };
        for entry in decode_main_payload(payload) {
            let Ok((pid, idx)) = entry else { continue };
            // Keep only the hits whose lexeme has this surface as its lemma:
            // a surface can be an oblique form of another paradigm.
            match paradigms.restore_lemma(pid, idx, &norm) {
                Some(restored) if restored == norm => {}
                _ => continue,
            }
            if !seen_paradigms.insert(pid) {
                continue;
            }
            let Some(len) = paradigms.len(pid) else {
                continue;
            };
            for k in 0..len {
                let Some(record) = paradigms.record(pid, k) else {
                    continue;
                };
                if !target.subsumes(record.tag) {
                    continue;
                }
                if let Some(form) = paradigms.apply(pid, k, &norm) {
                    if !result.contains(&form) {
                        result.push(form);
                    }
                }
            }
        }
        result.sort_unstable();
        result
    }
}

/// Удаляет дубликаты по паре (лемма, тег), сохраняя первый встретившийся.
pub(crate) fn dedup_infos(infos: &mut Vec<MorphInfo>) {
    let mut seen: HashSet<(UniString, u64)> = HashSet::new();
    infos.retain(|info| seen.insert((info.lemma.clone(), info.tag.bits())));
}

/// Нормирует вероятности и сортирует интерпретации детерминированно.
pub(crate) fn finish_probs(infos: &mut [MorphInfo]) {
    let total: f32 = infos.iter().map(|i| i.prob).sum();
    if total > 0.0 {
        for info in infos.iter_mut() {
            info.prob /= total;
        }
    } else if !infos.is_empty() {
        let uniform = 1.0 / infos.len() as f32;
        for info in infos.iter_mut() {
            info.prob = uniform;
        }
    }
    infos.sort_by(MorphInfo::order);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::small_dictionary;

    #[test]
    fn test_analyze_lemma() {
        let dict = small_dictionary();
        let analyzer = MorphAnalyzer::new(&dict);
        let infos = analyzer.analyze(&UniString::from_str("стол"));
        assert!(infos.iter().any(|i| {
            i.lemma.to_string() == "СТОЛ"
                && (MorphTag::NOUN | MorphTag::MASC | MorphTag::SING | MorphTag::NOMN)
                    .subsumes(i.tag)
        }));
    }

    #[test]
    fn test_analyze_inflected() {
        let dict = small_dictionary();
        let analyzer = MorphAnalyzer::new(&dict);
        let infos = analyzer.analyze(&UniString::from_str("столы"));
        assert!(infos.iter().any(|i| {
            i.lemma.to_string() == "СТОЛ"
                && (MorphTag::NOUN | MorphTag::MASC | MorphTag::PLUR | MorphTag::NOMN)
                    .subsumes(i.tag)
        }));
        assert!(infos.iter().all(|i| i.source == InfoSource::Dictionary));
    }

    #[test]
    fn test_probabilities_normalized() {
        let dict = small_dictionary();
        let analyzer = MorphAnalyzer::new(&dict);
        let infos = analyzer.analyze(&UniString::from_str("столы"));
        let total: f32 = infos.iter().map(|i| i.prob).sum();
        assert!((total - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_unknown_word_falls_back() {
        let dict = small_dictionary();
        let analyzer = MorphAnalyzer::new(&dict);
        // No candidates at all: a lone UNKN interpretation.
        let infos = analyzer.analyze(&UniString::from_str("ъъъ"));
        assert_eq!(infos.len(), 1);
        assert!(infos[0].tag.is_unknown());
    }

    #[test]
    fn test_oov_verb_guessed() {
        let dict = small_dictionary();
        let analyzer = MorphAnalyzer::new(&dict);
        let infos = analyzer.analyze(&UniString::from_str("гуглить"));
        assert!(!infos.is_empty());
        assert!(
            infos.iter().any(|i| i.tag.pos() == MorphTag::VERB),
            "expected a VERB guess by the -ить cohort, got {:?}",
            infos
        );
        assert!(infos.iter().all(|i| i.source == InfoSource::Guesser));
    }

    #[test]
    fn test_hyphen_compound() {
        let dict = small_dictionary();
        let analyzer = MorphAnalyzer::new(&dict);
        let infos = analyzer.analyze(&UniString::from_str("стол-кот"));
        assert!(!infos.is_empty());
        assert!(infos
            .iter()
            .any(|i| i.lemma.to_string() == "СТОЛ-КОТ" && i.tag.pos() == MorphTag::NOUN));
    }

    #[test]
    fn test_synthesize_dative_plural() {
        let dict = small_dictionary();
        let analyzer = MorphAnalyzer::new(&dict);
        let forms = analyzer.synthesize(
            &UniString::from_str("стол"),
            MorphTag::NOUN | MorphTag::PLUR | MorphTag::DATV,
        );
        assert_eq!(forms.len(), 1);
        assert_eq!(forms[0].to_string(), "СТОЛАМ");
    }

    #[test]
    fn test_synthesize_unknown_lemma() {
        let dict = small_dictionary();
        let analyzer = MorphAnalyzer::new(&dict);
        let forms = analyzer.synthesize(&UniString::from_str("трактор"), MorphTag::NOUN);
        assert!(forms.is_empty());
    }

    #[test]
    fn test_synthesis_inverse() {
        // Every form synthesized from a known (lemma, tag) must analyze
        // back to that lemma and tag.
        let dict = small_dictionary();
        let analyzer = MorphAnalyzer::new(&dict);
        let lemma = UniString::from_str("КОТ");
        for target in [
            MorphTag::NOUN | MorphTag::SING | MorphTag::GENT,
            MorphTag::NOUN | MorphTag::PLUR | MorphTag::DATV,
        ] {
            let forms = analyzer.synthesize(&lemma, target);
            assert!(!forms.is_empty(), "no form for {}", target);
            for form in forms {
                let infos = analyzer.analyze(&form);
                assert!(
                    infos
                        .iter()
                        .any(|i| i.lemma == lemma && target.subsumes(i.tag)),
                    "form {} does not analyze back to {} + {}",
                    form,
                    lemma,
                    target
                );
            }
        }
    }
}
