//! Сегментатор морфем.
//!
//! Посимвольный классификатор с метками ПРИСТАВКА / КОРЕНЬ / СУФФИКС /
//! ОКОНЧАНИЕ / НЕИЗВЕСТНО поверх общего скорера. После модели выполняется
//! проход, приводящий разметку к допустимой грамматике
//! `PREFIX* ROOT+ SUFFIX* ENDING*`: одиночные отклонения переназначаются
//! минимальным ремонтом; слова без корня в сырой разметке и слова, чей
//! ремонт затронул бы больше половины клеток, целиком помечаются UNKN.

use std::path::Path;

use crate::dictionary::Dictionary;
use crate::errors::{Result, XmorphyError};
use crate::ml::features::{char_feature_dim, char_features};
use crate::ml::model::{ModelVocab, ScoringModel, DEFAULT_HIDDEN};
use crate::wordform::{PhemTag, WordForm};

/// Фазы допустимой разметки в порядке следования.
const PHASES: [PhemTag; 4] = [
    PhemTag::Prefix,
    PhemTag::Root,
    PhemTag::Suffix,
    PhemTag::Ending,
];

/// Сегментатор морфем.
pub struct Segmenter {
    model: ScoringModel,
}

impl Segmenter {
    /// Загружает сегментатор из весов safetensors и бокового словаря.
    pub fn from_files<P: AsRef<Path>, Q: AsRef<Path>>(weights: P, vocab: Q) -> Result<Self> {
        let vocab = ModelVocab::from_path(vocab)?;
        if vocab.input.len() != char_feature_dim() {
            return Err(XmorphyError::vocab_mismatch(format!(
                "segmenter vocabulary lists {} input features, encoder produces {}",
                vocab.input.len(),
                char_feature_dim()
            )));
        }
        if vocab.output != PhemTag::NAMES {
            return Err(XmorphyError::vocab_mismatch(
                "segmenter label vocabulary must be PREF/ROOT/SUFF/END/UNKN",
            ));
        }
        let model =
            ScoringModel::from_safetensors(weights, char_feature_dim(), PhemTag::ALL.len())?;
        Ok(Self { model })
    }

    /// Создаёт сегментатор со свежей моделью.
    pub fn with_init() -> Result<Self> {
        Ok(Self {
            model: ScoringModel::with_init(
                char_feature_dim(),
                DEFAULT_HIDDEN,
                PhemTag::ALL.len(),
            )?,
        })
    }

    /// Размечает морфемы слова.
    ///
    /// Форма получает список меток той же длины, что и слово. Токены,
    /// не являющиеся кириллическими словами, размечаются UNKN целиком.
    pub fn segment(&self, form: &mut WordForm, dict: &Dictionary) -> Result<()> {
        let n = form.norm.len();
        if n == 0 {
            form.phem = vec![];
            return Ok(());
        }
        if !form.is_word() || !form.is_cyrillic() {
            form.phem = vec![PhemTag::Unknown; n];
            return Ok(());
        }

        let winning = form.infos.first();
        let rows: Vec<Vec<f32>> = (0..n)
            .map(|i| char_features(&form.norm, i, winning, dict))
            .collect();
        let scores = self.model.score(&rows)?;

        let raw: Vec<PhemTag> = scores
            .iter()
            .map(|row| {
                let mut best = 0usize;
                for (i, &s) in row.iter().enumerate() {
                    if s > row[best] {
                        best = i;
                    }
                }
                PhemTag::ALL[best]
            })
            .collect();

        form.phem = repair(&raw);
        Ok(())
    }
}

/// Приводит сырую разметку к грамматике `PREFIX* ROOT+ SUFFIX* ENDING*`.
///
/// Ремонт — динамическое программирование по монотонным фазам,
/// максимизирующее число сохранённых клеток. Неремонтируемые слова
/// (без корня в сырой разметке либо с ремонтом больше половины клеток)
/// целиком получают UNKN.
pub(crate) fn repair(raw: &[PhemTag]) -> Vec<PhemTag> {
    let n = raw.len();
    if n == 0 {
        return vec![];
    }
    if !raw.contains(&PhemTag::Root) {
        return vec![PhemTag::Unknown; n];
    }
    if legal(raw) {
        return raw.to_vec();
    }

    // best[p][r]: максимум совпадений после очередной клетки, находясь в
    // фазе p; r — встречался ли уже корень. parent восстанавливает путь.
    const NEG: i32 = i32::MIN / 2;
    let mut best = [[NEG; 2]; 4];
    // Позиция 0: допустим старт с любой фазы.
    let mut parents: Vec<[[Option<(usize, usize)>; 2]; 4]> = Vec::with_capacity(n);

    for (i, &label) in raw.iter().enumerate() {
        let mut next = [[NEG; 2]; 4];
        let mut parent = [[None; 2]; 4];
        for (q, &phase_label) in PHASES.iter().enumerate() {
            let gain = (label == phase_label) as i32;
            let root_here = phase_label == PhemTag::Root;
            if i == 0 {
                let r = usize::from(root_here);
                if gain > next[q][r] {
                    next[q][r] = gain;
                }
                continue;
            }
            for p in 0..=q {
                for r in 0..2 {
                    if best[p][r] == NEG {
                        continue;
                    }
                    let nr = usize::from(r == 1 || root_here);
                    let cand = best[p][r] + gain;
                    if cand > next[q][nr] {
                        next[q][nr] = cand;
                        parent[q][nr] = Some((p, r));
                    }
                }
            }
        }
        parents.push(parent);
        best = next;
    }

    let mut end = None;
    let mut matches = NEG;
    for q in 0..4 {
        if best[q][1] > matches {
            matches = best[q][1];
            end = Some(q);
        }
    }
    let Some(mut q) = end else {
        return vec![PhemTag::Unknown; n];
    };

    let changes = n as i32 - matches;
    if changes * 2 > n as i32 {
        return vec![PhemTag::Unknown; n];
    }

    let mut labels = vec![PhemTag::Unknown; n];
    let mut r = 1usize;
    for i in (0..n).rev() {
        labels[i] = PHASES[q];
        if i > 0 {
            let Some((pq, pr)) = parents[i][q][r] else {
                return vec![PhemTag::Unknown; n];
            };
            q = pq;
            r = pr;
        }
    }
    labels
}

/// Проверяет, что разметка удовлетворяет `PREFIX* ROOT+ SUFFIX* ENDING*`.
pub(crate) fn legal(labels: &[PhemTag]) -> bool {
    if labels.is_empty() {
        return true;
    }
    let mut phase = 0usize;
    let mut root_seen = false;
    for &label in labels {
        let Some(q) = PHASES.iter().position(|&p| p == label) else {
            return false;
        };
        if q < phase {
            return false;
        }
        phase = q;
        root_seen |= label == PhemTag::Root;
    }
    root_seen
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chars::UniString;
    use crate::test_utils::small_dictionary;
    use crate::tokenizer::TokenKind;

    use PhemTag::{Ending, Prefix, Root, Suffix, Unknown};

    #[test]
    fn test_legal() {
        assert!(legal(&[Root]));
        assert!(legal(&[Prefix, Root, Suffix, Ending]));
        assert!(legal(&[Prefix, Prefix, Root, Root, Ending]));
        assert!(!legal(&[Prefix, Suffix]));
        assert!(!legal(&[Root, Prefix]));
        assert!(!legal(&[Suffix, Root]));
        assert!(!legal(&[Unknown]));
    }

    #[test]
    fn test_repair_keeps_legal() {
        let seq = [Prefix, Root, Root, Suffix, Ending];
        assert_eq!(repair(&seq), seq.to_vec());
    }

    #[test]
    fn test_repair_single_deviation() {
        // One out-of-order cell is reassigned to the nearest legal phase.
        let seq = [Root, Root, Prefix, Suffix, Ending];
        let fixed = repair(&seq);
        assert!(legal(&fixed));
        // Only the deviant cell changes.
        let changed = seq
            .iter()
            .zip(&fixed)
            .filter(|(a, b)| a != b)
            .count();
        assert_eq!(changed, 1);
    }

    #[test]
    fn test_repair_no_root() {
        let seq = [Prefix, Suffix, Ending];
        assert_eq!(repair(&seq), vec![Unknown; 3]);
    }

    #[test]
    fn test_repair_too_broken() {
        // A mostly-unknown labelling is not worth repairing.
        let seq = [Unknown, Unknown, Unknown, Unknown, Root];
        let fixed = repair(&seq);
        assert_eq!(fixed, vec![Unknown; 5]);
    }

    #[test]
    fn test_segment_produces_legal_labels() {
        let dict = small_dictionary();
        let segmenter = Segmenter::with_init().unwrap();
        for text in ["переподготовка", "столы", "гуглить"] {
            let mut form = WordForm::new(text.to_string(), TokenKind::Word, 0..text.len());
            form.infos = crate::analyzer::MorphAnalyzer::new(&dict)
                .analyze(&UniString::from_str(text));
            segmenter.segment(&mut form, &dict).unwrap();
            assert_eq!(form.phem.len(), form.norm.len());
            assert!(
                legal(&form.phem) || form.phem.iter().all(|&t| t == Unknown),
                "illegal labelling {:?} for {}",
                form.phem,
                text
            );
        }
    }

    #[test]
    fn test_segment_non_word() {
        let dict = small_dictionary();
        let segmenter = Segmenter::with_init().unwrap();
        let mut form = WordForm::new("123".to_string(), TokenKind::Numb, 0..3);
        segmenter.segment(&mut form, &dict).unwrap();
        assert_eq!(form.phem, vec![Unknown; 3]);
    }
}
