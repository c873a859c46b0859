//! Нейронный дизамбигуатор последовательности.
//!
//! Оборачивает предобученную модель прямого распространения над оконными
//! признаками токенов. Для каждого токена вектор оценок пересекается с
//! кандидатными тегами словарного анализатора; победитель — аргмакс по
//! пересечению, ничьи разрешаются словарной частотой, затем битовым
//! порядком тега. При пустом пересечении остаётся ранжирование по
//! априорным вероятностям кандидатов. Выбранный тег всегда принадлежит
//! непустому множеству кандидатов.

use std::path::Path;

use hashbrown::HashMap;

use crate::errors::{Result, XmorphyError};
use crate::ml::embeddings::Embeddings;
use crate::ml::features::{token_features, window_features, HAND_DIM, TOKEN_WINDOW};
use crate::ml::model::{ModelVocab, ScoringModel, DEFAULT_HIDDEN};
use crate::tag::MorphTag;
use crate::wordform::WordForm;

/// Нейронный дизамбигуатор.
pub struct Disambiguator {
    model: ScoringModel,
    tags: Vec<MorphTag>,
    tag_index: HashMap<u64, usize>,
    token_dim: usize,
}

impl Disambiguator {
    /// Загружает дизамбигуатор из весов safetensors и бокового словаря.
    ///
    /// # Ошибки
    ///
    /// - [`XmorphyError::CorruptModel`] — файл весов не читается;
    /// - [`XmorphyError::VocabMismatch`] — словарь признаков не согласован с
    ///   размерностью эмбеддингов либо словарь тегов не разбирается.
    pub fn from_files<P: AsRef<Path>, Q: AsRef<Path>>(
        weights: P,
        vocab: Q,
        emb_dim: usize,
    ) -> Result<Self> {
        let vocab = ModelVocab::from_path(vocab)?;
        let token_dim = emb_dim + HAND_DIM;
        if vocab.input.len() != token_dim {
            return Err(XmorphyError::vocab_mismatch(format!(
                "disambiguator vocabulary lists {} input features, encoder produces {}",
                vocab.input.len(),
                token_dim
            )));
        }
        let tags = parse_tags(&vocab.output)?;
        let model =
            ScoringModel::from_safetensors(weights, TOKEN_WINDOW * token_dim, tags.len())?;
        Ok(Self::assemble(model, tags, token_dim))
    }

    /// Создаёт дизамбигуатор со свежей моделью над заданным словарём тегов.
    pub fn with_tags(tags: Vec<MorphTag>, emb_dim: usize) -> Result<Self> {
        if tags.is_empty() {
            return Err(XmorphyError::invalid_argument(
                "tags",
                "the tag universe must be non-empty",
            ));
        }
        let token_dim = emb_dim + HAND_DIM;
        let model =
            ScoringModel::with_init(TOKEN_WINDOW * token_dim, DEFAULT_HIDDEN, tags.len())?;
        Ok(Self::assemble(model, tags, token_dim))
    }

    fn assemble(model: ScoringModel, tags: Vec<MorphTag>, token_dim: usize) -> Self {
        let tag_index = tags
            .iter()
            .enumerate()
            .map(|(i, t)| (t.bits(), i))
            .collect();
        Self {
            model,
            tags,
            tag_index,
            token_dim,
        }
    }

    /// Вселенная тегов модели.
    #[inline(always)]
    pub fn tags(&self) -> &[MorphTag] {
        &self.tags
    }

    /// Выбирает наиболее вероятную интерпретацию каждого слова предложения.
    ///
    /// Интерпретации переупорядочиваются так, что победитель оказывается
    /// первым; вероятности пересчитываются по softmax оценок пересечения.
    pub fn disambiguate(
        &self,
        sentence: &mut [WordForm],
        embeddings: &Embeddings,
    ) -> Result<()> {
        let word_indices: Vec<usize> = sentence
            .iter()
            .enumerate()
            .filter(|(_, f)| f.is_word() && !f.infos.is_empty())
            .map(|(i, _)| i)
            .collect();
        if word_indices.is_empty() {
            return Ok(());
        }

        let token_rows: Vec<Vec<f32>> = word_indices
            .iter()
            .map(|&i| token_features(&sentence[i], embeddings))
            .collect();
        let rows: Vec<Vec<f32>> = (0..token_rows.len())
            .map(|i| window_features(&token_rows, i, self.token_dim))
            .collect();
        let scores = self.model.score(&rows)?;

        for (pos, &form_idx) in word_indices.iter().enumerate() {
            let form = &mut sentence[form_idx];
            if form.infos.len() < 2 {
                continue;
            }
            self.rerank(form, &scores[pos]);
        }
        Ok(())
    }

    /// Переранжирует кандидатов одного токена по оценкам модели.
    fn rerank(&self, form: &mut WordForm, scores: &[f32]) {
        // The intersection of the model's tag universe with the candidates.
        let matched: Vec<(usize, f32)> = form
            .infos
            .iter()
            .enumerate()
            .filter_map(|(i, info)| {
                self.tag_index
                    .get(&info.tag.bits())
                    .map(|&t| (i, scores[t]))
            })
            .collect();
        if matched.is_empty() {
            // Fall back to the candidate priors which are already in place.
            form.sort_infos();
            return;
        }

        let max_score = matched
            .iter()
            .map(|&(_, s)| s)
            .fold(f32::NEG_INFINITY, f32::max);
        let mut total = 0.0f32;
        let mut soft: Vec<(usize, f32)> = matched
            .iter()
            .map(|&(i, s)| {
                let e = (s - max_score).exp();
                total += e;
                (i, e)
            })
            .collect();
        for (_, e) in &mut soft {
            *e /= total;
        }

        // The dictionary frequency (the prior) breaks exact score ties;
        // blending a small fraction of it keeps the ordering deterministic
        // without letting it override the model.
        for (i, p) in soft {
            let prior = form.infos[i].prob;
            form.infos[i].prob = p + prior * 1e-3;
        }
        for (i, info) in form.infos.iter_mut().enumerate() {
            if !matched.iter().any(|&(m, _)| m == i) {
                info.prob = 0.0;
            }
        }
        form.sort_infos();

        // Re-normalize so probabilities stay a distribution.
        let total: f32 = form.infos.iter().map(|i| i.prob).sum();
        if total > 0.0 {
            for info in &mut form.infos {
                info.prob /= total;
            }
        }
    }
}

/// Разбирает словарь тегов модели.
fn parse_tags(output: &[String]) -> Result<Vec<MorphTag>> {
    let mut tags = Vec::with_capacity(output.len());
    for s in output {
        let tag: MorphTag = s.parse().map_err(|_| {
            XmorphyError::vocab_mismatch(format!("unparsable tag {:?} in the model vocabulary", s))
        })?;
        tags.push(tag);
    }
    if tags.is_empty() {
        return Err(XmorphyError::vocab_mismatch(
            "the model tag vocabulary is empty",
        ));
    }
    Ok(tags)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::MorphAnalyzer;
    use crate::chars::UniString;
    use crate::test_utils::small_dictionary;
    use crate::tokenizer::TokenKind;

    fn make_form(dict: &crate::dictionary::Dictionary, text: &str) -> WordForm {
        let analyzer = MorphAnalyzer::new(dict);
        let mut form = WordForm::new(text.to_string(), TokenKind::Word, 0..text.len());
        form.infos = analyzer.analyze(&UniString::from_str(text));
        form
    }

    fn tag_universe(dict: &crate::dictionary::Dictionary) -> Vec<MorphTag> {
        let paradigms = dict.paradigms();
        let mut tags = vec![];
        for pid in 0..paradigms.num_paradigms() as u32 {
            let len = paradigms.len(pid).unwrap();
            for idx in 0..len {
                let tag = paradigms.record(pid, idx).unwrap().tag;
                if !tags.contains(&tag) {
                    tags.push(tag);
                }
            }
        }
        tags
    }

    #[test]
    fn test_monotonicity() {
        // The chosen tag must always be one of the analyzer's candidates.
        let dict = small_dictionary();
        let embeddings = Embeddings::with_dim(16, 32);
        let disambiguator = Disambiguator::with_tags(tag_universe(&dict), 16).unwrap();

        let mut sentence = vec![
            make_form(&dict, "столы"),
            make_form(&dict, "варит"),
            make_form(&dict, "котам"),
        ];
        let candidates: Vec<Vec<u64>> = sentence
            .iter()
            .map(|f| f.infos.iter().map(|i| i.tag.bits()).collect())
            .collect();

        disambiguator
            .disambiguate(&mut sentence, &embeddings)
            .unwrap();

        for (form, tags) in sentence.iter().zip(candidates) {
            let chosen = form.best().unwrap().tag.bits();
            assert!(tags.contains(&chosen));
        }
    }

    #[test]
    fn test_probabilities_are_distribution() {
        let dict = small_dictionary();
        let embeddings = Embeddings::with_dim(16, 32);
        let disambiguator = Disambiguator::with_tags(tag_universe(&dict), 16).unwrap();

        let mut sentence = vec![make_form(&dict, "стола")];
        disambiguator
            .disambiguate(&mut sentence, &embeddings)
            .unwrap();
        let total: f32 = sentence[0].infos.iter().map(|i| i.prob).sum();
        assert!((total - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_empty_intersection_keeps_priors() {
        let dict = small_dictionary();
        let embeddings = Embeddings::with_dim(16, 32);
        // A universe disjoint from every dictionary tag.
        let disambiguator =
            Disambiguator::with_tags(vec![MorphTag::INTJ, MorphTag::SYM], 16).unwrap();

        let mut sentence = vec![make_form(&dict, "столы")];
        let before: Vec<u64> = sentence[0].infos.iter().map(|i| i.tag.bits()).collect();
        disambiguator
            .disambiguate(&mut sentence, &embeddings)
            .unwrap();
        let after: Vec<u64> = sentence[0].infos.iter().map(|i| i.tag.bits()).collect();
        assert_eq!(before.len(), after.len());
        assert!(before.contains(&sentence[0].best().unwrap().tag.bits()));
    }

    #[test]
    fn test_bad_vocab_tag() {
        let result = parse_tags(&["NOUN|nomn".to_string(), "BOGUS".to_string()]);
        assert!(matches!(result, Err(XmorphyError::VocabMismatch(_))));
    }
}
