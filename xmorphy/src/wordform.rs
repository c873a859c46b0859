//! Контейнеры результатов анализа.
//!
//! [`WordForm`] создаётся токенизатором, заполняется анализатором и
//! дизамбигуатором, после чего доступен только для чтения. Каждая
//! кандидатная интерпретация — [`MorphInfo`]; после сегментации форма
//! несёт параллельный список меток морфем той же длины, что и слово.

use std::fmt;
use std::ops::Range;

use crate::chars::UniString;
use crate::tag::MorphTag;
use crate::tokenizer::TokenKind;

/// Происхождение интерпретации.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum InfoSource {
    /// Найдена в основном словаре.
    Dictionary,
    /// Предложена предсказателем по суффиксу.
    Guesser,
    /// Заглушка для слова без разборов.
    Unknown,
}

/// Кандидатная морфологическая интерпретация поверхностной формы.
#[derive(Debug, Clone)]
pub struct MorphInfo {
    /// Лемма (начальная форма).
    pub lemma: UniString,
    /// Составной морфологический тег.
    pub tag: MorphTag,
    /// Вероятность интерпретации в контексте.
    pub prob: f32,
    /// Id парадигмы в словаре.
    pub paradigm_id: u32,
    /// Индекс формы внутри парадигмы.
    pub form_idx: u16,
    /// Длина основы поверхностной формы.
    pub stem_len: u16,
    /// Происхождение интерпретации.
    pub source: InfoSource,
}

impl MorphInfo {
    /// Интерпретация-заглушка для слова без разборов.
    pub fn unknown(surface: &UniString) -> Self {
        Self {
            lemma: surface.clone(),
            tag: MorphTag::UNKN,
            prob: 1.0,
            paradigm_id: u32::MAX,
            form_idx: 0,
            stem_len: surface.len() as u16,
            source: InfoSource::Unknown,
        }
    }

    /// Детерминированный порядок интерпретаций: по убыванию вероятности,
    /// далее по битовому порядку тега, далее по лемме.
    pub fn order(a: &Self, b: &Self) -> std::cmp::Ordering {
        b.prob
            .partial_cmp(&a.prob)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.tag.bits().cmp(&b.tag.bits()))
            .then_with(|| a.lemma.cmp(&b.lemma))
    }
}

/// Метка морфемы для одного символа слова.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Default)]
pub enum PhemTag {
    /// Приставка.
    Prefix,
    /// Корень.
    Root,
    /// Суффикс.
    Suffix,
    /// Окончание.
    Ending,
    /// Разметка неизвестна.
    #[default]
    Unknown,
}

impl PhemTag {
    /// Имена меток в порядке выхода модели сегментации.
    pub const NAMES: &'static [&'static str] = &["PREF", "ROOT", "SUFF", "END", "UNKN"];

    /// Все метки в порядке выхода модели сегментации.
    pub const ALL: &'static [PhemTag] = &[
        PhemTag::Prefix,
        PhemTag::Root,
        PhemTag::Suffix,
        PhemTag::Ending,
        PhemTag::Unknown,
    ];
}

impl fmt::Display for PhemTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let idx = Self::ALL.iter().position(|t| t == self).unwrap_or(4);
        write!(f, "{}", Self::NAMES[idx])
    }
}

/// Токен с морфологической аннотацией.
#[derive(Debug, Clone)]
pub struct WordForm {
    /// Текст токена в исходном виде.
    pub text: String,
    /// Нормализованная (приведённая к верхнему регистру) форма.
    pub norm: UniString,
    /// Класс токена.
    pub kind: TokenKind,
    /// Байтовый диапазон токена в исходной строке.
    pub range: Range<usize>,
    /// Кандидатные интерпретации в детерминированном порядке.
    pub infos: Vec<MorphInfo>,
    /// Пометки морфем: по одной на символ слова.
    pub phem: Vec<PhemTag>,
}

impl WordForm {
    /// Создаёт форму из сырого токена.
    pub fn new(text: String, kind: TokenKind, range: Range<usize>) -> Self {
        let norm = UniString::from_str(&text).to_upper();
        Self {
            text,
            norm,
            kind,
            range,
            infos: vec![],
            phem: vec![],
        }
    }

    /// Лучшая (наиболее вероятная) интерпретация.
    #[inline]
    pub fn best(&self) -> Option<&MorphInfo> {
        self.infos.first()
    }

    /// Является ли токен словом.
    #[inline(always)]
    pub fn is_word(&self) -> bool {
        self.kind == TokenKind::Word
    }

    /// Содержит ли нормализованная форма хотя бы одну букву кириллицы.
    pub fn is_cyrillic(&self) -> bool {
        self.norm.chars().iter().any(|c| c.is_cyrillic())
    }

    /// Упорядочивает интерпретации детерминированно.
    pub fn sort_infos(&mut self) {
        self.infos.sort_by(MorphInfo::order);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_info() {
        let surface = UniString::from_str("АБРАКАДАБРА");
        let info = MorphInfo::unknown(&surface);
        assert!(info.tag.is_unknown());
        assert_eq!(info.lemma, surface);
        assert_eq!(info.source, InfoSource::Unknown);
    }

    #[test]
    fn test_info_ordering() {
        let surface = UniString::from_str("ДОМ");
        let mut a = MorphInfo::unknown(&surface);
        a.prob = 0.2;
        a.tag = MorphTag::NOUN;
        let mut b = MorphInfo::unknown(&surface);
        b.prob = 0.8;
        b.tag = MorphTag::VERB;
        let mut c = MorphInfo::unknown(&surface);
        c.prob = 0.2;
        c.tag = MorphTag::ADJ;

        let mut infos = vec![a, b, c];
        infos.sort_by(MorphInfo::order);
        assert_eq!(infos[0].tag, MorphTag::VERB);
        // Equal probabilities fall back to the tag bit order.
        assert_eq!(infos[1].tag, MorphTag::ADJ);
        assert_eq!(infos[2].tag, MorphTag::NOUN);
    }

    #[test]
    fn test_wordform_norm() {
        let form = WordForm::new("столы".to_string(), TokenKind::Word, 0..10);
        assert_eq!(form.norm.to_string(), "СТОЛЫ");
        assert!(form.is_word());
        assert!(form.is_cyrillic());

        let latin = WordForm::new("hello".to_string(), TokenKind::Word, 0..5);
        assert!(!latin.is_cyrillic());
    }

    #[test]
    fn test_phem_display() {
        assert_eq!(PhemTag::Prefix.to_string(), "PREF");
        assert_eq!(PhemTag::Unknown.to_string(), "UNKN");
    }
}
