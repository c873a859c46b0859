//! Морфологические теги.
//!
//! Этот модуль определяет [`MorphTag`] — битовое множество над конечными
//! грамматическими категориями: часть речи, падеж, род, число, время, лицо,
//! вид, наклонение, залог, одушевлённость, плюс бит «неизвестно».
//! Ортогональные биты разных категорий объединяются в составной тег.
//! Равенство — побитовое; для синтеза используется отношение вложенности
//! битов ([`MorphTag::subsumes`]).

use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use std::str::FromStr;

use crate::errors::XmorphyError;

/// Составной морфологический тег: битовое множество в `u64`.
///
/// Раскладка битов фиксирована и одновременно служит форматом сериализации
/// в бинарном словаре.
#[derive(Clone, Copy, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct MorphTag(pub u64);

macro_rules! tags {
    ( $($name:ident = $bit:expr => $repr:expr,)* ) => {
        impl MorphTag {
            $(
                pub const $name: MorphTag = MorphTag(1u64 << $bit);
            )*

            /// Таблица всех именованных битов в каноническом порядке.
            pub(crate) const NAMES: &'static [(MorphTag, &'static str)] = &[
                $( (MorphTag::$name, $repr), )*
            ];
        }
    };
}

tags! {
    // Части речи (инвентарь UniSP).
    X = 0 => "X",
    ADJ = 1 => "ADJ",
    ADV = 2 => "ADV",
    INTJ = 3 => "INTJ",
    NOUN = 4 => "NOUN",
    PROPN = 5 => "PROPN",
    VERB = 6 => "VERB",
    ADP = 7 => "ADP",
    AUX = 8 => "AUX",
    CONJ = 9 => "CONJ",
    SCONJ = 10 => "SCONJ",
    DET = 11 => "DET",
    NUM = 12 => "NUM",
    PART = 13 => "PART",
    PRON = 14 => "PRON",
    PUNCT = 15 => "PUNCT",
    H = 16 => "H",
    R = 17 => "R",
    Q = 18 => "Q",
    SYM = 19 => "SYM",
    // Падеж.
    NOMN = 20 => "nomn",
    GENT = 21 => "gent",
    DATV = 22 => "datv",
    ACCS = 23 => "accs",
    ABLT = 24 => "ablt",
    LOCT = 25 => "loct",
    VOCT = 26 => "voct",
    // Род.
    MASC = 27 => "masc",
    FEMN = 28 => "femn",
    NEUT = 29 => "neut",
    // Число.
    SING = 30 => "sing",
    PLUR = 31 => "plur",
    // Время.
    PRES = 32 => "pres",
    PAST = 33 => "past",
    FUTR = 34 => "futr",
    // Лицо.
    PER1 = 35 => "1per",
    PER2 = 36 => "2per",
    PER3 = 37 => "3per",
    // Вид.
    PERF = 38 => "perf",
    IMPF = 39 => "impf",
    // Наклонение.
    INDC = 40 => "indc",
    IMPR = 41 => "impr",
    // Залог.
    ACTV = 42 => "actv",
    PSSV = 43 => "pssv",
    // Одушевлённость.
    ANIM = 44 => "anim",
    INAN = 45 => "inan",
    // Неизвестный разбор.
    UNKN = 63 => "UNKN",
}

impl MorphTag {
    /// Пустой тег.
    pub const EMPTY: MorphTag = MorphTag(0);

    /// Маска битов части речи.
    pub const POS_MASK: MorphTag = MorphTag((1u64 << 20) - 1);
    /// Маска битов падежа.
    pub const CASE_MASK: MorphTag = MorphTag(0x7f << 20);
    /// Маска битов рода.
    pub const GENDER_MASK: MorphTag = MorphTag(0x7 << 27);
    /// Маска битов числа.
    pub const NUMBER_MASK: MorphTag = MorphTag(0x3 << 30);
    /// Маска битов времени.
    pub const TENSE_MASK: MorphTag = MorphTag(0x7 << 32);
    /// Маска битов лица.
    pub const PERSON_MASK: MorphTag = MorphTag(0x7 << 35);
    /// Маска битов вида.
    pub const ASPECT_MASK: MorphTag = MorphTag(0x3 << 38);
    /// Маска битов наклонения.
    pub const MOOD_MASK: MorphTag = MorphTag(0x3 << 40);
    /// Маска битов залога.
    pub const VOICE_MASK: MorphTag = MorphTag(0x3 << 42);
    /// Маска битов одушевлённости.
    pub const ANIMACY_MASK: MorphTag = MorphTag(0x3 << 44);

    /// Создаёт тег из сырого битового значения.
    #[inline(always)]
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    /// Возвращает сырое битовое значение.
    #[inline(always)]
    pub const fn bits(self) -> u64 {
        self.0
    }

    /// Проверяет, что тег пуст.
    #[inline(always)]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Проверяет, что тег помечен как неизвестный.
    #[inline(always)]
    pub const fn is_unknown(self) -> bool {
        self.0 & Self::UNKN.0 != 0
    }

    /// Проверяет вложенность: все биты `self` присутствуют в `other`.
    ///
    /// Используется синтезом для отбора совместимых форм.
    #[inline(always)]
    pub const fn subsumes(self, other: Self) -> bool {
        self.0 & other.0 == self.0
    }

    /// Пересечение двух тегов.
    #[inline(always)]
    pub const fn intersect(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    /// Часть речи тега (биты остальных категорий сброшены).
    #[inline(always)]
    pub const fn pos(self) -> Self {
        self.intersect(Self::POS_MASK)
    }

    /// Падеж тега.
    #[inline(always)]
    pub const fn case(self) -> Self {
        self.intersect(Self::CASE_MASK)
    }

    /// Род тега.
    #[inline(always)]
    pub const fn gender(self) -> Self {
        self.intersect(Self::GENDER_MASK)
    }

    /// Число тега.
    #[inline(always)]
    pub const fn number(self) -> Self {
        self.intersect(Self::NUMBER_MASK)
    }

    /// Время тега.
    #[inline(always)]
    pub const fn tense(self) -> Self {
        self.intersect(Self::TENSE_MASK)
    }

    /// Порядковый номер младшего установленного бита внутри маски.
    ///
    /// Возвращает `None`, если в пределах маски не установлено ни одного
    /// бита. Используется унитарным кодированием признаков.
    pub fn index_in(self, mask: Self) -> Option<usize> {
        let masked = self.0 & mask.0;
        if masked == 0 {
            return None;
        }
        let lowest = masked.trailing_zeros();
        let below = mask.0 & ((1u64 << lowest) - 1);
        Some(below.count_ones() as usize)
    }

    /// Число именованных значений внутри маски.
    pub const fn arity(mask: Self) -> usize {
        mask.0.count_ones() as usize
    }
}

impl BitOr for MorphTag {
    type Output = MorphTag;

    #[inline(always)]
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for MorphTag {
    #[inline(always)]
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for MorphTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "_");
        }
        let mut first = true;
        for &(bit, name) in Self::NAMES {
            if self.0 & bit.0 != 0 {
                if !first {
                    write!(f, "|")?;
                }
                write!(f, "{}", name)?;
                first = false;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for MorphTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MorphTag({})", self)
    }
}

impl FromStr for MorphTag {
    type Err = XmorphyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "_" || s.is_empty() {
            return Ok(Self::EMPTY);
        }
        let mut tag = Self::EMPTY;
        'grammeme: for part in s.split('|') {
            for &(bit, name) in Self::NAMES {
                if name == part {
                    tag |= bit;
                    continue 'grammeme;
                }
            }
            return Err(XmorphyError::invalid_format(
                "tag",
                format!("Unknown grammeme: {:?}", part),
            ));
        }
        Ok(tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compose_and_subsume() {
        let tag = MorphTag::NOUN | MorphTag::MASC | MorphTag::SING | MorphTag::NOMN;
        assert!(MorphTag::NOUN.subsumes(tag));
        assert!((MorphTag::NOUN | MorphTag::SING).subsumes(tag));
        assert!(!(MorphTag::NOUN | MorphTag::PLUR).subsumes(tag));
        assert!(MorphTag::EMPTY.subsumes(tag));
    }

    #[test]
    fn test_category_extraction() {
        let tag = MorphTag::VERB | MorphTag::PAST | MorphTag::SING | MorphTag::MASC;
        assert_eq!(tag.pos(), MorphTag::VERB);
        assert_eq!(tag.tense(), MorphTag::PAST);
        assert_eq!(tag.number(), MorphTag::SING);
        assert_eq!(tag.case(), MorphTag::EMPTY);
    }

    #[test]
    fn test_display_roundtrip() {
        let tag = MorphTag::NOUN | MorphTag::PLUR | MorphTag::DATV;
        let s = tag.to_string();
        assert_eq!(s, "NOUN|datv|plur");
        assert_eq!(s.parse::<MorphTag>().unwrap(), tag);
        assert_eq!("_".parse::<MorphTag>().unwrap(), MorphTag::EMPTY);
        assert!("NOUN|bogus".parse::<MorphTag>().is_err());
    }

    #[test]
    fn test_index_in_mask() {
        assert_eq!(MorphTag::X.index_in(MorphTag::POS_MASK), Some(0));
        assert_eq!(MorphTag::NOUN.index_in(MorphTag::POS_MASK), Some(4));
        assert_eq!(MorphTag::SYM.index_in(MorphTag::POS_MASK), Some(19));
        assert_eq!(MorphTag::NOMN.index_in(MorphTag::CASE_MASK), Some(0));
        assert_eq!(MorphTag::VOCT.index_in(MorphTag::CASE_MASK), Some(6));
        assert_eq!(MorphTag::NOUN.index_in(MorphTag::CASE_MASK), None);
        assert_eq!(MorphTag::arity(MorphTag::POS_MASK), 20);
        assert_eq!(MorphTag::arity(MorphTag::CASE_MASK), 7);
    }

    #[test]
    fn test_unknown_bit() {
        assert!(MorphTag::UNKN.is_unknown());
        assert!(!(MorphTag::NOUN | MorphTag::SING).is_unknown());
    }
}
