//! Юникодный слой: графемы и неизменяемые строки.
//!
//! Этот модуль предоставляет тип [`Char`] — нормализованный пользовательский
//! символ — и [`UniString`] — неизменяемую последовательность таких символов
//! со срезами, конкатенацией и преобразованием регистра. Сравнение символов
//! ведётся по кодовым точкам нормализованной формы, без локализованных
//! правил.

use std::fmt;
use std::hash::{Hash, Hasher};

/// Фиксированное множество русских гласных (в верхнем регистре).
const VOWELS: &[char] = &['А', 'Е', 'Ё', 'И', 'О', 'У', 'Ы', 'Э', 'Ю', 'Я'];

/// Нормализованный пользовательский символ.
///
/// Символ хранится одной скалярной величиной; декомпозированные
/// последовательности (базовая буква плюс комбинируемый диакритик) при
/// разборе склеиваются в прекомпозированную букву, если таковая существует.
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Char(char);

impl Char {
    /// Создаёт символ из скалярного значения без нормализации.
    #[inline(always)]
    pub const fn new(c: char) -> Self {
        Self(c)
    }

    /// Возвращает скалярное значение символа.
    #[inline(always)]
    pub const fn get(self) -> char {
        self.0
    }

    /// Переводит символ в верхний регистр (простое преобразование).
    #[inline]
    pub fn to_upper(self) -> Self {
        // Simple one-to-one uppercasing is sufficient for Cyrillic.
        let mut it = self.0.to_uppercase();
        let up = it.next().unwrap_or(self.0);
        if it.next().is_some() {
            return Self(self.0);
        }
        Self(up)
    }

    /// Переводит символ в нижний регистр (простое преобразование).
    #[inline]
    pub fn to_lower(self) -> Self {
        let mut it = self.0.to_lowercase();
        let low = it.next().unwrap_or(self.0);
        if it.next().is_some() {
            return Self(self.0);
        }
        Self(low)
    }

    /// Проверяет принадлежность фиксированному множеству русских гласных.
    #[inline]
    pub fn is_vowel(self) -> bool {
        VOWELS.contains(&self.to_upper().0)
    }

    /// Проверяет, является ли символ буквой кириллицы.
    #[inline]
    pub fn is_cyrillic(self) -> bool {
        matches!(self.0, '\u{0400}'..='\u{04FF}' | '\u{0500}'..='\u{052F}')
    }

    /// Проверяет, является ли символ буквой.
    #[inline]
    pub fn is_alphabetic(self) -> bool {
        self.0.is_alphabetic()
    }

    /// Склеивает базовый символ с комбинируемым диакритиком.
    ///
    /// Покрывает прекомпозиции, встречающиеся в русском тексте; прочие
    /// диакритики отбрасываются.
    fn compose(base: char, mark: char) -> char {
        match (base, mark) {
            ('е', '\u{0308}') => 'ё',
            ('Е', '\u{0308}') => 'Ё',
            ('и', '\u{0306}') => 'й',
            ('И', '\u{0306}') => 'Й',
            _ => base,
        }
    }
}

impl fmt::Debug for Char {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Char({:?})", self.0)
    }
}

impl fmt::Display for Char {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<char> for Char {
    #[inline(always)]
    fn from(c: char) -> Self {
        Self(c)
    }
}

/// Проверяет, является ли скаляр комбинируемым диакритиком.
#[inline]
fn is_combining_mark(c: char) -> bool {
    matches!(c, '\u{0300}'..='\u{036F}')
}

/// Неизменяемая последовательность символов [`Char`].
///
/// Значение с семантикой владения: операции среза и конкатенации возвращают
/// новые строки. Хеш вычисляется как комбинированный хеш элементов по
/// порядку.
#[derive(Clone, Default, Eq, PartialEq, Ord, PartialOrd)]
pub struct UniString {
    chars: Vec<Char>,
}

impl UniString {
    /// Создаёт пустую строку.
    #[inline(always)]
    pub const fn new() -> Self {
        Self { chars: Vec::new() }
    }

    /// Разбирает строку UTF-8 в последовательность графем.
    ///
    /// Базовый символ и следующие за ним комбинируемые диакритики образуют
    /// одну графему; прекомпозируемые пары склеиваются.
    pub fn from_str(s: &str) -> Self {
        let mut chars: Vec<Char> = Vec::with_capacity(s.len());
        for c in s.chars() {
            if is_combining_mark(c) {
                if let Some(last) = chars.last_mut() {
                    *last = Char::new(Char::compose(last.get(), c));
                    continue;
                }
                continue;
            }
            chars.push(Char::new(c));
        }
        Self { chars }
    }

    /// Создаёт строку из готового вектора символов.
    #[inline(always)]
    pub fn from_chars(chars: Vec<Char>) -> Self {
        Self { chars }
    }

    /// Длина строки в графемах.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    /// Проверяет, пуста ли строка.
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// Возвращает символ по индексу.
    #[inline(always)]
    pub fn get(&self, i: usize) -> Option<Char> {
        self.chars.get(i).copied()
    }

    /// Возвращает срез символов.
    #[inline(always)]
    pub fn chars(&self) -> &[Char] {
        &self.chars
    }

    /// Возвращает подстроку `[start, end)`.
    ///
    /// Выход за границы обрезается до длины строки.
    pub fn substring(&self, start: usize, end: usize) -> Self {
        let end = end.min(self.chars.len());
        if start >= end {
            return Self::new();
        }
        Self {
            chars: self.chars[start..end].to_vec(),
        }
    }

    /// Отрезает `n` символов слева.
    #[inline]
    pub fn cut_left(&self, n: usize) -> Self {
        self.substring(n, self.chars.len())
    }

    /// Отрезает `n` символов справа.
    #[inline]
    pub fn cut_right(&self, n: usize) -> Self {
        if n > self.chars.len() {
            return Self::new();
        }
        self.substring(0, self.chars.len() - n)
    }

    /// Возвращает суффикс из последних `n` символов.
    #[inline]
    pub fn suffix(&self, n: usize) -> Self {
        let n = n.min(self.chars.len());
        self.substring(self.chars.len() - n, self.chars.len())
    }

    /// Конкатенация двух строк.
    pub fn concat(&self, other: &Self) -> Self {
        let mut chars = Vec::with_capacity(self.chars.len() + other.chars.len());
        chars.extend_from_slice(&self.chars);
        chars.extend_from_slice(&other.chars);
        Self { chars }
    }

    /// Разбивает строку по символу-разделителю.
    pub fn split(&self, sep: Char) -> Vec<Self> {
        let mut parts = vec![];
        let mut current = vec![];
        for &c in &self.chars {
            if c == sep {
                parts.push(Self {
                    chars: std::mem::take(&mut current),
                });
            } else {
                current.push(c);
            }
        }
        parts.push(Self { chars: current });
        parts
    }

    /// Переводит строку в верхний регистр.
    pub fn to_upper(&self) -> Self {
        Self {
            chars: self.chars.iter().map(|c| c.to_upper()).collect(),
        }
    }

    /// Переводит строку в нижний регистр.
    pub fn to_lower(&self) -> Self {
        Self {
            chars: self.chars.iter().map(|c| c.to_lower()).collect(),
        }
    }

    /// Возвращает строку с символами в обратном порядке.
    pub fn reversed(&self) -> Self {
        let mut chars = self.chars.clone();
        chars.reverse();
        Self { chars }
    }

    /// Проверяет, начинается ли строка с указанного префикса.
    pub fn starts_with(&self, prefix: &Self) -> bool {
        self.chars.len() >= prefix.chars.len() && self.chars[..prefix.chars.len()] == prefix.chars
    }

    /// Проверяет, заканчивается ли строка указанным суффиксом.
    pub fn ends_with(&self, suffix: &Self) -> bool {
        self.chars.len() >= suffix.chars.len()
            && self.chars[self.chars.len() - suffix.chars.len()..] == suffix.chars
    }

    /// Проверяет, содержит ли строка указанный символ.
    #[inline]
    pub fn contains(&self, c: Char) -> bool {
        self.chars.contains(&c)
    }
}

impl Hash for UniString {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for c in &self.chars {
            c.hash(state);
        }
    }
}

impl fmt::Display for UniString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in &self.chars {
            write!(f, "{}", c.get())?;
        }
        Ok(())
    }
}

impl fmt::Debug for UniString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UniString({:?})", self.to_string())
    }
}

impl From<&str> for UniString {
    #[inline(always)]
    fn from(s: &str) -> Self {
        Self::from_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_folding() {
        let s = UniString::from_str("стол");
        assert_eq!(s.to_upper().to_string(), "СТОЛ");
        assert_eq!(s.to_upper().to_lower().to_string(), "стол");
    }

    #[test]
    fn test_vowels() {
        assert!(Char::new('а').is_vowel());
        assert!(Char::new('Ё').is_vowel());
        assert!(!Char::new('т').is_vowel());
        assert!(!Char::new('-').is_vowel());
    }

    #[test]
    fn test_compose_combining() {
        // е + combining diaeresis must fold into the precomposed letter.
        let s = UniString::from_str("е\u{0308}ж");
        assert_eq!(s.len(), 2);
        assert_eq!(s.get(0).unwrap().get(), 'ё');
        assert_eq!(s.to_string(), "ёж");
    }

    #[test]
    fn test_substring_and_cuts() {
        let s = UniString::from_str("ПЕРЕПОДГОТОВКА");
        assert_eq!(s.len(), 14);
        assert_eq!(s.substring(0, 4).to_string(), "ПЕРЕ");
        assert_eq!(s.cut_left(4).to_string(), "ПОДГОТОВКА");
        assert_eq!(s.cut_right(1).to_string(), "ПЕРЕПОДГОТОВК");
        assert_eq!(s.suffix(2).to_string(), "КА");
        assert_eq!(s.substring(10, 100).to_string(), "ОВКА");
    }

    #[test]
    fn test_split() {
        let s = UniString::from_str("ЧТО-ТО");
        let parts = s.split(Char::new('-'));
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].to_string(), "ЧТО");
        assert_eq!(parts[1].to_string(), "ТО");
    }

    #[test]
    fn test_reversed_and_affixes() {
        let s = UniString::from_str("СТОЛЫ");
        assert_eq!(s.reversed().to_string(), "ЫЛОТС");
        assert!(s.starts_with(&UniString::from_str("СТО")));
        assert!(s.ends_with(&UniString::from_str("ЛЫ")));
        assert!(!s.starts_with(&UniString::from_str("СТОЛЫЫ")));
    }

    #[test]
    fn test_hash_equality() {
        use std::collections::hash_map::DefaultHasher;
        let a = UniString::from_str("ДОМ");
        let b = UniString::from_str("ДОМ");
        let mut ha = DefaultHasher::new();
        let mut hb = DefaultHasher::new();
        a.hash(&mut ha);
        b.hash(&mut hb);
        assert_eq!(ha.finish(), hb.finish());
        assert_eq!(a, b);
    }
}
