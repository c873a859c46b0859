//! Кодирование признаков для нейронных классификаторов.
//!
//! Для токена строятся две группы признаков: плотный вектор субсловных
//! эмбеддингов и ручные признаки (длина, рисунок капитализации, цифры,
//! дефис, пунктуация, число). Для сегментатора морфем дополнительно
//! кодируются посимвольные признаки: окно символов ±3, гласность, позиция,
//! частотный приор буквы, принадлежность префикса префиксному DAWG, счётчики
//! префиксного и суффиксного DAWG на текущем разрезе и категории победившей
//! интерпретации. Отсутствующий контекст кодируется пустым маркером —
//! нулевым вектором.

use crate::chars::{Char, UniString};
use crate::dictionary::Dictionary;
use crate::ml::embeddings::Embeddings;
use crate::tag::MorphTag;
use crate::tokenizer::TokenKind;
use crate::wordform::{MorphInfo, WordForm};

/// Число ручных признаков токена.
pub const HAND_DIM: usize = 9;

/// Размер окна контекста в токенах.
pub const TOKEN_WINDOW: usize = 3;

/// Размер одностороннего окна символов.
const CHAR_WINDOW: usize = 3;

/// Фиксированный алфавит посимвольных признаков.
pub const ALPHABET: &[char] = &[
    'А', 'Б', 'В', 'Г', 'Д', 'Е', 'Ё', 'Ж', 'З', 'И', 'Й', 'К', 'Л', 'М', 'Н',
    'О', 'П', 'Р', 'С', 'Т', 'У', 'Ф', 'Х', 'Ц', 'Ч', 'Ш', 'Щ', 'Ъ', 'Ы', 'Ь',
    'Э', 'Ю', 'Я', '-',
];

/// Сырые частоты букв русского текста.
///
/// Счётчики исходного частотного словаря; каждая буква встречается ровно
/// один раз.
const LETTER_COUNTS: &[(char, f32)] = &[
    ('О', 109_830.0),
    ('Е', 84_830.0),
    ('А', 79_980.0),
    ('И', 73_670.0),
    ('Н', 67_000.0),
    ('Т', 63_180.0),
    ('С', 54_730.0),
    ('Р', 47_460.0),
    ('В', 45_330.0),
    ('Л', 43_430.0),
    ('К', 34_860.0),
    ('М', 32_030.0),
    ('Д', 29_770.0),
    ('П', 28_040.0),
    ('У', 26_150.0),
    ('Я', 20_010.0),
    ('Ы', 18_980.0),
    ('Ь', 17_350.0),
    ('Г', 16_870.0),
    ('З', 16_410.0),
    ('Б', 15_920.0),
    ('Ч', 14_500.0),
    ('Й', 12_080.0),
    ('Х', 9_660.0),
    ('Ж', 9_400.0),
    ('Ш', 7_180.0),
    ('Ю', 6_390.0),
    ('Ц', 4_860.0),
    ('Щ', 3_610.0),
    ('Э', 3_310.0),
    ('Ф', 2_670.0),
    ('Ъ', 370.0),
    ('Ё', 130.0),
];

const MAX_LETTER_COUNT: f32 = 109_830.0;

/// Индекс символа в фиксированном алфавите.
pub fn char_index(c: Char) -> Option<usize> {
    let upper = c.to_upper().get();
    ALPHABET.iter().position(|&a| a == upper)
}

/// Нормированный частотный приор буквы.
pub fn letter_freq(c: Char) -> f32 {
    let upper = c.to_upper().get();
    LETTER_COUNTS
        .iter()
        .find(|&&(l, _)| l == upper)
        .map(|&(_, count)| count / MAX_LETTER_COUNT)
        .unwrap_or(0.0)
}

/// Ручные признаки токена.
pub fn hand_features(form: &WordForm) -> [f32; HAND_DIM] {
    let mut out = [0.0f32; HAND_DIM];
    let letters: Vec<char> = form.text.chars().filter(|c| c.is_alphabetic()).collect();

    out[0] = (form.norm.len().min(20) as f32) / 20.0;

    let cap = if letters.is_empty() || letters.iter().all(|c| c.is_lowercase()) {
        1
    } else if letters.iter().all(|c| c.is_uppercase()) {
        3
    } else if letters[0].is_uppercase() && letters[1..].iter().all(|c| c.is_lowercase()) {
        2
    } else {
        4
    };
    out[cap] = 1.0;

    out[5] = form.text.chars().any(|c| c.is_numeric()) as u8 as f32;
    out[6] = form.text.contains('-') as u8 as f32;
    out[7] = (form.kind == TokenKind::Pnct) as u8 as f32;
    out[8] = (form.kind == TokenKind::Numb) as u8 as f32;
    out
}

/// Полный вектор признаков токена: эмбеддинг плюс ручные признаки.
pub fn token_features(form: &WordForm, embeddings: &Embeddings) -> Vec<f32> {
    let mut out = embeddings.embed(&form.text);
    out.extend_from_slice(&hand_features(form));
    out
}

/// Имена признаков токена в порядке кодирования.
pub fn token_feature_names(emb_dim: usize) -> Vec<String> {
    let mut names: Vec<String> = (0..emb_dim).map(|i| format!("emb:{}", i)).collect();
    names.extend(
        [
            "len",
            "cap:lower",
            "cap:title",
            "cap:upper",
            "cap:mixed",
            "has_digit",
            "has_hyphen",
            "is_punct",
            "is_number",
        ]
        .iter()
        .map(|s| s.to_string()),
    );
    names
}

/// Оконный вектор позиции: конкатенация соседних токенов с нулевым
/// дополнением по краям.
pub fn window_features(rows: &[Vec<f32>], i: usize, token_dim: usize) -> Vec<f32> {
    let mut out = Vec::with_capacity(TOKEN_WINDOW * token_dim);
    let half = TOKEN_WINDOW / 2;
    for offset in 0..TOKEN_WINDOW {
        let pos = i as isize + offset as isize - half as isize;
        if pos >= 0 && (pos as usize) < rows.len() {
            out.extend_from_slice(&rows[pos as usize]);
        } else {
            out.extend(std::iter::repeat(0.0).take(token_dim));
        }
    }
    out
}

/// Размерность посимвольного вектора признаков.
pub const fn char_feature_dim() -> usize {
    (2 * CHAR_WINDOW + 1) * ALPHABET.len()
        + 6
        + MorphTag::arity(MorphTag::POS_MASK)
        + MorphTag::arity(MorphTag::CASE_MASK)
        + MorphTag::arity(MorphTag::GENDER_MASK)
        + MorphTag::arity(MorphTag::NUMBER_MASK)
        + MorphTag::arity(MorphTag::TENSE_MASK)
}

/// Посимвольные признаки для сегментатора морфем.
///
/// `winning` — победившая интерпретация токена, если она есть.
pub fn char_features(
    word: &UniString,
    i: usize,
    winning: Option<&MorphInfo>,
    dict: &Dictionary,
) -> Vec<f32> {
    let mut out = Vec::with_capacity(char_feature_dim());

    // Window of characters around the current cut; out-of-range positions
    // keep the all-zero empty marker.
    for offset in -(CHAR_WINDOW as isize)..=(CHAR_WINDOW as isize) {
        let mut one_hot = [0.0f32; ALPHABET.len()];
        let pos = i as isize + offset;
        if pos >= 0 {
            if let Some(c) = word.get(pos as usize) {
                if let Some(idx) = char_index(c) {
                    one_hot[idx] = 1.0;
                }
            }
        }
        out.extend_from_slice(&one_hot);
    }

    let current = word.get(i);
    out.push(current.map(|c| c.is_vowel() as u8 as f32).unwrap_or(0.0));
    out.push(if word.is_empty() {
        0.0
    } else {
        i as f32 / word.len() as f32
    });
    out.push(current.map(letter_freq).unwrap_or(0.0));

    let prefix = word.substring(0, i);
    out.push(dict.prefix_dawg().contains_key(&prefix) as u8 as f32);
    let prefix_count = dict.prefix_dawg().count_prefix(&prefix);
    out.push((1.0 + prefix_count as f32).ln() / 10.0);
    let suffix = word.cut_left(i);
    let suffix_count = dict.suffix_dawg().count_prefix(&suffix.reversed());
    out.push((1.0 + suffix_count as f32).ln() / 10.0);

    let tag = winning.map(|info| info.tag).unwrap_or(MorphTag::EMPTY);
    for mask in [
        MorphTag::POS_MASK,
        MorphTag::CASE_MASK,
        MorphTag::GENDER_MASK,
        MorphTag::NUMBER_MASK,
        MorphTag::TENSE_MASK,
    ] {
        let arity = MorphTag::arity(mask);
        let mut one_hot = vec![0.0f32; arity];
        if let Some(idx) = tag.index_in(mask) {
            one_hot[idx] = 1.0;
        }
        out.extend_from_slice(&one_hot);
    }

    debug_assert_eq!(out.len(), char_feature_dim());
    out
}

/// Имена посимвольных признаков в порядке кодирования.
pub fn char_feature_names() -> Vec<String> {
    let mut names = vec![];
    for offset in -(CHAR_WINDOW as isize)..=(CHAR_WINDOW as isize) {
        for &c in ALPHABET {
            names.push(format!("char[{}]:{}", offset, c));
        }
    }
    names.extend(
        ["vowel", "position", "letter_freq", "prefix_member", "prefix_count", "suffix_count"]
            .iter()
            .map(|s| s.to_string()),
    );
    for (mask, prefix) in [
        (MorphTag::POS_MASK, "pos"),
        (MorphTag::CASE_MASK, "case"),
        (MorphTag::GENDER_MASK, "gender"),
        (MorphTag::NUMBER_MASK, "number"),
        (MorphTag::TENSE_MASK, "tense"),
    ] {
        for &(bit, name) in MorphTag::NAMES {
            if bit.subsumes(mask) && !bit.is_empty() {
                names.push(format!("{}:{}", prefix, name));
            }
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::small_dictionary;

    fn word_form(text: &str) -> WordForm {
        WordForm::new(text.to_string(), TokenKind::Word, 0..text.len())
    }

    #[test]
    fn test_hand_features_cap_patterns() {
        assert_eq!(hand_features(&word_form("стол"))[1], 1.0);
        assert_eq!(hand_features(&word_form("Стол"))[2], 1.0);
        assert_eq!(hand_features(&word_form("СТОЛ"))[3], 1.0);
        assert_eq!(hand_features(&word_form("СтОл"))[4], 1.0);
    }

    #[test]
    fn test_hand_features_flags() {
        let f = hand_features(&word_form("что-то"));
        assert_eq!(f[6], 1.0);
        let f = hand_features(&word_form("а1"));
        assert_eq!(f[5], 1.0);
    }

    #[test]
    fn test_letter_freq() {
        assert!((letter_freq(Char::new('о')) - 1.0).abs() < 1e-6);
        assert!(letter_freq(Char::new('ё')) > 0.0);
        assert!(letter_freq(Char::new('ю')) > letter_freq(Char::new('ц')));
        assert_eq!(letter_freq(Char::new('z')), 0.0);
    }

    #[test]
    fn test_alphabet_covers_freq_table() {
        for &(c, _) in LETTER_COUNTS {
            assert!(
                ALPHABET.contains(&c),
                "letter {} is missing from the alphabet",
                c
            );
        }
        // Each letter occurs exactly once in the frequency table.
        for (i, &(a, _)) in LETTER_COUNTS.iter().enumerate() {
            assert!(
                LETTER_COUNTS.iter().skip(i + 1).all(|&(b, _)| b != a),
                "duplicate letter {} in the frequency table",
                a
            );
        }
    }

    #[test]
    fn test_window_features_padding() {
        let rows = vec![vec![1.0, 2.0], vec![3.0, 4.0]];
        let w = window_features(&rows, 0, 2);
        assert_eq!(w, vec![0.0, 0.0, 1.0, 2.0, 3.0, 4.0]);
        let w = window_features(&rows, 1, 2);
        assert_eq!(w, vec![1.0, 2.0, 3.0, 4.0, 0.0, 0.0]);
    }

    #[test]
    fn test_char_feature_dim_consistency() {
        let dict = small_dictionary();
        let word = UniString::from_str("ПЕРЕПОДГОТОВКА");
        let feats = char_features(&word, 0, None, &dict);
        assert_eq!(feats.len(), char_feature_dim());
        assert_eq!(char_feature_names().len(), char_feature_dim());
    }

    #[test]
    fn test_prefix_membership_feature() {
        let dict = small_dictionary();
        let word = UniString::from_str("ПЕРЕПОДГОТОВКА");
        // At i = 4 the prefix so far is ПЕРЕ, which is in the prefix DAWG.
        let feats = char_features(&word, 4, None, &dict);
        let member_idx = (2 * CHAR_WINDOW + 1) * ALPHABET.len() + 3;
        assert_eq!(feats[member_idx], 1.0);
        let feats = char_features(&word, 3, None, &dict);
        assert_eq!(feats[member_idx], 0.0);
    }

    #[test]
    fn test_token_feature_names_len() {
        let emb = crate::ml::embeddings::Embeddings::with_dim(16, 8);
        let form = word_form("стол");
        let feats = token_features(&form, &emb);
        assert_eq!(feats.len(), token_feature_names(16).len());
    }
}
