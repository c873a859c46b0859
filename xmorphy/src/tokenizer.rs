//! Токенизатор: детерминированная конечная классификация текста.
//!
//! Входной текст разбивается на токены классов слово / число / пунктуация /
//! разделитель / прочее. Токены-разделители тоже попадают в выдачу, поэтому
//! конкатенация текстов всех токенов побайтово восстанавливает исходную
//! строку.

use std::ops::Range;

/// Грубый класс токена.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum TokenKind {
    /// Слово (последовательность букв, возможно с внутренними дефисами).
    Word,
    /// Число.
    Numb,
    /// Пунктуация.
    Pnct,
    /// Разделитель (пробельные символы).
    Sepr,
    /// Прочие символы.
    Other,
}

/// Токен исходного текста.
#[derive(Debug, Clone)]
pub struct RawToken {
    /// Текст токена в исходном виде.
    pub text: String,
    /// Класс токена.
    pub kind: TokenKind,
    /// Байтовый диапазон токена в исходной строке.
    pub range: Range<usize>,
}

/// Класс отдельного символа.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
enum CharClass {
    Letter,
    Digit,
    Punct,
    Sep,
    Other,
}

/// Состояние конечного автомата.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
enum State {
    Start,
    InsideWord,
    InsideNum,
    InsidePunct,
    InsideSep,
    InsideOther,
}

impl State {
    fn kind(self) -> Option<TokenKind> {
        match self {
            State::Start => None,
            State::InsideWord => Some(TokenKind::Word),
            State::InsideNum => Some(TokenKind::Numb),
            State::InsidePunct => Some(TokenKind::Pnct),
            State::InsideSep => Some(TokenKind::Sepr),
            State::InsideOther => Some(TokenKind::Other),
        }
    }

    fn for_class(class: CharClass) -> Self {
        match class {
            CharClass::Letter => State::InsideWord,
            CharClass::Digit => State::InsideNum,
            CharClass::Punct => State::InsidePunct,
            CharClass::Sep => State::InsideSep,
            CharClass::Other => State::InsideOther,
        }
    }
}

fn classify(c: char) -> CharClass {
    if c.is_whitespace() {
        CharClass::Sep
    } else if c.is_numeric() {
        CharClass::Digit
    } else if c.is_alphabetic() {
        CharClass::Letter
    } else if is_punct(c) {
        CharClass::Punct
    } else {
        CharClass::Other
    }
}

fn is_punct(c: char) -> bool {
    c.is_ascii_punctuation()
        || matches!(
            c,
            '«' | '»' | '„' | '“' | '”' | '‘' | '’' | '—' | '–' | '…' | '№' | '·'
        )
}

/// Разбивает текст на токены.
///
/// Для любого входа выполняется свойство восстановления:
/// конкатенация `text` всех токенов побайтово равна входной строке.
pub fn tokenize(text: &str) -> Vec<RawToken> {
    let mut tokens = vec![];
    let mut state = State::Start;
    let mut start = 0usize;

    let flush = |tokens: &mut Vec<RawToken>, state: State, start: usize, end: usize| {
        if let Some(kind) = state.kind() {
            if start < end {
                tokens.push(RawToken {
                    text: text[start..end].to_string(),
                    kind,
                    range: start..end,
                });
            }
        }
    };

    let mut iter = text.char_indices().peekable();
    while let Some((pos, c)) = iter.next() {
        // A newline is a forced break: it always forms its own separator.
        if c == '\n' {
            flush(&mut tokens, state, start, pos);
            let end = pos + c.len_utf8();
            tokens.push(RawToken {
                text: text[pos..end].to_string(),
                kind: TokenKind::Sepr,
                range: pos..end,
            });
            state = State::Start;
            start = end;
            continue;
        }

        let class = classify(c);

        // A hyphen between letters is mergeable and stays inside the word.
        if state == State::InsideWord && c == '-' {
            if let Some(&(_, next)) = iter.peek() {
                if classify(next) == CharClass::Letter {
                    continue;
                }
            }
        }

        let next_state = State::for_class(class);
        if next_state != state {
            flush(&mut tokens, state, start, pos);
            state = next_state;
            start = pos;
        }
    }
    flush(&mut tokens, state, start, text.len());
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    fn concat(tokens: &[RawToken]) -> String {
        tokens.iter().map(|t| t.text.as_str()).collect()
    }

    #[test]
    fn test_basic_sentence() {
        let input = "Привет, мир!";
        let tokens = tokenize(input);
        let expected = [
            ("Привет", TokenKind::Word),
            (",", TokenKind::Pnct),
            (" ", TokenKind::Sepr),
            ("мир", TokenKind::Word),
            ("!", TokenKind::Pnct),
        ];
        assert_eq!(tokens.len(), expected.len());
        for (token, (text, kind)) in tokens.iter().zip(expected) {
            assert_eq!(token.text, text);
            assert_eq!(token.kind, kind);
        }
        assert_eq!(concat(&tokens), input);
    }

    #[test]
    fn test_reconstruction() {
        let inputs = [
            "",
            "   ",
            "а",
            "Привет,  мир! Как дела?",
            "что-то 123 ёж\nновая строка",
            "a1b2c3 -- и ещё … «кавычки»",
            "hyphen-at-end- и",
        ];
        for input in inputs {
            assert_eq!(concat(&tokenize(input)), input, "input {:?}", input);
        }
    }

    #[test]
    fn test_hyphen_compound() {
        let tokens = tokenize("что-то");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Word);
        assert_eq!(tokens[0].text, "что-то");
    }

    #[test]
    fn test_trailing_hyphen_is_punct() {
        let tokens = tokenize("слово-");
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].kind, TokenKind::Word);
        assert_eq!(tokens[1].kind, TokenKind::Pnct);
    }

    #[test]
    fn test_numbers_and_other() {
        let tokens = tokenize("в 2024 году © да");
        let kinds: Vec<TokenKind> = tokens.iter().map(|t| t.kind).collect();
        assert!(kinds.contains(&TokenKind::Numb));
        assert!(kinds.contains(&TokenKind::Other));
        assert_eq!(concat(&tokens), "в 2024 году © да");
    }

    #[test]
    fn test_newline_forces_break() {
        let tokens = tokenize("а \n б");
        let texts: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["а", " ", "\n", " ", "б"]);
        assert_eq!(tokens[2].kind, TokenKind::Sepr);
    }

    #[test]
    fn test_ranges_cover_input() {
        let input = "Привет, мир!";
        let tokens = tokenize(input);
        let mut pos = 0;
        for t in &tokens {
            assert_eq!(t.range.start, pos);
            pos = t.range.end;
            assert_eq!(&input[t.range.clone()], t.text);
        }
        assert_eq!(pos, input.len());
    }
}
