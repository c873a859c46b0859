//! Вспомогательные данные для тестов.

use crate::dictionary::{Dictionary, DictionaryBuilder, Lexeme};
use crate::tag::MorphTag;

/// Собирает небольшой словарь в памяти для модульных тестов.
///
/// Словарь содержит пару существительных с общей парадигмой, когорту
/// глаголов на «-ить» для проверки предсказателя и слово «мир» для
/// сценариев токенизации.
pub(crate) fn small_dictionary() -> Dictionary {
    let noun = MorphTag::NOUN | MorphTag::MASC;
    let verb = MorphTag::VERB | MorphTag::IMPF;

    let mut builder = DictionaryBuilder::new();

    for (forms, animacy) in [
        (
            ["СТОЛ", "СТОЛА", "СТОЛУ", "СТОЛЫ", "СТОЛОВ", "СТОЛАМ"],
            MorphTag::INAN,
        ),
        (
            ["КОТ", "КОТА", "КОТУ", "КОТЫ", "КОТОВ", "КОТАМ"],
            MorphTag::ANIM,
        ),
    ] {
        let tags = [
            noun | animacy | MorphTag::SING | MorphTag::NOMN,
            noun | animacy | MorphTag::SING | MorphTag::GENT,
            noun | animacy | MorphTag::SING | MorphTag::DATV,
            noun | animacy | MorphTag::PLUR | MorphTag::NOMN,
            noun | animacy | MorphTag::PLUR | MorphTag::GENT,
            noun | animacy | MorphTag::PLUR | MorphTag::DATV,
        ];
        let pairs: Vec<(&str, MorphTag)> = forms.iter().copied().zip(tags).collect();
        builder
            .add_lexeme(Lexeme::from_pairs(&pairs).unwrap())
            .unwrap();
    }

    builder
        .add_lexeme(
            Lexeme::from_pairs(&[
                ("МИР", noun | MorphTag::INAN | MorphTag::SING | MorphTag::NOMN),
                ("МИРА", noun | MorphTag::INAN | MorphTag::SING | MorphTag::GENT),
                ("МИРЫ", noun | MorphTag::INAN | MorphTag::PLUR | MorphTag::NOMN),
            ])
            .unwrap(),
        )
        .unwrap();

    for (inf, pres1, pres3, past) in [
        ("ВАРИТЬ", "ВАРЮ", "ВАРИТ", "ВАРИЛ"),
        ("КУРИТЬ", "КУРЮ", "КУРИТ", "КУРИЛ"),
        ("ЛЕПИТЬ", "ЛЕПЛЮ", "ЛЕПИТ", "ЛЕПИЛ"),
    ] {
        builder
            .add_lexeme(
                Lexeme::from_pairs(&[
                    (inf, verb),
                    (
                        pres1,
                        verb | MorphTag::PRES | MorphTag::PER1 | MorphTag::SING | MorphTag::INDC,
                    ),
                    (
                        pres3,
                        verb | MorphTag::PRES | MorphTag::PER3 | MorphTag::SING | MorphTag::INDC,
                    ),
                    (
                        past,
                        verb | MorphTag::PAST | MorphTag::MASC | MorphTag::SING | MorphTag::INDC,
                    ),
                ])
                .unwrap(),
            )
            .unwrap();
    }

    builder.build_dictionary().unwrap()
}
