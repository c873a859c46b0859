//! Потоковый разбор словаря OpenCorpora.
//!
//! Читает XML-дамп OpenCorpora и превращает каждый элемент `<lemma>` в
//! [`Lexeme`]: граммемы уровня леммы (`<l>`) объединяются с граммемами
//! каждой формы (`<f>`). Граммемный инвентарь OpenCorpora отображается в
//! биты [`MorphTag`]; неизвестные граммемы пропускаются.
//!
//! Модуль доступен при включённой фиче `compile`.

use std::io::BufRead;

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::dictionary::{DictionaryBuilder, Lexeme};
use crate::errors::{Result, XmorphyError};
use crate::tag::MorphTag;

/// Отображает граммему OpenCorpora в биты тега.
///
/// Возвращает `None` для граммем, не входящих в инвентарь анализатора.
pub fn map_grammeme(v: &str) -> Option<MorphTag> {
    let tag = match v {
        // Части речи.
        "NOUN" => MorphTag::NOUN,
        "ADJF" | "ADJS" | "COMP" => MorphTag::ADJ,
        "VERB" | "INFN" | "PRTF" | "PRTS" | "GRND" => MorphTag::VERB,
        "NUMR" => MorphTag::NUM,
        "ADVB" | "PRED" => MorphTag::ADV,
        "NPRO" => MorphTag::PRON,
        "PREP" => MorphTag::ADP,
        "CONJ" => MorphTag::CONJ,
        "PRCL" => MorphTag::PART,
        "INTJ" => MorphTag::INTJ,
        // Падеж.
        "nomn" => MorphTag::NOMN,
        "gent" | "gen2" => MorphTag::GENT,
        "datv" => MorphTag::DATV,
        "accs" => MorphTag::ACCS,
        "ablt" => MorphTag::ABLT,
        "loct" | "loc2" => MorphTag::LOCT,
        "voct" => MorphTag::VOCT,
        // Род.
        "masc" => MorphTag::MASC,
        "femn" => MorphTag::FEMN,
        "neut" => MorphTag::NEUT,
        // Число.
        "sing" => MorphTag::SING,
        "plur" => MorphTag::PLUR,
        // Время.
        "pres" => MorphTag::PRES,
        "past" => MorphTag::PAST,
        "futr" => MorphTag::FUTR,
        // Лицо.
        "1per" => MorphTag::PER1,
        "2per" => MorphTag::PER2,
        "3per" => MorphTag::PER3,
        // Вид.
        "perf" => MorphTag::PERF,
        "impf" => MorphTag::IMPF,
        // Наклонение.
        "indc" => MorphTag::INDC,
        "impr" => MorphTag::IMPR,
        // Залог.
        "actv" => MorphTag::ACTV,
        "pssv" => MorphTag::PSSV,
        // Одушевлённость.
        "anim" => MorphTag::ANIM,
        "inan" => MorphTag::INAN,
        _ => return None,
    };
    Some(tag)
}

/// Накапливаемое состояние одного элемента `<lemma>`.
#[derive(Default)]
struct LemmaAccum {
    lemma_tag: MorphTag,
    lemma_surface: String,
    forms: Vec<(String, MorphTag)>,
}

/// Куда применять очередную граммему `<g>`.
#[derive(Clone, Copy, Eq, PartialEq)]
enum GrammemeTarget {
    None,
    Lemma,
    Form,
}

/// Разбирает XML-дамп OpenCorpora в список лексем.
pub fn parse_opencorpora<R: BufRead>(rdr: R) -> Result<Vec<Lexeme>> {
    let mut reader = Reader::from_reader(rdr);
    let mut buf = Vec::new();

    let mut lexemes = vec![];
    let mut current: Option<LemmaAccum> = None;
    let mut target = GrammemeTarget::None;
    let mut skipped_grammemes = 0usize;

    loop {
        let event = reader.read_event_into(&mut buf)?;
        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let is_empty = matches!(event, Event::Empty(_));
                match e.name().as_ref() {
                    b"lemma" => {
                        current = Some(LemmaAccum::default());
                        target = GrammemeTarget::None;
                    }
                    b"l" => {
                        if let Some(accum) = current.as_mut() {
                            accum.lemma_surface = attr_value(e, b"t")?.unwrap_or_default();
                            if !is_empty {
                                target = GrammemeTarget::Lemma;
                            }
                        }
                    }
                    b"f" => {
                        if let Some(accum) = current.as_mut() {
                            let surface = attr_value(e, b"t")?.unwrap_or_default();
                            accum.forms.push((surface, MorphTag::EMPTY));
                            if !is_empty {
                                target = GrammemeTarget::Form;
                            }
                        }
                    }
                    b"g" => {
                        if let (Some(accum), Some(v)) =
                            (current.as_mut(), attr_value(e, b"v")?)
                        {
                            match map_grammeme(&v) {
                                Some(bits) => match target {
                                    GrammemeTarget::Lemma => accum.lemma_tag |= bits,
                                    GrammemeTarget::Form => {
                                        if let Some(form) = accum.forms.last_mut() {
                                            form.1 |= bits;
                                        }
                                    }
                                    GrammemeTarget::None => {}
                                },
                                None => skipped_grammemes += 1,
                            }
                        }
                    }
                    _ => {}
                }
            }
            Event::End(ref e) => match e.name().as_ref() {
                b"l" | b"f" => {
                    target = GrammemeTarget::None;
                }
                b"lemma" => {
                    if let Some(accum) = current.take() {
                        if let Some(lexeme) = finish_lemma(accum)? {
                            lexemes.push(lexeme);
                        }
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if skipped_grammemes > 0 {
        log::debug!(
            "skipped {} grammemes outside the analyzer inventory",
            skipped_grammemes
        );
    }
    log::info!("parsed {} lexemes from the OpenCorpora dump", lexemes.len());
    Ok(lexemes)
}

/// Собирает лексему из накопленного состояния.
fn finish_lemma(accum: LemmaAccum) -> Result<Option<Lexeme>> {
    let mut forms: Vec<(String, MorphTag)> = accum
        .forms
        .into_iter()
        .filter(|(surface, _)| !surface.is_empty())
        .map(|(surface, tag)| (surface, tag | accum.lemma_tag))
        .collect();
    if forms.is_empty() {
        if accum.lemma_surface.is_empty() {
            return Ok(None);
        }
        forms.push((accum.lemma_surface, accum.lemma_tag));
    }
    let pairs: Vec<(&str, MorphTag)> = forms
        .iter()
        .map(|(surface, tag)| (surface.as_str(), *tag))
        .collect();
    Lexeme::from_pairs(&pairs).map(Some)
}

/// Читает значение атрибута элемента.
fn attr_value(
    e: &quick_xml::events::BytesStart<'_>,
    name: &[u8],
) -> Result<Option<String>> {
    for attr in e.attributes() {
        let attr = attr
            .map_err(|err| XmorphyError::invalid_format("opencorpora", err.to_string()))?;
        if attr.key.as_ref() == name {
            let value = attr
                .unescape_value()
                .map_err(|err| XmorphyError::invalid_format("opencorpora", err.to_string()))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

/// Разбирает дамп OpenCorpora и собирает бинарный словарь.
pub fn build_from_opencorpora<R: BufRead>(rdr: R) -> Result<Vec<u8>> {
    let lexemes = parse_opencorpora(rdr)?;
    if lexemes.is_empty() {
        return Err(XmorphyError::invalid_format(
            "opencorpora",
            "the dump contains no lemmata",
        ));
    }
    let mut builder = DictionaryBuilder::new();
    for lexeme in lexemes {
        builder.add_lexeme(lexeme)?;
    }
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chars::UniString;
    use crate::dictionary::Dictionary;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<dictionary version="0.92">
  <lemmata>
    <lemma id="1" rev="1">
      <l t="стол"><g v="NOUN"/><g v="inan"/><g v="masc"/></l>
      <f t="стол"><g v="sing"/><g v="nomn"/></f>
      <f t="столы"><g v="plur"/><g v="nomn"/></f>
      <f t="столам"><g v="plur"/><g v="datv"/></f>
    </lemma>
    <lemma id="2" rev="1">
      <l t="ах"><g v="INTJ"/></l>
    </lemma>
  </lemmata>
</dictionary>
"#;

    #[test]
    fn test_parse_sample() {
        let lexemes = parse_opencorpora(SAMPLE.as_bytes()).unwrap();
        assert_eq!(lexemes.len(), 2);
        let forms = lexemes[0].forms();
        assert_eq!(forms.len(), 3);
        assert_eq!(forms[0].0.to_string(), "стол");
        assert!(
            (MorphTag::NOUN | MorphTag::MASC | MorphTag::INAN | MorphTag::SING | MorphTag::NOMN)
                .subsumes(forms[0].1)
        );
        assert!(MorphTag::PLUR.subsumes(forms[1].1));
        // A lemma with no explicit forms keeps its own surface.
        assert_eq!(lexemes[1].forms().len(), 1);
        assert_eq!(lexemes[1].forms()[0].1.pos(), MorphTag::INTJ);
    }

    #[test]
    fn test_build_dictionary() {
        let bytes = build_from_opencorpora(SAMPLE.as_bytes()).unwrap();
        let dict = Dictionary::from_bytes(bytes).unwrap();
        assert!(dict.main_dawg().contains_key(&UniString::from_str("СТОЛАМ")));
        assert!(dict.main_dawg().contains_key(&UniString::from_str("АХ")));
    }

    #[test]
    fn test_unknown_grammeme_skipped() {
        let xml = r#"<lemma id="1"><l t="ой"><g v="INTJ"/><g v="Abbr"/></l></lemma>"#;
        let lexemes = parse_opencorpora(xml.as_bytes()).unwrap();
        assert_eq!(lexemes.len(), 1);
        assert_eq!(lexemes[0].forms()[0].1, MorphTag::INTJ);
    }

    #[test]
    fn test_empty_dump_rejected() {
        let xml = "<dictionary><lemmata/></dictionary>";
        assert!(build_from_opencorpora(xml.as_bytes()).is_err());
    }
}
