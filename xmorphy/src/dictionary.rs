//! Словарь морфологического анализа.
//!
//! Этот модуль отвечает за загрузку, проверку и сериализацию бинарного
//! словаря. Файл словаря содержит три DAWG (основной, суффиксный и
//! префиксный), упакованное хранилище парадигм и таблицу интернированных
//! строк. Все секции обходятся по индексу над байтовым буфером, поэтому
//! файл пригоден для отображения в память и загружается без
//! материализации.
//!
//! Формат файла (little-endian):
//!
//! ```text
//! [12B магия "XMDICT\0" с нулевым дополнением][u32 версия]
//! [u32 dawg_offset][u32 dawg_size]
//! [u32 suffix_dawg_offset][u32 suffix_dawg_size]
//! [u32 prefix_dawg_offset][u32 prefix_dawg_size]
//! [u32 paradigm_offset][u32 paradigm_size]
//! [u32 lemma_table_offset][u32 lemma_table_size]
//! [...блобы...]
//! ```

pub mod builder;
pub mod paradigm;

use std::fs::File;
use std::io::{Read, Write};
use std::ops::Range;
use std::path::Path;

use memmap2::Mmap;

use crate::chars::UniString;
use crate::dawg::Dawg;
use crate::dictionary::paradigm::ParadigmStore;
use crate::errors::{Result, XmorphyError};
use crate::utils::{read_u32_le, read_varint, write_varint, FromU32};

pub use crate::dictionary::builder::{DictionaryBuilder, Lexeme};

/// Магические байты файла словаря.
pub const DICT_MAGIC: &[u8; 12] = b"XMDICT\0\0\0\0\0\0";

/// Версия формата словаря.
///
/// Версия формата отделена от семантической версии крейта и меняется
/// только при несовместимых изменениях раскладки файла.
pub const DICT_VERSION: u32 = 1;

const HEADER_LEN: usize = 12 + 4 + 5 * 8;

/// Буфер словаря: отображение в память либо куча.
enum DictBuffer {
    Mmap(Mmap),
    Heap(Vec<u8>),
}

impl DictBuffer {
    #[inline(always)]
    fn bytes(&self) -> &[u8] {
        match self {
            DictBuffer::Mmap(m) => m,
            DictBuffer::Heap(v) => v,
        }
    }
}

/// Границы секций внутри файла словаря.
#[derive(Clone)]
struct Sections {
    main: Range<usize>,
    suffix: Range<usize>,
    prefix: Range<usize>,
    paradigm: Range<usize>,
    lemma: Range<usize>,
}

/// Словарь морфологического анализа, доступный только для чтения.
///
/// Словарь создаётся один раз при загрузке и далее неизменяем, поэтому его
/// можно свободно разделять между параллельными вызовами.
pub struct Dictionary {
    buf: DictBuffer,
    sections: Sections,
}

impl Dictionary {
    /// Загружает словарь из файла через отображение в память.
    ///
    /// # Ошибки
    ///
    /// Возвращает [`XmorphyError::CorruptDictionary`], если файл повреждён,
    /// магические байты или версия не совпадают либо нарушены структурные
    /// инварианты какой-либо секции.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            XmorphyError::invalid_argument(
                "path",
                format!("Failed to open dictionary file: {}", e),
            )
        })?;
        // SAFETY: the mapping is read-only and kept alive as long as the
        // dictionary; concurrent file modification is out of contract.
        let mmap = unsafe { Mmap::map(&file)? };
        let sections = Self::validate(&mmap)?;
        log::debug!(
            "loaded dictionary from {}: {} bytes",
            path.display(),
            mmap.len()
        );
        Ok(Self {
            buf: DictBuffer::Mmap(mmap),
            sections,
        })
    }

    /// Читает словарь из произвольного источника в буфер на куче.
    ///
    /// Запасной вариант для случаев, когда путь к файлу недоступен
    /// (например, чтение из встроенного блоба).
    pub fn read<R: Read>(mut rdr: R) -> Result<Self> {
        let mut buffer = Vec::new();
        rdr.read_to_end(&mut buffer)?;
        Self::from_bytes(buffer)
    }

    /// Создаёт словарь из готового буфера.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        let sections = Self::validate(&bytes)?;
        Ok(Self {
            buf: DictBuffer::Heap(bytes),
            sections,
        })
    }

    /// Проверяет заголовок, границы секций и структурные инварианты.
    fn validate(bytes: &[u8]) -> Result<Sections> {
        if bytes.len() < HEADER_LEN {
            return Err(XmorphyError::corrupt_dictionary(
                "dictionary file is too small",
            ));
        }
        if &bytes[..12] != DICT_MAGIC {
            return Err(XmorphyError::corrupt_dictionary(
                "dictionary magic mismatches",
            ));
        }
        let version = read_u32_le(bytes, 12).unwrap_or(0);
        if version != DICT_VERSION {
            return Err(XmorphyError::corrupt_dictionary(format!(
                "unsupported dictionary version {}, expected {}",
                version, DICT_VERSION
            )));
        }

        let section = |slot: usize| -> Result<Range<usize>> {
            let base = 16 + slot * 8;
            let offset = usize::from_u32(read_u32_le(bytes, base).unwrap_or(0));
            let size = usize::from_u32(read_u32_le(bytes, base + 4).unwrap_or(0));
            let end = offset
                .checked_add(size)
                .ok_or_else(|| XmorphyError::corrupt_dictionary("section overflows"))?;
            if offset < HEADER_LEN || end > bytes.len() {
                return Err(XmorphyError::corrupt_dictionary(
                    "section is out of file bounds",
                ));
            }
            Ok(offset..end)
        };

        let sections = Sections {
            main: section(0)?,
            suffix: section(1)?,
            prefix: section(2)?,
            paradigm: section(3)?,
            lemma: section(4)?,
        };

        let main = Dawg::new(&bytes[sections.main.clone()])?;
        let suffix = Dawg::new(&bytes[sections.suffix.clone()])?;
        Dawg::new(&bytes[sections.prefix.clone()])?;
        let paradigms =
            ParadigmStore::new(&bytes[sections.paradigm.clone()], &bytes[sections.lemma.clone()])?;

        // Every payload entry must reference an existing paradigm form.
        for (key, payload) in main.iter_with_prefix(&UniString::new()) {
            for entry in decode_main_payload(payload) {
                let (pid, idx) = entry?;
                if paradigms.record(pid, idx).is_none() {
                    return Err(XmorphyError::corrupt_dictionary(format!(
                        "key {:?} references a missing paradigm form ({}, {})",
                        key.to_string(),
                        pid,
                        idx
                    )));
                }
            }
        }
        for (_, payload) in suffix.iter_with_prefix(&UniString::new()) {
            for entry in decode_suffix_payload(payload) {
                let (pid, idx, _) = entry?;
                if paradigms.record(pid, idx).is_none() {
                    return Err(XmorphyError::corrupt_dictionary(
                        "suffix entry references a missing paradigm form",
                    ));
                }
            }
        }

        Ok(sections)
    }

    /// Основной DAWG: поверхностная форма → список интерпретаций.
    #[inline]
    pub fn main_dawg(&self) -> Dawg<'_> {
        Dawg::view(&self.buf.bytes()[self.sections.main.clone()])
            .expect("main DAWG is validated at load")
    }

    /// Суффиксный DAWG: перевёрнутый суффикс → статистика парадигм.
    #[inline]
    pub fn suffix_dawg(&self) -> Dawg<'_> {
        Dawg::view(&self.buf.bytes()[self.sections.suffix.clone()])
            .expect("suffix DAWG is validated at load")
    }

    /// Префиксный DAWG: множество известных приставок.
    #[inline]
    pub fn prefix_dawg(&self) -> Dawg<'_> {
        Dawg::view(&self.buf.bytes()[self.sections.prefix.clone()])
            .expect("prefix DAWG is validated at load")
    }

    /// Хранилище парадигм.
    #[inline]
    pub fn paradigms(&self) -> ParadigmStore<'_> {
        let bytes = self.buf.bytes();
        ParadigmStore::view(
            &bytes[self.sections.paradigm.clone()],
            &bytes[self.sections.lemma.clone()],
        )
        .expect("paradigm store is validated at load")
    }

    /// Число хранимых ключей, заканчивающихся указанным суффиксом.
    ///
    /// Запрос выполняется через перевёрнутый (суффиксный) DAWG.
    pub fn count_suffix(&self, key: &UniString) -> u32 {
        self.suffix_dawg().count_prefix(&key.reversed())
    }

    /// Число хранимых ключей, начинающихся с указанного префикса.
    pub fn count_prefix(&self, key: &UniString) -> u32 {
        self.main_dawg().count_prefix(key)
    }

    /// Сериализует словарь в произвольный приёмник.
    pub fn write<W: Write>(&self, mut wtr: W) -> Result<()> {
        wtr.write_all(self.buf.bytes())?;
        Ok(())
    }

    /// Сырые байты словаря.
    #[inline(always)]
    pub fn as_bytes(&self) -> &[u8] {
        self.buf.bytes()
    }
}

/// Собирает файл словаря из готовых блобов секций.
pub(crate) fn assemble_file(
    main: &[u8],
    suffix: &[u8],
    prefix: &[u8],
    paradigm: &[u8],
    lemma: &[u8],
) -> Result<Vec<u8>> {
    let blobs = [main, suffix, prefix, paradigm, lemma];
    let total: usize = HEADER_LEN + blobs.iter().map(|b| b.len()).sum::<usize>();
    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(DICT_MAGIC);
    out.extend_from_slice(&DICT_VERSION.to_le_bytes());
    let mut offset = HEADER_LEN;
    for blob in blobs {
        out.extend_from_slice(&u32::try_from(offset)?.to_le_bytes());
        out.extend_from_slice(&u32::try_from(blob.len())?.to_le_bytes());
        offset += blob.len();
    }
    for blob in blobs {
        out.extend_from_slice(blob);
    }
    Ok(out)
}

/// Кодирует полезную нагрузку основного DAWG.
pub(crate) fn encode_main_payload(entries: &[(u32, u16)]) -> Vec<u8> {
    let mut out = vec![];
    write_varint(&mut out, entries.len() as u64);
    for &(pid, idx) in entries {
        write_varint(&mut out, u64::from(pid));
        write_varint(&mut out, u64::from(idx));
    }
    out
}

/// Декодирует полезную нагрузку основного DAWG.
pub(crate) fn decode_main_payload(
    payload: &[u8],
) -> impl Iterator<Item = Result<(u32, u16)>> + '_ {
    PayloadIter {
        payload,
        pos: 0,
        remaining: 0,
        initialized: false,
    }
}

/// Кодирует полезную нагрузку суффиксного DAWG.
pub(crate) fn encode_suffix_payload(entries: &[(u32, u16, u32)]) -> Vec<u8> {
    let mut out = vec![];
    write_varint(&mut out, entries.len() as u64);
    for &(pid, idx, freq) in entries {
        write_varint(&mut out, u64::from(pid));
        write_varint(&mut out, u64::from(idx));
        write_varint(&mut out, u64::from(freq));
    }
    out
}

/// Декодирует полезную нагрузку суффиксного DAWG.
pub(crate) fn decode_suffix_payload(
    payload: &[u8],
) -> impl Iterator<Item = Result<(u32, u16, u32)>> + '_ {
    SuffixPayloadIter {
        payload,
        pos: 0,
        remaining: 0,
        initialized: false,
    }
}

struct PayloadIter<'a> {
    payload: &'a [u8],
    pos: usize,
    remaining: u64,
    initialized: bool,
}

impl<'a> Iterator for PayloadIter<'a> {
    type Item = Result<(u32, u16)>;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.initialized {
            self.initialized = true;
            match read_varint(self.payload, self.pos) {
                Some((n, next)) => {
                    self.remaining = n;
                    self.pos = next;
                }
                None => return Some(Err(truncated_payload())),
            }
        }
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let (pid, pos) = match read_varint(self.payload, self.pos) {
            Some(v) => v,
            None => return Some(Err(truncated_payload())),
        };
        let (idx, pos) = match read_varint(self.payload, pos) {
            Some(v) => v,
            None => return Some(Err(truncated_payload())),
        };
        self.pos = pos;
        match (u32::try_from(pid), u16::try_from(idx)) {
            (Ok(pid), Ok(idx)) => Some(Ok((pid, idx))),
            _ => Some(Err(truncated_payload())),
        }
    }
}

struct SuffixPayloadIter<'a> {
    payload: &'a [u8],
    pos: usize,
    remaining: u64,
    initialized: bool,
}

impl<'a> Iterator for SuffixPayloadIter<'a> {
    type Item = Result<(u32, u16, u32)>;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.initialized {
            self.initialized = true;
            match read_varint(self.payload, self.pos) {
                Some((n, next)) => {
                    self.remaining = n;
                    self.pos = next;
                }
                None => return Some(Err(truncated_payload())),
            }
        }
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let (pid, pos) = match read_varint(self.payload, self.pos) {
            Some(v) => v,
            None => return Some(Err(truncated_payload())),
        };
        let (idx, pos) = match read_varint(self.payload, pos) {
            Some(v) => v,
            None => return Some(Err(truncated_payload())),
        };
        let (freq, pos) = match read_varint(self.payload, pos) {
            Some(v) => v,
            None => return Some(Err(truncated_payload())),
        };
        self.pos = pos;
        match (u32::try_from(pid), u16::try_from(idx), u32::try_from(freq)) {
            (Ok(pid), Ok(idx), Ok(freq)) => Some(Ok((pid, idx, freq))),
            _ => Some(Err(truncated_payload())),
        }
    }
}

fn truncated_payload() -> XmorphyError {
    XmorphyError::corrupt_dictionary("DAWG payload entry is truncated")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::small_dictionary;

    #[test]
    fn test_build_and_load() {
        let dict = small_dictionary();
        let main = dict.main_dawg();
        assert!(main.contains_key(&UniString::from_str("СТОЛ")));
        assert!(main.contains_key(&UniString::from_str("СТОЛАМ")));
        assert!(!main.contains_key(&UniString::from_str("СТУЛ")));
    }

    #[test]
    fn test_write_read_roundtrip() {
        let dict = small_dictionary();
        let mut buffer = Vec::new();
        dict.write(&mut buffer).unwrap();
        let reloaded = Dictionary::read(buffer.as_slice()).unwrap();
        assert!(reloaded
            .main_dawg()
            .contains_key(&UniString::from_str("СТОЛ")));
    }

    #[test]
    fn test_corrupt_magic() {
        let dict = small_dictionary();
        let mut bytes = dict.as_bytes().to_vec();
        bytes[0] = b'Y';
        assert!(matches!(
            Dictionary::from_bytes(bytes),
            Err(XmorphyError::CorruptDictionary(_))
        ));
    }

    #[test]
    fn test_corrupt_version() {
        let dict = small_dictionary();
        let mut bytes = dict.as_bytes().to_vec();
        bytes[12..16].copy_from_slice(&99u32.to_le_bytes());
        assert!(Dictionary::from_bytes(bytes).is_err());
    }

    #[test]
    fn test_corrupt_section_bounds() {
        let dict = small_dictionary();
        let mut bytes = dict.as_bytes().to_vec();
        // Push the main DAWG section past the end of the file.
        bytes[20..24].copy_from_slice(&u32::MAX.to_le_bytes());
        assert!(Dictionary::from_bytes(bytes).is_err());
    }

    #[test]
    fn test_count_suffix() {
        let dict = small_dictionary();
        assert!(dict.count_suffix(&UniString::from_str("АМ")) > 0);
        assert_eq!(dict.count_suffix(&UniString::from_str("ЯЯЯ")), 0);
    }

    #[test]
    fn test_payload_codec() {
        let entries = vec![(0u32, 0u16), (7, 3), (100_000, 12)];
        let bytes = encode_main_payload(&entries);
        let decoded: Result<Vec<_>> = decode_main_payload(&bytes).collect();
        assert_eq!(decoded.unwrap(), entries);

        let entries = vec![(1u32, 2u16, 30u32), (4, 5, 6)];
        let bytes = encode_suffix_payload(&entries);
        let decoded: Result<Vec<_>> = decode_suffix_payload(&bytes).collect();
        assert_eq!(decoded.unwrap(), entries);
    }
}
