//! Хранилище парадигм словоизменения.
//!
//! Парадигма — упорядоченный список записей (тег, id трансформации,
//! id окончания), задающих все формы лексемы. Запись с индексом 0
//! соответствует начальной форме (лемме). Трансформации и строки аффиксов
//! интернированы в боковых таблицах и адресуются по id, поэтому сами
//! записи имеют фиксированную ширину и блоб обходится по индексу.
//!
//! Раскладка секции парадигм (little-endian):
//!
//! ```text
//! [u32 count][u32 offsets × count]
//! каждая парадигма: [u16 len][len × 12B (tag u64, transform_id u16, ending_id u16)]
//! ```
//!
//! Раскладка секции интернированных таблиц («словаря лемм»):
//!
//! ```text
//! [u32 n_transforms][n_transforms × 8B (left_cut u16, right_cut u16,
//!                    left_add u16, right_add u16)]
//! [u32 n_strings][u32 offsets × (n_strings + 1)][байты UTF-8]
//! ```

use hashbrown::HashMap;

use crate::chars::UniString;
use crate::errors::{Result, XmorphyError};
use crate::tag::MorphTag;
use crate::utils::{read_u16_le, read_u32_le, read_u64_le, FromU32};

const RECORD_LEN: usize = 12;
const TRANSFORM_LEN: usize = 8;

/// Одна запись парадигмы.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct ParadigmRecord {
    /// Морфологический тег формы.
    pub tag: MorphTag,
    /// Id трансформации в боковой таблице.
    pub transform_id: u16,
    /// Id интернированного окончания формы.
    pub ending_id: u16,
}

/// Трансформация леммы в форму.
///
/// Применение: отрезать `left_cut` символов слева, приписать `left_add`,
/// отрезать `right_cut` символов справа, приписать `right_add`.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct TransformView<'a> {
    pub left_cut: u16,
    pub right_cut: u16,
    pub left_add: &'a str,
    pub right_add: &'a str,
}

/// Представление запроса к упакованному хранилищу парадигм.
#[derive(Clone, Copy)]
pub struct ParadigmStore<'a> {
    offsets: &'a [u8],
    paradigms: &'a [u8],
    transforms: &'a [u8],
    str_offsets: &'a [u8],
    str_bytes: &'a [u8],
    count: usize,
    n_transforms: usize,
    n_strings: usize,
}

impl<'a> ParadigmStore<'a> {
    /// Создаёт представление с полной структурной проверкой обеих секций.
    pub fn new(paradigm_bytes: &'a [u8], lemma_bytes: &'a [u8]) -> Result<Self> {
        let store = Self::view(paradigm_bytes, lemma_bytes)?;
        store.validate_full()?;
        Ok(store)
    }

    /// Создаёт представление, проверяя только заголовки и границы.
    pub(crate) fn view(paradigm_bytes: &'a [u8], lemma_bytes: &'a [u8]) -> Result<Self> {
        let count =
            usize::from_u32(read_u32_le(paradigm_bytes, 0).ok_or_else(corrupt_paradigms)?);
        let offsets_end = 4 + count.checked_mul(4).ok_or_else(corrupt_paradigms)?;
        if offsets_end > paradigm_bytes.len() {
            return Err(corrupt_paradigms());
        }

        let n_transforms =
            usize::from_u32(read_u32_le(lemma_bytes, 0).ok_or_else(corrupt_lemmas)?);
        let transforms_end = 4 + n_transforms
            .checked_mul(TRANSFORM_LEN)
            .ok_or_else(corrupt_lemmas)?;
        let n_strings = usize::from_u32(
            read_u32_le(lemma_bytes, transforms_end).ok_or_else(corrupt_lemmas)?,
        );
        let str_offsets_start = transforms_end + 4;
        let str_offsets_end = str_offsets_start
            + n_strings
                .checked_add(1)
                .and_then(|n| n.checked_mul(4))
                .ok_or_else(corrupt_lemmas)?;
        if str_offsets_end > lemma_bytes.len() {
            return Err(corrupt_lemmas());
        }

        Ok(Self {
            offsets: &paradigm_bytes[4..offsets_end],
            paradigms: paradigm_bytes,
            transforms: &lemma_bytes[4..transforms_end],
            str_offsets: &lemma_bytes[str_offsets_start..str_offsets_end],
            str_bytes: &lemma_bytes[str_offsets_end..],
            count,
            n_transforms,
            n_strings,
        })
    }

    /// Полная проверка структуры хранилища.
    fn validate_full(&self) -> Result<()> {
        // String offsets must be monotone and in range, each slice valid UTF-8.
        let mut prev = 0usize;
        for i in 0..=self.n_strings {
            let off = usize::from_u32(read_u32_le(self.str_offsets, i * 4).ok_or_else(corrupt_lemmas)?);
            if off < prev || off > self.str_bytes.len() {
                return Err(corrupt_lemmas());
            }
            if i > 0 {
                std::str::from_utf8(&self.str_bytes[prev..off]).map_err(|_| {
                    XmorphyError::corrupt_dictionary("paradigm string table is not valid UTF-8")
                })?;
            }
            prev = off;
        }

        for tid in 0..self.n_transforms {
            let t = self.transform_raw(tid).ok_or_else(corrupt_lemmas)?;
            if usize::from(t.2) >= self.n_strings || usize::from(t.3) >= self.n_strings {
                return Err(XmorphyError::corrupt_dictionary(
                    "transform references an out-of-range string",
                ));
            }
        }

        for pid in 0..self.count {
            let len = self.len(pid as u32).ok_or_else(corrupt_paradigms)?;
            if len == 0 {
                return Err(XmorphyError::corrupt_dictionary("empty paradigm"));
            }
            for idx in 0..len {
                let rec = self.record(pid as u32, idx).ok_or_else(corrupt_paradigms)?;
                if usize::from(rec.transform_id) >= self.n_transforms {
                    return Err(XmorphyError::corrupt_dictionary(
                        "paradigm record references an out-of-range transform",
                    ));
                }
                if usize::from(rec.ending_id) >= self.n_strings {
                    return Err(XmorphyError::corrupt_dictionary(
                        "paradigm record references an out-of-range ending",
                    ));
                }
            }
        }
        Ok(())
    }

    /// Число парадигм.
    #[inline(always)]
    pub fn num_paradigms(&self) -> usize {
        self.count
    }

    /// Число форм в парадигме.
    pub fn len(&self, pid: u32) -> Option<u16> {
        let pid = usize::from_u32(pid);
        if pid >= self.count {
            return None;
        }
        let off = usize::from_u32(read_u32_le(self.offsets, pid * 4)?);
        read_u16_le(self.paradigms, off)
    }

    /// Запись формы парадигмы.
    pub fn record(&self, pid: u32, idx: u16) -> Option<ParadigmRecord> {
        let len = self.len(pid)?;
        if idx >= len {
            return None;
        }
        let off = usize::from_u32(read_u32_le(self.offsets, usize::from_u32(pid) * 4)?);
        let rec_off = off + 2 + usize::from(idx) * RECORD_LEN;
        Some(ParadigmRecord {
            tag: MorphTag::from_bits(read_u64_le(self.paradigms, rec_off)?),
            transform_id: read_u16_le(self.paradigms, rec_off + 8)?,
            ending_id: read_u16_le(self.paradigms, rec_off + 10)?,
        })
    }

    fn transform_raw(&self, tid: usize) -> Option<(u16, u16, u16, u16)> {
        if tid >= self.n_transforms {
            return None;
        }
        let off = tid * TRANSFORM_LEN;
        Some((
            read_u16_le(self.transforms, off)?,
            read_u16_le(self.transforms, off + 2)?,
            read_u16_le(self.transforms, off + 4)?,
            read_u16_le(self.transforms, off + 6)?,
        ))
    }

    /// Интернированная строка по id.
    pub fn string(&self, id: u16) -> Option<&'a str> {
        let id = usize::from(id);
        if id >= self.n_strings {
            return None;
        }
        let start = usize::from_u32(read_u32_le(self.str_offsets, id * 4)?);
        let end = usize::from_u32(read_u32_le(self.str_offsets, (id + 1) * 4)?);
        let bytes = self.str_bytes.get(start..end)?;
        std::str::from_utf8(bytes).ok()
    }

    /// Трансформация по id.
    pub fn transform(&self, tid: u16) -> Option<TransformView<'a>> {
        let (left_cut, right_cut, left_add, right_add) = self.transform_raw(usize::from(tid))?;
        Some(TransformView {
            left_cut,
            right_cut,
            left_add: self.string(left_add)?,
            right_add: self.string(right_add)?,
        })
    }

    /// Окончание формы парадигмы.
    pub fn ending(&self, pid: u32, idx: u16) -> Option<&'a str> {
        let rec = self.record(pid, idx)?;
        self.string(rec.ending_id)
    }

    /// Применяет запись парадигмы к лемме и порождает поверхностную форму.
    ///
    /// Возвращает `None`, если отрезаемые длины превышают длину леммы.
    pub fn apply(&self, pid: u32, idx: u16, lemma: &UniString) -> Option<UniString> {
        let rec = self.record(pid, idx)?;
        let t = self.transform(rec.transform_id)?;
        let left_cut = usize::from(t.left_cut);
        let right_cut = usize::from(t.right_cut);
        if lemma.len() < left_cut + right_cut {
            return None;
        }
        let stem = lemma.cut_left(left_cut).cut_right(right_cut);
        let mut out = UniString::from_str(t.left_add);
        out = out.concat(&stem);
        Some(out.concat(&UniString::from_str(t.right_add)))
    }

    /// Восстанавливает лемму по поверхностной форме записи `idx`.
    ///
    /// С формы снимаются аффиксы её трансформации (с проверкой совпадения),
    /// после чего к основе приписываются аффиксы записи 0.
    pub fn restore_lemma(&self, pid: u32, idx: u16, surface: &UniString) -> Option<UniString> {
        let rec = self.record(pid, idx)?;
        let t = self.transform(rec.transform_id)?;
        let prefix = UniString::from_str(t.left_add);
        let suffix = UniString::from_str(t.right_add);
        if !surface.starts_with(&prefix) || !surface.ends_with(&suffix) {
            return None;
        }
        if surface.len() < prefix.len() + suffix.len() {
            return None;
        }
        let stem = surface.cut_left(prefix.len()).cut_right(suffix.len());

        let rec0 = self.record(pid, 0)?;
        let t0 = self.transform(rec0.transform_id)?;
        let mut lemma = UniString::from_str(t0.left_add);
        lemma = lemma.concat(&stem);
        Some(lemma.concat(&UniString::from_str(t0.right_add)))
    }

    /// Длина основы поверхностной формы записи `idx`.
    pub fn stem_len(&self, pid: u32, idx: u16, surface_len: usize) -> Option<usize> {
        let rec = self.record(pid, idx)?;
        let t = self.transform(rec.transform_id)?;
        let affix_len = UniString::from_str(t.left_add).len() + UniString::from_str(t.right_add).len();
        surface_len.checked_sub(affix_len)
    }
}

fn corrupt_paradigms() -> XmorphyError {
    XmorphyError::corrupt_dictionary("paradigm section is out of range")
}

fn corrupt_lemmas() -> XmorphyError {
    XmorphyError::corrupt_dictionary("lemma table section is out of range")
}

/// Спецификация трансформации на этапе построения.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct TransformSpec {
    pub left_cut: u16,
    pub right_cut: u16,
    pub left_add: String,
    pub right_add: String,
}

/// Спецификация записи парадигмы на этапе построения.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct RecordSpec {
    pub tag: MorphTag,
    pub transform: TransformSpec,
    pub ending: String,
}

/// Сериализатор хранилища парадигм с интернированием боковых таблиц.
#[derive(Default)]
pub struct ParadigmWriter {
    transforms: Vec<(u16, u16, u16, u16)>,
    transform_ids: HashMap<(u16, u16, u16, u16), u16>,
    strings: Vec<String>,
    string_ids: HashMap<String, u16>,
}

impl ParadigmWriter {
    /// Создаёт сериализатор; пустая строка интернируется с id 0.
    pub fn new() -> Self {
        let mut w = Self::default();
        w.strings.push(String::new());
        w.string_ids.insert(String::new(), 0);
        w
    }

    fn intern_string(&mut self, s: &str) -> Result<u16> {
        if let Some(&id) = self.string_ids.get(s) {
            return Ok(id);
        }
        let id = u16::try_from(self.strings.len()).map_err(|_| {
            XmorphyError::invalid_argument("paradigms", "too many interned strings")
        })?;
        self.strings.push(s.to_string());
        self.string_ids.insert(s.to_string(), id);
        Ok(id)
    }

    fn intern_transform(&mut self, spec: &TransformSpec) -> Result<u16> {
        let left_add = self.intern_string(&spec.left_add)?;
        let right_add = self.intern_string(&spec.right_add)?;
        let key = (spec.left_cut, spec.right_cut, left_add, right_add);
        if let Some(&id) = self.transform_ids.get(&key) {
            return Ok(id);
        }
        let id = u16::try_from(self.transforms.len())
            .map_err(|_| XmorphyError::invalid_argument("paradigms", "too many transforms"))?;
        self.transforms.push(key);
        self.transform_ids.insert(key, id);
        Ok(id)
    }

    /// Сериализует парадигмы в пару блобов (секция парадигм, секция таблиц).
    pub fn write(mut self, paradigms: &[Vec<RecordSpec>]) -> Result<(Vec<u8>, Vec<u8>)> {
        let mut bodies: Vec<u8> = vec![];
        let mut offsets: Vec<u32> = Vec::with_capacity(paradigms.len());
        let header_len = 4 + paradigms.len() * 4;

        for paradigm in paradigms {
            offsets.push(u32::try_from(header_len + bodies.len())?);
            let len = u16::try_from(paradigm.len()).map_err(|_| {
                XmorphyError::invalid_argument("paradigms", "paradigm has too many forms")
            })?;
            bodies.extend_from_slice(&len.to_le_bytes());
            for rec in paradigm {
                let transform_id = self.intern_transform(&rec.transform)?;
                let ending_id = self.intern_string(&rec.ending)?;
                bodies.extend_from_slice(&rec.tag.bits().to_le_bytes());
                bodies.extend_from_slice(&transform_id.to_le_bytes());
                bodies.extend_from_slice(&ending_id.to_le_bytes());
            }
        }

        let mut paradigm_blob = Vec::with_capacity(header_len + bodies.len());
        paradigm_blob.extend_from_slice(&u32::try_from(paradigms.len())?.to_le_bytes());
        for off in offsets {
            paradigm_blob.extend_from_slice(&off.to_le_bytes());
        }
        paradigm_blob.extend_from_slice(&bodies);

        let mut lemma_blob = vec![];
        lemma_blob.extend_from_slice(&u32::try_from(self.transforms.len())?.to_le_bytes());
        for (left_cut, right_cut, left_add, right_add) in &self.transforms {
            lemma_blob.extend_from_slice(&left_cut.to_le_bytes());
            lemma_blob.extend_from_slice(&right_cut.to_le_bytes());
            lemma_blob.extend_from_slice(&left_add.to_le_bytes());
            lemma_blob.extend_from_slice(&right_add.to_le_bytes());
        }
        lemma_blob.extend_from_slice(&u32::try_from(self.strings.len())?.to_le_bytes());
        let mut acc = 0u32;
        lemma_blob.extend_from_slice(&acc.to_le_bytes());
        let mut bytes: Vec<u8> = vec![];
        for s in &self.strings {
            bytes.extend_from_slice(s.as_bytes());
            acc = u32::try_from(bytes.len())?;
            lemma_blob.extend_from_slice(&acc.to_le_bytes());
        }
        lemma_blob.extend_from_slice(&bytes);

        Ok((paradigm_blob, lemma_blob))
    }
}
