//! Направленный ациклический граф слов (DAWG).
//!
//! Этот модуль предоставляет минимальный детерминированный ациклический
//! граф слов с полезной нагрузкой на принимающих состояниях. Запросы
//! выполняются непосредственно над сериализованным блобом без его
//! материализации, поэтому блоб пригоден для отображения в память.
//!
//! Формат блоба (little-endian):
//!
//! ```text
//! [4B b"DAWG"][u32 num_states][u32 index_offset][u32 states_offset]
//! [u32 payload_offset][u32 alphabet_len][алфавит: u32 × len]
//! [индекс состояний: u32 × num_states][записи состояний][блоб нагрузок]
//! ```
//!
//! Запись состояния: байт флагов, варинт числа ключей в поддереве, варинт
//! смещения нагрузки (если есть), варинт числа переходов и переходы
//! (варинт id символа, варинт целевого состояния). Целевой индекс каждого
//! перехода строго больше индекса исходного состояния (топологический
//! порядок).

pub mod builder;

use crate::chars::{Char, UniString};
use crate::errors::{Result, XmorphyError};
use crate::utils::{read_u32_le, read_varint, FromU32};

pub use builder::DawgBuilder;

/// Магические байты блоба DAWG.
pub(crate) const DAWG_MAGIC: &[u8; 4] = b"DAWG";

const HEADER_LEN: usize = 24;

const FLAG_ACCEPT: u8 = 0b01;
const FLAG_PAYLOAD: u8 = 0b10;

const EMPTY_PAYLOAD: &[u8] = &[];

/// Представление запроса к сериализованному DAWG.
///
/// Хранит только срезы исходного блоба; копирование дёшево.
#[derive(Clone, Copy)]
pub struct Dawg<'a> {
    alphabet: &'a [u8],
    index: &'a [u8],
    states: &'a [u8],
    payloads: &'a [u8],
    num_states: usize,
    alphabet_len: usize,
}

/// Разобранная запись одного состояния.
struct StateRec<'a> {
    flags: u8,
    key_count: u32,
    payload_off: usize,
    // transition bytes, decoded on demand
    trans: &'a [u8],
    n_trans: usize,
}

impl<'a> Dawg<'a> {
    /// Создаёт представление с полной структурной проверкой блоба.
    ///
    /// # Ошибки
    ///
    /// Возвращает [`XmorphyError::CorruptDictionary`], если магические байты
    /// не совпадают, секции выходят за границы, переход ссылается на
    /// несуществующее состояние или нарушен топологический порядок.
    pub fn new(bytes: &'a [u8]) -> Result<Self> {
        let dawg = Self::view(bytes)?;
        dawg.validate_full()?;
        Ok(dawg)
    }

    /// Создаёт представление, проверяя только заголовок и границы секций.
    ///
    /// Используется словарём после того, как блоб уже прошёл полную
    /// проверку при загрузке.
    pub(crate) fn view(bytes: &'a [u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN || &bytes[..4] != DAWG_MAGIC {
            return Err(XmorphyError::corrupt_dictionary(
                "DAWG blob magic mismatches",
            ));
        }
        let num_states = usize::from_u32(read_u32_le(bytes, 4).unwrap_or(0));
        let index_offset = usize::from_u32(read_u32_le(bytes, 8).unwrap_or(0));
        let states_offset = usize::from_u32(read_u32_le(bytes, 12).unwrap_or(0));
        let payload_offset = usize::from_u32(read_u32_le(bytes, 16).unwrap_or(0));
        let alphabet_len = usize::from_u32(read_u32_le(bytes, 20).unwrap_or(0));

        let alphabet_end = HEADER_LEN
            .checked_add(alphabet_len.checked_mul(4).ok_or_else(corrupt_sections)?)
            .ok_or_else(corrupt_sections)?;
        let index_end = index_offset
            .checked_add(num_states.checked_mul(4).ok_or_else(corrupt_sections)?)
            .ok_or_else(corrupt_sections)?;
        if alphabet_end != index_offset
            || index_end != states_offset
            || states_offset > payload_offset
            || payload_offset > bytes.len()
            || num_states == 0
        {
            return Err(corrupt_sections());
        }

        Ok(Self {
            alphabet: &bytes[HEADER_LEN..alphabet_end],
            index: &bytes[index_offset..index_end],
            states: &bytes[states_offset..payload_offset],
            payloads: &bytes[payload_offset..],
            num_states,
            alphabet_len,
        })
    }

    /// Полная структурная проверка всех состояний.
    fn validate_full(&self) -> Result<()> {
        // The alphabet must be strictly ascending so that lookups can
        // binary-search it.
        let mut prev_cp: Option<u32> = None;
        for i in 0..self.alphabet_len {
            let cp = read_u32_le(self.alphabet, i * 4).ok_or_else(corrupt_sections)?;
            if char::from_u32(cp).is_none() {
                return Err(XmorphyError::corrupt_dictionary(
                    "DAWG alphabet contains an invalid scalar value",
                ));
            }
            if let Some(p) = prev_cp {
                if cp <= p {
                    return Err(XmorphyError::corrupt_dictionary(
                        "DAWG alphabet is not sorted",
                    ));
                }
            }
            prev_cp = Some(cp);
        }

        for idx in 0..self.num_states {
            let rec = self.state(idx).ok_or_else(|| {
                XmorphyError::corrupt_dictionary(format!("DAWG state {} is unreadable", idx))
            })?;
            if rec.flags & FLAG_PAYLOAD != 0 {
                if rec.flags & FLAG_ACCEPT == 0 {
                    return Err(XmorphyError::corrupt_dictionary(
                        "DAWG payload on a non-accepting state",
                    ));
                }
                if self.payload_at(rec.payload_off).is_none() {
                    return Err(XmorphyError::corrupt_dictionary(
                        "DAWG payload offset is out of range",
                    ));
                }
            }
            let mut prev_char_id: Option<u64> = None;
            let mut pos = 0usize;
            for _ in 0..rec.n_trans {
                let (char_id, next) = read_varint(rec.trans, pos).ok_or_else(corrupt_state)?;
                let (target, next) = read_varint(rec.trans, next).ok_or_else(corrupt_state)?;
                pos = next;
                if char_id >= self.alphabet_len as u64 {
                    return Err(XmorphyError::corrupt_dictionary(
                        "DAWG transition char id is out of range",
                    ));
                }
                if let Some(p) = prev_char_id {
                    if char_id <= p {
                        return Err(XmorphyError::corrupt_dictionary(
                            "DAWG transitions are not sorted",
                        ));
                    }
                }
                prev_char_id = Some(char_id);
                if target >= self.num_states as u64 {
                    return Err(XmorphyError::corrupt_dictionary(
                        "DAWG transition references an out-of-range state",
                    ));
                }
                if target <= idx as u64 {
                    return Err(XmorphyError::corrupt_dictionary(
                        "DAWG topological order is violated",
                    ));
                }
            }
        }
        Ok(())
    }

    /// Число состояний графа.
    #[inline(always)]
    pub fn num_states(&self) -> usize {
        self.num_states
    }

    /// Общее число хранимых ключей.
    #[inline(always)]
    pub fn num_keys(&self) -> u32 {
        self.state(0).map(|s| s.key_count).unwrap_or(0)
    }

    /// Возвращает id символа в алфавите графа.
    fn char_id(&self, c: Char) -> Option<u64> {
        let cp = c.get() as u32;
        let mut lo = 0usize;
        let mut hi = self.alphabet_len;
        while lo < hi {
            let mid = (lo + hi) / 2;
            let v = read_u32_le(self.alphabet, mid * 4)?;
            match v.cmp(&cp) {
                std::cmp::Ordering::Equal => return Some(mid as u64),
                std::cmp::Ordering::Less => lo = mid + 1,
                std::cmp::Ordering::Greater => hi = mid,
            }
        }
        None
    }

    /// Возвращает символ по id алфавита.
    fn char_at(&self, id: u64) -> Option<Char> {
        let cp = read_u32_le(self.alphabet, (id as usize) * 4)?;
        char::from_u32(cp).map(Char::new)
    }

    /// Разбирает запись состояния по индексу.
    fn state(&self, idx: usize) -> Option<StateRec<'a>> {
        let off = usize::from_u32(read_u32_le(self.index, idx * 4)?);
        let flags = *self.states.get(off)?;
        let (key_count, pos) = read_varint(self.states, off + 1)?;
        let (payload_off, pos) = if flags & FLAG_PAYLOAD != 0 {
            let (p, pos) = read_varint(self.states, pos)?;
            (usize::from_u32(u32::try_from(p).ok()?), pos)
        } else {
            (0, pos)
        };
        let (n_trans, pos) = read_varint(self.states, pos)?;
        Some(StateRec {
            flags,
            key_count: u32::try_from(key_count).ok()?,
            payload_off,
            trans: self.states.get(pos..)?,
            n_trans: usize::try_from(n_trans).ok()?,
        })
    }

    /// Декодирует переходы состояния.
    fn transitions(&self, rec: &StateRec<'a>) -> Vec<(u64, usize)> {
        let mut out = Vec::with_capacity(rec.n_trans);
        let mut pos = 0usize;
        for _ in 0..rec.n_trans {
            let Some((char_id, next)) = read_varint(rec.trans, pos) else {
                break;
            };
            let Some((target, next)) = read_varint(rec.trans, next) else {
                break;
            };
            pos = next;
            out.push((char_id, target as usize));
        }
        out
    }

    /// Переход из состояния по символу.
    fn step(&self, rec: &StateRec<'a>, c: Char) -> Option<usize> {
        let char_id = self.char_id(c)?;
        let mut pos = 0usize;
        for _ in 0..rec.n_trans {
            let (cid, next) = read_varint(rec.trans, pos)?;
            let (target, next) = read_varint(rec.trans, next)?;
            pos = next;
            if cid == char_id {
                return Some(target as usize);
            }
            if cid > char_id {
                return None;
            }
        }
        None
    }

    /// Проходит по графу вдоль ключа.
    fn traverse(&self, key: &[Char]) -> Option<StateRec<'a>> {
        let mut rec = self.state(0)?;
        for &c in key {
            let target = self.step(&rec, c)?;
            rec = self.state(target)?;
        }
        Some(rec)
    }

    /// Декодирует полезную нагрузку по смещению в блобе нагрузок.
    fn payload_at(&self, off: usize) -> Option<&'a [u8]> {
        let (len, pos) = read_varint(self.payloads, off)?;
        // The length varint is unconstrained in a corrupt blob, so the end
        // offset must be computed without overflow.
        let end = pos.checked_add(usize::try_from(len).ok()?)?;
        self.payloads.get(pos..end)
    }

    /// Ищет ключ и возвращает его полезную нагрузку.
    ///
    /// Для принятого ключа без нагрузки возвращается пустой срез.
    pub fn lookup(&self, key: &UniString) -> Option<&'a [u8]> {
        let rec = self.traverse(key.chars())?;
        if rec.flags & FLAG_ACCEPT == 0 {
            return None;
        }
        if rec.flags & FLAG_PAYLOAD != 0 {
            self.payload_at(rec.payload_off)
        } else {
            Some(EMPTY_PAYLOAD)
        }
    }

    /// Проверяет, хранится ли указанный ключ.
    #[inline]
    pub fn contains_key(&self, key: &UniString) -> bool {
        self.lookup(key).is_some()
    }

    /// Проверяет, есть ли в графе ключи с указанным префиксом.
    pub fn contains_prefix(&self, prefix: &UniString) -> bool {
        self.traverse(prefix.chars()).is_some()
    }

    /// Число хранимых ключей, начинающихся с указанного префикса.
    pub fn count_prefix(&self, prefix: &UniString) -> u32 {
        self.traverse(prefix.chars())
            .map(|rec| rec.key_count)
            .unwrap_or(0)
    }

    /// Итератор по ключам с указанным префиксом в отсортированном порядке.
    pub fn iter_with_prefix(&self, prefix: &UniString) -> PrefixIter<'a> {
        let dawg = *self;
        let mut chars: Vec<Char> = prefix.chars().to_vec();
        let mut stack = vec![];
        let mut start_accept = false;

        let mut state_idx = Some(0usize);
        if let Some(mut rec) = dawg.state(0) {
            for &c in prefix.chars() {
                match dawg.step(&rec, c) {
                    Some(target) => {
                        state_idx = Some(target);
                        rec = match dawg.state(target) {
                            Some(r) => r,
                            None => {
                                state_idx = None;
                                break;
                            }
                        };
                    }
                    None => {
                        state_idx = None;
                        break;
                    }
                }
            }
            if let Some(idx) = state_idx {
                if let Some(rec) = dawg.state(idx) {
                    start_accept = rec.flags & FLAG_ACCEPT != 0;
                    stack.push(Frame {
                        state: idx,
                        trans: dawg.transitions(&rec),
                        cursor: 0,
                    });
                }
            }
        }
        if state_idx.is_none() {
            chars.clear();
        }

        PrefixIter {
            dawg,
            stack,
            chars,
            start_pending: start_accept,
        }
    }
}

/// Кадр обхода для итератора по префиксу.
struct Frame {
    state: usize,
    trans: Vec<(u64, usize)>,
    cursor: usize,
}

/// Итератор по ключам DAWG в лексикографическом порядке.
pub struct PrefixIter<'a> {
    dawg: Dawg<'a>,
    stack: Vec<Frame>,
    chars: Vec<Char>,
    start_pending: bool,
}

impl<'a> Iterator for PrefixIter<'a> {
    type Item = (UniString, &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        if self.start_pending {
            self.start_pending = false;
            let frame = self.stack.last()?;
            let payload = self.dawg.payload_of(frame.state)?;
            return Some((UniString::from_chars(self.chars.clone()), payload));
        }
        loop {
            let depth = self.stack.len();
            let frame = self.stack.last_mut()?;
            if frame.cursor < frame.trans.len() {
                let (char_id, target) = frame.trans[frame.cursor];
                frame.cursor += 1;
                let c = self.dawg.char_at(char_id)?;
                self.chars.push(c);
                let rec = self.dawg.state(target)?;
                let accept = rec.flags & FLAG_ACCEPT != 0;
                let trans = self.dawg.transitions(&rec);
                self.stack.push(Frame {
                    state: target,
                    trans,
                    cursor: 0,
                });
                if accept {
                    let payload = self.dawg.payload_of(target)?;
                    return Some((UniString::from_chars(self.chars.clone()), payload));
                }
            } else {
                self.stack.pop();
                if depth > 1 {
                    self.chars.pop();
                }
            }
        }
    }
}

impl<'a> Dawg<'a> {
    /// Полезная нагрузка принимающего состояния по индексу.
    fn payload_of(&self, idx: usize) -> Option<&'a [u8]> {
        let rec = self.state(idx)?;
        if rec.flags & FLAG_PAYLOAD != 0 {
            self.payload_at(rec.payload_off)
        } else {
            Some(EMPTY_PAYLOAD)
        }
    }
}

fn corrupt_sections() -> XmorphyError {
    XmorphyError::corrupt_dictionary("DAWG section table is out of range")
}

fn corrupt_state() -> XmorphyError {
    XmorphyError::corrupt_dictionary("DAWG state record is truncated")
}
