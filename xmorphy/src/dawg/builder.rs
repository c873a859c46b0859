//! Построение минимального DAWG.
//!
//! Ключи подаются строго в отсортированном порядке; построитель ведёт
//! инкрементальную минимизацию: состояния вдоль пути последнего ключа
//! остаются «незамороженными», а при расхождении следующего ключа хвост
//! пути канонизируется через регистр эквивалентных состояний. Это даёт
//! минимальный граф за время, линейное по суммарной длине ключей.

use hashbrown::HashMap;

use crate::chars::{Char, UniString};
use crate::errors::{Result, XmorphyError};
use crate::utils::write_varint;

use super::{DAWG_MAGIC, FLAG_ACCEPT, FLAG_PAYLOAD};

/// Состояние строящегося графа.
#[derive(Default)]
struct BuildState {
    trans: Vec<(Char, u32)>,
    accept: bool,
    payload: Vec<u8>,
}

/// Построитель минимального DAWG.
///
/// # Пример
///
/// ```
/// use xmorphy::dawg::{Dawg, DawgBuilder};
/// use xmorphy::chars::UniString;
///
/// let mut builder = DawgBuilder::new();
/// builder.insert(&UniString::from_str("КОТ"), b"1").unwrap();
/// builder.insert(&UniString::from_str("КОТЫ"), b"2").unwrap();
/// let bytes = builder.finalize().unwrap();
/// let dawg = Dawg::new(&bytes).unwrap();
/// assert_eq!(dawg.lookup(&UniString::from_str("КОТ")), Some(&b"1"[..]));
/// ```
pub struct DawgBuilder {
    states: Vec<BuildState>,
    register: HashMap<Vec<u8>, u32>,
    /// Индексы состояний вдоль пути последнего вставленного ключа;
    /// `path[0]` — корень.
    path: Vec<u32>,
    last_key: Vec<Char>,
}

impl Default for DawgBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DawgBuilder {
    /// Создаёт пустой построитель.
    pub fn new() -> Self {
        Self {
            states: vec![BuildState::default()],
            register: HashMap::new(),
            path: vec![0],
            last_key: vec![],
        }
    }

    /// Вставляет ключ с полезной нагрузкой.
    ///
    /// # Ошибки
    ///
    /// Возвращает ошибку, если ключ пуст либо не превосходит строго
    /// предыдущий вставленный ключ.
    pub fn insert(&mut self, key: &UniString, payload: &[u8]) -> Result<()> {
        let chars = key.chars();
        if chars.is_empty() {
            return Err(XmorphyError::invalid_argument("key", "key must be non-empty"));
        }
        if !self.last_key.is_empty() && chars <= self.last_key.as_slice() {
            return Err(XmorphyError::invalid_argument(
                "key",
                format!("keys must be unique and sorted, got {:?} after {:?}", key, UniString::from_chars(self.last_key.clone())),
            ));
        }

        let common = chars
            .iter()
            .zip(self.last_key.iter())
            .take_while(|(a, b)| a == b)
            .count();

        self.minimize_to(common);

        for &c in &chars[common..] {
            let new_idx = u32::try_from(self.states.len())?;
            self.states.push(BuildState::default());
            let parent = *self.path.last().unwrap_or(&0);
            self.states[parent as usize].trans.push((c, new_idx));
            self.path.push(new_idx);
        }

        let last = *self.path.last().unwrap_or(&0);
        let state = &mut self.states[last as usize];
        state.accept = true;
        state.payload = payload.to_vec();
        self.last_key = chars.to_vec();
        Ok(())
    }

    /// Канонизирует хвост текущего пути до глубины `depth`.
    fn minimize_to(&mut self, depth: usize) {
        while self.path.len() > depth + 1 {
            let child = self.path.pop().unwrap();
            let parent = *self.path.last().unwrap();
            let canonical = self.replace_or_register(child);
            if canonical != child {
                let last = self.states[parent as usize]
                    .trans
                    .last_mut()
                    .expect("parent must have a transition to the popped child");
                last.1 = canonical;
            }
        }
    }

    /// Ищет эквивалентное замороженное состояние; регистрирует новое,
    /// если эквивалента нет.
    fn replace_or_register(&mut self, idx: u32) -> u32 {
        let sig = self.signature(idx);
        *self.register.entry(sig).or_insert(idx)
    }

    /// Каноническая подпись состояния: флаг принятия, нагрузка и список
    /// переходов с уже канонизированными целями.
    fn signature(&self, idx: u32) -> Vec<u8> {
        let state = &self.states[idx as usize];
        let mut sig = Vec::with_capacity(16 + state.payload.len() + state.trans.len() * 8);
        sig.push(state.accept as u8);
        sig.extend_from_slice(&(state.payload.len() as u32).to_le_bytes());
        sig.extend_from_slice(&state.payload);
        for &(c, target) in &state.trans {
            sig.extend_from_slice(&(c.get() as u32).to_le_bytes());
            sig.extend_from_slice(&target.to_le_bytes());
        }
        sig
    }

    /// Завершает построение и сериализует минимальный граф.
    pub fn finalize(mut self) -> Result<Vec<u8>> {
        self.minimize_to(0);
        self.serialize()
    }

    /// Сериализует граф в формат, описанный в [`crate::dawg`].
    fn serialize(&self) -> Result<Vec<u8>> {
        // Reverse post-order from the root yields a topological numbering:
        // every transition goes from a lower index to a higher one.
        let post_order = self.post_order();
        let num_states = post_order.len();
        let mut renumber: HashMap<u32, u32> = HashMap::with_capacity(num_states);
        for (new_idx, &old_idx) in post_order.iter().rev().enumerate() {
            renumber.insert(old_idx, u32::try_from(new_idx)?);
        }

        // Key counts: accepting paths in the sub-automaton of each state.
        let mut counts: HashMap<u32, u64> = HashMap::with_capacity(num_states);
        for &old_idx in &post_order {
            let state = &self.states[old_idx as usize];
            let mut count = state.accept as u64;
            for &(_, target) in &state.trans {
                count += counts.get(&target).copied().unwrap_or(0);
            }
            counts.insert(old_idx, count);
        }

        // Alphabet over the reachable states, sorted by scalar value.
        let mut alphabet: Vec<u32> = post_order
            .iter()
            .flat_map(|&idx| self.states[idx as usize].trans.iter())
            .map(|&(c, _)| c.get() as u32)
            .collect();
        alphabet.sort_unstable();
        alphabet.dedup();
        let char_ids: HashMap<u32, u64> = alphabet
            .iter()
            .enumerate()
            .map(|(i, &cp)| (cp, i as u64))
            .collect();

        // Payload blob with deduplication of identical payloads.
        let mut payload_blob: Vec<u8> = vec![];
        let mut payload_offsets: HashMap<Vec<u8>, u64> = HashMap::new();

        let mut records: Vec<u8> = vec![];
        let mut index: Vec<u8> = Vec::with_capacity(num_states * 4);

        for &old_idx in post_order.iter().rev() {
            index.extend_from_slice(&u32::try_from(records.len())?.to_le_bytes());

            let state = &self.states[old_idx as usize];
            let has_payload = state.accept && !state.payload.is_empty();
            let mut flags = 0u8;
            if state.accept {
                flags |= FLAG_ACCEPT;
            }
            if has_payload {
                flags |= FLAG_PAYLOAD;
            }
            records.push(flags);
            write_varint(&mut records, counts.get(&old_idx).copied().unwrap_or(0));
            if has_payload {
                let off = match payload_offsets.get(&state.payload) {
                    Some(&off) => off,
                    None => {
                        let off = payload_blob.len() as u64;
                        write_varint(&mut payload_blob, state.payload.len() as u64);
                        payload_blob.extend_from_slice(&state.payload);
                        payload_offsets.insert(state.payload.clone(), off);
                        off
                    }
                };
                write_varint(&mut records, off);
            }

            let mut trans: Vec<(u64, u32)> = state
                .trans
                .iter()
                .map(|&(c, target)| (char_ids[&(c.get() as u32)], renumber[&target]))
                .collect();
            trans.sort_unstable_by_key(|&(cid, _)| cid);
            write_varint(&mut records, trans.len() as u64);
            for (cid, target) in trans {
                write_varint(&mut records, cid);
                write_varint(&mut records, u64::from(target));
            }
        }

        let header_len = 24usize;
        let alphabet_bytes = alphabet.len() * 4;
        let index_offset = header_len + alphabet_bytes;
        let states_offset = index_offset + index.len();
        let payload_offset = states_offset + records.len();

        let mut out = Vec::with_capacity(payload_offset + payload_blob.len());
        out.extend_from_slice(DAWG_MAGIC);
        out.extend_from_slice(&u32::try_from(num_states)?.to_le_bytes());
        out.extend_from_slice(&u32::try_from(index_offset)?.to_le_bytes());
        out.extend_from_slice(&u32::try_from(states_offset)?.to_le_bytes());
        out.extend_from_slice(&u32::try_from(payload_offset)?.to_le_bytes());
        out.extend_from_slice(&u32::try_from(alphabet.len())?.to_le_bytes());
        for cp in alphabet {
            out.extend_from_slice(&cp.to_le_bytes());
        }
        out.extend_from_slice(&index);
        out.extend_from_slice(&records);
        out.extend_from_slice(&payload_blob);
        Ok(out)
    }

    /// Обход достижимых состояний в пост-порядке от корня.
    fn post_order(&self) -> Vec<u32> {
        let mut visited = vec![false; self.states.len()];
        let mut order = Vec::new();
        // (state, next child cursor)
        let mut stack: Vec<(u32, usize)> = vec![(0, 0)];
        visited[0] = true;
        while let Some((idx, cursor)) = stack.last().copied() {
            let state = &self.states[idx as usize];
            if cursor < state.trans.len() {
                stack.last_mut().unwrap().1 += 1;
                let target = state.trans[cursor].1;
                if !visited[target as usize] {
                    visited[target as usize] = true;
                    stack.push((target, 0));
                }
            } else {
                order.push(idx);
                stack.pop();
            }
        }
        order
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dawg::Dawg;

    #[test]
    fn test_empty_key_rejected() {
        let mut b = DawgBuilder::new();
        assert!(b.insert(&UniString::new(), b"").is_err());
    }

    #[test]
    fn test_shared_payload_dedup() {
        let mut b = DawgBuilder::new();
        b.insert(&UniString::from_str("ДОМА"), b"same").unwrap();
        b.insert(&UniString::from_str("ДОМУ"), b"same").unwrap();
        let bytes = b.finalize().unwrap();
        let dawg = Dawg::new(&bytes).unwrap();
        assert_eq!(dawg.lookup(&UniString::from_str("ДОМА")), Some(&b"same"[..]));
        assert_eq!(dawg.lookup(&UniString::from_str("ДОМУ")), Some(&b"same"[..]));
    }

    #[test]
    fn test_single_key() {
        let mut b = DawgBuilder::new();
        b.insert(&UniString::from_str("Я"), b"p").unwrap();
        let bytes = b.finalize().unwrap();
        let dawg = Dawg::new(&bytes).unwrap();
        assert_eq!(dawg.num_keys(), 1);
        assert_eq!(dawg.lookup(&UniString::from_str("Я")), Some(&b"p"[..]));
    }
}
