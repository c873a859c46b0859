//! Вспомогательные функции и трейты преобразования типов.
//!
//! Здесь собраны преобразование `u32` → `usize` и кодирование варинтов
//! (LEB128), используемое сериализованными блобами словаря.

/// Трейт преобразования из `u32`.
///
/// В отличие от стандартного `From`, опирается на гарантию, что ширина
/// указателя равна 32 или 64 битам.
pub trait FromU32 {
    /// Создаёт значение реализующего типа из `u32`.
    fn from_u32(src: u32) -> Self;
}

#[cfg(any(target_pointer_width = "32", target_pointer_width = "64"))]
impl FromU32 for usize {
    #[inline(always)]
    fn from_u32(src: u32) -> Self {
        // The cfg above limits builds to 32- or 64-bit pointers, so a u32
        // cannot exceed usize and the conversion never fails.
        unsafe { Self::try_from(src).unwrap_unchecked() }
    }
}

/// Дописывает беззнаковый варинт (LEB128) в буфер.
pub(crate) fn write_varint(buf: &mut Vec<u8>, mut value: u64) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            buf.push(byte);
            return;
        }
        buf.push(byte | 0x80);
    }
}

/// Читает беззнаковый варинт (LEB128) начиная с `pos`.
///
/// Возвращает значение и позицию за последним прочитанным байтом,
/// либо `None`, если байты кончились или варинт длиннее 10 байт.
pub(crate) fn read_varint(bytes: &[u8], pos: usize) -> Option<(u64, usize)> {
    let mut value: u64 = 0;
    let mut shift = 0u32;
    let mut i = pos;
    loop {
        let &byte = bytes.get(i)?;
        i += 1;
        if shift >= 64 {
            return None;
        }
        value |= u64::from(byte & 0x7f) << shift;
        if byte & 0x80 == 0 {
            return Some((value, i));
        }
        shift += 7;
    }
}

/// Читает `u32` в формате little-endian по смещению `pos`.
#[inline(always)]
pub(crate) fn read_u32_le(bytes: &[u8], pos: usize) -> Option<u32> {
    let chunk = bytes.get(pos..pos + 4)?;
    Some(u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
}

/// Читает `u16` в формате little-endian по смещению `pos`.
#[inline(always)]
pub(crate) fn read_u16_le(bytes: &[u8], pos: usize) -> Option<u16> {
    let chunk = bytes.get(pos..pos + 2)?;
    Some(u16::from_le_bytes([chunk[0], chunk[1]]))
}

/// Читает `u64` в формате little-endian по смещению `pos`.
#[inline(always)]
pub(crate) fn read_u64_le(bytes: &[u8], pos: usize) -> Option<u64> {
    let chunk = bytes.get(pos..pos + 8)?;
    let mut raw = [0u8; 8];
    raw.copy_from_slice(chunk);
    Some(u64::from_le_bytes(raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_varint_roundtrip() {
        let values = [0u64, 1, 127, 128, 300, 16383, 16384, u32::MAX as u64, u64::MAX];
        let mut buf = vec![];
        for &v in &values {
            buf.clear();
            write_varint(&mut buf, v);
            let (decoded, end) = read_varint(&buf, 0).unwrap();
            assert_eq!(decoded, v);
            assert_eq!(end, buf.len());
        }
    }

    #[test]
    fn test_varint_truncated() {
        let buf = [0x80u8, 0x80];
        assert!(read_varint(&buf, 0).is_none());
    }

    #[test]
    fn test_read_le() {
        let bytes = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];
        assert_eq!(read_u32_le(&bytes, 0), Some(0x0403_0201));
        assert_eq!(read_u16_le(&bytes, 2), Some(0x0403));
        assert_eq!(read_u64_le(&bytes, 0), Some(0x0807_0605_0403_0201));
        assert_eq!(read_u32_le(&bytes, 6), None);
    }
}
