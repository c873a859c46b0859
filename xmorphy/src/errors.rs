//! Определения типов ошибок.
//!
//! Этот модуль определяет все типы ошибок, используемые библиотекой XMorphy.

use std::fmt;

/// Специализированный тип Result для XMorphy.
///
/// По умолчанию использует [`XmorphyError`] в качестве типа ошибки.
pub type Result<T, E = XmorphyError> = std::result::Result<T, E>;

/// Тип ошибки XMorphy.
///
/// Представляет все ошибки, которые могут возникнуть в библиотеке.
/// Восстановимые состояния (пустой разбор, неизвестная лемма при синтезе)
/// ошибками не являются и возвращаются как значения.
#[derive(Debug, thiserror::Error)]
pub enum XmorphyError {
    /// Недопустимый аргумент.
    #[error(transparent)]
    InvalidArgument(InvalidArgumentError),

    /// Недопустимый формат входных данных.
    #[error(transparent)]
    InvalidFormat(InvalidFormatError),

    /// Недопустимое состояние.
    #[error(transparent)]
    InvalidState(InvalidStateError),

    /// Структурное повреждение словарного файла.
    ///
    /// Возникает при загрузке, если магические байты не совпадают, переход
    /// ссылается на несуществующее состояние или нарушен топологический
    /// порядок состояний графа.
    #[error("CorruptDictionary: {0}")]
    CorruptDictionary(String),

    /// Повреждение файла модели.
    #[error("CorruptModel: {0}")]
    CorruptModel(String),

    /// Несоответствие словаря признаков или тегов модели.
    ///
    /// Модель ожидает входной или выходной словарь, не совпадающий с
    /// предоставленным.
    #[error("VocabMismatch: {0}")]
    VocabMismatch(String),

    /// Ошибка преобразования целых чисел.
    #[error(transparent)]
    TryFromInt(#[from] std::num::TryFromIntError),

    /// Ошибка разбора целого числа.
    #[error(transparent)]
    ParseInt(#[from] std::num::ParseIntError),

    /// Ошибка разбора числа с плавающей точкой.
    #[error(transparent)]
    ParseFloat(#[from] std::num::ParseFloatError),

    /// Ошибка ввода-вывода.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Ошибка кодировки UTF-8.
    #[error(transparent)]
    Utf8(#[from] std::str::Utf8Error),

    /// Ошибка среды исполнения моделей.
    #[error(transparent)]
    Model(#[from] candle_core::Error),

    /// Ошибка разбора JSON-словаря модели.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Ошибка разбора XML-источника словаря.
    ///
    /// Доступна только при включённой фиче `compile`.
    #[cfg(feature = "compile")]
    #[error(transparent)]
    Xml(#[from] quick_xml::Error),
}

impl XmorphyError {
    /// Создаёт ошибку недопустимого аргумента.
    pub(crate) fn invalid_argument<S>(arg: &'static str, msg: S) -> Self
    where
        S: Into<String>,
    {
        Self::InvalidArgument(InvalidArgumentError {
            arg,
            msg: msg.into(),
        })
    }

    /// Создаёт ошибку недопустимого формата.
    pub(crate) fn invalid_format<S>(arg: &'static str, msg: S) -> Self
    where
        S: Into<String>,
    {
        Self::InvalidFormat(InvalidFormatError {
            arg,
            msg: msg.into(),
        })
    }

    /// Создаёт ошибку недопустимого состояния.
    #[allow(dead_code)]
    pub(crate) fn invalid_state<S, M>(msg: S, cause: M) -> Self
    where
        S: Into<String>,
        M: Into<String>,
    {
        Self::InvalidState(InvalidStateError {
            msg: msg.into(),
            cause: cause.into(),
        })
    }

    /// Создаёт ошибку повреждённого словаря.
    pub(crate) fn corrupt_dictionary<S>(msg: S) -> Self
    where
        S: Into<String>,
    {
        Self::CorruptDictionary(msg.into())
    }

    /// Создаёт ошибку повреждённой модели.
    pub(crate) fn corrupt_model<S>(msg: S) -> Self
    where
        S: Into<String>,
    {
        Self::CorruptModel(msg.into())
    }

    /// Создаёт ошибку несоответствия словарей модели.
    pub(crate) fn vocab_mismatch<S>(msg: S) -> Self
    where
        S: Into<String>,
    {
        Self::VocabMismatch(msg.into())
    }
}

/// Ошибка, используемая при недопустимом аргументе.
#[derive(Debug)]
pub struct InvalidArgumentError {
    /// Имя аргумента.
    pub(crate) arg: &'static str,

    /// Сообщение об ошибке.
    pub(crate) msg: String,
}

impl fmt::Display for InvalidArgumentError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "InvalidArgumentError: {}: {}", self.arg, self.msg)
    }
}

impl std::error::Error for InvalidArgumentError {}

/// Ошибка, используемая при недопустимом формате входных данных.
#[derive(Debug)]
pub struct InvalidFormatError {
    /// Имя формата.
    pub(crate) arg: &'static str,

    /// Сообщение об ошибке.
    pub(crate) msg: String,
}

impl fmt::Display for InvalidFormatError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "InvalidFormatError: {}: {}", self.arg, self.msg)
    }
}

impl std::error::Error for InvalidFormatError {}

/// Ошибка, используемая при недопустимом состоянии.
#[derive(Debug)]
pub struct InvalidStateError {
    /// Сообщение об ошибке.
    pub(crate) msg: String,

    /// Первопричина ошибки.
    pub(crate) cause: String,
}

impl fmt::Display for InvalidStateError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "InvalidStateError: {}: {}", self.msg, self.cause)
    }
}

impl std::error::Error for InvalidStateError {}
