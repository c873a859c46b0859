//! Общий скорер над предобученной моделью.
//!
//! Модель — двухслойная сеть прямого распространения: линейный слой с ReLU
//! и линейный выход. Веса поставляются в формате safetensors; словарь
//! признаков и меток — боковой JSON с двумя массивами (порядок входных
//! признаков и порядок выходных меток). Загрузка проверяет и структуру
//! файла (повреждение — [`XmorphyError::CorruptModel`]), и согласованность
//! размерностей со словарём ([`XmorphyError::VocabMismatch`]).

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use candle_core::{DType, Device, Tensor};
use candle_nn::{linear, Linear, Module, VarBuilder, VarMap};
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::errors::{Result, XmorphyError};

/// Размер скрытого слоя свежеинициализированных моделей.
pub(crate) const DEFAULT_HIDDEN: usize = 64;

/// Боковой словарь модели: порядок входных признаков и выходных меток.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelVocab {
    /// Имена входных признаков в порядке подачи.
    pub input: Vec<String>,
    /// Имена выходных меток в порядке выхода модели.
    pub output: Vec<String>,
}

impl ModelVocab {
    /// Читает словарь из JSON-файла.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref()).map_err(|e| {
            XmorphyError::invalid_argument("vocab", format!("Failed to open vocab file: {}", e))
        })?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    /// Пишет словарь в JSON.
    pub fn to_writer<W: std::io::Write>(&self, wtr: W) -> Result<()> {
        serde_json::to_writer_pretty(wtr, self)?;
        Ok(())
    }
}

/// Скорер: вход — матрица признаков, выход — матрица оценок меток.
pub struct ScoringModel {
    hidden: Linear,
    out: Linear,
    in_dim: usize,
    out_dim: usize,
    device: Device,
}

impl ScoringModel {
    /// Создаёт модель со случайной инициализацией весов.
    ///
    /// Используется тестами и как отправная точка обучения во внешнем
    /// инструментарии; сама библиотека модели не обучает.
    pub fn with_init(in_dim: usize, hidden_dim: usize, out_dim: usize) -> Result<Self> {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        Ok(Self {
            hidden: linear(in_dim, hidden_dim, vb.pp("hidden"))?,
            out: linear(hidden_dim, out_dim, vb.pp("out"))?,
            in_dim,
            out_dim,
            device,
        })
    }

    /// Загружает модель из файла safetensors.
    ///
    /// # Ошибки
    ///
    /// - [`XmorphyError::CorruptModel`] — файл не читается или в нём нет
    ///   ожидаемых тензоров;
    /// - [`XmorphyError::VocabMismatch`] — формы тензоров не согласованы с
    ///   ожидаемыми размерностями входа и выхода.
    pub fn from_safetensors<P: AsRef<Path>>(
        path: P,
        in_dim: usize,
        out_dim: usize,
    ) -> Result<Self> {
        let device = Device::Cpu;
        let tensors = candle_core::safetensors::load(path.as_ref(), &device)
            .map_err(|e| XmorphyError::corrupt_model(format!("{}: {}", path.as_ref().display(), e)))?;
        let tensors: HashMap<String, Tensor> = tensors.into_iter().collect();
        Self::from_tensors(&tensors, in_dim, out_dim, device)
    }

    /// Собирает модель из готовых тензоров.
    pub fn from_tensors(
        tensors: &HashMap<String, Tensor>,
        in_dim: usize,
        out_dim: usize,
        device: Device,
    ) -> Result<Self> {
        let get = |name: &str| -> Result<Tensor> {
            tensors
                .get(name)
                .cloned()
                .ok_or_else(|| {
                    XmorphyError::corrupt_model(format!("model tensor {:?} is missing", name))
                })?
                .to_dtype(DType::F32)
                .map_err(Into::into)
        };

        let hidden_weight = get("hidden.weight")?;
        let hidden_bias = get("hidden.bias")?;
        let out_weight = get("out.weight")?;
        let out_bias = get("out.bias")?;

        let hw = hidden_weight.dims().to_vec();
        if hw.len() != 2 || hw[1] != in_dim {
            return Err(XmorphyError::vocab_mismatch(format!(
                "hidden layer expects input of {}, vocabulary provides {}",
                hw.get(1).copied().unwrap_or(0),
                in_dim
            )));
        }
        let hidden_dim = hw[0];
        if hidden_bias.dims() != [hidden_dim] {
            return Err(XmorphyError::corrupt_model("hidden bias shape mismatches"));
        }
        let ow = out_weight.dims().to_vec();
        if ow.len() != 2 || ow[1] != hidden_dim {
            return Err(XmorphyError::corrupt_model("output weight shape mismatches"));
        }
        if ow[0] != out_dim {
            return Err(XmorphyError::vocab_mismatch(format!(
                "model emits {} labels, vocabulary lists {}",
                ow[0], out_dim
            )));
        }
        if out_bias.dims() != [out_dim] {
            return Err(XmorphyError::corrupt_model("output bias shape mismatches"));
        }

        Ok(Self {
            hidden: Linear::new(hidden_weight, Some(hidden_bias)),
            out: Linear::new(out_weight, Some(out_bias)),
            in_dim,
            out_dim,
            device,
        })
    }

    /// Размерность входного вектора признаков.
    #[inline(always)]
    pub fn in_dim(&self) -> usize {
        self.in_dim
    }

    /// Размерность выходного вектора оценок.
    #[inline(always)]
    pub fn out_dim(&self) -> usize {
        self.out_dim
    }

    /// Прогоняет матрицу признаков и возвращает матрицу оценок.
    ///
    /// Каждая строка входа должна иметь длину `in_dim`.
    pub fn score(&self, rows: &[Vec<f32>]) -> Result<Vec<Vec<f32>>> {
        if rows.is_empty() {
            return Ok(vec![]);
        }
        let mut flat = Vec::with_capacity(rows.len() * self.in_dim);
        for row in rows {
            if row.len() != self.in_dim {
                return Err(XmorphyError::vocab_mismatch(format!(
                    "feature row of {} values, model expects {}",
                    row.len(),
                    self.in_dim
                )));
            }
            flat.extend_from_slice(row);
        }
        let input = Tensor::from_vec(flat, (rows.len(), self.in_dim), &self.device)?;
        let x = self.hidden.forward(&input)?;
        let x = x.relu()?;
        let logits = self.out.forward(&x)?;
        Ok(logits.to_vec2::<f32>()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_model_scores() {
        let model = ScoringModel::with_init(6, 8, 3).unwrap();
        let rows = vec![vec![0.5; 6], vec![0.0; 6]];
        let scores = model.score(&rows).unwrap();
        assert_eq!(scores.len(), 2);
        assert_eq!(scores[0].len(), 3);
    }

    #[test]
    fn test_empty_input() {
        let model = ScoringModel::with_init(4, 8, 2).unwrap();
        assert!(model.score(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_row_dim_mismatch() {
        let model = ScoringModel::with_init(4, 8, 2).unwrap();
        let result = model.score(&[vec![0.0; 5]]);
        assert!(matches!(result, Err(XmorphyError::VocabMismatch(_))));
    }

    #[test]
    fn test_missing_tensor() {
        let tensors = HashMap::new();
        let result = ScoringModel::from_tensors(&tensors, 4, 2, Device::Cpu);
        assert!(matches!(result, Err(XmorphyError::CorruptModel(_))));
    }

    #[test]
    fn test_shape_mismatch_is_vocab_error() {
        let device = Device::Cpu;
        let mut tensors = HashMap::new();
        tensors.insert(
            "hidden.weight".to_string(),
            Tensor::zeros((8, 4), DType::F32, &device).unwrap(),
        );
        tensors.insert(
            "hidden.bias".to_string(),
            Tensor::zeros(8, DType::F32, &device).unwrap(),
        );
        tensors.insert(
            "out.weight".to_string(),
            Tensor::zeros((2, 8), DType::F32, &device).unwrap(),
        );
        tensors.insert(
            "out.bias".to_string(),
            Tensor::zeros(2, DType::F32, &device).unwrap(),
        );
        // The input dimension disagrees with the vocabulary.
        let result = ScoringModel::from_tensors(&tensors, 5, 2, device.clone());
        assert!(matches!(result, Err(XmorphyError::VocabMismatch(_))));
        // The matching dimensions load fine.
        assert!(ScoringModel::from_tensors(&tensors, 4, 2, device).is_ok());
    }
}
