//! KServe v2 wire types and output interpretation.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use bench_core::InputTensor;

/// Recognized output tensor names, checked in order; first match wins.
/// Case-sensitive exact match.
pub const OUTPUT_TENSOR_NAMES: [&str; 3] = ["logits", "output", "predictions"];

/// One input tensor in an inference request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferRequestInput {
    pub name: String,
    pub shape: Vec<usize>,
    pub datatype: String,
    pub data: Vec<f32>,
}

/// Inference request payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferRequest {
    pub inputs: Vec<InferRequestInput>,
}

impl InferRequest {
    /// Builds a single-input FP32 request from a preprocessed tensor
    pub fn from_tensor(input_name: &str, tensor: &InputTensor) -> Self {
        Self {
            inputs: vec![InferRequestInput {
                name: input_name.to_string(),
                shape: tensor.shape.clone(),
                datatype: "FP32".to_string(),
                data: tensor.data.clone(),
            }],
        }
    }
}

/// One named output tensor in an inference response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferResponseOutput {
    pub name: String,
    #[serde(default)]
    pub shape: Vec<usize>,
    #[serde(default)]
    pub data: Vec<f32>,
}

impl InferResponseOutput {
    /// Values of one batch row per the declared shape.
    ///
    /// For shape `[N, C]` row `i` is `data[i*C .. (i+1)*C]`; a rank-1 or
    /// shapeless output is treated as a single row. Returns `None` when the
    /// data length disagrees with the shape.
    pub fn batch_row(&self, row: usize) -> Option<&[f32]> {
        if self.shape.len() < 2 {
            return if row == 0 && !self.data.is_empty() {
                Some(&self.data)
            } else {
                None
            };
        }
        let row_len: usize = self.shape[1..].iter().product();
        let expected: usize = self.shape.iter().product();
        if row_len == 0 || self.data.len() != expected {
            return None;
        }
        let start = row.checked_mul(row_len)?;
        self.data.get(start..start + row_len)
    }
}

/// Inference response payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferResponse {
    #[serde(default)]
    pub outputs: Vec<InferResponseOutput>,
}

/// Locates the output tensor by scanning [`OUTPUT_TENSOR_NAMES`] in order.
pub fn find_output(response: &InferResponse) -> Option<&InferResponseOutput> {
    OUTPUT_TENSOR_NAMES
        .iter()
        .find_map(|name| response.outputs.iter().find(|o| o.name == *name))
}

/// Indices of the `k` largest values, descending by value; ties broken
/// ascending by index, so the ranking is stable across runs.
pub fn rank_outputs(values: &[f32], k: usize) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..values.len()).collect();
    indices.sort_by(|&a, &b| {
        values[b]
            .partial_cmp(&values[a])
            .unwrap_or(Ordering::Equal)
            .then(a.cmp(&b))
    });
    indices.truncate(k);
    indices
}
