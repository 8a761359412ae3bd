use std::path::Path;

use anyhow::Context;
use tract_onnx::prelude::*;
use tract_onnx::prelude::tract_ndarray::Array4;

use crate::error::{ClassifyError, ClassifyResult};

/// A frozen ONNX network, optimized once for a fixed input shape.
///
/// `run` takes `&self` and builds its own execution state, so one instance
/// can serve concurrent requests.
pub struct OnnxModel {
    plan: TypedRunnableModel<TypedModel>,
    input_shape: [usize; 4],
}

impl OnnxModel {
    pub fn load(path: &Path, input_shape: [usize; 4]) -> anyhow::Result<Self> {
        let model = tract_onnx::onnx()
            .model_for_path(path)
            .and_then(|model| model.with_input_fact(0, f32::fact(input_shape).into()))
            .and_then(|model| model.into_optimized())
            .with_context(|| format!("failed to load ONNX model {}", path.display()))?;
        Self::from_typed(model, input_shape)
    }

    /// Wrap an already-typed graph whose single input is `input_shape`.
    pub fn from_typed(model: TypedModel, input_shape: [usize; 4]) -> anyhow::Result<Self> {
        let plan = model
            .into_runnable()
            .context("failed to build execution plan")?;
        Ok(OnnxModel { plan, input_shape })
    }

    pub fn input_shape(&self) -> [usize; 4] {
        self.input_shape
    }

    /// Forward pass returning the first output flattened.
    pub fn run(&self, input: Array4<f32>) -> ClassifyResult<Vec<f32>> {
        if input.shape() != &self.input_shape[..] {
            return Err(ClassifyError::Inference(format!(
                "input tensor shape {:?} does not match model input {:?}",
                input.shape(),
                self.input_shape
            )));
        }
        let outputs = self
            .plan
            .run(tvec!(Tensor::from(input).into()))
            .map_err(|e| ClassifyError::Inference(format!("forward pass failed: {:#}", e)))?;
        let output = outputs
            .first()
            .ok_or_else(|| ClassifyError::inference("model produced no outputs"))?;
        let view = output
            .to_array_view::<f32>()
            .map_err(|e| ClassifyError::Inference(format!("unexpected output type: {:#}", e)))?;
        Ok(view.iter().copied().collect())
    }
}

/// Graph that returns its input unchanged, flattened by [`OnnxModel::run`].
#[cfg(test)]
pub(crate) fn passthrough(input_shape: [usize; 4]) -> OnnxModel {
    let mut model = TypedModel::default();
    let input = model.add_source("input", f32::fact(input_shape)).unwrap();
    let output = model
        .wire_node(
            "output",
            tract_onnx::tract_core::ops::identity::Identity::default(),
            &[input],
        )
        .unwrap()[0];
    model.set_output_outlets(&[output]).unwrap();
    OnnxModel::from_typed(model, input_shape).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{classifier::decode_predictions, labels::LabelTable};

    #[test]
    fn test_run_flattens_output() {
        let model = passthrough([1, 1, 2, 3]);
        let input = Array4::from_shape_fn((1, 1, 2, 3), |(_, _, y, x)| (y * 3 + x) as f32);
        let output = model.run(input).unwrap();
        assert_eq!(output, vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_run_rejects_wrong_shape() {
        let model = passthrough([1, 3, 4, 4]);
        let err = model.run(Array4::zeros((1, 3, 4, 5))).unwrap_err();
        assert!(matches!(err, ClassifyError::Inference(ref m) if m.contains("does not match")));
    }

    #[test]
    fn test_short_output_fails_decoding() {
        let model = passthrough([1, 1, 1, 3]);
        let scores = model.run(Array4::from_elem((1, 1, 1, 3), 0.2)).unwrap();
        let labels = LabelTable::from_text("a\nb\nc\n").unwrap();
        let err = decode_predictions(&scores, &labels).unwrap_err();
        assert!(matches!(err, ClassifyError::Inference(_)));
    }

    #[test]
    fn test_missing_file_fails_to_load() {
        let dir = tempfile::tempdir().unwrap();
        let err = OnnxModel::load(&dir.path().join("none.onnx"), [1, 3, 224, 224])
            .err()
            .unwrap();
        assert!(err.to_string().contains("failed to load ONNX model"));
    }
}
