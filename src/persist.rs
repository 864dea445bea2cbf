//! Artifact persistence: the fitted model as a single safetensors blob and
//! the ID encoders as a JSON mapping-of-mappings.
//!
//! Any serialization or upload failure is fatal to the run; nothing is
//! retried and partial blobs are not cleaned up.

use std::fs;

use log::info;
use safetensors::{tensor::TensorView, Dtype, SafeTensors};

use crate::{
    data::encoder::EncoderSet,
    error::{PipelineErr, Result},
    model::NcfModel,
    store::ObjectStore,
};

const MODEL_FILE_NAME: &str = "ncf_model.safetensors";

/// Serializes the fitted model's tensors and uploads them under `key`.
///
/// The blob is staged through a scoped temporary save directory that is
/// removed on every exit path, then uploaded as one self-contained file.
pub fn save_model(
    store: &impl ObjectStore,
    key: &str,
    model: &NcfModel,
    params: &[f32],
) -> Result<()> {
    let blob = model_to_safetensors(model, params)?;

    let dir = tempfile::tempdir().map_err(|e| PipelineErr::Artifact(format!("temp save dir: {e}")))?;
    let staged = dir.path().join(MODEL_FILE_NAME);
    fs::write(&staged, &blob).map_err(|e| PipelineErr::Artifact(format!("stage model: {e}")))?;

    info!("uploading model artifact to {key} ({} bytes)", blob.len());
    let bytes = fs::read(&staged).map_err(|e| PipelineErr::Artifact(format!("read staged model: {e}")))?;
    store.put(key, &bytes)
}

/// Reconstructs the flat parameter vector of `model` from a persisted blob.
///
/// # Errors
/// `Artifact` if a tensor is missing or has an unexpected shape.
pub fn load_model_params(store: &impl ObjectStore, key: &str, model: &NcfModel) -> Result<Box<[f32]>> {
    let blob = store.get(key)?;
    let tensors =
        SafeTensors::deserialize(&blob).map_err(|e| PipelineErr::Artifact(format!("model blob: {e}")))?;

    let mut params = vec![0.; model.size()].into_boxed_slice();
    for spec in model.layout() {
        let tensor = tensors
            .tensor(&spec.name)
            .map_err(|e| PipelineErr::Artifact(format!("tensor {}: {e}", spec.name)))?;
        if tensor.shape() != spec.shape {
            return Err(PipelineErr::Artifact(format!(
                "tensor {}: shape {:?}, expected {:?}",
                spec.name,
                tensor.shape(),
                spec.shape
            )));
        }

        // The blob's data section carries no alignment guarantee, so copy
        // rather than cast in place.
        let data: Vec<f32> = bytemuck::pod_collect_to_vec(tensor.data());
        params[spec.range.clone()].copy_from_slice(&data);
    }

    Ok(params)
}

fn model_to_safetensors(model: &NcfModel, params: &[f32]) -> Result<Vec<u8>> {
    if params.len() != model.size() {
        return Err(PipelineErr::ShapeMismatch {
            what: "params",
            got: params.len(),
            expected: model.size(),
        });
    }

    let layout = model.layout();
    let mut tensors = Vec::with_capacity(layout.len());
    for spec in &layout {
        let data = bytemuck::cast_slice(&params[spec.range.clone()]);
        let view = TensorView::new(Dtype::F32, spec.shape.clone(), data)
            .map_err(|e| PipelineErr::Artifact(format!("tensor {}: {e}", spec.name)))?;
        tensors.push((spec.name.clone(), view));
    }

    safetensors::serialize(tensors, &None).map_err(|e| PipelineErr::Artifact(format!("serialize model: {e}")))
}

/// Uploads the encoder artifact under `key`.
pub fn save_encoders(store: &impl ObjectStore, key: &str, encoders: &EncoderSet) -> Result<()> {
    info!("uploading encoders to {key}");
    store.put(key, &encoders.to_json()?)
}

/// Loads the canonical encoder artifact persisted by preprocessing.
pub fn load_encoders(store: &impl ObjectStore, key: &str) -> Result<EncoderSet> {
    EncoderSet::from_json(&store.get(key)?)
}
