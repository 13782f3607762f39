use std::sync::Arc;

use bw_core::{Error, Result};

use crate::Config;

pub mod dummy;
pub mod huggingface;

pub use bw_core::InferenceModel;
pub use dummy::DummyModel;
pub use huggingface::HuggingFaceModel;

pub fn create_model(config: &Config) -> Result<Arc<dyn InferenceModel>> {
    match config.model.as_str() {
        huggingface::MODEL_KIND => {
            let mut model = HuggingFaceModel::new(config.api_key.clone())?;
            if let Some(base_url) = &config.base_url {
                model = model.with_base_url(base_url)?;
            }
            if let Some(name) = &config.model_name {
                model = model.with_model(name);
            }
            Ok(Arc::new(model))
        }
        dummy::MODEL_KIND => Ok(Arc::new(DummyModel::new())),
        other => Err(Error::Config(format!(
            "Unknown model '{}'. Available models: {}, {}",
            other,
            huggingface::MODEL_KIND,
            dummy::MODEL_KIND
        ))),
    }
}
