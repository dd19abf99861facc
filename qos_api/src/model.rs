use anyhow::{Context, Result};
use qos_pipeline::ModelArtifact;
use std::path::Path;
use std::sync::Arc;

/// Loads and validates the artifact, then runs one forward pass on a zero
/// vector before any request is accepted.
pub fn load(path: &Path) -> Result<Arc<ModelArtifact>> {
    let artifact = ModelArtifact::load(path)
        .with_context(|| format!("failed to load model artifact {}", path.display()))?;

    let warm_mbps = artifact.warm_up().context("warm-up prediction failed")?;
    tracing::info!(warm_mbps, "warmup forward ok");

    if let Some(summary) = artifact.summary() {
        tracing::info!(
            trained_at = %summary.trained_at,
            n_train = summary.n_train,
            rmse_log = ?summary.validation_rmse_log,
            "artifact training summary"
        );
    }
    tracing::info!(
        "loaded model; features[{}]: {:?}",
        artifact.schema().len(),
        artifact.schema().names().collect::<Vec<_>>()
    );
    Ok(Arc::new(artifact))
}

/// `None` when loading fails; the service then reports unhealthy and answers
/// every prediction with 500. No retry.
pub fn load_or_unhealthy(path: &Path) -> Option<Arc<ModelArtifact>> {
    match load(path) {
        Ok(artifact) => Some(artifact),
        Err(e) => {
            tracing::error!("Error loading model or scaler: {e:#}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_artifact_is_unhealthy_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_or_unhealthy(&dir.path().join("absent.json")).is_none());
    }

    #[test]
    fn error_names_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.json");
        std::fs::write(&path, "not json").unwrap();
        let err = load(&path).unwrap_err();
        assert!(format!("{err:#}").contains("garbage.json"));
    }
}
