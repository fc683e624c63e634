use anyhow::Result;
use vggt_probe_assets::{ensure_model_config, resolve_url, resolve_weights};

#[test]
fn resolve_url_points_at_main_branch() {
    assert_eq!(
        resolve_url("facebook/dinov2-small", "model.safetensors"),
        "https://huggingface.co/facebook/dinov2-small/resolve/main/model.safetensors"
    );
    assert_eq!(
        resolve_url("/facebook/VGGT-1B/", "/model.pt"),
        "https://huggingface.co/facebook/VGGT-1B/resolve/main/model.pt"
    );
}

#[test]
fn existing_targets_are_returned_without_downloading() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let target = dir.path().join("config.json");
    std::fs::write(&target, "{}")?;
    assert_eq!(ensure_model_config("facebook/dinov2-small", &target)?, target);

    let weights = dir.path().join("model.safetensors");
    std::fs::write(&weights, b"")?;
    assert_eq!(
        resolve_weights(
            Some(weights.as_path()),
            "facebook/dinov2-small",
            &dir.path().join("unused")
        )?,
        weights
    );
    Ok(())
}

#[test]
fn missing_custom_weights_are_an_error() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let missing = dir.path().join("nope.safetensors");
    let err = resolve_weights(Some(missing.as_path()), "facebook/dinov2-small", &missing)
        .expect_err("custom path does not exist");
    assert!(err.to_string().contains("weights not found"));
    Ok(())
}
