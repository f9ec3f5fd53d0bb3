use anyhow::{Context, Result, anyhow};
use log::{debug, info};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

const MODEL_REPO_URL: &str = "https://huggingface.co/ggerganov/whisper.cpp";

pub fn model_file_name(tier: &str) -> String {
    format!("ggml-{tier}.bin")
}

pub fn model_url(tier: &str) -> String {
    format!("{MODEL_REPO_URL}/resolve/main/{}", model_file_name(tier))
}

/// Per-user cache directory where downloaded ggml models live.
pub fn model_cache_dir() -> Result<PathBuf> {
    let base = dirs::cache_dir().context("Could not determine a cache directory")?;
    Ok(base.join("quickscribe").join("models"))
}

/// Returns the path to the ggml model for the given tier, downloading it
/// into the cache on first use.
pub fn ensure_model(tier: &str) -> Result<PathBuf> {
    ensure_model_in(&model_cache_dir()?, tier)
}

fn ensure_model_in(cache_dir: &Path, tier: &str) -> Result<PathBuf> {
    let model_path = cache_dir.join(model_file_name(tier));

    if model_path.exists() {
        debug!("Model '{tier}' found in cache: {}", model_path.display());
        return Ok(model_path);
    }

    fs::create_dir_all(cache_dir).with_context(|| {
        format!("Failed to create model cache directory: {}", cache_dir.display())
    })?;

    let url = model_url(tier);
    info!("Downloading ggml model '{tier}' from '{MODEL_REPO_URL}'...");

    let tool = check_download_tool()?;

    // Download to a .part file first, then rename, so an interrupted
    // transfer never leaves a truncated model behind.
    let part_path = model_path.with_extension("bin.part");
    download_with_tool(&tool, &url, &part_path)?;
    fs::rename(&part_path, &model_path).with_context(|| {
        format!("Failed to move downloaded model into place: {}", model_path.display())
    })?;

    info!("Model '{tier}' saved in '{}'", model_path.display());
    Ok(model_path)
}

fn check_download_tool() -> Result<String> {
    let tools = ["wget2", "wget", "curl"];

    for tool in &tools {
        if Command::new("which")
            .arg(tool)
            .output()
            .map(|output| output.status.success())
            .unwrap_or(false)
        {
            return Ok(tool.to_string());
        }
    }

    Err(anyhow!(
        "Either wget, wget2, or curl is required to download models. Please install one of them."
    ))
}

fn download_with_tool(tool: &str, url: &str, output_path: &Path) -> Result<()> {
    let output = output_path
        .to_str()
        .context("Model download path is not valid UTF-8")?;
    let mut cmd = Command::new(tool);

    match tool {
        "wget2" => {
            cmd.args(["--no-config", "--progress", "bar", "-O", output, url]);
        }
        "wget" => {
            cmd.args(["--no-config", "--quiet", "--show-progress", "-O", output, url]);
        }
        "curl" => {
            cmd.args(["-L", "--output", output, url]);
        }
        _ => return Err(anyhow!("Unsupported download tool: {}", tool)),
    }

    let status = cmd
        .status()
        .map_err(|e| anyhow!("Failed to execute {}: {}", tool, e))?;

    if !status.success() {
        let _ = fs::remove_file(output_path);
        return Err(anyhow!("Download failed with {}", tool));
    }

    Ok(())
}
