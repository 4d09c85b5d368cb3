//! Tool `analyze_image`: ask a vision model about a local image.

use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::Deserialize;
use serde_json::{json, Value};

use vision_lens::{prepare_file, select_model, VisionResult};

use super::registry::ToolContext;
use crate::types::{McpError, McpResult, ToolCallResult, ToolDefinition};

pub const TOOL_NAME: &str = "analyze_image";

#[derive(Debug, Deserialize)]
struct AnalyzeParams {
    #[serde(default)]
    image_path: Option<String>,
    #[serde(default)]
    question: Option<String>,
    #[serde(default)]
    model: Option<String>,
}

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: TOOL_NAME.to_string(),
        description: Some(
            "Analyze a local image with a vision model and answer a question about it".to_string(),
        ),
        input_schema: json!({
            "type": "object",
            "properties": {
                "image_path": {
                    "type": "string",
                    "description": "Absolute path to the image file"
                },
                "question": {
                    "type": "string",
                    "description": "Question about the image (defaults to a general description)"
                },
                "model": {
                    "type": "string",
                    "description": "Vision model to use (defaults to the server's configured model)"
                }
            },
            "required": ["image_path"]
        }),
    }
}

/// Check that `image_path` is present and absolute. Never touches the filesystem.
///
/// The path is used exactly as given; surrounding whitespace is part of it.
pub fn validate_image_path(image_path: Option<&str>) -> McpResult<PathBuf> {
    let raw = image_path
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| McpError::InvalidParams("'image_path' is required".to_string()))?;

    let path = PathBuf::from(raw);
    if !path.is_absolute() {
        return Err(McpError::InvalidParams(format!(
            "'image_path' must be an absolute path, got '{raw}'"
        )));
    }
    Ok(path)
}

/// Run preprocessing and inference for one image. Every failure here is an
/// execution failure, never a protocol error.
pub async fn analyze(
    path: &Path,
    question: Option<&str>,
    model: Option<&str>,
    api_key: &str,
    ctx: &ToolContext,
) -> VisionResult<String> {
    let started = Instant::now();
    let model = select_model(model, ctx.config.default_model.as_deref());

    let image = prepare_file(path, ctx.config.profile).await?;
    if image.was_resized() {
        tracing::debug!(
            "Prepared {}: {}x{} -> {}x{}, {} bytes -> {} bytes",
            path.display(),
            image.original_width,
            image.original_height,
            image.width,
            image.height,
            image.source_bytes,
            image.encoded.len()
        );
    } else {
        tracing::debug!(
            "Prepared {}: {}x{} re-encoded, {} bytes -> {} bytes",
            path.display(),
            image.width,
            image.height,
            image.source_bytes,
            image.encoded.len()
        );
    }

    let answer = ctx.client.ask(api_key, &model, question, &image).await?;
    tracing::info!(
        "Analyzed {} with {model} in {} ms",
        path.display(),
        started.elapsed().as_millis()
    );
    Ok(answer)
}

pub async fn execute(args: Value, api_key: &str, ctx: &ToolContext) -> McpResult<ToolCallResult> {
    let params: AnalyzeParams =
        serde_json::from_value(args).map_err(|e| McpError::InvalidParams(e.to_string()))?;
    let path = validate_image_path(params.image_path.as_deref())?;

    match analyze(
        &path,
        params.question.as_deref(),
        params.model.as_deref(),
        api_key,
        ctx,
    )
    .await
    {
        Ok(answer) => Ok(ToolCallResult::text(answer)),
        Err(e) => {
            tracing::warn!("analyze_image failed for {}: {e}", path.display());
            Ok(ToolCallResult::error(format!("Error analyzing image: {e}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_missing_and_relative() {
        assert!(matches!(
            validate_image_path(None),
            Err(McpError::InvalidParams(_))
        ));
        assert!(matches!(
            validate_image_path(Some("   ")),
            Err(McpError::InvalidParams(_))
        ));
        assert!(matches!(
            validate_image_path(Some("images/cat.png")),
            Err(McpError::InvalidParams(_))
        ));
        assert!(matches!(
            validate_image_path(Some("./cat.png")),
            Err(McpError::InvalidParams(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_validate_accepts_absolute() {
        let path = validate_image_path(Some("/does/not/exist.png")).unwrap();
        assert_eq!(path, PathBuf::from("/does/not/exist.png"));
    }

    #[cfg(unix)]
    #[test]
    fn test_validate_keeps_whitespace() {
        let path = validate_image_path(Some("/tmp/shot .png ")).unwrap();
        assert_eq!(path, PathBuf::from("/tmp/shot .png "));

        // Leading space makes the path relative.
        assert!(matches!(
            validate_image_path(Some(" /tmp/shot.png")),
            Err(McpError::InvalidParams(_))
        ));
    }

    #[test]
    fn test_definition_requires_image_path() {
        let def = definition();
        assert_eq!(def.name, TOOL_NAME);
        assert_eq!(def.input_schema["required"], json!(["image_path"]));
    }
}
