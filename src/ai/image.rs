use tracing::{debug, error};

use crate::domain::{AgeGroup, ColoringStyle};

use super::{GatewayError, GeneratedImage, ModelGateway};

fn style_description(style: ColoringStyle) -> &'static str {
    match style {
        ColoringStyle::Prosty => {
            "Very simple shapes with thick bold lines, minimal details, large areas to color. For toddlers aged 0-3."
        }
        ColoringStyle::Klasyczny => {
            "Classic coloring book style with medium detail and clear outlines. For children aged 4-8."
        }
        ColoringStyle::Szczegolowy => {
            "Detailed illustration with many elements and finer lines. For older children aged 9-12."
        }
        ColoringStyle::Mandala => "Circular symmetrical pattern with repeating geometric elements.",
    }
}

fn age_adjustment(age_group: AgeGroup) -> &'static str {
    match age_group {
        AgeGroup::Toddler => "Use very large, simple shapes. Maximum 3-4 main elements.",
        AgeGroup::Child => "Use clear shapes with moderate complexity. Include 5-8 elements.",
        AgeGroup::Older => "Can include intricate details. Allow for 10+ elements.",
    }
}

/// Wraps the user's subject in the full line-art instruction the image model
/// needs: outlines only, complexity matched to the age band, no text.
pub fn build_image_prompt(user_prompt: &str, age_group: AgeGroup, style: ColoringStyle) -> String {
    format!(
        "Create a black and white line art coloring page for children.\n\
         \n\
         Subject: {user_prompt}\n\
         Target age: {age} years old\n\
         Style: {style_desc}\n\
         \n\
         Requirements:\n\
         - Pure black outlines on white background\n\
         - No shading, gradients, or filled areas\n\
         - Clear, well-defined lines suitable for coloring\n\
         - Complexity: {adjustment}\n\
         - Friendly, child-appropriate design\n\
         - Centered composition\n\
         - No text or letters",
        age = age_group.as_str(),
        style_desc = style_description(style),
        adjustment = age_adjustment(age_group),
    )
}

/// Generates one coloring page image. Errors propagate so the orchestrator
/// can distinguish timeouts from other upstream failures.
pub async fn synthesize_image(
    gateway: &dyn ModelGateway,
    prompt: &str,
    age_group: AgeGroup,
    style: ColoringStyle,
) -> Result<GeneratedImage, GatewayError> {
    let full_prompt = build_image_prompt(prompt, age_group, style);
    debug!(
        prompt_length = prompt.len(),
        age_group = age_group.as_str(),
        style = style.as_str(),
        "generating coloring image"
    );

    match gateway.generate_image(&full_prompt).await {
        Ok(image) => {
            debug!(
                base64_length = image.base64.len(),
                mime_type = %image.mime_type,
                "image generated"
            );
            Ok(image)
        }
        Err(err) => {
            error!(error = %err, "image generation failed");
            Err(err)
        }
    }
}
