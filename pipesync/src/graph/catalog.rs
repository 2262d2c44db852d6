//! Built-in graph declarations.

use super::{DependencyGraph, GraphBuilder};
use crate::core::ProcessingKind::{Batch, Single};

/// Label of stage 1.
pub const SCRIPT_ANALYST: &str = "Script Analyst";
/// Label of stage 2.
pub const CREATIVE_DIRECTOR: &str = "Creative Director";
/// Label of stage 3.
pub const STORYBOARD_ARTIST: &str = "Storyboard Artist";
/// Label of stage 4.
pub const PRODUCTION: &str = "Production";

/// Returns the builder for the default script-to-video production pipeline.
#[must_use]
pub fn script_production_builder() -> GraphBuilder {
    GraphBuilder::new()
        .stage(1, SCRIPT_ANALYST)
        .stage(2, CREATIVE_DIRECTOR)
        .stage(3, STORYBOARD_ARTIST)
        .stage(4, PRODUCTION)
        .unit("script_structure", 1, Single, &[])
        .unit("character_profiles", 1, Single, &[])
        .unit("scene_breakdown", 1, Single, &[])
        .unit("visual_style", 2, Single, &["script_structure"])
        .unit("tone_analysis", 2, Single, &["script_structure"])
        .unit("shot_list", 3, Batch, &["scene_breakdown", "visual_style"])
        .unit("storyboard_images", 3, Batch, &["shot_list"])
        .unit("video_generation", 4, Batch, &["storyboard_images"])
        .unit("audio_generation", 4, Single, &["character_profiles"])
        .unit(
            "final_assembly",
            4,
            Single,
            &["video_generation", "audio_generation"],
        )
}

/// Builds the default four-stage script-to-video production pipeline.
///
/// | Stage | Label | Units |
/// |-------|-------|-------|
/// | 1 | Script Analyst | script_structure, character_profiles, scene_breakdown |
/// | 2 | Creative Director | visual_style, tone_analysis |
/// | 3 | Storyboard Artist | shot_list, storyboard_images |
/// | 4 | Production | video_generation, audio_generation, final_assembly |
#[must_use]
#[allow(clippy::missing_panics_doc)]
pub fn script_production() -> DependencyGraph {
    match script_production_builder().build() {
        Ok(graph) => graph,
        Err(err) => unreachable!("built-in catalog is invalid: {err}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_shape() {
        let graph = script_production();

        assert_eq!(graph.stages().len(), 4);
        assert_eq!(graph.unit_count(), 10);
        assert_eq!(graph.stage(1).unwrap().label, SCRIPT_ANALYST);
        assert_eq!(graph.stage(4).unwrap().units.len(), 3);
    }
}
