//! Field metadata for editor UI
//!
//! Ranges, steps and conditional visibility for the configuration block
//! fields. This is presentation-layer data consumed by an external
//! editor; the composer never reads it.

use serde::Serialize;

/// Metadata for a single configuration field
#[derive(Debug, Clone, Serialize)]
pub struct FieldMeta {
    pub name: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,
    /// Field name within the same block that gates visibility in the UI
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visible_when: Option<&'static str>,
}

impl FieldMeta {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            min: None,
            max: None,
            step: None,
            visible_when: None,
        }
    }

    fn range(name: &'static str, min: f64, max: f64, step: f64) -> Self {
        Self {
            name,
            min: Some(min),
            max: Some(max),
            step: Some(step),
            visible_when: None,
        }
    }

    fn gated(self, field: &'static str) -> Self {
        Self {
            visible_when: Some(field),
            ..self
        }
    }
}

/// Metadata for one configuration block
#[derive(Debug, Clone, Serialize)]
pub struct BlockSchema {
    pub name: &'static str,
    pub fields: Vec<FieldMeta>,
}

/// The full editing schema for [`crate::CameraFrameConfig`]
pub fn camera_frame_schema() -> Vec<BlockSchema> {
    vec![
        BlockSchema {
            name: "rendering",
            fields: vec![
                FieldMeta::new("render_formats"),
                FieldMeta::new("stencil"),
                FieldMeta::range("render_target_scale", 0.1, 1.0, 0.01),
                FieldMeta::range("samples", 1.0, 4.0, 1.0),
                FieldMeta::new("scene_color_map"),
                FieldMeta::new("scene_depth_map"),
                FieldMeta::new("tone_mapping"),
                FieldMeta::range("sharpness", 0.0, 1.0, 0.01),
                FieldMeta::new("fog"),
                FieldMeta::new("fog_color").gated("fog"),
                FieldMeta::range("fog_start", 0.0, 1000.0, 1.0).gated("fog"),
                FieldMeta::range("fog_end", 0.0, 10000.0, 1.0).gated("fog"),
                FieldMeta::range("fog_density", 0.0, 1.0, 0.001).gated("fog"),
            ],
        },
        BlockSchema {
            name: "ssao",
            fields: vec![
                FieldMeta::new("kind"),
                FieldMeta::new("blur_enabled").gated("kind"),
                FieldMeta::new("randomize").gated("kind"),
                FieldMeta::range("intensity", 0.0, 1.0, 0.01).gated("kind"),
                FieldMeta::range("radius", 0.0, 100.0, 0.1).gated("kind"),
                FieldMeta::range("samples", 1.0, 64.0, 1.0).gated("kind"),
                FieldMeta::range("power", 0.1, 10.0, 0.1).gated("kind"),
                FieldMeta::range("min_angle", 1.0, 90.0, 1.0).gated("kind"),
                FieldMeta::range("scale", 0.5, 1.0, 0.01).gated("kind"),
            ],
        },
        BlockSchema {
            name: "bloom",
            fields: vec![
                FieldMeta::range("intensity", 0.0, 0.1, 0.001),
                FieldMeta::range("blur_level", 1.0, 16.0, 1.0),
            ],
        },
        BlockSchema {
            name: "grading",
            fields: vec![
                FieldMeta::new("enabled"),
                FieldMeta::range("brightness", 0.0, 3.0, 0.01).gated("enabled"),
                FieldMeta::range("contrast", 0.5, 1.5, 0.01).gated("enabled"),
                FieldMeta::range("saturation", 0.0, 2.0, 0.01).gated("enabled"),
                FieldMeta::new("tint").gated("enabled"),
            ],
        },
        BlockSchema {
            name: "color_lut",
            fields: vec![
                FieldMeta::new("texture"),
                FieldMeta::range("intensity", 0.0, 1.0, 0.01),
            ],
        },
        BlockSchema {
            name: "vignette",
            fields: vec![
                FieldMeta::range("intensity", 0.0, 1.0, 0.01),
                FieldMeta::range("inner", 0.0, 3.0, 0.01),
                FieldMeta::range("outer", 0.0, 3.0, 0.01),
                FieldMeta::range("curvature", 0.01, 10.0, 0.01),
            ],
        },
        BlockSchema {
            name: "fringing",
            fields: vec![FieldMeta::range("intensity", 0.0, 100.0, 1.0)],
        },
        BlockSchema {
            name: "taa",
            fields: vec![
                FieldMeta::new("enabled"),
                FieldMeta::range("jitter", 0.0, 1.0, 0.01).gated("enabled"),
            ],
        },
        BlockSchema {
            name: "dof",
            fields: vec![
                FieldMeta::new("enabled"),
                FieldMeta::new("near_blur").gated("enabled"),
                FieldMeta::range("focus_distance", 0.0, 10000.0, 1.0).gated("enabled"),
                FieldMeta::range("focus_range", 0.0, 1000.0, 1.0).gated("enabled"),
                FieldMeta::range("blur_radius", 2.0, 10.0, 0.1).gated("enabled"),
                FieldMeta::range("blur_rings", 3.0, 8.0, 1.0).gated("enabled"),
                FieldMeta::range("blur_ring_points", 3.0, 8.0, 1.0).gated("enabled"),
                FieldMeta::new("high_quality").gated("enabled"),
            ],
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CameraFrameConfig;

    fn field<'a>(schema: &'a [BlockSchema], block: &str, name: &str) -> &'a FieldMeta {
        schema
            .iter()
            .find(|b| b.name == block)
            .and_then(|b| b.fields.iter().find(|f| f.name == name))
            .unwrap()
    }

    #[test]
    fn test_schema_covers_all_blocks() {
        let schema = camera_frame_schema();
        let names: Vec<_> = schema.iter().map(|b| b.name).collect();
        assert_eq!(
            names,
            vec![
                "rendering", "ssao", "bloom", "grading", "color_lut", "vignette", "fringing",
                "taa", "dof"
            ]
        );
    }

    #[test]
    fn test_defaults_lie_within_declared_ranges() {
        let schema = camera_frame_schema();
        let config = CameraFrameConfig::default();

        let scale = field(&schema, "rendering", "render_target_scale");
        let v = config.rendering.render_target_scale as f64;
        assert!(v >= scale.min.unwrap() && v <= scale.max.unwrap());

        let radius = field(&schema, "ssao", "radius");
        let v = config.ssao.radius as f64;
        assert!(v >= radius.min.unwrap() && v <= radius.max.unwrap());

        let intensity = field(&schema, "bloom", "intensity");
        let v = config.bloom.intensity as f64;
        assert!(v >= intensity.min.unwrap() && v <= intensity.max.unwrap());

        let rings = field(&schema, "dof", "blur_rings");
        let v = config.dof.blur_rings as f64;
        assert!(v >= rings.min.unwrap() && v <= rings.max.unwrap());
    }

    #[test]
    fn test_ssao_tunables_gated_on_kind() {
        let schema = camera_frame_schema();
        assert_eq!(
            field(&schema, "ssao", "intensity").visible_when,
            Some("kind")
        );
        assert_eq!(field(&schema, "ssao", "kind").visible_when, None);
    }
}
