//! Constraint tables for the toggle nodes that ship with the crate.
//!
//! Each node type has a fixed, ordered rule list. Intent effects are listed
//! before the invariants they feed into, and the order within a table is
//! the order the resolution pass applies them in.

use super::{ConstraintError, ConstraintSet, Effect, Fallback, Rule};

pub const BOOLEAN_AB: &str = "A1r Boolean AB";
pub const BOOLEAN_A_B: &str = "A1r Boolean A B";
pub const LORA_CONTROLPAD: &str = "A1r LoRA ControlPad";
pub const KSAMPLER_CONTROLPAD_ADVANCED: &str = "A1r KSampler ControlPad Advanced";
pub const UNITY_KSAMPLER: &str = "A1r Unity KSampler";
pub const TEXT_TAG_BOX: &str = "A1r Text Tag Box";

/// Node types that have a constraint table.
pub const NODE_TYPES: [&str; 6] = [
    BOOLEAN_AB,
    BOOLEAN_A_B,
    LORA_CONTROLPAD,
    KSAMPLER_CONTROLPAD_ADVANCED,
    UNITY_KSAMPLER,
    TEXT_TAG_BOX,
];

/// Builds the constraint set for `node_type`, if it has one.
pub fn for_node_type(node_type: &str) -> Option<ConstraintSet> {
    let built = match node_type {
        BOOLEAN_AB => boolean_ab(),
        BOOLEAN_A_B => boolean_a_b(),
        LORA_CONTROLPAD => lora_controlpad(),
        KSAMPLER_CONTROLPAD_ADVANCED => ksampler_controlpad_advanced(),
        UNITY_KSAMPLER => unity_ksampler(),
        TEXT_TAG_BOX => text_tag_box(),
        _ => return None,
    };
    match built {
        Ok(set) => Some(set),
        Err(err) => {
            log::error!("constraint table for '{}' is invalid: {}", node_type, err);
            None
        }
    }
}

/// Two flags, exactly one of which is on.
pub fn boolean_ab() -> Result<ConstraintSet, ConstraintError> {
    ConstraintSet::new(
        BOOLEAN_AB,
        &[("enable_a", true), ("enable_b", false)],
        vec![Rule::exactly_one(["enable_a", "enable_b"], "enable_a")],
    )
}

/// B can only be on while A is on.
pub fn boolean_a_b() -> Result<ConstraintSet, ConstraintError> {
    ConstraintSet::new(
        BOOLEAN_A_B,
        &[("enable_a", true), ("enable_b", false)],
        vec![Rule::implies("enable_b", "enable_a")],
    )
}

/// Six LoRA switches and a master that drives them all.
pub fn lora_controlpad() -> Result<ConstraintSet, ConstraintError> {
    let members = ["lora_1", "lora_2", "lora_3", "lora_4", "lora_5", "lora_6"];
    let mut flags = vec![("toggle_all", true)];
    flags.extend(members.iter().map(|m| (*m, true)));
    ConstraintSet::new(LORA_CONTROLPAD, &flags, vec![Rule::master("toggle_all", members)])
}

/// Sampler pipeline switches.
///
/// `image_detailer` and `generate_ksampler` pick the pipeline; the three
/// detailers and the latent upscale only make sense for one of them.
pub fn ksampler_controlpad_advanced() -> Result<ConstraintSet, ConstraintError> {
    const IMAGE: &str = "image_detailer";
    const GEN: &str = "generate_ksampler";
    const LATENT: &str = "latent_upscale";
    const FACE: &str = "face_detailer";
    const HAND: &str = "hand_detailer";
    const DEBUG: &str = "debug_detailer";

    ConstraintSet::new(
        KSAMPLER_CONTROLPAD_ADVANCED,
        &[
            (IMAGE, false),
            (GEN, true),
            (LATENT, false),
            (FACE, false),
            (HAND, false),
            (DEBUG, false),
        ],
        vec![
            Effect::on_raise(IMAGE)
                .set(GEN, false)
                .set(DEBUG, true)
                .set(LATENT, false)
                .set(FACE, false)
                .set(HAND, false)
                .into(),
            Effect::on_raise(GEN).set(IMAGE, false).set(DEBUG, false).into(),
            Effect::on_raise(LATENT)
                .when(IMAGE, true)
                .set(IMAGE, false)
                .set(GEN, true)
                .set(DEBUG, false)
                .set(FACE, false)
                .set(HAND, false)
                .into(),
            Effect::on_raise(FACE).when(IMAGE, true).set(DEBUG, false).into(),
            Effect::on_raise(HAND).when(IMAGE, true).set(DEBUG, false).into(),
            Effect::on_raise(DEBUG)
                .when(IMAGE, true)
                .set(FACE, false)
                .set(HAND, false)
                .into(),
            Effect::on_raise(DEBUG)
                .when(GEN, true)
                .set(IMAGE, true)
                .set(GEN, false)
                .set(LATENT, false)
                .set(FACE, false)
                .set(HAND, false)
                .into(),
            Rule::excludes_preferring(IMAGE, GEN, IMAGE),
            Rule::at_least_one([IMAGE, GEN], Fallback::Raise(GEN.to_string())),
            Rule::locks(IMAGE, LATENT),
        ],
    )
}

/// Unified sampler: one of three modes, denoise fixed in text-to-image.
pub fn unity_ksampler() -> Result<ConstraintSet, ConstraintError> {
    let modes = ["text_to_image", "image_to_image", "latent_upscale"];
    ConstraintSet::new(
        UNITY_KSAMPLER,
        &[
            ("text_to_image", true),
            ("image_to_image", false),
            ("latent_upscale", false),
        ],
        vec![
            Rule::exactly_one(modes, "text_to_image"),
            Rule::locks("text_to_image", "denoise"),
        ],
    )
}

/// Tagger model switch. JoyTag has no character threshold.
pub fn text_tag_box() -> Result<ConstraintSet, ConstraintError> {
    ConstraintSet::new(
        TEXT_TAG_BOX,
        &[("joytag_model", false)],
        vec![Rule::locks("joytag_model", "character_threshold")],
    )
}
