use serde::{Deserialize, Serialize};

/// Coarse body region a routine addresses. The textual tag (via `Display`
/// and serde) is the camelCase variant name, e.g. `lowerBack`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum_macros::Display,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum PainLocation {
    Head,
    UpperBack,
    LowerBack,
    Spine,
    Hip,
    Pelvis,
    LeftLeg,
    RightLeg,
    Knee,
    Ankle,
    General,
}

impl PainLocation {
    pub const ALL: [PainLocation; 11] = [
        PainLocation::Head,
        PainLocation::UpperBack,
        PainLocation::LowerBack,
        PainLocation::Spine,
        PainLocation::Hip,
        PainLocation::Pelvis,
        PainLocation::LeftLeg,
        PainLocation::RightLeg,
        PainLocation::Knee,
        PainLocation::Ankle,
        PainLocation::General,
    ];

    /// Parse a stored tag back into a location.
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|loc| loc.to_string() == tag)
    }

    /// Human readable region name. `General` has no region of its own and
    /// reads as a plain "Exercise".
    pub fn display_name(&self) -> &'static str {
        match self {
            PainLocation::Head => "Head & Neck",
            PainLocation::UpperBack => "Upper Back & Shoulders",
            PainLocation::LowerBack => "Lower Back",
            PainLocation::Spine => "Spine",
            PainLocation::Hip => "Hip & Pelvis",
            PainLocation::Pelvis => "Pelvic Region",
            PainLocation::LeftLeg => "Left Leg",
            PainLocation::RightLeg => "Right Leg",
            PainLocation::Knee => "Knee Joint",
            PainLocation::Ankle => "Ankle & Foot",
            PainLocation::General => "Exercise",
        }
    }
}

/// Classify a user's message. Rules are checked in a fixed order and the
/// first hit wins, so "neck and shoulder pain" is `Head`.
pub fn classify(message: &str) -> PainLocation {
    let text = message.to_lowercase();
    let has = |needle: &str| text.contains(needle);

    if has("leg") {
        return if has("left") {
            PainLocation::LeftLeg
        } else {
            PainLocation::RightLeg
        };
    }
    if has("hip") {
        return PainLocation::Hip;
    }
    if has("knee") {
        return PainLocation::Knee;
    }
    if has("ankle") || has("foot") {
        return PainLocation::Ankle;
    }
    if has("back") {
        return PainLocation::LowerBack;
    }
    if has("spine") {
        return PainLocation::Spine;
    }
    if has("pelvis") {
        return PainLocation::Pelvis;
    }
    if has("neck") || has("head") {
        return PainLocation::Head;
    }
    if has("shoulder") {
        return PainLocation::UpperBack;
    }
    PainLocation::General
}

/// Decide which region to focus while a single instruction runs.
///
/// Differs from [`classify`] on purpose: legs need an explicit side, "spine"
/// folds into `LowerBack`, "pelvic" counts as pelvis, and anything unmatched
/// keeps the batch's own location.
pub fn classify_from_instruction_text(text: &str, fallback: PainLocation) -> PainLocation {
    let text = text.to_lowercase();
    let has = |needle: &str| text.contains(needle);

    if has("left leg") || has("left thigh") {
        return PainLocation::LeftLeg;
    }
    if has("right leg") || has("right thigh") {
        return PainLocation::RightLeg;
    }
    if has("hip") {
        return PainLocation::Hip;
    }
    if has("knee") {
        return PainLocation::Knee;
    }
    if has("ankle") || has("foot") {
        return PainLocation::Ankle;
    }
    if has("back") || has("spine") {
        return PainLocation::LowerBack;
    }
    if has("pelvis") || has("pelvic") {
        return PainLocation::Pelvis;
    }
    if has("neck") || has("head") {
        return PainLocation::Head;
    }
    if has("shoulder") {
        return PainLocation::UpperBack;
    }
    fallback
}
