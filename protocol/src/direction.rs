use serde::Deserialize;
use serde::Serialize;
use strum_macros::Display;

/// Writing direction applied to both the input and its overlay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TextDirection {
    #[default]
    Ltr,
    Rtl,
}
