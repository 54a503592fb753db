// src/models/caption.rs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SocialPlatform {
    Instagram,
    Facebook,
    Whatsapp,
}

impl SocialPlatform {
    /// Limite de caracteres da legenda em cada rede.
    pub fn max_chars(self) -> usize {
        match self {
            SocialPlatform::Instagram => 2200,
            SocialPlatform::Facebook => 5000,
            SocialPlatform::Whatsapp => 1000,
        }
    }

    pub fn uses_hashtags(self) -> bool {
        !matches!(self, SocialPlatform::Whatsapp)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CaptionTone {
    #[default]
    Casual,
    Formal,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Caption {
    pub platform: SocialPlatform,
    pub tone: CaptionTone,
    pub text: String,
    pub hashtags: Vec<String>,
    #[schema(example = 640)]
    pub char_count: usize,
    /// Verdadeiro quando foi preciso cortar o texto para caber no limite.
    pub truncated: bool,
}
