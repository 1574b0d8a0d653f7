use std::fmt;

use base64::{engine::general_purpose, Engine as _};

/// An image picked on the intake form. The bytes are never decoded here,
/// only base64-encoded when they are sent to the generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInput {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub file_name: Option<String>,
}

impl ImageInput {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>, file_name: Option<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
            file_name,
        }
    }

    pub fn to_base64(&self) -> String {
        general_purpose::STANDARD.encode(&self.bytes)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectData {
    pub original_image: Option<ImageInput>,
    pub concept_image: Option<ImageInput>,
    pub location: String,
    pub requirements: String,
}

impl ProjectData {
    pub fn new(
        location: impl Into<String>,
        requirements: impl Into<String>,
        original_image: Option<ImageInput>,
        concept_image: Option<ImageInput>,
    ) -> Self {
        Self {
            original_image,
            concept_image,
            location: location.into(),
            requirements: requirements.into(),
        }
    }

    pub fn has_both_images(&self) -> bool {
        self.original_image.is_some() && self.concept_image.is_some()
    }
}

/// A generated image as `data:<mime>;base64,<payload>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageDataUri {
    pub mime_type: String,
    pub base64: String,
}

impl ImageDataUri {
    pub fn new(mime_type: impl Into<String>, base64: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            base64: base64.into(),
        }
    }

    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        general_purpose::STANDARD.decode(self.base64.trim())
    }
}

impl fmt::Display for ImageDataUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "data:{};base64,{}", self.mime_type, self.base64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_uri_formats_and_decodes() {
        let uri = ImageDataUri::new("image/png", "iVBORw0KGgo=");
        assert_eq!(uri.to_string(), "data:image/png;base64,iVBORw0KGgo=");
        assert_eq!(
            uri.decode().unwrap(),
            vec![0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a]
        );
    }

    #[test]
    fn both_images_are_needed_for_editing() {
        let photo = ImageInput::new(vec![1, 2, 3], "image/jpeg", None);
        let mut data = ProjectData::new("a", "b", Some(photo.clone()), None);
        assert!(!data.has_both_images());
        data.concept_image = Some(photo);
        assert!(data.has_both_images());
    }
}
