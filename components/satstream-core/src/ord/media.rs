use self::{Language::*, Media::*};

#[derive(Debug, PartialEq, Copy, Clone)]
pub enum Media {
    Audio,
    Code(Language),
    Font,
    Iframe,
    Image,
    Markdown,
    Model,
    Pdf,
    Text,
    Unknown,
    Video,
}

#[derive(Debug, PartialEq, Copy, Clone)]
pub enum Language {
    Css,
    JavaScript,
    Json,
    Python,
    Yaml,
}

const TABLE: &[(&str, Media)] = &[
    ("application/cbor", Unknown),
    ("application/json", Code(Json)),
    ("application/octet-stream", Unknown),
    ("application/pdf", Pdf),
    ("application/pgp-signature", Text),
    ("application/protobuf", Unknown),
    ("application/x-javascript", Code(JavaScript)),
    ("application/yaml", Code(Yaml)),
    ("audio/flac", Audio),
    ("audio/mpeg", Audio),
    ("audio/wav", Audio),
    ("font/otf", Font),
    ("font/ttf", Font),
    ("font/woff", Font),
    ("font/woff2", Font),
    ("image/apng", Image),
    ("image/avif", Image),
    ("image/gif", Image),
    ("image/jpeg", Image),
    ("image/png", Image),
    ("image/svg+xml", Iframe),
    ("image/webp", Image),
    ("model/gltf+json", Model),
    ("model/gltf-binary", Model),
    ("model/stl", Model),
    ("text/css", Code(Css)),
    ("text/html", Iframe),
    ("text/javascript", Code(JavaScript)),
    ("text/markdown", Markdown),
    ("text/plain", Text),
    ("text/x-python", Code(Python)),
    ("video/mp4", Video),
    ("video/webm", Video),
];

impl Media {
    /// Classifies a content type, ignoring any parameters such as `;charset=utf-8`.
    pub fn from_content_type(content_type: &str) -> Media {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_lowercase();
        for (key, media) in TABLE.iter() {
            if *key == essence {
                return *media;
            }
        }
        Unknown
    }
}

/// The mime type of a content type is its essence, with parameters stripped.
pub fn mime_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::{mime_type, Language, Media};

    #[test]
    fn classifies_content_types() {
        assert_eq!(
            Media::from_content_type("text/plain;charset=utf-8"),
            Media::Text
        );
        assert_eq!(
            Media::from_content_type("application/json"),
            Media::Code(Language::Json)
        );
        assert_eq!(Media::from_content_type("image/png"), Media::Image);
        assert_eq!(Media::from_content_type("application/unknown"), Media::Unknown);
    }

    #[test]
    fn strips_parameters_from_mime_type() {
        assert_eq!(mime_type("text/plain;charset=utf-8"), "text/plain");
        assert_eq!(mime_type("Image/PNG"), "image/png");
    }
}
