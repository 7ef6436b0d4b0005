use rust_embed::RustEmbed;

/// Images bundled into the binary and addressable through `resource://`
/// locators by their normalized file stem
#[derive(RustEmbed)]
#[folder = "assets/images/"]
pub struct BundledImages;

impl BundledImages {
    /// Get a bundled image by its file path inside the bundle
    pub fn get_image(path: &str) -> Option<rust_embed::EmbeddedFile> {
        Self::get(path)
    }

    /// List all bundled image paths
    pub fn list_images() -> impl Iterator<Item = std::borrow::Cow<'static, str>> {
        Self::iter()
    }
}
