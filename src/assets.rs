use rust_embed::RustEmbed;

/// Embedded broadcast-to-canonical genre mapping tables
#[derive(RustEmbed)]
#[folder = "assets/genres/"]
pub struct GenreMappingAssets;

impl GenreMappingAssets {
    /// Tables in the order they are layered; later tables override earlier
    /// rows with the same broadcast token.
    pub const TABLES: [&'static str; 2] = ["atsc.txt", "dvb.txt"];

    /// Get a mapping table by file name
    pub fn get_table(name: &str) -> Option<rust_embed::EmbeddedFile> {
        Self::get(name)
    }
}
