use std::path::{Path, PathBuf};

pub fn manifest_path<'a>(segments: impl IntoIterator<Item = &'a str>) -> PathBuf {
    let segments = segments.into_iter();
    let full_path = [env!("CARGO_MANIFEST_DIR")].into_iter().chain(segments);
    full_path.collect()
}

/// the last component of an include path, which is how processed files are keyed
pub fn file_key(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string())
}

/// replaces the extension of a shader file name, ie 'lit.hlsl' -> 'lit.json'
pub fn with_extension(file_name: &str, extension: &str) -> String {
    Path::new(file_name)
        .with_extension(extension)
        .to_string_lossy()
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_key_strips_directories() {
        assert_eq!(file_key("shared/lighting.hlsli"), "lighting.hlsli");
        assert_eq!(file_key("common.hlsli"), "common.hlsli");
    }

    #[test]
    fn with_extension_replaces_the_shader_extension() {
        assert_eq!(with_extension("lit.hlsl", "json"), "lit.json");
    }
}
