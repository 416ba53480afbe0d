//! Extension category tables and category lookup.

use crate::types::FileCategory;

// ---------------------------------------------------------------------------
// Extension category constants
// ---------------------------------------------------------------------------

pub const DOCUMENT_EXTENSIONS: &[&str] = &[
    "txt", "md", "markdown", "rst", "doc", "docx", "rtf", "odt", "pdf", "pages", "rtfd", "ppt",
    "pptx", "key", "odp", "xls", "xlsx", "csv", "numbers", "ods", "epub", "tex",
];

pub const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "bmp", "tif", "tiff", "webp", "ico", "svg", "heic", "heif", "raw",
    "arw", "cr2", "orf", "raf", "psd", "ai",
];

pub const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "m4v", "mov", "avi", "mkv", "wmv", "webm", "flv", "mpg", "mpeg", "3gp", "3g2", "mts",
    "m2ts",
];

pub const AUDIO_EXTENSIONS: &[&str] = &[
    "mp3", "wav", "flac", "aac", "ogg", "oga", "opus", "wma", "m4a", "alac", "aiff",
];

pub const CODE_EXTENSIONS: &[&str] = &[
    "rs", "ts", "tsx", "js", "jsx", "mjs", "cjs", "vue", "c", "cc", "cpp", "cxx", "h", "hpp", "hh",
    "java", "cs", "py", "go", "rb", "swift", "kt", "kts", "php", "html", "css", "scss", "sass",
    "less", "json", "yaml", "yml", "toml", "ini", "cfg", "sh", "zsh", "fish", "ps1", "psm1", "sql",
    "lua", "pl", "pm", "r", "m", "mm", "dart", "scala", "ex", "exs", "xml",
];

pub const ARCHIVE_EXTENSIONS: &[&str] = &[
    "zip", "rar", "7z", "tar", "gz", "tgz", "bz2", "xz", "zst", "cab", "iso", "dmg",
];

pub const EXECUTABLE_EXTENSIONS: &[&str] = &[
    "exe", "msi", "bat", "cmd", "com", "app", "apk", "ipa", "jar", "bin", "run", "pkg", "deb",
    "rpm", "appimage",
];

pub const SYSTEM_EXTENSIONS: &[&str] = &[
    "sys", "dll", "so", "dylib", "drv", "plist", "lnk", "reg", "cpl", "efi",
];

/// File names that are system metadata regardless of extension.
const SYSTEM_FILE_NAMES: &[&str] = &[".ds_store", "thumbs.db", "desktop.ini", ".localized"];

/// Lookup order; the first table containing the extension wins.
const CATEGORY_TABLES: &[(FileCategory, &[&str])] = &[
    (FileCategory::Document, DOCUMENT_EXTENSIONS),
    (FileCategory::Image, IMAGE_EXTENSIONS),
    (FileCategory::Video, VIDEO_EXTENSIONS),
    (FileCategory::Audio, AUDIO_EXTENSIONS),
    (FileCategory::Code, CODE_EXTENSIONS),
    (FileCategory::Archive, ARCHIVE_EXTENSIONS),
    (FileCategory::Executable, EXECUTABLE_EXTENSIONS),
    (FileCategory::System, SYSTEM_EXTENSIONS),
];

// ---------------------------------------------------------------------------
// Category lookup
// ---------------------------------------------------------------------------

/// Maps a file name and extension to its category.
///
/// Matching is case-insensitive. A leading dot on `extension` is ignored.
pub fn determine_file_type(name: &str, extension: &str) -> FileCategory {
    let lowered_name = name.to_ascii_lowercase();
    if SYSTEM_FILE_NAMES.contains(&lowered_name.as_str()) {
        return FileCategory::System;
    }

    let extension = extension.trim_start_matches('.').to_ascii_lowercase();
    if extension.is_empty() {
        return FileCategory::Other;
    }

    CATEGORY_TABLES
        .iter()
        .find(|(_, table)| table.contains(&extension.as_str()))
        .map(|(category, _)| *category)
        .unwrap_or(FileCategory::Other)
}

/// Ranking tie-breaker weight for a category; higher is preferred.
pub fn file_type_preference_weight(category: FileCategory) -> u32 {
    match category {
        FileCategory::Document => 8,
        FileCategory::Code => 7,
        FileCategory::Image => 5,
        FileCategory::Video | FileCategory::Audio => 4,
        FileCategory::Other => 3,
        FileCategory::Archive | FileCategory::Executable => 2,
        FileCategory::System => 1,
    }
}

/// Splits the lower-cased extension off a file name.
///
/// Dot-files such as `.bashrc` have no extension; `.eslintrc.json` has `json`.
pub fn split_extension(name: &str) -> String {
    let trimmed = name.strip_prefix('.').unwrap_or(name);
    match trimmed.rsplit_once('.') {
        Some((stem, extension)) if !stem.is_empty() && !extension.is_empty() => {
            extension.to_ascii_lowercase()
        }
        _ => String::new(),
    }
}

/// Returns the name without its extension.
pub fn file_stem(name: &str) -> &str {
    let offset = usize::from(name.starts_with('.'));
    match name[offset..].rfind('.') {
        Some(index) if index > 0 => &name[..offset + index],
        _ => name,
    }
}
