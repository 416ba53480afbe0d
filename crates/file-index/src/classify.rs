//! Entry classification.
//!
//! Pure, stateless helpers that assign a category and descriptive tags to a
//! filesystem entry:
//! - `category` - extension tables, category lookup, preference weights
//! - `tags` - kind, size bucket and name-pattern tags

mod category;
mod tags;

pub use category::{
    determine_file_type, file_stem, file_type_preference_weight, split_extension,
    ARCHIVE_EXTENSIONS, AUDIO_EXTENSIONS, CODE_EXTENSIONS, DOCUMENT_EXTENSIONS,
    EXECUTABLE_EXTENSIONS, IMAGE_EXTENSIONS, SYSTEM_EXTENSIONS, VIDEO_EXTENSIONS,
};
pub use tags::{generate_file_tags, size_bucket, MEDIUM_FILE_BYTES, SMALL_FILE_BYTES};
