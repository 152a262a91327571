//! Human-readable labels for stored filenames.

use std::path::Path;

/// Strip the `_<token>` suffix the storage layer appends to stored names.
///
/// `cafe_<uuid>.png` becomes `cafe.png`. Everything after the last
/// underscore of the stem is treated as the suffix, so an original name
/// such as `my_photo` stored as `my_photo_<uuid>.png` still displays as
/// `my_photo.png`, but a stem like `my_photo` without any suffix would
/// display as `my.png`. Names without an underscore are returned as is.
pub fn display_name(filename: &str) -> String {
    let path = Path::new(filename);
    let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
        return filename.to_string();
    };

    let Some((head, _suffix)) = stem.rsplit_once('_') else {
        return filename.to_string();
    };

    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{head}.{ext}"),
        None => head.to_string(),
    }
}
