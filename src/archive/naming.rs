use std::path::Path;

const MAX_NAME_CHARS: usize = 120;
const MAX_EXTENSION_CHARS: usize = 10;
const FALLBACK_STEM: &str = "video";
const RESERVED: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Make a file name safe to use as a flat archive entry.
///
/// Path separators, reserved and control characters become `_`, leading dots
/// are stripped and the result is capped at 120 characters with the
/// extension preserved. Never returns an empty string.
pub fn sanitize_filename(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| {
            if c.is_control() || RESERVED.contains(&c) {
                '_'
            } else {
                c
            }
        })
        .collect();

    let trimmed = replaced.trim().trim_start_matches('.').trim_end_matches(['.', ' ']);
    if trimmed.is_empty() {
        return FALLBACK_STEM.to_string();
    }

    truncate_keeping_extension(trimmed)
}

/// Archive entry name for the item at 0-based request position `index`
pub fn media_entry_name(index: usize, path: &Path) -> String {
    let original = path
        .file_name()
        .map(|name| name.to_string_lossy())
        .unwrap_or_default();

    format!("{:03}_{}", index + 1, sanitize_filename(&original))
}

fn truncate_keeping_extension(name: &str) -> String {
    if name.chars().count() <= MAX_NAME_CHARS {
        return name.to_string();
    }

    let extension = name
        .rsplit_once('.')
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty() && ext.chars().count() <= MAX_EXTENSION_CHARS);

    match extension {
        Some(ext) => {
            let keep = MAX_NAME_CHARS - ext.chars().count() - 1;
            format!("{}.{ext}", cut(name, keep))
        }
        None => cut(name, MAX_NAME_CHARS),
    }
}

/// First `keep` chars, without the trailing dots or spaces a cut can expose
fn cut(name: &str, keep: usize) -> String {
    let head: String = name.chars().take(keep).collect();
    let head = head.trim_end_matches(['.', ' ']);
    if head.is_empty() {
        FALLBACK_STEM.to_string()
    } else {
        head.to_string()
    }
}
