//! # Artifact Naming
//!
//! Derives display labels and deterministic file names for rendered plots.
//! File names are keyed by an MD5 digest of the input words so that repeated
//! requests for the same words land on the same artifact.

use anyhow::bail;
use std::borrow::Cow;
use std::fmt::Write;
use std::path::{Path, PathBuf};

/// Separates the base word from its sense or part-of-speech suffix.
pub const WORD_DELIMITER: char = '_';

/// Output category of a rendered plot. Each category has its own directory
/// under `<root>/static/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    SingleVector,
    Embedding,
}

impl ArtifactKind {
    pub fn dir_name(&self) -> &'static str {
        match self {
            ArtifactKind::SingleVector => "singleplots",
            ArtifactKind::Embedding => "tsneplots",
        }
    }
}

/// Returns the portion of `word` before the first [`WORD_DELIMITER`].
///
/// A word without a delimiter is returned unchanged.
pub fn display_label(word: &str) -> &str {
    match word.split_once(WORD_DELIMITER) {
        Some((head, _)) => head,
        None => word,
    }
}

/// Escapes every non-ASCII character as `\xNN`, `\uNNNN` or `\UNNNNNNNN`
/// (lowercase hex, width chosen by code point).
///
/// Artifacts already on disk were named from this escaped form, so the hash
/// input must stay byte-for-byte identical.
pub fn escape_non_ascii(text: &str) -> Cow<'_, str> {
    if text.is_ascii() {
        return Cow::Borrowed(text);
    }

    let mut escaped = String::with_capacity(text.len() * 4);
    for c in text.chars() {
        let code = c as u32;
        // Writing into a String cannot fail.
        match code {
            0..=0x7f => escaped.push(c),
            0x80..=0xff => {
                let _ = write!(escaped, "\\x{:02x}", code);
            }
            0x100..=0xffff => {
                let _ = write!(escaped, "\\u{:04x}", code);
            }
            _ => {
                let _ = write!(escaped, "\\U{:08x}", code);
            }
        }
    }
    Cow::Owned(escaped)
}

/// Lowercase hexadecimal MD5 digest of `bytes`.
pub fn content_hash(bytes: &[u8]) -> String {
    format!("{:x}", md5::compute(bytes))
}

/// Hash used to name the bar chart of a single word.
pub fn word_hash(word: &str) -> String {
    content_hash(escape_non_ascii(word).as_bytes())
}

/// Hash used to name the scatter plot of several words. Order-sensitive.
pub fn words_hash<S: AsRef<str>>(words: &[S]) -> String {
    let mut joined = String::new();
    for (i, word) in words.iter().enumerate() {
        if i > 0 {
            joined.push(WORD_DELIMITER);
        }
        joined.push_str(word.as_ref());
    }
    content_hash(escape_non_ascii(&joined).as_bytes())
}

/// Builds `<root>/static/<kind>/<model>_<hash>.png`.
///
/// The model identifier is part of the file name, so it must not be able to
/// leave the category directory.
pub fn artifact_path(
    root: &Path,
    kind: ArtifactKind,
    model: &str,
    hash: &str,
) -> anyhow::Result<PathBuf> {
    validate_model_name(model)?;
    Ok(root
        .join("static")
        .join(kind.dir_name())
        .join(format!("{}_{}.png", model, hash)))
}

fn validate_model_name(model: &str) -> anyhow::Result<()> {
    if model.is_empty() {
        bail!("Model identifier must not be empty");
    }
    if model.contains('/') || model.contains('\\') || model.contains("..") {
        bail!(
            "Model identifier {:?} must not contain path separators or '..'",
            model
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_label() {
        assert_eq!(display_label("plant_sense1"), "plant");
        assert_eq!(display_label("plant"), "plant");
        assert_eq!(display_label("cat_n_extra"), "cat");
        assert_eq!(display_label("_n"), "");
        assert_eq!(display_label("кот_NOUN"), "кот");
    }

    #[test]
    fn test_escape_non_ascii() {
        assert_eq!(escape_non_ascii("plant_sense1"), "plant_sense1");
        assert!(matches!(escape_non_ascii("plain"), Cow::Borrowed(_)));
        assert_eq!(escape_non_ascii("café"), "caf\\xe9");
        assert_eq!(escape_non_ascii("кот"), "\\u043a\\u043e\\u0442");
        assert_eq!(escape_non_ascii("a\u{1F600}"), "a\\U0001f600");
    }

    #[test]
    fn test_content_hash_known_digests() {
        assert_eq!(content_hash(b""), "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(content_hash(b"abc"), "900150983cd24fb0d6963f7d28e17f72");
    }

    #[test]
    fn test_word_hash() {
        assert_eq!(word_hash("plant_sense1"), "b6a9b2ffcdaa46056b2377c542dbe6f8");
        assert_eq!(word_hash("plant_sense1"), word_hash("plant_sense1"));
        // Escaped before hashing, never raw UTF-8.
        assert_eq!(word_hash("кот"), "445359c67879d626d77eb672df91b4a3");
        assert_eq!(word_hash("café"), "7a341aba16d83ab0d43eb9e90bf621d6");
    }

    #[test]
    fn test_words_hash_is_order_sensitive() {
        let forward = words_hash(&["cat_n", "dog_n"]);
        let backward = words_hash(&["dog_n", "cat_n"]);

        assert_eq!(forward, "a67d7230cf1791e83b683fe549997a4f");
        assert_eq!(backward, "1e3d4dd1b8b6815d770195e88ab3f32e");
        assert_ne!(forward, backward);
        assert_eq!(forward, content_hash(b"cat_n_dog_n"));
    }

    #[test]
    fn test_artifact_path() {
        let root = Path::new("/srv/site");
        let path = artifact_path(
            root,
            ArtifactKind::SingleVector,
            "ruscorpora",
            "b6a9b2ffcdaa46056b2377c542dbe6f8",
        )
        .unwrap();
        assert_eq!(
            path,
            PathBuf::from(
                "/srv/site/static/singleplots/ruscorpora_b6a9b2ffcdaa46056b2377c542dbe6f8.png"
            )
        );

        let path = artifact_path(root, ArtifactKind::Embedding, "user1", "abc").unwrap();
        assert_eq!(path, PathBuf::from("/srv/site/static/tsneplots/user1_abc.png"));
    }

    #[test]
    fn test_artifact_path_rejects_bad_models() {
        let root = Path::new("/srv/site");
        assert!(artifact_path(root, ArtifactKind::Embedding, "", "abc").is_err());
        assert!(artifact_path(root, ArtifactKind::Embedding, "../etc", "abc").is_err());
        assert!(artifact_path(root, ArtifactKind::Embedding, "a/b", "abc").is_err());
        assert!(artifact_path(root, ArtifactKind::Embedding, "a\\b", "abc").is_err());
    }
}
