//! Maps a user-supplied model identifier to an on-disk directory.

use crate::error::RegistryError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelSource {
    Local,
    HfCache,
    /// A well-formed repo id or alias with no matching directory under the
    /// cache root: the model exists, just not on this machine. Fetching it
    /// is out of scope, so the registry fails this as `DOWNLOAD_UNSUPPORTED`
    /// rather than `NOT_FOUND`.
    Remote,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedModel {
    pub canonical_id: String,
    pub model_path: PathBuf,
    pub source: ModelSource,
}

/// Resolves identifiers to on-disk model directories.
///
/// Relative-path treatment is intentionally narrow: only identifiers
/// prefixed with `./` or `../` are treated as filesystem paths.
/// `models/foo` is always looked up as a repo id / alias, even if a
/// directory of that name happens to exist — kept narrow on purpose, not
/// silently broadened.
pub struct Resolver {
    hf_cache_root: PathBuf,
    aliases: HashMap<String, String>,
}

impl Resolver {
    pub fn new(hf_cache_root: PathBuf) -> Self {
        let mut aliases = HashMap::new();
        // Known short names that route to their canonical repo id.
        aliases.insert("moondream3".to_owned(), "moondream/moondream-3-preview".to_owned());
        Resolver { hf_cache_root, aliases }
    }

    pub fn with_extra_aliases(mut self, extra: impl IntoIterator<Item = (String, String)>) -> Self {
        self.aliases.extend(extra);
        self
    }

    pub fn resolve(&self, identifier: &str) -> Result<ResolvedModel, RegistryError> {
        if identifier.is_empty() {
            return Err(RegistryError::EmptyIdentifier);
        }

        if let Some(path) = local_path_if_explicit(identifier) {
            if path.exists() {
                return Ok(ResolvedModel {
                    canonical_id: identifier.to_owned(),
                    model_path: path,
                    source: ModelSource::Local,
                });
            }
            return Err(RegistryError::NotFound(identifier.to_owned()));
        }

        if Path::new(identifier).is_absolute() && Path::new(identifier).exists() {
            return Ok(ResolvedModel {
                canonical_id: identifier.to_owned(),
                model_path: PathBuf::from(identifier),
                source: ModelSource::Local,
            });
        }

        let canonical_id = self
            .aliases
            .get(&identifier.to_ascii_lowercase())
            .cloned()
            .unwrap_or_else(|| identifier.to_owned());

        let model_path = self.hf_cache_root.join(&canonical_id);
        if !model_path.exists() {
            // A syntactically valid repo id/alias, just not cached locally:
            // `not found` would suggest the id itself is wrong, when really
            // it would need a download this resolver does not perform.
            return Ok(ResolvedModel { canonical_id, model_path, source: ModelSource::Remote });
        }
        Ok(ResolvedModel { canonical_id, model_path, source: ModelSource::HfCache })
    }
}

fn local_path_if_explicit(identifier: &str) -> Option<PathBuf> {
    if identifier.starts_with("./") || identifier.starts_with("../") {
        Some(PathBuf::from(identifier))
    } else {
        None
    }
}
