//! Media reference extraction and JSON document helpers

use super::RelayFallback;
use serde_json::Value;

const DOCUMENT_TYPE: &str = "document";
const DEFAULT_DOCUMENT_NAME: &str = "file.pdf";
const DEFAULT_MEDIA_NAME: &str = "file.bin";
const PLUGIN_SEGMENT: &str = "whatsapp/";

/// The media node a message body points at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaReference {
    /// Value of the top-level `type` field, also the key of the media node
    pub kind: String,
    pub link: String,
    pub filename: Option<String>,
}

impl MediaReference {
    /// Read `type`, then `<type>.link` and `<type>.filename` from a parsed body.
    pub fn extract(doc: &Value) -> Result<Self, RelayFallback> {
        let kind = doc
            .get("type")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .ok_or(RelayFallback::MissingType)?;

        let node = doc.get(kind).filter(|n| n.is_object()).ok_or(RelayFallback::NotRemote)?;

        let link = node
            .get("link")
            .and_then(Value::as_str)
            .filter(|l| has_http_scheme(l))
            .ok_or(RelayFallback::NotRemote)?;

        let filename = node
            .get("filename")
            .and_then(Value::as_str)
            .filter(|f| !f.is_empty())
            .map(str::to_string);

        Ok(Self {
            kind: kind.to_string(),
            link: link.to_string(),
            filename,
        })
    }

    /// Name sent with the upload. Only documents keep their own name.
    pub fn upload_filename(&self) -> &str {
        if self.kind == DOCUMENT_TYPE {
            self.filename.as_deref().unwrap_or(DEFAULT_DOCUMENT_NAME)
        } else {
            DEFAULT_MEDIA_NAME
        }
    }

    /// Path of the `link` field inside the body
    pub fn link_path(&self) -> [&str; 2] {
        [self.kind.as_str(), "link"]
    }
}

fn has_http_scheme(link: &str) -> bool {
    let lower = link.get(..8).unwrap_or(link).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Plugin identifier: the first non-empty segment after `whatsapp/`.
pub fn plugin_id(url: &str) -> Option<&str> {
    url.match_indices(PLUGIN_SEGMENT).find_map(|(idx, _)| {
        let rest = &url[idx + PLUGIN_SEGMENT.len()..];
        let end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
        Some(&rest[..end]).filter(|id| !id.is_empty())
    })
}

/// Walk object keys along `path`.
pub fn get_path<'a>(doc: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(doc, |node, key| node.get(*key))
}

/// Replace the value at `path`. The parent object must already exist.
pub fn set_path(doc: &mut Value, path: &[&str], value: Value) -> bool {
    let Some((last, parents)) = path.split_last() else {
        return false;
    };

    let parent = parents
        .iter()
        .try_fold(doc, |node, key| node.get_mut(*key));

    match parent.and_then(Value::as_object_mut) {
        Some(object) => {
            object.insert((*last).to_string(), value);
            true
        }
        None => false,
    }
}
