// src/metadata.rs

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use std::{fs, path::Path};
use tracing::debug;

use crate::fetch::FetchResponse;

/// Response headers of a download plus descriptive fields, dumped as one
/// flat JSON object next to the data.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DownloadMetadata {
    #[serde(flatten)]
    fields: Map<String, Value>,
}

impl DownloadMetadata {
    pub fn from_response(resp: &FetchResponse) -> Self {
        let fields = resp
            .headers
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        Self { fields }
    }

    /// Add or replace a descriptive field.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).with_context(|| format!("writing metadata {}", path.display()))?;
        debug!(path = %path.display(), "wrote metadata");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::tempdir;

    #[test]
    fn headers_and_fields_are_flat() -> Result<()> {
        let resp = FetchResponse {
            url: "https://example.org/register.csv".into(),
            status: 200,
            headers: BTreeMap::from([
                ("content-type".to_string(), "text/csv".to_string()),
                ("file".to_string(), "from server".to_string()),
            ]),
            body: Vec::new(),
        };
        let meta = DownloadMetadata::from_response(&resp)
            .with("file", "Register of Charities")
            .with("data_link", vec!["a", "b"]);

        let dir = tempdir()?;
        let path = dir.path().join("meta.json");
        meta.write(&path)?;

        let back: Value = serde_json::from_str(&fs::read_to_string(&path)?)?;
        assert_eq!(back["content-type"], "text/csv");
        assert_eq!(back["file"], "Register of Charities");
        assert_eq!(back["data_link"][1], "b");
        Ok(())
    }
}
