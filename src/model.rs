//! Model load format: a UTF-8 JSON document, or a ZIP archive containing
//! exactly one JSON member. See SPEC_FULL.md §6.

use std::io::Cursor;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use crate::error::ModelError;
use crate::network::Network;
use crate::node::Node;

#[derive(Debug, Deserialize)]
struct NetworkDocument {
    nodes: Vec<Node>,
}

impl Network {
    /// Parse a UTF-8 JSON document matching the grammar in SPEC_FULL.md §6
    /// and validate it into a [`Network`].
    pub fn load_json(json: &str) -> Result<Self, ModelError> {
        let document: NetworkDocument = serde_json::from_str(json)?;
        Network::new(document.nodes)
    }

    /// Load the first `.json`-suffixed member of a ZIP archive and parse it
    /// as a network document. Ground: donutbrowser's
    /// `BayesianNetwork::from_zip_bytes` — first match wins, ties are not
    /// disambiguated.
    pub fn load_zip(zip_bytes: &[u8]) -> Result<Self, ModelError> {
        let cursor = Cursor::new(zip_bytes);
        let mut archive = zip::ZipArchive::new(cursor)?;

        let mut json_content = String::new();
        let mut found = false;
        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            if file.name().ends_with(".json") {
                file.read_to_string(&mut json_content)?;
                found = true;
                break;
            }
        }
        if !found {
            return Err(ModelError::NoJsonInZip);
        }
        Network::load_json(&json_content)
    }

    /// Load a network from a file, sniffing ZIP's local-file-header magic
    /// bytes (`PK\x03\x04`) to decide between [`Network::load_zip`] and
    /// [`Network::load_json`].
    pub fn load_path(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let bytes = std::fs::read(path)?;
        if bytes.starts_with(b"PK\x03\x04") {
            Network::load_zip(&bytes)
        } else {
            let json = String::from_utf8_lossy(&bytes);
            Network::load_json(&json)
        }
    }
}
