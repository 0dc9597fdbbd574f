// pii-mask-core/src/engines/gazetteer_tagger.rs
//! Dictionary-backed [`NerEngine`] built on `pii-mask-gazetteer`.
//!
//! This is the engine used when no model is plugged in. It recognizes the
//! words in its gazetteer and nothing else.
//! License: MIT OR APACHE 2.0

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::debug;
use pii_mask_gazetteer::{default_entries, Gazetteer, GazetteerTagger};

use crate::config::GazetteerConfig;
use crate::engine::NerEngine;
use crate::errors::InferenceError;
use crate::tagging::TaggedToken;

#[derive(Debug)]
pub struct GazetteerEngine {
    tagger: GazetteerTagger,
}

impl GazetteerEngine {
    pub fn new(tagger: GazetteerTagger) -> Self {
        Self { tagger }
    }

    pub fn with_defaults() -> Result<Self> {
        let tagger = GazetteerTagger::with_defaults().context("Failed to build the default gazetteer")?;
        Ok(Self::new(tagger))
    }

    /// Builds the dictionary from the built-in lists (unless disabled) plus
    /// any configured words.
    pub fn from_config(config: &GazetteerConfig) -> Result<Self> {
        let configured = config.load_entries()?;
        let mut entries: Vec<(&str, &str)> = Vec::new();
        if config.include_defaults {
            entries.extend(default_entries().map(|(w, l)| (w, l)));
        }
        entries.extend(configured.iter().map(|(w, l)| (w.as_str(), l.as_str())));

        let gazetteer = Gazetteer::new(entries).context("Failed to build the gazetteer")?;
        debug!("Gazetteer built with {} entries.", gazetteer.len());
        Ok(Self::new(GazetteerTagger::new(gazetteer)))
    }

    pub fn len(&self) -> usize {
        self.tagger.gazetteer().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tagger.gazetteer().is_empty()
    }
}

#[async_trait]
impl NerEngine for GazetteerEngine {
    fn name(&self) -> &str {
        "gazetteer"
    }

    async fn infer(&self, text: &str) -> Result<Vec<TaggedToken>, InferenceError> {
        Ok(self
            .tagger
            .tag(text)
            .into_iter()
            .map(|t| TaggedToken::new(t.start, t.end, t.tag))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tagging::entity_spans;
    use std::collections::BTreeMap;

    #[tokio::test]
    async fn test_default_engine_tags_surnames() {
        let engine = GazetteerEngine::with_defaults().unwrap();
        let text = "田中と鈴木で確認済み";
        let tokens = engine.infer(text).await.unwrap();
        let spans = entity_spans(&tokens, text.chars().count());
        let found: Vec<_> = spans.iter().map(|s| (s.start(), s.end(), s.label())).collect();
        assert_eq!(found, vec![(0, 2, "PERSON"), (3, 5, "PERSON")]);
    }

    #[tokio::test]
    async fn test_configured_entries_extend_the_dictionary() {
        let mut words = BTreeMap::new();
        words.insert("PERSON".to_string(), vec!["西園寺".to_string()]);
        let config = GazetteerConfig {
            include_defaults: false,
            path: None,
            entries: words,
        };
        let engine = GazetteerEngine::from_config(&config).unwrap();
        assert_eq!(engine.len(), 1);

        let tokens = engine.infer("西園寺さんと佐藤さん").await.unwrap();
        let spans = entity_spans(&tokens, 10);
        assert_eq!(spans.len(), 1);
        assert_eq!((spans[0].start(), spans[0].end()), (0, 3));
    }

    #[test]
    fn test_gazetteer_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gazetteer.yaml");
        std::fs::write(&path, "LOCATION:\n  - 名古屋\n").unwrap();
        let config = GazetteerConfig {
            include_defaults: true,
            path: Some(path),
            entries: BTreeMap::new(),
        };
        let engine = GazetteerEngine::from_config(&config).unwrap();
        let defaults = GazetteerEngine::with_defaults().unwrap();
        assert_eq!(engine.len(), defaults.len() + 1);
    }
}
