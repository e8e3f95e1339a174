//! Documents with a small inverted index for keyword search.

use std::collections::{BTreeSet, HashMap};

use anyhow::Result;

use crate::model::{next_id, now_timestamp, Document};
use crate::store::{JsonStore, RecordStore};
use crate::validate::validate_text;

const STOPWORDS: &[&str] = &["the", "and", "or", "of", "a", "to", "in", "for", "on", "is", "it"];

/// Lowercase, split on anything that is not an ASCII letter or digit, and
/// drop stopwords.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| !t.is_empty() && !STOPWORDS.contains(t))
        .map(str::to_string)
        .collect()
}

fn doc_tokens(doc: &Document) -> Vec<String> {
    let mut tokens = tokenize(&doc.title);
    tokens.extend(tokenize(&doc.text));
    for tag in &doc.tags {
        tokens.extend(tokenize(tag));
    }
    tokens
}

pub struct DocumentManager {
    store: JsonStore<Document>,
    docs: Vec<Document>,
    index: HashMap<String, BTreeSet<i64>>,
}

impl DocumentManager {
    pub fn load(store: JsonStore<Document>) -> Self {
        let docs = store.read();
        let mut dm = Self {
            store,
            docs,
            index: HashMap::new(),
        };
        dm.rebuild_index();
        dm
    }

    fn rebuild_index(&mut self) {
        self.index.clear();
        let docs = std::mem::take(&mut self.docs);
        for doc in &docs {
            self.index_doc(doc);
        }
        self.docs = docs;
    }

    fn index_doc(&mut self, doc: &Document) {
        for token in doc_tokens(doc) {
            self.index.entry(token).or_default().insert(doc.id);
        }
    }

    pub fn store_path(&self) -> &std::path::Path {
        self.store.path()
    }

    pub fn add(
        &mut self,
        title: &str,
        text: &str,
        tags: Vec<String>,
        links: Vec<String>,
    ) -> Result<Document> {
        validate_text("document title", title)?;
        let now = now_timestamp();
        let doc = Document {
            id: next_id(&self.docs),
            title: title.trim().to_string(),
            text: text.to_string(),
            tags,
            links,
            created: now.clone(),
            updated: now,
        };
        let mut all = self.docs.clone();
        all.push(doc.clone());
        self.store.write(&all)?;
        self.docs = all;
        self.index_doc(&doc);
        Ok(doc)
    }

    pub fn list(&self) -> &[Document] {
        &self.docs
    }

    pub fn get(&self, id: i64) -> Option<&Document> {
        self.docs.iter().find(|d| d.id == id)
    }

    pub fn delete(&mut self, id: i64) -> Result<bool> {
        let before = self.docs.len();
        let kept: Vec<Document> = self.docs.iter().filter(|d| d.id != id).cloned().collect();
        if kept.len() == before {
            return Ok(false);
        }
        self.store.write(&kept)?;
        self.docs = kept;
        self.rebuild_index();
        Ok(true)
    }

    /// Keyword search ranked by the number of matching query tokens, ties by
    /// id. Falls back to substring matching when nothing scores.
    pub fn search(&self, query: &str) -> Vec<&Document> {
        let mut scores: HashMap<i64, usize> = HashMap::new();
        for token in tokenize(query) {
            if let Some(ids) = self.index.get(&token) {
                for id in ids {
                    *scores.entry(*id).or_default() += 1;
                }
            }
        }
        if scores.is_empty() {
            return self.substring_search(query);
        }
        let mut ranked: Vec<(i64, usize)> = scores.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked
            .into_iter()
            .filter_map(|(id, _)| self.get(id))
            .collect()
    }

    fn substring_search(&self, query: &str) -> Vec<&Document> {
        let q = query.to_lowercase();
        self.docs
            .iter()
            .filter(|d| {
                d.title.to_lowercase().contains(&q)
                    || d.text.to_lowercase().contains(&q)
                    || d.tags.iter().any(|t| t.to_lowercase().contains(&q))
            })
            .collect()
    }

    pub fn replace_all(&mut self, docs: Vec<Document>) -> Result<()> {
        self.store.write(&docs)?;
        self.docs = docs;
        self.rebuild_index();
        Ok(())
    }
}
