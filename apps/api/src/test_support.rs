//! Test doubles and fixtures shared by the unit tests.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use serde_json::{Map, Value};

use crate::llm_client::{Completion, LlmError, TextCompletion};
use crate::store::{DocumentStore, FieldPatch, MemoryDocumentStore, StoreError};

// ────────────────────────────────────────────────────────────────────────────
// Text completion
// ────────────────────────────────────────────────────────────────────────────

enum Script {
    Reply(String),
    Fail(Box<dyn Fn() -> LlmError + Send + Sync>),
}

/// Answers every call the same way and records what it was asked.
pub struct ScriptedCompletion {
    script: Script,
    calls: AtomicUsize,
    last: Mutex<Option<(String, String)>>,
}

impl ScriptedCompletion {
    pub fn replying(text: &str) -> Self {
        Self::with_script(Script::Reply(text.to_string()))
    }

    pub fn failing(make_error: impl Fn() -> LlmError + Send + Sync + 'static) -> Self {
        Self::with_script(Script::Fail(Box::new(make_error)))
    }

    fn with_script(script: Script) -> Self {
        Self {
            script,
            calls: AtomicUsize::new(0),
            last: Mutex::new(None),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// `(prompt, system)` of the most recent call.
    pub fn last_request(&self) -> Option<(String, String)> {
        self.last.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextCompletion for ScriptedCompletion {
    async fn complete(&self, prompt: &str, system: &str) -> Result<Completion, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last.lock().unwrap() = Some((prompt.to_string(), system.to_string()));
        match &self.script {
            Script::Reply(text) => Ok(Completion {
                text: text.clone(),
                finish_reason: Some("STOP".to_string()),
                prompt_feedback: None,
            }),
            Script::Fail(make_error) => Err(make_error()),
        }
    }

    fn model(&self) -> &str {
        "scripted"
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Document stores
// ────────────────────────────────────────────────────────────────────────────

/// In-memory store that counts merge-writes.
#[derive(Default)]
pub struct CountingStore {
    inner: MemoryDocumentStore,
    writes: AtomicUsize,
}

impl CountingStore {
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentStore for CountingStore {
    async fn merge(
        &self,
        collection: &str,
        doc_id: &str,
        patch: FieldPatch,
    ) -> Result<(), StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.merge(collection, doc_id, patch).await
    }

    async fn get(
        &self,
        collection: &str,
        doc_id: &str,
    ) -> Result<Option<Map<String, Value>>, StoreError> {
        self.inner.get(collection, doc_id).await
    }

    fn backend(&self) -> &'static str {
        "counting"
    }
}

/// Store whose every write fails as if the database were unreachable.
#[derive(Default)]
pub struct FailingStore {
    writes: AtomicUsize,
}

impl FailingStore {
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentStore for FailingStore {
    async fn merge(&self, _: &str, _: &str, _: FieldPatch) -> Result<(), StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        Err(StoreError::Database(sqlx::Error::PoolTimedOut))
    }

    async fn get(&self, _: &str, _: &str) -> Result<Option<Map<String, Value>>, StoreError> {
        Err(StoreError::Database(sqlx::Error::PoolTimedOut))
    }

    fn backend(&self) -> &'static str {
        "failing"
    }
}

// ────────────────────────────────────────────────────────────────────────────
// PDF fixtures
// ────────────────────────────────────────────────────────────────────────────

/// Builds a PDF with one page per entry. An empty entry yields a page with no text.
pub fn pdf_document(pages: &[&str]) -> Document {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for text in pages {
        let operations = if text.is_empty() {
            vec![]
        } else {
            vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ]
        };
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc
}

pub fn pdf_bytes(pages: &[&str]) -> Vec<u8> {
    let mut doc = pdf_document(pages);
    let mut out = Vec::new();
    doc.save_to(&mut out).unwrap();
    out
}

pub fn write_pdf(path: &Path, pages: &[&str]) {
    std::fs::write(path, pdf_bytes(pages)).unwrap();
}

pub fn write_zero_page_pdf(path: &Path) {
    write_pdf(path, &[]);
}
