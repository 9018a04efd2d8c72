//! Wire model for the external document-layout service.
//!
//! Layout analysis and OCR happen outside this crate; what arrives is a
//! page-ordered tree of tagged blocks. Tables come pre-rendered as images,
//! base64-encoded, rather than as parsed cell data.

use crate::PdfExtractError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentLayout {
    pub pages: Vec<PageLayout>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageLayout {
    /// 1-based page number.
    pub number: u32,
    pub blocks: Vec<LayoutBlock>,
}

/// One tagged block in reading order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LayoutBlock {
    Title { text: String },
    SectionHeader { text: String },
    Text { text: String },
    List { items: Vec<String> },
    Table { image_base64: String },
}

/// The external document-structure service.
#[async_trait]
pub trait LayoutAnalyzer: Send + Sync {
    /// Runs layout analysis over the raw PDF bytes.
    async fn analyze(&self, raw: &[u8]) -> Result<DocumentLayout, PdfExtractError>;
}
