//! Schema definition handle.

use std::sync::Arc;

use datawire_core::DataItem;

use crate::node::SchemaNode;
use crate::sink::WarningSink;

/// Dotted path root used in validation warnings.
const ROOT_PATH: &str = "root";

/// A parsed schema: title, root node tree and optional warning sink.
///
/// Immutable after construction and safe to consult from multiple threads
/// concurrently.
pub struct SchemaDefinition {
    title: String,
    root: SchemaNode,
    sink: Option<Arc<dyn WarningSink>>,
}

impl SchemaDefinition {
    pub(crate) fn new(
        title: String,
        root: SchemaNode,
        sink: Option<Arc<dyn WarningSink>>,
    ) -> SchemaDefinition {
        SchemaDefinition { title, root, sink }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// The sink that receives validation warnings, if one was attached.
    pub fn warning_sink(&self) -> Option<&Arc<dyn WarningSink>> {
        self.sink.as_ref()
    }

    /// The root schema node.
    pub fn root(&self) -> &SchemaNode {
        &self.root
    }

    /// Synthesises a document satisfying the schema; optional members are
    /// included only when `include_all` is set.
    pub fn create_default(&self, include_all: bool) -> DataItem {
        self.root.create_default(include_all)
    }

    /// Recursively checks `item` against the schema in its tokenised or
    /// expanded form. Failure reasons go to the warning sink.
    pub fn validate(&self, item: &DataItem, is_tokenized: bool) -> bool {
        self.root
            .validate_at(item, is_tokenized, true, self.sink.as_deref(), ROOT_PATH)
    }

    /// Converts a tokenised document to expanded form. On failure the
    /// returned item carries a failure status (`FailedSchema` or the
    /// underlying wire failure).
    pub fn expand(&self, item: &DataItem) -> DataItem {
        self.root.expand_at(item, self.sink.as_deref(), ROOT_PATH)
    }

    /// Converts an expanded document to tokenised form; dual to
    /// [`expand`](Self::expand).
    pub fn tokenize(&self, item: &DataItem) -> DataItem {
        self.root.tokenize_at(item, self.sink.as_deref(), ROOT_PATH)
    }
}

impl std::fmt::Debug for SchemaDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaDefinition")
            .field("title", &self.title)
            .field("root", &self.root.schema_data_type())
            .finish_non_exhaustive()
    }
}
