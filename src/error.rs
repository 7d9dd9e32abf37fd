//! Structured errors for the emphasis engine.

use core::fmt;

use crate::tree::NodeId;

/// Failure category, mirroring where in the pipeline an error originated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A node could not be typed by the host tree abstraction.
    ClassificationAmbiguous,
    /// Transform input was blank or had no qualifying alphabetic run.
    EmptyInput,
    /// A scheduled node is no longer attached to the tree.
    DetachedNode,
    /// A host visibility or change subscription could not be established.
    SubscriptionFailure,
    /// The host rejected a tree mutation.
    TreeMutation,
    /// Markup could not be parsed into a document.
    Markup,
    /// Caller-supplied configuration was rejected.
    Config,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ErrorKind::ClassificationAmbiguous => "classify",
            ErrorKind::EmptyInput => "transform",
            ErrorKind::DetachedNode => "schedule",
            ErrorKind::SubscriptionFailure => "subscribe",
            ErrorKind::TreeMutation => "mutate",
            ErrorKind::Markup => "markup",
            ErrorKind::Config => "config",
        };
        f.write_str(label)
    }
}

/// Structured engine error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReadifyError {
    /// Failure category.
    pub kind: ErrorKind,
    /// Stable machine-readable code.
    pub code: &'static str,
    /// Human-readable message.
    pub message: Box<str>,
    /// Optional node context.
    pub node: Option<NodeId>,
    /// Optional byte offset (markup parsing).
    pub offset: Option<usize>,
}

impl ReadifyError {
    /// Create an error with kind, code and message.
    pub fn new(kind: ErrorKind, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            kind,
            code,
            message: message.into().into_boxed_str(),
            node: None,
            offset: None,
        }
    }

    pub(crate) fn empty_input() -> Self {
        Self::new(
            ErrorKind::EmptyInput,
            "TRANSFORM_EMPTY_INPUT",
            "text has no qualifying alphabetic run",
        )
    }

    pub(crate) fn detached(node: NodeId) -> Self {
        Self::new(
            ErrorKind::DetachedNode,
            "SCHEDULE_DETACHED_NODE",
            "node is no longer attached to the tree",
        )
        .with_node(node)
    }

    /// Attach node context.
    pub fn with_node(mut self, node: NodeId) -> Self {
        self.node = Some(node);
        self
    }

    /// Attach a byte offset.
    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// True for outcomes callers treat as a silent no-op.
    pub fn is_benign(&self) -> bool {
        matches!(self.kind, ErrorKind::EmptyInput | ErrorKind::DetachedNode)
    }
}

impl fmt::Display for ReadifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.kind, self.code, self.message)?;
        if let Some(node) = self.node {
            write!(f, " [node={}]", node)?;
        }
        if let Some(offset) = self.offset {
            write!(f, " [offset={}]", offset)?;
        }
        Ok(())
    }
}

impl std::error::Error for ReadifyError {}
