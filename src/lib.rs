//! Incremental partial-word emphasis for live content trees.
//!
//! `readify` emphasizes the leading characters of words ("bionic reading")
//! inside a host content tree that keeps changing underneath it. The host
//! exposes its tree through [`ContentTree`] and its event loop through
//! [`Host`]; the [`Engine`] discovers eligible text, defers off-screen
//! content until it scrolls into view, transforms visible content in reading
//! order within a per-frame budget, and never transforms the same text twice.
//!
//! [`Document`] is an in-memory reference tree parsed from markup and
//! [`sim::Simulation`] drives an engine against it deterministically.
//!
//! ```
//! use readify::{sim::Simulation, Document, EngineOptions};
//!
//! let mut doc = Document::parse("<p>Reading information quickly</p>").unwrap();
//! doc.layout_blocks(20.0);
//! let mut sim = Simulation::new(doc, EngineOptions::default());
//! sim.start().unwrap();
//! sim.run_until_idle();
//! assert!(sim.doc.to_markup().contains("readify-bold"));
//! ```

#![cfg_attr(
    not(test),
    deny(
        clippy::disallowed_methods,
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::panic_in_result_fn,
        clippy::todo,
        clippy::unimplemented
    )
)]

pub mod analyzer;
pub mod classify;
pub mod config;
pub mod dom;
pub mod engine;
pub mod error;
pub mod fragment;
pub mod host;
pub mod lexicon;
pub mod marks;
pub mod order;
pub mod scan;
pub mod scheduler;
pub mod segment;
pub mod sim;
pub mod tree;
pub mod visibility;
pub mod watch;

pub use analyzer::{WordAnalysis, WordAnalyzer};
pub use classify::{CheckSet, Classifier, Eligibility, ElementRule, SelectorConfig};
pub use config::{
    BionicConfig, BoldRatios, CacheLimits, ChangeFilter, ConfigOverrides, EngineOptions,
    SchedulerConfig, VisibilityOptions,
};
pub use dom::Document;
pub use engine::{Engine, EngineStats};
pub use error::{ErrorKind, ReadifyError};
pub use fragment::{build_fragment, Fragment, FragmentPiece, OutputMarkers};
pub use host::Host;
pub use marks::Mark;
pub use order::reading_order;
pub use scan::ScanResult;
pub use segment::{segment, Token, TokenKind};
pub use tree::{ContentTree, NodeId, NodeKind, Rect, Viewport};
pub use watch::{ChangeKind, ChangeRecord};
