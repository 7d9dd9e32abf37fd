mod common;

use common::budget_alloc::BudgetAlloc;
use common::fixtures::{laid_out, paragraphs};
use readify::sim::Simulation;
use readify::{build_fragment, CacheLimits, EngineOptions, OutputMarkers, WordAnalyzer};

// A 200-paragraph page currently peaks well below 8MiB including the
// document arena. Keep a guardrail at 32MiB and ratchet downward.
const FULL_FLOW_BUDGET_BYTES: usize = 32 * 1024 * 1024;

#[global_allocator]
static ALLOC: BudgetAlloc = BudgetAlloc::new();

#[test]
fn full_page_transform_under_budget() {
    let markup = paragraphs(200);

    ALLOC.reset();
    let mut sim = Simulation::new(laid_out(&markup), EngineOptions::default());
    sim.start().unwrap_or_else(|e| panic!("start: {}", e));
    sim.scroll_to(4000.0);
    sim.run_until_idle();
    sim.scroll_to(7000.0);
    sim.run_until_idle();
    let snapshot = ALLOC.snapshot();

    assert!(sim.engine.stats().transformed > 31);
    assert!(
        snapshot.peak_bytes <= FULL_FLOW_BUDGET_BYTES,
        "full flow peak {} bytes exceeds budget {}",
        snapshot.peak_bytes,
        FULL_FLOW_BUDGET_BYTES
    );
}

#[test]
fn analyzer_caches_stay_within_limits() {
    let limits = CacheLimits {
        max_analysis_entries: 64,
        max_syllable_entries: 64,
        max_classification_entries: 64,
    };
    let options = EngineOptions::default();
    let mut analyzer = WordAnalyzer::new(options.bionic.clone(), &limits);

    let mut text = String::new();
    for idx in 0..2_000 {
        text.push_str(&format!("reading{} ", idx_word(idx)));
    }
    let fragment = build_fragment(&text, &mut analyzer, OutputMarkers::default())
        .unwrap_or_else(|e| panic!("fragment: {}", e));

    assert_eq!(fragment.plain_text(), text);
    assert!(analyzer.cached_analyses() <= 64);
    assert!(analyzer.cached_syllables() <= 64);
}

/// Distinct alphabetic suffix for `idx` ("a", "b", .., "ba", ..).
fn idx_word(mut idx: usize) -> String {
    let mut out = Vec::new();
    loop {
        out.push(b'a' + (idx % 26) as u8);
        idx /= 26;
        if idx == 0 {
            break;
        }
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}
