mod common;

use common::fixtures::{
    bold_count, by_id, first_text, has_emphasis, laid_out, paragraphs, two_column_page,
};
use readify::sim::{SimHost, Simulation};
use readify::{ConfigOverrides, EngineOptions, Mark};

fn simulation(markup: &str) -> Simulation {
    Simulation::new(laid_out(markup), EngineOptions::default())
}

fn started(markup: &str) -> Simulation {
    let mut sim = simulation(markup);
    sim.start().expect("start should succeed");
    sim.run_until_idle();
    sim
}

#[test]
fn visible_paragraphs_are_emphasized_once() {
    let sim = started(&paragraphs(5));
    let stats = sim.engine.stats();
    assert_eq!(stats.transformed, 5);
    assert_eq!(stats.text_nodes_rewritten, 5);
    assert!(bold_count(&sim.doc) >= 5);
    for idx in 0..5 {
        let p = by_id(&sim.doc, &format!("p{idx}"));
        assert_eq!(sim.engine.mark(p), Mark::Processed);
        assert!(has_emphasis(&sim.doc, p));
        assert_eq!(
            readify::tree::text_content(&sim.doc, p),
            format!("Paragraph {idx} explains reading information patterns.")
        );
    }
}

#[test]
fn rescans_and_restarts_do_not_transform_twice() {
    let mut sim = started(&paragraphs(5));
    let article = by_id(&sim.doc, "article");
    let before = sim.doc.to_markup_of(article);
    let bold_before = bold_count(&sim.doc);

    let body = sim.doc.element_by_tag("body").expect("body");
    sim.doc.set_attribute(body, "class", "wide");
    sim.run_until_idle();
    assert_eq!(sim.doc.to_markup_of(article), before);

    // Marks are gone after a restart; emitted output is still recognized.
    sim.stop();
    sim.start().expect("restart should succeed");
    sim.run_until_idle();
    assert_eq!(sim.doc.to_markup_of(article), before);
    assert_eq!(bold_count(&sim.doc), bold_before);
    assert_eq!(sim.engine.stats().transformed, 5);
}

#[test]
fn two_columns_are_transformed_left_column_first() {
    let mut options = EngineOptions::default();
    options.scheduler.max_elements_per_frame = 1;
    let mut sim = Simulation::new(two_column_page(), options);
    sim.start().expect("start should succeed");
    sim.run_microtasks();

    let ids = ["l1", "l2", "r1", "r2"];
    let nodes: Vec<_> = ids.iter().map(|id| by_id(&sim.doc, id)).collect();
    let mut order = Vec::new();
    while sim.run_frame() {
        for (id, node) in ids.iter().zip(&nodes) {
            if sim.engine.mark(*node) == Mark::Processed && !order.contains(id) {
                order.push(*id);
            }
        }
    }
    assert_eq!(order, vec!["l1", "l2", "r1", "r2"]);
}

#[test]
fn text_inside_ignored_elements_is_never_a_candidate() {
    let sim = started(
        "<body>\
            <code id=\"c\"><p id=\"hi\">Hi!</p></code>\
            <script id=\"s\">var greeting = \"Hi!\";</script>\
            <textarea id=\"t\">Typing words here</textarea>\
            <p id=\"ok\">Hello there, careful reader.</p>\
        </body>",
    );
    let code = by_id(&sim.doc, "c");
    let hi = by_id(&sim.doc, "hi");
    assert_eq!(sim.doc.to_markup_of(code), "<code id=\"c\"><p id=\"hi\">Hi!</p></code>");
    assert_eq!(sim.engine.mark(hi), Mark::Unprocessed);
    assert_eq!(first_text(&sim.doc, by_id(&sim.doc, "s")).as_deref(), Some("var greeting = \"Hi!\";"));
    assert_eq!(first_text(&sim.doc, by_id(&sim.doc, "t")).as_deref(), Some("Typing words here"));
    assert_eq!(sim.engine.mark(by_id(&sim.doc, "ok")), Mark::Processed);
    assert_eq!(sim.engine.stats().candidates, 1);
}

#[test]
fn hidden_content_is_transformed_once_when_revealed() {
    let mut sim = started(&paragraphs(100));
    // 800px viewport + 400px margin: rows 0..=30 are visible up front.
    assert_eq!(sim.engine.stats().transformed, 31);
    assert_eq!(sim.engine.host().observed_count(), 69);

    let p50 = by_id(&sim.doc, "p50");
    let p40 = by_id(&sim.doc, "p40");
    assert_eq!(sim.engine.mark(p50), Mark::Observed);
    assert!(!has_emphasis(&sim.doc, p50));

    sim.scroll_to(2000.0);
    sim.run_until_idle();
    // Rows 46..=73 intersect the viewport extended by its 160px root margin.
    assert_eq!(sim.engine.stats().revealed, 28);
    assert_eq!(sim.engine.stats().transformed, 59);
    assert_eq!(sim.engine.mark(p50), Mark::Processed);
    assert!(has_emphasis(&sim.doc, p50));
    assert!(!sim.engine.host().is_observed(p50));
    assert_eq!(sim.engine.mark(p40), Mark::Observed);

    let markup = sim.doc.to_markup_of(p50);
    sim.scroll_to(0.0);
    sim.run_until_idle();
    sim.scroll_to(2000.0);
    sim.run_until_idle();
    assert_eq!(sim.engine.stats().transformed, 59);
    assert_eq!(sim.doc.to_markup_of(p50), markup);
}

#[test]
fn removal_resets_marks_and_reinsertion_keeps_output() {
    let mut sim = started(&paragraphs(100));
    let article = by_id(&sim.doc, "article");
    let p2 = by_id(&sim.doc, "p2");
    let p80 = by_id(&sim.doc, "p80");
    let emphasized = sim.doc.to_markup_of(p2);
    assert!(sim.engine.host().is_observed(p80));

    sim.doc.remove(p2);
    sim.doc.remove(p80);
    sim.run_until_idle();
    assert_eq!(sim.engine.mark(p2), Mark::Unprocessed);
    assert_eq!(sim.engine.mark(p80), Mark::Unprocessed);
    assert!(!sim.engine.host().is_observed(p80));
    assert_eq!(sim.doc.to_markup_of(p2), emphasized, "emphasis is not reverted");

    let transformed = sim.engine.stats().transformed;
    sim.doc.append_child(article, p2);
    sim.run_until_idle();
    assert_eq!(sim.engine.stats().transformed, transformed);
    assert_eq!(sim.doc.to_markup_of(p2), emphasized);
}

#[test]
fn stop_drops_subscriptions_and_marks_but_keeps_output() {
    let mut sim = started(&paragraphs(100));
    let p0 = by_id(&sim.doc, "p0");
    let article = by_id(&sim.doc, "article");
    let bold = bold_count(&sim.doc);

    sim.stop();
    sim.stop();
    assert!(!sim.engine.is_running());
    assert_eq!(sim.engine.host().observed_count(), 0);
    assert_eq!(sim.engine.mark(p0), Mark::Unprocessed);
    assert_eq!(bold_count(&sim.doc), bold);

    let late = sim.doc.create_element("p");
    let text = sim.doc.create_text("Late arriving paragraph text.");
    sim.doc.append_child(late, text);
    sim.doc.append_child(article, late);
    sim.run_until_idle();
    assert!(!has_emphasis(&sim.doc, late));
    assert_eq!(sim.engine.stats().transformed, 31);
}

#[test]
fn new_content_is_picked_up_from_change_batches() {
    let mut sim = started(&paragraphs(3));
    let article = by_id(&sim.doc, "article");
    let p = sim.doc.create_element("p");
    let text = sim.doc.create_text("Freshly inserted paragraph.");
    sim.doc.append_child(p, text);
    sim.doc.append_child(article, p);
    sim.doc.layout_blocks(common::fixtures::LINE_HEIGHT);
    sim.run_until_idle();
    assert_eq!(sim.engine.mark(p), Mark::Processed);
    assert!(has_emphasis(&sim.doc, p));
    assert_eq!(sim.engine.stats().transformed, 4);
}

#[test]
fn only_relevant_attribute_changes_trigger_rescans() {
    let mut sim = started(&paragraphs(3));
    let article = by_id(&sim.doc, "article");
    let scans = sim.engine.stats().scans;

    sim.doc.set_attribute(article, "data-count", "3");
    sim.run_until_idle();
    assert_eq!(sim.engine.stats().scans, scans);

    sim.doc.set_attribute(article, "class", "wide");
    sim.run_until_idle();
    assert_eq!(sim.engine.stats().scans, scans + 1);
}

#[test]
fn visibility_subscription_failure_fails_open() {
    let mut host = SimHost::new();
    host.fail_visibility(true);
    let mut sim = Simulation::with_host(laid_out(&paragraphs(100)), EngineOptions::default(), host);
    sim.start().expect("start should succeed");
    sim.run_until_idle();
    assert_eq!(sim.engine.stats().transformed, 100);
    assert!(sim.engine.stats().subscription_failures >= 69);
    assert_eq!(sim.engine.stats().observed, 0);
}

#[test]
fn change_subscription_failure_still_runs_initial_scan() {
    let mut host = SimHost::new();
    host.fail_changes(true);
    let mut sim = Simulation::with_host(laid_out(&paragraphs(3)), EngineOptions::default(), host);
    sim.start().expect("start should succeed");
    sim.run_until_idle();
    assert_eq!(sim.engine.stats().transformed, 3);
    assert_eq!(sim.engine.stats().subscription_failures, 1);

    let article = by_id(&sim.doc, "article");
    let p = sim.doc.create_element("p");
    let text = sim.doc.create_text("Unseen paragraph text.");
    sim.doc.append_child(p, text);
    sim.doc.append_child(article, p);
    sim.run_until_idle();
    assert_eq!(sim.engine.mark(p), Mark::Unprocessed);
}

#[test]
fn detached_candidates_are_skipped_silently() {
    let mut sim = simulation(&paragraphs(5));
    sim.start().expect("start should succeed");
    sim.run_microtasks();
    assert_eq!(sim.engine.pending_candidates(), 5);

    let p1 = by_id(&sim.doc, "p1");
    sim.doc.remove(p1);
    sim.run_until_idle();
    let stats = sim.engine.stats();
    assert_eq!(stats.skipped_detached, 1);
    assert_eq!(stats.transformed, 4);
    assert_eq!(stats.failed, 0);
    assert_eq!(sim.engine.mark(p1), Mark::Unprocessed);
    assert!(!has_emphasis(&sim.doc, p1));
}

#[test]
fn frame_budget_splits_work_across_frames() {
    let sim_host = SimHost::with_tick(5.0);
    let mut sim = Simulation::with_host(laid_out(&paragraphs(10)), EngineOptions::default(), sim_host);
    sim.start().expect("start should succeed");
    sim.run_until_idle();
    // 5ms per clock read against a 16ms budget: four candidates per frame.
    assert_eq!(sim.engine.stats().transformed, 10);
    assert_eq!(sim.engine.stats().frames, 3);
    assert_eq!(sim.engine.host().frame_requests(), 3);
}

#[test]
fn per_frame_cap_limits_batch_size() {
    let mut options = EngineOptions::default();
    options.scheduler.max_elements_per_frame = 3;
    let mut sim = Simulation::new(laid_out(&paragraphs(10)), options);
    sim.start().expect("start should succeed");
    sim.run_until_idle();
    assert_eq!(sim.engine.stats().transformed, 10);
    assert_eq!(sim.engine.stats().frames, 4);
}

#[test]
fn common_words_follow_configuration() {
    let markup = "<body><p id=\"p\">The people said the same thing.</p></body>";
    let plain = started(markup);
    assert_eq!(bold_count(&plain.doc), 0);

    let overrides = ConfigOverrides {
        bold_common_words: Some(true),
        ..ConfigOverrides::default()
    };
    let options = EngineOptions::default()
        .with_overrides(&overrides)
        .expect("overrides should apply");
    let mut sim = Simulation::new(laid_out(markup), options);
    sim.start().expect("start should succeed");
    sim.run_until_idle();
    // "said" is a single-syllable word outside the vocabulary.
    assert_eq!(bold_count(&sim.doc), 5);
    let p = by_id(&sim.doc, "p");
    assert_eq!(
        readify::tree::text_content(&sim.doc, p),
        "The people said the same thing."
    );
}

#[test]
fn nested_inline_text_is_rewritten_with_its_container() {
    let sim = started(
        "<body><p id=\"p\">Reading <em>carefully</em> matters, <code>not_this</code> remains.</p></body>",
    );
    let p = by_id(&sim.doc, "p");
    assert_eq!(sim.engine.mark(p), Mark::Processed);
    assert_eq!(sim.engine.stats().transformed, 1);
    // Code text is left alone.
    assert_eq!(sim.engine.stats().text_nodes_rewritten, 4);
    assert!(sim.doc.to_markup_of(p).contains("<code>not_this</code>"));
    assert_eq!(
        readify::tree::text_content(&sim.doc, p),
        "Reading carefully matters, not_this remains."
    );
}

#[cfg(feature = "json")]
#[test]
fn json_overrides_merge_into_engine_options() {
    let overrides = ConfigOverrides::from_json(
        r#"{"boldCommonWords": true, "boldFactor": 1.2, "commonWords": ["readify"]}"#,
    )
    .expect("overrides should parse");
    let options = EngineOptions::default()
        .with_overrides(&overrides)
        .expect("overrides should apply");
    assert!(options.bionic.bold_common_words);
    assert!(options.bionic.common_words.contains("readify"));

    let mut sim = Simulation::new(
        laid_out("<body><p id=\"p\">Use the tool.</p></body>"),
        options,
    );
    sim.start().expect("start should succeed");
    sim.run_until_idle();
    let p = by_id(&sim.doc, "p");
    assert!(sim.doc.to_markup_of(p).contains("<readify-span class=\"readify-bold\">th</readify-span>e"));

    let rejected = ConfigOverrides::from_json(r#"{"boldFactor": -1}"#)
        .expect("overrides should parse");
    assert!(EngineOptions::default().with_overrides(&rejected).is_err());
}

#[test]
fn hidden_descendant_text_is_emphasized_with_its_container() {
    let mut sim = started(
        "<body><p id=\"p\">Intro reading text <span id=\"more\" hidden>Expanded information details</span></p></body>",
    );
    let more = by_id(&sim.doc, "more");
    assert_eq!(sim.engine.mark(by_id(&sim.doc, "p")), Mark::Processed);
    assert!(has_emphasis(&sim.doc, more));

    sim.doc.remove_attribute(more, "hidden");
    sim.run_until_idle();
    assert!(has_emphasis(&sim.doc, more));
    assert_eq!(
        readify::tree::text_content(&sim.doc, more),
        "Expanded information details"
    );
    assert_eq!(sim.engine.stats().transformed, 1);
}

#[test]
fn lifting_an_ignore_attribute_triggers_a_rescan() {
    let mut sim = started(
        "<body><p id=\"p\" data-readify-ignore>Skipped reading text</p><p id=\"q\" translate=\"no\">Untranslated reading text</p></body>",
    );
    let p = by_id(&sim.doc, "p");
    let q = by_id(&sim.doc, "q");
    assert_eq!(sim.engine.stats().transformed, 0);

    sim.doc.remove_attribute(p, "data-readify-ignore");
    sim.doc.set_attribute(q, "translate", "yes");
    sim.run_until_idle();
    assert_eq!(sim.engine.mark(p), Mark::Processed);
    assert_eq!(sim.engine.mark(q), Mark::Processed);
    assert!(has_emphasis(&sim.doc, p));
    assert!(has_emphasis(&sim.doc, q));
}
