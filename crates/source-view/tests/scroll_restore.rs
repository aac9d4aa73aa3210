use source_view::{DocumentId, EditorFacade, RopeEngine, TextEngine};
use std::time::{Duration, Instant};

fn facade_over(text: &str) -> EditorFacade {
    let mut engine = RopeEngine::new(text);
    engine.ingest_parse_progress(engine.len_chars());
    EditorFacade::new(Box::new(engine))
}

fn numbered_lines(count: usize) -> String {
    (0..count).map(|i| format!("line {i}\n")).collect()
}

fn visible_top(editor: &EditorFacade) -> usize {
    let viewport = editor.viewport();
    let mut offset = 0;
    for line in 0..editor.line_count() {
        if offset == viewport.from {
            return line;
        }
        offset += editor.line_text(line).map_or(0, |t| t.chars().count()) + 1;
    }
    0
}

#[test]
fn test_scroll_position_survives_document_swap() {
    let doc_a = numbered_lines(1000);
    let doc_b = "a different document\n".to_string();
    let mut editor = facade_over("");
    editor.set_viewport_height(Some(20));

    editor.set_text(&doc_a, Some(DocumentId::from("a")));
    let start = Instant::now();
    editor.scroll_viewport(500, start);
    editor.tick(start + Duration::from_millis(300));

    editor.set_text(&doc_b, Some(DocumentId::from("b")));
    assert_eq!(visible_top(&editor), 0);

    editor.set_text(&doc_a, Some(DocumentId::from("a")));
    assert_eq!(visible_top(&editor), 500);
}

#[test]
fn test_unknown_document_starts_at_top() {
    let mut editor = facade_over("");
    editor.set_viewport_height(Some(20));

    editor.set_text(&numbered_lines(1000), Some(DocumentId::from("fresh")));
    assert_eq!(visible_top(&editor), 0);
}

#[test]
fn test_stale_snapshot_falls_back_to_top() {
    let doc_v1 = numbered_lines(1000);
    let mut doc_v2 = numbered_lines(1000);
    doc_v2.push_str("appended\n");

    let mut editor = facade_over("");
    editor.set_viewport_height(Some(20));

    editor.set_text(&doc_v1, Some(DocumentId::from("doc")));
    let start = Instant::now();
    editor.scroll_viewport(500, start);
    editor.tick(start + Duration::from_millis(300));

    editor.set_text("interlude\n", Some(DocumentId::from("other")));

    // Same document id, changed content: the snapshot no longer applies.
    editor.set_text(&doc_v2, Some(DocumentId::from("doc")));
    assert_eq!(visible_top(&editor), 0);
}

#[test]
fn test_scroll_burst_captures_one_final_snapshot() {
    let doc = numbered_lines(1000);
    let mut editor = facade_over("");
    editor.set_viewport_height(Some(20));
    editor.set_text(&doc, Some(DocumentId::from("doc")));

    let start = Instant::now();
    editor.scroll_viewport(100, start);
    editor.scroll_viewport(200, start + Duration::from_millis(100));
    editor.scroll_viewport(300, start + Duration::from_millis(200));

    // Still inside the burst: the first deadlines were pushed back.
    editor.tick(start + Duration::from_millis(300));
    editor.set_text("x\n", Some(DocumentId::from("other")));
    editor.set_text(&doc, Some(DocumentId::from("doc")));
    assert_eq!(visible_top(&editor), 0);

    // Settle the burst and snapshot the final position.
    editor.scroll_viewport(300, start);
    editor.tick(start + Duration::from_millis(260));
    editor.set_text("x\n", Some(DocumentId::from("other")));
    editor.set_text(&doc, Some(DocumentId::from("doc")));
    assert_eq!(visible_top(&editor), 300);
}

#[test]
fn test_scroll_to_origin_and_to_offscreen_position() {
    let mut editor = facade_over(&numbered_lines(200));
    editor.set_viewport_height(Some(10));

    editor.scroll_to(100, 0);
    let top = visible_top(&editor);
    // Centered on the target line.
    assert!(top <= 100 && 100 < top + 10);

    editor.scroll_to(0, 0);
    assert_eq!(visible_top(&editor), 0);
}

#[test]
fn test_scroll_to_visible_position_does_not_move() {
    let mut editor = facade_over(&numbered_lines(200));
    editor.set_viewport_height(Some(10));
    editor.scroll_viewport(50, Instant::now());

    editor.scroll_to(55, 3);
    assert_eq!(visible_top(&editor), 50);
}
