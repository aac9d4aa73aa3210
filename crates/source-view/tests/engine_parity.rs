//! The facade must behave the same over both engine variants for
//! engine-independent flows.

use source_view::{
    EditorFacade, GutterMarker, LineBufferEngine, LineContentMarker, LineEntry, RopeEngine,
    SearchOptions, TextEngine,
};
use std::rc::Rc;
use std::time::Instant;

fn numbered_lines(count: usize) -> String {
    (0..count).map(|i| format!("line {i}\n")).collect()
}

fn both_facades(text: &str) -> [EditorFacade; 2] {
    let mut rope = RopeEngine::new(text);
    rope.ingest_parse_progress(rope.len_chars());
    [
        EditorFacade::new(Box::new(rope)),
        EditorFacade::new(Box::new(LineBufferEngine::new(text, 120))),
    ]
}

#[test]
fn test_line_markers_match_across_engines() {
    let text = numbered_lines(100);
    let [mut rope_editor, mut line_editor] = both_facades(&text);

    for editor in [&mut rope_editor, &mut line_editor] {
        editor.set_viewport_height(Some(10));
        editor.scroll_viewport(40, Instant::now());
        editor
            .set_line_content_marker(
                LineContentMarker::new("paused")
                    .with_class("paused-line")
                    .with_lines(vec![LineEntry::new(42), LineEntry::new(90)]),
            )
            .unwrap();
    }

    let rope_decs: Vec<(usize, usize)> = rope_editor
        .decorations()
        .iter()
        .map(|d| (d.from, d.to))
        .collect();
    let line_decs: Vec<(usize, usize)> = line_editor
        .decorations()
        .iter()
        .map(|d| (d.from, d.to))
        .collect();
    assert_eq!(rope_decs, line_decs);
    assert_eq!(rope_decs.len(), 1);
}

#[test]
fn test_search_matches_agree_across_engines() {
    let text = "foo bar\nbaz foo\n";
    let [mut rope_editor, mut line_editor] = both_facades(text);

    for editor in [&mut rope_editor, &mut line_editor] {
        let count = editor
            .highlight_search_matches("foo", SearchOptions::default(), "cm-searching")
            .unwrap();
        assert_eq!(count, 2);
    }
    assert_eq!(rope_editor.search_cursors(), line_editor.search_cursors());
}

#[test]
fn test_gutter_markers_agree_across_engines() {
    let text = numbered_lines(50);
    let [mut rope_editor, mut line_editor] = both_facades(&text);

    for editor in [&mut rope_editor, &mut line_editor] {
        editor.set_viewport_height(Some(20));
        editor
            .set_line_gutter_markers(Some(vec![
                GutterMarker::new("fives", Rc::new(|line| (line % 5 == 0).then(String::new)))
                    .with_class("fifth"),
            ]))
            .unwrap();
    }

    assert_eq!(
        rope_editor.decoration_set().for_marker("fives"),
        line_editor.decoration_set().for_marker("fives"),
    );
}

#[test]
fn test_snapshots_do_not_cross_engines() {
    let text = numbered_lines(100);
    let mut rope = RopeEngine::new(&text);
    let mut line = LineBufferEngine::new(&text, 120);
    rope.set_viewport_height(Some(10));
    line.set_viewport_height(Some(10));

    assert!(rope.restore_scroll(&line.scroll_snapshot()).is_err());
    assert!(line.restore_scroll(&rope.scroll_snapshot()).is_err());
}
