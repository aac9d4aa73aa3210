use source_view::{
    DecorationEffect, EditorFacade, LineContentMarker, LineEntry, MarkerError, MarkerPosition,
    PositionContentMarker, RopeEngine, TextEngine, WidgetNode,
};
use std::rc::Rc;

fn facade_over(text: &str) -> EditorFacade {
    let mut engine = RopeEngine::new(text);
    engine.ingest_parse_progress(engine.len_chars());
    EditorFacade::new(Box::new(engine))
}

fn numbered_lines(count: usize) -> String {
    (0..count).map(|i| format!("line {i}\n")).collect()
}

#[test]
fn test_marker_yields_decorations_inside_viewport_only() {
    let mut editor = facade_over(&numbered_lines(100));
    editor.set_viewport_height(Some(10));
    editor.scroll_viewport(40, std::time::Instant::now());

    editor
        .set_line_content_marker(
            LineContentMarker::new("paused")
                .with_class("paused-line")
                .with_lines(vec![
                    LineEntry::new(5),
                    LineEntry::new(42),
                    LineEntry::new(45),
                    LineEntry::new(90),
                ]),
        )
        .unwrap();

    let decorations = editor.decorations();
    assert_eq!(decorations.len(), 2);
    for decoration in &decorations {
        assert!(decoration.from >= editor.viewport().from);
        assert!(decoration.to <= editor.viewport().to);
    }
}

#[test]
fn test_scrolling_recomputes_marker_decorations() {
    let mut editor = facade_over(&numbered_lines(100));
    editor.set_viewport_height(Some(10));

    editor
        .set_line_content_marker(
            LineContentMarker::new("paused")
                .with_class("paused-line")
                .with_lines(vec![LineEntry::new(42)]),
        )
        .unwrap();
    assert!(editor.decorations().is_empty());

    editor.scroll_viewport(40, std::time::Instant::now());
    assert_eq!(editor.decorations().len(), 1);

    editor.scroll_viewport(0, std::time::Instant::now());
    assert!(editor.decorations().is_empty());
}

#[test]
fn test_replacing_marker_swaps_decorations_atomically() {
    let mut editor = facade_over(&numbered_lines(20));

    editor
        .set_line_content_marker(
            LineContentMarker::new("hl")
                .with_class("old")
                .with_lines(vec![LineEntry::new(1), LineEntry::new(2)]),
        )
        .unwrap();
    assert_eq!(editor.decoration_set().for_marker("hl").len(), 2);

    editor
        .set_line_content_marker(
            LineContentMarker::new("hl")
                .with_class("new")
                .with_lines(vec![LineEntry::new(7)]),
        )
        .unwrap();

    let decorations = editor.decoration_set().for_marker("hl");
    assert_eq!(decorations.len(), 1);
    assert_eq!(
        decorations[0].effect,
        DecorationEffect::LineClass("new".to_string())
    );
}

#[test]
fn test_equal_offset_decorations_keep_registration_order() {
    let mut editor = facade_over(&numbered_lines(10));

    editor
        .set_line_content_marker(
            LineContentMarker::new("first")
                .with_class("a")
                .with_lines(vec![LineEntry::new(3)]),
        )
        .unwrap();
    editor
        .set_line_content_marker(
            LineContentMarker::new("second")
                .with_class("b")
                .with_lines(vec![LineEntry::new(3)]),
        )
        .unwrap();
    // Updating the earlier marker must not change its rank.
    editor
        .set_line_content_marker(
            LineContentMarker::new("first")
                .with_class("a2")
                .with_lines(vec![LineEntry::new(3)]),
        )
        .unwrap();

    let ids: Vec<&str> = editor
        .decorations()
        .iter()
        .map(|d| d.marker_id.as_str())
        .collect();
    assert_eq!(ids, vec!["first", "second"]);
}

#[test]
fn test_remove_marker_restores_prior_decoration_state() {
    let mut editor = facade_over(&numbered_lines(10));
    let before = editor.decoration_set().clone();

    editor
        .set_line_content_marker(
            LineContentMarker::new("temp")
                .with_class("x")
                .with_lines(vec![LineEntry::new(0)]),
        )
        .unwrap();
    editor.remove_line_content_marker("temp");

    assert_eq!(editor.decoration_set(), &before);
    // Removing again is a no-op.
    editor.remove_line_content_marker("temp");
    assert_eq!(editor.decoration_set(), &before);
}

#[test]
fn test_marker_without_id_is_rejected() {
    let mut editor = facade_over("text\n");
    let err = editor
        .set_line_content_marker(LineContentMarker::new("").with_class("x"))
        .unwrap_err();
    assert_eq!(err, MarkerError::MissingId);
}

#[test]
fn test_line_widget_realizes_with_value() {
    let mut editor = facade_over(&numbered_lines(5));
    editor
        .set_line_content_marker(
            LineContentMarker::new("inline-preview")
                .with_lines(vec![LineEntry::with_value(2, "x = 3")])
                .with_widget(Rc::new(|ctx| {
                    assert_eq!(ctx.value.as_deref(), Some("x = 3"));
                    WidgetNode::new("span", "preview")
                })),
        )
        .unwrap();

    let widgets = editor.widgets();
    assert_eq!(widgets.len(), 1);
    assert_eq!(widgets[0].class_name, "preview");
}

#[test]
fn test_position_marker_offsets_require_full_containment() {
    let mut editor = facade_over(&numbered_lines(100));
    editor.set_viewport_height(Some(10));
    let viewport = editor.viewport();

    editor
        .set_position_content_marker(
            PositionContentMarker::new("exception")
                .with_class("exception-position")
                .with_positions(vec![
                    MarkerPosition::Offsets {
                        from: viewport.from + 1,
                        to: viewport.from + 4,
                    },
                    // Straddles the viewport end; must not contribute.
                    MarkerPosition::Offsets {
                        from: viewport.to - 1,
                        to: viewport.to + 5,
                    },
                ]),
        )
        .unwrap();

    assert_eq!(editor.decorations().len(), 1);
    assert_eq!(editor.decorations()[0].from, viewport.from + 1);
}

#[test]
fn test_edit_triggers_full_decoration_rebuild() {
    let mut editor = facade_over("alpha\nbeta\ngamma\n");
    editor
        .set_line_content_marker(
            LineContentMarker::new("hl")
                .with_class("x")
                .with_lines(vec![LineEntry::new(2)]),
        )
        .unwrap();
    assert_eq!(editor.decorations()[0].from, "alpha\nbeta\n".chars().count());

    // Line markers are line-indexed: after inserting a line above, line 2
    // is a different line and the decoration follows it.
    editor.apply(source_view::Transaction::change(0, 0, "inserted\n"));
    editor.ingest_parse_progress(editor.text().chars().count());

    assert_eq!(
        editor.decorations()[0].from,
        "inserted\nalpha\n".chars().count()
    );
}
