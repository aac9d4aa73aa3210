//! Declarative marker rules and their registry.
//!
//! A marker describes where and how to visually annotate document content:
//!
//! - [`LineContentMarker`] — per-line classes or inline widgets
//! - [`PositionContentMarker`] — widgets or token classes at specific
//!   positions (e.g. column breakpoints, debug positions)
//! - [`GutterMarker`] — line-number gutter annotations driven by a
//!   per-line condition
//!
//! Markers are plain, context-free value objects keyed by a caller-supplied
//! id. They carry no reference to any view; the decoration builders receive
//! the viewport context as a parameter instead. Registries are pure: they
//! validate and store rules, and never touch decorations themselves.

use indexmap::IndexMap;
use std::fmt;
use std::rc::Rc;
use thiserror::Error;

/// Context handed to a widget factory when a widget is realized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetContext {
    /// Line the widget is anchored to.
    pub line: usize,
    /// Column for position-anchored widgets.
    pub column: Option<usize>,
    /// The marker-supplied value for this line, if any.
    pub value: Option<String>,
}

/// A headless description of the visual node a widget factory produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetNode {
    /// Element tag to create.
    pub element: String,
    /// Class applied to the element.
    pub class_name: String,
}

impl WidgetNode {
    /// Create a widget node description.
    pub fn new(element: impl Into<String>, class_name: impl Into<String>) -> Self {
        Self {
            element: element.into(),
            class_name: class_name.into(),
        }
    }

    /// Generic node used when a widget cannot be realized.
    pub fn fallback() -> Self {
        Self::new("span", "marker-fallback")
    }
}

/// Produces the visual node for a widget decoration, lazily at display time.
pub type WidgetFactory = Rc<dyn Fn(&WidgetContext) -> WidgetNode>;

/// Per-line predicate for gutter markers. `None` means "no marker on this
/// line"; `Some(result)` is passed through to the widget factory.
pub type GutterCondition = Rc<dyn Fn(usize) -> Option<String>>;

/// Marker validation errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MarkerError {
    /// The marker was registered without a unique identifier.
    #[error("marker has no unique identifier")]
    MissingId,
    /// A gutter marker was registered without a usable condition.
    #[error("the marker `condition` is not a valid function")]
    InvalidCondition,
}

/// One explicit line entry of a [`LineContentMarker`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineEntry {
    /// Line to mark.
    pub line: usize,
    /// Optional value handed to the widget factory.
    pub value: Option<String>,
}

impl LineEntry {
    /// Create a line entry without a value.
    pub fn new(line: usize) -> Self {
        Self { line, value: None }
    }

    /// Create a line entry carrying a value.
    pub fn with_value(line: usize, value: impl Into<String>) -> Self {
        Self {
            line,
            value: Some(value.into()),
        }
    }
}

/// A rule adding classes or inline widgets to editor lines.
#[derive(Clone)]
pub struct LineContentMarker {
    /// Unique caller-supplied identifier.
    pub id: String,
    /// Class to apply to each marked line.
    pub line_class_name: Option<String>,
    /// Explicit lines to mark; ignored when `mark_all_lines` is set.
    pub lines: Vec<LineEntry>,
    /// Mark every line currently in view instead of the explicit list.
    pub mark_all_lines: bool,
    /// Render the line widget as a block element.
    pub render_as_block: bool,
    /// Factory for an inline widget anchored at the line end.
    pub line_widget: Option<WidgetFactory>,
}

impl LineContentMarker {
    /// Create a marker with the given id and no effects.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            line_class_name: None,
            lines: Vec::new(),
            mark_all_lines: false,
            render_as_block: false,
            line_widget: None,
        }
    }

    /// Set the line class.
    pub fn with_class(mut self, class_name: impl Into<String>) -> Self {
        self.line_class_name = Some(class_name.into());
        self
    }

    /// Set the explicit line list.
    pub fn with_lines(mut self, lines: Vec<LineEntry>) -> Self {
        self.lines = lines;
        self
    }

    /// Mark every line currently in view.
    pub fn mark_all_lines(mut self) -> Self {
        self.mark_all_lines = true;
        self
    }

    /// Render the widget as a block element.
    pub fn render_as_block(mut self) -> Self {
        self.render_as_block = true;
        self
    }

    /// Set the line widget factory.
    pub fn with_widget(mut self, factory: WidgetFactory) -> Self {
        self.line_widget = Some(factory);
        self
    }
}

impl fmt::Debug for LineContentMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LineContentMarker")
            .field("id", &self.id)
            .field("line_class_name", &self.line_class_name)
            .field("lines", &self.lines)
            .field("mark_all_lines", &self.mark_all_lines)
            .field("render_as_block", &self.render_as_block)
            .field("line_widget", &self.line_widget.is_some())
            .finish()
    }
}

/// A position a [`PositionContentMarker`] anchors to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerPosition {
    /// A line/column coordinate, translated to an offset at build time.
    LineColumn {
        /// Zero-based line.
        line: usize,
        /// Zero-based column.
        column: usize,
    },
    /// A raw character-offset range (e.g. from a search cursor).
    Offsets {
        /// Range start offset.
        from: usize,
        /// Range end offset.
        to: usize,
    },
}

/// A rule decorating tokens or content at specific positions.
#[derive(Clone)]
pub struct PositionContentMarker {
    /// Unique caller-supplied identifier.
    pub id: String,
    /// Positions to decorate.
    pub positions: Vec<MarkerPosition>,
    /// Class applied to the token range at each position.
    pub position_class_name: Option<String>,
    /// Factory for a widget rendered at each position.
    pub position_widget: Option<WidgetFactory>,
}

impl PositionContentMarker {
    /// Create a marker with the given id and no effects.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            positions: Vec::new(),
            position_class_name: None,
            position_widget: None,
        }
    }

    /// Set the position list.
    pub fn with_positions(mut self, positions: Vec<MarkerPosition>) -> Self {
        self.positions = positions;
        self
    }

    /// Set the token class.
    pub fn with_class(mut self, class_name: impl Into<String>) -> Self {
        self.position_class_name = Some(class_name.into());
        self
    }

    /// Set the position widget factory.
    pub fn with_widget(mut self, factory: WidgetFactory) -> Self {
        self.position_widget = Some(factory);
        self
    }
}

impl fmt::Debug for PositionContentMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PositionContentMarker")
            .field("id", &self.id)
            .field("positions", &self.positions)
            .field("position_class_name", &self.position_class_name)
            .field("position_widget", &self.position_widget.is_some())
            .finish()
    }
}

/// A rule annotating the line-number gutter based on a per-line condition.
#[derive(Clone)]
pub struct GutterMarker {
    /// Unique caller-supplied identifier.
    pub id: String,
    /// Class applied to the gutter element of each qualifying line.
    pub line_class_name: Option<String>,
    /// Condition deciding, per line, whether the marker applies.
    ///
    /// Required; registering a gutter marker without one fails with
    /// [`MarkerError::InvalidCondition`].
    pub condition: Option<GutterCondition>,
    /// Factory for a gutter widget on each qualifying line.
    pub gutter_widget: Option<WidgetFactory>,
}

impl GutterMarker {
    /// Create a marker with the given id and condition.
    pub fn new(id: impl Into<String>, condition: GutterCondition) -> Self {
        Self {
            id: id.into(),
            line_class_name: None,
            condition: Some(condition),
            gutter_widget: None,
        }
    }

    /// Create a marker without a condition; registration will fail until
    /// one is provided.
    pub fn unconditioned(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            line_class_name: None,
            condition: None,
            gutter_widget: None,
        }
    }

    /// Set the gutter class.
    pub fn with_class(mut self, class_name: impl Into<String>) -> Self {
        self.line_class_name = Some(class_name.into());
        self
    }

    /// Set the gutter widget factory.
    pub fn with_widget(mut self, factory: WidgetFactory) -> Self {
        self.gutter_widget = Some(factory);
        self
    }
}

impl fmt::Debug for GutterMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GutterMarker")
            .field("id", &self.id)
            .field("line_class_name", &self.line_class_name)
            .field("condition", &self.condition.is_some())
            .field("gutter_widget", &self.gutter_widget.is_some())
            .finish()
    }
}

/// A marker rule that can be stored in a [`MarkerRegistry`].
pub trait MarkerRule {
    /// The marker's unique identifier.
    fn id(&self) -> &str;

    /// Validate the rule before registration.
    fn validate(&self) -> Result<(), MarkerError> {
        if self.id().is_empty() {
            return Err(MarkerError::MissingId);
        }
        Ok(())
    }
}

impl MarkerRule for LineContentMarker {
    fn id(&self) -> &str {
        &self.id
    }
}

impl MarkerRule for PositionContentMarker {
    fn id(&self) -> &str {
        &self.id
    }
}

impl MarkerRule for GutterMarker {
    fn id(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> Result<(), MarkerError> {
        if self.id.is_empty() {
            return Err(MarkerError::MissingId);
        }
        if self.condition.is_none() {
            return Err(MarkerError::InvalidCondition);
        }
        Ok(())
    }
}

/// An insertion-ordered store of marker rules keyed by id.
///
/// Re-registering an existing id replaces the rule in place, keeping its
/// position in the registration order.
#[derive(Debug)]
pub struct MarkerRegistry<M: MarkerRule> {
    markers: IndexMap<String, M>,
}

impl<M: MarkerRule> MarkerRegistry<M> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            markers: IndexMap::new(),
        }
    }

    /// Validate and store a marker, overwriting any prior marker under the
    /// same id.
    pub fn set(&mut self, marker: M) -> Result<(), MarkerError> {
        marker.validate()?;
        self.markers.insert(marker.id().to_string(), marker);
        Ok(())
    }

    /// Remove a marker. A no-op (returning `false`) if the id is absent.
    pub fn remove(&mut self, id: &str) -> bool {
        self.markers.shift_remove(id).is_some()
    }

    /// Look up a marker by id.
    pub fn get(&self, id: &str) -> Option<&M> {
        self.markers.get(id)
    }

    /// Registration index of a marker id.
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.markers.get_index_of(id)
    }

    /// All markers, in registration order.
    pub fn markers(&self) -> impl Iterator<Item = &M> {
        self.markers.values()
    }

    /// Number of registered markers.
    pub fn len(&self) -> usize {
        self.markers.len()
    }

    /// Returns `true` if no markers are registered.
    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    /// Remove all markers.
    pub fn clear(&mut self) {
        self.markers.clear();
    }
}

impl<M: MarkerRule> Default for MarkerRegistry<M> {
    fn default() -> Self {
        Self::new()
    }
}
