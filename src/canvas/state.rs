//! Canvas and tool state, owned by the dispatcher thread

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::domain::{InstanceId, PlacedInstance, Point, Rect, ShapeRecord, Surface};
use crate::extension::{ExtensionProxy, Icon, Placeholder, Rendered};

/// The canvas as held by its dispatcher thread
///
/// Tasks get `&SharedCanvas`; a task running inline inside another one sees
/// the same cell.
pub type SharedCanvas = RefCell<Canvas>;

/// Side of the box given to a newly placed shape
pub const DEFAULT_SHAPE_SIZE: i32 = 54;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CanvasError {
    #[error("Instance {0} is not being dragged")]
    NotDragging(InstanceId),

    #[error("No placed instance {0}")]
    UnknownInstance(InstanceId),
}

/// One toolbar control
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolButton {
    pub name: String,
    pub icon: Icon,
}

/// Result of one paint pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PaintStats {
    pub shapes: usize,
    pub placeholders: usize,
}

struct Entry {
    icon: Icon,
    proxy: Arc<ExtensionProxy>,
}

pub struct Canvas {
    bounds: Rect,
    shape_size: i32,
    extensions: HashMap<String, Entry>,
    toolbar: Vec<ToolButton>,
    selected: Option<String>,
    /// Front of the draw order first
    instances: Vec<PlacedInstance>,
    dragging: Option<InstanceId>,
    next_id: u64,
    placeholder: Arc<ExtensionProxy>,
    revision: u64,
}

impl Canvas {
    pub fn new(width: i32, height: i32, shape_size: i32, placeholder: Arc<Placeholder>) -> Self {
        Self {
            bounds: Rect::new(0, 0, width, height),
            shape_size,
            extensions: HashMap::new(),
            toolbar: Vec::new(),
            selected: None,
            instances: Vec::new(),
            dragging: None,
            next_id: 1,
            placeholder: Arc::new(ExtensionProxy::placeholder_only(placeholder)),
            revision: 0,
        }
    }

    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    pub fn shape_size(&self) -> i32 {
        self.shape_size
    }

    /// Bumped on every visible change; front ends repaint when it moves
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn tools(&self) -> &[ToolButton] {
        &self.toolbar
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.toolbar.iter().map(|b| b.name.clone()).collect()
    }

    pub fn selected_tool(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Selects `name`, known or not; placing with an unknown tool draws
    /// the placeholder
    pub fn select_tool(&mut self, name: impl Into<String>) {
        self.selected = Some(name.into());
        self.touch();
    }

    /// The proxy registered under `name`, or the shared placeholder proxy
    pub fn lookup(&self, name: &str) -> Arc<ExtensionProxy> {
        self.extensions
            .get(name)
            .map(|entry| Arc::clone(&entry.proxy))
            .unwrap_or_else(|| Arc::clone(&self.placeholder))
    }

    pub fn placeholder(&self) -> &Arc<ExtensionProxy> {
        &self.placeholder
    }

    /// Adds an extension and its toolbar control, returning any proxy it
    /// displaced. The first extension installed becomes the selection.
    pub fn install_extension(
        &mut self,
        name: String,
        icon: Icon,
        proxy: Arc<ExtensionProxy>,
    ) -> Option<Arc<ExtensionProxy>> {
        let stale = self.extensions.insert(
            name.clone(),
            Entry {
                icon: icon.clone(),
                proxy,
            },
        );
        if stale.is_some() {
            self.toolbar.retain(|b| b.name != name);
        }
        self.toolbar.push(ToolButton {
            name: name.clone(),
            icon,
        });
        if self.selected.is_none() {
            self.selected = Some(name);
        }
        self.touch();
        stale.map(|entry| entry.proxy)
    }

    /// Swaps the proxy behind `name` in place, keeping toolbar position and
    /// selection. Installs when `name` is unknown.
    pub fn replace_extension(
        &mut self,
        name: String,
        icon: Icon,
        proxy: Arc<ExtensionProxy>,
    ) -> Option<Arc<ExtensionProxy>> {
        let Some(entry) = self.extensions.get_mut(&name) else {
            return self.install_extension(name, icon, proxy);
        };

        let previous = std::mem::replace(&mut entry.proxy, proxy);
        entry.icon = icon.clone();
        if let Some(button) = self.toolbar.iter_mut().find(|b| b.name == name) {
            button.icon = icon;
        }
        self.touch();
        Some(previous)
    }

    /// Removes an extension and its control. Placed instances stay.
    pub fn uninstall_extension(&mut self, name: &str) -> Option<Arc<ExtensionProxy>> {
        let entry = self.extensions.remove(name)?;
        self.toolbar.retain(|b| b.name != name);

        if self.selected.as_deref() == Some(name) {
            self.selected = self.toolbar.first().map(|b| b.name.clone());
            debug!(
                removed = name,
                selected = ?self.selected,
                "Selected tool removed"
            );
        }
        self.touch();
        Some(entry.proxy)
    }

    /// Drops every extension and toolbar control, returning their proxies
    pub fn clear_extensions(&mut self) -> Vec<Arc<ExtensionProxy>> {
        let proxies: Vec<Arc<ExtensionProxy>> =
            self.extensions.drain().map(|(_, entry)| entry.proxy).collect();
        self.toolbar.clear();
        self.selected = None;
        self.touch();
        proxies
    }

    /// Places the selected tool centred on `point`, in front of everything
    ///
    /// Does nothing without a selection or outside the canvas.
    pub fn place_instance(&mut self, point: Point) -> Option<InstanceId> {
        let name = self.selected.clone()?;
        if !self.bounds.contains(point) {
            return None;
        }
        Some(self.push_instance(name, point))
    }

    /// Topmost instance whose box contains `point`
    pub fn instance_at(&self, point: Point) -> Option<InstanceId> {
        self.instances
            .iter()
            .find(|i| i.bounds.contains(point))
            .map(|i| i.id)
    }

    pub fn instance(&self, id: InstanceId) -> Option<&PlacedInstance> {
        self.instances.iter().find(|i| i.id == id)
    }

    pub fn begin_drag(&mut self, point: Point) -> Option<InstanceId> {
        let id = self.instance_at(point)?;
        self.dragging = Some(id);
        Some(id)
    }

    pub fn dragging(&self) -> Option<InstanceId> {
        self.dragging
    }

    /// Recentres the instance being dragged on `point`
    pub fn move_instance(&mut self, id: InstanceId, point: Point) -> Result<(), CanvasError> {
        if self.dragging != Some(id) {
            return Err(CanvasError::NotDragging(id));
        }
        let instance = self
            .instances
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or(CanvasError::UnknownInstance(id))?;
        instance.bounds.recenter(point);
        self.touch();
        Ok(())
    }

    /// Drops the dragged instance at `point`
    pub fn end_drag(&mut self, point: Point) -> Option<InstanceId> {
        let id = self.dragging.take()?;
        if let Some(instance) = self.instances.iter_mut().find(|i| i.id == id) {
            instance.bounds.recenter(point);
            self.touch();
        }
        Some(id)
    }

    pub fn list_instances(&self) -> &[PlacedInstance] {
        &self.instances
    }

    pub fn list_shapes(&self) -> Vec<ShapeRecord> {
        self.instances.iter().map(PlacedInstance::to_record).collect()
    }

    /// Places `record.name` at the record's centre, bypassing the selection
    pub fn add_shape(&mut self, record: ShapeRecord) -> InstanceId {
        let center = record.center();
        self.push_instance(record.name, center)
    }

    /// Removes the first instance equal to `record` by name and centre
    pub fn delete_shape(&mut self, record: &ShapeRecord) -> bool {
        let Some(index) = self.instances.iter().position(|i| i.to_record() == *record) else {
            return false;
        };
        let removed = self.instances.remove(index);
        if self.dragging == Some(removed.id) {
            self.dragging = None;
        }
        self.touch();
        true
    }

    /// Draws every instance back to front
    pub fn paint(&self, surface: &mut dyn Surface) -> PaintStats {
        let mut stats = PaintStats::default();
        for instance in self.instances.iter().rev() {
            match self.lookup(&instance.name).draw(surface, instance.anchor()) {
                Rendered::Shape => stats.shapes += 1,
                Rendered::Placeholder => stats.placeholders += 1,
            }
        }
        stats
    }

    fn push_instance(&mut self, name: String, center: Point) -> InstanceId {
        let id = InstanceId(self.next_id);
        self.next_id += 1;
        self.instances.insert(
            0,
            PlacedInstance {
                id,
                name,
                bounds: Rect::centered_on(center, self.shape_size),
            },
        );
        self.touch();
        id
    }

    fn touch(&mut self) {
        self.revision += 1;
    }
}

impl std::fmt::Debug for Canvas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Canvas")
            .field("bounds", &self.bounds)
            .field("toolbar", &self.tool_names())
            .field("selected", &self.selected)
            .field("instances", &self.instances.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Color, DisplayList, Primitive};
    use crate::extension::Drawable;

    fn canvas() -> Canvas {
        Canvas::new(400, 400, DEFAULT_SHAPE_SIZE, Arc::new(Placeholder::new(None, 54)))
    }

    fn proxy() -> Arc<ExtensionProxy> {
        let dot: Arc<dyn Drawable> = Arc::new(|surface: &mut dyn Surface, anchor: Point| {
            surface.draw(Primitive::Circle {
                center: anchor,
                radius: 2,
                color: Color::Green,
            });
            Ok(())
        });
        Arc::new(ExtensionProxy::new(
            dot,
            Arc::new(Placeholder::new(None, 54)),
        ))
    }

    fn install(canvas: &mut Canvas, name: &str) -> Arc<ExtensionProxy> {
        let proxy = proxy();
        canvas.install_extension(name.to_string(), Icon::new(name), Arc::clone(&proxy));
        proxy
    }

    #[test]
    fn place_without_selection_is_noop() {
        let mut canvas = canvas();
        assert_eq!(canvas.place_instance(Point::new(10, 10)), None);
        assert!(canvas.list_instances().is_empty());
    }

    #[test]
    fn place_outside_bounds_is_noop() {
        let mut canvas = canvas();
        install(&mut canvas, "Circle");
        assert_eq!(canvas.place_instance(Point::new(400, 10)), None);
        assert_eq!(canvas.place_instance(Point::new(-1, 10)), None);
        assert!(canvas.list_instances().is_empty());
    }

    #[test]
    fn newest_instance_is_in_front() {
        let mut canvas = canvas();
        install(&mut canvas, "Circle");
        let first = canvas.place_instance(Point::new(50, 50)).unwrap();
        let second = canvas.place_instance(Point::new(60, 60)).unwrap();

        let ids: Vec<InstanceId> = canvas.list_instances().iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![second, first]);
        assert_eq!(canvas.instance_at(Point::new(55, 55)), Some(second));
        assert_eq!(
            canvas.instance(first).unwrap().bounds,
            Rect::new(23, 23, 54, 54)
        );
    }

    #[test]
    fn uninstall_selected_moves_selection_to_first_tool() {
        let mut canvas = canvas();
        install(&mut canvas, "Circle");
        install(&mut canvas, "Square");
        install(&mut canvas, "Triangle");
        canvas.select_tool("Triangle");

        canvas.uninstall_extension("Triangle");
        assert_eq!(canvas.selected_tool(), Some("Circle"));

        canvas.uninstall_extension("Circle");
        canvas.uninstall_extension("Square");
        assert_eq!(canvas.selected_tool(), None);
        assert!(canvas.tools().is_empty());
    }

    #[test]
    fn uninstall_keeps_instances_and_falls_back_to_placeholder() {
        let mut canvas = canvas();
        install(&mut canvas, "Circle");
        canvas.place_instance(Point::new(50, 50));

        canvas.uninstall_extension("Circle");

        assert_eq!(canvas.list_instances().len(), 1);
        assert!(Arc::ptr_eq(&canvas.lookup("Circle"), canvas.placeholder()));
        let mut list = DisplayList::new();
        assert_eq!(
            canvas.paint(&mut list),
            PaintStats {
                shapes: 0,
                placeholders: 1
            }
        );
    }

    #[test]
    fn reinstall_removes_stale_control() {
        let mut canvas = canvas();
        install(&mut canvas, "Circle");
        install(&mut canvas, "Square");
        let stale = canvas.lookup("Circle");

        let displaced = canvas.install_extension("Circle".to_string(), Icon::new("o"), proxy());

        assert!(Arc::ptr_eq(&displaced.unwrap(), &stale));
        assert_eq!(canvas.tool_names(), vec!["Square", "Circle"]);
    }

    #[test]
    fn replace_keeps_position() {
        let mut canvas = canvas();
        install(&mut canvas, "Circle");
        install(&mut canvas, "Square");

        canvas.replace_extension("Circle".to_string(), Icon::new("O"), proxy());

        assert_eq!(canvas.tool_names(), vec!["Circle", "Square"]);
        assert_eq!(canvas.tools()[0].icon, Icon::new("O"));
        assert_eq!(canvas.selected_tool(), Some("Circle"));
    }

    #[test]
    fn move_requires_active_drag() {
        let mut canvas = canvas();
        install(&mut canvas, "Circle");
        let id = canvas.place_instance(Point::new(50, 50)).unwrap();

        assert_eq!(
            canvas.move_instance(id, Point::new(80, 80)),
            Err(CanvasError::NotDragging(id))
        );

        assert_eq!(canvas.begin_drag(Point::new(40, 40)), Some(id));
        canvas.move_instance(id, Point::new(80, 80)).unwrap();
        assert_eq!(canvas.end_drag(Point::new(100, 90)), Some(id));

        assert_eq!(canvas.instance(id).unwrap().anchor(), Point::new(100, 90));
        assert_eq!(canvas.dragging(), None);
    }

    #[test]
    fn delete_shape_matches_name_and_centre() {
        let mut canvas = canvas();
        canvas.add_shape(ShapeRecord::at("Circle", 50, 50));
        canvas.add_shape(ShapeRecord::at("Circle", 50, 50));
        canvas.add_shape(ShapeRecord::at("Square", 50, 50));

        assert!(!canvas.delete_shape(&ShapeRecord::at("Circle", 51, 50)));
        assert!(canvas.delete_shape(&ShapeRecord::at("Circle", 50, 50)));

        let names: Vec<String> = canvas.list_shapes().into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["Square", "Circle"]);
    }

    #[test]
    fn paint_draws_back_to_front() {
        let mut canvas = canvas();
        install(&mut canvas, "Circle");
        canvas.place_instance(Point::new(10, 10));
        canvas.place_instance(Point::new(90, 90));

        let mut list = DisplayList::new();
        let stats = canvas.paint(&mut list);

        assert_eq!(stats.shapes, 2);
        assert!(matches!(
            list.primitives()[1],
            Primitive::Circle { center, .. } if center == Point::new(90, 90)
        ));
    }

    #[test]
    fn clear_extensions_keeps_instances() {
        let mut canvas = canvas();
        install(&mut canvas, "Circle");
        install(&mut canvas, "Square");
        canvas.place_instance(Point::new(50, 50));

        assert_eq!(canvas.clear_extensions().len(), 2);
        assert!(canvas.tools().is_empty());
        assert_eq!(canvas.selected_tool(), None);
        assert_eq!(canvas.list_instances().len(), 1);
    }
}
