//! Thread-safe access to the canvas from outside the dispatcher thread

use serde::Serialize;

use super::state::{Canvas, PaintStats, SharedCanvas, ToolButton};
use crate::domain::{DisplayList, InstanceId, Point, ShapeRecord};
use crate::runtime::{DispatchError, Dispatcher};

/// Query API over placed shapes
///
/// Records carry the centre of each shape; `delete_shape` removes the first
/// instance equal by name and centre.
pub trait PaintApi {
    fn list_shapes(&self) -> Result<Vec<ShapeRecord>, DispatchError>;

    fn add_shape(&self, record: ShapeRecord) -> Result<InstanceId, DispatchError>;

    fn delete_shape(&self, record: ShapeRecord) -> Result<bool, DispatchError>;
}

/// A placed shape plus whether a live extension currently draws it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShapeView {
    pub id: InstanceId,
    #[serde(flatten)]
    pub record: ShapeRecord,
    pub live: bool,
}

/// Everything a front end needs for one frame
#[derive(Debug, Clone, Serialize)]
pub struct CanvasSnapshot {
    pub width: i32,
    pub height: i32,
    pub revision: u64,
    pub tools: Vec<ToolButton>,
    pub selected: Option<String>,
    pub shapes: Vec<ShapeView>,
    pub stats: PaintStats,
    pub display: DisplayList,
}

impl CanvasSnapshot {
    fn capture(canvas: &Canvas) -> Self {
        let mut display = DisplayList::new();
        let stats = canvas.paint(&mut display);
        let bounds = canvas.bounds();

        Self {
            width: bounds.width,
            height: bounds.height,
            revision: canvas.revision(),
            tools: canvas.tools().to_vec(),
            selected: canvas.selected_tool().map(str::to_string),
            shapes: canvas
                .list_instances()
                .iter()
                .map(|instance| ShapeView {
                    id: instance.id,
                    record: instance.to_record(),
                    live: canvas.lookup(&instance.name).is_live(),
                })
                .collect(),
            stats,
            display,
        }
    }
}

/// Cloneable handle that runs canvas operations on the dispatcher thread
#[derive(Clone)]
pub struct PaintClient {
    dispatcher: Dispatcher<SharedCanvas>,
}

impl PaintClient {
    pub fn new(dispatcher: Dispatcher<SharedCanvas>) -> Self {
        Self { dispatcher }
    }

    /// Runs `task` against the canvas on the dispatcher thread
    ///
    /// Fails with [`DispatchError::Busy`] when called from inside a task that
    /// already holds the canvas.
    fn with_canvas<R, F>(&self, task: F) -> Result<R, DispatchError>
    where
        R: Send + 'static,
        F: FnOnce(&mut Canvas) -> R + Send + 'static,
    {
        self.dispatcher.run_sync(move |cell: &SharedCanvas| {
            cell.try_borrow_mut()
                .map(|mut canvas| task(&mut *canvas))
                .map_err(|_| DispatchError::Busy)
        })?
    }

    pub fn select_tool(&self, name: &str) -> Result<(), DispatchError> {
        let name = name.to_string();
        self.with_canvas(move |canvas| canvas.select_tool(name))
    }

    pub fn selected_tool(&self) -> Result<Option<String>, DispatchError> {
        self.with_canvas(|canvas| canvas.selected_tool().map(str::to_string))
    }

    pub fn tools(&self) -> Result<Vec<ToolButton>, DispatchError> {
        self.with_canvas(|canvas| canvas.tools().to_vec())
    }

    /// Places the selected tool at `point`
    pub fn click(&self, point: Point) -> Result<Option<InstanceId>, DispatchError> {
        self.with_canvas(move |canvas| canvas.place_instance(point))
    }

    /// Starts dragging the shape under `point`, or places a new one when
    /// the point is empty
    pub fn press(&self, point: Point) -> Result<Option<InstanceId>, DispatchError> {
        self.with_canvas(move |canvas| {
            canvas
                .begin_drag(point)
                .or_else(|| canvas.place_instance(point))
        })
    }

    /// Moves the dragged shape, if any; returns whether one moved
    pub fn drag(&self, point: Point) -> Result<bool, DispatchError> {
        self.with_canvas(move |canvas| match canvas.dragging() {
            Some(id) => canvas.move_instance(id, point).is_ok(),
            None => false,
        })
    }

    pub fn release(&self, point: Point) -> Result<Option<InstanceId>, DispatchError> {
        self.with_canvas(move |canvas| canvas.end_drag(point))
    }

    pub fn revision(&self) -> Result<u64, DispatchError> {
        self.with_canvas(|canvas| canvas.revision())
    }

    /// Paints the canvas and captures it along with tool state
    pub fn snapshot(&self) -> Result<CanvasSnapshot, DispatchError> {
        self.with_canvas(|canvas| CanvasSnapshot::capture(canvas))
    }
}

impl PaintApi for PaintClient {
    fn list_shapes(&self) -> Result<Vec<ShapeRecord>, DispatchError> {
        self.with_canvas(|canvas| canvas.list_shapes())
    }

    fn add_shape(&self, record: ShapeRecord) -> Result<InstanceId, DispatchError> {
        self.with_canvas(move |canvas| canvas.add_shape(record))
    }

    fn delete_shape(&self, record: ShapeRecord) -> Result<bool, DispatchError> {
        self.with_canvas(move |canvas| canvas.delete_shape(&record))
    }
}
