use crate::game::note::Column;
use crate::ui::color;
use log::{debug, info, warn};
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MarkerId(pub u64);

/// The rendering collaborator: colored circular markers in four fixed columns.
pub trait RenderSurface {
    fn create_marker(&mut self, column: Column, rgba: [f32; 4]) -> MarkerId;
    fn move_marker(&mut self, id: MarkerId, y_px: f64);
    fn remove_marker(&mut self, id: MarkerId);
    fn show_score(&mut self, score: u32);
    fn show_end_screen(&mut self, final_score: u32);
}

pub type SharedSurface = Rc<RefCell<dyn RenderSurface>>;

/// A live marker. Dropping it removes the visual, whichever way its owner exits.
pub struct Marker {
    id: MarkerId,
    column: Column,
    surface: SharedSurface,
}

impl Marker {
    pub fn spawn(surface: &SharedSurface, column: Column) -> Self {
        let id = surface
            .borrow_mut()
            .create_marker(column, color::column_color(column));
        Self {
            id,
            column,
            surface: Rc::clone(surface),
        }
    }

    pub const fn id(&self) -> MarkerId {
        self.id
    }

    pub fn set_y(&self, y_px: f64) {
        self.surface.borrow_mut().move_marker(self.id, y_px);
    }
}

impl Drop for Marker {
    fn drop(&mut self) {
        match self.surface.try_borrow_mut() {
            Ok(mut s) => s.remove_marker(self.id),
            Err(_) => warn!("Render surface busy; marker {:?} leaked", self.id),
        }
    }
}

impl std::fmt::Debug for Marker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Marker")
            .field("id", &self.id)
            .field("column", &self.column)
            .finish()
    }
}

/// Surface with no window behind it; tracks marker count and logs state changes.
#[derive(Debug, Default)]
pub struct LoggingSurface {
    next_id: u64,
    live: usize,
    pub last_score: u32,
    pub ended: bool,
}

impl LoggingSurface {
    pub const fn live_markers(&self) -> usize {
        self.live
    }
}

impl RenderSurface for LoggingSurface {
    fn create_marker(&mut self, column: Column, _rgba: [f32; 4]) -> MarkerId {
        let id = MarkerId(self.next_id);
        self.next_id += 1;
        self.live += 1;
        debug!("marker {} spawned in {} column", id.0, color::column_color_name(column));
        id
    }

    fn move_marker(&mut self, _id: MarkerId, _y_px: f64) {}

    fn remove_marker(&mut self, id: MarkerId) {
        self.live = self.live.saturating_sub(1);
        debug!("marker {} removed", id.0);
    }

    fn show_score(&mut self, score: u32) {
        self.last_score = score;
        debug!("score: {score}");
    }

    fn show_end_screen(&mut self, final_score: u32) {
        self.ended = true;
        info!("Game over. Final score: {final_score}");
    }
}
