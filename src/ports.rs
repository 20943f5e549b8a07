//! Interfaces to the map widget, the form/list surface, location lookup
//! and deferred callbacks. The controller only talks to these.

use crate::inputs::RawForm;
use crate::types::{Coords, Workout, WorkoutKind};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq)]
pub struct MapView {
    pub center: Coords,
    pub zoom: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileLayer {
    pub url_template: String,
    pub attribution: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MarkerId(pub usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopupOptions {
    pub max_width: u32,
    pub min_width: u32,
    pub auto_close: bool,
    pub close_on_click: bool,
    pub class_name: String,
    /// Open the popup as soon as it is attached.
    pub open_on_attach: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Popup {
    pub content: String,
    pub options: PopupOptions,
}

impl Popup {
    pub fn for_workout(workout: &Workout) -> Self {
        let kind = workout.kind();
        Self {
            content: format!("{} {}", kind.icon(), workout.description()),
            options: PopupOptions {
                max_width: 250,
                min_width: 100,
                auto_close: false,
                close_on_click: false,
                class_name: format!("{}-popup", kind.css_class()),
                open_on_attach: true,
            },
        }
    }

    /// Marks where the session's position lookup put the user.
    pub fn your_location() -> Self {
        Self {
            content: "Your location".to_string(),
            options: PopupOptions {
                max_width: 300,
                min_width: 50,
                auto_close: true,
                close_on_click: true,
                class_name: String::new(),
                open_on_attach: true,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewAnimation {
    pub animate: bool,
    pub pan_duration: Duration,
}

impl Default for ViewAnimation {
    fn default() -> Self {
        Self {
            animate: true,
            pan_duration: Duration::from_secs(1),
        }
    }
}

pub trait MapWidget {
    fn create(&mut self, view: &MapView);
    fn add_base_layer(&mut self, tiles: &TileLayer);
    /// Start forwarding clicks to the controller.
    fn listen_for_clicks(&mut self);
    fn place_marker(&mut self, at: Coords) -> MarkerId;
    fn attach_popup(&mut self, marker: MarkerId, popup: &Popup);
    fn set_view(&mut self, center: Coords, zoom: u8, animation: ViewAnimation);
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LocationError {
    #[error("location permission denied")]
    Denied,
    #[error("location is not supported here")]
    Unsupported,
}

pub trait LocationProvider {
    fn current_position(&mut self) -> Result<Coords, LocationError>;
}

/// The workout form: field access plus show/hide toggles.
pub trait FormSurface {
    fn read_form(&self) -> RawForm;
    fn clear_fields(&mut self);
    fn show_form(&mut self);
    /// Hide without the slide transition.
    fn hide_form(&mut self);
    /// Put the form's layout back after [`FormSurface::hide_form`].
    fn restore_form_layout(&mut self);
    fn focus_distance(&mut self);
    /// Show the cadence row for running, the elevation row for cycling.
    fn show_rows_for(&mut self, kind: WorkoutKind);
}

pub trait WorkoutListView {
    fn render_workout(&mut self, workout: &Workout);
}

pub trait Notifier {
    fn alert(&mut self, message: &str);
}

pub trait WorkoutUi: FormSurface + WorkoutListView + Notifier {}

impl<T: FormSurface + WorkoutListView + Notifier> WorkoutUi for T {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduledTask {
    RestoreFormLayout,
}

pub trait Scheduler {
    fn schedule(&mut self, delay: Duration, task: ScheduledTask);
}
