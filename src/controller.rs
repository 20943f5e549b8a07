use crate::dlog;
use crate::inputs::{self, InputError};
use crate::ports::{
    LocationError, LocationProvider, MapView, MapWidget, MarkerId, Popup, ScheduledTask,
    Scheduler, TileLayer, ViewAnimation, WorkoutUi,
};
use crate::types::{Clock, Coords, IdSource, SystemClock, Workout, WorkoutId};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_ZOOM: u8 = 13;
pub const DEFAULT_FORM_RESTORE_DELAY: Duration = Duration::from_secs(1);
pub const DEFAULT_TILE_URL: &str = "https://{s}.tile.openstreetmap.fr/hot/{z}/{x}/{y}.png";
pub const DEFAULT_ATTRIBUTION: &str =
    "&copy; <a href=\"https://www.openstreetmap.org/copyright\">OpenStreetMap</a> contributors";

pub const VALIDATION_NOTICE: &str = "Inputs have to be positive numbers!";

#[derive(Debug, Clone, PartialEq)]
pub struct ControllerConfig {
    pub default_zoom: u8,
    /// Delay before the form layout is restored after a submission hides it.
    pub form_restore_delay: Duration,
    pub tile_layer: TileLayer,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            default_zoom: DEFAULT_ZOOM,
            form_restore_delay: DEFAULT_FORM_RESTORE_DELAY,
            tile_layer: TileLayer {
                url_template: DEFAULT_TILE_URL.to_string(),
                attribution: DEFAULT_ATTRIBUTION.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    AwaitingLocation,
    MapReady,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ControllerError {
    #[error("location was already requested for this session")]
    AlreadyStarted,
    #[error("could not get your position: {0}")]
    LocationUnavailable(#[from] LocationError),
    #[error("no map click is pending; click the map before submitting")]
    NoPendingClick,
    #[error("validation failed: {0}")]
    Validation(#[from] InputError),
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    position: usize,
    marker: MarkerId,
}

/// Owns the logged workouts and drives the map and form collaborators.
pub struct WorkoutController<M, U, S> {
    config: ControllerConfig,
    map: M,
    ui: U,
    scheduler: S,
    clock: Box<dyn Clock>,
    ids: IdSource,

    phase: Phase,
    location_requested: bool,
    form_visible: bool,
    pending_click: Option<Coords>,

    workouts: Vec<Workout>,
    index: HashMap<WorkoutId, Entry>,
}

impl<M, U, S> WorkoutController<M, U, S>
where
    M: MapWidget,
    U: WorkoutUi,
    S: Scheduler,
{
    pub fn new(config: ControllerConfig, map: M, ui: U, scheduler: S) -> Self {
        Self::with_clock(config, map, ui, scheduler, Box::new(SystemClock))
    }

    pub fn with_clock(
        config: ControllerConfig,
        map: M,
        ui: U,
        scheduler: S,
        clock: Box<dyn Clock>,
    ) -> Self {
        Self {
            config,
            map,
            ui,
            scheduler,
            clock,
            ids: IdSource::default(),
            phase: Phase::AwaitingLocation,
            location_requested: false,
            form_visible: false,
            pending_click: None,
            workouts: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Asks for the current position once and loads the map around it.
    ///
    /// On failure the controller stays in [`Phase::AwaitingLocation`] for
    /// good; there is no retry.
    pub fn start(&mut self, location: &mut dyn LocationProvider) -> Result<Coords, ControllerError> {
        if self.location_requested {
            return Err(ControllerError::AlreadyStarted);
        }
        self.location_requested = true;

        match location.current_position() {
            Ok(coords) => {
                self.load_map(coords);
                Ok(coords)
            }
            Err(e) => {
                tracing::warn!(err = %e, "could not get your position; map stays unavailable");
                Err(e.into())
            }
        }
    }

    fn load_map(&mut self, center: Coords) {
        let view = MapView {
            center,
            zoom: self.config.default_zoom,
        };
        self.map.create(&view);
        self.map.add_base_layer(&self.config.tile_layer);
        let here = self.map.place_marker(center);
        self.map.attach_popup(here, &Popup::your_location());
        self.map.listen_for_clicks();
        self.phase = Phase::MapReady;
        tracing::info!(%center, zoom = view.zoom, "map ready");
    }

    /// Returns `false` when the click was ignored because no map is loaded.
    pub fn handle_map_click(&mut self, at: Coords) -> bool {
        if self.phase != Phase::MapReady {
            dlog!("map_click_ignored phase={:?} at={at}", self.phase);
            return false;
        }

        self.pending_click = Some(at);
        self.form_visible = true;
        self.ui.show_form();
        self.ui.focus_distance();
        dlog!("map_click at={at}");
        true
    }

    pub fn handle_kind_change(&mut self) {
        let raw = self.ui.read_form();
        match raw.get(inputs::FieldId::Type).parse() {
            Ok(kind) => self.ui.show_rows_for(kind),
            Err(other) => tracing::warn!(kind = %other, "unknown workout type selected"),
        }
    }

    /// Validates the form and logs a new workout at the pending click.
    pub fn submit(&mut self) -> Result<WorkoutId, ControllerError> {
        let Some(coords) = self.pending_click.filter(|_| self.form_visible) else {
            tracing::warn!("submit without a pending map click");
            return Err(ControllerError::NoPendingClick);
        };

        let raw = self.ui.read_form();
        let built = inputs::validate(&raw)
            .and_then(|input| input.into_workout(coords, &mut self.ids, self.clock.as_ref()));
        let workout = match built {
            Ok(w) => w,
            Err(e) => {
                tracing::info!(err = %e, "rejected workout input");
                self.ui.alert(VALIDATION_NOTICE);
                return Err(e.into());
            }
        };

        let id = workout.id();
        let marker = self.map.place_marker(coords);
        self.map.attach_popup(marker, &Popup::for_workout(&workout));
        self.ui.render_workout(&workout);

        tracing::info!(
            id = %id,
            kind = %workout.kind(),
            distance = workout.distance(),
            duration = workout.duration(),
            metric = workout.metric(),
            "workout logged"
        );

        self.index.insert(
            id,
            Entry {
                position: self.workouts.len(),
                marker,
            },
        );
        self.workouts.push(workout);
        self.pending_click = None;
        self.hide_form();

        Ok(id)
    }

    fn hide_form(&mut self) {
        self.ui.clear_fields();
        self.ui.hide_form();
        self.form_visible = false;
        self.scheduler.schedule(
            self.config.form_restore_delay,
            ScheduledTask::RestoreFormLayout,
        );
    }

    /// Pans the map to the workout behind a clicked list entry.
    ///
    /// `None` (click outside any entry) and unknown ids are ignored.
    pub fn handle_list_click(&mut self, entry: Option<WorkoutId>) -> Option<&Workout> {
        let id = entry?;
        let Some(position) = self.index.get(&id).map(|e| e.position) else {
            dlog!("list_click_stale id={id}");
            return None;
        };

        let workout = &self.workouts[position];
        self.map.set_view(
            workout.coords(),
            self.config.default_zoom,
            ViewAnimation::default(),
        );
        Some(workout)
    }

    pub fn run_scheduled(&mut self, task: ScheduledTask) {
        match task {
            ScheduledTask::RestoreFormLayout => self.ui.restore_form_layout(),
        }
    }

    pub const fn phase(&self) -> Phase {
        self.phase
    }

    pub const fn is_form_visible(&self) -> bool {
        self.form_visible
    }

    pub const fn pending_click(&self) -> Option<Coords> {
        self.pending_click
    }

    pub fn workouts(&self) -> &[Workout] {
        &self.workouts
    }

    pub fn workout(&self, id: WorkoutId) -> Option<&Workout> {
        self.index.get(&id).map(|e| &self.workouts[e.position])
    }

    pub fn marker_for(&self, id: WorkoutId) -> Option<MarkerId> {
        self.index.get(&id).map(|e| e.marker)
    }

    pub const fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub const fn map(&self) -> &M {
        &self.map
    }

    pub const fn ui(&self) -> &U {
        &self.ui
    }

    pub const fn ui_mut(&mut self) -> &mut U {
        &mut self.ui
    }

    pub const fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }
}
