//! Line-oriented terminal front-end: stand-ins for the map widget and the
//! form surface, plus a command-script driver.
//!
//! Script commands, one per line (`#` starts a comment):
//!
//! ```text
//! click LAT LNG        click the map
//! type running|cycling pick the workout type
//! set FIELD VALUE      fill a form field (distance, duration, cadence, elevation)
//! submit               submit the form
//! select N             click the N-th list entry (1-based)
//! wait SECS            let time pass, firing scheduled callbacks
//! list                 print every logged workout
//! ```

use crate::controller::{ControllerConfig, ControllerError, WorkoutController};
use crate::dlog;
use crate::inputs::{FieldId, RawForm};
use crate::ports::{
    FormSurface, LocationError, LocationProvider, MapView, MapWidget, MarkerId, Notifier, Popup,
    ScheduledTask, Scheduler, TileLayer, ViewAnimation, WorkoutListView,
};
use crate::types::{Clock, Coords, Workout, WorkoutId, WorkoutKind};
use anyhow::{Context, Result, bail};
use std::cell::RefCell;
use std::io::{BufRead, Write};
use std::rc::Rc;
use std::time::Duration;

/// Output lines shared between the adapters of one session.
#[derive(Debug, Clone, Default)]
pub struct Transcript(Rc<RefCell<Vec<String>>>);

impl Transcript {
    pub fn push(&self, line: impl Into<String>) {
        self.0.borrow_mut().push(line.into());
    }

    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.0.borrow_mut())
    }
}

pub struct FixedLocation(Option<Coords>);

impl FixedLocation {
    pub const fn new(coords: Option<Coords>) -> Self {
        Self(coords)
    }
}

impl LocationProvider for FixedLocation {
    fn current_position(&mut self) -> Result<Coords, LocationError> {
        self.0.take().ok_or(LocationError::Unsupported)
    }
}

pub struct TerminalMap {
    out: Transcript,
    listening: bool,
    markers: Vec<Coords>,
}

impl TerminalMap {
    pub const fn new(out: Transcript) -> Self {
        Self {
            out,
            listening: false,
            markers: Vec::new(),
        }
    }

    pub const fn is_listening(&self) -> bool {
        self.listening
    }

    pub fn markers(&self) -> &[Coords] {
        &self.markers
    }
}

impl MapWidget for TerminalMap {
    fn create(&mut self, view: &MapView) {
        self.out
            .push(format!("map centered at {} zoom {}", view.center, view.zoom));
    }

    fn add_base_layer(&mut self, tiles: &TileLayer) {
        dlog!("tiles url={} attribution={}", tiles.url_template, tiles.attribution);
        self.out.push(format!("tiles {}", tiles.url_template));
    }

    fn listen_for_clicks(&mut self) {
        self.listening = true;
    }

    fn place_marker(&mut self, at: Coords) -> MarkerId {
        self.markers.push(at);
        let id = MarkerId(self.markers.len());
        self.out.push(format!("marker #{} at {at}", id.0));
        id
    }

    fn attach_popup(&mut self, marker: MarkerId, popup: &Popup) {
        let class = &popup.options.class_name;
        let tag = if class.is_empty() {
            String::new()
        } else {
            format!(" [{class}]")
        };
        dlog!("popup marker={} open={}", marker.0, popup.options.open_on_attach);
        self.out
            .push(format!("popup #{}{tag}: {}", marker.0, popup.content));
    }

    fn set_view(&mut self, center: Coords, zoom: u8, animation: ViewAnimation) {
        dlog!(
            "set_view animate={} pan_ms={}",
            animation.animate,
            animation.pan_duration.as_millis()
        );
        self.out.push(format!("view moved to {center} zoom {zoom}"));
    }
}

pub struct TerminalUi {
    out: Transcript,
    form: RawForm,
    visible: bool,
    layout_hidden: bool,
    rows_for: WorkoutKind,
    entries: Vec<WorkoutId>,
}

impl TerminalUi {
    pub fn new(out: Transcript) -> Self {
        Self {
            out,
            form: RawForm::new(WorkoutKind::Running),
            visible: false,
            layout_hidden: false,
            rows_for: WorkoutKind::Running,
            entries: Vec::new(),
        }
    }

    pub fn set_field(&mut self, field: FieldId, value: &str) {
        self.form.set(field, value);
    }

    /// Resolves a 1-based list position to the entry's workout, if any.
    pub fn entry_at(&self, n: usize) -> Option<WorkoutId> {
        n.checked_sub(1).and_then(|i| self.entries.get(i)).copied()
    }

    pub const fn is_visible(&self) -> bool {
        self.visible
    }

    pub const fn is_layout_hidden(&self) -> bool {
        self.layout_hidden
    }

    pub const fn rows_for(&self) -> WorkoutKind {
        self.rows_for
    }
}

impl FormSurface for TerminalUi {
    fn read_form(&self) -> RawForm {
        self.form.clone()
    }

    fn clear_fields(&mut self) {
        self.form.clear_values();
    }

    fn show_form(&mut self) {
        self.visible = true;
        self.out.push("form open");
    }

    fn hide_form(&mut self) {
        self.visible = false;
        self.layout_hidden = true;
        self.out.push("form closed");
    }

    fn restore_form_layout(&mut self) {
        self.layout_hidden = false;
        dlog!("form layout restored");
    }

    fn focus_distance(&mut self) {
        dlog!("focus field=distance");
    }

    fn show_rows_for(&mut self, kind: WorkoutKind) {
        self.rows_for = kind;
        let shown = match kind {
            WorkoutKind::Running => FieldId::Cadence,
            WorkoutKind::Cycling => FieldId::Elevation,
        };
        self.out.push(format!("form shows {shown}"));
    }
}

impl WorkoutListView for TerminalUi {
    fn render_workout(&mut self, workout: &Workout) {
        self.entries.push(workout.id());
        self.out.push(format!(
            "{}. {}",
            self.entries.len(),
            format_entry(workout)
        ));
    }
}

impl Notifier for TerminalUi {
    fn alert(&mut self, message: &str) {
        self.out.push(format!("! {message}"));
    }
}

pub fn format_entry(workout: &Workout) -> String {
    let rows: Vec<String> = workout.metric_rows().iter().map(ToString::to_string).collect();
    format!("{}  {}", workout.description(), rows.join("  "))
}

/// Holds callbacks until a virtual clock passes their deadline.
#[derive(Debug, Default)]
pub struct QueueScheduler {
    now: Duration,
    queue: Vec<(Duration, ScheduledTask)>,
}

impl QueueScheduler {
    /// Moves the clock forward and returns the tasks that became due, in
    /// deadline order.
    pub fn advance(&mut self, by: Duration) -> Vec<ScheduledTask> {
        self.now += by;
        let now = self.now;
        let (mut due, rest): (Vec<_>, Vec<_>) =
            self.queue.drain(..).partition(|(at, _)| *at <= now);
        self.queue = rest;
        due.sort_by_key(|(at, _)| *at);
        due.into_iter().map(|(_, task)| task).collect()
    }

    pub fn drain(&mut self) -> Vec<ScheduledTask> {
        let mut all = std::mem::take(&mut self.queue);
        all.sort_by_key(|(at, _)| *at);
        all.into_iter().map(|(_, task)| task).collect()
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}

impl Scheduler for QueueScheduler {
    fn schedule(&mut self, delay: Duration, task: ScheduledTask) {
        self.queue.push((self.now + delay, task));
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Click(Coords),
    Type(WorkoutKind),
    Set(FieldId, String),
    Submit,
    Select(usize),
    Wait(Duration),
    List,
}

impl Command {
    /// `Ok(None)` for blank lines and comments.
    pub fn parse(line: &str) -> Result<Option<Self>> {
        let line = line.split('#').next().unwrap_or("").trim();
        let mut parts = line.split_whitespace();
        let Some(verb) = parts.next() else {
            return Ok(None);
        };
        let args: Vec<&str> = parts.collect();

        let cmd = match (verb.to_ascii_lowercase().as_str(), args.as_slice()) {
            ("click", [lat, lng]) => {
                let lat: f64 = lat.parse().with_context(|| format!("bad latitude: {lat}"))?;
                let lng: f64 = lng.parse().with_context(|| format!("bad longitude: {lng}"))?;
                Self::Click(Coords::new(lat, lng))
            }
            ("type", [kind]) => Self::Type(
                kind.parse()
                    .map_err(|k| anyhow::anyhow!("unknown workout type: {k}"))?,
            ),
            ("set", [field, rest @ ..]) if rest.len() <= 1 => {
                let field: FieldId = field
                    .parse()
                    .map_err(|f| anyhow::anyhow!("unknown field: {f}"))?;
                if field == FieldId::Type {
                    bail!("use `type` to pick the workout type");
                }
                Self::Set(field, rest.first().map_or_else(String::new, |v| (*v).to_string()))
            }
            ("submit", []) => Self::Submit,
            ("select", [n]) => Self::Select(n.parse().with_context(|| format!("bad entry: {n}"))?),
            ("wait", [secs]) => {
                let secs: f64 = secs.parse().with_context(|| format!("bad seconds: {secs}"))?;
                Self::Wait(
                    Duration::try_from_secs_f64(secs)
                        .with_context(|| format!("bad seconds: {secs}"))?,
                )
            }
            ("list", []) => Self::List,
            _ => bail!("unrecognized command: {line}"),
        };
        Ok(Some(cmd))
    }
}

/// One interactive session: a controller wired to terminal adapters.
pub struct Session {
    controller: WorkoutController<TerminalMap, TerminalUi, QueueScheduler>,
    out: Transcript,
}

impl Session {
    pub fn new(config: ControllerConfig) -> Self {
        let out = Transcript::default();
        let controller = WorkoutController::new(
            config,
            TerminalMap::new(out.clone()),
            TerminalUi::new(out.clone()),
            QueueScheduler::default(),
        );
        Self { controller, out }
    }

    pub fn with_clock(config: ControllerConfig, clock: Box<dyn Clock>) -> Self {
        let out = Transcript::default();
        let controller = WorkoutController::with_clock(
            config,
            TerminalMap::new(out.clone()),
            TerminalUi::new(out.clone()),
            QueueScheduler::default(),
            clock,
        );
        Self { controller, out }
    }

    /// A failed lookup is reported in the transcript, not returned.
    pub fn start(&mut self, location: &mut dyn LocationProvider) {
        if let Err(e) = self.controller.start(location) {
            self.out.push(format!("! {e}"));
        }
    }

    pub fn execute(&mut self, cmd: Command) {
        match cmd {
            Command::Click(at) => {
                if !self.controller.handle_map_click(at) {
                    self.out.push("! map is not available");
                }
            }
            Command::Type(kind) => {
                self.controller
                    .ui_mut()
                    .set_field(FieldId::Type, kind.css_class());
                self.controller.handle_kind_change();
            }
            Command::Set(field, value) => self.controller.ui_mut().set_field(field, &value),
            Command::Submit => match self.controller.submit() {
                Ok(id) => {
                    dlog!("submitted id={id}");
                }
                Err(ControllerError::Validation(e)) => {
                    dlog!("submit_rejected err={e}");
                }
                Err(e) => self.out.push(format!("! {e}")),
            },
            Command::Select(n) => {
                let entry = self.controller.ui().entry_at(n);
                if self.controller.handle_list_click(entry).is_none() {
                    dlog!("select_ignored n={n}");
                }
            }
            Command::Wait(by) => {
                for task in self.controller.scheduler_mut().advance(by) {
                    self.controller.run_scheduled(task);
                }
            }
            Command::List => {
                let lines: Vec<String> = self
                    .controller
                    .workouts()
                    .iter()
                    .enumerate()
                    .map(|(i, w)| format!("{}. {}", i + 1, format_entry(w)))
                    .collect();
                if lines.is_empty() {
                    self.out.push("no workouts yet");
                }
                for line in lines {
                    self.out.push(line);
                }
            }
        }
    }

    /// Fires every callback still waiting on the scheduler.
    pub fn finish(&mut self) {
        for task in self.controller.scheduler_mut().drain() {
            self.controller.run_scheduled(task);
        }
    }

    pub fn take_output(&self) -> Vec<String> {
        self.out.take()
    }

    pub fn workouts(&self) -> &[Workout] {
        self.controller.workouts()
    }

    pub const fn controller(&self) -> &WorkoutController<TerminalMap, TerminalUi, QueueScheduler> {
        &self.controller
    }
}

/// Runs `reader` line by line against `session`, writing the transcript
/// to `out` as it goes. Stops at the first malformed line.
pub fn run_script<R: BufRead, W: Write>(session: &mut Session, reader: R, out: &mut W) -> Result<()> {
    flush(session, out)?;

    for (i, line) in reader.lines().enumerate() {
        let line = line.context("reading script")?;
        let cmd = Command::parse(&line).with_context(|| format!("line {}", i + 1))?;
        if let Some(cmd) = cmd {
            dlog!("cmd line={} {cmd:?}", i + 1);
            session.execute(cmd);
        }
        flush(session, out)?;
    }

    session.finish();
    flush(session, out)
}

fn flush<W: Write>(session: &Session, out: &mut W) -> Result<()> {
    for line in session.take_output() {
        writeln!(out, "{line}").context("writing output")?;
    }
    Ok(())
}
