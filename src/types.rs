use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coords {
    pub lat: f64,
    pub lng: f64,
}

impl Coords {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

impl fmt::Display for Coords {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.5},{:.5}", self.lat, self.lng)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkoutKind {
    Running,
    Cycling,
}

impl WorkoutKind {
    pub const ALL: [Self; 2] = [Self::Running, Self::Cycling];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Running => "Running",
            Self::Cycling => "Cycling",
        }
    }

    pub const fn icon(self) -> &'static str {
        match self {
            Self::Running => "🏃‍♂️",
            Self::Cycling => "🚴‍♀️",
        }
    }

    /// Lowercase tag used for popup and list-entry classes.
    pub const fn css_class(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Cycling => "cycling",
        }
    }
}

impl fmt::Display for WorkoutKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for WorkoutKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|k| k.css_class().eq_ignore_ascii_case(s))
            .ok_or_else(|| s.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct WorkoutId(pub u64);

impl fmt::Display for WorkoutId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Hands out identifiers derived from the clock's milliseconds.
///
/// Never returns a value at or below the previous one, so two records
/// created within the same millisecond still get distinct ids.
#[derive(Debug, Default)]
pub struct IdSource {
    last: Option<u64>,
}

impl IdSource {
    pub fn next(&mut self, at: DateTime<Utc>) -> WorkoutId {
        let ms = u64::try_from(at.timestamp_millis()).unwrap_or(0);
        let id = match self.last {
            Some(last) if ms <= last => last.saturating_add(1),
            _ => ms,
        };
        self.last = Some(id);
        WorkoutId(id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum WorkoutDetails {
    /// `pace` in min/km.
    Running { cadence: f64, pace: f64 },
    /// `speed` in km/h.
    Cycling { elevation_gain: f64, speed: f64 },
}

/// A logged workout. Distance is in km, duration in minutes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Workout {
    id: WorkoutId,
    created_at: DateTime<Utc>,
    coords: Coords,
    distance: f64,
    duration: f64,
    #[serde(flatten)]
    details: WorkoutDetails,
    description: String,
}

impl Workout {
    /// Callers must pass positive `distance`, `duration` and `cadence`.
    pub fn running(
        ids: &mut IdSource,
        clock: &dyn Clock,
        coords: Coords,
        distance: f64,
        duration: f64,
        cadence: f64,
    ) -> Self {
        debug_assert!(cadence > 0.0, "cadence must be positive");
        let pace = duration / distance;
        Self::build(
            ids,
            clock,
            coords,
            distance,
            duration,
            WorkoutDetails::Running { cadence, pace },
        )
    }

    /// Callers must pass positive `distance` and `duration`; `elevation_gain` may be negative.
    pub fn cycling(
        ids: &mut IdSource,
        clock: &dyn Clock,
        coords: Coords,
        distance: f64,
        duration: f64,
        elevation_gain: f64,
    ) -> Self {
        let speed = distance / (duration / 60.0);
        Self::build(
            ids,
            clock,
            coords,
            distance,
            duration,
            WorkoutDetails::Cycling {
                elevation_gain,
                speed,
            },
        )
    }

    fn build(
        ids: &mut IdSource,
        clock: &dyn Clock,
        coords: Coords,
        distance: f64,
        duration: f64,
        details: WorkoutDetails,
    ) -> Self {
        debug_assert!(distance > 0.0 && duration > 0.0);
        let created_at = clock.now();
        let id = ids.next(created_at);
        let kind = match details {
            WorkoutDetails::Running { .. } => WorkoutKind::Running,
            WorkoutDetails::Cycling { .. } => WorkoutKind::Cycling,
        };
        let description = format!("{} on {}", kind.name(), created_at.format("%B %-d"));

        Self {
            id,
            created_at,
            coords,
            distance,
            duration,
            details,
            description,
        }
    }

    pub const fn id(&self) -> WorkoutId {
        self.id
    }

    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub const fn coords(&self) -> Coords {
        self.coords
    }

    pub const fn distance(&self) -> f64 {
        self.distance
    }

    pub const fn duration(&self) -> f64 {
        self.duration
    }

    pub const fn details(&self) -> &WorkoutDetails {
        &self.details
    }

    pub const fn kind(&self) -> WorkoutKind {
        match self.details {
            WorkoutDetails::Running { .. } => WorkoutKind::Running,
            WorkoutDetails::Cycling { .. } => WorkoutKind::Cycling,
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Pace for running, speed for cycling.
    pub const fn metric(&self) -> f64 {
        match self.details {
            WorkoutDetails::Running { pace, .. } => pace,
            WorkoutDetails::Cycling { speed, .. } => speed,
        }
    }

    pub fn metric_rows(&self) -> Vec<MetricRow> {
        let mut rows = vec![
            MetricRow::new(self.kind().icon(), format_amount(self.distance), "km"),
            MetricRow::new("⏱", format_amount(self.duration), "min"),
        ];
        match self.details {
            WorkoutDetails::Running { cadence, pace } => {
                rows.push(MetricRow::new("⚡️", format!("{pace:.1}"), "min/km"));
                rows.push(MetricRow::new("🦶🏼", format_amount(cadence), "spm"));
            }
            WorkoutDetails::Cycling {
                elevation_gain,
                speed,
            } => {
                rows.push(MetricRow::new("⚡️", format!("{speed:.1}"), "km/h"));
                rows.push(MetricRow::new("⛰", format_amount(elevation_gain), "m"));
            }
        }
        rows
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricRow {
    pub icon: &'static str,
    pub value: String,
    pub unit: &'static str,
}

impl MetricRow {
    fn new(icon: &'static str, value: String, unit: &'static str) -> Self {
        Self { icon, value, unit }
    }
}

impl fmt::Display for MetricRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.icon, self.value, self.unit)
    }
}

/// Whole numbers print without a fraction, everything else as entered.
fn format_amount(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{v:.0}")
    } else {
        v.to_string()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;

    pub struct FixedClock(pub DateTime<Utc>);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    pub fn april_14() -> FixedClock {
        FixedClock(Utc.with_ymd_and_hms(2026, 4, 14, 9, 30, 0).unwrap())
    }

    const HOME: Coords = Coords::new(48.8566, 2.3522);

    #[test]
    fn running_pace_is_duration_over_distance() {
        let mut ids = IdSource::default();
        let w = Workout::running(&mut ids, &april_14(), HOME, 5.0, 30.0, 180.0);
        assert_eq!(w.kind(), WorkoutKind::Running);
        assert_eq!(
            w.details(),
            &WorkoutDetails::Running {
                cadence: 180.0,
                pace: 6.0
            }
        );
        assert_eq!(w.description(), "Running on April 14");
    }

    #[test]
    fn cycling_speed_is_km_per_hour() {
        let mut ids = IdSource::default();
        let w = Workout::cycling(&mut ids, &april_14(), HOME, 10.0, 40.0, -150.0);
        assert_eq!(w.metric(), 15.0);
        assert!(w.description().starts_with("Cycling on "));
        assert_eq!(w.coords(), HOME);
    }

    #[test]
    fn ids_stay_unique_within_one_millisecond() {
        let clock = april_14();
        let mut ids = IdSource::default();
        let a = ids.next(clock.now());
        let b = ids.next(clock.now());
        let c = ids.next(clock.now() - chrono::Duration::seconds(5));
        assert_eq!(a.0, u64::try_from(clock.now().timestamp_millis()).unwrap());
        assert!(a < b && b < c);
    }

    #[test]
    fn kind_parses_case_insensitively() {
        assert_eq!("Running".parse::<WorkoutKind>(), Ok(WorkoutKind::Running));
        assert_eq!(" cycling ".parse::<WorkoutKind>(), Ok(WorkoutKind::Cycling));
        assert!("swimming".parse::<WorkoutKind>().is_err());
    }

    #[test]
    fn metric_rows_format_one_decimal() {
        let mut ids = IdSource::default();
        let w = Workout::running(&mut ids, &april_14(), HOME, 3.0, 20.0, 172.5);
        let rows: Vec<String> = w.metric_rows().iter().map(ToString::to_string).collect();
        assert_eq!(rows, ["🏃‍♂️ 3 km", "⏱ 20 min", "⚡️ 6.7 min/km", "🦶🏼 172.5 spm"]);
    }

    #[test]
    fn serializes_with_kind_tag() {
        let mut ids = IdSource::default();
        let w = Workout::cycling(&mut ids, &april_14(), HOME, 10.0, 40.0, 150.0);
        let v = serde_json::to_value(&w).unwrap();
        assert_eq!(v["kind"], "cycling");
        assert_eq!(v["speed"], 15.0);
        assert_eq!(v["description"], "Cycling on April 14");
    }
}
