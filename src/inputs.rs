//! Declarative form-field table and the generic format/validate pipeline
//! that turns raw form values into a [`Workout`].

use crate::dlog;
use crate::types::{Clock, Coords, IdSource, Workout, WorkoutKind};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FieldId {
    Type,
    Distance,
    Duration,
    Cadence,
    Elevation,
}

impl FieldId {
    pub const ALL: [Self; 5] = [
        Self::Type,
        Self::Distance,
        Self::Duration,
        Self::Cadence,
        Self::Elevation,
    ];

    /// Name of the field on the form surface.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Type => "type",
            Self::Distance => "distance",
            Self::Duration => "duration",
            Self::Cadence => "cadence",
            Self::Elevation => "elevation",
        }
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FieldId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|f| f.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| s.to_string())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct InputSpec {
    pub field: FieldId,
    pub convert_to_number: bool,
    pub must_be_positive: bool,
    /// `None` means the field applies to every kind.
    pub applies_to: Option<&'static [WorkoutKind]>,
}

impl InputSpec {
    pub fn applies(&self, kind: WorkoutKind) -> bool {
        self.applies_to.is_none_or(|kinds| kinds.contains(&kind))
    }
}

pub const INPUT_SPECS: &[InputSpec] = &[
    InputSpec {
        field: FieldId::Distance,
        convert_to_number: true,
        must_be_positive: true,
        applies_to: None,
    },
    InputSpec {
        field: FieldId::Duration,
        convert_to_number: true,
        must_be_positive: true,
        applies_to: None,
    },
    InputSpec {
        field: FieldId::Cadence,
        convert_to_number: true,
        must_be_positive: true,
        applies_to: Some(&[WorkoutKind::Running]),
    },
    InputSpec {
        field: FieldId::Elevation,
        convert_to_number: true,
        must_be_positive: false,
        applies_to: Some(&[WorkoutKind::Cycling]),
    },
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InputError {
    #[error("unknown workout type: {0:?}")]
    UnknownKind(String),
    #[error(
        "invalid fields: {}",
        .fields.iter().map(|f| f.name()).collect::<Vec<_>>().join(", ")
    )]
    Invalid { fields: Vec<FieldId> },
}

/// Raw string values as read from the form surface.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawForm {
    values: BTreeMap<FieldId, String>,
}

impl RawForm {
    pub fn new(kind: WorkoutKind) -> Self {
        Self::default().with(FieldId::Type, kind.css_class())
    }

    #[must_use]
    pub fn with(mut self, field: FieldId, value: impl Into<String>) -> Self {
        self.set(field, value);
        self
    }

    pub fn set(&mut self, field: FieldId, value: impl Into<String>) {
        self.values.insert(field, value.into());
    }

    /// Unset fields read as empty, like a blank input.
    pub fn get(&self, field: FieldId) -> &str {
        self.values.get(&field).map_or("", String::as_str)
    }

    /// Blanks every field except the type selector.
    pub fn clear_values(&mut self) {
        self.values.retain(|f, _| *f == FieldId::Type);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Number(f64),
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckedField {
    pub value: FieldValue,
    pub is_valid: bool,
}

/// Form input after formatting and validation, restricted to the fields
/// that apply to the selected kind.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedInput {
    kind: WorkoutKind,
    fields: BTreeMap<FieldId, CheckedField>,
}

impl ValidatedInput {
    pub const fn kind(&self) -> WorkoutKind {
        self.kind
    }

    pub const fn fields(&self) -> &BTreeMap<FieldId, CheckedField> {
        &self.fields
    }

    pub fn is_valid(&self) -> bool {
        self.fields.values().all(|f| f.is_valid)
    }

    pub fn invalid_fields(&self) -> Vec<FieldId> {
        self.fields
            .iter()
            .filter(|(_, f)| !f.is_valid)
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn number(&self, field: FieldId) -> Option<f64> {
        match self.fields.get(&field)?.value {
            FieldValue::Number(n) => Some(n),
            FieldValue::Text(_) => None,
        }
    }

    pub fn into_workout(
        self,
        coords: Coords,
        ids: &mut IdSource,
        clock: &dyn Clock,
    ) -> Result<Workout, InputError> {
        let fields = self.invalid_fields();
        if !fields.is_empty() {
            return Err(InputError::Invalid { fields });
        }

        // `validate` inserts every field that applies to the kind.
        let need = |field| self.number(field).unwrap_or(f64::NAN);
        let distance = need(FieldId::Distance);
        let duration = need(FieldId::Duration);

        Ok(match self.kind {
            WorkoutKind::Running => Workout::running(
                ids,
                clock,
                coords,
                distance,
                duration,
                need(FieldId::Cadence),
            ),
            WorkoutKind::Cycling => Workout::cycling(
                ids,
                clock,
                coords,
                distance,
                duration,
                need(FieldId::Elevation),
            ),
        })
    }
}

/// Coerces like a script `Number(..)`: blank is zero, unsigned `0x`/`0o`/`0b`
/// literals are integers, garbage is NaN.
pub fn to_number(raw: &str) -> f64 {
    let s = raw.trim();
    if s.is_empty() {
        return 0.0;
    }

    let radix = match s.get(..2).map(str::to_ascii_lowercase).as_deref() {
        Some("0x") => Some(16),
        Some("0o") => Some(8),
        Some("0b") => Some(2),
        _ => None,
    };
    if let Some(radix) = radix {
        return parse_radix(&s[2..], radix);
    }

    s.parse::<f64>().unwrap_or(f64::NAN)
}

fn parse_radix(digits: &str, radix: u32) -> f64 {
    if digits.is_empty() {
        return f64::NAN;
    }
    digits
        .chars()
        .try_fold(0.0_f64, |acc, c| {
            c.to_digit(radix)
                .map(|d| acc.mul_add(f64::from(radix), f64::from(d)))
        })
        .unwrap_or(f64::NAN)
}

pub fn format_value(spec: &InputSpec, raw: &str) -> FieldValue {
    if spec.convert_to_number {
        FieldValue::Number(to_number(raw))
    } else {
        FieldValue::Text(raw.to_string())
    }
}

/// Numeric fields must be finite; positivity is checked only where the
/// table entry asks for it.
pub fn check_value(spec: &InputSpec, value: &FieldValue) -> bool {
    match value {
        FieldValue::Number(n) => n.is_finite() && (!spec.must_be_positive || *n > 0.0),
        FieldValue::Text(_) => !spec.must_be_positive,
    }
}

pub fn validate(raw: &RawForm) -> Result<ValidatedInput, InputError> {
    let kind_raw = raw.get(FieldId::Type);
    let kind = kind_raw
        .parse::<WorkoutKind>()
        .map_err(InputError::UnknownKind)?;

    let mut fields = BTreeMap::new();
    for spec in INPUT_SPECS.iter().filter(|s| s.applies(kind)) {
        let value = format_value(spec, raw.get(spec.field));
        let is_valid = check_value(spec, &value);
        if !is_valid {
            dlog!("field_rejected field={} value={value:?}", spec.field);
        }
        fields.insert(spec.field, CheckedField { value, is_valid });
    }

    fields.insert(
        FieldId::Type,
        CheckedField {
            value: FieldValue::Text(kind_raw.to_string()),
            is_valid: true,
        },
    );

    Ok(ValidatedInput { kind, fields })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::tests::april_14;
    use crate::types::WorkoutDetails;

    fn running(distance: &str, duration: &str, cadence: &str) -> RawForm {
        RawForm::new(WorkoutKind::Running)
            .with(FieldId::Distance, distance)
            .with(FieldId::Duration, duration)
            .with(FieldId::Cadence, cadence)
    }

    fn cycling(distance: &str, duration: &str, elevation: &str) -> RawForm {
        RawForm::new(WorkoutKind::Cycling)
            .with(FieldId::Distance, distance)
            .with(FieldId::Duration, duration)
            .with(FieldId::Elevation, elevation)
    }

    #[test]
    fn coercion_follows_number_semantics() {
        assert_eq!(to_number(" 12.5 "), 12.5);
        assert_eq!(to_number(""), 0.0);
        assert!(to_number("abc").is_nan());
    }

    #[test]
    fn prefixed_integers_coerce() {
        assert_eq!(to_number("0x10"), 16.0);
        assert_eq!(to_number(" 0XfF "), 255.0);
        assert_eq!(to_number("0o17"), 15.0);
        assert_eq!(to_number("0b101"), 5.0);
        assert!(to_number("0x").is_nan());
        assert!(to_number("0x1g").is_nan());
        assert!(to_number("-0x10").is_nan());

        let v = validate(&running("0xA", "30", "180")).unwrap();
        assert_eq!(v.number(FieldId::Distance), Some(10.0));
        assert!(v.is_valid());
    }

    #[test]
    fn running_input_is_valid_and_skips_elevation() {
        let v = validate(&running("5", "30", "180").with(FieldId::Elevation, "junk")).unwrap();
        assert!(v.is_valid());
        assert_eq!(v.kind(), WorkoutKind::Running);
        assert!(!v.fields().contains_key(&FieldId::Elevation));
        assert!(v.fields()[&FieldId::Type].is_valid);
        assert_eq!(v.number(FieldId::Cadence), Some(180.0));
    }

    #[test]
    fn cycling_input_skips_cadence() {
        let v = validate(&cycling("10", "40", "150").with(FieldId::Cadence, "-1")).unwrap();
        assert!(v.is_valid());
        assert!(!v.fields().contains_key(&FieldId::Cadence));
    }

    #[test]
    fn non_positive_values_are_rejected() {
        let v = validate(&running("-2", "30", "170")).unwrap();
        assert!(!v.is_valid());
        assert_eq!(v.invalid_fields(), vec![FieldId::Distance]);

        let v = validate(&running("5", "0", "")).unwrap();
        assert_eq!(v.invalid_fields(), vec![FieldId::Duration, FieldId::Cadence]);
    }

    #[test]
    fn negative_elevation_is_fine_but_garbage_is_not() {
        assert!(validate(&cycling("10", "40", "-80")).unwrap().is_valid());

        let v = validate(&cycling("10", "40", "lots")).unwrap();
        assert_eq!(v.invalid_fields(), vec![FieldId::Elevation]);
    }

    #[test]
    fn unknown_kind_is_an_error() {
        let raw = RawForm::default().with(FieldId::Type, "swimming");
        assert_eq!(
            validate(&raw),
            Err(InputError::UnknownKind("swimming".into()))
        );
    }

    #[test]
    fn into_workout_builds_the_selected_kind() {
        let mut ids = IdSource::default();
        let w = validate(&cycling("10", "40", "150"))
            .unwrap()
            .into_workout(Coords::new(1.0, 2.0), &mut ids, &april_14())
            .unwrap();
        assert_eq!(
            w.details(),
            &WorkoutDetails::Cycling {
                elevation_gain: 150.0,
                speed: 15.0
            }
        );
    }

    #[test]
    fn into_workout_refuses_invalid_input() {
        let mut ids = IdSource::default();
        let err = validate(&running("5", "30", "0"))
            .unwrap()
            .into_workout(Coords::new(1.0, 2.0), &mut ids, &april_14())
            .unwrap_err();
        assert_eq!(
            err,
            InputError::Invalid {
                fields: vec![FieldId::Cadence]
            }
        );
        assert_eq!(err.to_string(), "invalid fields: cadence");
    }

    #[test]
    fn clear_values_keeps_the_selector() {
        let mut raw = running("5", "30", "180");
        raw.clear_values();
        assert_eq!(raw.get(FieldId::Type), "running");
        assert_eq!(raw.get(FieldId::Distance), "");
    }
}
