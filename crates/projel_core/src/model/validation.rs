use super::EntityKind;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Single-entity validation failure.
///
/// Always locally recoverable: the command that raised it is aborted and the
/// aggregate stays untouched.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Entity id is the nil uuid.
    NilId(EntityKind),
    /// Display name is blank after trim.
    BlankName(EntityKind),
    /// Circuit identifier is blank after trim.
    BlankIdentifier,
    /// Required zone reference is missing (nil).
    MissingZoneReference(EntityKind),
    /// Required location reference is missing (nil).
    MissingLocationReference,
    /// Numeric field must be strictly positive.
    NonPositive {
        entity: EntityKind,
        field: &'static str,
        value: f64,
    },
    /// Power factor must lie in `(0, 1]`.
    PowerFactorOutOfRange(f64),
    /// Load quantity must be at least one.
    ZeroQuantity,
    /// Grouping entity must contain at least one load.
    EmptyLoadSet(EntityKind),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NilId(kind) => write!(f, "{kind} id must not be nil"),
            Self::BlankName(kind) => write!(f, "{kind} name must not be blank"),
            Self::BlankIdentifier => write!(f, "circuit identifier must not be blank"),
            Self::MissingZoneReference(kind) => write!(f, "{kind} requires a zone reference"),
            Self::MissingLocationReference => write!(f, "load requires a location reference"),
            Self::NonPositive {
                entity,
                field,
                value,
            } => write!(f, "{entity} {field} must be > 0, got {value}"),
            Self::PowerFactorOutOfRange(value) => {
                write!(f, "power factor must be within (0, 1], got {value}")
            }
            Self::ZeroQuantity => write!(f, "load quantity must be at least 1"),
            Self::EmptyLoadSet(kind) => write!(f, "{kind} must group at least one load"),
        }
    }
}

impl Error for ValidationError {}

pub(crate) fn ensure_positive(
    entity: EntityKind,
    field: &'static str,
    value: f64,
) -> Result<(), ValidationError> {
    // NaN fails this comparison too.
    if value > 0.0 {
        Ok(())
    } else {
        Err(ValidationError::NonPositive {
            entity,
            field,
            value,
        })
    }
}
