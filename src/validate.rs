//! Validation engine.
//!
//! Validators run against a record in registration order, every one on every
//! pass, reporting problems through [`Record::error`]. The two built-ins
//! below are pre-registered on every model, ahead of any custom validator.

use crate::attrs;
use crate::record::Record;

/// A registered validator. Reports through [`Record::error`]; the return
/// value of the pass is decided by the issue list alone.
pub type ValidatorFn = Box<dyn Fn(&mut Record) + Send + Sync>;

/// For every attribute with a declared type and a non-null current value,
/// compare the value's semantic tag against the declaration.
pub fn type_validator(record: &mut Record) {
    let model = record.model().clone();
    for (name, def) in model.attrs() {
        let Some(expected) = def.value_type() else {
            continue;
        };
        let Some(value) = record.get(name) else {
            continue;
        };
        let Some(tag) = value.tag() else {
            // Null carries no tag; absence is the required validator's job.
            continue;
        };
        if tag != expected {
            record.error(
                format!("{name} is not of type {expected}."),
                attrs! { "type" => "validation", "attribute" => name },
            );
        }
    }
}

/// For every attribute flagged required, a null or empty-text current value
/// is a problem.
pub fn required_validator(record: &mut Record) {
    let model = record.model().clone();
    for (name, def) in model.attrs() {
        if !def.is_required() {
            continue;
        }
        let absent = record.get(name).is_none_or(|value| value.is_absent());
        if absent {
            record.error(
                format!("{name} is required."),
                attrs! { "type" => "validation", "attribute" => name },
            );
        }
    }
}
