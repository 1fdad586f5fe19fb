#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorClass {
    Transient,
    Fatal,
}

// Matched case-sensitively against the rendered message.
const TRANSIENT_MARKERS: &[&str] = &[
    "40613",
    "Database is not currently available",
    "timeout",
    "connection",
];

pub fn classify_error(message: &str) -> ErrorClass {
    if TRANSIENT_MARKERS
        .iter()
        .any(|marker| message.contains(marker))
    {
        ErrorClass::Transient
    } else {
        ErrorClass::Fatal
    }
}

pub fn is_transient(message: &str) -> bool {
    classify_error(message) == ErrorClass::Transient
}
