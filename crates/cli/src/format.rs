//! Entity → human/json string formatting.

use tether_core::{Error, Person};

/// Output formatting mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

/// Format a person.
pub fn format_person(person: &Person, mode: OutputMode) -> String {
    match mode {
        OutputMode::Json => serde_json::to_string_pretty(person)
            .unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e)),
        OutputMode::Human => {
            let dob = person
                .dob()
                .map_or_else(|| "(nil)".to_string(), |d| d.to_string());
            format!("#{} {:?} born {}", person.id(), person.name(), dob)
        }
    }
}

/// Format an error.
pub fn format_error(err: &Error, mode: OutputMode) -> String {
    match mode {
        OutputMode::Json => serde_json::json!({ "error": err.to_string() }).to_string(),
        OutputMode::Human => format!("(error) {}", err),
    }
}
