//! Picking a capture device from the command line.
//!
//! Devices are listed as `[i] name (input)`. Either the index or the name
//! (with or without the kind suffix) selects the device.

use std::fmt;

const KIND_SUFFIXES: [&str; 2] = [" (input)", " (output)"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeviceQuery {
    Index(usize),
    Name(String),
}

impl DeviceQuery {
    /// A bare number is an index, anything else a name
    pub fn parse(query: &str) -> Self {
        let query = query.trim();
        match query.parse::<usize>() {
            Ok(index) => DeviceQuery::Index(index),
            Err(_) => DeviceQuery::Name(query.to_string()),
        }
    }

    /// Position of the matching device in `names`
    pub fn resolve<S: AsRef<str>>(&self, names: &[S]) -> Option<usize> {
        match self {
            DeviceQuery::Index(index) => (*index < names.len()).then_some(*index),
            DeviceQuery::Name(name) => {
                let wanted = strip_kind(name);
                names
                    .iter()
                    .position(|n| n.as_ref() == wanted)
                    .or_else(|| {
                        names
                            .iter()
                            .position(|n| n.as_ref().eq_ignore_ascii_case(wanted))
                    })
            }
        }
    }
}

impl fmt::Display for DeviceQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceQuery::Index(index) => write!(f, "index {}", index),
            DeviceQuery::Name(name) => write!(f, "\"{}\"", name),
        }
    }
}

/// Drop the ` (input)` / ` (output)` label added by the device listing
fn strip_kind(name: &str) -> &str {
    KIND_SUFFIXES
        .iter()
        .find_map(|suffix| name.strip_suffix(suffix))
        .unwrap_or(name)
}
