//! Sensor Reading Parsing
//!
//! The device emits one JSON object per line. Boot banners, partial lines and
//! anything else that is not a sensor record are dropped without error.

use serde::{Deserialize, Serialize};

/// Raw record as emitted by the device. Unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SensorRecord {
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub gas: Option<f64>,
    #[serde(default)]
    pub moisture: Option<f64>,
}

impl SensorRecord {
    /// True when the record carries none of the known fields
    pub fn is_empty(&self) -> bool {
        self.temperature.is_none() && self.gas.is_none() && self.moisture.is_none()
    }
}

/// Latest known value of each sensor channel
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub temperature: Option<f64>,
    pub gas: Option<f64>,
    pub moisture: Option<f64>,
}

impl SensorReading {
    /// Merge a record into this reading. Absent fields keep their value.
    pub fn merge(&mut self, record: &SensorRecord) {
        if let Some(temperature) = record.temperature {
            self.temperature = Some(temperature);
        }
        if let Some(gas) = record.gas {
            self.gas = Some(gas);
        }
        if let Some(moisture) = record.moisture {
            self.moisture = Some(moisture);
        }
    }

    /// All three channels, in model feature order, if every one is known
    pub fn complete(&self) -> Option<(f64, f64, f64)> {
        Some((self.temperature?, self.gas?, self.moisture?))
    }
}

/// Parse one line from the transport.
///
/// Returns `None` for blank lines, non-JSON text, JSON that is not an object,
/// fields with the wrong type, and objects without any sensor field.
pub fn parse_line(line: &str) -> Option<SensorRecord> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    // Only objects count; serde would otherwise accept `[t, g, m]` arrays.
    let value = match serde_json::from_str::<serde_json::Value>(line) {
        Ok(value @ serde_json::Value::Object(_)) => value,
        Ok(_) => return None,
        Err(e) => {
            tracing::trace!(error = %e, "Discarding non-JSON line");
            return None;
        }
    };

    match serde_json::from_value::<SensorRecord>(value) {
        Ok(record) if !record.is_empty() => Some(record),
        Ok(_) => None,
        Err(e) => {
            tracing::trace!(error = %e, "Discarding malformed record");
            None
        }
    }
}
