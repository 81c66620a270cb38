//! Turns raw OCR and AI output into normalized results.

use regex::Regex;
use tracing::warn;

use super::text_detection::{LINE_BLOCK, TextBlock};
use crate::error::{AppError, AppResult};
use crate::models::{AI_STATUS_SUCCESS, AiVerdict, AnalysisApiResponse};

/// Value recorded when no model or serial number could be read.
pub const READ_ERROR: &str = "ReadError";

/// Model and serial number read from a name plate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlateReading {
    pub model: String,
    pub serial_number: String,
}

impl PlateReading {
    /// File name segment replacing the verdict and comment markers.
    pub fn path_segment(&self) -> String {
        format!("{}_{}", self.model, self.serial_number)
    }
}

/// Compiled name plate patterns.
#[derive(Debug, Clone)]
pub struct PlateReader {
    allowed: Regex,
    unit: Regex,
    model: Regex,
    no_digit: Regex,
    serial: Regex,
}

impl PlateReader {
    pub fn new() -> AppResult<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern)
                .map_err(|e| AppError::Unexpected(format!("Invalid pattern {}: {}", pattern, e)))
        };
        Ok(Self {
            allowed: compile(r"^[-* 0-9a-zA-Z]+$")?,
            unit: compile(r"(/|V|Hz|kW|g|kg|MPa|WS No)")?,
            model: compile(r"^HE-.{3,}")?,
            no_digit: compile(r"^\D+$")?,
            serial: compile(r"5[0-9a-zA-Z]{6,}")?,
        })
    }

    /// Scan detected lines for a model and serial number.
    ///
    /// Later matches overwrite earlier ones; anything never matched reads
    /// as [`READ_ERROR`].
    pub fn read(&self, blocks: &[TextBlock]) -> PlateReading {
        let mut model = None;
        let mut serial_number = None;

        let lines = blocks
            .iter()
            .filter(|b| b.block_type == LINE_BLOCK)
            .filter_map(|b| b.text.as_deref());

        for line in lines {
            if !self.allowed.is_match(line) || self.unit.is_match(line) {
                continue;
            }
            if self.model.is_match(line) {
                model = Some(line.to_string());
            } else if self.no_digit.is_match(line) {
                continue;
            } else if let Some(found) = self.serial.find(line) {
                serial_number = Some(found.as_str().to_string());
            }
        }

        PlateReading {
            model: model.unwrap_or_else(|| READ_ERROR.to_string()),
            serial_number: serial_number.unwrap_or_else(|| READ_ERROR.to_string()),
        }
    }
}

/// Verdict of an AI analysis response given the labels the item expects.
///
/// A response with fewer than three comma separated tokens is malformed
/// and reads as NG. A nonzero leading code maps through the verdict code
/// table; otherwise the verdict is OK when any expected label was
/// detected at least once.
pub fn interpret_ai(response: &AnalysisApiResponse, labels: &[String]) -> AiVerdict {
    if response.status != AI_STATUS_SUCCESS {
        return AiVerdict::Failed;
    }

    let tokens: Vec<&str> = response.value.split(',').collect();
    if tokens.len() < 3 {
        warn!("Analysis value does not match the expected format: {}", response.value);
        return AiVerdict::Ng;
    }

    let code = match tokens[0].trim().parse::<i64>() {
        Ok(code) => code,
        Err(_) => {
            warn!("Analysis result code is not an integer: {}", tokens[0]);
            return AiVerdict::Failed;
        }
    };

    if code != 0 {
        return AiVerdict::from_code(code).unwrap_or_else(|| {
            warn!("Unknown analysis result code {}", code);
            AiVerdict::Ng
        });
    }

    for token in &tokens[1..] {
        let Some((label, count)) = token.split_once('=') else {
            continue;
        };
        let Ok(count) = count.trim().parse::<i64>() else {
            warn!("Skipping label with a non-numeric count: {}", token);
            continue;
        };
        if count > 0 && labels.iter().any(|l| l == label) {
            return AiVerdict::Ok;
        }
    }

    AiVerdict::Ng
}
