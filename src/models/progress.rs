//! Inspection item progress and its legal transitions.

use serde::{Deserialize, Serialize};

/// Pipeline position of an inspection item.
///
/// Stored as a SMALLINT and exchanged with clients as its integer value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Progress {
    /// Item created, no image yet.
    WaitingImageSave,
    /// Image stored on the device only. Set by clients, never by the server.
    ImageSavedLocalOnly,
    /// Image uploaded to object storage.
    ImageSaved,
    /// Analysis requested and queued.
    RequestReceived,
    /// Reserved for clients; the server never writes it.
    Analyzing,
    /// Analysis result recorded.
    AnalysisFinished,
}

/// Events that move an item through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressEvent {
    /// A begin-analysis request was accepted and dispatched.
    AnalysisRequested,
    /// A queue worker recorded an OCR or AI result.
    AnalysisCompleted,
    /// A manual result with an image was submitted for an item without automated analysis.
    ResultSubmitted,
}

/// A transition that is not allowed from the current progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{event:?} is not allowed while progress is {from:?}")]
pub struct InvalidTransition {
    pub from: Progress,
    pub event: ProgressEvent,
}

impl Progress {
    /// Progress of a newly created item.
    pub const INITIAL: Progress = Progress::WaitingImageSave;

    pub fn as_i16(&self) -> i16 {
        match self {
            Self::WaitingImageSave => 0,
            Self::ImageSavedLocalOnly => 1,
            Self::ImageSaved => 2,
            Self::RequestReceived => 3,
            Self::Analyzing => 4,
            Self::AnalysisFinished => 5,
        }
    }

    pub fn from_i16(value: i16) -> Option<Self> {
        match value {
            0 => Some(Self::WaitingImageSave),
            1 => Some(Self::ImageSavedLocalOnly),
            2 => Some(Self::ImageSaved),
            3 => Some(Self::RequestReceived),
            4 => Some(Self::Analyzing),
            5 => Some(Self::AnalysisFinished),
            _ => None,
        }
    }

    /// Whether a queue worker may write an analysis result.
    ///
    /// Already finished items are accepted again so a redelivered message
    /// re-runs the analysis instead of being dropped.
    pub fn accepts_analysis_result(&self) -> bool {
        matches!(self, Self::RequestReceived | Self::AnalysisFinished)
    }

    /// Apply an event, returning the next progress.
    pub fn apply(self, event: ProgressEvent) -> Result<Progress, InvalidTransition> {
        match event {
            ProgressEvent::AnalysisRequested => Ok(Self::RequestReceived),
            ProgressEvent::AnalysisCompleted if self.accepts_analysis_result() => {
                Ok(Self::AnalysisFinished)
            }
            ProgressEvent::AnalysisCompleted => Err(InvalidTransition { from: self, event }),
            ProgressEvent::ResultSubmitted => Ok(Self::AnalysisFinished),
        }
    }
}

impl Serialize for Progress {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i16(self.as_i16())
    }
}

impl<'de> Deserialize<'de> for Progress {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = i16::deserialize(deserializer)?;
        Progress::from_i16(value)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid progress {}", value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Progress; 6] = [
        Progress::WaitingImageSave,
        Progress::ImageSavedLocalOnly,
        Progress::ImageSaved,
        Progress::RequestReceived,
        Progress::Analyzing,
        Progress::AnalysisFinished,
    ];

    #[test]
    fn test_integer_codes() {
        for (i, progress) in ALL.iter().enumerate() {
            assert_eq!(progress.as_i16(), i as i16);
            assert_eq!(Progress::from_i16(i as i16), Some(*progress));
        }
        assert_eq!(Progress::from_i16(6), None);
        assert_eq!(Progress::INITIAL, Progress::WaitingImageSave);
    }

    #[test]
    fn test_analysis_request_accepted_from_any_progress() {
        for progress in ALL {
            assert_eq!(
                progress.apply(ProgressEvent::AnalysisRequested),
                Ok(Progress::RequestReceived)
            );
        }
    }

    #[test]
    fn test_analysis_completion_gated() {
        assert_eq!(
            Progress::RequestReceived.apply(ProgressEvent::AnalysisCompleted),
            Ok(Progress::AnalysisFinished)
        );
        assert_eq!(
            Progress::AnalysisFinished.apply(ProgressEvent::AnalysisCompleted),
            Ok(Progress::AnalysisFinished)
        );
        for progress in [
            Progress::WaitingImageSave,
            Progress::ImageSavedLocalOnly,
            Progress::ImageSaved,
            Progress::Analyzing,
        ] {
            let err = progress
                .apply(ProgressEvent::AnalysisCompleted)
                .unwrap_err();
            assert_eq!(err.from, progress);
        }
    }

    #[test]
    fn test_serde_as_integer() {
        assert_eq!(
            serde_json::to_string(&Progress::RequestReceived).unwrap(),
            "3"
        );
        let parsed: Progress = serde_json::from_str("5").unwrap();
        assert_eq!(parsed, Progress::AnalysisFinished);
        assert!(serde_json::from_str::<Progress>("9").is_err());
    }
}
