//! Health-check state exposed to the UI.

use serde::{Deserialize, Serialize};

/// Phase of the health-check state machine.
///
/// `Ready` and `Error` are terminal; `Loading` is re-entered only by an
/// explicit retry or a refresh event starting a new cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Loading,
    Ready,
    Error,
}

/// Client-local snapshot of one preview's health. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthState {
    pub phase: Phase,
    /// 0..=100; capped at 90 until the preview actually answers
    pub progress_percent: u8,
    pub url: Option<String>,
    pub message: Option<String>,
    pub attempts: u32,
}

impl HealthState {
    pub fn loading() -> Self {
        Self {
            phase: Phase::Loading,
            progress_percent: 0,
            url: None,
            message: None,
            attempts: 0,
        }
    }

    pub fn polling(url: impl Into<String>, progress_percent: u8, attempts: u32) -> Self {
        Self {
            phase: Phase::Loading,
            progress_percent,
            url: Some(url.into()),
            message: None,
            attempts,
        }
    }

    pub fn ready(url: impl Into<String>, attempts: u32) -> Self {
        Self {
            phase: Phase::Ready,
            progress_percent: 100,
            url: Some(url.into()),
            message: None,
            attempts,
        }
    }

    pub fn error(message: impl Into<String>, attempts: u32) -> Self {
        Self {
            phase: Phase::Error,
            progress_percent: 0,
            url: None,
            message: Some(message.into()),
            attempts,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.phase, Phase::Ready | Phase::Error)
    }

    /// Human-readable status line for the UI.
    pub fn status_message(&self) -> String {
        match self.phase {
            Phase::Ready => "Preview ready".to_string(),
            Phase::Error => self
                .message
                .clone()
                .unwrap_or_else(|| "Preview failed".to_string()),
            Phase::Loading => format!("Starting preview ({}%)", self.progress_percent),
        }
    }

    /// Icon class derived purely from the phase.
    pub fn icon_class(&self) -> &'static str {
        match self.phase {
            Phase::Ready => "success",
            Phase::Error => "failure",
            Phase::Loading => "busy",
        }
    }
}

impl Default for HealthState {
    fn default() -> Self {
        Self::loading()
    }
}
