//! In-memory backend for unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use axum::body::Bytes;
use axum::http::StatusCode;

use crate::fhir::{BackendError, BackendRequest, BackendResponse, FhirBackend};

pub type Step = Result<BackendResponse, BackendError>;

/// Replays a script of replies, then repeats `fallback`. Records every call.
pub struct ScriptedBackend {
    script: Mutex<VecDeque<Step>>,
    fallback: Step,
    calls: Mutex<Vec<BackendRequest>>,
}

impl ScriptedBackend {
    pub fn scripted(script: Vec<Step>, fallback: Step) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(status: u16, body: &str) -> Self {
        Self::scripted(Vec::new(), reply(status, body))
    }

    pub fn failing() -> Self {
        Self::scripted(Vec::new(), refused())
    }

    pub fn calls(&self) -> Vec<BackendRequest> {
        self.calls.lock().unwrap().clone()
    }
}

pub fn reply(status: u16, body: &str) -> Step {
    Ok(BackendResponse {
        status: StatusCode::from_u16(status).unwrap(),
        body: Bytes::from(body.to_string()),
    })
}

pub fn refused() -> Step {
    Err(BackendError::Transport("connection refused".into()))
}

impl FhirBackend for ScriptedBackend {
    async fn send(&self, request: BackendRequest) -> Result<BackendResponse, BackendError> {
        self.calls.lock().unwrap().push(request);
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| self.fallback.clone())
    }
}
