//! Submitting operations the backend may run in the background.
//!
//! The caller cannot know ahead of time whether an operation completes
//! inline. Each submission is made once and the response is inspected
//! afterwards: a command reference makes it `Tracked`, anything else is
//! decoded into the operation's result record.

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use tracing::debug;

use crate::api::{decode, ApiClient, SourceOptions};
use crate::error::{Error, Result};
use crate::models::{Answer, NewPodcast, Podcast, Source, SourceInput, TransformationOutput};
use crate::resolve::require_model;
use crate::transport::Transport;

/// Response keys that carry a backend command ID, in lookup order.
const HANDLE_KEYS: [&str; 2] = ["command_id", "job_id"];

/// Opaque ID of a backend command. Immutable once obtained.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobHandle(String);

impl JobHandle {
    pub fn new(id: impl Into<String>) -> Self {
        JobHandle(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch<R> {
    /// The backend answered with the result itself.
    Immediate(R),
    /// The backend queued a command; `receipt` is the raw acknowledgement.
    Tracked { handle: JobHandle, receipt: Value },
}

impl<R> Dispatch<R> {
    pub fn handle(&self) -> Option<&JobHandle> {
        match self {
            Dispatch::Immediate(_) => None,
            Dispatch::Tracked { handle, .. } => Some(handle),
        }
    }
}

/// Find a command reference in a response body.
pub fn job_handle(response: &Value) -> Option<JobHandle> {
    HANDLE_KEYS.iter().find_map(|key| {
        response
            .get(key)
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .map(JobHandle::new)
    })
}

/// Tag a response as tracked or decode it as the immediate result.
pub fn classify<R: DeserializeOwned>(what: &'static str, response: Value) -> Result<Dispatch<R>> {
    if let Some(handle) = job_handle(&response) {
        debug!(%handle, what, "operation queued as background command");
        return Ok(Dispatch::Tracked {
            handle,
            receipt: response,
        });
    }
    decode(what, response).map(Dispatch::Immediate)
}

pub fn create_source<T: Transport>(
    api: &ApiClient<T>,
    input: &SourceInput,
    opts: &SourceOptions<'_>,
) -> Result<Dispatch<Source>> {
    if let SourceInput::File(path) = input {
        if !path.is_file() {
            return Err(Error::UserInput(format!("file not found: {}", path.display())));
        }
    }
    classify("source", api.create_source(input, opts)?)
}

/// Run a transformation against `input_text`. The model is picked before
/// anything is submitted.
pub fn execute_transformation<T: Transport>(
    api: &ApiClient<T>,
    transformation_id: &str,
    input_text: &str,
    model: Option<&str>,
    preferred_provider: &str,
) -> Result<Dispatch<TransformationOutput>> {
    let model_id = require_model(api, model, preferred_provider)?;
    classify(
        "transformation output",
        api.execute_transformation(transformation_id, input_text, &model_id)?,
    )
}

/// Ask the knowledge base in simple mode. One model serves every stage.
pub fn ask<T: Transport>(
    api: &ApiClient<T>,
    question: &str,
    model: Option<&str>,
    preferred_provider: &str,
) -> Result<Dispatch<Answer>> {
    if question.trim().is_empty() {
        return Err(Error::UserInput("question must not be empty".into()));
    }
    let model_id = require_model(api, model, preferred_provider)?;
    classify("answer", api.ask(question, &model_id)?)
}

pub fn create_podcast<T: Transport>(api: &ApiClient<T>, new: &NewPodcast<'_>) -> Result<Dispatch<Podcast>> {
    classify("podcast", api.create_podcast(new)?)
}
