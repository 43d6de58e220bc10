//! Client for the cross-section service
//!
//! Requests run off the frame loop (a browser future or a desktop thread)
//! and complete into a queue that is drained into notices once per frame.

use bevy::prelude::*;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use weldmap_core::{EditorError, Notice, SectionError, SectionRequest, SectionResponse, SliceStatus};
use weldmap_scene::EditorState;

use crate::app::ViewerSettings;

/// A call with no answer after this long is reported as unreachable
pub const SECTION_TIMEOUT: Duration = Duration::from_secs(120);

/// How a cross-section call ended
#[derive(Debug, Clone, PartialEq)]
pub enum SectionOutcome {
    Completed(SectionResponse),
    /// The service answered with an error body
    Rejected(SectionError),
    /// Transport failure; the service could not be reached
    Unreachable(String),
}

#[derive(Resource, Default)]
pub struct PendingSectionResults(pub Arc<Mutex<VecDeque<SectionOutcome>>>);

/// Latest response and request bookkeeping for the UI
#[derive(Resource, Default)]
pub struct SectionState {
    pub in_flight: bool,
    pub last_response: Option<SectionResponse>,
    pub show_results: bool,
}

pub struct SectionClientPlugin;

impl Plugin for SectionClientPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<PendingSectionResults>()
            .init_resource::<SectionState>()
            .add_systems(Update, process_section_results);
    }
}

/// Turn an HTTP status and body into an outcome
pub fn decode_response(success: bool, status: u16, body: &str) -> SectionOutcome {
    if success {
        return match serde_json::from_str::<SectionResponse>(body) {
            Ok(response) => SectionOutcome::Completed(response),
            Err(e) => SectionOutcome::Rejected(SectionError {
                error: "Malformed response from cross-section service".to_string(),
                details: Some(e.to_string()),
            }),
        };
    }
    match serde_json::from_str::<SectionError>(body) {
        Ok(error) => SectionOutcome::Rejected(error),
        Err(_) => SectionOutcome::Rejected(SectionError {
            error: format!("HTTP {}", status),
            details: (!body.trim().is_empty()).then(|| body.trim().to_string()),
        }),
    }
}

/// Outcome recorded when the service does not answer in time
pub fn timeout_outcome(timeout: Duration) -> SectionOutcome {
    SectionOutcome::Unreachable(format!("no response within {} s", timeout.as_secs()))
}

/// Send the selected locator to the service. Reports a notice and returns
/// `false` when there is nothing to send.
pub fn request_section(
    editor: &mut EditorState,
    settings: &ViewerSettings,
    pending: &PendingSectionResults,
    state: &mut SectionState,
) -> bool {
    let Some(request) = editor.section_request() else {
        return false;
    };
    let endpoint = settings.config.slice_endpoint();
    tracing::info!(endpoint = %endpoint, model = %request.obj_file_path, "Requesting cross-section");
    state.in_flight = true;
    send(endpoint, request, pending.0.clone());
    true
}

fn push_outcome(queue: &Arc<Mutex<VecDeque<SectionOutcome>>>, outcome: SectionOutcome) {
    if let Ok(mut queue) = queue.lock() {
        queue.push_back(outcome);
    }
}

#[cfg(target_arch = "wasm32")]
fn send(endpoint: String, request: SectionRequest, queue: Arc<Mutex<VecDeque<SectionOutcome>>>) {
    use futures_util::future::{select, Either};
    use gloo_net::http::Request;
    use gloo_timers::future::TimeoutFuture;

    wasm_bindgen_futures::spawn_local(async move {
        let call = Box::pin(async {
            let response = Request::post(&endpoint)
                .json(&request)
                .map_err(|e| e.to_string())?
                .send()
                .await
                .map_err(|e| e.to_string())?;
            let status = response.status();
            let body = response.text().await.map_err(|e| e.to_string())?;
            Ok::<_, String>(decode_response(response.ok(), status, &body))
        });
        let deadline = Box::pin(TimeoutFuture::new(SECTION_TIMEOUT.as_millis() as u32));

        let outcome = match select(call, deadline).await {
            Either::Left((result, _)) => result.unwrap_or_else(SectionOutcome::Unreachable),
            Either::Right(((), _)) => {
                tracing::warn!(endpoint = %endpoint, "Cross-section request timed out");
                timeout_outcome(SECTION_TIMEOUT)
            }
        };
        push_outcome(&queue, outcome);
    });
}

#[cfg(not(target_arch = "wasm32"))]
fn send(endpoint: String, request: SectionRequest, queue: Arc<Mutex<VecDeque<SectionOutcome>>>) {
    std::thread::spawn(move || {
        let client = match reqwest::blocking::Client::builder().timeout(SECTION_TIMEOUT).build() {
            Ok(client) => client,
            Err(e) => return push_outcome(&queue, SectionOutcome::Unreachable(e.to_string())),
        };
        let outcome = client
            .post(&endpoint)
            .json(&request)
            .send()
            .and_then(|response| {
                let status = response.status();
                response
                    .text()
                    .map(|body| decode_response(status.is_success(), status.as_u16(), &body))
            })
            .unwrap_or_else(|e| {
            if e.is_timeout() {
                timeout_outcome(SECTION_TIMEOUT)
            } else {
                SectionOutcome::Unreachable(e.to_string())
            }
        });
        push_outcome(&queue, outcome);
    });
}

/// Turn completed calls into notices
fn process_section_results(
    pending: Res<PendingSectionResults>,
    mut state: ResMut<SectionState>,
    mut editor: ResMut<EditorState>,
) {
    let outcomes: Vec<SectionOutcome> = match pending.0.try_lock() {
        Ok(mut queue) => queue.drain(..).collect(),
        Err(_) => return,
    };

    for outcome in outcomes {
        state.in_flight = false;
        match outcome {
            SectionOutcome::Completed(response) => {
                let failed = response
                    .slice_results
                    .iter()
                    .filter(|r| r.status == SliceStatus::Error)
                    .count();
                tracing::info!(
                    model = %response.obj_file_processed,
                    locators = response.num_locators_processed,
                    failed,
                    "Cross-section completed"
                );
                let notice = if failed == 0 {
                    Notice::info("Cross-section", response.message.clone())
                } else {
                    Notice::error(
                        "Cross-section",
                        format!("{} ({} of {} slices failed)", response.message, failed, response.slice_results.len()),
                    )
                };
                editor.notify(notice);
                state.last_response = Some(response);
                state.show_results = true;
            }
            SectionOutcome::Rejected(error) => {
                tracing::warn!(error = %error.error, details = ?error.details, "Cross-section rejected");
                let message = match &error.details {
                    Some(details) => format!("{}: {}", error.error, details),
                    None => error.error.clone(),
                };
                editor.notify(Notice::error("Cross-section", message));
            }
            SectionOutcome::Unreachable(reason) => {
                let error = EditorError::CollaboratorUnreachable(reason);
                tracing::warn!("{}", error);
                editor.notify(Notice::from(&error));
            }
        }
    }
}
