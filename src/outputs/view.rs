use serde::Serialize;

use crate::kernel::interim::InterimState;
use crate::kernel::segment::Segment;
use crate::kernel::state::SessionState;

/// Read-only projection of the session, republished after every update.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub supported: bool,
    pub listening: bool,
    pub error: Option<String>,
    pub interim: InterimState,
    pub segments: Vec<Segment>,
    pub answer_prompt: String,
    pub version: u64,
}

impl From<&SessionState> for SessionView {
    fn from(state: &SessionState) -> Self {
        Self {
            supported: state.supported,
            listening: state.listening,
            error: state.error.clone(),
            interim: state.interim.clone(),
            segments: state.segments.segments().to_vec(),
            answer_prompt: state.answer_prompt.clone(),
            version: state.version,
        }
    }
}

impl SessionView {
    pub fn last_segment(&self) -> Option<&Segment> {
        self.segments.last()
    }
}
