use crate::kernel::segment::{AnswerState, Segment, TranslationState};
use super::view::SessionView;

/// How many committed segments the terminal keeps on screen.
pub const VISIBLE_SEGMENTS: usize = 6;

/// PURE FUNCTION: Renders the tail of a session view for a terminal.
/// The newest segment is always last, which keeps the output "scrolled" to the bottom.
pub fn render(view: &SessionView) -> String {
    let mut out = String::new();

    let status = match (view.supported, view.listening) {
        (false, _) => "unsupported",
        (true, true) => "listening",
        (true, false) => "idle",
    };
    out.push_str(&format!("[{}] {} segment(s)\n", status, view.segments.len()));

    if let Some(err) = &view.error {
        out.push_str(&format!("! {}\n", err));
    }

    let skip = view.segments.len().saturating_sub(VISIBLE_SEGMENTS);
    for segment in view.segments.iter().skip(skip) {
        render_segment(&mut out, segment);
    }

    let interim = &view.interim;
    if !interim.transcript.is_empty() {
        out.push_str(&format!("  … {}\n", interim.transcript));
        if interim.is_translating {
            out.push_str("    (translating)\n");
        } else if !interim.translation.is_empty() {
            out.push_str(&format!("    {}\n", interim.translation));
        }
        if interim.is_answering {
            out.push_str("    (thinking)\n");
        } else if let Some(answer) = &interim.answer {
            out.push_str(&format!("    ? {} / {}\n", answer.english, answer.chinese));
        }
    }

    out
}

fn render_segment(out: &mut String, segment: &Segment) {
    out.push_str(&format!("• {}\n", segment.english));

    match segment.translation_state {
        TranslationState::Translating => out.push_str("    (translating)\n"),
        TranslationState::Done => {
            out.push_str(&format!("    {}\n", segment.chinese.as_deref().unwrap_or_default()));
        }
        TranslationState::Error => out.push_str(&format!(
            "    ! {}\n",
            segment.translation_error.as_deref().unwrap_or_default()
        )),
    }

    match segment.answer_state {
        AnswerState::Pending | AnswerState::Answering => {}
        AnswerState::Done => {
            if let (true, Some(answer)) = (segment.is_question, &segment.answer) {
                out.push_str(&format!("    A: {}\n    答: {}\n", answer.english, answer.chinese));
            }
        }
        AnswerState::Error => out.push_str(&format!(
            "    ! {}\n",
            segment.answer_error.as_deref().unwrap_or_default()
        )),
    }
}
