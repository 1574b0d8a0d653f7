use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use crate::config::CONFIG;
use crate::state::ChatSession;
use crate::utils::telegram::loading_text;
use crate::wizard::{
    render_optional, ImageInput, StepDefinition, WizardState, FINAL_REVIEW_STEP, INTAKE_STEP,
    STEP_COUNT,
};

pub const WIZARD_CALLBACK_PREFIX: &str = "wizard:";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardAction {
    Back,
    Next,
    Generate,
    Reset,
    Resume,
}

impl WizardAction {
    pub fn parse(data: &str) -> Option<Self> {
        match data.strip_prefix(WIZARD_CALLBACK_PREFIX)? {
            "back" => Some(WizardAction::Back),
            "next" => Some(WizardAction::Next),
            "generate" => Some(WizardAction::Generate),
            "reset" => Some(WizardAction::Reset),
            "resume" => Some(WizardAction::Resume),
            _ => None,
        }
    }

    fn callback_data(self) -> String {
        let name = match self {
            WizardAction::Back => "back",
            WizardAction::Next => "next",
            WizardAction::Generate => "generate",
            WizardAction::Reset => "reset",
            WizardAction::Resume => "resume",
        };
        format!("{WIZARD_CALLBACK_PREFIX}{name}")
    }

    fn button(self, label: &str) -> InlineKeyboardButton {
        InlineKeyboardButton::callback(label.to_string(), self.callback_data())
    }
}

/// A rendered screen: HTML text plus its inline keyboard.
#[derive(Debug, Clone)]
pub struct View {
    pub text: String,
    pub keyboard: InlineKeyboardMarkup,
}

fn empty_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(Vec::<Vec<InlineKeyboardButton>>::new())
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

pub fn progress_bar(current: usize, total: usize) -> String {
    let filled = current.min(total);
    format!("{}{}", "▰".repeat(filled), "▱".repeat(total - filled))
}

/// Joins whole lines until the limit, so HTML tags are never cut in half.
fn fit_lines(lines: &[String], limit: usize) -> String {
    let mut text = String::new();
    for line in lines {
        let needed = line.chars().count() + 1;
        if text.chars().count() + needed > limit.saturating_sub(2) {
            text.push('…');
            break;
        }
        text.push_str(line);
        text.push('\n');
    }
    text.trim_end().to_string()
}

fn attachment_line(label: &str, image: Option<&ImageInput>) -> String {
    match image {
        Some(image) => format!(
            "✅ {}: {}",
            label,
            escape_html(image.file_name.as_deref().unwrap_or("attached"))
        ),
        None => format!("▫️ {label}: not attached (optional)"),
    }
}

fn intake_view(session: &ChatSession) -> View {
    let mut lines = vec![
        "<b>AI Architectural Virtual Synthesis System</b>".to_string(),
        "Turn your ideas into reality. Our 6-step AI process transforms your concept into a photorealistic architectural image.".to_string(),
        String::new(),
        "<b>1. Provide Project Details</b>".to_string(),
        attachment_line("Original Site Image", session.draft.original_image.as_ref()),
        attachment_line("New Building Concept Image", session.draft.concept_image.as_ref()),
        String::new(),
        "Send photos with the caption <code>original</code> or <code>concept</code>, then submit:".to_string(),
        "<code>/project location | requirements</code>".to_string(),
    ];

    let mut rows = Vec::new();
    if let Some(project) = session.wizard.project_data() {
        lines.push(String::new());
        lines.push(format!(
            "Current project: <b>{}</b> ({})",
            escape_html(&project.location),
            escape_html(&project.requirements)
        ));
        rows.push(vec![WizardAction::Resume.button("Resume review ➡️")]);
        rows.push(vec![WizardAction::Reset.button("🔄 Reset")]);
    }

    View {
        text: fit_lines(&lines, CONFIG.telegram_max_length),
        keyboard: InlineKeyboardMarkup::new(rows),
    }
}

fn step_lines(step: &StepDefinition, wizard: &WizardState) -> Vec<String> {
    let project = wizard.project_data();
    let render = |text: &str| escape_html(&render_optional(text, project));

    let mut lines = vec![
        format!("<b>STEP {}/{}</b>  {}", step.id, STEP_COUNT, progress_bar(step.id, STEP_COUNT)),
        format!("<b>{}</b>", escape_html(&step.title)),
        format!("<i>{}</i>", render(&step.goal)),
    ];

    for (section_index, section) in step.sections.iter().enumerate() {
        lines.push(String::new());
        lines.push(format!("<b>{}</b>", escape_html(&section.title)));
        lines.push(format!("Keyword: <code>{}</code>", escape_html(&section.keyword)));
        for (detail_index, detail) in section.details.iter().enumerate() {
            lines.push(format!("<u>{}</u>", escape_html(&detail.title)));
            for (item_index, item) in detail.items.iter().enumerate() {
                lines.push(format!(
                    "<code>{}.{}.{}</code> {}: {}",
                    section_index + 1,
                    detail_index + 1,
                    item_index + 1,
                    escape_html(&item.key),
                    render(&item.value)
                ));
            }
        }
    }

    lines.push(String::new());
    lines.push(format!("ℹ️ {}", render(&step.confirmation)));
    lines
}

fn step_keyboard(step: usize) -> InlineKeyboardMarkup {
    let forward = if step < FINAL_REVIEW_STEP {
        WizardAction::Next.button("Confirm & Next Step ➡️")
    } else {
        WizardAction::Generate.button("Generate Final Image ✨")
    };
    InlineKeyboardMarkup::new(vec![
        vec![WizardAction::Back.button("⬅️ Back"), forward],
        vec![WizardAction::Reset.button("🔄 Reset")],
    ])
}

fn result_view(wizard: &WizardState) -> View {
    let generation = wizard.generation();
    if generation.is_loading {
        return View {
            text: loading_text(0),
            keyboard: empty_keyboard(),
        };
    }
    if let Some(error) = &generation.error {
        return View {
            text: format!(
                "❌ <b>Image Generation Failed</b>\n\n{}",
                escape_html(error)
            ),
            keyboard: InlineKeyboardMarkup::new(vec![vec![
                WizardAction::Reset.button("🔄 Try Again"),
            ]]),
        };
    }
    View {
        text: "<b>Synthesis Complete!</b>\nHere is the AI-generated visualization of your project."
            .to_string(),
        keyboard: InlineKeyboardMarkup::new(vec![vec![
            WizardAction::Reset.button("🔄 Start a New Project"),
        ]]),
    }
}

pub fn build_view(session: &ChatSession) -> View {
    let wizard = &session.wizard;
    if wizard.current_step() == INTAKE_STEP {
        return intake_view(session);
    }
    if let Some(step) = wizard.current_step_definition() {
        return View {
            text: fit_lines(&step_lines(step, wizard), CONFIG.telegram_max_length),
            keyboard: step_keyboard(wizard.current_step()),
        };
    }
    result_view(wizard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wizard::{ImageDataUri, ProjectData};

    fn session_at(step: usize) -> ChatSession {
        let mut session = ChatSession::default();
        session
            .wizard
            .submit(ProjectData::new("Seoul <Gangnam>", "glass & timber", None, None))
            .unwrap();
        while session.wizard.current_step() < step {
            session.wizard.next().unwrap();
        }
        session
    }

    fn callback_labels(keyboard: &InlineKeyboardMarkup) -> Vec<String> {
        keyboard
            .inline_keyboard
            .iter()
            .flatten()
            .map(|button| button.text.clone())
            .collect()
    }

    #[test]
    fn actions_round_trip_through_callback_data() {
        for action in [
            WizardAction::Back,
            WizardAction::Next,
            WizardAction::Generate,
            WizardAction::Reset,
            WizardAction::Resume,
        ] {
            assert_eq!(WizardAction::parse(&action.callback_data()), Some(action));
        }
        assert_eq!(WizardAction::parse("image_res:abc"), None);
        assert_eq!(WizardAction::parse("wizard:jump"), None);
    }

    #[test]
    fn progress_bar_fills_by_step() {
        assert_eq!(progress_bar(2, 6), "▰▰▱▱▱▱");
        assert_eq!(progress_bar(9, 6), "▰▰▰▰▰▰");
    }

    #[test]
    fn step_view_renders_placeholders_escaped() {
        let view = build_view(&session_at(1));
        assert!(view.text.starts_with("<b>STEP 1/6</b>"));
        assert!(view.text.contains("Seoul &lt;Gangnam&gt;"));
        assert!(view.text.contains("<code>2.1.2</code> P2: Removal Area: The existing red brick building"));
        assert!(!view.text.contains("{PROJECT_ADDRESS}"));
        assert_eq!(
            callback_labels(&view.keyboard),
            vec!["⬅️ Back", "Confirm & Next Step ➡️", "🔄 Reset"]
        );
    }

    #[test]
    fn final_step_offers_generation() {
        let view = build_view(&session_at(FINAL_REVIEW_STEP));
        assert!(callback_labels(&view.keyboard).contains(&"Generate Final Image ✨".to_string()));
    }

    #[test]
    fn edited_values_are_shown_rendered() {
        let mut session = session_at(5);
        session
            .wizard
            .set_item_value(1, 0, 0, "Shot at {PROJECT_ADDRESS}")
            .unwrap();
        let view = build_view(&session);
        assert!(view.text.contains("Photographer: Shot at Seoul &lt;Gangnam&gt;"));
        assert!(view.text.contains("Core Intent: glass &amp; timber"));
    }

    #[test]
    fn intake_offers_resume_only_with_a_project() {
        let fresh = build_view(&ChatSession::default());
        assert!(fresh.keyboard.inline_keyboard.is_empty());
        assert!(fresh.text.contains("not attached"));

        let mut session = session_at(1);
        session.wizard.back().unwrap();
        let view = build_view(&session);
        assert_eq!(callback_labels(&view.keyboard), vec!["Resume review ➡️", "🔄 Reset"]);
    }

    #[test]
    fn result_views_follow_generation_state() {
        let mut session = session_at(FINAL_REVIEW_STEP);
        let ticket = session.wizard.generate().unwrap();
        let loading = build_view(&session);
        assert!(loading.text.contains("Generating Your Vision"));
        assert!(loading.keyboard.inline_keyboard.is_empty());

        session
            .wizard
            .complete_generation(ticket.epoch, Err("status 403: <denied>".to_string()));
        let failed = build_view(&session);
        assert!(failed.text.contains("Image Generation Failed"));
        assert!(failed.text.contains("status 403: &lt;denied&gt;"));
        assert_eq!(callback_labels(&failed.keyboard), vec!["🔄 Try Again"]);

        let mut session = session_at(FINAL_REVIEW_STEP);
        let ticket = session.wizard.generate().unwrap();
        session
            .wizard
            .complete_generation(ticket.epoch, Ok(ImageDataUri::new("image/png", "AAAA")));
        let done = build_view(&session);
        assert!(done.text.contains("Synthesis Complete!"));
        assert_eq!(callback_labels(&done.keyboard), vec!["🔄 Start a New Project"]);
    }

    #[test]
    fn long_views_are_cut_on_line_boundaries() {
        let lines: Vec<String> = (0..50).map(|i| format!("<b>line {i}</b>")).collect();
        let text = fit_lines(&lines, 100);
        assert!(text.chars().count() <= 100);
        assert!(text.ends_with('…'));
        assert!(!text.contains("<b>line 49"));
    }
}
