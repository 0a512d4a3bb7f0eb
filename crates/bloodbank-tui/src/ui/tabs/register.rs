use bloodbank_core::registration::{FormState, SUCCESS_MESSAGE};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, FormField};
use crate::ui::styles;

/// Width of the text shown inside a field's brackets.
const FIELD_DISPLAY_WIDTH: usize = 32;

/// Label column width, wide enough for the longest label.
const LABEL_WIDTH: usize = 16;

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Heading
            Constraint::Min(10),   // Form
        ])
        .split(area);

    let heading = vec![
        Line::from(Span::styled(" Register as a Blood Donor", styles::title_style())),
        Line::from(Span::styled(
            " Join our community to help save lives!",
            styles::muted_style(),
        )),
    ];
    frame.render_widget(Paragraph::new(heading), chunks[0]);

    let lines = match &app.form_state {
        FormState::Submitted { document_id } => submitted_lines(document_id),
        FormState::Editing { error } => form_lines(app, error.as_deref()),
    };

    let block = Block::default()
        .title(" Donor Details ")
        .title_style(styles::muted_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(app.is_editing_form()));

    let paragraph = Paragraph::new(lines).block(block).wrap(Wrap { trim: false });
    frame.render_widget(paragraph, chunks[1]);
}

fn form_lines<'a>(app: &'a App, error: Option<&'a str>) -> Vec<Line<'a>> {
    let mut lines = vec![Line::from("")];

    lines.push(text_field_line(app, FormField::Name, &app.form.name));
    lines.push(blood_group_line(app));
    lines.push(text_field_line(app, FormField::Contact, &app.form.contact));
    lines.push(text_field_line(app, FormField::Location, &app.form.location));

    // Register button
    let button_focused = app.form_focus == FormField::Submit;
    let button_style = if button_focused {
        styles::selected_style()
    } else {
        styles::list_item_style()
    };
    let label = FormField::Submit.label();
    let button_text = if button_focused {
        format!(" ▶ {} ◀ ", label)
    } else {
        format!("   {}   ", label)
    };
    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        Span::raw(format!("   {:LABEL_WIDTH$}[", "")),
        Span::styled(button_text, button_style),
        Span::raw("]"),
    ]));

    if let Some(error) = error {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(format!("   {}", error), styles::error_style())));
    }

    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        Span::styled("   Tab/↑↓", styles::help_key_style()),
        Span::styled(" move  ", styles::muted_style()),
        Span::styled("←/→", styles::help_key_style()),
        Span::styled(" blood group  ", styles::muted_style()),
        Span::styled("Enter", styles::help_key_style()),
        Span::styled(" register  ", styles::muted_style()),
        Span::styled("Esc", styles::help_key_style()),
        Span::styled(" back to dashboard", styles::muted_style()),
    ]));

    lines
}

fn field_style(focused: bool) -> ratatui::style::Style {
    if focused {
        styles::selected_style()
    } else {
        styles::list_item_style()
    }
}

fn text_field_line<'a>(app: &App, field: FormField, value: &str) -> Line<'a> {
    let focused = app.form_focus == field;
    let cursor = if focused { "▌" } else { "" };

    // Keep the tail visible while typing past the display width
    let count = value.chars().count();
    let visible: String = value.chars().skip(count.saturating_sub(FIELD_DISPLAY_WIDTH)).collect();

    Line::from(vec![
        Span::styled(format!("   {:<LABEL_WIDTH$}[", format!("{}:", field.label())), styles::muted_style()),
        Span::styled(format!("{:<FIELD_DISPLAY_WIDTH$}{}", visible, cursor), field_style(focused)),
        Span::styled("]", styles::muted_style()),
    ])
}

fn blood_group_line<'a>(app: &App) -> Line<'a> {
    let focused = app.form_focus == FormField::BloodGroup;
    let group = app.form.blood_group.map(|g| g.label()).unwrap_or("-");
    let value = if focused {
        format!("◀ {:^3} ▶", group)
    } else {
        format!("  {:^3}  ", group)
    };

    Line::from(vec![
        Span::styled(
            format!("   {:<LABEL_WIDTH$}[", format!("{}:", FormField::BloodGroup.label())),
            styles::muted_style(),
        ),
        Span::styled(value, field_style(focused)),
        Span::styled("]", styles::muted_style()),
    ])
}

fn submitted_lines(document_id: &str) -> Vec<Line<'static>> {
    vec![
        Line::from(""),
        Line::from(Span::styled(format!("   🎉 {}", SUCCESS_MESSAGE), styles::success_style())),
        Line::from(Span::styled(
            format!("   Donor record {} saved.", document_id),
            styles::muted_style(),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("   Press ", styles::muted_style()),
            Span::styled("[n]", styles::help_key_style()),
            Span::styled(" to register another donor, ", styles::muted_style()),
            Span::styled("[1]", styles::help_key_style()),
            Span::styled(" for the dashboard", styles::muted_style()),
        ]),
    ]
}
