use crate::{
    app::{AppState, Pane, VocalTarget, ViewState},
    form::FormField,
    types::{GeneratedSong, Tempo, MAX_DURATION_MINUTES},
};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Gauge, Paragraph, Wrap},
    Frame,
};

const TITLE: &str = "সুরকার";
const TAGLINE: &str = "আপনার নিজস্ব ডিজিটাল বাংলা মিউজিক স্টুডিও";
const FORM_HELP: &str = "Tab/↑↓ ঘর | ←→ বদল | Enter সংযুক্ত/জমা | Ctrl+G তৈরি | \
    Ctrl+R ফলাফল | Ctrl+S সংরক্ষণ | Ctrl+Q প্রস্থান";
const SECTIONS_HELP: &str = "↑↓ অংশ | p কণ্ঠ | e কথা সম্পাদনা | Ctrl+F পুরো গান | \
    Ctrl+S সংরক্ষণ | Esc ফর্ম | Ctrl+Q প্রস্থান";
const EDITOR_HELP: &str = "লিখুন | Enter নতুন লাইন | Ctrl+S রাখুন | Esc বাতিল";

const ACCENT: Color = Color::Yellow;
const HIGHLIGHT: Color = Color::LightRed;

pub fn render(frame: &mut Frame, app: &AppState) {
    let area = frame.size();
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(10),
            Constraint::Length(8),
            Constraint::Length(1),
        ])
        .split(area);

    render_header(frame, rows[0]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(34), Constraint::Percentage(66)])
        .split(rows[1]);
    render_form(frame, body[0], app);
    render_results(frame, body[1], app);

    render_status(frame, rows[2], app);
    render_help(frame, rows[3], app);

    if let Some(editor) = &app.editor {
        render_editor(frame, area, editor.index, &editor.buffer);
    }
    if let Some(message) = &app.alert {
        render_alert(frame, area, message);
    }
}

fn render_header(frame: &mut Frame, area: Rect) {
    let line = Line::from(vec![
        Span::styled(TITLE, Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)),
        Span::raw("  "),
        Span::styled(TAGLINE, Style::default().fg(Color::Gray).add_modifier(Modifier::ITALIC)),
    ]);
    let header = Paragraph::new(line)
        .alignment(Alignment::Center)
        .block(
            Block::default().borders(Borders::ALL).border_style(Style::default().fg(HIGHLIGHT)),
        );
    frame.render_widget(header, area);
}

fn render_form(frame: &mut Frame, area: Rect, app: &AppState) {
    let form = &app.form;
    let focused = app.focused_field();
    let mut lines: Vec<Line> = Vec::new();

    for field in FormField::ORDER {
        if field == FormField::CustomLyrics && !form.custom_lyrics_mode {
            continue;
        }
        let is_focused = focused == Some(field);
        let marker = if is_focused { "▶ " } else { "  " };
        let label_style = if is_focused {
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Gray)
        };
        lines.push(Line::from(Span::styled(format!("{marker}{}", field.label()), label_style)));

        let value_style = Style::default().fg(Color::White);
        let cursor = if is_focused && field.is_text() { "▏" } else { "" };
        match field {
            FormField::Genre => lines.push(selector_line(form.genre(), is_focused)),
            FormField::Mood => lines.push(selector_line(form.mood(), is_focused)),
            FormField::Tempo => {
                let spans: Vec<Span> = Tempo::ALL
                    .iter()
                    .map(|tempo| {
                        let style = if *tempo == form.tempo {
                            Style::default().fg(Color::Black).bg(HIGHLIGHT)
                        } else {
                            Style::default().fg(Color::DarkGray)
                        };
                        Span::styled(format!(" {} ", tempo.short_label()), style)
                    })
                    .collect();
                let mut line = vec![Span::raw("    ")];
                line.extend(spans);
                lines.push(Line::from(line));
            }
            FormField::Duration => {
                let minutes = form.target_duration();
                let bar: String = (1..=MAX_DURATION_MINUTES)
                    .map(|m| if m <= minutes { '█' } else { '░' })
                    .collect();
                lines.push(Line::from(vec![
                    Span::raw("    "),
                    Span::styled(bar, Style::default().fg(HIGHLIGHT)),
                    Span::styled(format!(" {minutes}"), value_style),
                ]));
            }
            FormField::StyleNotes => {
                let text = if form.style_notes.is_empty() && !is_focused {
                    "যেমন: আধুনিক পপ এবং বাউল সুরের সংমিশ্রণ...".to_string()
                } else {
                    format!("{}{cursor}", form.style_notes)
                };
                lines.push(Line::from(vec![Span::raw("    "), Span::styled(text, value_style)]));
            }
            FormField::SamplePath => {
                let text = match form.audio_sample() {
                    Some(sample) => format!(
                        "🎵 {} ({}) | Ctrl+P শুনুন | Ctrl+X সরান",
                        sample.file_name, sample.mime_type
                    ),
                    None if form.sample_path.is_empty() && !is_focused => {
                        "অডিও ফাইলের পথ লিখে Enter চাপুন".to_string()
                    }
                    None => format!("{}{cursor}", form.sample_path),
                };
                lines.push(Line::from(vec![Span::raw("    "), Span::styled(text, value_style)]));
            }
            FormField::LyricsMode => {
                let text = if form.custom_lyrics_mode { "[x] চালু" } else { "[ ] বন্ধ" };
                lines.push(Line::from(vec![Span::raw("    "), Span::styled(text, value_style)]));
            }
            FormField::CustomLyrics => {
                let mut text_lines: Vec<&str> = form.custom_lyrics.lines().collect();
                if form.custom_lyrics.ends_with('\n') || text_lines.is_empty() {
                    text_lines.push("");
                }
                let last = text_lines.len() - 1;
                for (idx, text) in text_lines.into_iter().enumerate() {
                    let suffix = if idx == last { cursor } else { "" };
                    lines.push(Line::from(vec![
                        Span::raw("    "),
                        Span::styled(format!("{text}{suffix}"), value_style),
                    ]));
                }
            }
            FormField::Voice => lines.push(selector_line(form.voice.name(), is_focused)),
        }
        lines.push(Line::from(""));
    }

    let submit_style = if app.is_generating() {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default().fg(Color::Black).bg(HIGHLIGHT).add_modifier(Modifier::BOLD)
    };
    let submit_label =
        if app.is_generating() { " সুরারোপ হচ্ছে... " } else { " গান তৈরি করুন (Ctrl+G) " };
    lines.push(Line::from(Span::styled(submit_label, submit_style)).alignment(Alignment::Center));

    let border = if app.pane == Pane::Form { ACCENT } else { Color::DarkGray };
    let block = Block::default()
        .title("রচনার মানদণ্ড")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border));
    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }).block(block), area);
}

fn selector_line(value: &str, focused: bool) -> Line<'static> {
    let arrows = if focused { ("◀ ", " ▶") } else { ("  ", "  ") };
    Line::from(vec![
        Span::raw("  "),
        Span::styled(arrows.0, Style::default().fg(ACCENT)),
        Span::styled(value.to_string(), Style::default().fg(Color::White)),
        Span::styled(arrows.1, Style::default().fg(ACCENT)),
    ])
}

fn render_results(frame: &mut Frame, area: Rect, app: &AppState) {
    match (&app.view, &app.song) {
        (ViewState::Generating, _) => render_progress(frame, area, app),
        (ViewState::Failed(message), _) => {
            let block = Block::default()
                .title("ফলাফল")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Red));
            let paragraph = Paragraph::new(Line::from(Span::styled(
                message.as_str(),
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            )))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .block(block);
            frame.render_widget(paragraph, area);
        }
        (_, Some(song)) => render_song(frame, area, app, song),
        (_, None) => {
            let lines = vec![
                Line::from(""),
                Line::from(Span::styled(
                    "আপনার গানটি এখানে প্রদর্শিত হবে",
                    Style::default().fg(Color::Gray).add_modifier(Modifier::BOLD),
                )),
                Line::from(Span::styled(
                    "ফর্ম পূরণ করে \"গান তৈরি করুন\" চাপুন।",
                    Style::default().fg(Color::DarkGray),
                )),
            ];
            let paragraph = Paragraph::new(lines)
                .alignment(Alignment::Center)
                .block(Block::default().title("ফলাফল").borders(Borders::ALL));
            frame.render_widget(paragraph, area);
        }
    }
}

fn render_progress(frame: &mut Frame, area: Rect, app: &AppState) {
    let block = Block::default().title("ফলাফল").borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(40),
            Constraint::Length(3),
            Constraint::Length(2),
            Constraint::Min(0),
        ])
        .split(inner);

    let percent = app.progress.percent();
    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL))
        .gauge_style(Style::default().fg(HIGHLIGHT).bg(Color::Black))
        .percent(percent)
        .label(format!("{percent}%"));
    frame.render_widget(gauge, chunks[1]);

    let message = Paragraph::new(Span::styled(
        app.progress.message(),
        Style::default().fg(Color::Gray).add_modifier(Modifier::ITALIC),
    ))
    .alignment(Alignment::Center);
    frame.render_widget(message, chunks[2]);
}

fn render_song(frame: &mut Frame, area: Rect, app: &AppState, song: &GeneratedSong) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(62), Constraint::Percentage(38)])
        .split(area);

    let focused = app.pane == Pane::Sections;
    let mut lines: Vec<Line> = Vec::new();
    let mut selected_offset = 0usize;

    let full_busy = app.is_vocal_busy(VocalTarget::FullSong);
    lines.push(
        Line::from(Span::styled(
            song.title.as_str(),
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        ))
        .alignment(Alignment::Center),
    );
    let full_label = if full_busy { "♪ পুরো গান তৈরি হচ্ছে…" } else { "Ctrl+F পুরো গান শুনুন" };
    lines.push(
        Line::from(Span::styled(full_label, Style::default().fg(Color::DarkGray)))
            .alignment(Alignment::Center),
    );
    lines.push(Line::from(""));

    for (idx, section) in song.sections.iter().enumerate() {
        let selected = idx == app.selected_section;
        if selected {
            selected_offset = lines.len();
        }
        let header_style = if selected && focused {
            Style::default().fg(Color::Black).bg(HIGHLIGHT).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(HIGHLIGHT).add_modifier(Modifier::BOLD)
        };
        let busy = if app.is_vocal_busy(VocalTarget::Section(idx)) { "  ♪ …" } else { "" };
        lines.push(Line::from(vec![
            Span::styled(format!("#{} ", idx + 1), Style::default().fg(Color::DarkGray)),
            Span::styled(section.kind.as_str(), header_style),
            Span::styled(
                format!("  সময়: {}", section.duration),
                Style::default().fg(Color::Gray).add_modifier(Modifier::ITALIC),
            ),
            Span::styled(busy, Style::default().fg(ACCENT)),
        ]));
        for text in section.lyrics.lines() {
            lines.push(Line::from(Span::raw(format!("  {text}"))));
        }
        lines.push(Line::from(""));
    }

    let border = if focused { ACCENT } else { Color::DarkGray };
    let lyrics = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .scroll((scroll_offset(selected_offset, columns[0].height), 0))
        .block(
            Block::default()
                .title("সম্পূর্ণ লিরিক্স")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(border)),
        );
    frame.render_widget(lyrics, columns[0]);

    let mut arrangement: Vec<Line> = Vec::new();
    for (label, value) in song.arrangement.fields() {
        arrangement.push(Line::from(Span::styled(
            label,
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        )));
        arrangement.push(Line::from(Span::raw(value.to_string())));
        arrangement.push(Line::from(""));
    }
    let panel = Paragraph::new(arrangement)
        .wrap(Wrap { trim: true })
        .block(Block::default().title("সংগীত আয়োজন").borders(Borders::ALL));
    frame.render_widget(panel, columns[1]);
}

/// Keeps the selected section in view once it would fall below the fold.
fn scroll_offset(selected_line: usize, height: u16) -> u16 {
    let visible = height.saturating_sub(2) as usize;
    if selected_line + 4 <= visible {
        0
    } else {
        selected_line.saturating_sub(1).min(u16::MAX as usize) as u16
    }
}

fn render_status(frame: &mut Frame, area: Rect, app: &AppState) {
    let lines: Vec<Line> = if app.status_lines.is_empty() {
        let idle = Style::default().fg(Color::DarkGray);
        vec![Line::from(Span::styled("এখনও কোনো কার্যক্রম নেই।", idle))]
    } else {
        app.status_lines
            .iter()
            .rev()
            .take(area.height.saturating_sub(2) as usize)
            .map(|line| {
                let style = if line.is_error {
                    Style::default().fg(Color::Red)
                } else {
                    Style::default().fg(Color::Gray)
                };
                Line::from(vec![
                    Span::styled(
                        line.timestamp.format("%H:%M:%S ").to_string(),
                        Style::default().fg(Color::DarkGray),
                    ),
                    Span::styled(line.message.as_str(), style),
                ])
            })
            .collect()
    };
    let paragraph =
        Paragraph::new(lines).block(Block::default().title("অবস্থা").borders(Borders::ALL));
    frame.render_widget(paragraph, area);
}

fn render_help(frame: &mut Frame, area: Rect, app: &AppState) {
    let text = if app.editor.is_some() {
        EDITOR_HELP
    } else if app.pane == Pane::Sections {
        SECTIONS_HELP
    } else {
        FORM_HELP
    };
    let help = Paragraph::new(text)
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::DarkGray).add_modifier(Modifier::DIM));
    frame.render_widget(help, area);
}

fn render_editor(frame: &mut Frame, area: Rect, index: usize, buffer: &str) {
    let popup = centered_rect(70, 60, area);
    let mut lines: Vec<Line> = buffer.lines().map(|text| Line::from(text.to_string())).collect();
    if buffer.ends_with('\n') || lines.is_empty() {
        lines.push(Line::from(""));
    }
    if let Some(last) = lines.last_mut() {
        last.spans.push(Span::styled("▏", Style::default().fg(ACCENT)));
    }
    let block = Block::default()
        .title(format!("অংশ #{} সম্পাদনা", index + 1))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(ACCENT));
    frame.render_widget(Clear, popup);
    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }).block(block), popup);
}

fn render_alert(frame: &mut Frame, area: Rect, message: &str) {
    let popup = centered_rect(50, 25, area);
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(message.to_string(), Style::default().fg(Color::White))),
        Line::from(""),
        Line::from(Span::styled("[Enter] ঠিক আছে", Style::default().fg(ACCENT))),
    ];
    let block = Block::default()
        .title("সতর্কতা")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red));
    frame.render_widget(Clear, popup);
    frame.render_widget(
        Paragraph::new(lines).alignment(Alignment::Center).wrap(Wrap { trim: true }).block(block),
        popup,
    );
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}
