use crossterm::style::{Color, Stylize};
use std::io::{self, Write};
use weather_core::{
    Theme,
    render::{Line, Tone, View},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Style {
    color: Color,
    bold: bool,
}

const fn style(color: Color, bold: bool) -> Style {
    Style { color, bold }
}

fn palette(theme: Theme, tone: Tone) -> Style {
    match (theme, tone) {
        (Theme::Light, Tone::Title) => style(Color::DarkBlue, true),
        (Theme::Light, Tone::Hint) => style(Color::DarkGrey, false),
        (Theme::Light, Tone::Heading) => style(Color::DarkMagenta, true),
        (Theme::Light, Tone::Item) => style(Color::Black, false),
        (Theme::Light, Tone::Error) => style(Color::DarkRed, true),
        (Theme::Light, Tone::Status) => style(Color::DarkYellow, false),
        (Theme::Light, Tone::Headline) => style(Color::DarkBlue, true),
        (Theme::Light, Tone::Temperature) => style(Color::DarkRed, true),
        (Theme::Light, Tone::Detail) => style(Color::Reset, false),

        (Theme::Dark, Tone::Title) => style(Color::Cyan, true),
        (Theme::Dark, Tone::Hint) => style(Color::Grey, false),
        (Theme::Dark, Tone::Heading) => style(Color::Magenta, true),
        (Theme::Dark, Tone::Item) => style(Color::White, false),
        (Theme::Dark, Tone::Error) => style(Color::Red, true),
        (Theme::Dark, Tone::Status) => style(Color::Yellow, false),
        (Theme::Dark, Tone::Headline) => style(Color::Cyan, true),
        (Theme::Dark, Tone::Temperature) => style(Color::Yellow, true),
        (Theme::Dark, Tone::Detail) => style(Color::White, false),
    }
}

pub fn paint_line(line: &Line, theme: Theme, color: bool) -> String {
    if !color {
        return line.text.clone();
    }

    let Style { color, bold } = palette(theme, line.tone);
    let styled = line.text.as_str().with(color);
    if bold {
        styled.bold().to_string()
    } else {
        styled.to_string()
    }
}

pub fn print_view(view: &View, color: bool) -> anyhow::Result<()> {
    let mut out = io::stdout().lock();
    for line in &view.lines {
        writeln!(out, "{}", paint_line(line, view.theme, color))?;
    }
    out.flush()?;
    Ok(())
}
