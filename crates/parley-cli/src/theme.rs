use console::Style;

#[derive(Clone)]
pub struct Theme {
    pub name: &'static str,
    pub title: Style,
    pub user: Style,
    pub assistant: Style,
    pub busy: Style,
    pub notice: Style,
    pub error: Style,
    pub heading: Style,
    pub code: Style,
    pub muted: Style,
}

impl Theme {
    pub fn dark() -> Self {
        Self {
            name: "dark",
            title: Style::new().blue().bold(),
            user: Style::new().blue().bold(),
            assistant: Style::new().magenta().bold(),
            busy: Style::new().green().bold(),
            notice: Style::new().red().bold(),
            error: Style::new().red().bold(),
            heading: Style::new().bold().underlined(),
            code: Style::new().cyan(),
            muted: Style::new().dim(),
        }
    }

    pub fn tokyo_night() -> Self {
        Self {
            name: "tokyo-night",
            title: Style::new().color256(111).bold(),
            user: Style::new().color256(111).bold(),
            assistant: Style::new().color256(149).bold(),
            busy: Style::new().color256(179).bold(),
            notice: Style::new().color256(204).bold(),
            error: Style::new().color256(204).bold(),
            heading: Style::new().color256(111).bold(),
            code: Style::new().color256(179),
            muted: Style::new().color256(60),
        }
    }

    /// No colours or attributes at all.
    pub fn plain() -> Self {
        Self {
            name: "plain",
            title: Style::new(),
            user: Style::new(),
            assistant: Style::new(),
            busy: Style::new(),
            notice: Style::new(),
            error: Style::new(),
            heading: Style::new(),
            code: Style::new(),
            muted: Style::new(),
        }
    }

    pub fn by_name(name: &str) -> Self {
        match name {
            "tokyo-night" => Self::tokyo_night(),
            "plain" => Self::plain(),
            _ => Self::dark(),
        }
    }

    pub fn all_names() -> &'static [&'static str] {
        &["dark", "tokyo-night", "plain"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_by_name_falls_back_to_dark() {
        assert_eq!(Theme::by_name("plain").name, "plain");
        assert_eq!(Theme::by_name("tokyo-night").name, "tokyo-night");
        assert_eq!(Theme::by_name("nope").name, "dark");
    }

    #[test]
    fn test_all_names_resolve() {
        for name in Theme::all_names() {
            assert_eq!(Theme::by_name(name).name, *name);
        }
    }
}
