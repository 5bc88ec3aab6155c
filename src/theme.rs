/// The fixed set of glyphs a [`crate::Bar`] draws with.
///
/// Resolve one once, with [`Theme::detect`] or one of the constants, and
/// pass it through [`crate::BarOptions::theme`]. There is no ambient
/// global to mutate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    /// Left delimiter of the bar.
    pub bar_start: &'static str,
    /// Right delimiter of the bar.
    pub bar_end: &'static str,
    /// A completed cell.
    pub filled: &'static str,
    /// A half-tone cell.
    pub half: &'static str,
    /// A remaining cell.
    pub empty: &'static str,
    /// Marks an operation message ("Extracting ...").
    pub op_sign: &'static str,
    /// Marks a stat message ("Extracted 26 files").
    pub stat_sign: &'static str,
    /// Generic list separator.
    pub separator: &'static str,
}

impl Theme {
    /// Unicode block-element palette for UTF-8 terminals.
    pub const UNICODE: Theme = Theme {
        bar_start: "▐",
        bar_end: "▌",
        filled: "▓",
        half: "▒",
        empty: "░",
        op_sign: "•",
        stat_sign: "✓",
        separator: "•",
    };

    /// Plain-ASCII palette, safe everywhere.
    pub const ASCII: Theme = Theme {
        bar_start: "|",
        bar_end: "|",
        filled: "#",
        half: "=",
        empty: "-",
        op_sign: ">",
        stat_sign: "<",
        separator: "|",
    };

    /// Legacy code-page 437 palette for Windows consoles.
    pub const CP437: Theme = Theme {
        bar_start: "▐",
        bar_end: "▌",
        filled: "█",
        half: "▒",
        empty: "░",
        op_sign: "∙",
        stat_sign: "√",
        separator: "∙",
    };

    /// Picks a palette from environment signals: CP437 on Windows (unless
    /// running under Cygwin), Unicode when the locale advertises UTF-8,
    /// ASCII otherwise.
    pub fn detect() -> Theme {
        if cfg!(windows) && std::env::var("OS").as_deref() != Ok("CYGWIN") {
            return Theme::CP437;
        }

        for key in ["LC_ALL", "LC_CTYPE", "LANG"] {
            if let Ok(value) = std::env::var(key)
                && (value.ends_with(".UTF-8") || value.ends_with(".utf8"))
            {
                return Theme::UNICODE;
            }
        }

        Theme::ASCII
    }
}

impl Default for Theme {
    fn default() -> Self {
        Theme::detect()
    }
}
