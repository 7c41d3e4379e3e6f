//! Terminal graphics detection for cover art.

use std::time::Duration;

use ratatui_image::picker::{Capability, Picker, ProtocolType, cap_parser::QueryStdioOptions};

/// Environment clues about which image protocol the terminal speaks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct TerminalHints {
    pub kitty_window: bool,
    pub xterm_kitty: bool,
    pub iterm: bool,
    pub tmux: bool,
}

impl TerminalHints {
    pub fn from_env() -> Self {
        let non_empty = |key: &str| {
            std::env::var(key)
                .ok()
                .is_some_and(|v| !v.trim().is_empty())
        };
        let contains = |key: &str, needle: &str| {
            std::env::var(key)
                .ok()
                .is_some_and(|v| v.contains(needle))
        };

        Self {
            kitty_window: non_empty("KITTY_WINDOW_ID"),
            xterm_kitty: std::env::var("TERM")
                .ok()
                .is_some_and(|term| term.trim().starts_with("xterm-kitty")),
            iterm: non_empty("ITERM_SESSION_ID")
                || contains("TERM_PROGRAM", "iTerm")
                || contains("LC_TERMINAL", "iTerm"),
            tmux: std::env::var_os("TMUX").is_some(),
        }
    }

    /// Querying stdio costs a round trip, so only do it when a graphics protocol is likely.
    pub fn wants_stdio_query(&self) -> bool {
        self.kitty_window || self.xterm_kitty || self.iterm || self.tmux
    }

    pub fn query_timeout(&self) -> Duration {
        if self.kitty_window || self.xterm_kitty || self.iterm {
            Duration::from_millis(1500)
        } else if self.tmux {
            Duration::from_millis(300)
        } else {
            Duration::ZERO
        }
    }

    /// Must run after raw mode is enabled and before the first draw.
    pub fn pick(&self) -> Picker {
        if self.tmux {
            allow_tmux_passthrough();
        }

        let mut picker = if self.wants_stdio_query() {
            let mut options = QueryStdioOptions::default();
            options.timeout = self.query_timeout();
            options.text_sizing_protocol = false;
            Picker::from_query_stdio_with_options(options).unwrap_or_else(|_| Picker::halfblocks())
        } else {
            Picker::halfblocks()
        };

        let kitty = !self.iterm
            && (self.kitty_window
                || picker
                    .capabilities()
                    .iter()
                    .any(|cap| matches!(cap, Capability::Kitty)));
        if kitty {
            picker.set_protocol_type(ProtocolType::Kitty);
        }
        picker.set_background_color(image::Rgba([255u8, 255u8, 255u8, 255u8]));
        log::info!("cover protocol: {}", protocol_label(&picker));
        picker
    }
}

fn allow_tmux_passthrough() {
    // Ignore failures: old tmux or a restricted environment just means no passthrough.
    let _ = std::process::Command::new("tmux")
        .args(["set-option", "-g", "allow-passthrough", "on"])
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status();
}

pub(crate) fn protocol_label(picker: &Picker) -> &'static str {
    match picker.protocol_type() {
        ProtocolType::Halfblocks => "halfblocks",
        ProtocolType::Sixel => "sixel",
        ProtocolType::Kitty => "kitty",
        ProtocolType::Iterm2 => "iterm2",
    }
}
