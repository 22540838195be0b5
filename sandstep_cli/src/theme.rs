// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use cliclack::{Theme, ThemeState};
use console::Style;

/// Prompt styling for the sandstep REPL: a dim gutter with a green state
/// marker, cyan input, and a one-line usage hint in the banner.
pub struct ReplTheme;

impl Theme for ReplTheme {
    fn bar_color(&self, _: &ThemeState) -> Style {
        Style::new().dim()
    }

    fn state_symbol_color(&self, _: &ThemeState) -> Style {
        Style::new().green()
    }

    fn input_style(&self, _: &ThemeState) -> Style {
        Style::new().cyan()
    }

    fn format_intro(&self, title: &str) -> String {
        let gutter = self.bar_color(&ThemeState::Submit);
        format!(
            "{marker} {title} {hint}\n{pipe}\n",
            marker = gutter.apply_to("»"),
            pipe = gutter.apply_to("|"),
            title = Style::new().bold().underlined().apply_to(title),
            hint = gutter.apply_to("(one statement per line; \"exit\" quits)"),
        )
    }
}
