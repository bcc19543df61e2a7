use marginalia_core::models::Theme;
use ratatui::style::Color;

/// Colors for the light and dark themes
#[derive(Debug, Clone, Copy)]
pub struct Palette {
    pub fg: Color,
    pub bg: Color,
    pub accent: Color,
    pub muted: Color,
    pub selection: Color,
    pub error: Color,
    pub bar_fg: Color,
    pub bar_bg: Color,
    /// Calendar cell colors by activity level, lowest first
    pub heat: [Color; 4],
}

impl Palette {
    pub fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Light => Self {
                fg: Color::Black,
                bg: Color::White,
                accent: Color::Blue,
                muted: Color::Gray,
                selection: Color::LightBlue,
                error: Color::Red,
                bar_fg: Color::White,
                bar_bg: Color::DarkGray,
                heat: [Color::Gray, Color::LightGreen, Color::Green, Color::Rgb(0, 100, 0)],
            },
            Theme::Dark => Self {
                fg: Color::White,
                bg: Color::Black,
                accent: Color::Cyan,
                muted: Color::DarkGray,
                selection: Color::Blue,
                error: Color::LightRed,
                bar_fg: Color::Black,
                bar_bg: Color::Gray,
                heat: [Color::DarkGray, Color::Green, Color::LightGreen, Color::Yellow],
            },
        }
    }

    /// Heat color for a day with `count` recorded actions
    pub fn heat_for(&self, count: u32) -> Color {
        match count {
            0 => self.heat[0],
            1..=5 => self.heat[1],
            6..=20 => self.heat[2],
            _ => self.heat[3],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heat_levels() {
        let palette = Palette::for_theme(Theme::Light);
        assert_eq!(palette.heat_for(0), palette.heat[0]);
        assert_eq!(palette.heat_for(3), palette.heat[1]);
        assert_eq!(palette.heat_for(20), palette.heat[2]);
        assert_eq!(palette.heat_for(21), palette.heat[3]);
    }
}
