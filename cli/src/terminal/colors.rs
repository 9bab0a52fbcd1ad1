use colored::Color;

pub const PRIMARY: Color = Color::BrightCyan;
pub const ACCENT: Color = Color::BrightMagenta;
pub const SEPARATOR: Color = Color::BrightBlack;
pub const TEXT_DEFAULT: Color = Color::White;

pub const ADDRESS: Color = Color::BrightBlue;
pub const POP: Color = Color::Cyan;
pub const FAST: Color = Color::BrightGreen;
pub const SLOW: Color = Color::Yellow;
pub const DEAD: Color = Color::Red;
