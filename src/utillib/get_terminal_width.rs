use terminal_size::{terminal_size, Width};

/// Width of the terminal on stdout minus `margin`, for wrapping help
/// texts; falls back to 120 if not connected to a terminal.
pub fn get_terminal_width(margin: usize) -> usize {
    if let Some((Width(width), _)) = terminal_size() {
        usize::from(width).saturating_sub(margin).max(40)
    } else {
        120
    }
}
