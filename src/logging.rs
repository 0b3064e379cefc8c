use simplelog::{Color, ColorChoice, ConfigBuilder, Level, LevelFilter, TermLogger, TerminalMode};

pub fn init() {
    let config = ConfigBuilder::new()
        .set_level_color(Level::Trace, Some(Color::White))
        .set_level_color(Level::Info, Some(Color::Green))
        .set_level_color(Level::Warn, Some(Color::Yellow))
        .set_level_color(Level::Error, Some(Color::Red))
        .build();

    let level = if cfg!(debug_assertions) { LevelFilter::Debug } else { LevelFilter::Info };

    let _ = TermLogger::init(level, config, TerminalMode::Mixed, ColorChoice::Auto);
}
