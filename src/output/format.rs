/// How command results are written to stdout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputMode {
    Tty,
    Json,
}

pub fn detect_output_mode(json_flag: bool) -> OutputMode {
    if json_flag {
        return OutputMode::Json;
    }
    OutputMode::Tty
}
