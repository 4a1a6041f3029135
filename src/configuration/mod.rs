pub mod command_line;
pub mod constants;
pub mod manifest;
