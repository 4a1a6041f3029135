pub mod cargo_env {
    pub const CARGO_PKG_NAME: &str = env!("CARGO_PKG_NAME");
}

pub mod defaults {
    use std::time::Duration;

    pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(30);
    pub const MESSAGE_READ_TIMEOUT: Duration = Duration::from_secs(1);
    pub const MESSAGE_WRITE_TIMEOUT: Duration = Duration::from_secs(1);
}

pub mod command_line_test {
    use std::time::Duration;

    pub const NAME: &str = "commandline";
    pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(20 * 60);
    pub const MESSAGE_READ_TIMEOUT: Duration = Duration::from_secs(20 * 60);
    pub const SLEEP: Duration = Duration::from_secs(5 * 60);
}
