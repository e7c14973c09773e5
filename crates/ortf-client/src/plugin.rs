//! The `SensorPlugin` trait: a plugin instance's string command channel.
//!
//! Everything the client knows about the native plugin goes through this one
//! method.  Implementations wrap whatever the host simulator exposes (a
//! foreign-function handle, a socket, or the in-process
//! [`SimPlugin`][crate::sim::SimPlugin]).

use ortf_types::OrTfError;

/// Handle to one instantiated sensor plugin.
///
/// The handle may be shared with the hosting environment; the environment
/// owns the plugin's lifetime, the handle only talks to it.
pub trait SensorPlugin: Send + Sync {
    /// Instance name, e.g. `"or_tf"`.
    fn name(&self) -> &str;

    /// Hand one command line to the plugin and block until it has been
    /// processed.  Returns whatever the plugin wrote back (often empty).
    ///
    /// # Errors
    ///
    /// Returns [`OrTfError::DispatchFailure`] when the plugin rejects the line
    /// or the channel fails, and [`OrTfError::InvalidReference`] when the
    /// plugin reports an unknown body.
    fn send_command(&mut self, line: &str) -> Result<String, OrTfError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimal plugin that only remembers the last line.
    struct EchoPlugin {
        last: Option<String>,
    }

    impl SensorPlugin for EchoPlugin {
        fn name(&self) -> &str {
            "echo"
        }

        fn send_command(&mut self, line: &str) -> Result<String, OrTfError> {
            if line.is_empty() {
                return Err(OrTfError::DispatchFailure {
                    command: String::new(),
                    details: "empty line".to_string(),
                });
            }
            self.last = Some(line.to_string());
            Ok(line.to_string())
        }
    }

    #[test]
    fn echo_plugin_returns_response() {
        let mut p = EchoPlugin { last: None };
        assert_eq!(p.send_command("Pause").unwrap(), "Pause");
        assert_eq!(p.last.as_deref(), Some("Pause"));
        assert!(matches!(
            p.send_command(""),
            Err(OrTfError::DispatchFailure { .. })
        ));
    }
}
