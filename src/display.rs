//! The LCD status panel: device serial, Wi-Fi state, broker address.

use crate::prelude::*;

#[cfg(feature = "hardware")]
pub mod lcd;

pub const TEXT_COLOUR: Rgb = Rgb(255, 255, 255);
pub const CONNECTED_BACKGROUND: Rgb = Rgb(0, 170, 170);
pub const DISCONNECTED_BACKGROUND: Rgb = Rgb(85, 15, 15);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

/// What gets drawn onto the LCD, recomputed on every iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusPanel {
    pub lines: [String; 3],
    pub background: Rgb,
    pub text: Rgb,
}

/// Pure function of the connectivity state, broker address and device serial.
pub fn status_panel(is_connected: bool, broker: &str, serial: &str) -> StatusPanel {
    StatusPanel {
        lines: [
            serial.to_string(),
            format!(
                "Wi-Fi: {}",
                if is_connected { "connected" } else { "disconnected" },
            ),
            format!("mqtt-broker: {}", broker),
        ],
        background: if is_connected {
            CONNECTED_BACKGROUND
        } else {
            DISCONNECTED_BACKGROUND
        },
        text: TEXT_COLOUR,
    }
}

pub trait StatusScreen {
    fn show(&mut self, panel: &StatusPanel) -> Result;
}

/// Logs the panel instead of driving an LCD, for demo runs off-Pi.
pub struct ConsoleScreen;

impl StatusScreen for ConsoleScreen {
    fn show(&mut self, panel: &StatusPanel) -> Result {
        debug!("Status: {}", panel.lines.join(" | "));
        Ok(())
    }
}

#[cfg(test)]
pub mod fake {
    use std::sync::{Arc, Mutex};

    use super::*;

    /// Records every shown panel; clones share the same log.
    #[derive(Default, Clone)]
    pub struct FakeScreen {
        panels: Arc<Mutex<Vec<StatusPanel>>>,
    }

    impl FakeScreen {
        pub fn panels(&self) -> Vec<StatusPanel> {
            self.panels.lock().unwrap().clone()
        }
    }

    impl StatusScreen for FakeScreen {
        fn show(&mut self, panel: &StatusPanel) -> Result {
            self.panels.lock().unwrap().push(panel.clone());
            Ok(())
        }
    }
}
