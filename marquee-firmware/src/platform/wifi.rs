//! Wi-Fi link over the CYW43439

use cyw43::{Control, JoinOptions};
use embassy_net::Stack;
use embassy_time::{with_timeout, Duration};

use marquee_core::traits::LinkControl;

/// Longest wait for a DHCP lease after associating
const DHCP_TIMEOUT: Duration = Duration::from_secs(20);

/// Link errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkError {
    /// Association failed with this chip status code
    Join(u32),
    /// Associated, but no DHCP lease in time
    Dhcp,
}

/// Station-mode link: association plus DHCP
pub struct WifiLink<'a> {
    control: Control<'static>,
    stack: Stack<'static>,
    ssid: &'a str,
    password: &'a str,
}

impl<'a> WifiLink<'a> {
    pub fn new(control: Control<'static>, stack: Stack<'static>, ssid: &'a str, password: &'a str) -> Self {
        Self {
            control,
            stack,
            ssid,
            password,
        }
    }
}

impl LinkControl for WifiLink<'_> {
    type Error = LinkError;

    async fn join(&mut self) -> Result<(), Self::Error> {
        let options = if self.password.is_empty() {
            JoinOptions::new_open()
        } else {
            JoinOptions::new(self.password.as_bytes())
        };
        self.control
            .join(self.ssid, options)
            .await
            .map_err(|e| LinkError::Join(e.status))?;

        if with_timeout(DHCP_TIMEOUT, self.stack.wait_config_up())
            .await
            .is_err()
        {
            self.control.leave().await;
            return Err(LinkError::Dhcp);
        }
        Ok(())
    }

    fn is_up(&self) -> bool {
        self.stack.is_link_up() && self.stack.is_config_up()
    }
}
