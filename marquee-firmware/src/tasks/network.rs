//! Network supervision task
//!
//! Joins Wi-Fi, keeps the MQTT session alive and turns inbound messages
//! into banners. This is the only producer for the banner queue.

use core::fmt::Debug;

use cortex_m::peripheral::SCB;
use defmt::*;
use embassy_rp::gpio::Output;
use embassy_time::{Delay, Timer};

use marquee_core::config::BannerConfig;
use marquee_core::session::{
    supervise, ConnectionState, Discard, FailurePolicy, KeywordTable, SessionParams, Stage,
    Supervisor, SupervisorHooks,
};
use marquee_core::traits::Indicator;
use marquee_core::{Palette, Rgb};
use marquee_drivers::indicator::GpioIndicator;
use marquee_drivers::mqtt::MqttSession;

use crate::channels::BANNERS;
use crate::platform::{EmbassyClock, TcpTransport, WifiLink};

pub type BannerSession = MqttSession<'static, TcpTransport<'static>, Delay, EmbassyClock>;

/// Everything the supervisor borrows for the life of the device
pub struct NetworkContext {
    pub config: &'static BannerConfig,
    pub palette: &'static Palette,
    pub keywords: &'static KeywordTable,
}

/// Logs supervision events and drives the Wi-Fi LED
struct NetworkHooks {
    wifi_led: GpioIndicator<Output<'static>>,
    messages: u32,
    idle_ticks: u32,
}

impl SupervisorHooks for NetworkHooks {
    fn on_state(&mut self, state: ConnectionState) {
        debug!("Connection state: {:?}", state);
    }

    fn on_link(&mut self, up: bool) {
        self.wifi_led.set(up);
        if up {
            info!("Wi-Fi link up");
        } else {
            warn!("Wi-Fi link down");
        }
    }

    fn on_retry(&mut self, attempt: u32, delay_ms: u32) {
        warn!("Connection attempt {} failed, retrying in {} ms", attempt, delay_ms);
    }

    fn on_failure(&mut self, stage: Stage, error: &dyn Debug) {
        error!("{:?} failed: {}", stage, Debug2Format(error));
    }

    fn on_discard(&mut self, topic: &str, reason: Discard) {
        warn!("Dropped message on '{}': {:?}", topic, reason);
    }

    fn on_message(&mut self, topic: &str, color: Rgb, retained: bool) {
        self.messages = self.messages.wrapping_add(1);
        self.idle_ticks = 0;
        info!(
            "Message #{} on '{}' -> ({}, {}, {}) retained={}",
            self.messages, topic, color.r, color.g, color.b, retained
        );
    }

    fn on_tick(&mut self) {
        self.idle_ticks = self.idle_ticks.wrapping_add(1);
        if self.idle_ticks % 60 == 0 {
            trace!("No traffic for {} ticks", self.idle_ticks);
        }
    }
}

#[embassy_executor::task]
pub async fn network_task(
    mut link: WifiLink<'static>,
    mut session: BannerSession,
    ctx: NetworkContext,
    wifi_led: GpioIndicator<Output<'static>>,
) {
    info!("Network task started");

    let network = &ctx.config.network;
    let mut supervisor = Supervisor::new(
        &BANNERS,
        ctx.palette,
        ctx.keywords,
        SessionParams::from(network),
        FailurePolicy::from_config(ctx.config),
    );
    info!(
        "Broker {}:{} topic '{}' qos {} policy {:?}",
        network.broker.as_str(),
        network.port,
        network.topic.as_str(),
        network.qos,
        supervisor.policy()
    );

    let mut hooks = NetworkHooks {
        wifi_led,
        messages: 0,
        idle_ticks: 0,
    };
    hooks.wifi_led.set(false);

    let mut delay = Delay;
    let restart = supervise(&mut supervisor, &mut link, &mut session, &mut delay, &mut hooks).await;

    error!("Giving up on the network, restarting in {} ms", restart.grace_ms);
    Timer::after_millis(restart.grace_ms as u64).await;
    SCB::sys_reset();
}
