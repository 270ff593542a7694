//! Async supervision loop
//!
//! Drives a link and a messaging session through the [`Supervisor`]
//! handlers. The loop only ends when the restart policy asks for a device
//! restart; performing the restart is left to the caller.

use core::fmt::Debug;

use embedded_hal_async::delay::DelayNs;

use super::state::ConnectionState;
use super::supervisor::{Directive, Discard, Supervisor};
use crate::color::Rgb;
use crate::queue::BannerSink;
use crate::traits::{LinkControl, MessagingSession, SessionEvent};

/// Where a connection attempt or session failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Stage {
    /// Joining the network
    Link,
    /// Opening the broker session
    Connect,
    /// Subscribing to the topic filter
    Subscribe,
    /// Receiving on an established session
    Session,
}

/// Returned when the restart policy gives up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RestartRequested {
    /// Time to leave the failure banner up before restarting
    pub grace_ms: u32,
}

/// Observer for supervision events (logging, indicators)
///
/// All methods default to doing nothing.
pub trait SupervisorHooks {
    fn on_state(&mut self, _state: ConnectionState) {}

    /// Link came up or went down
    fn on_link(&mut self, _up: bool) {}

    /// A retry follows after `delay_ms`; `attempt` counts failures so far
    fn on_retry(&mut self, _attempt: u32, _delay_ms: u32) {}

    fn on_failure(&mut self, _stage: Stage, _error: &dyn Debug) {}

    fn on_discard(&mut self, _topic: &str, _reason: Discard) {}

    fn on_message(&mut self, _topic: &str, _color: Rgb, _retained: bool) {}

    /// One liveness tick passed without traffic
    fn on_tick(&mut self) {}
}

impl SupervisorHooks for () {}

/// Run the connect/reconnect loop
///
/// Posts the boot banner first. Returns only under the restart policy.
pub async fn supervise<B, L, S, D, H>(
    supervisor: &mut Supervisor<'_, B>,
    link: &mut L,
    session: &mut S,
    delay: &mut D,
    hooks: &mut H,
) -> RestartRequested
where
    B: BannerSink,
    L: LinkControl,
    S: MessagingSession,
    D: DelayNs,
    H: SupervisorHooks,
{
    supervisor.announce_boot();

    loop {
        supervisor.on_attempt();
        hooks.on_state(supervisor.state());

        match establish(supervisor, link, session, delay, hooks).await {
            Ok(()) => {
                supervisor.on_established();
                hooks.on_state(supervisor.state());

                serve(supervisor, link, session, delay, hooks).await;

                supervisor.on_lost();
                hooks.on_state(supervisor.state());
            }
            Err(_) => {
                let directive = supervisor.on_failure();
                hooks.on_state(supervisor.state());
                match directive {
                    Directive::RetryAfter(delay_ms) => {
                        hooks.on_retry(supervisor.retries(), delay_ms);
                        delay.delay_ms(delay_ms).await;
                    }
                    Directive::Restart { grace_ms } => return RestartRequested { grace_ms },
                }
            }
        }
    }
}

/// Join the link if needed, then connect and subscribe
async fn establish<B, L, S, D, H>(
    supervisor: &mut Supervisor<'_, B>,
    link: &mut L,
    session: &mut S,
    delay: &mut D,
    hooks: &mut H,
) -> Result<(), Stage>
where
    B: BannerSink,
    L: LinkControl,
    S: MessagingSession,
    D: DelayNs,
    H: SupervisorHooks,
{
    let params = supervisor.params();

    if !link.is_up() {
        if supervisor.on_link(false) {
            hooks.on_link(false);
            delay.delay_ms(params.link_settle_ms).await;
        }
        if let Err(e) = link.join().await {
            hooks.on_failure(Stage::Link, &e);
            return Err(Stage::Link);
        }
    }
    if supervisor.on_link(true) {
        hooks.on_link(true);
        delay.delay_ms(params.link_settle_ms).await;
    }

    if let Err(e) = session.connect().await {
        hooks.on_failure(Stage::Connect, &e);
        return Err(Stage::Connect);
    }
    if let Err(e) = session.subscribe(params.filter, params.qos).await {
        hooks.on_failure(Stage::Subscribe, &e);
        return Err(Stage::Subscribe);
    }

    Ok(())
}

/// Receive until the session or the link drops
async fn serve<B, L, S, D, H>(
    supervisor: &mut Supervisor<'_, B>,
    link: &mut L,
    session: &mut S,
    delay: &mut D,
    hooks: &mut H,
) where
    B: BannerSink,
    L: LinkControl,
    S: MessagingSession,
    D: DelayNs,
    H: SupervisorHooks,
{
    loop {
        if !link.is_up() {
            if supervisor.on_link(false) {
                hooks.on_link(false);
                delay.delay_ms(supervisor.params().link_settle_ms).await;
            }
            return;
        }

        match session.poll().await {
            Ok(SessionEvent::Message {
                topic,
                payload,
                retained,
            }) => match supervisor.on_inbound(topic, payload) {
                Ok(color) => hooks.on_message(topic, color, retained),
                Err(reason) => hooks.on_discard(topic, reason),
            },
            Ok(SessionEvent::Idle) => hooks.on_tick(),
            Err(e) => {
                hooks.on_failure(Stage::Session, &e);
                return;
            }
        }
    }
}
