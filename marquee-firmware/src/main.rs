//! Marquee - MQTT-fed LED Matrix Banner Firmware
//!
//! Main firmware binary for the Interstate75 W (RP2040 + CYW43439 + HUB75).
//! Messages published under the configured topic filter scroll across the
//! panel in a color picked by keyword.
//!
//! Core 0 runs Wi-Fi, the network stack, the MQTT supervisor and the
//! heartbeat. Core 1 runs the animation engine and the panel refresh, so a
//! slow broker never stalls a scroll. With the `single-core` feature
//! everything shares one executor.

#![no_std]
#![no_main]

extern crate alloc;

use cyw43_pio::{PioSpi, DEFAULT_CLOCK_DIVIDER};
use defmt::*;
use embassy_executor::Spawner;
use embassy_net::{Config as NetConfig, StackResources};
use embassy_rp::bind_interrupts;
use embassy_rp::clocks::RoscRng;
use embassy_rp::gpio::{Level, Output};
use embassy_rp::peripherals::{PIO0, PIO1};
use embassy_rp::pio::{InterruptHandler as PioInterruptHandler, Pio};
use embassy_time::Delay;
use rand_core::RngCore;
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use marquee_core::animation::{Animator, Timing};
use marquee_core::config::BannerConfig;
use marquee_core::session::KeywordTable;
use marquee_core::Palette;
use marquee_display::PanelSurface;
use marquee_drivers::indicator::GpioIndicator;
use marquee_drivers::mqtt::{MqttOptions, MqttSession};
use marquee_hal_rp2040::{Hub75, Hub75Timing};

use crate::channels::{BANNERS, FRONT_FRAME};
use crate::platform::{EmbassyClock, FencedHeap, HeapFence, TcpTransport, WifiLink};

mod channels;
mod config;
mod platform;
mod tasks;

// Heap allocator, fenced while a scroll is in progress
#[global_allocator]
static HEAP: FencedHeap = FencedHeap::empty();

// Heap size: 32KB
const HEAP_SIZE: usize = 32 * 1024;

/// TCP socket buffer size (each direction)
const TCP_BUFFER_SIZE: usize = 1024;

bind_interrupts!(struct Irqs {
    PIO0_IRQ_0 => PioInterruptHandler<PIO0>;
    PIO1_IRQ_0 => PioInterruptHandler<PIO1>;
});

// Static cells for configuration (must live forever for task references)
static CONFIG: StaticCell<BannerConfig> = StaticCell::new();
static PALETTE: StaticCell<Palette> = StaticCell::new();
static KEYWORDS: StaticCell<KeywordTable> = StaticCell::new();

// Wi-Fi and network stack state
static WIFI_STATE: StaticCell<cyw43::State> = StaticCell::new();
static NET_RESOURCES: StaticCell<StackResources<5>> = StaticCell::new();
static TCP_RX_BUF: StaticCell<[u8; TCP_BUFFER_SIZE]> = StaticCell::new();
static TCP_TX_BUF: StaticCell<[u8; TCP_BUFFER_SIZE]> = StaticCell::new();

#[cfg(not(feature = "single-core"))]
static CORE1_STACK: static_cell::ConstStaticCell<embassy_rp::multicore::Stack<8192>> =
    static_cell::ConstStaticCell::new(embassy_rp::multicore::Stack::new());
#[cfg(not(feature = "single-core"))]
static CORE1_EXECUTOR: StaticCell<embassy_executor::Executor> = StaticCell::new();

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Marquee firmware starting...");

    // Initialize heap allocator
    init_heap();

    // Initialize RP2040 peripherals
    let p = embassy_rp::init(Default::default());
    info!("Peripherals initialized");

    let config: &'static BannerConfig = CONFIG.init(config::load_or_default());
    let palette: &'static Palette = PALETTE.init(config.palette());
    let keywords: &'static KeywordTable = KEYWORDS.init(
        match KeywordTable::from_config(&config.keywords, palette) {
            Ok(table) => table,
            Err(e) => {
                error!("Keyword rules rejected: {:?}, coloring everything blue", e);
                KeywordTable::new(palette.blue())
            }
        },
    );
    info!("Configuration loaded");

    // Onboard RGB LED, active-low: GP17 green follows Wi-Fi, GP18 blue is the heartbeat
    let wifi_led = GpioIndicator::new_active_low(Output::new(p.PIN_17, Level::High));
    let heartbeat_led = GpioIndicator::new_active_low(Output::new(p.PIN_18, Level::High));

    // Setup PIO0 for the CYW43439 gSPI link
    // Pin assignments are fixed by the board: PWR=GP23, CS=GP25, DIO=GP24, CLK=GP29
    let fw = include_bytes!("../cyw43-firmware/43439A0.bin");
    let clm = include_bytes!("../cyw43-firmware/43439A0_clm.bin");

    let pwr = Output::new(p.PIN_23, Level::Low);
    let cs = Output::new(p.PIN_25, Level::High);
    let mut pio0 = Pio::new(p.PIO0, Irqs);
    let spi = PioSpi::new(
        &mut pio0.common,
        pio0.sm0,
        DEFAULT_CLOCK_DIVIDER,
        pio0.irq0,
        cs,
        p.PIN_24,
        p.PIN_29,
        p.DMA_CH0,
    );

    let state = WIFI_STATE.init(cyw43::State::new());
    let (net_device, mut control, runner) = cyw43::new(state, pwr, spi, fw).await;
    spawner.spawn(tasks::cyw43_task(runner)).unwrap();

    control.init(clm).await;
    control
        .set_power_management(cyw43::PowerManagementMode::PowerSave)
        .await;
    info!("CYW43439 initialized");

    // Network stack with DHCP
    let seed = RoscRng.next_u64();
    let (stack, net_runner) = embassy_net::new(
        net_device,
        NetConfig::dhcpv4(Default::default()),
        NET_RESOURCES.init(StackResources::new()),
        seed,
    );
    spawner.spawn(tasks::net_task(net_runner)).unwrap();

    let network = &config.network;
    let link = WifiLink::new(control, stack, network.ssid.as_str(), network.password.as_str());

    let transport = TcpTransport::new(
        stack,
        TCP_RX_BUF.init([0; TCP_BUFFER_SIZE]),
        TCP_TX_BUF.init([0; TCP_BUFFER_SIZE]),
        network.broker.as_str(),
        network.port,
    );
    let session = MqttSession::new(transport, Delay, EmbassyClock, MqttOptions::from(network));
    info!("Network stack initialized");

    // Setup PIO1 for the HUB75 connector
    // Interstate75 pins: R0 G0 B0 R1 G1 B1 = GP0..5, A..E = GP6..10, CLK=GP11, LAT=GP12, OE=GP13
    let Pio {
        mut common, sm0, ..
    } = Pio::new(p.PIO1, Irqs);
    let panel = Hub75::new(
        &mut common,
        sm0,
        (p.PIN_0, p.PIN_1, p.PIN_2, p.PIN_3, p.PIN_4, p.PIN_5),
        p.PIN_11,
        (p.PIN_6, p.PIN_7, p.PIN_8, p.PIN_9, p.PIN_10),
        p.PIN_12,
        p.PIN_13,
        Hub75Timing::default(),
    );
    info!("PIO HUB75 initialized");

    let animator = Animator::new(
        PanelSurface::new(&FRONT_FRAME),
        Delay,
        EmbassyClock,
        HeapFence::new(&HEAP),
        palette,
        &config.display,
        Timing::from(&config.animation),
    );

    let ctx = tasks::NetworkContext {
        config,
        palette,
        keywords,
    };

    // Spawn tasks
    spawner.spawn(tasks::heartbeat_task(heartbeat_led)).unwrap();
    spawner
        .spawn(tasks::network_task(link, session, ctx, wifi_led))
        .unwrap();

    #[cfg(not(feature = "single-core"))]
    embassy_rp::multicore::spawn_core1(p.CORE1, CORE1_STACK.take(), move || {
        let executor = CORE1_EXECUTOR.init(embassy_executor::Executor::new());
        executor.run(|spawner| {
            spawner.spawn(tasks::panel_task(panel)).unwrap();
            spawner.spawn(tasks::display_task(animator, &BANNERS)).unwrap();
        })
    });

    #[cfg(feature = "single-core")]
    {
        spawner.spawn(tasks::panel_task(panel)).unwrap();
        spawner.spawn(tasks::display_task(animator, &BANNERS)).unwrap();
    }

    info!("All tasks spawned, firmware running");

    loop {
        embassy_time::Timer::after_secs(60).await;
        trace!("Main loop heartbeat, heap {} used", HEAP.used());
    }
}

/// Initialize the heap allocator
fn init_heap() {
    use core::mem::MaybeUninit;
    static mut HEAP_MEM: [MaybeUninit<u8>; HEAP_SIZE] = [MaybeUninit::uninit(); HEAP_SIZE];
    #[allow(static_mut_refs)]
    unsafe {
        HEAP.init(HEAP_MEM.as_ptr() as usize, HEAP_SIZE)
    }
}
