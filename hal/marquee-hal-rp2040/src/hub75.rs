//! PIO-driven HUB75 panel refresh
//!
//! One state machine shifts column data: each autopulled word carries four
//! columns of six colour bits, clocked out on the CLK side-set pin. Row
//! selection, latch and output enable are plain GPIO toggled between rows.
//!
//! A refresh pass walks every row pair and every bit plane:
//! shift plane -> blank -> select row -> latch -> light for the plane weight.

use embassy_rp::gpio::{Level, Output, Pin};
use embassy_rp::pio::{
    Common, Config, Direction as PioDirection, FifoJoin, Instance, PioPin, ShiftConfig,
    ShiftDirection, StateMachine,
};
use embassy_rp::Peri;
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_time::{block_for, Duration, Timer};
use fixed::types::U24F8;
use marquee_display::bitplane::COLUMNS_PER_WORD;
use marquee_display::{pack_row, DisplayError, SharedFrame, BIT_PLANES};

use crate::timing::{calc_clock_divider, Hub75Timing};

/// Widest chain of panels the row buffer holds
pub const MAX_COLUMNS: usize = 256;

/// Five address lines select one of 32 row pairs
pub const MAX_ROW_PAIRS: usize = 32;

/// On-times shorter than this are busy-waited; the executor cannot wake that fast
const BUSY_WAIT_LIMIT_US: u32 = 32;

const ROW_WORDS: usize = MAX_COLUMNS / COLUMNS_PER_WORD;

/// HUB75 driver errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Hub75Error {
    /// Frame is wider than [`MAX_COLUMNS`] or taller than `2 * MAX_ROW_PAIRS`
    FrameTooLarge,
    /// Bit-plane packing failed
    Display(DisplayError),
}

impl From<DisplayError> for Hub75Error {
    fn from(e: DisplayError) -> Self {
        Hub75Error::Display(e)
    }
}

/// HUB75 panel driver
pub struct Hub75<'d, PIO: Instance, const SM: usize> {
    sm: StateMachine<'d, PIO, SM>,
    /// Row address lines A..E
    addr: [Output<'d>; 5],
    latch: Output<'d>,
    /// Output enable, active low
    oe: Output<'d>,
    timing: Hub75Timing,
    words: [u32; ROW_WORDS],
    frames: u32,
}

impl<'d, PIO: Instance, const SM: usize> Hub75<'d, PIO, SM> {
    /// Create a new HUB75 driver
    ///
    /// # Arguments
    /// * `common` - PIO common resources (for loading program)
    /// * `sm` - State machine to use
    /// * `data` - R0 G0 B0 R1 G1 B1, must be consecutive GPIOs
    /// * `clk` - Shift clock (side-set)
    /// * `addr` - Row address lines A..E
    /// * `lat` - Latch
    /// * `oe` - Output enable (active low)
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        common: &mut Common<'d, PIO>,
        mut sm: StateMachine<'d, PIO, SM>,
        data: (
            Peri<'d, impl PioPin>,
            Peri<'d, impl PioPin>,
            Peri<'d, impl PioPin>,
            Peri<'d, impl PioPin>,
            Peri<'d, impl PioPin>,
            Peri<'d, impl PioPin>,
        ),
        clk: Peri<'d, impl PioPin>,
        addr: (
            Peri<'d, impl Pin>,
            Peri<'d, impl Pin>,
            Peri<'d, impl Pin>,
            Peri<'d, impl Pin>,
            Peri<'d, impl Pin>,
        ),
        lat: Peri<'d, impl Pin>,
        oe: Peri<'d, impl Pin>,
        timing: Hub75Timing,
    ) -> Self {
        // Four 8-bit columns per autopulled word: six data bits with CLK low,
        // then two discarded bits with CLK high so the panel samples on the rising edge
        let prg = pio::pio_asm!(
            ".side_set 1",
            ".wrap_target",
            "out pins, 6 side 0",
            "out null, 2 side 1",
            ".wrap"
        );
        let installed = common.load_program(&prg.program);

        let r0 = common.make_pio_pin(data.0);
        let g0 = common.make_pio_pin(data.1);
        let b0 = common.make_pio_pin(data.2);
        let r1 = common.make_pio_pin(data.3);
        let g1 = common.make_pio_pin(data.4);
        let b1 = common.make_pio_pin(data.5);
        let clk = common.make_pio_pin(clk);

        let mut cfg = Config::default();
        cfg.use_program(&installed, &[&clk]);
        cfg.set_out_pins(&[&r0, &g0, &b0, &r1, &g1, &b1]);
        cfg.shift_out = ShiftConfig {
            auto_fill: true,
            threshold: 32,
            direction: ShiftDirection::Right,
        };
        cfg.fifo_join = FifoJoin::TxOnly;

        let (int_div, frac_div) = calc_clock_divider(timing.shift_hz);
        cfg.clock_divider = U24F8::from_bits(((int_div as u32) << 8) | frac_div as u32);

        sm.set_config(&cfg);
        sm.set_pin_dirs(PioDirection::Out, &[&r0, &g0, &b0, &r1, &g1, &b1, &clk]);
        sm.set_enable(true);

        Self {
            sm,
            addr: [
                Output::new(addr.0, Level::Low),
                Output::new(addr.1, Level::Low),
                Output::new(addr.2, Level::Low),
                Output::new(addr.3, Level::Low),
                Output::new(addr.4, Level::Low),
            ],
            latch: Output::new(lat, Level::Low),
            // Start blanked
            oe: Output::new(oe, Level::High),
            timing,
            words: [0; ROW_WORDS],
            frames: 0,
        }
    }

    pub fn timing(&self) -> &Hub75Timing {
        &self.timing
    }

    /// Completed refresh passes
    pub fn frames(&self) -> u32 {
        self.frames
    }

    /// Turn every LED off
    pub fn blank(&mut self) {
        self.oe.set_high();
    }

    /// Show `frame` once, all row pairs and bit planes
    ///
    /// The shared frame is only locked while a single row plane is packed,
    /// so the animation side can flip at any time.
    pub async fn refresh<M: RawMutex, const W: usize, const H: usize>(
        &mut self,
        frame: &SharedFrame<M, W, H>,
    ) -> Result<(), Hub75Error> {
        if W > MAX_COLUMNS || H / 2 > MAX_ROW_PAIRS {
            return Err(Hub75Error::FrameTooLarge);
        }
        let words = W.div_ceil(COLUMNS_PER_WORD);

        for row in 0..H / 2 {
            for plane in self.timing.first_plane()..BIT_PLANES {
                let buf = &mut self.words[..words];
                frame.with(|f| pack_row(f, row, plane, buf))?;
                self.shift(words);

                self.oe.set_high();
                self.select_row(row);
                self.latch.set_high();
                self.latch.set_low();
                self.oe.set_low();

                let on_us = self.timing.plane_on_us(plane);
                if on_us < BUSY_WAIT_LIMIT_US {
                    block_for(Duration::from_micros(on_us as u64));
                } else {
                    Timer::after_micros(on_us as u64).await;
                }
            }
        }
        self.oe.set_high();
        self.frames = self.frames.wrapping_add(1);
        Ok(())
    }

    /// Refresh forever
    pub async fn run<M: RawMutex, const W: usize, const H: usize>(
        &mut self,
        frame: &SharedFrame<M, W, H>,
    ) -> Hub75Error {
        loop {
            if let Err(e) = self.refresh(frame).await {
                self.blank();
                return e;
            }
        }
    }

    /// Push one packed row into the shifter and wait until it is clocked out
    fn shift(&mut self, words: usize) {
        let tx = self.sm.tx();
        for &word in &self.words[..words] {
            while !tx.try_push(word) {}
        }
        while !tx.empty() {}
        // TXSTALL stays asserted while the machine waits on autopull, so a
        // stale flag from mid-row is cleared and the final stall awaited
        let _ = tx.stalled();
        while !tx.stalled() {}
    }

    fn select_row(&mut self, row: usize) {
        for (bit, line) in self.addr.iter_mut().enumerate() {
            line.set_level(Level::from(row & (1 << bit) != 0));
        }
    }
}
