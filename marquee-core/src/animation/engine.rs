use alloc::string::String;

use embedded_hal_async::delay::DelayNs;
use heapless::Vec;

use super::frame::FrameStyle;
use super::guard::ReclaimGuard;
use super::plan::{CyclePlan, Phase, Policy, Timing};
use crate::color::{Palette, Rgb};
use crate::config::DisplayConfig;
use crate::layout::WrappedLayout;
use crate::queue::{BannerSource, Message};
use crate::traits::{Clock, Reclaimer, Surface};

/// Longest phase sequence a cycle can record
pub const MAX_PHASES: usize = 8;

/// What happened during one display cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport<E> {
    /// Phases entered, in order, starting and ending with `Idle`
    pub phases: Vec<Phase, MAX_PHASES>,
    pub policy: Policy,
    /// Number of wrapped lines
    pub lines: usize,
    /// Scroll steps drawn
    pub steps: u32,
    /// First error that aborted the cycle, if any
    pub outcome: Result<(), E>,
    /// Result of returning the panel to the rest color
    pub rest: Result<(), E>,
}

impl<E> CycleReport<E> {
    fn new() -> Self {
        let mut phases = Vec::new();
        let _ = phases.push(Phase::Idle);
        Self {
            phases,
            policy: Policy::Centered,
            lines: 0,
            steps: 0,
            outcome: Ok(()),
            rest: Ok(()),
        }
    }

    fn enter(&mut self, phase: Phase) {
        let _ = self.phases.push(phase);
    }

    /// Whether the cycle passed through `phase`
    pub fn entered(&self, phase: Phase) -> bool {
        self.phases.contains(&phase)
    }

    /// Whether every phase ran without error
    pub fn is_clean(&self) -> bool {
        self.outcome.is_ok() && self.rest.is_ok()
    }
}

/// Scrolling banner animation engine
///
/// Owns the drawing surface and the timing sources. It is driven either
/// one message at a time with [`Animator::play`] or forever with
/// [`Animator::run`].
pub struct Animator<S, D, C, R> {
    surface: S,
    delay: D,
    clock: C,
    reclaimer: R,
    timing: Timing,
    style: FrameStyle,
    rest: Rgb,
    available_width: u32,
}

impl<S, D, C, R> Animator<S, D, C, R>
where
    S: Surface,
    D: DelayNs,
    C: Clock,
    R: Reclaimer,
{
    /// Create an engine for `surface`
    ///
    /// `display.horizontal_buffer` pixels are kept free, half on each side.
    pub fn new(
        surface: S,
        delay: D,
        clock: C,
        reclaimer: R,
        palette: &Palette,
        display: &DisplayConfig,
        timing: Timing,
    ) -> Self {
        let scale = display.text_scale.max(1);
        let line_height = surface.line_height(scale);
        let style = FrameStyle::new(
            palette,
            (display.horizontal_buffer / 2) as i32,
            line_height,
            scale,
        );
        let available_width = surface.width().saturating_sub(display.horizontal_buffer) as u32;

        Self {
            surface,
            delay,
            clock,
            reclaimer,
            timing,
            style,
            rest: palette.black(),
            available_width,
        }
    }

    /// Wrap `text` for this panel
    pub fn layout(&self, text: &str) -> WrappedLayout {
        let scale = self.style.scale;
        let surface = &self.surface;
        WrappedLayout::new(
            text,
            self.available_width,
            self.style.line_height as u16,
            |candidate| surface.measure_text(candidate, scale),
        )
    }

    /// Display one message through its whole cycle
    ///
    /// Never fails: errors are recorded in the report, reclamation is
    /// re-enabled and the panel is returned to the rest color regardless.
    pub async fn play(&mut self, message: &Message) -> CycleReport<S::Error> {
        let mut report = CycleReport::new();

        report.enter(Phase::Loaded);
        let layout = self.layout(&message.text);
        let plan = CyclePlan::new(layout.total_height, self.surface.height() as i32);
        report.policy = plan.policy;
        report.lines = layout.lines.len();

        report.outcome = self
            .animate(&layout.lines, &plan, message.color, &mut report)
            .await;
        report.rest = self.rest();
        report.enter(Phase::Idle);

        report
    }

    /// Display messages from `source` forever
    ///
    /// `on_cycle` sees every finished cycle, typically to log it.
    pub async fn run<B, F>(&mut self, source: &B, mut on_cycle: F) -> !
    where
        B: BannerSource,
        F: FnMut(&Message, &CycleReport<S::Error>),
    {
        loop {
            let message = source.next().await;
            let report = self.play(&message).await;
            on_cycle(&message, &report);
        }
    }

    /// Clear to the rest color and show it
    pub fn rest(&mut self) -> Result<(), S::Error> {
        self.surface.clear(self.rest)?;
        self.surface.flip()
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn reclaimer(&self) -> &R {
        &self.reclaimer
    }

    async fn animate(
        &mut self,
        lines: &[String],
        plan: &CyclePlan,
        background: Rgb,
        report: &mut CycleReport<S::Error>,
    ) -> Result<(), S::Error> {
        let mut stage = Stage {
            surface: &mut self.surface,
            delay: &mut self.delay,
            clock: &self.clock,
            timing: &self.timing,
            style: &self.style,
            lines,
            background,
            steps: 0,
        };

        let scrolled = {
            let mut guard = ReclaimGuard::new(&mut self.reclaimer);
            stage.scroll_phases(plan, &mut guard, report).await
        };
        report.steps = stage.steps;
        scrolled?;

        if self.timing.post_scroll_ms > 0 {
            report.enter(Phase::PostHold);
            stage.post_hold().await?;
        }

        Ok(())
    }
}

/// Borrowed drawing context of one cycle
struct Stage<'a, S, D, C> {
    surface: &'a mut S,
    delay: &'a mut D,
    clock: &'a C,
    timing: &'a Timing,
    style: &'a FrameStyle,
    lines: &'a [String],
    background: Rgb,
    steps: u32,
}

impl<S, D, C> Stage<'_, S, D, C>
where
    S: Surface,
    D: DelayNs,
    C: Clock,
{
    async fn scroll_phases<R: Reclaimer>(
        &mut self,
        plan: &CyclePlan,
        guard: &mut ReclaimGuard<'_, R>,
        report: &mut CycleReport<S::Error>,
    ) -> Result<(), S::Error> {
        match plan.policy {
            Policy::Continuous => {
                report.enter(Phase::Continuous);
                self.scroll(plan.continuous()).await
            }
            Policy::Centered => {
                report.enter(Phase::ScrollIn);
                self.scroll(plan.scroll_in()).await?;

                report.enter(Phase::Hold);
                guard.lift();
                self.hold(plan.center_y).await?;
                guard.reimpose();

                report.enter(Phase::ScrollOut);
                self.scroll(plan.scroll_out()).await
            }
        }
    }

    /// One pixel per step, sleeping off whatever the draw did not use
    async fn scroll<I>(&mut self, offsets: I) -> Result<(), S::Error>
    where
        I: Iterator<Item = i32>,
    {
        for y in offsets {
            let started = self.clock.now_ms();
            self.style
                .render(&mut *self.surface, self.lines, y, self.background)?;
            let cost = self.clock.now_ms().saturating_sub(started);

            self.delay.delay_ms(self.timing.step_delay(cost)).await;
            self.steps += 1;
        }
        Ok(())
    }

    async fn hold(&mut self, y: i32) -> Result<(), S::Error> {
        self.style
            .render(&mut *self.surface, self.lines, y, self.background)?;
        self.delay.delay_ms(self.timing.hold_ms).await;
        Ok(())
    }

    async fn post_hold(&mut self) -> Result<(), S::Error> {
        self.surface.clear(self.background)?;
        self.surface.flip()?;
        self.delay.delay_ms(self.timing.post_scroll_ms).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::MessageQueue;
    use crate::traits::NoReclaim;
    use alloc::rc::Rc;
    use alloc::vec::Vec as StdVec;
    use core::cell::{Cell, RefCell};
    use core::future::poll_fn;
    use core::task::Poll;
    use embassy_futures::block_on;
    use embassy_futures::select::{select, Either};
    use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

    /// Shared fake time, advanced by drawing and sleeping
    #[derive(Clone, Default)]
    struct FakeTime(Rc<Cell<u64>>);

    impl FakeTime {
        fn advance(&self, ms: u64) {
            self.0.set(self.0.get() + ms);
        }
    }

    impl Clock for FakeTime {
        fn now_ms(&self) -> u64 {
            self.0.get()
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct FlipFailed;

    #[derive(Debug, Clone, PartialEq)]
    struct Frame {
        background: Rgb,
        fills: StdVec<(String, i32, i32)>,
    }

    struct Log {
        frames: StdVec<Frame>,
        sleeps: StdVec<u32>,
    }

    /// 64x32 panel, 5 px per character, 8 px lines
    struct FakePanel {
        log: Rc<RefCell<Log>>,
        time: FakeTime,
        draw_cost_ms: u64,
        /// Flip number (1-based) that fails
        fail_at_flip: Option<usize>,
        pending: Frame,
        flips: usize,
    }

    impl FakePanel {
        fn new(log: Rc<RefCell<Log>>, time: FakeTime) -> Self {
            Self {
                log,
                time,
                draw_cost_ms: 0,
                fail_at_flip: None,
                pending: Frame {
                    background: Rgb::BLACK,
                    fills: StdVec::new(),
                },
                flips: 0,
            }
        }
    }

    impl Surface for FakePanel {
        type Error = FlipFailed;

        fn width(&self) -> u16 {
            64
        }
        fn height(&self) -> u16 {
            32
        }
        fn line_height(&self, scale: u8) -> u16 {
            8 * scale as u16
        }
        fn measure_text(&self, text: &str, scale: u8) -> u32 {
            text.chars().count() as u32 * 5 * scale as u32
        }
        fn clear(&mut self, color: Rgb) -> Result<(), FlipFailed> {
            self.pending = Frame {
                background: color,
                fills: StdVec::new(),
            };
            Ok(())
        }
        fn draw_text(
            &mut self,
            text: &str,
            x: i32,
            y: i32,
            color: Rgb,
            _scale: u8,
        ) -> Result<(), FlipFailed> {
            if color == Rgb::WHITE {
                self.pending.fills.push((String::from(text), x, y));
            }
            Ok(())
        }
        fn flip(&mut self) -> Result<(), FlipFailed> {
            self.flips += 1;
            self.time.advance(self.draw_cost_ms);
            if self.fail_at_flip == Some(self.flips) {
                return Err(FlipFailed);
            }
            self.log.borrow_mut().frames.push(self.pending.clone());
            Ok(())
        }
    }

    struct FakeDelay {
        log: Rc<RefCell<Log>>,
        time: FakeTime,
    }

    impl DelayNs for FakeDelay {
        async fn delay_ns(&mut self, ns: u32) {
            self.time.advance(ns as u64 / 1_000_000);
        }

        async fn delay_ms(&mut self, ms: u32) {
            self.log.borrow_mut().sleeps.push(ms);
            self.time.advance(ms as u64);
        }
    }

    type TestAnimator = Animator<FakePanel, FakeDelay, FakeTime, NoReclaim>;

    fn animator(post_scroll_ms: u32) -> (TestAnimator, Rc<RefCell<Log>>) {
        let log = Rc::new(RefCell::new(Log {
            frames: StdVec::new(),
            sleeps: StdVec::new(),
        }));
        let time = FakeTime::default();
        let panel = FakePanel::new(log.clone(), time.clone());
        let delay = FakeDelay {
            log: log.clone(),
            time: time.clone(),
        };
        let timing = Timing {
            step_interval_ms: 60,
            min_step_delay_ms: 1,
            hold_ms: 5000,
            post_scroll_ms,
        };
        let display = DisplayConfig::default();
        let animator = Animator::new(
            panel,
            delay,
            time,
            NoReclaim::new(),
            &Palette::default(),
            &display,
            timing,
        );
        (animator, log)
    }

    #[test]
    fn test_short_message_full_cycle() {
        let (mut animator, log) = animator(0);
        let report = block_on(animator.play(&Message::new("Hello World", Rgb::BLUE)));

        assert_eq!(report.lines, 1);
        assert_eq!(report.policy, Policy::Centered);
        assert_eq!(
            report.phases.as_slice(),
            &[
                Phase::Idle,
                Phase::Loaded,
                Phase::ScrollIn,
                Phase::Hold,
                Phase::ScrollOut,
                Phase::Idle
            ]
        );
        assert!(report.is_clean());

        let log = log.borrow();
        // Text starts just below the panel and is drawn inset by half the buffer
        let first = &log.frames[0];
        assert_eq!(first.background, Rgb::BLUE);
        assert_eq!(first.fills, [(String::from("Hello World"), 2, 32)]);

        // The hold frame is centered: (32 - 8) / 2
        assert!(log.sleeps.contains(&5000));
        assert!(log
            .frames
            .iter()
            .any(|f| f.fills.first().map(|fill| fill.2) == Some(12)));

        // Final visible state is the rest color with nothing drawn
        let last = log.frames.last().unwrap();
        assert_eq!(last.background, Rgb::BLACK);
        assert!(last.fills.is_empty());
        assert!(!animator.reclaimer().is_suspended());
    }

    #[test]
    fn test_tall_message_never_holds() {
        let (mut animator, log) = animator(0);
        let text = "one two three four five six seven eight nine ten eleven twelve";
        let report = block_on(animator.play(&Message::new(text, Rgb::RED)));

        assert!(report.lines * 8 > 32);
        assert_eq!(report.policy, Policy::Continuous);
        assert!(report.entered(Phase::Continuous));
        assert!(!report.entered(Phase::Hold));
        assert!(!log.borrow().sleeps.contains(&5000));
    }

    #[test]
    fn test_post_hold_shows_background() {
        let (mut animator, log) = animator(2000);
        let report = block_on(animator.play(&Message::new("News", Rgb::RED)));

        assert!(report.entered(Phase::PostHold));
        let log = log.borrow();
        let frames = &log.frames;
        let post = &frames[frames.len() - 2];
        assert_eq!(post.background, Rgb::RED);
        assert!(post.fills.is_empty());
        assert_eq!(log.sleeps.last(), Some(&2000));
    }

    #[test]
    fn test_steps_compensate_draw_cost() {
        let (mut animator, log) = animator(0);
        animator.surface.draw_cost_ms = 15;
        let report = block_on(animator.play(&Message::new("Hi", Rgb::GREEN)));

        let log = log.borrow();
        let step_sleeps: StdVec<u32> = log.sleeps.iter().copied().filter(|&s| s != 5000).collect();
        assert_eq!(step_sleeps.len() as u32, report.steps);
        assert!(step_sleeps.iter().all(|&s| s == 45));
    }

    #[test]
    fn test_slow_draw_hits_floor() {
        let (mut animator, log) = animator(0);
        animator.surface.draw_cost_ms = 90;
        block_on(animator.play(&Message::new("Hi", Rgb::GREEN)));

        assert!(log
            .borrow()
            .sleeps
            .iter()
            .filter(|&&s| s != 5000)
            .all(|&s| s == 1));
    }

    #[test]
    fn test_rest_is_idempotent() {
        let (mut animator, log) = animator(0);
        animator.rest().unwrap();
        animator.rest().unwrap();

        let log = log.borrow();
        assert_eq!(log.frames.len(), 2);
        assert_eq!(log.frames[0], log.frames[1]);
    }

    #[test]
    fn test_fault_mid_scroll_out_recovers() {
        let (mut animator, log) = animator(0);
        // 20 scroll-in frames, 1 hold frame, then fail inside scroll-out
        animator.surface.fail_at_flip = Some(25);

        let report = block_on(animator.play(&Message::new("Oops", Rgb::YELLOW)));
        assert_eq!(report.outcome, Err(FlipFailed));
        assert!(report.rest.is_ok());
        assert_eq!(report.phases.last(), Some(&Phase::Idle));
        assert!(report.entered(Phase::ScrollOut));
        assert!(!animator.reclaimer().is_suspended());
        assert_eq!(log.borrow().frames.last().unwrap().background, Rgb::BLACK);

        // The next message still plays through
        let report = block_on(animator.play(&Message::new("Next", Rgb::BLUE)));
        assert!(report.is_clean());
    }

    #[test]
    fn test_run_keeps_going_after_fault() {
        let (mut animator, log) = animator(0);
        animator.surface.fail_at_flip = Some(25);

        let queue: MessageQueue<CriticalSectionRawMutex> = MessageQueue::new();
        queue.enqueue(Message::new("Broken", Rgb::YELLOW));
        queue.enqueue(Message::new("Shown", Rgb::GREEN));

        let cycles = Cell::new(0);
        let outcomes = RefCell::new(StdVec::new());
        let runner = animator.run(&queue, |message, report| {
            outcomes
                .borrow_mut()
                .push((message.text.clone(), report.outcome.is_ok()));
            cycles.set(cycles.get() + 1);
        });
        let both_played = poll_fn(|cx| {
            if cycles.get() >= 2 {
                Poll::Ready(())
            } else {
                cx.waker().wake_by_ref();
                Poll::Pending
            }
        });

        match block_on(select(runner, both_played)) {
            Either::First(never) => never,
            Either::Second(()) => {}
        }

        assert_eq!(
            outcomes.into_inner(),
            [(String::from("Broken"), false), (String::from("Shown"), true)]
        );
        let log = log.borrow();
        assert!(log
            .frames
            .iter()
            .any(|f| f.background == Rgb::GREEN && !f.fills.is_empty()));
    }
}
