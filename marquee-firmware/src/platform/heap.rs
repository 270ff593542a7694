//! Heap fence around the global allocator
//!
//! The heap is a plain linked-list allocator with no collector, so
//! "reclamation" here means watching the heap: while the animation engine
//! has reclamation suspended, every allocation made from its core is
//! counted and reported when the fence is lifted. Scrolling is expected to
//! run without touching the heap.
//!
//! With `single-core` the network tasks share the animation core, so
//! inbound banners allocated mid-scroll land in the count too. The count is
//! only an upper bound there and is logged at debug level.

use core::alloc::{GlobalAlloc, Layout};

use defmt::*;
use embassy_rp::multicore::{current_core, CoreId};
use embedded_alloc::LlffHeap;
use portable_atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};

use marquee_core::traits::Reclaimer;

/// Global allocator that can count allocations from one core
pub struct FencedHeap {
    heap: LlffHeap,
    armed: AtomicBool,
    /// Core the fence applies to
    owner: AtomicU8,
    fenced: AtomicU32,
}

fn core_index() -> u8 {
    match current_core() {
        CoreId::Core0 => 0,
        CoreId::Core1 => 1,
    }
}

impl FencedHeap {
    pub const fn empty() -> Self {
        Self {
            heap: LlffHeap::empty(),
            armed: AtomicBool::new(false),
            owner: AtomicU8::new(0),
            fenced: AtomicU32::new(0),
        }
    }

    /// Hand the heap its memory
    ///
    /// # Safety
    ///
    /// Must be called once, before the first allocation, with a region that
    /// is valid and otherwise unused for the rest of the program.
    pub unsafe fn init(&self, start: usize, size: usize) {
        self.heap.init(start, size)
    }

    pub fn used(&self) -> usize {
        self.heap.used()
    }

    pub fn free(&self) -> usize {
        self.heap.free()
    }

    /// Start counting allocations made from the calling core
    fn arm(&self) {
        self.owner.store(core_index(), Ordering::SeqCst);
        self.fenced.store(0, Ordering::SeqCst);
        self.armed.store(true, Ordering::SeqCst);
    }

    /// Stop counting; returns allocations seen since [`FencedHeap::arm`]
    fn disarm(&self) -> u32 {
        self.armed.store(false, Ordering::SeqCst);
        self.fenced.swap(0, Ordering::SeqCst)
    }

    fn is_armed(&self) -> bool {
        self.armed.load(Ordering::SeqCst)
    }
}

unsafe impl GlobalAlloc for FencedHeap {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        if self.armed.load(Ordering::Relaxed) && self.owner.load(Ordering::Relaxed) == core_index() {
            self.fenced.fetch_add(1, Ordering::Relaxed);
        }
        self.heap.alloc(layout)
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        self.heap.dealloc(ptr, layout)
    }
}

/// Reclaimer handed to the animation engine
pub struct HeapFence {
    heap: &'static FencedHeap,
    /// Heap usage at the last collect
    last_used: usize,
    /// Allocations made inside fenced windows since boot
    fenced_total: u32,
}

impl HeapFence {
    pub fn new(heap: &'static FencedHeap) -> Self {
        Self {
            heap,
            last_used: heap.used(),
            fenced_total: 0,
        }
    }

    pub fn last_used(&self) -> usize {
        self.last_used
    }

    pub fn fenced_allocations(&self) -> u32 {
        self.fenced_total
    }
}

impl Reclaimer for HeapFence {
    fn collect(&mut self) {
        self.last_used = self.heap.used();
        trace!("heap: {} used, {} free", self.last_used, self.heap.free());
    }

    fn suspend(&mut self) {
        self.heap.arm();
    }

    fn resume(&mut self) {
        let count = self.heap.disarm();
        if count > 0 {
            self.fenced_total = self.fenced_total.saturating_add(count);
            #[cfg(not(feature = "single-core"))]
            warn!("{} heap allocations while scrolling", count);
            #[cfg(feature = "single-core")]
            debug!("{} heap allocations on the shared core while scrolling", count);
        }
    }

    fn is_suspended(&self) -> bool {
        self.heap.is_armed()
    }
}
