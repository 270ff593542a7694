use crate::traits::Reclaimer;

/// Scope guard keeping reclamation suspended while pixels move
///
/// Creating the guard forces a pass and suspends. Dropping it restores the
/// suspension state found at creation and runs a final pass, on every exit
/// path including early returns through `?`.
pub struct ReclaimGuard<'a, R: Reclaimer> {
    reclaimer: &'a mut R,
    was_suspended: bool,
}

impl<'a, R: Reclaimer> ReclaimGuard<'a, R> {
    /// Force a pass, then suspend
    pub fn new(reclaimer: &'a mut R) -> Self {
        let was_suspended = reclaimer.is_suspended();
        reclaimer.collect();
        reclaimer.suspend();
        Self {
            reclaimer,
            was_suspended,
        }
    }

    /// Re-enable reclamation for a static stretch (the hold)
    pub fn lift(&mut self) {
        self.reclaimer.resume();
    }

    /// Force a pass and suspend again before the next scroll
    pub fn reimpose(&mut self) {
        self.reclaimer.collect();
        self.reclaimer.suspend();
    }

    pub fn is_suspended(&self) -> bool {
        self.reclaimer.is_suspended()
    }
}

impl<R: Reclaimer> Drop for ReclaimGuard<'_, R> {
    fn drop(&mut self) {
        if !self.was_suspended {
            self.reclaimer.resume();
        }
        self.reclaimer.collect();
    }
}
