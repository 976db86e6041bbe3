//! Frame loop abstraction.
//!
//! The host owns the real frame clock (a display refresh, a timer thread, a
//! test loop). The engine only tells it when frames are wanted and expects the
//! host to call the owner's `on_frame` while they are.

/// Host hook for starting and stopping frame delivery.
pub trait TickDriver {
    /// Frames are wanted from now on.
    fn request_frames(&mut self);
    /// No more frames are wanted.
    fn cancel_frames(&mut self);
}

/// Driver for hosts that poll [`FrameLoop::is_active`] themselves.
#[derive(Debug, Default)]
pub struct ManualDriver;

impl TickDriver for ManualDriver {
    fn request_frames(&mut self) {}
    fn cancel_frames(&mut self) {}
}

/// Idempotent on/off wrapper around a driver.
pub struct FrameLoop {
    driver: Box<dyn TickDriver>,
    active: bool,
}

impl FrameLoop {
    pub fn new(driver: Box<dyn TickDriver>) -> Self {
        Self { driver, active: false }
    }

    pub fn start(&mut self) {
        if !self.active {
            self.active = true;
            self.driver.request_frames();
        }
    }

    pub fn stop(&mut self) {
        if self.active {
            self.active = false;
            self.driver.cancel_frames();
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Swap in a different driver, carrying the current on/off state over.
    pub fn set_driver(&mut self, driver: Box<dyn TickDriver>) {
        let was_active = self.active;
        self.stop();
        self.driver = driver;
        if was_active {
            self.start();
        }
    }
}

impl Default for FrameLoop {
    fn default() -> Self {
        Self::new(Box::new(ManualDriver))
    }
}
