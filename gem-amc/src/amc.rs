use crate::{RegisterBus, config::Config, sca::Sca, ttc::Ttc};

/// One AMC card behind a register bus.
#[derive(Debug)]
pub struct Amc<B: RegisterBus> {
    bus: B,
    config: Config,
}

impl<B: RegisterBus> Amc<B> {
    pub fn new(bus: B, config: Config) -> Amc<B> {
        Amc { bus, config }
    }

    /// The SCA slow-control block
    pub fn sca(&mut self) -> Sca<'_, B> {
        Sca::new(&mut self.bus)
    }

    /// The TTC block
    pub fn ttc(&mut self) -> Ttc<'_, B> {
        Ttc::new(&mut self.bus, &self.config)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    pub fn into_inner(self) -> B {
        self.bus
    }
}
