use tokio::{
    select,
    time::{MissedTickBehavior, interval},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, trace_span};

use crate::{
    device::DeviceSession,
    devices_manager::format_speeds,
    fan_curve::HysteresisController,
    gpu_device::{DeviceError, GpuBackend},
};

// Periodically read the temperature of every GPU and drive
// its fans according to the hysteresis controller.
//
// The manager owns all the device sessions, a sweep over every device
// is done to completion before the next one can start.
pub struct FanManager<B: GpuBackend> {
    backend: B,
    controller: HysteresisController,

    sessions: Vec<DeviceSession>,

    // Hand the fans back to the driver when quitting
    restore_auto_on_exit: bool,
}

impl<B: GpuBackend> FanManager<B> {
    pub fn new(
        backend: B,
        controller: HysteresisController,
        sessions: Vec<DeviceSession>,
    ) -> Self {
        Self {
            backend,
            controller,
            sessions,
            restore_auto_on_exit: true,
        }
    }

    pub fn with_restore_auto(mut self, restore: bool) -> Self {
        self.restore_auto_on_exit = restore;
        self
    }

    pub fn sessions(&self) -> &[DeviceSession] {
        &self.sessions
    }

    // Run the fan manager until the token is cancelled.
    // Ticks that are missed while a sweep is still running are
    // skipped rather than queued. The backend is handed back on exit
    pub async fn run(mut self, run_token: CancellationToken) -> B {
        let period = self.controller.table().sample_interval();

        info!("Fan manager: Running, update every {:?}", period);

        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            select! {
                biased;

                _ = run_token.cancelled() => {
                    info!("Fan manager: Quiting");

                    break;
                },
                _ = ticker.tick() => {
                    self.tick();
                }
            }
        }

        if self.restore_auto_on_exit {
            self.restore_auto();
        }

        self.backend
    }

    // Update the fan speed of all the GPUs as needed
    pub fn tick(&mut self) {
        let _span = trace_span!("tick").entered();

        for session in self.sessions.iter_mut() {
            Self::update_device(&self.backend, &self.controller, session);
        }
    }

    // Read the device temperature and apply the committed speed to
    // every fan not already running at it. Failures are logged and
    // leave the fan state as it was
    fn update_device(
        backend: &B,
        controller: &HysteresisController,
        session: &mut DeviceSession,
    ) {
        let index = session.index();

        let temp = match backend.temperature(index) {
            Ok(temp) => temp,
            Err(err) => {
                error!(
                    "Failed to get temperature for {session}: {err}. Skipping cycle"
                );
                return;
            }
        };

        let previous_band = session.active_band().copied();
        let target = controller.update(session, temp);

        let fans = session.fans_out_of_date(target);
        if fans.is_empty() {
            trace!("{session}: temp {temp}°C, speed {} unchanged", target.get());
            return;
        }

        // The first fan carries the device speed the band is judged against
        let first_fan_pending = fans.first() == Some(&0);
        let mut updated = Vec::with_capacity(fans.len());

        for fan in fans {
            // Not every board lets the policy be changed,
            // the speed write is still attempted in that case
            match backend.set_manual_policy(index, fan) {
                Ok(()) => {}
                Err(DeviceError::NotSupported) => {
                    debug!("{session} fan {fan}: manual policy not supported");
                }
                Err(err) => {
                    error!(
                        "Failed to set manual policy for {session} fan {fan}: {err}"
                    );
                    continue;
                }
            }

            if let Err(err) = backend.set_fan_speed(index, fan, target) {
                error!(
                    "Failed to set speed for {session} fan {fan} to {}%: {err}",
                    target.get()
                );
                continue;
            }

            session.record_speed(fan, target);
            updated.push(fan);
        }

        // The first fan kept its old speed, forget the band change
        // so the next tick tries again from the same state
        if first_fan_pending && updated.first() != Some(&0) {
            session.set_active_band(previous_band);
        }

        if updated.is_empty() {
            return;
        }

        let speeds = updated
            .iter()
            .filter_map(|fan| session.current_speeds().get(*fan as usize).copied())
            .collect::<Vec<_>>();

        info!(
            "Updated {session}: fans {updated:?}: temp {temp}°C, new speeds {}",
            format_speeds(&speeds)
        );
    }

    // Give every fan back to the driver automatic control
    fn restore_auto(&self) {
        for session in self.sessions.iter() {
            let mut restored = 0;

            for fan in 0..session.fan_count() {
                match self.backend.set_auto_policy(session.index(), fan) {
                    Ok(()) => restored += 1,
                    Err(DeviceError::NotSupported) => {
                        debug!("{session} fan {fan}: automatic policy not supported");
                    }
                    Err(err) => {
                        error!(
                            "Failed to restore automatic policy for {session} fan {fan}: {err}"
                        );
                    }
                }
            }

            info!(
                "Restored automatic control on {restored}/{} fan(s) of {session}",
                session.fan_count()
            );
        }
    }
}
