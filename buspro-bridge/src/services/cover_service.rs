use std::sync::Arc;
use std::time::Duration;

use buspro_api::{Command, CommandChannel, DeviceAddress};
use tokio::sync::{Mutex, broadcast};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use uuid::Uuid;

use crate::configs::AccessoryStore;
use crate::configs::settings::CurtainDevice;
use crate::errors::DeviceError;
use crate::models::{AccessoryContext, CoverState, CurtainCodes, MotionState};

const MIN_TICK: Duration = Duration::from_millis(1);

#[derive(Debug, Clone)]
pub struct CoverConfig {
    pub name: String,
    pub address: DeviceAddress,
    pub curtain: u8,
    pub codes: CurtainCodes,
    /// Time for a full 0 to 100 traverse
    pub travel: Duration,
    pub precision: u8,
}

impl From<&CurtainDevice> for CoverConfig {
    fn from(device: &CurtainDevice) -> Self {
        Self {
            name: device.name.clone(),
            address: device.address,
            curtain: device.curtain,
            codes: CurtainCodes::new(device.nc),
            travel: Duration::try_from_secs_f64(device.duration).unwrap_or(Duration::ZERO),
            precision: device.precision,
        }
    }
}

/// Dead reckoning position estimator for one curtain motor.
///
/// The motor only reports when it starts opening, starts closing or stops.
/// Between those reports the position is advanced one point per
/// `travel / 100`, and a partial move is ended by posting a stop command once
/// the estimated distance has been covered.
#[derive(Clone)]
pub struct Cover {
    inner: Arc<CoverInner>,
}

struct CoverInner {
    id: Uuid,
    config: CoverConfig,
    bus: Arc<dyn CommandChannel>,
    store: Arc<dyn AccessoryStore>,
    runtime: Mutex<CoverRuntime>,
}

struct CoverRuntime {
    state: CoverState,
    ticker: Option<JoinHandle<()>>,
    stopper: Option<JoinHandle<()>>,
}

impl CoverRuntime {
    fn cancel_ticker(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
    }

    fn cancel_stopper(&mut self) {
        if let Some(stopper) = self.stopper.take() {
            stopper.abort();
        }
    }
}

impl Cover {
    /// Creates the estimator, resuming from the persisted positions
    pub async fn new(
        id: Uuid,
        config: CoverConfig,
        bus: Arc<dyn CommandChannel>,
        store: Arc<dyn AccessoryStore>,
    ) -> Self {
        let context = match store.load(&id).await {
            Ok(context) => context.unwrap_or_default(),
            Err(e) => {
                tracing::error!("failed to restore {}: {}", config.name, e);
                AccessoryContext::default()
            }
        };

        let state = CoverState::new(
            context.current_position.unwrap_or(0),
            context.target_position.unwrap_or(0),
        );

        Self {
            inner: Arc::new(CoverInner {
                id,
                config,
                bus,
                store,
                runtime: Mutex::new(CoverRuntime {
                    state,
                    ticker: None,
                    stopper: None,
                }),
            }),
        }
    }

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    pub fn name(&self) -> &str {
        &self.inner.config.name
    }

    pub async fn state(&self) -> CoverState {
        self.inner.runtime.lock().await.state
    }

    pub async fn current_position(&self) -> u8 {
        self.state().await.current_position
    }

    pub async fn target_position(&self) -> u8 {
        self.state().await.target_position
    }

    pub async fn motion(&self) -> MotionState {
        self.state().await.motion
    }

    /// Asks the device to report the curtain status
    pub fn query_status(&self) {
        let config = &self.inner.config;
        self.inner.bus.post(
            config.address,
            Command::ReadCurtainStatus {
                curtain: config.curtain,
            },
        );
    }

    /// Feeds the raw status stream of this curtain into the estimator
    pub fn attach(&self, mut updates: broadcast::Receiver<u8>) -> JoinHandle<()> {
        let this = Arc::downgrade(&self.inner);

        tokio::spawn(async move {
            loop {
                match updates.recv().await {
                    Ok(status) => {
                        let Some(inner) = this.upgrade() else { break };
                        inner.on_status(status).await;
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!("cover status stream lagged, {} reports skipped", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    pub async fn on_status(&self, raw: u8) {
        self.inner.on_status(raw).await;
    }

    /// Records a new target and commands the motor towards it.
    ///
    /// The traversal itself is planned when the device reports the resulting
    /// motion. If the command fails the previous target is restored.
    pub async fn set_target(&self, position: u8) -> Result<(), DeviceError> {
        if position > 100 {
            return Err(DeviceError::OutOfRange {
                field: "target_position",
                value: position as i64,
            });
        }

        let inner = &self.inner;
        let config = &inner.config;

        let (previous, motion) = {
            let mut runtime = inner.runtime.lock().await;
            let previous = runtime.state.target_position;
            let motion = runtime.state.direction_to(position);
            runtime.state.target_position = position;
            inner.persist(&runtime.state).await;
            (previous, motion)
        };

        tracing::debug!("commanded {:?} of {} towards {}%", motion, config.name, position);

        let command = Command::CurtainControl {
            curtain: config.curtain,
            status: config.codes.code(motion),
        };

        match inner.bus.send(config.address, command).await {
            Ok(_) => Ok(()),
            Err(source) => {
                let mut runtime = inner.runtime.lock().await;
                // Status reports that arrived meanwhile take precedence
                if runtime.state.target_position == position {
                    runtime.state.target_position = previous;
                    inner.persist(&runtime.state).await;
                }

                tracing::error!("error setting target position for {}: {}", config.name, source);

                Err(DeviceError::CommandFailed {
                    device: config.address,
                    source,
                })
            }
        }
    }
}

impl CoverInner {
    async fn on_status(self: &Arc<Self>, raw: u8) {
        let Some(motion) = self.config.codes.motion(raw) else {
            tracing::warn!("{} reported unknown curtain status {}", self.config.name, raw);
            return;
        };

        let mut runtime = self.runtime.lock().await;
        runtime.cancel_ticker();

        let state = &mut runtime.state;
        if state.current_position.abs_diff(state.target_position) <= self.config.precision {
            state.current_position = state.target_position;
        }

        match motion {
            MotionState::Stopped => {
                runtime.cancel_stopper();
                runtime.state.target_position = runtime.state.current_position;
                runtime.state.motion = MotionState::Stopped;

                tracing::debug!(
                    "{} stopped at {}%",
                    self.config.name,
                    runtime.state.current_position
                );
            }
            MotionState::Opening | MotionState::Closing => {
                self.plan_traversal(&mut runtime, motion);
            }
        }

        self.persist(&runtime.state).await;
    }

    fn plan_traversal(self: &Arc<Self>, runtime: &mut CoverRuntime, motion: MotionState) {
        runtime.cancel_stopper();
        runtime.state.motion = motion;
        runtime.ticker = Some(self.spawn_ticker(motion));

        let state = &mut runtime.state;
        let (current, target) = (state.current_position, state.target_position);

        if state.is_full_run(motion) {
            state.target_position = if motion == MotionState::Opening { 100 } else { 0 };

            tracing::debug!(
                "starting full {:?} of {} (from {} to {})",
                motion,
                self.config.name,
                current,
                target
            );
        } else {
            let distance = current.abs_diff(target);
            let delay = self.config.travel.mul_f64(distance as f64 / 100.0);

            tracing::debug!(
                "starting partial {:?} of {} (from {} to {}), stop in {:?}",
                motion,
                self.config.name,
                current,
                target,
                delay
            );

            runtime.stopper = Some(self.spawn_stopper(delay));
        }
    }

    fn tick_period(&self) -> Duration {
        (self.config.travel / 100).max(MIN_TICK)
    }

    fn spawn_ticker(self: &Arc<Self>, motion: MotionState) -> JoinHandle<()> {
        let this = Arc::downgrade(self);
        let period = self.tick_period();

        tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + period, period);

            loop {
                interval.tick().await;

                let Some(inner) = this.upgrade() else { break };
                let mut runtime = inner.runtime.lock().await;
                let state = &mut runtime.state;

                match motion {
                    MotionState::Opening if state.current_position < 100 => {
                        state.current_position += 1;
                    }
                    MotionState::Closing if state.current_position > 0 => {
                        state.current_position -= 1;
                    }
                    _ => {}
                }

                let at_bound = matches!(
                    (motion, state.current_position),
                    (MotionState::Opening, 100) | (MotionState::Closing, 0)
                );
                if at_bound {
                    state.motion = MotionState::Stopped;
                    runtime.ticker = None;
                }

                inner.persist(&runtime.state).await;

                if at_bound {
                    break;
                }
            }
        })
    }

    fn spawn_stopper(self: &Arc<Self>, delay: Duration) -> JoinHandle<()> {
        let this = Arc::downgrade(self);

        tokio::spawn(async move {
            time::sleep(delay).await;

            let Some(inner) = this.upgrade() else { return };
            let mut runtime = inner.runtime.lock().await;
            let config = &inner.config;

            inner.post_stop();
            runtime.cancel_ticker();
            runtime.stopper = None;
            runtime.state.current_position = runtime.state.target_position;
            runtime.state.motion = MotionState::Stopped;

            tracing::debug!(
                "reached partial position of {} at {}%",
                config.name,
                runtime.state.target_position
            );

            inner.persist(&runtime.state).await;
        })
    }

    fn post_stop(&self) {
        self.bus.post(
            self.config.address,
            Command::CurtainControl {
                curtain: self.config.curtain,
                status: self.config.codes.stop,
            },
        );
    }

    async fn persist(&self, state: &CoverState) {
        let context = AccessoryContext {
            current_position: Some(state.current_position),
            target_position: Some(state.target_position),
            last_color: None,
        };

        if let Err(e) = self.store.save(&self.id, &context).await {
            tracing::error!("failed to persist {}: {}", self.config.name, e);
        }
    }
}
