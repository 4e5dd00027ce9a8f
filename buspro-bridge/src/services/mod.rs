pub mod color;
pub mod cover_service;
pub mod demux;
pub mod event_bus;
pub mod light_service;
#[cfg(any(test, feature = "mock"))]
pub mod mock_bus;
pub mod transport;

pub use cover_service::{Cover, CoverConfig};
pub use demux::{ListenerRegistry, UnitListener};
pub use event_bus::EventBus;
pub use light_service::{LightConfig, RgbLight};
#[cfg(any(test, feature = "mock"))]
pub use mock_bus::MockBus;
pub use transport::UdpGateway;
