pub mod assessment;
pub mod audit;
pub mod enums;
pub mod payout;
pub mod reviewer;
pub mod settings;

pub use assessment::*;
pub use audit::*;
pub use payout::*;
pub use reviewer::*;
pub use settings::*;
