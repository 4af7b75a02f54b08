pub mod billing;
pub mod energy_flow;
pub mod payback;
pub mod tariff;
pub mod units;
