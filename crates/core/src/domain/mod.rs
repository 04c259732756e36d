pub mod briefing;
pub mod contract;
