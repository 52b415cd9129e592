pub mod farmer;
pub mod msisdn;
pub mod payout;
pub mod ports;
pub mod wallet;
