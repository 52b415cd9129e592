use crate::domain::farmer::Farmer;
use crate::domain::wallet::Wallet;
use crate::error::Result;
use serde::Deserialize;
use std::io::Read;

/// Operational input for a sweep: the wallet and farmer records to load into
/// the stores before running.
#[derive(Debug, Deserialize)]
pub struct Seed {
    pub farmers: Vec<Farmer>,
    pub wallets: Vec<Wallet>,
}

pub struct SeedReader<R: Read> {
    source: R,
}

impl<R: Read> SeedReader<R> {
    pub fn new(source: R) -> Self {
        Self { source }
    }

    pub fn read(mut self) -> Result<Seed> {
        let mut buf = String::new();
        self.source.read_to_string(&mut buf)?;
        Ok(serde_json::from_str(&buf)?)
    }
}
