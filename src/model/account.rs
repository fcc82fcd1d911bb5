use serde::Deserialize;
use serde::Serialize;

use crate::utils::lamports_to_sol;

/// Point-in-time account state. Recomputed on every fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    pub balance_lamports: u64,
    pub is_executable: bool,
    pub owner_address: String,
    pub data_length: u64,
    pub rent_exempt_minimum_lamports: u64,
    pub is_rent_exempt: bool,
}

impl AccountInfo {
    pub fn new(
        balance_lamports: u64,
        is_executable: bool,
        owner_address: String,
        data_length: u64,
        rent_exempt_minimum_lamports: u64,
    ) -> Self {
        Self {
            balance_lamports,
            is_executable,
            owner_address,
            data_length,
            rent_exempt_minimum_lamports,
            is_rent_exempt: balance_lamports >= rent_exempt_minimum_lamports,
        }
    }

    pub fn balance_sol(&self) -> f64 { lamports_to_sol(self.balance_lamports) }

    pub fn rent_exempt_minimum_sol(&self) -> f64 { lamports_to_sol(self.rent_exempt_minimum_lamports) }
}
